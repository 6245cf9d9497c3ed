//! Compile-time default configuration.
//!
//! Nothing is persisted on this node; every boot loads the defaults from
//! [`SystemConfig::default`].  An override lets tests and bring-up builds
//! supply something else through the same port.

use log::warn;

use crate::app::ports::ConfigPort;
use crate::config::SystemConfig;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default)]
pub struct DefaultConfig {
    overrides: Option<SystemConfig>,
}

impl DefaultConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(config: SystemConfig) -> Self {
        Self {
            overrides: Some(config),
        }
    }
}

impl ConfigPort for DefaultConfig {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let config = self.overrides.unwrap_or_default();
        if let Err(e) = config.validate() {
            warn!("config: rejected ({})", e);
            return Err(ConfigError::LoadFailed);
        }
        Ok(config)
    }
}
