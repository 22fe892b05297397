use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_ACTUATOR_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_REGION: &str = "us-west-2";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct ActuatorConfig {
    pub listen_addr: SocketAddr,
    pub region: String,
}

impl ActuatorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_addr = lookup("ACTUATOR_ADDR")
            .unwrap_or_else(|| DEFAULT_ACTUATOR_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "ACTUATOR_ADDR",
                reason: e.to_string(),
            })?;

        let region = lookup("ACTUATOR_REGION")
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        if region.is_empty() {
            return Err(ConfigError::Invalid {
                name: "ACTUATOR_REGION",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            listen_addr,
            region,
        })
    }
}
