use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PROXY_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_ACTUATOR_URL: &str = "http://127.0.0.1:5000/openc2";
pub const DEFAULT_ACTUATOR_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;
/// Ten years
pub const MAX_PENDING_TTL_SECS: u64 = 315_360_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub listen_addr: SocketAddr,
    pub actuator_url: String,
    pub actuator_timeout: Duration,
    /// Unset means pending commands never expire
    pub pending_ttl: Option<Duration>,
    pub sweep_interval: Duration,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_addr = lookup("PROXY_ADDR")
            .unwrap_or_else(|| DEFAULT_PROXY_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "PROXY_ADDR",
                reason: e.to_string(),
            })?;

        let actuator_url = lookup("ACTUATOR_URL").unwrap_or_else(|| DEFAULT_ACTUATOR_URL.to_string());
        if !(actuator_url.starts_with("http://") || actuator_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: "ACTUATOR_URL",
                reason: format!("expected an http(s) URL, got {actuator_url:?}"),
            });
        }

        let actuator_timeout = Duration::from_millis(
            parse_u64(&lookup, "ACTUATOR_TIMEOUT_MS")?.unwrap_or(DEFAULT_ACTUATOR_TIMEOUT_MS),
        );
        let pending_ttl = parse_u64(&lookup, "PENDING_TTL_SECS")?;
        if let Some(ttl) = pending_ttl.filter(|ttl| *ttl > MAX_PENDING_TTL_SECS) {
            return Err(ConfigError::Invalid {
                name: "PENDING_TTL_SECS",
                reason: format!("{ttl} exceeds the maximum of {MAX_PENDING_TTL_SECS}"),
            });
        }
        let sweep_interval = parse_u64(&lookup, "PENDING_SWEEP_INTERVAL_SECS")?
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);
        if sweep_interval == 0 {
            return Err(ConfigError::Invalid {
                name: "PENDING_SWEEP_INTERVAL_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            listen_addr,
            actuator_url,
            actuator_timeout,
            pending_ttl: pending_ttl.map(Duration::from_secs),
            sweep_interval: Duration::from_secs(sweep_interval),
        })
    }
}

fn parse_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    lookup(name)
        .map(|value| {
            value.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })
        })
        .transpose()
}
