use std::env;

// --- CONFIG AGGREGATOR ---

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub topology: TopologyConfig,
}

#[derive(Debug, thiserror::Error)]
#[error("config error: {key} must be valid (got '{value}')")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

impl Config {
    /// Reads `.env` (if any) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Ok(Self {
            server: ServerConfig::load()?,
            topology: TopologyConfig::load()?,
        })
    }
}

// --- MODULES ---

// SERVER
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub dashboard_port: u16,
    pub log_level: String,
    pub seed_demo: bool,
}

impl ServerConfig {
    fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            host:           get_env("DASHBOARD_HOST", "127.0.0.1")?,
            dashboard_port: get_env("DASHBOARD_PORT", "8080")?,
            log_level:      get_env("BROKERSCOPE_LOG", "info")?,
            seed_demo:      get_env("BROKER_SEED_DEMO", "false")?,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            dashboard_port: 8080,
            log_level: "info".to_string(),
            seed_demo: false,
        }
    }
}

// TOPOLOGY
#[derive(Debug, Clone)]
pub struct TopologyConfig {
    /// Highest channel number a connection may open.
    pub channel_max: u16,
    /// Pre-declare amq.direct, amq.fanout and amq.topic.
    pub default_exchanges: bool,
}

impl TopologyConfig {
    fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            channel_max:       get_env("BROKER_CHANNEL_MAX", "2047")?,
            default_exchanges: get_env("BROKER_DEFAULT_EXCHANGES", "true")?,
        })
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            channel_max: 2047,
            default_exchanges: true,
        }
    }
}

// --- PRIVATE HELPER ---

fn get_env<T: std::str::FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|_| ConfigError { key, value })
}
