use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub server_host: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    /// Base URL of the Arweave gateway used for block metadata and GraphQL
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Timeout for gateway requests in seconds
    #[serde(default = "default_gateway_timeout_secs")]
    pub gateway_timeout_secs: u64,

    /// Transactions requested per GraphQL page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Politeness delay after each height-resolution probe in milliseconds
    #[serde(default = "default_probe_delay_ms")]
    pub probe_delay_ms: u64,

    /// Politeness delay between GraphQL pages in milliseconds
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Politeness delay between streamed blocks in milliseconds
    #[serde(default = "default_block_delay_ms")]
    pub block_delay_ms: u64,

    /// Timeout for sending messages to slow WebSocket clients in seconds
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// How many consecutive days the visual search covers (requested day included)
    #[serde(default = "default_visual_search_days")]
    pub visual_search_days: u32,

    /// Directory of static assets served at the site root
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_gateway_url() -> String {
    "https://arweave.net".to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    100
}

fn default_probe_delay_ms() -> u64 {
    200
}

fn default_page_delay_ms() -> u64 {
    100
}

fn default_block_delay_ms() -> u64 {
    500
}

fn default_send_timeout_secs() -> u64 {
    5
}

fn default_visual_search_days() -> u32 {
    7
}

fn default_static_dir() -> String {
    "public".to_string()
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            // Use double-underscore for nesting so single underscores remain part of the key,
            // allowing env vars like GATEWAY_URL / SERVER_HOST to map to snake_case fields.
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        cfg.try_deserialize()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.server_host, self.server_port)
            .parse()
            .expect("Invalid server address")
    }

    /// Get gateway request timeout as Duration
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Get height-probe politeness delay as Duration
    pub fn probe_delay(&self) -> Duration {
        Duration::from_millis(self.probe_delay_ms)
    }

    /// Get inter-page politeness delay as Duration
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// Get inter-block politeness delay as Duration
    pub fn block_delay(&self) -> Duration {
        Duration::from_millis(self.block_delay_ms)
    }

    /// Get slow-client send timeout as Duration
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}
