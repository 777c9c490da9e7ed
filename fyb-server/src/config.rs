use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Interface to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the server to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory that holds generated artifacts (served statically).
    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    /// Scratch directory for uploaded CSV files.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable CORS for cross-origin requests.
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_public_dir() -> String {
    "public".to_string()
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_enable_cors() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_dir: default_public_dir(),
            upload_dir: default_upload_dir(),
            log_level: default_log_level(),
            enable_cors: default_enable_cors(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file; a missing file yields the
    /// defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
