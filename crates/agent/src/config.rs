use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Docker socket path; empty means bollard's default connection.
    pub docker_socket: String,
    /// Retry bound per configuration request.
    pub retry_max_attempts: u32,
    /// Fixed backoff between attempts, in seconds.
    pub retry_delay_secs: u64,
}

impl AgentConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = std::env::var("CONFSYNC_CONFIG_FILE")
            .unwrap_or_else(|_| "/etc/confsync/agent.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!(
                "Config file not found at {}, using environment variables",
                config_path
            );
            Self::from_env()
        };

        // Environment variables override file config
        if let Ok(socket) = std::env::var("DOCKER_SOCKET") {
            config.docker_socket = socket;
        }
        if let Ok(attempts) = std::env::var("CONFSYNC_RETRY_ATTEMPTS") {
            if let Ok(attempts) = attempts.parse() {
                config.retry_max_attempts = attempts;
            }
        }
        if let Ok(delay) = std::env::var("CONFSYNC_RETRY_DELAY_SECS") {
            if let Ok(delay) = delay.parse() {
                config.retry_delay_secs = delay;
            }
        }

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AgentConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        Self {
            docker_socket: std::env::var("DOCKER_SOCKET").unwrap_or_else(|_| "".to_string()),
            retry_max_attempts: std::env::var("CONFSYNC_RETRY_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            retry_delay_secs: std::env::var("CONFSYNC_RETRY_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.retry_max_attempts == 0 {
            return Err("retry_max_attempts must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            docker_socket: "".to_string(),
            retry_max_attempts: 5,
            retry_delay_secs: 3,
        }
    }
}
