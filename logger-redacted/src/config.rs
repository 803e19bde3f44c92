// Logger configuration
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Mask tokens and password hashes that end up in log text
    #[serde(default = "default_true")]
    pub redaction_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

fn default_true() -> bool {
    true
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            format: default_log_format(),
            redaction_enabled: true,
        }
    }
}

impl LoggerConfig {
    /// Read `LOG_LEVEL`, `LOG_FORMAT` and `LOG_REDACTION`, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config.format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        config.redaction_enabled = std::env::var("LOG_REDACTION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        config
    }
}
