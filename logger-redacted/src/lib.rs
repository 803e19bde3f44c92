pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use error_common::{codes, Classify, ErrorKind};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Logging for the Identifo engine
///
/// Installs a `tracing` subscriber and provides redaction helpers so bearer
/// tokens and stored password hashes never reach log output verbatim.
///
/// # Example
///
/// ```rust,no_run
/// use logger_redacted::{fingerprint, LoggerConfig};
///
/// logger_redacted::init(&LoggerConfig::from_env())?;
///
/// let raw_token = "eyJ0eXAiOiJKV1QifQ.eyJzdWIiOiJ1MSJ9.c2ln";
/// tracing::warn!(token = %fingerprint(raw_token), "token rejected");
/// # Ok::<(), logger_redacted::LoggerError>(())
/// ```
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

impl Classify for LoggerError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }

    fn code(&self) -> &'static str {
        codes::configuration::INVALID_SETTING
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when set.
///
/// # Errors
///
/// Fails when the filter directive does not parse or a global subscriber is
/// already installed.
pub fn init(config: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| LoggerError::InvalidFilter(e.to_string()))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    installed.map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))
}

/// Redact `text` according to `config`; a no-op when redaction is disabled
pub fn sanitize(config: &LoggerConfig, text: &str) -> String {
    if config.redaction_enabled {
        SecretRedactor::default().redact(text)
    } else {
        text.to_string()
    }
}
