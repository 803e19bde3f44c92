use error_common::{codes, Classify, ErrorKind};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Key file not found: {}", .0.display())]
    KeyFileNotFound(PathBuf),

    #[error("Unable to read key file {}: {reason}", .path.display())]
    KeyFileUnreadable { path: PathBuf, reason: String },

    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedSignatureAlgorithm(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    #[error("Password hash parameters missing for {0}")]
    HashParamsMissing(&'static str),

    #[error("Unknown password hash type: {0}")]
    UnknownPasswordHashType(String),

    #[error("Incompatible argon2 version {found}, expected {expected}")]
    IncompatibleArgonVersion { found: u32, expected: u32 },

    #[error("Invalid password hash: {0}")]
    InvalidHash(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;

impl Classify for CryptoError {
    fn kind(&self) -> ErrorKind {
        match self {
            CryptoError::KeyFileNotFound(_)
            | CryptoError::KeyFileUnreadable { .. }
            | CryptoError::UnsupportedSignatureAlgorithm(_)
            | CryptoError::InvalidKey(_)
            | CryptoError::HashParamsMissing(_)
            | CryptoError::Configuration(_) => ErrorKind::Configuration,
            // A stored hash we cannot interpret is a data problem, not a bad password
            CryptoError::UnknownPasswordHashType(_)
            | CryptoError::IncompatibleArgonVersion { .. }
            | CryptoError::InvalidHash(_) => ErrorKind::Internal,
            CryptoError::SignatureVerificationFailed(_) => ErrorKind::Validation,
            CryptoError::KeyGenerationFailed(_)
            | CryptoError::SigningFailed(_)
            | CryptoError::KeyDerivationFailed(_) => ErrorKind::Internal,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            CryptoError::KeyFileNotFound(_) | CryptoError::KeyFileUnreadable { .. } => {
                codes::configuration::KEY_FILE_NOT_FOUND
            }
            CryptoError::UnsupportedSignatureAlgorithm(_) => {
                codes::configuration::UNSUPPORTED_SIGNATURE_ALGORITHM
            }
            CryptoError::InvalidKey(_) => codes::configuration::KEY_PARSE_FAILED,
            CryptoError::HashParamsMissing(_) => codes::issuance::HASH_PARAMS_MISSING,
            CryptoError::Configuration(_) => codes::configuration::INVALID_SETTING,
            CryptoError::UnknownPasswordHashType(_) => codes::password::UNKNOWN_HASH_TYPE,
            CryptoError::IncompatibleArgonVersion { .. } => {
                codes::password::INCOMPATIBLE_ARGON_VERSION
            }
            CryptoError::InvalidHash(_) => codes::password::INVALID_HASH,
            CryptoError::SignatureVerificationFailed(_) => codes::token::TOKEN_INVALID,
            CryptoError::KeyGenerationFailed(_)
            | CryptoError::SigningFailed(_)
            | CryptoError::KeyDerivationFailed(_) => codes::internal::INTERNAL,
        }
    }
}
