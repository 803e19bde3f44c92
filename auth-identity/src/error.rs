use crate::repository::StorageError;
use crypto::CryptoError;
use error_common::{codes, Classify, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Empty token")]
    EmptyToken,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Token is invalid: {0}")]
    TokenInvalid(String),

    #[error("Token is expired or has no expiration")]
    NoExpiration,

    #[error("Token has no issued-at time or was issued in the future")]
    NoIssuedAt,

    #[error("Token audience is not accepted")]
    InvalidAudience,

    #[error("Token issuer is not accepted")]
    InvalidIssuer,

    #[error("Token subject does not match")]
    InvalidSubject,

    #[error("Token type mismatch")]
    TokenTypeMismatch,

    #[error("Invalid app")]
    InvalidApp,

    #[error("Invalid user")]
    InvalidUser,

    #[error("Refresh token requires the offline scope")]
    InvalidOfflineScope,

    #[error("Error saving token: {0}")]
    SavingToken(#[source] StorageError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, IdentityError>;

impl Classify for IdentityError {
    fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::EmptyToken | IdentityError::MalformedToken(_) => ErrorKind::Malformed,
            IdentityError::TokenInvalid(_)
            | IdentityError::NoExpiration
            | IdentityError::NoIssuedAt
            | IdentityError::InvalidAudience
            | IdentityError::InvalidIssuer
            | IdentityError::InvalidSubject
            | IdentityError::TokenTypeMismatch => ErrorKind::Validation,
            IdentityError::InvalidApp
            | IdentityError::InvalidUser
            | IdentityError::InvalidOfflineScope => ErrorKind::Precondition,
            IdentityError::InvalidCredentials => ErrorKind::Credentials,
            IdentityError::SavingToken(_) | IdentityError::Storage(_) => ErrorKind::Storage,
            IdentityError::Crypto(e) => e.kind(),
            IdentityError::Configuration(_) => ErrorKind::Configuration,
            IdentityError::Internal(_) => ErrorKind::Internal,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            IdentityError::EmptyToken => codes::token::EMPTY_TOKEN,
            IdentityError::MalformedToken(_) => codes::token::MALFORMED_TOKEN,
            IdentityError::TokenInvalid(_) => codes::token::TOKEN_INVALID,
            IdentityError::NoExpiration => codes::validation::TOKEN_EXPIRED,
            IdentityError::NoIssuedAt => codes::validation::MISSING_ISSUED_AT,
            IdentityError::InvalidAudience => codes::validation::INVALID_AUDIENCE,
            IdentityError::InvalidIssuer => codes::validation::INVALID_ISSUER,
            IdentityError::InvalidSubject => codes::validation::INVALID_SUBJECT,
            IdentityError::TokenTypeMismatch => codes::validation::TOKEN_TYPE_MISMATCH,
            IdentityError::InvalidApp => codes::issuance::INVALID_APP,
            IdentityError::InvalidUser => codes::issuance::INVALID_USER,
            IdentityError::InvalidOfflineScope => codes::issuance::INVALID_OFFLINE_SCOPE,
            IdentityError::InvalidCredentials => codes::authentication::INVALID_CREDENTIALS,
            IdentityError::SavingToken(_) => codes::storage::SAVING_TOKEN,
            IdentityError::Storage(e) => e.code(),
            IdentityError::Crypto(e) => e.code(),
            IdentityError::Configuration(_) => codes::configuration::INVALID_SETTING,
            IdentityError::Internal(_) => codes::internal::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use error_common::PublicError;

    #[test]
    fn test_validation_and_malformed_look_the_same_outside() {
        let expired = PublicError::from_error(&IdentityError::NoExpiration);
        let garbage = PublicError::from_error(&IdentityError::MalformedToken("bad base64".into()));

        assert_eq!(expired, garbage);
        assert_eq!(expired, PublicError::AUTHENTICATION_FAILED);

        // ...but they are logged under different kinds
        assert_eq!(IdentityError::NoExpiration.kind(), ErrorKind::Validation);
        assert_eq!(
            IdentityError::MalformedToken(String::new()).kind(),
            ErrorKind::Malformed
        );
    }

    #[test]
    fn test_credentials_error_is_generic() {
        let public = PublicError::from_error(&IdentityError::InvalidCredentials);
        assert_eq!(public, PublicError::INCORRECT_CREDENTIALS);
    }

    #[test]
    fn test_crypto_errors_keep_their_kind() {
        let err = IdentityError::from(CryptoError::KeyFileNotFound("/missing.pem".into()));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.code(), codes::configuration::KEY_FILE_NOT_FOUND);
    }

    #[test]
    fn test_saving_token_code() {
        let err = IdentityError::SavingToken(StorageError::Backend(anyhow::anyhow!("disk full")));
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.code(), codes::storage::SAVING_TOKEN);
        assert!(err.to_string().contains("disk full"));
    }
}
