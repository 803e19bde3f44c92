use crate::codes;
use serde::Serialize;
use std::fmt;

/// Taxonomy shared by every engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Startup configuration problems (keys, settings). Never retried.
    Configuration,
    /// Issuance preconditions the caller must turn into a rejection
    Precondition,
    /// A well-formed credential failed a policy check
    Validation,
    /// The credential could not be decoded at all
    Malformed,
    /// Wrong password or unknown user
    Credentials,
    /// Collaborator persistence failure
    Storage,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Precondition => "precondition",
            ErrorKind::Validation => "validation",
            ErrorKind::Malformed => "malformed",
            ErrorKind::Credentials => "credentials",
            ErrorKind::Storage => "storage",
            ErrorKind::Internal => "internal",
        }
    }

    /// Both validation failures and undecodable input end up as the same
    /// "authentication failed" answer.
    pub fn is_authentication_failure(self) -> bool {
        matches!(self, ErrorKind::Validation | ErrorKind::Malformed)
    }

    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::Configuration)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every crate-level error enum in the workspace
pub trait Classify: std::error::Error {
    fn kind(&self) -> ErrorKind;

    /// Specific code, for server-side logs only
    fn code(&self) -> &'static str;
}

/// The outcome an end user is allowed to see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublicError {
    pub code: &'static str,
    pub message: &'static str,
}

impl PublicError {
    pub const AUTHENTICATION_FAILED: PublicError = PublicError {
        code: codes::authentication::AUTHENTICATION_FAILED,
        message: "authentication failed",
    };

    pub const INCORRECT_CREDENTIALS: PublicError = PublicError {
        code: codes::authentication::INVALID_CREDENTIALS,
        message: "incorrect credentials",
    };

    pub const INTERNAL: PublicError = PublicError {
        code: codes::internal::INTERNAL,
        message: "internal error",
    };

    /// Collapse a detailed error into its public form.
    ///
    /// Which validation check failed is never revealed, and a malformed token
    /// looks exactly like an invalid one.
    pub fn from_error<E: Classify + ?Sized>(err: &E) -> Self {
        match err.kind() {
            ErrorKind::Validation | ErrorKind::Malformed => Self::AUTHENTICATION_FAILED,
            ErrorKind::Credentials => Self::INCORRECT_CREDENTIALS,
            ErrorKind::Precondition => PublicError {
                code: err.code(),
                message: "request rejected",
            },
            ErrorKind::Configuration | ErrorKind::Storage | ErrorKind::Internal => Self::INTERNAL,
        }
    }
}

impl fmt::Display for PublicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
