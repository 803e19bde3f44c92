// Error reporting utilities
// The detailed reason only ever goes to server-side logs.

use crate::types::{Classify, ErrorKind};

/// Log an engine error with its kind, code and full reason.
///
/// Malformed input and failed validation are logged at different levels so
/// probing (garbage tokens) can be told apart from stale credentials.
pub fn report<E: Classify + ?Sized>(context: &str, error: &E) {
    let kind = error.kind();
    let code = error.code();

    match kind {
        ErrorKind::Malformed => tracing::info!(
            context = context,
            error_kind = %kind,
            error_code = code,
            error = %error,
            "Rejected undecodable credential"
        ),
        ErrorKind::Validation => tracing::warn!(
            context = context,
            error_kind = %kind,
            error_code = code,
            error = %error,
            "Credential failed validation"
        ),
        ErrorKind::Credentials | ErrorKind::Precondition => tracing::info!(
            context = context,
            error_kind = %kind,
            error_code = code,
            error = %error,
            "Request rejected"
        ),
        ErrorKind::Configuration | ErrorKind::Storage | ErrorKind::Internal => tracing::error!(
            context = context,
            error_kind = %kind,
            error_code = code,
            error = %error,
            "Identity engine error"
        ),
    }
}
