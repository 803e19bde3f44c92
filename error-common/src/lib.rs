//! Common error handling utilities for the Identifo engine
//!
//! Every crate in the workspace keeps its own `thiserror` enum. This crate
//! provides the shared vocabulary on top of them:
//!
//! - **Error kinds**: the taxonomy every engine error classifies into
//! - **Error codes**: stable codes for server-side logs and API responses
//! - **Public errors**: the deliberately vague outcome shown to end users
//! - **Reporting**: structured `tracing` output carrying the real reason
//!
//! # Error Categories
//!
//! - **Configuration**: key files missing or unparseable, bad settings
//! - **Precondition**: inactive app or user, missing scope, missing hash parameters
//! - **Validation**: expired token, wrong audience/issuer/subject/type, bad algorithm
//! - **Malformed**: input that cannot even be decoded
//! - **Credentials**: wrong password or unknown user (never distinguished)
//! - **Storage**: collaborator persistence failures
//! - **Internal**: everything else
//!
//! # Example
//!
//! ```rust
//! use error_common::{Classify, ErrorKind, PublicError, codes};
//!
//! #[derive(Debug)]
//! struct Expired;
//!
//! impl std::fmt::Display for Expired {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         f.write_str("token expired")
//!     }
//! }
//!
//! impl std::error::Error for Expired {}
//!
//! impl Classify for Expired {
//!     fn kind(&self) -> ErrorKind {
//!         ErrorKind::Validation
//!     }
//!     fn code(&self) -> &'static str {
//!         codes::validation::TOKEN_EXPIRED
//!     }
//! }
//!
//! error_common::report("access-check", &Expired);
//! let public = PublicError::from_error(&Expired);
//! assert_eq!(public.message, "authentication failed");
//! ```

pub mod codes;
pub mod reporting;
pub mod types;

pub use reporting::*;
pub use types::*;
