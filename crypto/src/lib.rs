//! Cryptographic primitives for the Identifo engine
//!
//! - Signing keys: ES256 (ECDSA P-256) and RS256 (RSA PKCS#1 v1.5), PKCS8 /
//!   PKIX PEM codecs that round-trip OpenSSL output, and JWT key ids
//! - Password hashing: Argon2 and peppered bcrypt behind one self-describing
//!   string format
//! - Constant-time comparison helpers
//!
//! # Example
//!
//! ```rust
//! use crypto::{password, PasswordHashParams};
//!
//! let params = PasswordHashParams::bcrypt(4);
//! let stored = password::hash("correct horse", &params, "pepper")?;
//!
//! assert!(password::matches("correct horse", &stored, "pepper")?);
//! assert!(!password::matches("wrong horse", &stored, "pepper")?);
//! # Ok::<(), crypto::CryptoError>(())
//! ```

pub mod config;
pub mod constant_time;
pub mod error;
pub mod keys;
pub mod password;

pub use config::{Argon2Params, BcryptParams, PasswordConfig, PasswordHashParams, PasswordHashType};
pub use error::*;
pub use keys::{Algorithm, PrivateKey, PublicKey};
pub use password::{HashKind, PasswordHasher};
