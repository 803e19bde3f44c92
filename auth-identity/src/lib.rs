//! Token issuance and credential checks for the Identifo engine
//!
//! This crate provides:
//! - Access, refresh, invite, reset and web-cookie tokens as compact JWS
//! - Signature verification restricted to ES256 and RS256
//! - Claims validation against audience, issuer, subject and type policies
//! - Signing key rotation without disturbing in-flight signing
//! - Username/password verification against stored Argon2 or bcrypt hashes
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use auth_identity::{
//!     AppData, InMemoryAppStorage, InMemoryTokenStorage, InMemoryUserStorage, TokenService,
//!     TokenServiceConfig, User, ValidationPolicy,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = TokenService::from_config(
//!         TokenServiceConfig::from_env()?,
//!         Arc::new(InMemoryTokenStorage::new()),
//!         Arc::new(InMemoryAppStorage::new()),
//!         Arc::new(InMemoryUserStorage::new()),
//!     )?;
//!
//!     let token = service.new_token(&User::new("u1", "jane"), &["chat"], &AppData::new("app1"))?;
//!     let compact = service.string(&token)?;
//!
//!     let parsed = service.parse(&compact)?;
//!     service.validate(&parsed, ValidationPolicy::new().audience("app1"))?;
//!     Ok(())
//! }
//! ```

pub mod claims;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;
pub mod token;
pub mod validator;

pub use claims::{Claims, TokenType};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{TokenLifespans, TokenServiceConfig};
pub use credentials::CredentialVerifier;
pub use error::*;
pub use models::*;
pub use repository::{
    AppStorage, InMemoryAppStorage, InMemoryTokenStorage, InMemoryUserStorage, StorageError,
    StorageResult, TokenStorage, UserStorage,
};
pub use service::TokenService;
pub use token::{Header, SignedToken, Token, TrustState};
pub use validator::{ValidationPolicy, Validator};
