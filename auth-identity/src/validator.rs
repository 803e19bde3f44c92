//! Claims policy checks over a parsed token.
//!
//! Checks run in a fixed order and stop at the first failure: trust, algorithm,
//! expiry / issued-at, audience, issuer, subject, type. For a token that is
//! wrong in several ways the first failing check decides the error.

use std::sync::Arc;

use crate::claims::TokenType;
use crate::clock::{Clock, SystemClock};
use crate::error::{IdentityError, Result};
use crate::token::Token;

/// What a token must look like; empty lists and `None` are unconstrained
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub audiences: Vec<String>,
    pub issuers: Vec<String>,
    pub user_id: Option<String>,
    pub token_type: Option<TokenType>,
}

impl ValidationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audiences.push(audience.into());
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuers.push(issuer.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = Some(token_type);
        self
    }
}

/// Stateless per call; share freely across threads
#[derive(Debug, Clone)]
pub struct Validator {
    policy: ValidationPolicy,
    clock: Arc<dyn Clock>,
}

impl Validator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: ValidationPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { policy, clock }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// # Errors
    ///
    /// The error of the first failing check.
    pub fn validate(&self, token: &Token) -> Result<()> {
        if !token.is_trusted() {
            return Err(IdentityError::TokenInvalid(
                "token signature was never verified".to_string(),
            ));
        }

        if token.header().algorithm().is_none() {
            return Err(IdentityError::TokenInvalid(format!(
                "algorithm {:?} is not allowed",
                token.header().alg
            )));
        }

        let claims = token.claims();
        let now = self.clock.now().timestamp();

        match claims.exp {
            Some(exp) if now <= exp => {}
            _ => return Err(IdentityError::NoExpiration),
        }
        match claims.iat {
            Some(iat) if iat <= now => {}
            _ => return Err(IdentityError::NoIssuedAt),
        }

        if !self.policy.audiences.is_empty() && !self.policy.audiences.contains(&claims.aud) {
            return Err(IdentityError::InvalidAudience);
        }

        if !self.policy.issuers.is_empty() && !self.policy.issuers.contains(&claims.iss) {
            return Err(IdentityError::InvalidIssuer);
        }

        if let Some(user_id) = self.policy.user_id.as_deref().filter(|id| !id.is_empty()) {
            if claims.sub != user_id {
                return Err(IdentityError::InvalidSubject);
            }
        }

        if let Some(token_type) = self.policy.token_type {
            if claims.token_type != token_type {
                return Err(IdentityError::TokenTypeMismatch);
            }
        }

        Ok(())
    }
}
