//! Token payload model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::IdentityError;

/// Audience of tokens that are not bound to a client app
pub const IDENTIFO_AUDIENCE: &str = "identifo";

/// Scope that allows a refresh token to be issued
pub const OFFLINE_SCOPE: &str = "offline";

/// Payload key for the user's display name
pub const PAYLOAD_NAME: &str = "name";

pub const DEFAULT_ACCESS_TOKEN_LIFESPAN: i64 = 7 * 24 * 60 * 60;
pub const DEFAULT_REFRESH_TOKEN_LIFESPAN: i64 = 365 * 24 * 60 * 60;
pub const DEFAULT_INVITE_TOKEN_LIFESPAN: i64 = 60 * 60;
pub const DEFAULT_RESET_TOKEN_LIFESPAN: i64 = 2 * 60 * 60;
pub const DEFAULT_WEB_COOKIE_TOKEN_LIFESPAN: i64 = 2 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenType {
    Access,
    Refresh,
    Invite,
    Reset,
    WebCookie,
}

impl TokenType {
    pub const ALL: [TokenType; 5] = [
        TokenType::Access,
        TokenType::Refresh,
        TokenType::Invite,
        TokenType::Reset,
        TokenType::WebCookie,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
            TokenType::Invite => "invite",
            TokenType::Reset => "reset",
            TokenType::WebCookie => "web-cookie",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| IdentityError::MalformedToken(format!("unknown token type: {}", s)))
    }
}

/// Registered claims plus the engine's own fields.
///
/// `type` has no default, so a payload without it fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub iss: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Space separated
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scopes: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub payload: BTreeMap<String, String>,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kid: String,
}

impl Claims {
    pub fn new(token_type: TokenType) -> Self {
        Self {
            sub: String::new(),
            iss: String::new(),
            aud: String::new(),
            iat: None,
            exp: None,
            scopes: String::new(),
            payload: BTreeMap::new(),
            token_type,
            kid: String::new(),
        }
    }

    pub fn scope_list(&self) -> Vec<String> {
        self.scopes.split_whitespace().map(str::to_string).collect()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.split_whitespace().any(|s| s == scope)
    }
}

pub fn join_scopes<S: AsRef<str>>(scopes: &[S]) -> String {
    scopes
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
