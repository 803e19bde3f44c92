use serde::{Deserialize, Serialize};

/// The part of a user record token issuance needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Stored password hash, see `crypto::password`
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    pub active: bool,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: None,
            password_hash: String::new(),
            active: true,
        }
    }
}

/// Client application registered with the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppData {
    pub id: String,
    pub active: bool,
    /// May the app hold refresh tokens
    #[serde(default)]
    pub offline: bool,
    /// Access token lifespan in seconds; zero means the service default
    #[serde(default)]
    pub token_lifespan: i64,
    /// Refresh token lifespan in seconds; zero means the service default
    #[serde(default)]
    pub refresh_token_lifespan: i64,
    /// User fields copied into the access token payload (only `name` is known)
    #[serde(default)]
    pub token_payload: Vec<String>,
}

impl AppData {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            active: true,
            offline: false,
            token_lifespan: 0,
            refresh_token_lifespan: 0,
            token_payload: Vec::new(),
        }
    }

    pub fn wants_payload(&self, field: &str) -> bool {
        self.token_payload.iter().any(|f| f == field)
    }
}
