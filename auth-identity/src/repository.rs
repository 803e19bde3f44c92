use crate::clock::{Clock, SystemClock};
use crate::models::{AppData, User};
use crate::token::Token;
use async_trait::async_trait;
use dashmap::DashMap;
use error_common::{codes, Classify, ErrorKind};
use std::sync::Arc;
use thiserror::Error;

/// Collaborator failure; `NotFound` is distinct from a backend outage
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl Classify for StorageError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }

    fn code(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => codes::storage::NOT_FOUND,
            StorageError::Backend(_) => codes::storage::BACKEND,
        }
    }
}

/// Issued refresh tokens, by compact string
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenStorage: Send + Sync {
    async fn save_token(&self, token: &str) -> StorageResult<()>;
    async fn delete_token(&self, token: &str) -> StorageResult<()>;
    async fn has_token(&self, token: &str) -> StorageResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppStorage: Send + Sync {
    async fn app_by_id(&self, id: &str) -> StorageResult<AppData>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStorage: Send + Sync {
    async fn user_by_id(&self, id: &str) -> StorageResult<User>;

    /// Lookup for credential checks
    async fn user_by_username(&self, username: &str) -> StorageResult<User>;
}

// In-memory implementations for development/testing

/// Refresh tokens keyed by compact string, with their `exp`.
///
/// Expired entries are dropped whenever a token is saved.
pub struct InMemoryTokenStorage {
    tokens: Arc<DashMap<String, Option<i64>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTokenStorage {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: Arc::new(DashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn prune_expired(&self) {
        let now = self.clock.now().timestamp();
        self.tokens.retain(|_, exp| !matches!(exp, Some(exp) if *exp < now));
    }
}

impl Default for InMemoryTokenStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStorage for InMemoryTokenStorage {
    async fn save_token(&self, token: &str) -> StorageResult<()> {
        self.prune_expired();
        // Unreadable tokens are kept until deleted
        let exp = Token::parse_unverified(token)
            .ok()
            .and_then(|parsed| parsed.claims().exp);
        self.tokens.insert(token.to_string(), exp);
        Ok(())
    }

    async fn delete_token(&self, token: &str) -> StorageResult<()> {
        self.tokens.remove(token);
        Ok(())
    }

    async fn has_token(&self, token: &str) -> StorageResult<bool> {
        Ok(self.tokens.contains_key(token))
    }
}

pub struct InMemoryAppStorage {
    apps: Arc<DashMap<String, AppData>>,
}

impl InMemoryAppStorage {
    pub fn new() -> Self {
        Self {
            apps: Arc::new(DashMap::new()),
        }
    }

    pub fn insert(&self, app: AppData) {
        self.apps.insert(app.id.clone(), app);
    }
}

impl Default for InMemoryAppStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppStorage for InMemoryAppStorage {
    async fn app_by_id(&self, id: &str) -> StorageResult<AppData> {
        self.apps
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::NotFound(format!("app {}", id)))
    }
}

pub struct InMemoryUserStorage {
    users: Arc<DashMap<String, User>>,
}

impl InMemoryUserStorage {
    pub fn new() -> Self {
        Self {
            users: Arc::new(DashMap::new()),
        }
    }

    pub fn insert(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }
}

impl Default for InMemoryUserStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStorage for InMemoryUserStorage {
    async fn user_by_id(&self, id: &str) -> StorageResult<User> {
        self.users
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::NotFound(format!("user {}", id)))
    }

    async fn user_by_username(&self, username: &str) -> StorageResult<User> {
        self.users
            .iter()
            .find(|entry| entry.value().username == username)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::NotFound(format!("user {}", username)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_storage() {
        let storage = InMemoryTokenStorage::new();
        assert!(storage.is_empty());

        storage.save_token("a.b.c").await.unwrap();
        assert!(storage.has_token("a.b.c").await.unwrap());
        assert_eq!(storage.len(), 1);

        storage.delete_token("a.b.c").await.unwrap();
        assert!(!storage.has_token("a.b.c").await.unwrap());

        // Deleting twice is fine
        storage.delete_token("a.b.c").await.unwrap();
    }

    #[tokio::test]
    async fn test_token_storage_drops_expired_on_save() {
        use crate::claims::{Claims, TokenType};
        use crate::clock::FixedClock;
        use crypto::{Algorithm, PrivateKey};

        let key = PrivateKey::generate(Algorithm::Es256).unwrap();
        let signed = |exp: i64| {
            let mut claims = Claims::new(TokenType::Refresh);
            claims.iat = Some(exp - 60);
            claims.exp = Some(exp);
            Token::new_with_claims(Algorithm::Es256, "kid", claims)
                .sign(&key)
                .unwrap()
        };

        let clock = Arc::new(FixedClock::at_timestamp(1_000));
        let storage = InMemoryTokenStorage::with_clock(clock.clone());

        let short = signed(1_100);
        let long = signed(5_000);
        storage.save_token(&short).await.unwrap();
        storage.save_token(&long).await.unwrap();
        storage.save_token("opaque").await.unwrap();
        assert_eq!(storage.len(), 3);

        clock.advance(chrono::Duration::seconds(500));
        storage.save_token(&signed(9_000)).await.unwrap();

        assert!(!storage.has_token(&short).await.unwrap());
        assert!(storage.has_token(&long).await.unwrap());
        assert!(storage.has_token("opaque").await.unwrap());
        assert_eq!(storage.len(), 3);
    }

    #[tokio::test]
    async fn test_app_storage_not_found() {
        let storage = InMemoryAppStorage::new();
        storage.insert(AppData::new("app1"));

        assert_eq!(storage.app_by_id("app1").await.unwrap().id, "app1");
        assert!(matches!(
            storage.app_by_id("app2").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_user_storage_lookups() {
        let storage = InMemoryUserStorage::new();
        storage.insert(User::new("u1", "jane"));

        assert_eq!(storage.user_by_id("u1").await.unwrap().username, "jane");
        assert_eq!(storage.user_by_username("jane").await.unwrap().id, "u1");
        assert!(matches!(
            storage.user_by_username("john").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(StorageError::NotFound("x".into()).code(), codes::storage::NOT_FOUND);
        let backend = StorageError::Backend(anyhow::anyhow!("connection reset"));
        assert_eq!(backend.code(), codes::storage::BACKEND);
        assert_eq!(backend.kind(), ErrorKind::Storage);
    }
}
