//! Username and password checks against stored hashes.

use std::sync::Arc;

use crypto::{CryptoResult, PasswordHasher};
use error_common::report;

use crate::error::{IdentityError, Result};
use crate::models::User;
use crate::repository::{StorageError, UserStorage};

pub struct CredentialVerifier {
    users: Arc<dyn UserStorage>,
    hasher: Arc<PasswordHasher>,
    /// Checked when the user does not exist so both paths cost one hash
    dummy_hash: String,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserStorage>, hasher: PasswordHasher) -> Result<Self> {
        let dummy_hash = hasher.hash("identifo-dummy-password")?;
        Ok(Self {
            users,
            hasher: Arc::new(hasher),
            dummy_hash,
        })
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Hash a new password with the configured parameters
    pub async fn hash_password(&self, password: &str) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| IdentityError::Internal(format!("hashing task failed: {}", e)))?
            .map_err(IdentityError::from)
    }

    /// Return the user when `password` matches.
    ///
    /// Unknown user, inactive user, user without a usable password hash and
    /// wrong password all produce `InvalidCredentials` after one hash check.
    pub async fn verify(&self, username: &str, password: &str) -> Result<User> {
        let user = match self.users.user_by_username(username).await {
            Ok(user) => Some(user),
            Err(StorageError::NotFound(_)) => None,
            Err(err) => return Err(err.into()),
        };

        let matched = match &user {
            Some(user) if !user.password_hash.is_empty() => {
                match self.check(password, user.password_hash.clone()).await? {
                    Ok(matched) => matched,
                    Err(err) => {
                        report(&format!("verify credentials of user {}", user.id), &err);
                        self.check_dummy(password).await?;
                        false
                    }
                }
            }
            Some(user) => {
                tracing::info!(user_id = %user.id, "User has no password hash");
                self.check_dummy(password).await?;
                false
            }
            None => {
                self.check_dummy(password).await?;
                false
            }
        };

        match user {
            Some(user) if matched && user.active => {
                tracing::debug!(user_id = %user.id, "Credentials accepted");
                Ok(user)
            }
            _ => {
                tracing::info!("Credentials rejected");
                Err(IdentityError::InvalidCredentials)
            }
        }
    }

    /// Burn the same work as a real check; the outcome is irrelevant
    async fn check_dummy(&self, password: &str) -> Result<()> {
        let _ = self.check(password, self.dummy_hash.clone()).await?;
        Ok(())
    }

    /// Outer error: the blocking task failed. Inner: the stored hash is unusable.
    async fn check(&self, password: &str, encoded: String) -> Result<CryptoResult<bool>> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.matches(&password, &encoded))
            .await
            .map_err(|e| IdentityError::Internal(format!("hashing task failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryUserStorage, MockUserStorage};
    use crypto::PasswordHashParams;
    use error_common::PublicError;
    use secrecy::SecretString;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(
            PasswordHashParams::bcrypt(4),
            SecretString::new("pepper".to_string()),
        )
    }

    async fn verifier_with(username: &str, password: &str, active: bool) -> CredentialVerifier {
        let users = Arc::new(InMemoryUserStorage::new());
        let verifier = CredentialVerifier::new(users.clone(), hasher()).unwrap();

        let mut user = User::new("u1", username);
        user.password_hash = verifier.hash_password(password).await.unwrap();
        user.active = active;
        users.insert(user);

        verifier
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let verifier = verifier_with("jane", "password111213", true).await;
        let user = verifier.verify("jane", "password111213").await.unwrap();
        assert_eq!(user.id, "u1");
    }

    #[tokio::test]
    async fn test_rejections_are_indistinguishable() {
        let verifier = verifier_with("jane", "password111213", true).await;

        let wrong_password = verifier.verify("jane", "password111214").await.unwrap_err();
        let unknown_user = verifier.verify("john", "password111213").await.unwrap_err();

        assert!(matches!(wrong_password, IdentityError::InvalidCredentials));
        assert!(matches!(unknown_user, IdentityError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_inactive_user_rejected() {
        let verifier = verifier_with("jane", "password111213", false).await;
        assert!(matches!(
            verifier.verify("jane", "password111213").await,
            Err(IdentityError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let mut users = MockUserStorage::new();
        users
            .expect_user_by_username()
            .returning(|_| Err(StorageError::Backend(anyhow::anyhow!("connection reset"))));

        let verifier = CredentialVerifier::new(Arc::new(users), hasher()).unwrap();
        assert!(matches!(
            verifier.verify("jane", "password").await,
            Err(IdentityError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_stored_hash_is_rejected_like_unknown_user() {
        let users = Arc::new(InMemoryUserStorage::new());
        let verifier = CredentialVerifier::new(users.clone(), hasher()).unwrap();

        for (id, corrupt) in [
            ("u1", "$argon2i$garbage"),
            ("u2", "$argon2i$v=19$m=4294967295,t=1,p=1$c2FsdHNhbHQ$aGFzaGhhc2g"),
            ("u3", "plaintext-password"),
        ] {
            let mut user = User::new(id, format!("user-{}", id));
            user.password_hash = corrupt.to_string();
            users.insert(user);

            assert!(matches!(
                verifier.verify(&format!("user-{}", id), "password").await,
                Err(IdentityError::InvalidCredentials)
            ));
        }
    }

    #[tokio::test]
    async fn test_passwordless_user_indistinguishable_from_unknown() {
        let users = Arc::new(InMemoryUserStorage::new());
        users.insert(User::new("u1", "federated-jane"));
        let verifier = CredentialVerifier::new(users, hasher()).unwrap();

        let passwordless = verifier.verify("federated-jane", "guess").await.unwrap_err();
        let unknown = verifier.verify("nobody", "guess").await.unwrap_err();

        assert!(matches!(passwordless, IdentityError::InvalidCredentials));
        assert_eq!(
            PublicError::from_error(&passwordless),
            PublicError::from_error(&unknown)
        );
        // An empty password must not match an empty hash either
        assert!(matches!(
            verifier.verify("federated-jane", "").await,
            Err(IdentityError::InvalidCredentials)
        ));
    }
}
