use crate::claims::{
    join_scopes, Claims, TokenType, IDENTIFO_AUDIENCE, OFFLINE_SCOPE, PAYLOAD_NAME,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{TokenLifespans, TokenServiceConfig};
use crate::error::{IdentityError, Result};
use crate::models::{AppData, User};
use crate::repository::{AppStorage, StorageError, TokenStorage, UserStorage};
use crate::token::{SignedToken, Token};
use crate::validator::{ValidationPolicy, Validator};
use crypto::keys::load_private_key_file;
use crypto::{Algorithm, PrivateKey, PublicKey};
use error_common::report;
use logger_redacted::fingerprint;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything derived from one private key. Replaced as a whole on rotation.
#[derive(Debug)]
struct SigningKeys {
    private: PrivateKey,
    public: PublicKey,
    algorithm: Algorithm,
    key_id: String,
}

impl SigningKeys {
    fn new(private: PrivateKey) -> Result<Self> {
        let public = private.public_key();
        let key_id = public.key_id()?;
        Ok(Self {
            algorithm: private.algorithm(),
            private,
            public,
            key_id,
        })
    }
}

/// Issues, signs, parses and validates tokens with one active key
pub struct TokenService {
    issuer: String,
    lifespans: TokenLifespans,
    keys: RwLock<Arc<SigningKeys>>,
    token_storage: Arc<dyn TokenStorage>,
    app_storage: Arc<dyn AppStorage>,
    user_storage: Arc<dyn UserStorage>,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(
        config: TokenServiceConfig,
        private_key: PrivateKey,
        token_storage: Arc<dyn TokenStorage>,
        app_storage: Arc<dyn AppStorage>,
        user_storage: Arc<dyn UserStorage>,
    ) -> Result<Self> {
        config.validate()?;
        if config.algorithm != Algorithm::Auto && config.algorithm != private_key.algorithm() {
            return Err(IdentityError::Configuration(format!(
                "configured algorithm {} does not match {} signing key",
                config.algorithm,
                private_key.algorithm()
            )));
        }
        let keys = SigningKeys::new(private_key)?;

        tracing::info!(
            issuer = %config.issuer,
            algorithm = %keys.algorithm,
            key_id = %keys.key_id,
            "Token service initialized"
        );

        Ok(Self {
            issuer: config.issuer,
            lifespans: config.lifespans,
            keys: RwLock::new(Arc::new(keys)),
            token_storage,
            app_storage,
            user_storage,
            clock: Arc::new(SystemClock),
        })
    }

    /// Load the private key named by the config and build the service.
    ///
    /// # Errors
    ///
    /// A `Configuration` error when no key path is set, or the key cannot
    /// be found or parsed.
    pub fn from_config(
        config: TokenServiceConfig,
        token_storage: Arc<dyn TokenStorage>,
        app_storage: Arc<dyn AppStorage>,
        user_storage: Arc<dyn UserStorage>,
    ) -> Result<Self> {
        let path = config.private_key_path.clone().ok_or_else(|| {
            IdentityError::Configuration("private_key_path is required".to_string())
        })?;
        let (private_key, _) = load_private_key_file(&path, config.algorithm)?;

        Self::new(config, private_key, token_storage, app_storage, user_storage)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn keys(&self) -> Arc<SigningKeys> {
        Arc::clone(&self.keys.read())
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn algorithm(&self) -> Algorithm {
        self.keys().algorithm
    }

    pub fn key_id(&self) -> String {
        self.keys().key_id.clone()
    }

    pub fn public_key(&self) -> PublicKey {
        self.keys().public.clone()
    }

    /// Seconds
    pub fn web_cookie_token_lifespan(&self) -> i64 {
        self.lifespans.web_cookie
    }

    /// Replace the signing key. Signing in progress keeps the old snapshot.
    pub fn set_private_key(&self, private_key: PrivateKey) -> Result<()> {
        let keys = Arc::new(SigningKeys::new(private_key)?);
        let previous = std::mem::replace(&mut *self.keys.write(), Arc::clone(&keys));

        tracing::info!(
            previous_key_id = %previous.key_id,
            key_id = %keys.key_id,
            algorithm = %keys.algorithm,
            "Signing key rotated"
        );
        Ok(())
    }

    fn issue(
        &self,
        token_type: TokenType,
        subject: &str,
        audience: &str,
        scopes: String,
        payload: BTreeMap<String, String>,
        lifespan: i64,
    ) -> Token {
        let keys = self.keys();
        let now = self.clock.now().timestamp();

        let claims = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: audience.to_string(),
            iat: Some(now),
            exp: Some(now.saturating_add(lifespan)),
            scopes,
            payload,
            token_type,
            kid: keys.key_id.clone(),
        };

        tracing::debug!(
            token_type = %token_type,
            subject = subject,
            audience = audience,
            lifespan = lifespan,
            "Issued token"
        );
        Token::new_with_claims(keys.algorithm, keys.key_id.clone(), claims)
    }

    /// Access token for `user` in `app`
    pub fn new_token<S: AsRef<str>>(&self, user: &User, scopes: &[S], app: &AppData) -> Result<Token> {
        if !app.active {
            return Err(IdentityError::InvalidApp);
        }
        if !user.active {
            return Err(IdentityError::InvalidUser);
        }

        let mut payload = BTreeMap::new();
        if app.wants_payload(PAYLOAD_NAME) {
            payload.insert(PAYLOAD_NAME.to_string(), user.username.clone());
        }

        let lifespan = if app.token_lifespan > 0 {
            app.token_lifespan
        } else {
            self.lifespans.access
        };

        Ok(self.issue(
            TokenType::Access,
            &user.id,
            &app.id,
            join_scopes(scopes),
            payload,
            lifespan,
        ))
    }

    /// Refresh token; signed and handed to token storage before it is returned
    pub async fn new_refresh_token<S: AsRef<str>>(
        &self,
        user: &User,
        scopes: &[S],
        app: &AppData,
    ) -> Result<SignedToken> {
        if !app.active || !app.offline {
            return Err(IdentityError::InvalidApp);
        }
        if !user.active {
            return Err(IdentityError::InvalidUser);
        }
        if !scopes.iter().any(|s| s.as_ref() == OFFLINE_SCOPE) {
            return Err(IdentityError::InvalidOfflineScope);
        }

        let lifespan = if app.refresh_token_lifespan > 0 {
            app.refresh_token_lifespan
        } else {
            self.lifespans.refresh
        };

        let token = self.issue(
            TokenType::Refresh,
            &user.id,
            &app.id,
            join_scopes(scopes),
            BTreeMap::new(),
            lifespan,
        );
        let compact = self.string(&token)?;

        self.token_storage
            .save_token(&compact)
            .await
            .map_err(IdentityError::SavingToken)?;

        Ok(SignedToken { token, compact })
    }

    /// New access token from a refresh token.
    ///
    /// The refresh token must be trusted, unexpired, of this issuer and of
    /// type refresh. App and user are read again and must still be active;
    /// the scopes are carried over as they are.
    pub async fn refresh_token(&self, refresh: &Token) -> Result<Token> {
        let policy = ValidationPolicy::new()
            .issuer(self.issuer.clone())
            .token_type(TokenType::Refresh);
        Validator::with_clock(policy, Arc::clone(&self.clock)).validate(refresh)?;

        let claims = refresh.claims();
        let app = self
            .app_storage
            .app_by_id(&claims.aud)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => IdentityError::InvalidApp,
                other => IdentityError::Storage(other),
            })?;
        let user = self
            .user_storage
            .user_by_id(&claims.sub)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => IdentityError::InvalidUser,
                other => IdentityError::Storage(other),
            })?;

        let scopes = claims.scope_list();
        self.new_token(&user, &scopes, &app)
    }

    pub fn new_invite_token(&self) -> Result<Token> {
        self.new_invite_token_for(None, None)
    }

    /// Invite token optionally carrying the invitee's email and role
    pub fn new_invite_token_for(&self, email: Option<&str>, role: Option<&str>) -> Result<Token> {
        let mut payload = BTreeMap::new();
        if let Some(email) = email.filter(|e| !e.is_empty()) {
            payload.insert("email".to_string(), email.to_string());
        }
        if let Some(role) = role.filter(|r| !r.is_empty()) {
            payload.insert("role".to_string(), role.to_string());
        }

        Ok(self.issue(
            TokenType::Invite,
            "",
            IDENTIFO_AUDIENCE,
            String::new(),
            payload,
            self.lifespans.invite,
        ))
    }

    pub fn new_reset_token(&self, user_id: &str) -> Result<Token> {
        if user_id.is_empty() {
            return Err(IdentityError::InvalidUser);
        }

        Ok(self.issue(
            TokenType::Reset,
            user_id,
            IDENTIFO_AUDIENCE,
            String::new(),
            BTreeMap::new(),
            self.lifespans.reset,
        ))
    }

    pub fn new_web_cookie_token(&self, user: &User) -> Result<Token> {
        if !user.active {
            return Err(IdentityError::InvalidUser);
        }

        Ok(self.issue(
            TokenType::WebCookie,
            &user.id,
            IDENTIFO_AUDIENCE,
            String::new(),
            BTreeMap::new(),
            self.lifespans.web_cookie,
        ))
    }

    /// Sign `token` with the active key.
    ///
    /// Header `alg`/`kid` are taken from the same key snapshot that signs, so
    /// a concurrent rotation can never produce a mixed token.
    pub fn string(&self, token: &Token) -> Result<String> {
        if !token.is_trusted() {
            return Err(IdentityError::TokenInvalid(
                "refusing to sign an unverified token".to_string(),
            ));
        }

        let keys = self.keys();
        let mut stamped = token.clone();
        stamped.restamp(keys.algorithm, &keys.key_id);
        stamped.sign(&keys.private)
    }

    /// Verify a compact token against the active public key
    pub fn parse(&self, compact: &str) -> Result<Token> {
        let keys = self.keys();
        Token::parse_and_verify(compact, &keys.public).map_err(|err| {
            report(&format!("parse token {}", fingerprint(compact)), &err);
            err
        })
    }

    pub fn validate(&self, token: &Token, policy: ValidationPolicy) -> Result<()> {
        Validator::with_clock(policy, Arc::clone(&self.clock))
            .validate(token)
            .map_err(|err| {
                report("validate token", &err);
                err
            })
    }

    /// Drop a refresh token from token storage
    pub async fn revoke_refresh_token(&self, compact: &str) -> Result<()> {
        self.token_storage.delete_token(compact).await?;
        tracing::info!(token = %fingerprint(compact), "Refresh token revoked");
        Ok(())
    }

    pub async fn is_refresh_token_stored(&self, compact: &str) -> Result<bool> {
        Ok(self.token_storage.has_token(compact).await?)
    }
}
