use crate::claims::{
    DEFAULT_ACCESS_TOKEN_LIFESPAN, DEFAULT_INVITE_TOKEN_LIFESPAN, DEFAULT_REFRESH_TOKEN_LIFESPAN,
    DEFAULT_RESET_TOKEN_LIFESPAN, DEFAULT_WEB_COOKIE_TOKEN_LIFESPAN,
};
use crate::error::{IdentityError, Result};
use crypto::Algorithm;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Lifespans in seconds, per token type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLifespans {
    #[serde(default = "default_access")]
    pub access: i64,
    #[serde(default = "default_refresh")]
    pub refresh: i64,
    #[serde(default = "default_invite")]
    pub invite: i64,
    #[serde(default = "default_reset")]
    pub reset: i64,
    #[serde(default = "default_web_cookie")]
    pub web_cookie: i64,
}

fn default_access() -> i64 {
    DEFAULT_ACCESS_TOKEN_LIFESPAN
}

fn default_refresh() -> i64 {
    DEFAULT_REFRESH_TOKEN_LIFESPAN
}

fn default_invite() -> i64 {
    DEFAULT_INVITE_TOKEN_LIFESPAN
}

fn default_reset() -> i64 {
    DEFAULT_RESET_TOKEN_LIFESPAN
}

fn default_web_cookie() -> i64 {
    DEFAULT_WEB_COOKIE_TOKEN_LIFESPAN
}

impl Default for TokenLifespans {
    fn default() -> Self {
        Self {
            access: default_access(),
            refresh: default_refresh(),
            invite: default_invite(),
            reset: default_reset(),
            web_cookie: default_web_cookie(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenServiceConfig {
    /// `iss` of every issued token
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Key algorithm; `auto` detects it from the key file
    #[serde(default = "default_algorithm")]
    pub algorithm: Algorithm,
    /// PKCS8 PEM, required by `TokenService::from_config`
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,
    #[serde(default)]
    pub lifespans: TokenLifespans,
}

fn default_issuer() -> String {
    "identifo".to_string()
}

fn default_algorithm() -> Algorithm {
    Algorithm::Auto
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            algorithm: default_algorithm(),
            private_key_path: None,
            lifespans: TokenLifespans::default(),
        }
    }
}

fn env_seconds(name: &str, current: i64) -> Result<i64> {
    match std::env::var(name) {
        Ok(value) => i64::from_str(&value).map_err(|_| {
            IdentityError::Configuration(format!("{} must be a number of seconds, got {}", name, value))
        }),
        Err(_) => Ok(current),
    }
}

impl TokenServiceConfig {
    /// Load from environment variables
    ///
    /// `IDENTITY_ISSUER`, `IDENTITY_SIGNING_ALGORITHM`,
    /// `IDENTITY_PRIVATE_KEY_PATH` and `IDENTITY_{ACCESS,REFRESH,INVITE,RESET,WEB_COOKIE}_TOKEN_LIFESPAN`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(issuer) = std::env::var("IDENTITY_ISSUER") {
            config.issuer = issuer;
        }

        if let Ok(algorithm) = std::env::var("IDENTITY_SIGNING_ALGORITHM") {
            config.algorithm = algorithm.parse()?;
        }

        config.private_key_path = std::env::var("IDENTITY_PRIVATE_KEY_PATH")
            .ok()
            .map(PathBuf::from);

        let lifespans = &mut config.lifespans;
        lifespans.access = env_seconds("IDENTITY_ACCESS_TOKEN_LIFESPAN", lifespans.access)?;
        lifespans.refresh = env_seconds("IDENTITY_REFRESH_TOKEN_LIFESPAN", lifespans.refresh)?;
        lifespans.invite = env_seconds("IDENTITY_INVITE_TOKEN_LIFESPAN", lifespans.invite)?;
        lifespans.reset = env_seconds("IDENTITY_RESET_TOKEN_LIFESPAN", lifespans.reset)?;
        lifespans.web_cookie =
            env_seconds("IDENTITY_WEB_COOKIE_TOKEN_LIFESPAN", lifespans.web_cookie)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.issuer.trim().is_empty() {
            return Err(IdentityError::Configuration(
                "Issuer must not be empty".to_string(),
            ));
        }

        let lifespans = [
            ("access", self.lifespans.access),
            ("refresh", self.lifespans.refresh),
            ("invite", self.lifespans.invite),
            ("reset", self.lifespans.reset),
            ("web-cookie", self.lifespans.web_cookie),
        ];
        for (name, seconds) in lifespans {
            if seconds <= 0 {
                return Err(IdentityError::Configuration(format!(
                    "{} token lifespan must be positive, got {}",
                    name, seconds
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TokenServiceConfig::default();
        assert_eq!(config.issuer, "identifo");
        assert_eq!(config.algorithm, Algorithm::Auto);
        assert_eq!(config.lifespans.access, 604_800);
        assert_eq!(config.lifespans.refresh, 31_536_000);
        assert_eq!(config.lifespans.invite, 3_600);
        assert_eq!(config.lifespans.reset, 7_200);
        assert_eq!(config.lifespans.web_cookie, 172_800);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                ("IDENTITY_ISSUER", Some("https://id.example.com")),
                ("IDENTITY_SIGNING_ALGORITHM", Some("RS256")),
                ("IDENTITY_PRIVATE_KEY_PATH", Some("/etc/identifo/private.pem")),
                ("IDENTITY_ACCESS_TOKEN_LIFESPAN", Some("900")),
                ("IDENTITY_REFRESH_TOKEN_LIFESPAN", None),
            ],
            || {
                let config = TokenServiceConfig::from_env().unwrap();
                assert_eq!(config.issuer, "https://id.example.com");
                assert_eq!(config.algorithm, Algorithm::Rs256);
                assert_eq!(
                    config.private_key_path,
                    Some(PathBuf::from("/etc/identifo/private.pem"))
                );
                assert_eq!(config.lifespans.access, 900);
                assert_eq!(config.lifespans.refresh, DEFAULT_REFRESH_TOKEN_LIFESPAN);
            },
        );
    }

    #[test]
    fn test_from_env_rejects_bad_values() {
        temp_env::with_var("IDENTITY_SIGNING_ALGORITHM", Some("HS256"), || {
            assert!(matches!(
                TokenServiceConfig::from_env(),
                Err(IdentityError::Crypto(_))
            ));
        });
        temp_env::with_var("IDENTITY_RESET_TOKEN_LIFESPAN", Some("2h"), || {
            assert!(matches!(
                TokenServiceConfig::from_env(),
                Err(IdentityError::Configuration(_))
            ));
        });
    }

    #[test]
    fn test_validate() {
        let mut config = TokenServiceConfig::default();
        config.issuer = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = TokenServiceConfig::default();
        config.lifespans.invite = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: TokenServiceConfig =
            serde_json::from_str(r#"{"algorithm":"ES256","lifespans":{"access":60}}"#).unwrap();
        assert_eq!(config.algorithm, Algorithm::Es256);
        assert_eq!(config.lifespans.access, 60);
        assert_eq!(config.lifespans.web_cookie, DEFAULT_WEB_COOKIE_TOKEN_LIFESPAN);
        assert_eq!(config.issuer, "identifo");
    }
}
