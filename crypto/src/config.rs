//! Password hashing configuration
//!
//! Parameters are read once at startup. The pepper is kept in a
//! `SecretString` and never serialized.

use crate::error::{CryptoError, CryptoResult};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum salt length accepted for Argon2 (the library floor)
pub const MIN_SALT_LENGTH: usize = 8;

/// Cost used for bcrypt hashes unless configured otherwise
pub const DEFAULT_BCRYPT_COST: u32 = 10;

pub const DEFAULT_ARGON2_MEMORY: u32 = 32 * 1024;
pub const DEFAULT_ARGON2_ITERATIONS: u32 = 3;
pub const DEFAULT_ARGON2_PARALLELISM: u32 = 2;

/// Upper bounds for Argon2 costs, in configuration and in stored hashes
pub const MAX_ARGON2_MEMORY: u32 = 4 * DEFAULT_ARGON2_MEMORY;
pub const MAX_ARGON2_ITERATIONS: u32 = 4 * DEFAULT_ARGON2_ITERATIONS;
pub const MAX_ARGON2_PARALLELISM: u32 = 4 * DEFAULT_ARGON2_PARALLELISM;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordHashType {
    /// Stored under the `$argon2i$` tag
    Argon2i,
    Bcrypt,
}

impl FromStr for PasswordHashType {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "argon2i" | "argon2" => Ok(PasswordHashType::Argon2i),
            "bcrypt" => Ok(PasswordHashType::Bcrypt),
            _ => Err(CryptoError::UnknownPasswordHashType(s.to_string())),
        }
    }
}

impl fmt::Display for PasswordHashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordHashType::Argon2i => f.write_str("argon2i"),
            PasswordHashType::Bcrypt => f.write_str("bcrypt"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in KiB
    pub memory: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub key_length: u32,
}

impl Argon2Params {
    /// Name of the first cost above its upper bound
    pub fn exceeded_limit(&self) -> Option<&'static str> {
        if self.memory > MAX_ARGON2_MEMORY {
            Some("memory")
        } else if self.iterations > MAX_ARGON2_ITERATIONS {
            Some("iterations")
        } else if self.parallelism > MAX_ARGON2_PARALLELISM {
            Some("parallelism")
        } else {
            None
        }
    }
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory: DEFAULT_ARGON2_MEMORY,
            iterations: DEFAULT_ARGON2_ITERATIONS,
            parallelism: DEFAULT_ARGON2_PARALLELISM,
            key_length: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BcryptParams {
    #[serde(default = "default_bcrypt_cost")]
    pub cost: u32,
}

fn default_bcrypt_cost() -> u32 {
    DEFAULT_BCRYPT_COST
}

impl Default for BcryptParams {
    fn default() -> Self {
        Self {
            cost: default_bcrypt_cost(),
        }
    }
}

fn default_hash_type() -> PasswordHashType {
    PasswordHashType::Argon2i
}

fn default_salt_length() -> usize {
    16
}

fn default_argon() -> Option<Argon2Params> {
    Some(Argon2Params::default())
}

fn default_bcrypt() -> Option<BcryptParams> {
    Some(BcryptParams::default())
}

/// Which algorithm new hashes use, and with what cost.
///
/// Verification does not consult these; it reads everything it needs from
/// the stored string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHashParams {
    #[serde(default = "default_hash_type")]
    pub hash_type: PasswordHashType,
    #[serde(default = "default_salt_length")]
    pub salt_length: usize,
    #[serde(default = "default_argon")]
    pub argon: Option<Argon2Params>,
    #[serde(default = "default_bcrypt")]
    pub bcrypt: Option<BcryptParams>,
}

impl Default for PasswordHashParams {
    fn default() -> Self {
        Self {
            hash_type: default_hash_type(),
            salt_length: default_salt_length(),
            argon: default_argon(),
            bcrypt: default_bcrypt(),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> CryptoResult<Option<T>> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| CryptoError::Configuration(format!("{} is not a valid value: {}", name, value))),
        Err(_) => Ok(None),
    }
}

impl PasswordHashParams {
    /// Argon2 with the default cost
    pub fn argon2() -> Self {
        Self::default()
    }

    /// bcrypt at `cost`
    pub fn bcrypt(cost: u32) -> Self {
        Self {
            hash_type: PasswordHashType::Bcrypt,
            bcrypt: Some(BcryptParams { cost }),
            ..Self::default()
        }
    }

    /// Load from environment variables
    ///
    /// `PASSWORD_HASH_TYPE`, `PASSWORD_SALT_LENGTH`, `ARGON2_MEMORY`,
    /// `ARGON2_ITERATIONS`, `ARGON2_PARALLELISM`, `ARGON2_KEY_LENGTH` and
    /// `BCRYPT_COST`; anything unset keeps its default.
    pub fn from_env() -> CryptoResult<Self> {
        let mut config = Self::default();

        if let Ok(hash_type) = std::env::var("PASSWORD_HASH_TYPE") {
            config.hash_type = hash_type.parse()?;
        }

        if let Some(salt_length) = env_parse("PASSWORD_SALT_LENGTH")? {
            config.salt_length = salt_length;
        }

        let mut argon = config.argon.unwrap_or_default();
        if let Some(memory) = env_parse("ARGON2_MEMORY")? {
            argon.memory = memory;
        }
        if let Some(iterations) = env_parse("ARGON2_ITERATIONS")? {
            argon.iterations = iterations;
        }
        if let Some(parallelism) = env_parse("ARGON2_PARALLELISM")? {
            argon.parallelism = parallelism;
        }
        if let Some(key_length) = env_parse("ARGON2_KEY_LENGTH")? {
            argon.key_length = key_length;
        }
        config.argon = Some(argon);

        if let Some(cost) = env_parse("BCRYPT_COST")? {
            config.bcrypt = Some(BcryptParams { cost });
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> CryptoResult<()> {
        match self.hash_type {
            PasswordHashType::Argon2i => {
                let argon = self.argon.ok_or(CryptoError::HashParamsMissing("argon2i"))?;
                if self.salt_length < MIN_SALT_LENGTH {
                    return Err(CryptoError::Configuration(format!(
                        "Salt length must be at least {} bytes, got {}",
                        MIN_SALT_LENGTH, self.salt_length
                    )));
                }
                argon2::Params::new(
                    argon.memory,
                    argon.iterations,
                    argon.parallelism,
                    Some(argon.key_length as usize),
                )
                .map_err(|e| CryptoError::Configuration(format!("Invalid argon2 parameters: {}", e)))?;
                if let Some(cost) = argon.exceeded_limit() {
                    return Err(CryptoError::Configuration(format!(
                        "argon2 {} cost is above the supported maximum",
                        cost
                    )));
                }
            }
            PasswordHashType::Bcrypt => {
                let bcrypt = self.bcrypt.ok_or(CryptoError::HashParamsMissing("bcrypt"))?;
                if !(4..=31).contains(&bcrypt.cost) {
                    return Err(CryptoError::Configuration(format!(
                        "bcrypt cost must be between 4 and 31, got {}",
                        bcrypt.cost
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Hash parameters plus the server-wide pepper
#[derive(Clone)]
pub struct PasswordConfig {
    pub params: PasswordHashParams,
    pub pepper: SecretString,
}

impl fmt::Debug for PasswordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordConfig")
            .field("params", &self.params)
            .field("pepper", &"[REDACTED]")
            .finish()
    }
}

impl PasswordConfig {
    /// [`PasswordHashParams::from_env`] plus `PASSWORD_PEPPER`.
    ///
    /// The pepper is required: hashes made without it could not be verified
    /// once one is configured.
    pub fn from_env() -> CryptoResult<Self> {
        let params = PasswordHashParams::from_env()?;
        let pepper = std::env::var("PASSWORD_PEPPER").map_err(|_| {
            CryptoError::Configuration("PASSWORD_PEPPER is required".to_string())
        })?;

        Ok(Self {
            params,
            pepper: SecretString::new(pepper),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults() {
        let params = PasswordHashParams::default();
        assert_eq!(params.hash_type, PasswordHashType::Argon2i);
        assert_eq!(params.salt_length, 16);
        assert_eq!(params.argon, Some(Argon2Params::default()));
        assert_eq!(params.bcrypt.map(|b| b.cost), Some(10));
        params.validate().unwrap();
    }

    #[test]
    fn test_hash_type_parsing() {
        assert_eq!("argon2i".parse::<PasswordHashType>().unwrap(), PasswordHashType::Argon2i);
        assert_eq!("BCRYPT".parse::<PasswordHashType>().unwrap(), PasswordHashType::Bcrypt);
        assert!(matches!(
            "scrypt".parse::<PasswordHashType>(),
            Err(CryptoError::UnknownPasswordHashType(_))
        ));
    }

    #[test]
    fn test_missing_params_rejected() {
        let params = PasswordHashParams {
            argon: None,
            ..PasswordHashParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(CryptoError::HashParamsMissing("argon2i"))
        ));

        let params = PasswordHashParams {
            bcrypt: None,
            ..PasswordHashParams::bcrypt(10)
        };
        assert!(matches!(
            params.validate(),
            Err(CryptoError::HashParamsMissing("bcrypt"))
        ));
    }

    #[test]
    fn test_invalid_costs_rejected() {
        assert!(PasswordHashParams::bcrypt(3).validate().is_err());
        assert!(PasswordHashParams::bcrypt(32).validate().is_err());

        let params = PasswordHashParams {
            salt_length: 4,
            ..PasswordHashParams::default()
        };
        assert!(matches!(params.validate(), Err(CryptoError::Configuration(_))));
    }

    #[test]
    fn test_argon2_cost_limits() {
        assert_eq!(Argon2Params::default().exceeded_limit(), None);

        let params = PasswordHashParams {
            argon: Some(Argon2Params {
                memory: MAX_ARGON2_MEMORY + 1,
                ..Argon2Params::default()
            }),
            ..PasswordHashParams::default()
        };
        assert!(matches!(params.validate(), Err(CryptoError::Configuration(_))));

        let iterations = Argon2Params {
            iterations: MAX_ARGON2_ITERATIONS + 1,
            ..Argon2Params::default()
        };
        assert_eq!(iterations.exceeded_limit(), Some("iterations"));
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                ("PASSWORD_HASH_TYPE", Some("bcrypt")),
                ("BCRYPT_COST", Some("12")),
                ("PASSWORD_SALT_LENGTH", None),
                ("ARGON2_MEMORY", Some("65536")),
                ("PASSWORD_PEPPER", Some("pepper-from-env")),
            ],
            || {
                let config = PasswordConfig::from_env().unwrap();
                assert_eq!(config.params.hash_type, PasswordHashType::Bcrypt);
                assert_eq!(config.params.bcrypt, Some(BcryptParams { cost: 12 }));
                assert_eq!(config.params.argon.map(|a| a.memory), Some(65536));
                assert_eq!(config.params.salt_length, 16);
                assert_eq!(config.pepper.expose_secret(), "pepper-from-env");
                assert!(!format!("{:?}", config).contains("pepper-from-env"));
            },
        );
    }

    #[test]
    fn test_from_env_rejects_bad_number() {
        temp_env::with_var("ARGON2_ITERATIONS", Some("three"), || {
            assert!(matches!(
                PasswordHashParams::from_env(),
                Err(CryptoError::Configuration(_))
            ));
        });
    }

    #[test]
    fn test_pepper_required() {
        temp_env::with_var_unset("PASSWORD_PEPPER", || {
            assert!(matches!(
                PasswordConfig::from_env(),
                Err(CryptoError::Configuration(_))
            ));
        });
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let params: PasswordHashParams =
            serde_json::from_str("{\"hash_type\":\"bcrypt\",\"bcrypt\":{}}").unwrap();
        assert_eq!(params.hash_type, PasswordHashType::Bcrypt);
        assert_eq!(params.bcrypt, Some(BcryptParams { cost: 10 }));
        assert_eq!(params.salt_length, 16);
    }
}
