use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    // Compact JWS: base64url(header).base64url(claims).base64url(signature)
    static ref JWT_REGEX: Regex =
        Regex::new(r"\beyJ[A-Za-z0-9_-]*\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*").unwrap();
    static ref ARGON2_REGEX: Regex =
        Regex::new(r"\$argon2(?:id|i|d)\$[A-Za-z0-9=,+/$]+").unwrap();
    static ref BCRYPT_REGEX: Regex =
        Regex::new(r"\$2[abxy]?\$\d{2}\$[./A-Za-z0-9]{53}").unwrap();
}

/// Secret redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_tokens: bool,
    pub redact_password_hashes: bool,
    /// Replace secrets with a short digest instead of a fixed mask, so the
    /// same token can be followed across log lines
    pub hash_for_correlation: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_tokens: true,
            redact_password_hashes: true,
            hash_for_correlation: true,
        }
    }
}

/// Masks bearer tokens and stored password hashes in free-form log text
pub struct SecretRedactor {
    config: RedactionConfig,
}

impl SecretRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_tokens {
            result = self.replace(&JWT_REGEX, &result, "JWT");
        }

        if self.config.redact_password_hashes {
            result = self.replace(&ARGON2_REGEX, &result, "HASH");
            result = self.replace(&BCRYPT_REGEX, &result, "HASH");
        }

        result
    }

    fn replace(&self, pattern: &Regex, text: &str, label: &str) -> String {
        pattern
            .replace_all(text, |caps: &regex::Captures| {
                if self.config.hash_for_correlation {
                    format!("{label}[{}]", fingerprint(&caps[0]))
                } else {
                    format!("{label}[REDACTED]")
                }
            })
            .to_string()
    }
}

impl Default for SecretRedactor {
    fn default() -> Self {
        Self::new(RedactionConfig::default())
    }
}

/// Short, stable digest of a secret for log correlation.
///
/// First 8 bytes of SHA-256, base64url without padding.
pub fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let prefix: Vec<u8> = digest.iter().take(8).copied().collect();
    general_purpose::URL_SAFE_NO_PAD.encode(prefix)
}
