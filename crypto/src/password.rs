//! Password hashing with a per-password salt and a server-wide pepper.
//!
//! Two stored formats are produced and accepted:
//!
//! - `$argon2i$v=19$m=<memory>,t=<iterations>,p=<parallelism>$<salt>$<hash>`,
//!   salt and hash in unpadded standard base64. The key is derived with
//!   Argon2id over `salt || pepper`; the `argon2i` tag is kept for
//!   compatibility with hashes already in storage.
//! - bcrypt over `HMAC-SHA256(pepper, password)`, the modular-crypt string
//!   wrapped in unpadded standard base64. A bare `$2...` string is also
//!   accepted on verification.
//!
//! Verification never short-circuits on the secret comparison; both paths
//! go through [`crate::constant_time`].

use crate::config::{Argon2Params, PasswordConfig, PasswordHashParams, PasswordHashType};
use crate::constant_time::{ct_eq, ct_eq_str};
use crate::error::{CryptoError, CryptoResult};
use argon2::Argon2;
use base64::alphabet;
use base64::engine::general_purpose::{self, GeneralPurpose};
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Tag that opens every Argon2 hash string
pub const ARGON2I_PREFIX: &str = "$argon2i$";

const ARGON2I_TAG: &str = "argon2i";

const BCRYPT_PREFIX: &str = "$2";

/// Length of the salt plus checksum section of a bcrypt string
const BCRYPT_BODY_LEN: usize = 53;

const BCRYPT_SALT_LEN: usize = 22;

/// Only version 0x13 hashes are produced and accepted
pub const ARGON2_VERSION: u32 = argon2::Version::V0x13 as u32;

/// bcrypt's own base64 dialect, used to read the embedded salt
const BCRYPT_B64: GeneralPurpose = GeneralPurpose::new(&alphabet::BCRYPT, general_purpose::NO_PAD);

/// Stored hash family, decided from the prefix alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Argon2i,
    /// Bare `$2a$...` modular-crypt string
    Bcrypt,
    /// Base64-wrapped bcrypt, as written by [`hash`]
    WrappedBcrypt,
}

impl HashKind {
    /// # Errors
    ///
    /// `UnknownPasswordHashType` when no known prefix matches.
    pub fn detect(encoded: &str) -> CryptoResult<Self> {
        if encoded.starts_with(ARGON2I_PREFIX) {
            Ok(HashKind::Argon2i)
        } else if encoded.starts_with(BCRYPT_PREFIX) {
            Ok(HashKind::Bcrypt)
        } else if unwrap_bcrypt(encoded).is_some() {
            Ok(HashKind::WrappedBcrypt)
        } else {
            Err(CryptoError::UnknownPasswordHashType(
                "unrecognized hash prefix".to_string(),
            ))
        }
    }
}

fn unwrap_bcrypt(encoded: &str) -> Option<String> {
    let decoded = general_purpose::STANDARD_NO_PAD.decode(encoded).ok()?;
    let modular = String::from_utf8(decoded).ok()?;
    modular.starts_with(BCRYPT_PREFIX).then_some(modular)
}

/// Fresh salt from the OS CSPRNG
pub fn generate_salt(length: usize) -> Vec<u8> {
    let mut salt = vec![0u8; length];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Hash `password` with a random salt according to `params`.
///
/// # Errors
///
/// `HashParamsMissing` when the parameters for the selected type are absent.
pub fn hash(password: &str, params: &PasswordHashParams, pepper: &str) -> CryptoResult<String> {
    let salt = generate_salt(params.salt_length);

    match params.hash_type {
        PasswordHashType::Argon2i => hash_with_salt(password, params, &salt, pepper),
        PasswordHashType::Bcrypt => {
            let bcrypt_params = params
                .bcrypt
                .ok_or(CryptoError::HashParamsMissing("bcrypt"))?;
            hash_bcrypt(password, bcrypt_params.cost, pepper)
        }
    }
}

/// Deterministic Argon2 hash with a caller-supplied salt
pub fn hash_with_salt(
    password: &str,
    params: &PasswordHashParams,
    salt: &[u8],
    pepper: &str,
) -> CryptoResult<String> {
    let argon = params
        .argon
        .ok_or(CryptoError::HashParamsMissing("argon2i"))?;
    let key = derive_argon2(password.as_bytes(), salt, pepper.as_bytes(), &argon)?;

    Ok(format!(
        "${}$v={}$m={},t={},p={}${}${}",
        ARGON2I_TAG,
        ARGON2_VERSION,
        argon.memory,
        argon.iterations,
        argon.parallelism,
        general_purpose::STANDARD_NO_PAD.encode(salt),
        general_purpose::STANDARD_NO_PAD.encode(key.as_slice()),
    ))
}

/// Check `password` against a stored hash.
///
/// # Errors
///
/// A wrong password or pepper is `Ok(false)`. Errors mean the stored
/// string itself could not be interpreted.
pub fn matches(password: &str, encoded: &str, pepper: &str) -> CryptoResult<bool> {
    match HashKind::detect(encoded)? {
        HashKind::Argon2i => argon2_matches(password, encoded, pepper),
        HashKind::Bcrypt => bcrypt_matches(password, encoded, pepper),
        HashKind::WrappedBcrypt => {
            let modular = unwrap_bcrypt(encoded)
                .ok_or_else(|| CryptoError::InvalidHash("bad bcrypt wrapping".to_string()))?;
            bcrypt_matches(password, &modular, pepper)
        }
    }
}

fn derive_argon2(
    password: &[u8],
    salt: &[u8],
    pepper: &[u8],
    params: &Argon2Params,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let argon_params = argon2::Params::new(
        params.memory,
        params.iterations,
        params.parallelism,
        Some(params.key_length as usize),
    )
    .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    let argon = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, argon_params);

    let mut salted = Zeroizing::new(Vec::with_capacity(salt.len() + pepper.len()));
    salted.extend_from_slice(salt);
    salted.extend_from_slice(pepper);

    let mut key = Zeroizing::new(vec![0u8; params.key_length as usize]);
    argon
        .hash_password_into(password, &salted, &mut key)
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

    Ok(key)
}

/// Fields of a stored Argon2 hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedArgon2 {
    pub params: Argon2Params,
    pub salt: Vec<u8>,
    pub hash: Vec<u8>,
}

fn parse_cost(field: Option<&str>, name: &str) -> CryptoResult<u32> {
    field
        .and_then(|f| f.strip_prefix(name))
        .and_then(|f| f.strip_prefix('='))
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| CryptoError::InvalidHash(format!("bad {} cost", name)))
}

/// Parse an `$argon2i$` string without deriving anything.
///
/// # Errors
///
/// `InvalidHash` for any structural problem, `IncompatibleArgonVersion` when
/// the version is not 19.
pub fn decode_argon2(encoded: &str) -> CryptoResult<DecodedArgon2> {
    let fields: Vec<&str> = encoded.split('$').collect();
    let &[lead, tag, version, costs, salt, hash] = fields.as_slice() else {
        return Err(CryptoError::InvalidHash(format!(
            "expected 6 fields, got {}",
            fields.len()
        )));
    };
    if !lead.is_empty() || tag != ARGON2I_TAG {
        return Err(CryptoError::InvalidHash("not an argon2i hash".to_string()));
    }

    let found: u32 = version
        .strip_prefix("v=")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| CryptoError::InvalidHash("bad version field".to_string()))?;
    if found != ARGON2_VERSION {
        return Err(CryptoError::IncompatibleArgonVersion {
            found,
            expected: ARGON2_VERSION,
        });
    }

    let mut cost_fields = costs.split(',');
    let memory = parse_cost(cost_fields.next(), "m")?;
    let iterations = parse_cost(cost_fields.next(), "t")?;
    let parallelism = parse_cost(cost_fields.next(), "p")?;
    if cost_fields.next().is_some() {
        return Err(CryptoError::InvalidHash("trailing cost fields".to_string()));
    }

    let salt = general_purpose::STANDARD_NO_PAD
        .decode(salt)
        .map_err(|e| CryptoError::InvalidHash(format!("salt: {}", e)))?;
    let hash = general_purpose::STANDARD_NO_PAD
        .decode(hash)
        .map_err(|e| CryptoError::InvalidHash(format!("hash: {}", e)))?;
    if hash.is_empty() {
        return Err(CryptoError::InvalidHash("empty hash".to_string()));
    }

    let key_length = u32::try_from(hash.len())
        .map_err(|_| CryptoError::InvalidHash("hash too long".to_string()))?;

    let params = Argon2Params {
        memory,
        iterations,
        parallelism,
        key_length,
    };
    if let Some(cost) = params.exceeded_limit() {
        return Err(CryptoError::InvalidHash(format!("{} cost out of range", cost)));
    }

    Ok(DecodedArgon2 { params, salt, hash })
}

fn argon2_matches(password: &str, encoded: &str, pepper: &str) -> CryptoResult<bool> {
    let decoded = decode_argon2(encoded)?;
    let candidate = derive_argon2(
        password.as_bytes(),
        &decoded.salt,
        pepper.as_bytes(),
        &decoded.params,
    )
    .map_err(|e| CryptoError::InvalidHash(e.to_string()))?;

    Ok(ct_eq(&candidate, &decoded.hash))
}

fn peppered_digest(password: &str, pepper: &str) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(pepper.as_bytes())
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    mac.update(password.as_bytes());
    Ok(Zeroizing::new(mac.finalize().into_bytes().to_vec()))
}

fn hash_bcrypt(password: &str, cost: u32, pepper: &str) -> CryptoResult<String> {
    let digest = peppered_digest(password, pepper)?;
    let parts = bcrypt::hash_with_result(digest.as_slice(), cost)
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    let modular = parts.format_for_version(bcrypt::Version::TwoA);

    Ok(general_purpose::STANDARD_NO_PAD.encode(modular))
}

struct BcryptParts<'a> {
    version: bcrypt::Version,
    cost: u32,
    salt: &'a str,
}

fn split_bcrypt(modular: &str) -> CryptoResult<BcryptParts<'_>> {
    let invalid = |reason: &str| CryptoError::InvalidHash(format!("bcrypt: {}", reason));

    let fields: Vec<&str> = modular.split('$').collect();
    let &["", version, cost, body] = fields.as_slice() else {
        return Err(invalid("expected 4 fields"));
    };

    let version = match version {
        "2a" => bcrypt::Version::TwoA,
        "2b" => bcrypt::Version::TwoB,
        "2x" => bcrypt::Version::TwoX,
        "2y" => bcrypt::Version::TwoY,
        _ => return Err(invalid("unknown version")),
    };
    let cost = cost.parse().map_err(|_| invalid("bad cost"))?;
    if body.len() != BCRYPT_BODY_LEN {
        return Err(invalid("bad length"));
    }
    let salt = body
        .get(..BCRYPT_SALT_LEN)
        .ok_or_else(|| invalid("bad salt"))?;

    Ok(BcryptParts {
        version,
        cost,
        salt,
    })
}

fn bcrypt_matches(password: &str, modular: &str, pepper: &str) -> CryptoResult<bool> {
    let parts = split_bcrypt(modular)?;
    let salt: [u8; 16] = BCRYPT_B64
        .decode(parts.salt)
        .ok()
        .and_then(|salt| salt.try_into().ok())
        .ok_or_else(|| CryptoError::InvalidHash("bcrypt: bad salt".to_string()))?;

    let digest = peppered_digest(password, pepper)?;
    let candidate = bcrypt::hash_with_salt(digest.as_slice(), parts.cost, salt)
        .map_err(|e| CryptoError::InvalidHash(e.to_string()))?;

    Ok(ct_eq_str(
        &candidate.format_for_version(parts.version),
        modular,
    ))
}

/// Hashing facade bound to one parameter set and pepper
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: PasswordHashParams,
    pepper: SecretString,
}

impl PasswordHasher {
    pub fn new(params: PasswordHashParams, pepper: SecretString) -> Self {
        Self { params, pepper }
    }

    pub fn from_config(config: PasswordConfig) -> Self {
        Self::new(config.params, config.pepper)
    }

    pub fn params(&self) -> &PasswordHashParams {
        &self.params
    }

    pub fn hash(&self, password: &str) -> CryptoResult<String> {
        hash(password, &self.params, self.pepper.expose_secret())
    }

    pub fn matches(&self, password: &str, encoded: &str) -> CryptoResult<bool> {
        matches(password, encoded, self.pepper.expose_secret())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PEPPER: &str = "server-pepper";

    /// Small Argon2 cost so the suite stays fast
    fn fast_argon() -> PasswordHashParams {
        PasswordHashParams {
            argon: Some(Argon2Params {
                memory: 64,
                iterations: 1,
                parallelism: 1,
                key_length: 32,
            }),
            ..PasswordHashParams::default()
        }
    }

    fn fast_bcrypt() -> PasswordHashParams {
        PasswordHashParams::bcrypt(4)
    }

    /// Flip one character in the middle of the last `$` section,
    /// staying inside the given alphabet
    fn mutate_last_section(encoded: &str) -> String {
        let split = encoded.rfind('$').unwrap() + 1;
        let (head, tail) = encoded.split_at(split);
        let mut chars: Vec<char> = tail.chars().collect();
        let middle = chars.len() / 2;
        chars[middle] = if chars[middle] == 'A' { 'B' } else { 'A' };
        format!("{}{}", head, chars.into_iter().collect::<String>())
    }

    #[test]
    fn test_password111213_scenario() {
        let params = PasswordHashParams::default();
        let salt = b"0123456789abcdef";

        let encoded = hash_with_salt("password111213", &params, salt, PEPPER).unwrap();

        assert!(encoded.contains("$argon2i$"));
        assert!(encoded.contains("$v="));
        assert!(encoded.contains("$m="));
        assert!(encoded.contains(",t="));
        assert!(encoded.contains(",p="));
        assert!(encoded.contains(&general_purpose::STANDARD_NO_PAD.encode(salt)));
        assert!(encoded.starts_with("$argon2i$v=19$m=32768,t=3,p=2$"));

        assert!(matches("password111213", &encoded, PEPPER).unwrap());
    }

    #[test]
    fn test_hash_with_salt_is_deterministic() {
        let params = fast_argon();
        let a = hash_with_salt("secret", &params, b"saltsaltsalt", PEPPER).unwrap();
        let b = hash_with_salt("secret", &params, b"saltsaltsalt", PEPPER).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_argon2_non_deterministic_but_verifies() {
        let params = fast_argon();
        let first = hash("correct horse", &params, PEPPER).unwrap();
        let second = hash("correct horse", &params, PEPPER).unwrap();

        assert_ne!(first, second);
        assert!(matches("correct horse", &first, PEPPER).unwrap());
        assert!(matches("correct horse", &second, PEPPER).unwrap());
    }

    #[test]
    fn test_bcrypt_non_deterministic_but_verifies() {
        let params = fast_bcrypt();
        let first = hash("correct horse", &params, PEPPER).unwrap();
        let second = hash("correct horse", &params, PEPPER).unwrap();

        assert_ne!(first, second);
        assert_eq!(HashKind::detect(&first).unwrap(), HashKind::WrappedBcrypt);
        assert!(matches("correct horse", &first, PEPPER).unwrap());
        assert!(matches("correct horse", &second, PEPPER).unwrap());
    }

    #[test]
    fn test_bcrypt_uses_whole_long_password() {
        // bcrypt alone reads only the first 72 bytes
        let long = "a".repeat(100);
        let mut other = long.clone().into_bytes();
        other[90] = b'b';
        let other = String::from_utf8(other).unwrap();

        let encoded = hash(&long, &fast_bcrypt(), PEPPER).unwrap();
        assert!(matches(&long, &encoded, PEPPER).unwrap());
        assert!(!matches(&other, &encoded, PEPPER).unwrap());
    }

    #[test]
    fn test_bcrypt_wrapping() {
        let encoded = hash("pw", &fast_bcrypt(), PEPPER).unwrap();
        let modular = unwrap_bcrypt(&encoded).unwrap();

        assert!(modular.starts_with("$2a$04$"));
        assert_eq!(HashKind::detect(&modular).unwrap(), HashKind::Bcrypt);
        assert!(matches("pw", &modular, PEPPER).unwrap());
    }

    #[test]
    fn test_negative_cases() {
        for params in [fast_argon(), fast_bcrypt()] {
            let encoded = hash("hunter2", &params, PEPPER).unwrap();

            assert!(!matches("", &encoded, PEPPER).unwrap());
            assert!(!matches("hunter3", &encoded, PEPPER).unwrap());
            assert!(!matches("hunter2", &encoded, "other-pepper").unwrap());
        }
    }

    #[test]
    fn test_mutated_argon2_hash_is_mismatch() {
        let encoded = hash("hunter2", &fast_argon(), PEPPER).unwrap();
        let mutated = mutate_last_section(&encoded);

        assert_ne!(mutated, encoded);
        assert!(!matches("hunter2", &mutated, PEPPER).unwrap());
    }

    #[test]
    fn test_mutated_bcrypt_hash_is_mismatch() {
        let encoded = hash("hunter2", &fast_bcrypt(), PEPPER).unwrap();
        let modular = unwrap_bcrypt(&encoded).unwrap();

        // Change a checksum character, after the 22-character salt
        let mut chars: Vec<char> = modular.chars().collect();
        let index = chars.len() - 10;
        chars[index] = if chars[index] == 'a' { 'b' } else { 'a' };
        let mutated: String = chars.into_iter().collect();
        let rewrapped = general_purpose::STANDARD_NO_PAD.encode(&mutated);

        assert!(!matches("hunter2", &rewrapped, PEPPER).unwrap());
        assert!(!matches("hunter2", &mutated, PEPPER).unwrap());
    }

    #[test]
    fn test_unknown_prefix() {
        assert!(matches!(
            matches("pw", "$scrypt$ln=15,r=8,p=1$c2FsdA$aGFzaA", PEPPER),
            Err(CryptoError::UnknownPasswordHashType(_))
        ));
        assert!(matches!(
            HashKind::detect("plaintext"),
            Err(CryptoError::UnknownPasswordHashType(_))
        ));
    }

    #[test]
    fn test_malformed_argon2_is_error_not_mismatch() {
        let too_few = "$argon2i$v=19$m=64,t=1,p=1$c2FsdHNhbHQ";
        assert!(matches!(
            matches("pw", too_few, PEPPER),
            Err(CryptoError::InvalidHash(_))
        ));

        let bad_costs = "$argon2i$v=19$m=64;t=1;p=1$c2FsdHNhbHQ$aGFzaGhhc2g";
        assert!(matches!(
            matches("pw", bad_costs, PEPPER),
            Err(CryptoError::InvalidHash(_))
        ));

        // Padded base64 is not accepted
        let padded = "$argon2i$v=19$m=64,t=1,p=1$c2FsdHNhbHQ=$aGFzaGhhc2g";
        assert!(matches!(
            matches("pw", padded, PEPPER),
            Err(CryptoError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_oversized_argon2_costs_rejected_before_deriving() {
        let encoded = hash_with_salt("pw", &fast_argon(), b"saltsaltsalt", PEPPER).unwrap();
        let huge_memory = encoded.replacen("$m=64,", "$m=4294967295,", 1);
        let huge_iterations = encoded.replacen(",t=1,", ",t=4294967295,", 1);

        for damaged in [huge_memory, huge_iterations] {
            assert_ne!(damaged, encoded);
            assert!(matches!(decode_argon2(&damaged), Err(CryptoError::InvalidHash(_))));
            assert!(matches!(
                matches("pw", &damaged, PEPPER),
                Err(CryptoError::InvalidHash(_))
            ));
        }
    }

    #[test]
    fn test_argon2_version_mismatch() {
        let encoded = hash_with_salt("pw", &fast_argon(), b"saltsaltsalt", PEPPER).unwrap();
        let old = encoded.replacen("$v=19$", "$v=16$", 1);

        assert!(matches!(
            matches("pw", &old, PEPPER),
            Err(CryptoError::IncompatibleArgonVersion {
                found: 16,
                expected: 19
            })
        ));
    }

    #[test]
    fn test_decode_argon2_reads_parameters() {
        let encoded = hash_with_salt("pw", &fast_argon(), b"saltsaltsalt", PEPPER).unwrap();
        let decoded = decode_argon2(&encoded).unwrap();

        assert_eq!(decoded.params, fast_argon().argon.unwrap());
        assert_eq!(decoded.salt, b"saltsaltsalt");
        assert_eq!(decoded.hash.len(), 32);
    }

    #[test]
    fn test_missing_params() {
        let params = PasswordHashParams {
            argon: None,
            ..PasswordHashParams::default()
        };
        assert!(matches!(
            hash("pw", &params, PEPPER),
            Err(CryptoError::HashParamsMissing(_))
        ));

        let params = PasswordHashParams {
            bcrypt: None,
            ..fast_bcrypt()
        };
        assert!(matches!(
            hash("pw", &params, PEPPER),
            Err(CryptoError::HashParamsMissing(_))
        ));
    }

    #[test]
    fn test_hasher_facade() {
        let hasher = PasswordHasher::new(fast_argon(), SecretString::new(PEPPER.to_string()));
        let encoded = hasher.hash("pw").unwrap();

        assert!(hasher.matches("pw", &encoded).unwrap());
        assert!(!hasher.matches("pW", &encoded).unwrap());
        assert!(matches("pw", &encoded, PEPPER).unwrap());
    }

    proptest! {
        #[test]
        fn detect_never_panics(encoded in ".{0,128}") {
            let _ = HashKind::detect(&encoded);
        }

        #[test]
        fn decode_argon2_never_panics(tail in "[ -~]{0,96}") {
            let _ = decode_argon2(&format!("$argon2i${}", tail));
        }

        #[test]
        fn bcrypt_split_never_panics(tail in "[ -~]{0,96}") {
            let _ = split_bcrypt(&format!("$2a${}", tail));
        }
    }
}
