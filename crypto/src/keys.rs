//! Asymmetric signing keys and their PEM encoding.
//!
//! Two families are supported, ES256 (ECDSA P-256 / SHA-256) and RS256
//! (RSASSA-PKCS1-v1_5 / SHA-256). Private keys are PKCS8, public keys PKIX,
//! both wrapped at 64 columns with LF line endings so that a load / marshal
//! round trip reproduces OpenSSL output byte for byte.

use crate::error::{CryptoError, CryptoResult};
use base64::{engine::general_purpose, Engine as _};
use p256::ecdsa::{
    Signature as EcSignature, SigningKey as EcSigningKey, VerifyingKey as EcVerifyingKey,
};
use rand::rngs::OsRng;
use rsa::pkcs1v15::{
    Signature as RsaSignature, SigningKey as RsaSigningKey, VerifyingKey as RsaVerifyingKey,
};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Modulus size for generated RSA keys
pub const RSA_KEY_BITS: usize = 2048;

/// Signature algorithm of a key pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "ES256")]
    Es256,
    #[serde(rename = "RS256")]
    Rs256,
    /// Only meaningful as a load request; keys always carry a concrete algorithm
    #[serde(rename = "auto")]
    Auto,
}

impl Algorithm {
    /// Trial order for [`Algorithm::Auto`]
    pub const SUPPORTED: [Algorithm; 2] = [Algorithm::Es256, Algorithm::Rs256];

    /// JWS `alg` name
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Es256 => "ES256",
            Algorithm::Rs256 => "RS256",
            Algorithm::Auto => "auto",
        }
    }

    /// Exact allow-list match on a JWS `alg` header value
    pub fn from_jws_name(name: &str) -> Option<Self> {
        match name {
            "ES256" => Some(Algorithm::Es256),
            "RS256" => Some(Algorithm::Rs256),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "es256" => Ok(Algorithm::Es256),
            "rs256" => Ok(Algorithm::Rs256),
            "auto" | "" => Ok(Algorithm::Auto),
            _ => Err(CryptoError::UnsupportedSignatureAlgorithm(format!(
                "{}. Valid options: ES256, RS256, auto",
                s
            ))),
        }
    }
}

#[derive(Clone)]
pub enum PrivateKey {
    Es256(EcSigningKey),
    Rs256(RsaPrivateKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Es256(EcVerifyingKey),
    Rs256(RsaPublicKey),
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey::{}(..)", self.algorithm())
    }
}

impl PrivateKey {
    /// Generate a fresh key pair.
    ///
    /// # Errors
    ///
    /// `UnsupportedSignatureAlgorithm` for [`Algorithm::Auto`], or
    /// `KeyGenerationFailed` if the RSA generator fails.
    pub fn generate(alg: Algorithm) -> CryptoResult<Self> {
        match alg {
            Algorithm::Es256 => Ok(PrivateKey::Es256(EcSigningKey::random(&mut OsRng))),
            Algorithm::Rs256 => RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
                .map(PrivateKey::Rs256)
                .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string())),
            Algorithm::Auto => Err(CryptoError::UnsupportedSignatureAlgorithm(
                "cannot generate a key for auto".to_string(),
            )),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            PrivateKey::Es256(_) => Algorithm::Es256,
            PrivateKey::Rs256(_) => Algorithm::Rs256,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Es256(key) => PublicKey::Es256(EcVerifyingKey::from(key)),
            PrivateKey::Rs256(key) => PublicKey::Rs256(key.to_public_key()),
        }
    }

    /// PKCS8 PEM
    ///
    /// # Errors
    ///
    /// Fails only if DER encoding fails.
    pub fn to_pem(&self) -> CryptoResult<Zeroizing<String>> {
        let pem = match self {
            PrivateKey::Es256(key) => key.to_pkcs8_pem(LineEnding::LF),
            PrivateKey::Rs256(key) => key.to_pkcs8_pem(LineEnding::LF),
        };
        pem.map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Sign `message`, returning the JWS signature bytes.
    ///
    /// ES256 signatures are the fixed 64-byte `r || s` form.
    pub fn sign(&self, message: &[u8]) -> CryptoResult<Vec<u8>> {
        match self {
            PrivateKey::Es256(key) => {
                let signature: EcSignature = key
                    .try_sign(message)
                    .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
                Ok(signature.to_vec())
            }
            PrivateKey::Rs256(key) => {
                let signer = RsaSigningKey::<Sha256>::new(key.clone());
                let signature = signer
                    .try_sign(message)
                    .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
                Ok(signature.to_vec())
            }
        }
    }
}

impl PublicKey {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            PublicKey::Es256(_) => Algorithm::Es256,
            PublicKey::Rs256(_) => Algorithm::Rs256,
        }
    }

    /// PKIX (SubjectPublicKeyInfo) DER
    pub fn to_der(&self) -> CryptoResult<Vec<u8>> {
        let der = match self {
            PublicKey::Es256(key) => key.to_public_key_der(),
            PublicKey::Rs256(key) => key.to_public_key_der(),
        };
        der.map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// PKIX PEM
    pub fn to_pem(&self) -> CryptoResult<String> {
        let pem = match self {
            PublicKey::Es256(key) => key.to_public_key_pem(LineEnding::LF),
            PublicKey::Rs256(key) => key.to_public_key_pem(LineEnding::LF),
        };
        pem.map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// JWT `kid`: SHA-1 of the PKIX DER, unpadded base64url
    pub fn key_id(&self) -> CryptoResult<String> {
        let der = self.to_der()?;
        Ok(general_purpose::URL_SAFE_NO_PAD.encode(Sha1::digest(&der)))
    }

    /// Check a JWS signature over `message`.
    ///
    /// # Errors
    ///
    /// `SignatureVerificationFailed` for a malformed or non-matching signature.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> CryptoResult<()> {
        match self {
            PublicKey::Es256(key) => {
                let signature = EcSignature::from_slice(signature)
                    .map_err(|e| CryptoError::SignatureVerificationFailed(e.to_string()))?;
                key.verify(message, &signature)
                    .map_err(|e| CryptoError::SignatureVerificationFailed(e.to_string()))
            }
            PublicKey::Rs256(key) => {
                let signature = RsaSignature::try_from(signature)
                    .map_err(|e| CryptoError::SignatureVerificationFailed(e.to_string()))?;
                RsaVerifyingKey::<Sha256>::new(key.clone())
                    .verify(message, &signature)
                    .map_err(|e| CryptoError::SignatureVerificationFailed(e.to_string()))
            }
        }
    }
}

fn pem_str(pem: &[u8]) -> CryptoResult<&str> {
    std::str::from_utf8(pem).map_err(|_| CryptoError::InvalidKey("PEM is not valid UTF-8".to_string()))
}

fn parse_private(pem: &str, alg: Algorithm) -> CryptoResult<PrivateKey> {
    let key = match alg {
        Algorithm::Es256 => EcSigningKey::from_pkcs8_pem(pem).map(PrivateKey::Es256),
        Algorithm::Rs256 => RsaPrivateKey::from_pkcs8_pem(pem).map(PrivateKey::Rs256),
        Algorithm::Auto => {
            return Err(CryptoError::UnsupportedSignatureAlgorithm(
                "auto is not a key algorithm".to_string(),
            ))
        }
    };
    key.map_err(|e| CryptoError::InvalidKey(format!("{} private key: {}", alg, e)))
}

fn parse_public(pem: &str, alg: Algorithm) -> CryptoResult<PublicKey> {
    let key = match alg {
        Algorithm::Es256 => EcVerifyingKey::from_public_key_pem(pem).map(PublicKey::Es256),
        Algorithm::Rs256 => RsaPublicKey::from_public_key_pem(pem).map(PublicKey::Rs256),
        Algorithm::Auto => {
            return Err(CryptoError::UnsupportedSignatureAlgorithm(
                "auto is not a key algorithm".to_string(),
            ))
        }
    };
    key.map_err(|e| CryptoError::InvalidKey(format!("{} public key: {}", alg, e)))
}

/// Try each supported algorithm in order, stopping at the first that parses
fn detect<K>(
    pem: &str,
    parse: impl Fn(&str, Algorithm) -> CryptoResult<K>,
) -> CryptoResult<(K, Algorithm)> {
    for alg in Algorithm::SUPPORTED {
        if let Ok(key) = parse(pem, alg) {
            tracing::debug!(algorithm = %alg, "Detected key algorithm");
            return Ok((key, alg));
        }
    }
    Err(CryptoError::UnsupportedSignatureAlgorithm(
        "key matches none of ES256, RS256".to_string(),
    ))
}

/// Decode a PKCS8 private key PEM.
///
/// With [`Algorithm::Auto`] ES256 is tried before RS256 and the detected
/// algorithm is returned.
///
/// # Errors
///
/// `UnsupportedSignatureAlgorithm` when auto-detection finds nothing,
/// `InvalidKey` when an explicitly requested algorithm does not parse.
pub fn load_private_key(pem: &[u8], alg: Algorithm) -> CryptoResult<(PrivateKey, Algorithm)> {
    let pem = pem_str(pem)?;
    match alg {
        Algorithm::Auto => detect(pem, parse_private),
        _ => parse_private(pem, alg).map(|key| (key, alg)),
    }
}

/// Decode a PKIX public key PEM; see [`load_private_key`]
pub fn load_public_key(pem: &[u8], alg: Algorithm) -> CryptoResult<(PublicKey, Algorithm)> {
    let pem = pem_str(pem)?;
    match alg {
        Algorithm::Auto => detect(pem, parse_public),
        _ => parse_public(pem, alg).map(|key| (key, alg)),
    }
}

fn read_key_file(path: &Path) -> CryptoResult<Zeroizing<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Zeroizing::new(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CryptoError::KeyFileNotFound(path.to_path_buf()))
        }
        Err(e) => Err(CryptoError::KeyFileUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// # Errors
///
/// `KeyFileNotFound` for a missing path, otherwise as [`load_private_key`].
pub fn load_private_key_file(
    path: impl AsRef<Path>,
    alg: Algorithm,
) -> CryptoResult<(PrivateKey, Algorithm)> {
    let path = path.as_ref();
    let pem = read_key_file(path)?;
    let loaded = load_private_key(&pem, alg)?;
    tracing::info!(
        path = %path.display(),
        algorithm = %loaded.1,
        "Loaded private signing key"
    );
    Ok(loaded)
}

pub fn load_public_key_file(
    path: impl AsRef<Path>,
    alg: Algorithm,
) -> CryptoResult<(PublicKey, Algorithm)> {
    let pem = read_key_file(path.as_ref())?;
    load_public_key(&pem, alg)
}
