//! Compact JWS encoding of [`Claims`].
//!
//! A [`Token`] remembers how it came to exist. Freshly minted tokens and
//! tokens whose signature was checked are trusted; tokens decoded without a
//! key are not, and can never be signed again.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use crypto::{Algorithm, PrivateKey, PublicKey};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::claims::Claims;
use crate::error::{IdentityError, Result};

pub const TOKEN_TYPE_JWT: &str = "JWT";

/// JOSE header. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub typ: String,
    /// Kept as text so disallowed values can be seen and rejected
    pub alg: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kid: String,
}

impl Header {
    pub fn new(alg: Algorithm, kid: impl Into<String>) -> Self {
        Self {
            typ: TOKEN_TYPE_JWT.to_string(),
            alg: alg.as_str().to_string(),
            kid: kid.into(),
        }
    }

    /// `Some` only for ES256 and RS256, spelled exactly
    pub fn algorithm(&self) -> Option<Algorithm> {
        Algorithm::from_jws_name(&self.alg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustState {
    /// Minted by this process
    Fresh,
    /// Signature checked against a known public key
    Verified,
    /// Decoded without a signature check
    Unverified,
}

#[derive(Debug, Clone)]
pub struct Token {
    header: Header,
    claims: Claims,
    signature: Vec<u8>,
    state: TrustState,
}

/// A token together with the exact compact string that was persisted
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: Token,
    pub compact: String,
}

fn encode_part<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| IdentityError::Internal(format!("token encoding: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_bytes(part: &str, what: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| IdentityError::MalformedToken(format!("{}: {}", what, e)))
}

fn decode_part<T: DeserializeOwned>(part: &str, what: &str) -> Result<T> {
    let bytes = decode_bytes(part, what)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| IdentityError::MalformedToken(format!("{}: {}", what, e)))
}

/// Split a compact token into its three parts
fn split_compact(compact: &str) -> Result<(&str, &str, &str)> {
    if compact.is_empty() {
        return Err(IdentityError::EmptyToken);
    }

    let mut parts = compact.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(claims), Some(signature), None) => Ok((header, claims, signature)),
        _ => Err(IdentityError::MalformedToken(
            "expected three dot-separated parts".to_string(),
        )),
    }
}

impl Token {
    /// Unsigned, trusted token with header `{typ: "JWT", alg, kid}`
    pub fn new_with_claims(alg: Algorithm, key_id: impl Into<String>, claims: Claims) -> Self {
        Self {
            header: Header::new(alg, key_id),
            claims,
            signature: Vec::new(),
            state: TrustState::Fresh,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn into_claims(self) -> Claims {
        self.claims
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn state(&self) -> TrustState {
        self.state
    }

    pub fn is_trusted(&self) -> bool {
        matches!(self.state, TrustState::Fresh | TrustState::Verified)
    }

    /// Point the header (and claims) at a different signing key
    pub(crate) fn restamp(&mut self, alg: Algorithm, key_id: &str) {
        self.header.alg = alg.as_str().to_string();
        self.header.kid = key_id.to_string();
        self.claims.kid = key_id.to_string();
    }

    #[cfg(test)]
    pub(crate) fn with_raw_alg(mut self, alg: &str) -> Self {
        self.header.alg = alg.to_string();
        self
    }

    /// Compact serialization `header.claims.signature`.
    ///
    /// # Errors
    ///
    /// `TokenInvalid` for an unverified token or when the header algorithm
    /// is not the key's algorithm.
    pub fn sign(&self, key: &PrivateKey) -> Result<String> {
        if !self.is_trusted() {
            return Err(IdentityError::TokenInvalid(
                "refusing to sign an unverified token".to_string(),
            ));
        }
        if self.header.algorithm() != Some(key.algorithm()) {
            return Err(IdentityError::TokenInvalid(format!(
                "header algorithm {} does not match {} key",
                self.header.alg,
                key.algorithm()
            )));
        }

        let signing_input = format!(
            "{}.{}",
            encode_part(&self.header)?,
            encode_part(&self.claims)?
        );
        let signature = key.sign(signing_input.as_bytes())?;

        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Decode without checking the signature.
    ///
    /// For diagnostics only; the result is never trusted.
    pub fn parse_unverified(compact: &str) -> Result<Self> {
        let (header, claims, signature) = split_compact(compact)?;

        Ok(Self {
            header: decode_part(header, "header")?,
            claims: decode_part(claims, "claims")?,
            signature: decode_bytes(signature, "signature")?,
            state: TrustState::Unverified,
        })
    }

    /// Decode and verify against `key`.
    ///
    /// Only ES256 and RS256 are accepted, and only when they match the key.
    pub fn parse_and_verify(compact: &str, key: &PublicKey) -> Result<Self> {
        let mut token = Self::parse_unverified(compact)?;

        let alg = token.header.algorithm().ok_or_else(|| {
            IdentityError::TokenInvalid(format!("algorithm {:?} is not allowed", token.header.alg))
        })?;
        if alg != key.algorithm() {
            return Err(IdentityError::TokenInvalid(format!(
                "{} token presented to a {} key",
                alg,
                key.algorithm()
            )));
        }

        let (signing_input, _) = compact
            .rsplit_once('.')
            .ok_or_else(|| IdentityError::MalformedToken("missing signature".to_string()))?;
        key.verify(signing_input.as_bytes(), &token.signature)
            .map_err(|e| IdentityError::TokenInvalid(e.to_string()))?;

        token.state = TrustState::Verified;
        Ok(token)
    }
}
