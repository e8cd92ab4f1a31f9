//! Signing and verification.
//!
//! `KeyChain` signs packets with keys held by a `KeyStore`. `Validator`
//! decides whether a received Data is trusted, asking its caller to fetch
//! certificates it does not have yet.

pub mod key_chain;
pub mod key_store;
pub mod public_key;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_keys;

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::name::Name;
use crate::signature::Signature;
use crate::tlv::{DecodingError, EncodingError};

pub use key_chain::KeyChain;
pub use key_store::{KeyStore, MemoryKeyStore};
pub use public_key::PublicKey;
pub use validator::{CertificateRequest, TrustPolicy, ValidationFailure, ValidationOutcome, Validator};

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("Unrecognized key format: {0}")]
    UnrecognizedKeyFormat(String),
    #[error("Unrecognized digest algorithm: {0}")]
    UnrecognizedDigestAlgorithm(String),
    #[error("Key not found: {0}")]
    KeyNotFound(Name),
    #[error("Key already exists: {0}")]
    KeyAlreadyExists(Name),
    #[error("Not a certificate name: {0}")]
    InvalidCertificateName(Name),
    #[error("{key_type} keys cannot produce this signature")]
    UnsupportedKeyType { key_type: KeyType },
    #[error("Signing failed: {0}")]
    SigningFailed(String),
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Decoding error: {0}")]
    Decoding(#[from] DecodingError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha256,
}

impl FromStr for DigestAlgorithm {
    type Err = SecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            _ => Err(SecurityError::UnrecognizedDigestAlgorithm(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Rsa,
    Ecdsa,
    Hmac,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Rsa => write!(f, "RSA"),
            KeyType::Ecdsa => write!(f, "ECDSA"),
            KeyType::Hmac => write!(f, "HMAC"),
        }
    }
}

/// Which half of a key a store is asked about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyClass {
    Public,
    Private,
    Symmetric,
}

pub fn digest_sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Check `signature` over `signed_portion` with `key`.
///
/// DigestSha256 signatures need no key and are checked against the digest
/// of the signed portion. HMAC signatures need the shared secret and always
/// fail here; see `KeyChain::verify_data_with_hmac`.
pub fn verify_signature(signed_portion: &[u8], signature: &Signature, key: &PublicKey) -> bool {
    match signature {
        Signature::DigestSha256(body) => verify_digest_sha256(signed_portion, body.value()),
        Signature::Sha256WithRsa(body) if key.key_type() == KeyType::Rsa => {
            key.verify(signed_portion, body.value())
        }
        Signature::Sha256WithEcdsa(body) if key.key_type() == KeyType::Ecdsa => {
            key.verify(signed_portion, body.value())
        }
        _ => false,
    }
}

pub fn verify_digest_sha256(signed_portion: &[u8], value: &[u8]) -> bool {
    digest_sha256(signed_portion).as_slice() == value
}
