use log::debug;
use ring::signature::{UnparsedPublicKey, ECDSA_P256_SHA256_ASN1};
use rsa::pkcs1v15::{Signature as RsaSignature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::Sha256;
use x509_parser::prelude::{FromDer, SubjectPublicKeyInfo};

use super::{digest_sha256, DigestAlgorithm, KeyType, SecurityError};

const RSA_ENCRYPTION_OID: &str = "1.2.840.113549.1.1.1";
const EC_PUBLIC_KEY_OID: &str = "1.2.840.10045.2.1";

/// A public key in SubjectPublicKeyInfo DER form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    key_type: KeyType,
    der: Vec<u8>,
    key_bits: Vec<u8>,
}

impl PublicKey {
    /// Parse a SubjectPublicKeyInfo and detect the key type from its algorithm OID
    pub fn from_der(der: &[u8]) -> Result<Self, SecurityError> {
        let (rest, spki) = SubjectPublicKeyInfo::from_der(der)
            .map_err(|e| SecurityError::UnrecognizedKeyFormat(e.to_string()))?;
        if !rest.is_empty() {
            return Err(SecurityError::UnrecognizedKeyFormat(format!(
                "{} bytes after SubjectPublicKeyInfo",
                rest.len()
            )));
        }

        let oid = spki.algorithm.algorithm.to_id_string();
        let key_type = match oid.as_str() {
            RSA_ENCRYPTION_OID => KeyType::Rsa,
            EC_PUBLIC_KEY_OID => KeyType::Ecdsa,
            other => return Err(SecurityError::UnrecognizedKeyFormat(format!("algorithm OID {}", other))),
        };

        Ok(Self {
            key_type,
            der: der.to_vec(),
            key_bits: spki.subject_public_key.data.to_vec(),
        })
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Digest of the DER encoding, as used in KeyLocatorDigest
    pub fn digest(&self, algorithm: DigestAlgorithm) -> Vec<u8> {
        match algorithm {
            DigestAlgorithm::Sha256 => digest_sha256(&self.der).to_vec(),
        }
    }

    /// Verify a SHA-256 signature over `message`
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self.key_type {
            KeyType::Rsa => self.verify_rsa(message, signature),
            KeyType::Ecdsa => UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, &self.key_bits)
                .verify(message, signature)
                .is_ok(),
            KeyType::Hmac => false,
        }
    }

    fn verify_rsa(&self, message: &[u8], signature: &[u8]) -> bool {
        let key = match RsaPublicKey::from_public_key_der(&self.der) {
            Ok(key) => key,
            Err(e) => {
                debug!("Cannot load RSA public key: {}", e);
                return false;
            }
        };
        let signature = match RsaSignature::try_from(signature) {
            Ok(signature) => signature,
            Err(_) => return false,
        };
        VerifyingKey::<Sha256>::new(key).verify(message, &signature).is_ok()
    }
}
