use std::collections::HashMap;

use log::{debug, info};
use ring::hmac;
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::RsaPrivateKey;
use sha2::Sha256;

use super::{DigestAlgorithm, KeyClass, KeyType, PublicKey, SecurityError};
use crate::name::Name;

/// DER prefix of a P-256 SubjectPublicKeyInfo, followed by the 65-byte uncompressed point
const P256_SPKI_PREFIX: [u8; 26] = [
    0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x02, 0x01, 0x06, 0x08, 0x2A, 0x86, 0x48,
    0xCE, 0x3D, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00,
];

/// Storage for signing keys, looked up by key name
pub trait KeyStore {
    fn has_key(&self, key_name: &Name, key_class: KeyClass) -> bool;

    fn key_type(&self, key_name: &Name) -> Result<KeyType, SecurityError>;

    fn get_public_key(&self, key_name: &Name) -> Result<PublicKey, SecurityError>;

    /// Sign `data` with the private or symmetric key named `key_name`
    fn sign(&self, data: &[u8], key_name: &Name, digest_algorithm: DigestAlgorithm) -> Result<Vec<u8>, SecurityError>;
}

#[derive(Clone)]
enum PrivateKey {
    Rsa(RsaPrivateKey),
    /// PKCS#8 document; ring key pairs are rebuilt on use
    Ecdsa(Vec<u8>),
}

/// In-memory key store for tests and short-lived applications
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    public_keys: HashMap<Name, PublicKey>,
    private_keys: HashMap<Name, PrivateKey>,
    symmetric_keys: HashMap<Name, Vec<u8>>,
}

impl std::fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.debug_struct("MemoryKeyStore")
            .field("public_keys", &self.public_keys.keys().collect::<Vec<_>>())
            .field("private_keys", &self.private_keys.keys().collect::<Vec<_>>())
            .field("symmetric_keys", &self.symmetric_keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_new(&self, key_name: &Name) -> Result<(), SecurityError> {
        if self.public_keys.contains_key(key_name) || self.symmetric_keys.contains_key(key_name) {
            return Err(SecurityError::KeyAlreadyExists(key_name.clone()));
        }
        Ok(())
    }

    /// Add a public key alone, for verification only
    pub fn add_public_key(&mut self, key_name: Name, public_key_der: &[u8]) -> Result<(), SecurityError> {
        self.check_new(&key_name)?;
        let public_key = PublicKey::from_der(public_key_der)?;
        self.public_keys.insert(key_name, public_key);
        Ok(())
    }

    /// Import an RSA key pair: SubjectPublicKeyInfo DER and PKCS#1 private key DER
    pub fn add_rsa_key_pair(
        &mut self,
        key_name: Name,
        public_key_der: &[u8],
        private_key_der: &[u8],
    ) -> Result<(), SecurityError> {
        self.check_new(&key_name)?;
        let public_key = PublicKey::from_der(public_key_der)?;
        if public_key.key_type() != KeyType::Rsa {
            return Err(SecurityError::UnrecognizedKeyFormat("expected an RSA public key".to_string()));
        }
        let private_key = RsaPrivateKey::from_pkcs1_der(private_key_der)
            .map_err(|e| SecurityError::UnrecognizedKeyFormat(e.to_string()))?;

        debug!("Added RSA key pair {}", key_name);
        self.public_keys.insert(key_name.clone(), public_key);
        self.private_keys.insert(key_name, PrivateKey::Rsa(private_key));
        Ok(())
    }

    pub fn generate_rsa_key_pair(&mut self, key_name: Name, bits: usize) -> Result<PublicKey, SecurityError> {
        self.check_new(&key_name)?;
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| SecurityError::KeyGenerationFailed(e.to_string()))?;
        let public_der = private_key
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| SecurityError::KeyGenerationFailed(e.to_string()))?;
        let public_key = PublicKey::from_der(public_der.as_bytes())?;

        info!("Generated {}-bit RSA key pair {}", bits, key_name);
        self.public_keys.insert(key_name.clone(), public_key.clone());
        self.private_keys.insert(key_name, PrivateKey::Rsa(private_key));
        Ok(public_key)
    }

    /// Import a P-256 ECDSA key pair from a PKCS#8 document
    pub fn add_ecdsa_key_pair(&mut self, key_name: Name, pkcs8: &[u8]) -> Result<PublicKey, SecurityError> {
        self.check_new(&key_name)?;
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8, &SystemRandom::new())
            .map_err(|e| SecurityError::UnrecognizedKeyFormat(e.to_string()))?;

        let mut public_der = P256_SPKI_PREFIX.to_vec();
        public_der.extend_from_slice(key_pair.public_key().as_ref());
        let public_key = PublicKey::from_der(&public_der)?;

        debug!("Added ECDSA key pair {}", key_name);
        self.public_keys.insert(key_name.clone(), public_key.clone());
        self.private_keys.insert(key_name, PrivateKey::Ecdsa(pkcs8.to_vec()));
        Ok(public_key)
    }

    pub fn generate_ecdsa_key_pair(&mut self, key_name: Name) -> Result<PublicKey, SecurityError> {
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &SystemRandom::new())
            .map_err(|e| SecurityError::KeyGenerationFailed(e.to_string()))?;
        info!("Generated ECDSA key pair {}", key_name);
        self.add_ecdsa_key_pair(key_name, pkcs8.as_ref())
    }

    pub fn add_hmac_key(&mut self, key_name: Name, key: impl Into<Vec<u8>>) -> Result<(), SecurityError> {
        self.check_new(&key_name)?;
        self.symmetric_keys.insert(key_name, key.into());
        Ok(())
    }

    pub fn remove_key(&mut self, key_name: &Name) -> bool {
        let public = self.public_keys.remove(key_name).is_some();
        let private = self.private_keys.remove(key_name).is_some();
        let symmetric = self.symmetric_keys.remove(key_name).is_some();
        public || private || symmetric
    }
}

impl KeyStore for MemoryKeyStore {
    fn has_key(&self, key_name: &Name, key_class: KeyClass) -> bool {
        match key_class {
            KeyClass::Public => self.public_keys.contains_key(key_name),
            KeyClass::Private => self.private_keys.contains_key(key_name),
            KeyClass::Symmetric => self.symmetric_keys.contains_key(key_name),
        }
    }

    fn key_type(&self, key_name: &Name) -> Result<KeyType, SecurityError> {
        if self.symmetric_keys.contains_key(key_name) {
            return Ok(KeyType::Hmac);
        }
        self.public_keys
            .get(key_name)
            .map(|key| key.key_type())
            .ok_or_else(|| SecurityError::KeyNotFound(key_name.clone()))
    }

    fn get_public_key(&self, key_name: &Name) -> Result<PublicKey, SecurityError> {
        self.public_keys
            .get(key_name)
            .cloned()
            .ok_or_else(|| SecurityError::KeyNotFound(key_name.clone()))
    }

    fn sign(&self, data: &[u8], key_name: &Name, digest_algorithm: DigestAlgorithm) -> Result<Vec<u8>, SecurityError> {
        let DigestAlgorithm::Sha256 = digest_algorithm;

        if let Some(secret) = self.symmetric_keys.get(key_name) {
            let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
            return Ok(hmac::sign(&key, data).as_ref().to_vec());
        }

        match self.private_keys.get(key_name) {
            Some(PrivateKey::Rsa(private_key)) => {
                let signing_key = SigningKey::<Sha256>::new(private_key.clone());
                let signature = signing_key
                    .try_sign_with_rng(&mut rand::thread_rng(), data)
                    .map_err(|e| SecurityError::SigningFailed(e.to_string()))?;
                Ok(signature.to_vec())
            }
            Some(PrivateKey::Ecdsa(pkcs8)) => {
                let rng = SystemRandom::new();
                let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8, &rng)
                    .map_err(|e| SecurityError::SigningFailed(e.to_string()))?;
                let signature = key_pair
                    .sign(&rng, data)
                    .map_err(|e| SecurityError::SigningFailed(e.to_string()))?;
                Ok(signature.as_ref().to_vec())
            }
            None => Err(SecurityError::KeyNotFound(key_name.clone())),
        }
    }
}
