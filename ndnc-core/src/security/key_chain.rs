use std::time::Duration;

use log::debug;
use ring::hmac;

use super::{verify_signature, DigestAlgorithm, KeyStore, KeyType, PublicKey, SecurityError};
use crate::encoding::{default_wire_format, SignedBlob, WireFormat};
use crate::name::{Name, NameComponent};
use crate::packets::{ContentType, Data, Interest};
use crate::signature::{KeyLocator, Signature};

const KEY_COMPONENT: &[u8] = b"KEY";
const ID_CERT_COMPONENT: &[u8] = b"ID-CERT";

/// Freshness of self-signed certificates
const CERTIFICATE_FRESHNESS: Duration = Duration::from_secs(3600);

/// Map `/id/KEY/key1/ID-CERT[/version]` to the key name `/id/key1`
pub fn certificate_name_to_key_name(certificate_name: &Name) -> Result<Name, SecurityError> {
    let components = certificate_name.components();
    let key_index = components
        .iter()
        .position(|component| component.value() == KEY_COMPONENT);
    let id_cert_index = components
        .iter()
        .rposition(|component| component.value() == ID_CERT_COMPONENT);

    match (key_index, id_cert_index) {
        (Some(key_index), Some(id_cert_index)) if key_index < id_cert_index => {
            let mut key_name = certificate_name.get_sub_name(0, key_index);
            key_name.append_name(&certificate_name.get_sub_name(key_index + 1, id_cert_index - key_index - 1));
            Ok(key_name)
        }
        _ => Err(SecurityError::InvalidCertificateName(certificate_name.clone())),
    }
}

/// Map the key name `/id/key1` to the unversioned certificate name `/id/KEY/key1/ID-CERT`
pub fn key_name_to_certificate_name(key_name: &Name) -> Result<Name, SecurityError> {
    let key_id = key_name
        .get(-1)
        .ok_or_else(|| SecurityError::InvalidCertificateName(key_name.clone()))?;
    let mut certificate_name = key_name.get_prefix(-1);
    certificate_name
        .append(KEY_COMPONENT)
        .append_component(key_id.clone())
        .append(ID_CERT_COMPONENT);
    Ok(certificate_name)
}

/// Signs packets with the keys of a `KeyStore`
pub struct KeyChain {
    key_store: Box<dyn KeyStore + Send>,
}

impl std::fmt::Debug for KeyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyChain").finish_non_exhaustive()
    }
}

impl KeyChain {
    pub fn new(key_store: impl KeyStore + Send + 'static) -> Self {
        Self {
            key_store: Box::new(key_store),
        }
    }

    pub fn key_store(&self) -> &dyn KeyStore {
        self.key_store.as_ref()
    }

    /// A signature with an empty value, typed after the key behind `certificate_name`
    fn signature_for_certificate(&self, certificate_name: &Name) -> Result<(Name, Signature), SecurityError> {
        let key_name = certificate_name_to_key_name(certificate_name)?;
        // The KeyLocator names the certificate without its version
        let key_locator = KeyLocator::from_key_name(match certificate_name.get(-1) {
            Some(last) if last.value() == ID_CERT_COMPONENT => certificate_name.clone(),
            _ => certificate_name.get_prefix(-1),
        });

        let signature = match self.key_store.key_type(&key_name)? {
            KeyType::Rsa => Signature::sha256_with_rsa(key_locator),
            KeyType::Ecdsa => Signature::sha256_with_ecdsa(key_locator),
            key_type @ KeyType::Hmac => return Err(SecurityError::UnsupportedKeyType { key_type }),
        };
        Ok((key_name, signature))
    }

    /// Sign `data` with the key behind `certificate_name`, using the default wire format
    pub fn sign_data(&self, data: &mut Data, certificate_name: &Name) -> Result<(), SecurityError> {
        self.sign_data_with_format(data, certificate_name, default_wire_format())
    }

    pub fn sign_data_with_format(
        &self,
        data: &mut Data,
        certificate_name: &Name,
        format: &dyn WireFormat,
    ) -> Result<(), SecurityError> {
        let (key_name, signature) = self.signature_for_certificate(certificate_name)?;
        data.set_signature(signature);

        // The signed portion stops before SignatureValue, so the empty placeholder does not matter
        let encoding = data.wire_encode_with(format)?;
        let value = self
            .key_store
            .sign(encoding.signed_portion(), &key_name, DigestAlgorithm::Sha256)?;
        data.signature_mut().set_value(value);
        data.wire_encode_with(format)?;

        debug!("Signed Data {} with {}", data.name(), key_name);
        Ok(())
    }

    /// Append SignatureInfo and SignatureValue name components to `interest`
    pub fn sign_interest(&self, interest: &mut Interest, certificate_name: &Name) -> Result<(), SecurityError> {
        self.sign_interest_with_format(interest, certificate_name, default_wire_format())
    }

    pub fn sign_interest_with_format(
        &self,
        interest: &mut Interest,
        certificate_name: &Name,
        format: &dyn WireFormat,
    ) -> Result<(), SecurityError> {
        let (key_name, mut signature) = self.signature_for_certificate(certificate_name)?;

        interest.name_mut().append(format.encode_signature_info(&signature)?);
        interest.name_mut().append(format.encode_signature_value(&signature)?);
        let encoding = interest.wire_encode_with(format)?;
        let value = self
            .key_store
            .sign(encoding.signed_portion(), &key_name, DigestAlgorithm::Sha256)?;

        signature.set_value(value);
        interest.name_mut().pop();
        interest.name_mut().append(format.encode_signature_value(&signature)?);
        interest.wire_encode_with(format)?;

        debug!("Signed Interest {} with {}", interest.name(), key_name);
        Ok(())
    }

    /// Sign `data` with a DigestSha256 signature, which proves integrity only
    pub fn sign_data_with_sha256(&self, data: &mut Data) -> Result<(), SecurityError> {
        data.set_signature(Signature::digest_sha256());
        let encoding = data.wire_encode()?;
        let digest = super::digest_sha256(encoding.signed_portion());
        data.signature_mut().set_value(digest.to_vec());
        data.wire_encode()?;
        Ok(())
    }

    /// Sign `data` with HmacWithSha256 using `key`, naming `key_name` in the KeyLocator
    pub fn sign_data_with_hmac(data: &mut Data, key: &[u8], key_name: &Name) -> Result<(), SecurityError> {
        data.set_signature(Signature::hmac_with_sha256(KeyLocator::from_key_name(key_name.clone())));
        let encoding = data.wire_encode()?;
        let tag = hmac::sign(&hmac::Key::new(hmac::HMAC_SHA256, key), encoding.signed_portion());
        data.signature_mut().set_value(tag.as_ref().to_vec());
        data.wire_encode()?;
        Ok(())
    }

    /// Check an HmacWithSha256 signature on `data` against the shared `key`
    pub fn verify_data_with_hmac(data: &Data, key: &[u8]) -> bool {
        let Signature::HmacWithSha256(body) = data.signature() else {
            return false;
        };
        let Some(encoding) = signed_encoding(data) else {
            return false;
        };
        hmac::verify(&hmac::Key::new(hmac::HMAC_SHA256, key), encoding.signed_portion(), body.value()).is_ok()
    }

    /// Check a signed Interest with a public key from this key chain's store
    pub fn verify_interest(&self, interest: &Interest) -> Result<bool, SecurityError> {
        let signature = interest_signature(interest, default_wire_format())?;
        let key_name = match signature.key_locator().and_then(|locator| locator.key_name()) {
            Some(locator_name) => certificate_name_to_key_name(locator_name)?,
            None => return Ok(false),
        };
        let public_key = self.key_store.get_public_key(&key_name)?;
        let encoding = default_wire_format().encode_interest(interest)?;
        Ok(verify_signature(encoding.signed_portion(), &signature, &public_key))
    }

    /// Build a certificate for `key_name` signed by its own key.
    ///
    /// The certificate is named `/id/KEY/key1/ID-CERT/<version>` and its
    /// content is the public key DER.
    pub fn self_sign(&self, key_name: &Name, version: u64) -> Result<Data, SecurityError> {
        let public_key: PublicKey = self.key_store.get_public_key(key_name)?;
        let mut certificate_name = key_name_to_certificate_name(key_name)?;
        certificate_name.append_component(NameComponent::from_version(version));

        let mut certificate = Data::new(certificate_name.clone());
        certificate
            .meta_info_mut()
            .set_content_type(ContentType::Key)
            .set_freshness_period(Some(CERTIFICATE_FRESHNESS));
        certificate.set_content(public_key.der().to_vec());
        self.sign_data(&mut certificate, &certificate_name)?;
        Ok(certificate)
    }
}

/// The encoding a signature over `data` covers: the received or last encoded
/// bytes if current, else a fresh encoding with the default wire format
pub(crate) fn signed_encoding(data: &Data) -> Option<SignedBlob> {
    match data.wire_encoding() {
        Some(encoding) => Some(encoding.clone()),
        None => default_wire_format().encode_data(data).ok(),
    }
}

/// Decode the signature carried in the last two name components of a signed Interest
pub fn interest_signature(interest: &Interest, format: &dyn WireFormat) -> Result<Signature, SecurityError> {
    let name = interest.name();
    match (name.get(-2), name.get(-1)) {
        (Some(info), Some(value)) => Ok(format.decode_signature_info_and_value(info.value(), value.value())?),
        _ => Err(SecurityError::Decoding(crate::tlv::DecodingError::InvalidValue(
            "signed Interest needs SignatureInfo and SignatureValue components".to_string(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{test_keys, MemoryKeyStore};

    fn rsa_key_chain() -> (KeyChain, Name) {
        let key_name = Name::from_uri("/id/key1").unwrap();
        let mut store = MemoryKeyStore::new();
        store
            .add_rsa_key_pair(key_name, &test_keys::rsa_public_key_der(), &test_keys::rsa_private_key_der())
            .unwrap();
        (KeyChain::new(store), Name::from_uri("/id/KEY/key1/ID-CERT/0").unwrap())
    }

    #[test]
    fn test_certificate_name_mapping() {
        let certificate_name = Name::from_uri("/id/KEY/key1/ID-CERT/0").unwrap();
        let key_name = certificate_name_to_key_name(&certificate_name).unwrap();
        assert_eq!(key_name.to_uri(), "/id/key1");
        assert_eq!(
            key_name_to_certificate_name(&key_name).unwrap().to_uri(),
            "/id/KEY/key1/ID-CERT"
        );

        let nested = Name::from_uri("/a/b/KEY/c/d/ID-CERT").unwrap();
        assert_eq!(certificate_name_to_key_name(&nested).unwrap().to_uri(), "/a/b/c/d");
        assert!(certificate_name_to_key_name(&Name::from_uri("/no/markers").unwrap()).is_err());
    }

    #[test]
    fn test_rsa_sign_and_verify_data() {
        let (key_chain, certificate_name) = rsa_key_chain();
        let mut data = Data::new(Name::from_uri("/a/b").unwrap());
        data.set_content(b"payload".to_vec());
        key_chain.sign_data(&mut data, &certificate_name).unwrap();

        assert_eq!(data.signature().type_code(), Some(1));
        assert_eq!(
            data.signature().key_locator().and_then(|locator| locator.key_name()).map(|name| name.to_uri()),
            Some("/id/KEY/key1/ID-CERT".to_string())
        );

        let public_key = key_chain.key_store().get_public_key(&Name::from_uri("/id/key1").unwrap()).unwrap();
        let encoding = data.wire_encode().unwrap();
        assert!(verify_signature(encoding.signed_portion(), data.signature(), &public_key));

        // Flip one content bit in the wire encoding
        let mut tampered = encoding.bytes().to_vec();
        let content_offset = tampered.windows(7).position(|window| window == b"payload").unwrap();
        tampered[content_offset] ^= 0x01;
        let tampered = Data::wire_decode(&tampered).unwrap();
        let tampered_encoding = signed_encoding(&tampered).unwrap();
        assert!(!verify_signature(
            tampered_encoding.signed_portion(),
            tampered.signature(),
            &public_key
        ));
    }

    #[test]
    fn test_signing_is_repeatable_for_unchanged_data() {
        let (key_chain, certificate_name) = rsa_key_chain();
        let mut data = Data::new(Name::from_uri("/a/b").unwrap());
        key_chain.sign_data(&mut data, &certificate_name).unwrap();
        let first = data.wire_encode().unwrap();
        key_chain.sign_data(&mut data, &certificate_name).unwrap();
        // PKCS#1 v1.5 is deterministic
        assert_eq!(data.wire_encode().unwrap(), first);
    }

    #[test]
    fn test_sign_and_verify_interest() {
        let (key_chain, certificate_name) = rsa_key_chain();
        let mut interest = Interest::new(Name::from_uri("/command/do").unwrap());
        key_chain.sign_interest(&mut interest, &certificate_name).unwrap();

        assert_eq!(interest.name().len(), 4);
        let signature = interest_signature(&interest, default_wire_format()).unwrap();
        assert_eq!(signature.value().len(), 256);
        assert!(key_chain.verify_interest(&interest).unwrap());

        let mut renamed = interest.clone();
        let mut name = Name::from_uri("/command/undo").unwrap();
        name.append_component(interest.name().get(-2).unwrap().clone());
        name.append_component(interest.name().get(-1).unwrap().clone());
        renamed.set_name(name);
        assert!(!key_chain.verify_interest(&renamed).unwrap());
    }

    #[test]
    fn test_other_keys_do_not_verify() {
        let (key_chain, certificate_name) = rsa_key_chain();
        let mut data = Data::new(Name::from_uri("/a/b").unwrap());
        data.set_content(b"payload".to_vec());
        key_chain.sign_data(&mut data, &certificate_name).unwrap();
        let encoding = data.wire_encode().unwrap();

        let mut others = MemoryKeyStore::new();
        let rsa = others.generate_rsa_key_pair(Name::from_uri("/other/rsa").unwrap(), 1024).unwrap();
        let ecdsa = others.generate_ecdsa_key_pair(Name::from_uri("/other/ecdsa").unwrap()).unwrap();
        for key in [rsa, ecdsa] {
            assert!(!verify_signature(encoding.signed_portion(), data.signature(), &key));
        }
    }

    #[test]
    fn test_interest_with_other_key_does_not_verify() {
        let (key_chain, certificate_name) = rsa_key_chain();
        let mut interest = Interest::new(Name::from_uri("/command/do").unwrap());
        key_chain.sign_interest(&mut interest, &certificate_name).unwrap();

        // Same key name, different key material
        let mut store = MemoryKeyStore::new();
        store.generate_ecdsa_key_pair(Name::from_uri("/id/key1").unwrap()).unwrap();
        let other = KeyChain::new(store);
        assert!(!other.verify_interest(&interest).unwrap());
        assert!(key_chain.verify_interest(&interest).unwrap());
    }

    #[test]
    fn test_sha256_signature() {
        let key_chain = KeyChain::new(MemoryKeyStore::new());
        let mut data = Data::new(Name::from_uri("/digest").unwrap());
        data.set_content(b"x".to_vec());
        key_chain.sign_data_with_sha256(&mut data).unwrap();

        let encoding = data.wire_encode().unwrap();
        assert_eq!(
            data.signature().value(),
            crate::security::digest_sha256(encoding.signed_portion()).as_slice()
        );
    }

    #[test]
    fn test_hmac_sign_and_verify() {
        let key = [0x42u8; 32];
        let mut data = Data::new(Name::from_uri("/hmac/data").unwrap());
        data.set_content(b"secret".to_vec());
        KeyChain::sign_data_with_hmac(&mut data, &key, &Name::from_uri("/hmac/key").unwrap()).unwrap();

        assert!(KeyChain::verify_data_with_hmac(&data, &key));
        assert!(!KeyChain::verify_data_with_hmac(&data, &[0x43u8; 32]));

        data.set_content(b"changed".to_vec());
        assert!(!KeyChain::verify_data_with_hmac(&data, &key));
    }

    #[test]
    fn test_self_signed_certificate() {
        let (key_chain, _) = rsa_key_chain();
        let key_name = Name::from_uri("/id/key1").unwrap();
        let certificate = key_chain.self_sign(&key_name, 0).unwrap();

        assert_eq!(certificate.name().get_prefix(-1).to_uri(), "/id/KEY/key1/ID-CERT");
        assert_eq!(certificate.meta_info().content_type(), ContentType::Key);
        let public_key = PublicKey::from_der(certificate.content()).unwrap();
        let encoding = signed_encoding(&certificate).unwrap();
        assert!(verify_signature(encoding.signed_portion(), certificate.signature(), &public_key));
    }

    #[test]
    fn test_unknown_certificate_fails() {
        let (key_chain, _) = rsa_key_chain();
        let mut data = Data::new(Name::from_uri("/a").unwrap());
        let result = key_chain.sign_data(&mut data, &Name::from_uri("/other/KEY/k/ID-CERT/0").unwrap());
        assert!(matches!(result, Err(SecurityError::KeyNotFound(_))));
    }
}
