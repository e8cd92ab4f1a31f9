use chrono::{DateTime, NaiveDateTime, Utc};

use crate::change_counter::{ChangeCount, Version};
use crate::name::Name;
use crate::tlv::{tlv_types, DecodingError, EncodingError, TlvDecoder};

const VALIDITY_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// SignatureType codes carried in SignatureInfo
pub mod signature_types {
    pub const DIGEST_SHA256: u64 = 0;
    pub const SHA256_WITH_RSA: u64 = 1;
    pub const SHA256_WITH_ECDSA: u64 = 3;
    pub const HMAC_WITH_SHA256: u64 = 4;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum KeyLocatorType {
    #[default]
    None,
    KeyName(Name),
    KeyDigest(Vec<u8>),
}

/// Identifies the key or certificate that verifies a signature
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyLocator {
    locator: KeyLocatorType,
    version: Version,
}

impl KeyLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_key_name(name: Name) -> Self {
        Self {
            locator: KeyLocatorType::KeyName(name),
            version: Version::default(),
        }
    }

    pub fn from_key_digest(digest: impl Into<Vec<u8>>) -> Self {
        Self {
            locator: KeyLocatorType::KeyDigest(digest.into()),
            version: Version::default(),
        }
    }

    pub fn locator(&self) -> &KeyLocatorType {
        &self.locator
    }

    pub fn is_none(&self) -> bool {
        self.locator == KeyLocatorType::None
    }

    pub fn key_name(&self) -> Option<&Name> {
        match &self.locator {
            KeyLocatorType::KeyName(name) => Some(name),
            _ => None,
        }
    }

    pub fn key_name_mut(&mut self) -> Option<&mut Name> {
        match &mut self.locator {
            KeyLocatorType::KeyName(name) => Some(name),
            _ => None,
        }
    }

    pub fn key_digest(&self) -> Option<&[u8]> {
        match &self.locator {
            KeyLocatorType::KeyDigest(digest) => Some(digest),
            _ => None,
        }
    }

    pub fn set_key_name(&mut self, name: Name) -> &mut Self {
        self.replace(KeyLocatorType::KeyName(name))
    }

    pub fn set_key_digest(&mut self, digest: impl Into<Vec<u8>>) -> &mut Self {
        self.replace(KeyLocatorType::KeyDigest(digest.into()))
    }

    pub fn clear(&mut self) -> &mut Self {
        self.replace(KeyLocatorType::None)
    }

    fn replace(&mut self, locator: KeyLocatorType) -> &mut Self {
        let total = self.change_count();
        self.locator = locator;
        self.version.bump_past(total);
        self
    }
}

impl ChangeCount for KeyLocator {
    fn change_count(&self) -> u64 {
        let name_count = self.key_name().map(|name| name.change_count()).unwrap_or(0);
        self.version.get() + name_count
    }
}

/// Certificate validity window carried in SignatureInfo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidityPeriod {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl ValidityPeriod {
    pub fn new(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        Self { not_before, not_after }
    }

    pub fn is_valid_at(&self, time: DateTime<Utc>) -> bool {
        self.not_before <= time && time <= self.not_after
    }

    pub(crate) fn format_time(time: &DateTime<Utc>) -> String {
        time.format(VALIDITY_TIME_FORMAT).to_string()
    }

    pub(crate) fn parse_time(value: &[u8]) -> Result<DateTime<Utc>, DecodingError> {
        let text = std::str::from_utf8(value)
            .map_err(|_| DecodingError::InvalidValue("validity time is not UTF-8".to_string()))?;
        NaiveDateTime::parse_from_str(text, VALIDITY_TIME_FORMAT)
            .map(|time| time.and_utc())
            .map_err(|e| DecodingError::InvalidValue(format!("validity time {:?}: {}", text, e)))
    }
}

/// Fields shared by the signature types this library can produce and check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureBody {
    key_locator: KeyLocator,
    validity_period: Option<ValidityPeriod>,
    value: Vec<u8>,
    version: Version,
}

impl SignatureBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_locator(key_locator: KeyLocator) -> Self {
        Self {
            key_locator,
            ..Self::default()
        }
    }

    pub fn key_locator(&self) -> &KeyLocator {
        &self.key_locator
    }

    pub fn key_locator_mut(&mut self) -> &mut KeyLocator {
        &mut self.key_locator
    }

    pub fn set_key_locator(&mut self, key_locator: KeyLocator) -> &mut Self {
        let total = self.change_count();
        self.key_locator = key_locator;
        self.version.bump_past(total);
        self
    }

    pub fn validity_period(&self) -> Option<&ValidityPeriod> {
        self.validity_period.as_ref()
    }

    pub fn set_validity_period(&mut self, validity_period: Option<ValidityPeriod>) -> &mut Self {
        self.validity_period = validity_period;
        self.version.bump();
        self
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<Vec<u8>>) -> &mut Self {
        self.value = value.into();
        self.version.bump();
        self
    }
}

impl ChangeCount for SignatureBody {
    fn change_count(&self) -> u64 {
        self.version.get() + self.key_locator.change_count()
    }
}

/// A signature of a type this library does not interpret.
///
/// The SignatureInfo block is kept verbatim and re-emitted on encode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericSignature {
    info_encoding: Vec<u8>,
    type_code: Option<u64>,
    value: Vec<u8>,
    version: Version,
}

impl GenericSignature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full SignatureInfo TLV, header included
    pub fn info_encoding(&self) -> &[u8] {
        &self.info_encoding
    }

    /// SignatureType read from the info encoding, if it had one when decoded
    pub fn type_code(&self) -> Option<u64> {
        self.type_code
    }

    pub fn set_info_encoding(&mut self, info_encoding: impl Into<Vec<u8>>, type_code: Option<u64>) -> &mut Self {
        self.info_encoding = info_encoding.into();
        self.type_code = type_code;
        self.version.bump();
        self
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<Vec<u8>>) -> &mut Self {
        self.value = value.into();
        self.version.bump();
        self
    }

    /// Check the info encoding is a well-formed SignatureInfo and return its SignatureType
    pub fn validate_info_encoding(&self) -> Result<u64, EncodingError> {
        let invalid = |e: DecodingError| EncodingError::InvalidSignatureInfo(e.to_string());

        let mut decoder = TlvDecoder::new(&self.info_encoding);
        let end = decoder.read_nested_tlvs_start(tlv_types::SIGNATURE_INFO).map_err(invalid)?;
        let type_code = decoder
            .read_non_negative_integer_tlv(tlv_types::SIGNATURE_TYPE)
            .map_err(invalid)?;
        while decoder.offset() < end {
            decoder.read_any_tlv().map_err(invalid)?;
        }
        decoder.finish_nested_tlvs(end).map_err(invalid)?;
        decoder.finish().map_err(invalid)?;
        Ok(type_code)
    }
}

impl ChangeCount for GenericSignature {
    fn change_count(&self) -> u64 {
        self.version.get()
    }
}

/// A packet signature, tagged by its SignatureType
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    DigestSha256(SignatureBody),
    Sha256WithRsa(SignatureBody),
    Sha256WithEcdsa(SignatureBody),
    HmacWithSha256(SignatureBody),
    Generic(GenericSignature),
}

impl Signature {
    pub fn digest_sha256() -> Self {
        Signature::DigestSha256(SignatureBody::new())
    }

    pub fn sha256_with_rsa(key_locator: KeyLocator) -> Self {
        Signature::Sha256WithRsa(SignatureBody::with_key_locator(key_locator))
    }

    pub fn sha256_with_ecdsa(key_locator: KeyLocator) -> Self {
        Signature::Sha256WithEcdsa(SignatureBody::with_key_locator(key_locator))
    }

    pub fn hmac_with_sha256(key_locator: KeyLocator) -> Self {
        Signature::HmacWithSha256(SignatureBody::with_key_locator(key_locator))
    }

    /// The SignatureType code, `None` for a generic signature without one
    pub fn type_code(&self) -> Option<u64> {
        match self {
            Signature::DigestSha256(_) => Some(signature_types::DIGEST_SHA256),
            Signature::Sha256WithRsa(_) => Some(signature_types::SHA256_WITH_RSA),
            Signature::Sha256WithEcdsa(_) => Some(signature_types::SHA256_WITH_ECDSA),
            Signature::HmacWithSha256(_) => Some(signature_types::HMAC_WITH_SHA256),
            Signature::Generic(generic) => generic.type_code(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Signature::DigestSha256(_) => "DigestSha256",
            Signature::Sha256WithRsa(_) => "Sha256WithRsa",
            Signature::Sha256WithEcdsa(_) => "Sha256WithEcdsa",
            Signature::HmacWithSha256(_) => "HmacWithSha256",
            Signature::Generic(_) => "Generic",
        }
    }

    pub fn body(&self) -> Option<&SignatureBody> {
        match self {
            Signature::DigestSha256(body)
            | Signature::Sha256WithRsa(body)
            | Signature::Sha256WithEcdsa(body)
            | Signature::HmacWithSha256(body) => Some(body),
            Signature::Generic(_) => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut SignatureBody> {
        match self {
            Signature::DigestSha256(body)
            | Signature::Sha256WithRsa(body)
            | Signature::Sha256WithEcdsa(body)
            | Signature::HmacWithSha256(body) => Some(body),
            Signature::Generic(_) => None,
        }
    }

    /// The KeyLocator of a keyed signature
    pub fn key_locator(&self) -> Option<&KeyLocator> {
        match self {
            Signature::Sha256WithRsa(body)
            | Signature::Sha256WithEcdsa(body)
            | Signature::HmacWithSha256(body) => Some(body.key_locator()),
            Signature::DigestSha256(_) | Signature::Generic(_) => None,
        }
    }

    pub fn value(&self) -> &[u8] {
        match self {
            Signature::Generic(generic) => generic.value(),
            _ => self.body().map(|body| body.value()).unwrap_or_default(),
        }
    }

    pub fn set_value(&mut self, value: impl Into<Vec<u8>>) {
        match self {
            Signature::Generic(generic) => {
                generic.set_value(value);
            }
            Signature::DigestSha256(body)
            | Signature::Sha256WithRsa(body)
            | Signature::Sha256WithEcdsa(body)
            | Signature::HmacWithSha256(body) => {
                body.set_value(value);
            }
        }
    }
}

impl Default for Signature {
    fn default() -> Self {
        Signature::Sha256WithRsa(SignatureBody::new())
    }
}

impl ChangeCount for Signature {
    fn change_count(&self) -> u64 {
        match self {
            Signature::Generic(generic) => generic.change_count(),
            Signature::DigestSha256(body)
            | Signature::Sha256WithRsa(body)
            | Signature::Sha256WithEcdsa(body)
            | Signature::HmacWithSha256(body) => body.change_count(),
        }
    }
}
