//! Wire formats for NDN packets.
//!
//! A `WireFormat` turns packets into TLV bytes and back. Encoding and decoding
//! also report the signed portion of the packet, the byte range a signature
//! covers, so signing and verification work on exactly the bytes that travel
//! on the wire.

mod codec;

use std::sync::RwLock;

use log::info;

use crate::control_parameters::ControlParameters;
use crate::lp::LpPacket;
use crate::packets::{Data, Interest};
use crate::signature::Signature;
use crate::tlv::{DecodingError, EncodingError};

use codec::{Revision, TlvCodec};

/// Byte range of a packet covered by its signature
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignedPortion {
    pub begin: usize,
    pub end: usize,
}

impl SignedPortion {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }
}

/// An encoded packet with its signed portion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBlob {
    bytes: Vec<u8>,
    signed_portion: SignedPortion,
}

impl SignedBlob {
    pub fn new(bytes: Vec<u8>, signed_portion: SignedPortion) -> Self {
        Self { bytes, signed_portion }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn signed_portion_begin(&self) -> usize {
        self.signed_portion.begin
    }

    pub fn signed_portion_end(&self) -> usize {
        self.signed_portion.end
    }

    /// The bytes a signature is computed over
    pub fn signed_portion(&self) -> &[u8] {
        &self.bytes[self.signed_portion.begin..self.signed_portion.end]
    }
}

pub trait WireFormat: Send + Sync {
    /// Version string, "0.1" or "0.2"
    fn name(&self) -> &'static str;

    /// Encode an Interest. A random nonce is generated when the Interest has none.
    fn encode_interest(&self, interest: &Interest) -> Result<SignedBlob, EncodingError>;
    fn decode_interest(&self, input: &[u8]) -> Result<(Interest, SignedPortion), DecodingError>;

    /// The nonce `encode_interest` writes for an Interest carrying `nonce`
    fn normalize_nonce(&self, nonce: &[u8]) -> Vec<u8>;

    fn encode_data(&self, data: &Data) -> Result<SignedBlob, EncodingError>;
    fn decode_data(&self, input: &[u8]) -> Result<(Data, SignedPortion), DecodingError>;

    fn encode_control_parameters(&self, parameters: &ControlParameters) -> Result<Vec<u8>, EncodingError>;
    fn decode_control_parameters(&self, input: &[u8]) -> Result<ControlParameters, DecodingError>;

    /// Encode the SignatureInfo TLV alone, used for signed Interest name components
    fn encode_signature_info(&self, signature: &Signature) -> Result<Vec<u8>, EncodingError>;
    fn encode_signature_value(&self, signature: &Signature) -> Result<Vec<u8>, EncodingError>;
    fn decode_signature_info_and_value(&self, info: &[u8], value: &[u8]) -> Result<Signature, DecodingError>;

    fn encode_lp_packet(&self, packet: &LpPacket) -> Result<Vec<u8>, EncodingError>;
    fn decode_lp_packet(&self, input: &[u8]) -> Result<LpPacket, DecodingError>;
}

/// NDN-TLV packet format 0.1a2: carries Interest Scope, strict decoding
#[derive(Debug, Clone, Copy, Default)]
pub struct Tlv0_1WireFormat;

/// NDN-TLV packet format 0.2: 4-byte nonces, ValidityPeriod, skips unknown non-critical elements
#[derive(Debug, Clone, Copy, Default)]
pub struct Tlv0_2WireFormat;

const CODEC_0_1: TlvCodec = TlvCodec::new(Revision::V0_1);
const CODEC_0_2: TlvCodec = TlvCodec::new(Revision::V0_2);

impl WireFormat for Tlv0_1WireFormat {
    fn name(&self) -> &'static str {
        "0.1"
    }

    fn encode_interest(&self, interest: &Interest) -> Result<SignedBlob, EncodingError> {
        CODEC_0_1.encode_interest(interest)
    }

    fn decode_interest(&self, input: &[u8]) -> Result<(Interest, SignedPortion), DecodingError> {
        CODEC_0_1.decode_interest(input)
    }

    fn normalize_nonce(&self, nonce: &[u8]) -> Vec<u8> {
        CODEC_0_1.normalize_nonce(nonce)
    }

    fn encode_data(&self, data: &Data) -> Result<SignedBlob, EncodingError> {
        CODEC_0_1.encode_data(data)
    }

    fn decode_data(&self, input: &[u8]) -> Result<(Data, SignedPortion), DecodingError> {
        CODEC_0_1.decode_data(input)
    }

    fn encode_control_parameters(&self, parameters: &ControlParameters) -> Result<Vec<u8>, EncodingError> {
        CODEC_0_1.encode_control_parameters(parameters)
    }

    fn decode_control_parameters(&self, input: &[u8]) -> Result<ControlParameters, DecodingError> {
        CODEC_0_1.decode_control_parameters(input)
    }

    fn encode_signature_info(&self, signature: &Signature) -> Result<Vec<u8>, EncodingError> {
        CODEC_0_1.encode_signature_info(signature)
    }

    fn encode_signature_value(&self, signature: &Signature) -> Result<Vec<u8>, EncodingError> {
        CODEC_0_1.encode_signature_value(signature)
    }

    fn decode_signature_info_and_value(&self, info: &[u8], value: &[u8]) -> Result<Signature, DecodingError> {
        CODEC_0_1.decode_signature_info_and_value(info, value)
    }

    fn encode_lp_packet(&self, packet: &LpPacket) -> Result<Vec<u8>, EncodingError> {
        CODEC_0_1.encode_lp_packet(packet)
    }

    fn decode_lp_packet(&self, input: &[u8]) -> Result<LpPacket, DecodingError> {
        CODEC_0_1.decode_lp_packet(input)
    }
}

impl WireFormat for Tlv0_2WireFormat {
    fn name(&self) -> &'static str {
        "0.2"
    }

    fn encode_interest(&self, interest: &Interest) -> Result<SignedBlob, EncodingError> {
        CODEC_0_2.encode_interest(interest)
    }

    fn decode_interest(&self, input: &[u8]) -> Result<(Interest, SignedPortion), DecodingError> {
        CODEC_0_2.decode_interest(input)
    }

    fn normalize_nonce(&self, nonce: &[u8]) -> Vec<u8> {
        CODEC_0_2.normalize_nonce(nonce)
    }

    fn encode_data(&self, data: &Data) -> Result<SignedBlob, EncodingError> {
        CODEC_0_2.encode_data(data)
    }

    fn decode_data(&self, input: &[u8]) -> Result<(Data, SignedPortion), DecodingError> {
        CODEC_0_2.decode_data(input)
    }

    fn encode_control_parameters(&self, parameters: &ControlParameters) -> Result<Vec<u8>, EncodingError> {
        CODEC_0_2.encode_control_parameters(parameters)
    }

    fn decode_control_parameters(&self, input: &[u8]) -> Result<ControlParameters, DecodingError> {
        CODEC_0_2.decode_control_parameters(input)
    }

    fn encode_signature_info(&self, signature: &Signature) -> Result<Vec<u8>, EncodingError> {
        CODEC_0_2.encode_signature_info(signature)
    }

    fn encode_signature_value(&self, signature: &Signature) -> Result<Vec<u8>, EncodingError> {
        CODEC_0_2.encode_signature_value(signature)
    }

    fn decode_signature_info_and_value(&self, info: &[u8], value: &[u8]) -> Result<Signature, DecodingError> {
        CODEC_0_2.decode_signature_info_and_value(info, value)
    }

    fn encode_lp_packet(&self, packet: &LpPacket) -> Result<Vec<u8>, EncodingError> {
        CODEC_0_2.encode_lp_packet(packet)
    }

    fn decode_lp_packet(&self, input: &[u8]) -> Result<LpPacket, DecodingError> {
        CODEC_0_2.decode_lp_packet(input)
    }
}

static TLV_0_1: Tlv0_1WireFormat = Tlv0_1WireFormat;
static TLV_0_2: Tlv0_2WireFormat = Tlv0_2WireFormat;

static DEFAULT_WIRE_FORMAT: RwLock<Option<&'static dyn WireFormat>> = RwLock::new(None);

/// The process-wide wire format used when a call does not name one
pub fn default_wire_format() -> &'static dyn WireFormat {
    let current = *DEFAULT_WIRE_FORMAT
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    current.unwrap_or(&TLV_0_2)
}

pub fn set_default_wire_format(format: &'static dyn WireFormat) {
    info!("Default wire format set to {}", format.name());
    *DEFAULT_WIRE_FORMAT
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(format);
}

/// Look up a built-in wire format by version string
pub fn wire_format_by_name(name: &str) -> Option<&'static dyn WireFormat> {
    match name {
        "0.1" => Some(&TLV_0_1),
        "0.2" => Some(&TLV_0_2),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use super::*;
    use crate::lp::{LpHeaderField, NackReason, NetworkNack};
    use crate::name::{Name, NameComponent};
    use crate::packets::{ContentType, Exclude};
    use crate::signature::{KeyLocator, ValidityPeriod};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    /// A Data packet captured from the NDN-CCL test suite, name /ndn/abc,
    /// content "SUCCESS!", signed with Sha256WithRsa
    pub(crate) const CODED_DATA: [u8; 208] = [
        0x06, 0xCE, // NDN Data
        0x07, 0x0A, 0x08, 0x03, 0x6E, 0x64, 0x6E, 0x08, 0x03, 0x61, 0x62, 0x63, // Name
        0x14, 0x0A, // MetaInfo
        0x19, 0x02, 0x13, 0x88, // FreshnessPeriod
        0x1A, 0x04, // FinalBlockId
        0x08, 0x02, 0x00, 0x09, // NameComponent
        0x15, 0x08, 0x53, 0x55, 0x43, 0x43, 0x45, 0x53, 0x53, 0x21, // Content
        0x16, 0x28, // SignatureInfo
        0x1B, 0x01, 0x01, // SignatureType
        0x1C, 0x23, // KeyLocator
        0x07, 0x21, 0x08, 0x08, 0x74, 0x65, 0x73, 0x74, 0x6E, 0x61, 0x6D, 0x65, 0x08, 0x03, 0x4B, 0x45, 0x59, 0x08,
        0x07, 0x44, 0x53, 0x4B, 0x2D, 0x31, 0x32, 0x33, 0x08, 0x07, 0x49, 0x44, 0x2D, 0x43, 0x45, 0x52, 0x54,
        0x17, 0x80, // SignatureValue
        0x1A, 0x03, 0xC3, 0x9C, 0x4F, 0xC5, 0x5C, 0x36, 0xA2, 0xE7, 0x9C, 0xEE, 0x52, 0xFE, 0x45, 0xA7, 0xE1,
        0x0C, 0xFB, 0x95, 0xAC, 0xB4, 0x9B, 0xCC, 0xB6, 0xA0, 0xC3, 0x4A, 0xAA, 0x45, 0xBF, 0xBF, 0xDF, 0x0B,
        0x51, 0xD5, 0xA4, 0x8B, 0xF2, 0xAB, 0x45, 0x97, 0x1C, 0x24, 0xD8, 0xE2, 0xC2, 0x8A, 0x4D, 0x40, 0x12,
        0xD7, 0x77, 0x01, 0xEB, 0x74, 0x35, 0xF1, 0x4D, 0xDD, 0xD0, 0xF3, 0xA6, 0x9A, 0xB7, 0xA4, 0xF1, 0x7F,
        0xA7, 0x84, 0x34, 0xD7, 0x08, 0x25, 0x52, 0x80, 0x8B, 0x6C, 0x42, 0x93, 0x04, 0x1E, 0x07, 0x1F, 0x4F,
        0x76, 0x43, 0x18, 0xF2, 0xF8, 0x51, 0x1A, 0x56, 0xAF, 0xE6, 0xA9, 0x31, 0xCB, 0x6C, 0x1C, 0x0A, 0xA4,
        0x01, 0x10, 0xFC, 0xC8, 0x66, 0xCE, 0x2E, 0x9C, 0x0B, 0x2D, 0x7F, 0xB4, 0x64, 0xA0, 0xEE, 0x22, 0x82,
        0xC8, 0x34, 0xF7, 0x9A, 0xF5, 0x51, 0x12, 0x2A, 0x84,
    ];

    fn test_interest() -> Interest {
        let mut interest = Interest::new(Name::from_uri("/test/name").unwrap());
        interest
            .set_min_suffix_components(Some(2))
            .set_max_suffix_components(Some(4))
            .set_child_selector(Some(1))
            .set_must_be_fresh(true)
            .set_interest_lifetime(Some(Duration::from_millis(30000)));
        interest.set_key_locator(KeyLocator::from_key_name(Name::from_uri("/key/locator").unwrap()));
        let mut exclude = Exclude::new();
        exclude.append_component(NameComponent::from("abc")).append_any();
        interest.set_exclude(exclude);
        interest.set_nonce(vec![0x61, 0x62, 0x61, 0x62]);
        interest
    }

    #[test]
    fn test_interest_round_trip() {
        for format in [&TLV_0_1 as &dyn WireFormat, &TLV_0_2] {
            let interest = test_interest();
            let encoding = format.encode_interest(&interest).unwrap();
            let (decoded, signed_portion) = format.decode_interest(encoding.bytes()).unwrap();
            assert_eq!(decoded, interest, "format {}", format.name());
            assert_eq!(signed_portion.begin, encoding.signed_portion_begin());
            assert_eq!(signed_portion.end, encoding.signed_portion_end());

            let reencoded = format.encode_interest(&decoded).unwrap();
            assert_eq!(reencoded, encoding);
        }
    }

    #[test]
    fn test_interest_signed_portion_covers_all_but_last_component() {
        let mut interest = Interest::new(Name::from_uri("/a/bb/ccc").unwrap());
        interest.set_nonce(vec![1, 2, 3, 4]);
        let encoding = TLV_0_2.encode_interest(&interest).unwrap();
        // Interest header, Name header, then /a and /bb
        assert_eq!(encoding.signed_portion(), &[0x08, 0x01, b'a', 0x08, 0x02, b'b', b'b']);
        assert_eq!(encoding.signed_portion_begin(), 4);
    }

    #[test]
    fn test_scope_only_in_0_1() {
        let mut interest = Interest::new(Name::from_uri("/scoped").unwrap());
        interest.set_scope(Some(2));
        interest.set_nonce(vec![1, 2, 3, 4]);

        let v1 = TLV_0_1.encode_interest(&interest).unwrap();
        let (decoded, _) = TLV_0_1.decode_interest(v1.bytes()).unwrap();
        assert_eq!(decoded.scope(), Some(2));

        let v2 = TLV_0_2.encode_interest(&interest).unwrap();
        let (decoded, _) = TLV_0_2.decode_interest(v2.bytes()).unwrap();
        assert_eq!(decoded.scope(), None);
        assert_eq!(v1.len(), v2.len() + 3);
    }

    #[test]
    fn test_nonce_normalization() {
        let mut interest = Interest::new(Name::from_uri("/nonce").unwrap());
        interest.set_nonce(vec![1, 2, 3, 4, 5, 6]);

        let (decoded, _) = TLV_0_1
            .decode_interest(TLV_0_1.encode_interest(&interest).unwrap().bytes())
            .unwrap();
        assert_eq!(decoded.nonce(), Some(&[1u8, 2, 3, 4, 5, 6][..]));

        let (decoded, _) = TLV_0_2
            .decode_interest(TLV_0_2.encode_interest(&interest).unwrap().bytes())
            .unwrap();
        assert_eq!(decoded.nonce(), Some(&[1u8, 2, 3, 4][..]));

        let without_nonce = Interest::new(Name::from_uri("/nonce").unwrap());
        let (decoded, _) = TLV_0_2
            .decode_interest(TLV_0_2.encode_interest(&without_nonce).unwrap().bytes())
            .unwrap();
        assert_eq!(decoded.nonce().map(|nonce| nonce.len()), Some(4));
    }

    #[test]
    fn test_decode_coded_data() {
        let (data, signed_portion) = TLV_0_2.decode_data(&CODED_DATA).unwrap();
        assert_eq!(data.name().to_uri(), "/ndn/abc");
        assert_eq!(data.meta_info().freshness_period(), Some(Duration::from_millis(5000)));
        assert_eq!(data.meta_info().final_block_id(), Some(&NameComponent::new(vec![0x00, 0x09])));
        assert_eq!(data.meta_info().content_type(), ContentType::Blob);
        assert_eq!(data.content(), b"SUCCESS!");
        assert_eq!(data.signature().type_code(), Some(1));
        assert_eq!(
            data.signature().key_locator().and_then(|locator| locator.key_name()).map(|name| name.to_uri()),
            Some("/testname/KEY/DSK-123/ID-CERT".to_string())
        );
        assert_eq!(data.signature().value().len(), 128);

        assert_eq!(signed_portion.begin, 2);
        assert_eq!(signed_portion.end, CODED_DATA.len() - 130);

        let reencoded = TLV_0_2.encode_data(&data).unwrap();
        assert_eq!(reencoded.bytes(), &CODED_DATA[..]);
        assert_eq!(reencoded.signed_portion_begin(), signed_portion.begin);
        assert_eq!(reencoded.signed_portion_end(), signed_portion.end);
    }

    #[test]
    fn test_data_rejects_trailing_bytes() {
        let mut input = CODED_DATA.to_vec();
        input.push(0x00);
        assert_eq!(TLV_0_2.decode_data(&input).unwrap_err(), DecodingError::TrailingBytes(1));
    }

    #[test]
    fn test_data_truncated_at_every_offset() {
        for length in 0..CODED_DATA.len() {
            assert!(TLV_0_2.decode_data(&CODED_DATA[..length]).is_err(), "length {}", length);
        }
    }

    #[test]
    fn test_keyed_signature_requires_key_locator() {
        let mut data = Data::new(Name::from_uri("/a").unwrap());
        data.signature_mut().set_value(vec![1, 2, 3]);
        assert_eq!(
            TLV_0_2.encode_data(&data).unwrap_err(),
            EncodingError::MissingKeyLocator {
                signature_type: "Sha256WithRsa"
            }
        );

        data.set_signature(Signature::digest_sha256());
        data.signature_mut().set_value(vec![0; 32]);
        assert!(TLV_0_2.encode_data(&data).is_ok());
    }

    #[test]
    fn test_generic_signature_info() {
        let mut data = Data::new(Name::from_uri("/generic").unwrap());
        let mut generic = crate::signature::GenericSignature::new();
        generic.set_info_encoding(vec![0x16, 0x08, 0x1B, 0x01, 0x64, 0x81, 0x03, 0x01, 0x02, 0x03], Some(100));
        generic.set_value(vec![9, 9]);
        data.set_signature(Signature::Generic(generic));

        let encoding = TLV_0_2.encode_data(&data).unwrap();
        let (decoded, _) = TLV_0_2.decode_data(encoding.bytes()).unwrap();
        assert_eq!(decoded.signature().type_code(), Some(100));
        assert_eq!(decoded, data);

        for bad in [
            vec![0x16, 0x05, 0x81, 0x03, 0x01, 0x02, 0x03],
            vec![0x16, 0x08, 0x1B, 0x01, 0x64, 0x81, 0x10, 0x01, 0x02, 0x03],
        ] {
            let mut generic = crate::signature::GenericSignature::new();
            generic.set_info_encoding(bad, None);
            data.set_signature(Signature::Generic(generic));
            assert!(matches!(
                TLV_0_2.encode_data(&data),
                Err(EncodingError::InvalidSignatureInfo(_))
            ));
        }
    }

    #[test]
    fn test_validity_period_only_in_0_2() {
        let mut signature = Signature::sha256_with_ecdsa(KeyLocator::from_key_digest(vec![7; 32]));
        let period = ValidityPeriod::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        );
        if let Some(body) = signature.body_mut() {
            body.set_validity_period(Some(period));
        }
        signature.set_value(vec![1, 2, 3]);

        let info = TLV_0_2.encode_signature_info(&signature).unwrap();
        let value = TLV_0_2.encode_signature_value(&signature).unwrap();
        let decoded = TLV_0_2.decode_signature_info_and_value(&info, &value).unwrap();
        assert_eq!(decoded, signature);

        let info = TLV_0_1.encode_signature_info(&signature).unwrap();
        let decoded = TLV_0_1.decode_signature_info_and_value(&info, &value).unwrap();
        assert_eq!(decoded.body().and_then(|body| body.validity_period()), None);
    }

    #[test]
    fn test_0_2_skips_non_critical_elements() {
        let mut interest = Interest::new(Name::from_uri("/skip").unwrap());
        interest.set_nonce(vec![1, 2, 3, 4]);
        let encoding = TLV_0_2.encode_interest(&interest).unwrap();

        // Append a non-critical element (type 0xFC, even, above 31) inside the Interest
        let mut bytes = encoding.bytes().to_vec();
        bytes.extend_from_slice(&[0xFC, 0x01, 0xAA]);
        bytes[1] += 3;

        let (decoded, _) = TLV_0_2.decode_interest(&bytes).unwrap();
        assert_eq!(decoded.name(), interest.name());
        assert!(TLV_0_1.decode_interest(&bytes).is_err());

        // A critical unknown type still fails
        let last = bytes.len() - 3;
        bytes[last] = 0xFB;
        assert!(matches!(
            TLV_0_2.decode_interest(&bytes),
            Err(DecodingError::UnrecognizedCriticalType { tlv_type: 0xFB, .. })
        ));
    }

    #[test]
    fn test_0_2_skips_non_critical_between_known_elements() {
        // Unknown 0xFC between MetaInfo and Content
        let meta_info_end = 26;
        let mut bytes = CODED_DATA[..meta_info_end].to_vec();
        bytes.extend_from_slice(&[0xFC, 0x01, 0xAA]);
        bytes.extend_from_slice(&CODED_DATA[meta_info_end..]);
        bytes[1] += 3;

        let (data, _) = TLV_0_2.decode_data(&bytes).unwrap();
        assert_eq!(data.content(), b"SUCCESS!");
        assert_eq!(data.meta_info().freshness_period(), Some(Duration::from_millis(5000)));
        assert!(TLV_0_1.decode_data(&bytes).is_err());
    }

    #[test]
    fn test_control_parameters_round_trip() {
        let mut parameters = ControlParameters::for_prefix(Name::from_uri("/prefix").unwrap());
        parameters.face_id = Some(300);
        parameters.uri = Some("tcp4://127.0.0.1:6363".to_string());
        parameters.origin = Some(0);
        parameters.cost = Some(10);
        parameters.forwarding_flags.capture = true;
        parameters.strategy = Some(Name::from_uri("/localhost/nfd/strategy/best-route").unwrap());
        parameters.expiration_period = Some(Duration::from_secs(60));

        let encoding = TLV_0_2.encode_control_parameters(&parameters).unwrap();
        assert_eq!(encoding[0], 0x68);
        assert_eq!(TLV_0_2.decode_control_parameters(&encoding).unwrap(), parameters);

        let minimal = ControlParameters::for_prefix(Name::from_uri("/a").unwrap());
        let encoding = TLV_0_2.encode_control_parameters(&minimal).unwrap();
        assert_eq!(encoding, vec![0x68, 0x05, 0x07, 0x03, 0x08, 0x01, b'a']);
    }

    #[test]
    fn test_lp_packet_with_nack_and_mark() {
        let mut interest = Interest::new(Name::from_uri("/lp").unwrap());
        interest.set_nonce(vec![1, 2, 3, 4]);
        let fragment = TLV_0_2.encode_interest(&interest).unwrap().into_bytes();

        let mut packet = LpPacket::new();
        packet
            .add_header_field(LpHeaderField::Sequence(7))
            .add_header_field(LpHeaderField::Nack(NetworkNack::new(NackReason::NoRoute)))
            .add_header_field(LpHeaderField::CongestionMark(1))
            .set_fragment(Some(fragment.clone()));

        let encoding = TLV_0_2.encode_lp_packet(&packet).unwrap();
        let decoded = TLV_0_2.decode_lp_packet(&encoding).unwrap();
        assert_eq!(decoded, packet);
        assert_eq!(decoded.nack().map(|nack| nack.reason), Some(NackReason::NoRoute));
        assert_eq!(decoded.congestion_mark(), Some(1));
        assert_eq!(decoded.fragment(), Some(fragment.as_slice()));
    }

    #[test]
    fn test_lp_packet_header_fields() {
        // 804 is an unknown header field with the two low bits clear
        let ignorable = [0x64, 0x06, 0xFD, 0x03, 0x24, 0x00, 0x50, 0x00];
        let decoded = TLV_0_2.decode_lp_packet(&ignorable).unwrap();
        assert_eq!(decoded.fragment(), Some(&[][..]));
        assert!(decoded.header_fields().is_empty());

        let critical = [0x64, 0x06, 0xFD, 0x03, 0x25, 0x00, 0x50, 0x00];
        assert!(TLV_0_2.decode_lp_packet(&critical).is_err());

        // Fragment must come last
        let misplaced = [0x64, 0x05, 0x50, 0x00, 0x51, 0x01, 0x01];
        assert!(TLV_0_2.decode_lp_packet(&misplaced).is_err());
    }

    #[test]
    fn test_default_wire_format() {
        assert_eq!(wire_format_by_name("0.1").map(|format| format.name()), Some("0.1"));
        assert!(wire_format_by_name("0.3").is_none());
        assert_eq!(default_wire_format().name(), "0.2");
    }

    proptest! {
        #[test]
        fn test_data_round_trip(
            components in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..12), 0..5),
            content in prop::collection::vec(any::<u8>(), 0..300),
            freshness in prop::option::of(0u64..100_000),
        ) {
            let mut data = Data::new(Name::from_components(
                components.into_iter().map(NameComponent::new).collect(),
            ));
            data.set_content(content);
            data.meta_info_mut().set_freshness_period(freshness.map(Duration::from_millis));
            data.set_signature(Signature::digest_sha256());
            data.signature_mut().set_value(vec![0xAB; 32]);

            for format in [&TLV_0_1 as &dyn WireFormat, &TLV_0_2] {
                let encoding = format.encode_data(&data).unwrap();
                let (decoded, signed_portion) = format.decode_data(encoding.bytes()).unwrap();
                prop_assert_eq!(&decoded, &data);
                prop_assert_eq!(signed_portion.begin, encoding.signed_portion_begin());
                prop_assert_eq!(signed_portion.end, encoding.signed_portion_end());
                prop_assert_eq!(format.encode_data(&decoded).unwrap(), encoding);
            }
        }
    }
}
