//! TLV packet codec shared by the 0.1 and 0.2 wire formats.
//!
//! Encoders write fields in reverse order because `TlvEncoder` builds its
//! output back to front. Signed-portion offsets are recorded as distances
//! from the end of the output and converted once the total length is known.

use std::time::Duration;

use log::trace;

use super::{SignedBlob, SignedPortion};
use crate::control_parameters::{ControlParameters, ForwardingFlags};
use crate::lp::{is_ignorable_header_field, LpHeaderField, LpPacket, NackReason, NetworkNack};
use crate::name::{ComponentType, Name, NameComponent};
use crate::packets::{ContentType, Data, Exclude, ExcludeEntry, Interest, MetaInfo};
use crate::signature::{signature_types, KeyLocator, KeyLocatorType, Signature, SignatureBody, ValidityPeriod};
use crate::tlv::{tlv_types, DecodingError, EncodingError, TlvDecoder, TlvEncoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Revision {
    V0_1,
    V0_2,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TlvCodec {
    revision: Revision,
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn non_negative_integer(value: &[u8]) -> Result<u64, DecodingError> {
    TlvDecoder::new(value).read_non_negative_integer(value.len())
}

/// Write a Name TLV and return the signed-portion offsets of an Interest
/// name, counted from the end of the output: (start of first component,
/// start of last component)
fn encode_name(encoder: &mut TlvEncoder, name: &Name) -> Result<(usize, usize), EncodingError> {
    let value_end = encoder.len();
    let mut last_component_start = value_end;
    for (index, component) in name.components().iter().enumerate().rev() {
        encoder.write_blob_tlv(component.component_type().tlv_type(), component.value())?;
        if index + 1 == name.len() {
            last_component_start = encoder.len();
        }
    }
    let first_component_start = encoder.len();
    encoder.write_type_and_length(tlv_types::NAME, encoder.len() - value_end)?;
    Ok((first_component_start, last_component_start))
}

fn decode_name_component(
    decoder: &mut TlvDecoder<'_>,
) -> Result<NameComponent, DecodingError> {
    let offset = decoder.offset();
    let (tlv_type, value) = decoder.read_any_tlv()?;
    let component_type = ComponentType::from_tlv_type(tlv_type).ok_or(DecodingError::UnexpectedType {
        expected: tlv_types::NAME_COMPONENT,
        actual: tlv_type,
        offset,
    })?;
    if component_type == ComponentType::ImplicitSha256Digest && value.len() != 32 {
        return Err(DecodingError::InvalidValue(format!(
            "implicit digest component of {} bytes",
            value.len()
        )));
    }
    Ok(NameComponent::with_type(value.to_vec(), component_type))
}

/// Read a Name TLV and return it with the absolute offsets of its first and last components
fn decode_name(decoder: &mut TlvDecoder<'_>) -> Result<(Name, usize, usize), DecodingError> {
    let end = decoder.read_nested_tlvs_start(tlv_types::NAME)?;
    let first_component_start = decoder.offset();
    let mut last_component_start = first_component_start;
    let mut components = Vec::new();
    while decoder.offset() < end {
        last_component_start = decoder.offset();
        components.push(decode_name_component(decoder)?);
    }
    decoder.finish_nested_tlvs(end)?;
    Ok((Name::from_components(components), first_component_start, last_component_start))
}

fn encode_key_locator_value(encoder: &mut TlvEncoder, key_locator: &KeyLocator) -> Result<(), EncodingError> {
    match key_locator.locator() {
        KeyLocatorType::None => Ok(()),
        KeyLocatorType::KeyName(name) => encode_name(encoder, name).map(|_| ()),
        KeyLocatorType::KeyDigest(digest) => encoder.write_blob_tlv(tlv_types::KEY_LOCATOR_DIGEST, digest),
    }
}

fn decode_key_locator(decoder: &mut TlvDecoder<'_>, tlv_type: u64) -> Result<KeyLocator, DecodingError> {
    let end = decoder.read_nested_tlvs_start(tlv_type)?;
    let key_locator = if decoder.peek_type(tlv_types::NAME, end)? {
        KeyLocator::from_key_name(decode_name(decoder)?.0)
    } else if decoder.peek_type(tlv_types::KEY_LOCATOR_DIGEST, end)? {
        KeyLocator::from_key_digest(decoder.read_blob_tlv(tlv_types::KEY_LOCATOR_DIGEST)?.to_vec())
    } else {
        KeyLocator::new()
    };
    decoder.finish_nested_tlvs(end)?;
    Ok(key_locator)
}

fn encode_exclude_value(encoder: &mut TlvEncoder, exclude: &Exclude) -> Result<(), EncodingError> {
    for entry in exclude.entries().iter().rev() {
        match entry {
            ExcludeEntry::Any => encoder.write_type_and_length(tlv_types::ANY, 0)?,
            ExcludeEntry::Component(component) => {
                encoder.write_blob_tlv(component.component_type().tlv_type(), component.value())?
            }
        }
    }
    Ok(())
}

fn decode_exclude(decoder: &mut TlvDecoder<'_>) -> Result<Exclude, DecodingError> {
    let end = decoder.read_nested_tlvs_start(tlv_types::EXCLUDE)?;
    let mut exclude = Exclude::new();
    while decoder.offset() < end {
        if decoder.peek_type(tlv_types::ANY, end)? {
            decoder.read_blob_tlv(tlv_types::ANY)?;
            exclude.append_any();
        } else if decoder.offset() < end {
            exclude.append_component(decode_name_component(decoder)?);
        }
    }
    decoder.finish_nested_tlvs(end)?;
    Ok(exclude)
}

fn encode_meta_info_value(encoder: &mut TlvEncoder, meta_info: &MetaInfo) -> Result<(), EncodingError> {
    if let Some(final_block_id) = meta_info.final_block_id() {
        encoder.write_nested_tlv(tlv_types::FINAL_BLOCK_ID, |encoder| {
            encoder.write_blob_tlv(final_block_id.component_type().tlv_type(), final_block_id.value())
        })?;
    }
    encoder.write_optional_non_negative_integer_tlv(
        tlv_types::FRESHNESS_PERIOD,
        meta_info.freshness_period().map(duration_to_millis),
    )?;
    if meta_info.content_type() != ContentType::Blob {
        encoder.write_non_negative_integer_tlv(tlv_types::CONTENT_TYPE, meta_info.content_type().code())?;
    }
    Ok(())
}

fn decode_meta_info(decoder: &mut TlvDecoder<'_>) -> Result<MetaInfo, DecodingError> {
    let end = decoder.read_nested_tlvs_start(tlv_types::META_INFO)?;
    let mut meta_info = MetaInfo::new();
    if let Some(code) = decoder.read_optional_non_negative_integer_tlv(tlv_types::CONTENT_TYPE, end)? {
        meta_info.set_content_type(ContentType::from_code(code));
    }
    if let Some(millis) = decoder.read_optional_non_negative_integer_tlv(tlv_types::FRESHNESS_PERIOD, end)? {
        meta_info.set_freshness_period(Some(Duration::from_millis(millis)));
    }
    if decoder.peek_type(tlv_types::FINAL_BLOCK_ID, end)? {
        let final_block_end = decoder.read_nested_tlvs_start(tlv_types::FINAL_BLOCK_ID)?;
        meta_info.set_final_block_id(Some(decode_name_component(decoder)?));
        decoder.finish_nested_tlvs(final_block_end)?;
    }
    decoder.finish_nested_tlvs(end)?;
    Ok(meta_info)
}

impl TlvCodec {
    pub(crate) const fn new(revision: Revision) -> Self {
        Self { revision }
    }

    fn decoder<'a>(&self, input: &'a [u8]) -> TlvDecoder<'a> {
        match self.revision {
            Revision::V0_1 => TlvDecoder::new(input),
            Revision::V0_2 => TlvDecoder::new(input).skipping_non_critical(),
        }
    }

    /// The nonce this revision puts on the wire for `nonce`. 0.2 nonces are
    /// exactly 4 bytes: longer ones are truncated and shorter ones padded
    /// with random bytes.
    pub(crate) fn normalize_nonce(&self, nonce: &[u8]) -> Vec<u8> {
        let mut nonce = nonce.to_vec();
        if self.revision == Revision::V0_2 && nonce.len() != 4 {
            nonce.truncate(4);
            while nonce.len() < 4 {
                nonce.push(rand::random::<u8>());
            }
        }
        nonce
    }

    fn wire_nonce(&self, interest: &Interest) -> Vec<u8> {
        match interest.nonce() {
            Some(nonce) => self.normalize_nonce(nonce),
            None => rand::random::<[u8; 4]>().to_vec(),
        }
    }

    pub(crate) fn encode_interest(&self, interest: &Interest) -> Result<SignedBlob, EncodingError> {
        let mut encoder = TlvEncoder::new();
        let mut name_offsets = (0, 0);
        encoder.write_nested_tlv(tlv_types::INTEREST, |encoder| {
            encoder.write_optional_non_negative_integer_tlv(
                tlv_types::INTEREST_LIFETIME,
                interest.interest_lifetime().map(duration_to_millis),
            )?;
            if self.revision == Revision::V0_1 {
                encoder.write_optional_non_negative_integer_tlv(tlv_types::SCOPE, interest.scope())?;
            }
            encoder.write_blob_tlv(tlv_types::NONCE, &self.wire_nonce(interest))?;
            encoder.write_optional_nested_tlv(tlv_types::SELECTORS, |encoder| encode_selectors_value(encoder, interest))?;
            name_offsets = encode_name(encoder, interest.name())?;
            Ok(())
        })?;

        let total = encoder.len();
        let signed_portion = SignedPortion::new(total - name_offsets.0, total - name_offsets.1);
        trace!("Encoded Interest {} ({} bytes)", interest.name(), total);
        Ok(SignedBlob::new(encoder.into_output(), signed_portion))
    }

    pub(crate) fn decode_interest(&self, input: &[u8]) -> Result<(Interest, SignedPortion), DecodingError> {
        let mut decoder = self.decoder(input);
        let end = decoder.read_nested_tlvs_start(tlv_types::INTEREST)?;
        let (name, first_component_start, last_component_start) = decode_name(&mut decoder)?;

        let mut interest = Interest::new(name);
        if decoder.peek_type(tlv_types::SELECTORS, end)? {
            decode_selectors(&mut decoder, &mut interest)?;
        }
        let nonce = decoder.read_blob_tlv(tlv_types::NONCE)?.to_vec();
        if self.revision == Revision::V0_1 {
            interest.set_scope(decoder.read_optional_non_negative_integer_tlv(tlv_types::SCOPE, end)?);
        }
        let lifetime = decoder.read_optional_non_negative_integer_tlv(tlv_types::INTEREST_LIFETIME, end)?;
        interest.set_interest_lifetime(lifetime.map(Duration::from_millis));
        // Set last; any earlier setter would invalidate it
        interest.set_nonce(nonce);

        decoder.finish_nested_tlvs(end)?;
        decoder.finish()?;
        Ok((interest, SignedPortion::new(first_component_start, last_component_start)))
    }

    pub(crate) fn encode_data(&self, data: &Data) -> Result<SignedBlob, EncodingError> {
        let mut encoder = TlvEncoder::new();
        let mut signed_portion_begin = 0;
        let mut signed_portion_end = 0;
        encoder.write_nested_tlv(tlv_types::DATA, |encoder| {
            encoder.write_blob_tlv(tlv_types::SIGNATURE_VALUE, data.signature().value())?;
            signed_portion_end = encoder.len();
            self.write_signature_info(encoder, data.signature())?;
            encoder.write_blob_tlv(tlv_types::CONTENT, data.content())?;
            encoder.write_nested_tlv(tlv_types::META_INFO, |encoder| encode_meta_info_value(encoder, data.meta_info()))?;
            encode_name(encoder, data.name())?;
            signed_portion_begin = encoder.len();
            Ok(())
        })?;

        let total = encoder.len();
        let signed_portion = SignedPortion::new(total - signed_portion_begin, total - signed_portion_end);
        trace!("Encoded Data {} ({} bytes)", data.name(), total);
        Ok(SignedBlob::new(encoder.into_output(), signed_portion))
    }

    pub(crate) fn decode_data(&self, input: &[u8]) -> Result<(Data, SignedPortion), DecodingError> {
        let mut decoder = self.decoder(input);
        let end = decoder.read_nested_tlvs_start(tlv_types::DATA)?;
        let signed_portion_begin = decoder.offset();

        let (name, _, _) = decode_name(&mut decoder)?;
        let mut data = Data::new(name);
        if decoder.peek_type(tlv_types::META_INFO, end)? {
            data.set_meta_info(decode_meta_info(&mut decoder)?);
        }
        if let Some(content) = decoder.read_optional_blob_tlv(tlv_types::CONTENT, end)? {
            data.set_content(content.to_vec());
        }

        let mut signature = self.read_signature_info(&mut decoder)?;
        let signed_portion_end = decoder.offset();
        signature.set_value(decoder.read_blob_tlv(tlv_types::SIGNATURE_VALUE)?.to_vec());
        data.set_signature(signature);

        decoder.finish_nested_tlvs(end)?;
        decoder.finish()?;
        Ok((data, SignedPortion::new(signed_portion_begin, signed_portion_end)))
    }

    fn write_signature_info(&self, encoder: &mut TlvEncoder, signature: &Signature) -> Result<(), EncodingError> {
        let (type_code, body) = match signature {
            Signature::Generic(generic) => {
                generic.validate_info_encoding()?;
                return encoder.prepend(generic.info_encoding());
            }
            Signature::DigestSha256(_) => {
                return encoder.write_nested_tlv(tlv_types::SIGNATURE_INFO, |encoder| {
                    encoder.write_non_negative_integer_tlv(tlv_types::SIGNATURE_TYPE, signature_types::DIGEST_SHA256)
                });
            }
            Signature::Sha256WithRsa(body) => (signature_types::SHA256_WITH_RSA, body),
            Signature::Sha256WithEcdsa(body) => (signature_types::SHA256_WITH_ECDSA, body),
            Signature::HmacWithSha256(body) => (signature_types::HMAC_WITH_SHA256, body),
        };

        if body.key_locator().is_none() && !body.value().is_empty() {
            return Err(EncodingError::MissingKeyLocator {
                signature_type: signature.type_name(),
            });
        }

        encoder.write_nested_tlv(tlv_types::SIGNATURE_INFO, |encoder| {
            if self.revision == Revision::V0_2 && type_code != signature_types::HMAC_WITH_SHA256 {
                if let Some(period) = body.validity_period() {
                    write_validity_period(encoder, period)?;
                }
            }
            if !body.key_locator().is_none() {
                encoder.write_nested_tlv(tlv_types::KEY_LOCATOR, |encoder| {
                    encode_key_locator_value(encoder, body.key_locator())
                })?;
            }
            encoder.write_non_negative_integer_tlv(tlv_types::SIGNATURE_TYPE, type_code)
        })
    }

    /// Read a SignatureInfo TLV into a signature with an empty value
    fn read_signature_info(&self, decoder: &mut TlvDecoder<'_>) -> Result<Signature, DecodingError> {
        let start = decoder.offset();
        let end = decoder.read_nested_tlvs_start(tlv_types::SIGNATURE_INFO)?;
        let type_code = decoder.read_non_negative_integer_tlv(tlv_types::SIGNATURE_TYPE)?;

        let signature = match type_code {
            signature_types::DIGEST_SHA256 => Signature::digest_sha256(),
            signature_types::SHA256_WITH_RSA | signature_types::SHA256_WITH_ECDSA | signature_types::HMAC_WITH_SHA256 => {
                let key_locator = if decoder.peek_type(tlv_types::KEY_LOCATOR, end)? {
                    decode_key_locator(decoder, tlv_types::KEY_LOCATOR)?
                } else {
                    KeyLocator::new()
                };
                let mut body = SignatureBody::with_key_locator(key_locator);
                if self.revision == Revision::V0_2 && decoder.peek_type(tlv_types::VALIDITY_PERIOD, end)? {
                    body.set_validity_period(Some(read_validity_period(decoder)?));
                }
                match type_code {
                    signature_types::SHA256_WITH_RSA => Signature::Sha256WithRsa(body),
                    signature_types::SHA256_WITH_ECDSA => Signature::Sha256WithEcdsa(body),
                    _ => Signature::HmacWithSha256(body),
                }
            }
            other => {
                // Keep the whole SignatureInfo so it re-encodes unchanged
                decoder.seek(end);
                let mut generic = crate::signature::GenericSignature::new();
                generic.set_info_encoding(decoder.slice(start, end).to_vec(), Some(other));
                Signature::Generic(generic)
            }
        };

        decoder.finish_nested_tlvs(end)?;
        Ok(signature)
    }

    pub(crate) fn encode_signature_info(&self, signature: &Signature) -> Result<Vec<u8>, EncodingError> {
        let mut encoder = TlvEncoder::new();
        self.write_signature_info(&mut encoder, signature)?;
        Ok(encoder.into_output())
    }

    pub(crate) fn encode_signature_value(&self, signature: &Signature) -> Result<Vec<u8>, EncodingError> {
        let mut encoder = TlvEncoder::new();
        encoder.write_blob_tlv(tlv_types::SIGNATURE_VALUE, signature.value())?;
        Ok(encoder.into_output())
    }

    pub(crate) fn decode_signature_info_and_value(&self, info: &[u8], value: &[u8]) -> Result<Signature, DecodingError> {
        let mut decoder = self.decoder(info);
        let mut signature = self.read_signature_info(&mut decoder)?;
        decoder.finish()?;

        let mut decoder = self.decoder(value);
        signature.set_value(decoder.read_blob_tlv(tlv_types::SIGNATURE_VALUE)?.to_vec());
        decoder.finish()?;
        Ok(signature)
    }

    pub(crate) fn encode_control_parameters(&self, parameters: &ControlParameters) -> Result<Vec<u8>, EncodingError> {
        let mut encoder = TlvEncoder::new();
        encoder.write_nested_tlv(tlv_types::CONTROL_PARAMETERS, |encoder| {
            encoder.write_optional_non_negative_integer_tlv(
                tlv_types::EXPIRATION_PERIOD,
                parameters.expiration_period.map(duration_to_millis),
            )?;
            if let Some(strategy) = &parameters.strategy {
                encoder.write_nested_tlv(tlv_types::STRATEGY, |encoder| encode_name(encoder, strategy).map(|_| ()))?;
            }
            let flags = parameters.forwarding_flags.to_bits();
            if flags != ForwardingFlags::default().to_bits() {
                encoder.write_non_negative_integer_tlv(tlv_types::FLAGS, flags)?;
            }
            encoder.write_optional_non_negative_integer_tlv(tlv_types::COST, parameters.cost)?;
            encoder.write_optional_non_negative_integer_tlv(tlv_types::ORIGIN, parameters.origin)?;
            encoder.write_optional_non_negative_integer_tlv(
                tlv_types::LOCAL_CONTROL_FEATURE,
                parameters.local_control_feature,
            )?;
            encoder.write_optional_blob_tlv(tlv_types::URI, parameters.uri.as_deref().map(str::as_bytes))?;
            encoder.write_optional_non_negative_integer_tlv(tlv_types::FACE_ID, parameters.face_id)?;
            if let Some(name) = &parameters.name {
                encode_name(encoder, name)?;
            }
            Ok(())
        })?;
        Ok(encoder.into_output())
    }

    pub(crate) fn decode_control_parameters(&self, input: &[u8]) -> Result<ControlParameters, DecodingError> {
        let mut decoder = self.decoder(input);
        let end = decoder.read_nested_tlvs_start(tlv_types::CONTROL_PARAMETERS)?;
        let mut parameters = ControlParameters::new();

        if decoder.peek_type(tlv_types::NAME, end)? {
            parameters.name = Some(decode_name(&mut decoder)?.0);
        }
        parameters.face_id = decoder.read_optional_non_negative_integer_tlv(tlv_types::FACE_ID, end)?;
        if let Some(uri) = decoder.read_optional_blob_tlv(tlv_types::URI, end)? {
            let uri = String::from_utf8(uri.to_vec())
                .map_err(|e| DecodingError::InvalidValue(format!("ControlParameters Uri: {}", e)))?;
            parameters.uri = Some(uri);
        }
        parameters.local_control_feature =
            decoder.read_optional_non_negative_integer_tlv(tlv_types::LOCAL_CONTROL_FEATURE, end)?;
        parameters.origin = decoder.read_optional_non_negative_integer_tlv(tlv_types::ORIGIN, end)?;
        parameters.cost = decoder.read_optional_non_negative_integer_tlv(tlv_types::COST, end)?;
        if let Some(flags) = decoder.read_optional_non_negative_integer_tlv(tlv_types::FLAGS, end)? {
            parameters.forwarding_flags = ForwardingFlags::from_bits(flags);
        }
        if decoder.peek_type(tlv_types::STRATEGY, end)? {
            let strategy_end = decoder.read_nested_tlvs_start(tlv_types::STRATEGY)?;
            parameters.strategy = Some(decode_name(&mut decoder)?.0);
            decoder.finish_nested_tlvs(strategy_end)?;
        }
        parameters.expiration_period = decoder
            .read_optional_non_negative_integer_tlv(tlv_types::EXPIRATION_PERIOD, end)?
            .map(Duration::from_millis);

        decoder.finish_nested_tlvs(end)?;
        decoder.finish()?;
        Ok(parameters)
    }

    pub(crate) fn encode_lp_packet(&self, packet: &LpPacket) -> Result<Vec<u8>, EncodingError> {
        let mut encoder = TlvEncoder::new();
        encoder.write_nested_tlv(tlv_types::LP_PACKET, |encoder| {
            encoder.write_optional_blob_tlv(tlv_types::LP_FRAGMENT, packet.fragment())?;
            for field in packet.header_fields().iter().rev() {
                match field {
                    LpHeaderField::Sequence(sequence) => {
                        encoder.write_non_negative_integer_tlv(tlv_types::LP_SEQUENCE, *sequence)?
                    }
                    LpHeaderField::Nack(nack) => encoder.write_nested_tlv(tlv_types::LP_NACK, |encoder| {
                        if nack.reason == NackReason::None {
                            return Ok(());
                        }
                        encoder.write_non_negative_integer_tlv(tlv_types::LP_NACK_REASON, nack.reason.code())
                    })?,
                    LpHeaderField::IncomingFaceId(face_id) => {
                        encoder.write_non_negative_integer_tlv(tlv_types::LP_INCOMING_FACE_ID, *face_id)?
                    }
                    LpHeaderField::CongestionMark(mark) => {
                        encoder.write_non_negative_integer_tlv(tlv_types::LP_CONGESTION_MARK, *mark)?
                    }
                }
            }
            Ok(())
        })?;
        Ok(encoder.into_output())
    }

    pub(crate) fn decode_lp_packet(&self, input: &[u8]) -> Result<LpPacket, DecodingError> {
        let mut decoder = TlvDecoder::new(input);
        let end = decoder.read_nested_tlvs_start(tlv_types::LP_PACKET)?;
        let mut packet = LpPacket::new();

        while decoder.offset() < end {
            let offset = decoder.offset();
            let (tlv_type, value) = decoder.read_any_tlv()?;
            match tlv_type {
                tlv_types::LP_FRAGMENT => {
                    if decoder.offset() != end {
                        return Err(DecodingError::InvalidValue(
                            "LpPacket Fragment must be the last field".to_string(),
                        ));
                    }
                    packet.set_fragment(Some(value.to_vec()));
                }
                tlv_types::LP_SEQUENCE => {
                    packet.add_header_field(LpHeaderField::Sequence(non_negative_integer(value)?));
                }
                tlv_types::LP_NACK => {
                    let mut nack_decoder = TlvDecoder::new(value);
                    let reason = nack_decoder
                        .read_optional_non_negative_integer_tlv(tlv_types::LP_NACK_REASON, value.len())?
                        .map(NackReason::from_code)
                        .unwrap_or_default();
                    packet.add_header_field(LpHeaderField::Nack(NetworkNack::new(reason)));
                }
                tlv_types::LP_INCOMING_FACE_ID => {
                    packet.add_header_field(LpHeaderField::IncomingFaceId(non_negative_integer(value)?));
                }
                tlv_types::LP_CONGESTION_MARK => {
                    packet.add_header_field(LpHeaderField::CongestionMark(non_negative_integer(value)?));
                }
                other if is_ignorable_header_field(other) => {
                    trace!("Skipping LpPacket header field {}", other);
                }
                other => return Err(DecodingError::UnrecognizedCriticalType { tlv_type: other, offset }),
            }
        }

        decoder.finish_nested_tlvs(end)?;
        decoder.finish()?;
        Ok(packet)
    }
}

fn encode_selectors_value(encoder: &mut TlvEncoder, interest: &Interest) -> Result<(), EncodingError> {
    encoder.write_boolean_tlv(tlv_types::MUST_BE_FRESH, interest.must_be_fresh())?;
    encoder.write_optional_non_negative_integer_tlv(tlv_types::CHILD_SELECTOR, interest.child_selector())?;
    if !interest.exclude().is_empty() {
        encoder.write_nested_tlv(tlv_types::EXCLUDE, |encoder| encode_exclude_value(encoder, interest.exclude()))?;
    }
    if !interest.key_locator().is_none() {
        encoder.write_nested_tlv(tlv_types::PUBLISHER_PUBLIC_KEY_LOCATOR, |encoder| {
            encode_key_locator_value(encoder, interest.key_locator())
        })?;
    }
    encoder.write_optional_non_negative_integer_tlv(
        tlv_types::MAX_SUFFIX_COMPONENTS,
        interest.max_suffix_components(),
    )?;
    encoder.write_optional_non_negative_integer_tlv(
        tlv_types::MIN_SUFFIX_COMPONENTS,
        interest.min_suffix_components(),
    )
}

fn decode_selectors(decoder: &mut TlvDecoder<'_>, interest: &mut Interest) -> Result<(), DecodingError> {
    let end = decoder.read_nested_tlvs_start(tlv_types::SELECTORS)?;
    interest.set_min_suffix_components(
        decoder.read_optional_non_negative_integer_tlv(tlv_types::MIN_SUFFIX_COMPONENTS, end)?,
    );
    interest.set_max_suffix_components(
        decoder.read_optional_non_negative_integer_tlv(tlv_types::MAX_SUFFIX_COMPONENTS, end)?,
    );
    if decoder.peek_type(tlv_types::PUBLISHER_PUBLIC_KEY_LOCATOR, end)? {
        interest.set_key_locator(decode_key_locator(decoder, tlv_types::PUBLISHER_PUBLIC_KEY_LOCATOR)?);
    }
    if decoder.peek_type(tlv_types::EXCLUDE, end)? {
        interest.set_exclude(decode_exclude(decoder)?);
    }
    interest.set_child_selector(decoder.read_optional_non_negative_integer_tlv(tlv_types::CHILD_SELECTOR, end)?);
    interest.set_must_be_fresh(decoder.read_boolean_tlv(tlv_types::MUST_BE_FRESH, end)?);
    decoder.finish_nested_tlvs(end)
}

fn write_validity_period(encoder: &mut TlvEncoder, period: &ValidityPeriod) -> Result<(), EncodingError> {
    encoder.write_nested_tlv(tlv_types::VALIDITY_PERIOD, |encoder| {
        encoder.write_blob_tlv(
            tlv_types::NOT_AFTER,
            ValidityPeriod::format_time(&period.not_after).as_bytes(),
        )?;
        encoder.write_blob_tlv(
            tlv_types::NOT_BEFORE,
            ValidityPeriod::format_time(&period.not_before).as_bytes(),
        )
    })
}

fn read_validity_period(decoder: &mut TlvDecoder<'_>) -> Result<ValidityPeriod, DecodingError> {
    let end = decoder.read_nested_tlvs_start(tlv_types::VALIDITY_PERIOD)?;
    let not_before = ValidityPeriod::parse_time(decoder.read_blob_tlv(tlv_types::NOT_BEFORE)?)?;
    let not_after = ValidityPeriod::parse_time(decoder.read_blob_tlv(tlv_types::NOT_AFTER)?)?;
    decoder.finish_nested_tlvs(end)?;
    Ok(ValidityPeriod::new(not_before, not_after))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_offsets() {
        let mut encoder = TlvEncoder::new();
        let (first, last) = encode_name(&mut encoder, &Name::new()).unwrap();
        assert_eq!(encoder.output(), &[0x07, 0x00]);
        assert_eq!(first, last);

        let mut decoder = TlvDecoder::new(encoder.output());
        let (name, first, last) = decode_name(&mut decoder).unwrap();
        assert!(name.is_empty());
        assert_eq!((first, last), (2, 2));
    }

    #[test]
    fn test_implicit_digest_length_checked() {
        let input = [0x07, 0x04, 0x01, 0x02, 0xAA, 0xBB];
        let mut decoder = TlvDecoder::new(&input);
        assert!(matches!(decode_name(&mut decoder), Err(DecodingError::InvalidValue(_))));
    }

    #[test]
    fn test_exclude_wire_layout() {
        let mut exclude = Exclude::new();
        exclude.append_any().append_component(NameComponent::from("b"));
        let mut encoder = TlvEncoder::new();
        encoder
            .write_nested_tlv(tlv_types::EXCLUDE, |encoder| encode_exclude_value(encoder, &exclude))
            .unwrap();
        assert_eq!(encoder.output(), &[0x10, 0x05, 0x13, 0x00, 0x08, 0x01, b'b']);

        let mut decoder = TlvDecoder::new(encoder.output());
        assert_eq!(decode_exclude(&mut decoder).unwrap(), exclude);
    }

    #[test]
    fn test_meta_info_content_type() {
        let mut meta_info = MetaInfo::new();
        meta_info.set_content_type(ContentType::Key);
        let mut encoder = TlvEncoder::new();
        encoder
            .write_nested_tlv(tlv_types::META_INFO, |encoder| encode_meta_info_value(encoder, &meta_info))
            .unwrap();
        assert_eq!(encoder.output(), &[0x14, 0x03, 0x18, 0x01, 0x02]);

        let mut decoder = TlvDecoder::new(encoder.output());
        assert_eq!(decode_meta_info(&mut decoder).unwrap(), meta_info);
    }
}
