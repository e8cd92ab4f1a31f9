//! NDN TLV (Type-Length-Value) primitives.
//!
//! Wire format:
//! - Type: variable-length number
//! - Length: variable-length number
//! - Value: `Length` bytes
//!
//! A variable-length number is 1 byte if it is below 253, otherwise a marker
//! byte (0xFD, 0xFE, 0xFF) followed by 2, 4 or 8 big-endian bytes.

use thiserror::Error;

/// TLV type numbers for NDN packets
pub mod tlv_types {
    pub const IMPLICIT_SHA256_DIGEST_COMPONENT: u64 = 0x01;
    pub const INTEREST: u64 = 0x05;
    pub const DATA: u64 = 0x06;
    pub const NAME: u64 = 0x07;
    pub const NAME_COMPONENT: u64 = 0x08;
    pub const SELECTORS: u64 = 0x09;
    pub const NONCE: u64 = 0x0A;
    pub const SCOPE: u64 = 0x0B;
    pub const INTEREST_LIFETIME: u64 = 0x0C;
    pub const MIN_SUFFIX_COMPONENTS: u64 = 0x0D;
    pub const MAX_SUFFIX_COMPONENTS: u64 = 0x0E;
    pub const PUBLISHER_PUBLIC_KEY_LOCATOR: u64 = 0x0F;
    pub const EXCLUDE: u64 = 0x10;
    pub const CHILD_SELECTOR: u64 = 0x11;
    pub const MUST_BE_FRESH: u64 = 0x12;
    pub const ANY: u64 = 0x13;
    pub const META_INFO: u64 = 0x14;
    pub const CONTENT: u64 = 0x15;
    pub const SIGNATURE_INFO: u64 = 0x16;
    pub const SIGNATURE_VALUE: u64 = 0x17;
    pub const CONTENT_TYPE: u64 = 0x18;
    pub const FRESHNESS_PERIOD: u64 = 0x19;
    pub const FINAL_BLOCK_ID: u64 = 0x1A;
    pub const SIGNATURE_TYPE: u64 = 0x1B;
    pub const KEY_LOCATOR: u64 = 0x1C;
    pub const KEY_LOCATOR_DIGEST: u64 = 0x1D;
    pub const VALIDITY_PERIOD: u64 = 0xFD;
    pub const NOT_BEFORE: u64 = 0xFE;
    pub const NOT_AFTER: u64 = 0xFF;

    // NFD management
    pub const CONTROL_RESPONSE: u64 = 0x65;
    pub const STATUS_CODE: u64 = 0x66;
    pub const STATUS_TEXT: u64 = 0x67;
    pub const CONTROL_PARAMETERS: u64 = 0x68;
    pub const FACE_ID: u64 = 0x69;
    pub const COST: u64 = 0x6A;
    pub const STRATEGY: u64 = 0x6B;
    pub const FLAGS: u64 = 0x6C;
    pub const EXPIRATION_PERIOD: u64 = 0x6D;
    pub const LOCAL_CONTROL_FEATURE: u64 = 0x6E;
    pub const ORIGIN: u64 = 0x6F;
    pub const URI: u64 = 0x72;

    // NDNLPv2
    pub const LP_PACKET: u64 = 0x64;
    pub const LP_FRAGMENT: u64 = 0x50;
    pub const LP_SEQUENCE: u64 = 0x51;
    pub const LP_NACK: u64 = 0x0320;
    pub const LP_NACK_REASON: u64 = 0x0321;
    pub const LP_INCOMING_FACE_ID: u64 = 0x032C;
    pub const LP_CONGESTION_MARK: u64 = 0x0340;
}

/// Errors raised while encoding a packet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("Encoder capacity exceeded: need {needed} bytes, capacity is {capacity}")]
    CapacityExceeded { capacity: usize, needed: usize },
    #[error("{signature_type} signature value present without a KeyLocator")]
    MissingKeyLocator { signature_type: &'static str },
    #[error("Invalid signature info: {0}")]
    InvalidSignatureInfo(String),
    #[error("Invalid field value: {0}")]
    InvalidValue(String),
}

/// Errors raised while decoding a packet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodingError {
    #[error("Input ended early: need {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("Expected TLV type {expected:#x}, found {actual:#x} at offset {offset}")]
    UnexpectedType {
        expected: u64,
        actual: u64,
        offset: usize,
    },
    #[error("Nested TLV length mismatch: block ends at {expected_end}, cursor at {actual}")]
    LengthMismatch { expected_end: usize, actual: usize },
    #[error("Non-canonical variable-length number at offset {0}")]
    NonCanonicalVarNumber(usize),
    #[error("Invalid non-negative integer length {0}")]
    InvalidNonNegativeInteger(usize),
    #[error("Unrecognized critical TLV type {tlv_type:#x} at offset {offset}")]
    UnrecognizedCriticalType { tlv_type: u64, offset: usize },
    #[error("{0} trailing bytes after the packet")]
    TrailingBytes(usize),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Number of bytes `write_var_number` uses for `value`
pub fn var_number_size(value: u64) -> usize {
    if value < 253 {
        1
    } else if value <= u16::MAX as u64 {
        3
    } else if value <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

/// A TLV type is critical if it is in the reserved range or odd.
/// Unrecognized critical elements abort decoding.
pub fn is_critical_type(tlv_type: u64) -> bool {
    tlv_type <= 31 || tlv_type & 1 == 1
}

/// Non-critical types some decoder in this crate reads by name
fn is_recognized_non_critical_type(tlv_type: u64) -> bool {
    use tlv_types::*;
    matches!(
        tlv_type,
        NOT_BEFORE
            | LP_PACKET
            | CONTROL_RESPONSE
            | STATUS_CODE
            | CONTROL_PARAMETERS
            | COST
            | FLAGS
            | LOCAL_CONTROL_FEATURE
            | URI
            | LP_FRAGMENT
            | LP_NACK
            | LP_INCOMING_FACE_ID
            | LP_CONGESTION_MARK
    )
}

/// Back-to-front TLV encoder.
///
/// Output is built from the end of the buffer towards the start, so a nested
/// block is always encoded before its header and every length is taken from
/// bytes already written.
#[derive(Debug, Clone)]
pub struct TlvEncoder {
    buffer: Vec<u8>,
    length: usize,
    fixed_capacity: bool,
}

impl TlvEncoder {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a growable encoder with an initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0u8; capacity.max(16)],
            length: 0,
            fixed_capacity: false,
        }
    }

    /// Create an encoder that never grows past `capacity` bytes and
    /// fails with `EncodingError::CapacityExceeded` instead
    pub fn with_fixed_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0u8; capacity],
            length: 0,
            fixed_capacity: true,
        }
    }

    /// Bytes written so far. Offsets recorded with this value count from the end of the output.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn output(&self) -> &[u8] {
        &self.buffer[self.buffer.len() - self.length..]
    }

    pub fn into_output(mut self) -> Vec<u8> {
        let start = self.buffer.len() - self.length;
        self.buffer.drain(..start);
        self.buffer
    }

    fn ensure_room(&mut self, additional: usize) -> Result<(), EncodingError> {
        let needed = self.length + additional;
        if needed <= self.buffer.len() {
            return Ok(());
        }
        if self.fixed_capacity {
            return Err(EncodingError::CapacityExceeded {
                capacity: self.buffer.len(),
                needed,
            });
        }

        let mut new_capacity = self.buffer.len().max(16);
        while new_capacity < needed {
            new_capacity *= 2;
        }
        let mut new_buffer = vec![0u8; new_capacity];
        let old_start = self.buffer.len() - self.length;
        new_buffer[new_capacity - self.length..].copy_from_slice(&self.buffer[old_start..]);
        self.buffer = new_buffer;
        Ok(())
    }

    /// Write raw bytes in front of everything written so far
    pub fn prepend(&mut self, bytes: &[u8]) -> Result<(), EncodingError> {
        self.ensure_room(bytes.len())?;
        let end = self.buffer.len() - self.length;
        self.buffer[end - bytes.len()..end].copy_from_slice(bytes);
        self.length += bytes.len();
        Ok(())
    }

    /// Write a variable-length number using the shortest encoding
    pub fn write_var_number(&mut self, value: u64) -> Result<(), EncodingError> {
        if value < 253 {
            self.prepend(&[value as u8])
        } else if value <= u16::MAX as u64 {
            let mut bytes = [0xFDu8; 3];
            bytes[1..].copy_from_slice(&(value as u16).to_be_bytes());
            self.prepend(&bytes)
        } else if value <= u32::MAX as u64 {
            let mut bytes = [0xFEu8; 5];
            bytes[1..].copy_from_slice(&(value as u32).to_be_bytes());
            self.prepend(&bytes)
        } else {
            let mut bytes = [0xFFu8; 9];
            bytes[1..].copy_from_slice(&value.to_be_bytes());
            self.prepend(&bytes)
        }
    }

    pub fn write_type_and_length(&mut self, tlv_type: u64, length: usize) -> Result<(), EncodingError> {
        // Back to front: the length lands after the type
        self.write_var_number(length as u64)?;
        self.write_var_number(tlv_type)
    }

    pub fn write_blob_tlv(&mut self, tlv_type: u64, value: &[u8]) -> Result<(), EncodingError> {
        self.prepend(value)?;
        self.write_type_and_length(tlv_type, value.len())
    }

    /// Write nothing for an absent value; a present empty value still gets a zero-length TLV
    pub fn write_optional_blob_tlv(&mut self, tlv_type: u64, value: Option<&[u8]>) -> Result<(), EncodingError> {
        match value {
            Some(value) => self.write_blob_tlv(tlv_type, value),
            None => Ok(()),
        }
    }

    /// Write a NonNegativeInteger value as 1, 2, 4 or 8 big-endian bytes
    pub fn write_non_negative_integer(&mut self, value: u64) -> Result<(), EncodingError> {
        if value <= u8::MAX as u64 {
            self.prepend(&[value as u8])
        } else if value <= u16::MAX as u64 {
            self.prepend(&(value as u16).to_be_bytes())
        } else if value <= u32::MAX as u64 {
            self.prepend(&(value as u32).to_be_bytes())
        } else {
            self.prepend(&value.to_be_bytes())
        }
    }

    pub fn write_non_negative_integer_tlv(&mut self, tlv_type: u64, value: u64) -> Result<(), EncodingError> {
        let before = self.length;
        self.write_non_negative_integer(value)?;
        self.write_type_and_length(tlv_type, self.length - before)
    }

    pub fn write_optional_non_negative_integer_tlv(
        &mut self,
        tlv_type: u64,
        value: Option<u64>,
    ) -> Result<(), EncodingError> {
        match value {
            Some(value) => self.write_non_negative_integer_tlv(tlv_type, value),
            None => Ok(()),
        }
    }

    /// Write a zero-length TLV if `value` is true
    pub fn write_boolean_tlv(&mut self, tlv_type: u64, value: bool) -> Result<(), EncodingError> {
        if value {
            self.write_type_and_length(tlv_type, 0)
        } else {
            Ok(())
        }
    }

    /// Encode the value with `write_value`, then write the header in front of it.
    /// `write_value` must write the inner fields in reverse order.
    pub fn write_nested_tlv<F>(&mut self, tlv_type: u64, write_value: F) -> Result<(), EncodingError>
    where
        F: FnOnce(&mut Self) -> Result<(), EncodingError>,
    {
        let before = self.length;
        write_value(self)?;
        self.write_type_and_length(tlv_type, self.length - before)
    }

    /// Like `write_nested_tlv`, but writes nothing when the value is empty
    pub fn write_optional_nested_tlv<F>(&mut self, tlv_type: u64, write_value: F) -> Result<(), EncodingError>
    where
        F: FnOnce(&mut Self) -> Result<(), EncodingError>,
    {
        let before = self.length;
        write_value(self)?;
        if self.length == before {
            return Ok(());
        }
        self.write_type_and_length(tlv_type, self.length - before)
    }
}

impl Default for TlvEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Front-to-back TLV decoder with strict nesting bounds.
///
/// Every nested block pushes its declared end offset; no read may cross the
/// innermost end, and leaving the block requires the cursor to sit exactly on it.
#[derive(Debug, Clone)]
pub struct TlvDecoder<'a> {
    input: &'a [u8],
    offset: usize,
    ends: Vec<usize>,
    skip_non_critical: bool,
}

impl<'a> TlvDecoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            ends: Vec::new(),
            skip_non_critical: false,
        }
    }

    /// Skip unrecognized non-critical elements inside nested blocks instead
    /// of failing on them
    pub fn skipping_non_critical(mut self) -> Self {
        self.skip_non_critical = true;
        self
    }

    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Move the cursor, used to rewind after a lookahead
    pub fn seek(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn slice(&self, begin: usize, end: usize) -> &'a [u8] {
        &self.input[begin..end]
    }

    /// End of the innermost open block, or of the input
    fn limit(&self) -> usize {
        self.ends.last().copied().unwrap_or(self.input.len())
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], DecodingError> {
        let limit = self.limit();
        if count > limit.saturating_sub(self.offset) {
            return Err(DecodingError::Truncated {
                offset: self.offset,
                needed: count,
                available: limit.saturating_sub(self.offset),
            });
        }
        let bytes = &self.input[self.offset..self.offset + count];
        self.offset += count;
        Ok(bytes)
    }

    pub fn read_var_number(&mut self) -> Result<u64, DecodingError> {
        let start = self.offset;
        let first = self.take(1)?[0];
        let (value, minimum) = match first {
            0xFD => {
                let bytes = self.take(2)?;
                (u16::from_be_bytes([bytes[0], bytes[1]]) as u64, 253)
            }
            0xFE => {
                let bytes = self.take(4)?;
                (u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64, 1 << 16)
            }
            0xFF => {
                let bytes = self.take(8)?;
                let mut value = [0u8; 8];
                value.copy_from_slice(bytes);
                (u64::from_be_bytes(value), 1 << 32)
            }
            small => return Ok(small as u64),
        };

        if value < minimum {
            return Err(DecodingError::NonCanonicalVarNumber(start));
        }
        Ok(value)
    }

    /// Skip unrecognized non-critical elements ahead of the cursor, up to `end_offset`
    fn skip_unrecognized(&mut self, end_offset: usize) -> Result<(), DecodingError> {
        if !self.skip_non_critical || self.ends.is_empty() {
            return Ok(());
        }
        while self.offset < end_offset {
            let start = self.offset;
            let tlv_type = self.read_var_number()?;
            if is_critical_type(tlv_type) || is_recognized_non_critical_type(tlv_type) {
                self.offset = start;
                break;
            }
            let length = self.read_length()?;
            self.take(length)?;
        }
        Ok(())
    }

    /// Read the header of a TLV of `expected_type` and return its value length
    pub fn read_type_and_length(&mut self, expected_type: u64) -> Result<usize, DecodingError> {
        let limit = self.limit();
        self.skip_unrecognized(limit)?;
        let start = self.offset;
        let tlv_type = self.read_var_number()?;
        if tlv_type != expected_type {
            return Err(DecodingError::UnexpectedType {
                expected: expected_type,
                actual: tlv_type,
                offset: start,
            });
        }
        self.read_length()
    }

    fn read_length(&mut self) -> Result<usize, DecodingError> {
        let length = self.read_var_number()?;
        let available = self.limit().saturating_sub(self.offset);
        if length > available as u64 {
            return Err(DecodingError::Truncated {
                offset: self.offset,
                needed: usize::try_from(length).unwrap_or(usize::MAX),
                available,
            });
        }
        Ok(length as usize)
    }

    /// Enter a nested block of `expected_type` and return its end offset
    pub fn read_nested_tlvs_start(&mut self, expected_type: u64) -> Result<usize, DecodingError> {
        let length = self.read_type_and_length(expected_type)?;
        let end = self.offset + length;
        self.ends.push(end);
        Ok(end)
    }

    /// Leave the nested block ending at `end_offset`
    pub fn finish_nested_tlvs(&mut self, end_offset: usize) -> Result<(), DecodingError> {
        if self.skip_non_critical {
            while self.offset < end_offset {
                let start = self.offset;
                let tlv_type = self.read_var_number()?;
                if is_critical_type(tlv_type) {
                    return Err(DecodingError::UnrecognizedCriticalType { tlv_type, offset: start });
                }
                let length = self.read_length()?;
                self.take(length)?;
            }
        }

        let expected_end = self.ends.pop().unwrap_or(self.input.len());
        if self.offset != end_offset || expected_end != end_offset {
            return Err(DecodingError::LengthMismatch {
                expected_end,
                actual: self.offset,
            });
        }
        Ok(())
    }

    /// Check whether the next TLV before `end_offset` has `expected_type`, without consuming it
    pub fn peek_type(&mut self, expected_type: u64, end_offset: usize) -> Result<bool, DecodingError> {
        self.skip_unrecognized(end_offset)?;
        if self.offset >= end_offset {
            return Ok(false);
        }
        let start = self.offset;
        let tlv_type = self.read_var_number();
        self.offset = start;
        Ok(tlv_type? == expected_type)
    }

    pub fn read_blob_tlv(&mut self, expected_type: u64) -> Result<&'a [u8], DecodingError> {
        let length = self.read_type_and_length(expected_type)?;
        self.take(length)
    }

    pub fn read_optional_blob_tlv(
        &mut self,
        expected_type: u64,
        end_offset: usize,
    ) -> Result<Option<&'a [u8]>, DecodingError> {
        if self.peek_type(expected_type, end_offset)? {
            self.read_blob_tlv(expected_type).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Read a NonNegativeInteger value of `length` bytes
    pub fn read_non_negative_integer(&mut self, length: usize) -> Result<u64, DecodingError> {
        if !matches!(length, 1 | 2 | 4 | 8) {
            return Err(DecodingError::InvalidNonNegativeInteger(length));
        }
        let bytes = self.take(length)?;
        Ok(bytes.iter().fold(0u64, |value, byte| (value << 8) | *byte as u64))
    }

    pub fn read_non_negative_integer_tlv(&mut self, expected_type: u64) -> Result<u64, DecodingError> {
        let length = self.read_type_and_length(expected_type)?;
        self.read_non_negative_integer(length)
    }

    pub fn read_optional_non_negative_integer_tlv(
        &mut self,
        expected_type: u64,
        end_offset: usize,
    ) -> Result<Option<u64>, DecodingError> {
        if self.peek_type(expected_type, end_offset)? {
            self.read_non_negative_integer_tlv(expected_type).map(Some)
        } else {
            Ok(None)
        }
    }

    /// A boolean TLV is true when present; its value is ignored
    pub fn read_boolean_tlv(&mut self, expected_type: u64, end_offset: usize) -> Result<bool, DecodingError> {
        if !self.peek_type(expected_type, end_offset)? {
            return Ok(false);
        }
        let length = self.read_type_and_length(expected_type)?;
        self.take(length)?;
        Ok(true)
    }

    /// Read any TLV and return its type and value
    pub fn read_any_tlv(&mut self) -> Result<(u64, &'a [u8]), DecodingError> {
        let tlv_type = self.read_var_number()?;
        let length = self.read_length()?;
        Ok((tlv_type, self.take(length)?))
    }

    /// Fail if anything follows the top-level element
    pub fn finish(&self) -> Result<(), DecodingError> {
        if self.offset < self.input.len() {
            return Err(DecodingError::TrailingBytes(self.input.len() - self.offset));
        }
        Ok(())
    }
}

/// Total length of the TLV element at the start of `input`, header included.
///
/// Returns `Ok(None)` while the header itself is incomplete. Used to find
/// element boundaries in a byte stream.
pub fn peek_element_length(input: &[u8]) -> Result<Option<usize>, DecodingError> {
    let mut decoder = TlvDecoder::new(input);
    let header = decoder
        .read_var_number()
        .and_then(|_| decoder.read_var_number());
    match header {
        Ok(length) => Ok(Some(decoder.offset().saturating_add(usize::try_from(length).unwrap_or(usize::MAX)))),
        Err(DecodingError::Truncated { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}
