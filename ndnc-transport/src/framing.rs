use log::warn;
use thiserror::Error;

use ndnc_core::tlv::{peek_element_length, DecodingError};

/// Framing errors that can occur while splitting a byte stream into packets
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("Packet too large: {size} bytes (max: {max})")]
    PacketTooLarge { size: usize, max: usize },
    #[error("Invalid TLV header: {0}")]
    InvalidHeader(#[from] DecodingError),
}

/// Splits a byte stream into complete top-level TLV elements.
///
/// NDN stream transports carry bare TLV elements back to back, so the
/// element's own Type and Length delimit it.
#[derive(Debug)]
pub struct ElementReader {
    buffer: Vec<u8>,
    max_packet_size: usize,
}

impl ElementReader {
    pub fn new(max_packet_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_packet_size,
        }
    }

    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    /// Add incoming data to the buffer
    pub fn add_data(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Extract all complete elements from the buffer.
    ///
    /// A malformed header or an oversized element leaves the stream with no
    /// usable boundary, so the buffer is dropped before the error is returned.
    pub fn extract_elements(&mut self) -> Result<Vec<Vec<u8>>, FramingError> {
        let mut elements = Vec::new();
        let mut consumed = 0;

        loop {
            let remaining = &self.buffer[consumed..];
            let length = match peek_element_length(remaining) {
                Ok(Some(length)) => length,
                Ok(None) => break,
                Err(e) => {
                    warn!("Dropping {} buffered bytes: {}", self.buffer.len(), e);
                    self.buffer.clear();
                    return Err(e.into());
                }
            };

            if length > self.max_packet_size {
                warn!("Dropping {} buffered bytes: element of {} bytes", self.buffer.len(), length);
                self.buffer.clear();
                return Err(FramingError::PacketTooLarge {
                    size: length,
                    max: self.max_packet_size,
                });
            }

            if remaining.len() < length {
                // Not enough data for complete element
                break;
            }

            elements.push(remaining[..length].to_vec());
            consumed += length;
        }

        self.buffer.drain(..consumed);
        Ok(elements)
    }

    /// Get current buffer size
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer (for error recovery)
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_element() {
        let mut reader = ElementReader::new(8800);
        reader.add_data(&[0x05, 0x03, 0x07, 0x01, 0x08]);

        let elements = reader.extract_elements().unwrap();
        assert_eq!(elements, vec![vec![0x05, 0x03, 0x07, 0x01, 0x08]]);
        assert_eq!(reader.buffer_size(), 0);
    }

    #[test]
    fn test_partial_element_reception() {
        let element = [0x06, 0xFD, 0x00, 0x02, 0xAA, 0xBB];
        let mut reader = ElementReader::new(8800);

        // Split inside the length header
        reader.add_data(&element[..2]);
        assert!(reader.extract_elements().unwrap().is_empty());
        reader.add_data(&element[2..5]);
        assert!(reader.extract_elements().unwrap().is_empty());
        assert_eq!(reader.buffer_size(), 5);

        reader.add_data(&element[5..]);
        let elements = reader.extract_elements().unwrap();
        assert_eq!(elements, vec![element.to_vec()]);
    }

    #[test]
    fn test_back_to_back_elements() {
        let mut reader = ElementReader::new(8800);
        reader.add_data(&[0x15, 0x01, 0xAA, 0x15, 0x00, 0x15]);

        let elements = reader.extract_elements().unwrap();
        assert_eq!(elements, vec![vec![0x15, 0x01, 0xAA], vec![0x15, 0x00]]);
        // The lone type byte waits for its length
        assert_eq!(reader.buffer_size(), 1);
    }

    #[test]
    fn test_oversized_element_rejected() {
        let mut reader = ElementReader::new(16);
        reader.add_data(&[0x06, 0x20, 0x00]);

        assert!(matches!(
            reader.extract_elements(),
            Err(FramingError::PacketTooLarge { size: 34, max: 16 })
        ));
        assert_eq!(reader.buffer_size(), 0);
    }

    #[test]
    fn test_non_canonical_header_rejected() {
        let mut reader = ElementReader::new(8800);
        reader.add_data(&[0x06, 0xFD, 0x00, 0x01, 0x00]);

        assert!(matches!(reader.extract_elements(), Err(FramingError::InvalidHeader(_))));
        assert_eq!(reader.buffer_size(), 0);
    }
}
