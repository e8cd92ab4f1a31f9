//! NDNLPv2 link protocol packets.
//!
//! Only the receive side is modelled: a forwarder may wrap the network layer
//! packet in an LpPacket carrying a Nack, an incoming face id or a congestion
//! mark. Fragmentation is not supported, so the fragment is always a whole
//! Interest or Data.

use std::fmt;

use crate::tlv::tlv_types;

/// Reason carried by a network Nack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NackReason {
    #[default]
    None,
    Congestion,
    Duplicate,
    NoRoute,
    Other(u64),
}

impl NackReason {
    pub fn code(&self) -> u64 {
        match self {
            NackReason::None => 0,
            NackReason::Congestion => 50,
            NackReason::Duplicate => 100,
            NackReason::NoRoute => 150,
            NackReason::Other(code) => *code,
        }
    }

    pub fn from_code(code: u64) -> Self {
        match code {
            0 => NackReason::None,
            50 => NackReason::Congestion,
            100 => NackReason::Duplicate,
            150 => NackReason::NoRoute,
            other => NackReason::Other(other),
        }
    }
}

impl fmt::Display for NackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NackReason::None => write!(f, "None"),
            NackReason::Congestion => write!(f, "Congestion"),
            NackReason::Duplicate => write!(f, "Duplicate"),
            NackReason::NoRoute => write!(f, "NoRoute"),
            NackReason::Other(code) => write!(f, "Other({})", code),
        }
    }
}

/// A Nack header field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkNack {
    pub reason: NackReason,
}

impl NetworkNack {
    pub fn new(reason: NackReason) -> Self {
        Self { reason }
    }
}

/// Link-layer fields attached to a received Interest or Data.
///
/// Not part of the packet: ignored by equality and change counting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkInfo {
    pub incoming_face_id: Option<u64>,
    pub congestion_mark: Option<u64>,
}

/// A header field of an LpPacket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LpHeaderField {
    Sequence(u64),
    Nack(NetworkNack),
    IncomingFaceId(u64),
    CongestionMark(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LpPacket {
    header_fields: Vec<LpHeaderField>,
    fragment: Option<Vec<u8>>,
}

impl LpPacket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header_fields(&self) -> &[LpHeaderField] {
        &self.header_fields
    }

    pub fn add_header_field(&mut self, field: LpHeaderField) -> &mut Self {
        self.header_fields.push(field);
        self
    }

    /// Wire encoding of the contained Interest or Data
    pub fn fragment(&self) -> Option<&[u8]> {
        self.fragment.as_deref()
    }

    pub fn set_fragment(&mut self, fragment: Option<Vec<u8>>) -> &mut Self {
        self.fragment = fragment;
        self
    }

    pub fn nack(&self) -> Option<&NetworkNack> {
        self.header_fields.iter().find_map(|field| match field {
            LpHeaderField::Nack(nack) => Some(nack),
            _ => None,
        })
    }

    pub fn incoming_face_id(&self) -> Option<u64> {
        self.header_fields.iter().find_map(|field| match field {
            LpHeaderField::IncomingFaceId(id) => Some(*id),
            _ => None,
        })
    }

    pub fn congestion_mark(&self) -> Option<u64> {
        self.header_fields.iter().find_map(|field| match field {
            LpHeaderField::CongestionMark(mark) => Some(*mark),
            _ => None,
        })
    }

    pub fn link_info(&self) -> LinkInfo {
        LinkInfo {
            incoming_face_id: self.incoming_face_id(),
            congestion_mark: self.congestion_mark(),
        }
    }
}

/// Check whether an unrecognized header field may be skipped.
///
/// Types 800 to 959 are header fields; those whose two low bits are clear
/// are ignorable.
pub fn is_ignorable_header_field(tlv_type: u64) -> bool {
    (800..=959).contains(&tlv_type) && tlv_type & 0x03 == 0
}

/// Check whether `input` starts with an LpPacket rather than a bare network packet
pub fn is_lp_packet(input: &[u8]) -> bool {
    input.first().map(|&byte| byte as u64) == Some(tlv_types::LP_PACKET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nack_reason_codes() {
        for reason in [NackReason::None, NackReason::Congestion, NackReason::Duplicate, NackReason::NoRoute] {
            assert_eq!(NackReason::from_code(reason.code()), reason);
        }
        assert_eq!(NackReason::from_code(7), NackReason::Other(7));
        assert_eq!(NackReason::NoRoute.to_string(), "NoRoute");
    }

    #[test]
    fn test_ignorable_header_fields() {
        assert!(is_ignorable_header_field(800));
        assert!(is_ignorable_header_field(956));
        assert!(!is_ignorable_header_field(801));
        assert!(!is_ignorable_header_field(960));
        assert!(!is_ignorable_header_field(0x50));
    }

    #[test]
    fn test_link_info_from_headers() {
        let mut packet = LpPacket::new();
        packet
            .add_header_field(LpHeaderField::IncomingFaceId(42))
            .add_header_field(LpHeaderField::CongestionMark(1));

        let info = packet.link_info();
        assert_eq!(info.incoming_face_id, Some(42));
        assert_eq!(info.congestion_mark, Some(1));
        assert!(packet.nack().is_none());
        assert!(is_lp_packet(&[0x64, 0x00]));
        assert!(!is_lp_packet(&[0x05, 0x00]));
    }
}
