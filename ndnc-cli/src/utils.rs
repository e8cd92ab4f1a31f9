use anyhow::Context;
use serde::Serialize;

use ndnc_core::lp::is_lp_packet;
use ndnc_core::tlv::{tlv_types, TlvDecoder};
use ndnc_core::{default_wire_format, Data, Interest, Name};

/// Parse hex, ignoring whitespace so packets can be pasted across lines
pub fn parse_hex(input: &str) -> anyhow::Result<Vec<u8>> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).context("Invalid hex")
}

#[derive(Debug, Serialize)]
pub struct ComponentSummary {
    #[serde(rename = "type")]
    pub component_type: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct NameSummary {
    pub uri: String,
    pub components: Vec<ComponentSummary>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "packet")]
pub enum PacketSummary {
    Interest {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        nonce: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        lifetime_ms: Option<u128>,
        must_be_fresh: bool,
    },
    Data {
        name: String,
        content_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        freshness_period_ms: Option<u128>,
        content: String,
        signature_type: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        key_locator: Option<String>,
    },
    LpPacket {
        #[serde(skip_serializing_if = "Option::is_none")]
        nack_reason: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        incoming_face_id: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        congestion_mark: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fragment: Option<Box<PacketSummary>>,
    },
}

pub fn describe_name(name: &Name) -> NameSummary {
    NameSummary {
        uri: name.to_uri(),
        components: name
            .iter()
            .map(|component| ComponentSummary {
                component_type: format!("{:?}", component.component_type()),
                value: component.to_escaped_string(),
                segment: component.to_segment().ok(),
                version: component.to_version().ok(),
            })
            .collect(),
    }
}

/// Decode an Interest, Data or LpPacket with the default wire format
pub fn describe_packet(bytes: &[u8]) -> anyhow::Result<PacketSummary> {
    let format = default_wire_format();

    if is_lp_packet(bytes) {
        let packet = format.decode_lp_packet(bytes)?;
        let fragment = match packet.fragment() {
            Some(fragment) => Some(Box::new(describe_packet(fragment)?)),
            None => None,
        };
        return Ok(PacketSummary::LpPacket {
            nack_reason: packet.nack().map(|nack| nack.reason.to_string()),
            incoming_face_id: packet.incoming_face_id(),
            congestion_mark: packet.congestion_mark(),
            fragment,
        });
    }

    match TlvDecoder::new(bytes).read_var_number()? {
        tlv_types::INTEREST => {
            let interest = Interest::wire_decode(bytes)?;
            Ok(PacketSummary::Interest {
                name: interest.name().to_uri(),
                nonce: interest.nonce().map(hex::encode),
                lifetime_ms: interest.interest_lifetime().map(|lifetime| lifetime.as_millis()),
                must_be_fresh: interest.must_be_fresh(),
            })
        }
        tlv_types::DATA => {
            let data = Data::wire_decode(bytes)?;
            Ok(PacketSummary::Data {
                name: data.name().to_uri(),
                content_type: format!("{:?}", data.meta_info().content_type()),
                freshness_period_ms: data.meta_info().freshness_period().map(|period| period.as_millis()),
                content: hex::encode(data.content()),
                signature_type: data.signature().type_name(),
                key_locator: data
                    .signature()
                    .key_locator()
                    .and_then(|locator| locator.key_name())
                    .map(|name| name.to_uri()),
            })
        }
        other => anyhow::bail!("Unknown packet type {:#x}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("05 02\n0700").unwrap(), vec![0x05, 0x02, 0x07, 0x00]);
        assert!(parse_hex("0g").is_err());
    }

    #[test]
    fn test_describe_name() {
        let summary = describe_name(&Name::from_uri("/ndn/%00%05").unwrap());
        assert_eq!(summary.uri, "/ndn/%00%05");
        assert_eq!(summary.components.len(), 2);
        assert_eq!(summary.components[1].segment, Some(5));
        assert_eq!(summary.components[0].segment, None);
    }

    #[test]
    fn test_describe_interest() {
        let mut interest = Interest::new(Name::from_uri("/test/name").unwrap());
        interest.set_must_be_fresh(true).set_nonce(vec![1, 2, 3, 4]);
        let bytes = interest.wire_encode().unwrap().bytes().to_vec();

        match describe_packet(&bytes).unwrap() {
            PacketSummary::Interest {
                name,
                nonce,
                must_be_fresh,
                ..
            } => {
                assert_eq!(name, "/test/name");
                assert_eq!(nonce.as_deref(), Some("01020304"));
                assert!(must_be_fresh);
            }
            other => panic!("Expected an Interest, got {:?}", other),
        }
    }

    #[test]
    fn test_describe_data_as_json() {
        let mut data = Data::new(Name::from_uri("/a/b").unwrap());
        data.set_content(b"hi".to_vec());
        let bytes = data.wire_encode().unwrap().bytes().to_vec();

        let json = serde_json::to_value(describe_packet(&bytes).unwrap()).unwrap();
        assert_eq!(json["packet"], "Data");
        assert_eq!(json["name"], "/a/b");
        assert_eq!(json["content"], "6869");
    }

    #[test]
    fn test_unknown_packet_type() {
        assert!(describe_packet(&[0x15, 0x00]).is_err());
    }
}
