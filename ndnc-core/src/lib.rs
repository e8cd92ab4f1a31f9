//! Named Data Networking packets, TLV wire formats and signing.
//!
//! Packets are built from `Name`s, encoded through a `WireFormat` (the
//! process-wide default is NDN-TLV 0.2) and signed with a `KeyChain`.
//! Received Data is checked with a `Validator`.

use log::info;

pub mod change_counter;
pub mod config;
pub mod control_parameters;
pub mod encoding;
pub mod lp;
pub mod name;
pub mod packets;
pub mod security;
pub mod signature;
pub mod tlv;

pub use config::{Config, ConfigError};
pub use control_parameters::{ControlParameters, ForwardingFlags};
pub use encoding::{
    default_wire_format, set_default_wire_format, wire_format_by_name, SignedBlob, SignedPortion, WireFormat,
};
pub use lp::{LinkInfo, LpPacket, NackReason, NetworkNack};
pub use name::{ComponentType, Name, NameComponent, NameParseError};
pub use packets::{ContentType, Data, Exclude, ExcludeEntry, Interest, MetaInfo};
pub use security::{digest_sha256, KeyChain, KeyStore, MemoryKeyStore, PublicKey, SecurityError};
pub use signature::{KeyLocator, KeyLocatorType, Signature, ValidityPeriod};
pub use tlv::{DecodingError, EncodingError, TlvDecoder, TlvEncoder};

pub fn init() {
    info!("NDNC core initialized, default wire format {}", default_wire_format().name());
}
