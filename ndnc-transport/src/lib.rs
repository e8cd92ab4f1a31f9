//! Exchanging NDN packets with a forwarder.
//!
//! A `Transport` moves whole TLV elements; `Face` sits on top of one and
//! matches Data to pending Interests, dispatches Interests to filters and
//! drives certificate fetches for validation.

use log::info;
use thiserror::Error;

pub mod face;
pub mod framing;
pub mod tcp;

pub use face::{Face, FaceError, InterestFilterId, PendingInterestId};
pub use framing::{ElementReader, FramingError};
pub use tcp::TcpTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport is not connected")]
    NotConnected,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),
}

pub trait Transport {
    /// Send one complete TLV element
    fn send(&mut self, packet: &[u8]) -> Result<(), TransportError>;
    /// Complete elements received since the last call. Never blocks.
    fn receive(&mut self) -> Result<Vec<Vec<u8>>, TransportError>;
    fn is_connected(&self) -> bool;
    fn close(&mut self) -> Result<(), TransportError>;
}

pub fn init() {
    info!("NDNC Transport initialized");
}
