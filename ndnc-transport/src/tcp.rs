use std::{
    io::{ErrorKind, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
};

use log::{debug, info};

use crate::framing::ElementReader;
use crate::{Transport, TransportError};
use ndnc_core::config::DEFAULT_MAX_PACKET_SIZE;

/// Stream transport to a forwarder's TCP face
pub struct TcpTransport {
    stream: Option<TcpStream>,
    reader: ElementReader,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::with_max_packet_size(DEFAULT_MAX_PACKET_SIZE)
    }

    pub fn with_max_packet_size(max_packet_size: usize) -> Self {
        Self {
            stream: None,
            reader: ElementReader::new(max_packet_size),
        }
    }

    pub fn connect<A: ToSocketAddrs>(&mut self, addr: A) -> Result<(), TransportError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;
        info!("Connected to {}", stream.peer_addr()?);
        self.reader.clear();
        self.stream = Some(stream);
        Ok(())
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        // Writes block so a packet is never left half sent
        stream.set_nonblocking(false)?;
        let result = stream.write_all(packet);
        stream.set_nonblocking(true)?;
        result?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<Vec<u8>>, TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::NotConnected);
        };

        let mut buffer = vec![0; self.reader.max_packet_size()];
        loop {
            match stream.read(&mut buffer) {
                Ok(0) => {
                    info!("Connection closed by peer");
                    self.stream = None;
                    break;
                }
                Ok(bytes_read) => {
                    debug!("Received {} bytes", bytes_read);
                    self.reader.add_data(&buffer[..bytes_read]);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(self.reader.extract_elements()?)
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if let Some(stream) = self.stream.take() {
            stream.shutdown(Shutdown::Both)?;
        }
        self.reader.clear();
        Ok(())
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}
