//! Application-side packet exchange over a `Transport`.
//!
//! The face is driven by `process_events`, which reads everything the
//! transport has, dispatches it, then fires expired timeouts. Every pending
//! Interest ends in exactly one callback: Data, timeout or network Nack.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{debug, info, trace, warn};
use thiserror::Error;

use ndnc_core::config::{Config, ConfigError, DEFAULT_MAX_PACKET_SIZE};
use ndnc_core::lp::{is_lp_packet, LinkInfo, NetworkNack};
use ndnc_core::security::validator::ValidationFailure;
use ndnc_core::security::{CertificateRequest, SecurityError, TrustPolicy, ValidationOutcome, Validator};
use ndnc_core::tlv::{tlv_types, DecodingError, EncodingError, TlvDecoder};
use ndnc_core::{default_wire_format, ControlParameters, Data, Interest, KeyChain, Name, NameComponent, WireFormat};

use crate::{Transport, TransportError};

/// Lifetime given to Interests that do not set one
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_secs(4);

/// Status code of a successful NFD command
const STATUS_OK: u64 = 200;

#[derive(Debug, Error)]
pub enum FaceError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Security error: {0}")]
    Security(#[from] SecurityError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Packet too large: {size} bytes (max: {max})")]
    PacketTooLarge { size: usize, max: usize },
    #[error("No key chain set for signing command Interests")]
    NoCommandKeyChain,
    #[error("No validator set")]
    NoValidator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PendingInterestId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterestFilterId(u64);

type OnData = Box<dyn FnOnce(&Interest, &Data)>;
type OnTimeout = Box<dyn FnOnce(&Interest)>;
type OnNetworkNack = Box<dyn FnOnce(&Interest, &NetworkNack)>;
type OnInterest = Box<dyn FnMut(&Name, &Interest) -> Option<Data>>;
type OnRegisterSuccess = Box<dyn FnOnce(&Name, InterestFilterId)>;
type OnRegisterFailed = Box<dyn FnOnce(&Name)>;

struct ValidationCallbacks {
    on_verified: Box<dyn FnOnce(Data)>,
    on_failed: Box<dyn FnOnce(Data, ValidationFailure)>,
}

enum PendingKind {
    Application {
        on_data: OnData,
        on_timeout: OnTimeout,
        on_nack: Option<OnNetworkNack>,
    },
    Certificate {
        request: CertificateRequest,
        retries_left: u32,
        callbacks: ValidationCallbacks,
    },
    Registration {
        prefix: Name,
        on_interest: OnInterest,
        on_success: OnRegisterSuccess,
        on_failed: OnRegisterFailed,
    },
}

struct PendingInterest {
    interest: Interest,
    deadline: Instant,
    kind: PendingKind,
}

struct InterestFilter {
    prefix: Name,
    on_interest: OnInterest,
}

pub struct Face {
    transport: Box<dyn Transport>,
    wire_format: &'static dyn WireFormat,
    max_packet_size: usize,
    default_interest_lifetime: Duration,
    certificate_fetch_retries: u32,
    next_id: u64,
    pending_interests: BTreeMap<PendingInterestId, PendingInterest>,
    interest_filters: BTreeMap<InterestFilterId, InterestFilter>,
    validator: Option<Validator>,
    command_key_chain: Option<(KeyChain, Name)>,
    last_command_timestamp: u64,
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Face")
            .field("wire_format", &self.wire_format.name())
            .field("max_packet_size", &self.max_packet_size)
            .field("pending_interests", &self.pending_interests.len())
            .field("interest_filters", &self.interest_filters.len())
            .finish_non_exhaustive()
    }
}

impl Face {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            wire_format: default_wire_format(),
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            default_interest_lifetime: DEFAULT_INTEREST_LIFETIME,
            certificate_fetch_retries: 1,
            next_id: 0,
            pending_interests: BTreeMap::new(),
            interest_filters: BTreeMap::new(),
            validator: None,
            command_key_chain: None,
            last_command_timestamp: 0,
        }
    }

    /// A face set up from `config`, validating certificate chains up to the
    /// configured step limit. Trust anchors still have to be added.
    pub fn from_config(transport: impl Transport + 'static, config: &Config) -> Result<Self, FaceError> {
        let mut face = Self::new(transport);
        face.wire_format = config.encoding.wire_format()?;
        face.max_packet_size = config.face.max_packet_size;
        face.default_interest_lifetime = config.face.interest_lifetime();
        face.certificate_fetch_retries = config.security.certificate_fetch_retries;
        face.validator = Some(Validator::new(TrustPolicy::CertificateChain).with_max_steps(config.security.max_steps));
        Ok(face)
    }

    pub fn wire_format(&self) -> &'static dyn WireFormat {
        self.wire_format
    }

    pub fn set_validator(&mut self, validator: Validator) {
        self.validator = Some(validator);
    }

    pub fn validator_mut(&mut self) -> Option<&mut Validator> {
        self.validator.as_mut()
    }

    /// Key chain and certificate used to sign prefix registration commands
    pub fn set_command_signing_info(&mut self, key_chain: KeyChain, certificate_name: Name) {
        self.command_key_chain = Some((key_chain, certificate_name));
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn pending_interest_count(&self) -> usize {
        self.pending_interests.len()
    }

    /// Send `interest`; exactly one of `on_data` or `on_timeout` runs later.
    ///
    /// A network Nack for this Interest is reported as a timeout.
    pub fn express_interest(
        &mut self,
        interest: Interest,
        on_data: impl FnOnce(&Interest, &Data) + 'static,
        on_timeout: impl FnOnce(&Interest) + 'static,
    ) -> Result<PendingInterestId, FaceError> {
        self.add_pending_interest(
            interest,
            PendingKind::Application {
                on_data: Box::new(on_data),
                on_timeout: Box::new(on_timeout),
                on_nack: None,
            },
        )
    }

    /// Like `express_interest`, with network Nacks reported to `on_nack`
    pub fn express_interest_with_nack(
        &mut self,
        interest: Interest,
        on_data: impl FnOnce(&Interest, &Data) + 'static,
        on_timeout: impl FnOnce(&Interest) + 'static,
        on_nack: impl FnOnce(&Interest, &NetworkNack) + 'static,
    ) -> Result<PendingInterestId, FaceError> {
        self.add_pending_interest(
            interest,
            PendingKind::Application {
                on_data: Box::new(on_data),
                on_timeout: Box::new(on_timeout),
                on_nack: Some(Box::new(on_nack)),
            },
        )
    }

    /// Forget a pending Interest; none of its callbacks will run.
    /// Returns false if it already completed or was removed.
    pub fn remove_pending_interest(&mut self, id: PendingInterestId) -> bool {
        self.pending_interests.remove(&id).is_some()
    }

    /// Call `on_interest` for each incoming Interest under `prefix`; Data it
    /// returns is sent back
    pub fn set_interest_filter(
        &mut self,
        prefix: Name,
        on_interest: impl FnMut(&Name, &Interest) -> Option<Data> + 'static,
    ) -> InterestFilterId {
        self.add_interest_filter(prefix, Box::new(on_interest))
    }

    pub fn unset_interest_filter(&mut self, id: InterestFilterId) -> bool {
        self.interest_filters.remove(&id).is_some()
    }

    pub fn put_data(&mut self, data: &mut Data) -> Result<(), FaceError> {
        let encoding = data.wire_encode_with(self.wire_format)?;
        self.send(encoding.bytes())?;
        debug!("Sent Data {}", data.name());
        Ok(())
    }

    /// Ask the local forwarder to route `prefix` here, then serve it with
    /// `on_interest`.
    ///
    /// Sends a command Interest signed with the key chain from
    /// `set_command_signing_info`. The filter is installed once the
    /// forwarder accepts the command.
    pub fn register_prefix(
        &mut self,
        prefix: Name,
        on_interest: impl FnMut(&Name, &Interest) -> Option<Data> + 'static,
        on_success: impl FnOnce(&Name, InterestFilterId) + 'static,
        on_failed: impl FnOnce(&Name) + 'static,
    ) -> Result<PendingInterestId, FaceError> {
        let interest = self.make_command_interest(&prefix)?;
        info!("Registering prefix {}", prefix);
        self.add_pending_interest(
            interest,
            PendingKind::Registration {
                prefix,
                on_interest: Box::new(on_interest),
                on_success: Box::new(on_success),
                on_failed: Box::new(on_failed),
            },
        )
    }

    /// Check `data` with the face's validator, fetching certificates through
    /// this face as needed
    pub fn validate_data(
        &mut self,
        data: Data,
        on_verified: impl FnOnce(Data) + 'static,
        on_failed: impl FnOnce(Data, ValidationFailure) + 'static,
    ) -> Result<(), FaceError> {
        let validator = self.validator.as_mut().ok_or(FaceError::NoValidator)?;
        let outcome = validator.validate(data);
        self.on_validation_outcome(
            outcome,
            ValidationCallbacks {
                on_verified: Box::new(on_verified),
                on_failed: Box::new(on_failed),
            },
        );
        Ok(())
    }

    /// Dispatch everything the transport has received, then expire the
    /// Interests whose lifetime ended before `now`
    pub fn process_events(&mut self, now: Instant) -> Result<(), FaceError> {
        if self.transport.is_connected() {
            for element in self.transport.receive()? {
                self.on_element(&element);
            }
        }
        self.check_timeouts(now);
        Ok(())
    }

    /// Close the transport and drop all pending Interests and filters
    pub fn shutdown(&mut self) -> Result<(), FaceError> {
        self.pending_interests.clear();
        self.interest_filters.clear();
        self.transport.close()?;
        Ok(())
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn send(&mut self, packet: &[u8]) -> Result<(), FaceError> {
        if packet.len() > self.max_packet_size {
            return Err(FaceError::PacketTooLarge {
                size: packet.len(),
                max: self.max_packet_size,
            });
        }
        self.transport.send(packet)?;
        Ok(())
    }

    /// Encode and send `interest`, returning how long to wait for it
    fn send_interest(&mut self, interest: &mut Interest) -> Result<Duration, FaceError> {
        let lifetime = match interest.interest_lifetime() {
            Some(lifetime) => lifetime,
            None => {
                interest.set_interest_lifetime(Some(self.default_interest_lifetime));
                self.default_interest_lifetime
            }
        };
        let encoding = interest.wire_encode_with(self.wire_format)?;
        self.send(encoding.bytes())?;
        debug!("Sent Interest {}", interest.name());
        Ok(lifetime)
    }

    fn add_pending_interest(
        &mut self,
        mut interest: Interest,
        kind: PendingKind,
    ) -> Result<PendingInterestId, FaceError> {
        let lifetime = self.send_interest(&mut interest)?;
        let id = PendingInterestId(self.next_id());
        self.pending_interests.insert(
            id,
            PendingInterest {
                interest,
                deadline: Instant::now() + lifetime,
                kind,
            },
        );
        Ok(id)
    }

    fn add_interest_filter(&mut self, prefix: Name, on_interest: OnInterest) -> InterestFilterId {
        let id = InterestFilterId(self.next_id());
        debug!("Interest filter {} set", prefix);
        self.interest_filters.insert(id, InterestFilter { prefix, on_interest });
        id
    }

    fn make_command_interest(&mut self, prefix: &Name) -> Result<Interest, FaceError> {
        let parameters = self
            .wire_format
            .encode_control_parameters(&ControlParameters::for_prefix(prefix.clone()))?;

        // Command timestamps must increase even if the clock does not
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        let timestamp = now.max(self.last_command_timestamp + 1);
        self.last_command_timestamp = timestamp;

        let mut name = Name::new();
        name.append("localhost")
            .append("nfd")
            .append("rib")
            .append("register")
            .append(parameters)
            .append_component(NameComponent::from_number(timestamp))
            .append(rand::random::<[u8; 8]>().to_vec());

        let mut interest = Interest::new(name);
        interest.set_interest_lifetime(Some(self.default_interest_lifetime));

        let (key_chain, certificate_name) = self.command_key_chain.as_ref().ok_or(FaceError::NoCommandKeyChain)?;
        key_chain.sign_interest_with_format(&mut interest, certificate_name, self.wire_format)?;
        Ok(interest)
    }

    fn on_element(&mut self, element: &[u8]) {
        let (packet, link_info, nack) = if is_lp_packet(element) {
            let lp_packet = match self.wire_format.decode_lp_packet(element) {
                Ok(lp_packet) => lp_packet,
                Err(e) => {
                    warn!("Dropping malformed LpPacket: {}", e);
                    return;
                }
            };
            let Some(fragment) = lp_packet.fragment() else {
                trace!("Ignoring LpPacket without fragment");
                return;
            };
            (fragment.to_vec(), lp_packet.link_info(), lp_packet.nack().copied())
        } else {
            (element.to_vec(), LinkInfo::default(), None)
        };

        let tlv_type = match TlvDecoder::new(&packet).read_var_number() {
            Ok(tlv_type) => tlv_type,
            Err(e) => {
                warn!("Dropping malformed packet: {}", e);
                return;
            }
        };

        let result = match tlv_type {
            tlv_types::INTEREST => Interest::wire_decode_with(&packet, self.wire_format).map(|mut interest| {
                interest.set_link_info(link_info);
                match nack {
                    Some(nack) => self.on_network_nack(&interest, &nack),
                    None => self.on_interest(&interest),
                }
            }),
            tlv_types::DATA => Data::wire_decode_with(&packet, self.wire_format).map(|mut data| {
                data.set_link_info(link_info);
                self.on_data(data);
            }),
            other => {
                debug!("Ignoring packet of type {:#x}", other);
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!("Dropping undecodable packet: {}", e);
        }
    }

    fn on_interest(&mut self, interest: &Interest) {
        trace!("Received Interest {}", interest.name());
        let mut responses = Vec::new();
        for filter in self.interest_filters.values_mut() {
            if filter.prefix.is_prefix_of(interest.name()) {
                if let Some(data) = (filter.on_interest)(&filter.prefix, interest) {
                    responses.push(data);
                }
            }
        }

        for mut data in responses {
            if let Err(e) = self.put_data(&mut data) {
                warn!("Cannot answer {}: {}", interest.name(), e);
            }
        }
    }

    fn on_data(&mut self, data: Data) {
        trace!("Received Data {}", data.name());
        let matched: Vec<PendingInterestId> = self
            .pending_interests
            .iter()
            .filter(|(_, pending)| pending.interest.matches_data(&data))
            .map(|(id, _)| *id)
            .collect();
        if matched.is_empty() {
            debug!("Unsolicited Data {}", data.name());
        }

        for id in matched {
            let Some(pending) = self.pending_interests.remove(&id) else {
                continue;
            };
            match pending.kind {
                PendingKind::Application { on_data, .. } => on_data(&pending.interest, &data),
                PendingKind::Certificate { request, callbacks, .. } => {
                    let Some(validator) = self.validator.as_mut() else {
                        warn!("Certificate {} arrived with no validator", data.name());
                        continue;
                    };
                    let outcome = validator.on_certificate(request, data.clone());
                    self.on_validation_outcome(outcome, callbacks);
                }
                PendingKind::Registration {
                    prefix,
                    on_interest,
                    on_success,
                    on_failed,
                } => match parse_control_response(data.content()) {
                    Ok((STATUS_OK, _)) => {
                        info!("Registered prefix {}", prefix);
                        let filter_id = self.add_interest_filter(prefix.clone(), on_interest);
                        on_success(&prefix, filter_id);
                    }
                    Ok((code, text)) => {
                        warn!("Register {} refused: {} {}", prefix, code, text);
                        on_failed(&prefix);
                    }
                    Err(e) => {
                        warn!("Register {}: malformed ControlResponse: {}", prefix, e);
                        on_failed(&prefix);
                    }
                },
            }
        }
    }

    fn on_network_nack(&mut self, interest: &Interest, nack: &NetworkNack) {
        debug!("Network Nack for {}: {}", interest.name(), nack.reason);
        let matched: Vec<PendingInterestId> = self
            .pending_interests
            .iter()
            .filter(|(_, pending)| pending.interest.name() == interest.name() && pending.interest.nonce() == interest.nonce())
            .map(|(id, _)| *id)
            .collect();

        for id in matched {
            let Some(pending) = self.pending_interests.remove(&id) else {
                continue;
            };
            match pending.kind {
                PendingKind::Application { on_timeout, on_nack, .. } => match on_nack {
                    Some(on_nack) => on_nack(&pending.interest, nack),
                    None => on_timeout(&pending.interest),
                },
                PendingKind::Certificate { request, callbacks, .. } => self.on_certificate_timeout(request, callbacks),
                PendingKind::Registration { prefix, on_failed, .. } => on_failed(&prefix),
            }
        }
    }

    fn check_timeouts(&mut self, now: Instant) {
        let expired: Vec<PendingInterestId> = self
            .pending_interests
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in expired {
            let Some(pending) = self.pending_interests.remove(&id) else {
                continue;
            };
            debug!("Interest {} timed out", pending.interest.name());
            match pending.kind {
                PendingKind::Application { on_timeout, .. } => on_timeout(&pending.interest),
                PendingKind::Registration { prefix, on_failed, .. } => on_failed(&prefix),
                PendingKind::Certificate {
                    request,
                    retries_left,
                    callbacks,
                } => {
                    if retries_left == 0 {
                        self.on_certificate_timeout(request, callbacks);
                        continue;
                    }

                    let mut interest = pending.interest;
                    interest.set_nonce(rand::random::<[u8; 4]>().to_vec());
                    match self.send_interest(&mut interest) {
                        Ok(lifetime) => {
                            debug!("Retrying certificate fetch {}", interest.name());
                            let id = PendingInterestId(self.next_id());
                            self.pending_interests.insert(
                                id,
                                PendingInterest {
                                    interest,
                                    deadline: now + lifetime,
                                    kind: PendingKind::Certificate {
                                        request,
                                        retries_left: retries_left - 1,
                                        callbacks,
                                    },
                                },
                            );
                        }
                        Err(e) => {
                            warn!("Cannot retry certificate fetch: {}", e);
                            self.on_certificate_timeout(request, callbacks);
                        }
                    }
                }
            }
        }
    }

    fn on_certificate_timeout(&mut self, request: CertificateRequest, callbacks: ValidationCallbacks) {
        match self.validator.as_mut() {
            Some(validator) => {
                let outcome = validator.on_certificate_timeout(request);
                self.on_validation_outcome(outcome, callbacks);
            }
            None => warn!("Certificate fetch for {} ended with no validator", request.data().name()),
        }
    }

    fn on_validation_outcome(&mut self, outcome: ValidationOutcome, callbacks: ValidationCallbacks) {
        match outcome {
            ValidationOutcome::Verified(data) => (callbacks.on_verified)(data),
            ValidationOutcome::Failed(data, failure) => (callbacks.on_failed)(data, failure),
            ValidationOutcome::FetchCertificate(request) => {
                let mut interest = request.interest.clone();
                match self.send_interest(&mut interest) {
                    Ok(lifetime) => {
                        let id = PendingInterestId(self.next_id());
                        self.pending_interests.insert(
                            id,
                            PendingInterest {
                                interest,
                                deadline: Instant::now() + lifetime,
                                kind: PendingKind::Certificate {
                                    request,
                                    retries_left: self.certificate_fetch_retries,
                                    callbacks,
                                },
                            },
                        );
                    }
                    Err(e) => {
                        warn!("Cannot fetch certificate {}: {}", interest.name(), e);
                        self.on_certificate_timeout(request, callbacks);
                    }
                }
            }
        }
    }
}

/// Status code and text of an NFD ControlResponse
fn parse_control_response(content: &[u8]) -> Result<(u64, String), DecodingError> {
    let mut decoder = TlvDecoder::new(content);
    let end = decoder.read_nested_tlvs_start(tlv_types::CONTROL_RESPONSE)?;
    let code = decoder.read_non_negative_integer_tlv(tlv_types::STATUS_CODE)?;
    let text = decoder.read_blob_tlv(tlv_types::STATUS_TEXT)?;
    // The echoed ControlParameters are not needed
    while decoder.offset() < end {
        decoder.read_any_tlv()?;
    }
    decoder.finish_nested_tlvs(end)?;
    decoder.finish()?;
    Ok((code, String::from_utf8_lossy(text).into_owned()))
}
