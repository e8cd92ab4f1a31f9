//! Data validation as an explicit state machine.
//!
//! `Validator::validate` either finishes or returns a `CertificateRequest`.
//! The caller expresses the request's Interest and feeds the answer back
//! through `on_certificate` (or `on_certificate_timeout`). The request owns
//! the Data, the fetched certificates still waiting on a signer and the
//! number of fetches made so far, so no state is kept between steps.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use thiserror::Error;

use super::key_chain::{certificate_name_to_key_name, signed_encoding};
use super::{verify_signature, KeyStore, PublicKey, SecurityError};
use crate::name::Name;
use crate::packets::{Data, Interest};
use crate::signature::Signature;

/// Lifetime of certificate fetch Interests
const CERTIFICATE_INTEREST_LIFETIME: Duration = Duration::from_secs(4);

pub const DEFAULT_MAX_STEPS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("Signature has no KeyLocator key name")]
    MissingKeyLocator,
    #[error("{0} signatures are not accepted")]
    UnsupportedSignatureType(&'static str),
    #[error("No key for {0}")]
    KeyNotFound(Name),
    #[error("Signature verification failed for {0}")]
    InvalidSignature(Name),
    #[error("Certificate {0} is not a valid public key")]
    InvalidCertificate(Name),
    #[error("Certificate {0} is outside its validity period")]
    CertificateExpired(Name),
    #[error("Received {0}, which does not answer the certificate Interest")]
    UnexpectedCertificate(Name),
    #[error("Certificate chain longer than {0} steps")]
    StepLimitExceeded(u32),
    #[error("Timed out fetching certificate {0}")]
    CertificateFetchTimeout(Name),
    #[error("Cannot encode {0} for verification")]
    EncodingFailed(Name),
}

/// Who is trusted to sign Data
pub enum TrustPolicy {
    /// Every packet is accepted without checking
    AcceptAll,
    /// The signer's key must be in the given store
    SelfVerify(Box<dyn KeyStore + Send>),
    /// The signer's certificate must chain to a trust anchor; missing
    /// certificates are fetched
    CertificateChain,
}

impl std::fmt::Debug for TrustPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustPolicy::AcceptAll => write!(f, "AcceptAll"),
            TrustPolicy::SelfVerify(_) => write!(f, "SelfVerify"),
            TrustPolicy::CertificateChain => write!(f, "CertificateChain"),
        }
    }
}

/// A certificate the validator needs before it can go on
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub interest: Interest,
    data: Data,
    /// Fetched certificates not trusted yet, each one signing the one before
    certificates: Vec<Data>,
    step_count: u32,
}

impl CertificateRequest {
    /// The Data whose validation this request belongs to
    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }
}

#[derive(Debug)]
pub enum ValidationOutcome {
    Verified(Data),
    Failed(Data, ValidationFailure),
    FetchCertificate(CertificateRequest),
}

#[derive(Debug)]
pub struct Validator {
    policy: TrustPolicy,
    max_steps: u32,
    trust_anchors: BTreeMap<Name, Data>,
    verified_certificates: BTreeMap<Name, Data>,
}

impl Validator {
    pub fn new(policy: TrustPolicy) -> Self {
        Self {
            policy,
            max_steps: DEFAULT_MAX_STEPS,
            trust_anchors: BTreeMap::new(),
            verified_certificates: BTreeMap::new(),
        }
    }

    pub fn accept_all() -> Self {
        Self::new(TrustPolicy::AcceptAll)
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Trust `certificate` without checking its signature
    pub fn add_trust_anchor(&mut self, certificate: Data) {
        debug!("Added trust anchor {}", certificate.name());
        self.trust_anchors.insert(certificate.name().clone(), certificate);
    }

    /// Forget certificates learned while validating; trust anchors stay
    pub fn clear_certificate_cache(&mut self) {
        self.verified_certificates.clear();
    }

    pub fn validate(&mut self, data: Data) -> ValidationOutcome {
        self.advance(data, Vec::new(), 0)
    }

    /// Continue after the certificate asked for by `request` arrived
    pub fn on_certificate(&mut self, request: CertificateRequest, certificate: Data) -> ValidationOutcome {
        let CertificateRequest {
            interest,
            data,
            mut certificates,
            step_count,
        } = request;

        if !interest.matches_name(certificate.name()) {
            let name = certificate.name().clone();
            return ValidationOutcome::Failed(data, ValidationFailure::UnexpectedCertificate(name));
        }
        certificates.push(certificate);
        self.advance(data, certificates, step_count)
    }

    pub fn on_certificate_timeout(&mut self, request: CertificateRequest) -> ValidationOutcome {
        warn!("Certificate fetch timed out: {}", request.interest.name());
        let name = request.interest.name().clone();
        ValidationOutcome::Failed(request.data, ValidationFailure::CertificateFetchTimeout(name))
    }

    /// Find a trusted certificate whose name starts with `locator`
    fn find_certificate(&self, locator: &Name) -> Option<&Data> {
        fn in_map<'a>(map: &'a BTreeMap<Name, Data>, locator: &Name) -> Option<&'a Data> {
            map.range(locator.clone()..)
                .next()
                .filter(|(name, _)| locator.is_prefix_of(name))
                .map(|(_, certificate)| certificate)
        }
        in_map(&self.trust_anchors, locator).or_else(|| in_map(&self.verified_certificates, locator))
    }

    /// Verify the newest untrusted packet, walking back towards the Data as
    /// signers become trusted
    fn advance(&mut self, data: Data, mut certificates: Vec<Data>, step_count: u32) -> ValidationOutcome {
        loop {
            let packet = certificates.last().unwrap_or(&data);
            match self.check(packet) {
                Check::Trusted => match certificates.pop() {
                    Some(certificate) => {
                        debug!("Certificate {} verified", certificate.name());
                        self.verified_certificates.insert(certificate.name().clone(), certificate);
                    }
                    None => return ValidationOutcome::Verified(data),
                },
                Check::Failed(failure) => {
                    debug!("Validation of {} failed: {}", data.name(), failure);
                    return ValidationOutcome::Failed(data, failure);
                }
                Check::NeedCertificate(locator) => {
                    if step_count >= self.max_steps {
                        return ValidationOutcome::Failed(data, ValidationFailure::StepLimitExceeded(self.max_steps));
                    }
                    let mut interest = Interest::new(locator);
                    interest.set_interest_lifetime(Some(CERTIFICATE_INTEREST_LIFETIME));
                    debug!("Fetching certificate {}", interest.name());
                    return ValidationOutcome::FetchCertificate(CertificateRequest {
                        interest,
                        data,
                        certificates,
                        step_count: step_count + 1,
                    });
                }
            }
        }
    }

    fn check(&self, packet: &Data) -> Check {
        if let TrustPolicy::AcceptAll = self.policy {
            return Check::Trusted;
        }

        let signature = packet.signature();
        let locator = match signature {
            Signature::Sha256WithRsa(_) | Signature::Sha256WithEcdsa(_) => {
                match signature.key_locator().and_then(|locator| locator.key_name()) {
                    Some(name) => name.clone(),
                    None => return Check::Failed(ValidationFailure::MissingKeyLocator),
                }
            }
            other => return Check::Failed(ValidationFailure::UnsupportedSignatureType(other.type_name())),
        };

        let public_key = match &self.policy {
            TrustPolicy::AcceptAll => return Check::Trusted,
            TrustPolicy::SelfVerify(key_store) => {
                let key = certificate_name_to_key_name(&locator)
                    .and_then(|key_name| key_store.get_public_key(&key_name));
                match key {
                    Ok(key) => key,
                    Err(_) => return Check::Failed(ValidationFailure::KeyNotFound(locator)),
                }
            }
            TrustPolicy::CertificateChain => match self.find_certificate(&locator) {
                Some(certificate) => match certificate_key(certificate) {
                    Ok(key) => key,
                    Err(failure) => return Check::Failed(failure),
                },
                None => return Check::NeedCertificate(locator),
            },
        };

        match signed_encoding(packet) {
            Some(encoding) if verify_signature(encoding.signed_portion(), signature, &public_key) => Check::Trusted,
            Some(_) => Check::Failed(ValidationFailure::InvalidSignature(packet.name().clone())),
            None => Check::Failed(ValidationFailure::EncodingFailed(packet.name().clone())),
        }
    }
}

enum Check {
    Trusted,
    Failed(ValidationFailure),
    NeedCertificate(Name),
}

/// The public key a certificate carries, if it is currently valid
fn certificate_key(certificate: &Data) -> Result<PublicKey, ValidationFailure> {
    let validity = certificate
        .signature()
        .body()
        .and_then(|body| body.validity_period());
    if let Some(period) = validity {
        if !period.is_valid_at(Utc::now()) {
            return Err(ValidationFailure::CertificateExpired(certificate.name().clone()));
        }
    }
    PublicKey::from_der(certificate.content())
        .map_err(|_: SecurityError| ValidationFailure::InvalidCertificate(certificate.name().clone()))
}
