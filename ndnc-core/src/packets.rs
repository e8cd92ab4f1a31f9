use std::time::Duration;

use crate::change_counter::{Cached, ChangeCount, ChangeCounter, Version};
use crate::encoding::{default_wire_format, SignedBlob, WireFormat};
use crate::lp::LinkInfo;
use crate::name::{Name, NameComponent};
use crate::signature::{KeyLocator, Signature};
use crate::tlv::{DecodingError, EncodingError};

/// One entry of an Exclude selector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExcludeEntry {
    Component(NameComponent),
    Any,
}

/// Exclude selector: components and `Any` ranges an Interest does not want
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclude {
    entries: Vec<ExcludeEntry>,
    version: Version,
}

impl Exclude {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ExcludeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn append_any(&mut self) -> &mut Self {
        self.entries.push(ExcludeEntry::Any);
        self.version.bump();
        self
    }

    pub fn append_component(&mut self, component: NameComponent) -> &mut Self {
        self.entries.push(ExcludeEntry::Component(component));
        self.version.bump();
        self
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.version.bump();
    }

    /// Check whether `component` is excluded.
    ///
    /// An `Any` entry excludes everything between its neighbouring components,
    /// and everything before or after them at the ends of the list.
    pub fn matches(&self, component: &NameComponent) -> bool {
        let mut i = 0;
        while i < self.entries.len() {
            match &self.entries[i] {
                ExcludeEntry::Component(entry) => {
                    if entry == component {
                        return true;
                    }
                }
                ExcludeEntry::Any => {
                    let lower_bound = match i.checked_sub(1).map(|j| &self.entries[j]) {
                        Some(ExcludeEntry::Component(lower)) => Some(lower),
                        _ => None,
                    };

                    // Consecutive Any entries share one upper bound
                    let upper = self.entries[i + 1..]
                        .iter()
                        .enumerate()
                        .find_map(|(offset, entry)| match entry {
                            ExcludeEntry::Component(upper) => Some((i + 1 + offset, upper)),
                            ExcludeEntry::Any => None,
                        });

                    match (lower_bound, upper) {
                        (Some(lower), Some((_, upper))) if component > lower && component < upper => return true,
                        (None, Some((_, upper))) if component < upper => return true,
                        (Some(lower), None) if component > lower => return true,
                        (None, None) => return true,
                        _ => {}
                    }

                    if let Some((upper_index, _)) = upper {
                        // The upper bound itself is checked on the next pass
                        i = upper_index;
                        continue;
                    }
                }
            }
            i += 1;
        }
        false
    }

    /// Comma-separated URI form, `*` for Any
    pub fn to_uri(&self) -> String {
        self.entries
            .iter()
            .map(|entry| match entry {
                ExcludeEntry::Any => "*".to_string(),
                ExcludeEntry::Component(component) => component.to_escaped_string(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl ChangeCount for Exclude {
    fn change_count(&self) -> u64 {
        self.version.get()
    }
}

/// Interest packet
#[derive(Debug, Clone, Default)]
pub struct Interest {
    name: ChangeCounter<Name>,
    min_suffix_components: Option<u64>,
    max_suffix_components: Option<u64>,
    key_locator: ChangeCounter<KeyLocator>,
    exclude: ChangeCounter<Exclude>,
    child_selector: Option<u64>,
    must_be_fresh: bool,
    scope: Option<u64>,
    interest_lifetime: Option<Duration>,
    nonce: Option<Vec<u8>>,
    nonce_change_count: u64,
    version: Version,
    link_info: LinkInfo,
    wire_encoding: Cached<(&'static str, SignedBlob)>,
}

impl Interest {
    /// Create a new Interest with the given name
    pub fn new(name: Name) -> Self {
        Self {
            name: ChangeCounter::new(name),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &Name {
        self.name.get()
    }

    pub fn name_mut(&mut self) -> &mut Name {
        self.name.get_mut()
    }

    pub fn set_name(&mut self, name: Name) -> &mut Self {
        self.name.set(name);
        self
    }

    pub fn min_suffix_components(&self) -> Option<u64> {
        self.min_suffix_components
    }

    pub fn set_min_suffix_components(&mut self, value: Option<u64>) -> &mut Self {
        self.min_suffix_components = value;
        self.version.bump();
        self
    }

    pub fn max_suffix_components(&self) -> Option<u64> {
        self.max_suffix_components
    }

    pub fn set_max_suffix_components(&mut self, value: Option<u64>) -> &mut Self {
        self.max_suffix_components = value;
        self.version.bump();
        self
    }

    /// PublisherPublicKeyLocator selector
    pub fn key_locator(&self) -> &KeyLocator {
        self.key_locator.get()
    }

    pub fn key_locator_mut(&mut self) -> &mut KeyLocator {
        self.key_locator.get_mut()
    }

    pub fn set_key_locator(&mut self, key_locator: KeyLocator) -> &mut Self {
        self.key_locator.set(key_locator);
        self
    }

    pub fn exclude(&self) -> &Exclude {
        self.exclude.get()
    }

    pub fn exclude_mut(&mut self) -> &mut Exclude {
        self.exclude.get_mut()
    }

    pub fn set_exclude(&mut self, exclude: Exclude) -> &mut Self {
        self.exclude.set(exclude);
        self
    }

    pub fn child_selector(&self) -> Option<u64> {
        self.child_selector
    }

    pub fn set_child_selector(&mut self, value: Option<u64>) -> &mut Self {
        self.child_selector = value;
        self.version.bump();
        self
    }

    pub fn must_be_fresh(&self) -> bool {
        self.must_be_fresh
    }

    pub fn set_must_be_fresh(&mut self, must_be_fresh: bool) -> &mut Self {
        self.must_be_fresh = must_be_fresh;
        self.version.bump();
        self
    }

    /// Scope is only carried by the 0.1 wire format
    pub fn scope(&self) -> Option<u64> {
        self.scope
    }

    pub fn set_scope(&mut self, scope: Option<u64>) -> &mut Self {
        self.scope = scope;
        self.version.bump();
        self
    }

    pub fn interest_lifetime(&self) -> Option<Duration> {
        self.interest_lifetime
    }

    pub fn set_interest_lifetime(&mut self, lifetime: Option<Duration>) -> &mut Self {
        self.interest_lifetime = lifetime;
        self.version.bump();
        self
    }

    /// The nonce, or `None` if it was never set or any field changed since
    pub fn nonce(&self) -> Option<&[u8]> {
        if self.nonce_change_count == self.change_count() {
            self.nonce.as_deref()
        } else {
            None
        }
    }

    pub fn set_nonce(&mut self, nonce: impl Into<Vec<u8>>) -> &mut Self {
        self.nonce = Some(nonce.into());
        self.version.bump();
        self.nonce_change_count = self.change_count();
        self
    }

    /// Set a random 4-byte nonce unless a valid one is present
    pub fn refresh_nonce_if_missing(&mut self) {
        if self.nonce().is_none() {
            self.set_nonce(rand::random::<[u8; 4]>().to_vec());
        }
    }

    pub fn link_info(&self) -> &LinkInfo {
        &self.link_info
    }

    pub fn set_link_info(&mut self, link_info: LinkInfo) {
        self.link_info = link_info;
    }

    pub fn change_count(&self) -> u64 {
        self.version.get()
            + self.name.change_count()
            + self.key_locator.change_count()
            + self.exclude.change_count()
    }

    /// Check `name` against the name prefix and the suffix and exclude selectors.
    ///
    /// `name` is taken to be a Data name without its implicit digest, which
    /// counts as one more suffix component.
    pub fn matches_name(&self, name: &Name) -> bool {
        let prefix = self.name();
        if !prefix.is_prefix_of(name) {
            return false;
        }

        let suffix_components = (name.len() + 1 - prefix.len()) as u64;
        if let Some(min) = self.min_suffix_components {
            if suffix_components < min {
                return false;
            }
        }
        if let Some(max) = self.max_suffix_components {
            if suffix_components > max {
                return false;
            }
        }

        if !self.exclude().is_empty() {
            if let Some(next) = name.get(prefix.len() as isize) {
                if self.exclude().matches(next) {
                    return false;
                }
            }
        }
        true
    }

    /// Check whether `data` can satisfy this Interest
    pub fn matches_data(&self, data: &Data) -> bool {
        if !self.matches_name(data.name()) {
            return false;
        }
        if self.must_be_fresh {
            match data.meta_info().freshness_period() {
                Some(period) if !period.is_zero() => {}
                _ => return false,
            }
        }
        match self.key_locator().key_name() {
            Some(publisher) => data
                .signature()
                .key_locator()
                .and_then(|locator| locator.key_name())
                .is_some_and(|name| name == publisher),
            None => true,
        }
    }

    /// Encode with the default wire format, reusing the cached encoding if nothing changed.
    /// A random nonce is set first if there is none, and the nonce is
    /// replaced by the one the format writes.
    pub fn wire_encode(&mut self) -> Result<SignedBlob, EncodingError> {
        self.wire_encode_with(default_wire_format())
    }

    pub fn wire_encode_with(&mut self, format: &dyn WireFormat) -> Result<SignedBlob, EncodingError> {
        self.refresh_nonce_if_missing();
        if let Some(nonce) = self.nonce() {
            let normalized = format.normalize_nonce(nonce);
            if normalized != nonce {
                self.set_nonce(normalized);
            }
        }
        let change_count = self.change_count();
        if let Some((format_name, encoding)) = self.wire_encoding.get(change_count) {
            if *format_name == format.name() {
                return Ok(encoding.clone());
            }
        }

        let encoding = format.encode_interest(self)?;
        self.wire_encoding.store((format.name(), encoding.clone()), change_count);
        Ok(encoding)
    }

    /// Decode with the default wire format; the input is kept as the cached encoding
    pub fn wire_decode(input: &[u8]) -> Result<Self, DecodingError> {
        Self::wire_decode_with(input, default_wire_format())
    }

    pub fn wire_decode_with(input: &[u8], format: &dyn WireFormat) -> Result<Self, DecodingError> {
        let (mut interest, signed_portion) = format.decode_interest(input)?;
        let change_count = interest.change_count();
        interest
            .wire_encoding
            .store((format.name(), SignedBlob::new(input.to_vec(), signed_portion)), change_count);
        Ok(interest)
    }

    /// URI with selectors as query parameters, e.g. `/a/b?ndn.MustBeFresh=1`
    pub fn to_uri(&self) -> String {
        let mut parameters = Vec::new();
        if let Some(value) = self.min_suffix_components {
            parameters.push(format!("ndn.MinSuffixComponents={}", value));
        }
        if let Some(value) = self.max_suffix_components {
            parameters.push(format!("ndn.MaxSuffixComponents={}", value));
        }
        if let Some(value) = self.child_selector {
            parameters.push(format!("ndn.ChildSelector={}", value));
        }
        if self.must_be_fresh {
            parameters.push("ndn.MustBeFresh=1".to_string());
        }
        if let Some(value) = self.scope {
            parameters.push(format!("ndn.Scope={}", value));
        }
        if let Some(lifetime) = self.interest_lifetime {
            parameters.push(format!("ndn.InterestLifetime={}", lifetime.as_millis()));
        }
        if let Some(nonce) = self.nonce() {
            parameters.push(format!("ndn.Nonce={}", hex::encode(nonce)));
        }
        if !self.exclude().is_empty() {
            parameters.push(format!("ndn.Exclude={}", self.exclude().to_uri()));
        }

        let mut uri = self.name().to_uri();
        if !parameters.is_empty() {
            uri.push('?');
            uri.push_str(&parameters.join("&"));
        }
        uri
    }
}

impl PartialEq for Interest {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.min_suffix_components == other.min_suffix_components
            && self.max_suffix_components == other.max_suffix_components
            && self.key_locator == other.key_locator
            && self.exclude == other.exclude
            && self.child_selector == other.child_selector
            && self.must_be_fresh == other.must_be_fresh
            && self.scope == other.scope
            && self.interest_lifetime == other.interest_lifetime
            && self.nonce() == other.nonce()
    }
}

/// Data ContentType values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ContentType {
    #[default]
    Blob,
    Link,
    Key,
    Nack,
    Other(u64),
}

impl ContentType {
    pub fn code(&self) -> u64 {
        match self {
            ContentType::Blob => 0,
            ContentType::Link => 1,
            ContentType::Key => 2,
            ContentType::Nack => 3,
            ContentType::Other(code) => *code,
        }
    }

    pub fn from_code(code: u64) -> Self {
        match code {
            0 => ContentType::Blob,
            1 => ContentType::Link,
            2 => ContentType::Key,
            3 => ContentType::Nack,
            other => ContentType::Other(other),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaInfo {
    content_type: ContentType,
    freshness_period: Option<Duration>,
    final_block_id: Option<NameComponent>,
    version: Version,
}

impl MetaInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn set_content_type(&mut self, content_type: ContentType) -> &mut Self {
        self.content_type = content_type;
        self.version.bump();
        self
    }

    pub fn freshness_period(&self) -> Option<Duration> {
        self.freshness_period
    }

    pub fn set_freshness_period(&mut self, period: Option<Duration>) -> &mut Self {
        self.freshness_period = period;
        self.version.bump();
        self
    }

    pub fn final_block_id(&self) -> Option<&NameComponent> {
        self.final_block_id.as_ref()
    }

    pub fn set_final_block_id(&mut self, component: Option<NameComponent>) -> &mut Self {
        self.final_block_id = component;
        self.version.bump();
        self
    }
}

impl ChangeCount for MetaInfo {
    fn change_count(&self) -> u64 {
        self.version.get()
    }
}

/// Data packet
#[derive(Debug, Clone, Default)]
pub struct Data {
    name: ChangeCounter<Name>,
    meta_info: ChangeCounter<MetaInfo>,
    content: Vec<u8>,
    signature: ChangeCounter<Signature>,
    version: Version,
    link_info: LinkInfo,
    wire_encoding: Cached<(&'static str, SignedBlob)>,
    full_name: Cached<Name>,
}

impl Data {
    /// Create a new Data with the given name, empty content and an unsigned Sha256WithRsa signature
    pub fn new(name: Name) -> Self {
        Self {
            name: ChangeCounter::new(name),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &Name {
        self.name.get()
    }

    pub fn name_mut(&mut self) -> &mut Name {
        self.name.get_mut()
    }

    pub fn set_name(&mut self, name: Name) -> &mut Self {
        self.name.set(name);
        self
    }

    pub fn meta_info(&self) -> &MetaInfo {
        self.meta_info.get()
    }

    pub fn meta_info_mut(&mut self) -> &mut MetaInfo {
        self.meta_info.get_mut()
    }

    pub fn set_meta_info(&mut self, meta_info: MetaInfo) -> &mut Self {
        self.meta_info.set(meta_info);
        self
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) -> &mut Self {
        self.content = content.into();
        self.version.bump();
        self
    }

    pub fn signature(&self) -> &Signature {
        self.signature.get()
    }

    pub fn signature_mut(&mut self) -> &mut Signature {
        self.signature.get_mut()
    }

    pub fn set_signature(&mut self, signature: Signature) -> &mut Self {
        self.signature.set(signature);
        self
    }

    pub fn link_info(&self) -> &LinkInfo {
        &self.link_info
    }

    pub fn set_link_info(&mut self, link_info: LinkInfo) {
        self.link_info = link_info;
    }

    /// Congestion mark from the link layer packet this Data arrived in, 0 if none
    pub fn congestion_mark(&self) -> u64 {
        self.link_info.congestion_mark.unwrap_or(0)
    }

    pub fn change_count(&self) -> u64 {
        self.version.get()
            + self.name.change_count()
            + self.meta_info.change_count()
            + self.signature.change_count()
    }

    /// The cached encoding, in whichever format produced it, if it is still current
    pub fn wire_encoding(&self) -> Option<&SignedBlob> {
        self.wire_encoding
            .get(self.change_count())
            .map(|(_, encoding)| encoding)
    }

    /// Encode with the default wire format, reusing the cached encoding if nothing changed
    pub fn wire_encode(&mut self) -> Result<SignedBlob, EncodingError> {
        self.wire_encode_with(default_wire_format())
    }

    pub fn wire_encode_with(&mut self, format: &dyn WireFormat) -> Result<SignedBlob, EncodingError> {
        let change_count = self.change_count();
        if let Some((format_name, encoding)) = self.wire_encoding.get(change_count) {
            if *format_name == format.name() {
                return Ok(encoding.clone());
            }
        }

        let encoding = format.encode_data(self)?;
        self.wire_encoding.store((format.name(), encoding.clone()), change_count);
        Ok(encoding)
    }

    /// Decode with the default wire format; the input is kept as the cached encoding
    pub fn wire_decode(input: &[u8]) -> Result<Self, DecodingError> {
        Self::wire_decode_with(input, default_wire_format())
    }

    pub fn wire_decode_with(input: &[u8], format: &dyn WireFormat) -> Result<Self, DecodingError> {
        let (mut data, signed_portion) = format.decode_data(input)?;
        let change_count = data.change_count();
        data.wire_encoding
            .store((format.name(), SignedBlob::new(input.to_vec(), signed_portion)), change_count);
        Ok(data)
    }

    /// Name plus the implicit SHA-256 digest of the full wire encoding
    pub fn full_name(&mut self) -> Result<Name, EncodingError> {
        let change_count = self.change_count();
        if let Some(full_name) = self.full_name.get(change_count) {
            return Ok(full_name.clone());
        }

        let encoding = match self.wire_encoding() {
            Some(encoding) => encoding.clone(),
            None => self.wire_encode()?,
        };
        let digest = crate::digest_sha256(encoding.bytes());
        let mut full_name = self.name().clone();
        full_name.append_component(NameComponent::with_type(
            digest.to_vec(),
            crate::name::ComponentType::ImplicitSha256Digest,
        ));

        // wire_encode does not change the count
        self.full_name.store(full_name.clone(), change_count);
        Ok(full_name)
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.meta_info == other.meta_info
            && self.content == other.content
            && self.signature == other.signature
    }
}
