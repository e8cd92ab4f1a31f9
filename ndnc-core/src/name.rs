use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::change_counter::ChangeCount;
use crate::tlv::tlv_types;

/// Naming convention marker for segment numbers
pub const SEGMENT_MARKER: u8 = 0x00;
/// Naming convention marker for version numbers
pub const VERSION_MARKER: u8 = 0xFD;

const DIGEST_URI_PREFIX: &str = "sha256digest=";
const SHA256_DIGEST_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Generic,
    ImplicitSha256Digest,
}

impl ComponentType {
    pub fn tlv_type(&self) -> u64 {
        match self {
            ComponentType::Generic => tlv_types::NAME_COMPONENT,
            ComponentType::ImplicitSha256Digest => tlv_types::IMPLICIT_SHA256_DIGEST_COMPONENT,
        }
    }

    pub fn from_tlv_type(tlv_type: u64) -> Option<Self> {
        match tlv_type {
            tlv_types::NAME_COMPONENT => Some(ComponentType::Generic),
            tlv_types::IMPLICIT_SHA256_DIGEST_COMPONENT => Some(ComponentType::ImplicitSha256Digest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameParseError {
    #[error("Invalid percent escape in {0:?}")]
    InvalidEscape(String),
    #[error("Invalid implicit digest component {0:?}")]
    InvalidDigest(String),
    #[error("Component {0:?} does not name anything")]
    EmptyComponent(String),
    #[error("Component is not a number with marker {0:#04x}")]
    MissingMarker(u8),
    #[error("Component is too long to be a number")]
    NumberTooLong,
}

/// An immutable name component: a TLV type marker and opaque bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameComponent {
    value: Vec<u8>,
    component_type: ComponentType,
}

impl NameComponent {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
            component_type: ComponentType::Generic,
        }
    }

    /// Create an implicit SHA-256 digest component; the digest must be 32 bytes
    pub fn implicit_sha256_digest(digest: &[u8]) -> Result<Self, NameParseError> {
        if digest.len() != SHA256_DIGEST_SIZE {
            return Err(NameParseError::InvalidDigest(hex::encode(digest)));
        }
        Ok(Self {
            value: digest.to_vec(),
            component_type: ComponentType::ImplicitSha256Digest,
        })
    }

    pub(crate) fn with_type(value: Vec<u8>, component_type: ComponentType) -> Self {
        Self { value, component_type }
    }

    /// Parse one escaped URI component, the inverse of `to_escaped_string`
    pub fn from_escaped(escaped: &str) -> Result<Self, NameParseError> {
        from_escaped_component(escaped)?
            .ok_or_else(|| NameParseError::EmptyComponent(escaped.to_string()))
    }

    /// Marker byte followed by the number in 1, 2, 4 or 8 big-endian bytes
    pub fn from_number_with_marker(number: u64, marker: u8) -> Self {
        let mut value = vec![marker];
        value.extend_from_slice(&non_negative_integer_bytes(number));
        Self::new(value)
    }

    pub fn from_number(number: u64) -> Self {
        Self::new(non_negative_integer_bytes(number))
    }

    pub fn from_segment(segment: u64) -> Self {
        Self::from_number_with_marker(segment, SEGMENT_MARKER)
    }

    pub fn from_version(version: u64) -> Self {
        Self::from_number_with_marker(version, VERSION_MARKER)
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn is_implicit_sha256_digest(&self) -> bool {
        self.component_type == ComponentType::ImplicitSha256Digest
    }

    /// Interpret the whole value as a big-endian number
    pub fn to_number(&self) -> Result<u64, NameParseError> {
        big_endian_number(&self.value)
    }

    pub fn to_number_with_marker(&self, marker: u8) -> Result<u64, NameParseError> {
        match self.value.split_first() {
            Some((first, rest)) if *first == marker => big_endian_number(rest),
            _ => Err(NameParseError::MissingMarker(marker)),
        }
    }

    pub fn to_segment(&self) -> Result<u64, NameParseError> {
        self.to_number_with_marker(SEGMENT_MARKER)
    }

    pub fn to_version(&self) -> Result<u64, NameParseError> {
        self.to_number_with_marker(VERSION_MARKER)
    }

    /// URI form of this component.
    ///
    /// Unreserved bytes are kept, everything else is `%XX`. A value made only
    /// of periods gets three more so it cannot be read as a relative path.
    pub fn to_escaped_string(&self) -> String {
        if self.is_implicit_sha256_digest() {
            return format!("{}{}", DIGEST_URI_PREFIX, hex::encode(&self.value));
        }

        if self.value.iter().all(|byte| *byte == b'.') {
            return ".".repeat(self.value.len() + 3);
        }

        let mut escaped = String::with_capacity(self.value.len());
        for byte in &self.value {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'-' | b'.' | b'_') {
                escaped.push(*byte as char);
            } else {
                escaped.push_str(&format!("%{:02X}", byte));
            }
        }
        escaped
    }
}

impl From<&str> for NameComponent {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<Vec<u8>> for NameComponent {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_escaped_string())
    }
}

/// Canonical order: TLV type, then length, then bytes
impl Ord for NameComponent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.component_type
            .tlv_type()
            .cmp(&other.component_type.tlv_type())
            .then_with(|| self.value.len().cmp(&other.value.len()))
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl PartialOrd for NameComponent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn non_negative_integer_bytes(number: u64) -> Vec<u8> {
    if number <= u8::MAX as u64 {
        vec![number as u8]
    } else if number <= u16::MAX as u64 {
        (number as u16).to_be_bytes().to_vec()
    } else if number <= u32::MAX as u64 {
        (number as u32).to_be_bytes().to_vec()
    } else {
        number.to_be_bytes().to_vec()
    }
}

fn big_endian_number(bytes: &[u8]) -> Result<u64, NameParseError> {
    if bytes.len() > 8 {
        return Err(NameParseError::NumberTooLong);
    }
    Ok(bytes.iter().fold(0u64, |number, byte| (number << 8) | *byte as u64))
}

fn unescape(escaped: &str) -> Result<Vec<u8>, NameParseError> {
    let bytes = escaped.as_bytes();
    let mut value = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = escaped
                .get(i + 1..i + 3)
                .filter(|digits| digits.bytes().all(|digit| digit.is_ascii_hexdigit()))
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                .ok_or_else(|| NameParseError::InvalidEscape(escaped.to_string()))?;
            value.push(byte);
            i += 3;
        } else {
            value.push(bytes[i]);
            i += 1;
        }
    }
    Ok(value)
}

/// `Ok(None)` for components that name nothing ("", ".", "..")
fn from_escaped_component(escaped: &str) -> Result<Option<NameComponent>, NameParseError> {
    if let Some(digest) = escaped.strip_prefix(DIGEST_URI_PREFIX) {
        let digest = hex::decode(digest).map_err(|_| NameParseError::InvalidDigest(escaped.to_string()))?;
        return NameComponent::implicit_sha256_digest(&digest).map(Some);
    }

    let value = unescape(escaped)?;
    if value.iter().all(|byte| *byte == b'.') {
        if value.len() <= 2 {
            return Ok(None);
        }
        return Ok(Some(NameComponent::new(&value[3..])));
    }
    Ok(Some(NameComponent::new(value)))
}

/// A hierarchical NDN name
#[derive(Debug, Clone, Default)]
pub struct Name {
    components: Vec<NameComponent>,
    change_count: u64,
}

impl Name {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_components(components: Vec<NameComponent>) -> Self {
        Self {
            components,
            change_count: 0,
        }
    }

    /// Parse an NDN URI such as `/hello/world`, `ndn:/a/%00` or `ndn://authority/a`
    pub fn from_uri(uri: &str) -> Result<Self, NameParseError> {
        let mut uri = uri.trim();

        // Drop the scheme if the first colon comes before the first slash
        if let Some(colon) = uri.find(':') {
            match uri.find('/') {
                Some(slash) if slash < colon => {}
                _ => uri = &uri[colon + 1..],
            }
        }

        // Drop the authority
        if let Some(rest) = uri.strip_prefix("//") {
            match rest.find('/') {
                Some(slash) => uri = &rest[slash..],
                None => return Ok(Self::new()),
            }
        }

        let mut name = Self::new();
        for part in uri.split('/') {
            if let Some(component) = from_escaped_component(part)? {
                name.components.push(component);
            }
        }
        Ok(name)
    }

    pub fn components(&self) -> &[NameComponent] {
        &self.components
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NameComponent> {
        self.components.iter()
    }

    /// Append a generic component
    pub fn append(&mut self, value: impl Into<Vec<u8>>) -> &mut Self {
        self.append_component(NameComponent::new(value))
    }

    pub fn append_component(&mut self, component: NameComponent) -> &mut Self {
        self.components.push(component);
        self.change_count += 1;
        self
    }

    pub fn append_name(&mut self, name: &Name) -> &mut Self {
        self.components.extend(name.components.iter().cloned());
        self.change_count += 1;
        self
    }

    pub fn append_segment(&mut self, segment: u64) -> &mut Self {
        self.append_component(NameComponent::from_segment(segment))
    }

    pub fn append_version(&mut self, version: u64) -> &mut Self {
        self.append_component(NameComponent::from_version(version))
    }

    pub fn append_implicit_sha256_digest(&mut self, digest: &[u8]) -> Result<&mut Self, NameParseError> {
        let component = NameComponent::implicit_sha256_digest(digest)?;
        Ok(self.append_component(component))
    }

    pub fn pop(&mut self) -> Option<NameComponent> {
        let component = self.components.pop();
        if component.is_some() {
            self.change_count += 1;
        }
        component
    }

    pub fn clear(&mut self) {
        self.components.clear();
        self.change_count += 1;
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component at `index`; negative indexes count from the end
    pub fn get(&self, index: isize) -> Option<&NameComponent> {
        let index = if index < 0 {
            self.components.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.components.get(index)
    }

    /// The first `count` components; a negative count drops components from the end
    pub fn get_prefix(&self, count: isize) -> Name {
        let end = if count < 0 {
            self.components.len().saturating_sub(count.unsigned_abs())
        } else {
            (count as usize).min(self.components.len())
        };
        Self::from_components(self.components[..end].to_vec())
    }

    pub fn get_sub_name(&self, start: usize, count: usize) -> Name {
        let start = start.min(self.components.len());
        let end = start.saturating_add(count).min(self.components.len());
        Self::from_components(self.components[start..end].to_vec())
    }

    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    pub fn to_uri(&self) -> String {
        if self.components.is_empty() {
            return "/".to_string();
        }

        let mut uri = String::new();
        for component in &self.components {
            uri.push('/');
            uri.push_str(&component.to_escaped_string());
        }
        uri
    }
}

impl ChangeCount for Name {
    fn change_count(&self) -> u64 {
        self.change_count
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

/// Canonical order: component by component, a proper prefix sorts first
impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Name {
    type Err = NameParseError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        Self::from_uri(uri)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

impl<'a> IntoIterator for &'a Name {
    type Item = &'a NameComponent;
    type IntoIter = std::slice::Iter<'a, NameComponent>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_uri())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        Name::from_uri(&uri).map_err(serde::de::Error::custom)
    }
}
