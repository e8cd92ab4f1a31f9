use std::time::Duration;

use crate::name::Name;

/// Route inheritance flags for a registered prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForwardingFlags {
    pub child_inherit: bool,
    pub capture: bool,
}

impl ForwardingFlags {
    pub const CHILD_INHERIT: u64 = 1;
    pub const CAPTURE: u64 = 2;

    pub fn to_bits(&self) -> u64 {
        let mut bits = 0;
        if self.child_inherit {
            bits |= Self::CHILD_INHERIT;
        }
        if self.capture {
            bits |= Self::CAPTURE;
        }
        bits
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            child_inherit: bits & Self::CHILD_INHERIT != 0,
            capture: bits & Self::CAPTURE != 0,
        }
    }
}

impl Default for ForwardingFlags {
    fn default() -> Self {
        Self {
            child_inherit: true,
            capture: false,
        }
    }
}

/// Parameters of an NFD management command such as `rib/register`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlParameters {
    pub name: Option<Name>,
    pub face_id: Option<u64>,
    pub uri: Option<String>,
    pub local_control_feature: Option<u64>,
    pub origin: Option<u64>,
    pub cost: Option<u64>,
    pub forwarding_flags: ForwardingFlags,
    pub strategy: Option<Name>,
    pub expiration_period: Option<Duration>,
}

impl ControlParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters for registering `prefix` on the local forwarder
    pub fn for_prefix(prefix: Name) -> Self {
        Self {
            name: Some(prefix),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarding_flags_bits() {
        let flags = ForwardingFlags::default();
        assert_eq!(flags.to_bits(), 1);

        let flags = ForwardingFlags::from_bits(3);
        assert!(flags.child_inherit);
        assert!(flags.capture);
        assert_eq!(ForwardingFlags::from_bits(0).to_bits(), 0);
    }
}
