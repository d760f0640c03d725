use serde::{Deserialize, Serialize};

use crate::constants::STATUS_KNOWN;

/// Whether a discovered peer already trusts our public key. The discovery
/// response carries one status byte; only the literal value `2` means
/// "known", everything else is a single "unknown" bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustStatus {
    Known,
    Unknown,
}

impl TrustStatus {
    pub fn from_status_byte(b: u8) -> Self {
        if b == STATUS_KNOWN {
            Self::Known
        } else {
            Self::Unknown
        }
    }

    pub fn is_known(self) -> bool {
        self == Self::Known
    }
}

/// Lifecycle of the single active connection, as surfaced to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// TCP/TLS connect in flight.
    Connecting,
    /// Secure channel up, handshake running.
    Connected,
    /// Mutual identity verification completed.
    Authenticated,
    /// Torn down; carries the error that ended the session, if any.
    Closed { error: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_status_collapses_non_known() {
        assert_eq!(TrustStatus::from_status_byte(2), TrustStatus::Known);
        assert_eq!(TrustStatus::from_status_byte(0), TrustStatus::Unknown);
        assert_eq!(TrustStatus::from_status_byte(1), TrustStatus::Unknown);
        assert_eq!(TrustStatus::from_status_byte(255), TrustStatus::Unknown);
    }
}
