//! Application state shared with the embedding UI.
//!
//! Wrapped in `Arc<Mutex<>>` by [`crate::bridge::Client`]; the bridge
//! tasks are the only writers, the UI reads snapshots.

use std::net::SocketAddr;
use std::sync::Arc;

use tether_contacts::NormalizedContacts;
use tether_net::discovery::DeviceRecord;
use tether_shared::types::ConnectionState;

/// Central application state.
#[derive(Debug, Default)]
pub struct AppState {
    /// Devices currently answering discovery beacons.
    pub devices: Vec<DeviceRecord>,

    /// Address of the active (or last) connection attempt.
    pub remote: Option<SocketAddr>,

    /// Lifecycle of the single connection; `None` before the first attempt.
    pub connection_state: Option<ConnectionState>,

    /// Contact set from the most recent sync. Replaced wholesale per
    /// sync, dropped on disconnect.
    pub contacts: Option<Arc<NormalizedContacts>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.connection_state,
            Some(ConnectionState::Connecting)
                | Some(ConnectionState::Connected)
                | Some(ConnectionState::Authenticated)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_not_connected() {
        let state = AppState::new();
        assert!(!state.is_connected());
        assert!(state.devices.is_empty());
        assert!(state.contacts.is_none());
    }

    #[test]
    fn test_closed_state_not_connected() {
        let state = AppState {
            connection_state: Some(ConnectionState::Closed { error: None }),
            ..Default::default()
        };
        assert!(!state.is_connected());
    }
}
