//! Typed notifications for the UI layer.
//!
//! The UI subscribes through a broadcast channel; every event carries
//! enough to render without reading core state back.

use std::net::SocketAddr;
use std::sync::Arc;

use tether_contacts::NormalizedContacts;
use tether_net::discovery::DeviceRecord;
use tether_shared::types::ConnectionState;

#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The discovered-device set changed; full new snapshot.
    DevicesChanged(Vec<DeviceRecord>),

    /// The single connection moved through its lifecycle.
    ConnectionStateChanged {
        address: SocketAddr,
        state: ConnectionState,
    },

    /// The phone wants the user to confirm this fingerprint on its screen.
    ConfirmFingerprint { fingerprint: String },

    /// The phone already recognizes our key.
    PeerRecognized,

    /// A fresh normalized contact set replaced the previous one.
    ContactsReady(Arc<NormalizedContacts>),
}
