//! The facade the embedding UI talks to.
//!
//! [`Client`] owns the discovery task, the single session slot, and the
//! bridge tasks that turn network notifications into [`ClientEvent`]s
//! and state updates. Discovery is suspended while a connection attempt
//! is in flight and resumed once the session has fully torn down.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use tether_contacts::{normalize, ContactsPayload, NormalizedContacts};
use tether_net::discovery::{
    spawn_discovery, DeviceRecord, DiscoveryCommand, DiscoveryConfig, DiscoveryEvent,
};
use tether_net::session::{spawn_session, SessionEvent, SessionHandle};
use tether_shared::error::ConnectionError;
use tether_shared::keypair::{wait_for_keypair, KeypairWatch};
use tether_shared::types::ConnectionState;

use crate::config::ClientConfig;
use crate::events::ClientEvent;
use crate::state::AppState;

type SessionSlot = Arc<Mutex<Option<SessionHandle>>>;

pub struct Client {
    config: ClientConfig,
    keypair: KeypairWatch,
    state: Arc<Mutex<AppState>>,
    events: broadcast::Sender<ClientEvent>,
    discovery: mpsc::Sender<DiscoveryCommand>,
    session: SessionSlot,
}

impl Client {
    /// Bring up discovery and the event bridge. The keypair may still be
    /// absent at this point; discovery broadcasts start once it appears
    /// and connecting awaits it.
    pub async fn start(config: ClientConfig, keypair: KeypairWatch) -> anyhow::Result<Arc<Self>> {
        let discovery_config = DiscoveryConfig {
            port: config.port,
            interval: config.discovery_interval,
            ..Default::default()
        };
        let (discovery, discovery_events) =
            spawn_discovery(keypair.clone(), discovery_config).await?;

        let (events, _) = broadcast::channel(256);
        let state = Arc::new(Mutex::new(AppState::new()));

        tokio::spawn(discovery_bridge(
            state.clone(),
            events.clone(),
            discovery_events,
        ));

        info!(port = config.port, "Client started");

        Ok(Arc::new(Self {
            config,
            keypair,
            state,
            events,
            discovery,
            session: Arc::new(Mutex::new(None)),
        }))
    }

    /// Subscribe to client events. Late subscribers can read current
    /// state through the snapshot accessors.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn devices(&self) -> Vec<DeviceRecord> {
        self.state.lock().expect("state lock").devices.clone()
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.state
            .lock()
            .expect("state lock")
            .connection_state
            .clone()
    }

    pub fn contacts(&self) -> Option<Arc<NormalizedContacts>> {
        self.state.lock().expect("state lock").contacts.clone()
    }

    /// Open the secure channel to a phone. Rejected synchronously while
    /// another session exists; the keypair is awaited if it has not been
    /// published yet.
    pub async fn connect(&self, address: SocketAddr) -> Result<(), ConnectionError> {
        {
            let mut slot = self.session.lock().expect("session lock");
            if let Some(handle) = slot.as_ref() {
                if !handle.is_finished() {
                    return Err(ConnectionError::AlreadyConnected(handle.remote.to_string()));
                }
                // The prior task is gone but its closed event has not
                // cleared the slot yet.
                *slot = None;
            }
        }

        let mut watch = self.keypair.clone();
        let keypair = wait_for_keypair(&mut watch)
            .await
            .ok_or(ConnectionError::KeypairUnavailable)?;

        // No discovering while a connection attempt is in flight.
        let _ = self.discovery.send(DiscoveryCommand::Stop).await;

        {
            let mut state = self.state.lock().expect("state lock");
            state.remote = Some(address);
            state.connection_state = Some(ConnectionState::Connecting);
        }

        let (session_tx, session_rx) = mpsc::channel(64);
        let handle = spawn_session(address, keypair, session_tx);
        *self.session.lock().expect("session lock") = Some(handle);

        tokio::spawn(session_bridge(
            address,
            session_rx,
            self.state.clone(),
            self.events.clone(),
            self.discovery.clone(),
            self.session.clone(),
        ));

        Ok(())
    }

    /// Ask the active session to say goodbye and tear down. No-op when
    /// disconnected; the session slot clears once teardown completes.
    pub fn disconnect(&self) {
        if let Some(handle) = self.session.lock().expect("session lock").as_ref() {
            handle.close();
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

async fn discovery_bridge(
    state: Arc<Mutex<AppState>>,
    events: broadcast::Sender<ClientEvent>,
    mut discovery_events: mpsc::Receiver<DiscoveryEvent>,
) {
    while let Some(event) = discovery_events.recv().await {
        match event {
            DiscoveryEvent::DevicesChanged(devices) => {
                debug!(count = devices.len(), "Discovered device set changed");
                state.lock().expect("state lock").devices = devices.clone();
                let _ = events.send(ClientEvent::DevicesChanged(devices));
            }
        }
    }
    debug!("Discovery bridge ended");
}

async fn session_bridge(
    address: SocketAddr,
    mut session_events: mpsc::Receiver<SessionEvent>,
    state: Arc<Mutex<AppState>>,
    events: broadcast::Sender<ClientEvent>,
    discovery: mpsc::Sender<DiscoveryCommand>,
    session: SessionSlot,
) {
    while let Some(event) = session_events.recv().await {
        match event {
            SessionEvent::StateChanged(connection_state) => {
                let closed = matches!(connection_state, ConnectionState::Closed { .. });
                {
                    let mut state = state.lock().expect("state lock");
                    state.connection_state = Some(connection_state.clone());
                    if closed {
                        // The graph belongs to the session.
                        state.contacts = None;
                    }
                }
                let _ = events.send(ClientEvent::ConnectionStateChanged {
                    address,
                    state: connection_state,
                });

                if closed {
                    session.lock().expect("session lock").take();
                    // Back to looking for phones.
                    let _ = discovery.send(DiscoveryCommand::Start).await;
                }
            }

            SessionEvent::ConfirmFingerprint { fingerprint } => {
                let _ = events.send(ClientEvent::ConfirmFingerprint { fingerprint });
            }

            SessionEvent::PeerRecognized => {
                let _ = events.send(ClientEvent::PeerRecognized);
            }

            SessionEvent::ContactsReceived { payload } => {
                let parsed: Result<ContactsPayload, _> = serde_json::from_value(payload);
                match parsed {
                    Ok(payload) => {
                        let set = Arc::new(normalize(payload));
                        info!(
                            contacts = set.graph.contact_count(),
                            "Contact sync complete"
                        );
                        state.lock().expect("state lock").contacts = Some(set.clone());
                        let _ = events.send(ClientEvent::ContactsReady(set));
                    }
                    Err(e) => {
                        // Malformed sync payload is as fatal as a bad frame.
                        warn!(error = %e, "Contacts payload did not parse, closing");
                        if let Some(handle) = session.lock().expect("session lock").as_ref() {
                            handle.close();
                        }
                    }
                }
            }
        }
    }
    debug!(addr = %address, "Session bridge ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tether_shared::keypair::{keypair_channel, EdKeypair, SharedKeypair};
    use tokio::net::TcpListener;

    async fn started_client(port: u16) -> (Arc<Client>, tokio::sync::watch::Sender<Option<SharedKeypair>>) {
        let (keypair_tx, keypair_rx) = keypair_channel();
        keypair_tx
            .send(Some(Arc::new(EdKeypair::generate()) as SharedKeypair))
            .unwrap();
        let config = ClientConfig {
            port,
            ..Default::default()
        };
        let client = Client::start(config, keypair_rx).await.unwrap();
        (client, keypair_tx)
    }

    #[tokio::test]
    async fn test_second_connect_rejected_synchronously() {
        // A listener that accepts and then sits silent keeps the first
        // session alive in its TLS handshake.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let (client, _keypair_tx) = started_client(18891).await;
        client.connect(addr).await.unwrap();

        let err = client.connect(addr).await.unwrap_err();
        assert!(matches!(err, ConnectionError::AlreadyConnected(_)));
        assert!(err.to_string().contains(&addr.to_string()));
    }

    #[tokio::test]
    async fn test_failed_connect_allows_retry() {
        let (client, _keypair_tx) = started_client(18892).await;
        let mut events = client.subscribe();

        // Nobody listening: the session dies immediately.
        let dead: SocketAddr = "127.0.0.1:1".parse().unwrap();
        client.connect(dead).await.unwrap();

        loop {
            match events.recv().await.unwrap() {
                ClientEvent::ConnectionStateChanged {
                    state: ConnectionState::Closed { error },
                    ..
                } => {
                    assert!(error.is_some());
                    break;
                }
                _ => continue,
            }
        }

        // Teardown finishes just behind the closed event; give it a beat.
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The slot cleared, so a new attempt is admissible.
        client.connect(dead).await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_waits_for_published_keypair() {
        let (keypair_tx, keypair_rx) = keypair_channel();
        let config = ClientConfig {
            port: 18893,
            ..Default::default()
        };
        let client = Client::start(config, keypair_rx).await.unwrap();

        let dead: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let connect = {
            let client = client.clone();
            tokio::spawn(async move { client.connect(dead).await })
        };

        // Still parked on the keypair.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!connect.is_finished());

        keypair_tx
            .send(Some(Arc::new(EdKeypair::generate()) as SharedKeypair))
            .unwrap();
        connect.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_keypair_provider_gone_is_an_error() {
        let (keypair_tx, keypair_rx) = keypair_channel();
        let config = ClientConfig {
            port: 18894,
            ..Default::default()
        };
        let client = Client::start(config, keypair_rx).await.unwrap();
        drop(keypair_tx);

        let dead: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let err = client.connect(dead).await.unwrap_err();
        assert!(matches!(err, ConnectionError::KeypairUnavailable));
    }
}
