//! UDP device discovery.
//!
//! Every tick we broadcast a beacon (`MAGIC_WHO` + our fingerprint) and
//! age out devices that stopped answering; any `MAGIC_HERE` response
//! refreshes its sender. The discovery task owns the device map
//! exclusively and pushes snapshots to the application only when set
//! membership changes.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tether_shared::constants::{
    DEFAULT_PORT, DEVICE_TTL, DISCOVERY_INTERVAL_SECS, MAGIC_HERE, MAGIC_WHO,
};
use tether_shared::error::DiscoveryError;
use tether_shared::keypair::KeypairWatch;
use tether_shared::types::TrustStatus;

/// One discovered phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub address: IpAddr,
    /// Display name the device advertises; constant per device.
    pub name: String,
    /// Whether the device already trusts our key.
    pub known: bool,
    /// Broadcast cycles left before the device is purged.
    pub ttl: u32,
}

/// TTL bookkeeping for the discovered set. Pure so expiry and refresh
/// semantics are testable without sockets.
#[derive(Debug, Default)]
pub struct DeviceTracker {
    devices: HashMap<IpAddr, DeviceRecord>,
}

impl DeviceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Age every device by one cycle and purge the expired. Returns
    /// whether the set changed.
    pub fn on_tick(&mut self) -> bool {
        let before = self.devices.len();
        self.devices.retain(|_, device| {
            device.ttl -= 1;
            device.ttl >= 1
        });
        self.devices.len() != before
    }

    /// Record a beacon response. The ttl always resets to the constant,
    /// never accumulates. Returns whether a new device appeared.
    pub fn on_response(&mut self, address: IpAddr, name: String, status: TrustStatus) -> bool {
        let is_new = !self.devices.contains_key(&address);
        self.devices.insert(
            address,
            DeviceRecord {
                address,
                name,
                known: status.is_known(),
                ttl: DEVICE_TTL,
            },
        );
        is_new
    }

    pub fn clear(&mut self) -> bool {
        let had_devices = !self.devices.is_empty();
        self.devices.clear();
        had_devices
    }

    /// Snapshot of the discovered set, sorted by address.
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        let mut devices: Vec<_> = self.devices.values().cloned().collect();
        devices.sort_by_key(|d| d.address);
        devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Build one outbound beacon packet.
pub fn build_beacon(fingerprint: &str) -> Vec<u8> {
    let mut packet = Vec::with_capacity(MAGIC_WHO.len() + fingerprint.len());
    packet.extend_from_slice(&MAGIC_WHO);
    packet.extend_from_slice(fingerprint.as_bytes());
    packet
}

/// Parse an inbound packet as a beacon response. Anything that does not
/// open with `MAGIC_HERE` is not for us.
pub fn parse_response(packet: &[u8]) -> Option<(TrustStatus, String)> {
    let rest = packet.strip_prefix(&MAGIC_HERE[..])?;
    let (&status, name) = rest.split_first()?;
    Some((
        TrustStatus::from_status_byte(status),
        String::from_utf8_lossy(name).into_owned(),
    ))
}

/// Commands sent *into* the discovery task.
#[derive(Debug)]
pub enum DiscoveryCommand {
    /// Resume broadcasting (also broadcasts immediately).
    Start,
    /// Suspend broadcasting and forget all devices; issued when a
    /// connection attempt begins.
    Stop,
    /// Tear the task down.
    Shutdown,
}

/// Notifications sent *from* the discovery task.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// Set membership changed; carries the full new snapshot.
    DevicesChanged(Vec<DeviceRecord>),
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub port: u16,
    pub interval: Duration,
    pub broadcast_addr: Ipv4Addr,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            interval: Duration::from_secs(DISCOVERY_INTERVAL_SECS),
            broadcast_addr: Ipv4Addr::BROADCAST,
        }
    }
}

/// Spawn the discovery task.
///
/// Broadcasting is skipped while the keypair has not been published yet;
/// listening runs regardless. Returns the command and notification
/// channels.
pub async fn spawn_discovery(
    keypair: KeypairWatch,
    config: DiscoveryConfig,
) -> Result<
    (
        mpsc::Sender<DiscoveryCommand>,
        mpsc::Receiver<DiscoveryEvent>,
    ),
    DiscoveryError,
> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.port))
        .await
        .map_err(DiscoveryError::Bind)?;
    socket.set_broadcast(true).map_err(DiscoveryError::Bind)?;

    info!(port = config.port, "Discovery listening");

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<DiscoveryCommand>(16);
    let (event_tx, event_rx) = mpsc::channel::<DiscoveryEvent>(64);

    tokio::spawn(async move {
        let mut tracker = DeviceTracker::new();
        let mut running = true;
        let mut ticker = tokio::time::interval(config.interval);
        let beacon_target = SocketAddr::from((config.broadcast_addr, config.port));
        let mut recv_buf = [0u8; 2048];

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !running {
                        continue;
                    }
                    broadcast_tick(&socket, &keypair, beacon_target).await;
                    if tracker.on_tick() {
                        let _ = event_tx
                            .send(DiscoveryEvent::DevicesChanged(tracker.snapshot()))
                            .await;
                    }
                }

                received = socket.recv_from(&mut recv_buf) => {
                    let (len, from) = match received {
                        Ok(r) => r,
                        Err(e) => {
                            warn!(error = %e, "Discovery receive failed");
                            continue;
                        }
                    };
                    let Some((status, name)) = parse_response(&recv_buf[..len]) else {
                        continue;
                    };
                    if !running {
                        continue;
                    }
                    debug!(addr = %from.ip(), name = %name, status = ?status, "Beacon response");
                    if tracker.on_response(from.ip(), name, status) {
                        let _ = event_tx
                            .send(DiscoveryEvent::DevicesChanged(tracker.snapshot()))
                            .await;
                    }
                }

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(DiscoveryCommand::Start) => {
                            if !running {
                                info!("Discovery resumed");
                                running = true;
                                broadcast_tick(&socket, &keypair, beacon_target).await;
                            }
                        }
                        Some(DiscoveryCommand::Stop) => {
                            if running {
                                info!("Discovery suspended");
                                running = false;
                                if tracker.clear() {
                                    let _ = event_tx
                                        .send(DiscoveryEvent::DevicesChanged(Vec::new()))
                                        .await;
                                }
                            }
                        }
                        Some(DiscoveryCommand::Shutdown) | None => {
                            debug!("Discovery task shutting down");
                            break;
                        }
                    }
                }
            }
        }
    });

    Ok((cmd_tx, event_rx))
}

async fn broadcast_tick(socket: &UdpSocket, keypair: &KeypairWatch, target: SocketAddr) {
    // No identity yet: nothing to announce this cycle.
    let Some(fingerprint) = keypair
        .borrow()
        .as_ref()
        .map(|kp| kp.fingerprint().to_string())
    else {
        debug!("Keypair not available yet, skipping beacon");
        return;
    };

    let packet = build_beacon(&fingerprint);
    if let Err(e) = socket.send_to(&packet, target).await {
        warn!(error = %DiscoveryError::Send(e), "Beacon broadcast failed");
    }
}
