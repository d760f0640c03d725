// Network layer: UDP device discovery, the framed message codec, the TLS
// transport to the phone, and the pairing session that runs over it.

pub mod discovery;
pub mod framing;
pub mod handshake;
pub mod session;
pub mod tls;

pub use discovery::{
    spawn_discovery, DeviceRecord, DeviceTracker, DiscoveryCommand, DiscoveryConfig,
    DiscoveryEvent,
};
pub use framing::{decode_segment, encode_frame, DecodedFrame, FrameBuffer};
pub use handshake::{Handshake, HandshakeEvent, HandshakePhase};
pub use session::{spawn_session, SessionCommand, SessionEvent, SessionHandle};
