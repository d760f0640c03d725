/// Magic header of an outbound discovery beacon ("who is there?").
pub const MAGIC_WHO: [u8; 8] = [0x49, 0x4c, 0x7b, 0xae, 0x30, 0x30, 0x69, 0x9e];

/// Magic header of an inbound discovery response ("here I am").
pub const MAGIC_HERE: [u8; 8] = [0x22, 0xd6, 0xb1, 0x4b, 0x35, 0x28, 0x10, 0x51];

/// Port used for both UDP discovery and the TLS transport.
pub const DEFAULT_PORT: u16 = 8877;

/// Seconds between discovery broadcast ticks.
pub const DISCOVERY_INTERVAL_SECS: u64 = 5;

/// Broadcast cycles a device survives without re-confirming itself.
pub const DEVICE_TTL: u32 = 3;

/// Status byte in a discovery response meaning the peer already trusts us.
/// Every other value collapses to "unknown".
pub const STATUS_KNOWN: u8 = 2;

/// Byte terminating one application frame on the secure channel.
pub const FRAME_DELIMITER: u8 = 0xFF;

/// Bytes of frame header before the base64 body: opcode + u32 length.
pub const FRAME_HEADER_LEN: usize = 5;
