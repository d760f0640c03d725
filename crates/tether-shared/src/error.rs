use thiserror::Error;

#[derive(Error, Debug)]
pub enum TetherError {
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while encoding or decoding one application frame. All of these
/// are fatal to the connection they occurred on.
#[derive(Error, Debug)]
pub enum FramingError {
    #[error("frame shorter than its {expected}-byte header ({got} bytes)")]
    Truncated { expected: usize, got: usize },

    #[error("frame body is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("frame body failed to decompress: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("frame body failed to compress: {0}")]
    Compress(#[source] std::io::Error),

    #[error("frame payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trust and protocol failures during pairing. Treated as a potential
/// active attack: the connection is closed, never retried.
#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("peer presented no certificate")]
    MissingCertificate,

    #[error("malformed challenge, expected <server-id>:<nonce>")]
    MalformedChallenge,

    #[error("challenge names a different server id than the connection certificate")]
    ServerIdMismatch,

    #[error("challenge payload missing `{0}` field")]
    MissingField(&'static str),

    #[error("no local keypair available")]
    NoKeypair,
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("discovery socket setup failed: {0}")]
    Bind(#[source] std::io::Error),

    #[error("failed to send beacon: {0}")]
    Send(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("already connected to {0}")]
    AlreadyConnected(String),

    #[error("keypair provider is gone")]
    KeypairUnavailable,

    #[error("TLS setup failed: {0}")]
    Tls(#[source] std::io::Error),

    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by peer")]
    ClosedByPeer,
}

/// Per-record normalization failures. Recoverable: the offending row is
/// dropped and the sync continues.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("unknown mimetype: {0}")]
    UnknownMimetype(String),

    #[error("data row {data_id} references unknown raw contact {raw_contact_id}")]
    OrphanedRow { data_id: i64, raw_contact_id: i64 },

    #[error("raw contact {raw_contact_id} references unknown contact {contact_id}")]
    OrphanedRawContact { raw_contact_id: i64, contact_id: i64 },
}
