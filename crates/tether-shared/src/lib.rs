// Shared vocabulary for the Tether companion: wire constants, error
// taxonomy, digest helpers, the keypair capability, and the message protocol.

pub mod constants;
pub mod digest;
pub mod error;
pub mod keypair;
pub mod protocol;
pub mod types;

pub use digest::{key_fingerprint, server_id};
pub use error::TetherError;
pub use keypair::{keypair_channel, EdKeypair, Keypair, KeypairWatch, SharedKeypair};
pub use protocol::{Message, Opcode};
pub use types::{ConnectionState, TrustStatus};
