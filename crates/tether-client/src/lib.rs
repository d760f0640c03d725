// Companion client facade: discovery + pairing + contact sync behind a
// typed event stream. The embedding UI supplies the keypair and renders
// whatever the events carry.

pub mod bridge;
pub mod config;
pub mod events;
pub mod state;

use tracing_subscriber::{fmt, EnvFilter};

pub use bridge::Client;
pub use config::ClientConfig;
pub use events::ClientEvent;
pub use state::AppState;

/// Initialize structured logging. Call once at startup, before
/// [`Client::start`].
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("tether_client=debug,tether_net=debug,tether_contacts=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
