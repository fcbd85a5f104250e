//! Gateway: HTTP front door for the CodeArtifact proxy.
//!
//! Lifecycle:
//! 1. Load + validate config
//! 2. Resolve AWS identity, fetch the first upstream token
//! 3. Spawn the recurring token refresher
//! 4. Serve the forwarding routes, optionally behind inbound basic auth
//!
//! Token lifecycle lives in `caproxy-credential`; this crate only snapshots
//! the current token per request and relays upstream responses.

pub mod auth;
pub mod proxy;
pub mod server;
pub mod state;
pub mod upstream;
