//! Chat relay server implementation
//!
//! One coordinator per connection drives the lifecycle
//! connect → authenticate → enter-room → active → disconnect, backed by:
//!
//! - **PresenceDirectory**: who is in which room (single source of truth)
//! - **CredentialStore**: durable accounts with atomic create/verify
//! - **RoomBroadcaster**: room-scoped fan-out over the multicast hub
//! - **RelayServer**: QUIC endpoint, accept loop, per-connection wiring

pub mod broadcast;
pub mod credentials;
pub mod presence;
pub mod relay;
pub mod session;

pub use broadcast::RoomBroadcaster;
pub use credentials::{AccountRecord, CredentialError, CredentialStore, VerifyOutcome};
pub use presence::{PresenceDirectory, Session};
pub use relay::{RelayConfig, RelayServer, ServerStats};
pub use session::SessionCoordinator;
