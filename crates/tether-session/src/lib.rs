//! Player session tracking for Tether hosts and dedicated servers.
//!
//! The transport hands out a fresh [`ClientId`](tether_transport::ClientId)
//! per connection; players carry a stable player id in their connection
//! payload. This crate keeps the mapping between the two so the connection
//! manager can:
//!
//! 1. **Detect duplicate logins** when the same player id arrives through a
//!    second client ([`Admission::Replaced`])
//! 2. **Recognise reconnects** when a player comes back within the grace
//!    period ([`Admission::Reconnected`])
//! 3. **Name players** in connection events after their client is gone
//!
//! # How it fits in the stack
//!
//! ```text
//! Connection manager (above)  ← consults sessions during approval
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Transport (below)  ← provides ClientId
//! ```

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{Admission, PlayerSession, SessionConfig, SessionState};
