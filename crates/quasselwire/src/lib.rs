//! Client for the Quassel IRC core protocol.
//!
//! # Crate Structure
//!
//! - [`frame`]: length-prefixed framing over byte streams
//! - [`types`]: `QDataStream` value codec, type registry and semantic adapter
//! - [`session`]: login handshake, command dispatch, heartbeat and the async
//!   run loop (behind the `session` feature)

/// Re-export frame types.
pub mod frame {
    pub use quasselwire_frame::*;
}

/// Re-export value codec types.
pub mod types {
    pub use quasselwire_types::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use quasselwire_session::*;
}
