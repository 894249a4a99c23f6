//! Client side of a Quassel core connection.
//!
//! [`Session`] is a sans-io state machine: feed it frame payloads, get back
//! frames to send and [`Event`]s to deliver. [`run_session`] drives one over
//! any `AsyncRead + AsyncWrite` transport together with the heartbeat timer
//! and a [`ClientCommand`] channel.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handlers;
pub mod heartbeat;
pub mod identifier;
pub mod request;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{run_session, ClientCommand};
pub use config::{Clock, Credentials, FixedClock, SessionConfig, SystemClock};
pub use dispatch::{Args, DispatchTable};
pub use error::{DispatchError, HandshakeError, Result, SessionError};
pub use event::{BufferMarker, Event, NotificationSink};
pub use heartbeat::Heartbeat;
pub use identifier::ObjectId;
pub use request::RequestType;
pub use session::{Output, Session, SessionState, PROTOCOL_VERSION};
