use quasselwire_frame::FrameError;
use quasselwire_types::{AdaptError, DecodeError, EncodeError};

use crate::session::SessionState;

/// A command could not be routed to a handler.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// No handler for the key and no fallback handler in the table.
    #[error("no {namespace} handler for '{key}'")]
    Unhandled { namespace: &'static str, key: String },

    /// A handler was found but its arguments do not have the expected shape.
    #[error("bad arguments for '{key}': {reason}")]
    BadArguments { key: String, reason: String },
}

/// The core answered the login sequence with something unexpected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HandshakeError {
    #[error("expected {expected} while {state}, got {found}")]
    UnexpectedMessage {
        state: SessionState,
        expected: &'static str,
        found: String,
    },

    /// The core refused the client or its credentials.
    #[error("core rejected {stage}: {reason}")]
    Rejected { stage: &'static str, reason: String },

    #[error("malformed handshake message while {state}: {reason}")]
    Malformed { state: SessionState, reason: String },
}

/// Errors that can occur while running a client session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("adapt error: {0}")]
    Adapt(#[from] AdaptError),

    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A command was issued before the session reached the active state.
    #[error("session is not active (state: {state})")]
    NotActive { state: SessionState },

    /// The session was closed, locally or by a fatal error.
    #[error("session terminated")]
    Terminated,
}

impl SessionError {
    /// Whether the connection must be torn down. Everything else aborts the
    /// current frame or command only.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Frame(_) | SessionError::Handshake(_) | SessionError::Terminated
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
