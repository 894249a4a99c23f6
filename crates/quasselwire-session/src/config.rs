use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use quasselwire_frame::DEFAULT_MAX_PAYLOAD;
use quasselwire_types::DEFAULT_MAX_DEPTH;
pub use quasselwire_types::{Clock, FixedClock, SystemClock};

/// Default heartbeat period.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(120);
/// Messages requested per buffer when the session becomes active.
pub const DEFAULT_BACKLOG_LIMIT: i32 = 50;

/// Per-session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Heartbeat period once active; `None` or a zero period disables the
    /// heartbeat.
    pub heartbeat_interval: Option<Duration>,
    /// `ClientVersion` sent in the init message.
    pub client_version: String,
    /// Backlog size requested per buffer after session init.
    pub backlog_limit: i32,
    /// Maximum frame payload accepted from the core.
    pub max_frame_size: usize,
    /// Maximum variant/container nesting accepted from the core.
    pub max_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Some(DEFAULT_HEARTBEAT_INTERVAL),
            client_version: format!("quasselwire v{}", env!("CARGO_PKG_VERSION")),
            backlog_limit: DEFAULT_BACKLOG_LIMIT,
            max_frame_size: DEFAULT_MAX_PAYLOAD,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Core account. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field(
                "password",
                &format_args!("<redacted:{} bytes>", self.password.len()),
            )
            .finish()
    }
}

pub(crate) fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}
