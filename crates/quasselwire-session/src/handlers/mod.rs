//! Steady-state command handlers, one table per request family.

pub mod init;
pub mod rpc;
pub mod sync;

use crate::dispatch::{Args, DispatchTable};
use crate::error::DispatchError;
use crate::event::Event;

/// The three dispatch tables of one session.
#[derive(Debug)]
pub struct Handlers {
    pub sync: DispatchTable<Event>,
    pub init: DispatchTable<Event>,
    pub rpc: DispatchTable<Event>,
}

impl Default for Handlers {
    fn default() -> Self {
        Self {
            sync: sync::table(),
            init: init::table(),
            rpc: rpc::table(),
        }
    }
}

/// Fallback shared by the tables: log the key, then report it unhandled.
fn unhandled(namespace: &'static str, args: &Args<'_>) -> DispatchError {
    tracing::warn!(namespace, key = %args.key, args = args.items.len(), "unhandled command");
    DispatchError::Unhandled {
        namespace,
        key: args.key.to_string(),
    }
}
