//! `RpcCall` handlers, keyed by the function signature with parentheses
//! removed (`2displayMsg(Message)` becomes `2displayMsgMessage`).

use quasselwire_types::SemanticValue;

use crate::dispatch::{Args, DispatchTable};
use crate::error::DispatchError;
use crate::event::Event;

type Result<T> = std::result::Result<T, DispatchError>;

pub fn table() -> DispatchTable<Event> {
    DispatchTable::new("rpc")
        .on("2displayMsgMessage", display_message)
        .on("__objectRenamed__", object_renamed)
        .on_unknown(|args| Err(super::unhandled("rpc", args)))
}

/// Dispatch key for a wire function signature.
pub fn mangle(signature: &str) -> String {
    signature.chars().filter(|c| !matches!(c, '(' | ')')).collect()
}

fn display_message(args: &Args<'_>) -> Result<Event> {
    match args.get(0)? {
        SemanticValue::Message(message) => Ok(Event::Message(message.clone())),
        other => Err(args.bad(format!("expected a message, got a {}", other.kind()))),
    }
}

// (objectType, newName, oldName)
fn object_renamed(args: &Args<'_>) -> Result<Event> {
    Ok(Event::ObjectRenamed {
        object_type: args.text(0)?,
        new: args.object_id(1)?,
        old: args.object_id(2)?,
    })
}
