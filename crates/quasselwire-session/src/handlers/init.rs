//! `InitData` handlers, keyed by class name. Argument 0 is the object name.

use quasselwire_types::SemanticValue;

use crate::dispatch::{Args, DispatchTable};
use crate::error::DispatchError;
use crate::event::{BufferMarker, Event};

type Result<T> = std::result::Result<T, DispatchError>;

pub fn table() -> DispatchTable<Event> {
    DispatchTable::new("init")
        .on("Network", network)
        .on("BufferViewConfig", buffer_view)
        .on("BufferSyncer", buffer_syncer)
        .on_unknown(|args| Err(super::unhandled("init", args)))
}

fn network(args: &Args<'_>) -> Result<Event> {
    Ok(Event::InitializeNetwork(
        args.numeric_name(0)?,
        args.get(1)?.clone(),
    ))
}

fn buffer_view(args: &Args<'_>) -> Result<Event> {
    Ok(Event::InitializeBufferView(
        args.numeric_name(0)?,
        args.get(1)?.clone(),
    ))
}

fn buffer_syncer(args: &Args<'_>) -> Result<Event> {
    let info = args.get(1)?;
    let state = info
        .as_map()
        .ok_or_else(|| args.bad(format!("state is a {}, not a map", info.kind())))?;
    let pairs = |key: &str| -> Result<Vec<BufferMarker>> {
        match state.get(key) {
            Some(SemanticValue::List(items)) => pair_up(args, items),
            Some(other) => Err(args.bad(format!("{key} is a {}, not a list", other.kind()))),
            None => Ok(Vec::new()),
        }
    };
    Ok(Event::InitializeBufferSyncer {
        marker_lines: pairs("MarkerLines")?,
        last_seen_messages: pairs("LastSeenMsg")?,
    })
}

/// `[b1, m1, b2, m2, ...]` into `(b, m)` pairs; a trailing odd element
/// pairs with `None`.
fn pair_up(args: &Args<'_>, items: &[SemanticValue]) -> Result<Vec<BufferMarker>> {
    let int = |value: &SemanticValue| {
        value
            .as_i64()
            .ok_or_else(|| args.bad(format!("expected an id, got a {}", value.kind())))
    };
    items
        .chunks(2)
        .map(|chunk| {
            let buffer = int(&chunk[0])?;
            let message = chunk.get(1).map(&int).transpose()?;
            Ok((buffer, message))
        })
        .collect()
}
