//! Core-side helpers for session tests.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use quasselwire_types::{
    decode_variant, encode_variant, BufferInfo, BufferType, TypeRegistry, Value, ValueMap, Variant,
};

use crate::config::{Credentials, FixedClock, SessionConfig};
use crate::session::Session;

/// Fri Oct 16 2026 09:05:00 UTC.
pub(crate) const NOW: Duration = Duration::from_secs(1_792_141_500);

pub(crate) fn new_session() -> Session {
    new_session_with(SessionConfig::default())
}

pub(crate) fn new_session_with(config: SessionConfig) -> Session {
    Session::new(config, Credentials::new("alice", "hunter22"))
        .with_clock(Arc::new(FixedClock(NOW)))
}

pub(crate) fn active_session() -> Session {
    active_session_with(SessionConfig::default())
}

/// A session driven through the handshake with buffers 3 (`#rust`) and
/// 5 (`#tokio`) on network 1.
pub(crate) fn active_session_with(config: SessionConfig) -> Session {
    let mut session = new_session_with(config);
    session.start().unwrap();
    for frame in handshake_frames() {
        session.handle_frame(&frame).unwrap();
    }
    session
}

/// Core replies that take a freshly started session to active.
pub(crate) fn handshake_frames() -> Vec<Bytes> {
    vec![
        handshake("ClientInitAck"),
        handshake("ClientLoginAck"),
        session_init(&[channel(3, "#rust"), channel(5, "#tokio")], &[1]),
    ]
}

pub(crate) fn frame(variant: &Variant) -> Bytes {
    encode_variant(&TypeRegistry::quassel(), variant).unwrap()
}

pub(crate) fn read(payload: &Bytes) -> Variant {
    decode_variant(&TypeRegistry::quassel(), payload).unwrap()
}

pub(crate) fn handshake(msg_type: &str) -> Bytes {
    frame(&Variant::map([("MsgType", Variant::string(msg_type))]))
}

pub(crate) fn session_init(buffers: &[BufferInfo], networks: &[i32]) -> Bytes {
    let buffers = buffers
        .iter()
        .map(|info| Variant::user("BufferInfo", info.to_value()));
    let networks = networks
        .iter()
        .map(|id| Variant::user("NetworkId", Value::Int(*id)));
    let state = Variant::map([
        ("BufferInfos", Variant::list(buffers)),
        ("NetworkIds", Variant::list(networks)),
    ]);
    frame(&Variant::map([
        ("MsgType", Variant::string("SessionInit")),
        ("SessionState", state),
    ]))
}

pub(crate) fn channel(id: i32, name: &str) -> BufferInfo {
    BufferInfo {
        id,
        network_id: 1,
        kind: BufferType::Channel,
        group_id: 0,
        name: name.as_bytes().to_vec(),
    }
}

/// `Message` struct value: a plain message from `bob` in `#rust`.
pub(crate) fn message_value(id: i32, content: &str) -> Value {
    let map: ValueMap = [
        ("id", Value::Int(id)),
        ("timestamp", Value::UInt(1_792_141_500)),
        ("type", Value::UInt(0x01)),
        ("flags", Value::UChar(0)),
        ("bufferInfo", channel(3, "#rust").to_value()),
        ("sender", Value::bytes("bob!bob@example.org")),
        ("content", Value::bytes(content)),
    ]
    .into_iter()
    .map(|(k, v)| (Value::string(k), v))
    .collect();
    Value::Map(map)
}

pub(crate) fn list<const N: usize>(items: [Variant; N]) -> Variant {
    Variant::list(items)
}

pub(crate) fn entry<'a>(map: &'a Variant, key: &str) -> &'a Variant {
    map.value
        .as_map()
        .and_then(|map| map.get_str(key))
        .and_then(Value::as_variant)
        .unwrap_or_else(|| panic!("no entry {key} in {map:?}"))
}

pub(crate) fn text(map: &Variant, key: &str) -> String {
    entry(map, key)
        .value
        .as_str()
        .unwrap_or_else(|| panic!("{key} is not a string"))
        .to_string()
}

pub(crate) fn item(list: &Variant, index: usize) -> &Variant {
    list.value
        .as_list()
        .and_then(|items| items.get(index))
        .and_then(Value::as_variant)
        .unwrap_or_else(|| panic!("no item {index} in {list:?}"))
}
