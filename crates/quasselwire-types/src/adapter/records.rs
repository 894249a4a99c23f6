//! Fixed-layout domain records: `BufferInfo` and `Message`.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::AdaptError;
use crate::value::{Value, ValueMap};

/// Internal guard key some cores leave in flag maps.
const RECURSION_LOCK: &str = "__recursion_lock__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferType {
    Invalid,
    Status,
    Channel,
    Query,
    Group,
}

impl BufferType {
    pub fn from_wire(value: i64) -> Result<Self, AdaptError> {
        match value {
            0x00 => Ok(BufferType::Invalid),
            0x01 => Ok(BufferType::Status),
            0x02 => Ok(BufferType::Channel),
            0x04 => Ok(BufferType::Query),
            0x08 => Ok(BufferType::Group),
            value => Err(AdaptError::InvalidEnum {
                type_name: "BufferType",
                value,
            }),
        }
    }

    pub fn to_wire(self) -> i16 {
        match self {
            BufferType::Invalid => 0x00,
            BufferType::Status => 0x01,
            BufferType::Channel => 0x02,
            BufferType::Query => 0x04,
            BufferType::Group => 0x08,
        }
    }
}

/// Buffer descriptor: one channel, query or status window on a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferInfo {
    pub id: i32,
    pub network_id: i32,
    #[serde(rename = "type")]
    pub kind: BufferType,
    pub group_id: u32,
    #[serde(serialize_with = "lossy_utf8")]
    pub name: Vec<u8>,
}

impl BufferInfo {
    const TYPE_NAME: &'static str = "BufferInfo";

    pub fn from_value(value: &Value) -> Result<Self, AdaptError> {
        let map = as_record(value)?;
        let field = |name| require(map, Self::TYPE_NAME, name);
        Ok(Self {
            id: int(field("id")?)? as i32,
            network_id: int(field("networkId")?)? as i32,
            kind: BufferType::from_wire(int(field("type")?)?)?,
            group_id: int(field("groupId")?)? as u32,
            name: bytes(field("name")?)?,
        })
    }

    /// Struct form accepted by the `BufferInfo` user type codec.
    pub fn to_value(&self) -> Value {
        let map: ValueMap = [
            ("id", Value::Int(self.id)),
            ("networkId", Value::Int(self.network_id)),
            ("type", Value::Short(self.kind.to_wire())),
            ("groupId", Value::UInt(self.group_id)),
            ("name", Value::bytes(self.name.clone())),
        ]
        .into_iter()
        .map(|(k, v)| (Value::string(k), v))
        .collect();
        Value::Map(map)
    }

    pub fn display_name(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Plain,
    Notice,
    Action,
    Nick,
    Mode,
    Join,
    Part,
    Quit,
    Kick,
    Kill,
    Server,
    Info,
    Error,
    DayChange,
    Topic,
    NetsplitJoin,
    NetsplitQuit,
    Invite,
}

impl MessageType {
    const ALL: [MessageType; 18] = [
        MessageType::Plain,
        MessageType::Notice,
        MessageType::Action,
        MessageType::Nick,
        MessageType::Mode,
        MessageType::Join,
        MessageType::Part,
        MessageType::Quit,
        MessageType::Kick,
        MessageType::Kill,
        MessageType::Server,
        MessageType::Info,
        MessageType::Error,
        MessageType::DayChange,
        MessageType::Topic,
        MessageType::NetsplitJoin,
        MessageType::NetsplitQuit,
        MessageType::Invite,
    ];

    /// Single-bit wire value.
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub fn from_wire(value: i64) -> Result<Self, AdaptError> {
        Self::ALL
            .into_iter()
            .find(|kind| i64::from(kind.bit()) == value)
            .ok_or(AdaptError::InvalidEnum {
                type_name: "MessageType",
                value,
            })
    }
}

/// Message flag bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MessageFlags(pub u8);

impl MessageFlags {
    pub const SELF: u8 = 0x01;
    pub const HIGHLIGHT: u8 = 0x02;
    pub const REDIRECTED: u8 = 0x04;
    pub const SERVER_MESSAGE: u8 = 0x08;
    pub const BACKLOG: u8 = 0x80;

    const NAMES: [(&'static str, u8); 5] = [
        ("self", Self::SELF),
        ("highlight", Self::HIGHLIGHT),
        ("redirected", Self::REDIRECTED),
        ("servermessage", Self::SERVER_MESSAGE),
        ("backlog", Self::BACKLOG),
    ];

    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit == bit
    }

    /// From the raw byte, or from a name-to-bool map with the recursion
    /// guard key dropped.
    pub fn from_value(value: &Value) -> Result<Self, AdaptError> {
        if let Some(bits) = value.as_i64() {
            return Ok(MessageFlags(bits as u8));
        }
        let Value::Map(map) = value else {
            return Err(AdaptError::UnexpectedShape {
                expected: "flags",
                found: value.kind(),
            });
        };
        let mut map = map.clone();
        map.remove_str(RECURSION_LOCK);
        let mut bits = 0;
        for (name, bit) in Self::NAMES {
            let set = match map.get_str(name) {
                Some(Value::Bool(set)) => *set,
                Some(Value::Variant(v)) => matches!(v.value, Value::Bool(true)),
                _ => false,
            };
            if set {
                bits |= bit;
            }
        }
        Ok(MessageFlags(bits))
    }
}

impl Serialize for MessageFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Self::NAMES.len()))?;
        for (name, bit) in Self::NAMES {
            map.serialize_entry(name, &self.contains(bit))?;
        }
        map.end()
    }
}

/// One chat line. Decode-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfo {
    pub id: i32,
    /// Seconds since the UNIX epoch.
    pub timestamp: u32,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub flags: MessageFlags,
    pub buffer_info: BufferInfo,
    #[serde(serialize_with = "lossy_utf8")]
    pub sender: Vec<u8>,
    #[serde(serialize_with = "lossy_utf8")]
    pub content: Vec<u8>,
}

impl MessageInfo {
    const TYPE_NAME: &'static str = "Message";

    pub fn from_value(value: &Value) -> Result<Self, AdaptError> {
        let map = as_record(value)?;
        let field = |name| require(map, Self::TYPE_NAME, name);
        Ok(Self {
            id: int(field("id")?)? as i32,
            timestamp: int(field("timestamp")?)? as u32,
            kind: MessageType::from_wire(int(field("type")?)?)?,
            flags: MessageFlags::from_value(field("flags")?)?,
            buffer_info: BufferInfo::from_value(field("bufferInfo")?)?,
            sender: bytes(field("sender")?)?,
            content: bytes(field("content")?)?,
        })
    }
}

fn as_record(value: &Value) -> Result<&ValueMap, AdaptError> {
    match value {
        Value::Map(map) => Ok(map),
        Value::UserType(user) => as_record(&user.value),
        Value::Variant(variant) => as_record(&variant.value),
        other => Err(AdaptError::UnexpectedShape {
            expected: "map",
            found: other.kind(),
        }),
    }
}

fn require<'v>(
    map: &'v ValueMap,
    type_name: &'static str,
    field: &'static str,
) -> Result<&'v Value, AdaptError> {
    map.get_str(field)
        .ok_or(AdaptError::MissingField { type_name, field })
}

fn int(value: &Value) -> Result<i64, AdaptError> {
    match value {
        Value::UserType(user) => int(&user.value),
        Value::Variant(variant) => int(&variant.value),
        other => other.as_i64().ok_or(AdaptError::UnexpectedShape {
            expected: "integer",
            found: other.kind(),
        }),
    }
}

fn bytes(value: &Value) -> Result<Vec<u8>, AdaptError> {
    match value {
        Value::ByteArray(data) => Ok(data.clone().unwrap_or_default()),
        Value::String(text) => Ok(text.clone().unwrap_or_default().into_bytes()),
        other => Err(AdaptError::UnexpectedShape {
            expected: "bytearray",
            found: other.kind(),
        }),
    }
}

pub(crate) fn lossy_utf8<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: i32, name: &str) -> BufferInfo {
        BufferInfo {
            id,
            network_id: 1,
            kind: BufferType::Channel,
            group_id: 0,
            name: name.as_bytes().to_vec(),
        }
    }

    fn message_map(flags: Value) -> Value {
        let map: ValueMap = [
            ("id", Value::Int(100)),
            ("timestamp", Value::UInt(1_792_141_500)),
            ("type", Value::UInt(0x4)),
            ("flags", flags),
            ("bufferInfo", channel(7, "#rust").to_value()),
            ("sender", Value::bytes(*b"nick!user@host")),
            ("content", Value::bytes(*b"waves")),
        ]
        .into_iter()
        .map(|(k, v)| (Value::string(k), v))
        .collect();
        Value::Map(map)
    }

    #[test]
    fn buffer_info_roundtrips_through_struct_map() {
        let info = channel(7, "#rust");
        assert_eq!(BufferInfo::from_value(&info.to_value()).unwrap(), info);
    }

    #[test]
    fn buffer_info_requires_every_field() {
        let mut map = ValueMap::new();
        map.insert(Value::string("id"), Value::Int(1));
        let err = BufferInfo::from_value(&Value::Map(map)).unwrap_err();
        assert_eq!(
            err,
            AdaptError::MissingField {
                type_name: "BufferInfo",
                field: "networkId"
            }
        );
    }

    #[test]
    fn unknown_buffer_type_is_rejected() {
        assert_eq!(
            BufferType::from_wire(3),
            Err(AdaptError::InvalidEnum {
                type_name: "BufferType",
                value: 3
            })
        );
    }

    #[test]
    fn message_projects_nested_buffer_info() {
        let message = MessageInfo::from_value(&message_map(Value::UChar(0x81))).unwrap();
        assert_eq!(message.kind, MessageType::Action);
        assert_eq!(message.buffer_info, channel(7, "#rust"));
        assert!(message.flags.contains(MessageFlags::SELF));
        assert!(message.flags.contains(MessageFlags::BACKLOG));
        assert!(!message.flags.contains(MessageFlags::HIGHLIGHT));
    }

    #[test]
    fn flag_map_drops_recursion_lock() {
        let mut flags = ValueMap::new();
        flags.insert(Value::string("highlight"), Value::Bool(true));
        flags.insert(Value::string(RECURSION_LOCK), Value::Bool(true));
        let message = MessageInfo::from_value(&message_map(Value::Map(flags))).unwrap();
        assert_eq!(message.flags, MessageFlags(MessageFlags::HIGHLIGHT));
    }

    #[test]
    fn message_type_bits() {
        assert_eq!(MessageType::Plain.bit(), 0x1);
        assert_eq!(MessageType::Invite.bit(), 0x20000);
        assert_eq!(MessageType::from_wire(0x8000), Ok(MessageType::NetsplitJoin));
        assert!(MessageType::from_wire(0x3).is_err());
    }

    #[test]
    fn message_serializes_to_plain_json() {
        let message = MessageInfo::from_value(&message_map(Value::UChar(0x02))).unwrap();
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "action");
        assert_eq!(json["sender"], "nick!user@host");
        assert_eq!(json["bufferInfo"]["type"], "channel");
        assert_eq!(json["bufferInfo"]["networkId"], 1);
        assert_eq!(json["flags"]["highlight"], true);
        assert_eq!(json["flags"]["self"], false);
    }
}
