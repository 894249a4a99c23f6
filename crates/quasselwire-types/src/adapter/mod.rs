//! Projection of generic value trees onto semantic values and domain records.
//!
//! [`Adapter::project`] turns a decoded [`Variant`] into a [`SemanticValue`]
//! that serializes to plain JSON; [`Adapter::embed`] is the inverse for every
//! projection except the derived `DateTime` and `Message` forms, which refuse
//! to re-encode rather than lose information.

mod records;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

pub use records::{BufferInfo, BufferType, MessageFlags, MessageInfo, MessageType};

use crate::date::{
    self, date_to_julian_day, julian_day_to_date, CalendarDate, Clock, SystemClock, TimeOfDay,
};
use crate::error::{AdaptError, EncodeError};
use crate::registry::user_types;
use crate::tag::TypeTag;
use crate::value::{UserType, Value, ValueMap, Variant};

/// A decoded value in host-friendly form. Each variant knows the wire type
/// it came from, so [`Adapter::embed`] can pick the tag back.
#[derive(Debug, Clone, PartialEq)]
pub enum SemanticValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i32),
    UInt(u32),
    ULong(u32),
    LongLong(i64),
    ULongLong(u64),
    Double(f64),
    Float(f32),
    Short(i16),
    UShort(u16),
    Char(i8),
    UChar(u8),
    QChar(u16),
    String(Option<String>),
    ByteArray(Option<Vec<u8>>),
    StringList(Vec<String>),
    /// `None` for dates before year 1.
    Date(Option<CalendarDate>),
    /// `None` for the invalid time.
    Time(Option<TimeOfDay>),
    /// Milliseconds since the UNIX epoch. Decode-only.
    DateTime(i64),
    List(Vec<SemanticValue>),
    Map(BTreeMap<String, SemanticValue>),
    /// A scalar or map user type such as `BufferId` or `Identity`.
    User {
        type_name: String,
        value: Box<SemanticValue>,
    },
    BufferInfo(BufferInfo),
    /// Decode-only.
    Message(Box<MessageInfo>),
}

impl SemanticValue {
    pub fn kind(&self) -> &'static str {
        match self {
            SemanticValue::Null => "null",
            SemanticValue::Bool(_) => "bool",
            SemanticValue::Int(_) => "int",
            SemanticValue::Long(_) => "long",
            SemanticValue::UInt(_) => "uint",
            SemanticValue::ULong(_) => "ulong",
            SemanticValue::LongLong(_) => "longlong",
            SemanticValue::ULongLong(_) => "ulonglong",
            SemanticValue::Double(_) => "double",
            SemanticValue::Float(_) => "float",
            SemanticValue::Short(_) => "short",
            SemanticValue::UShort(_) => "ushort",
            SemanticValue::Char(_) => "char",
            SemanticValue::UChar(_) => "uchar",
            SemanticValue::QChar(_) => "qchar",
            SemanticValue::String(_) => "string",
            SemanticValue::ByteArray(_) => "bytearray",
            SemanticValue::StringList(_) => "stringlist",
            SemanticValue::Date(_) => "date",
            SemanticValue::Time(_) => "time",
            SemanticValue::DateTime(_) => "datetime",
            SemanticValue::List(_) => "list",
            SemanticValue::Map(_) => "map",
            SemanticValue::User { .. } => "usertype",
            SemanticValue::BufferInfo(_) => "BufferInfo",
            SemanticValue::Message(_) => "Message",
        }
    }

    /// Integer content, looking through scalar user types.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            SemanticValue::Int(v) | SemanticValue::Long(v) => Some(v.into()),
            SemanticValue::UInt(v) | SemanticValue::ULong(v) => Some(v.into()),
            SemanticValue::LongLong(v) => Some(v),
            SemanticValue::Short(v) => Some(v.into()),
            SemanticValue::UShort(v) => Some(v.into()),
            SemanticValue::Char(v) => Some(v.into()),
            SemanticValue::UChar(v) => Some(v.into()),
            SemanticValue::User { ref value, .. } => value.as_i64(),
            _ => None,
        }
    }

    /// Text content of strings and byte arrays.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SemanticValue::String(text) => Some(text.clone().unwrap_or_default()),
            SemanticValue::ByteArray(data) => {
                Some(String::from_utf8_lossy(data.as_deref().unwrap_or(&[])).into_owned())
            }
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SemanticValue]> {
        match self {
            SemanticValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, SemanticValue>> {
        match self {
            SemanticValue::Map(map) => Some(map),
            SemanticValue::User { value, .. } => value.as_map(),
            _ => None,
        }
    }

    pub fn string(text: impl Into<String>) -> Self {
        SemanticValue::String(Some(text.into()))
    }
}

impl Serialize for SemanticValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SemanticValue::Null => serializer.serialize_unit(),
            SemanticValue::Bool(v) => serializer.serialize_bool(*v),
            SemanticValue::Int(v) | SemanticValue::Long(v) => serializer.serialize_i32(*v),
            SemanticValue::UInt(v) | SemanticValue::ULong(v) => serializer.serialize_u32(*v),
            SemanticValue::LongLong(v) | SemanticValue::DateTime(v) => {
                serializer.serialize_i64(*v)
            }
            SemanticValue::ULongLong(v) => serializer.serialize_u64(*v),
            SemanticValue::Double(v) => serializer.serialize_f64(*v),
            SemanticValue::Float(v) => serializer.serialize_f32(*v),
            SemanticValue::Short(v) => serializer.serialize_i16(*v),
            SemanticValue::UShort(v) => serializer.serialize_u16(*v),
            SemanticValue::Char(v) => serializer.serialize_i8(*v),
            SemanticValue::UChar(v) => serializer.serialize_u8(*v),
            SemanticValue::QChar(unit) => match char::from_u32(u32::from(*unit)) {
                Some(c) => serializer.serialize_char(c),
                None => serializer.serialize_u16(*unit),
            },
            SemanticValue::String(None) | SemanticValue::ByteArray(None) => {
                serializer.serialize_none()
            }
            SemanticValue::String(Some(text)) => serializer.serialize_str(text),
            SemanticValue::ByteArray(Some(data)) => {
                serializer.serialize_str(&String::from_utf8_lossy(data))
            }
            SemanticValue::StringList(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            SemanticValue::Date(date) => match date {
                Some(date) => serializer.collect_str(date),
                None => serializer.serialize_none(),
            },
            SemanticValue::Time(time) => match time {
                Some(time) => serializer.collect_str(time),
                None => serializer.serialize_none(),
            },
            SemanticValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            SemanticValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            SemanticValue::User { value, .. } => value.serialize(serializer),
            SemanticValue::BufferInfo(info) => info.serialize(serializer),
            SemanticValue::Message(message) => message.serialize(serializer),
        }
    }
}

type ProjectFn = fn(&Adapter, &str, &Value) -> Result<SemanticValue, AdaptError>;
type EmbedFn = fn(&Adapter, &SemanticValue) -> Result<Value, EncodeError>;

#[derive(Clone, Copy)]
struct Projector {
    project: ProjectFn,
    embed: EmbedFn,
}

/// User-type-name keyed projector table plus the clock used for the
/// `DateTime` null-date substitution.
#[derive(Clone)]
pub struct Adapter {
    projectors: HashMap<String, Projector>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.projectors.keys().collect();
        names.sort_unstable();
        f.debug_struct("Adapter").field("projectors", &names).finish()
    }
}

impl Default for Adapter {
    fn default() -> Self {
        Self::quassel()
    }
}

impl Adapter {
    /// Projectors for every Quassel user type.
    pub fn quassel() -> Self {
        let scalar = Projector {
            project: project_wrapped,
            embed: embed_wrapped,
        };
        let mut projectors = HashMap::new();
        for name in [
            user_types::NETWORK_ID,
            user_types::IDENTITY,
            user_types::IDENTITY_ID,
            user_types::BUFFER_ID,
            user_types::MSG_ID,
            user_types::NETWORK_SERVER,
        ] {
            projectors.insert(name.to_string(), scalar);
        }
        projectors.insert(
            user_types::BUFFER_INFO.to_string(),
            Projector {
                project: project_buffer_info,
                embed: embed_buffer_info,
            },
        );
        projectors.insert(
            user_types::MESSAGE.to_string(),
            Projector {
                project: project_message,
                embed: embed_message,
            },
        );
        Self {
            projectors,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn project(&self, variant: &Variant) -> Result<SemanticValue, AdaptError> {
        let variant = variant.innermost();
        self.project_value(Some(variant.tag), &variant.value)
    }

    /// Project a value whose tag, if any, is known from context.
    pub fn project_value(
        &self,
        tag: Option<TypeTag>,
        value: &Value,
    ) -> Result<SemanticValue, AdaptError> {
        let projected = match value {
            Value::Void => SemanticValue::Null,
            Value::Bool(v) => SemanticValue::Bool(*v),
            Value::Int(v) if tag == Some(TypeTag::Long) => SemanticValue::Long(*v),
            Value::Int(v) => SemanticValue::Int(*v),
            Value::UInt(v) if tag == Some(TypeTag::ULong) => SemanticValue::ULong(*v),
            Value::UInt(v) => SemanticValue::UInt(*v),
            Value::LongLong(v) => SemanticValue::LongLong(*v),
            Value::ULongLong(v) => SemanticValue::ULongLong(*v),
            Value::Double(v) => SemanticValue::Double(*v),
            Value::Float(v) => SemanticValue::Float(*v),
            Value::Short(v) => SemanticValue::Short(*v),
            Value::UShort(v) => SemanticValue::UShort(*v),
            Value::Char(v) => SemanticValue::Char(*v),
            Value::UChar(v) => SemanticValue::UChar(*v),
            Value::QChar(v) => SemanticValue::QChar(*v),
            Value::String(text) => SemanticValue::String(text.clone()),
            Value::ByteArray(data) => SemanticValue::ByteArray(data.clone()),
            Value::Date(jd) => SemanticValue::Date(julian_day_to_date(*jd)),
            Value::Time(ms) => SemanticValue::Time(TimeOfDay::from_msecs(*ms)),
            Value::DateTime(dt) => {
                // A null date is replaced by today's date; the time is kept.
                let julian_day = match julian_day_to_date(dt.julian_day) {
                    Some(_) => dt.julian_day,
                    None => date::julian_day_and_msecs(self.clock.now()).0,
                };
                SemanticValue::DateTime(date::epoch_millis(julian_day, dt.msecs))
            }
            Value::List(items) if tag == Some(TypeTag::QStringList) => {
                let strings = items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_owned).ok_or(AdaptError::UnexpectedShape {
                            expected: "string",
                            found: item.kind(),
                        })
                    })
                    .collect::<Result<_, _>>()?;
                SemanticValue::StringList(strings)
            }
            Value::List(items) => SemanticValue::List(
                items
                    .iter()
                    .map(|item| self.project_value(None, item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(map) => SemanticValue::Map(self.project_map(map)?),
            Value::Variant(inner) => self.project(inner)?,
            Value::UserType(user) => self.project_user(user)?,
        };
        Ok(projected)
    }

    fn project_map(&self, map: &ValueMap) -> Result<BTreeMap<String, SemanticValue>, AdaptError> {
        let mut out = BTreeMap::new();
        for (key, value) in map.iter() {
            let key = key.as_str().ok_or(AdaptError::UnexpectedShape {
                expected: "string key",
                found: key.kind(),
            })?;
            out.insert(key.to_string(), self.project_value(None, value)?);
        }
        Ok(out)
    }

    fn project_user(&self, user: &UserType) -> Result<SemanticValue, AdaptError> {
        let projector = self
            .projectors
            .get(&user.name)
            .ok_or_else(|| AdaptError::UnknownUserType(user.name.clone()))?;
        (projector.project)(self, &user.name, &user.value)
    }

    /// Re-create a wire variant. Fails for the decode-only projections.
    pub fn embed(&self, value: &SemanticValue) -> Result<Variant, EncodeError> {
        let variant = match value {
            SemanticValue::Null => Variant::void(),
            SemanticValue::Bool(v) => Variant::bool(*v),
            SemanticValue::Int(v) => Variant::int(*v),
            SemanticValue::Long(v) => Variant::new(TypeTag::Long, Value::Int(*v)),
            SemanticValue::UInt(v) => Variant::uint(*v),
            SemanticValue::ULong(v) => Variant::new(TypeTag::ULong, Value::UInt(*v)),
            SemanticValue::LongLong(v) => Variant::new(TypeTag::LongLong, Value::LongLong(*v)),
            SemanticValue::ULongLong(v) => {
                Variant::new(TypeTag::ULongLong, Value::ULongLong(*v))
            }
            SemanticValue::Double(v) => Variant::new(TypeTag::Double, Value::Double(*v)),
            SemanticValue::Float(v) => Variant::new(TypeTag::Float, Value::Float(*v)),
            SemanticValue::Short(v) => Variant::new(TypeTag::Short, Value::Short(*v)),
            SemanticValue::UShort(v) => Variant::new(TypeTag::UShort, Value::UShort(*v)),
            SemanticValue::Char(v) => Variant::new(TypeTag::Char, Value::Char(*v)),
            SemanticValue::UChar(v) => Variant::new(TypeTag::UChar, Value::UChar(*v)),
            SemanticValue::QChar(v) => Variant::new(TypeTag::QChar, Value::QChar(*v)),
            SemanticValue::String(text) => {
                Variant::new(TypeTag::QString, Value::String(text.clone()))
            }
            SemanticValue::ByteArray(data) => {
                Variant::new(TypeTag::QByteArray, Value::ByteArray(data.clone()))
            }
            SemanticValue::StringList(items) => Variant::string_list(items.iter().cloned()),
            SemanticValue::Date(date) => Variant {
                tag: TypeTag::QDate,
                null: date.is_none(),
                value: Value::Date(date.and_then(date_to_julian_day).unwrap_or(0)),
            },
            SemanticValue::Time(time) => Variant {
                tag: TypeTag::QTime,
                null: time.is_none(),
                value: Value::Time(time.map_or(u32::MAX, TimeOfDay::to_msecs)),
            },
            SemanticValue::DateTime(_) => return Err(EncodeError::OneDirectional("DateTime")),
            SemanticValue::List(items) => Variant::list(
                items
                    .iter()
                    .map(|item| self.embed(item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            SemanticValue::Map(entries) => Variant::map(
                entries
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), self.embed(value)?)))
                    .collect::<Result<Vec<_>, EncodeError>>()?,
            ),
            SemanticValue::User { type_name, .. } => self.embed_user(type_name, value)?,
            SemanticValue::BufferInfo(_) => self.embed_user(user_types::BUFFER_INFO, value)?,
            SemanticValue::Message(_) => self.embed_user(user_types::MESSAGE, value)?,
        };
        Ok(variant)
    }

    fn embed_user(&self, name: &str, value: &SemanticValue) -> Result<Variant, EncodeError> {
        let projector = self
            .projectors
            .get(name)
            .ok_or_else(|| EncodeError::UnknownUserType(name.to_string()))?;
        let payload = (projector.embed)(self, value)?;
        Ok(Variant::user(name, payload))
    }
}

fn project_wrapped(
    adapter: &Adapter,
    name: &str,
    value: &Value,
) -> Result<SemanticValue, AdaptError> {
    Ok(SemanticValue::User {
        type_name: name.to_string(),
        value: Box::new(adapter.project_value(None, value)?),
    })
}

fn embed_wrapped(adapter: &Adapter, value: &SemanticValue) -> Result<Value, EncodeError> {
    match value {
        SemanticValue::User { value, .. } => Ok(adapter.embed(value)?.value),
        other => Err(EncodeError::TypeMismatch {
            codec: "usertype",
            found: other.kind(),
        }),
    }
}

fn project_buffer_info(
    _: &Adapter,
    _: &str,
    value: &Value,
) -> Result<SemanticValue, AdaptError> {
    BufferInfo::from_value(value).map(SemanticValue::BufferInfo)
}

fn embed_buffer_info(_: &Adapter, value: &SemanticValue) -> Result<Value, EncodeError> {
    match value {
        SemanticValue::BufferInfo(info) => Ok(info.to_value()),
        other => Err(EncodeError::TypeMismatch {
            codec: "BufferInfo",
            found: other.kind(),
        }),
    }
}

fn project_message(_: &Adapter, _: &str, value: &Value) -> Result<SemanticValue, AdaptError> {
    MessageInfo::from_value(value).map(|message| SemanticValue::Message(Box::new(message)))
}

fn embed_message(_: &Adapter, _: &SemanticValue) -> Result<Value, EncodeError> {
    Err(EncodeError::OneDirectional("Message"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::date::FixedClock;
    use crate::decode::decode_variant;
    use crate::encode::encode_variant;
    use crate::registry::TypeRegistry;
    use crate::value::QDateTime;

    // 2026-10-16 09:05:00 UTC
    const NOW: Duration = Duration::from_secs(1_792_141_500);

    fn adapter() -> Adapter {
        Adapter::quassel().with_clock(Arc::new(FixedClock(NOW)))
    }

    #[test]
    fn projects_variant_map_to_json() {
        let variant = Variant::map([
            ("MsgType", Variant::string("ClientInitAck")),
            ("Configured", Variant::bool(true)),
            ("Ids", Variant::list([Variant::user("BufferId", Value::Int(3))])),
        ]);
        let projected = adapter().project(&variant).unwrap();
        let json = serde_json::to_value(&projected).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"MsgType": "ClientInitAck", "Configured": true, "Ids": [3]})
        );
    }

    #[test]
    fn projected_values_embed_back_to_identical_bytes() {
        let registry = TypeRegistry::quassel();
        let variant = Variant::map([
            ("name", Variant::byte_array(*b"#rust")),
            ("nicks", Variant::string_list(["a", "b"])),
            ("net", Variant::user("NetworkId", Value::Int(2))),
            ("when", Variant::new(TypeTag::QDate, Value::Date(2_461_330))),
            ("at", Variant::time(45_296_789)),
            ("long", Variant::new(TypeTag::Long, Value::Int(-1))),
        ]);
        let adapter = adapter();
        let embedded = adapter.embed(&adapter.project(&variant).unwrap()).unwrap();

        let original = decode_variant(&registry, &encode_variant(&registry, &variant).unwrap())
            .unwrap()
            .value;
        let again = embedded.value;
        // Map order follows key order after projection, so compare by key.
        let (Value::Map(original), Value::Map(again)) = (original, again) else {
            panic!("expected maps");
        };
        for (key, value) in original.iter() {
            assert_eq!(again.get(key), Some(value), "{key:?}");
        }
    }

    #[test]
    fn buffer_info_projects_to_record() {
        let info = BufferInfo {
            id: 4,
            network_id: 1,
            kind: BufferType::Query,
            group_id: 0,
            name: b"alice".to_vec(),
        };
        let variant = Variant::user("BufferInfo", info.to_value());
        let projected = adapter().project(&variant).unwrap();
        assert_eq!(projected, SemanticValue::BufferInfo(info.clone()));
        assert_eq!(adapter().embed(&projected).unwrap(), variant);
    }

    #[test]
    fn datetime_is_one_directional() {
        let variant = Variant::new(
            TypeTag::QDateTime,
            Value::DateTime(QDateTime {
                julian_day: date::UNIX_EPOCH_JULIAN_DAY + 1,
                msecs: 1000,
                utc: true,
            }),
        );
        let projected = adapter().project(&variant).unwrap();
        assert_eq!(projected, SemanticValue::DateTime(86_401_000));
        assert_eq!(
            adapter().embed(&projected),
            Err(EncodeError::OneDirectional("DateTime"))
        );
    }

    #[test]
    fn datetime_with_null_date_uses_today() {
        let variant = Variant::new(
            TypeTag::QDateTime,
            Value::DateTime(QDateTime {
                julian_day: 0,
                msecs: 60_000,
                utc: false,
            }),
        );
        let today = date::julian_day_and_msecs(NOW).0;
        assert_eq!(
            adapter().project(&variant).unwrap(),
            SemanticValue::DateTime(date::epoch_millis(today, 60_000))
        );
    }

    #[test]
    fn message_refuses_to_embed() {
        let message = SemanticValue::Message(Box::new(MessageInfo {
            id: 1,
            timestamp: 0,
            kind: MessageType::Plain,
            flags: MessageFlags::default(),
            buffer_info: BufferInfo {
                id: 1,
                network_id: 1,
                kind: BufferType::Status,
                group_id: 0,
                name: Vec::new(),
            },
            sender: Vec::new(),
            content: Vec::new(),
        }));
        assert_eq!(
            adapter().embed(&message),
            Err(EncodeError::OneDirectional("Message"))
        );
    }

    #[test]
    fn unknown_user_type_has_no_projector() {
        let variant = Variant::user("Mystery", Value::Int(1));
        assert_eq!(
            adapter().project(&variant),
            Err(AdaptError::UnknownUserType("Mystery".into()))
        );
    }

    #[test]
    fn null_date_serializes_as_null() {
        let variant = Variant::new(TypeTag::QDate, Value::Date(0));
        let projected = adapter().project(&variant).unwrap();
        assert_eq!(projected, SemanticValue::Date(None));
        assert_eq!(serde_json::to_string(&projected).unwrap(), "null");

        let variant = Variant::new(TypeTag::QDate, Value::Date(2_461_330));
        let json = serde_json::to_string(&adapter().project(&variant).unwrap()).unwrap();
        assert_eq!(json, "\"2026-10-16\"");
    }
}
