//! Generic wire value tree.
//!
//! A [`Value`] mirrors the bytes it was decoded from: null strings stay
//! distinguishable from empty ones, dates stay Julian day numbers and the
//! informational null flag of each [`Variant`] is kept as received. This is
//! what makes `encode(decode(bytes)) == bytes` hold.

use std::collections::HashMap;
use std::fmt;

use crate::tag::TypeTag;

/// One decoded wire value. The codec that produced it is known from context
/// (a variant tag, a user type layout, or a container element codec).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Payload of an invalid (`Void`) variant; occupies no bytes.
    Void,
    Bool(bool),
    /// `Int` and `Long` payloads.
    Int(i32),
    /// `UInt` and `ULong` payloads.
    UInt(u32),
    LongLong(i64),
    ULongLong(u64),
    Double(f64),
    Float(f32),
    Short(i16),
    UShort(u16),
    Char(i8),
    UChar(u8),
    /// One UTF-16 code unit.
    QChar(u16),
    /// UTF-16BE text; `None` is the null string (length `0xFFFFFFFF`).
    String(Option<String>),
    /// Opaque bytes; `None` is the null byte array (length `0xFFFFFFFF`).
    ByteArray(Option<Vec<u8>>),
    /// Julian day number.
    Date(u32),
    /// Milliseconds since midnight.
    Time(u32),
    DateTime(QDateTime),
    List(Vec<Value>),
    Map(ValueMap),
    Variant(Box<Variant>),
    UserType(Box<UserType>),
}

impl Value {
    /// Short name of the value kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::LongLong(_) => "longlong",
            Value::ULongLong(_) => "ulonglong",
            Value::Double(_) => "double",
            Value::Float(_) => "float",
            Value::Short(_) => "short",
            Value::UShort(_) => "ushort",
            Value::Char(_) => "char",
            Value::UChar(_) => "uchar",
            Value::QChar(_) => "qchar",
            Value::String(_) => "string",
            Value::ByteArray(_) => "bytearray",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Variant(_) => "variant",
            Value::UserType(_) => "usertype",
        }
    }

    /// Whether the value is absent on the wire (void, null string, null bytes).
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Value::Void | Value::String(None) | Value::ByteArray(None)
        )
    }

    /// Text content; the null string reads as empty.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_deref().unwrap_or("")),
            _ => None,
        }
    }

    /// Byte content; the null byte array reads as empty.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::ByteArray(b) => Some(b.as_deref().unwrap_or(&[])),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_variant(&self) -> Option<&Variant> {
        match self {
            Value::Variant(v) => Some(v),
            _ => None,
        }
    }

    /// Any signed or unsigned 8-32 bit integer, widened.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v.into()),
            Value::UInt(v) => Some(v.into()),
            Value::LongLong(v) => Some(v),
            Value::Short(v) => Some(v.into()),
            Value::UShort(v) => Some(v.into()),
            Value::Char(v) => Some(v.into()),
            Value::UChar(v) => Some(v.into()),
            _ => None,
        }
    }

    pub fn string(text: impl Into<String>) -> Self {
        Value::String(Some(text.into()))
    }

    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Value::ByteArray(Some(data.into()))
    }
}

impl From<Variant> for Value {
    fn from(variant: Variant) -> Self {
        Value::Variant(Box::new(variant))
    }
}

impl From<UserType> for Value {
    fn from(user: UserType) -> Self {
        Value::UserType(Box::new(user))
    }
}

/// `QDateTime` as it travels: Julian day, milliseconds since midnight, UTC flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QDateTime {
    pub julian_day: u32,
    pub msecs: u32,
    pub utc: bool,
}

/// Self-describing value: wire tag, informational null flag, payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub tag: TypeTag,
    /// Informational only; the payload is always present on the wire.
    pub null: bool,
    pub value: Value,
}

impl Variant {
    /// Wrap a value under an explicit tag. The null flag follows the value.
    pub fn new(tag: TypeTag, value: Value) -> Self {
        let null = value.is_null();
        Self { tag, null, value }
    }

    pub fn void() -> Self {
        Self::new(TypeTag::Void, Value::Void)
    }

    pub fn bool(v: bool) -> Self {
        Self::new(TypeTag::Bool, Value::Bool(v))
    }

    pub fn int(v: i32) -> Self {
        Self::new(TypeTag::Int, Value::Int(v))
    }

    pub fn uint(v: u32) -> Self {
        Self::new(TypeTag::UInt, Value::UInt(v))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self::new(TypeTag::QString, Value::string(text))
    }

    pub fn byte_array(data: impl Into<Vec<u8>>) -> Self {
        Self::new(TypeTag::QByteArray, Value::bytes(data))
    }

    pub fn time(msecs: u32) -> Self {
        Self::new(TypeTag::QTime, Value::Time(msecs))
    }

    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = items.into_iter().map(Value::string).collect();
        Self::new(TypeTag::QStringList, Value::List(items))
    }

    pub fn list(items: impl IntoIterator<Item = Variant>) -> Self {
        let items = items.into_iter().map(Value::from).collect();
        Self::new(TypeTag::QVariantList, Value::List(items))
    }

    /// A `QVariantMap` from string keys.
    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Variant)>,
        K: Into<String>,
    {
        let mut map = ValueMap::new();
        for (key, value) in entries {
            map.insert(Value::string(key), Value::from(value));
        }
        Self::new(TypeTag::QVariantMap, Value::Map(map))
    }

    pub fn user(name: impl Into<String>, value: Value) -> Self {
        Self::new(
            TypeTag::UserType,
            Value::from(UserType {
                name: name.into(),
                value,
            }),
        )
    }

    /// Unwrap nested `QVariant` layers down to the first concrete payload.
    pub fn innermost(&self) -> &Variant {
        let mut current = self;
        while let (TypeTag::QVariant, Value::Variant(inner)) = (current.tag, &current.value) {
            current = inner;
        }
        current
    }
}

/// Named user type: registry-resolved name plus payload.
#[derive(Debug, Clone, PartialEq)]
pub struct UserType {
    pub name: String,
    pub value: Value,
}

/// Key-unique map preserving first-insertion position.
///
/// Inserting an existing key replaces its value in place, so duplicate keys
/// in decoded input resolve to the last value seen. String keys (the only
/// kind a `QVariantMap` carries) are indexed; other keys are scanned.
#[derive(Clone, Default)]
pub struct ValueMap {
    entries: Vec<(Value, Value)>,
    strings: HashMap<String, usize>,
    null_string: Option<usize>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            strings: HashMap::with_capacity(capacity),
            null_string: None,
        }
    }

    /// Insert, returning the replaced value if the key was present.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        if let Some(index) = self.position(&key) {
            return Some(std::mem::replace(&mut self.entries[index].1, value));
        }
        self.index_key(&key, self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.position(key).map(|index| &self.entries[index].1)
    }

    /// Lookup by string key (null keys match `""`).
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.str_position(key).map(|index| &self.entries[index].1)
    }

    pub fn remove_str(&mut self, key: &str) -> Option<Value> {
        let index = self.str_position(key)?;
        let (_, value) = self.entries.remove(index);
        self.reindex();
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &Value) -> Option<usize> {
        match key {
            Value::String(Some(text)) => self.strings.get(text.as_str()).copied(),
            Value::String(None) => self.null_string,
            _ => self.entries.iter().position(|(k, _)| k == key),
        }
    }

    fn str_position(&self, key: &str) -> Option<usize> {
        let exact = self.strings.get(key).copied();
        if !key.is_empty() {
            return exact;
        }
        match (exact, self.null_string) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn index_key(&mut self, key: &Value, index: usize) {
        index_string_key(&mut self.strings, &mut self.null_string, key, index);
    }

    fn reindex(&mut self) {
        self.strings.clear();
        self.null_string = None;
        for (index, (key, _)) in self.entries.iter().enumerate() {
            index_string_key(&mut self.strings, &mut self.null_string, key, index);
        }
    }
}

fn index_string_key(
    strings: &mut HashMap<String, usize>,
    null_string: &mut Option<usize>,
    key: &Value,
    index: usize,
) {
    match key {
        Value::String(Some(text)) => {
            strings.insert(text.clone(), index);
        }
        Value::String(None) => *null_string = Some(index),
        _ => {}
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Debug for ValueMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl FromIterator<(Value, Value)> for ValueMap {
    fn from_iter<T: IntoIterator<Item = (Value, Value)>>(iter: T) -> Self {
        let mut map = ValueMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}
