//! Tag and user-type codec tables.
//!
//! A [`TypeRegistry`] is built once (usually [`TypeRegistry::quassel`]),
//! wrapped in an `Arc` and shared read-only by every session. Nothing is ever
//! registered implicitly; a lookup miss is a decode error, never a default.

use std::collections::HashMap;

use crate::tag::TypeTag;

/// Names of the user types the Quassel core sends.
pub mod user_types {
    pub const NETWORK_ID: &str = "NetworkId";
    pub const IDENTITY: &str = "Identity";
    pub const IDENTITY_ID: &str = "IdentityId";
    pub const BUFFER_INFO: &str = "BufferInfo";
    pub const BUFFER_ID: &str = "BufferId";
    pub const MESSAGE: &str = "Message";
    pub const MSG_ID: &str = "MsgId";
    pub const NETWORK_SERVER: &str = "Network::Server";
}

/// Wire layout of one value. Containers carry their element codecs, so a
/// list or map always knows how to read its items.
#[derive(Debug, Clone, PartialEq)]
pub enum Codec {
    /// Zero-byte payload.
    Void,
    /// One byte, nonzero is true.
    Bool,
    Int,
    UInt,
    LongLong,
    ULongLong,
    Double,
    Float,
    Short,
    UShort,
    Char,
    UChar,
    QChar,
    /// Length-prefixed UTF-16BE.
    String,
    /// Length-prefixed raw bytes.
    ByteArray,
    Date,
    Time,
    DateTime,
    /// Self-describing: tag, null flag, payload.
    Variant,
    /// Name, then the payload of the registered user type.
    UserType,
    List(Box<Codec>),
    Map(Box<Codec>, Box<Codec>),
    /// Fixed fields in wire order, surfaced as a map keyed by field name.
    Struct(Vec<Field>),
}

impl Codec {
    pub fn list(element: Codec) -> Self {
        Codec::List(Box::new(element))
    }

    pub fn map(key: Codec, value: Codec) -> Self {
        Codec::Map(Box::new(key), Box::new(value))
    }

    /// Fewest bytes one value of this codec occupies on the wire.
    pub fn min_size(&self) -> usize {
        match self {
            Codec::Void => 0,
            Codec::Bool | Codec::Char | Codec::UChar => 1,
            Codec::Short | Codec::UShort | Codec::QChar => 2,
            Codec::Int | Codec::UInt | Codec::Float | Codec::Date | Codec::Time => 4,
            Codec::String | Codec::ByteArray | Codec::UserType => 4,
            Codec::List(_) | Codec::Map(..) => 4,
            Codec::Variant => 5,
            Codec::LongLong | Codec::ULongLong | Codec::Double => 8,
            Codec::DateTime => 9,
            Codec::Struct(fields) => fields.iter().map(|field| field.codec.min_size()).sum(),
        }
    }

    /// `QVariantMap`: string keys, variant values.
    pub fn variant_map() -> Self {
        Codec::map(Codec::String, Codec::Variant)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Codec::Void => "void",
            Codec::Bool => "bool",
            Codec::Int => "int",
            Codec::UInt => "uint",
            Codec::LongLong => "longlong",
            Codec::ULongLong => "ulonglong",
            Codec::Double => "double",
            Codec::Float => "float",
            Codec::Short => "short",
            Codec::UShort => "ushort",
            Codec::Char => "char",
            Codec::UChar => "uchar",
            Codec::QChar => "qchar",
            Codec::String => "string",
            Codec::ByteArray => "bytearray",
            Codec::Date => "date",
            Codec::Time => "time",
            Codec::DateTime => "datetime",
            Codec::Variant => "variant",
            Codec::UserType => "usertype",
            Codec::List(_) => "list",
            Codec::Map(_, _) => "map",
            Codec::Struct(_) => "struct",
        }
    }
}

/// One named field of a [`Codec::Struct`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub codec: Codec,
}

impl Field {
    pub fn new(name: &'static str, codec: Codec) -> Self {
        Self { name, codec }
    }
}

/// `BufferInfo` wire layout.
pub fn buffer_info_layout() -> Codec {
    Codec::Struct(vec![
        Field::new("id", Codec::Int),
        Field::new("networkId", Codec::Int),
        Field::new("type", Codec::Short),
        Field::new("groupId", Codec::UInt),
        Field::new("name", Codec::ByteArray),
    ])
}

/// `Message` wire layout.
pub fn message_layout() -> Codec {
    Codec::Struct(vec![
        Field::new("id", Codec::Int),
        Field::new("timestamp", Codec::UInt),
        Field::new("type", Codec::UInt),
        Field::new("flags", Codec::UChar),
        Field::new("bufferInfo", buffer_info_layout()),
        Field::new("sender", Codec::ByteArray),
        Field::new("content", Codec::ByteArray),
    ])
}

/// Tag and user-type name lookup tables.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    tags: HashMap<TypeTag, Codec>,
    user_types: HashMap<String, Codec>,
}

impl TypeRegistry {
    /// Empty builder.
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// Registry with every Qt tag codec and the Quassel user types.
    pub fn quassel() -> Self {
        Self::builder().with_qt_types().with_quassel_user_types().build()
    }

    pub fn codec_for_tag(&self, tag: TypeTag) -> Option<&Codec> {
        self.tags.get(&tag)
    }

    pub fn codec_for_user_type(&self, name: &str) -> Option<&Codec> {
        self.user_types.get(name)
    }

    /// Registered user type names, sorted.
    pub fn user_type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.user_types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::quassel()
    }
}

/// Collects codecs before the registry is frozen.
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    tags: HashMap<TypeTag, Codec>,
    user_types: HashMap<String, Codec>,
}

impl TypeRegistryBuilder {
    pub fn tag(mut self, tag: TypeTag, codec: Codec) -> Self {
        self.tags.insert(tag, codec);
        self
    }

    pub fn user_type(mut self, name: impl Into<String>, codec: Codec) -> Self {
        self.user_types.insert(name.into(), codec);
        self
    }

    /// Codecs for the Qt tags the protocol uses. `QBitArray` stays
    /// unregistered and therefore undecodable.
    pub fn with_qt_types(self) -> Self {
        self.tag(TypeTag::Void, Codec::Void)
            .tag(TypeTag::Bool, Codec::Bool)
            .tag(TypeTag::Int, Codec::Int)
            .tag(TypeTag::UInt, Codec::UInt)
            .tag(TypeTag::LongLong, Codec::LongLong)
            .tag(TypeTag::ULongLong, Codec::ULongLong)
            .tag(TypeTag::Double, Codec::Double)
            .tag(TypeTag::QChar, Codec::QChar)
            .tag(TypeTag::QVariantMap, Codec::variant_map())
            .tag(TypeTag::QVariantList, Codec::list(Codec::Variant))
            .tag(TypeTag::QString, Codec::String)
            .tag(TypeTag::QStringList, Codec::list(Codec::String))
            .tag(TypeTag::QByteArray, Codec::ByteArray)
            .tag(TypeTag::QDate, Codec::Date)
            .tag(TypeTag::QTime, Codec::Time)
            .tag(TypeTag::QDateTime, Codec::DateTime)
            .tag(TypeTag::UserType, Codec::UserType)
            .tag(TypeTag::Long, Codec::Int)
            .tag(TypeTag::Short, Codec::Short)
            .tag(TypeTag::Char, Codec::Char)
            .tag(TypeTag::ULong, Codec::UInt)
            .tag(TypeTag::UShort, Codec::UShort)
            .tag(TypeTag::UChar, Codec::UChar)
            .tag(TypeTag::Float, Codec::Float)
            .tag(TypeTag::QVariant, Codec::Variant)
    }

    pub fn with_quassel_user_types(self) -> Self {
        self.user_type(user_types::NETWORK_ID, Codec::Int)
            .user_type(user_types::IDENTITY, Codec::variant_map())
            .user_type(user_types::IDENTITY_ID, Codec::Int)
            .user_type(user_types::BUFFER_INFO, buffer_info_layout())
            .user_type(user_types::BUFFER_ID, Codec::Int)
            .user_type(user_types::MESSAGE, message_layout())
            .user_type(user_types::MSG_ID, Codec::Int)
            .user_type(user_types::NETWORK_SERVER, Codec::variant_map())
    }

    pub fn build(self) -> TypeRegistry {
        tracing::debug!(
            tags = self.tags.len(),
            user_types = self.user_types.len(),
            "type registry built"
        );
        TypeRegistry {
            tags: self.tags,
            user_types: self.user_types,
        }
    }
}
