use crate::tag::TypeTag;

/// Decoding failed at a byte offset within the current frame payload.
///
/// Aborts decoding of that payload only; the stream itself stays usable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("decode failed at byte {offset}: {kind}")]
pub struct DecodeError {
    /// Offset from the start of the payload where the failing read began.
    pub offset: usize,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub fn new(offset: usize, kind: DecodeErrorKind) -> Self {
        Self { offset, kind }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeErrorKind {
    /// Fewer bytes remain than the next read needs.
    #[error("truncated input (needed {needed} bytes, {available} available)")]
    Truncated { needed: usize, available: usize },

    /// The variant tag is not part of the protocol.
    #[error("unknown type tag {0}")]
    UnknownTag(u32),

    /// The tag is known but no codec is registered for it.
    #[error("no codec registered for {0}")]
    UnsupportedTag(TypeTag),

    /// The user type name is not registered.
    #[error("unknown user type '{0}'")]
    UnknownUserType(String),

    /// A user type name is null, lacks its single trailing NUL, or is not
    /// UTF-8.
    #[error("malformed user type name {0:?}")]
    InvalidUserTypeName(String),

    /// A length or element count cannot be satisfied by the remaining input.
    #[error("invalid length {length} ({remaining} bytes remaining)")]
    InvalidLength { length: u32, remaining: usize },

    /// A string payload is not valid UTF-16.
    #[error("invalid UTF-16 string")]
    InvalidUtf16,

    /// Nesting exceeds the configured maximum depth.
    #[error("nesting deeper than {0} levels")]
    DepthExceeded(usize),

    /// Bytes remain after the top-level value.
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
}

/// Encoding refused to produce bytes for a value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    /// The value does not fit the codec it is being written with.
    #[error("type mismatch: {codec} codec cannot encode a {found} value")]
    TypeMismatch {
        codec: &'static str,
        found: &'static str,
    },

    #[error("unknown user type '{0}'")]
    UnknownUserType(String),

    #[error("no codec registered for {0}")]
    UnsupportedTag(TypeTag),

    /// A struct user type is missing one of its fields.
    #[error("{type_name} is missing field '{field}'")]
    MissingField {
        type_name: String,
        field: &'static str,
    },

    /// A length or count does not fit the 32-bit prefix.
    #[error("length {0} does not fit a 32-bit prefix")]
    LengthOverflow(usize),

    /// The value is a derived, decode-only projection.
    #[error("{0} is a one-directional projection and cannot be re-encoded")]
    OneDirectional(&'static str),
}

/// Projecting a generic value onto a domain record failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdaptError {
    #[error("{type_name} is missing field '{field}'")]
    MissingField {
        type_name: &'static str,
        field: &'static str,
    },

    #[error("expected {expected}, found {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid {type_name} value {value}")]
    InvalidEnum { type_name: &'static str, value: i64 },

    #[error("no projector registered for user type '{0}'")]
    UnknownUserType(String),
}
