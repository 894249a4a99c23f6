//! Wire values for the Quassel core protocol.
//!
//! The core speaks a subset of Qt's `QDataStream` format: big-endian
//! primitives, UTF-16 strings, self-describing variants and named user types.
//!
//! # Layers
//!
//! - [`value`]: the generic, byte-exact value tree ([`Value`], [`Variant`])
//! - [`registry`]: tag and user-type name to [`Codec`] tables
//! - [`decode`] / [`encode`]: recursive codec driven by the registry
//! - [`adapter`]: projections to domain records ([`BufferInfo`], [`MessageInfo`])
//!   and JSON-friendly [`SemanticValue`]s
//! - [`date`]: Julian day arithmetic used by `QDate`

pub mod adapter;
pub mod date;
pub mod decode;
pub mod encode;
pub mod error;
pub mod registry;
pub mod tag;
pub mod value;

pub use adapter::{
    Adapter, BufferInfo, BufferType, MessageFlags, MessageInfo, MessageType, SemanticValue,
};
pub use date::{
    date_to_julian_day, julian_day_to_date, CalendarDate, Clock, FixedClock, SystemClock, TimeOfDay,
};
pub use decode::{decode_variant, Decoder, DEFAULT_MAX_DEPTH};
pub use encode::{encode_variant, Encoder};
pub use error::{AdaptError, DecodeError, DecodeErrorKind, EncodeError};
pub use registry::{Codec, Field, TypeRegistry, TypeRegistryBuilder};
pub use tag::TypeTag;
pub use value::{QDateTime, UserType, Value, ValueMap, Variant};
