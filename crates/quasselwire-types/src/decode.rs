//! Recursive decoder from payload bytes to a [`Value`] tree.

use bytes::Buf;

use crate::error::{DecodeError, DecodeErrorKind};
use crate::registry::{Codec, TypeRegistry};
use crate::tag::TypeTag;
use crate::value::{QDateTime, UserType, Value, ValueMap, Variant};

/// Default bound on container/variant nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Length prefix marking a null string or byte array.
pub(crate) const NULL_LENGTH: u32 = 0xFFFF_FFFF;

type Result<T> = std::result::Result<T, DecodeError>;

/// Decode one frame payload holding exactly one variant.
pub fn decode_variant(registry: &TypeRegistry, payload: &[u8]) -> Result<Variant> {
    let mut decoder = Decoder::new(registry, payload);
    let variant = decoder.read_variant()?;
    decoder.finish()?;
    Ok(variant)
}

/// Cursor over one payload, resolving codecs through a registry.
pub struct Decoder<'a> {
    registry: &'a TypeRegistry,
    src: &'a [u8],
    total: usize,
    max_depth: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(registry: &'a TypeRegistry, src: &'a [u8]) -> Self {
        Self {
            registry,
            src,
            total: src.len(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.total - self.src.remaining()
    }

    pub fn remaining(&self) -> usize {
        self.src.remaining()
    }

    pub fn read_variant(&mut self) -> Result<Variant> {
        self.variant(0)
    }

    /// Read one value with an explicit codec.
    pub fn read(&mut self, codec: &Codec) -> Result<Value> {
        self.value(codec, 0)
    }

    /// Fail if any input is left over.
    pub fn finish(self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::new(
                self.offset(),
                DecodeErrorKind::TrailingBytes(n),
            )),
        }
    }

    fn error(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(self.offset(), kind)
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let available = self.remaining();
        if available < needed {
            return Err(self.error(DecodeErrorKind::Truncated { needed, available }));
        }
        Ok(())
    }

    fn enter(&self, depth: usize) -> Result<usize> {
        if depth >= self.max_depth {
            return Err(self.error(DecodeErrorKind::DepthExceeded(self.max_depth)));
        }
        Ok(depth + 1)
    }

    fn u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.src.get_u8())
    }

    fn u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.src.get_u16())
    }

    fn u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.src.get_u32())
    }

    fn u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.src.get_u64())
    }

    /// Byte length prefix; `None` for the null sentinel.
    fn length(&mut self) -> Result<Option<usize>> {
        let start = self.offset();
        let length = self.u32()?;
        if length == NULL_LENGTH {
            return Ok(None);
        }
        let remaining = self.remaining();
        if length as usize > remaining {
            return Err(DecodeError::new(
                start,
                DecodeErrorKind::InvalidLength { length, remaining },
            ));
        }
        Ok(Some(length as usize))
    }

    /// Element count prefix, checked before allocating: `count` elements of
    /// `min_width` bytes must fit the remaining input. Zero-width elements
    /// are still limited to one per remaining byte.
    fn count(&mut self, min_width: usize) -> Result<usize> {
        let start = self.offset();
        let count = self.u32()?;
        let remaining = self.remaining();
        if (count as usize).saturating_mul(min_width.max(1)) > remaining {
            return Err(DecodeError::new(
                start,
                DecodeErrorKind::InvalidLength {
                    length: count,
                    remaining,
                },
            ));
        }
        Ok(count as usize)
    }

    fn raw(&mut self, len: usize) -> Vec<u8> {
        let out = self.src[..len].to_vec();
        self.src.advance(len);
        out
    }

    fn string(&mut self) -> Result<Option<String>> {
        let start = self.offset();
        let Some(len) = self.length()? else {
            return Ok(None);
        };
        if len % 2 != 0 {
            return Err(DecodeError::new(
                start,
                DecodeErrorKind::InvalidLength {
                    length: len as u32,
                    remaining: self.remaining(),
                },
            ));
        }
        let units: Vec<u16> = self.src[..len]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        let text = char::decode_utf16(units)
            .collect::<std::result::Result<String, _>>()
            .map_err(|_| DecodeError::new(start, DecodeErrorKind::InvalidUtf16))?;
        self.src.advance(len);
        Ok(Some(text))
    }

    fn byte_array(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.length()?.map(|len| self.raw(len)))
    }

    fn variant(&mut self, depth: usize) -> Result<Variant> {
        let depth = self.enter(depth)?;
        let start = self.offset();
        let id = self.u32()?;
        let tag = TypeTag::from_id(id)
            .ok_or_else(|| DecodeError::new(start, DecodeErrorKind::UnknownTag(id)))?;
        let registry = self.registry;
        let codec = registry
            .codec_for_tag(tag)
            .ok_or_else(|| DecodeError::new(start, DecodeErrorKind::UnsupportedTag(tag)))?;
        // The flag is informational; the payload follows either way.
        let null = self.u8()? != 0;
        let value = self.value(codec, depth)?;
        Ok(Variant { tag, null, value })
    }

    fn user_type(&mut self, depth: usize) -> Result<UserType> {
        let depth = self.enter(depth)?;
        let start = self.offset();
        // The name carries exactly one NUL, as its last byte.
        let raw = self.byte_array()?;
        let name = raw.as_deref().and_then(|raw| match raw.split_last() {
            Some((0, name)) if !name.contains(&0) => std::str::from_utf8(name).ok(),
            _ => None,
        });
        let Some(name) = name.map(str::to_owned) else {
            let shown = String::from_utf8_lossy(raw.as_deref().unwrap_or_default()).into_owned();
            return Err(DecodeError::new(
                start,
                DecodeErrorKind::InvalidUserTypeName(shown),
            ));
        };
        let registry = self.registry;
        let codec = registry.codec_for_user_type(&name).ok_or_else(|| {
            DecodeError::new(start, DecodeErrorKind::UnknownUserType(name.clone()))
        })?;
        tracing::trace!(user_type = %name, offset = start, "decoding user type");
        let value = self.value(codec, depth)?;
        Ok(UserType { name, value })
    }

    fn value(&mut self, codec: &Codec, depth: usize) -> Result<Value> {
        let value = match codec {
            Codec::Void => Value::Void,
            Codec::Bool => Value::Bool(self.u8()? != 0),
            Codec::Int => Value::Int(self.u32()? as i32),
            Codec::UInt => Value::UInt(self.u32()?),
            Codec::LongLong => Value::LongLong(self.u64()? as i64),
            Codec::ULongLong => Value::ULongLong(self.u64()?),
            Codec::Double => Value::Double(f64::from_bits(self.u64()?)),
            Codec::Float => Value::Float(f32::from_bits(self.u32()?)),
            Codec::Short => Value::Short(self.u16()? as i16),
            Codec::UShort => Value::UShort(self.u16()?),
            Codec::Char => Value::Char(self.u8()? as i8),
            Codec::UChar => Value::UChar(self.u8()?),
            Codec::QChar => Value::QChar(self.u16()?),
            Codec::String => Value::String(self.string()?),
            Codec::ByteArray => Value::ByteArray(self.byte_array()?),
            Codec::Date => Value::Date(self.u32()?),
            Codec::Time => Value::Time(self.u32()?),
            Codec::DateTime => Value::DateTime(QDateTime {
                julian_day: self.u32()?,
                msecs: self.u32()?,
                utc: self.u8()? != 0,
            }),
            Codec::Variant => Value::from(self.variant(depth)?),
            Codec::UserType => Value::from(self.user_type(depth)?),
            Codec::List(element) => {
                let depth = self.enter(depth)?;
                let count = self.count(element.min_size())?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.value(element, depth)?);
                }
                Value::List(items)
            }
            Codec::Map(key, value) => {
                let depth = self.enter(depth)?;
                let count = self.count(key.min_size() + value.min_size())?;
                let mut map = ValueMap::with_capacity(count);
                for _ in 0..count {
                    let k = self.value(key, depth)?;
                    let v = self.value(value, depth)?;
                    map.insert(k, v);
                }
                Value::Map(map)
            }
            Codec::Struct(fields) => {
                let depth = self.enter(depth)?;
                let mut map = ValueMap::with_capacity(fields.len());
                for field in fields {
                    let v = self.value(&field.codec, depth)?;
                    map.insert(Value::string(field.name), v);
                }
                Value::Map(map)
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::quassel()
    }

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_be_bytes).collect()
    }

    #[test]
    fn decodes_int_variant() {
        let payload = [0, 0, 0, 2, 0, 0xFF, 0xFF, 0xFF, 0xFE];
        let variant = decode_variant(&registry(), &payload).unwrap();
        assert_eq!(variant, Variant::int(-2));
    }

    #[test]
    fn bool_is_nonzero_true() {
        let variant = decode_variant(&registry(), &[0, 0, 0, 1, 0, 7]).unwrap();
        assert_eq!(variant.value, Value::Bool(true));
    }

    #[test]
    fn decodes_utf16_string() {
        let mut payload = vec![0, 0, 0, 10, 0];
        let text = utf16("h\u{e9}llo \u{1F600}");
        payload.extend_from_slice(&(text.len() as u32).to_be_bytes());
        payload.extend_from_slice(&text);

        let variant = decode_variant(&registry(), &payload).unwrap();
        assert_eq!(variant.value.as_str(), Some("h\u{e9}llo \u{1F600}"));
    }

    #[test]
    fn null_length_is_empty_not_a_huge_read() {
        let payload = [0, 0, 0, 10, 1, 0xFF, 0xFF, 0xFF, 0xFF];
        let variant = decode_variant(&registry(), &payload).unwrap();
        assert!(variant.null);
        assert_eq!(variant.value, Value::String(None));
        assert_eq!(variant.value.as_str(), Some(""));

        let payload = [0, 0, 0, 12, 1, 0xFF, 0xFF, 0xFF, 0xFF];
        let variant = decode_variant(&registry(), &payload).unwrap();
        assert_eq!(variant.value.as_bytes(), Some(&[][..]));
    }

    #[test]
    fn null_flag_does_not_skip_payload() {
        let payload = [0, 0, 0, 2, 1, 0, 0, 0, 9];
        let variant = decode_variant(&registry(), &payload).unwrap();
        assert!(variant.null);
        assert_eq!(variant.value, Value::Int(9));
    }

    #[test]
    fn unknown_tag_reports_offset() {
        let payload = [0, 0, 0, 9, 0, 0, 0, 0, 1, 0, 0, 0, 99, 0];
        let err = decode_variant(&registry(), &payload).unwrap_err();
        assert_eq!(err.offset, 9);
        assert_eq!(err.kind, DecodeErrorKind::UnknownTag(99));
    }

    #[test]
    fn bit_array_has_no_codec() {
        let err = decode_variant(&registry(), &[0, 0, 0, 13, 0, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnsupportedTag(TypeTag::QBitArray));
    }

    #[test]
    fn truncated_input_is_an_error() {
        let err = decode_variant(&registry(), &[0, 0, 0, 2, 0, 0, 0]).unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::Truncated {
                needed: 4,
                available: 2
            }
        );
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn oversized_string_length_is_rejected() {
        let payload = [0, 0, 0, 10, 0, 0x7F, 0, 0, 0, 0, 0x41];
        let err = decode_variant(&registry(), &payload).unwrap_err();
        assert!(matches!(
            err.kind,
            DecodeErrorKind::InvalidLength { remaining: 2, .. }
        ));
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn odd_string_length_is_rejected() {
        let payload = [0, 0, 0, 10, 0, 0, 0, 0, 3, 0, 0x41, 0];
        let err = decode_variant(&registry(), &payload).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::InvalidLength { length: 3, .. }));
    }

    #[test]
    fn list_count_beyond_input_is_rejected_before_allocating() {
        let payload = [0, 0, 0, 9, 0, 0xFF, 0xFF, 0xFF, 0xF0];
        let err = decode_variant(&registry(), &payload).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::InvalidLength { .. }));
    }

    #[test]
    fn duplicate_map_keys_keep_last_value() {
        let mut payload = vec![0, 0, 0, 8, 0, 0, 0, 0, 2];
        for value in [1u32, 2] {
            payload.extend_from_slice(&[0, 0, 0, 2, 0, b'k']);
            payload.extend_from_slice(&[0, 0, 0, 2, 0]);
            payload.extend_from_slice(&value.to_be_bytes());
        }
        let variant = decode_variant(&registry(), &payload).unwrap();
        let map = variant.value.as_map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get_str("k").and_then(Value::as_variant),
            Some(&Variant::int(2))
        );
    }

    #[test]
    fn unregistered_user_type_is_an_error_not_a_default() {
        let mut payload = vec![0, 0, 0, 127, 0, 0, 0, 0, 8];
        payload.extend_from_slice(b"Unknown\0");
        payload.extend_from_slice(&[0, 0, 0, 1]);

        let err = decode_variant(&registry(), &payload).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnknownUserType("Unknown".into()));
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn user_type_name_strips_terminator() {
        let mut payload = vec![0, 0, 0, 127, 0, 0, 0, 0, 9];
        payload.extend_from_slice(b"BufferId\0");
        payload.extend_from_slice(&[0, 0, 0, 42]);

        let variant = decode_variant(&registry(), &payload).unwrap();
        let Value::UserType(user) = variant.value else {
            panic!("expected user type");
        };
        assert_eq!(user.name, "BufferId");
        assert_eq!(user.value, Value::Int(42));
    }

    fn user_type_payload(name: &[u8]) -> Vec<u8> {
        let mut payload = vec![0, 0, 0, 127, 0];
        payload.extend_from_slice(&(name.len() as u32).to_be_bytes());
        payload.extend_from_slice(name);
        payload.extend_from_slice(&[0, 0, 0, 42]);
        payload
    }

    #[test]
    fn user_type_name_needs_one_trailing_terminator() {
        for name in [&b"BufferId"[..], b"Buffer\0Id\0", b"BufferId\0\0"] {
            let err = decode_variant(&registry(), &user_type_payload(name)).unwrap_err();
            assert!(
                matches!(err.kind, DecodeErrorKind::InvalidUserTypeName(_)),
                "{name:?}: {err}"
            );
            assert_eq!(err.offset, 5);
        }

        let mut null_name = vec![0, 0, 0, 127, 0, 0xFF, 0xFF, 0xFF, 0xFF];
        null_name.extend_from_slice(&[0, 0, 0, 42]);
        let err = decode_variant(&registry(), &null_name).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidUserTypeName(String::new()));
    }

    #[test]
    fn element_count_accounts_for_element_width() {
        // Three strings need at least 12 bytes; only 8 follow.
        let payload = [0, 0, 0, 11, 0, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0];
        let err = decode_variant(&registry(), &payload).unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::InvalidLength {
                length: 3,
                remaining: 8
            }
        );
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn zero_width_elements_are_still_bounded() {
        let registry = TypeRegistry::builder()
            .with_qt_types()
            .tag(TypeTag::QVariantList, Codec::list(Codec::Void))
            .build();
        let empty = decode_variant(&registry, &[0, 0, 0, 9, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(empty.value, Value::List(Vec::new()));

        let err = decode_variant(&registry, &[0, 0, 0, 9, 0, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::InvalidLength { .. }));
    }

    #[test]
    fn nested_variants_are_bounded() {
        let mut payload = Vec::new();
        for _ in 0..100 {
            payload.extend_from_slice(&[0, 0, 0, 138, 0]);
        }
        payload.extend_from_slice(&[0, 0, 0, 1, 0, 1]);

        let err = decode_variant(&registry(), &payload).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::DepthExceeded(DEFAULT_MAX_DEPTH));

        let shallow = Decoder::new(&registry(), &payload)
            .with_max_depth(200)
            .read_variant()
            .unwrap();
        assert_eq!(shallow.innermost(), &Variant::bool(true));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let err = decode_variant(&registry(), &[0, 0, 0, 1, 0, 1, 0xAA]).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::TrailingBytes(1));
    }

    #[test]
    fn struct_user_type_decodes_to_named_fields() {
        let mut payload = vec![0, 0, 0, 127, 0, 0, 0, 0, 11];
        payload.extend_from_slice(b"BufferInfo\0");
        payload.extend_from_slice(&[0, 0, 0, 5]);
        payload.extend_from_slice(&[0, 0, 0, 1]);
        payload.extend_from_slice(&[0, 2]);
        payload.extend_from_slice(&[0, 0, 0, 0]);
        payload.extend_from_slice(&[0, 0, 0, 5]);
        payload.extend_from_slice(b"#rust");

        let variant = decode_variant(&registry(), &payload).unwrap();
        let Value::UserType(user) = variant.value else {
            panic!("expected user type");
        };
        let fields = user.value.as_map().unwrap();
        assert_eq!(fields.get_str("id"), Some(&Value::Int(5)));
        assert_eq!(fields.get_str("type"), Some(&Value::Short(2)));
        assert_eq!(fields.get_str("name"), Some(&Value::bytes(*b"#rust")));
    }
}
