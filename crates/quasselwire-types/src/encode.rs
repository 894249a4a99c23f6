//! Encoder from a [`Value`] tree back to payload bytes.

use bytes::{BufMut, Bytes, BytesMut};

use crate::decode::NULL_LENGTH;
use crate::error::EncodeError;
use crate::registry::{Codec, Field, TypeRegistry};
use crate::value::{UserType, Value, ValueMap, Variant};

type Result<T> = std::result::Result<T, EncodeError>;

/// Encode one variant into a frame payload.
pub fn encode_variant(registry: &TypeRegistry, variant: &Variant) -> Result<Bytes> {
    let mut encoder = Encoder::new(registry);
    encoder.write_variant(variant)?;
    Ok(encoder.finish())
}

/// Payload writer resolving codecs through a registry.
pub struct Encoder<'a> {
    registry: &'a TypeRegistry,
    dst: BytesMut,
}

impl<'a> Encoder<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            dst: BytesMut::new(),
        }
    }

    /// Tag, stored null flag, then the payload under the tag's codec.
    pub fn write_variant(&mut self, variant: &Variant) -> Result<()> {
        let registry = self.registry;
        let codec = registry
            .codec_for_tag(variant.tag)
            .ok_or(EncodeError::UnsupportedTag(variant.tag))?;
        self.dst.put_u32(variant.tag.id());
        self.dst.put_u8(u8::from(variant.null));
        self.write(codec, &variant.value)
    }

    /// Write one value with an explicit codec.
    pub fn write(&mut self, codec: &Codec, value: &Value) -> Result<()> {
        match (codec, value) {
            (Codec::Void, Value::Void) => {}
            (Codec::Bool, Value::Bool(v)) => self.dst.put_u8(u8::from(*v)),
            (Codec::Int, Value::Int(v)) => self.dst.put_i32(*v),
            (Codec::UInt, Value::UInt(v)) => self.dst.put_u32(*v),
            (Codec::LongLong, Value::LongLong(v)) => self.dst.put_i64(*v),
            (Codec::ULongLong, Value::ULongLong(v)) => self.dst.put_u64(*v),
            (Codec::Double, Value::Double(v)) => self.dst.put_f64(*v),
            (Codec::Float, Value::Float(v)) => self.dst.put_f32(*v),
            (Codec::Short, Value::Short(v)) => self.dst.put_i16(*v),
            (Codec::UShort, Value::UShort(v)) => self.dst.put_u16(*v),
            (Codec::Char, Value::Char(v)) => self.dst.put_i8(*v),
            (Codec::UChar, Value::UChar(v)) => self.dst.put_u8(*v),
            (Codec::QChar, Value::QChar(v)) => self.dst.put_u16(*v),
            (Codec::String, Value::String(text)) => self.string(text.as_deref())?,
            (Codec::ByteArray, Value::ByteArray(data)) => self.byte_array(data.as_deref())?,
            (Codec::Date, Value::Date(jd)) => self.dst.put_u32(*jd),
            (Codec::Time, Value::Time(ms)) => self.dst.put_u32(*ms),
            (Codec::DateTime, Value::DateTime(dt)) => {
                self.dst.put_u32(dt.julian_day);
                self.dst.put_u32(dt.msecs);
                self.dst.put_u8(u8::from(dt.utc));
            }
            (Codec::Variant, Value::Variant(inner)) => self.write_variant(inner)?,
            (Codec::UserType, Value::UserType(user)) => self.user_type(user)?,
            (Codec::List(element), Value::List(items)) => {
                self.length(items.len())?;
                for item in items {
                    self.write(element, item)?;
                }
            }
            (Codec::Map(key, val), Value::Map(map)) => {
                self.length(map.len())?;
                for (k, v) in map.iter() {
                    self.write(key, k)?;
                    self.write(val, v)?;
                }
            }
            (Codec::Struct(fields), Value::Map(map)) => self.fields("struct", fields, map)?,
            (codec, value) => {
                return Err(EncodeError::TypeMismatch {
                    codec: codec.name(),
                    found: value.kind(),
                })
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Bytes {
        self.dst.freeze()
    }

    fn length(&mut self, len: usize) -> Result<()> {
        let prefix = u32::try_from(len)
            .ok()
            .filter(|&n| n != NULL_LENGTH)
            .ok_or(EncodeError::LengthOverflow(len))?;
        self.dst.put_u32(prefix);
        Ok(())
    }

    fn string(&mut self, text: Option<&str>) -> Result<()> {
        let Some(text) = text else {
            self.dst.put_u32(NULL_LENGTH);
            return Ok(());
        };
        let units: Vec<u16> = text.encode_utf16().collect();
        self.length(units.len() * 2)?;
        for unit in units {
            self.dst.put_u16(unit);
        }
        Ok(())
    }

    fn byte_array(&mut self, data: Option<&[u8]>) -> Result<()> {
        let Some(data) = data else {
            self.dst.put_u32(NULL_LENGTH);
            return Ok(());
        };
        self.length(data.len())?;
        self.dst.put_slice(data);
        Ok(())
    }

    fn user_type(&mut self, user: &UserType) -> Result<()> {
        let registry = self.registry;
        let codec = registry
            .codec_for_user_type(&user.name)
            .ok_or_else(|| EncodeError::UnknownUserType(user.name.clone()))?;
        let mut name = Vec::with_capacity(user.name.len() + 1);
        name.extend_from_slice(user.name.as_bytes());
        name.push(0);
        self.byte_array(Some(&name))?;

        match (codec, &user.value) {
            (Codec::Struct(fields), Value::Map(map)) => self.fields(&user.name, fields, map),
            _ => self.write(codec, &user.value),
        }
    }

    fn fields(&mut self, type_name: &str, fields: &[Field], map: &ValueMap) -> Result<()> {
        for field in fields {
            let value = map
                .get_str(field.name)
                .ok_or_else(|| EncodeError::MissingField {
                    type_name: type_name.to_string(),
                    field: field.name,
                })?;
            self.write(&field.codec, value)?;
        }
        Ok(())
    }
}
