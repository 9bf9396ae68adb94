//! Custom attribute argument types and values (ECMA-335 II.23.3).

use crate::custom_attribute::TypeNameResolver;
use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::signature::{ElementType, PrimitiveKind};
use crate::writer::Writer;

/// Array length marking a null array.
const NULL_ARRAY: u32 = u32::MAX;

/// An enum type as seen by a custom attribute: its qualified name and the
/// integral type its values are stored as.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    name: String,
    underlying: PrimitiveKind,
}

impl EnumType {
    /// Describe an enum; the underlying type must be integral.
    pub fn new(name: impl Into<String>, underlying: PrimitiveKind) -> Result<Self> {
        if !underlying.is_integral() {
            return Err(Error::UnsupportedValue("enum with a non-integral underlying type"));
        }
        Ok(Self {
            name: name.into(),
            underlying,
        })
    }

    /// Qualified type name, as serialized in the blob.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The integral type values are stored as.
    #[must_use]
    pub const fn underlying(&self) -> PrimitiveKind {
        self.underlying
    }
}

/// The type of a custom attribute argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaType {
    Primitive(PrimitiveKind),
    Enum(EnumType),
    /// A boxed value that carries its own type in the blob.
    Object,
    /// Single-dimensional array; elements are never arrays themselves.
    Array(Box<CaType>),
}

impl CaType {
    /// An array of `element`.
    pub fn array(element: CaType) -> Result<Self> {
        if matches!(element, Self::Array(_)) {
            return Err(Error::UnsupportedValue("array of arrays"));
        }
        Ok(Self::Array(Box::new(element)))
    }

    /// Decode a serialized type tag, asking `resolver` for enum names.
    pub fn parse(reader: &mut Reader<'_>, resolver: &dyn TypeNameResolver) -> Result<Self> {
        reader.nested(|reader| Self::read(reader, resolver))
    }

    fn read(reader: &mut Reader<'_>, resolver: &dyn TypeNameResolver) -> Result<Self> {
        let at = reader.position();
        let tag = reader.read_u8()?;
        match ElementType::from_u32(u32::from(tag)) {
            Some(ElementType::SzArray) => Self::array(Self::parse(reader, resolver)?),
            Some(ElementType::Boxed) => Ok(Self::Object),
            Some(ElementType::Enum) => {
                let name = reader
                    .read_ser_string()?
                    .ok_or(Error::malformed(at + 1, "null enum type name"))?;
                match resolver.resolve_by_name(&name) {
                    Some(Self::Enum(enum_type)) => Ok(Self::Enum(enum_type)),
                    _ => Err(Error::UnresolvedTypeName(name)),
                }
            }
            Some(element) => match PrimitiveKind::from_element_type(element) {
                Some(kind) if is_serializable(kind) => Ok(Self::Primitive(kind)),
                _ => Err(Error::malformed(at, "invalid custom attribute type")),
            },
            None => Err(Error::malformed(at, "invalid custom attribute type")),
        }
    }

    /// Encode the serialized type tag.
    pub fn write_to(&self, writer: &mut Writer) -> Result<()> {
        match self {
            Self::Primitive(kind) if is_serializable(*kind) => {
                writer.write_u8(kind.element_type() as u8);
            }
            Self::Primitive(_) => return Err(writer.malformed("invalid custom attribute type")),
            Self::Enum(enum_type) => {
                writer.write_u8(ElementType::Enum as u8);
                writer.write_ser_string(Some(enum_type.name()))?;
            }
            Self::Object => writer.write_u8(ElementType::Boxed as u8),
            Self::Array(element) => {
                if matches!(**element, Self::Array(_)) {
                    return Err(Error::UnsupportedValue("array of arrays"));
                }
                writer.write_u8(ElementType::SzArray as u8);
                element.write_to(writer)?;
            }
        }
        Ok(())
    }
}

/// Kinds with a serialized type tag. Native integers are among them; only
/// their values are unsupported.
fn is_serializable(kind: PrimitiveKind) -> bool {
    !matches!(
        kind,
        PrimitiveKind::Void | PrimitiveKind::TypedByRef | PrimitiveKind::Object
    )
}

/// A custom attribute argument value.
///
/// Values in `Object` positions are stored unwrapped; their serialized type
/// is recomputed with [`CaValue::ty`] when they are encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum CaValue {
    Bool(bool),
    /// A UTF-16 code unit.
    Char(u16),
    I1(i8),
    U1(u8),
    I2(i16),
    U2(u16),
    I4(i32),
    U4(u32),
    I8(i64),
    U8(u64),
    R4(f32),
    R8(f64),
    String(Option<String>),
    /// A type, by its assembly-qualified name.
    Type(Option<String>),
    Enum {
        ty: EnumType,
        value: Box<CaValue>,
    },
    Array {
        element: CaType,
        /// `None` for a null array.
        values: Option<Vec<CaValue>>,
    },
}

impl CaValue {
    /// The serialized type this value is written with in an `Object`
    /// position.
    #[must_use]
    pub fn ty(&self) -> CaType {
        let kind = match self {
            Self::Bool(_) => PrimitiveKind::Boolean,
            Self::Char(_) => PrimitiveKind::Char,
            Self::I1(_) => PrimitiveKind::I1,
            Self::U1(_) => PrimitiveKind::U1,
            Self::I2(_) => PrimitiveKind::I2,
            Self::U2(_) => PrimitiveKind::U2,
            Self::I4(_) => PrimitiveKind::I4,
            Self::U4(_) => PrimitiveKind::U4,
            Self::I8(_) => PrimitiveKind::I8,
            Self::U8(_) => PrimitiveKind::U8,
            Self::R4(_) => PrimitiveKind::R4,
            Self::R8(_) => PrimitiveKind::R8,
            Self::String(_) => PrimitiveKind::String,
            Self::Type(_) => PrimitiveKind::Type,
            Self::Enum { ty, .. } => return CaType::Enum(ty.clone()),
            Self::Array { element, .. } => return CaType::Array(Box::new(element.clone())),
        };
        CaType::Primitive(kind)
    }

    /// Decode a value of type `ty`.
    pub fn parse(
        ty: &CaType,
        reader: &mut Reader<'_>,
        resolver: &dyn TypeNameResolver,
    ) -> Result<Self> {
        reader.nested(|reader| Self::read(ty, reader, resolver))
    }

    fn read(ty: &CaType, reader: &mut Reader<'_>, resolver: &dyn TypeNameResolver) -> Result<Self> {
        match ty {
            CaType::Primitive(kind) => Self::read_primitive(*kind, reader),
            CaType::Enum(enum_type) => Ok(Self::Enum {
                ty: enum_type.clone(),
                value: Box::new(Self::read_primitive(enum_type.underlying, reader)?),
            }),
            CaType::Object => {
                let at = reader.position();
                let inner = CaType::parse(reader, resolver)?;
                if inner == CaType::Object {
                    return Err(Error::malformed(at, "boxed value of type object"));
                }
                Self::parse(&inner, reader, resolver)
            }
            CaType::Array(element) => {
                let count = reader.read_u32()?;
                if count == NULL_ARRAY {
                    return Ok(Self::Array {
                        element: (**element).clone(),
                        values: None,
                    });
                }
                let count = count as usize;
                let mut values = Vec::with_capacity(count.min(reader.remaining()));
                for _ in 0..count {
                    values.push(Self::parse(element, reader, resolver)?);
                }
                Ok(Self::Array {
                    element: (**element).clone(),
                    values: Some(values),
                })
            }
        }
    }

    fn read_primitive(kind: PrimitiveKind, reader: &mut Reader<'_>) -> Result<Self> {
        let at = reader.position();
        let value = match kind {
            PrimitiveKind::Boolean => match reader.read_u8()? {
                0 => Self::Bool(false),
                1 => Self::Bool(true),
                _ => return Err(Error::malformed(at, "boolean other than 0 or 1")),
            },
            PrimitiveKind::Char => Self::Char(reader.read_u16()?),
            PrimitiveKind::I1 => Self::I1(reader.read_i8()?),
            PrimitiveKind::U1 => Self::U1(reader.read_u8()?),
            PrimitiveKind::I2 => Self::I2(reader.read_i16()?),
            PrimitiveKind::U2 => Self::U2(reader.read_u16()?),
            PrimitiveKind::I4 => Self::I4(reader.read_i32()?),
            PrimitiveKind::U4 => Self::U4(reader.read_u32()?),
            PrimitiveKind::I8 => Self::I8(reader.read_i64()?),
            PrimitiveKind::U8 => Self::U8(reader.read_u64()?),
            PrimitiveKind::R4 => Self::R4(reader.read_f32()?),
            PrimitiveKind::R8 => Self::R8(reader.read_f64()?),
            PrimitiveKind::String => Self::String(reader.read_ser_string()?),
            PrimitiveKind::Type => Self::Type(reader.read_ser_string()?),
            PrimitiveKind::IntPtr | PrimitiveKind::UIntPtr => {
                return Err(Error::UnsupportedValue("native-width integer"));
            }
            PrimitiveKind::Void | PrimitiveKind::Object | PrimitiveKind::TypedByRef => {
                return Err(Error::malformed(at, "invalid custom attribute type"));
            }
        };
        Ok(value)
    }

    /// Encode this value in a position declared as `ty`.
    pub fn write_to(&self, ty: &CaType, writer: &mut Writer) -> Result<()> {
        match (ty, self) {
            (CaType::Object, value) => value.write_boxed(writer),
            (CaType::Primitive(kind), value) => value.write_primitive(*kind, writer),
            (CaType::Enum(expected), Self::Enum { ty, value }) if expected == ty => {
                value.write_primitive(expected.underlying, writer)
            }
            (CaType::Array(expected), Self::Array { element, values }) if **expected == *element => {
                let Some(values) = values else {
                    writer.write_u32(NULL_ARRAY);
                    return Ok(());
                };
                let count = u32::try_from(values.len())
                    .ok()
                    .filter(|&count| count != NULL_ARRAY)
                    .ok_or(Error::CountOutOfRange {
                        what: "array element",
                        count: values.len(),
                    })?;
                writer.write_u32(count);
                for value in values {
                    value.write_to(element, writer)?;
                }
                Ok(())
            }
            _ => Err(writer.malformed("value does not match its declared type")),
        }
    }

    /// Encode this value with its type tag in front, as an `Object`
    /// position requires.
    pub fn write_boxed(&self, writer: &mut Writer) -> Result<()> {
        let ty = self.ty();
        ty.write_to(writer)?;
        self.write_to(&ty, writer)
    }

    fn write_primitive(&self, kind: PrimitiveKind, writer: &mut Writer) -> Result<()> {
        match (kind, self) {
            (PrimitiveKind::Boolean, Self::Bool(value)) => writer.write_u8(u8::from(*value)),
            (PrimitiveKind::Char, Self::Char(value)) => writer.write_u16(*value),
            (PrimitiveKind::I1, Self::I1(value)) => writer.write_i8(*value),
            (PrimitiveKind::U1, Self::U1(value)) => writer.write_u8(*value),
            (PrimitiveKind::I2, Self::I2(value)) => writer.write_i16(*value),
            (PrimitiveKind::U2, Self::U2(value)) => writer.write_u16(*value),
            (PrimitiveKind::I4, Self::I4(value)) => writer.write_i32(*value),
            (PrimitiveKind::U4, Self::U4(value)) => writer.write_u32(*value),
            (PrimitiveKind::I8, Self::I8(value)) => writer.write_i64(*value),
            (PrimitiveKind::U8, Self::U8(value)) => writer.write_u64(*value),
            (PrimitiveKind::R4, Self::R4(value)) => writer.write_f32(*value),
            (PrimitiveKind::R8, Self::R8(value)) => writer.write_f64(*value),
            (PrimitiveKind::String, Self::String(value))
            | (PrimitiveKind::Type, Self::Type(value)) => {
                writer.write_ser_string(value.as_deref())?;
            }
            (PrimitiveKind::IntPtr | PrimitiveKind::UIntPtr, _) => {
                return Err(Error::UnsupportedValue("native-width integer"));
            }
            _ => return Err(writer.malformed("value does not match its declared type")),
        }
        Ok(())
    }
}
