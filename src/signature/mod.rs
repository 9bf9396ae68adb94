//! Signature parsing and writing for type, method, field, property and
//! local variable signatures.
//!
//! ECMA-335 II.23.2 defines the blob signature format.

mod member;
mod types;

pub use member::{
    CallingConvention, FieldSig, LocalVarSig, MemberSig, MethodSig, MethodSpecSig, PropertySig,
    SigFlags,
};
pub use types::{ArrayShape, CustomMod, LocalVariable, NamedType, TypeSig, TypeWithMods};

use crate::error::{Error, Result};

/// Element type codes (ECMA-335 II.23.1.16), including the custom attribute
/// encodings that share the same tag space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ElementType {
    End = 0x00,
    Void = 0x01,
    Boolean = 0x02,
    Char = 0x03,
    I1 = 0x04,
    U1 = 0x05,
    I2 = 0x06,
    U2 = 0x07,
    I4 = 0x08,
    U4 = 0x09,
    I8 = 0x0A,
    U8 = 0x0B,
    R4 = 0x0C,
    R8 = 0x0D,
    String = 0x0E,
    Ptr = 0x0F,
    ByRef = 0x10,
    ValueType = 0x11,
    Class = 0x12,
    Var = 0x13,
    Array = 0x14,
    GenericInst = 0x15,
    TypedByRef = 0x16,
    IntPtr = 0x18,
    UIntPtr = 0x19,
    FnPtr = 0x1B,
    Object = 0x1C,
    SzArray = 0x1D,
    MVar = 0x1E,
    CModReqd = 0x1F,
    CModOpt = 0x20,
    Internal = 0x21,
    Modifier = 0x40,
    Sentinel = 0x41,
    Pinned = 0x45,
    /// `System.Type` argument in a custom attribute.
    Type = 0x50,
    /// Boxed object argument in a custom attribute.
    Boxed = 0x51,
    /// Named argument targeting a field.
    Field = 0x53,
    /// Named argument targeting a property.
    Property = 0x54,
    /// Enum argument in a custom attribute.
    Enum = 0x55,
}

impl ElementType {
    /// Parse element type from a tag value.
    pub fn from_u32(value: u32) -> Option<Self> {
        let tag = match value {
            0x00 => Self::End,
            0x01 => Self::Void,
            0x02 => Self::Boolean,
            0x03 => Self::Char,
            0x04 => Self::I1,
            0x05 => Self::U1,
            0x06 => Self::I2,
            0x07 => Self::U2,
            0x08 => Self::I4,
            0x09 => Self::U4,
            0x0A => Self::I8,
            0x0B => Self::U8,
            0x0C => Self::R4,
            0x0D => Self::R8,
            0x0E => Self::String,
            0x0F => Self::Ptr,
            0x10 => Self::ByRef,
            0x11 => Self::ValueType,
            0x12 => Self::Class,
            0x13 => Self::Var,
            0x14 => Self::Array,
            0x15 => Self::GenericInst,
            0x16 => Self::TypedByRef,
            0x18 => Self::IntPtr,
            0x19 => Self::UIntPtr,
            0x1B => Self::FnPtr,
            0x1C => Self::Object,
            0x1D => Self::SzArray,
            0x1E => Self::MVar,
            0x1F => Self::CModReqd,
            0x20 => Self::CModOpt,
            0x21 => Self::Internal,
            0x40 => Self::Modifier,
            0x41 => Self::Sentinel,
            0x45 => Self::Pinned,
            0x50 => Self::Type,
            0x51 => Self::Boxed,
            0x53 => Self::Field,
            0x54 => Self::Property,
            0x55 => Self::Enum,
            _ => return None,
        };
        Some(tag)
    }

    /// Get a human-readable name for the element type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::End => "end",
            Self::Void => "void",
            Self::Boolean => "bool",
            Self::Char => "char",
            Self::I1 => "sbyte",
            Self::U1 => "byte",
            Self::I2 => "short",
            Self::U2 => "ushort",
            Self::I4 => "int",
            Self::U4 => "uint",
            Self::I8 => "long",
            Self::U8 => "ulong",
            Self::R4 => "float",
            Self::R8 => "double",
            Self::String => "string",
            Self::Ptr => "ptr",
            Self::ByRef => "byref",
            Self::ValueType => "valuetype",
            Self::Class => "class",
            Self::Var => "!T",
            Self::Array => "array",
            Self::GenericInst => "generic",
            Self::TypedByRef => "typedref",
            Self::IntPtr => "nint",
            Self::UIntPtr => "nuint",
            Self::FnPtr => "fnptr",
            Self::Object => "object",
            Self::SzArray => "[]",
            Self::MVar => "!!T",
            Self::CModReqd => "modreq",
            Self::CModOpt => "modopt",
            Self::Internal => "internal",
            Self::Modifier => "modifier",
            Self::Sentinel => "...",
            Self::Pinned => "pinned",
            Self::Type => "type",
            Self::Boxed => "boxed",
            Self::Field => "field",
            Self::Property => "property",
            Self::Enum => "enum",
        }
    }

    /// Check whether the tag only has meaning inside custom attribute blobs.
    #[must_use]
    pub const fn is_custom_attribute_tag(self) -> bool {
        matches!(self, Self::Boxed | Self::Field | Self::Property | Self::Enum)
    }
}

/// The built-in types that carry no further data in a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    /// Native-width signed integer.
    IntPtr,
    /// Native-width unsigned integer.
    UIntPtr,
    String,
    Object,
    TypedByRef,
    /// A type handle, serialized in custom attributes as a qualified name.
    Type,
}

impl PrimitiveKind {
    /// The element type tag for this primitive.
    #[must_use]
    pub const fn element_type(self) -> ElementType {
        match self {
            Self::Void => ElementType::Void,
            Self::Boolean => ElementType::Boolean,
            Self::Char => ElementType::Char,
            Self::I1 => ElementType::I1,
            Self::U1 => ElementType::U1,
            Self::I2 => ElementType::I2,
            Self::U2 => ElementType::U2,
            Self::I4 => ElementType::I4,
            Self::U4 => ElementType::U4,
            Self::I8 => ElementType::I8,
            Self::U8 => ElementType::U8,
            Self::R4 => ElementType::R4,
            Self::R8 => ElementType::R8,
            Self::IntPtr => ElementType::IntPtr,
            Self::UIntPtr => ElementType::UIntPtr,
            Self::String => ElementType::String,
            Self::Object => ElementType::Object,
            Self::TypedByRef => ElementType::TypedByRef,
            Self::Type => ElementType::Type,
        }
    }

    /// The primitive an element type tag stands for, if any.
    #[must_use]
    pub const fn from_element_type(tag: ElementType) -> Option<Self> {
        let kind = match tag {
            ElementType::Void => Self::Void,
            ElementType::Boolean => Self::Boolean,
            ElementType::Char => Self::Char,
            ElementType::I1 => Self::I1,
            ElementType::U1 => Self::U1,
            ElementType::I2 => Self::I2,
            ElementType::U2 => Self::U2,
            ElementType::I4 => Self::I4,
            ElementType::U4 => Self::U4,
            ElementType::I8 => Self::I8,
            ElementType::U8 => Self::U8,
            ElementType::R4 => Self::R4,
            ElementType::R8 => Self::R8,
            ElementType::IntPtr => Self::IntPtr,
            ElementType::UIntPtr => Self::UIntPtr,
            ElementType::String => Self::String,
            ElementType::Object => Self::Object,
            ElementType::TypedByRef => Self::TypedByRef,
            ElementType::Type => Self::Type,
            _ => return None,
        };
        Some(kind)
    }

    /// Get a human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.element_type().name()
    }

    /// Size in bytes of a fixed-width primitive.
    ///
    /// Native-width integers, `void` and every reference-like kind have no
    /// fixed size and fail with [`Error::SizeUnknown`].
    pub fn byte_size(self) -> Result<u32> {
        match self {
            Self::Boolean | Self::I1 | Self::U1 => Ok(1),
            Self::Char | Self::I2 | Self::U2 => Ok(2),
            Self::I4 | Self::U4 | Self::R4 => Ok(4),
            Self::I8 | Self::U8 | Self::R8 => Ok(8),
            _ => Err(Error::SizeUnknown(self.name())),
        }
    }

    /// Check whether this kind may back an enum.
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Boolean
                | Self::Char
                | Self::I1
                | Self::U1
                | Self::I2
                | Self::U2
                | Self::I4
                | Self::U4
                | Self::I8
                | Self::U8
        )
    }
}
