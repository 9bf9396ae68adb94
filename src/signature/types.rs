//! Type signatures (ECMA-335 II.23.2.10 - II.23.2.14).

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::resolve::{LayoutProvider, References, TypeReference};
use crate::signature::{ElementType, MethodSig, PrimitiveKind};
use crate::tables::TypeDefOrRef;
use crate::writer::Writer;

/// A custom modifier (`modreq` / `modopt`) prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomMod {
    /// `modreq` when true, `modopt` otherwise.
    pub required: bool,
    /// The modifier type.
    pub modifier: TypeReference,
}

impl CustomMod {
    /// Create a custom modifier.
    #[must_use]
    pub fn new(required: bool, modifier: TypeDefOrRef) -> Self {
        Self {
            required,
            modifier: modifier.into(),
        }
    }

    fn write_to(&self, writer: &mut Writer) -> Result<()> {
        let tag = if self.required {
            ElementType::CModReqd
        } else {
            ElementType::CModOpt
        };
        writer.write_u8(tag as u8);
        self.modifier.index.write_to(writer)
    }
}

/// A class or value type named through a `TypeDefOrRef` index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamedType {
    /// Encoded as `VALUETYPE` rather than `CLASS`.
    pub value_type: bool,
    /// The referenced type.
    pub reference: TypeReference,
}

impl NamedType {
    fn write_to(&self, writer: &mut Writer) -> Result<()> {
        let tag = if self.value_type {
            ElementType::ValueType
        } else {
            ElementType::Class
        };
        writer.write_u8(tag as u8);
        self.reference.index.write_to(writer)
    }
}

/// Shape of a general (multi-dimensional) array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayShape {
    /// Element type.
    pub element: Box<TypeSig>,
    /// Number of dimensions.
    pub rank: u32,
    /// Sizes of the leading dimensions; may be shorter than `rank`.
    pub sizes: Vec<u32>,
    /// Lower bounds of the leading dimensions; may be shorter than `rank`.
    pub lo_bounds: Vec<i32>,
}

impl ArrayShape {
    fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let element = TypeSig::parse(reader)?;
        let rank = reader.read_compressed_uint()?;

        let num_sizes = reader.read_compressed_uint()? as usize;
        let mut sizes = Vec::with_capacity(num_sizes.min(reader.remaining()));
        for _ in 0..num_sizes {
            sizes.push(reader.read_compressed_uint()?);
        }

        let num_lo_bounds = reader.read_compressed_uint()? as usize;
        let mut lo_bounds = Vec::with_capacity(num_lo_bounds.min(reader.remaining()));
        for _ in 0..num_lo_bounds {
            lo_bounds.push(reader.read_compressed_int()?);
        }

        Ok(Self {
            element: Box::new(element),
            rank,
            sizes,
            lo_bounds,
        })
    }

    fn write_to(&self, writer: &mut Writer) -> Result<()> {
        self.element.write_real(writer)?;
        writer.write_compressed_uint(self.rank)?;
        writer.write_compressed_len("array size", self.sizes.len())?;
        for &size in &self.sizes {
            writer.write_compressed_uint(size)?;
        }
        writer.write_compressed_len("array lower bound", self.lo_bounds.len())?;
        for &bound in &self.lo_bounds {
            writer.write_compressed_int(bound)?;
        }
        Ok(())
    }
}

/// A type as it appears inside a signature blob.
///
/// `Pinned`, `Sentinel` and `CustomMod` are pseudo-types: markers that shape
/// the surrounding list and never stand for a type on their own. They are
/// only produced by [`TypeSig::parse_any`]; every other entry point peels
/// them off or rejects them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSig {
    /// Pinned local marker.
    Pinned,
    /// Boundary between fixed and variable arguments.
    Sentinel,
    /// Custom modifier marker.
    CustomMod(CustomMod),
    /// Built-in type.
    Primitive(PrimitiveKind),
    /// Unmanaged pointer.
    Ptr(Box<TypeWithMods>),
    /// Managed pointer.
    ByRef(Box<TypeSig>),
    /// Single-dimensional zero-based array.
    SzArray(Box<TypeWithMods>),
    /// General array with rank and bounds.
    Array(ArrayShape),
    /// Class or value type reference.
    TypeDefOrRef(NamedType),
    /// Generic type parameter (`!n`).
    Var(u32),
    /// Generic type instantiation.
    GenericInst {
        applicand: NamedType,
        args: Vec<TypeSig>,
    },
    /// Generic method parameter (`!!n`).
    MVar(u32),
    /// Function pointer.
    FnPtr(Box<MethodSig>),
}

impl TypeSig {
    /// A `CLASS` reference.
    #[must_use]
    pub fn class(index: TypeDefOrRef) -> Self {
        Self::TypeDefOrRef(NamedType {
            value_type: false,
            reference: index.into(),
        })
    }

    /// A `VALUETYPE` reference.
    #[must_use]
    pub fn value_type(index: TypeDefOrRef) -> Self {
        Self::TypeDefOrRef(NamedType {
            value_type: true,
            reference: index.into(),
        })
    }

    /// A single-dimensional array without custom modifiers.
    #[must_use]
    pub fn sz_array(element: TypeSig) -> Self {
        Self::SzArray(Box::new(TypeWithMods::new(element)))
    }

    /// Check whether this is one of the marker pseudo-types.
    #[must_use]
    pub const fn is_pseudo(&self) -> bool {
        matches!(self, Self::Pinned | Self::Sentinel | Self::CustomMod(_))
    }

    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Pinned => "pinned",
            Self::Sentinel => "sentinel",
            Self::CustomMod(_) => "custom modifier",
            Self::Primitive(kind) => kind.name(),
            Self::Ptr(_) => "pointer",
            Self::ByRef(_) => "byref",
            Self::SzArray(_) | Self::Array(_) => "array",
            Self::TypeDefOrRef(NamedType {
                value_type: true, ..
            }) => "valuetype",
            Self::TypeDefOrRef(_) => "class",
            Self::Var(_) | Self::MVar(_) => "generic parameter",
            Self::GenericInst { .. } => "generic instantiation",
            Self::FnPtr(_) => "function pointer",
        }
    }

    /// Decode one element, including pseudo-types.
    ///
    /// Returns `None` for the `END` tag.
    pub fn parse_any(reader: &mut Reader<'_>) -> Result<Option<Self>> {
        reader.nested(Self::read_element)
    }

    /// Decode a type, rejecting pseudo-types and `END`.
    pub fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let start = reader.position();
        match Self::parse_any(reader)? {
            Some(sig) if !sig.is_pseudo() => Ok(sig),
            Some(_) => Err(Error::malformed(start, "pseudo-type where a type is required")),
            None => Err(Error::malformed(start, "end marker where a type is required")),
        }
    }

    /// Decode a type that spans the whole blob (a `TypeSpec`).
    pub fn parse_blob(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let sig = Self::parse(&mut reader)?;
        reader.expect_end()?;
        Ok(sig)
    }

    fn read_element(reader: &mut Reader<'_>) -> Result<Option<Self>> {
        let start = reader.position();
        let value = reader.read_compressed_uint()?;
        let tag = ElementType::from_u32(value)
            .ok_or(Error::malformed(start, "unknown element type"))?;
        if tag.is_custom_attribute_tag() {
            return Err(Error::malformed(
                start,
                "custom attribute tag in a type signature",
            ));
        }
        if let Some(kind) = PrimitiveKind::from_element_type(tag) {
            return Ok(Some(Self::Primitive(kind)));
        }

        let sig = match tag {
            ElementType::End => return Ok(None),
            ElementType::Pinned => Self::Pinned,
            ElementType::Sentinel => Self::Sentinel,
            ElementType::CModReqd | ElementType::CModOpt => Self::CustomMod(CustomMod {
                required: tag == ElementType::CModReqd,
                modifier: TypeDefOrRef::parse(reader)?.into(),
            }),
            ElementType::Ptr => Self::Ptr(Box::new(TypeWithMods::parse(reader)?)),
            ElementType::ByRef => Self::ByRef(Box::new(Self::parse(reader)?)),
            ElementType::SzArray => Self::SzArray(Box::new(TypeWithMods::parse(reader)?)),
            ElementType::Array => Self::Array(ArrayShape::parse(reader)?),
            ElementType::ValueType | ElementType::Class => Self::TypeDefOrRef(NamedType {
                value_type: tag == ElementType::ValueType,
                reference: TypeDefOrRef::parse(reader)?.into(),
            }),
            ElementType::Var => Self::Var(reader.read_compressed_uint()?),
            ElementType::MVar => Self::MVar(reader.read_compressed_uint()?),
            ElementType::GenericInst => {
                let applicand_at = reader.position();
                let applicand = match Self::parse(reader)? {
                    Self::TypeDefOrRef(named) => named,
                    _ => {
                        return Err(Error::malformed(
                            applicand_at,
                            "generic instantiation of a non-class type",
                        ));
                    }
                };
                let count = reader.read_compressed_uint()? as usize;
                let mut args = Vec::with_capacity(count.min(reader.remaining()));
                for _ in 0..count {
                    args.push(Self::parse(reader)?);
                }
                Self::GenericInst { applicand, args }
            }
            ElementType::FnPtr => Self::FnPtr(Box::new(MethodSig::parse(reader)?)),
            _ => return Err(Error::malformed(start, "reserved element type")),
        };
        Ok(Some(sig))
    }

    /// Encode this element, pseudo-types included.
    pub fn write_to(&self, writer: &mut Writer) -> Result<()> {
        match self {
            Self::Pinned => writer.write_u8(ElementType::Pinned as u8),
            Self::Sentinel => writer.write_u8(ElementType::Sentinel as u8),
            Self::CustomMod(custom_mod) => custom_mod.write_to(writer)?,
            Self::Primitive(kind) => writer.write_u8(kind.element_type() as u8),
            Self::Ptr(pointee) => {
                writer.write_u8(ElementType::Ptr as u8);
                pointee.write_to(writer)?;
            }
            Self::ByRef(inner) => {
                writer.write_u8(ElementType::ByRef as u8);
                inner.write_real(writer)?;
            }
            Self::SzArray(element) => {
                writer.write_u8(ElementType::SzArray as u8);
                element.write_to(writer)?;
            }
            Self::Array(shape) => {
                writer.write_u8(ElementType::Array as u8);
                shape.write_to(writer)?;
            }
            Self::TypeDefOrRef(named) => named.write_to(writer)?,
            Self::Var(index) => {
                writer.write_u8(ElementType::Var as u8);
                writer.write_compressed_uint(*index)?;
            }
            Self::MVar(index) => {
                writer.write_u8(ElementType::MVar as u8);
                writer.write_compressed_uint(*index)?;
            }
            Self::GenericInst { applicand, args } => {
                writer.write_u8(ElementType::GenericInst as u8);
                applicand.write_to(writer)?;
                writer.write_compressed_len("generic argument", args.len())?;
                for arg in args {
                    arg.write_real(writer)?;
                }
            }
            Self::FnPtr(method) => {
                writer.write_u8(ElementType::FnPtr as u8);
                method.write_to(writer)?;
            }
        }
        Ok(())
    }

    /// Encode this type where a real (non-pseudo) type is required.
    pub(crate) fn write_real(&self, writer: &mut Writer) -> Result<()> {
        if self.is_pseudo() {
            return Err(writer.malformed("pseudo-type where a type is required"));
        }
        self.write_to(writer)
    }

    /// Encode this type into a fresh blob.
    pub fn write(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new();
        self.write_real(&mut writer)?;
        Ok(writer.into_inner())
    }

    /// Size in bytes of a value of this type.
    ///
    /// Fixed-width primitives report their width and reference types report
    /// zero. A value type reports the size from its explicit layout record,
    /// which requires the reference to have been resolved. Everything else
    /// fails with [`Error::SizeUnknown`].
    pub fn byte_size(&self, layouts: &dyn LayoutProvider) -> Result<u32> {
        match self {
            Self::Primitive(kind) => kind.byte_size(),
            Self::TypeDefOrRef(NamedType {
                value_type: false, ..
            }) => Ok(0),
            Self::TypeDefOrRef(NamedType {
                value_type: true,
                reference,
            }) => reference
                .bound
                .and_then(|entity| layouts.explicit_size(entity))
                .ok_or(Error::SizeUnknown("valuetype without explicit layout")),
            other => Err(Error::SizeUnknown(other.kind_name())),
        }
    }
}

impl References for TypeSig {
    fn visit_references(
        &mut self,
        f: &mut dyn FnMut(&mut TypeReference) -> Result<()>,
    ) -> Result<()> {
        match self {
            Self::Pinned
            | Self::Sentinel
            | Self::Primitive(_)
            | Self::Var(_)
            | Self::MVar(_) => Ok(()),
            Self::CustomMod(custom_mod) => f(&mut custom_mod.modifier),
            Self::Ptr(inner) | Self::SzArray(inner) => inner.visit_references(f),
            Self::ByRef(inner) => inner.visit_references(f),
            Self::Array(shape) => shape.element.visit_references(f),
            Self::TypeDefOrRef(named) => f(&mut named.reference),
            Self::GenericInst { applicand, args } => {
                f(&mut applicand.reference)?;
                args.visit_references(f)
            }
            Self::FnPtr(method) => method.visit_references(f),
        }
    }
}

/// A type preceded by zero or more custom modifiers.
///
/// Used for return types, parameters, fields, pointees and array elements.
/// Modifier order is part of the encoding and is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeWithMods {
    /// Modifiers in blob order.
    pub custom_mods: Vec<CustomMod>,
    /// The modified type.
    pub ty: TypeSig,
}

impl TypeWithMods {
    /// A type without modifiers.
    #[must_use]
    pub fn new(ty: TypeSig) -> Self {
        Self {
            custom_mods: Vec::new(),
            ty,
        }
    }

    /// Decode modifiers followed by a real type.
    pub fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        Self::read(reader, false)
    }

    /// Decode modifiers followed by a real type, or a sentinel marker when
    /// `allow_sentinel` is set.
    pub(crate) fn read(reader: &mut Reader<'_>, allow_sentinel: bool) -> Result<Self> {
        let mut custom_mods = Vec::new();
        loop {
            let start = reader.position();
            match TypeSig::parse_any(reader)? {
                Some(TypeSig::CustomMod(custom_mod)) => custom_mods.push(custom_mod),
                Some(TypeSig::Sentinel) if allow_sentinel => {
                    return Ok(Self {
                        custom_mods,
                        ty: TypeSig::Sentinel,
                    });
                }
                Some(ty) if !ty.is_pseudo() => return Ok(Self { custom_mods, ty }),
                Some(_) => {
                    return Err(Error::malformed(
                        start,
                        "pseudo-type where a type is required",
                    ));
                }
                None => {
                    return Err(Error::malformed(
                        start,
                        "end marker where a type is required",
                    ));
                }
            }
        }
    }

    /// Encode the modifiers, then the type.
    pub fn write_to(&self, writer: &mut Writer) -> Result<()> {
        for custom_mod in &self.custom_mods {
            custom_mod.write_to(writer)?;
        }
        self.ty.write_real(writer)
    }
}

impl From<TypeSig> for TypeWithMods {
    fn from(ty: TypeSig) -> Self {
        Self::new(ty)
    }
}

impl References for TypeWithMods {
    fn visit_references(
        &mut self,
        f: &mut dyn FnMut(&mut TypeReference) -> Result<()>,
    ) -> Result<()> {
        for custom_mod in &mut self.custom_mods {
            f(&mut custom_mod.modifier)?;
        }
        self.ty.visit_references(f)
    }
}

/// One entry of a local variable signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    /// Modifiers in blob order.
    pub custom_mods: Vec<CustomMod>,
    /// Position of the `PINNED` constraint among the custom modifiers
    /// (`custom_mods.len()` when it follows all of them).
    pub pinned: Option<usize>,
    /// The local's type.
    pub ty: TypeSig,
}

impl LocalVariable {
    /// An unpinned local without modifiers.
    #[must_use]
    pub fn new(ty: TypeSig) -> Self {
        Self {
            custom_mods: Vec::new(),
            pinned: None,
            ty,
        }
    }

    /// A pinned local without modifiers.
    #[must_use]
    pub fn pinned(ty: TypeSig) -> Self {
        Self {
            custom_mods: Vec::new(),
            pinned: Some(0),
            ty,
        }
    }

    /// Check whether the local is pinned.
    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }

    /// Decode modifiers and an optional pinned marker, in any order, then
    /// the local's type.
    pub fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let mut custom_mods = Vec::new();
        let mut pinned = None;
        loop {
            let start = reader.position();
            match TypeSig::parse_any(reader)? {
                Some(TypeSig::CustomMod(custom_mod)) => custom_mods.push(custom_mod),
                Some(TypeSig::Pinned) => {
                    if pinned.is_some() {
                        return Err(Error::malformed(start, "local pinned twice"));
                    }
                    pinned = Some(custom_mods.len());
                }
                Some(ty) if !ty.is_pseudo() => {
                    return Ok(Self {
                        custom_mods,
                        pinned,
                        ty,
                    });
                }
                Some(_) => return Err(Error::malformed(start, "sentinel in a local signature")),
                None => {
                    return Err(Error::malformed(
                        start,
                        "end marker where a type is required",
                    ));
                }
            }
        }
    }

    /// Encode modifiers with the pinned marker at its recorded position,
    /// then the type.
    pub fn write_to(&self, writer: &mut Writer) -> Result<()> {
        if self.pinned.is_some_and(|at| at > self.custom_mods.len()) {
            return Err(writer.malformed("pinned position past the custom modifiers"));
        }
        for (i, custom_mod) in self.custom_mods.iter().enumerate() {
            if self.pinned == Some(i) {
                TypeSig::Pinned.write_to(writer)?;
            }
            custom_mod.write_to(writer)?;
        }
        if self.pinned == Some(self.custom_mods.len()) {
            TypeSig::Pinned.write_to(writer)?;
        }
        self.ty.write_real(writer)
    }
}

impl References for LocalVariable {
    fn visit_references(
        &mut self,
        f: &mut dyn FnMut(&mut TypeReference) -> Result<()>,
    ) -> Result<()> {
        for custom_mod in &mut self.custom_mods {
            f(&mut custom_mod.modifier)?;
        }
        self.ty.visit_references(f)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::resolve::EntityId;
    use crate::resolve::tests::TableContext;
    use crate::tables::TableId;

    fn type_ref(row: u32) -> TypeDefOrRef {
        TypeDefOrRef::new(TableId::TypeRef, row)
    }

    fn round_trip(blob: &[u8]) -> TypeSig {
        let sig = TypeSig::parse_blob(blob).unwrap();
        assert_eq!(sig.write().unwrap(), blob);
        sig
    }

    #[test]
    fn test_sz_array_of_int32() {
        let sig = round_trip(&[0x1D, 0x08]);
        assert_eq!(sig, TypeSig::sz_array(TypeSig::Primitive(PrimitiveKind::I4)));
    }

    #[test]
    fn test_pointer_with_custom_mods() {
        // ptr modopt(TypeRef 1) modreq(TypeRef 2) void
        let sig = round_trip(&[0x0F, 0x20, 0x05, 0x1F, 0x09, 0x01]);
        let TypeSig::Ptr(pointee) = sig else {
            panic!("expected pointer, got {sig:?}");
        };
        assert_eq!(
            pointee.custom_mods,
            vec![
                CustomMod::new(false, type_ref(1)),
                CustomMod::new(true, type_ref(2))
            ]
        );
        assert_eq!(pointee.ty, TypeSig::Primitive(PrimitiveKind::Void));
    }

    #[test]
    fn test_multi_dim_array() {
        // int32[-3..., 0...4] : rank 2, one size, two lower bounds
        let sig = round_trip(&[0x14, 0x08, 0x02, 0x01, 0x04, 0x02, 0x7B, 0x00]);
        assert_eq!(
            sig,
            TypeSig::Array(ArrayShape {
                element: Box::new(TypeSig::Primitive(PrimitiveKind::I4)),
                rank: 2,
                sizes: vec![4],
                lo_bounds: vec![-3, 0],
            })
        );
    }

    #[test]
    fn test_generic_instantiation() {
        // List<!0, string> where List is TypeRef 3
        let sig = round_trip(&[0x15, 0x12, 0x0D, 0x02, 0x13, 0x00, 0x0E]);
        assert_eq!(
            sig,
            TypeSig::GenericInst {
                applicand: NamedType {
                    value_type: false,
                    reference: type_ref(3).into(),
                },
                args: vec![
                    TypeSig::Var(0),
                    TypeSig::Primitive(PrimitiveKind::String)
                ],
            }
        );
    }

    #[test]
    fn test_generic_instantiation_requires_named_applicand() {
        let err = TypeSig::parse_blob(&[0x15, 0x08, 0x01, 0x08]).unwrap_err();
        assert!(matches!(err, Error::MalformedSignature { offset: 1, .. }));
    }

    #[test]
    fn test_function_pointer() {
        // method explicit int32(int32)
        let sig = round_trip(&[0x1B, 0x00, 0x01, 0x08, 0x08]);
        let TypeSig::FnPtr(method) = sig else {
            panic!("expected function pointer");
        };
        assert_eq!(method.params.len(), 1);
    }

    #[test]
    fn test_array_lower_bounds_at_width_edges() {
        // int32[-8192...] : the two-byte payload of -8192 is 0x0001.
        let sig = round_trip(&[0x14, 0x08, 0x01, 0x00, 0x01, 0x80, 0x01]);
        let TypeSig::Array(shape) = &sig else {
            panic!("expected an array, got {sig:?}");
        };
        assert_eq!(shape.lo_bounds, vec![-8192]);

        for bound in [-64, -65, -8192, -8129, -8193, -0x1000_0000] {
            let sig = TypeSig::Array(ArrayShape {
                element: Box::new(TypeSig::Primitive(PrimitiveKind::I4)),
                rank: 1,
                sizes: Vec::new(),
                lo_bounds: vec![bound],
            });
            let blob = sig.write().unwrap();
            assert_eq!(TypeSig::parse_blob(&blob).unwrap(), sig, "{bound}");
        }
    }

    #[test]
    fn test_non_canonical_integers_rejected() {
        // I4 tag written in two bytes.
        assert!(matches!(
            TypeSig::parse_blob(&[0x80, 0x08]),
            Err(Error::MalformedSignature { offset: 0, .. })
        ));
        // class with TypeDefOrRef index 5 written in two bytes.
        assert!(matches!(
            TypeSig::parse_blob(&[0x12, 0x80, 0x05]),
            Err(Error::MalformedSignature { offset: 1, .. })
        ));
        // Lower bound -1 written in two bytes.
        assert!(matches!(
            TypeSig::parse_blob(&[0x14, 0x08, 0x01, 0x00, 0x01, 0xBF, 0xFF]),
            Err(Error::MalformedSignature { offset: 5, .. })
        ));
    }

    #[test]
    fn test_end_yields_no_type() {
        let mut reader = Reader::new(&[0x00]);
        assert_eq!(TypeSig::parse_any(&mut reader).unwrap(), None);
        assert!(TypeSig::parse_blob(&[0x00]).is_err());
    }

    #[test]
    fn test_custom_attribute_tags_rejected() {
        for tag in [0x51, 0x53, 0x54, 0x55] {
            assert!(
                matches!(
                    TypeSig::parse_blob(&[tag]),
                    Err(Error::MalformedSignature { offset: 0, .. })
                ),
                "tag {tag:#x}"
            );
        }
    }

    #[test]
    fn test_reserved_tags_rejected() {
        for tag in [0x17, 0x1A, 0x21, 0x40, 0x7F] {
            assert!(TypeSig::parse_blob(&[tag]).is_err(), "tag {tag:#x}");
        }
    }

    #[test]
    fn test_pseudo_types_do_not_leak() {
        // szarray pinned int32
        assert!(TypeSig::parse_blob(&[0x1D, 0x45, 0x08]).is_err());
        // byref sentinel
        assert!(TypeSig::parse_blob(&[0x10, 0x41]).is_err());
        // A bare custom modifier with nothing after it.
        assert!(TypeSig::parse_blob(&[0x20, 0x05]).is_err());

        let mut writer = Writer::new();
        assert!(TypeSig::ByRef(Box::new(TypeSig::Sentinel))
            .write_to(&mut writer)
            .is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        assert!(matches!(
            TypeSig::parse_blob(&[0x08, 0x08]),
            Err(Error::MalformedSignature { offset: 1, .. })
        ));
    }

    #[test]
    fn test_recursion_limit() {
        let mut blob = vec![0x0F; 200];
        blob.push(0x08);
        assert!(matches!(
            TypeSig::parse_blob(&blob),
            Err(Error::RecursionLimit(Reader::DEFAULT_MAX_DEPTH))
        ));

        let mut reader = Reader::with_max_depth(&blob, 256);
        assert!(TypeSig::parse(&mut reader).is_ok());
    }

    #[test]
    fn test_local_variable_pinned_between_mods() {
        let blob = [0x20, 0x05, 0x45, 0x1F, 0x09, 0x10, 0x08];
        let mut reader = Reader::new(&blob);
        let local = LocalVariable::parse(&mut reader).unwrap();
        assert!(local.is_pinned());
        assert_eq!(local.pinned, Some(1));
        assert_eq!(local.custom_mods.len(), 2);

        let mut writer = Writer::new();
        local.write_to(&mut writer).unwrap();
        assert_eq!(writer.as_slice(), &blob);
    }

    #[test]
    fn test_local_variable_pinned_twice() {
        let mut reader = Reader::new(&[0x45, 0x45, 0x08]);
        assert!(LocalVariable::parse(&mut reader).is_err());
    }

    #[test]
    fn test_byte_size() {
        let layouts = TableContext::default().with_size(5, 24);

        assert_eq!(
            TypeSig::Primitive(PrimitiveKind::U8)
                .byte_size(&layouts)
                .unwrap(),
            8
        );
        assert_eq!(TypeSig::class(type_ref(1)).byte_size(&layouts).unwrap(), 0);

        let mut value_type = TypeSig::value_type(type_ref(2));
        assert!(value_type.byte_size(&layouts).is_err());
        if let TypeSig::TypeDefOrRef(named) = &mut value_type {
            named.reference.bound = Some(EntityId(5));
        }
        assert_eq!(value_type.byte_size(&layouts).unwrap(), 24);

        for sig in [
            TypeSig::Var(0),
            TypeSig::MVar(1),
            TypeSig::Sentinel,
            TypeSig::sz_array(TypeSig::Primitive(PrimitiveKind::I4)),
            TypeSig::Ptr(Box::new(TypeSig::Primitive(PrimitiveKind::I4).into())),
        ] {
            assert!(
                matches!(sig.byte_size(&()), Err(Error::SizeUnknown(_))),
                "{sig:?}"
            );
        }
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let a = type_ref(3);
        let b = TypeDefOrRef::new(TableId::TypeDef, 9);
        let ctx = TableContext::default().with(a, 1).with(b, 2);

        let mut sig = TypeSig::GenericInst {
            applicand: NamedType {
                value_type: false,
                reference: a.into(),
            },
            args: vec![TypeSig::value_type(b)],
        };
        sig.resolve_references(&ctx).unwrap();
        let once = sig.clone();
        sig.resolve_references(&ctx).unwrap();
        assert_eq!(sig, once);

        let mut bound = Vec::new();
        sig.visit_references(&mut |r| {
            bound.push(r.bound);
            Ok(())
        })
        .unwrap();
        assert_eq!(bound, vec![Some(EntityId(1)), Some(EntityId(2))]);
    }

    fn arb_index() -> impl Strategy<Value = TypeDefOrRef> {
        (
            prop_oneof![
                Just(TableId::TypeDef),
                Just(TableId::TypeRef),
                Just(TableId::TypeSpec)
            ],
            1u32..0x0100_0000,
        )
            .prop_map(|(table, row)| TypeDefOrRef::new(table, row))
    }

    fn arb_named() -> impl Strategy<Value = NamedType> {
        (any::<bool>(), arb_index()).prop_map(|(value_type, index)| NamedType {
            value_type,
            reference: index.into(),
        })
    }

    pub(crate) fn arb_mods() -> impl Strategy<Value = Vec<CustomMod>> {
        prop::collection::vec(
            (any::<bool>(), arb_index()).prop_map(|(required, index)| CustomMod::new(required, index)),
            0..3,
        )
    }

    /// Compressed integer widths change at these values.
    fn arb_lo_bound() -> impl Strategy<Value = i32> {
        prop_oneof![
            prop::sample::select(vec![
                -0x1000_0000,
                -8193,
                -8192,
                -8129,
                -65,
                -64,
                63,
                64,
                8191,
                8192,
                0x0FFF_FFFF,
            ]),
            -0x1000_0000i32..0x1000_0000,
        ]
    }

    fn arb_size() -> impl Strategy<Value = u32> {
        prop_oneof![
            prop::sample::select(vec![0x7F, 0x80, 0x3FFF, 0x4000, 0x1FFF_FFFF]),
            0u32..0x2000_0000,
        ]
    }

    pub(crate) fn arb_type() -> impl Strategy<Value = TypeSig> {
        let leaf = prop_oneof![
            prop::sample::select(vec![
                PrimitiveKind::Void,
                PrimitiveKind::Boolean,
                PrimitiveKind::Char,
                PrimitiveKind::I4,
                PrimitiveKind::U8,
                PrimitiveKind::R8,
                PrimitiveKind::IntPtr,
                PrimitiveKind::String,
                PrimitiveKind::Object,
                PrimitiveKind::TypedByRef,
            ])
            .prop_map(TypeSig::Primitive),
            arb_named().prop_map(TypeSig::TypeDefOrRef),
            (0u32..0x4000).prop_map(TypeSig::Var),
            (0u32..0x4000).prop_map(TypeSig::MVar),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                (arb_mods(), inner.clone())
                    .prop_map(|(custom_mods, ty)| TypeSig::Ptr(Box::new(TypeWithMods {
                        custom_mods,
                        ty
                    }))),
                (arb_mods(), inner.clone())
                    .prop_map(|(custom_mods, ty)| TypeSig::SzArray(Box::new(TypeWithMods {
                        custom_mods,
                        ty
                    }))),
                inner.clone().prop_map(|ty| TypeSig::ByRef(Box::new(ty))),
                (
                    inner.clone(),
                    1u32..8,
                    prop::collection::vec(arb_size(), 0..3),
                    prop::collection::vec(arb_lo_bound(), 0..3),
                )
                    .prop_map(|(element, rank, sizes, lo_bounds)| TypeSig::Array(ArrayShape {
                        element: Box::new(element),
                        rank,
                        sizes,
                        lo_bounds,
                    })),
                (arb_named(), prop::collection::vec(inner.clone(), 1..4))
                    .prop_map(|(applicand, args)| TypeSig::GenericInst { applicand, args }),
                (inner.clone(), prop::collection::vec(inner, 0..3)).prop_map(|(ret, params)| {
                    TypeSig::FnPtr(Box::new(MethodSig::new(
                        ret.into(),
                        params.into_iter().map(TypeWithMods::from).collect(),
                    )))
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn test_encoded_types_decode_to_the_same_tree(sig in arb_type()) {
            let blob = sig.write().unwrap();
            let decoded = TypeSig::parse_blob(&blob).unwrap();
            prop_assert_eq!(&decoded, &sig);
            prop_assert_eq!(decoded.write().unwrap(), blob);
        }
    }
}
