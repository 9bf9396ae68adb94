//! Member signatures: methods, method instantiations, fields, properties and
//! local variable lists (ECMA-335 II.23.2.1 - II.23.2.6, II.23.2.15).

use bitflags::bitflags;
use log::{debug, trace};

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::resolve::{References, TypeReference};
use crate::signature::{ElementType, LocalVariable, TypeSig, TypeWithMods};
use crate::writer::Writer;

/// Low bits of the leading byte select the signature kind.
const KIND_MASK: u8 = 0x0F;
const FIELD: u8 = 0x06;
const LOCAL_SIG: u8 = 0x07;
const PROPERTY: u8 = 0x08;
const GENERIC_INST: u8 = 0x0A;

bitflags! {
    /// High bits of a signature's leading byte (ECMA-335 II.23.2.1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SigFlags: u8 {
        const GENERIC = 0x10;
        const HAS_THIS = 0x20;
        const EXPLICIT_THIS = 0x40;
    }
}

/// Calling convention of a method signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CallingConvention {
    #[default]
    Managed = 0x00,
    NativeC = 0x01,
    NativeStd = 0x02,
    NativeThis = 0x03,
    NativeFast = 0x04,
    ManagedVarArg = 0x05,
}

impl CallingConvention {
    fn from_kind(kind: u8) -> Option<Self> {
        match kind {
            0x00 => Some(Self::Managed),
            0x01 => Some(Self::NativeC),
            0x02 => Some(Self::NativeStd),
            0x03 => Some(Self::NativeThis),
            0x04 => Some(Self::NativeFast),
            0x05 => Some(Self::ManagedVarArg),
            _ => None,
        }
    }

    /// Check whether a sentinel may separate variable arguments.
    #[must_use]
    pub const fn allows_varargs(self) -> bool {
        matches!(self, Self::ManagedVarArg | Self::NativeC)
    }
}

fn read_tag(reader: &mut Reader<'_>, expected: u8, reason: &'static str) -> Result<()> {
    let at = reader.position();
    if reader.read_u8()? == expected {
        Ok(())
    } else {
        Err(Error::malformed(at, reason))
    }
}

fn read_count(reader: &mut Reader<'_>) -> Result<usize> {
    reader.read_compressed_uint().map(|count| count as usize)
}

/// Whether the generic arity still has to be read from the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arity {
    NotGeneric,
    Pending,
}

/// What the leading byte of a method signature says, before the rest of
/// the blob has been read.
#[derive(Debug, Clone, Copy)]
struct MethodHeader {
    is_static: bool,
    explicit_this: bool,
    convention: CallingConvention,
    arity: Arity,
}

impl MethodHeader {
    fn decode(tag: u8, at: usize) -> Result<Self> {
        let flags = SigFlags::from_bits(tag & !KIND_MASK)
            .ok_or(Error::malformed(at, "unknown signature flag bits"))?;
        let convention = CallingConvention::from_kind(tag & KIND_MASK)
            .ok_or(Error::malformed(at, "unknown calling convention"))?;
        let is_static = !flags.contains(SigFlags::HAS_THIS);
        if is_static && flags.contains(SigFlags::EXPLICIT_THIS) {
            return Err(Error::malformed(at, "explicit this on a static method"));
        }
        let arity = if flags.contains(SigFlags::GENERIC) {
            Arity::Pending
        } else {
            Arity::NotGeneric
        };
        Ok(Self {
            is_static,
            explicit_this: flags.contains(SigFlags::EXPLICIT_THIS),
            convention,
            arity,
        })
    }

    /// The arity follows the leading byte only for generic methods.
    fn read_arity(&self, reader: &mut Reader<'_>) -> Result<Option<u32>> {
        match self.arity {
            Arity::NotGeneric => Ok(None),
            Arity::Pending => reader.read_compressed_uint().map(Some),
        }
    }
}

/// A method signature (`MethodDefSig`, `MethodRefSig`, or the target of a
/// function pointer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub is_static: bool,
    /// The `this` pointer is passed explicitly as the first parameter.
    pub explicit_this: bool,
    pub calling_convention: CallingConvention,
    /// Number of generic parameters; `None` for non-generic methods.
    pub generic_arity: Option<u32>,
    pub return_type: TypeWithMods,
    /// Declared parameters, fixed ones first; the sentinel is not stored.
    pub params: Vec<TypeWithMods>,
    /// Number of trailing parameters after the sentinel.
    pub vararg_count: u32,
}

impl MethodSig {
    /// A static, managed, non-generic method.
    #[must_use]
    pub fn new(return_type: TypeWithMods, params: Vec<TypeWithMods>) -> Self {
        Self {
            is_static: true,
            explicit_this: false,
            calling_convention: CallingConvention::Managed,
            generic_arity: None,
            return_type,
            params,
            vararg_count: 0,
        }
    }

    /// Parameters before the sentinel.
    #[must_use]
    pub fn fixed_params(&self) -> &[TypeWithMods] {
        let fixed = self.params.len().saturating_sub(self.vararg_count as usize);
        &self.params[..fixed]
    }

    /// Parameters after the sentinel.
    #[must_use]
    pub fn vararg_params(&self) -> &[TypeWithMods] {
        &self.params[self.fixed_params().len()..]
    }

    /// Decode a method signature.
    ///
    /// Field, property, local and method instantiation kinds are rejected;
    /// use [`MemberSig::parse`] to accept any member signature.
    pub fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let at = reader.position();
        let tag = reader.read_u8()?;
        match tag & KIND_MASK {
            FIELD | LOCAL_SIG | PROPERTY | GENERIC_INST => {
                Err(Error::malformed(at, "not a method signature"))
            }
            _ => Self::read_body(reader, tag, at),
        }
    }

    /// Decode a method signature spanning the whole blob.
    pub fn parse_blob(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let sig = Self::parse(&mut reader)?;
        reader.expect_end()?;
        Ok(sig)
    }

    fn read_body(reader: &mut Reader<'_>, tag: u8, at: usize) -> Result<Self> {
        let header = MethodHeader::decode(tag, at)?;
        let generic_arity = header.read_arity(reader)?;
        let param_count = read_count(reader)?;
        let return_type = TypeWithMods::parse(reader)?;

        let mut params = Vec::with_capacity(param_count.min(reader.remaining()));
        let mut sentinel = None;
        while params.len() < param_count {
            let start = reader.position();
            let param = TypeWithMods::read(reader, true)?;
            if param.ty != TypeSig::Sentinel {
                params.push(param);
                continue;
            }
            if !header.convention.allows_varargs() {
                debug!("sentinel in a {:?} method signature", header.convention);
                return Err(Error::malformed(
                    start,
                    "sentinel outside a vararg signature",
                ));
            }
            if !param.custom_mods.is_empty() {
                return Err(Error::malformed(start, "custom modifiers before a sentinel"));
            }
            if sentinel.is_some() {
                debug!("second sentinel at offset {start}");
                return Err(Error::malformed(start, "duplicate sentinel"));
            }
            sentinel = Some(params.len());
        }

        let vararg_count = sentinel.map_or(0, |at| (param_count - at) as u32);
        Ok(Self {
            is_static: header.is_static,
            explicit_this: header.explicit_this,
            calling_convention: header.convention,
            generic_arity,
            return_type,
            params,
            vararg_count,
        })
    }

    /// The leading byte for this signature.
    #[must_use]
    pub fn tag(&self) -> u8 {
        let mut flags = SigFlags::empty();
        flags.set(SigFlags::GENERIC, self.generic_arity.is_some());
        flags.set(SigFlags::HAS_THIS, !self.is_static);
        flags.set(SigFlags::EXPLICIT_THIS, self.explicit_this);
        self.calling_convention as u8 | flags.bits()
    }

    /// Encode this signature, re-inserting the sentinel before the first
    /// variable argument.
    pub fn write_to(&self, writer: &mut Writer) -> Result<()> {
        let count = self.params.len();
        let varargs = self.vararg_count as usize;
        if self.is_static && self.explicit_this {
            return Err(writer.malformed("explicit this on a static method"));
        }
        if varargs > 0 && !self.calling_convention.allows_varargs() {
            return Err(writer.malformed("sentinel outside a vararg signature"));
        }
        if varargs > count {
            return Err(writer.malformed("more variable arguments than parameters"));
        }

        writer.write_u8(self.tag());
        if let Some(arity) = self.generic_arity {
            writer.write_compressed_uint(arity)?;
        }
        writer.write_compressed_len("parameter", count)?;
        self.return_type.write_to(writer)?;

        let sentinel_at = (varargs > 0).then(|| count - varargs);
        for (i, param) in self.params.iter().enumerate() {
            if sentinel_at == Some(i) {
                writer.write_u8(ElementType::Sentinel as u8);
            }
            param.write_to(writer)?;
        }
        Ok(())
    }

    /// Encode this signature into a fresh blob.
    pub fn write(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new();
        self.write_to(&mut writer)?;
        Ok(writer.into_inner())
    }
}

impl References for MethodSig {
    fn visit_references(
        &mut self,
        f: &mut dyn FnMut(&mut TypeReference) -> Result<()>,
    ) -> Result<()> {
        self.return_type.visit_references(f)?;
        self.params.visit_references(f)
    }
}

/// The type arguments of a generic method instantiation (`MethodSpec`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpecSig {
    /// Type arguments, in order.
    pub args: Vec<TypeSig>,
}

impl MethodSpecSig {
    /// Decode a method instantiation signature.
    pub fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        read_tag(reader, GENERIC_INST, "not a method instantiation signature")?;
        let count = read_count(reader)?;
        let mut args = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            args.push(TypeSig::parse(reader)?);
        }
        Ok(Self { args })
    }

    /// Decode a method instantiation spanning the whole blob.
    pub fn parse_blob(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let sig = Self::parse(&mut reader)?;
        reader.expect_end()?;
        Ok(sig)
    }

    /// Encode this method instantiation.
    pub fn write_to(&self, writer: &mut Writer) -> Result<()> {
        writer.write_u8(GENERIC_INST);
        writer.write_compressed_len("type argument", self.args.len())?;
        for arg in &self.args {
            arg.write_real(writer)?;
        }
        Ok(())
    }
}

impl References for MethodSpecSig {
    fn visit_references(
        &mut self,
        f: &mut dyn FnMut(&mut TypeReference) -> Result<()>,
    ) -> Result<()> {
        self.args.visit_references(f)
    }
}

/// A field signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSig {
    /// The field's type with its custom modifiers.
    pub field_type: TypeWithMods,
}

impl FieldSig {
    /// Decode a field signature.
    pub fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        read_tag(reader, FIELD, "not a field signature")?;
        Ok(Self {
            field_type: TypeWithMods::parse(reader)?,
        })
    }

    /// Decode a field signature spanning the whole blob.
    pub fn parse_blob(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let sig = Self::parse(&mut reader)?;
        reader.expect_end()?;
        Ok(sig)
    }

    /// Encode this field signature.
    pub fn write_to(&self, writer: &mut Writer) -> Result<()> {
        writer.write_u8(FIELD);
        self.field_type.write_to(writer)
    }
}

impl References for FieldSig {
    fn visit_references(
        &mut self,
        f: &mut dyn FnMut(&mut TypeReference) -> Result<()>,
    ) -> Result<()> {
        self.field_type.visit_references(f)
    }
}

/// A property signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySig {
    /// Clear when the leading byte carries `HAS_THIS`.
    pub is_static: bool,
    pub property_type: TypeWithMods,
    /// Index parameters.
    pub params: Vec<TypeWithMods>,
}

impl PropertySig {
    /// Decode a property signature.
    pub fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let at = reader.position();
        let tag = reader.read_u8()?;
        if tag & !SigFlags::HAS_THIS.bits() != PROPERTY {
            return Err(Error::malformed(at, "not a property signature"));
        }

        let param_count = read_count(reader)?;
        let property_type = TypeWithMods::parse(reader)?;
        let mut params = Vec::with_capacity(param_count.min(reader.remaining()));
        for _ in 0..param_count {
            params.push(TypeWithMods::parse(reader)?);
        }

        Ok(Self {
            is_static: tag & SigFlags::HAS_THIS.bits() == 0,
            property_type,
            params,
        })
    }

    /// Decode a property signature spanning the whole blob.
    pub fn parse_blob(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let sig = Self::parse(&mut reader)?;
        reader.expect_end()?;
        Ok(sig)
    }

    /// Encode this property signature.
    pub fn write_to(&self, writer: &mut Writer) -> Result<()> {
        let has_this = if self.is_static {
            0
        } else {
            SigFlags::HAS_THIS.bits()
        };
        writer.write_u8(PROPERTY | has_this);
        writer.write_compressed_len("parameter", self.params.len())?;
        self.property_type.write_to(writer)?;
        for param in &self.params {
            param.write_to(writer)?;
        }
        Ok(())
    }
}

impl References for PropertySig {
    fn visit_references(
        &mut self,
        f: &mut dyn FnMut(&mut TypeReference) -> Result<()>,
    ) -> Result<()> {
        self.property_type.visit_references(f)?;
        self.params.visit_references(f)
    }
}

/// A local variable signature (`StandAloneSig` for a method body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVarSig {
    /// Locals in slot order.
    pub locals: Vec<LocalVariable>,
}

impl LocalVarSig {
    /// Decode a local variable signature.
    pub fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        read_tag(reader, LOCAL_SIG, "not a local variable signature")?;
        let count = read_count(reader)?;
        let mut locals = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            locals.push(LocalVariable::parse(reader)?);
        }
        Ok(Self { locals })
    }

    /// Decode a local variable signature spanning the whole blob.
    pub fn parse_blob(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let sig = Self::parse(&mut reader)?;
        reader.expect_end()?;
        Ok(sig)
    }

    /// Encode this local variable signature.
    pub fn write_to(&self, writer: &mut Writer) -> Result<()> {
        writer.write_u8(LOCAL_SIG);
        writer.write_compressed_len("local", self.locals.len())?;
        for local in &self.locals {
            local.write_to(writer)?;
        }
        Ok(())
    }
}

impl References for LocalVarSig {
    fn visit_references(
        &mut self,
        f: &mut dyn FnMut(&mut TypeReference) -> Result<()>,
    ) -> Result<()> {
        self.locals.visit_references(f)
    }
}

/// Any member signature, selected by the kind bits of its leading byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberSig {
    Method(MethodSig),
    MethodSpec(MethodSpecSig),
    Field(FieldSig),
    Property(PropertySig),
    LocalVars(LocalVarSig),
}

impl MemberSig {
    /// Decode a member signature of any kind.
    pub fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let kind = reader.peek_u8()? & KIND_MASK;
        let sig = match kind {
            FIELD => {
                trace!("decoding field signature at offset {}", reader.position());
                Self::Field(FieldSig::parse(reader)?)
            }
            PROPERTY => {
                trace!("decoding property signature at offset {}", reader.position());
                Self::Property(PropertySig::parse(reader)?)
            }
            LOCAL_SIG => {
                trace!("decoding local signature at offset {}", reader.position());
                Self::LocalVars(LocalVarSig::parse(reader)?)
            }
            GENERIC_INST => {
                trace!("decoding method instantiation at offset {}", reader.position());
                Self::MethodSpec(MethodSpecSig::parse(reader)?)
            }
            _ => {
                trace!("decoding method signature at offset {}", reader.position());
                Self::Method(MethodSig::parse(reader)?)
            }
        };
        Ok(sig)
    }

    /// Decode a member signature spanning the whole blob.
    pub fn parse_blob(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let sig = Self::parse(&mut reader)?;
        reader.expect_end()?;
        Ok(sig)
    }

    /// Encode this signature with the leading byte of its kind.
    pub fn write_to(&self, writer: &mut Writer) -> Result<()> {
        match self {
            Self::Method(sig) => sig.write_to(writer),
            Self::MethodSpec(sig) => sig.write_to(writer),
            Self::Field(sig) => sig.write_to(writer),
            Self::Property(sig) => sig.write_to(writer),
            Self::LocalVars(sig) => sig.write_to(writer),
        }
    }

    /// Encode this signature into a fresh blob.
    pub fn write(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new();
        self.write_to(&mut writer)?;
        Ok(writer.into_inner())
    }
}

impl References for MemberSig {
    fn visit_references(
        &mut self,
        f: &mut dyn FnMut(&mut TypeReference) -> Result<()>,
    ) -> Result<()> {
        match self {
            Self::Method(sig) => sig.visit_references(f),
            Self::MethodSpec(sig) => sig.visit_references(f),
            Self::Field(sig) => sig.visit_references(f),
            Self::Property(sig) => sig.visit_references(f),
            Self::LocalVars(sig) => sig.visit_references(f),
        }
    }
}
