//! The custom attribute blob: prolog, fixed arguments, named arguments.

use log::{debug, trace};

use crate::custom_attribute::{CaType, CaValue, TypeNameResolver};
use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::signature::ElementType;
use crate::writer::Writer;

const PROLOG: u16 = 0x0001;

/// What a named argument assigns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NamedArgKind {
    /// `FIELD` marker (`0x53`).
    Field = ElementType::Field as u8,
    /// `PROPERTY` marker (`0x54`).
    Property = ElementType::Property as u8,
}

/// A field or property assignment following the fixed arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArg {
    pub kind: NamedArgKind,
    /// Field or property name; never null.
    pub name: String,
    /// Declared type, serialized in front of the name.
    pub ty: CaType,
    pub value: CaValue,
}

impl NamedArg {
    /// Decode one named argument.
    pub fn parse(reader: &mut Reader<'_>, resolver: &dyn TypeNameResolver) -> Result<Self> {
        let at = reader.position();
        let kind = match reader.read_u8()? {
            tag if tag == NamedArgKind::Field as u8 => NamedArgKind::Field,
            tag if tag == NamedArgKind::Property as u8 => NamedArgKind::Property,
            _ => return Err(Error::malformed(at, "expected a field or property marker")),
        };
        let ty = CaType::parse(reader, resolver)?;
        let name_at = reader.position();
        let name = reader
            .read_ser_string()?
            .ok_or(Error::malformed(name_at, "null named argument name"))?;
        let value = CaValue::parse(&ty, reader, resolver)?;
        Ok(Self {
            kind,
            name,
            ty,
            value,
        })
    }

    /// Encode the marker, type, name and value.
    pub fn write_to(&self, writer: &mut Writer) -> Result<()> {
        writer.write_u8(self.kind as u8);
        self.ty.write_to(writer)?;
        writer.write_ser_string(Some(&self.name))?;
        self.value.write_to(&self.ty, writer)
    }
}

/// A decoded custom attribute blob.
///
/// Named arguments keep their blob order; names are unique per kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomAttributeSig {
    /// Constructor arguments, in declaration order.
    pub fixed_args: Vec<CaValue>,
    named_args: Vec<NamedArg>,
}

impl CustomAttributeSig {
    /// A signature with the given fixed arguments and no named ones.
    #[must_use]
    pub fn new(fixed_args: Vec<CaValue>) -> Self {
        Self {
            fixed_args,
            named_args: Vec::new(),
        }
    }

    /// Decode a custom attribute whose constructor takes `fixed_types`.
    ///
    /// An empty blob is accepted when the constructor takes no arguments.
    pub fn parse(
        fixed_types: &[CaType],
        reader: &mut Reader<'_>,
        resolver: &dyn TypeNameResolver,
    ) -> Result<Self> {
        trace!(
            "decoding custom attribute with {} fixed arguments at offset {}",
            fixed_types.len(),
            reader.position()
        );
        if fixed_types.is_empty() && reader.is_empty() {
            return Ok(Self::default());
        }

        let at = reader.position();
        let prolog = reader.read_u16()?;
        if prolog != PROLOG {
            debug!("custom attribute prolog {prolog:#06x} at offset {at}");
            return Err(Error::malformed(at, "invalid custom attribute prolog"));
        }

        let mut sig = Self::new(Vec::with_capacity(fixed_types.len()));
        for ty in fixed_types {
            sig.fixed_args.push(CaValue::parse(ty, reader, resolver)?);
        }

        let count = reader.read_u16()?;
        for _ in 0..count {
            let start = reader.position();
            let arg = NamedArg::parse(reader, resolver)?;
            if let Err(arg) = sig.add_named_arg(arg) {
                debug!("duplicate named argument `{}` at offset {start}", arg.name);
                return Err(Error::malformed(start, "duplicate named argument"));
            }
        }
        Ok(sig)
    }

    /// Decode a custom attribute spanning the whole blob.
    pub fn parse_blob(
        fixed_types: &[CaType],
        data: &[u8],
        resolver: &dyn TypeNameResolver,
    ) -> Result<Self> {
        let mut reader = Reader::new(data);
        let sig = Self::parse(fixed_types, &mut reader, resolver)?;
        reader.expect_end()?;
        Ok(sig)
    }

    /// Encode against the constructor's `fixed_types`.
    ///
    /// Nothing at all is written when there are no arguments of either kind.
    pub fn write_to(&self, fixed_types: &[CaType], writer: &mut Writer) -> Result<()> {
        if self.fixed_args.len() != fixed_types.len() {
            return Err(writer.malformed("fixed argument count does not match the constructor"));
        }
        if self.fixed_args.is_empty() && self.named_args.is_empty() {
            return Ok(());
        }

        writer.write_u16(PROLOG);
        for (value, ty) in self.fixed_args.iter().zip(fixed_types) {
            value.write_to(ty, writer)?;
        }
        let count = u16::try_from(self.named_args.len()).map_err(|_| Error::CountOutOfRange {
            what: "named argument",
            count: self.named_args.len(),
        })?;
        writer.write_u16(count);
        for arg in &self.named_args {
            arg.write_to(writer)?;
        }
        Ok(())
    }

    /// Encode into a fresh blob.
    pub fn write(&self, fixed_types: &[CaType]) -> Result<Vec<u8>> {
        let mut writer = Writer::new();
        self.write_to(fixed_types, &mut writer)?;
        Ok(writer.into_inner())
    }

    /// Append a named argument, handing it back if its name is already
    /// taken for its kind.
    pub fn add_named_arg(&mut self, arg: NamedArg) -> std::result::Result<(), NamedArg> {
        if self.named(arg.kind, &arg.name).is_some() {
            return Err(arg);
        }
        self.named_args.push(arg);
        Ok(())
    }

    /// All named arguments, in blob order.
    #[must_use]
    pub fn named_args(&self) -> &[NamedArg] {
        &self.named_args
    }

    /// The field assignment called `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&NamedArg> {
        self.named(NamedArgKind::Field, name)
    }

    /// The property assignment called `name`.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&NamedArg> {
        self.named(NamedArgKind::Property, name)
    }

    /// Field assignments, in blob order.
    pub fn fields(&self) -> impl Iterator<Item = &NamedArg> {
        self.of_kind(NamedArgKind::Field)
    }

    /// Property assignments, in blob order.
    pub fn properties(&self) -> impl Iterator<Item = &NamedArg> {
        self.of_kind(NamedArgKind::Property)
    }

    fn named(&self, kind: NamedArgKind, name: &str) -> Option<&NamedArg> {
        self.of_kind(kind).find(|arg| arg.name == name)
    }

    fn of_kind(&self, kind: NamedArgKind) -> impl Iterator<Item = &NamedArg> {
        self.named_args.iter().filter(move |arg| arg.kind == kind)
    }
}
