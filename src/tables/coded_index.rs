//! The `TypeDefOrRef` coded index as it appears inside signatures.

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::tables::TableId;
use crate::writer::Writer;

/// A `TypeDefOrRef` coded index (ECMA-335 II.23.2.8).
///
/// Inside a signature the index is stored as a compressed integer whose two
/// low bits select the table and whose remaining bits hold the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDefOrRef {
    /// The table this index refers to.
    pub table: TableId,
    /// The row index (1-based).
    pub row: u32,
}

impl TypeDefOrRef {
    const TAG_BITS: u32 = 2;
    const TABLES: [TableId; 3] = [TableId::TypeDef, TableId::TypeRef, TableId::TypeSpec];

    /// Create a coded index for a row.
    #[must_use]
    pub const fn new(table: TableId, row: u32) -> Self {
        Self { table, row }
    }

    /// Decode a coded index value.
    pub fn decode(value: u32) -> Option<Self> {
        let tag = (value & ((1 << Self::TAG_BITS) - 1)) as usize;
        let table = *Self::TABLES.get(tag)?;
        Some(Self {
            table,
            row: value >> Self::TAG_BITS,
        })
    }

    /// Encode this coded index to a value.
    #[must_use]
    pub fn encode(&self) -> u32 {
        let tag = match self.table {
            TableId::TypeDef => 0,
            TableId::TypeRef => 1,
            TableId::TypeSpec => 2,
        };
        (self.row << Self::TAG_BITS) | tag
    }

    /// Read a compressed coded index from a signature.
    pub fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let start = reader.position();
        let value = reader.read_compressed_uint()?;
        Self::decode(value).ok_or(Error::malformed(start, "invalid TypeDefOrRef tag"))
    }

    /// Write this coded index in compressed form.
    pub fn write_to(&self, writer: &mut Writer) -> Result<()> {
        if self.row > 0x07FF_FFFF {
            return Err(Error::CompressedIntOutOfRange(i64::from(self.row)));
        }
        writer.write_compressed_uint(self.encode())
    }
}
