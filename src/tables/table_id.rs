//! Metadata table identifiers.

/// Metadata tables a signature can point into (ECMA-335 II.22).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TableId {
    TypeRef = 0x01,
    TypeDef = 0x02,
    TypeSpec = 0x1B,
}

impl TableId {
    /// Get the table name as it appears in ECMA-335.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TypeRef => "TypeRef",
            Self::TypeDef => "TypeDef",
            Self::TypeSpec => "TypeSpec",
        }
    }
}
