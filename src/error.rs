//! Error types for clrsig.

use thiserror::Error;

use crate::tables::TableId;

/// Result type alias for clrsig operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding or encoding a signature blob.
#[derive(Debug, Error)]
pub enum Error {
    /// Unexpected end of data while reading.
    #[error("unexpected end of data at offset {offset}, needed {needed} bytes")]
    UnexpectedEof {
        /// Offset where the read was attempted.
        offset: usize,
        /// Number of bytes needed.
        needed: usize,
    },

    /// Invalid compressed integer encoding.
    #[error("invalid compressed integer at offset {0}")]
    InvalidCompressedInt(usize),

    /// Invalid UTF-8 in a serialized string.
    #[error("invalid UTF-8 string at offset {0}")]
    InvalidString(usize),

    /// The blob violates the signature grammar.
    #[error("malformed signature at offset {offset}: {reason}")]
    MalformedSignature {
        /// Offset into the blob (or the sink, when encoding).
        offset: usize,
        /// What was wrong.
        reason: &'static str,
    },

    /// The value has no portable encoding inside a custom attribute blob.
    #[error("unsupported custom attribute value: {0}")]
    UnsupportedValue(&'static str),

    /// The type has no statically known size.
    #[error("size of {0} is not known")]
    SizeUnknown(&'static str),

    /// An enum type name could not be resolved to an enum.
    #[error("type name `{0}` does not resolve to an enum")]
    UnresolvedTypeName(String),

    /// A cross-table reference could not be bound.
    #[error("unresolved reference to {table:?} row {row}")]
    UnresolvedReference {
        /// Target table.
        table: TableId,
        /// Row index (1-based).
        row: u32,
    },

    /// Nesting exceeded the configured depth limit.
    #[error("signature nesting exceeds the limit of {0}")]
    RecursionLimit(usize),

    /// The value does not fit the compressed integer encoding.
    #[error("value {0} cannot be written as a compressed integer")]
    CompressedIntOutOfRange(i64),

    /// A collection is too large for its length prefix.
    #[error("{what} count {count} exceeds its length prefix")]
    CountOutOfRange {
        /// What was being counted.
        what: &'static str,
        /// The offending count.
        count: usize,
    },
}

impl Error {
    pub(crate) const fn malformed(offset: usize, reason: &'static str) -> Self {
        Self::MalformedSignature { offset, reason }
    }
}
