//! Metadata table identities referenced from inside signature blobs.

mod coded_index;
mod table_id;

pub use coded_index::TypeDefOrRef;
pub use table_id::TableId;
