//! Custom attribute blobs (ECMA-335 II.23.3).
//!
//! Unlike type and member signatures, a custom attribute blob is not fully
//! self-describing: the types of the fixed arguments come from the
//! attribute constructor's signature, and enum arguments name their type
//! only by string. Callers supply the former as a slice of [`CaType`] and
//! the latter through a [`TypeNameResolver`].

mod signature;
mod value;

pub use signature::{CustomAttributeSig, NamedArg, NamedArgKind};
pub use value::{CaType, CaValue, EnumType};

/// Looks up the type a serialized type name refers to.
///
/// Decoding only accepts an answer of [`CaType::Enum`]; anything else, or
/// no answer, fails with [`crate::error::Error::UnresolvedTypeName`].
/// Implementations may be called repeatedly with the same name and must
/// answer the same way each time.
pub trait TypeNameResolver {
    fn resolve_by_name(&self, name: &str) -> Option<CaType>;
}

impl<F> TypeNameResolver for F
where
    F: Fn(&str) -> Option<CaType>,
{
    fn resolve_by_name(&self, name: &str) -> Option<CaType> {
        self(name)
    }
}
