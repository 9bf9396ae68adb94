//! Deferred cross-table references and the contexts that bind them.
//!
//! Decoding never looks outside the blob: a class or value type named by a
//! signature is kept as a [`TypeReference`] holding only its coded index.
//! A later pass walks the finished tree with a [`ResolutionContext`] and
//! records the bound [`EntityId`] next to each index. Before encoding, the
//! inverse pass re-derives indexes from bound entities, so a tree whose
//! entities were renumbered still writes correct tokens.

use crate::error::Result;
use crate::tables::TypeDefOrRef;

/// Opaque handle to an entity owned by the resolution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// A cross-table reference found inside a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeReference {
    /// The coded index as read from (or to be written to) the blob.
    pub index: TypeDefOrRef,
    /// The entity bound by the last resolution pass.
    pub bound: Option<EntityId>,
}

impl TypeReference {
    /// Create an unresolved reference.
    #[must_use]
    pub const fn new(index: TypeDefOrRef) -> Self {
        Self { index, bound: None }
    }

    /// Check whether a resolution pass has bound this reference.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.bound.is_some()
    }
}

impl From<TypeDefOrRef> for TypeReference {
    fn from(index: TypeDefOrRef) -> Self {
        Self::new(index)
    }
}

/// Binds coded indexes to entities and back.
///
/// Implementations must be pure functions of their input: the same index
/// always resolves to the same entity.
pub trait ResolutionContext {
    /// Bind a coded index to its entity.
    fn resolve(&self, index: TypeDefOrRef) -> Result<EntityId>;

    /// Re-derive the coded index for a bound entity.
    fn persist(&self, entity: EntityId) -> Result<TypeDefOrRef>;
}

/// Explicit-layout size records for value types.
pub trait LayoutProvider {
    /// Size in bytes from the entity's explicit layout record, if it has one.
    fn explicit_size(&self, entity: EntityId) -> Option<u32>;
}

/// No layout records at all.
impl LayoutProvider for () {
    fn explicit_size(&self, _entity: EntityId) -> Option<u32> {
        None
    }
}

/// A signature tree that contains cross-table references.
pub trait References {
    /// Visit every reference in the tree, in encoding order.
    fn visit_references(
        &mut self,
        f: &mut dyn FnMut(&mut TypeReference) -> Result<()>,
    ) -> Result<()>;

    /// Bind every reference through `ctx`.
    ///
    /// Running the pass again re-binds each reference from its index and
    /// yields the same entities.
    fn resolve_references(&mut self, ctx: &dyn ResolutionContext) -> Result<()> {
        self.visit_references(&mut |reference| {
            reference.bound = Some(ctx.resolve(reference.index)?);
            Ok(())
        })
    }

    /// Refresh the coded index of every bound reference through `ctx`.
    ///
    /// Unbound references keep the index they already carry.
    fn persist_references(&mut self, ctx: &dyn ResolutionContext) -> Result<()> {
        self.visit_references(&mut |reference| {
            if let Some(entity) = reference.bound {
                reference.index = ctx.persist(entity)?;
            }
            Ok(())
        })
    }
}

impl References for TypeReference {
    fn visit_references(
        &mut self,
        f: &mut dyn FnMut(&mut TypeReference) -> Result<()>,
    ) -> Result<()> {
        f(self)
    }
}

impl<T: References> References for Vec<T> {
    fn visit_references(
        &mut self,
        f: &mut dyn FnMut(&mut TypeReference) -> Result<()>,
    ) -> Result<()> {
        self.iter_mut().try_for_each(|item| item.visit_references(&mut *f))
    }
}
