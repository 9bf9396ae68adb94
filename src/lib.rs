//! # clrsig
//!
//! ECMA-335 CLI metadata signature codec with lossless read/write support.
//!
//! This crate decodes the signature blobs found in the `#Blob` heap of a
//! .NET assembly into typed trees and encodes those trees back to the exact
//! same bytes. It works on raw blob bytes and knows nothing about the
//! metadata tables around them: references to other table rows stay as
//! coded indexes until a caller binds them through a
//! [`ResolutionContext`].
//!
//! ## Features
//!
//! - Type signatures (`TypeSpec` blobs, parameters, fields, locals)
//! - Method, method instantiation, field, property and local variable signatures
//! - Custom attribute blobs: fixed and named arguments, boxed values, enums, arrays
//! - Deferred cross-table references with separate resolve and persist passes
//! - A configurable nesting limit against hostile input
//!
//! ## Example
//!
//! ```
//! use clrsig::{MemberSig, PrimitiveKind, TypeSig};
//!
//! // instance void (int32, int32)
//! let blob = [0x20, 0x02, 0x01, 0x08, 0x08];
//! let MemberSig::Method(method) = MemberSig::parse_blob(&blob)? else {
//!     unreachable!();
//! };
//! assert!(!method.is_static);
//! assert_eq!(method.params[0].ty, TypeSig::Primitive(PrimitiveKind::I4));
//!
//! assert_eq!(MemberSig::Method(method).write()?, blob);
//! # Ok::<(), clrsig::Error>(())
//! ```

pub mod custom_attribute;
pub mod error;
pub mod reader;
pub mod resolve;
pub mod signature;
pub mod tables;
pub mod writer;

// Re-export main types
pub use error::{Error, Result};
pub use reader::Reader;
pub use writer::Writer;

// Re-export resolution
pub use resolve::{EntityId, LayoutProvider, References, ResolutionContext, TypeReference};

// Re-export tables
pub use tables::{TableId, TypeDefOrRef};

// Re-export signatures
pub use signature::{
    ArrayShape, CallingConvention, CustomMod, ElementType, FieldSig, LocalVarSig, LocalVariable,
    MemberSig, MethodSig, MethodSpecSig, NamedType, PrimitiveKind, PropertySig, SigFlags,
    TypeSig, TypeWithMods,
};

// Re-export custom attributes
pub use custom_attribute::{
    CaType, CaValue, CustomAttributeSig, EnumType, NamedArg, NamedArgKind, TypeNameResolver,
};
