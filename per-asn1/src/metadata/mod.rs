//! ASN.1 type metadata
//!
//! The codec never inspects Rust types directly. Every type it handles is
//! described by a [`TypeMetadata`]: the ASN.1 attributes declared on it
//! (SEQUENCE, CHOICE, INTEGER, ...), its constraint, and for constructed
//! types the fields or alternatives with their own optionality, ordering and
//! constraint overrides. Nested types are referenced through [`TypeRef`]s
//! and resolved lazily by a [`MetadataProvider`], which lets recursive types
//! be described without building an infinite tree.
//!
//! [`ElementInfo`] is the per-call frame the dispatcher passes down the
//! recursion; a child frame is always derived from its parent, never
//! modified in place.

pub mod types;
pub mod element;
pub mod provider;

pub use types::{
    Attribute, AttributeKind, Constraint, EnumItem, FieldMetadata, PrimitiveKind, StringKind,
    TypeMetadata, TypeRef,
};
pub use element::ElementInfo;
pub use provider::{MetadataCache, MetadataProvider, UncachedProvider};
