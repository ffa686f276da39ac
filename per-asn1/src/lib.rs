//! ASN.1 Packed Encoding Rules, aligned variant
//!
//! This crate encodes and decodes ASN.1 values as described by type
//! metadata. Callers describe their types with [`metadata::TypeMetadata`]
//! (usually through the [`AsnType`] trait) and the codec selects the X.691
//! encoding form for every element from its attributes and constraints.
//!
//! # TODO
//!
//! - [x] Bit streams with explicit alignment
//! - [x] Length determinants (single and two octet forms)
//! - [x] Constrained, semi-constrained, unconstrained and normally small numbers
//! - [x] REAL (binary base 2, special values)
//! - [x] SEQUENCE, SET, CHOICE, ENUMERATED, SEQUENCE OF, boxed types
//! - [x] OCTET STRING, BIT STRING, character strings, OBJECT IDENTIFIER, ANY
//! - [ ] Fragmented length determinants (16K units and above)
//! - [ ] Extension additions after the extension marker (only the root index form is produced)

pub mod bitstream;
pub mod per;
pub mod metadata;
pub mod value;
pub mod types;
pub mod config;
pub mod codec;

pub use bitstream::{BitInputStream, BitOutputStream};
pub use codec::{decode, encode, PerCodec};
pub use config::{PerCodecBuilder, PerConfig};
pub use metadata::{
    Constraint, EnumItem, FieldMetadata, MetadataCache, MetadataProvider, PrimitiveKind, StringKind,
    TypeMetadata, TypeRef, UncachedProvider,
};
pub use types::{AsnType, SequenceFields};
pub use value::{AsnValue, ChoiceValue, DecodedObject};
