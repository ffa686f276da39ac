//! ASN.1 Packed Encoding Rules (aligned variant) for Rust
//!
//! A metadata-driven codec that encodes typed values into the bit-aligned
//! PER wire format of ITU-T X.691 and decodes them back.
//!
//! # Architecture
//!
//! - `per-core`: error type and host representations of BIT STRING and
//!   OBJECT IDENTIFIER
//! - `per-asn1`: bit streams, scalar codecs, type metadata, the type
//!   dispatcher and the [`PerCodec`] front end
//!
//! # Usage Example
//!
//! ```rust
//! let mut wire = Vec::new();
//! per::encode(&vec![true, false, true], &mut wire)?;
//! assert_eq!(wire, vec![0x03, 0xA0]);
//!
//! let flags: Vec<bool> = per::decode(&mut wire.as_slice())?;
//! assert_eq!(flags, vec![true, false, true]);
//! # Ok::<(), per::PerError>(())
//! ```

// Re-export core types
pub use per_core::{BitString, ObjectIdentifier, PerError, PerResult};

// Re-export the codec
pub use per_asn1::{
    decode, encode, AsnType, AsnValue, ChoiceValue, Constraint, DecodedObject, EnumItem, FieldMetadata,
    MetadataCache, MetadataProvider, PerCodec, PerCodecBuilder, PerConfig, PrimitiveKind, SequenceFields,
    StringKind, TypeMetadata, TypeRef, UncachedProvider,
};

// Lower layers for callers that drive the streams themselves
pub mod bitstream {
    pub use per_asn1::bitstream::*;
}

pub mod codec {
    pub use per_asn1::per::*;
}
