//! Host-side ASN.1 value types

pub mod bit_string;
pub mod object_identifier;

pub use bit_string::BitString;
pub use object_identifier::ObjectIdentifier;
