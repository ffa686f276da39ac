//! Typed layer over [`AsnValue`]
//!
//! Implementing [`AsnType`] ties a Rust type to its ASN.1 metadata and to the
//! conversions between the type and the generic value tree the codec works
//! on.
//!
//! # Usage Example
//!
//! ```rust
//! use per_asn1::metadata::{FieldMetadata, TypeMetadata, TypeRef};
//! use per_asn1::{AsnType, AsnValue, PerCodec, SequenceFields};
//! use per_core::PerResult;
//!
//! #[derive(Debug, PartialEq)]
//! struct Sample {
//!     channel: u8,
//!     label: Option<String>,
//! }
//!
//! impl AsnType for Sample {
//!     fn metadata() -> TypeMetadata {
//!         TypeMetadata::sequence(
//!             "Sample",
//!             vec![
//!                 FieldMetadata::new("channel", TypeRef::of::<u8>()),
//!                 FieldMetadata::new("label", TypeRef::of::<String>()).optional(),
//!             ],
//!         )
//!     }
//!
//!     fn to_asn_value(&self) -> AsnValue {
//!         AsnValue::Sequence(vec![
//!             Some(self.channel.to_asn_value()),
//!             self.label.as_ref().map(AsnType::to_asn_value),
//!         ])
//!     }
//!
//!     fn from_asn_value(value: AsnValue) -> PerResult<Self> {
//!         let mut fields = SequenceFields::from_value(value, "Sample")?;
//!         Ok(Self {
//!             channel: fields.required("channel")?,
//!             label: fields.optional("label")?,
//!         })
//!     }
//! }
//!
//! let codec = PerCodec::new();
//! let sample = Sample { channel: 3, label: None };
//! let wire = codec.encode_to_bytes(&sample)?;
//! assert_eq!(&wire[..], &[0x00, 0x03]);
//! assert_eq!(codec.decode_from_slice::<Sample>(&wire)?, sample);
//! # Ok::<(), per_core::PerError>(())
//! ```

use crate::metadata::{Constraint, PrimitiveKind, TypeMetadata, TypeRef};
use crate::value::AsnValue;
use bytes::Bytes;
use per_core::{BitString, ObjectIdentifier, PerError, PerResult};

/// A Rust type with an ASN.1 description
pub trait AsnType: Sized + 'static {
    /// Build the metadata of this type
    ///
    /// Called once per type by a caching provider; nested types should be
    /// referenced through [`TypeRef::of`] rather than built inline.
    fn metadata() -> TypeMetadata;

    fn to_asn_value(&self) -> AsnValue;

    fn from_asn_value(value: AsnValue) -> PerResult<Self>;
}

fn unexpected(expected: &str, found: &AsnValue) -> PerError {
    PerError::TypeDispatch(format!("Expected a {} value, found {}", expected, found.kind_name()))
}

fn out_of_range<T>(value: i64) -> PerError {
    PerError::ConstraintViolation(format!(
        "{} does not fit {}",
        value,
        std::any::type_name::<T>()
    ))
}

impl AsnType for bool {
    fn metadata() -> TypeMetadata {
        TypeMetadata::native("bool", PrimitiveKind::Bool)
    }

    fn to_asn_value(&self) -> AsnValue {
        AsnValue::Boolean(*self)
    }

    fn from_asn_value(value: AsnValue) -> PerResult<Self> {
        match value {
            AsnValue::Boolean(flag) => Ok(flag),
            other => Err(unexpected("BOOLEAN", &other)),
        }
    }
}

impl AsnType for i32 {
    fn metadata() -> TypeMetadata {
        TypeMetadata::native("i32", PrimitiveKind::Int32)
    }

    fn to_asn_value(&self) -> AsnValue {
        AsnValue::Integer(i64::from(*self))
    }

    fn from_asn_value(value: AsnValue) -> PerResult<Self> {
        match value {
            AsnValue::Integer(number) => i32::try_from(number).map_err(|_| out_of_range::<i32>(number)),
            other => Err(unexpected("INTEGER", &other)),
        }
    }
}

impl AsnType for i64 {
    fn metadata() -> TypeMetadata {
        TypeMetadata::native("i64", PrimitiveKind::Int64)
    }

    fn to_asn_value(&self) -> AsnValue {
        AsnValue::Integer(*self)
    }

    fn from_asn_value(value: AsnValue) -> PerResult<Self> {
        match value {
            AsnValue::Integer(number) => Ok(number),
            other => Err(unexpected("INTEGER", &other)),
        }
    }
}

/// Unsigned integers map to INTEGER constrained to their full range
macro_rules! impl_unsigned {
    ($($ty:ty),*) => {
        $(
            impl AsnType for $ty {
                fn metadata() -> TypeMetadata {
                    TypeMetadata::integer("INTEGER")
                        .with_constraint(Constraint::range(0, i64::from(<$ty>::MAX)))
                }

                fn to_asn_value(&self) -> AsnValue {
                    AsnValue::Integer(i64::from(*self))
                }

                fn from_asn_value(value: AsnValue) -> PerResult<Self> {
                    match value {
                        AsnValue::Integer(number) => {
                            <$ty>::try_from(number).map_err(|_| out_of_range::<$ty>(number))
                        }
                        other => Err(unexpected("INTEGER", &other)),
                    }
                }
            }
        )*
    };
}

impl_unsigned!(u8, u16, u32);

impl AsnType for f64 {
    fn metadata() -> TypeMetadata {
        TypeMetadata::native("f64", PrimitiveKind::Double)
    }

    fn to_asn_value(&self) -> AsnValue {
        AsnValue::Real(*self)
    }

    fn from_asn_value(value: AsnValue) -> PerResult<Self> {
        match value {
            AsnValue::Real(number) => Ok(number),
            other => Err(unexpected("REAL", &other)),
        }
    }
}

impl AsnType for String {
    fn metadata() -> TypeMetadata {
        TypeMetadata::native("String", PrimitiveKind::String)
    }

    fn to_asn_value(&self) -> AsnValue {
        AsnValue::CharacterString(self.clone())
    }

    fn from_asn_value(value: AsnValue) -> PerResult<Self> {
        match value {
            AsnValue::CharacterString(text) => Ok(text),
            other => Err(unexpected("character string", &other)),
        }
    }
}

impl AsnType for Bytes {
    fn metadata() -> TypeMetadata {
        TypeMetadata::native("Bytes", PrimitiveKind::Bytes)
    }

    fn to_asn_value(&self) -> AsnValue {
        AsnValue::OctetString(self.to_vec())
    }

    fn from_asn_value(value: AsnValue) -> PerResult<Self> {
        match value {
            AsnValue::OctetString(octets) | AsnValue::Any(octets) => Ok(Bytes::from(octets)),
            other => Err(unexpected("OCTET STRING", &other)),
        }
    }
}

impl AsnType for () {
    fn metadata() -> TypeMetadata {
        TypeMetadata::null("NULL")
    }

    fn to_asn_value(&self) -> AsnValue {
        AsnValue::Null
    }

    fn from_asn_value(value: AsnValue) -> PerResult<Self> {
        match value {
            AsnValue::Null => Ok(()),
            other => Err(unexpected("NULL", &other)),
        }
    }
}

impl AsnType for BitString {
    fn metadata() -> TypeMetadata {
        TypeMetadata::bit_string("BIT STRING")
    }

    fn to_asn_value(&self) -> AsnValue {
        AsnValue::BitString(self.clone())
    }

    fn from_asn_value(value: AsnValue) -> PerResult<Self> {
        match value {
            AsnValue::BitString(bits) => Ok(bits),
            other => Err(unexpected("BIT STRING", &other)),
        }
    }
}

impl AsnType for ObjectIdentifier {
    fn metadata() -> TypeMetadata {
        TypeMetadata::object_identifier("OBJECT IDENTIFIER")
    }

    fn to_asn_value(&self) -> AsnValue {
        AsnValue::ObjectIdentifier(self.clone())
    }

    fn from_asn_value(value: AsnValue) -> PerResult<Self> {
        match value {
            AsnValue::ObjectIdentifier(oid) => Ok(oid),
            other => Err(unexpected("OBJECT IDENTIFIER", &other)),
        }
    }
}

impl<T: AsnType> AsnType for Vec<T> {
    fn metadata() -> TypeMetadata {
        TypeMetadata::sequence_of("SEQUENCE OF", TypeRef::of::<T>())
    }

    fn to_asn_value(&self) -> AsnValue {
        AsnValue::SequenceOf(self.iter().map(AsnType::to_asn_value).collect())
    }

    fn from_asn_value(value: AsnValue) -> PerResult<Self> {
        match value {
            AsnValue::SequenceOf(items) => items.into_iter().map(T::from_asn_value).collect(),
            other => Err(unexpected("SEQUENCE OF", &other)),
        }
    }
}

/// `Box<T>` is encoded exactly like `T`
impl<T: AsnType> AsnType for Box<T> {
    fn metadata() -> TypeMetadata {
        T::metadata()
    }

    fn to_asn_value(&self) -> AsnValue {
        self.as_ref().to_asn_value()
    }

    fn from_asn_value(value: AsnValue) -> PerResult<Self> {
        T::from_asn_value(value).map(Box::new)
    }
}

/// Field-by-field reader over a decoded SEQUENCE or SET
///
/// Fields are taken in declaration order.
#[derive(Debug)]
pub struct SequenceFields {
    type_name: String,
    slots: std::vec::IntoIter<Option<AsnValue>>,
}

impl SequenceFields {
    pub fn from_value(value: AsnValue, type_name: &str) -> PerResult<Self> {
        match value {
            AsnValue::Sequence(slots) => Ok(Self {
                type_name: type_name.to_string(),
                slots: slots.into_iter(),
            }),
            other => Err(unexpected("SEQUENCE", &other)),
        }
    }

    /// Take the next field, which must be present
    pub fn required<T: AsnType>(&mut self, field: &str) -> PerResult<T> {
        match self.slots.next() {
            Some(Some(value)) => T::from_asn_value(value),
            _ => Err(PerError::MissingField(format!("{}.{}", self.type_name, field))),
        }
    }

    /// Take the next field, which may be absent
    pub fn optional<T: AsnType>(&mut self, field: &str) -> PerResult<Option<T>> {
        match self.slots.next() {
            Some(Some(value)) => T::from_asn_value(value).map(Some),
            Some(None) => Ok(None),
            None => Err(PerError::MissingField(format!("{}.{}", self.type_name, field))),
        }
    }

    /// Fields not yet taken
    pub fn remaining(&self) -> usize {
        self.slots.len()
    }
}
