//! Type classification
//!
//! [`classify`] maps a type's metadata to exactly one [`TypeShape`]. The
//! attributes are probed in [`AttributeKind::DISPATCH_ORDER`] and the first
//! hit wins; a type with no attribute falls back to its native host scalar
//! kind, if it has one.

use crate::metadata::{
    Attribute, AttributeKind, EnumItem, FieldMetadata, PrimitiveKind, StringKind, TypeMetadata,
    TypeRef,
};
use per_core::{PerError, PerResult};

/// The encoding procedure selected for a type
#[derive(Debug, Clone, Copy)]
pub enum TypeShape<'m> {
    SequenceOf { item: &'m TypeRef },
    Sequence { fields: &'m [FieldMetadata], set: bool },
    Choice { alternatives: &'m [FieldMetadata], extensible: bool },
    Boxed { inner: &'m TypeRef },
    Enumerated { items: &'m [EnumItem], extensible: bool },
    Boolean,
    Any,
    Integer,
    Real,
    OctetString,
    BitString,
    ObjectIdentifier,
    CharacterString(StringKind),
    Null,
    Element { target: &'m TypeRef },
    Fallback(PrimitiveKind),
}

impl TypeShape<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            TypeShape::SequenceOf { .. } => "SequenceOf",
            TypeShape::Sequence { set: false, .. } => "Sequence",
            TypeShape::Sequence { set: true, .. } => "Set",
            TypeShape::Choice { .. } => "Choice",
            TypeShape::Boxed { .. } => "Boxed",
            TypeShape::Enumerated { .. } => "Enumerated",
            TypeShape::Boolean => "Boolean",
            TypeShape::Any => "Any",
            TypeShape::Integer => "Integer",
            TypeShape::Real => "Real",
            TypeShape::OctetString => "OctetString",
            TypeShape::BitString => "BitString",
            TypeShape::ObjectIdentifier => "ObjectIdentifier",
            TypeShape::CharacterString(_) => "CharacterString",
            TypeShape::Null => "Null",
            TypeShape::Element { .. } => "Element",
            TypeShape::Fallback(_) => "Fallback",
        }
    }
}

impl<'m> From<&'m Attribute> for TypeShape<'m> {
    fn from(attribute: &'m Attribute) -> Self {
        match attribute {
            Attribute::SequenceOf { item } => TypeShape::SequenceOf { item },
            Attribute::Sequence { fields, set } => TypeShape::Sequence { fields, set: *set },
            Attribute::Choice {
                alternatives,
                extensible,
            } => TypeShape::Choice {
                alternatives,
                extensible: *extensible,
            },
            Attribute::BoxedType { inner } => TypeShape::Boxed { inner },
            Attribute::Enumerated { items, extensible } => TypeShape::Enumerated {
                items,
                extensible: *extensible,
            },
            Attribute::Boolean => TypeShape::Boolean,
            Attribute::Any => TypeShape::Any,
            Attribute::Integer => TypeShape::Integer,
            Attribute::Real => TypeShape::Real,
            Attribute::OctetString => TypeShape::OctetString,
            Attribute::BitString => TypeShape::BitString,
            Attribute::ObjectIdentifier => TypeShape::ObjectIdentifier,
            Attribute::CharacterString(kind) => TypeShape::CharacterString(*kind),
            Attribute::Null => TypeShape::Null,
            Attribute::Element { target } => TypeShape::Element { target },
        }
    }
}

/// Select the encoding procedure for `metadata`
///
/// # Errors
/// - [`PerError::TypeDispatch`] when no attribute applies and the type has no
///   native fallback
/// - [`PerError::InvalidMetadata`] for a CHOICE without alternatives or an
///   ENUMERATED without enumerators
pub fn classify(metadata: &TypeMetadata) -> PerResult<TypeShape<'_>> {
    let shape = AttributeKind::DISPATCH_ORDER
        .iter()
        .find_map(|kind| metadata.attribute(*kind))
        .map(TypeShape::from)
        .or_else(|| metadata.native_kind().map(TypeShape::Fallback))
        .ok_or_else(|| {
            PerError::TypeDispatch(format!(
                "Type {} has no ASN.1 attribute and no native mapping",
                metadata.name()
            ))
        })?;

    match shape {
        TypeShape::Choice { alternatives, .. } if alternatives.is_empty() => Err(
            PerError::InvalidMetadata(format!("Choice {} has no alternatives", metadata.name())),
        ),
        TypeShape::Enumerated { items, .. } if items.is_empty() => Err(PerError::InvalidMetadata(
            format!("Enumerated {} has no enumerators", metadata.name()),
        )),
        shape => Ok(shape),
    }
}
