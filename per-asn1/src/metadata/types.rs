//! Metadata type definitions

use crate::types::AsnType;
use per_core::{PerError, PerResult};
use serde::{Deserialize, Serialize};
use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::Arc;

/// Value-range or size constraint
///
/// On INTEGER types the constraint bounds the value. On OCTET STRING,
/// character strings, BIT STRING and SEQUENCE OF it bounds the length
/// (octets, characters' octets, bits or items respectively).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constraint {
    /// Both bounds known: `(min..max)`
    ValueRange { min: i64, max: i64 },
    /// Only a lower bound: `(min..MAX)`
    LowerBound { min: i64 },
    /// `SIZE(n)`: the length is implied and never encoded
    FixedSize { size: usize },
}

impl Constraint {
    pub fn range(min: i64, max: i64) -> Self {
        Constraint::ValueRange { min, max }
    }

    pub fn lower_bound(min: i64) -> Self {
        Constraint::LowerBound { min }
    }

    pub fn fixed_size(size: usize) -> Self {
        Constraint::FixedSize { size }
    }

    /// Check an integer value against the constraint
    pub fn check_value(&self, value: i64) -> PerResult<()> {
        let within = match *self {
            Constraint::ValueRange { min, max } => value >= min && value <= max,
            Constraint::LowerBound { min } => value >= min,
            Constraint::FixedSize { .. } => {
                return Err(PerError::InvalidMetadata(
                    "SIZE constraint applied to a value".to_string(),
                ))
            }
        };
        if within {
            Ok(())
        } else {
            Err(PerError::ConstraintViolation(format!(
                "Value {} violates {}",
                value, self
            )))
        }
    }

    /// Check a length against the constraint
    pub fn check_length(&self, length: usize) -> PerResult<()> {
        let length = length as i128;
        let within = match *self {
            Constraint::ValueRange { min, max } => length >= i128::from(min) && length <= i128::from(max),
            Constraint::LowerBound { min } => length >= i128::from(min),
            Constraint::FixedSize { size } => length == size as i128,
        };
        if within {
            Ok(())
        } else {
            Err(PerError::ConstraintViolation(format!(
                "Length {} violates {}",
                length, self
            )))
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::ValueRange { min, max } => write!(f, "({}..{})", min, max),
            Constraint::LowerBound { min } => write!(f, "({}..MAX)", min),
            Constraint::FixedSize { size } => write!(f, "SIZE({})", size),
        }
    }
}

/// Restricted character string types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    Utf8,
    Visible,
    Printable,
    Ia5,
    Numeric,
}

impl StringKind {
    /// ASN.1 type name
    pub fn name(self) -> &'static str {
        match self {
            StringKind::Utf8 => "UTF8String",
            StringKind::Visible => "VisibleString",
            StringKind::Printable => "PrintableString",
            StringKind::Ia5 => "IA5String",
            StringKind::Numeric => "NumericString",
        }
    }

    /// Whether `c` belongs to the alphabet of this string type
    pub fn permits(self, c: char) -> bool {
        match self {
            StringKind::Utf8 => true,
            StringKind::Ia5 => c.is_ascii(),
            StringKind::Visible => (' '..='~').contains(&c),
            StringKind::Numeric => c.is_ascii_digit() || c == ' ',
            StringKind::Printable => {
                c.is_ascii_alphanumeric() || " '()+,-./:=?".contains(c)
            }
        }
    }

    /// Check every character of `value`
    pub fn validate(self, value: &str) -> PerResult<()> {
        match value.chars().find(|c| !self.permits(*c)) {
            Some(c) => Err(PerError::ConstraintViolation(format!(
                "Character {:?} is not allowed in {}",
                c,
                self.name()
            ))),
            None => Ok(()),
        }
    }
}

/// Host scalar types the dispatcher maps without any ASN.1 attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Int32,
    Int64,
    Double,
    Bool,
    Bytes,
    NativeEnum,
}

/// One enumerator of an ENUMERATED type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumItem {
    name: String,
    tag: i64,
}

impl EnumItem {
    pub fn new(name: impl Into<String>, tag: i64) -> Self {
        Self {
            name: name.into(),
            tag,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared value of the enumerator
    pub fn tag(&self) -> i64 {
        self.tag
    }
}

/// Lazily resolved reference to the metadata of another type
#[derive(Clone)]
pub enum TypeRef {
    /// A Rust type implementing [`AsnType`]; cacheable by its `TypeId`
    Static {
        id: TypeId,
        name: &'static str,
        build: fn() -> TypeMetadata,
    },
    /// Metadata assembled at runtime
    Inline(Arc<TypeMetadata>),
}

impl TypeRef {
    /// Reference the metadata of `T`
    pub fn of<T: AsnType>() -> Self {
        TypeRef::Static {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            build: T::metadata,
        }
    }

    /// Reference metadata built at runtime
    pub fn inline(metadata: TypeMetadata) -> Self {
        TypeRef::Inline(Arc::new(metadata))
    }

    pub fn name(&self) -> &str {
        match self {
            TypeRef::Static { name, .. } => *name,
            TypeRef::Inline(metadata) => metadata.name(),
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Static { name, .. } => write!(f, "TypeRef({})", name),
            TypeRef::Inline(metadata) => write!(f, "TypeRef(inline {})", metadata.name()),
        }
    }
}

/// A field of a SEQUENCE/SET or an alternative of a CHOICE
#[derive(Debug, Clone)]
pub struct FieldMetadata {
    name: String,
    ty: TypeRef,
    optional: bool,
    order: Option<u32>,
    constraint: Option<Constraint>,
}

impl FieldMetadata {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            order: None,
            constraint: None,
        }
    }

    /// Mark the field OPTIONAL
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Canonical position of the field inside a SET
    pub fn set_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    /// Constraint declared on the field; overrides the type's own
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn order(&self) -> Option<u32> {
        self.order
    }

    pub fn constraint(&self) -> Option<Constraint> {
        self.constraint
    }
}

/// An ASN.1 attribute declared on a type
#[derive(Debug, Clone)]
pub enum Attribute {
    SequenceOf { item: TypeRef },
    /// SEQUENCE, or SET when `set` is true
    Sequence { fields: Vec<FieldMetadata>, set: bool },
    Choice { alternatives: Vec<FieldMetadata>, extensible: bool },
    /// Single-value holder type
    BoxedType { inner: TypeRef },
    Enumerated { items: Vec<EnumItem>, extensible: bool },
    Boolean,
    Any,
    Integer,
    Real,
    OctetString,
    BitString,
    ObjectIdentifier,
    CharacterString(StringKind),
    Null,
    /// Explicit element wrapper re-entering dispatch with `target`'s attributes
    Element { target: TypeRef },
}

/// Discriminant of [`Attribute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    SequenceOf,
    Sequence,
    Choice,
    BoxedType,
    Enumerated,
    Boolean,
    Any,
    Integer,
    Real,
    OctetString,
    BitString,
    ObjectIdentifier,
    CharacterString,
    Null,
    Element,
}

impl AttributeKind {
    /// The order in which the dispatcher looks for attributes. The first
    /// attribute found decides the encoding; changing this order changes the
    /// wire format of types that carry more than one attribute.
    pub const DISPATCH_ORDER: [AttributeKind; 15] = [
        AttributeKind::SequenceOf,
        AttributeKind::Sequence,
        AttributeKind::Choice,
        AttributeKind::BoxedType,
        AttributeKind::Enumerated,
        AttributeKind::Boolean,
        AttributeKind::Any,
        AttributeKind::Integer,
        AttributeKind::Real,
        AttributeKind::OctetString,
        AttributeKind::BitString,
        AttributeKind::ObjectIdentifier,
        AttributeKind::CharacterString,
        AttributeKind::Null,
        AttributeKind::Element,
    ];
}

impl Attribute {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Attribute::SequenceOf { .. } => AttributeKind::SequenceOf,
            Attribute::Sequence { .. } => AttributeKind::Sequence,
            Attribute::Choice { .. } => AttributeKind::Choice,
            Attribute::BoxedType { .. } => AttributeKind::BoxedType,
            Attribute::Enumerated { .. } => AttributeKind::Enumerated,
            Attribute::Boolean => AttributeKind::Boolean,
            Attribute::Any => AttributeKind::Any,
            Attribute::Integer => AttributeKind::Integer,
            Attribute::Real => AttributeKind::Real,
            Attribute::OctetString => AttributeKind::OctetString,
            Attribute::BitString => AttributeKind::BitString,
            Attribute::ObjectIdentifier => AttributeKind::ObjectIdentifier,
            Attribute::CharacterString(_) => AttributeKind::CharacterString,
            Attribute::Null => AttributeKind::Null,
            Attribute::Element { .. } => AttributeKind::Element,
        }
    }
}

/// Everything the codec knows about one type
///
/// # Usage Example
///
/// ```rust
/// use per_asn1::metadata::{Constraint, FieldMetadata, TypeMetadata, TypeRef};
///
/// let metadata = TypeMetadata::sequence(
///     "Reading",
///     vec![
///         FieldMetadata::new("channel", TypeRef::of::<u8>()),
///         FieldMetadata::new("value", TypeRef::of::<i64>())
///             .with_constraint(Constraint::range(-1000, 1000)),
///         FieldMetadata::new("label", TypeRef::of::<String>()).optional(),
///     ],
/// );
/// assert_eq!(metadata.name(), "Reading");
/// ```
#[derive(Debug, Clone)]
pub struct TypeMetadata {
    name: String,
    attributes: Vec<Attribute>,
    native: Option<PrimitiveKind>,
    constraint: Option<Constraint>,
}

impl TypeMetadata {
    /// Metadata with no attribute at all
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            native: None,
            constraint: None,
        }
    }

    fn with(name: impl Into<String>, attribute: Attribute) -> Self {
        Self::new(name).with_attribute(attribute)
    }

    pub fn sequence(name: impl Into<String>, fields: Vec<FieldMetadata>) -> Self {
        Self::with(name, Attribute::Sequence { fields, set: false })
    }

    /// A SET; fields are encoded in their `set_order`
    pub fn set(name: impl Into<String>, fields: Vec<FieldMetadata>) -> Self {
        Self::with(name, Attribute::Sequence { fields, set: true })
    }

    pub fn choice(name: impl Into<String>, alternatives: Vec<FieldMetadata>) -> Self {
        Self::with(name, Attribute::Choice { alternatives, extensible: false })
    }

    /// A CHOICE with an extension marker; its index is a normally small number
    pub fn extensible_choice(name: impl Into<String>, alternatives: Vec<FieldMetadata>) -> Self {
        Self::with(name, Attribute::Choice { alternatives, extensible: true })
    }

    pub fn sequence_of(name: impl Into<String>, item: TypeRef) -> Self {
        Self::with(name, Attribute::SequenceOf { item })
    }

    pub fn boxed(name: impl Into<String>, inner: TypeRef) -> Self {
        Self::with(name, Attribute::BoxedType { inner })
    }

    pub fn enumerated(name: impl Into<String>, items: Vec<EnumItem>) -> Self {
        Self::with(name, Attribute::Enumerated { items, extensible: false })
    }

    pub fn extensible_enumerated(name: impl Into<String>, items: Vec<EnumItem>) -> Self {
        Self::with(name, Attribute::Enumerated { items, extensible: true })
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::with(name, Attribute::Boolean)
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::with(name, Attribute::Any)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::with(name, Attribute::Integer)
    }

    pub fn real(name: impl Into<String>) -> Self {
        Self::with(name, Attribute::Real)
    }

    pub fn octet_string(name: impl Into<String>) -> Self {
        Self::with(name, Attribute::OctetString)
    }

    pub fn bit_string(name: impl Into<String>) -> Self {
        Self::with(name, Attribute::BitString)
    }

    pub fn object_identifier(name: impl Into<String>) -> Self {
        Self::with(name, Attribute::ObjectIdentifier)
    }

    pub fn character_string(name: impl Into<String>, kind: StringKind) -> Self {
        Self::with(name, Attribute::CharacterString(kind))
    }

    pub fn null(name: impl Into<String>) -> Self {
        Self::with(name, Attribute::Null)
    }

    pub fn element(name: impl Into<String>, target: TypeRef) -> Self {
        Self::with(name, Attribute::Element { target })
    }

    /// A host scalar with no ASN.1 attribute
    pub fn native(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self::new(name).with_native(kind)
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_native(mut self, kind: PrimitiveKind) -> Self {
        self.native = Some(kind);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// First declared attribute of the given kind
    pub fn attribute(&self, kind: AttributeKind) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.kind() == kind)
    }

    pub fn has_attribute(&self, kind: AttributeKind) -> bool {
        self.attribute(kind).is_some()
    }

    pub fn native_kind(&self) -> Option<PrimitiveKind> {
        self.native
    }

    pub fn constraint(&self) -> Option<Constraint> {
        self.constraint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_checks() {
        let range = Constraint::range(1, 10);
        assert!(range.check_value(1).is_ok());
        assert!(matches!(range.check_value(11), Err(PerError::ConstraintViolation(_))));
        assert!(range.check_length(10).is_ok());
        assert!(Constraint::fixed_size(4).check_length(3).is_err());
        assert!(Constraint::fixed_size(4).check_value(4).is_err());
        assert!(Constraint::lower_bound(0).check_value(-1).is_err());
        assert_eq!(Constraint::lower_bound(3).to_string(), "(3..MAX)");
    }

    #[test]
    fn test_string_alphabets() {
        assert!(StringKind::Numeric.validate("12 34").is_ok());
        assert!(StringKind::Numeric.validate("12a").is_err());
        assert!(StringKind::Printable.validate("Bus 7 (north)").is_ok());
        assert!(StringKind::Printable.validate("a@b").is_err());
        assert!(StringKind::Visible.validate("a@b").is_ok());
        assert!(StringKind::Visible.validate("tab\t").is_err());
        assert!(StringKind::Ia5.validate("tab\t").is_ok());
        assert!(StringKind::Utf8.validate("überspannung").is_ok());
        assert!(StringKind::Ia5.validate("ü").is_err());
    }

    #[test]
    fn test_attribute_lookup() {
        let metadata = TypeMetadata::integer("Level")
            .with_attribute(Attribute::Boolean)
            .with_constraint(Constraint::range(0, 3));
        assert!(metadata.has_attribute(AttributeKind::Integer));
        assert!(metadata.has_attribute(AttributeKind::Boolean));
        assert!(!metadata.has_attribute(AttributeKind::Real));
        assert_eq!(metadata.constraint(), Some(Constraint::range(0, 3)));
    }
}
