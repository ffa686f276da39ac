//! Generic ASN.1 value tree

use per_core::{BitString, ObjectIdentifier};
use serde::{Deserialize, Serialize};

/// A decoded (or to-be-encoded) ASN.1 value
///
/// The tree mirrors the type metadata it is encoded against:
///
/// - `Sequence` holds one slot per declared field, in declaration order
///   (also for SET, whose wire order comes from the field order numbers);
///   `None` marks an absent OPTIONAL field.
/// - `Choice` holds the zero-based index of the selected alternative, or
///   `None` when nothing is selected, which only an optional choice accepts.
/// - `Enumerated` holds the enumerator's declared tag, not its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AsnValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    OctetString(#[serde(with = "serde_bytes")] Vec<u8>),
    Any(#[serde(with = "serde_bytes")] Vec<u8>),
    BitString(BitString),
    ObjectIdentifier(ObjectIdentifier),
    CharacterString(String),
    Enumerated(i64),
    Sequence(Vec<Option<AsnValue>>),
    Choice(Option<ChoiceValue>),
    SequenceOf(Vec<AsnValue>),
    Boxed(Box<AsnValue>),
}

/// Selected alternative of a CHOICE
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceValue {
    pub index: usize,
    pub value: Box<AsnValue>,
}

impl AsnValue {
    /// Build a CHOICE value selecting alternative `index`
    pub fn choice(index: usize, value: AsnValue) -> Self {
        AsnValue::Choice(Some(ChoiceValue {
            index,
            value: Box::new(value),
        }))
    }

    pub fn boxed(value: AsnValue) -> Self {
        AsnValue::Boxed(Box::new(value))
    }

    /// Short name of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            AsnValue::Null => "NULL",
            AsnValue::Boolean(_) => "BOOLEAN",
            AsnValue::Integer(_) => "INTEGER",
            AsnValue::Real(_) => "REAL",
            AsnValue::OctetString(_) => "OCTET STRING",
            AsnValue::Any(_) => "ANY",
            AsnValue::BitString(_) => "BIT STRING",
            AsnValue::ObjectIdentifier(_) => "OBJECT IDENTIFIER",
            AsnValue::CharacterString(_) => "character string",
            AsnValue::Enumerated(_) => "ENUMERATED",
            AsnValue::Sequence(_) => "SEQUENCE",
            AsnValue::Choice(_) => "CHOICE",
            AsnValue::SequenceOf(_) => "SEQUENCE OF",
            AsnValue::Boxed(_) => "boxed value",
        }
    }

    /// Strip any number of `Boxed` layers
    pub fn unboxed(&self) -> &AsnValue {
        let mut value = self;
        while let AsnValue::Boxed(inner) = value {
            value = inner;
        }
        value
    }
}

/// A decoded value together with the number of bits it occupied
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedObject<T> {
    pub value: T,
    pub size: usize,
}

impl<T> DecodedObject<T> {
    pub fn new(value: T, size: usize) -> Self {
        Self { value, size }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DecodedObject<U> {
        DecodedObject {
            value: f(self.value),
            size: self.size,
        }
    }
}
