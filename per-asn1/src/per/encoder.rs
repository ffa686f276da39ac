//! PER aligned encoder
//!
//! [`PerEncoder`] walks an [`AsnValue`] tree alongside its type metadata.
//! Every step classifies the current element, writes its encoding and, for
//! constructed types, calls back into [`PerEncoder::encode_value`] once per
//! child with a freshly derived [`ElementInfo`].

use crate::bitstream::BitOutputStream;
use crate::config::PerConfig;
use crate::metadata::{Constraint, ElementInfo, EnumItem, FieldMetadata, PrimitiveKind, StringKind, TypeRef};
use crate::per::length::{encode_constrained_length_determinant, encode_length_determinant};
use crate::per::number::{
    encode_constrained_number, encode_normally_small_number, encode_semi_constrained_number,
    encode_unconstrained_number,
};
use crate::per::real::encode_real;
use crate::per::shape::{classify, TypeShape};
use crate::value::AsnValue;
use bytes::Bytes;
use per_core::{BitString, ObjectIdentifier, PerError, PerResult};
use std::sync::Arc;

/// Encoder state for one encode call
pub struct PerEncoder<'c> {
    stream: BitOutputStream,
    config: &'c PerConfig,
}

impl<'c> PerEncoder<'c> {
    pub fn new(config: &'c PerConfig) -> Self {
        Self {
            stream: BitOutputStream::new(),
            config,
        }
    }

    /// Bits written so far
    pub fn position(&self) -> usize {
        self.stream.position()
    }

    /// Pad to a whole octet and return the encoding
    pub fn finish(self) -> Bytes {
        self.stream.into_bytes()
    }

    /// Encode `value` as described by `element`
    ///
    /// # Returns
    /// Number of bits written for this element, alignment padding included.
    pub fn encode_value(&mut self, value: &AsnValue, element: &ElementInfo<'_>) -> PerResult<usize> {
        if element.depth() > self.config.max_depth() {
            log::warn!("Encoding of {} exceeds the nesting limit {}", element.qualified_name(), self.config.max_depth());
            return Err(PerError::TypeDispatch(format!(
                "Nesting depth {} exceeds limit {}",
                element.depth(),
                self.config.max_depth()
            )));
        }

        let start = self.stream.position();
        let shape = classify(element.metadata())?;
        log::trace!("Encoding {} as {} at bit {}", element.name(), shape.name(), start);

        match shape {
            TypeShape::SequenceOf { item } => self.encode_sequence_of(value, element, item)?,
            TypeShape::Sequence { fields, set } => self.encode_sequence(value, element, fields, set)?,
            TypeShape::Choice {
                alternatives,
                extensible,
            } => self.encode_choice(value, element, alternatives, extensible)?,
            TypeShape::Boxed { inner } => {
                let inner_value = match value {
                    AsnValue::Boxed(inner_value) => inner_value.as_ref(),
                    other => other,
                };
                let child = element.for_inner(self.resolve(inner));
                self.encode_value(inner_value, &child)?;
            }
            TypeShape::Enumerated { items, extensible } => {
                self.encode_enumerated(value, element, items, extensible)?
            }
            TypeShape::Boolean => self.stream.write_bit(expect_boolean(value, element)?),
            TypeShape::Any => match value {
                AsnValue::Any(raw) | AsnValue::OctetString(raw) => {
                    self.stream.align();
                    self.stream.write_bytes(raw);
                }
                other => return Err(mismatch(element, "ANY", other)),
            },
            TypeShape::Integer => self.encode_integer(expect_integer(value, element)?, element)?,
            TypeShape::Real => encode_real(&mut self.stream, expect_real(value, element)?)?,
            TypeShape::OctetString => self.encode_octets(expect_octets(value, element)?, element)?,
            TypeShape::BitString => match value {
                AsnValue::BitString(bits) => self.encode_bit_string(bits, element)?,
                other => return Err(mismatch(element, "BIT STRING", other)),
            },
            TypeShape::ObjectIdentifier => match value {
                AsnValue::ObjectIdentifier(oid) => self.encode_object_identifier(oid)?,
                other => return Err(mismatch(element, "OBJECT IDENTIFIER", other)),
            },
            TypeShape::CharacterString(kind) => {
                self.encode_string(expect_string(value, element)?, kind, element)?
            }
            TypeShape::Null => match value {
                AsnValue::Null => {}
                other => return Err(mismatch(element, "NULL", other)),
            },
            TypeShape::Element { target } => {
                let child = element.for_target(self.resolve(target));
                self.encode_value(value, &child)?;
            }
            TypeShape::Fallback(kind) => self.encode_native(value, element, kind)?,
        }

        Ok(self.stream.position() - start)
    }

    fn resolve(&self, ty: &TypeRef) -> Arc<crate::metadata::TypeMetadata> {
        self.config.provider().resolve(ty)
    }

    /// Remaining budget of `element` after `consumed` bits
    fn budget(element: &ElementInfo<'_>, consumed: usize) -> Option<usize> {
        element
            .max_available_length()
            .map(|budget| budget.saturating_sub(consumed))
    }

    /// SEQUENCE and SET
    ///
    /// A SET is a SEQUENCE in field order number order: both the preamble
    /// and the field bodies follow that order.
    ///
    /// # Encoding Format
    /// ```text
    /// preamble (1 bit per OPTIONAL field) | align | present fields...
    /// ```
    fn encode_sequence(
        &mut self,
        value: &AsnValue,
        element: &ElementInfo<'_>,
        fields: &[FieldMetadata],
        set: bool,
    ) -> PerResult<()> {
        let slots = match value {
            AsnValue::Sequence(slots) => slots,
            other => return Err(mismatch(element, "SEQUENCE", other)),
        };
        if slots.len() != fields.len() {
            return Err(PerError::TypeDispatch(format!(
                "{} has {} fields but {} values were supplied",
                element.name(),
                fields.len(),
                slots.len()
            )));
        }

        let start = self.stream.position();
        let order = field_order(fields, set);
        let mut preamble = 0usize;
        for &index in &order {
            let (field, slot) = (&fields[index], &slots[index]);
            if field.is_optional() {
                self.stream.write_bit(slot.is_some());
                preamble += 1;
            } else if slot.is_none() {
                return Err(PerError::MissingField(format!("{}.{}", element.name(), field.name())));
            }
        }
        if preamble > 0 {
            self.stream.align();
        }
        log::trace!("{}: {} preamble bits", element.name(), preamble);

        for index in order {
            let (field, slot) = (&fields[index], &slots[index]);
            let Some(field_value) = slot else {
                continue;
            };
            let budget = Self::budget(element, self.stream.position() - start);
            let child = element.for_field(element.metadata(), field, self.resolve(field.type_ref()), budget);
            self.encode_value(field_value, &child)?;
        }
        Ok(())
    }

    /// CHOICE: alternative index, then the selected value
    fn encode_choice(
        &mut self,
        value: &AsnValue,
        element: &ElementInfo<'_>,
        alternatives: &[FieldMetadata],
        extensible: bool,
    ) -> PerResult<()> {
        let selected = match value {
            AsnValue::Choice(selected) => selected.as_ref(),
            other => return Err(mismatch(element, "CHOICE", other)),
        };
        let selected = selected.ok_or_else(|| {
            PerError::ChoiceResolution(format!("{} does not have a selected item", element.qualified_name()))
        })?;
        let alternative = alternatives.get(selected.index).ok_or_else(|| {
            PerError::ChoiceResolution(format!(
                "{} has no alternative {} (of {})",
                element.name(),
                selected.index,
                alternatives.len()
            ))
        })?;

        let start = self.stream.position();
        if extensible {
            encode_normally_small_number(&mut self.stream, selected.index as u64)?;
        } else {
            encode_constrained_number(&mut self.stream, selected.index as i64 + 1, 1, alternatives.len() as i64)?;
        }
        log::trace!("{}: selected alternative {}", element.name(), alternative.name());

        let budget = Self::budget(element, self.stream.position() - start);
        let child = element.for_field(element.metadata(), alternative, self.resolve(alternative.type_ref()), budget);
        self.encode_value(&selected.value, &child)?;
        Ok(())
    }

    /// ENUMERATED: position of the enumerator with the given tag
    fn encode_enumerated(
        &mut self,
        value: &AsnValue,
        element: &ElementInfo<'_>,
        items: &[EnumItem],
        extensible: bool,
    ) -> PerResult<()> {
        let tag = match value {
            AsnValue::Enumerated(tag) => *tag,
            other => return Err(mismatch(element, "ENUMERATED", other)),
        };
        let position = items.iter().position(|item| item.tag() == tag).ok_or_else(|| {
            PerError::ConstraintViolation(format!("{} is not an enumerator of {}", tag, element.name()))
        })?;
        if extensible {
            encode_normally_small_number(&mut self.stream, position as u64)
        } else {
            encode_constrained_number(&mut self.stream, position as i64, 0, items.len() as i64 - 1)
        }
    }

    /// SEQUENCE OF: item count, then each item
    fn encode_sequence_of(&mut self, value: &AsnValue, element: &ElementInfo<'_>, item: &TypeRef) -> PerResult<()> {
        let items = match value {
            AsnValue::SequenceOf(items) => items,
            other => return Err(mismatch(element, "SEQUENCE OF", other)),
        };
        let start = self.stream.position();
        self.encode_length(items.len(), element)?;
        log::trace!("{}: {} items", element.name(), items.len());

        let item_metadata = self.resolve(item);
        for item_value in items {
            let budget = Self::budget(element, self.stream.position() - start);
            let child = element.for_item(element.metadata(), Arc::clone(&item_metadata), budget);
            self.encode_value(item_value, &child)?;
        }
        Ok(())
    }

    fn encode_integer(&mut self, value: i64, element: &ElementInfo<'_>) -> PerResult<()> {
        match element.constraint() {
            Some(Constraint::ValueRange { min, max }) => encode_constrained_number(&mut self.stream, value, min, max),
            Some(Constraint::LowerBound { min }) => encode_semi_constrained_number(&mut self.stream, value, min),
            Some(Constraint::FixedSize { .. }) => Err(size_on_integer(element)),
            None => encode_unconstrained_number(&mut self.stream, value),
        }
    }

    /// Length or count of a sized type
    ///
    /// A value range gives a constrained length, a fixed size writes nothing
    /// and no (or an open) constraint writes a plain length determinant.
    fn encode_length(&mut self, length: usize, element: &ElementInfo<'_>) -> PerResult<()> {
        let Some(constraint) = element.constraint() else {
            return encode_length_determinant(&mut self.stream, length).map(|_| ());
        };
        constraint.check_length(length)?;
        match constraint {
            Constraint::ValueRange { min, max } => {
                let (min, max) = length_bounds(min, max, element)?;
                encode_constrained_length_determinant(&mut self.stream, length, min, max)
            }
            Constraint::FixedSize { .. } => Ok(()),
            Constraint::LowerBound { .. } => encode_length_determinant(&mut self.stream, length).map(|_| ()),
        }
    }

    fn encode_octets(&mut self, octets: &[u8], element: &ElementInfo<'_>) -> PerResult<()> {
        self.encode_length(octets.len(), element)?;
        self.stream.align();
        self.stream.write_bytes(octets);
        Ok(())
    }

    /// BIT STRING: length in bits, then the bits padded to whole octets
    fn encode_bit_string(&mut self, bits: &BitString, element: &ElementInfo<'_>) -> PerResult<()> {
        self.encode_length(bits.num_bits(), element)?;
        self.stream.align();
        self.stream.write_bytes(bits.as_bytes());
        Ok(())
    }

    /// OBJECT IDENTIFIER: length determinant and BER content octets
    fn encode_object_identifier(&mut self, oid: &ObjectIdentifier) -> PerResult<()> {
        let content = oid.to_content_octets();
        encode_length_determinant(&mut self.stream, content.len())?;
        self.stream.write_bytes(&content);
        Ok(())
    }

    /// Character strings are counted in UTF-8 octets
    fn encode_string(&mut self, value: &str, kind: StringKind, element: &ElementInfo<'_>) -> PerResult<()> {
        kind.validate(value)?;
        self.encode_octets(value.as_bytes(), element)
    }

    fn encode_native(&mut self, value: &AsnValue, element: &ElementInfo<'_>, kind: PrimitiveKind) -> PerResult<()> {
        match kind {
            PrimitiveKind::String => self.encode_octets(expect_string(value, element)?.as_bytes(), element),
            PrimitiveKind::Int32 => {
                let value = expect_integer(value, element)?;
                if i32::try_from(value).is_err() {
                    return Err(PerError::ConstraintViolation(format!(
                        "{} does not fit the 32-bit field {}",
                        value,
                        element.name()
                    )));
                }
                self.encode_integer(value, element)
            }
            PrimitiveKind::Int64 => self.encode_integer(expect_integer(value, element)?, element),
            PrimitiveKind::Double => encode_real(&mut self.stream, expect_real(value, element)?),
            PrimitiveKind::Bool => {
                self.stream.write_bit(expect_boolean(value, element)?);
                Ok(())
            }
            PrimitiveKind::Bytes => self.encode_octets(expect_octets(value, element)?, element),
            PrimitiveKind::NativeEnum => match value {
                AsnValue::Enumerated(tag) | AsnValue::Integer(tag) => {
                    encode_unconstrained_number(&mut self.stream, *tag)
                }
                other => Err(mismatch(element, "native enum", other)),
            },
        }
    }
}

/// Order in which fields go on the wire
///
/// SET fields are sorted by their declared order number; fields without one
/// keep their relative position after the numbered ones.
pub(crate) fn field_order(fields: &[FieldMetadata], set: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fields.len()).collect();
    if set {
        order.sort_by_key(|index| fields[*index].order().unwrap_or(u32::MAX));
    }
    order
}

pub(crate) fn length_bounds(min: i64, max: i64, element: &ElementInfo<'_>) -> PerResult<(usize, usize)> {
    match (usize::try_from(min), usize::try_from(max)) {
        (Ok(min), Ok(max)) => Ok((min, max)),
        _ => Err(PerError::InvalidMetadata(format!(
            "Negative size bound ({}..{}) on {}",
            min,
            max,
            element.name()
        ))),
    }
}

pub(crate) fn size_on_integer(element: &ElementInfo<'_>) -> PerError {
    PerError::InvalidMetadata(format!("SIZE constraint on integer {}", element.name()))
}

fn mismatch(element: &ElementInfo<'_>, expected: &str, found: &AsnValue) -> PerError {
    PerError::TypeDispatch(format!(
        "{} expects a {} value, found {}",
        element.name(),
        expected,
        found.kind_name()
    ))
}

fn expect_boolean(value: &AsnValue, element: &ElementInfo<'_>) -> PerResult<bool> {
    match value {
        AsnValue::Boolean(flag) => Ok(*flag),
        other => Err(mismatch(element, "BOOLEAN", other)),
    }
}

fn expect_integer(value: &AsnValue, element: &ElementInfo<'_>) -> PerResult<i64> {
    match value {
        AsnValue::Integer(number) => Ok(*number),
        other => Err(mismatch(element, "INTEGER", other)),
    }
}

fn expect_real(value: &AsnValue, element: &ElementInfo<'_>) -> PerResult<f64> {
    match value {
        AsnValue::Real(number) => Ok(*number),
        other => Err(mismatch(element, "REAL", other)),
    }
}

fn expect_octets<'v>(value: &'v AsnValue, element: &ElementInfo<'_>) -> PerResult<&'v [u8]> {
    match value {
        AsnValue::OctetString(octets) => Ok(octets),
        other => Err(mismatch(element, "OCTET STRING", other)),
    }
}

fn expect_string<'v>(value: &'v AsnValue, element: &ElementInfo<'_>) -> PerResult<&'v str> {
    match value {
        AsnValue::CharacterString(text) => Ok(text),
        other => Err(mismatch(element, "character string", other)),
    }
}
