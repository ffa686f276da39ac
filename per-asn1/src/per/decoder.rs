//! PER aligned decoder
//!
//! [`PerDecoder`] mirrors the encoder: it classifies each element, reads its
//! encoding and reports how many bits were consumed so constructed types can
//! track the max-available-length budget of their children.
//!
//! Every length or count taken from the wire is checked against the
//! configured limit and the bits actually left before anything is
//! allocated.

use crate::bitstream::BitInputStream;
use crate::config::PerConfig;
use crate::metadata::{
    Constraint, ElementInfo, EnumItem, FieldMetadata, PrimitiveKind, StringKind, TypeMetadata, TypeRef,
};
use crate::per::encoder::{field_order, length_bounds, size_on_integer};
use crate::per::length::{decode_constrained_length_determinant, decode_length_determinant};
use crate::per::number::{
    decode_constrained_number, decode_normally_small_number, decode_semi_constrained_number,
    decode_unconstrained_number,
};
use crate::per::real::decode_real;
use crate::per::shape::{classify, TypeShape};
use crate::value::{AsnValue, ChoiceValue, DecodedObject};
use per_core::{BitString, ObjectIdentifier, PerError, PerResult};
use std::sync::Arc;

/// Decoder state for one decode call
pub struct PerDecoder<'a, 'c> {
    stream: BitInputStream<'a>,
    config: &'c PerConfig,
}

impl<'a, 'c> PerDecoder<'a, 'c> {
    pub fn new(input: &'a [u8], config: &'c PerConfig) -> Self {
        Self {
            stream: BitInputStream::new(input),
            config,
        }
    }

    /// Bits consumed so far
    pub fn position(&self) -> usize {
        self.stream.position()
    }

    /// Decode the element described by `element`
    ///
    /// # Returns
    /// The value with the number of bits it occupied, or `None` when an
    /// optional CHOICE resolved to no alternative.
    pub fn decode_value(&mut self, element: &ElementInfo<'_>) -> PerResult<Option<DecodedObject<AsnValue>>> {
        if element.depth() > self.config.max_depth() {
            log::warn!("Rejecting {}: nesting limit {} exceeded", element.qualified_name(), self.config.max_depth());
            return Err(PerError::MalformedInput(format!(
                "Nesting depth {} exceeds limit {}",
                element.depth(),
                self.config.max_depth()
            )));
        }

        let start = self.stream.position();
        let shape = classify(element.metadata())?;
        log::trace!("Decoding {} as {} at bit {}", element.name(), shape.name(), start);

        let value = match shape {
            TypeShape::SequenceOf { item } => self.decode_sequence_of(element, item)?,
            TypeShape::Sequence { fields, set } => self.decode_sequence(element, fields, set)?,
            TypeShape::Choice {
                alternatives,
                extensible,
            } => match self.decode_choice(element, alternatives, extensible)? {
                Some(value) => value,
                None => return Ok(None),
            },
            TypeShape::Boxed { inner } => {
                let child = element.for_inner(self.resolve(inner));
                match self.decode_value(&child)? {
                    Some(decoded) => AsnValue::boxed(decoded.value),
                    None => return Ok(None),
                }
            }
            TypeShape::Enumerated { items, extensible } => self.decode_enumerated(element, items, extensible)?,
            TypeShape::Boolean => AsnValue::Boolean(self.stream.read_bit()?),
            TypeShape::Any => AsnValue::Any(self.decode_any(element)?),
            TypeShape::Integer => AsnValue::Integer(self.decode_integer(element)?),
            TypeShape::Real => AsnValue::Real(decode_real(&mut self.stream)?),
            TypeShape::OctetString => AsnValue::OctetString(self.decode_octets(element)?),
            TypeShape::BitString => AsnValue::BitString(self.decode_bit_string(element)?),
            TypeShape::ObjectIdentifier => AsnValue::ObjectIdentifier(self.decode_object_identifier(element)?),
            TypeShape::CharacterString(kind) => AsnValue::CharacterString(self.decode_string(element, Some(kind))?),
            TypeShape::Null => AsnValue::Null,
            TypeShape::Element { target } => {
                let child = element.for_target(self.resolve(target));
                return self.decode_value(&child);
            }
            TypeShape::Fallback(kind) => self.decode_native(element, kind)?,
        };

        Ok(Some(DecodedObject::new(value, self.stream.position() - start)))
    }

    fn resolve(&self, ty: &TypeRef) -> Arc<TypeMetadata> {
        self.config.provider().resolve(ty)
    }

    fn budget(element: &ElementInfo<'_>, consumed: usize) -> Option<usize> {
        element
            .max_available_length()
            .map(|budget| budget.saturating_sub(consumed))
    }

    /// Reject a length claim that cannot be satisfied
    ///
    /// `unit_bits` is the minimum size of one counted unit; 0 skips the
    /// remaining-input check (items of a SEQUENCE OF may occupy no bits).
    fn check_claim(&self, length: usize, unit_bits: usize, element: &ElementInfo<'_>) -> PerResult<()> {
        if length > self.config.max_decode_length() {
            log::warn!(
                "Rejecting {}: length {} above limit {}",
                element.qualified_name(),
                length,
                self.config.max_decode_length()
            );
            return Err(PerError::MalformedInput(format!(
                "{} claims length {} above the limit {}",
                element.name(),
                length,
                self.config.max_decode_length()
            )));
        }
        let needed = length.saturating_mul(unit_bits);
        let available = match element.max_available_length() {
            Some(budget) => budget.min(self.stream.remaining_bits()),
            None => self.stream.remaining_bits(),
        };
        if needed > available {
            log::warn!("Rejecting {}: {} bits claimed, {} available", element.qualified_name(), needed, available);
            return Err(PerError::MalformedInput(format!(
                "{} claims {} bits but only {} are available",
                element.name(),
                needed,
                available
            )));
        }
        Ok(())
    }

    fn decode_sequence(
        &mut self,
        element: &ElementInfo<'_>,
        fields: &[FieldMetadata],
        set: bool,
    ) -> PerResult<AsnValue> {
        let start = self.stream.position();
        let order = field_order(fields, set);
        let mut present = vec![true; fields.len()];
        let mut preamble = 0usize;
        for &index in &order {
            if fields[index].is_optional() {
                present[index] = self.stream.read_bit()?;
                preamble += 1;
            }
        }
        if preamble > 0 {
            self.stream.align();
        }
        log::trace!("{}: {} preamble bits", element.name(), preamble);

        let mut slots: Vec<Option<AsnValue>> = vec![None; fields.len()];
        for index in order {
            if !present[index] {
                continue;
            }
            let field = &fields[index];
            let budget = Self::budget(element, self.stream.position() - start);
            let child = element.for_field(element.metadata(), field, self.resolve(field.type_ref()), budget);
            match self.decode_value(&child)? {
                Some(decoded) => slots[index] = Some(decoded.value),
                None if field.is_optional() => {}
                None => {
                    return Err(PerError::MissingField(format!("{}.{}", element.name(), field.name())));
                }
            }
        }
        Ok(AsnValue::Sequence(slots))
    }

    fn decode_choice(
        &mut self,
        element: &ElementInfo<'_>,
        alternatives: &[FieldMetadata],
        extensible: bool,
    ) -> PerResult<Option<AsnValue>> {
        let start = self.stream.position();
        let index = if extensible {
            usize::try_from(decode_normally_small_number(&mut self.stream)?).unwrap_or(usize::MAX)
        } else {
            match decode_constrained_number(&mut self.stream, 1, alternatives.len() as i64) {
                Ok(number) => (number - 1) as usize,
                Err(PerError::ConstraintViolation(_)) => alternatives.len(),
                Err(other) => return Err(other),
            }
        };

        let Some(alternative) = alternatives.get(index) else {
            if element.is_optional() {
                log::trace!("{}: index {} selects nothing, treated as absent", element.name(), index);
                return Ok(None);
            }
            return Err(PerError::ChoiceResolution(format!(
                "{} does not have a selected item (index {} of {})",
                element.qualified_name(),
                index,
                alternatives.len()
            )));
        };
        log::trace!("{}: selected alternative {}", element.name(), alternative.name());

        let budget = Self::budget(element, self.stream.position() - start);
        let child = element.for_field(element.metadata(), alternative, self.resolve(alternative.type_ref()), budget);
        match self.decode_value(&child)? {
            Some(decoded) => Ok(Some(AsnValue::Choice(Some(ChoiceValue {
                index,
                value: Box::new(decoded.value),
            })))),
            None if element.is_optional() => Ok(None),
            None => Err(PerError::ChoiceResolution(format!(
                "Alternative {} of {} did not resolve",
                alternative.name(),
                element.name()
            ))),
        }
    }

    fn decode_enumerated(
        &mut self,
        element: &ElementInfo<'_>,
        items: &[EnumItem],
        extensible: bool,
    ) -> PerResult<AsnValue> {
        let position = if extensible {
            usize::try_from(decode_normally_small_number(&mut self.stream)?).unwrap_or(usize::MAX)
        } else {
            match decode_constrained_number(&mut self.stream, 0, items.len() as i64 - 1) {
                Ok(number) => number as usize,
                Err(PerError::ConstraintViolation(_)) => items.len(),
                Err(other) => return Err(other),
            }
        };
        items
            .get(position)
            .map(|item| AsnValue::Enumerated(item.tag()))
            .ok_or_else(|| {
                PerError::MalformedInput(format!(
                    "Enumerator index {} out of range for {} ({} items)",
                    position,
                    element.name(),
                    items.len()
                ))
            })
    }

    fn decode_sequence_of(&mut self, element: &ElementInfo<'_>, item: &TypeRef) -> PerResult<AsnValue> {
        let start = self.stream.position();
        let count = self.decode_length(element)?;
        self.check_claim(count, 0, element)?;
        log::trace!("{}: {} items", element.name(), count);

        let item_metadata = self.resolve(item);
        let mut items = Vec::with_capacity(count);
        for position in 0..count {
            let budget = Self::budget(element, self.stream.position() - start);
            let child = element.for_item(element.metadata(), Arc::clone(&item_metadata), budget);
            match self.decode_value(&child)? {
                Some(decoded) => items.push(decoded.value),
                None => {
                    return Err(PerError::MissingField(format!("{}[{}]", element.name(), position)));
                }
            }
        }
        Ok(AsnValue::SequenceOf(items))
    }

    fn decode_integer(&mut self, element: &ElementInfo<'_>) -> PerResult<i64> {
        match element.constraint() {
            Some(Constraint::ValueRange { min, max }) => decode_constrained_number(&mut self.stream, min, max),
            Some(Constraint::LowerBound { min }) => decode_semi_constrained_number(&mut self.stream, min),
            Some(Constraint::FixedSize { .. }) => Err(size_on_integer(element)),
            None => decode_unconstrained_number(&mut self.stream),
        }
    }

    fn decode_length(&mut self, element: &ElementInfo<'_>) -> PerResult<usize> {
        let length = match element.constraint() {
            None => return decode_length_determinant(&mut self.stream),
            Some(Constraint::ValueRange { min, max }) => {
                let (min, max) = length_bounds(min, max, element)?;
                decode_constrained_length_determinant(&mut self.stream, min, max)?
            }
            Some(Constraint::FixedSize { size }) => size,
            Some(Constraint::LowerBound { .. }) => decode_length_determinant(&mut self.stream)?,
        };
        if let Some(constraint) = element.constraint() {
            constraint.check_length(length)?;
        }
        Ok(length)
    }

    fn decode_octets(&mut self, element: &ElementInfo<'_>) -> PerResult<Vec<u8>> {
        let length = self.decode_length(element)?;
        self.check_claim(length, 8, element)?;
        self.stream.align();
        self.stream.read_bytes(length)
    }

    fn decode_bit_string(&mut self, element: &ElementInfo<'_>) -> PerResult<BitString> {
        let num_bits = self.decode_length(element)?;
        self.check_claim(num_bits, 1, element)?;
        self.stream.align();
        let octets = self.stream.read_bytes(num_bits.div_ceil(8))?;
        BitString::new(octets, num_bits).map_err(|e| PerError::MalformedInput(e.to_string()))
    }

    fn decode_object_identifier(&mut self, element: &ElementInfo<'_>) -> PerResult<ObjectIdentifier> {
        let length = decode_length_determinant(&mut self.stream)?;
        self.check_claim(length, 8, element)?;
        let content = self.stream.read_bytes(length)?;
        ObjectIdentifier::from_content_octets(&content).map_err(|e| PerError::MalformedInput(e.to_string()))
    }

    fn decode_string(&mut self, element: &ElementInfo<'_>, kind: Option<StringKind>) -> PerResult<String> {
        let octets = self.decode_octets(element)?;
        let text = String::from_utf8(octets).map_err(|e| {
            PerError::MalformedInput(format!("{} is not valid UTF-8: {}", element.name(), e))
        })?;
        if let Some(kind) = kind {
            kind.validate(&text)?;
        }
        Ok(text)
    }

    /// ANY takes whatever is left of its frame's budget
    fn decode_any(&mut self, element: &ElementInfo<'_>) -> PerResult<Vec<u8>> {
        let start = self.stream.position();
        self.stream.align();
        let padding = self.stream.position() - start;
        let available = match element.max_available_length() {
            Some(budget) => budget.saturating_sub(padding).min(self.stream.remaining_bits()),
            None => self.stream.remaining_bits(),
        };
        self.stream.read_bytes(available / 8)
    }

    fn decode_native(&mut self, element: &ElementInfo<'_>, kind: PrimitiveKind) -> PerResult<AsnValue> {
        let value = match kind {
            PrimitiveKind::String => AsnValue::CharacterString(self.decode_string(element, None)?),
            PrimitiveKind::Int32 => {
                let value = self.decode_integer(element)?;
                if i32::try_from(value).is_err() {
                    return Err(PerError::MalformedInput(format!(
                        "{} does not fit the 32-bit field {}",
                        value,
                        element.name()
                    )));
                }
                AsnValue::Integer(value)
            }
            PrimitiveKind::Int64 => AsnValue::Integer(self.decode_integer(element)?),
            PrimitiveKind::Double => AsnValue::Real(decode_real(&mut self.stream)?),
            PrimitiveKind::Bool => AsnValue::Boolean(self.stream.read_bit()?),
            PrimitiveKind::Bytes => AsnValue::OctetString(self.decode_octets(element)?),
            PrimitiveKind::NativeEnum => AsnValue::Enumerated(decode_unconstrained_number(&mut self.stream)?),
        };
        Ok(value)
    }
}
