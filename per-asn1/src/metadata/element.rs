//! Per-call-frame element context

use super::types::{Constraint, FieldMetadata, TypeMetadata};
use std::sync::Arc;

/// Context for one encode/decode step
///
/// A frame describes the element being processed: its resolved type
/// metadata, the field it was reached through (if any), the enclosing
/// constructed type, the effective constraint and the remaining
/// max-available-length budget in bits (`None` = unbounded).
///
/// Frames are immutable. Children are derived with [`ElementInfo::for_field`],
/// [`ElementInfo::for_item`], [`ElementInfo::for_inner`] and
/// [`ElementInfo::for_target`], each of which increments the depth.
#[derive(Debug, Clone)]
pub struct ElementInfo<'a> {
    metadata: Arc<TypeMetadata>,
    field: Option<&'a FieldMetadata>,
    parent: Option<&'a TypeMetadata>,
    constraint: Option<Constraint>,
    max_available_length: Option<usize>,
    depth: usize,
}

impl<'a> ElementInfo<'a> {
    /// Frame for a whole top-level type
    pub fn root(metadata: Arc<TypeMetadata>, max_available_length: Option<usize>) -> Self {
        let constraint = metadata.constraint();
        Self {
            metadata,
            field: None,
            parent: None,
            constraint,
            max_available_length,
            depth: 0,
        }
    }

    /// Frame for a field (or choice alternative) of `parent`
    ///
    /// A constraint declared on the field wins over the field type's own.
    pub fn for_field<'b>(
        &self,
        parent: &'b TypeMetadata,
        field: &'b FieldMetadata,
        metadata: Arc<TypeMetadata>,
        max_available_length: Option<usize>,
    ) -> ElementInfo<'b> {
        let constraint = field.constraint().or_else(|| metadata.constraint());
        ElementInfo {
            metadata,
            field: Some(field),
            parent: Some(parent),
            constraint,
            max_available_length,
            depth: self.depth + 1,
        }
    }

    /// Frame for one item of a SEQUENCE OF
    pub fn for_item<'b>(
        &self,
        parent: &'b TypeMetadata,
        metadata: Arc<TypeMetadata>,
        max_available_length: Option<usize>,
    ) -> ElementInfo<'b> {
        let constraint = metadata.constraint();
        ElementInfo {
            metadata,
            field: None,
            parent: Some(parent),
            constraint,
            max_available_length,
            depth: self.depth + 1,
        }
    }

    /// Frame for the value held by a boxed type
    ///
    /// The wrapper's constraint is pushed down when the inner type declares
    /// none. Field identity (and with it optionality) carries over.
    pub fn for_inner(&self, metadata: Arc<TypeMetadata>) -> ElementInfo<'a> {
        let constraint = metadata.constraint().or(self.constraint);
        ElementInfo {
            metadata,
            field: self.field,
            parent: self.parent,
            constraint,
            max_available_length: self.max_available_length,
            depth: self.depth + 1,
        }
    }

    /// Frame re-entering dispatch with the attributes of an element target
    pub fn for_target(&self, metadata: Arc<TypeMetadata>) -> ElementInfo<'a> {
        let constraint = self.constraint.or_else(|| metadata.constraint());
        ElementInfo {
            metadata,
            field: self.field,
            parent: self.parent,
            constraint,
            max_available_length: self.max_available_length,
            depth: self.depth + 1,
        }
    }

    pub fn metadata(&self) -> &TypeMetadata {
        &self.metadata
    }

    pub fn field(&self) -> Option<&'a FieldMetadata> {
        self.field
    }

    /// Effective constraint of this element
    pub fn constraint(&self) -> Option<Constraint> {
        self.constraint
    }

    /// Remaining budget in bits, `None` when unbounded
    pub fn max_available_length(&self) -> Option<usize> {
        self.max_available_length
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_optional(&self) -> bool {
        self.field.is_some_and(FieldMetadata::is_optional)
    }

    /// Field name when reached through a field, else the type name
    pub fn name(&self) -> &str {
        match self.field {
            Some(field) => field.name(),
            None => self.metadata.name(),
        }
    }

    /// Name prefixed with the enclosing type, for diagnostics
    pub fn qualified_name(&self) -> String {
        match self.parent {
            Some(parent) => format!("{}.{}", parent.name(), self.name()),
            None => self.name().to_string(),
        }
    }
}
