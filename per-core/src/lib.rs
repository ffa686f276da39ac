//! Core types for the ASN.1 Packed Encoding Rules codec
//!
//! This crate provides the error taxonomy shared by every layer of the codec
//! and the host-side representations of ASN.1 values that have no native
//! Rust counterpart (BIT STRING, OBJECT IDENTIFIER).

pub mod error;
pub mod datatypes;

pub use error::{PerError, PerResult};
pub use datatypes::{BitString, ObjectIdentifier};
