//! PER aligned codec (ITU-T X.691)
//!
//! Scalar codecs are plain functions over the bit streams:
//!
//! - [`length`]: length determinants, plain and constrained
//! - [`number`]: constrained, semi-constrained, unconstrained and normally
//!   small whole numbers
//! - [`real`]: binary (base 2) REAL encoding
//!
//! The type dispatcher is built on top of them: [`shape`] classifies a type,
//! [`encoder`] and [`decoder`] drive the recursive descent.

pub mod length;
pub mod number;
pub mod real;
pub mod shape;
pub mod encoder;
pub mod decoder;

pub use decoder::PerDecoder;
pub use encoder::PerEncoder;
pub use shape::{classify, TypeShape};
