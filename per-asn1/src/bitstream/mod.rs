//! Bit-granular streams over in-memory byte buffers
//!
//! PER packs fields at bit granularity and pads to octet boundaries only at
//! the points X.691 names. These streams provide exactly that: single bits,
//! fixed-width bit fields, whole octets and explicit alignment. Bits within
//! an octet are written and read most-significant first.
//!
//! Neither stream supports seeking; positions only move forward.

pub mod output;
pub mod input;

pub use output::BitOutputStream;
pub use input::BitInputStream;
