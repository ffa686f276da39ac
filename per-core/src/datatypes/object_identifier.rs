//! OBJECT IDENTIFIER value type

use crate::error::{PerError, PerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ASN.1 OBJECT IDENTIFIER
///
/// Holds the arcs of the identifier (e.g. `1.2.840.113549`). The wire form
/// used by PER is the same content octets BER uses: the first two arcs are
/// combined as `40 * X + Y`, then every sub-identifier is written in
/// base-128 with bit 8 set on all but its last octet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectIdentifier {
    arcs: Vec<u32>,
}

impl ObjectIdentifier {
    /// Create an object identifier from its arcs
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - fewer than two arcs are given
    /// - the first arc is greater than 2
    /// - the second arc is 40 or more while the first arc is 0 or 1
    pub fn new(arcs: Vec<u32>) -> PerResult<Self> {
        if arcs.len() < 2 {
            return Err(PerError::InvalidData(
                "Object identifier must have at least 2 components".to_string(),
            ));
        }
        if arcs[0] > 2 {
            return Err(PerError::InvalidData(format!(
                "First OID arc must be 0, 1 or 2, got {}",
                arcs[0]
            )));
        }
        if arcs[0] < 2 && arcs[1] >= 40 {
            return Err(PerError::InvalidData(format!(
                "Second OID arc must be below 40 under arc {}, got {}",
                arcs[0], arcs[1]
            )));
        }
        Ok(Self { arcs })
    }

    /// Get the arcs
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Encode to BER content octets (no tag, no length)
    pub fn to_content_octets(&self) -> Vec<u8> {
        let first = 40u64 * u64::from(self.arcs[0]) + u64::from(self.arcs[1]);
        let mut bytes = Vec::with_capacity(self.arcs.len() * 2);
        push_base128(&mut bytes, first);
        for &component in &self.arcs[2..] {
            push_base128(&mut bytes, u64::from(component));
        }
        bytes
    }

    /// Decode from BER content octets
    ///
    /// # Errors
    /// Returns error if the content is empty, a sub-identifier is truncated
    /// or an arc does not fit in 32 bits.
    pub fn from_content_octets(value: &[u8]) -> PerResult<Self> {
        if value.is_empty() {
            return Err(PerError::InvalidData("Empty object identifier encoding".to_string()));
        }

        let mut arcs = Vec::new();
        let mut component = 0u64;
        let mut in_progress = false;
        for &byte in value {
            if !in_progress && byte == 0x80 {
                return Err(PerError::InvalidData(
                    "Sub-identifier has a redundant leading octet".to_string(),
                ));
            }
            component = component
                .checked_mul(128)
                .and_then(|x| x.checked_add(u64::from(byte & 0x7F)))
                .filter(|x| *x <= u64::from(u32::MAX) + 80)
                .ok_or_else(|| PerError::InvalidData("OID component overflow".to_string()))?;
            in_progress = byte & 0x80 != 0;
            if !in_progress {
                if arcs.is_empty() {
                    let (x, y) = match component {
                        0..=39 => (0, component),
                        40..=79 => (1, component - 40),
                        _ => (2, component - 80),
                    };
                    arcs.push(x as u32);
                    arcs.push(to_arc(y)?);
                } else {
                    arcs.push(to_arc(component)?);
                }
                component = 0;
            }
        }
        if in_progress {
            return Err(PerError::InvalidData("Truncated OID sub-identifier".to_string()));
        }

        Ok(Self { arcs })
    }
}

fn to_arc(value: u64) -> PerResult<u32> {
    u32::try_from(value).map_err(|_| PerError::InvalidData(format!("OID arc {} exceeds 32 bits", value)))
}

fn push_base128(bytes: &mut Vec<u8>, mut value: u64) {
    let mut groups = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        groups.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    groups.reverse();
    bytes.extend_from_slice(&groups);
}

impl FromStr for ObjectIdentifier {
    type Err = PerError;

    /// Parse dotted-decimal notation, e.g. `"1.0.8571.2"`
    fn from_str(s: &str) -> PerResult<Self> {
        let arcs = s
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| PerError::InvalidData(format!("Invalid OID arc: {}", part)))
            })
            .collect::<PerResult<Vec<u32>>>()?;
        Self::new(arcs)
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dotted: Vec<String> = self.arcs.iter().map(|arc| arc.to_string()).collect();
        write!(f, "{}", dotted.join("."))
    }
}
