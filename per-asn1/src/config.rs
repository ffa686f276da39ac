//! Codec configuration
//!
//! # Usage Example
//!
//! ```rust
//! use per_asn1::{PerCodec, UncachedProvider};
//! use std::sync::Arc;
//!
//! let codec = PerCodec::builder()
//!     .max_depth(16)
//!     .max_decode_length(1024)
//!     .metadata_provider(Arc::new(UncachedProvider))
//!     .build();
//! assert_eq!(codec.config().max_depth(), 16);
//! ```

use crate::codec::PerCodec;
use crate::metadata::{MetadataCache, MetadataProvider};
use crate::per::length::MAX_LENGTH_DETERMINANT;
use std::fmt;
use std::sync::Arc;

/// Default nesting limit for constructed types
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Settings shared by every encode/decode call of a [`PerCodec`]
#[derive(Clone)]
pub struct PerConfig {
    /// Maximum nesting depth of constructed types
    max_depth: usize,
    /// Upper bound on any length or count read from the wire
    max_decode_length: usize,
    /// Resolver for type references
    provider: Arc<dyn MetadataProvider>,
}

impl PerConfig {
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn max_decode_length(&self) -> usize {
        self.max_decode_length
    }

    pub fn provider(&self) -> &dyn MetadataProvider {
        self.provider.as_ref()
    }
}

impl Default for PerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_decode_length: MAX_LENGTH_DETERMINANT,
            provider: Arc::new(MetadataCache::new()),
        }
    }
}

impl fmt::Debug for PerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerConfig")
            .field("max_depth", &self.max_depth)
            .field("max_decode_length", &self.max_decode_length)
            .finish_non_exhaustive()
    }
}

/// Builder for [`PerCodec`]
///
/// # Default Settings
/// - Max depth: 64
/// - Max decode length: 16383
/// - Metadata provider: a fresh [`MetadataCache`]
#[derive(Debug, Default)]
pub struct PerCodecBuilder {
    config: PerConfig,
}

impl PerCodecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the nesting depth of constructed types
    ///
    /// # Returns
    /// Self for method chaining
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Reject decoded lengths and counts above `length`
    ///
    /// # Returns
    /// Self for method chaining
    pub fn max_decode_length(mut self, length: usize) -> Self {
        self.config.max_decode_length = length;
        self
    }

    /// Use `provider` to resolve type metadata
    ///
    /// Sharing one [`MetadataCache`] between several codecs makes them share
    /// resolved metadata as well.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn metadata_provider(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.config.provider = provider;
        self
    }

    pub fn build(self) -> PerCodec {
        PerCodec::with_config(self.config)
    }
}
