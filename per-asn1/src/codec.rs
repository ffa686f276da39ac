//! Codec front end
//!
//! # Usage Example
//!
//! ```rust
//! use per_asn1::PerCodec;
//!
//! let codec = PerCodec::new();
//! let mut wire = Vec::new();
//! let written = codec.encode(&vec![1u8, 2, 3], &mut wire)?;
//! assert_eq!(written, wire.len());
//!
//! let decoded: Vec<u8> = codec.decode(&mut wire.as_slice())?;
//! assert_eq!(decoded, vec![1, 2, 3]);
//! # Ok::<(), per_core::PerError>(())
//! ```

use crate::config::{PerCodecBuilder, PerConfig};
use crate::metadata::{ElementInfo, TypeRef};
use crate::per::decoder::PerDecoder;
use crate::per::encoder::PerEncoder;
use crate::types::AsnType;
use crate::value::{AsnValue, DecodedObject};
use bytes::Bytes;
use per_core::{PerError, PerResult};
use std::io::{Read, Write};

/// Codec used by the free [`encode`] and [`decode`] functions
static DEFAULT_CODEC: once_cell::sync::Lazy<PerCodec> = once_cell::sync::Lazy::new(PerCodec::new);

/// PER aligned encoder/decoder
///
/// A codec holds only configuration and a shared metadata provider; every
/// call builds its own stream state, so one codec can serve any number of
/// threads at once.
#[derive(Debug, Default)]
pub struct PerCodec {
    config: PerConfig,
}

impl PerCodec {
    /// Create a codec with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> PerCodecBuilder {
        PerCodecBuilder::new()
    }

    pub(crate) fn with_config(config: PerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PerConfig {
        &self.config
    }

    /// Encode `value` and write it to `out`
    ///
    /// # Returns
    /// Number of octets written
    pub fn encode<T: AsnType, W: Write>(&self, value: &T, out: &mut W) -> PerResult<usize> {
        let encoded = self.encode_to_bytes(value)?;
        out.write_all(&encoded)?;
        Ok(encoded.len())
    }

    /// Encode `value` into a buffer
    pub fn encode_to_bytes<T: AsnType>(&self, value: &T) -> PerResult<Bytes> {
        self.encode_value(&value.to_asn_value(), &TypeRef::of::<T>())
    }

    /// Encode a generic value tree against the metadata of `ty`
    pub fn encode_value(&self, value: &AsnValue, ty: &TypeRef) -> PerResult<Bytes> {
        let metadata = self.config.provider().resolve(ty);
        let element = ElementInfo::root(metadata, None);
        let mut encoder = PerEncoder::new(&self.config);
        let bits = encoder.encode_value(value, &element)?;
        let encoded = encoder.finish();
        log::debug!("Encoded {} in {} bits ({} octets)", ty.name(), bits, encoded.len());
        Ok(encoded)
    }

    /// Read `input` to the end and decode one `T` from it
    pub fn decode<T: AsnType, R: Read>(&self, input: &mut R) -> PerResult<T> {
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer)?;
        self.decode_from_slice(&buffer)
    }

    pub fn decode_from_slice<T: AsnType>(&self, input: &[u8]) -> PerResult<T> {
        let decoded = self.decode_value(input, &TypeRef::of::<T>())?;
        T::from_asn_value(decoded.value)
    }

    /// Decode a generic value tree described by `ty`
    ///
    /// The whole input is the root element's budget.
    pub fn decode_value(&self, input: &[u8], ty: &TypeRef) -> PerResult<DecodedObject<AsnValue>> {
        let metadata = self.config.provider().resolve(ty);
        let element = ElementInfo::root(metadata, Some(input.len() * 8));
        let mut decoder = PerDecoder::new(input, &self.config);
        let decoded = decoder.decode_value(&element)?.ok_or_else(|| {
            PerError::ChoiceResolution(format!("{} does not have a selected item", ty.name()))
        })?;
        log::debug!("Decoded {} from {} of {} bits", ty.name(), decoded.size, input.len() * 8);
        Ok(decoded)
    }
}

/// Encode `value` to `out` with the default codec
pub fn encode<T: AsnType, W: Write>(value: &T, out: &mut W) -> PerResult<usize> {
    DEFAULT_CODEC.encode(value, out)
}

/// Decode a `T` from `input` with the default codec
pub fn decode<T: AsnType, R: Read>(input: &mut R) -> PerResult<T> {
    DEFAULT_CODEC.decode(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Constraint, EnumItem, FieldMetadata, StringKind, TypeMetadata, UncachedProvider};
    use per_core::{BitString, ObjectIdentifier};
    use std::sync::Arc;

    fn encode_with(codec: &PerCodec, value: &AsnValue, metadata: TypeMetadata) -> PerResult<Vec<u8>> {
        codec
            .encode_value(value, &TypeRef::inline(metadata))
            .map(|bytes| bytes.to_vec())
    }

    fn wire(value: &AsnValue, metadata: TypeMetadata) -> PerResult<Vec<u8>> {
        encode_with(&PerCodec::new(), value, metadata)
    }

    fn read(input: &[u8], metadata: TypeMetadata) -> PerResult<AsnValue> {
        PerCodec::new()
            .decode_value(input, &TypeRef::inline(metadata))
            .map(|decoded| decoded.value)
    }

    fn triple() -> TypeMetadata {
        TypeMetadata::sequence(
            "Triple",
            vec![
                FieldMetadata::new("a", TypeRef::of::<u8>()).optional(),
                FieldMetadata::new("b", TypeRef::of::<u8>()).optional(),
                FieldMetadata::new("c", TypeRef::of::<u8>()).optional(),
            ],
        )
    }

    #[test]
    fn test_sequence_preamble_with_second_field_only() {
        let value = AsnValue::Sequence(vec![None, Some(AsnValue::Integer(0x2A)), None]);
        let encoded = wire(&value, triple()).unwrap();
        // preamble 010, padded, then the u8 field
        assert_eq!(encoded, vec![0x40, 0x2A]);
        assert_eq!(read(&encoded, triple()).unwrap(), value);
    }

    #[test]
    fn test_sequence_requires_mandatory_fields() {
        let metadata = TypeMetadata::sequence(
            "Reading",
            vec![FieldMetadata::new("value", TypeRef::of::<u8>())],
        );
        let value = AsnValue::Sequence(vec![None]);
        assert!(matches!(wire(&value, metadata.clone()), Err(PerError::MissingField(_))));

        let value = AsnValue::Sequence(vec![]);
        assert!(matches!(wire(&value, metadata), Err(PerError::TypeDispatch(_))));
    }

    #[test]
    fn test_set_uses_declared_order() {
        let metadata = TypeMetadata::set(
            "Pair",
            vec![
                FieldMetadata::new("first", TypeRef::of::<u8>()).set_order(2),
                FieldMetadata::new("second", TypeRef::of::<u8>()).set_order(1),
            ],
        );
        let value = AsnValue::Sequence(vec![Some(AsnValue::Integer(1)), Some(AsnValue::Integer(2))]);
        let encoded = wire(&value, metadata.clone()).unwrap();
        assert_eq!(encoded, vec![0x02, 0x01]);
        assert_eq!(read(&encoded, metadata).unwrap(), value);
    }

    #[test]
    fn test_set_preamble_follows_declared_order() {
        let metadata = TypeMetadata::set(
            "Pair",
            vec![
                FieldMetadata::new("a", TypeRef::of::<u8>()).optional().set_order(2),
                FieldMetadata::new("b", TypeRef::of::<u8>()).optional().set_order(1),
            ],
        );
        // wire order is [b, a]: preamble 01, then a
        let value = AsnValue::Sequence(vec![Some(AsnValue::Integer(5)), None]);
        let encoded = wire(&value, metadata.clone()).unwrap();
        assert_eq!(encoded, vec![0x40, 0x05]);
        assert_eq!(read(&encoded, metadata.clone()).unwrap(), value);

        let value = AsnValue::Sequence(vec![None, Some(AsnValue::Integer(9))]);
        let encoded = wire(&value, metadata.clone()).unwrap();
        assert_eq!(encoded, vec![0x80, 0x09]);
        assert_eq!(read(&encoded, metadata).unwrap(), value);
    }

    #[test]
    fn test_single_alternative_choice_has_no_index_bits() {
        let single = TypeMetadata::choice("Only", vec![FieldMetadata::new("flag", TypeRef::of::<bool>())]);
        let value = AsnValue::choice(0, AsnValue::Boolean(true));
        let encoded = wire(&value, single.clone()).unwrap();
        assert_eq!(encoded, vec![0x80]);
        assert_eq!(read(&encoded, single).unwrap(), value);

        let pair = TypeMetadata::choice(
            "Either",
            vec![
                FieldMetadata::new("number", TypeRef::of::<u8>()),
                FieldMetadata::new("flag", TypeRef::of::<bool>()),
            ],
        );
        let value = AsnValue::choice(1, AsnValue::Boolean(true));
        let encoded = wire(&value, pair.clone()).unwrap();
        // index bit 1, flag bit 1
        assert_eq!(encoded, vec![0xC0]);
        assert_eq!(read(&encoded, pair).unwrap(), value);
    }

    #[test]
    fn test_unselected_choice_is_rejected() {
        let metadata = TypeMetadata::choice(
            "Three",
            vec![
                FieldMetadata::new("a", TypeRef::of::<bool>()),
                FieldMetadata::new("b", TypeRef::of::<bool>()),
                FieldMetadata::new("c", TypeRef::of::<bool>()),
            ],
        );
        assert!(matches!(
            wire(&AsnValue::Choice(None), metadata.clone()),
            Err(PerError::ChoiceResolution(_))
        ));
        // index bits 11 select a fourth alternative that does not exist
        assert!(matches!(read(&[0xC0], metadata.clone()), Err(PerError::ChoiceResolution(_))));

        let holder = TypeMetadata::sequence(
            "Holder",
            vec![FieldMetadata::new("pick", TypeRef::inline(metadata)).optional()],
        );
        assert_eq!(read(&[0x80, 0xC0], holder.clone()).unwrap(), AsnValue::Sequence(vec![None]));

        let value = AsnValue::Sequence(vec![Some(AsnValue::Choice(None))]);
        match wire(&value, holder) {
            Err(PerError::ChoiceResolution(message)) => assert!(message.contains("Holder.pick")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_extensible_choice_uses_normally_small_index() {
        let metadata = TypeMetadata::extensible_choice(
            "Open",
            vec![
                FieldMetadata::new("number", TypeRef::of::<u8>()),
                FieldMetadata::new("flag", TypeRef::of::<bool>()),
            ],
        );
        let value = AsnValue::choice(1, AsnValue::Boolean(true));
        let encoded = wire(&value, metadata.clone()).unwrap();
        // 0 000001 then the flag bit
        assert_eq!(encoded, vec![0x03]);
        assert_eq!(read(&encoded, metadata).unwrap(), value);
    }

    #[test]
    fn test_enumerated_encodes_position_of_tag() {
        let metadata = TypeMetadata::enumerated(
            "Level",
            vec![EnumItem::new("low", 10), EnumItem::new("mid", 20), EnumItem::new("high", 30)],
        );
        let encoded = wire(&AsnValue::Enumerated(30), metadata.clone()).unwrap();
        assert_eq!(encoded, vec![0x80]);
        assert_eq!(read(&encoded, metadata.clone()).unwrap(), AsnValue::Enumerated(30));

        assert!(matches!(
            wire(&AsnValue::Enumerated(2), metadata.clone()),
            Err(PerError::ConstraintViolation(_))
        ));
        assert!(matches!(read(&[0xC0], metadata), Err(PerError::MalformedInput(_))));
    }

    #[test]
    fn test_boxed_type_propagates_constraint() {
        let metadata = TypeMetadata::boxed("Percent", TypeRef::of::<i64>()).with_constraint(Constraint::range(0, 100));
        let value = AsnValue::boxed(AsnValue::Integer(100));
        let encoded = wire(&value, metadata.clone()).unwrap();
        // 7-bit field 1100100
        assert_eq!(encoded, vec![0xC8]);
        assert_eq!(read(&encoded, metadata.clone()).unwrap(), value);

        assert!(matches!(
            wire(&AsnValue::Integer(101), metadata),
            Err(PerError::ConstraintViolation(_))
        ));

        let unconstrained = TypeMetadata::boxed("Count", TypeRef::of::<i64>());
        assert_eq!(wire(&AsnValue::Integer(100), unconstrained).unwrap(), vec![0x01, 0x64]);
    }

    #[test]
    fn test_element_wrapper_redispatches() {
        let metadata = TypeMetadata::element("Alias", TypeRef::of::<u16>());
        let encoded = wire(&AsnValue::Integer(300), metadata.clone()).unwrap();
        assert_eq!(encoded, vec![0x01, 0x2C]);
        assert_eq!(read(&encoded, metadata).unwrap(), AsnValue::Integer(300));
    }

    #[test]
    fn test_sized_octet_strings() {
        let short = TypeMetadata::octet_string("Short").with_constraint(Constraint::range(1, 4));
        let value = AsnValue::OctetString(vec![0xAB, 0xCD]);
        let encoded = wire(&value, short.clone()).unwrap();
        // length 2 as offset 1 over [1, 4], then aligned octets
        assert_eq!(encoded, vec![0x40, 0xAB, 0xCD]);
        assert_eq!(read(&encoded, short.clone()).unwrap(), value);
        assert!(matches!(
            wire(&AsnValue::OctetString(vec![0; 5]), short),
            Err(PerError::ConstraintViolation(_))
        ));

        let fixed = TypeMetadata::sequence_of("Pair", TypeRef::of::<u8>()).with_constraint(Constraint::fixed_size(2));
        let value = AsnValue::SequenceOf(vec![AsnValue::Integer(1), AsnValue::Integer(2)]);
        let encoded = wire(&value, fixed.clone()).unwrap();
        assert_eq!(encoded, vec![0x01, 0x02]);
        assert_eq!(read(&encoded, fixed.clone()).unwrap(), value);
        assert!(matches!(
            wire(&AsnValue::SequenceOf(vec![AsnValue::Integer(1)]), fixed),
            Err(PerError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_character_string_alphabet() {
        let metadata = TypeMetadata::character_string("Name", StringKind::Printable);
        let value = AsnValue::CharacterString("Feeder 12".to_string());
        let encoded = wire(&value, metadata.clone()).unwrap();
        assert_eq!(encoded[0], 9);
        assert_eq!(&encoded[1..], b"Feeder 12");
        assert_eq!(read(&encoded, metadata.clone()).unwrap(), value);

        let value = AsnValue::CharacterString("a@b".to_string());
        assert!(matches!(wire(&value, metadata), Err(PerError::ConstraintViolation(_))));
    }

    #[test]
    fn test_object_identifier_and_bit_string() {
        let codec = PerCodec::new();
        let oid = ObjectIdentifier::new(vec![1, 2, 840, 113549]).unwrap();
        let encoded = codec.encode_to_bytes(&oid).unwrap();
        assert_eq!(&encoded[..], &[0x06, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D]);
        assert_eq!(codec.decode_from_slice::<ObjectIdentifier>(&encoded).unwrap(), oid);

        let bits = BitString::new(vec![0b1010_0000], 3).unwrap();
        let encoded = codec.encode_to_bytes(&bits).unwrap();
        assert_eq!(&encoded[..], &[0x03, 0xA0]);
        assert_eq!(codec.decode_from_slice::<BitString>(&encoded).unwrap(), bits);
    }

    #[test]
    fn test_any_consumes_rest_of_frame() {
        let metadata = TypeMetadata::sequence(
            "Envelope",
            vec![
                FieldMetadata::new("tag", TypeRef::of::<u8>()),
                FieldMetadata::new("body", TypeRef::inline(TypeMetadata::any("ANY"))),
            ],
        );
        let value = AsnValue::Sequence(vec![
            Some(AsnValue::Integer(7)),
            Some(AsnValue::Any(vec![0xDE, 0xAD])),
        ]);
        let encoded = wire(&value, metadata.clone()).unwrap();
        assert_eq!(encoded, vec![0x07, 0xDE, 0xAD]);
        assert_eq!(read(&encoded, metadata).unwrap(), value);
    }

    #[test]
    fn test_native_fallbacks() {
        let codec = PerCodec::new();
        let encoded = codec.encode_to_bytes(&vec![1.5f64]).unwrap();
        assert_eq!(&encoded[..], &[0x01, 0x03, 0x80, 0xFF, 0x03]);
        assert_eq!(codec.decode_from_slice::<Vec<f64>>(&encoded).unwrap(), vec![1.5]);

        let encoded = codec.encode_to_bytes(&-1i32).unwrap();
        assert_eq!(&encoded[..], &[0x01, 0xFF]);
        assert_eq!(codec.decode_from_slice::<i32>(&encoded).unwrap(), -1);

        assert!(matches!(
            codec.encode_value(&AsnValue::Integer(1 << 40), &TypeRef::of::<i32>()),
            Err(PerError::ConstraintViolation(_))
        ));
        assert!(matches!(
            codec.encode_value(&AsnValue::Boolean(true), &TypeRef::of::<i64>()),
            Err(PerError::TypeDispatch(_))
        ));
    }

    #[test]
    fn test_free_functions_use_default_codec() {
        let mut out = Vec::new();
        let written = encode(&"hello".to_string(), &mut out).unwrap();
        assert_eq!(written, 6);
        assert_eq!(out, b"\x05hello".to_vec());

        let decoded: String = decode(&mut out.as_slice()).unwrap();
        assert_eq!(decoded, "hello");
    }

    #[test]
    fn test_decoded_size_in_bits() {
        let decoded = PerCodec::new()
            .decode_value(&[0x40, 0x2A, 0xFF], &TypeRef::inline(triple()))
            .unwrap();
        assert_eq!(decoded.size, 16);
    }

    #[test]
    fn test_rejects_oversized_length_claims() {
        let codec = PerCodec::new();
        assert!(matches!(
            codec.decode_from_slice::<Bytes>(&[0x85, 0x00]),
            Err(PerError::MalformedInput(_))
        ));

        let strict = PerCodec::builder().max_decode_length(2).build();
        assert!(matches!(
            strict.decode_from_slice::<Vec<bool>>(&[0x03, 0xE0]),
            Err(PerError::MalformedInput(_))
        ));
        assert_eq!(codec.decode_from_slice::<Vec<bool>>(&[0x03, 0xA0]).unwrap(), vec![true, false, true]);

        assert!(matches!(
            codec.decode_from_slice::<Bytes>(&[0xC1, 0x00]),
            Err(PerError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_depth_limit() {
        let codec = PerCodec::builder().max_depth(1).build();
        let nested = vec![vec![vec![1u8]]];
        assert!(matches!(codec.encode_to_bytes(&nested), Err(PerError::TypeDispatch(_))));

        let encoded = PerCodec::new().encode_to_bytes(&nested).unwrap();
        assert_eq!(&encoded[..], &[0x01, 0x01, 0x01, 0x01]);
        assert!(matches!(
            codec.decode_from_slice::<Vec<Vec<Vec<u8>>>>(&encoded),
            Err(PerError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_cached_and_uncached_providers_agree() {
        let cached = PerCodec::new();
        let uncached = PerCodec::builder().metadata_provider(Arc::new(UncachedProvider)).build();
        let value = AsnValue::Sequence(vec![Some(AsnValue::Integer(9)), None, Some(AsnValue::Integer(200))]);
        assert_eq!(
            encode_with(&cached, &value, triple()).unwrap(),
            encode_with(&uncached, &value, triple()).unwrap()
        );

        let shared = Arc::new(crate::metadata::MetadataCache::new());
        let first = PerCodec::builder().metadata_provider(shared.clone()).build();
        let second = PerCodec::builder().metadata_provider(shared.clone()).build();
        let a = first.encode_to_bytes(&vec![1u16, 2]).unwrap();
        let b = second.encode_to_bytes(&vec![1u16, 2]).unwrap();
        assert_eq!(a, b);
        assert_eq!(shared.len(), 2);
    }

    #[test]
    fn test_boxed_rust_type_is_transparent() {
        let codec = PerCodec::new();
        let encoded = codec.encode_to_bytes(&Box::new(7u8)).unwrap();
        assert_eq!(&encoded[..], &[0x07]);
        assert_eq!(*codec.decode_from_slice::<Box<u8>>(&encoded).unwrap(), 7);
    }
}
