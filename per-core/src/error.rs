use thiserror::Error;

/// Error type for PER encoding and decoding
///
/// Every failure is fatal to the encode/decode call that raised it: the codec
/// never hands back a partially populated value.
#[derive(Error, Debug)]
pub enum PerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Length determinants of 16K units and above need fragmentation,
    /// which this codec does not implement.
    #[error("Length {0} too large: fragmented length determinants are not supported")]
    UnsupportedLength(usize),

    #[error("Unsupported encoding: {0}")]
    Unsupported(String),

    #[error("Choice resolution failed: {0}")]
    ChoiceResolution(String),

    #[error("Type dispatch failed: {0}")]
    TypeDispatch(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for PER operations
pub type PerResult<T> = Result<T, PerError>;
