//! Result taxonomy for validation, parsing and packing.
//!
//! Positions are byte offsets into the format string.

/// Why a format string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatViolation {
    #[error("invalid character {ch:?} at {pos}")]
    InvalidCharacter { pos: usize, ch: char },
    #[error("endian marker at {pos}; only allowed at position 0")]
    EndianPlacement { pos: usize },
    #[error("group at {pos} has no repeat count")]
    GroupStart { pos: usize },
    #[error("format must end with a type character or ')' (found {ch:?} at {pos})")]
    Terminator { pos: usize, ch: char },
    #[error("unbalanced or too deeply nested group at {pos}")]
    Grouping { pos: usize },
    #[error("numeral split by whitespace at {pos}")]
    NumeralSpacing { pos: usize },
    #[error("zero count at {pos}")]
    ZeroCount { pos: usize },
    #[error("unexpected input at {pos}")]
    Structure { pos: usize },
}

/// Error returned by every pack/unpack operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PackError {
    #[error("empty format string")]
    EmptyFormat,
    #[error("missing parameter: {0}")]
    MissingParams(&'static str),
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("invalid array syntax at {pos}")]
    InvalidArray { pos: usize },
    #[error("invalid format string: {0}")]
    InvalidFormat(#[from] FormatViolation),
    #[error("count at {pos} overflows")]
    IntOverflow { pos: usize },
    #[error("field count mismatch: {declared} declared, format yields {parsed}")]
    FieldCountMismatch { declared: usize, parsed: usize },
    #[error("buffer overrun: {needed} bytes needed, buffer holds {len}")]
    BufferOverrun { needed: usize, len: usize },
}
