//! Runtime conditions raised by the core.
//!
//! Everything here is deterministic given its inputs, so callers never retry;
//! the condition propagates with `?` until a top-level handler reports it.

use std::fmt;

/// Which kind of heap or immediate value a contract expected or received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    String,
    Bytes,
    Char,
    Tuple,
    Array,
    Record,
    Variant,
    Closure,
    Number,
    Int32,
    Int64,
    Float32,
    Float64,
    Integer,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Expected::String => "String",
            Expected::Bytes => "Bytes",
            Expected::Char => "Char",
            Expected::Tuple => "Tuple",
            Expected::Array => "Array",
            Expected::Record => "Record",
            Expected::Variant => "Variant",
            Expected::Closure => "Closure",
            Expected::Number => "Number",
            Expected::Int32 => "Int32",
            Expected::Int64 => "Int64",
            Expected::Float32 => "Float32",
            Expected::Float64 => "Float64",
            Expected::Integer => "integer Number",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("MalformedUtf8: {0}")]
    MalformedUtf8(String),

    #[error("InvalidArgument: {0}")]
    InvalidArgument(String),

    #[error("IndexOutOfBounds: access of {width} byte(s) at {index} in a buffer of {size} byte(s)")]
    IndexOutOfBounds { index: i64, width: usize, size: usize },

    #[error("Overflow: {0}")]
    Overflow(String),

    #[error("DivisionByZero")]
    DivideByZero,

    #[error("ModuloByZero")]
    ModuloByZero,

    #[error("InvalidDigit: {digit:?} is not a digit in radix {radix}")]
    InvalidDigit { digit: char, radix: u32 },

    #[error("WrongType: expected {expected}, got {got}")]
    WrongType { expected: Expected, got: &'static str },
}

impl RuntimeError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        RuntimeError::InvalidArgument(message.into())
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        RuntimeError::Overflow(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        RuntimeError::MalformedUtf8(message.into())
    }

    pub fn index_out_of_bounds(index: i64, width: usize, size: usize) -> Self {
        RuntimeError::IndexOutOfBounds { index, width, size }
    }

    pub fn wrong_type(expected: Expected, got: &'static str) -> Self {
        RuntimeError::WrongType { expected, got }
    }
}
