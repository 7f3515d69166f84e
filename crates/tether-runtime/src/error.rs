//! Runtime conversion errors.

use tether_core::ShapeId;

/// A failure raised by the embedded interpreter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ScriptError {
    pub message: String,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors raised while moving a value across the boundary.
///
/// Messages name the expected shape and the actual value's descriptive type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("{type_name}: expected length {expected}, got {actual}")]
    LengthMismatch {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    #[error("{callee}: expected {expected} arguments, got {actual}")]
    ArityMismatch {
        callee: String,
        expected: usize,
        actual: usize,
    },

    /// Only the integer `0` may stand for nil.
    #[error("{type_name}: integer {value} is not a nil value (only 0 is)")]
    InvalidNilSentinel { type_name: String, value: i64 },

    #[error("{type_name}: missing field '{field}'")]
    MissingField { type_name: String, field: String },

    #[error("field {field}: {source}")]
    InField {
        field: String,
        source: Box<ConversionError>,
    },

    /// `position` is zero-based.
    #[error("{callee}: argument {position}: {source}")]
    Argument {
        callee: String,
        position: usize,
        source: Box<ConversionError>,
    },

    #[error("conversion failed: {detail}")]
    Failure { detail: String },

    /// A channel was used against its declared direction.
    #[error("channel protocol error: {detail}")]
    Protocol { detail: String },

    #[error("cannot implement {interface}: method {method} (arity {expected_arity}): {problem}")]
    InterfaceSynthesis {
        interface: String,
        method: String,
        expected_arity: usize,
        problem: String,
    },

    #[error("{0}")]
    Script(#[from] ScriptError),

    #[error("unknown shape {0}")]
    UnknownShape(ShapeId),
}

impl ConversionError {
    pub(crate) fn mismatch(expected: &str, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.into(),
        }
    }

    pub(crate) fn in_field(field: impl Into<String>, source: ConversionError) -> Self {
        Self::InField {
            field: field.into(),
            source: Box::new(source),
        }
    }
}
