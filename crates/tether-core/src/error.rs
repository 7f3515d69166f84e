//! Type graph errors.

use crate::types::TypeId;

/// Errors raised while building or reading a [`TypeGraph`](crate::types::TypeGraph).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeGraphError {
    #[error("unknown type {id}")]
    UnknownType { id: TypeId },

    #[error("type name '{name}' is already declared")]
    DuplicateName { name: String },

    #[error("named type '{name}' is already defined")]
    AlreadyDefined { name: String },

    #[error("named type '{name}' was declared but never defined")]
    Undefined { name: String },

    #[error("type {id} is not a named type")]
    NotNamed { id: TypeId },
}

/// Result type alias for type graph operations.
pub type Result<T> = std::result::Result<T, TypeGraphError>;
