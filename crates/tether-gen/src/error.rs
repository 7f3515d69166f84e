//! Generation error types.

/// Errors that abort a generation run.
///
/// Types that cannot be converted are not errors: the generator degrades
/// them to opaque pass-through and records a limitation instead.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    /// Failed to parse a type expression.
    #[error("invalid type expression: {detail}")]
    InvalidTypeExpr { detail: String },

    /// A declaration file is structurally valid TOML but semantically wrong.
    #[error("invalid declaration: {detail}")]
    InvalidDeclaration { detail: String },

    /// A type expression names a type that was never declared.
    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    /// A method whose receiver and own signature both introduce type
    /// parameters. The input resolver must never produce one.
    #[error(
        "method on '{receiver}' declares type parameters on both the receiver [{}] and the signature [{}]",
        receiver_params.join(", "),
        own_params.join(", ")
    )]
    ConflictingTypeParams {
        receiver: String,
        receiver_params: Vec<String>,
        own_params: Vec<String>,
    },

    /// Type graph construction error.
    #[error("type graph error: {0}")]
    Graph(#[from] tether_core::TypeGraphError),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenError>;
