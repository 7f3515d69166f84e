//! Core data structures for tether.
//!
//! - [`types`]: the native type graph handed over by the host library resolver
//! - [`shape`]: conversion shapes shared by the generator and the runtime
//! - [`hash`]: deterministic content hashing and struct alias names
//! - [`error`]: type graph errors

pub mod error;
pub mod hash;
pub mod shape;
pub mod types;

pub use error::TypeGraphError;
pub use shape::{Direction, FieldShape, FuncShape, MethodShape, Shape, ShapeId, ShapeKind, ShapeTable};
pub use types::{ChanDir, FloatPrecision, FuncSig, Signedness, TypeGraph, TypeId, TypeKind};
