//! Converter generation for tether.
//!
//! Pipeline: a [`declaration::Declaration`] is lowered into a type graph,
//! the [`canonical::Canonicalizer`] interns canonical types, the
//! [`generator::Generator`] picks conversion shapes and registers converter
//! entries, and [`emit`] renders the Rust module and the JSON manifest.

pub mod canonical;
pub mod declaration;
pub mod emit;
pub mod error;
pub mod generator;
pub mod typexpr;

pub use canonical::{CanonId, CanonKind, Canonicalizer};
pub use declaration::{Declaration, Lowered, Request};
pub use error::{GenError, Result};
pub use generator::{
    generate, Bindings, BridgeSupport, ConverterEntry, ConverterId, Export, Generator, Limitation,
};
