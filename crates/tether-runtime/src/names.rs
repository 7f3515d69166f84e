//! Readable names for anonymous struct aliases.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::ConversionError;

/// Maps generated `Struct_<hash>` aliases to their field listings.
#[derive(Debug, Default)]
pub struct TypeNames {
    aliases: RwLock<BTreeMap<String, String>>,
}

impl TypeNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-registering an alias keeps the first listing.
    pub fn register_alias(&self, alias: &str, listing: &str) {
        self.aliases
            .write()
            .entry(alias.to_string())
            .or_insert_with(|| listing.to_string());
    }

    pub fn listing(&self, alias: &str) -> Option<String> {
        self.aliases.read().get(alias).cloned()
    }

    pub fn len(&self) -> usize {
        self.aliases.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.read().is_empty()
    }

    /// `name` itself, or for an alias its fields spelled out.
    pub fn describe(&self, name: &str) -> String {
        match self.aliases.read().get(name) {
            Some(listing) => {
                let fields: Vec<&str> = listing
                    .split(';')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .collect();
                format!("{name} {{{}}}", fields.join("; "))
            }
            None => name.to_string(),
        }
    }

    /// Rewrite the type names in `error` with [`describe`](Self::describe).
    pub fn explain(&self, error: ConversionError) -> ConversionError {
        if self.is_empty() {
            return error;
        }
        match error {
            ConversionError::TypeMismatch { expected, actual } => ConversionError::TypeMismatch {
                expected: self.describe(&expected),
                actual,
            },
            ConversionError::LengthMismatch {
                type_name,
                expected,
                actual,
            } => ConversionError::LengthMismatch {
                type_name: self.describe(&type_name),
                expected,
                actual,
            },
            ConversionError::InvalidNilSentinel { type_name, value } => ConversionError::InvalidNilSentinel {
                type_name: self.describe(&type_name),
                value,
            },
            ConversionError::MissingField { type_name, field } => ConversionError::MissingField {
                type_name: self.describe(&type_name),
                field,
            },
            ConversionError::InField { field, source } => ConversionError::InField {
                field,
                source: Box::new(self.explain(*source)),
            },
            ConversionError::Argument {
                callee,
                position,
                source,
            } => ConversionError::Argument {
                callee,
                position,
                source: Box::new(self.explain(*source)),
            },
            other => other,
        }
    }
}
