//! Conversion shapes.
//!
//! A [`Shape`] is the conversion rule chosen for one canonical type. The
//! generator produces a [`ShapeTable`]; generated code and the runtime
//! interpreter both dispatch on [`ShapeKind`]. Shapes reference each other
//! by [`ShapeId`], so recursive types need no special casing here.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ChanDir, FloatPrecision, Signedness};

/// Index of a shape in a [`ShapeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(pub u32);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape#{}", self.0)
    }
}

/// Which way a converter moves a value across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Native value to script value.
    ToScript,
    /// Script value to native value.
    FromScript,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Self::ToScript => Self::FromScript,
            Self::FromScript => Self::ToScript,
        }
    }

    /// Prefix of generated converter identifiers.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::ToScript => "to_script",
            Self::FromScript => "from_script",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToScript => write!(f, "to-script"),
            Self::FromScript => write!(f, "from-script"),
        }
    }
}

/// Parameter and result shapes of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncShape {
    pub params: Vec<ShapeId>,
    pub results: Vec<ShapeId>,
    /// The last parameter is a slice collected from a variadic argument list.
    pub variadic: bool,
}

impl FuncShape {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// One required method of an interface shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodShape {
    pub name: String,
    pub func: FuncShape,
}

/// One field of a record shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldShape {
    pub name: String,
    pub shape: ShapeId,
}

/// The conversion rule for a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ShapeKind {
    Bool,
    Int {
        width: u8,
        signedness: Signedness,
    },
    Float {
        precision: FloatPrecision,
    },
    String,
    Slice {
        element: ShapeId,
    },
    Array {
        element: ShapeId,
        length: usize,
    },
    /// String-keyed map.
    Map {
        value: ShapeId,
    },
    Pointer {
        element: ShapeId,
    },
    Func(FuncShape),
    Chan {
        direction: ChanDir,
        element: ShapeId,
    },
    Interface {
        methods: Vec<MethodShape>,
    },
    /// Zero-method interface: the dynamic value passes through.
    Any,
    /// The built-in error-like type.
    Error,
    /// Struct converted field by field.
    Record {
        fields: Vec<FieldShape>,
    },
    /// Boxed pass-through, not introspectable from scripts.
    Opaque {
        reason: String,
    },
}

impl ShapeKind {
    /// Scalars are converted inline and never get a converter function of
    /// their own unless requested at top level.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Int { .. } | Self::Float { .. } | Self::String | Self::Any | Self::Error
        )
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque { .. })
    }

    /// Short label for diagnostics and generated identifiers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int { .. } => "int",
            Self::Float { .. } => "float",
            Self::String => "string",
            Self::Slice { .. } => "slice",
            Self::Array { .. } => "array",
            Self::Map { .. } => "map",
            Self::Pointer { .. } => "pointer",
            Self::Func(_) => "func",
            Self::Chan { .. } => "chan",
            Self::Interface { .. } => "interface",
            Self::Any => "any",
            Self::Error => "error",
            Self::Record { .. } => "record",
            Self::Opaque { .. } => "opaque",
        }
    }
}

/// A conversion rule together with the canonical name of its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    /// Canonical type string (qualified name, struct alias, or composite).
    pub name: String,
    pub kind: ShapeKind,
}

/// All shapes produced by one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeTable {
    shapes: Vec<Shape>,
}

impl ShapeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a shape; its id is its position.
    pub fn push(&mut self, name: impl Into<String>, kind: ShapeKind) -> ShapeId {
        let id = ShapeId(self.shapes.len() as u32);
        self.shapes.push(Shape {
            id,
            name: name.into(),
            kind,
        });
        id
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter()
    }

    /// First shape with the given canonical name.
    pub fn find(&self, name: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
