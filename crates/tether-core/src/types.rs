//! The native type graph.
//!
//! Types exported by the host library arrive as an index-addressed graph.
//! Nodes refer to each other by [`TypeId`], so recursive types (a struct
//! holding a pointer to itself) are expressed by declaring a named type
//! first and defining its underlying type afterwards.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeGraphError};

/// Index of a node in a [`TypeGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Signedness of an integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// IEEE 754 floating-point precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatPrecision {
    F32,
    F64,
}

/// Direction of a channel type, seen from the holder of the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChanDir {
    /// `chan T`: the holder may send and receive.
    Both,
    /// `chan<- T`: the holder may only send.
    SendOnly,
    /// `<-chan T`: the holder may only receive.
    RecvOnly,
}

impl ChanDir {
    /// Whether values produced on the native side flow to the script side.
    pub fn forwards_to_script(&self) -> bool {
        matches!(self, Self::Both | Self::RecvOnly)
    }

    /// Whether values sent by the script flow to the native side.
    pub fn forwards_to_native(&self) -> bool {
        matches!(self, Self::Both | Self::SendOnly)
    }

    /// Short lowercase label used in generated identifiers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::SendOnly => "send",
            Self::RecvOnly => "recv",
        }
    }
}

/// A named struct field, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
}

/// A function parameter or result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name, if the declaration named it.
    pub name: Option<String>,
    pub ty: TypeId,
}

impl Param {
    pub fn unnamed(ty: TypeId) -> Self {
        Self { name: None, ty }
    }

    pub fn named(name: &str, ty: TypeId) -> Self {
        Self {
            name: Some(name.to_string()),
            ty,
        }
    }
}

/// The receiver of a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub ty: TypeId,
    /// Type parameters introduced by the receiver (`func (l *List[T]) ...`).
    #[serde(default)]
    pub type_params: Vec<String>,
}

/// A function or method signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncSig {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    /// The last parameter is variadic (`...T`, stored as `[]T`).
    #[serde(default)]
    pub variadic: bool,
    /// Present on methods; canonicalization folds it into `params`.
    #[serde(default)]
    pub receiver: Option<Receiver>,
    /// Type parameters declared by the signature itself.
    #[serde(default)]
    pub type_params: Vec<String>,
}

impl FuncSig {
    pub fn new(params: Vec<Param>, results: Vec<Param>) -> Self {
        Self {
            params,
            results,
            ..Self::default()
        }
    }

    pub fn with_receiver(mut self, receiver: Receiver) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

/// A method in an interface's method set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub sig: FuncSig,
}

/// A type declared with its own name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedType {
    /// Qualified name (`pkg.Name`).
    pub name: String,
    /// `None` between declaration and definition.
    pub underlying: Option<TypeId>,
    #[serde(default)]
    pub type_params: Vec<String>,
}

/// A node of the native type graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Bool,
    /// `int` and `uint` are 64 bits wide.
    Int { width: u8, signedness: Signedness },
    Float { precision: FloatPrecision },
    Complex { bits: u8 },
    UnsafePointer,
    String,
    Slice(TypeId),
    Array { element: TypeId, length: usize },
    Map { key: TypeId, value: TypeId },
    Struct(Vec<Field>),
    Pointer(TypeId),
    Func(FuncSig),
    Chan { direction: ChanDir, element: TypeId },
    Interface(Vec<Method>),
    /// The built-in error-like interface.
    Error,
    Named(NamedType),
    Alias { name: String, target: TypeId },
    /// A reference to a type parameter of an enclosing generic declaration.
    TypeParam(String),
}

/// An index-addressed graph of native types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeGraph {
    nodes: Vec<TypeKind>,
    names: BTreeMap<String, TypeId>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its id. No interning happens here: two calls
    /// with equal kinds yield two distinct ids.
    pub fn add(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(kind);
        id
    }

    /// Look up a node.
    pub fn get(&self, id: TypeId) -> Result<&TypeKind> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(TypeGraphError::UnknownType { id })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a named type or alias by qualified name.
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    /// All registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = (&str, TypeId)> {
        self.names.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Declare a named type whose underlying type is supplied later.
    pub fn declare_named(&mut self, name: &str, type_params: Vec<String>) -> Result<TypeId> {
        if self.names.contains_key(name) {
            return Err(TypeGraphError::DuplicateName {
                name: name.to_string(),
            });
        }
        let id = self.add(TypeKind::Named(NamedType {
            name: name.to_string(),
            underlying: None,
            type_params,
        }));
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Supply the underlying type of a previously declared named type.
    pub fn define_named(&mut self, id: TypeId, underlying: TypeId) -> Result<()> {
        self.get(underlying)?;
        match self.nodes.get_mut(id.0 as usize) {
            Some(TypeKind::Named(named)) => {
                if named.underlying.is_some() {
                    return Err(TypeGraphError::AlreadyDefined {
                        name: named.name.clone(),
                    });
                }
                named.underlying = Some(underlying);
                Ok(())
            }
            Some(_) => Err(TypeGraphError::NotNamed { id }),
            None => Err(TypeGraphError::UnknownType { id }),
        }
    }

    /// Declare and define a named type in one step.
    pub fn named(&mut self, name: &str, underlying: TypeId) -> Result<TypeId> {
        let id = self.declare_named(name, Vec::new())?;
        self.define_named(id, underlying)?;
        Ok(id)
    }

    /// Register an alias (`type A = B`).
    pub fn alias(&mut self, name: &str, target: TypeId) -> Result<TypeId> {
        self.get(target)?;
        if self.names.contains_key(name) {
            return Err(TypeGraphError::DuplicateName {
                name: name.to_string(),
            });
        }
        let id = self.add(TypeKind::Alias {
            name: name.to_string(),
            target,
        });
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Check that every declared named type has been defined.
    pub fn validate(&self) -> Result<()> {
        for kind in &self.nodes {
            if let TypeKind::Named(named) = kind {
                if named.underlying.is_none() {
                    return Err(TypeGraphError::Undefined {
                        name: named.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

// === Convenience constructors ===

impl TypeGraph {
    pub fn bool(&mut self) -> TypeId {
        self.add(TypeKind::Bool)
    }
    pub fn int(&mut self) -> TypeId {
        self.int_of(64, Signedness::Signed)
    }
    pub fn uint(&mut self) -> TypeId {
        self.int_of(64, Signedness::Unsigned)
    }
    pub fn int_of(&mut self, width: u8, signedness: Signedness) -> TypeId {
        self.add(TypeKind::Int { width, signedness })
    }
    pub fn float64(&mut self) -> TypeId {
        self.add(TypeKind::Float {
            precision: FloatPrecision::F64,
        })
    }
    pub fn float32(&mut self) -> TypeId {
        self.add(TypeKind::Float {
            precision: FloatPrecision::F32,
        })
    }
    pub fn string(&mut self) -> TypeId {
        self.add(TypeKind::String)
    }
    pub fn error(&mut self) -> TypeId {
        self.add(TypeKind::Error)
    }
    pub fn slice(&mut self, element: TypeId) -> TypeId {
        self.add(TypeKind::Slice(element))
    }
    pub fn array(&mut self, element: TypeId, length: usize) -> TypeId {
        self.add(TypeKind::Array { element, length })
    }
    pub fn map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.add(TypeKind::Map { key, value })
    }
    pub fn pointer(&mut self, element: TypeId) -> TypeId {
        self.add(TypeKind::Pointer(element))
    }
    pub fn chan(&mut self, direction: ChanDir, element: TypeId) -> TypeId {
        self.add(TypeKind::Chan { direction, element })
    }
    pub fn func(&mut self, sig: FuncSig) -> TypeId {
        self.add(TypeKind::Func(sig))
    }
    pub fn interface(&mut self, methods: Vec<Method>) -> TypeId {
        self.add(TypeKind::Interface(methods))
    }
    pub fn any(&mut self) -> TypeId {
        self.add(TypeKind::Interface(Vec::new()))
    }

    /// Build a struct from `(name, type)` pairs in declared order.
    pub fn strukt(&mut self, fields: &[(&str, TypeId)]) -> TypeId {
        let fields = fields
            .iter()
            .map(|(name, ty)| Field {
                name: name.to_string(),
                ty: *ty,
            })
            .collect();
        self.add(TypeKind::Struct(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_does_not_intern() {
        let mut g = TypeGraph::new();
        let a = g.int();
        let b = g.int();
        assert_ne!(a, b);
        assert_eq!(g.get(a).unwrap(), g.get(b).unwrap());
    }

    #[test]
    fn forward_declared_self_reference() {
        let mut g = TypeGraph::new();
        let node = g.declare_named("list.Node", Vec::new()).unwrap();
        let next = g.pointer(node);
        let value = g.int();
        let body = g.strukt(&[("Value", value), ("Next", next)]);
        g.define_named(node, body).unwrap();

        g.validate().unwrap();
        match g.get(node).unwrap() {
            TypeKind::Named(named) => assert_eq!(named.underlying, Some(body)),
            other => panic!("expected Named, got {other:?}"),
        }
        assert_eq!(g.lookup("list.Node"), Some(node));
    }

    #[test]
    fn undefined_named_fails_validation() {
        let mut g = TypeGraph::new();
        g.declare_named("pkg.Ghost", Vec::new()).unwrap();
        assert!(matches!(
            g.validate(),
            Err(TypeGraphError::Undefined { .. })
        ));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut g = TypeGraph::new();
        let int = g.int();
        g.named("pkg.Count", int).unwrap();
        assert!(g.alias("pkg.Count", int).is_err());
    }

    #[test]
    fn define_twice_rejected() {
        let mut g = TypeGraph::new();
        let int = g.int();
        let id = g.named("pkg.Count", int).unwrap();
        assert!(matches!(
            g.define_named(id, int),
            Err(TypeGraphError::AlreadyDefined { .. })
        ));
    }

    #[test]
    fn unknown_id_is_an_error() {
        let g = TypeGraph::new();
        assert!(g.get(TypeId(7)).is_err());
    }

    #[test]
    fn chan_direction_flow() {
        assert!(ChanDir::RecvOnly.forwards_to_script());
        assert!(!ChanDir::RecvOnly.forwards_to_native());
        assert!(ChanDir::SendOnly.forwards_to_native());
        assert!(!ChanDir::SendOnly.forwards_to_script());
        assert!(ChanDir::Both.forwards_to_script() && ChanDir::Both.forwards_to_native());
    }
}
