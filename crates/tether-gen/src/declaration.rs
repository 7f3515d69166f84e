//! Declaration file (`.tether.toml`) parsing and lowering.
//!
//! A declaration file lists the resolved exports of one host package: its
//! named types and aliases, its functions and methods, and any extra
//! conversions to generate. [`Declaration::lower`] turns it into a
//! [`TypeGraph`] plus the list of converters to request.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tether_core::types::{Field, FuncSig, Method, Param, Receiver, TypeKind};
use tether_core::{Direction, FloatPrecision, Signedness, TypeGraph, TypeId};

use crate::error::{GenError, Result};
use crate::typexpr::{FuncExpr, TypeExpr};

/// A complete declaration parsed from a `.tether.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    pub package: PackageInfo,
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    /// Extra explicit conversion requests.
    #[serde(default)]
    pub convert: Vec<ConvertRequest>,
}

/// The host package the exports belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Short package name; used to qualify declared type names.
    pub name: String,
    /// Full import path, informational.
    #[serde(default)]
    pub path: Option<String>,
}

/// A named type or alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    /// Type expression of the underlying (or aliased) type.
    #[serde(rename = "type")]
    pub ty: String,
    /// Declare an alias (`type A = B`) instead of a new named type.
    #[serde(default)]
    pub alias: bool,
    #[serde(default, alias = "type-params")]
    pub type_params: Vec<String>,
    /// Whether converters are requested for this type.
    #[serde(default = "default_request")]
    pub request: bool,
}

/// An exported function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    /// Function type expression (`func(a int) string`).
    pub signature: String,
    #[serde(default = "default_request")]
    pub request: bool,
}

/// An exported method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDecl {
    /// Receiver type: `Point`, `*Point`, or `*List[T]`.
    pub receiver: String,
    pub name: String,
    pub signature: String,
    #[serde(default = "default_request")]
    pub request: bool,
}

/// An explicit conversion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertRequest {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub direction: RequestDirection,
}

/// Which converters a request asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestDirection {
    ToScript,
    FromScript,
    #[default]
    Both,
}

impl RequestDirection {
    pub fn directions(&self) -> &'static [Direction] {
        match self {
            Self::ToScript => &[Direction::ToScript],
            Self::FromScript => &[Direction::FromScript],
            Self::Both => &[Direction::ToScript, Direction::FromScript],
        }
    }
}

fn default_request() -> bool {
    true
}

/// One top-level converter to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Export name the converter is registered under (`geo.Distance`).
    pub label: String,
    pub ty: TypeId,
    pub direction: Direction,
}

/// The result of lowering a declaration.
#[derive(Debug, Clone)]
pub struct Lowered {
    pub package: String,
    pub graph: TypeGraph,
    pub requests: Vec<Request>,
}

impl Declaration {
    /// Parse a declaration from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        let decl: Declaration = toml::from_str(input).map_err(GenError::Toml)?;

        if decl.package.name.is_empty() {
            return Err(GenError::InvalidDeclaration {
                detail: "package.name is required".to_string(),
            });
        }
        if decl.package.name.contains('.') {
            return Err(GenError::InvalidDeclaration {
                detail: format!("package name '{}' must not contain '.'", decl.package.name),
            });
        }

        let mut seen = HashSet::new();
        for ty in &decl.types {
            if ty.name.contains('.') {
                return Err(GenError::InvalidDeclaration {
                    detail: format!("type name '{}' must be unqualified", ty.name),
                });
            }
            if !seen.insert(ty.name.as_str()) {
                return Err(GenError::InvalidDeclaration {
                    detail: format!("type '{}' is declared twice", ty.name),
                });
            }
            if ty.alias && !ty.type_params.is_empty() {
                return Err(GenError::InvalidDeclaration {
                    detail: format!("alias '{}' cannot declare type parameters", ty.name),
                });
            }
        }

        let mut seen = HashSet::new();
        for func in &decl.functions {
            if !seen.insert(func.name.as_str()) {
                return Err(GenError::InvalidDeclaration {
                    detail: format!("function '{}' is declared twice", func.name),
                });
            }
        }

        Ok(decl)
    }

    /// Parse a declaration from a file path.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Qualified name of a declared type.
    pub fn qualify(&self, name: &str) -> String {
        qualify(&self.package.name, name)
    }

    /// Build the type graph and the converter requests.
    ///
    /// Named types are declared before any body is lowered, so bodies may
    /// refer to any named type, including themselves. Aliases are resolved
    /// in declaration order.
    pub fn lower(&self) -> Result<Lowered> {
        let mut lw = Lowerer::new(&self.package.name);
        let mut requests = Vec::new();
        let mut declared = Vec::new();

        for ty in self.types.iter().filter(|t| !t.alias) {
            let id = lw
                .graph
                .declare_named(&self.qualify(&ty.name), ty.type_params.clone())?;
            declared.push((ty, id));
        }

        let mut type_ids = HashMap::new();
        for ty in self.types.iter().filter(|t| t.alias) {
            let target = lw.lower_type(&TypeExpr::parse(&ty.ty)?, &[])?;
            let id = lw.graph.alias(&self.qualify(&ty.name), target)?;
            type_ids.insert(ty.name.as_str(), id);
        }

        for (ty, id) in declared {
            let body = lw.lower_type(&TypeExpr::parse(&ty.ty)?, &ty.type_params)?;
            lw.graph.define_named(id, body)?;
            type_ids.insert(ty.name.as_str(), id);
        }

        for ty in self.types.iter().filter(|t| t.request) {
            if let Some(&id) = type_ids.get(ty.name.as_str()) {
                push_both(&mut requests, self.qualify(&ty.name), id);
            }
        }

        for func in &self.functions {
            let sig = lw.lower_func(&parse_signature(&func.signature)?, &[])?;
            let id = lw.graph.func(sig);
            if func.request {
                push_both(&mut requests, self.qualify(&func.name), id);
            }
        }

        for method in &self.methods {
            let (receiver, base) = lw.lower_receiver(&method.receiver)?;
            let sig = lw
                .lower_func(&parse_signature(&method.signature)?, &receiver.type_params)?
                .with_receiver(receiver);
            let id = lw.graph.func(sig);
            if method.request {
                push_both(&mut requests, format!("{base}.{}", method.name), id);
            }
        }

        for conv in &self.convert {
            let id = lw.lower_type(&TypeExpr::parse(&conv.ty)?, &[])?;
            for &direction in conv.direction.directions() {
                requests.push(Request {
                    label: conv.ty.clone(),
                    ty: id,
                    direction,
                });
            }
        }

        lw.graph.validate()?;
        Ok(Lowered {
            package: self.package.name.clone(),
            graph: lw.graph,
            requests,
        })
    }
}

fn qualify(package: &str, name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{package}.{name}")
    }
}

fn push_both(requests: &mut Vec<Request>, label: String, ty: TypeId) {
    for direction in [Direction::ToScript, Direction::FromScript] {
        requests.push(Request {
            label: label.clone(),
            ty,
            direction,
        });
    }
}

fn parse_signature(text: &str) -> Result<FuncExpr> {
    FuncExpr::parse(text)
}

/// Resolves parsed expressions into graph nodes.
struct Lowerer<'a> {
    package: &'a str,
    graph: TypeGraph,
    predeclared: HashMap<&'static str, TypeId>,
}

impl<'a> Lowerer<'a> {
    fn new(package: &'a str) -> Self {
        Self {
            package,
            graph: TypeGraph::new(),
            predeclared: HashMap::new(),
        }
    }

    fn predeclared(&mut self, name: &str) -> Option<TypeId> {
        let (key, kind): (&'static str, TypeKind) = match name {
            "bool" => ("bool", TypeKind::Bool),
            "int" | "int64" => ("int64", int(64, Signedness::Signed)),
            "int8" => ("int8", int(8, Signedness::Signed)),
            "int16" => ("int16", int(16, Signedness::Signed)),
            "int32" | "rune" => ("int32", int(32, Signedness::Signed)),
            "uint" | "uint64" | "uintptr" => ("uint64", int(64, Signedness::Unsigned)),
            "uint8" | "byte" => ("uint8", int(8, Signedness::Unsigned)),
            "uint16" => ("uint16", int(16, Signedness::Unsigned)),
            "uint32" => ("uint32", int(32, Signedness::Unsigned)),
            "float32" => (
                "float32",
                TypeKind::Float {
                    precision: FloatPrecision::F32,
                },
            ),
            "float64" => (
                "float64",
                TypeKind::Float {
                    precision: FloatPrecision::F64,
                },
            ),
            "complex64" => ("complex64", TypeKind::Complex { bits: 64 }),
            "complex128" => ("complex128", TypeKind::Complex { bits: 128 }),
            "string" => ("string", TypeKind::String),
            "error" => ("error", TypeKind::Error),
            "any" => ("any", TypeKind::Interface(Vec::new())),
            "unsafe.Pointer" => ("unsafe.Pointer", TypeKind::UnsafePointer),
            _ => return None,
        };
        if let Some(&id) = self.predeclared.get(key) {
            return Some(id);
        }
        let id = self.graph.add(kind);
        self.predeclared.insert(key, id);
        Some(id)
    }

    fn resolve_name(&mut self, name: &str, scope: &[String]) -> Result<TypeId> {
        if scope.iter().any(|p| p == name) {
            return Ok(self.graph.add(TypeKind::TypeParam(name.to_string())));
        }
        if let Some(id) = self.predeclared(name) {
            return Ok(id);
        }
        self.graph
            .lookup(name)
            .or_else(|| self.graph.lookup(&qualify(self.package, name)))
            .ok_or_else(|| GenError::UnknownType {
                name: name.to_string(),
            })
    }

    fn lower_type(&mut self, expr: &TypeExpr, scope: &[String]) -> Result<TypeId> {
        let id = match expr {
            TypeExpr::Name { name, args } => {
                if !args.is_empty() {
                    return Err(GenError::InvalidDeclaration {
                        detail: format!("instantiated generic type '{expr}' is not supported"),
                    });
                }
                self.resolve_name(name, scope)?
            }
            TypeExpr::Slice(elem) => {
                let elem = self.lower_type(elem, scope)?;
                self.graph.slice(elem)
            }
            TypeExpr::Array { length, element } => {
                let elem = self.lower_type(element, scope)?;
                self.graph.array(elem, *length)
            }
            TypeExpr::Map { key, value } => {
                let key = self.lower_type(key, scope)?;
                let value = self.lower_type(value, scope)?;
                self.graph.map(key, value)
            }
            TypeExpr::Pointer(elem) => {
                let elem = self.lower_type(elem, scope)?;
                self.graph.pointer(elem)
            }
            TypeExpr::Func(func) => {
                let sig = self.lower_func(func, scope)?;
                self.graph.func(sig)
            }
            TypeExpr::Chan { direction, element } => {
                let elem = self.lower_type(element, scope)?;
                self.graph.chan(*direction, elem)
            }
            TypeExpr::Struct(fields) => {
                let mut lowered = Vec::with_capacity(fields.len());
                for field in fields {
                    lowered.push(Field {
                        name: field.name.clone(),
                        ty: self.lower_type(&field.ty, scope)?,
                    });
                }
                self.graph.add(TypeKind::Struct(lowered))
            }
            TypeExpr::Interface(methods) => {
                let mut lowered = Vec::with_capacity(methods.len());
                for method in methods {
                    lowered.push(Method {
                        name: method.name.clone(),
                        sig: self.lower_func(&method.func, scope)?,
                    });
                }
                self.graph.interface(lowered)
            }
        };
        Ok(id)
    }

    fn lower_func(&mut self, func: &FuncExpr, outer: &[String]) -> Result<FuncSig> {
        let scope: Vec<String> = outer.iter().chain(&func.type_params).cloned().collect();
        let mut params = Vec::with_capacity(func.params.len());
        for p in &func.params {
            params.push(Param {
                name: p.name.clone(),
                ty: self.lower_type(&p.ty, &scope)?,
            });
        }
        let mut results = Vec::with_capacity(func.results.len());
        for r in &func.results {
            results.push(Param {
                name: r.name.clone(),
                ty: self.lower_type(&r.ty, &scope)?,
            });
        }
        Ok(FuncSig {
            params,
            results,
            variadic: func.variadic,
            receiver: None,
            type_params: func.type_params.clone(),
        })
    }

    /// Lower a receiver expression; returns the receiver and the qualified
    /// name of its base type.
    fn lower_receiver(&mut self, text: &str) -> Result<(Receiver, String)> {
        let expr = TypeExpr::parse(text)?;
        let (pointer, base) = match &expr {
            TypeExpr::Pointer(inner) => (true, inner.as_ref()),
            other => (false, other),
        };
        let TypeExpr::Name { name, args } = base else {
            return Err(GenError::InvalidDeclaration {
                detail: format!("receiver '{text}' must be a named type or a pointer to one"),
            });
        };

        let mut type_params = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                TypeExpr::Name { name, args } if args.is_empty() => type_params.push(name.clone()),
                other => {
                    return Err(GenError::InvalidDeclaration {
                        detail: format!("receiver type argument '{other}' must be a bare name"),
                    })
                }
            }
        }

        let qualified = qualify(self.package, name);
        let base_id = self
            .graph
            .lookup(&qualified)
            .ok_or_else(|| GenError::UnknownType {
                name: name.clone(),
            })?;
        let ty = if pointer {
            self.graph.pointer(base_id)
        } else {
            base_id
        };
        Ok((Receiver { ty, type_params }, qualified))
    }
}

fn int(width: u8, signedness: Signedness) -> TypeKind {
    TypeKind::Int { width, signedness }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEO: &str = r#"
[package]
name = "geo"

[[types]]
name = "Point"
type = "struct { X float64; Y float64 }"

[[types]]
name = "Meters"
type = "float64"
alias = true

[[functions]]
name = "Distance"
signature = "func(a Point, b Point) Meters"

[[methods]]
receiver = "*Point"
name = "Scale"
signature = "func(f float64)"

[[convert]]
type = "map[string][]Point"
direction = "to-script"
"#;

    #[test]
    fn parse_geo_declaration() {
        let decl = Declaration::parse(GEO).unwrap();
        assert_eq!(decl.package.name, "geo");
        assert_eq!(decl.types.len(), 2);
        assert!(decl.types[1].alias);
        assert!(decl.types[0].request);
        assert_eq!(decl.convert[0].direction, RequestDirection::ToScript);
    }

    #[test]
    fn lower_geo_declaration() {
        let lowered = Declaration::parse(GEO).unwrap().lower().unwrap();
        let graph = &lowered.graph;
        let point = graph.lookup("geo.Point").unwrap();
        assert!(matches!(graph.get(point).unwrap(), TypeKind::Named(_)));
        let meters = graph.lookup("geo.Meters").unwrap();
        assert!(matches!(graph.get(meters).unwrap(), TypeKind::Alias { .. }));

        let labels: Vec<_> = lowered
            .requests
            .iter()
            .map(|r| (r.label.as_str(), r.direction))
            .collect();
        assert!(labels.contains(&("geo.Point", Direction::ToScript)));
        assert!(labels.contains(&("geo.Point", Direction::FromScript)));
        assert!(labels.contains(&("geo.Distance", Direction::FromScript)));
        assert!(labels.contains(&("geo.Point.Scale", Direction::ToScript)));
        assert!(labels.contains(&("map[string][]Point", Direction::ToScript)));
        assert!(!labels.contains(&("map[string][]Point", Direction::FromScript)));
    }

    #[test]
    fn method_receiver_is_recorded() {
        let lowered = Declaration::parse(GEO).unwrap().lower().unwrap();
        let req = lowered
            .requests
            .iter()
            .find(|r| r.label == "geo.Point.Scale")
            .unwrap();
        match lowered.graph.get(req.ty).unwrap() {
            TypeKind::Func(sig) => {
                let receiver = sig.receiver.as_ref().unwrap();
                assert!(matches!(
                    lowered.graph.get(receiver.ty).unwrap(),
                    TypeKind::Pointer(_)
                ));
                assert_eq!(sig.params.len(), 1);
            }
            other => panic!("expected func, got {other:?}"),
        }
    }

    #[test]
    fn self_referential_type_lowers() {
        let toml = r#"
[package]
name = "list"

[[types]]
name = "Node"
type = "struct { Value int; Next *Node }"
"#;
        let lowered = Declaration::parse(toml).unwrap().lower().unwrap();
        assert!(lowered.graph.lookup("list.Node").is_some());
        lowered.graph.validate().unwrap();
    }

    #[test]
    fn generic_receiver_introduces_type_params() {
        let toml = r#"
[package]
name = "coll"

[[types]]
name = "List"
type = "struct { Items []T }"
type_params = ["T"]

[[methods]]
receiver = "*List[T]"
name = "Push"
signature = "func(item T)"
"#;
        let lowered = Declaration::parse(toml).unwrap().lower().unwrap();
        let req = lowered
            .requests
            .iter()
            .find(|r| r.label == "coll.List.Push")
            .unwrap();
        let TypeKind::Func(sig) = lowered.graph.get(req.ty).unwrap() else {
            panic!("expected func");
        };
        assert_eq!(sig.receiver.as_ref().unwrap().type_params, vec!["T"]);
        assert!(matches!(
            lowered.graph.get(sig.params[0].ty).unwrap(),
            TypeKind::TypeParam(name) if name == "T"
        ));
    }

    #[test]
    fn request_false_is_skipped() {
        let toml = r#"
[package]
name = "p"

[[types]]
name = "Hidden"
type = "int"
request = false
"#;
        let lowered = Declaration::parse(toml).unwrap().lower().unwrap();
        assert!(lowered.requests.is_empty());
    }

    #[test]
    fn unknown_type_is_an_error() {
        let toml = r#"
[package]
name = "p"

[[functions]]
name = "F"
signature = "func(x Missing)"
"#;
        let err = Declaration::parse(toml).unwrap().lower().unwrap_err();
        assert!(matches!(err, GenError::UnknownType { name } if name == "Missing"));
    }

    #[test]
    fn invalid_declarations() {
        assert!(Declaration::parse("[package]\nname = \"\"\n").is_err());
        assert!(Declaration::parse("[[types]]\nname = \"A\"\ntype = \"int\"\n").is_err());
        let dup = r#"
[package]
name = "p"
[[types]]
name = "A"
type = "int"
[[types]]
name = "A"
type = "string"
"#;
        assert!(matches!(
            Declaration::parse(dup),
            Err(GenError::InvalidDeclaration { .. })
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geo.tether.toml");
        std::fs::write(&path, GEO).unwrap();
        let decl = Declaration::load(&path).unwrap();
        assert_eq!(decl.functions[0].name, "Distance");
    }
}
