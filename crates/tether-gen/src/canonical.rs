//! Type canonicalization.
//!
//! Turns native type graph nodes into interned canonical types: aliases are
//! resolved, receivers are folded into parameter lists, interface method
//! sets are sorted, zero-method interfaces collapse to `any`, and every
//! anonymous struct is named by a structural hash of its fields. Two
//! structurally equal types share one [`CanonId`].

use std::collections::{BTreeMap, HashMap};

use tether_core::hash::struct_alias;
use tether_core::types::{FuncSig, TypeKind};
use tether_core::{ChanDir, FloatPrecision, Signedness, TypeGraph, TypeId};

use crate::error::{GenError, Result};

/// Index of an interned canonical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonId(pub u32);

/// A canonical function signature. A method receiver, if any, is `params[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonFunc {
    pub params: Vec<CanonId>,
    pub results: Vec<CanonId>,
    pub variadic: bool,
    pub type_params: Vec<String>,
}

/// A method of a canonical interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonMethod {
    pub name: String,
    pub func: CanonFunc,
}

/// A canonical type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonKind {
    Bool,
    Int { width: u8, signedness: Signedness },
    Float { precision: FloatPrecision },
    Complex { bits: u8 },
    UnsafePointer,
    String,
    Slice(CanonId),
    Array { element: CanonId, length: usize },
    Map { key: CanonId, value: CanonId },
    Pointer(CanonId),
    Func(CanonFunc),
    Chan { direction: ChanDir, element: CanonId },
    /// Methods sorted by name.
    Interface(Vec<CanonMethod>),
    Any,
    Error,
    /// Anonymous struct, named by its structural alias.
    Struct {
        alias: String,
        fields: Vec<(String, CanonId)>,
    },
    /// Nominal type. `underlying` is `None` only while it is being resolved.
    Named {
        name: String,
        underlying: Option<CanonId>,
    },
    TypeParam(String),
}

/// Canonicalization session. All caches live for the whole run.
#[derive(Debug, Default)]
pub struct Canonicalizer {
    kinds: Vec<CanonKind>,
    interned: HashMap<CanonKind, CanonId>,
    named: HashMap<String, CanonId>,
    memo: HashMap<TypeId, CanonId>,
    aliases: BTreeMap<String, String>,
}

impl Canonicalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical form of a graph node. Idempotent and memoized per node.
    pub fn normalize(&mut self, graph: &TypeGraph, ty: TypeId) -> Result<CanonId> {
        self.normalize_inner(graph, ty, true)
    }

    pub fn kind(&self, id: CanonId) -> &CanonKind {
        &self.kinds[id.0 as usize]
    }

    /// Follow a named type to its underlying structure.
    pub fn structural(&self, id: CanonId) -> CanonId {
        match self.kind(id) {
            CanonKind::Named {
                underlying: Some(u),
                ..
            } => *u,
            _ => id,
        }
    }

    /// Registered struct aliases, mapped to their canonical field strings.
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Render a canonical type in host notation.
    pub fn type_string(&self, id: CanonId) -> String {
        match self.kind(id) {
            CanonKind::Bool => "bool".to_string(),
            CanonKind::Int { width, signedness } => match signedness {
                Signedness::Signed => format!("int{width}"),
                Signedness::Unsigned => format!("uint{width}"),
            },
            CanonKind::Float { precision } => match precision {
                FloatPrecision::F32 => "float32".to_string(),
                FloatPrecision::F64 => "float64".to_string(),
            },
            CanonKind::Complex { bits } => format!("complex{bits}"),
            CanonKind::UnsafePointer => "unsafe.Pointer".to_string(),
            CanonKind::String => "string".to_string(),
            CanonKind::Slice(elem) => format!("[]{}", self.type_string(*elem)),
            CanonKind::Array { element, length } => {
                format!("[{length}]{}", self.type_string(*element))
            }
            CanonKind::Map { key, value } => {
                format!("map[{}]{}", self.type_string(*key), self.type_string(*value))
            }
            CanonKind::Pointer(elem) => format!("*{}", self.type_string(*elem)),
            CanonKind::Func(func) => format!("func{}", self.func_string(func)),
            CanonKind::Chan { direction, element } => {
                let elem = self.type_string(*element);
                match direction {
                    ChanDir::Both => format!("chan {elem}"),
                    ChanDir::SendOnly => format!("chan<- {elem}"),
                    ChanDir::RecvOnly => format!("<-chan {elem}"),
                }
            }
            CanonKind::Interface(methods) => {
                let body: Vec<String> = methods
                    .iter()
                    .map(|m| format!("{}{}", m.name, self.func_string(&m.func)))
                    .collect();
                format!("interface {{ {} }}", body.join("; "))
            }
            CanonKind::Any => "any".to_string(),
            CanonKind::Error => "error".to_string(),
            CanonKind::Struct { alias, .. } => alias.clone(),
            CanonKind::Named { name, .. } => name.clone(),
            CanonKind::TypeParam(name) => name.clone(),
        }
    }

    /// Signature part of a function type string (everything after `func`).
    pub fn func_string(&self, func: &CanonFunc) -> String {
        let mut out = String::new();
        if !func.type_params.is_empty() {
            out.push('[');
            out.push_str(&func.type_params.join(", "));
            out.push(']');
        }
        out.push('(');
        let last = func.params.len().saturating_sub(1);
        for (i, p) in func.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if func.variadic && i == last {
                out.push_str("...");
                match self.kind(*p) {
                    CanonKind::Slice(elem) => out.push_str(&self.type_string(*elem)),
                    _ => out.push_str(&self.type_string(*p)),
                }
            } else {
                out.push_str(&self.type_string(*p));
            }
        }
        out.push(')');
        match func.results.as_slice() {
            [] => {}
            [single] => {
                out.push(' ');
                out.push_str(&self.type_string(*single));
            }
            results => {
                let rendered: Vec<String> = results.iter().map(|r| self.type_string(*r)).collect();
                out.push_str(&format!(" ({})", rendered.join(", ")));
            }
        }
        out
    }

    /// Canonical field string of a struct: `"<name> <type>;"` per field in
    /// declared order.
    pub fn field_listing(&self, fields: &[(String, CanonId)]) -> String {
        fields
            .iter()
            .map(|(name, ty)| format!("{name} {};", self.type_string(*ty)))
            .collect()
    }

    fn intern(&mut self, kind: CanonKind) -> CanonId {
        if let Some(&id) = self.interned.get(&kind) {
            return id;
        }
        let id = CanonId(self.kinds.len() as u32);
        self.kinds.push(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    /// `register_alias` is false for the struct body directly under a named
    /// type: that struct is known by the named type's name instead.
    fn normalize_inner(
        &mut self,
        graph: &TypeGraph,
        ty: TypeId,
        register_alias: bool,
    ) -> Result<CanonId> {
        if let Some(&id) = self.memo.get(&ty) {
            if register_alias {
                self.register_struct_alias(id);
            }
            return Ok(id);
        }

        let id = match graph.get(ty)? {
            TypeKind::Bool => self.intern(CanonKind::Bool),
            TypeKind::Int { width, signedness } => self.intern(CanonKind::Int {
                width: *width,
                signedness: *signedness,
            }),
            TypeKind::Float { precision } => self.intern(CanonKind::Float {
                precision: *precision,
            }),
            TypeKind::Complex { bits } => self.intern(CanonKind::Complex { bits: *bits }),
            TypeKind::UnsafePointer => self.intern(CanonKind::UnsafePointer),
            TypeKind::String => self.intern(CanonKind::String),
            TypeKind::Error => self.intern(CanonKind::Error),
            TypeKind::TypeParam(name) => self.intern(CanonKind::TypeParam(name.clone())),
            TypeKind::Slice(elem) => {
                let elem = self.normalize(graph, *elem)?;
                self.intern(CanonKind::Slice(elem))
            }
            TypeKind::Array { element, length } => {
                let element = self.normalize(graph, *element)?;
                self.intern(CanonKind::Array {
                    element,
                    length: *length,
                })
            }
            TypeKind::Map { key, value } => {
                let key = self.normalize(graph, *key)?;
                let value = self.normalize(graph, *value)?;
                self.intern(CanonKind::Map { key, value })
            }
            TypeKind::Pointer(elem) => {
                let elem = self.normalize(graph, *elem)?;
                self.intern(CanonKind::Pointer(elem))
            }
            TypeKind::Chan { direction, element } => {
                let element = self.normalize(graph, *element)?;
                self.intern(CanonKind::Chan {
                    direction: *direction,
                    element,
                })
            }
            TypeKind::Func(sig) => {
                let func = self.normalize_func(graph, sig)?;
                self.intern(CanonKind::Func(func))
            }
            TypeKind::Interface(methods) => {
                if methods.is_empty() {
                    self.intern(CanonKind::Any)
                } else {
                    let mut canon = Vec::with_capacity(methods.len());
                    for m in methods {
                        canon.push(CanonMethod {
                            name: m.name.clone(),
                            func: self.normalize_func(graph, &m.sig)?,
                        });
                    }
                    canon.sort_by(|a, b| a.name.cmp(&b.name));
                    self.intern(CanonKind::Interface(canon))
                }
            }
            TypeKind::Struct(fields) => {
                let mut canon = Vec::with_capacity(fields.len());
                for f in fields {
                    canon.push((f.name.clone(), self.normalize(graph, f.ty)?));
                }
                let alias = struct_alias(&self.field_listing(&canon));
                let id = self.intern(CanonKind::Struct {
                    alias,
                    fields: canon,
                });
                if register_alias {
                    self.register_struct_alias(id);
                }
                id
            }
            TypeKind::Alias { target, .. } => self.normalize_inner(graph, *target, register_alias)?,
            TypeKind::Named(named) => {
                if let Some(&id) = self.named.get(&named.name) {
                    id
                } else {
                    // Reserve the name before resolving the body so
                    // self-references terminate.
                    let id = CanonId(self.kinds.len() as u32);
                    self.kinds.push(CanonKind::Named {
                        name: named.name.clone(),
                        underlying: None,
                    });
                    self.named.insert(named.name.clone(), id);
                    self.memo.insert(ty, id);

                    let Some(body) = named.underlying else {
                        return Err(GenError::InvalidDeclaration {
                            detail: format!("named type '{}' has no definition", named.name),
                        });
                    };
                    let direct_struct = matches!(graph.get(body)?, TypeKind::Struct(_));
                    let underlying = self.normalize_inner(graph, body, !direct_struct)?;
                    let underlying = match self.kind(underlying) {
                        CanonKind::Named {
                            underlying: Some(u),
                            ..
                        } => *u,
                        CanonKind::Named {
                            name,
                            underlying: None,
                        } => {
                            return Err(GenError::InvalidDeclaration {
                                detail: format!(
                                    "named type '{}' is defined in terms of '{name}', which is still unresolved",
                                    named.name
                                ),
                            })
                        }
                        _ => underlying,
                    };
                    self.kinds[id.0 as usize] = CanonKind::Named {
                        name: named.name.clone(),
                        underlying: Some(underlying),
                    };
                    id
                }
            }
        };

        self.memo.insert(ty, id);
        Ok(id)
    }

    fn normalize_func(&mut self, graph: &TypeGraph, sig: &FuncSig) -> Result<CanonFunc> {
        let mut params = Vec::with_capacity(sig.params.len() + 1);
        let mut type_params = sig.type_params.clone();

        if let Some(receiver) = &sig.receiver {
            let recv = self.normalize(graph, receiver.ty)?;
            if !receiver.type_params.is_empty() && !sig.type_params.is_empty() {
                return Err(GenError::ConflictingTypeParams {
                    receiver: self.type_string(recv),
                    receiver_params: receiver.type_params.clone(),
                    own_params: sig.type_params.clone(),
                });
            }
            if type_params.is_empty() {
                type_params = receiver.type_params.clone();
            }
            params.push(recv);
        }

        for p in &sig.params {
            params.push(self.normalize(graph, p.ty)?);
        }
        let mut results = Vec::with_capacity(sig.results.len());
        for r in &sig.results {
            results.push(self.normalize(graph, r.ty)?);
        }

        Ok(CanonFunc {
            params,
            results,
            variadic: sig.variadic,
            type_params,
        })
    }

    fn register_struct_alias(&mut self, id: CanonId) {
        let CanonKind::Struct { alias, fields } = self.kind(id) else {
            return;
        };
        if self.aliases.contains_key(alias) {
            return;
        }
        let (alias, listing) = (alias.clone(), self.field_listing(fields));
        self.aliases.insert(alias, listing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::types::{Method, Param, Receiver};

    #[test]
    fn structurally_equal_types_share_an_id() {
        let mut g = TypeGraph::new();
        let a_int = g.int();
        let a = g.slice(a_int);
        let b_int = g.int();
        let b = g.slice(b_int);

        let mut canon = Canonicalizer::new();
        let ca = canon.normalize(&g, a).unwrap();
        let cb = canon.normalize(&g, b).unwrap();
        assert_eq!(ca, cb);
        assert_eq!(canon.type_string(ca), "[]int64");
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut g = TypeGraph::new();
        let s = g.string();
        let m = g.map(s, s);
        let mut canon = Canonicalizer::new();
        let first = canon.normalize(&g, m).unwrap();
        let before = canon.len();
        assert_eq!(canon.normalize(&g, m).unwrap(), first);
        assert_eq!(canon.len(), before);
    }

    #[test]
    fn aliases_resolve_to_target() {
        let mut g = TypeGraph::new();
        let f = g.float64();
        let meters = g.alias("geo.Meters", f).unwrap();
        let mut canon = Canonicalizer::new();
        let c = canon.normalize(&g, meters).unwrap();
        assert_eq!(canon.kind(c), &CanonKind::Float { precision: FloatPrecision::F64 });
    }

    #[test]
    fn named_types_stay_nominal() {
        let mut g = TypeGraph::new();
        let f = g.float64();
        let celsius = g.named("temp.Celsius", f).unwrap();
        let kelvin = g.named("temp.Kelvin", celsius).unwrap();
        let mut canon = Canonicalizer::new();
        let c = canon.normalize(&g, celsius).unwrap();
        let k = canon.normalize(&g, kelvin).unwrap();
        assert_ne!(c, k);
        assert_eq!(canon.type_string(k), "temp.Kelvin");
        // Named indirection is removed from the underlying type.
        assert_eq!(
            canon.kind(canon.structural(k)),
            &CanonKind::Float { precision: FloatPrecision::F64 }
        );
    }

    #[test]
    fn empty_interface_is_any() {
        let mut g = TypeGraph::new();
        let any = g.any();
        let mut canon = Canonicalizer::new();
        let c = canon.normalize(&g, any).unwrap();
        assert_eq!(canon.kind(c), &CanonKind::Any);
        assert_eq!(canon.type_string(c), "any");
    }

    #[test]
    fn interface_methods_are_sorted() {
        let mut g = TypeGraph::new();
        let f = g.float64();
        let area = Method {
            name: "Area".into(),
            sig: FuncSig::new(vec![], vec![Param::unnamed(f)]),
        };
        let perimeter = Method {
            name: "Perimeter".into(),
            sig: FuncSig::new(vec![], vec![Param::unnamed(f)]),
        };
        let one = g.interface(vec![perimeter.clone(), area.clone()]);
        let two = g.interface(vec![area, perimeter]);
        let mut canon = Canonicalizer::new();
        let c1 = canon.normalize(&g, one).unwrap();
        let c2 = canon.normalize(&g, two).unwrap();
        assert_eq!(c1, c2);
        assert_eq!(
            canon.type_string(c1),
            "interface { Area() float64; Perimeter() float64 }"
        );
    }

    #[test]
    fn receiver_is_folded_into_params() {
        let mut g = TypeGraph::new();
        let f = g.float64();
        let point_body = g.strukt(&[("X", f), ("Y", f)]);
        let point = g.named("geo.Point", point_body).unwrap();
        let ptr = g.pointer(point);
        let sig = FuncSig::new(vec![Param::named("f", f)], vec![]).with_receiver(Receiver {
            ty: ptr,
            type_params: vec![],
        });
        let method = g.func(sig);
        let mut canon = Canonicalizer::new();
        let c = canon.normalize(&g, method).unwrap();
        assert_eq!(canon.type_string(c), "func(*geo.Point, float64)");
    }

    #[test]
    fn conflicting_type_params_are_fatal() {
        let mut g = TypeGraph::new();
        let list = g.declare_named("coll.List", vec!["T".into()]).unwrap();
        let t = g.add(TypeKind::TypeParam("T".into()));
        let items = g.slice(t);
        let body = g.strukt(&[("Items", items)]);
        g.define_named(list, body).unwrap();
        let ptr = g.pointer(list);
        let u = g.add(TypeKind::TypeParam("U".into()));
        let mut sig = FuncSig::new(vec![Param::unnamed(u)], vec![]).with_receiver(Receiver {
            ty: ptr,
            type_params: vec!["T".into()],
        });
        sig.type_params = vec!["U".into()];
        let method = g.func(sig);

        let mut canon = Canonicalizer::new();
        let err = canon.normalize(&g, method).unwrap_err();
        assert!(matches!(err, GenError::ConflictingTypeParams { .. }));
        assert!(err.to_string().contains("*coll.List"));
    }

    #[test]
    fn variadic_renders_with_ellipsis() {
        let mut g = TypeGraph::new();
        let s = g.string();
        let any = g.any();
        let rest = g.slice(any);
        let int = g.int();
        let err = g.error();
        let sig = FuncSig::new(
            vec![Param::named("format", s), Param::named("args", rest)],
            vec![Param::unnamed(int), Param::unnamed(err)],
        )
        .variadic();
        let f = g.func(sig);
        let mut canon = Canonicalizer::new();
        let c = canon.normalize(&g, f).unwrap();
        assert_eq!(canon.type_string(c), "func(string, ...any) (int64, error)");
    }

    #[test]
    fn anonymous_struct_gets_stable_alias() {
        let mut g = TypeGraph::new();
        let int = g.int();
        let s1 = g.strukt(&[("X", int)]);
        let s2 = g.strukt(&[("X", int)]);
        let mut canon = Canonicalizer::new();
        let c1 = canon.normalize(&g, s1).unwrap();
        let c2 = canon.normalize(&g, s2).unwrap();
        assert_eq!(c1, c2);
        let alias = canon.type_string(c1);
        assert_eq!(alias, struct_alias("X int64;"));
        assert_eq!(canon.aliases().get(&alias).map(String::as_str), Some("X int64;"));

        // A fresh session computes the same name.
        let mut again = Canonicalizer::new();
        let c3 = again.normalize(&g, s1).unwrap();
        assert_eq!(again.type_string(c3), alias);
    }

    #[test]
    fn nested_alias_composes_innermost_first() {
        let mut g = TypeGraph::new();
        let int = g.int();
        let s = g.string();
        let inner = g.strukt(&[("X", int)]);
        let outer = g.strukt(&[("A", int), ("B", s), ("Nested", inner)]);
        let mut canon = Canonicalizer::new();
        let c = canon.normalize(&g, outer).unwrap();
        let inner_alias = struct_alias("X int64;");
        let expected = struct_alias(&format!("A int64;B string;Nested {inner_alias};"));
        assert_eq!(canon.type_string(c), expected);
        assert_eq!(canon.aliases().len(), 2);
    }

    #[test]
    fn struct_under_named_type_registers_no_alias() {
        let mut g = TypeGraph::new();
        let int = g.int();
        let s = g.string();
        let inner = g.strukt(&[("X", int)]);
        let body = g.strukt(&[("A", int), ("B", s), ("Nested", inner)]);
        let rec = g.named("pkg.Record", body).unwrap();
        let mut canon = Canonicalizer::new();
        canon.normalize(&g, rec).unwrap();
        assert_eq!(canon.aliases().len(), 1);
        assert!(canon.aliases().contains_key(&struct_alias("X int64;")));
    }

    #[test]
    fn self_referential_named_type_terminates() {
        let mut g = TypeGraph::new();
        let node = g.declare_named("list.Node", vec![]).unwrap();
        let next = g.pointer(node);
        let value = g.int();
        let body = g.strukt(&[("Value", value), ("Next", next)]);
        g.define_named(node, body).unwrap();

        let mut canon = Canonicalizer::new();
        let c = canon.normalize(&g, node).unwrap();
        let CanonKind::Named { underlying: Some(u), .. } = canon.kind(c) else {
            panic!("expected resolved named type");
        };
        let CanonKind::Struct { fields, .. } = canon.kind(*u) else {
            panic!("expected struct body");
        };
        assert_eq!(canon.type_string(fields[1].1), "*list.Node");
    }
}
