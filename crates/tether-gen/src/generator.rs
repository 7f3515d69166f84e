//! Converter generation.
//!
//! A [`Generator`] walks canonical types, picks a [`ShapeKind`] for each,
//! and registers one converter entry per (shape, direction) pair that needs
//! its own function. Types that cannot be converted degrade to opaque
//! pass-through and are recorded as [`Limitation`]s; generation continues.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tether_core::shape::{FieldShape, FuncShape, MethodShape};
use tether_core::{ChanDir, Direction, ShapeId, ShapeKind, ShapeTable, TypeGraph, TypeId};

use crate::canonical::{CanonFunc, CanonId, CanonKind, Canonicalizer};
use crate::declaration::Request;
use crate::emit;
use crate::error::{GenError, Result};

/// Index of a converter entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConverterId(pub u32);

impl fmt::Display for ConverterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "converter#{}", self.0)
    }
}

/// One generated converter function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterEntry {
    pub id: ConverterId,
    pub shape: ShapeId,
    pub direction: Direction,
    /// Generated function name (`to_script_geo_point`).
    pub ident: String,
    /// Rendered function text. Not part of the manifest.
    #[serde(skip)]
    pub source: String,
    /// Entries this converter calls, sorted.
    pub deps: Vec<ConverterId>,
}

/// Bridge support for one (element shape, channel direction) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSupport {
    pub ident: String,
    pub element: ShapeId,
    pub direction: ChanDir,
}

/// A type that was degraded to opaque pass-through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limitation {
    pub type_name: String,
    pub reason: String,
}

impl fmt::Display for Limitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.reason)
    }
}

/// A top-level converter registered under an export name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    pub label: String,
    pub shape: ShapeId,
    pub direction: Direction,
    pub converter: ConverterId,
}

/// Everything a generation run produces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bindings {
    pub shapes: ShapeTable,
    pub converters: Vec<ConverterEntry>,
    pub bridges: Vec<BridgeSupport>,
    /// Struct alias name to canonical field string.
    pub aliases: BTreeMap<String, String>,
    pub limitations: Vec<Limitation>,
    pub exports: Vec<Export>,
}

impl Bindings {
    /// Serialize as the JSON manifest.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a manifest written by [`Bindings::to_json`].
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn converter(&self, id: ConverterId) -> Option<&ConverterEntry> {
        self.converters.get(id.0 as usize)
    }

    /// Find an export by label and direction.
    pub fn export(&self, label: &str, direction: Direction) -> Option<&Export> {
        self.exports
            .iter()
            .find(|e| e.label == label && e.direction == direction)
    }
}

/// A generation session. Owns every cache of the run; nothing is global.
pub struct Generator<'g> {
    graph: &'g TypeGraph,
    canon: Canonicalizer,
    shapes: ShapeTable,
    shape_of: HashMap<CanonId, ShapeId>,
    in_progress: HashSet<ShapeId>,
    entries: Vec<ConverterEntry>,
    entry_of: HashMap<(ShapeId, Direction), ConverterId>,
    bridges: Vec<BridgeSupport>,
    bridge_of: HashMap<(ShapeId, ChanDir), usize>,
    limitations: Vec<Limitation>,
    idents: HashSet<String>,
    exports: Vec<Export>,
}

impl<'g> Generator<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        Self {
            graph,
            canon: Canonicalizer::new(),
            shapes: ShapeTable::new(),
            shape_of: HashMap::new(),
            in_progress: HashSet::new(),
            entries: Vec::new(),
            entry_of: HashMap::new(),
            bridges: Vec::new(),
            bridge_of: HashMap::new(),
            limitations: Vec::new(),
            idents: HashSet::new(),
            exports: Vec::new(),
        }
    }

    /// Register a converter for `ty` in `direction`, plus everything it
    /// depends on. A top-level request always gets its own entry.
    pub fn add(&mut self, ty: TypeId, direction: Direction) -> Result<ConverterId> {
        let canon = self.canon.normalize(self.graph, ty)?;
        let shape = self.shape_for(canon);
        Ok(self.entry_for(shape, direction))
    }

    /// [`add`](Self::add) and record the result under the request's label.
    pub fn request(&mut self, request: &Request) -> Result<ConverterId> {
        let id = self.add(request.ty, request.direction)?;
        let shape = self.entries[id.0 as usize].shape;
        let export = Export {
            label: request.label.clone(),
            shape,
            direction: request.direction,
            converter: id,
        };
        if !self.exports.contains(&export) {
            self.exports.push(export);
        }
        Ok(id)
    }

    /// Shape of a type without registering any converter.
    pub fn shape(&mut self, ty: TypeId) -> Result<ShapeId> {
        let canon = self.canon.normalize(self.graph, ty)?;
        Ok(self.shape_for(canon))
    }

    pub fn shapes(&self) -> &ShapeTable {
        &self.shapes
    }

    pub fn entries(&self) -> &[ConverterEntry] {
        &self.entries
    }

    pub fn limitations(&self) -> &[Limitation] {
        &self.limitations
    }

    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canon
    }

    /// Render every converter and hand over the results.
    pub fn finish(self) -> Bindings {
        let idents: HashMap<(ShapeId, Direction), String> = self
            .entries
            .iter()
            .map(|e| ((e.shape, e.direction), e.ident.clone()))
            .collect();

        let converters = self
            .entries
            .into_iter()
            .map(|mut entry| {
                entry.source = emit::render_converter(&self.shapes, &entry, &idents);
                entry
            })
            .collect();

        Bindings {
            shapes: self.shapes,
            converters,
            bridges: self.bridges,
            aliases: self.canon.aliases().clone(),
            limitations: self.limitations,
            exports: self.exports,
        }
    }

    fn shape_for(&mut self, canon: CanonId) -> ShapeId {
        if let Some(&id) = self.shape_of.get(&canon) {
            return id;
        }
        let name = self.canon.type_string(canon);
        // Reserve first: recursive references resolve to this id.
        let id = self.shapes.push(
            name.clone(),
            ShapeKind::Opaque {
                reason: "unresolved".to_string(),
            },
        );
        self.shape_of.insert(canon, id);
        self.in_progress.insert(id);

        let structural = self.canon.structural(canon);
        let kind = self.kind_for(structural, &name);
        if let Some(shape) = self.shapes.get_mut(id) {
            shape.kind = kind;
        }
        self.in_progress.remove(&id);
        id
    }

    fn kind_for(&mut self, canon: CanonId, name: &str) -> ShapeKind {
        match self.canon.kind(canon).clone() {
            CanonKind::Bool => ShapeKind::Bool,
            CanonKind::Int { width, signedness } => ShapeKind::Int { width, signedness },
            CanonKind::Float { precision } => ShapeKind::Float { precision },
            CanonKind::String => ShapeKind::String,
            CanonKind::Any => ShapeKind::Any,
            CanonKind::Error => ShapeKind::Error,
            CanonKind::Complex { bits } => {
                self.degrade(name, format!("complex{bits} values have no script representation"))
            }
            CanonKind::UnsafePointer => {
                self.degrade(name, "unsafe.Pointer has no script representation".to_string())
            }
            CanonKind::Slice(elem) => ShapeKind::Slice {
                element: self.shape_for(elem),
            },
            CanonKind::Array { element, length } => ShapeKind::Array {
                element: self.shape_for(element),
                length,
            },
            CanonKind::Map { key, value } => {
                let key_structural = self.canon.structural(key);
                if matches!(self.canon.kind(key_structural), CanonKind::String) {
                    ShapeKind::Map {
                        value: self.shape_for(value),
                    }
                } else {
                    let key_name = self.canon.type_string(key);
                    self.degrade(name, format!("map key type {key_name} is not a string"))
                }
            }
            CanonKind::Pointer(elem) => ShapeKind::Pointer {
                element: self.shape_for(elem),
            },
            CanonKind::Func(func) => match self.func_shape(&func) {
                Ok(shape) => ShapeKind::Func(shape),
                Err(reason) => self.degrade(name, reason),
            },
            CanonKind::Chan { direction, element } => {
                let element = self.shape_for(element);
                self.register_bridge(element, direction);
                ShapeKind::Chan { direction, element }
            }
            CanonKind::Interface(methods) => {
                let mut shapes = Vec::with_capacity(methods.len());
                for method in methods {
                    match self.func_shape(&method.func) {
                        Ok(func) => shapes.push(MethodShape {
                            name: method.name,
                            func,
                        }),
                        Err(reason) => {
                            return self.degrade(name, format!("method {}: {reason}", method.name))
                        }
                    }
                }
                ShapeKind::Interface { methods: shapes }
            }
            CanonKind::Struct { fields, .. } => {
                let mut shapes = Vec::with_capacity(fields.len());
                for (field, ty) in fields {
                    let shape = self.shape_for(ty);
                    if self.is_unconvertible(shape) {
                        let field_type = self.canon.type_string(ty);
                        return self.degrade(
                            name,
                            format!("field {field} has unconvertible type {field_type}"),
                        );
                    }
                    shapes.push(FieldShape { name: field, shape });
                }
                ShapeKind::Record { fields: shapes }
            }
            CanonKind::Named {
                underlying: Some(u),
                ..
            } => self.kind_for(u, name),
            CanonKind::Named {
                underlying: None, ..
            } => self.degrade(name, "named type has no resolved definition".to_string()),
            CanonKind::TypeParam(param) => {
                self.degrade(name, format!("type parameter {param} is not instantiated"))
            }
        }
    }

    fn func_shape(&mut self, func: &CanonFunc) -> std::result::Result<FuncShape, String> {
        if !func.type_params.is_empty() {
            return Err(format!(
                "generic function [{}] is not instantiated",
                func.type_params.join(", ")
            ));
        }
        if func.variadic {
            let last = func.params.last().map(|p| self.canon.structural(*p));
            if !matches!(last.map(|l| self.canon.kind(l)), Some(CanonKind::Slice(_))) {
                return Err("variadic parameter is not a slice".to_string());
            }
        }
        let params = func.params.iter().map(|p| self.shape_for(*p)).collect();
        let results = func.results.iter().map(|r| self.shape_for(*r)).collect();
        Ok(FuncShape {
            params,
            results,
            variadic: func.variadic,
        })
    }

    /// Shapes still being built count as convertible.
    fn is_unconvertible(&self, shape: ShapeId) -> bool {
        !self.in_progress.contains(&shape)
            && self.shapes.get(shape).is_some_and(|s| s.kind.is_opaque())
    }

    fn degrade(&mut self, name: &str, reason: String) -> ShapeKind {
        log::warn!("{name}: degraded to opaque pass-through: {reason}");
        self.limitations.push(Limitation {
            type_name: name.to_string(),
            reason: reason.clone(),
        });
        ShapeKind::Opaque { reason }
    }

    fn register_bridge(&mut self, element: ShapeId, direction: ChanDir) {
        if self.bridge_of.contains_key(&(element, direction)) {
            return;
        }
        let element_name = self
            .shapes
            .get(element)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let ident = self.fresh_ident(&format!("bridge_{}_{}", slug(&element_name), direction.label()));
        log::debug!("registered bridge support {ident} for {element_name}");
        self.bridge_of.insert((element, direction), self.bridges.len());
        self.bridges.push(BridgeSupport {
            ident,
            element,
            direction,
        });
    }

    fn entry_for(&mut self, shape: ShapeId, direction: Direction) -> ConverterId {
        if let Some(&id) = self.entry_of.get(&(shape, direction)) {
            return id;
        }
        let name = self
            .shapes
            .get(shape)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let ident = self.fresh_ident(&format!("{}_{}", direction.prefix(), slug(&name)));
        log::debug!("registered converter {ident} for {name} ({direction})");

        // Reserve first so cycles terminate.
        let id = ConverterId(self.entries.len() as u32);
        self.entries.push(ConverterEntry {
            id,
            shape,
            direction,
            ident,
            source: String::new(),
            deps: Vec::new(),
        });
        self.entry_of.insert((shape, direction), id);

        let mut deps = BTreeSet::new();
        for (sub, sub_direction) in self.dependencies(shape, direction) {
            let inline = self.shapes.get(sub).is_some_and(|s| s.kind.is_inline());
            if !inline {
                deps.insert(self.entry_for(sub, sub_direction));
            }
        }
        self.entries[id.0 as usize].deps = deps.into_iter().collect();
        id
    }

    /// Sub-shapes a converter needs, with the direction each is crossed in.
    fn dependencies(&self, shape: ShapeId, direction: Direction) -> Vec<(ShapeId, Direction)> {
        let Some(shape) = self.shapes.get(shape) else {
            return Vec::new();
        };
        match &shape.kind {
            ShapeKind::Slice { element }
            | ShapeKind::Array { element, .. }
            | ShapeKind::Pointer { element } => vec![(*element, direction)],
            ShapeKind::Map { value } => vec![(*value, direction)],
            ShapeKind::Record { fields } => fields.iter().map(|f| (f.shape, direction)).collect(),
            // Exposing a native function: arguments arrive from the script.
            // Wrapping a script function: arguments go to the script.
            ShapeKind::Func(func) => func_dependencies(func, direction),
            ShapeKind::Interface { methods } => methods
                .iter()
                .flat_map(|m| func_dependencies(&m.func, direction))
                .collect(),
            ShapeKind::Chan {
                direction: chan_dir,
                element,
            } => {
                let mut deps = Vec::new();
                if chan_dir.forwards_to_script() {
                    deps.push((*element, Direction::ToScript));
                }
                if chan_dir.forwards_to_native() {
                    deps.push((*element, Direction::FromScript));
                }
                deps
            }
            _ => Vec::new(),
        }
    }

    fn fresh_ident(&mut self, base: &str) -> String {
        let mut ident = base.to_string();
        let mut n = 2;
        while !self.idents.insert(ident.clone()) {
            ident = format!("{base}_{n}");
            n += 1;
        }
        ident
    }
}

fn func_dependencies(func: &FuncShape, direction: Direction) -> Vec<(ShapeId, Direction)> {
    let params = func.params.iter().map(|p| (*p, direction.reverse()));
    let results = func.results.iter().map(|r| (*r, direction));
    params.chain(results).collect()
}

const MAX_SLUG: usize = 64;

/// Identifier-safe rendering of a canonical type string.
pub fn slug(name: &str) -> String {
    let expanded = name
        .replace("<-chan", " recv chan ")
        .replace("chan<-", " chan send ")
        .replace("[]", " slice ")
        .replace("...", " variadic ")
        .replace('*', " ptr ");

    let mut out = String::new();
    let mut pending_sep = false;
    for c in expanded.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out = format!("array_{out}");
    }
    if out.len() > MAX_SLUG {
        out.truncate(MAX_SLUG);
        while out.ends_with('_') {
            out.pop();
        }
    }
    if out.is_empty() {
        out.push_str("anon");
    }
    out
}

/// Run a whole lowered declaration through a fresh generator.
pub fn generate(lowered: &crate::declaration::Lowered) -> Result<Bindings> {
    let mut generator = Generator::new(&lowered.graph);
    for request in &lowered.requests {
        generator.request(request).map_err(|e| match e {
            GenError::ConflictingTypeParams { .. } => e,
            other => GenError::InvalidDeclaration {
                detail: format!("{}: {other}", request.label),
            },
        })?;
    }
    Ok(generator.finish())
}
