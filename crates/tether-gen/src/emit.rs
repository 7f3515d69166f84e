//! Rust source emission for generated bindings.
//!
//! Each converter entry renders to one function that composes the
//! `tether_runtime::convert` helpers. Functions, channels and interfaces
//! are shape-driven at runtime, so their converters delegate to the
//! runtime interpreter by shape id.

use std::collections::HashMap;
use std::fmt::Write as _;

use tether_core::hash::STRUCT_ALIAS_PREFIX;
use tether_core::{Direction, Shape, ShapeId, ShapeKind, ShapeTable};

use crate::generator::{Bindings, ConverterEntry};

/// Render the body of one converter function.
pub fn render_converter(
    shapes: &ShapeTable,
    entry: &ConverterEntry,
    idents: &HashMap<(ShapeId, Direction), String>,
) -> String {
    let Some(shape) = shapes.get(entry.shape) else {
        return String::new();
    };
    let r = Renderer { shapes, idents };
    let mut body = r.body(shape, entry.direction);
    if shape.name.starts_with(STRUCT_ALIAS_PREFIX) {
        body.push_str(".map_err(|e| rt.type_names().explain(e))");
    }
    match entry.direction {
        Direction::ToScript => format!(
            "/// `{}` to script.\npub fn {}(rt: &Runtime, v: &NativeValue) -> Result<Value, ConversionError> {{\n    {body}\n}}\n",
            shape.name, entry.ident
        ),
        Direction::FromScript => format!(
            "/// Script to `{}`.\npub fn {}(rt: &Runtime, v: &Value) -> Result<NativeValue, ConversionError> {{\n    {body}\n}}\n",
            shape.name, entry.ident
        ),
    }
}

struct Renderer<'a> {
    shapes: &'a ShapeTable,
    idents: &'a HashMap<(ShapeId, Direction), String>,
}

impl Renderer<'_> {
    fn body(&self, shape: &Shape, direction: Direction) -> String {
        let name = quoted(&shape.name);
        let suffix = direction.prefix();
        let var = "e";
        match &shape.kind {
            kind if kind.is_inline() => scalar_call(kind, direction, "v"),
            ShapeKind::Slice { element } => format!(
                "convert::slice_{suffix}(v, {name}, |{var}| {})",
                self.child(*element, direction, var)
            ),
            ShapeKind::Array { element, length } => format!(
                "convert::array_{suffix}(v, {name}, {length}, |{var}| {})",
                self.child(*element, direction, var)
            ),
            ShapeKind::Map { value } => format!(
                "convert::map_{suffix}(v, {name}, |{var}| {})",
                self.child(*value, direction, var)
            ),
            ShapeKind::Pointer { element } => format!(
                "convert::pointer_{suffix}(v, {name}, |{var}| {})",
                self.child(*element, direction, var)
            ),
            ShapeKind::Record { fields } => {
                let names: Vec<String> = fields.iter().map(|f| quoted(&f.name)).collect();
                let mut arms = String::new();
                for (i, field) in fields.iter().enumerate() {
                    let pattern = if i + 1 == fields.len() {
                        "_".to_string()
                    } else {
                        i.to_string()
                    };
                    let _ = write!(
                        arms,
                        "\n        {pattern} => {},",
                        self.child(field.shape, direction, "f")
                    );
                }
                let closure = if fields.is_empty() {
                    match direction {
                        Direction::ToScript => "|_, _| Ok(Value::None)".to_string(),
                        Direction::FromScript => "|_, _| Ok(NativeValue::Struct(Vec::new()))".to_string(),
                    }
                } else {
                    format!("|i, f| match i {{{arms}\n    }}")
                };
                format!(
                    "convert::record_{suffix}(v, {name}, &[{}], {closure})",
                    names.join(", ")
                )
            }
            ShapeKind::Opaque { .. } => format!("convert::opaque_{suffix}(v, {name})"),
            ShapeKind::Func(_) | ShapeKind::Chan { .. } | ShapeKind::Interface { .. } => {
                format!("rt.{suffix}(ShapeId({}), v)", shape.id.0)
            }
            // Covered by the inline arm above.
            _ => format!("rt.{suffix}(ShapeId({}), v)", shape.id.0),
        }
    }

    /// Expression converting `var` with the given sub-shape.
    fn child(&self, shape: ShapeId, direction: Direction, var: &str) -> String {
        if let Some(sub) = self.shapes.get(shape) {
            if sub.kind.is_inline() {
                return scalar_call(&sub.kind, direction, var);
            }
        }
        match self.idents.get(&(shape, direction)) {
            Some(ident) => format!("{ident}(rt, {var})"),
            None => format!("rt.{}(ShapeId({}), {var})", direction.prefix(), shape.0),
        }
    }
}

fn scalar_call(kind: &ShapeKind, direction: Direction, var: &str) -> String {
    match (direction, kind) {
        (Direction::ToScript, ShapeKind::Bool) => format!("convert::bool_to_script({var})"),
        (Direction::ToScript, ShapeKind::Int { .. }) => format!("convert::int_to_script({var})"),
        (Direction::ToScript, ShapeKind::Float { .. }) => format!("convert::float_to_script({var})"),
        (Direction::ToScript, ShapeKind::String) => format!("convert::string_to_script({var})"),
        (Direction::ToScript, ShapeKind::Any) => format!("convert::any_to_script({var})"),
        (Direction::ToScript, ShapeKind::Error) => format!("convert::error_to_script({var})"),
        (Direction::FromScript, ShapeKind::Bool) => format!("convert::bool_from_script({var})"),
        (Direction::FromScript, ShapeKind::Int { width, signedness }) => {
            format!("convert::int_from_script({var}, {width}, Signedness::{signedness:?})")
        }
        (Direction::FromScript, ShapeKind::Float { precision }) => {
            format!("convert::float_from_script({var}, FloatPrecision::{precision:?})")
        }
        (Direction::FromScript, ShapeKind::String) => format!("convert::string_from_script({var})"),
        (Direction::FromScript, ShapeKind::Any) => format!("convert::any_from_script({var})"),
        (Direction::FromScript, ShapeKind::Error) => format!("convert::error_from_script({var})"),
        (direction, other) => format!(
            "Err(ConversionError::Failure {{ detail: \"no inline {} converter for {}\".to_string() }})",
            direction,
            other.label()
        ),
    }
}

fn quoted(s: &str) -> String {
    format!("{s:?}")
}

/// Converter indices, dependencies first. Cycles are broken at the first
/// revisited entry.
pub fn topological_order(converters: &[ConverterEntry]) -> Vec<usize> {
    fn visit(i: usize, converters: &[ConverterEntry], state: &mut [u8], order: &mut Vec<usize>) {
        if state[i] != 0 {
            return;
        }
        state[i] = 1;
        for dep in &converters[i].deps {
            let d = dep.0 as usize;
            if d < converters.len() {
                visit(d, converters, state, order);
            }
        }
        state[i] = 2;
        order.push(i);
    }

    let mut state = vec![0u8; converters.len()];
    let mut order = Vec::with_capacity(converters.len());
    for i in 0..converters.len() {
        visit(i, converters, &mut state, &mut order);
    }
    order
}

/// Render the complete bindings module.
pub fn emit_module(bindings: &Bindings, module_name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// Code generated by tether. DO NOT EDIT.");
    let _ = writeln!(out, "//");
    let _ = writeln!(
        out,
        "// Module `{module_name}`: {} shapes, {} converters, {} bridges.",
        bindings.shapes.len(),
        bindings.converters.len(),
        bindings.bridges.len()
    );
    let _ = writeln!(
        out,
        "// Load the shape table from `{module_name}.json` into the runtime before calling."
    );
    for limitation in &bindings.limitations {
        let _ = writeln!(out, "// limitation: {limitation}");
    }
    out.push('\n');
    out.push_str("#![allow(unused_imports, unused_variables, dead_code)]\n\n");
    out.push_str("use std::sync::Arc;\n\n");
    out.push_str("use tether_runtime::convert;\n");
    out.push_str(
        "use tether_runtime::{\n    BridgeTable, ChanDir, ConversionError, FloatPrecision, NativeValue, Runtime, ShapeId,\n    Signedness, Value,\n};\n\n",
    );

    out.push_str("/// Registers struct alias names with the runtime.\n");
    out.push_str("pub fn register_type_names(rt: &Runtime) {\n");
    for (alias, listing) in &bindings.aliases {
        let _ = writeln!(
            out,
            "    rt.type_names().register_alias({}, {});",
            quoted(alias),
            quoted(listing)
        );
    }
    out.push_str("}\n");

    for bridge in &bindings.bridges {
        let _ = write!(
            out,
            "\npub fn {}(rt: &Runtime) -> Arc<BridgeTable> {{\n    rt.bridge_table(ShapeId({}), ChanDir::{:?})\n}}\n",
            bridge.ident, bridge.element.0, bridge.direction
        );
    }

    for i in topological_order(&bindings.converters) {
        out.push('\n');
        out.push_str(&bindings.converters[i].source);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Generator;
    use tether_core::types::{FuncSig, Param};
    use tether_core::{ChanDir, Direction, TypeGraph};

    fn point_graph() -> (TypeGraph, tether_core::TypeId) {
        let mut g = TypeGraph::new();
        let f = g.float64();
        let body = g.strukt(&[("X", f), ("Y", f)]);
        let point = g.named("geo.Point", body).unwrap();
        (g, point)
    }

    #[test]
    fn record_converter_text() {
        let (g, point) = point_graph();
        let mut gen = Generator::new(&g);
        gen.add(point, Direction::FromScript).unwrap();
        let bindings = gen.finish();
        let src = &bindings.converters[0].source;
        assert!(src.contains(
            "pub fn from_script_geo_point(rt: &Runtime, v: &Value) -> Result<NativeValue, ConversionError>"
        ));
        assert!(src.contains("convert::record_from_script(v, \"geo.Point\", &[\"X\", \"Y\"]"));
        assert!(src.contains("0 => convert::float_from_script(f, FloatPrecision::F64),"));
        assert!(src.contains("_ => convert::float_from_script(f, FloatPrecision::F64),"));
        assert!(!src.contains("explain"));
    }

    #[test]
    fn composite_calls_child_converter() {
        let (mut g, point) = point_graph();
        let points = g.slice(point);
        let mut gen = Generator::new(&g);
        gen.add(points, Direction::ToScript).unwrap();
        let bindings = gen.finish();
        let src = &bindings.converters[0].source;
        assert!(src.contains(
            "convert::slice_to_script(v, \"[]geo.Point\", |e| to_script_geo_point(rt, e))"
        ));
    }

    #[test]
    fn func_and_chan_delegate_to_runtime() {
        let mut g = TypeGraph::new();
        let int = g.int();
        let f = g.func(FuncSig::new(vec![Param::unnamed(int)], vec![]));
        let ch = g.chan(ChanDir::RecvOnly, int);
        let mut gen = Generator::new(&g);
        gen.add(f, Direction::FromScript).unwrap();
        gen.add(ch, Direction::ToScript).unwrap();
        let bindings = gen.finish();
        assert!(bindings.converters[0].source.contains("rt.from_script(ShapeId("));
        let module = emit_module(&bindings, "bindings");
        assert!(module.contains("pub fn bridge_int64_recv(rt: &Runtime) -> Arc<BridgeTable>"));
        assert!(module.contains("ChanDir::RecvOnly"));
    }

    #[test]
    fn module_orders_dependencies_first() {
        let (mut g, point) = point_graph();
        let points = g.slice(point);
        let mut gen = Generator::new(&g);
        gen.add(points, Direction::ToScript).unwrap();
        let bindings = gen.finish();
        let module = emit_module(&bindings, "bindings");
        let callee = module.find("pub fn to_script_geo_point").unwrap();
        let caller = module.find("pub fn to_script_slice_geo_point").unwrap();
        assert!(callee < caller);
        assert!(module.starts_with("// Code generated by tether. DO NOT EDIT."));
        assert!(module.contains("pub fn register_type_names(rt: &Runtime)"));
    }

    #[test]
    fn aliases_are_registered_in_module() {
        let mut g = TypeGraph::new();
        let int = g.int();
        let anon = g.strukt(&[("X", int)]);
        let mut gen = Generator::new(&g);
        gen.add(anon, Direction::ToScript).unwrap();
        let bindings = gen.finish();
        let module = emit_module(&bindings, "bindings");
        let alias = tether_core::hash::struct_alias("X int64;");
        assert!(module.contains(&format!(
            "rt.type_names().register_alias(\"{alias}\", \"X int64;\");"
        )));
        assert!(module.contains(".map_err(|e| rt.type_names().explain(e))"));
    }

    #[test]
    fn topological_order_handles_cycles() {
        let mut g = TypeGraph::new();
        let node = g.declare_named("list.Node", vec![]).unwrap();
        let next = g.pointer(node);
        let body = g.strukt(&[("Next", next)]);
        g.define_named(node, body).unwrap();
        let mut gen = Generator::new(&g);
        gen.add(node, Direction::ToScript).unwrap();
        let bindings = gen.finish();
        let order = topological_order(&bindings.converters);
        assert_eq!(order.len(), 2);
        assert_eq!(order, vec![1, 0]);
    }
}
