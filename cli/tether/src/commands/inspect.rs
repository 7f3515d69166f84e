//! `tether inspect`: show what a declaration generates without writing files.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tether_core::{Shape, ShapeKind};
use tether_gen::Bindings;

use crate::commands::generate::{build_bindings, resolve_input};
use crate::manifest::TetherConfig;

pub fn run(project_dir: &Path, config: Option<&TetherConfig>, input: Option<&PathBuf>, json: bool) -> Result<()> {
    let input = resolve_input(project_dir, config, input.map(PathBuf::as_path))?;
    let bindings = build_bindings(&input)?;
    if json {
        println!("{}", bindings.to_json().context("serializing manifest")?);
    } else {
        print!("{}", render(&bindings));
    }
    Ok(())
}

fn describe(shape: &Shape) -> String {
    match &shape.kind {
        ShapeKind::Record { fields } => {
            let fields: Vec<String> = fields.iter().map(|f| format!("{}: {}", f.name, f.shape)).collect();
            format!("record {{{}}}", fields.join(", "))
        }
        ShapeKind::Slice { element } => format!("slice of {element}"),
        ShapeKind::Array { element, length } => format!("array of {length} {element}"),
        ShapeKind::Map { value } => format!("map to {value}"),
        ShapeKind::Pointer { element } => format!("pointer to {element}"),
        ShapeKind::Chan { direction, element } => format!("chan ({}) of {element}", direction.label()),
        ShapeKind::Func(func) => format!("func/{} -> {}", func.arity(), func.results.len()),
        ShapeKind::Interface { methods } => {
            let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
            format!("interface [{}]", names.join(", "))
        }
        ShapeKind::Opaque { reason } => format!("opaque ({reason})"),
        other => other.label().to_string(),
    }
}

/// Human-readable listing of a generation result.
pub fn render(bindings: &Bindings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Shapes ({}):", bindings.shapes.len());
    for shape in bindings.shapes.iter() {
        let _ = writeln!(out, "  {:<5} {:<32} {}", shape.id.to_string(), shape.name, describe(shape));
    }

    let _ = writeln!(out, "Converters ({}):", bindings.converters.len());
    for entry in &bindings.converters {
        let _ = writeln!(out, "  {:<40} {}", entry.ident, entry.direction);
    }

    if !bindings.bridges.is_empty() {
        let _ = writeln!(out, "Bridges ({}):", bindings.bridges.len());
        for bridge in &bindings.bridges {
            let _ = writeln!(
                out,
                "  {:<40} {} {}",
                bridge.ident,
                bridge.element,
                bridge.direction.label()
            );
        }
    }

    if !bindings.aliases.is_empty() {
        let _ = writeln!(out, "Struct aliases ({}):", bindings.aliases.len());
        for (alias, listing) in &bindings.aliases {
            let _ = writeln!(out, "  {alias} = struct {{ {listing} }}");
        }
    }

    if !bindings.limitations.is_empty() {
        let _ = writeln!(out, "Limitations ({}):", bindings.limitations.len());
        for limitation in &bindings.limitations {
            let _ = writeln!(out, "  {limitation}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECL: &str = r#"
[package]
name = "geo"

[[types]]
name = "Point"
type = "struct { X float64; Y float64 }"

[[types]]
name = "Cell"
type = "complex128"

[[convert]]
type = "[]struct { A int }"
direction = "to-script"

[[convert]]
type = "<-chan Point"
"#;

    #[test]
    fn render_lists_every_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geo.tether.toml");
        std::fs::write(&path, DECL).unwrap();
        let bindings = build_bindings(&path).unwrap();
        let text = render(&bindings);

        assert!(text.contains("geo.Point"));
        assert!(text.contains("record {X: shape#"));
        assert!(text.contains("Converters ("));
        assert!(text.contains("Bridges (1):"));
        assert!(text.contains("recv"));
        assert!(text.contains("Struct aliases (1):"));
        assert!(text.contains("Limitations (1):"));
        assert!(text.contains("geo.Cell: complex128"));
    }
}
