//! Generates bindings for the fixture declaration so the integration tests
//! compile the emitter's real output against the runtime.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tether_gen::{emit, generate, Declaration};

const FIXTURE: &str = "tests/fixtures/geo.tether.toml";

fn main() {
    if let Err(e) = try_main() {
        eprintln!("error generating fixture bindings: {e}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed={FIXTURE}");
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    let lowered = Declaration::load(Path::new(FIXTURE))?.lower()?;
    let bindings = generate(&lowered)?;
    let source = emit::emit_module(&bindings, "geo_bindings");
    fs::write(
        out_dir.join("geo_bindings.rs"),
        format!("pub mod geo_bindings {{\n{source}}}\n"),
    )?;
    fs::write(out_dir.join("geo_bindings.json"), bindings.to_json()?)?;
    Ok(())
}
