//! `tether generate`: declaration file to converter module and manifest.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tether_core::hash::{content_hash, hash_hex};
use tether_gen::{emit, generate, Bindings, Declaration};

use crate::manifest::TetherConfig;

/// Command-line overrides for the `[generate]` section.
#[derive(Debug, Default)]
pub struct GenerateOptions {
    pub input: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub module_name: Option<String>,
    pub no_manifest: bool,
}

/// What a run wrote.
#[derive(Debug)]
pub struct GenerateOutput {
    pub source: PathBuf,
    pub manifest: Option<PathBuf>,
    pub bindings: Bindings,
    /// SHA-256 of the bindings manifest; unchanged across regenerations of
    /// the same declaration.
    pub fingerprint: String,
}

/// Load, lower and generate, without writing anything.
pub fn build_bindings(input: &Path) -> Result<Bindings> {
    let decl = Declaration::load(input).with_context(|| format!("loading {}", input.display()))?;
    let lowered = decl
        .lower()
        .with_context(|| format!("lowering package '{}'", decl.package.name))?;
    let bindings =
        generate(&lowered).with_context(|| format!("generating bindings for '{}'", decl.package.name))?;
    log::debug!(
        "package {}: {} requests, {} shapes",
        decl.package.name,
        lowered.requests.len(),
        bindings.shapes.len()
    );
    Ok(bindings)
}

/// Resolve the declaration path from flags, then config.
pub fn resolve_input(
    project_dir: &Path,
    config: Option<&TetherConfig>,
    input: Option<&Path>,
) -> Result<PathBuf> {
    let path = match (input, config.and_then(|c| c.generate.input.as_deref())) {
        (Some(path), _) => project_dir.join(path),
        (None, Some(path)) => project_dir.join(path),
        (None, None) => bail!("no declaration file: pass --input or set [generate] input in tether.toml"),
    };
    if !path.is_file() {
        bail!("declaration file not found: {}", path.display());
    }
    Ok(path)
}

pub fn run(project_dir: &Path, config: Option<&TetherConfig>, opts: &GenerateOptions) -> Result<GenerateOutput> {
    let defaults = config.map(|c| c.generate.clone()).unwrap_or_default();
    let input = resolve_input(project_dir, config, opts.input.as_deref())?;
    let output_dir = project_dir.join(
        opts.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&defaults.output_dir)),
    );
    let module_name = opts
        .module_name
        .clone()
        .unwrap_or_else(|| defaults.module_name.clone());
    if module_name.is_empty() || !module_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("invalid module name '{module_name}': use letters, digits and '_'");
    }

    let bindings = build_bindings(&input)?;
    let fingerprint = fingerprint(&bindings)?;
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let source = output_dir.join(format!("{module_name}.rs"));
    fs::write(&source, emit::emit_module(&bindings, &module_name))
        .with_context(|| format!("writing {}", source.display()))?;

    let manifest = if defaults.emit_manifest && !opts.no_manifest {
        let path = output_dir.join(format!("{module_name}.json"));
        let json = bindings.to_json().context("serializing manifest")?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Some(path)
    } else {
        None
    };

    println!(
        "Generated {} converters, {} bridges for {} -> {}",
        bindings.converters.len(),
        bindings.bridges.len(),
        input.display(),
        source.display()
    );
    for limitation in &bindings.limitations {
        println!("  limitation: {limitation}");
    }

    Ok(GenerateOutput {
        source,
        manifest,
        bindings,
        fingerprint,
    })
}

/// Hex content hash of the generated bindings.
pub fn fingerprint(bindings: &Bindings) -> Result<String> {
    let hash = content_hash(bindings).context("hashing bindings")?;
    Ok(hash_hex(&hash))
}
