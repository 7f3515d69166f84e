//! tether CLI: generate and inspect script bindings for native packages.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};

use manifest::TetherConfig;

#[derive(Parser)]
#[command(name = "tether", version, about = "Script bindings for native packages")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Path to tether.toml (default: search upward from the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the converter module and JSON manifest
    Generate {
        /// Declaration file (default: [generate] input in tether.toml)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output directory (default: generated)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Module name for <name>.rs and <name>.json (default: bindings)
        #[arg(long)]
        module_name: Option<String>,
        /// Skip writing the JSON manifest
        #[arg(long)]
        no_manifest: bool,
    },
    /// Show shapes, converters, bridges and limitations for a declaration
    Inspect {
        /// Declaration file (default: [generate] input in tether.toml)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Print the JSON manifest instead of the summary
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let (config, project_dir) = load_config(&cwd, cli.config.as_deref())?;
    init_logging(cli.verbose, config.as_ref());
    let project_dir = project_dir.unwrap_or(cwd);

    match cli.command {
        Commands::Generate {
            input,
            output_dir,
            module_name,
            no_manifest,
        } => {
            let opts = commands::generate::GenerateOptions {
                input,
                output_dir,
                module_name,
                no_manifest,
            };
            let out = commands::generate::run(&project_dir, config.as_ref(), &opts)?;
            if let Some(manifest) = &out.manifest {
                log::info!(
                    "manifest with {} shapes written to {}",
                    out.bindings.shapes.len(),
                    manifest.display()
                );
            }
            log::debug!("source written to {}", out.source.display());
            println!("  fingerprint: {}", out.fingerprint);
            Ok(())
        }
        Commands::Inspect { input, json } => {
            commands::inspect::run(&project_dir, config.as_ref(), input.as_ref(), json)
        }
    }
}

/// An explicit `--config` must exist; otherwise search upward from `cwd`.
fn load_config(cwd: &Path, explicit: Option<&Path>) -> Result<(Option<TetherConfig>, Option<PathBuf>)> {
    match explicit {
        Some(path) => {
            let path = cwd.join(path);
            let config = TetherConfig::load(&path)?;
            let dir = path.parent().map(Path::to_path_buf);
            Ok((Some(config), dir))
        }
        None => match TetherConfig::find_and_load(cwd)? {
            Some((config, dir)) => Ok((Some(config), Some(dir))),
            None => Ok((None, None)),
        },
    }
}

/// `-v` flags win over `[logging] level`, which wins over `RUST_LOG`.
fn init_logging(verbose: u8, config: Option<&TetherConfig>) {
    let level = match verbose {
        0 => config.and_then(|c| c.logging.level.clone()),
        1 => Some("debug".to_string()),
        _ => Some("trace".to_string()),
    };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.parse_filters(&level);
    }
    let _ = builder.format_timestamp(None).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "tether",
            "-v",
            "generate",
            "--input",
            "geo.tether.toml",
            "--module-name",
            "geo",
            "--no-manifest",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Commands::Generate {
            input,
            module_name,
            no_manifest,
            output_dir,
        } = cli.command
        else {
            panic!("expected generate");
        };
        assert_eq!(input, Some(PathBuf::from("geo.tether.toml")));
        assert_eq!(module_name.as_deref(), Some("geo"));
        assert!(no_manifest);
        assert!(output_dir.is_none());
    }

    #[test]
    fn explicit_config_sets_the_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("proj");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("custom.toml"), "[logging]\nlevel = \"info\"\n").unwrap();

        let (config, project_dir) = load_config(dir.path(), Some(Path::new("proj/custom.toml"))).unwrap();
        assert_eq!(config.unwrap().logging.level.as_deref(), Some("info"));
        assert_eq!(project_dir, Some(sub));

        assert!(load_config(dir.path(), Some(Path::new("missing.toml"))).is_err());
    }
}
