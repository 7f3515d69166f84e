//! `tether.toml` project configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "tether.toml";

/// Top-level project configuration. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TetherConfig {
    #[serde(default)]
    pub project: Option<ProjectConfig>,
    #[serde(default)]
    pub generate: GenerateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Defaults for `tether generate`; command-line flags take precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// Declaration file, relative to the project directory.
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_module_name")]
    pub module_name: String,
    /// Write `<module>.json` next to the generated source.
    #[serde(default = "default_true")]
    pub emit_manifest: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            input: None,
            output_dir: default_output_dir(),
            module_name: default_module_name(),
            emit_manifest: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `env_logger` filter, e.g. `info` or `tether_gen=debug`.
    #[serde(default)]
    pub level: Option<String>,
}

fn default_output_dir() -> String {
    "generated".to_string()
}

fn default_module_name() -> String {
    "bindings".to_string()
}

fn default_true() -> bool {
    true
}

impl TetherConfig {
    /// Search upward from `start_dir` for `tether.toml`, returning it with
    /// the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok(Some((config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing tether.toml")
    }
}
