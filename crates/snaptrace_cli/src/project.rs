//! Shared helpers for CLI commands: locating and loading the configuration
//! with its chain schema, and opening output streams.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use snaptrace_config::{load_config, resolve_paths, ResolvedPaths, SnapConfig, CONFIG_FILE};
use snaptrace_sample::Schema;
use tracing::debug;

use crate::GlobalArgs;

/// A loaded configuration together with the schema it points at.
#[derive(Debug)]
pub struct Project {
    /// The parsed configuration.
    pub config: SnapConfig,
    /// Schema and output paths, anchored at the configuration's directory.
    pub paths: ResolvedPaths,
    /// The parsed chain schema.
    pub schema: Schema,
}

/// Resolves the configuration file from global CLI args.
///
/// `--config` may name the file or the directory holding `snaptrace.toml`.
/// Without it, `snaptrace.toml` in the current directory is used.
pub fn config_path(global: &GlobalArgs) -> PathBuf {
    match global.config {
        Some(ref path) => {
            let p = PathBuf::from(path);
            if p.is_dir() {
                p.join(CONFIG_FILE)
            } else {
                p
            }
        }
        None => PathBuf::from(CONFIG_FILE),
    }
}

/// Loads the configuration and its chain schema.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let path = config_path(global);
    if !path.is_file() {
        return Err(format!("configuration not found: {}", path.display()).into());
    }
    let config = load_config(&path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let paths = resolve_paths(&config, base_dir);
    debug!(schema = %paths.schema.display(), "loading chain schema");
    let schema = Schema::load(&paths.schema, config.chains.shift_width)?;
    Ok(Project {
        config,
        paths,
        schema,
    })
}

/// Opens `path` for writing, creating parent directories, or stdout when `None`.
pub fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            Ok(Box::new(BufWriter::new(fs::File::create(p)?)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}
