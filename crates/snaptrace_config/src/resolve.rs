//! Path resolution: anchoring configured file paths at the configuration's directory.

use crate::types::SnapConfig;
use std::path::{Path, PathBuf};

/// Default extension of the replay script when no output path is configured.
const SAMPLE_EXT: &str = "sample";

/// Files referenced by a configuration, resolved to usable paths.
///
/// Relative paths in `snaptrace.toml` are relative to the directory holding
/// the configuration file, not to the current directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// The chain schema file.
    pub schema: PathBuf,
    /// The replay script written at the end of a run.
    pub output: PathBuf,
}

/// Resolves the schema and output paths of `config` against `base_dir`.
///
/// Without an explicit `sampling.output`, the replay script sits next to the
/// schema with the `.sample` extension.
pub fn resolve_paths(config: &SnapConfig, base_dir: &Path) -> ResolvedPaths {
    let schema = anchor(base_dir, &config.chains.schema);
    let output = match &config.sampling.output {
        Some(out) => anchor(base_dir, out),
        None => schema.with_extension(SAMPLE_EXT),
    };
    ResolvedPaths { schema, output }
}

fn anchor(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
