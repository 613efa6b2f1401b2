//! `snaptrace chains`: writes the replay-script signal header.

use std::path::Path;

use snaptrace_sample::ReplayWriter;

use crate::project::{load_project, open_output};
use crate::{ChainsArgs, GlobalArgs};

/// Runs the `snaptrace chains` command.
pub fn run(args: &ChainsArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let mut out = ReplayWriter::new(open_output(args.output.as_deref().map(Path::new))?);
    out.write_header(&project.schema, &project.config.trace)?;
    out.finish()?;
    if let (false, Some(path)) = (global.quiet, &args.output) {
        eprintln!("     Written {path}");
    }
    Ok(0)
}
