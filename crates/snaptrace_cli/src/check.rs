//! `snaptrace check`: configuration and schema sanity check.
//!
//! Loads `snaptrace.toml` and its chain schema, which validates chain
//! alignment, and prints the geometry every capture will use.

use std::fmt::Write as _;

use snaptrace_common::ChainType;
use snaptrace_sample::Schema;

use crate::project::load_project;
use crate::GlobalArgs;

/// Runs the `snaptrace check` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    if !global.quiet {
        eprintln!("    Checking {}", project.paths.schema.display());
    }
    print!("{}", render_geometry(&project.schema));

    for chain in ChainType::ALL {
        let words = project.schema.chain(chain).state_words();
        if words > 0 && !project.config.chains.registers.contains_key(&chain) {
            eprintln!("warning: chain {chain} holds {words} words but has no control registers");
        }
    }
    Ok(0)
}

/// Formats per-chain geometry and the total state size as a table.
pub fn render_geometry(schema: &Schema) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:>8} {:>6} {:>10} {:>6}",
        "chain", "signals", "words", "iterations", "state"
    );
    for chain in ChainType::ALL {
        let layout = schema.chain(chain);
        let _ = writeln!(
            out,
            "{:<8} {:>8} {:>6} {:>10} {:>6}",
            chain.name(),
            layout.signals().len(),
            layout.word_len(),
            layout.iterations(),
            layout.state_words()
        );
    }
    let _ = writeln!(
        out,
        "state size: {} words of {} bits",
        schema.state_size(),
        schema.shift_width()
    );
    out
}
