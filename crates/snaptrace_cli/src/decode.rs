//! `snaptrace decode` and `snaptrace decode-chain`: offline replay script
//! generation from captured data.

use std::fs;
use std::path::{Path, PathBuf};

use snaptrace_common::BitString;
use snaptrace_sample::{dump_samples, read_archive, ReplayWriter, Sample};
use tracing::info;

use crate::project::{load_project, open_output};
use crate::{DecodeArgs, DecodeChainArgs, GlobalArgs};

/// Runs the `snaptrace decode` command.
///
/// Writes to `-o`, else to the configured `sampling.output`, else stdout.
/// Returns exit code 1 if any snapshot failed to decode.
pub fn run(args: &DecodeArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let snapshots = read_archive(Path::new(&args.archive))?;
    info!(count = snapshots.len(), archive = %args.archive, "archive loaded");

    let target: Option<PathBuf> = match (&args.output, &project.config.sampling.output) {
        (Some(out), _) => Some(PathBuf::from(out)),
        (None, Some(_)) => Some(project.paths.output.clone()),
        (None, None) => None,
    };
    let writer = open_output(target.as_deref())?;
    let report = dump_samples(&project.schema, &project.config.trace, &snapshots, writer)?;

    if !global.quiet {
        if let Some(path) = &target {
            eprintln!("     Written {} ({} samples)", path.display(), report.written);
        }
    }
    if report.is_complete() {
        Ok(0)
    } else {
        for (cycle, e) in &report.failed {
            eprintln!("error: sample at cycle {cycle}: {e}");
        }
        Ok(1)
    }
}

/// Runs the `snaptrace decode-chain` command.
pub fn run_chain(
    args: &DecodeChainArgs,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let text = fs::read_to_string(&args.bits_file)?;
    let bits = BitString::from_binary_str(&text)
        .ok_or_else(|| format!("{}: expected only '0' and '1' characters", args.bits_file))?;

    let sample = match args.chain {
        Some(chain) => Sample::from_chain_bits(&project.schema, chain, &bits, args.cycle)?,
        None => Sample::from_state_bits(&project.schema, &bits, args.cycle)?,
    };

    let mut out = ReplayWriter::new(open_output(None)?);
    out.write_header(&project.schema, &project.config.trace)?;
    out.write_sample(&sample)?;
    out.finish()?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::tests::setup;
    use snaptrace_common::ChainType;
    use snaptrace_sample::{write_archive, Snapshot};

    fn snapshot(cycle: u64, trace: Vec<u32>) -> Snapshot {
        Snapshot {
            cycle,
            state: vec![0x12, 0x34, 0xa, 0xb],
            trace,
            trace_size: 2,
        }
    }

    #[test]
    fn decode_writes_configured_output() {
        let (dir, global) = setup();
        let archive = dir.path().join("run.json");
        write_archive(&archive, &[snapshot(8, vec![1, 2])]).unwrap();

        let args = DecodeArgs {
            archive: archive.to_string_lossy().into_owned(),
            output: None,
        };
        assert_eq!(run(&args, &global).unwrap(), 0);

        let text = fs::read_to_string(dir.path().join("out/design.sample")).unwrap();
        assert!(text.starts_with("SIGNALS 0 core.pc 8\n"));
        assert!(text.contains(
            "\
CYCLE 8
LOAD 0 0 12 -1
LOAD 0 1 34 -1
LOAD 4 0 a 0
LOAD 4 0 b 1
POKE 5 0 1
STEP 1
POKE 5 0 2
STEP 1
"
        ));
    }

    #[test]
    fn decode_exits_one_on_broken_sample() {
        let (dir, global) = setup();
        let archive = dir.path().join("run.json");
        write_archive(&archive, &[snapshot(0, vec![1]), snapshot(4, vec![1, 2])]).unwrap();

        let out = dir.path().join("partial.sample");
        let args = DecodeArgs {
            archive: archive.to_string_lossy().into_owned(),
            output: Some(out.to_string_lossy().into_owned()),
        };
        assert_eq!(run(&args, &global).unwrap(), 1);

        let text = fs::read_to_string(out).unwrap();
        assert!(!text.contains("CYCLE 0"));
        assert!(text.contains("CYCLE 4"));
    }

    #[test]
    fn decode_missing_archive_is_error() {
        let (dir, global) = setup();
        let args = DecodeArgs {
            archive: dir.path().join("missing.json").to_string_lossy().into_owned(),
            output: None,
        };
        assert!(run(&args, &global).is_err());
    }

    #[test]
    fn decode_chain_rejects_non_binary_input() {
        let (dir, global) = setup();
        let bits = dir.path().join("chain.bits");
        fs::write(&bits, "0101 2").unwrap();
        let args = DecodeChainArgs {
            bits_file: bits.to_string_lossy().into_owned(),
            cycle: 0,
            chain: None,
        };
        let err = run_chain(&args, &global).unwrap_err();
        assert!(err.to_string().contains("expected only '0' and '1'"));
    }

    #[test]
    fn decode_chain_single_chain() {
        let (dir, global) = setup();
        let bits = dir.path().join("chain.bits");
        fs::write(&bits, "00010010 00110100\n").unwrap();
        let args = DecodeChainArgs {
            bits_file: bits.to_string_lossy().into_owned(),
            cycle: 3,
            chain: Some(ChainType::Regs),
        };
        assert_eq!(run_chain(&args, &global).unwrap(), 0);
    }

    #[test]
    fn decode_chain_short_state_is_error() {
        let (dir, global) = setup();
        let bits = dir.path().join("chain.bits");
        fs::write(&bits, "00010010").unwrap();
        let args = DecodeChainArgs {
            bits_file: bits.to_string_lossy().into_owned(),
            cycle: 3,
            chain: None,
        };
        assert!(run_chain(&args, &global).is_err());
    }
}
