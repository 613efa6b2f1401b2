//! Snaptrace command-line interface.
//!
//! Offline tools over captured snapshot data: checking a chain schema
//! against its configuration, dumping the replay-script signal header,
//! decoding snapshot archives and raw chain bitstrings into replay scripts.

#![warn(missing_docs)]

mod chains;
mod check;
mod decode;
mod logging;
mod project;

use std::process;

use clap::{Args, Parser, Subcommand};

/// Scan-chain snapshot tools for replaying FPGA runs.
#[derive(Parser, Debug)]
#[command(name = "snaptrace", version, about, long_about = None)]
pub struct Cli {
    /// Only print errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Path to snaptrace.toml.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the configuration and schema and print the chain geometry.
    Check,

    /// Write the SIGNALS header of the replay script.
    Chains(ChainsArgs),

    /// Decode a snapshot archive into a replay script.
    Decode(DecodeArgs),

    /// Decode a raw chain bitstring into a replay script.
    DecodeChain(DecodeChainArgs),
}

/// Arguments for the `chains` subcommand.
#[derive(Args, Debug)]
pub struct ChainsArgs {
    /// Output file (stdout when omitted).
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the `decode` subcommand.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Snapshot archive written at the end of a run.
    pub archive: String,

    /// Output file (defaults to `sampling.output`, then stdout).
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the `decode-chain` subcommand.
#[derive(Args, Debug)]
pub struct DecodeChainArgs {
    /// File holding the chain bits as '0'/'1' characters in shift order.
    pub bits_file: String,

    /// Cycle the bits were captured at.
    #[arg(long)]
    pub cycle: u64,

    /// Decode a single chain type instead of the full state.
    #[arg(long)]
    pub chain: Option<snaptrace_common::ChainType>,
}

/// Global arguments shared by all commands.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    /// Only print errors.
    pub quiet: bool,
    /// Enable debug logging.
    pub verbose: bool,
    /// Path to snaptrace.toml, if given.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    logging::init_logger(&global);

    let result = match cli.command {
        Command::Check => check::run(&global),
        Command::Chains(ref args) => chains::run(args, &global),
        Command::Decode(ref args) => decode::run(args, &global),
        Command::DecodeChain(ref args) => decode::run_chain(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
