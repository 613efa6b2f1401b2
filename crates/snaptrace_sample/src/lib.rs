//! Scan-chain snapshot capture, window sampling, and replay decoding.
//!
//! This crate is the host side of snapshot-based replay for a design running
//! on an FPGA or an emulator. It captures the design's scan chains and
//! interface trace through a narrow register interface, keeps a bounded set
//! of windows from an arbitrarily long run, and turns each retained window
//! into a replay script a reference model can execute.
//!
//! # Architecture
//!
//! The [`Schema`] describes the scan chains and is shared read-only by the
//! [`CaptureEngine`] and the decoder. The run loop reports elapsed cycles to a
//! [`Sampler`], which applies the configured policy and asks the engine to
//! capture [`Snapshot`]s into a [`SnapshotPool`]. After the run, retained
//! snapshots are decoded into [`Sample`]s and written by a [`ReplayWriter`].
//!
//! # Usage
//!
//! ```ignore
//! use snaptrace_sample::{dump_samples, CaptureEngine, Sampler, Schema};
//!
//! let schema = Arc::new(Schema::load(&paths.schema, config.chains.shift_width)?);
//! let engine =
//!     CaptureEngine::new(schema.clone(), &config.chains.registers, config.trace.clone())?;
//! let mut sampler = Sampler::new(engine, &config.sampling);
//! sampler.init(&mut device)?;
//! while running {
//!     let cycles = sampler.step(&mut device, batch)?;
//!     device.step(cycles);
//! }
//! let snapshots = sampler.finish(&mut device)?;
//! let report = dump_samples(&schema, &config.trace, &snapshots, file)?;
//! ```
//!
//! # Modules
//!
//! - `schema`: Chain schema parsing and geometry
//! - `codec`: Chain bits to `Load`/`Force` instructions and back
//! - `transport`: Register access seam and the in-memory device
//! - `capture`: Copy/shift/read protocol and trace draining
//! - `sampling`: Reservoir and deterministic window selection
//! - `snapshot`: Raw captures, the pool, and JSON archives
//! - `decoder`: Snapshot to sample decoding
//! - `replay`: Replay script output

#![warn(missing_docs)]

pub mod capture;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod hook;
pub mod replay;
pub mod sample;
pub mod sampling;
pub mod schema;
pub mod snapshot;
pub mod transport;

use std::io::Write;

use snaptrace_config::TraceLayout;
use tracing::{error, info};

pub use capture::CaptureEngine;
pub use codec::{decode_full_state, decode_one_iteration, encode_full_state};
pub use decoder::decode;
pub use error::SnapError;
pub use hook::{NoHook, SnapshotHook};
pub use replay::ReplayWriter;
pub use sample::{Instruction, Sample};
pub use sampling::{reservoir_slot, Sampler, SamplingStats};
pub use schema::{ChainLayout, ChainSignal, Schema};
pub use snapshot::{read_archive, write_archive, Snapshot, SnapshotPool};
pub use transport::{MemoryTransport, RegisterTransport, TransportError};

/// Outcome of writing retained snapshots as a replay script.
#[derive(Debug, Default)]
pub struct DumpReport {
    /// Samples written.
    pub written: usize,
    /// Snapshots that could not be decoded, by cycle.
    pub failed: Vec<(u64, SnapError)>,
}

impl DumpReport {
    /// Returns true if every snapshot was written.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes the signal header and one sample per snapshot to `writer`.
///
/// A snapshot that fails to decode is logged and skipped; the others are
/// still written. Output errors abort the dump.
pub fn dump_samples<W: Write>(
    schema: &Schema,
    layout: &TraceLayout,
    snapshots: &[Snapshot],
    writer: W,
) -> Result<DumpReport, SnapError> {
    let mut out = ReplayWriter::new(writer);
    out.write_header(schema, layout)?;
    let mut report = DumpReport::default();
    for snapshot in snapshots {
        match decode(schema, layout, snapshot) {
            Ok(sample) => {
                out.write_sample(&sample)?;
                report.written += 1;
            }
            Err(e) if e.is_sample_local() => {
                error!(cycle = snapshot.cycle, "sample dropped: {e}");
                report.failed.push((snapshot.cycle, e));
            }
            Err(e) => return Err(e),
        }
    }
    out.finish()?;
    info!(
        written = report.written,
        failed = report.failed.len(),
        "samples dumped"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snaptrace_config::WirePort;

    fn layout() -> TraceLayout {
        TraceLayout {
            inputs: vec![WirePort {
                name: "in".into(),
                addr: 0,
                chunks: 1,
            }],
            ..TraceLayout::default()
        }
    }

    fn snapshot(cycle: u64, trace: Vec<u32>, trace_size: usize) -> Snapshot {
        Snapshot {
            cycle,
            state: vec![0x3],
            trace,
            trace_size,
        }
    }

    #[test]
    fn dump_writes_header_and_samples() {
        let schema = Schema::parse("0 r 8 -1\n", 8).unwrap();
        let mut buf = Vec::new();
        let report = dump_samples(
            &schema,
            &layout(),
            &[snapshot(0, vec![1], 1), snapshot(8, vec![2], 1)],
            &mut buf,
        )
        .unwrap();
        assert_eq!(report.written, 2);
        assert!(report.is_complete());
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "\
SIGNALS 0 r 8
SIGNALS 5 in
CYCLE 0
LOAD 0 0 3 -1
POKE 5 0 1
STEP 1
CYCLE 8
LOAD 0 0 3 -1
POKE 5 0 2
STEP 1
"
        );
    }

    #[test]
    fn dump_skips_broken_sample() {
        let schema = Schema::parse("0 r 8 -1\n", 8).unwrap();
        let mut buf = Vec::new();
        let report = dump_samples(
            &schema,
            &layout(),
            &[snapshot(0, vec![], 1), snapshot(8, vec![2], 1)],
            &mut buf,
        )
        .unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 0);
        assert!(matches!(report.failed[0].1, SnapError::TruncatedTrace { .. }));
        let text = String::from_utf8(buf).unwrap();
        assert!(!text.contains("CYCLE 0"));
        assert!(text.contains("CYCLE 8"));
    }
}
