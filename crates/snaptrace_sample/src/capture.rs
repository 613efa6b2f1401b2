//! Register-level capture of chain state and interface traces.
//!
//! State capture pulses a chain's copy register, which latches the design
//! state into the chain's shift register, and then reads the shift-out
//! register once per chain word. The copy pulse must precede the reads of
//! its iteration; the transport's strict ordering guarantees that.
//!
//! Trace capture drains the device's per-cycle interface FIFOs in a fixed
//! order that [`decode`](crate::decoder::decode) mirrors exactly.

use std::collections::BTreeMap;
use std::sync::Arc;

use snaptrace_common::{Addr, ChainType, Word};
use snaptrace_config::{ChainRegisters, TraceLayout};
use tracing::{debug, trace};

use crate::error::SnapError;
use crate::schema::Schema;
use crate::snapshot::Snapshot;
use crate::transport::RegisterTransport;

/// Drives the capture protocol of one device.
#[derive(Debug, Clone)]
pub struct CaptureEngine {
    schema: Arc<Schema>,
    registers: [Option<ChainRegisters>; ChainType::COUNT],
    layout: TraceLayout,
}

impl CaptureEngine {
    /// Creates an engine for the given schema, control registers, and trace layout.
    ///
    /// Every chain type that contributes state words needs registers.
    pub fn new(
        schema: Arc<Schema>,
        registers: &BTreeMap<ChainType, ChainRegisters>,
        layout: TraceLayout,
    ) -> Result<Self, SnapError> {
        let mut table = [None; ChainType::COUNT];
        for chain in ChainType::ALL {
            let regs = registers.get(&chain).copied();
            if regs.is_none() && schema.chain(chain).state_words() > 0 {
                return Err(SnapError::MissingRegisters { chain });
            }
            table[chain.index()] = regs;
        }
        Ok(Self {
            schema,
            registers: table,
            layout,
        })
    }

    /// The chain schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The interface trace layout.
    pub fn layout(&self) -> &TraceLayout {
        &self.layout
    }

    fn registers(&self, chain: ChainType) -> Result<ChainRegisters, SnapError> {
        self.registers[chain.index()].ok_or(SnapError::MissingRegisters { chain })
    }

    /// Programs the trace window length and discards reset-time output traces.
    pub fn init_device(
        &self,
        io: &mut dyn RegisterTransport,
        trace_len: usize,
    ) -> Result<(), SnapError> {
        let len = Word::try_from(trace_len).map_err(|_| SnapError::WindowTooLong { trace_len })?;
        io.write(self.layout.trace_len_addr, len)?;
        for wire in &self.layout.outputs {
            for k in 0..wire.chunks {
                io.read(wire.addr + k as Addr)?;
            }
        }
        for ch in &self.layout.output_channels {
            io.read(ch.ready)?;
            io.read(ch.valid)?;
            for k in 0..ch.bits_chunks {
                io.read(ch.bits + k as Addr)?;
            }
        }
        debug!(trace_len, "sampling initialized");
        Ok(())
    }

    /// Captures the full chain state into `snapshot`, stamping it with `cycle`.
    ///
    /// Does not alter the design state.
    pub fn read_snapshot(
        &self,
        io: &mut dyn RegisterTransport,
        cycle: u64,
        snapshot: &mut Snapshot,
    ) -> Result<(), SnapError> {
        snapshot.cycle = cycle;
        snapshot.state.clear();
        snapshot.state.reserve(self.schema.state_size());
        for chain in ChainType::ALL {
            let layout = self.schema.chain(chain);
            if layout.state_words() == 0 {
                continue;
            }
            let regs = self.registers(chain)?;
            for _ in 0..layout.iterations() {
                io.write(regs.copy, 1)?;
                for _ in 0..layout.word_len() {
                    snapshot.state.push(io.read(regs.shift_out)?);
                }
            }
        }
        debug!(cycle, words = snapshot.state.len(), "chain state captured");
        Ok(())
    }

    /// Shifts a captured state buffer back into the design.
    pub fn load_snapshot(
        &self,
        io: &mut dyn RegisterTransport,
        state: &[Word],
    ) -> Result<(), SnapError> {
        if state.len() != self.schema.state_size() {
            return Err(SnapError::StateSizeMismatch {
                expected: self.schema.state_size(),
                actual: state.len(),
            });
        }
        let mut words = state.iter();
        for chain in ChainType::ALL {
            let layout = self.schema.chain(chain);
            if layout.state_words() == 0 {
                continue;
            }
            let regs = self.registers(chain)?;
            for _ in 0..layout.iterations() {
                for &word in words.by_ref().take(layout.word_len()) {
                    io.write(regs.shift_in, word)?;
                    io.read(regs.shift_out)?;
                }
                io.write(regs.load, 1)?;
                io.write(regs.copy, 1)?;
            }
        }
        debug!(words = state.len(), "chain state restored");
        Ok(())
    }

    /// Drains `trace_size` cycles of interface history from the device.
    ///
    /// Words are appended to `snapshot`'s trace when one is given. Output
    /// wires are not stored on the first cycle, and output channel payloads
    /// only while their valid bit is set.
    pub fn read_traces(
        &self,
        io: &mut dyn RegisterTransport,
        trace_size: usize,
        snapshot: Option<&mut Snapshot>,
    ) -> Result<(), SnapError> {
        let mut sink = snapshot.map(|s| {
            s.trace_size = trace_size;
            &mut s.trace
        });
        let layout = &self.layout;
        for i in 0..trace_size {
            for wire in &layout.inputs {
                for k in 0..wire.chunks {
                    let word = io.read(wire.addr + k as Addr)?;
                    record(&mut sink, word);
                }
            }
            for ch in &layout.input_channels {
                let valid = io.read(ch.valid)?;
                record(&mut sink, valid);
                for k in 0..ch.bits_chunks {
                    let word = io.read(ch.bits + k as Addr)?;
                    record(&mut sink, word);
                }
            }
            for ch in &layout.output_channels {
                let ready = io.read(ch.ready)?;
                record(&mut sink, ready);
            }
            for wire in &layout.outputs {
                for k in 0..wire.chunks {
                    let word = io.read(wire.addr + k as Addr)?;
                    if i > 0 {
                        record(&mut sink, word);
                    }
                }
            }
            for ch in &layout.output_channels {
                let valid = io.read(ch.valid)?;
                record(&mut sink, valid);
                for k in 0..ch.bits_chunks {
                    let word = io.read(ch.bits + k as Addr)?;
                    if valid != 0 {
                        record(&mut sink, word);
                    }
                }
            }
            for ch in &layout.input_channels {
                let ready = io.read(ch.ready)?;
                record(&mut sink, ready);
            }
            trace!(cycle = i, "trace cycle drained");
        }
        Ok(())
    }
}

fn record(sink: &mut Option<&mut Vec<Word>>, word: Word) {
    if let Some(trace) = sink {
        trace.push(word);
    }
}
