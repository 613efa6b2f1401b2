//! Replay script output.
//!
//! A replay script opens with one `SIGNALS` line per chain entry and trace
//! port, which gives the numeric ids used by instructions their names. Each
//! sample follows as a `CYCLE` marker and one line per instruction. Lines
//! never refer forward, so scripts can be streamed.

use std::io::Write;

use snaptrace_common::{token, ChainType, PortKind};
use snaptrace_config::{ChannelPort, TraceLayout};

use crate::error::SnapError;
use crate::sample::Sample;
use crate::schema::{Schema, ABSENT_SIGNAL};

/// Writes replay scripts to an output stream.
pub struct ReplayWriter<W: Write> {
    writer: W,
    header_written: bool,
    samples_written: usize,
}

impl<W: Write> ReplayWriter<W> {
    /// Creates a writer over the given output.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
            samples_written: 0,
        }
    }

    /// Number of samples written so far.
    pub fn samples_written(&self) -> usize {
        self.samples_written
    }

    /// Writes the signal name header. Only the first call writes anything.
    pub fn write_header(&mut self, schema: &Schema, layout: &TraceLayout) -> Result<(), SnapError> {
        if self.header_written {
            return Ok(());
        }
        for chain in ChainType::ALL {
            for signal in schema.chain(chain).signals() {
                writeln!(
                    self.writer,
                    "{} {} {} {}",
                    token::SIGNALS,
                    chain.index(),
                    signal.name.as_deref().unwrap_or(ABSENT_SIGNAL),
                    signal.width
                )?;
            }
        }
        for wire in &layout.inputs {
            self.write_port(PortKind::InputWire, &wire.name)?;
        }
        for wire in &layout.outputs {
            self.write_port(PortKind::OutputWire, &wire.name)?;
        }
        for ch in &layout.input_channels {
            self.write_channel(
                ch,
                PortKind::InputValid,
                PortKind::InputReady,
                PortKind::InputBits,
            )?;
        }
        for ch in &layout.output_channels {
            self.write_channel(
                ch,
                PortKind::OutputValid,
                PortKind::OutputReady,
                PortKind::OutputBits,
            )?;
        }
        self.header_written = true;
        Ok(())
    }

    fn write_port(&mut self, port: PortKind, name: &str) -> Result<(), SnapError> {
        writeln!(self.writer, "{} {port} {name}", token::SIGNALS)?;
        Ok(())
    }

    fn write_channel(
        &mut self,
        ch: &ChannelPort,
        valid: PortKind,
        ready: PortKind,
        bits: PortKind,
    ) -> Result<(), SnapError> {
        self.write_port(valid, &format!("{}_valid", ch.name))?;
        self.write_port(ready, &format!("{}_ready", ch.name))?;
        for field in &ch.fields {
            self.write_port(bits, &field.name)?;
        }
        Ok(())
    }

    /// Writes one sample.
    pub fn write_sample(&mut self, sample: &Sample) -> Result<(), SnapError> {
        write!(self.writer, "{sample}")?;
        self.samples_written += 1;
        Ok(())
    }

    /// Flushes the output and returns the underlying writer.
    pub fn finish(mut self) -> Result<W, SnapError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
