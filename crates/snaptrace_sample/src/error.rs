//! Error types for schema loading, capture, and sample decoding.
//!
//! All errors that can occur between reading the chain schema and writing the
//! replay script are represented as variants of [`SnapError`].

use std::io;

use snaptrace_common::ChainType;

use crate::transport::TransportError;

/// Errors that can occur while capturing or decoding snapshots.
#[derive(Debug, thiserror::Error)]
pub enum SnapError {
    /// A schema line could not be parsed.
    #[error("malformed schema at line {line}: {reason}")]
    MalformedSchema {
        /// 1-based line number in the schema source, or 0 for whole-schema faults.
        line: usize,
        /// Description of what is wrong with the line.
        reason: String,
    },

    /// A chain's total signal width is not a multiple of the shift width.
    #[error("chain {chain} holds {bits} bits, not a multiple of the {shift_width}-bit shift width")]
    InvalidChainAlignment {
        /// The misaligned chain.
        chain: ChainType,
        /// Total signal bits declared for the chain.
        bits: usize,
        /// The physical shift width.
        shift_width: u32,
    },

    /// Decoding one chain iteration did not end on a shift word boundary.
    #[error(
        "chain {chain} iteration {iteration} ended at bit {cursor}, off the shift word boundary"
    )]
    AlignmentFault {
        /// The chain being decoded.
        chain: ChainType,
        /// The iteration being decoded.
        iteration: usize,
        /// Bit cursor after the last signal.
        cursor: usize,
    },

    /// A chain bitstring ended before all declared signals were read.
    #[error("chain {chain} needs bits up to {cursor} but the bitstring holds {len}")]
    StateUnderrun {
        /// The chain being decoded.
        chain: ChainType,
        /// Bit position that could not be reached.
        cursor: usize,
        /// Length of the bitstring.
        len: usize,
    },

    /// A state buffer does not match the schema's total state size.
    #[error("state buffer holds {actual} words, schema expects {expected}")]
    StateSizeMismatch {
        /// Words the schema requires.
        expected: usize,
        /// Words present.
        actual: usize,
    },

    /// The trace buffer ran out before every recorded cycle was decoded.
    #[error("trace of snapshot at cycle {cycle} exhausted after {consumed} words")]
    TruncatedTrace {
        /// Cycle of the snapshot being decoded.
        cycle: u64,
        /// Words consumed before the underrun.
        consumed: usize,
    },

    /// A chain carrying state has no control registers configured.
    #[error("no control registers configured for chain {chain}")]
    MissingRegisters {
        /// The chain lacking registers.
        chain: ChainType,
    },

    /// The trace window length does not fit the device's window register.
    #[error("trace window of {trace_len} cycles does not fit a device word")]
    WindowTooLong {
        /// The requested window length in cycles.
        trace_len: usize,
    },

    /// The register transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An I/O error occurred while reading a schema or writing a replay script.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A snapshot archive could not be read or written.
    #[error("snapshot archive error: {0}")]
    Archive(String),
}

impl SnapError {
    /// Returns true if the error invalidates only the sample being decoded.
    ///
    /// Other errors abort the whole run.
    pub fn is_sample_local(&self) -> bool {
        matches!(
            self,
            SnapError::AlignmentFault { .. }
                | SnapError::StateUnderrun { .. }
                | SnapError::StateSizeMismatch { .. }
                | SnapError::TruncatedTrace { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_schema_display() {
        let e = SnapError::MalformedSchema {
            line: 3,
            reason: "unknown chain type 9".into(),
        };
        assert_eq!(
            e.to_string(),
            "malformed schema at line 3: unknown chain type 9"
        );
    }

    #[test]
    fn invalid_alignment_display() {
        let e = SnapError::InvalidChainAlignment {
            chain: ChainType::Regs,
            bits: 33,
            shift_width: 32,
        };
        assert_eq!(
            e.to_string(),
            "chain regs holds 33 bits, not a multiple of the 32-bit shift width"
        );
    }

    #[test]
    fn alignment_fault_display() {
        let e = SnapError::AlignmentFault {
            chain: ChainType::Sram,
            iteration: 2,
            cursor: 70,
        };
        assert_eq!(
            e.to_string(),
            "chain sram iteration 2 ended at bit 70, off the shift word boundary"
        );
    }

    #[test]
    fn state_underrun_display() {
        let e = SnapError::StateUnderrun {
            chain: ChainType::Mems,
            cursor: 96,
            len: 64,
        };
        assert_eq!(
            e.to_string(),
            "chain mems needs bits up to 96 but the bitstring holds 64"
        );
    }

    #[test]
    fn state_size_mismatch_display() {
        let e = SnapError::StateSizeMismatch {
            expected: 4,
            actual: 3,
        };
        assert_eq!(e.to_string(), "state buffer holds 3 words, schema expects 4");
    }

    #[test]
    fn truncated_trace_display() {
        let e = SnapError::TruncatedTrace {
            cycle: 256,
            consumed: 17,
        };
        assert_eq!(
            e.to_string(),
            "trace of snapshot at cycle 256 exhausted after 17 words"
        );
    }

    #[test]
    fn missing_registers_display() {
        let e = SnapError::MissingRegisters {
            chain: ChainType::RegFile,
        };
        assert_eq!(
            e.to_string(),
            "no control registers configured for chain regfile"
        );
    }

    #[test]
    fn window_too_long_display() {
        let e = SnapError::WindowTooLong {
            trace_len: usize::MAX,
        };
        assert_eq!(
            e.to_string(),
            format!("trace window of {} cycles does not fit a device word", usize::MAX)
        );
        assert!(!e.is_sample_local());
    }

    #[test]
    fn transport_display_is_transparent() {
        let e: SnapError = TransportError::new(0x40, "link down").into();
        assert_eq!(e.to_string(), "register access at 0x40 failed: link down");
    }

    #[test]
    fn io_display() {
        let e = SnapError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(e.to_string().contains("I/O error"));
    }

    #[test]
    fn sample_local_classification() {
        assert!(SnapError::TruncatedTrace {
            cycle: 0,
            consumed: 0
        }
        .is_sample_local());
        assert!(!SnapError::MissingRegisters {
            chain: ChainType::Regs
        }
        .is_sample_local());
        assert!(!SnapError::Archive("bad".into()).is_sample_local());
    }
}
