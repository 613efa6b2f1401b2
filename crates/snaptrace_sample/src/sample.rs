//! Decoded replay samples and their instructions.

use std::fmt;

use num_bigint::BigUint;
use snaptrace_common::bits::to_hex;
use snaptrace_common::{token, BitString, ChainType, PortKind};

use crate::codec;
use crate::error::SnapError;
use crate::schema::Schema;

/// One replay instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Sets chain state. `index` is the array element for arrayed chains.
    Load {
        /// Chain holding the signal.
        chain: ChainType,
        /// Position of the signal in the chain's schema entries.
        signal: usize,
        /// Value to load.
        value: BigUint,
        /// Array element, or `None` for one-shot chains.
        index: Option<usize>,
    },
    /// Overrides a value recorded by the trace chain.
    Force {
        /// Chain holding the signal.
        chain: ChainType,
        /// Position of the signal in the chain's schema entries.
        signal: usize,
        /// Forced value.
        value: BigUint,
    },
    /// Drives an external input.
    Poke {
        /// Kind of port driven.
        port: PortKind,
        /// Port index within its kind.
        signal: usize,
        /// Driven value.
        value: BigUint,
    },
    /// Advances the reference model.
    Step {
        /// Number of cycles.
        cycles: u64,
    },
    /// Checks that an external output holds a value.
    Expect {
        /// Kind of port checked.
        port: PortKind,
        /// Port index within its kind.
        signal: usize,
        /// Expected value.
        value: BigUint,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Load {
                chain,
                signal,
                value,
                index,
            } => {
                write!(
                    f,
                    "{} {} {signal} {} ",
                    token::LOAD,
                    chain.index(),
                    to_hex(value)
                )?;
                match index {
                    Some(i) => write!(f, "{i}"),
                    None => f.write_str("-1"),
                }
            }
            Instruction::Force {
                chain,
                signal,
                value,
            } => write!(
                f,
                "{} {} {signal} {}",
                token::FORCE,
                chain.index(),
                to_hex(value)
            ),
            Instruction::Poke {
                port,
                signal,
                value,
            } => write!(f, "{} {port} {signal} {}", token::POKE, to_hex(value)),
            Instruction::Step { cycles } => write!(f, "{} {cycles}", token::STEP),
            Instruction::Expect {
                port,
                signal,
                value,
            } => write!(f, "{} {port} {signal} {}", token::EXPECT, to_hex(value)),
        }
    }
}

/// A replay script for one captured window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    /// Cycle at which the window starts.
    pub cycle: u64,
    /// Instructions in replay order.
    pub instructions: Vec<Instruction>,
}

impl Sample {
    /// Creates an empty sample.
    pub fn new(cycle: u64) -> Self {
        Self {
            cycle,
            instructions: Vec::new(),
        }
    }

    /// Builds a sample from a raw bitstring holding every chain type.
    pub fn from_state_bits(
        schema: &Schema,
        bits: &BitString,
        cycle: u64,
    ) -> Result<Self, SnapError> {
        Ok(Self {
            cycle,
            instructions: codec::decode_state_bits(schema, bits)?,
        })
    }

    /// Builds a sample from a raw bitstring holding one chain type.
    pub fn from_chain_bits(
        schema: &Schema,
        chain: ChainType,
        bits: &BitString,
        cycle: u64,
    ) -> Result<Self, SnapError> {
        let (instructions, _) = codec::decode_chain(schema, chain, 0, bits)?;
        Ok(Self {
            cycle,
            instructions,
        })
    }

    /// Counts instructions matching a predicate.
    pub fn count(&self, pred: impl Fn(&Instruction) -> bool) -> usize {
        self.instructions.iter().filter(|i| pred(i)).count()
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", token::CYCLE, self.cycle)?;
        for inst in &self.instructions {
            writeln!(f, "{inst}")?;
        }
        Ok(())
    }
}
