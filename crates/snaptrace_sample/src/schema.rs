//! Physical layout of the device's scan chains.
//!
//! A schema file lists, one line per chain entry, the chain type index, the
//! signal name (`null` for padding), the bit width, and the array depth
//! (`-1` for entries that are not arrayed):
//!
//! ```text
//! 0 core.pc 32 -1
//! 0 null 16 -1
//! 2 core.dmem 64 1024
//! ```
//!
//! From it, [`Schema`] derives each chain's length in shift words and how
//! many times the chain is shifted per capture. The schema is loaded once
//! and shared immutably by capture and decoding.

use std::path::Path;

use snaptrace_common::{ChainType, WORD_BITS};

use crate::error::SnapError;

/// Schema token standing for "no signal at this position".
pub const ABSENT_SIGNAL: &str = "null";

/// One entry of a chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainSignal {
    /// Signal name, or `None` for padding bits.
    pub name: Option<String>,
    /// Width in bits.
    pub width: usize,
    /// Array depth for arrayed entries.
    pub depth: Option<usize>,
}

impl ChainSignal {
    /// Returns true if array element `index` of this entry carries state.
    ///
    /// Shallower entries of an arrayed chain are padding on later iterations.
    pub fn holds_element(&self, index: usize) -> bool {
        self.depth.is_some_and(|depth| index < depth)
    }
}

/// Geometry of one chain type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainLayout {
    signals: Vec<ChainSignal>,
    bits: usize,
    word_len: usize,
    iterations: usize,
}

impl ChainLayout {
    /// Entries in shift order.
    pub fn signals(&self) -> &[ChainSignal] {
        &self.signals
    }

    /// Total bits of one iteration.
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Shift words per iteration.
    pub fn word_len(&self) -> usize {
        self.word_len
    }

    /// Number of times the chain is shifted out per capture.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Shift words this chain contributes to a state buffer.
    pub fn state_words(&self) -> usize {
        self.iterations * self.word_len
    }
}

/// The full scan chain schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    shift_width: u32,
    chains: [ChainLayout; ChainType::COUNT],
    offsets: [usize; ChainType::COUNT],
    state_size: usize,
}

impl Schema {
    /// Parses a schema from its textual form.
    pub fn parse(source: &str, shift_width: u32) -> Result<Self, SnapError> {
        if shift_width == 0 || shift_width > WORD_BITS {
            return Err(schema_fault(format!(
                "shift width {shift_width} outside 1..={WORD_BITS}"
            )));
        }

        let mut chains: [ChainLayout; ChainType::COUNT] = Default::default();
        for (idx, line) in source.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (chain, signal) = parse_line(line, idx + 1)?;
            chains[chain.index()].signals.push(signal);
        }

        let mut offsets = [0; ChainType::COUNT];
        let mut state_size: usize = 0;
        for chain in ChainType::ALL {
            let layout = &mut chains[chain.index()];
            layout.bits = layout
                .signals
                .iter()
                .try_fold(0usize, |bits, s| bits.checked_add(s.width))
                .ok_or_else(|| schema_fault(format!("{chain} chain length overflows")))?;
            if layout.bits % shift_width as usize != 0 {
                return Err(SnapError::InvalidChainAlignment {
                    chain,
                    bits: layout.bits,
                    shift_width,
                });
            }
            layout.word_len = layout.bits / shift_width as usize;
            layout.iterations = if chain.is_arrayed() {
                layout
                    .signals
                    .iter()
                    .filter(|s| s.name.is_some())
                    .filter_map(|s| s.depth)
                    .max()
                    .unwrap_or(0)
            } else {
                usize::from(!layout.signals.is_empty())
            };
            offsets[chain.index()] = state_size;
            state_size = layout
                .iterations
                .checked_mul(layout.word_len)
                .and_then(|words| state_size.checked_add(words))
                .ok_or_else(|| schema_fault(format!("{chain} chain state overflows")))?;
        }
        if state_size.checked_mul(shift_width as usize).is_none() {
            return Err(schema_fault(format!("state of {state_size} words overflows")));
        }

        Ok(Self {
            shift_width,
            chains,
            offsets,
            state_size,
        })
    }

    /// Reads and parses a schema file.
    pub fn load(path: &Path, shift_width: u32) -> Result<Self, SnapError> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source, shift_width)
    }

    /// The physical shift width in bits.
    pub fn shift_width(&self) -> u32 {
        self.shift_width
    }

    /// Geometry of one chain type.
    pub fn chain(&self, chain: ChainType) -> &ChainLayout {
        &self.chains[chain.index()]
    }

    /// Shift words in a full state buffer across all chain types.
    pub fn state_size(&self) -> usize {
        self.state_size
    }

    /// Word offset of a chain type's first word within a state buffer.
    pub fn state_offset(&self, chain: ChainType) -> usize {
        self.offsets[chain.index()]
    }
}

fn schema_fault(reason: String) -> SnapError {
    SnapError::MalformedSchema { line: 0, reason }
}

/// Parses one non-empty schema line.
fn parse_line(line: &str, line_no: usize) -> Result<(ChainType, ChainSignal), SnapError> {
    let malformed = |reason: String| SnapError::MalformedSchema {
        line: line_no,
        reason,
    };
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 || tokens.len() > 4 {
        return Err(malformed(format!(
            "expected 4 fields, found {}",
            tokens.len()
        )));
    }

    let chain = tokens[0]
        .parse::<usize>()
        .ok()
        .and_then(ChainType::from_index)
        .ok_or_else(|| malformed(format!("unknown chain type '{}'", tokens[0])))?;
    let name = match tokens[1] {
        ABSENT_SIGNAL => None,
        name => Some(name.to_string()),
    };
    let width = tokens[2]
        .parse::<usize>()
        .map_err(|_| malformed(format!("invalid width '{}'", tokens[2])))?;
    let depth = match tokens.get(3) {
        Some(tok) => tok
            .parse::<i64>()
            .map_err(|_| malformed(format!("invalid depth '{tok}'")))?,
        None if chain.is_arrayed() => {
            return Err(malformed(format!("arrayed chain {chain} entry needs a depth")));
        }
        None => -1,
    };

    Ok((
        chain,
        ChainSignal {
            name,
            width,
            depth: usize::try_from(depth).ok(),
        },
    ))
}
