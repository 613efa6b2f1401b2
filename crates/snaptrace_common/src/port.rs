//! Trace port kinds used by `POKE` and `EXPECT` instructions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chain::ChainType;

/// The kind of external interface signal a trace word belongs to.
///
/// Port kinds share the numeric space of replay scripts with [`ChainType`]:
/// codes start right after the last chain index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    /// A plain input wire.
    InputWire,
    /// A plain output wire.
    OutputWire,
    /// The valid bit of an input ready/valid channel.
    InputValid,
    /// The ready bit of an input ready/valid channel.
    InputReady,
    /// A payload field of an input ready/valid channel.
    InputBits,
    /// The valid bit of an output ready/valid channel.
    OutputValid,
    /// The ready bit of an output ready/valid channel.
    OutputReady,
    /// A payload field of an output ready/valid channel.
    OutputBits,
}

impl PortKind {
    /// All port kinds, in code order.
    pub const ALL: [PortKind; 8] = [
        PortKind::InputWire,
        PortKind::OutputWire,
        PortKind::InputValid,
        PortKind::InputReady,
        PortKind::InputBits,
        PortKind::OutputValid,
        PortKind::OutputReady,
        PortKind::OutputBits,
    ];

    /// Returns the numeric code written to replay scripts.
    pub fn code(self) -> usize {
        let offset = match self {
            PortKind::InputWire => 0,
            PortKind::OutputWire => 1,
            PortKind::InputValid => 2,
            PortKind::InputReady => 3,
            PortKind::InputBits => 4,
            PortKind::OutputValid => 5,
            PortKind::OutputReady => 6,
            PortKind::OutputBits => 7,
        };
        ChainType::COUNT + offset
    }

    /// Returns the port kind with the given replay-script code.
    pub fn from_code(code: usize) -> Option<Self> {
        code.checked_sub(ChainType::COUNT)
            .and_then(|offset| Self::ALL.get(offset).copied())
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
