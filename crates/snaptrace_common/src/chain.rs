//! Scan chain kinds exposed by the device.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of scan chain a signal lives on.
///
/// The discriminant is the chain's index in schema files and replay scripts.
/// One-shot chains are captured once per snapshot; arrayed chains repeat
/// their entry list once per array element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    /// Plain registers.
    Regs = 0,
    /// The dedicated I/O trace chain.
    Trace = 1,
    /// Plain memories.
    Mems = 2,
    /// Register files.
    #[serde(rename = "regfile")]
    RegFile = 3,
    /// SRAM-backed structures.
    Sram = 4,
}

impl ChainType {
    /// Number of chain kinds.
    pub const COUNT: usize = 5;

    /// All chain kinds, in schema order.
    pub const ALL: [ChainType; Self::COUNT] = [
        ChainType::Regs,
        ChainType::Trace,
        ChainType::Mems,
        ChainType::RegFile,
        ChainType::Sram,
    ];

    /// Returns the chain kind with the given schema index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Returns the schema index of this chain kind.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns true if entries on this chain repeat across an array depth.
    pub fn is_arrayed(self) -> bool {
        matches!(self, ChainType::Mems | ChainType::RegFile | ChainType::Sram)
    }

    /// Returns the lowercase name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            ChainType::Regs => "regs",
            ChainType::Trace => "trace",
            ChainType::Mems => "mems",
            ChainType::RegFile => "regfile",
            ChainType::Sram => "sram",
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error type for parsing chain kind names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseChainTypeError {
    /// The input string that failed to parse.
    pub input: String,
}

impl fmt::Display for ParseChainTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown chain type: '{}'", self.input)
    }
}

impl std::error::Error for ParseChainTypeError {}

impl FromStr for ChainType {
    type Err = ParseChainTypeError;

    /// Accepts either a chain name (`"regs"`, `"sram"`, ...) or its index.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseChainTypeError {
            input: s.to_string(),
        };
        if let Ok(index) = s.parse::<usize>() {
            return Self::from_index(index).ok_or_else(err);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(err)
    }
}
