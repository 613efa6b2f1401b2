//! Shared foundational types used across the snaptrace sampling harness.
//!
//! This crate provides the device word and address types, the closed set of
//! scan-chain kinds, the trace port kinds, the replay script tokens, and
//! arbitrary-precision bit helpers used to turn shifted-out chain bits into
//! signal values.

#![warn(missing_docs)]

pub mod bits;
pub mod chain;
pub mod port;
pub mod token;

pub use bits::BitString;
pub use chain::{ChainType, ParseChainTypeError};
pub use port::PortKind;

/// A device data word, as moved by a single register read or write.
pub type Word = u32;

/// Number of bits in a [`Word`].
pub const WORD_BITS: u32 = Word::BITS;

/// A device register address.
pub type Addr = u64;
