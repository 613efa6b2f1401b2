//! Conversion between shifted-out chain bits and typed chain instructions.
//!
//! A chain iteration is a run of signal fields, each most significant bit
//! first, in schema order. Padding entries occupy their width but carry no
//! value. Every iteration ends on a shift word boundary.

use num_bigint::BigUint;
use snaptrace_common::{BitString, ChainType, Word};

use crate::error::SnapError;
use crate::sample::Instruction;
use crate::schema::Schema;

/// Decodes one iteration of `chain` starting at bit `cursor`.
///
/// Returns the emitted instructions and the cursor after the iteration.
/// Register chain signals become `Load`s without an array index, trace
/// chain signals become `Force`s, and arrayed chain signals become indexed
/// `Load`s only while `iteration` is below the signal's depth.
pub fn decode_one_iteration(
    schema: &Schema,
    chain: ChainType,
    iteration: usize,
    cursor: usize,
    bits: &BitString,
) -> Result<(Vec<Instruction>, usize), SnapError> {
    let mut out = Vec::new();
    let mut cursor = cursor;
    for (signal_id, signal) in schema.chain(chain).signals().iter().enumerate() {
        let end = cursor + signal.width;
        if end > bits.len() {
            return Err(SnapError::StateUnderrun {
                chain,
                cursor: end,
                len: bits.len(),
            });
        }
        if signal.name.is_some() {
            let value = bits.value_at(cursor, signal.width).ok_or(SnapError::StateUnderrun {
                chain,
                cursor: end,
                len: bits.len(),
            })?;
            match chain {
                ChainType::Regs => out.push(Instruction::Load {
                    chain,
                    signal: signal_id,
                    value,
                    index: None,
                }),
                ChainType::Trace => out.push(Instruction::Force {
                    chain,
                    signal: signal_id,
                    value,
                }),
                ChainType::Mems | ChainType::RegFile | ChainType::Sram => {
                    if signal.holds_element(iteration) {
                        out.push(Instruction::Load {
                            chain,
                            signal: signal_id,
                            value,
                            index: Some(iteration),
                        });
                    }
                }
            }
        }
        cursor = end;
    }

    if cursor % schema.shift_width() as usize != 0 {
        return Err(SnapError::AlignmentFault {
            chain,
            iteration,
            cursor,
        });
    }
    Ok((out, cursor))
}

/// Decodes every iteration of `chain` starting at bit `cursor`.
pub fn decode_chain(
    schema: &Schema,
    chain: ChainType,
    cursor: usize,
    bits: &BitString,
) -> Result<(Vec<Instruction>, usize), SnapError> {
    let mut out = Vec::new();
    let mut cursor = cursor;
    for iteration in 0..schema.chain(chain).iterations() {
        let (insts, next) = decode_one_iteration(schema, chain, iteration, cursor, bits)?;
        out.extend(insts);
        cursor = next;
    }
    Ok((out, cursor))
}

/// Decodes a chain bitstring holding every chain type in order.
pub fn decode_state_bits(schema: &Schema, bits: &BitString) -> Result<Vec<Instruction>, SnapError> {
    let mut out = Vec::new();
    let mut cursor = 0;
    for chain in ChainType::ALL {
        let (insts, next) = decode_chain(schema, chain, cursor, bits)?;
        out.extend(insts);
        cursor = next;
    }
    Ok(out)
}

/// Decodes a captured state buffer into `Load` and `Force` instructions.
///
/// Each word contributes its low shift-width bits, most significant first.
pub fn decode_full_state(schema: &Schema, state: &[Word]) -> Result<Vec<Instruction>, SnapError> {
    if state.len() != schema.state_size() {
        return Err(SnapError::StateSizeMismatch {
            expected: schema.state_size(),
            actual: state.len(),
        });
    }
    let bits = BitString::from_words(state, schema.shift_width());
    decode_state_bits(schema, &bits)
}

/// Re-encodes chain instructions into a state buffer.
///
/// Padding, array elements past a signal's depth, and signals without an
/// instruction are zero. Instructions other than `Load` and `Force` are
/// ignored.
pub fn encode_full_state(schema: &Schema, instructions: &[Instruction]) -> Vec<Word> {
    let mut bits = BitString::with_capacity(schema.state_size() * schema.shift_width() as usize);
    for chain in ChainType::ALL {
        let layout = schema.chain(chain);
        for iteration in 0..layout.iterations() {
            for (signal_id, signal) in layout.signals().iter().enumerate() {
                match find_chain_value(instructions, chain, signal_id, iteration) {
                    Some(value) => bits.push_value(value, signal.width),
                    None => bits.push_zeros(signal.width),
                }
            }
        }
    }
    // every chain is a whole number of shift words
    bits.to_words(schema.shift_width()).unwrap_or_default()
}

fn find_chain_value(
    instructions: &[Instruction],
    chain: ChainType,
    signal_id: usize,
    iteration: usize,
) -> Option<&BigUint> {
    instructions.iter().find_map(|inst| match inst {
        Instruction::Load {
            chain: c,
            signal,
            value,
            index,
        } if *c == chain && *signal == signal_id => match index {
            Some(i) if *i != iteration => None,
            _ => Some(value),
        },
        Instruction::Force {
            chain: c,
            signal,
            value,
        } if *c == chain && *signal == signal_id => Some(value),
        _ => None,
    })
}
