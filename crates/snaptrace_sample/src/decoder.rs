//! Snapshot to sample decoding.
//!
//! The chain state becomes `Load`/`Force` instructions. The trace is then
//! replayed cycle by cycle: inputs are poked, the model is stepped, and the
//! outputs observed on the device are expected. The words of each cycle are
//! consumed in the order [`CaptureEngine::read_traces`] stored them.
//!
//! [`CaptureEngine::read_traces`]: crate::capture::CaptureEngine::read_traces

use num_bigint::BigUint;
use snaptrace_common::bits::{extract_field, from_words_le};
use snaptrace_common::{PortKind, Word};
use snaptrace_config::{ChannelPort, TraceLayout};

use crate::codec;
use crate::error::SnapError;
use crate::sample::{Instruction, Sample};
use crate::schema::Schema;
use crate::snapshot::Snapshot;

/// Decodes a snapshot into a replay sample.
pub fn decode(
    schema: &Schema,
    layout: &TraceLayout,
    snapshot: &Snapshot,
) -> Result<Sample, SnapError> {
    let mut sample = Sample::new(snapshot.cycle);
    sample.instructions = codec::decode_full_state(schema, &snapshot.state)?;
    decode_trace(layout, snapshot, &mut sample.instructions)?;
    Ok(sample)
}

struct TraceCursor<'a> {
    words: &'a [Word],
    pos: usize,
    cycle: u64,
}

impl<'a> TraceCursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [Word], SnapError> {
        let end = self.pos + n;
        let words = self.words.get(self.pos..end).ok_or(SnapError::TruncatedTrace {
            cycle: self.cycle,
            consumed: self.pos,
        })?;
        self.pos = end;
        Ok(words)
    }

    fn next_bit(&mut self) -> Result<Word, SnapError> {
        Ok(self.take(1)?[0])
    }
}

fn decode_trace(
    layout: &TraceLayout,
    snapshot: &Snapshot,
    out: &mut Vec<Instruction>,
) -> Result<(), SnapError> {
    let mut cursor = TraceCursor {
        words: &snapshot.trace,
        pos: 0,
        cycle: snapshot.cycle,
    };

    for i in 0..snapshot.trace_size {
        for (signal, wire) in layout.inputs.iter().enumerate() {
            let value = from_words_le(cursor.take(wire.chunks)?);
            out.push(Instruction::Poke {
                port: PortKind::InputWire,
                signal,
                value,
            });
        }
        let mut field = 0;
        for (signal, ch) in layout.input_channels.iter().enumerate() {
            let valid = cursor.next_bit()?;
            out.push(Instruction::Poke {
                port: PortKind::InputValid,
                signal,
                value: BigUint::from(valid),
            });
            field = decode_payload(&mut cursor, ch, field, out, |signal, value| Instruction::Poke {
                port: PortKind::InputBits,
                signal,
                value,
            })?;
        }
        for (signal, _) in layout.output_channels.iter().enumerate() {
            let ready = cursor.next_bit()?;
            out.push(Instruction::Poke {
                port: PortKind::OutputReady,
                signal,
                value: BigUint::from(ready),
            });
        }

        out.push(Instruction::Step { cycles: 1 });

        // the first cycle of a window has no earlier output to check
        if i > 0 {
            for (signal, wire) in layout.outputs.iter().enumerate() {
                let value = from_words_le(cursor.take(wire.chunks)?);
                out.push(Instruction::Expect {
                    port: PortKind::OutputWire,
                    signal,
                    value,
                });
            }
        }
        let mut field = 0;
        for (signal, ch) in layout.output_channels.iter().enumerate() {
            let valid = cursor.next_bit()?;
            out.push(Instruction::Expect {
                port: PortKind::OutputValid,
                signal,
                value: BigUint::from(valid),
            });
            field = if valid != 0 {
                decode_payload(&mut cursor, ch, field, out, |signal, value| Instruction::Expect {
                    port: PortKind::OutputBits,
                    signal,
                    value,
                })?
            } else {
                field + ch.fields.len()
            };
        }
        for (signal, _) in layout.input_channels.iter().enumerate() {
            let ready = cursor.next_bit()?;
            out.push(Instruction::Expect {
                port: PortKind::InputReady,
                signal,
                value: BigUint::from(ready),
            });
        }
    }
    Ok(())
}

/// Splits one channel payload into its fields, starting at bit 0.
///
/// Field ids run across all channels of a direction; returns the id after
/// this channel's last field.
fn decode_payload(
    cursor: &mut TraceCursor<'_>,
    ch: &ChannelPort,
    first_field: usize,
    out: &mut Vec<Instruction>,
    make: impl Fn(usize, BigUint) -> Instruction,
) -> Result<usize, SnapError> {
    let payload = from_words_le(cursor.take(ch.bits_chunks)?);
    let mut offset = 0;
    for (k, field) in ch.fields.iter().enumerate() {
        out.push(make(first_field + k, extract_field(&payload, offset, field.width)));
        offset += field.width;
    }
    Ok(first_field + ch.fields.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use snaptrace_common::ChainType;
    use snaptrace_config::{FieldSpec, WirePort};

    fn schema() -> Schema {
        Schema::parse("0 r 8 -1\n", 8).unwrap()
    }

    fn wire(name: &str, addr: u64, chunks: usize) -> WirePort {
        WirePort {
            name: name.into(),
            addr,
            chunks,
        }
    }

    fn channel(name: &str, chunks: usize, widths: &[usize]) -> ChannelPort {
        ChannelPort {
            name: name.into(),
            valid: 0,
            ready: 0,
            bits: 0,
            bits_chunks: chunks,
            fields: widths
                .iter()
                .enumerate()
                .map(|(i, &width)| FieldSpec {
                    name: format!("{name}_f{i}"),
                    width,
                })
                .collect(),
        }
    }

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    fn snapshot(trace: Vec<Word>, trace_size: usize) -> Snapshot {
        Snapshot {
            cycle: 100,
            state: vec![0x5a],
            trace,
            trace_size,
        }
    }

    #[test]
    fn state_precedes_trace() {
        let layout = TraceLayout {
            inputs: vec![wire("in", 0, 1)],
            ..TraceLayout::default()
        };
        let sample = decode(&schema(), &layout, &snapshot(vec![7], 1)).unwrap();
        assert_eq!(sample.cycle, 100);
        assert_eq!(
            sample.instructions,
            vec![
                Instruction::Load {
                    chain: ChainType::Regs,
                    signal: 0,
                    value: big(0x5a),
                    index: None
                },
                Instruction::Poke {
                    port: PortKind::InputWire,
                    signal: 0,
                    value: big(7)
                },
                Instruction::Step { cycles: 1 },
            ]
        );
    }

    #[test]
    fn multi_word_values_least_significant_first() {
        let layout = TraceLayout {
            inputs: vec![wire("wide", 0, 2)],
            ..TraceLayout::default()
        };
        let sample = decode(&schema(), &layout, &snapshot(vec![0x1, 0x2], 1)).unwrap();
        assert_eq!(
            sample.instructions[1],
            Instruction::Poke {
                port: PortKind::InputWire,
                signal: 0,
                value: big(0x2_0000_0001)
            }
        );
    }

    #[test]
    fn output_wires_skipped_on_first_cycle() {
        let layout = TraceLayout {
            outputs: vec![wire("out", 0, 1)],
            ..TraceLayout::default()
        };
        // cycle 0 stores nothing, cycles 1 and 2 one word each
        let sample = decode(&schema(), &layout, &snapshot(vec![0xa, 0xb], 3)).unwrap();
        let expects: Vec<_> = sample
            .instructions
            .iter()
            .filter(|i| matches!(i, Instruction::Expect { .. }))
            .cloned()
            .collect();
        assert_eq!(
            expects,
            vec![
                Instruction::Expect {
                    port: PortKind::OutputWire,
                    signal: 0,
                    value: big(0xa)
                },
                Instruction::Expect {
                    port: PortKind::OutputWire,
                    signal: 0,
                    value: big(0xb)
                },
            ]
        );
        assert_eq!(sample.count(|i| matches!(i, Instruction::Step { .. })), 3);
    }

    #[test]
    fn input_payload_split_into_fields() {
        let layout = TraceLayout {
            input_channels: vec![channel("req", 1, &[4, 12])],
            ..TraceLayout::default()
        };
        // valid, payload 0xabc5, ready
        let sample = decode(&schema(), &layout, &snapshot(vec![1, 0xabc5, 1], 1)).unwrap();
        assert_eq!(
            &sample.instructions[1..],
            &[
                Instruction::Poke {
                    port: PortKind::InputValid,
                    signal: 0,
                    value: big(1)
                },
                Instruction::Poke {
                    port: PortKind::InputBits,
                    signal: 0,
                    value: big(0x5)
                },
                Instruction::Poke {
                    port: PortKind::InputBits,
                    signal: 1,
                    value: big(0xabc)
                },
                Instruction::Step { cycles: 1 },
                Instruction::Expect {
                    port: PortKind::InputReady,
                    signal: 0,
                    value: big(1)
                },
            ]
        );
    }

    #[test]
    fn output_payload_gated_by_valid() {
        let layout = TraceLayout {
            output_channels: vec![channel("a", 1, &[8]), channel("b", 1, &[8, 8])],
            ..TraceLayout::default()
        };
        // ready a, ready b, valid a = 0, valid b = 1, payload b
        let sample = decode(&schema(), &layout, &snapshot(vec![1, 1, 0, 1, 0x2211], 1)).unwrap();
        let bits: Vec<_> = sample
            .instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Expect {
                    port: PortKind::OutputBits,
                    signal,
                    value,
                } => Some((*signal, value.clone())),
                _ => None,
            })
            .collect();
        // field ids keep counting past the silent channel
        assert_eq!(bits, vec![(1, big(0x11)), (2, big(0x22))]);
        assert_eq!(
            sample.count(|i| matches!(
                i,
                Instruction::Expect {
                    port: PortKind::OutputValid,
                    ..
                }
            )),
            2
        );
    }

    #[test]
    fn valid_payload_emits_field_expects() {
        let layout = TraceLayout {
            output_channels: vec![channel("resp", 1, &[8])],
            ..TraceLayout::default()
        };
        let off = decode(&schema(), &layout, &snapshot(vec![1, 0], 1)).unwrap();
        let on = decode(&schema(), &layout, &snapshot(vec![1, 1, 0x42], 1)).unwrap();
        let payload = |s: &Sample| {
            s.count(|i| matches!(
                i,
                Instruction::Expect {
                    port: PortKind::OutputBits,
                    ..
                }
            ))
        };
        assert_eq!(payload(&off), 0);
        assert_eq!(payload(&on), 1);
    }

    #[test]
    fn truncated_trace_reports_position() {
        let layout = TraceLayout {
            inputs: vec![wire("in", 0, 2)],
            ..TraceLayout::default()
        };
        let err = decode(&schema(), &layout, &snapshot(vec![1, 2, 3], 2)).unwrap_err();
        assert!(matches!(
            err,
            SnapError::TruncatedTrace {
                cycle: 100,
                consumed: 2
            }
        ));
    }

    #[test]
    fn bad_state_size_fails_before_trace() {
        let mut snap = snapshot(vec![], 0);
        snap.state.push(1);
        let err = decode(&schema(), &TraceLayout::default(), &snap).unwrap_err();
        assert!(matches!(err, SnapError::StateSizeMismatch { .. }));
    }
}
