//! Configuration types deserialized from `snaptrace.toml`.

use serde::{Deserialize, Serialize};
use snaptrace_common::{Addr, ChainType};
use std::collections::BTreeMap;

/// The top-level configuration parsed from `snaptrace.toml`.
///
/// Describes how often and how much to sample, where the device exposes its
/// scan chains, and how the external interface trace is laid out in device
/// registers.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapConfig {
    /// Sampling settings (window length, pool size, policy, output).
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Scan chain schema location and control registers.
    pub chains: ChainConfig,
    /// External interface trace registers.
    pub trace: TraceLayout,
}

/// Settings controlling which windows of a run become snapshots.
#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    /// Window length in cycles; also the maximum trace length per snapshot.
    #[serde(default = "default_trace_len")]
    pub trace_len: usize,
    /// Capacity of the snapshot pool.
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    /// Path of the replay script written at the end of a run.
    #[serde(default)]
    pub output: Option<String>,
    /// Whether to time snapshot captures.
    #[serde(default)]
    pub profile: bool,
    /// Which windows to retain.
    #[serde(default)]
    pub policy: SamplingPolicy,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            trace_len: default_trace_len(),
            sample_count: default_sample_count(),
            output: None,
            profile: false,
            policy: SamplingPolicy::default(),
        }
    }
}

fn default_trace_len() -> usize {
    128
}

fn default_sample_count() -> usize {
    30
}

/// The rule deciding which windows are retained.
///
/// The two policies are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SamplingPolicy {
    /// Keep a uniformly random subset of all windows.
    Reservoir {
        /// Seed of the random generator driving replacement.
        #[serde(default)]
        seed: u64,
    },
    /// Keep exactly the window containing one target cycle.
    Deterministic {
        /// The target cycle.
        cycle: u64,
    },
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        SamplingPolicy::Reservoir { seed: 0 }
    }
}

/// Scan chain schema location and per-chain control registers.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Path to the chain schema file.
    pub schema: String,
    /// Physical shift width in bits; every chain is a multiple of it.
    #[serde(default = "default_shift_width")]
    pub shift_width: u32,
    /// Control registers for each chain type that carries state.
    #[serde(default)]
    pub registers: BTreeMap<ChainType, ChainRegisters>,
}

fn default_shift_width() -> u32 {
    32
}

/// The four control registers driving one chain type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ChainRegisters {
    /// Pulsed to latch chain state into the shift register.
    pub copy: Addr,
    /// Pulsed to load the shift register back into the design.
    pub load: Addr,
    /// Written to shift a word into the chain.
    pub shift_in: Addr,
    /// Read to shift a word out of the chain.
    pub shift_out: Addr,
}

/// Register layout of the external interface trace.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraceLayout {
    /// Register receiving the window length at sampling init.
    pub trace_len_addr: Addr,
    /// Plain input wires, in trace order.
    #[serde(default)]
    pub inputs: Vec<WirePort>,
    /// Plain output wires, in trace order.
    #[serde(default)]
    pub outputs: Vec<WirePort>,
    /// Ready/valid channels driven into the design.
    #[serde(default)]
    pub input_channels: Vec<ChannelPort>,
    /// Ready/valid channels driven by the design.
    #[serde(default)]
    pub output_channels: Vec<ChannelPort>,
}

impl TraceLayout {
    /// Number of payload fields across all input channels.
    pub fn input_field_count(&self) -> usize {
        self.input_channels.iter().map(|c| c.fields.len()).sum()
    }

    /// Number of payload fields across all output channels.
    pub fn output_field_count(&self) -> usize {
        self.output_channels.iter().map(|c| c.fields.len()).sum()
    }
}

/// A plain wire traced as one or more consecutive word registers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WirePort {
    /// Signal name.
    pub name: String,
    /// Address of the first word.
    pub addr: Addr,
    /// Number of words, least significant first.
    #[serde(default = "default_chunks")]
    pub chunks: usize,
}

/// A ready/valid channel with a bit-packed payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelPort {
    /// Channel name; handshake signals are named `<name>_valid` and `<name>_ready`.
    pub name: String,
    /// Address of the valid bit register.
    pub valid: Addr,
    /// Address of the ready bit register.
    pub ready: Addr,
    /// Address of the first payload word.
    pub bits: Addr,
    /// Number of payload words, least significant first.
    #[serde(default = "default_chunks")]
    pub bits_chunks: usize,
    /// Payload fields, packed from bit 0 upwards in this order.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl ChannelPort {
    /// Total width of all payload fields.
    pub fn payload_width(&self) -> usize {
        self.fields.iter().map(|f| f.width).sum()
    }
}

/// One field of a channel payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Field width in bits.
    pub width: usize,
}

fn default_chunks() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    const BASE: &str = r#"
[chains]
schema = "design.chain"

[trace]
trace_len_addr = 0x40
"#;

    #[test]
    fn policy_reservoir_with_seed() {
        let toml = format!(
            r#"
[sampling.policy]
kind = "reservoir"
seed = 42
{BASE}"#
        );
        let config = load_config_from_str(&toml).unwrap();
        assert_eq!(
            config.sampling.policy,
            SamplingPolicy::Reservoir { seed: 42 }
        );
    }

    #[test]
    fn policy_deterministic() {
        let toml = format!(
            r#"
[sampling.policy]
kind = "deterministic"
cycle = 12345
{BASE}"#
        );
        let config = load_config_from_str(&toml).unwrap();
        assert_eq!(
            config.sampling.policy,
            SamplingPolicy::Deterministic { cycle: 12345 }
        );
    }

    #[test]
    fn deterministic_requires_cycle() {
        let toml = format!(
            r#"
[sampling.policy]
kind = "deterministic"
{BASE}"#
        );
        assert!(load_config_from_str(&toml).is_err());
    }

    #[test]
    fn registers_keyed_by_chain_name() {
        let toml = format!(
            r#"{BASE}
[chains.registers.regfile]
copy = 1
load = 2
shift_in = 3
shift_out = 4
"#
        );
        let config = load_config_from_str(&toml).unwrap();
        let regs = config.chains.registers[&ChainType::RegFile];
        assert_eq!(regs.copy, 1);
        assert_eq!(regs.shift_out, 4);
    }

    #[test]
    fn channel_defaults_and_widths() {
        let toml = format!(
            r#"{BASE}
[[trace.input_channels]]
name = "req"
valid = 0x10
ready = 0x14
bits = 0x18
fields = [{{ name = "addr", width = 12 }}, {{ name = "data", width = 8 }}]
"#
        );
        let config = load_config_from_str(&toml).unwrap();
        let chan = &config.trace.input_channels[0];
        assert_eq!(chan.bits_chunks, 1);
        assert_eq!(chan.payload_width(), 20);
        assert_eq!(config.trace.input_field_count(), 2);
        assert_eq!(config.trace.output_field_count(), 0);
    }
}
