//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{ChannelPort, SnapConfig, WirePort};
use snaptrace_common::WORD_BITS;
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "snaptrace.toml";

/// Loads and validates a `snaptrace.toml` configuration from a file.
pub fn load_config(path: &Path) -> Result<SnapConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `snaptrace.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<SnapConfig, ConfigError> {
    let config: SnapConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
fn validate_config(config: &SnapConfig) -> Result<(), ConfigError> {
    if config.chains.schema.is_empty() {
        return Err(ConfigError::MissingField("chains.schema".to_string()));
    }
    if config.sampling.trace_len <= 2 {
        return Err(ConfigError::ValidationError(format!(
            "sampling.trace_len must be greater than 2, got {}",
            config.sampling.trace_len
        )));
    }
    if config.sampling.sample_count == 0 {
        return Err(ConfigError::ValidationError(
            "sampling.sample_count must be at least 1".to_string(),
        ));
    }
    let width = config.chains.shift_width;
    if width == 0 || width > WORD_BITS {
        return Err(ConfigError::ValidationError(format!(
            "chains.shift_width must be between 1 and {WORD_BITS}, got {width}"
        )));
    }
    let trace = &config.trace;
    for wire in trace.inputs.iter().chain(&trace.outputs) {
        validate_wire(wire)?;
    }
    for chan in trace.input_channels.iter().chain(&trace.output_channels) {
        validate_channel(chan)?;
    }
    Ok(())
}

fn validate_wire(wire: &WirePort) -> Result<(), ConfigError> {
    if wire.name.is_empty() {
        return Err(ConfigError::MissingField("trace wire name".to_string()));
    }
    if wire.chunks == 0 {
        return Err(ConfigError::ValidationError(format!(
            "wire '{}' must span at least one word",
            wire.name
        )));
    }
    Ok(())
}

fn validate_channel(chan: &ChannelPort) -> Result<(), ConfigError> {
    if chan.name.is_empty() {
        return Err(ConfigError::MissingField("trace channel name".to_string()));
    }
    if chan.bits_chunks == 0 {
        return Err(ConfigError::ValidationError(format!(
            "channel '{}' must span at least one payload word",
            chan.name
        )));
    }
    let capacity = chan.bits_chunks * WORD_BITS as usize;
    if chan.payload_width() > capacity {
        return Err(ConfigError::ValidationError(format!(
            "channel '{}' fields need {} bits but {} payload words hold {capacity}",
            chan.name,
            chan.payload_width(),
            chan.bits_chunks
        )));
    }
    if let Some(field) = chan.fields.iter().find(|f| f.name.is_empty()) {
        return Err(ConfigError::MissingField(format!(
            "field name in channel '{}' (width {})",
            chan.name, field.width
        )));
    }
    Ok(())
}
