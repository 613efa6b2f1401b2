//! Line tokens of the replay script format.

/// Header line naming one chain signal or trace port.
pub const SIGNALS: &str = "SIGNALS";
/// Marks the cycle a sample starts at.
pub const CYCLE: &str = "CYCLE";
/// Sets chain state.
pub const LOAD: &str = "LOAD";
/// Overrides a traced value.
pub const FORCE: &str = "FORCE";
/// Drives an input port.
pub const POKE: &str = "POKE";
/// Advances the reference model.
pub const STEP: &str = "STEP";
/// Checks an output port.
pub const EXPECT: &str = "EXPECT";

/// All instruction tokens, in the order they are introduced to a sample.
pub const INSTRUCTIONS: [&str; 5] = [LOAD, FORCE, POKE, STEP, EXPECT];
