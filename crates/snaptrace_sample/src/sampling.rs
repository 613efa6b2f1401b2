//! Window selection: which stretches of a run become retained snapshots.
//!
//! The run loop reports elapsed cycles through [`Sampler::step`]. Under the
//! reservoir policy, every `trace_len` boundary opens a window that is kept
//! with probability `capacity / (record_id + 1)`, so every window seen so far
//! is equally likely to be in the pool. Under the deterministic policy,
//! exactly the window reaching past the target cycle is captured, once.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use snaptrace_config::{SamplingConfig, SamplingPolicy};
use tracing::{debug, info};

use crate::capture::CaptureEngine;
use crate::error::SnapError;
use crate::hook::{NoHook, SnapshotHook};
use crate::snapshot::{Snapshot, SnapshotPool};
use crate::transport::RegisterTransport;

/// Counters collected over a sampling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingStats {
    /// Snapshots taken, including ones later replaced.
    pub snapshot_count: u64,
    /// Window boundaries evaluated.
    pub windows_seen: u64,
    /// Time spent capturing, when profiling.
    pub capture_time: Duration,
}

/// Picks the pool slot for window `record_id`, or `None` to drop it.
///
/// The first `capacity` windows fill the pool in order. Later windows draw a
/// uniform index in `0..=record_id` and are kept when it names a slot.
pub fn reservoir_slot<R: Rng + ?Sized>(
    record_id: u64,
    capacity: usize,
    rng: &mut R,
) -> Option<usize> {
    let capacity = capacity as u64;
    let slot = if record_id < capacity {
        record_id
    } else {
        rng.gen_range(0..=record_id)
    };
    (slot < capacity).then_some(slot as usize)
}

/// Drives the sampling policy over a live device.
pub struct Sampler<H = NoHook> {
    engine: CaptureEngine,
    pool: SnapshotPool,
    policy: SamplingPolicy,
    trace_len: usize,
    profile: bool,
    hook: H,
    rng: StdRng,
    cycle: u64,
    trace_count: usize,
    fired: bool,
    started: Option<Instant>,
    stats: SamplingStats,
}

impl Sampler<NoHook> {
    /// Creates a sampler without an accessory hook.
    pub fn new(engine: CaptureEngine, config: &SamplingConfig) -> Self {
        Self::with_hook(engine, config, NoHook)
    }
}

impl<H: SnapshotHook> Sampler<H> {
    /// Creates a sampler notifying `hook` at snapshot boundaries.
    pub fn with_hook(engine: CaptureEngine, config: &SamplingConfig, hook: H) -> Self {
        let seed = match config.policy {
            SamplingPolicy::Reservoir { seed } => seed,
            SamplingPolicy::Deterministic { .. } => 0,
        };
        Self {
            engine,
            // zero is rejected by config validation
            pool: SnapshotPool::new(config.sample_count.max(1)),
            policy: config.policy,
            // zero is rejected by config validation
            trace_len: config.trace_len.max(1),
            profile: config.profile,
            hook,
            rng: StdRng::seed_from_u64(seed),
            cycle: 0,
            trace_count: 0,
            fired: false,
            started: None,
            stats: SamplingStats::default(),
        }
    }

    /// The capture engine.
    pub fn engine(&self) -> &CaptureEngine {
        &self.engine
    }

    /// The snapshot pool.
    pub fn pool(&self) -> &SnapshotPool {
        &self.pool
    }

    /// The accessory hook.
    pub fn hook(&self) -> &H {
        &self.hook
    }

    /// Cycles elapsed so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Cycles of trace buffered for the active snapshot.
    pub fn trace_count(&self) -> usize {
        self.trace_count
    }

    /// Run counters.
    pub fn stats(&self) -> SamplingStats {
        self.stats
    }

    /// Programs the device for sampling. Call once after reset.
    pub fn init(&mut self, io: &mut dyn RegisterTransport) -> Result<(), SnapError> {
        self.engine.init_device(io, self.trace_len)?;
        if self.profile {
            self.started = Some(Instant::now());
        }
        info!(
            trace_len = self.trace_len,
            capacity = self.pool.capacity(),
            "sampling started"
        );
        Ok(())
    }

    /// Accounts for up to `n` cycles the run loop is about to advance.
    ///
    /// A batch never crosses a window boundary: the returned count is how
    /// many cycles the run loop may advance before calling `step` again, so
    /// every boundary is evaluated with the device stopped on it.
    ///
    /// ```ignore
    /// let mut left = n;
    /// while left > 0 {
    ///     let k = sampler.step(&mut device, left)?;
    ///     device.step(k);
    ///     left -= k;
    /// }
    /// ```
    pub fn step(&mut self, io: &mut dyn RegisterTransport, n: usize) -> Result<usize, SnapError> {
        let n = n.min(self.cycles_to_boundary());
        if n == 0 {
            return Ok(0);
        }
        match self.policy {
            SamplingPolicy::Reservoir { .. } => self.reservoir_step(io, n)?,
            SamplingPolicy::Deterministic { cycle } => self.deterministic_step(io, n, cycle)?,
        }
        self.cycle += n as u64;
        Ok(n)
    }

    /// Cycles from the current cycle up to the next window boundary.
    pub fn cycles_to_boundary(&self) -> usize {
        let window = self.trace_len as u64;
        // at most trace_len
        (window - self.cycle % window) as usize
    }

    /// Captures the tail window and hands back retained snapshots in slot order.
    pub fn finish(&mut self, io: &mut dyn RegisterTransport) -> Result<Vec<Snapshot>, SnapError> {
        self.save_snapshot(io)?;
        self.hook.sample(io, self.trace_count)?;
        info!(snapshot_count = self.stats.snapshot_count, "sampling finished");
        if let Some(started) = self.started {
            info!(
                "simulation time: {:.3} s, snapshot time: {:.3} s",
                started.elapsed().as_secs_f64(),
                self.stats.capture_time.as_secs_f64()
            );
        }
        Ok(self.pool.drain())
    }

    fn reservoir_step(
        &mut self,
        io: &mut dyn RegisterTransport,
        n: usize,
    ) -> Result<(), SnapError> {
        let window = self.trace_len as u64;
        if self.cycle % window == 0 {
            let record_id = self.cycle / window;
            self.stats.windows_seen += 1;
            let slot = reservoir_slot(record_id, self.pool.capacity(), &mut self.rng);
            self.hook.sample(io, self.trace_count)?;
            match slot {
                Some(slot) => {
                    let start = Instant::now();
                    self.save_snapshot(io)?;
                    self.pool.set_active(slot);
                    let state_size = self.engine.schema().state_size();
                    if let Some(snapshot) = self.pool.recycle(slot, state_size) {
                        self.engine.read_snapshot(io, self.cycle, snapshot)?;
                    }
                    self.stats.snapshot_count += 1;
                    self.trace_count = 0;
                    self.hook.cache(io, slot)?;
                    if self.profile {
                        self.stats.capture_time += start.elapsed();
                    }
                    debug!(cycle = self.cycle, record_id, slot, "window retained");
                }
                None => {
                    self.trace_count = 0;
                    debug!(cycle = self.cycle, record_id, "window dropped");
                }
            }
        }
        self.add_trace(n);
        Ok(())
    }

    fn deterministic_step(
        &mut self,
        io: &mut dyn RegisterTransport,
        n: usize,
        target: u64,
    ) -> Result<(), SnapError> {
        let end = self.cycle + n as u64;
        if !self.fired && end > target && end - target <= self.trace_len as u64 {
            self.fired = true;
            info!(cycle = self.cycle, "snapshot at target window");
            let start = Instant::now();
            // flush history recorded before the target window
            self.trace_count = end.min(self.trace_len as u64) as usize;
            self.engine.read_traces(io, self.trace_count, None)?;
            self.trace_count = 0;

            self.pool.set_active(0);
            let mut snapshot = Snapshot::new(self.engine.schema().state_size());
            self.engine.read_snapshot(io, self.cycle, &mut snapshot)?;
            self.pool.replace(0, snapshot);
            self.hook.cache(io, 0)?;
            self.stats.snapshot_count += 1;
            self.stats.windows_seen += 1;
            if self.profile {
                self.stats.capture_time += start.elapsed();
            }
        }
        if end > target {
            self.add_trace(n);
        }
        Ok(())
    }

    fn add_trace(&mut self, n: usize) {
        self.trace_count = self.trace_count.saturating_add(n).min(self.trace_len);
    }

    /// Drains the buffered trace into the active snapshot, if any.
    fn save_snapshot(&mut self, io: &mut dyn RegisterTransport) -> Result<(), SnapError> {
        let trace_size = self.trace_count.min(self.trace_len);
        if let Some(snapshot) = self.pool.active_mut() {
            self.engine.read_traces(io, trace_size, Some(snapshot))?;
        }
        Ok(())
    }
}
