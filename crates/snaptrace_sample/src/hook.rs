//! Notification seam for register-mapped accessories, such as activity
//! counters, that keep their own per-window state alongside snapshots.

use crate::error::SnapError;
use crate::transport::RegisterTransport;

/// Receives snapshot boundary events from the sampler.
pub trait SnapshotHook {
    /// A window of `trace_count` cycles has ended.
    ///
    /// Called at every reservoir window boundary, whether or not the window
    /// is retained, and once more when sampling finishes.
    fn sample(
        &mut self,
        io: &mut dyn RegisterTransport,
        trace_count: usize,
    ) -> Result<(), SnapError>;

    /// A snapshot was cached into pool slot `slot`, under either policy.
    fn cache(&mut self, io: &mut dyn RegisterTransport, slot: usize) -> Result<(), SnapError>;
}

/// The hook used when no accessory is present.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHook;

impl SnapshotHook for NoHook {
    fn sample(
        &mut self,
        _io: &mut dyn RegisterTransport,
        _trace_count: usize,
    ) -> Result<(), SnapError> {
        Ok(())
    }

    fn cache(&mut self, _io: &mut dyn RegisterTransport, _slot: usize) -> Result<(), SnapError> {
        Ok(())
    }
}
