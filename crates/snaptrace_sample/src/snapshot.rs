//! Raw captures and the bounded pool that retains them.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use snaptrace_common::Word;

use crate::error::SnapError;

/// One raw capture: full chain state plus a window of interface trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Cycle at which the chain state was captured.
    pub cycle: u64,
    /// Chain state words in schema order.
    pub state: Vec<Word>,
    /// Interface trace words in capture order.
    pub trace: Vec<Word>,
    /// Number of cycles recorded in `trace`.
    pub trace_size: usize,
}

impl Snapshot {
    /// Creates an empty snapshot with room for `state_size` state words.
    pub fn new(state_size: usize) -> Self {
        Self {
            state: Vec::with_capacity(state_size),
            ..Self::default()
        }
    }

    /// Drops the recorded trace, keeping the allocation.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
        self.trace_size = 0;
    }
}

/// A fixed number of optional snapshot slots.
///
/// At most one slot is active, meaning its trace is still being filled.
#[derive(Debug)]
pub struct SnapshotPool {
    slots: Vec<Option<Snapshot>>,
    active: usize,
}

impl SnapshotPool {
    /// Creates a pool of `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            active: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Index of the active slot.
    pub fn active(&self) -> usize {
        self.active
    }

    /// Marks `slot` as active.
    pub fn set_active(&mut self, slot: usize) {
        self.active = slot;
    }

    /// The snapshot in the active slot, if any.
    pub fn active_mut(&mut self) -> Option<&mut Snapshot> {
        self.slots.get_mut(self.active).and_then(Option::as_mut)
    }

    /// The snapshot in `slot`, if any.
    pub fn get(&self, slot: usize) -> Option<&Snapshot> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Puts `snapshot` into `slot`, returning the one it replaces.
    pub fn replace(&mut self, slot: usize, snapshot: Snapshot) -> Option<Snapshot> {
        self.slots.get_mut(slot)?.replace(snapshot)
    }

    /// Reuses the snapshot in `slot` with its trace cleared, or creates one.
    pub fn recycle(&mut self, slot: usize, state_size: usize) -> Option<&mut Snapshot> {
        let snapshot = self
            .slots
            .get_mut(slot)?
            .get_or_insert_with(|| Snapshot::new(state_size));
        snapshot.clear_trace();
        Some(snapshot)
    }

    /// Empties the pool, returning occupied slots in slot order.
    pub fn drain(&mut self) -> Vec<Snapshot> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

/// Writes snapshots to a JSON archive.
pub fn write_archive(path: &Path, snapshots: &[Snapshot]) -> Result<(), SnapError> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut out, snapshots)
        .map_err(|e| SnapError::Archive(format!("{}: {e}", path.display())))?;
    out.flush()?;
    Ok(())
}

/// Reads snapshots from a JSON archive.
pub fn read_archive(path: &Path) -> Result<Vec<Snapshot>, SnapError> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| SnapError::Archive(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(cycle: u64) -> Snapshot {
        Snapshot {
            cycle,
            state: vec![1, 2],
            trace: vec![3],
            trace_size: 1,
        }
    }

    #[test]
    fn pool_starts_empty() {
        let mut pool = SnapshotPool::new(3);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.occupied(), 0);
        assert!(pool.active_mut().is_none());
    }

    #[test]
    fn replace_returns_previous() {
        let mut pool = SnapshotPool::new(2);
        assert!(pool.replace(1, snap(10)).is_none());
        let old = pool.replace(1, snap(20)).unwrap();
        assert_eq!(old.cycle, 10);
        assert_eq!(pool.get(1).unwrap().cycle, 20);
        assert!(pool.replace(5, snap(0)).is_none());
    }

    #[test]
    fn recycle_clears_trace() {
        let mut pool = SnapshotPool::new(2);
        pool.replace(0, snap(4));
        let s = pool.recycle(0, 2).unwrap();
        assert!(s.trace.is_empty());
        assert_eq!(s.trace_size, 0);
        assert_eq!(s.cycle, 4);

        let fresh = pool.recycle(1, 2).unwrap();
        assert!(fresh.state.is_empty());
        assert_eq!(pool.occupied(), 2);
        assert!(pool.recycle(2, 2).is_none());
    }

    #[test]
    fn active_slot() {
        let mut pool = SnapshotPool::new(2);
        pool.replace(1, snap(7));
        pool.set_active(1);
        assert_eq!(pool.active(), 1);
        pool.active_mut().unwrap().trace.push(9);
        assert_eq!(pool.get(1).unwrap().trace, vec![3, 9]);
    }

    #[test]
    fn drain_in_slot_order() {
        let mut pool = SnapshotPool::new(3);
        pool.replace(2, snap(30));
        pool.replace(0, snap(10));
        let all = pool.drain();
        assert_eq!(all.iter().map(|s| s.cycle).collect::<Vec<_>>(), vec![10, 30]);
        assert_eq!(pool.occupied(), 0);
    }

    #[test]
    fn archive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let snaps = vec![snap(1), snap(2)];
        write_archive(&path, &snaps).unwrap();
        assert_eq!(read_archive(&path).unwrap(), snaps);
    }

    #[test]
    fn corrupt_archive_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_archive(&path).unwrap_err();
        assert!(matches!(err, SnapError::Archive(_)));
    }
}
