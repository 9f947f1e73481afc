//! Mutex-serialized register store, the crate's only shared mutable state.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::table::RegisterTable;

/// Outcome of a compare-and-set write.
///
/// `Conflict` is an expected, recoverable result, not an error: the caller
/// lost a race and must re-read before retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Current bytes matched the snapshot; the new data is in place.
    Applied,
    /// Another writer got there first; the store is unchanged.
    Conflict,
}

/// Shared register store.
///
/// One mutex guards the whole table; every operation is a single short
/// lock acquisition over a fixed-size copy, which makes `get`/`set`/
/// `compare_and_set` linearizable per store. Spans are clamped to the table
/// bound rather than rejected; see [`crate::layout`] for the region map.
///
/// Created once at process start by the node root and shared by `Arc`;
/// callers never retain interior pointers across calls.
pub struct RegisterStore {
    table: Mutex<RegisterTable>,
}

impl RegisterStore {
    /// A zero-initialized store.
    pub fn new() -> Self {
        Self {
            table: Mutex::new(RegisterTable::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegisterTable> {
        // A poisoned byte table holds no broken invariant; keep serving.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies up to `out.len()` bytes starting at `index` under the lock;
    /// returns the count actually copied after clamping.
    pub fn get(&self, index: usize, out: &mut [u8]) -> usize {
        self.lock().read_at(index, out)
    }

    /// Copies `data` into the table at `index` under the lock; returns the
    /// count actually copied after clamping.
    pub fn set(&self, index: usize, data: &[u8]) -> usize {
        self.lock().write_at(index, data)
    }

    /// Writes `new` at `index` only if the current bytes equal `expected`,
    /// all under a single lock acquisition.
    ///
    /// This is the sole conflict-detection mechanism between concurrent
    /// writers: a `Conflict` caller must take a fresh snapshot and retry.
    pub fn compare_and_set(&self, index: usize, new: &[u8], expected: &[u8]) -> WriteOutcome {
        self.lock().compare_swap(index, new, expected)
    }
}

impl Default for RegisterStore {
    fn default() -> Self {
        Self::new()
    }
}
