use crate::layout::REG_NUM;
use crate::store::WriteOutcome;

/// Fixed-size register table with clamped range access.
///
/// Spans overrunning the table bound are silently truncated and a fully
/// out-of-range span copies nothing; callers never read or write out of
/// bounds. Locking lives in [`RegisterStore`](crate::store::RegisterStore).
pub(crate) struct RegisterTable {
    bytes: [u8; REG_NUM],
}

impl RegisterTable {
    pub(crate) fn new() -> Self {
        Self {
            bytes: [0; REG_NUM],
        }
    }

    /// Clamped copy length for a span starting at `index`.
    fn span(index: usize, len: usize) -> usize {
        REG_NUM.saturating_sub(index).min(len)
    }

    /// Copies up to `out.len()` bytes starting at `index`; returns the
    /// count actually copied.
    pub(crate) fn read_at(&self, index: usize, out: &mut [u8]) -> usize {
        let n = Self::span(index, out.len());
        if n == 0 {
            return 0;
        }
        out[..n].copy_from_slice(&self.bytes[index..index + n]);
        n
    }

    /// Copies up to `data.len()` bytes into the table at `index`; returns
    /// the count actually copied.
    pub(crate) fn write_at(&mut self, index: usize, data: &[u8]) -> usize {
        let n = Self::span(index, data.len());
        if n == 0 {
            return 0;
        }
        self.bytes[index..index + n].copy_from_slice(&data[..n]);
        n
    }

    /// Writes `new` at `index` only if the current bytes there equal
    /// `expected`. The comparison and the write happen on the same clamped
    /// span.
    pub(crate) fn compare_swap(
        &mut self,
        index: usize,
        new: &[u8],
        expected: &[u8],
    ) -> WriteOutcome {
        let n = Self::span(index, new.len().min(expected.len()));
        if n == 0 {
            // Nothing to compare, nothing to write.
            return WriteOutcome::Applied;
        }
        if self.bytes[index..index + n] != expected[..n] {
            return WriteOutcome::Conflict;
        }
        self.bytes[index..index + n].copy_from_slice(&new[..n]);
        WriteOutcome::Applied
    }
}
