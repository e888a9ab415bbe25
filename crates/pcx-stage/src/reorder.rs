use std::collections::BTreeMap;

/// Holds completed-but-not-yet-emitted results keyed by sequence number.
///
/// Workers finish in any order; the buffer only releases the item whose
/// sequence equals the running `next` counter. Popping advances the
/// counter, so a run of consecutive completions drains in one pass of
/// repeated `pop_ready` calls.
///
/// ```text
///   next = 3        buffer: {4, 5, 7}
///   insert(3)  →    buffer: {3, 4, 5, 7}
///   pop_ready  →    3, 4, 5, then None   (next = 6, 7 waits for 6)
/// ```
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    pending: BTreeMap<u64, T>,
    next: u64,
}

impl<T> ReorderBuffer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
            next: 0,
        }
    }

    /// Store a completed item.
    ///
    /// Sequences are unique per stage, so a duplicate or an already
    /// emitted sequence indicates a bug in the caller.
    pub fn insert(&mut self, sequence: u64, item: T) {
        debug_assert!(sequence >= self.next, "sequence {sequence} already emitted");
        let previous = self.pending.insert(sequence, item);
        debug_assert!(previous.is_none(), "sequence {sequence} inserted twice");
    }

    /// Take the next in-order item if it has completed.
    pub fn pop_ready(&mut self) -> Option<(u64, T)> {
        let item = self.pending.remove(&self.next)?;
        let sequence = self.next;
        self.next += 1;
        Some((sequence, item))
    }

    /// Sequence number the buffer is waiting for.
    pub fn next_expected(&self) -> u64 {
        self.next
    }

    /// Number of completed items held back waiting for an earlier one.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every buffered item, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }
}

impl<T> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
