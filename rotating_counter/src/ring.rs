//! The non-async interior of a counter.
//!
//! [`Ring`] knows nothing of clocks or channels. It holds the bucket sums and
//! the running total and is driven by the worker one operation at a time,
//! which lets us make property claims about it in isolation.

/// A fixed ring of bucket sums with a running total.
///
/// Sums wrap at `u64::MAX`. Because the total and the buckets wrap together
/// the total always equals the wrapping sum of the buckets.
#[derive(Debug)]
pub(crate) struct Ring {
    /// The bucket sums. Length is fixed at construction.
    blocks: Box<[u64]>,
    /// The sum of every bucket in `blocks`.
    total: u64,
    /// Index of the bucket currently accumulating adds.
    head: usize,
}

impl Ring {
    /// Create a new `Ring` with `buckets` zeroed slots.
    ///
    /// `buckets` must be non-zero, see [`crate::Layout`].
    pub(crate) fn new(buckets: usize) -> Self {
        debug_assert!(buckets > 0);
        Self {
            blocks: vec![0; buckets].into_boxed_slice(),
            total: 0,
            head: 0,
        }
    }

    /// Accumulate `value` into the head bucket.
    pub(crate) fn add(&mut self, value: u64) {
        self.total = self.total.wrapping_add(value);
        self.blocks[self.head] = self.blocks[self.head].wrapping_add(value);
    }

    /// Advance the head one bucket and evict whatever it held.
    ///
    /// The bucket the head lands on is the oldest in the ring. It must be
    /// emptied before any add reaches it.
    pub(crate) fn rotate(&mut self) {
        self.head = (self.head + 1) % self.blocks.len();
        self.total = self.total.wrapping_sub(self.blocks[self.head]);
        self.blocks[self.head] = 0;
    }

    /// Zero every bucket and the total. The head does not move.
    pub(crate) fn flush(&mut self) {
        self.blocks.fill(0);
        self.total = 0;
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    pub(crate) fn len(&self) -> usize {
        self.blocks.len()
    }

    #[cfg(test)]
    pub(crate) fn head(&self) -> usize {
        self.head
    }

    #[cfg(test)]
    pub(crate) fn blocks(&self) -> &[u64] {
        &self.blocks
    }
}
