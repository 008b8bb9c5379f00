/// Lifetime counters of an arena, compiled in with the `memory_stats` feature.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArenaStats {
    pub capacity: usize,
    pub peak_used_memory: usize,
    pub peak_num_allocations: usize,
    pub total_allocations: usize,
    pub total_deallocations: usize,
    pub failed_allocations: usize,
    pub rejected_deallocations: usize,
    pub corruptions: usize,
    pub clears: usize,
}

impl ArenaStats {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    #[inline(always)]
    pub(crate) fn on_allocation(&mut self, used: usize, count: usize) {
        self.total_allocations += 1;
        self.peak_used_memory = self.peak_used_memory.max(used);
        self.peak_num_allocations = self.peak_num_allocations.max(count);
    }

    /// Fraction of the region that was in use at the high-water mark.
    #[must_use]
    pub fn peak_utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.peak_used_memory as f64 / self.capacity as f64
    }
}
