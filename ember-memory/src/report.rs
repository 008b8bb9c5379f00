//! Module `report`
//!
//! Snapshots of an arena's live set, meant to be handed to whatever formatter or
//! logger the application uses. Typically produced right before an arena is torn
//! down: any allocation still listed at that point is a leak.

use crate::policy::AllocationRecord;

/// One live allocation as seen by the report.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AllocationReport {
    pub address: usize,
    pub size: usize,
    pub alignment: usize,
    /// Source file of the allocating call, `None` for untracked call sites.
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl From<&AllocationRecord> for AllocationReport {
    fn from(record: &AllocationRecord) -> Self {
        Self {
            address: record.address,
            size: record.size,
            alignment: record.alignment,
            file: record.source.map(|source| source.file),
            line: record.source.map(|source| source.line),
        }
    }
}

/// Read-only snapshot of an arena.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MemoryReport {
    pub arena_name: String,
    pub total_used_memory: usize,
    pub total_num_allocations: usize,
    /// `false` when the arena has no tracking policy; `allocations` is then always empty.
    pub tracked: bool,
    pub allocations: Vec<AllocationReport>,
}

impl MemoryReport {
    pub(crate) fn collect<'a>(
        arena_name: &str,
        total_used_memory: usize,
        total_num_allocations: usize,
        tracked: bool,
        records: impl Iterator<Item = &'a AllocationRecord>,
    ) -> Self {
        Self {
            arena_name: arena_name.to_owned(),
            total_used_memory,
            total_num_allocations,
            tracked,
            allocations: records.map(AllocationReport::from).collect(),
        }
    }

    /// Returns `true` if nothing is outstanding.
    #[must_use]
    pub fn is_leak_free(&self) -> bool {
        self.total_num_allocations == 0
    }

    /// Bytes still held by live allocations.
    #[must_use]
    pub fn leaked_bytes(&self) -> usize {
        self.total_used_memory
    }

    /// Live allocations attributed to `file`.
    pub fn allocations_from<'a>(
        &'a self,
        file: &'a str,
    ) -> impl Iterator<Item = &'a AllocationReport> + 'a {
        self.allocations
            .iter()
            .filter(move |allocation| allocation.file == Some(file))
    }
}

/// Emits one `warn` record per live allocation of `report`, plus a summary line.
///
/// Returns the number of leaked allocations.
pub fn log_leaks(report: &MemoryReport) -> usize {
    if report.is_leak_free() {
        log::debug!("arena '{}': no leaks", report.arena_name);
        return 0;
    }

    log::warn!(
        "arena '{}': {} live allocations, {} bytes",
        report.arena_name,
        report.total_num_allocations,
        report.total_used_memory
    );

    for allocation in &report.allocations {
        match (allocation.file, allocation.line) {
            (Some(file), Some(line)) => log::warn!(
                "  {:#x}: {} bytes (align {}) allocated at {}:{}",
                allocation.address,
                allocation.size,
                allocation.alignment,
                file,
                line
            ),
            _ => log::warn!(
                "  {:#x}: {} bytes (align {}) from an untracked call site",
                allocation.address,
                allocation.size,
                allocation.alignment
            ),
        }
    }

    report.total_num_allocations
}
