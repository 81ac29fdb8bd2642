//! Counters for the engine's recoverable degradations and throughput.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counters, updated from the tick pass and read from anywhere.
#[derive(Debug, Default)]
pub struct Diagnostics {
    ticks: AtomicU64,
    cells_resolved: AtomicU64,
    dropped_entries: AtomicU64,
    unloaded_skips: AtomicU64,
    regions_meshed: AtomicU64,
}

/// A plain copy of [`Diagnostics`] at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiagnosticsSnapshot {
    /// Completed ticks.
    pub ticks: u64,
    /// Dirty positions handed to the flow resolver.
    pub cells_resolved: u64,
    /// Dirty entries dropped because the queue was full.
    pub dropped_entries: u64,
    /// Reads, writes and marks that targeted unloaded columns.
    pub unloaded_skips: u64,
    /// Triangle buffers produced.
    pub regions_meshed: u64,
}

impl Diagnostics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_tick(&self, resolved: usize) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.cells_resolved
            .fetch_add(resolved as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self, count: u64) {
        self.dropped_entries.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_unloaded(&self, count: u64) {
        self.unloaded_skips.fetch_add(count, Ordering::Relaxed);
    }

    /// Counts one generated mesh.
    pub fn record_meshed(&self) {
        self.regions_meshed.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter.
    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            cells_resolved: self.cells_resolved.load(Ordering::Relaxed),
            dropped_entries: self.dropped_entries.load(Ordering::Relaxed),
            unloaded_skips: self.unloaded_skips.load(Ordering::Relaxed),
            regions_meshed: self.regions_meshed.load(Ordering::Relaxed),
        }
    }
}
