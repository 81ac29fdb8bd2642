//! The propagation scheduler: drains the dirty set into the flow resolver
//! under a per-tick budget.

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashSet;
use tide_utils::{BlockPos, CHUNK_WIDTH, ChunkPos, Direction};

use super::dirty_set::{DirtySet, Insert};
use crate::config::LiquidConfig;
use crate::diagnostics::Diagnostics;
use crate::liquid::FlowResolver;
use crate::world::Grid;

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// The tick number, starting at 1.
    pub tick: u64,
    /// Positions handed to the resolver.
    pub processed: usize,
    /// Cells written by the resolver.
    pub written: usize,
    /// Pending entries dropped because the queue was full.
    pub dropped: usize,
    /// Positions still pending after the tick.
    pub pending: usize,
}

/// Owns the dirty set and runs the resolver over it once per tick.
///
/// Positions dirtied while a tick runs are queued for a later tick, never
/// for the one in progress.
#[derive(Debug)]
pub struct PropagationScheduler {
    dirty: DirtySet,
    resolver: FlowResolver,
    max_updates_per_tick: usize,
    tick_interval: Duration,
    tick_count: u64,
    /// Regions written since they were last reported settled.
    touched: FxHashSet<ChunkPos>,
    diagnostics: Arc<Diagnostics>,
}

impl PropagationScheduler {
    /// Creates an idle scheduler.
    #[must_use]
    pub fn new(config: &LiquidConfig, diagnostics: Arc<Diagnostics>) -> Self {
        Self {
            dirty: DirtySet::new(config.max_queue_size),
            resolver: FlowResolver::new(config),
            max_updates_per_tick: config.max_updates_per_tick.max(1),
            tick_interval: config.tick_interval(),
            tick_count: 0,
            touched: FxHashSet::default(),
            diagnostics,
        }
    }

    /// Wall-clock time between ticks.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Number of pending positions.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.dirty.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.dirty.is_empty()
    }

    /// Returns true if `pos` is pending.
    #[must_use]
    pub fn is_dirty(&self, pos: BlockPos) -> bool {
        self.dirty.contains(pos)
    }

    /// Queues `pos` for evaluation.
    ///
    /// Positions outside the loaded area are ignored. Returns true if the
    /// position was newly queued.
    pub fn mark_dirty<G: Grid + ?Sized>(&mut self, grid: &G, pos: BlockPos) -> bool {
        if !grid.contains(pos) {
            self.diagnostics.record_unloaded(1);
            return false;
        }
        match self.dirty.insert(pos) {
            Insert::Queued => true,
            Insert::Duplicate => false,
            Insert::Evicted(oldest) => {
                log::trace!("Dirty queue full, dropped {oldest}");
                self.diagnostics.record_dropped(1);
                true
            }
        }
    }

    /// Handles a block placed or removed by another system: seeds `pos` and
    /// its six neighbors and flags the region for re-meshing.
    pub fn block_changed<G: Grid + ?Sized>(&mut self, grid: &G, pos: BlockPos) {
        self.mark_dirty(grid, pos);
        for direction in Direction::ALL {
            self.mark_dirty(grid, direction.relative(pos));
        }
        if grid.contains(pos) {
            self.touch(pos);
        }
    }

    /// Flags `chunk` for re-meshing once it has no pending work.
    pub fn request_remesh(&mut self, chunk: ChunkPos) {
        self.touched.insert(chunk);
    }

    /// Forgets all pending work and settle tracking for `chunk`.
    pub fn discard_region(&mut self, chunk: ChunkPos) -> usize {
        self.touched.remove(&chunk);
        let removed = self.dirty.remove_region(chunk);
        if removed > 0 {
            log::debug!("Discarded {removed} pending liquid updates in {chunk}");
        }
        removed
    }

    /// Runs one tick: resolves up to the per-tick budget of the oldest
    /// pending positions.
    pub fn tick<G: Grid + ?Sized>(&mut self, grid: &mut G) -> TickReport {
        self.tick_count += 1;
        let batch = self.dirty.drain_front(self.max_updates_per_tick);
        let mut report = TickReport {
            tick: self.tick_count,
            processed: batch.len(),
            ..TickReport::default()
        };
        let mut unloaded = 0u64;

        for pos in batch {
            let resolution = self.resolver.resolve(grid, pos);
            unloaded += u64::from(resolution.unloaded_skips);
            report.written += resolution.written.len();
            for &written in &resolution.written {
                self.touch(written);
            }
            for &next in &resolution.dirty {
                if !grid.contains(next) {
                    unloaded += 1;
                    continue;
                }
                if let Insert::Evicted(_) = self.dirty.insert(next) {
                    report.dropped += 1;
                }
            }
        }

        if report.dropped > 0 {
            log::warn!(
                "Liquid update queue is full ({} entries), dropped {} pending updates this tick",
                self.dirty.capacity(),
                report.dropped
            );
            self.diagnostics.record_dropped(report.dropped as u64);
        }
        if unloaded > 0 {
            self.diagnostics.record_unloaded(unloaded);
        }
        self.diagnostics.record_tick(report.processed);

        report.pending = self.dirty.len();
        report
    }

    /// Removes and returns the regions that were written and now have no
    /// pending positions, ordered by chunk x then z.
    pub fn take_settled(&mut self) -> Vec<ChunkPos> {
        let mut settled: Vec<ChunkPos> = self
            .touched
            .iter()
            .copied()
            .filter(|chunk| self.dirty.pending_in(*chunk) == 0)
            .collect();
        for chunk in &settled {
            self.touched.remove(chunk);
        }
        settled.sort_unstable_by_key(|chunk| (chunk.x(), chunk.z()));
        settled
    }

    /// Records a write at `pos`, including the neighboring region when the
    /// cell sits on a chunk edge, since its faces are culled against it.
    fn touch(&mut self, pos: BlockPos) {
        let chunk = pos.chunk_pos();
        self.touched.insert(chunk);
        let (lx, lz) = pos.local_xz();
        let last = (CHUNK_WIDTH - 1) as usize;
        if lx == 0 {
            self.touched.insert(chunk.offset(-1, 0));
        } else if lx == last {
            self.touched.insert(chunk.offset(1, 0));
        }
        if lz == 0 {
            self.touched.insert(chunk.offset(0, -1));
        } else if lz == last {
            self.touched.insert(chunk.offset(0, 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liquid::{LiquidCell, write_liquid};
    use crate::world::{BlockKind, ChunkedGrid};

    fn floor() -> ChunkedGrid {
        let mut grid = ChunkedGrid::new(0, 16);
        grid.load_area(ChunkPos::new(0, 0), ChunkPos::new(1, 1));
        grid.fill(BlockPos::new(0, 0, 0), BlockPos::new(31, 0, 31), BlockKind::Solid);
        grid
    }

    fn scheduler(config: &LiquidConfig) -> (PropagationScheduler, Arc<Diagnostics>) {
        let diagnostics = Arc::new(Diagnostics::new());
        (
            PropagationScheduler::new(config, Arc::clone(&diagnostics)),
            diagnostics,
        )
    }

    #[test]
    fn test_mark_dirty_unloaded_is_noop() {
        let grid = floor();
        let (mut scheduler, diagnostics) = scheduler(&LiquidConfig::default());

        assert!(!scheduler.mark_dirty(&grid, BlockPos::new(-1, 1, 0)));
        assert!(!scheduler.mark_dirty(&grid, BlockPos::new(0, 99, 0)));
        assert!(scheduler.is_idle());
        assert_eq!(diagnostics.snapshot().unloaded_skips, 2);
    }

    #[test]
    fn test_duplicates_processed_once() {
        let mut grid = floor();
        let (mut scheduler, diagnostics) = scheduler(&LiquidConfig::default());
        let pos = BlockPos::new(4, 1, 4);

        assert!(scheduler.mark_dirty(&grid, pos));
        assert!(!scheduler.mark_dirty(&grid, pos));
        let report = scheduler.tick(&mut grid);

        assert_eq!(report.processed, 1);
        assert_eq!(report.tick, 1);
        assert_eq!(diagnostics.snapshot().cells_resolved, 1);
    }

    #[test]
    fn test_budget_leaves_rest_queued() {
        let mut grid = floor();
        let config = LiquidConfig {
            max_updates_per_tick: 3,
            ..LiquidConfig::default()
        };
        let (mut scheduler, _) = scheduler(&config);
        for x in 0..10 {
            scheduler.mark_dirty(&grid, BlockPos::new(x, 5, 5));
        }

        let report = scheduler.tick(&mut grid);
        assert_eq!(report.processed, 3);
        assert_eq!(report.pending, 7);
    }

    #[test]
    fn test_new_work_waits_for_next_tick() {
        let mut grid = floor();
        let (mut scheduler, _) = scheduler(&LiquidConfig::default());
        let pos = BlockPos::new(8, 1, 8);
        write_liquid(&mut grid, pos, Some(LiquidCell::source()));
        scheduler.mark_dirty(&grid, pos);

        let first = scheduler.tick(&mut grid);
        assert_eq!(first.processed, 1);
        assert!(first.written > 0);
        // The fresh neighbors were written but not yet resolved.
        assert!(scheduler.is_dirty(pos.offset(1, 0, 0)));
        assert!(scheduler.is_dirty(pos.offset(2, 0, 0)));
        assert_eq!(grid.block_kind(pos.offset(2, 0, 0)), BlockKind::Air);

        scheduler.tick(&mut grid);
        assert_eq!(grid.block_kind(pos.offset(2, 0, 0)), BlockKind::LiquidFlowing);
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut grid = floor();
        let config = LiquidConfig {
            max_updates_per_tick: 1,
            max_queue_size: 4,
            ..LiquidConfig::default()
        };
        let (mut scheduler, diagnostics) = scheduler(&config);
        let pos = BlockPos::new(8, 1, 8);
        write_liquid(&mut grid, pos, Some(LiquidCell::source()));
        scheduler.mark_dirty(&grid, pos);

        let report = scheduler.tick(&mut grid);

        assert!(report.dropped > 0);
        assert_eq!(report.pending, 4);
        assert_eq!(diagnostics.snapshot().dropped_entries, report.dropped as u64);
    }

    #[test]
    fn test_settled_regions() {
        let mut grid = floor();
        let (mut scheduler, _) = scheduler(&LiquidConfig::default());
        let pos = BlockPos::new(3, 1, 3);
        write_liquid(&mut grid, pos, Some(LiquidCell::source()));
        scheduler.block_changed(&grid, pos);

        assert!(scheduler.take_settled().is_empty());
        for _ in 0..64 {
            if scheduler.is_idle() {
                break;
            }
            scheduler.tick(&mut grid);
        }
        assert!(scheduler.is_idle());
        // The spread reached x = 0 and z = 0, so the unloaded -1 neighbors are reported too.
        let settled = scheduler.take_settled();
        assert!(settled.contains(&ChunkPos::new(0, 0)));
        assert!(settled.contains(&ChunkPos::new(-1, 0)));
        assert!(scheduler.take_settled().is_empty());
    }

    #[test]
    fn test_discard_region() {
        let grid = floor();
        let (mut scheduler, _) = scheduler(&LiquidConfig::default());
        scheduler.mark_dirty(&grid, BlockPos::new(1, 1, 1));
        scheduler.mark_dirty(&grid, BlockPos::new(20, 1, 1));
        scheduler.request_remesh(ChunkPos::new(0, 0));

        assert_eq!(scheduler.discard_region(ChunkPos::new(0, 0)), 1);
        assert_eq!(scheduler.pending(), 1);
        assert!(scheduler.take_settled().is_empty());
    }
}
