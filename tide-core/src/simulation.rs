//! The engine facade tying the grid, scheduler and mesher together.

use std::sync::Arc;

use tide_utils::{BlockPos, ChunkPos};

use crate::config::LiquidConfig;
use crate::diagnostics::Diagnostics;
use crate::liquid::{LiquidCell, write_liquid};
use crate::mesh::{TriangleBuffer, generate};
use crate::ticks::{PropagationScheduler, TickReport};
use crate::world::{BlockKind, ChunkedGrid, Grid, RegionSnapshot};

/// A liquid simulation over a grid it owns.
///
/// All mutation goes through `&mut self`, so one tick is always a single
/// critical section. Hosts that share the simulation across threads wrap it
/// in a lock and mesh the snapshots from [`Self::take_settled_snapshots`]
/// after releasing it.
#[derive(Debug)]
pub struct LiquidSimulation<G: Grid> {
    grid: G,
    scheduler: PropagationScheduler,
    diagnostics: Arc<Diagnostics>,
    config: LiquidConfig,
}

impl<G: Grid> LiquidSimulation<G> {
    /// Creates a simulation over `grid`. Nothing is dirty until a change is reported.
    #[must_use]
    pub fn new(grid: G, config: LiquidConfig) -> Self {
        let diagnostics = Arc::new(Diagnostics::new());
        let scheduler = PropagationScheduler::new(&config, Arc::clone(&diagnostics));
        Self {
            grid,
            scheduler,
            diagnostics,
            config,
        }
    }

    /// The grid.
    #[must_use]
    pub fn grid(&self) -> &G {
        &self.grid
    }

    /// Mutable grid access. Changes made here must be reported through
    /// [`Self::block_changed`].
    pub fn grid_mut(&mut self) -> &mut G {
        &mut self.grid
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &LiquidConfig {
        &self.config
    }

    /// Shared handle to the counters.
    #[must_use]
    pub fn diagnostics(&self) -> Arc<Diagnostics> {
        Arc::clone(&self.diagnostics)
    }

    /// The scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &PropagationScheduler {
        &self.scheduler
    }

    /// Sets a block and reports the change. Returns false if the column is not loaded.
    pub fn place(&mut self, pos: BlockPos, kind: BlockKind, raw: u8) -> bool {
        if !self.grid.contains(pos) {
            log::debug!("Ignored placement at unloaded {pos}");
            return false;
        }
        self.grid.set_block(pos, kind, raw);
        self.block_changed(pos);
        true
    }

    /// Places a liquid source.
    pub fn place_source(&mut self, pos: BlockPos) -> bool {
        let cell = LiquidCell::source();
        self.place(pos, cell.kind(), cell.state.encode())
    }

    /// Removes whatever is at `pos`, leaving air.
    pub fn clear(&mut self, pos: BlockPos) -> bool {
        if !self.grid.contains(pos) {
            return false;
        }
        write_liquid(&mut self.grid, pos, None);
        self.block_changed(pos);
        true
    }

    /// Reports a change made by another system at `pos`.
    pub fn block_changed(&mut self, pos: BlockPos) {
        self.scheduler.block_changed(&self.grid, pos);
    }

    /// Runs one propagation tick.
    pub fn tick(&mut self) -> TickReport {
        let report = self.scheduler.tick(&mut self.grid);
        if report.processed > 0 {
            log::trace!(
                "Liquid tick {}: {} resolved, {} written, {} pending",
                report.tick,
                report.processed,
                report.written,
                report.pending
            );
        }
        report
    }

    /// Ticks until nothing is pending or `max_ticks` have run. Returns the
    /// number of ticks run.
    pub fn settle(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && !self.scheduler.is_idle() {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Captures every region that settled since the last call.
    ///
    /// The snapshots are independent of the grid and can be meshed on any thread.
    pub fn take_settled_snapshots(&mut self) -> Vec<RegionSnapshot> {
        self.scheduler
            .take_settled()
            .into_iter()
            .filter(|chunk| {
                let (x, z) = chunk.min_block_xz();
                self.grid.is_loaded(x, z)
            })
            .map(|chunk| RegionSnapshot::capture(&self.grid, chunk))
            .collect()
    }

    /// Meshes `chunk` right away, regardless of pending work.
    ///
    /// Returns `None` if the chunk is not loaded.
    pub fn remesh(&self, chunk: ChunkPos) -> Option<TriangleBuffer> {
        let (x, z) = chunk.min_block_xz();
        if !self.grid.is_loaded(x, z) {
            return None;
        }
        let buffer = generate(&RegionSnapshot::capture(&self.grid, chunk));
        self.diagnostics.record_meshed();
        Some(buffer)
    }

    /// Asks for `chunk` to be re-meshed the next time it has no pending work.
    pub fn request_remesh(&mut self, chunk: ChunkPos) {
        self.scheduler.request_remesh(chunk);
    }
}

impl LiquidSimulation<ChunkedGrid> {
    /// Unloads a chunk and forgets its pending work.
    pub fn unload_chunk(&mut self, chunk: ChunkPos) -> bool {
        self.scheduler.discard_region(chunk);
        self.grid.unload_chunk(chunk)
    }

    /// Loads an empty chunk column.
    pub fn load_chunk(&mut self, chunk: ChunkPos) {
        self.grid.load_chunk(chunk);
        self.scheduler.request_remesh(chunk);
    }
}
