//! Immutable captures of a chunk column for meshing off the simulation lock.

use std::ops::Range;

use tide_utils::{BlockPos, CHUNK_WIDTH, ChunkPos};

use super::{BlockKind, Grid};
use crate::liquid::{LiquidState, read_liquid};

/// Snapshot width including the one-cell border on each side.
const SPAN: i32 = CHUNK_WIDTH + 2;

/// One captured cell. Liquid state is already decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotCell {
    /// The block kind.
    pub kind: BlockKind,
    /// The decoded liquid state. Meaningless unless `kind` is a liquid.
    pub state: LiquidState,
}

/// A read-only copy of one chunk column plus a one-cell border on every side.
///
/// Captured when a region settles so the mesh generator never reads the live
/// grid while a tick may be writing to it.
#[derive(Debug, Clone)]
pub struct RegionSnapshot {
    chunk: ChunkPos,
    y_range: Range<i32>,
    cells: Vec<SnapshotCell>,
}

impl RegionSnapshot {
    /// Copies `chunk` and its border out of `grid`.
    ///
    /// Border cells in unloaded neighbors are captured as [`BlockKind::Opaque`].
    #[must_use]
    pub fn capture<G: Grid + ?Sized>(grid: &G, chunk: ChunkPos) -> Self {
        let range = grid.y_range();
        let y_range = range.start - 1..range.end + 1;
        let (min_x, min_z) = chunk.min_block_xz();
        let layers = (y_range.end - y_range.start) as usize;
        let mut cells = Vec::with_capacity(layers * (SPAN * SPAN) as usize);

        for y in y_range.clone() {
            for lz in -1..=CHUNK_WIDTH {
                for lx in -1..=CHUNK_WIDTH {
                    let pos = BlockPos::new(min_x + lx, y, min_z + lz);
                    let cell = match read_liquid(grid, pos) {
                        Some(liquid) => SnapshotCell {
                            kind: liquid.kind(),
                            state: liquid.state,
                        },
                        None => SnapshotCell {
                            kind: grid.block_kind(pos),
                            state: LiquidState::default(),
                        },
                    };
                    cells.push(cell);
                }
            }
        }

        Self {
            chunk,
            y_range,
            cells,
        }
    }

    /// The captured chunk column.
    #[must_use]
    pub fn chunk(&self) -> ChunkPos {
        self.chunk
    }

    /// The captured vertical extent, including the border layers.
    #[must_use]
    pub fn y_range(&self) -> Range<i32> {
        self.y_range.clone()
    }

    /// Returns the cell at chunk-local `lx`/`lz` (each in `-1..=16`) and world `y`.
    ///
    /// Anything outside the captured volume reads as air.
    #[must_use]
    pub fn get(&self, lx: i32, y: i32, lz: i32) -> SnapshotCell {
        let in_span = |v: i32| (-1..=CHUNK_WIDTH).contains(&v);
        if !in_span(lx) || !in_span(lz) || !self.y_range.contains(&y) {
            return SnapshotCell::default();
        }
        let layer = (y - self.y_range.start) as usize;
        let index = layer * (SPAN * SPAN) as usize + ((lz + 1) * SPAN + lx + 1) as usize;
        self.cells[index]
    }

    /// Returns true if the cell holds liquid of either kind.
    #[must_use]
    pub fn is_liquid(&self, lx: i32, y: i32, lz: i32) -> bool {
        self.get(lx, y, lz).kind.is_liquid()
    }

    /// Returns true if the captured chunk contains no liquid at all.
    #[must_use]
    pub fn is_dry(&self) -> bool {
        !self.cells.iter().any(|cell| cell.kind.is_liquid())
    }
}
