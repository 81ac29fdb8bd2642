//! A chunk-indexed in-memory grid.

use std::ops::Range;

use rustc_hash::FxHashMap;
use tide_utils::{BlockPos, CHUNK_WIDTH, ChunkPos};

use super::{BlockKind, Grid};

const COLUMN_AREA: usize = (CHUNK_WIDTH * CHUNK_WIDTH) as usize;

#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    kind: BlockKind,
    raw: u8,
}

/// One loaded chunk column covering the full vertical extent of the grid.
#[derive(Debug, Clone)]
struct ChunkColumn {
    cells: Box<[Cell]>,
}

impl ChunkColumn {
    fn new(height: usize) -> Self {
        Self {
            cells: vec![Cell::default(); COLUMN_AREA * height].into_boxed_slice(),
        }
    }
}

/// A dense grid of chunk columns, loaded and unloaded one column at a time.
///
/// Cells outside loaded columns or outside `min_y..min_y + height` read as
/// [`BlockKind::Opaque`] and ignore writes.
#[derive(Debug, Clone)]
pub struct ChunkedGrid {
    columns: FxHashMap<ChunkPos, ChunkColumn>,
    min_y: i32,
    height: i32,
    rejected_writes: u64,
}

impl ChunkedGrid {
    /// Creates an empty grid with nothing loaded.
    #[must_use]
    pub fn new(min_y: i32, height: u16) -> Self {
        Self {
            columns: FxHashMap::default(),
            min_y,
            height: i32::from(height),
            rejected_writes: 0,
        }
    }

    /// Loads an all-air chunk column. Loading an already loaded column keeps its contents.
    pub fn load_chunk(&mut self, chunk: ChunkPos) {
        let height = self.height as usize;
        self.columns
            .entry(chunk)
            .or_insert_with(|| ChunkColumn::new(height));
    }

    /// Loads every chunk column in the inclusive rectangle `from..=to`.
    pub fn load_area(&mut self, from: ChunkPos, to: ChunkPos) {
        for x in from.x()..=to.x() {
            for z in from.z()..=to.z() {
                self.load_chunk(ChunkPos::new(x, z));
            }
        }
    }

    /// Unloads a chunk column, discarding its contents.
    pub fn unload_chunk(&mut self, chunk: ChunkPos) -> bool {
        self.columns.remove(&chunk).is_some()
    }

    /// Returns true if the chunk column is loaded.
    #[must_use]
    pub fn is_chunk_loaded(&self, chunk: ChunkPos) -> bool {
        self.columns.contains_key(&chunk)
    }

    /// Iterates the loaded chunk columns in no particular order.
    pub fn loaded_chunks(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.columns.keys().copied()
    }

    /// Number of writes dropped because they targeted unloaded or out of range cells.
    #[must_use]
    pub fn rejected_writes(&self) -> u64 {
        self.rejected_writes
    }

    /// Fills the inclusive box spanned by `from` and `to` with `kind`.
    ///
    /// Cells outside the loaded area are skipped. This bypasses the liquid
    /// engine entirely, so callers must notify it of any changes themselves.
    pub fn fill(&mut self, from: BlockPos, to: BlockPos, kind: BlockKind) {
        for x in from.x().min(to.x())..=from.x().max(to.x()) {
            for y in from.y().min(to.y())..=from.y().max(to.y()) {
                for z in from.z().min(to.z())..=from.z().max(to.z()) {
                    self.set_block(BlockPos::new(x, y, z), kind, 0);
                }
            }
        }
    }

    fn index(&self, pos: BlockPos) -> Option<(ChunkPos, usize)> {
        let local_y = pos.y() - self.min_y;
        if !(0..self.height).contains(&local_y) {
            return None;
        }
        let (lx, lz) = pos.local_xz();
        Some((
            pos.chunk_pos(),
            local_y as usize * COLUMN_AREA + lz * CHUNK_WIDTH as usize + lx,
        ))
    }

    fn cell(&self, pos: BlockPos) -> Option<Cell> {
        let (chunk, index) = self.index(pos)?;
        self.columns.get(&chunk).map(|column| column.cells[index])
    }
}

impl Grid for ChunkedGrid {
    fn block_kind(&self, pos: BlockPos) -> BlockKind {
        self.cell(pos).map_or(BlockKind::Opaque, |cell| cell.kind)
    }

    fn metadata(&self, pos: BlockPos) -> u8 {
        self.cell(pos).map_or(0, |cell| cell.raw)
    }

    fn set_block(&mut self, pos: BlockPos, kind: BlockKind, raw: u8) {
        let slot = self
            .index(pos)
            .and_then(|(chunk, index)| Some((self.columns.get_mut(&chunk)?, index)));
        match slot {
            Some((column, index)) => column.cells[index] = Cell { kind, raw },
            None => {
                self.rejected_writes += 1;
                log::trace!("Ignored write to {pos} outside the loaded grid");
            }
        }
    }

    fn is_loaded(&self, x: i32, z: i32) -> bool {
        self.columns.contains_key(&ChunkPos::from_block_xz(x, z))
    }

    fn y_range(&self) -> Range<i32> {
        self.min_y..self.min_y + self.height
    }
}
