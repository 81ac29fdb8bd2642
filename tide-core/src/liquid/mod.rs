//! Liquid behavior: state encoding, slope finding and the per-cell flow rules.
//!
//! Raw metadata bytes are only ever touched by [`read_liquid`] and
//! [`write_liquid`]; everything else works on [`LiquidCell`] values.

mod downhill;
mod flow;
mod state;

use tide_utils::BlockPos;

use crate::world::{BlockKind, Grid};

pub use downhill::{DownhillSearch, find_drop_distance};
pub use flow::{FlowResolver, Resolution};
pub use state::{
    FULL_HEIGHT, LiquidState, MAX_LEVEL, MIN_HEIGHT, decode, encode, height_fraction, is_falling,
};

/// A liquid occupying one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LiquidCell {
    /// Whether the cell is a source.
    pub source: bool,
    /// Level and falling flag. A source always reports level 0.
    pub state: LiquidState,
}

impl LiquidCell {
    /// A source cell.
    #[must_use]
    pub const fn source() -> Self {
        Self {
            source: true,
            state: LiquidState::SOURCE,
        }
    }

    /// A flowing cell with the given state.
    #[must_use]
    pub const fn flowing(state: LiquidState) -> Self {
        Self {
            source: false,
            state,
        }
    }

    /// The block kind this cell is stored as.
    #[must_use]
    pub const fn kind(self) -> BlockKind {
        if self.source {
            BlockKind::LiquidSource
        } else {
            BlockKind::LiquidFlowing
        }
    }
}

/// Reads the liquid at `pos`, or `None` if the cell holds no liquid.
pub fn read_liquid<G: Grid + ?Sized>(grid: &G, pos: BlockPos) -> Option<LiquidCell> {
    match grid.block_kind(pos) {
        BlockKind::LiquidSource => Some(LiquidCell {
            source: true,
            state: decode(grid.metadata(pos)).with_level(0),
        }),
        BlockKind::LiquidFlowing => Some(LiquidCell::flowing(decode(grid.metadata(pos)))),
        _ => None,
    }
}

/// Writes `cell` to `pos`, or air when `cell` is `None`.
pub fn write_liquid<G: Grid + ?Sized>(grid: &mut G, pos: BlockPos, cell: Option<LiquidCell>) {
    match cell {
        Some(cell) => grid.set_block(pos, cell.kind(), cell.state.encode()),
        None => grid.set_block(pos, BlockKind::Air, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::ChunkedGrid;
    use tide_utils::ChunkPos;

    #[test]
    fn test_source_level_ignores_stored_bits() {
        let mut grid = ChunkedGrid::new(0, 16);
        grid.load_chunk(ChunkPos::new(0, 0));
        let pos = BlockPos::new(1, 1, 1);
        grid.set_block(pos, BlockKind::LiquidSource, encode(6, true));

        let cell = read_liquid(&grid, pos).expect("source should read back");
        assert!(cell.source);
        assert_eq!(cell.state.level(), 0);
        assert!(cell.state.falling());
    }

    #[test]
    fn test_write_none_clears_to_air() {
        let mut grid = ChunkedGrid::new(0, 16);
        grid.load_chunk(ChunkPos::new(0, 0));
        let pos = BlockPos::new(2, 2, 2);
        write_liquid(&mut grid, pos, Some(LiquidCell::flowing(LiquidState::new(3, false))));
        assert_eq!(grid.block_kind(pos), BlockKind::LiquidFlowing);
        write_liquid(&mut grid, pos, None);
        assert_eq!(grid.block_kind(pos), BlockKind::Air);
        assert_eq!(read_liquid(&grid, pos), None);
    }
}
