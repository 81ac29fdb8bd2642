//! The grid accessor the engine reads and writes through.
//!
//! The grid is the single owner of all cell data. Every other component
//! borrows it for the duration of a call and keeps no copies, except for
//! [`RegionSnapshot`], which is an explicit read-only capture for meshing.

mod chunked_grid;
mod snapshot;

use std::ops::Range;

use tide_utils::BlockPos;

pub use chunked_grid::ChunkedGrid;
pub use snapshot::{RegionSnapshot, SnapshotCell};

/// The kind of block occupying a grid cell.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockKind {
    /// Empty space. Liquid may flow into it.
    #[default]
    Air = 0,
    /// A solid block. Never mutated by the engine.
    Solid = 1,
    /// A liquid source. Never decays.
    LiquidSource = 2,
    /// Liquid spreading from a source or falling column.
    LiquidFlowing = 3,
    /// Any other opaque block. Never mutated by the engine.
    Opaque = 4,
}

impl BlockKind {
    /// Returns true for both liquid kinds.
    #[must_use]
    pub const fn is_liquid(self) -> bool {
        matches!(self, Self::LiquidSource | Self::LiquidFlowing)
    }

    /// Returns true if liquid may be written into a cell of this kind.
    #[must_use]
    pub const fn is_replaceable(self) -> bool {
        matches!(self, Self::Air)
    }
}

/// Read/write access to the authoritative block grid.
///
/// Positions outside the loaded area must read as [`BlockKind::Opaque`] so
/// that nothing flows or searches into them.
pub trait Grid {
    /// Returns the kind of block at `pos`.
    fn block_kind(&self, pos: BlockPos) -> BlockKind;

    /// Returns the raw metadata byte stored with the block at `pos`.
    fn metadata(&self, pos: BlockPos) -> u8;

    /// Replaces the block at `pos`. Does nothing if the chunk is not loaded.
    fn set_block(&mut self, pos: BlockPos, kind: BlockKind, raw: u8);

    /// Returns true if the column at `x`/`z` is loaded.
    fn is_loaded(&self, x: i32, z: i32) -> bool;

    /// The vertical extent of the grid, `min_y..max_y`.
    fn y_range(&self) -> Range<i32>;

    /// Returns true if `pos` is inside a loaded column and the vertical extent.
    fn contains(&self, pos: BlockPos) -> bool {
        self.is_loaded(pos.x(), pos.z()) && self.y_range().contains(&pos.y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_kind_classes() {
        assert!(BlockKind::LiquidSource.is_liquid());
        assert!(BlockKind::LiquidFlowing.is_liquid());
        assert!(!BlockKind::Air.is_liquid());
        assert!(BlockKind::Air.is_replaceable());
        assert!(!BlockKind::Solid.is_replaceable());
        assert!(!BlockKind::Opaque.is_replaceable());
        assert!(!BlockKind::LiquidFlowing.is_replaceable());
    }
}
