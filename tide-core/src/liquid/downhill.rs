//! Bounded breadth-first search for the nearest place liquid could fall.
//!
//! The search walks (x, z) columns at a fixed elevation and reports the BFS
//! distance of the first column whose cell one layer down is open. Columns
//! are expanded in N, E, S, W order so identical grids give identical results.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tide_utils::{BlockPos, Direction};

use crate::world::{BlockKind, Grid};

/// Reusable search state bound to one grid and radius.
///
/// The visited set and queue are kept between runs to avoid reallocating
/// when the resolver probes all four neighbors of a cell.
pub struct DownhillSearch<'a, G: Grid + ?Sized> {
    grid: &'a G,
    max_radius: u32,
    excluded: Option<(i32, i32)>,
    visited: FxHashSet<(i32, i32)>,
    queue: VecDeque<((i32, i32), u32)>,
}

impl<'a, G: Grid + ?Sized> DownhillSearch<'a, G> {
    /// Creates a search over `grid` expanding at most `max_radius` steps.
    #[must_use]
    pub fn new(grid: &'a G, max_radius: u32) -> Self {
        Self {
            grid,
            max_radius,
            excluded: None,
            visited: FxHashSet::default(),
            queue: VecDeque::new(),
        }
    }

    /// Never walks through the column at `x`/`z`.
    ///
    /// Used to keep the search from looping back through the cell that is
    /// doing the spreading.
    #[must_use]
    pub fn excluding(mut self, x: i32, z: i32) -> Self {
        self.excluded = Some((x, z));
        self
    }

    /// Returns the distance from `origin` to the nearest drop, or `None` if
    /// there is none within the radius.
    ///
    /// `origin` itself is distance 0. Unloaded columns are never entered.
    pub fn run(&mut self, origin: BlockPos) -> Option<u32> {
        self.visited.clear();
        self.queue.clear();
        if let Some(column) = self.excluded {
            self.visited.insert(column);
        }

        let y = origin.y();
        let start = (origin.x(), origin.z());
        if !self.is_passable(start, y) {
            return None;
        }
        self.visited.insert(start);
        self.queue.push_back((start, 0));

        while let Some((column, distance)) = self.queue.pop_front() {
            if self.is_drop(column, y) {
                log::trace!(
                    "Drop found {distance} blocks from {origin} at ({}, {}, {})",
                    column.0,
                    y - 1,
                    column.1
                );
                return Some(distance);
            }
            if distance >= self.max_radius {
                continue;
            }
            for direction in Direction::HORIZONTAL {
                let (dx, _, dz) = direction.offset();
                let next = (column.0 + dx, column.1 + dz);
                if self.visited.insert(next) && self.is_passable(next, y) {
                    self.queue.push_back((next, distance + 1));
                }
            }
        }

        None
    }

    /// Liquid can move sideways through air and through flowing liquid.
    fn is_passable(&self, (x, z): (i32, i32), y: i32) -> bool {
        if !self.grid.is_loaded(x, z) {
            return false;
        }
        let kind = self.grid.block_kind(BlockPos::new(x, y, z));
        kind.is_replaceable() || kind == BlockKind::LiquidFlowing
    }

    /// A column is a drop if the cell below the search plane is open or is
    /// already a flowing column.
    fn is_drop(&self, (x, z): (i32, i32), y: i32) -> bool {
        let kind = self.grid.block_kind(BlockPos::new(x, y - 1, z));
        kind.is_replaceable() || kind == BlockKind::LiquidFlowing
    }
}

/// Finds the BFS distance from `origin` to the nearest drop within `max_radius`.
#[must_use]
pub fn find_drop_distance<G: Grid + ?Sized>(
    grid: &G,
    origin: BlockPos,
    max_radius: u32,
) -> Option<u32> {
    DownhillSearch::new(grid, max_radius).run(origin)
}
