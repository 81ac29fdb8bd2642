//! The per-cell flow rules.
//!
//! [`FlowResolver::resolve`] looks at one cell and its neighbors, writes the
//! cell's next state (and any cells it pours or spreads into) back to the
//! grid, and reports which positions need another look. It never recurses;
//! cascading work goes back through the scheduler's dirty set.

use smallvec::SmallVec;
use tide_utils::{BlockPos, Direction};

use super::downhill::DownhillSearch;
use super::{LiquidCell, LiquidState, MAX_LEVEL, read_liquid, write_liquid};
use crate::config::LiquidConfig;
use crate::world::{BlockKind, Grid};

/// The outcome of resolving one cell.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The cell's state after resolution, `None` if it holds no liquid.
    pub next: Option<LiquidCell>,
    /// Positions to re-evaluate. May contain duplicates.
    pub dirty: SmallVec<[BlockPos; 16]>,
    /// Positions written during resolution.
    pub written: SmallVec<[BlockPos; 6]>,
    /// Writes and marks skipped because the target column is not loaded.
    pub unloaded_skips: u32,
}

impl Resolution {
    /// Returns true if resolution changed nothing and produced no work.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.dirty.is_empty() && self.written.is_empty()
    }

    fn mark(&mut self, pos: BlockPos) {
        self.dirty.push(pos);
    }

    fn mark_horizontal(&mut self, pos: BlockPos) {
        for direction in Direction::HORIZONTAL {
            self.dirty.push(direction.relative(pos));
        }
    }

    /// Marks a cell whose existence changed: itself and all six faces.
    fn mark_around(&mut self, pos: BlockPos) {
        self.dirty.push(pos);
        for direction in Direction::ALL {
            self.dirty.push(direction.relative(pos));
        }
    }
}

/// Computes the next state of liquid cells.
#[derive(Debug, Clone, Copy)]
pub struct FlowResolver {
    infinite_source: bool,
    search_radius: u32,
}

impl FlowResolver {
    /// Creates a resolver from the engine configuration.
    #[must_use]
    pub fn new(config: &LiquidConfig) -> Self {
        Self {
            infinite_source: config.infinite_source_enabled,
            search_radius: config.flow_search_radius,
        }
    }

    /// Resolves the cell at `pos` against the current grid.
    ///
    /// Reads and writes go straight to `grid`; nothing is cached between calls.
    pub fn resolve<G: Grid + ?Sized>(&self, grid: &mut G, pos: BlockPos) -> Resolution {
        let mut out = Resolution::default();
        if !grid.is_loaded(pos.x(), pos.z()) {
            return out;
        }
        let Some(mut cell) = read_liquid(grid, pos) else {
            return out;
        };

        let has_liquid_above = grid.block_kind(pos.above()).is_liquid();
        let below = pos.below();
        let below_kind = grid.block_kind(below);
        let can_flow_down = below_kind.is_replaceable();

        let falling = can_flow_down || has_liquid_above;
        if cell.state.falling() != falling {
            cell.state = cell.state.with_falling(falling);
            Self::write(grid, pos, Some(cell), &mut out);
            out.mark_horizontal(pos);
        }

        if can_flow_down {
            let column = LiquidCell::flowing(LiquidState::new(0, true));
            Self::write(grid, below, Some(column), &mut out);
            out.mark_around(below);
            out.next = Some(cell);
            return out;
        }

        if !cell.source {
            let Some(level) = Self::desired_level(grid, pos, has_liquid_above) else {
                log::trace!("Liquid at {pos} lost its supply");
                Self::write(grid, pos, None, &mut out);
                out.mark_around(pos);
                return out;
            };
            let current = cell.state.level();
            if level != current {
                cell.state = cell.state.with_level(level);
                Self::write(grid, pos, Some(cell), &mut out);
                out.mark_horizontal(pos);
                if level > current {
                    // Shrinking: let the neighbors catch up before spreading again.
                    out.next = Some(cell);
                    return out;
                }
            }
        }

        if self.infinite_source && !cell.source && Self::can_become_source(grid, pos, below_kind) {
            log::trace!("Liquid at {pos} became a source");
            cell = LiquidCell {
                source: true,
                state: LiquidState::SOURCE.with_falling(cell.state.falling()),
            };
            Self::write(grid, pos, Some(cell), &mut out);
            out.mark_horizontal(pos);
        }

        out.next = Some(cell);

        if cell.state.level() >= MAX_LEVEL {
            return out;
        }
        // A flowing cell resting on a falling column feeds the column, not its sides.
        if !cell.source && below_kind == BlockKind::LiquidFlowing {
            return out;
        }

        self.spread(grid, pos, cell, &mut out);
        out
    }

    /// The level this flowing cell should have given its neighbors, or
    /// `None` if nothing supplies it.
    fn desired_level<G: Grid + ?Sized>(
        grid: &G,
        pos: BlockPos,
        has_liquid_above: bool,
    ) -> Option<u8> {
        if has_liquid_above {
            return Some(0);
        }
        let mut best: Option<u8> = None;
        for direction in Direction::HORIZONTAL {
            let Some(neighbor) = read_liquid(grid, direction.relative(pos)) else {
                continue;
            };
            let candidate = if neighbor.source || neighbor.state.falling() {
                1
            } else {
                neighbor.state.level() + 1
            };
            if candidate <= MAX_LEVEL && best.is_none_or(|level| candidate < level) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Two or more true sources alongside and a solid or source floor.
    fn can_become_source<G: Grid + ?Sized>(grid: &G, pos: BlockPos, below: BlockKind) -> bool {
        if !matches!(below, BlockKind::Solid | BlockKind::LiquidSource) {
            return false;
        }
        let sources = Direction::HORIZONTAL
            .iter()
            .filter(|direction| grid.block_kind(direction.relative(pos)) == BlockKind::LiquidSource)
            .count();
        sources >= 2
    }

    /// Spreads into the open neighbors closest to a drop, or into every open
    /// neighbor if no drop is in range.
    fn spread<G: Grid + ?Sized>(
        &self,
        grid: &mut G,
        pos: BlockPos,
        cell: LiquidCell,
        out: &mut Resolution,
    ) {
        let mut candidates: SmallVec<[(BlockPos, bool, Option<u32>); 4]> = SmallVec::new();
        {
            let mut search =
                DownhillSearch::new(&*grid, self.search_radius).excluding(pos.x(), pos.z());
            for direction in Direction::HORIZONTAL {
                let neighbor = direction.relative(pos);
                if !grid.is_loaded(neighbor.x(), neighbor.z()) {
                    out.unloaded_skips += 1;
                    continue;
                }
                let kind = grid.block_kind(neighbor);
                let open = kind.is_replaceable();
                if !open && kind != BlockKind::LiquidFlowing {
                    continue;
                }
                candidates.push((neighbor, open, search.run(neighbor)));
            }
        }

        let nearest = candidates.iter().filter_map(|(_, _, distance)| *distance).min();
        let spread = LiquidCell::flowing(LiquidState::new(cell.state.level() + 1, false));
        for (neighbor, open, distance) in candidates {
            if open && (nearest.is_none() || distance == nearest) {
                Self::write(grid, neighbor, Some(spread), out);
                out.mark_around(neighbor);
            }
        }
    }

    fn write<G: Grid + ?Sized>(
        grid: &mut G,
        pos: BlockPos,
        cell: Option<LiquidCell>,
        out: &mut Resolution,
    ) {
        if grid.is_loaded(pos.x(), pos.z()) {
            write_liquid(grid, pos, cell);
            out.written.push(pos);
        } else {
            out.unloaded_skips += 1;
        }
    }
}
