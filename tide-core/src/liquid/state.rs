//! Packing of a liquid cell's level and falling flag into one metadata byte.
//!
//! Layout: bits 0-3 hold the level, bit 4 the falling flag, bits 5-7 are
//! ignored. Levels 8-15 can appear in corrupt or legacy data and are clamped.

use crate::world::BlockKind;

/// The highest level a flowing cell can have. Cells at this level never spread.
pub const MAX_LEVEL: u8 = 7;

/// Height of a source or falling cell, slightly below a full block.
pub const FULL_HEIGHT: f32 = 8.0 / 9.0;

/// Lower bound for the height of a flowing cell so it always stays visible.
pub const MIN_HEIGHT: f32 = 0.125;

const LEVEL_MASK: u8 = 0x0F;
const FALLING_BIT: u8 = 0x10;

/// The decoded state of a liquid cell.
///
/// The level is always within `0..=MAX_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LiquidState {
    level: u8,
    falling: bool,
}

impl LiquidState {
    /// The state every source reports.
    pub const SOURCE: Self = Self {
        level: 0,
        falling: false,
    };

    /// Creates a state, clamping `level` to `0..=MAX_LEVEL`.
    #[must_use]
    pub const fn new(level: u8, falling: bool) -> Self {
        Self {
            level: if level > MAX_LEVEL { MAX_LEVEL } else { level },
            falling,
        }
    }

    /// The spread distance from the nearest supply, 0 being strongest.
    #[must_use]
    pub const fn level(self) -> u8 {
        self.level
    }

    /// Whether the cell is part of a falling column.
    #[must_use]
    pub const fn falling(self) -> bool {
        self.falling
    }

    /// Returns a copy with a different (clamped) level.
    #[must_use]
    pub const fn with_level(self, level: u8) -> Self {
        Self::new(level, self.falling)
    }

    /// Returns a copy with a different falling flag.
    #[must_use]
    pub const fn with_falling(self, falling: bool) -> Self {
        Self::new(self.level, falling)
    }

    /// Packs the state into a metadata byte.
    #[must_use]
    pub const fn encode(self) -> u8 {
        encode(self.level, self.falling)
    }
}

/// Unpacks a metadata byte, clamping out-of-range levels.
#[must_use]
pub const fn decode(raw: u8) -> LiquidState {
    LiquidState::new(raw & LEVEL_MASK, raw & FALLING_BIT != 0)
}

/// Packs a level and falling flag, clamping the level first.
#[must_use]
pub const fn encode(level: u8, falling: bool) -> u8 {
    let level = if level > MAX_LEVEL { MAX_LEVEL } else { level };
    if falling { level | FALLING_BIT } else { level }
}

/// Reads only the falling flag of a metadata byte.
#[must_use]
pub const fn is_falling(raw: u8) -> bool {
    raw & FALLING_BIT != 0
}

/// Returns the rendered surface height of a cell as a fraction of a block.
///
/// Sources and falling cells are always [`FULL_HEIGHT`]. Flowing cells get
/// lower as their level rises but never below [`MIN_HEIGHT`]. Non-liquid
/// kinds occupy a whole block.
#[must_use]
pub fn height_fraction(kind: BlockKind, state: LiquidState) -> f32 {
    match kind {
        BlockKind::LiquidSource => FULL_HEIGHT,
        BlockKind::LiquidFlowing if state.falling() => FULL_HEIGHT,
        BlockKind::LiquidFlowing => {
            (f32::from(MAX_LEVEL + 1 - state.level()) / 9.0).max(MIN_HEIGHT)
        }
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_clamps_level() {
        for raw in 0..=u8::MAX {
            let state = decode(raw);
            assert!(state.level() <= MAX_LEVEL, "raw {raw:#04x}");
        }
        assert_eq!(decode(0x0C).level(), MAX_LEVEL);
        assert_eq!(decode(0x03).level(), 3);
    }

    #[test]
    fn test_encode_clamps_level() {
        assert_eq!(encode(200, false), MAX_LEVEL);
        assert_eq!(decode(encode(200, true)), LiquidState::new(MAX_LEVEL, true));
    }

    #[test]
    fn test_is_falling() {
        assert!(is_falling(encode(4, true)));
        assert!(!is_falling(encode(4, false)));
        assert!(is_falling(0xF0));
    }

    #[test]
    fn test_upper_bits_are_ignored() {
        assert_eq!(decode(0xE2), LiquidState::new(2, false));
    }

    #[test]
    fn test_height_fraction_full_for_source_and_falling() {
        assert_eq!(height_fraction(BlockKind::LiquidSource, decode(0x07)), FULL_HEIGHT);
        for level in 0..=MAX_LEVEL {
            let state = LiquidState::new(level, true);
            assert_eq!(height_fraction(BlockKind::LiquidFlowing, state), FULL_HEIGHT);
        }
    }

    #[test]
    fn test_height_fraction_decreases_with_level() {
        let mut previous = f32::INFINITY;
        for level in 0..=MAX_LEVEL {
            let height = height_fraction(BlockKind::LiquidFlowing, LiquidState::new(level, false));
            assert!(height > 0.0 && height <= 1.0);
            assert!(height <= previous);
            previous = height;
        }
        assert_eq!(
            height_fraction(BlockKind::LiquidFlowing, LiquidState::new(MAX_LEVEL, false)),
            MIN_HEIGHT
        );
    }
}
