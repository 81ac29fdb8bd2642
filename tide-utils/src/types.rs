// Wrapper types making it harder to accidentaly mix up block and chunk coordinates.

use std::fmt::{self, Display};

use crate::math::{Vector2, Vector3};

/// Width of a chunk column along x and z, in blocks.
pub const CHUNK_WIDTH: i32 = 16;

/// A chunk column position. The chunk `z` is stored in the vector's `y` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPos(pub Vector2<i32>);

/// A block position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos(pub Vector3<i32>);

impl ChunkPos {
    /// Creates a chunk position from chunk coordinates.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self(Vector2::new(x, z))
    }

    /// The chunk x coordinate.
    #[must_use]
    pub const fn x(self) -> i32 {
        self.0.x
    }

    /// The chunk z coordinate.
    #[must_use]
    pub const fn z(self) -> i32 {
        self.0.y
    }

    /// Returns the chunk containing the given block column.
    #[must_use]
    pub const fn from_block_xz(x: i32, z: i32) -> Self {
        Self::new(x >> 4, z >> 4)
    }

    /// Returns the world x/z of this chunk's minimum corner.
    #[must_use]
    pub const fn min_block_xz(self) -> (i32, i32) {
        (self.x() * CHUNK_WIDTH, self.z() * CHUNK_WIDTH)
    }

    /// Returns the chunk offset by the given amount of chunks.
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x() + dx, self.z() + dz)
    }
}

impl Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x(), self.z())
    }
}

impl BlockPos {
    /// Creates a block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// The block x coordinate.
    #[must_use]
    pub const fn x(self) -> i32 {
        self.0.x
    }

    /// The block y coordinate.
    #[must_use]
    pub const fn y(self) -> i32 {
        self.0.y
    }

    /// The block z coordinate.
    #[must_use]
    pub const fn z(self) -> i32 {
        self.0.z
    }

    /// Returns a position offset by the given amounts.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.0.x + dx, self.0.y + dy, self.0.z + dz)
    }

    /// The position directly above.
    #[must_use]
    pub const fn above(self) -> Self {
        self.offset(0, 1, 0)
    }

    /// The position directly below.
    #[must_use]
    pub const fn below(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// The chunk column containing this position.
    #[must_use]
    pub const fn chunk_pos(self) -> ChunkPos {
        ChunkPos::from_block_xz(self.0.x, self.0.z)
    }

    /// The x/z coordinates inside the containing chunk, each in `0..16`.
    #[must_use]
    pub const fn local_xz(self) -> (usize, usize) {
        ((self.0.x & 15) as usize, (self.0.z & 15) as usize)
    }
}

impl Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0.x, self.0.y, self.0.z)
    }
}
