//! # Tide Utils
//!
//! Small value types shared by the liquid engine and its host.

pub mod direction;
pub mod math;
pub mod types;

pub use direction::Direction;
pub use types::{BlockPos, CHUNK_WIDTH, ChunkPos};
