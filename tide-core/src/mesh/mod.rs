//! Liquid surface meshing.
//!
//! Meshing only ever reads a [`RegionSnapshot`](crate::world::RegionSnapshot),
//! so it can run on other threads while the next tick mutates the grid.

mod buffer;
mod generator;

pub use buffer::{LiquidVertex, LIQUID_TINT, TriangleBuffer};
pub use generator::{generate, generate_all};
