//! # Tide Core
//!
//! A tick-driven liquid engine for voxel grids. Liquid spreads from sources,
//! falls down open columns, seeks the nearest drop, decays when cut off, and
//! is meshed into double-sided surfaces once a region settles.

pub mod config;
pub mod diagnostics;
pub mod liquid;
pub mod mesh;
pub mod simulation;
pub mod ticks;
pub mod world;

pub use config::{ConfigError, LiquidConfig};
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot};
pub use simulation::LiquidSimulation;
