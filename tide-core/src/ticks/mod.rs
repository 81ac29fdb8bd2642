//! Dirty-cell bookkeeping and the per-tick propagation pass.

mod dirty_set;
mod scheduler;

pub use dirty_set::{DirtySet, Insert};
pub use scheduler::{PropagationScheduler, TickReport};
