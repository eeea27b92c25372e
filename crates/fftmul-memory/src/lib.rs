//! # fftmul-memory
//!
//! Scratch memory management for the `fftmul` workspace.
//!
//! Provides a size-classed pool of `f64` transform workspaces shared by
//! concurrent multiplication contexts, with lock-free usage statistics.
#![warn(missing_docs)]

pub mod pool;
pub mod stats;

pub use pool::ScratchPool;
pub use stats::PoolStats;
