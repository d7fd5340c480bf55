//! Test execution engine
//!
//! Provides the in-process sequential runner, the worker-pool coordinator,
//! and the worker side of the coordinator protocol.

mod pool;
mod protocol;
mod runner;
mod worker;

pub use pool::{ParallelExecutor, PoolConfig, ProcessSpawner};
pub use runner::TestRunner;
pub use worker::run_worker;
