//! The poll-based dependency-ordered scheduler and the four ways a run
//! can surface its plan: print it, graph it, dump rendered definitions
//! to disk, or actually execute it against a warehouse.

pub mod modes;
pub mod retry;
pub mod scheduler;

pub use modes::{dotml, dump, execution_order, show};
pub use scheduler::{execute, ExecutorConfig, ExecutorError};
