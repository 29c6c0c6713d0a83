pub mod builder;
pub mod cycles;

pub use builder::{build_dependency_graph, DependencyGraph, DependencyPlannerError};
pub use cycles::find_cycles;
