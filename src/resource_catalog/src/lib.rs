//! Dispatches descriptor files by suffix to the right resource builder:
//! runs the template exploder and evaluator over each, validates the
//! required keys, and assembles the full resource set for a folder,
//! including the dataset resources it implies.

pub mod build;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod schema;

pub use build::build_local_data_resource;
pub use error::CatalogError;
pub use registry::{load_folder, LoaderContext};
