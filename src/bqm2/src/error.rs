use thiserror::Error;

use crate::kvoption::KvError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidArgs(String),
    #[error(transparent)]
    Kv(#[from] KvError),
    #[error("reading vars file: {0}")]
    VarsFile(String),
    #[error(transparent)]
    Catalog(#[from] resource_catalog::CatalogError),
    #[error(transparent)]
    Planner(#[from] dependency_planner::DependencyPlannerError),
    #[error(transparent)]
    Executor(#[from] executor::ExecutorError),
    #[error(transparent)]
    Warehouse(#[from] resource_model::WarehouseError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid --effective-date-as-isoformat value '{0}'")]
    BadEffectiveDate(String),
}

impl AppError {
    /// Maps a failure class onto a distinct nonzero process exit code,
    /// so a caller scripting against this CLI can distinguish "cycle in
    /// the graph" from "retries exhausted" without parsing stderr.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Planner(dependency_planner::DependencyPlannerError::GraphCycle(_)) => 2,
            AppError::Catalog(resource_catalog::CatalogError::Template(
                template_model::TemplateError::Unmapped { .. } | template_model::TemplateError::Circular { .. },
            )) => 3,
            AppError::Catalog(resource_catalog::CatalogError::DuplicateKeyDivergent(_)) => 4,
            AppError::Planner(dependency_planner::DependencyPlannerError::DuplicateKey(_)) => 4,
            AppError::Executor(executor::ExecutorError::RetriesExhausted(_)) => 5,
            _ => 1,
        }
    }
}
