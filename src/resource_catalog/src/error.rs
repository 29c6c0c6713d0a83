use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("io error reading '{0}': {1}")]
    Io(String, std::io::Error),
    #[error("failed to parse '{0}': {1}")]
    Parse(String, String),
    #[error(transparent)]
    Template(#[from] template_model::TemplateError),
    #[error(transparent)]
    Explode(#[from] template_model::ExplodeError),
    #[error("'{0}' is missing required key '{1}'")]
    MissingRequiredKey(String, &'static str),
    #[error("resource key '{0}' was loaded twice with divergent definitions")]
    DuplicateKeyDivergent(String),
    #[error("'.localdata' file '{0}' has no sibling '.schema' file")]
    MissingSchema(String),
}
