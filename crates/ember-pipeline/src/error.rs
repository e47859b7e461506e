use ember_config::ValidationErrors;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("unknown component '{0}'")]
    UnknownComponent(String),

    #[error("component '{domain}' requires '{dependency}', which is not configured")]
    MissingDependency { domain: String, dependency: String },

    #[error("component '{domain}' cannot be used together with '{other}'")]
    Conflict { domain: String, other: String },

    #[error("id '{name}' is declared as {declared} but used as {used}")]
    IdTypeMismatch {
        name: String,
        declared: String,
        used: String,
    },

    #[error(transparent)]
    Codegen(#[from] ember_codegen::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
