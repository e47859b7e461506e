//! Code-generation errors.

use thiserror::Error;

use crate::scheduler::StalledTask;

/// Result type for code-generation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while scheduling generation tasks and accumulating output.
#[derive(Debug, Error)]
pub enum Error {
    #[error("id '{0}' is already registered")]
    DuplicateId(String),

    #[error("id '{0}' collides with a reserved name")]
    ReservedId(String),

    #[error("couldn't find id '{0}'")]
    UnresolvedId(String),

    #[error("circular dependency detected; remaining tasks: {}",
            .remaining.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "))]
    Deadlock { remaining: Vec<StalledTask> },

    #[error("library '{name}': conflicting repositories '{existing}' and '{new}'")]
    LibraryRepositoryConflict {
        name: String,
        existing: String,
        new: String,
    },

    #[error("library '{name}': conflicting version pins '{existing}' and '{new}'")]
    LibraryVersionConflict {
        name: String,
        existing: String,
        new: String,
    },

    #[error("component '{domain}' failed during code generation: {message}")]
    Component { domain: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn component(domain: &str, message: impl Into<String>) -> Self {
        Error::Component {
            domain: domain.to_string(),
            message: message.into(),
        }
    }
}
