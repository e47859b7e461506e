//! Structured validation diagnostics.
//!
//! An [`Invalid`] is a single validation failure carrying a human-readable
//! message, the key path from the stanza root, and the source range of the
//! offending value when the loader provided one. Mapping validation batches
//! several failures into a [`ValidationErrors`] so users see more than one
//! problem per run.

use std::fmt;

use crate::value::{DocRange, PathKey};

/// A value failed a schema constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Invalid {
    pub message: String,
    /// Key path from the root of the validated stanza, outermost first.
    pub path: Vec<PathKey>,
    pub range: Option<DocRange>,
}

impl Invalid {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            range: None,
        }
    }

    pub fn with_range(mut self, range: Option<DocRange>) -> Self {
        if self.range.is_none() {
            self.range = range;
        }
        self
    }

    /// Prefix a key onto the path as the error propagates outward.
    pub fn prepend(mut self, key: PathKey) -> Self {
        self.path.insert(0, key);
        self
    }

    /// The path rendered like `wifi->manual_ip->gateway`.
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join("->")
    }
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.path.is_empty() {
            write!(f, " [{}]", self.path_string())?;
        }
        if let Some(range) = &self.range {
            write!(f, " (at {})", range)?;
        }
        Ok(())
    }
}

impl std::error::Error for Invalid {}

/// A batch of validation failures from one schema pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors(pub Vec<Invalid>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: Invalid) {
        self.0.push(error);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<Invalid> for ValidationErrors {
    fn from(error: Invalid) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
