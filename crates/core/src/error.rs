// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for bl-core operations.

use thiserror::Error;

/// All possible errors that can occur in bl-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("issue not found: {0}")]
    IssueNotFound(String),

    #[error("duplicate issue id: {0}")]
    DuplicateId(String),

    #[error("dependency already exists: {issue_id} {dep_type} {depends_on_id}")]
    DuplicateEdge {
        issue_id: String,
        depends_on_id: String,
        dep_type: String,
    },

    #[error("invalid resolution: '{0}'\n  hint: valid resolutions are: done, wontfix, duplicate")]
    InvalidResolution(String),

    #[error("invalid status: '{0}'\n  hint: valid statuses are: open, in_progress, closed")]
    InvalidStatus(String),

    #[error("invalid issue type: '{0}'\n  hint: valid types are: task, bug, feature, epic")]
    InvalidIssueType(String),

    #[error(
        "invalid dependency type: '{0}'\n  hint: valid types are: blocks, parent_child, related"
    )]
    InvalidDepType(String),

    #[error("invalid prefix: must be 2+ lowercase alphanumeric with at least one letter")]
    InvalidPrefix,

    #[error("line {line}: parse error: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("{op}: {source}")]
    Context {
        op: String,
        #[source]
        source: Box<Error>,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

impl Error {
    /// Wraps this error with the name of the operation that failed.
    pub fn context(self, op: impl Into<String>) -> Self {
        Error::Context {
            op: op.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through any [`Error::Context`] layers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for caller errors: bad field values that are never worth retrying.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.root(),
            Error::Validation(_)
                | Error::InvalidStatus(_)
                | Error::InvalidIssueType(_)
                | Error::InvalidDepType(_)
                | Error::InvalidResolution(_)
                | Error::InvalidPrefix
        )
    }

    /// True for failures of the underlying storage media.
    pub fn is_io(&self) -> bool {
        matches!(self.root(), Error::Database(_) | Error::Io(_))
    }

    /// True if the error reports a missing issue.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::IssueNotFound(_))
    }
}

/// A specialized Result type for bl-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Attaches operation context to the error of a [`Result`].
pub(crate) trait ResultExt<T> {
    fn context(self, op: impl FnOnce() -> String) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, op: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|e| e.into().context(op()))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
