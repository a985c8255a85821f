//! Workflow graph error types.

use thiserror::Error;

use crate::definition::TaskType;

/// Result type for workflow graph operations.
pub type DagResult<T> = Result<T, DagError>;

/// Errors that can occur while building, querying or editing a workflow graph.
///
/// All errors are fatal to the operation that produced them. Editing
/// operations check their preconditions before touching the task tree, so a
/// failed edit leaves the definition unchanged.
#[derive(Debug, Error)]
pub enum DagError {
    /// The execution trace is malformed.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// An edit would break the structure of the task tree.
    #[error("structural violation at {reference}: {message}")]
    Structural {
        /// Reference name of the task the edit targeted.
        reference: String,
        /// Error message.
        message: String,
    },

    /// No task, vertex or attempt exists for the given key.
    #[error("{what} not found: {key}")]
    NotFound {
        /// What was looked up (task, vertex, attempt).
        what: &'static str,
        /// The reference name or id that was requested.
        key: String,
    },

    /// A task coordinate must carry exactly one of `id` or `ref`.
    #[error("invalid task coordinate: exactly one of id or ref must be set")]
    InvalidCoordinate,

    /// An edge leaving a switch could not be mapped to any of its cases.
    #[error("could not resolve case value of {switch_ref} for successor {successor_ref}")]
    UnresolvedCaseValue {
        /// Reference of the switch task.
        switch_ref: String,
        /// Reference of the successor that matched no branch.
        successor_ref: String,
    },

    /// A synthetic terminal pseudo-task carries no execution identity.
    #[error("terminal task {0} cannot be retrieved")]
    TerminalAccess(String),

    /// A branch operation targeted a task of the wrong kind.
    #[error("task {reference} is {found}, expected {expected}")]
    UnexpectedTaskType {
        /// Reference name of the task.
        reference: String,
        /// Task type the operation requires.
        expected: &'static str,
        /// Task type that was found.
        found: TaskType,
    },

    /// No template exists for the requested task type.
    #[error("no template for task type {0}")]
    UnsupportedTemplate(TaskType),

    /// Graph configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DagError {
    /// Creates a structural violation for the given task reference.
    pub fn structural(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structural {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Creates a lookup failure.
    pub fn not_found(what: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            key: key.into(),
        }
    }
}
