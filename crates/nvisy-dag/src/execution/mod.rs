//! Execution trace types.
//!
//! An execution is a run of a workflow definition together with the attempts
//! of every task that has been scheduled so far:
//! - [`Execution`]: Run status and the definition it was started from
//! - [`TaskAttempt`]: One attempt of one task
//! - [`ExecutionIndex`]: Attempts indexed by reference name and id

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::definition::WorkflowDef;

mod attempt;
mod index;

pub use attempt::{TaskAttempt, TaskStatus};
pub use index::ExecutionIndex;

/// Overall status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
    TimedOut,
    Terminated,
    Paused,
}

/// A workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    /// Run id.
    #[serde(default)]
    pub workflow_id: String,
    /// Run status.
    pub status: WorkflowStatus,
    /// Definition the run was started from.
    pub workflow_definition: WorkflowDef,
    /// Start time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// End time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_for_incompletion: Option<String>,
}

/// A workflow run together with its task attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionAndTasks {
    /// The run.
    pub execution: Execution,
    /// Task attempts in arrival order.
    #[serde(default)]
    pub tasks: Vec<TaskAttempt>,
}
