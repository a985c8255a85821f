//! Task attempt records.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display};

use crate::definition::TaskType;

/// Status of a single task attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Scheduled,
    InProgress,
    Completed,
    CompletedWithErrors,
    Failed,
    FailedWithTerminalError,
    Canceled,
    TimedOut,
    Skipped,
}

impl TaskStatus {
    /// Returns whether the attempt has not reached a terminal state.
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress)
    }
}

/// One attempt of a task, as reported by the workflow server.
///
/// A task that was retried appears once per attempt under the same reference
/// name. The synthetic start and final bubbles are represented by `TERMINAL`
/// attempts without a task id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAttempt {
    /// Server-assigned task id. Absent for terminal pseudo-attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Reference name of the task in the definition.
    pub reference_task_name: String,
    /// Reported task type.
    pub task_type: TaskType,
    /// Task definition name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_def_name: Option<String>,
    /// Attempt status.
    pub status: TaskStatus,
    /// Reference of the fork that spawned this task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_reference_name: Option<String>,
    /// Position of the attempt in the execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    /// Number of retries preceding this attempt.
    #[serde(default)]
    pub retry_count: u32,
    /// Loop iteration this attempt belongs to.
    #[serde(default)]
    pub iteration: u32,
    /// Start time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// End time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_for_incompletion: Option<String>,
    /// Worker that ran the attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    /// Task input.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub input_data: Map<String, Value>,
    /// Task output.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub output_data: Map<String, Value>,
    /// References spawned by this dynamic fork, filled in while binding.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub forked_task_refs: Option<IndexSet<String>>,
}

impl TaskAttempt {
    /// Creates an attempt record.
    pub fn new(
        task_id: impl Into<String>,
        reference_task_name: impl Into<String>,
        task_type: TaskType,
        status: TaskStatus,
    ) -> Self {
        Self {
            task_id: Some(task_id.into()),
            reference_task_name: reference_task_name.into(),
            task_type,
            task_def_name: None,
            status,
            parent_task_reference_name: None,
            seq: None,
            retry_count: 0,
            iteration: 0,
            start_time: None,
            end_time: None,
            reason_for_incompletion: None,
            worker_id: None,
            input_data: Map::new(),
            output_data: Map::new(),
            forked_task_refs: None,
        }
    }

    /// Creates a pseudo-attempt for a synthetic start or final bubble.
    pub fn terminal(reference_task_name: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            task_id: None,
            ..Self::new("", reference_task_name, TaskType::Terminal, status)
        }
    }

    /// Sets the reference of the fork that spawned this attempt.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_task_reference_name = Some(parent.into());
        self
    }

    /// Sets the task definition name.
    pub fn with_def_name(mut self, name: impl Into<String>) -> Self {
        self.task_def_name = Some(name.into());
        self
    }

    /// Returns whether this is a terminal pseudo-attempt.
    pub fn is_terminal(&self) -> bool {
        self.task_type == TaskType::Terminal
    }
}
