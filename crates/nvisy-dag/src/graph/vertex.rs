//! Vertex and edge payloads.

use serde::{Deserialize, Serialize};

use crate::definition::{SequencePath, TaskConfig, TaskType};
use crate::execution::{TaskAttempt, TaskStatus};

/// Data stored on each vertex of a [`TaskGraph`](super::TaskGraph).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vertex {
    /// The task this vertex draws, possibly synthetic.
    pub task_config: TaskConfig,
    /// The sequence owning the task (or, for synthetic vertices, the
    /// sequence of the task they were derived from).
    pub parent: SequencePath,
    /// Index of the task in `parent`. `None` when the vertex has no slot of
    /// its own in the definition.
    pub position: Option<usize>,
    /// All attempts for the vertex's effective reference, oldest first.
    pub task_results: Vec<TaskAttempt>,
    /// Status of the latest attempt, or the aggregate status of a
    /// placeholder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// Status counts of the tasks a placeholder stands for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tally: Option<Tally>,
    /// References a placeholder stands for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains_task_refs: Option<Vec<String>>,
}

impl Vertex {
    /// Returns the vertex's reference name.
    pub fn reference(&self) -> &str {
        self.task_config.reference()
    }

    /// Returns the type of the drawn task.
    pub fn task_type(&self) -> TaskType {
        self.task_config.task_type()
    }

    /// Returns whether the vertex has any execution status.
    pub fn is_executed(&self) -> bool {
        self.status.is_some()
    }
}

/// Overrides applied to vertices that summarize other tasks.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Summary {
    pub status: Option<TaskStatus>,
    pub tally: Option<Tally>,
    pub contains_task_refs: Option<Vec<String>>,
}

/// Data stored on each edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    /// Whether execution flowed along this edge.
    pub executed: bool,
    /// Case value of the branch, for edges leaving a switch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_value: Option<String>,
}

/// Aggregate status counts of collapsed tasks.
///
/// Tasks that are neither completed, pending nor canceled count as failed,
/// which is implied by `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub total: usize,
    pub success: usize,
    pub in_progress: usize,
    pub canceled: usize,
}

impl Tally {
    /// Counts one task status.
    pub fn record(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Completed => self.success += 1,
            status if status.is_pending() => self.in_progress += 1,
            TaskStatus::Canceled => self.canceled += 1,
            _ => {}
        }
    }

    /// Returns the number of tasks counted as failed.
    pub fn failed(&self) -> usize {
        self.total - self.success - self.in_progress - self.canceled
    }

    /// Derives the aggregate status.
    pub fn status(&self) -> TaskStatus {
        if self.success == self.total {
            TaskStatus::Completed
        } else if self.in_progress > 0 {
            TaskStatus::InProgress
        } else {
            TaskStatus::Failed
        }
    }
}

impl FromIterator<TaskStatus> for Tally {
    fn from_iter<I: IntoIterator<Item = TaskStatus>>(iter: I) -> Self {
        let mut tally = Self::default();
        for status in iter {
            tally.record(status);
        }
        tally
    }
}
