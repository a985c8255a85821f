//! Indexes of task attempts by reference name and by id.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use super::attempt::{TaskAttempt, TaskStatus};
use super::WorkflowStatus;
use crate::definition::TaskType;
use crate::error::{DagError, DagResult};
use crate::{FINAL_REF, START_REF};

/// Tracing target for execution binding.
const TRACING_TARGET: &str = "nvisy_dag::execution";

/// Attempt history of one execution, indexed for graph construction.
///
/// References are kept in first-arrival order and each reference keeps its
/// attempts in arrival order, so the last attempt is the authoritative one.
#[derive(Debug, Clone, Default)]
pub struct ExecutionIndex {
    /// Attempts keyed by reference name.
    by_ref: IndexMap<String, Vec<TaskAttempt>>,
    /// Task id to (reference name, attempt position).
    by_id: HashMap<String, (String, usize)>,
    /// Whether a user-defined terminate task ran.
    terminated: bool,
}

impl ExecutionIndex {
    /// Creates an empty index, used for definition-only graphs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the attempts of an execution.
    ///
    /// The first pass indexes every attempt. The second pass records, on the
    /// latest attempt of each fork, the set of references it spawned. The
    /// start bubble is always marked completed, and the final bubble is
    /// marked completed when the run completed without a terminate task.
    pub fn bind(status: WorkflowStatus, attempts: Vec<TaskAttempt>) -> DagResult<Self> {
        let mut index = Self::new();

        let spawned: Vec<(String, String)> = attempts
            .iter()
            .filter(|attempt| attempt.task_type != TaskType::Join)
            .filter_map(|attempt| {
                let parent = attempt.parent_task_reference_name.clone()?;
                Some((parent, attempt.reference_task_name.clone()))
            })
            .collect();

        for attempt in attempts {
            if attempt.task_type == TaskType::Terminate {
                index.terminated = true;
            }
            index.push(attempt);
        }

        for (parent, child) in spawned {
            let parent_attempt = index
                .by_ref
                .get_mut(&parent)
                .and_then(|attempts| attempts.last_mut())
                .ok_or_else(|| {
                    DagError::Invariant(format!(
                        "task {child} names parent {parent}, which has no attempt"
                    ))
                })?;

            parent_attempt
                .forked_task_refs
                .get_or_insert_with(IndexSet::new)
                .insert(child);
        }

        index.push(TaskAttempt::terminal(START_REF, TaskStatus::Completed));
        if status == WorkflowStatus::Completed && !index.terminated {
            index.push(TaskAttempt::terminal(FINAL_REF, TaskStatus::Completed));
        }

        tracing::debug!(
            target: TRACING_TARGET,
            references = index.by_ref.len(),
            attempts = index.by_id.len(),
            terminated = index.terminated,
            "Bound execution attempts"
        );

        Ok(index)
    }

    /// Appends an attempt.
    pub fn push(&mut self, attempt: TaskAttempt) {
        let reference = attempt.reference_task_name.clone();
        let attempts = self.by_ref.entry(reference.clone()).or_default();

        if !attempt.is_terminal() {
            if let Some(task_id) = &attempt.task_id {
                self.by_id
                    .insert(task_id.clone(), (reference, attempts.len()));
            }
        }

        attempts.push(attempt);
    }

    /// Returns whether no attempt has been recorded.
    pub fn is_empty(&self) -> bool {
        self.by_ref.is_empty()
    }

    /// Returns whether a user-defined terminate task ran.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Returns every reference name with attempts, in first-arrival order.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.by_ref.keys().map(String::as_str)
    }

    /// Returns all attempts of a reference, oldest first.
    pub fn attempts(&self, reference: &str) -> &[TaskAttempt] {
        self.by_ref
            .get(reference)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the latest attempt of a reference, terminal bubbles included.
    pub fn latest(&self, reference: &str) -> Option<&TaskAttempt> {
        self.attempts(reference).last()
    }

    /// Returns the latest attempt of a real task.
    ///
    /// Returns `None` when the reference has not run yet.
    pub fn latest_task(&self, reference: &str) -> DagResult<Option<&TaskAttempt>> {
        match self.latest(reference) {
            Some(attempt) if attempt.is_terminal() => {
                Err(DagError::TerminalAccess(reference.to_owned()))
            }
            other => Ok(other),
        }
    }

    /// Returns the attempt with the given task id.
    pub fn by_id(&self, task_id: &str) -> DagResult<&TaskAttempt> {
        let (reference, position) = self
            .by_id
            .get(task_id)
            .ok_or_else(|| DagError::not_found("task id", task_id))?;

        let attempt = self
            .by_ref
            .get(reference)
            .and_then(|attempts| attempts.get(*position))
            .ok_or_else(|| DagError::not_found("task id", task_id))?;

        if attempt.is_terminal() {
            return Err(DagError::TerminalAccess(reference.clone()));
        }
        Ok(attempt)
    }

    /// Returns the references spawned by a fork, if any were recorded.
    pub fn forked_refs(&self, reference: &str) -> Option<&IndexSet<String>> {
        self.latest(reference)?.forked_task_refs.as_ref()
    }
}
