//! Execution-readiness checks for workflow definitions.
//!
//! Graph building and editing tolerate transient authoring states such as an
//! empty loop body. These checks are the explicit gate a definition passes
//! before it is submitted for execution.

use std::collections::HashSet;

use super::task::{TaskConfig, TaskKind};

/// Validation errors for workflow definitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Two tasks share a reference name.
    #[error("duplicate task reference name: {0}")]
    DuplicateReference(String),
    /// A fork is not immediately followed by a join.
    #[error("fork {0} must be followed by a join")]
    ForkWithoutJoin(String),
    /// A do-while loop has no body.
    #[error("do-while {0} has an empty loop body")]
    EmptyLoop(String),
    /// A switch has neither cases nor a default branch.
    #[error("switch {0} has no branches")]
    EmptySwitch(String),
    /// A generated diagram-only task appears in the definition.
    #[error("task {0} has a synthetic type and cannot be executed")]
    SyntheticTask(String),
}

/// Validates a task sequence and everything nested in it.
pub fn validate_tasks(tasks: &[TaskConfig]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    validate_sequence(tasks, &mut seen)
}

fn validate_sequence<'a>(
    tasks: &'a [TaskConfig],
    seen: &mut HashSet<&'a str>,
) -> Result<(), ValidationError> {
    for (index, task) in tasks.iter().enumerate() {
        let reference = task.reference();
        if !seen.insert(reference) {
            return Err(ValidationError::DuplicateReference(reference.to_owned()));
        }

        if task.task_type().is_synthetic() {
            return Err(ValidationError::SyntheticTask(reference.to_owned()));
        }

        if task.kind.is_fork() && !tasks.get(index + 1).is_some_and(|next| next.kind.is_join()) {
            return Err(ValidationError::ForkWithoutJoin(reference.to_owned()));
        }

        match &task.kind {
            TaskKind::DoWhile(do_while) if do_while.loop_over.is_empty() => {
                return Err(ValidationError::EmptyLoop(reference.to_owned()));
            }
            TaskKind::Switch(switch) | TaskKind::Decision(switch)
                if switch.decision_cases.is_empty() && switch.default_case.is_empty() =>
            {
                return Err(ValidationError::EmptySwitch(reference.to_owned()));
            }
            _ => {}
        }

        for sequence in task.kind.sequences() {
            validate_sequence(sequence, seen)?;
        }
    }

    Ok(())
}
