//! Placeholder vertices standing in for collapsed tasks.
//!
//! A dynamic fork with too many (or no recorded) children is drawn as a
//! single stack vertex, and an executed loop is drawn as a single stack of
//! all its iterations. Both carry a [`Tally`] of the statuses they hide.

use indexmap::IndexSet;

use super::vertex::{Summary, Tally};
use crate::definition::{
    DoWhileTask, DynamicForkTask, EventTask, ForkTask, JoinTask, SubWorkflowTask, SwitchTask,
    TaskConfig, TaskKind, TaskType,
};
use crate::error::{DagError, DagResult};
use crate::execution::{ExecutionIndex, TaskAttempt};

/// Suffix of the reference of a collapsed dynamic fork placeholder.
pub const DF_PLACEHOLDER_SUFFIX: &str = "_DF_CHILDREN_PLACEHOLDER";
/// Suffix of the reference of a collapsed loop placeholder.
pub const LOOP_PLACEHOLDER_SUFFIX: &str = "_LOOP_CHILDREN_PLACEHOLDER";
/// Suffix of the reference of a loop terminator.
pub const LOOP_END_SUFFIX: &str = "-END";
/// Separator between a loop body reference and its iteration number.
pub const ITERATION_SEPARATOR: &str = "__";

/// A synthetic vertex and the execution summary it carries.
#[derive(Debug, Clone)]
pub(crate) struct Placeholder {
    pub config: TaskConfig,
    pub summary: Summary,
}

/// Builds the placeholder for a collapsed dynamic fork.
///
/// Until the fork has run the placeholder carries no status.
pub(crate) fn dynamic_fork(
    index: &ExecutionIndex,
    fork_ref: &str,
    forked: Option<&IndexSet<String>>,
) -> DagResult<Placeholder> {
    let config = TaskConfig::named(
        format!("{fork_ref}{DF_PLACEHOLDER_SUFFIX}"),
        TaskKind::DfChildrenPlaceholder,
    );

    if index.latest_task(fork_ref)?.is_none() {
        return Ok(Placeholder {
            config,
            summary: Summary::default(),
        });
    }

    let refs: Vec<String> = forked.into_iter().flatten().cloned().collect();
    let tally = tally(index, &refs)?;
    Ok(Placeholder {
        config,
        summary: Summary {
            status: Some(tally.status()),
            tally: Some(tally),
            contains_task_refs: Some(refs),
        },
    })
}

/// Builds the placeholder for the iterations of an executed loop.
pub(crate) fn loop_iterations(
    index: &ExecutionIndex,
    loop_ref: &str,
    refs: Vec<String>,
) -> DagResult<Placeholder> {
    let tally = tally(index, &refs)?;
    Ok(Placeholder {
        config: TaskConfig::named(
            format!("{loop_ref}{LOOP_PLACEHOLDER_SUFFIX}"),
            TaskKind::LoopChildrenPlaceholder,
        ),
        summary: Summary {
            status: Some(tally.status()),
            tally: Some(tally),
            contains_task_refs: Some(refs),
        },
    })
}

/// Reconstructs the task configuration of a spawned dynamic fork child from
/// its latest attempt.
///
/// A spawned fork that itself has a parent is a nested dynamic fork.
pub(crate) fn child_config(attempt: &TaskAttempt) -> TaskConfig {
    let kind = match &attempt.task_type {
        TaskType::Fork if attempt.parent_task_reference_name.is_some() => {
            TaskKind::ForkJoinDynamic(DynamicForkTask::default())
        }
        other => empty_kind(other),
    };

    let name = attempt
        .task_def_name
        .clone()
        .unwrap_or_else(|| attempt.reference_task_name.clone());
    TaskConfig::new(name, attempt.reference_task_name.clone(), kind)
}

fn tally(index: &ExecutionIndex, refs: &[String]) -> DagResult<Tally> {
    refs.iter()
        .map(|reference| {
            index
                .latest_task(reference)?
                .map(|attempt| attempt.status)
                .ok_or_else(|| DagError::not_found("attempt", reference.as_str()))
        })
        .collect()
}

/// Returns a payload-free kind for a reported task type.
fn empty_kind(task_type: &TaskType) -> TaskKind {
    match task_type {
        TaskType::Http => TaskKind::Http,
        TaskType::Inline => TaskKind::Inline,
        TaskType::Wait => TaskKind::Wait,
        TaskType::Terminate => TaskKind::Terminate,
        TaskType::Join => TaskKind::Join(JoinTask::default()),
        TaskType::ExclusiveJoin => TaskKind::ExclusiveJoin(JoinTask::default()),
        TaskType::SubWorkflow => TaskKind::SubWorkflow(SubWorkflowTask::default()),
        TaskType::Event => TaskKind::Event(EventTask::default()),
        TaskType::SetVariable => TaskKind::SetVariable,
        TaskType::JsonJqTransform => TaskKind::JsonJqTransform,
        TaskType::Human => TaskKind::Human,
        TaskType::ForkJoin | TaskType::Fork => TaskKind::ForkJoin(ForkTask::default()),
        TaskType::ForkJoinDynamic => TaskKind::ForkJoinDynamic(DynamicForkTask::default()),
        TaskType::Switch => TaskKind::Switch(SwitchTask::default()),
        TaskType::Decision => TaskKind::Decision(SwitchTask::default()),
        TaskType::DoWhile => TaskKind::DoWhile(DoWhileTask::default()),
        TaskType::Simple
        | TaskType::Terminal
        | TaskType::DoWhileEnd
        | TaskType::DfChildrenPlaceholder
        | TaskType::LoopChildrenPlaceholder
        | TaskType::Other(_) => TaskKind::Simple,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{TaskStatus, WorkflowStatus};

    fn index(attempts: Vec<TaskAttempt>) -> ExecutionIndex {
        ExecutionIndex::bind(WorkflowStatus::Running, attempts).unwrap()
    }

    #[test]
    fn test_unexecuted_fork_placeholder_has_no_status() {
        let index = ExecutionIndex::new();
        let placeholder = dynamic_fork(&index, "df", None).unwrap();

        assert_eq!(placeholder.config.reference(), "df_DF_CHILDREN_PLACEHOLDER");
        assert_eq!(placeholder.summary, Summary::default());
    }

    #[test]
    fn test_fork_placeholder_tallies_children() {
        let index = index(vec![
            TaskAttempt::new("1", "df", TaskType::Fork, TaskStatus::Completed),
            TaskAttempt::new("2", "c1", TaskType::Simple, TaskStatus::Completed).with_parent("df"),
            TaskAttempt::new("3", "c2", TaskType::Simple, TaskStatus::Failed).with_parent("df"),
        ]);
        let placeholder = dynamic_fork(&index, "df", index.forked_refs("df")).unwrap();

        let tally = placeholder.summary.tally.unwrap();
        assert_eq!(tally.total, 2);
        assert_eq!(tally.success, 1);
        assert_eq!(placeholder.summary.status, Some(TaskStatus::Failed));
        assert_eq!(
            placeholder.summary.contains_task_refs,
            Some(vec!["c1".to_owned(), "c2".to_owned()])
        );
    }

    #[test]
    fn test_executed_fork_without_children() {
        let index = index(vec![TaskAttempt::new(
            "1",
            "df",
            TaskType::Fork,
            TaskStatus::Completed,
        )]);
        let placeholder = dynamic_fork(&index, "df", None).unwrap();

        assert_eq!(placeholder.summary.tally, Some(Tally::default()));
        assert_eq!(placeholder.summary.status, Some(TaskStatus::Completed));
    }

    #[test]
    fn test_loop_placeholder() {
        let index = index(vec![
            TaskAttempt::new("1", "body__1", TaskType::Simple, TaskStatus::Completed),
            TaskAttempt::new("2", "body__2", TaskType::Simple, TaskStatus::InProgress),
        ]);
        let placeholder =
            loop_iterations(&index, "loop", vec!["body__1".into(), "body__2".into()]).unwrap();

        assert_eq!(
            placeholder.config.reference(),
            "loop_LOOP_CHILDREN_PLACEHOLDER"
        );
        assert_eq!(placeholder.summary.status, Some(TaskStatus::InProgress));
    }

    #[test]
    fn test_child_config_from_attempt() {
        let nested = TaskAttempt::new("1", "inner", TaskType::Fork, TaskStatus::Completed)
            .with_parent("outer");
        assert_eq!(child_config(&nested).task_type(), TaskType::ForkJoinDynamic);

        let top = TaskAttempt::new("2", "outer", TaskType::Fork, TaskStatus::Completed);
        assert_eq!(child_config(&top).task_type(), TaskType::ForkJoin);

        let encode = TaskType::Other("encode_video".into());
        let custom = TaskAttempt::new("3", "enc_1", encode, TaskStatus::Completed)
            .with_def_name("encode_video");
        let config = child_config(&custom);
        assert_eq!(config.task_type(), TaskType::Simple);
        assert_eq!(config.name, "encode_video");
        assert_eq!(config.reference(), "enc_1");
    }
}
