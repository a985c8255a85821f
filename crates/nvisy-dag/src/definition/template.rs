//! Starter configurations for newly inserted tasks.

use serde_json::json;

use super::kind::TaskType;
use super::task::{
    DoWhileTask, DynamicForkTask, EventTask, ForkTask, JoinTask, SubWorkflowTask, SwitchTask,
    TaskConfig, TaskKind,
};
use crate::error::{DagError, DagResult};

/// Builds the task sequence inserted for a new task of `task_type`.
///
/// Forks expand to the fork followed by its join (`<reference>_join`), so a
/// committed insertion always keeps forks paired. Synthetic and
/// execution-only types have no template.
pub fn instantiate(task_type: &TaskType, reference: &str) -> DagResult<Vec<TaskConfig>> {
    let task = match task_type {
        TaskType::Simple => TaskConfig::named(reference, TaskKind::Simple),
        TaskType::Http => TaskConfig::named(reference, TaskKind::Http).with_input(
            "http_request",
            json!({ "uri": "https://", "method": "GET", "connectionTimeOut": 3000, "readTimeOut": 3000 }),
        ),
        TaskType::Inline => TaskConfig::named(reference, TaskKind::Inline)
            .with_input("evaluatorType", "graaljs")
            .with_input("expression", "(function () { return $.value; })();"),
        TaskType::Wait => {
            TaskConfig::named(reference, TaskKind::Wait).with_input("duration", "10 seconds")
        }
        TaskType::Terminate => TaskConfig::named(reference, TaskKind::Terminate)
            .with_input("terminationStatus", "COMPLETED")
            .with_input("terminationReason", ""),
        TaskType::Join => TaskConfig::named(reference, JoinTask::default()),
        TaskType::ExclusiveJoin => {
            TaskConfig::named(reference, TaskKind::ExclusiveJoin(JoinTask::default()))
        }
        TaskType::SubWorkflow => TaskConfig::named(
            reference,
            TaskKind::SubWorkflow(SubWorkflowTask {
                sub_workflow_param: json!({ "name": "", "version": 1 }),
            }),
        ),
        TaskType::Event => TaskConfig::named(
            reference,
            TaskKind::Event(EventTask {
                sink: Some("conductor".into()),
            }),
        ),
        TaskType::SetVariable => TaskConfig::named(reference, TaskKind::SetVariable),
        TaskType::JsonJqTransform => TaskConfig::named(reference, TaskKind::JsonJqTransform)
            .with_input("queryExpression", "."),
        TaskType::Human => TaskConfig::named(reference, TaskKind::Human),
        TaskType::ForkJoin => {
            return Ok(vec![
                TaskConfig::named(reference, ForkTask::default()),
                join_for(reference),
            ]);
        }
        TaskType::ForkJoinDynamic => {
            let fork = DynamicForkTask {
                dynamic_fork_tasks_param: Some("dynamicTasks".into()),
                dynamic_fork_tasks_input_param_name: Some("dynamicTasksInput".into()),
            };
            return Ok(vec![
                TaskConfig::named(reference, fork)
                    .with_input("dynamicTasks", json!([]))
                    .with_input("dynamicTasksInput", json!({})),
                join_for(reference),
            ]);
        }
        TaskType::Switch => TaskConfig::named(
            reference,
            SwitchTask {
                evaluator_type: Some("value-param".into()),
                expression: Some("switchCaseValue".into()),
                ..Default::default()
            },
        )
        .with_input("switchCaseValue", ""),
        TaskType::Decision => TaskConfig::named(
            reference,
            TaskKind::Decision(SwitchTask {
                case_value_param: Some("caseValueParam".into()),
                ..Default::default()
            }),
        )
        .with_input("caseValueParam", ""),
        TaskType::DoWhile => TaskConfig::named(
            reference,
            DoWhileTask {
                loop_condition: Some("(function () { return false; })();".into()),
                loop_over: Vec::new(),
            },
        ),
        TaskType::Fork
        | TaskType::Terminal
        | TaskType::DoWhileEnd
        | TaskType::DfChildrenPlaceholder
        | TaskType::LoopChildrenPlaceholder
        | TaskType::Other(_) => return Err(DagError::UnsupportedTemplate(task_type.clone())),
    };

    Ok(vec![task])
}

fn join_for(fork_reference: &str) -> TaskConfig {
    TaskConfig::named(format!("{fork_reference}_join"), JoinTask::default())
}
