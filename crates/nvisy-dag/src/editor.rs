//! Editing operations on the task tree behind a [`WorkflowDag`].
//!
//! Every operation locates its target through the owning sequence recorded
//! on the target's vertex, applies the change, and rebuilds the graph. A
//! failed operation restores the previous task tree and graph.

use crate::definition::{BranchKey, SequencePath, TaskConfig, TaskKind, TaskType, template};
use crate::error::{DagError, DagResult};
use crate::graph::WorkflowDag;
use crate::START_REF;

/// Tracing target for tree edits.
const TRACING_TARGET: &str = "nvisy_dag::editor";

impl WorkflowDag {
    /// Instantiates the template of `task_type` under the lowest free
    /// reference name of the form `<type>_<n>`.
    pub fn next_untitled(&self, task_type: &TaskType) -> DagResult<Vec<TaskConfig>> {
        let prefix = task_type.as_ref().to_lowercase();
        let mut n = 0usize;
        let mut reference = format!("{prefix}_{n}");
        while self.graph.contains(&reference) {
            n += 1;
            reference = format!("{prefix}_{n}");
        }
        template::instantiate(task_type, &reference)
    }

    /// Inserts a new task of `task_type` after the task `reference`.
    ///
    /// Inserting after `__start` prepends to the root sequence. Inserting
    /// after a fork places the new task after the fork's join.
    pub fn insert_after(
        &mut self,
        reference: &str,
        task_type: &TaskType,
    ) -> DagResult<&[TaskConfig]> {
        let inserted = self.next_untitled(task_type)?;

        let (path, index) = if reference == START_REF {
            (SequencePath::root(), 0)
        } else {
            let (path, position) = self.slot(reference)?;
            let sequence = self.sequence(&path, reference)?;
            let position = if sequence[position].kind.is_fork() {
                match sequence.get(position + 1) {
                    Some(next) if next.kind.is_join() => position + 1,
                    _ => return Err(missing_join(reference)),
                }
            } else {
                position
            };
            (path, position + 1)
        };

        self.edit("insert_after", reference, move |tasks| {
            let sequence = path
                .resolve_mut(tasks)
                .ok_or_else(|| stale_sequence(reference))?;
            sequence.splice(index..index, inserted);
            Ok(())
        })
    }

    /// Appends a parallel branch holding a new task of `task_type` to the
    /// fork `parent_ref`.
    pub fn add_fork_tasks(
        &mut self,
        parent_ref: &str,
        task_type: &TaskType,
    ) -> DagResult<&[TaskConfig]> {
        let branch = self.next_untitled(task_type)?;
        let (path, position) = self.slot(parent_ref)?;

        self.edit("add_fork_tasks", parent_ref, move |tasks| {
            let task = locate_mut(tasks, &path, position, parent_ref)?;
            let found = task.task_type();
            match &mut task.kind {
                TaskKind::ForkJoin(fork) => {
                    fork.fork_tasks.push(branch);
                    Ok(())
                }
                _ => Err(unexpected(parent_ref, "FORK_JOIN", found)),
            }
        })
    }

    /// Adds a case holding a new task of `task_type` to the switch
    /// `parent_ref`, or replaces its default branch when `is_default` is set.
    ///
    /// New cases are keyed `case_<n>` with `n` starting at the current case
    /// count.
    pub fn add_switch_case(
        &mut self,
        parent_ref: &str,
        task_type: &TaskType,
        is_default: bool,
    ) -> DagResult<&[TaskConfig]> {
        let branch = self.next_untitled(task_type)?;
        let (path, position) = self.slot(parent_ref)?;

        self.edit("add_switch_case", parent_ref, move |tasks| {
            let task = locate_mut(tasks, &path, position, parent_ref)?;
            let found = task.task_type();
            let (TaskKind::Switch(switch) | TaskKind::Decision(switch)) = &mut task.kind else {
                return Err(unexpected(parent_ref, "SWITCH", found));
            };

            if is_default {
                switch.default_case = branch;
            } else {
                let mut n = switch.decision_cases.len();
                while switch.decision_cases.contains_key(&format!("case_{n}")) {
                    n += 1;
                }
                switch.decision_cases.insert(format!("case_{n}"), branch);
            }
            Ok(())
        })
    }

    /// Replaces the body of the loop `parent_ref` with a new task of
    /// `task_type`.
    pub fn add_loop_task(
        &mut self,
        parent_ref: &str,
        task_type: &TaskType,
    ) -> DagResult<&[TaskConfig]> {
        let body = self.next_untitled(task_type)?;
        let (path, position) = self.slot(parent_ref)?;

        self.edit("add_loop_task", parent_ref, move |tasks| {
            let task = locate_mut(tasks, &path, position, parent_ref)?;
            let found = task.task_type();
            match &mut task.kind {
                TaskKind::DoWhile(do_while) => {
                    do_while.loop_over = body;
                    Ok(())
                }
                _ => Err(unexpected(parent_ref, "DO_WHILE", found)),
            }
        })
    }

    /// Deletes the task `reference`, together with its join when it is a
    /// fork.
    ///
    /// A fork branch or switch case left empty is removed as well.
    pub fn delete_task(&mut self, reference: &str) -> DagResult<&[TaskConfig]> {
        let (path, position) = self.slot(reference)?;
        let sequence = self.sequence(&path, reference)?;
        let count = if sequence[position].kind.is_fork() {
            match sequence.get(position + 1) {
                Some(next) if next.kind.is_join() => 2,
                _ => return Err(missing_join(reference)),
            }
        } else {
            1
        };

        self.edit("delete_task", reference, move |tasks| {
            let sequence = path
                .resolve_mut(tasks)
                .ok_or_else(|| stale_sequence(reference))?;
            sequence.drain(position..position + count);
            if sequence.is_empty() {
                prune_empty_branch(tasks, &path);
            }
            Ok(())
        })
    }

    /// Replaces the task `reference` with an edited configuration.
    pub fn update_task(
        &mut self,
        reference: &str,
        config: TaskConfig,
    ) -> DagResult<&[TaskConfig]> {
        let (path, position) = self.slot(reference)?;

        self.edit("update_task", reference, move |tasks| {
            *locate_mut(tasks, &path, position, reference)? = config;
            Ok(())
        })
    }

    /// Returns the owning sequence and position of the task drawn as
    /// `reference`.
    fn slot(&self, reference: &str) -> DagResult<(SequencePath, usize)> {
        let vertex = self
            .graph
            .node(reference)
            .ok_or_else(|| DagError::not_found("task", reference))?;
        let position = vertex
            .position
            .ok_or_else(|| DagError::structural(reference, "task has no slot in the definition"))?;

        let sequence = self.sequence(&vertex.parent, reference)?;
        let expected = vertex.task_config.effective_ref();
        if sequence.get(position).map(TaskConfig::reference) != Some(expected) {
            return Err(DagError::structural(
                reference,
                "task is no longer at its recorded position",
            ));
        }

        Ok((vertex.parent.clone(), position))
    }

    fn sequence(&self, path: &SequencePath, reference: &str) -> DagResult<&[TaskConfig]> {
        path.resolve(&self.definition.tasks)
            .ok_or_else(|| stale_sequence(reference))
    }

    /// Applies an edit to the task tree and rebuilds the graph, restoring
    /// the previous tree when either step fails.
    fn edit<F>(
        &mut self,
        operation: &'static str,
        reference: &str,
        apply: F,
    ) -> DagResult<&[TaskConfig]>
    where
        F: FnOnce(&mut Vec<TaskConfig>) -> DagResult<()>,
    {
        let snapshot = self.definition.tasks.clone();
        let result = apply(&mut self.definition.tasks).and_then(|()| self.rebuild());

        if let Err(error) = result {
            self.definition.tasks = snapshot;
            tracing::debug!(
                target: TRACING_TARGET,
                operation,
                reference,
                error = %error,
                "Rejected task tree edit"
            );
            return Err(error);
        }

        tracing::debug!(
            target: TRACING_TARGET,
            operation,
            reference,
            vertices = self.graph.node_count(),
            "Edited task tree"
        );
        Ok(self.definition.tasks.as_slice())
    }
}

fn locate_mut<'a>(
    tasks: &'a mut Vec<TaskConfig>,
    path: &SequencePath,
    position: usize,
    reference: &str,
) -> DagResult<&'a mut TaskConfig> {
    path.resolve_mut(tasks)
        .and_then(|sequence| sequence.get_mut(position))
        .ok_or_else(|| stale_sequence(reference))
}

/// Removes the now-empty fork branch or switch case `path` points at.
///
/// Empty default branches and loop bodies are kept.
fn prune_empty_branch(tasks: &mut Vec<TaskConfig>, path: &SequencePath) {
    let Some((owner_path, segment)) = path.split_last() else {
        return;
    };
    let Some(owner) = owner_path
        .resolve_mut(tasks)
        .and_then(|sequence| sequence.get_mut(segment.index))
    else {
        return;
    };

    match (&mut owner.kind, &segment.branch) {
        (TaskKind::ForkJoin(fork), BranchKey::Fork(branch)) => {
            if *branch < fork.fork_tasks.len() {
                fork.fork_tasks.remove(*branch);
            }
        }
        (TaskKind::Switch(switch) | TaskKind::Decision(switch), BranchKey::Case(value)) => {
            switch.decision_cases.shift_remove(value);
        }
        _ => {}
    }
}

fn missing_join(reference: &str) -> DagError {
    DagError::structural(reference, "fork is not immediately followed by a join")
}

fn stale_sequence(reference: &str) -> DagError {
    DagError::structural(reference, "owning sequence no longer exists")
}

fn unexpected(reference: &str, expected: &'static str, found: TaskType) -> DagError {
    DagError::UnexpectedTaskType {
        reference: reference.to_owned(),
        expected,
        found,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::definition::WorkflowDef;
    use crate::execution::ExecutionAndTasks;
    use crate::FINAL_REF;

    fn dag(tasks: serde_json::Value) -> WorkflowDag {
        let definition: WorkflowDef =
            serde_json::from_value(json!({ "name": "wf", "tasks": tasks })).unwrap();
        WorkflowDag::from_workflow_def(definition).unwrap()
    }

    fn references(tasks: &[TaskConfig]) -> Vec<&str> {
        tasks.iter().map(TaskConfig::reference).collect()
    }

    fn fork_workflow() -> WorkflowDag {
        dag(json!([
            {
                "name": "f", "taskReferenceName": "f", "type": "FORK_JOIN",
                "forkTasks": [
                    [{ "name": "x", "taskReferenceName": "x", "type": "SIMPLE" }],
                    [{ "name": "y", "taskReferenceName": "y", "type": "SIMPLE" }]
                ]
            },
            { "name": "j", "taskReferenceName": "j", "type": "JOIN" },
            { "name": "z", "taskReferenceName": "z", "type": "SIMPLE" }
        ]))
    }

    #[test]
    fn test_next_untitled() {
        let dag = dag(json!([
            { "name": "simple_0", "taskReferenceName": "simple_0", "type": "SIMPLE" },
            { "name": "simple_1", "taskReferenceName": "simple_1", "type": "SIMPLE" }
        ]));

        let tasks = dag.next_untitled(&TaskType::Simple).unwrap();
        assert_eq!(references(&tasks), vec!["simple_2"]);

        let tasks = dag.next_untitled(&TaskType::ForkJoin).unwrap();
        assert_eq!(references(&tasks), vec!["fork_join_0", "fork_join_0_join"]);

        assert!(matches!(
            dag.next_untitled(&TaskType::DfChildrenPlaceholder),
            Err(DagError::UnsupportedTemplate(_))
        ));
    }

    #[test]
    fn test_insert_after_start() {
        let mut dag = dag(json!([
            { "name": "a", "taskReferenceName": "a", "type": "SIMPLE" }
        ]));

        let tasks = dag.insert_after(START_REF, &TaskType::Http).unwrap();
        assert_eq!(references(tasks), vec!["http_0", "a"]);
        assert_eq!(dag.successors(START_REF), vec!["http_0"]);
        assert_eq!(dag.successors("http_0"), vec!["a"]);
    }

    #[test]
    fn test_edit_preserves_unmodeled_fields() {
        let mut dag = WorkflowDag::from_workflow_json(
            r#"{
                "name": "wf",
                "timeoutSeconds": 60,
                "tasks": [{
                    "name": "a",
                    "taskReferenceName": "a",
                    "type": "SIMPLE",
                    "retryCount": 3,
                    "startDelay": 5
                }]
            }"#,
        )
        .unwrap();

        dag.insert_after("a", &TaskType::Simple).unwrap();
        let saved = serde_json::to_value(dag.to_workflow_def()).unwrap();

        assert_eq!(saved["timeoutSeconds"], 60);
        assert_eq!(saved["tasks"][0]["retryCount"], 3);
        assert_eq!(saved["tasks"][0]["startDelay"], 5);
        assert_eq!(saved["tasks"][1]["taskReferenceName"], "simple_0");
        assert!(saved["tasks"][1].get("retryCount").is_none());
    }

    #[test]
    fn test_insert_after_nested_task() {
        let mut dag = fork_workflow();

        dag.insert_after("x", &TaskType::Wait).unwrap();
        let TaskKind::ForkJoin(fork) = &dag.tasks()[0].kind else {
            panic!("expected fork");
        };
        assert_eq!(references(&fork.fork_tasks[0]), vec!["x", "wait_0"]);
        assert_eq!(dag.predecessors("j"), vec!["wait_0", "y"]);
    }

    #[test]
    fn test_insert_after_fork_skips_join() {
        let mut dag = fork_workflow();

        let tasks = dag.insert_after("f", &TaskType::Simple).unwrap();
        assert_eq!(references(tasks), vec!["f", "j", "simple_0", "z"]);
    }

    #[test]
    fn test_insert_after_fork_without_join_fails() {
        let mut dag = dag(json!([
            { "name": "f", "taskReferenceName": "f", "type": "FORK_JOIN", "forkTasks": [] },
            { "name": "a", "taskReferenceName": "a", "type": "SIMPLE" }
        ]));
        let before = dag.to_workflow_def();

        let result = dag.insert_after("f", &TaskType::Simple);
        assert!(matches!(result, Err(DagError::Structural { .. })));
        assert_eq!(dag.to_workflow_def(), before);
    }

    #[test]
    fn test_insert_after_slotless_vertex_fails() {
        let mut dag = dag(json!([
            { "name": "a", "taskReferenceName": "a", "type": "SIMPLE" }
        ]));

        assert!(matches!(
            dag.insert_after(FINAL_REF, &TaskType::Simple),
            Err(DagError::Structural { .. })
        ));
        assert!(matches!(
            dag.insert_after("ghost", &TaskType::Simple),
            Err(DagError::NotFound { .. })
        ));
    }

    #[test]
    fn test_insert_after_loop_terminator() {
        let mut dag = dag(json!([
            {
                "name": "loop", "taskReferenceName": "loop", "type": "DO_WHILE",
                "loopOver": [{ "name": "a", "taskReferenceName": "a", "type": "SIMPLE" }]
            }
        ]));

        let tasks = dag.insert_after("loop-END", &TaskType::Simple).unwrap();
        assert_eq!(references(tasks), vec!["loop", "simple_0"]);
        assert_eq!(dag.successors("loop-END"), vec!["simple_0"]);
    }

    #[test]
    fn test_add_fork_tasks() {
        let mut dag = fork_workflow();

        dag.add_fork_tasks("f", &TaskType::Simple).unwrap();
        assert_eq!(dag.successors("f"), vec!["x", "y", "simple_0"]);
        assert_eq!(dag.predecessors("j"), vec!["x", "y", "simple_0"]);

        assert!(matches!(
            dag.add_fork_tasks("z", &TaskType::Simple),
            Err(DagError::UnexpectedTaskType { .. })
        ));
        assert_eq!(dag.node_count(), 8);
    }

    #[test]
    fn test_add_switch_case() {
        let mut dag = dag(json!([
            {
                "name": "s", "taskReferenceName": "s", "type": "SWITCH",
                "decisionCases": {
                    "case_1": [{ "name": "a", "taskReferenceName": "a", "type": "SIMPLE" }]
                }
            }
        ]));

        dag.add_switch_case("s", &TaskType::Simple, false).unwrap();
        let switch = dag.tasks()[0].as_switch().unwrap();
        let keys: Vec<_> = switch.decision_cases.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["case_1", "case_2"]);
        assert_eq!(
            dag.edge("s", "simple_0").unwrap().case_value.as_deref(),
            Some("case_2")
        );

        dag.add_switch_case("s", &TaskType::Simple, true).unwrap();
        let switch = dag.tasks()[0].as_switch().unwrap();
        assert_eq!(references(&switch.default_case), vec!["simple_1"]);
        assert_eq!(
            dag.edge("s", "simple_1").unwrap().case_value.as_deref(),
            Some("default")
        );
        assert!(dag.edge("s", FINAL_REF).is_none());
    }

    #[test]
    fn test_add_loop_task() {
        let mut dag = dag(json!([
            { "name": "loop", "taskReferenceName": "loop", "type": "DO_WHILE", "loopOver": [] }
        ]));

        dag.add_loop_task("loop", &TaskType::Inline).unwrap();
        assert_eq!(dag.successors("loop"), vec!["inline_0"]);
        assert_eq!(dag.successors("inline_0"), vec!["loop-END"]);
        assert_eq!(
            dag.node("inline_0").unwrap().parent.to_string(),
            "root/0.loopOver"
        );
    }

    #[test]
    fn test_delete_simple_task() {
        let mut dag = dag(json!([
            { "name": "a", "taskReferenceName": "a", "type": "SIMPLE" },
            { "name": "b", "taskReferenceName": "b", "type": "SIMPLE" }
        ]));

        let tasks = dag.delete_task("a").unwrap();
        assert_eq!(references(tasks), vec!["b"]);
        assert!(dag.node("a").is_none());
        assert_eq!(dag.successors(START_REF), vec!["b"]);
    }

    #[test]
    fn test_delete_fork_removes_join() {
        let mut dag = fork_workflow();

        let tasks = dag.delete_task("f").unwrap();
        assert_eq!(references(tasks), vec!["z"]);
        assert!(dag.node("x").is_none());
    }

    #[test]
    fn test_delete_last_task_prunes_branch() {
        let mut dag = fork_workflow();

        dag.delete_task("x").unwrap();
        let TaskKind::ForkJoin(fork) = &dag.tasks()[0].kind else {
            panic!("expected fork");
        };
        assert_eq!(fork.fork_tasks.len(), 1);
        assert_eq!(references(&fork.fork_tasks[0]), vec!["y"]);
        assert_eq!(dag.node("y").unwrap().parent.to_string(), "root/0.forkTasks[0]");
    }

    #[test]
    fn test_delete_last_task_prunes_case() {
        let mut dag = dag(json!([
            {
                "name": "s", "taskReferenceName": "s", "type": "DECISION",
                "caseValueParam": "p",
                "decisionCases": {
                    "a": [{ "name": "a", "taskReferenceName": "a", "type": "SIMPLE" }],
                    "b": [{ "name": "b", "taskReferenceName": "b", "type": "SIMPLE" }]
                },
                "defaultCase": [{ "name": "d", "taskReferenceName": "d", "type": "SIMPLE" }]
            }
        ]));

        dag.delete_task("a").unwrap();
        let switch = dag.tasks()[0].as_switch().unwrap();
        assert_eq!(switch.decision_cases.len(), 1);
        assert!(switch.decision_cases.contains_key("b"));

        dag.delete_task("d").unwrap();
        let switch = dag.tasks()[0].as_switch().unwrap();
        assert!(switch.default_case.is_empty());
        assert_eq!(
            dag.edge("s", FINAL_REF).unwrap().case_value.as_deref(),
            Some("default")
        );
    }

    #[test]
    fn test_delete_fork_without_join_fails() {
        let mut dag = dag(json!([
            { "name": "f", "taskReferenceName": "f", "type": "FORK_JOIN", "forkTasks": [] }
        ]));
        let before = dag.to_workflow_def();

        assert!(matches!(
            dag.delete_task("f"),
            Err(DagError::Structural { .. })
        ));
        assert_eq!(dag.to_workflow_def(), before);
    }

    #[test]
    fn test_update_task() {
        let mut dag = fork_workflow();

        let mut edited = dag.task_config_by_ref("y").unwrap().as_full().unwrap().clone();
        edited.description = Some("resize".into());
        edited.task_reference_name = "resize".into();

        dag.update_task("y", edited).unwrap();
        assert!(dag.node("y").is_none());
        assert_eq!(
            dag.node("resize").unwrap().task_config.description.as_deref(),
            Some("resize")
        );
        assert_eq!(dag.predecessors("j"), vec!["x", "resize"]);
    }

    #[test]
    fn test_edits_on_clone_leave_source_untouched() {
        let source = fork_workflow();
        let mut copy = source.clone();

        copy.delete_task("z").unwrap();
        assert_eq!(source.tasks().len(), 3);
        assert!(source.node("z").is_some());
        assert_eq!(copy.tasks().len(), 2);
    }

    #[test]
    fn test_edit_keeps_execution_overlay() {
        let run: ExecutionAndTasks = serde_json::from_value(json!({
            "execution": {
                "status": "RUNNING",
                "workflowDefinition": {
                    "name": "wf",
                    "tasks": [{ "name": "a", "taskReferenceName": "a", "type": "SIMPLE" }]
                }
            },
            "tasks": [{
                "taskId": "1", "referenceTaskName": "a", "taskType": "SIMPLE",
                "status": "IN_PROGRESS"
            }]
        }))
        .unwrap();
        let mut dag = WorkflowDag::from_execution(run).unwrap();

        dag.insert_after("a", &TaskType::Simple).unwrap();
        assert!(dag.node("a").unwrap().is_executed());
        assert!(!dag.node("simple_0").unwrap().is_executed());
        assert!(dag.edge(START_REF, "a").unwrap().executed);
    }
}
