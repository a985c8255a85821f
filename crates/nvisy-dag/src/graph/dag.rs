//! Workflow DAG combining a task tree, an execution trace and the graph
//! derived from them.

use serde::Serialize;

use super::builder::GraphBuilder;
use super::coordinate::{CoordinateKey, TaskCoordinate};
use super::graph::TaskGraph;
use super::vertex::{EdgeData, Vertex};
use crate::config::DagConfig;
use crate::definition::{TaskConfig, WorkflowDef};
use crate::error::{DagError, DagResult};
use crate::execution::{Execution, ExecutionAndTasks, ExecutionIndex, TaskAttempt};

/// A workflow definition, optionally bound to an execution, flattened into a
/// directed graph.
///
/// The graph is recomputed from the task tree after every edit. Clone the
/// DAG before editing to keep the previous state, for example for undo.
#[derive(Debug, Clone)]
pub struct WorkflowDag {
    /// Definition metadata and the editable task tree.
    pub(crate) definition: WorkflowDef,
    /// The bound execution, if any.
    pub(crate) execution: Option<Execution>,
    /// Attempts of the bound execution.
    pub(crate) index: ExecutionIndex,
    /// Graph construction settings.
    pub(crate) config: DagConfig,
    /// The derived graph.
    pub(crate) graph: TaskGraph,
}

impl WorkflowDag {
    /// Builds the graph of a workflow definition.
    pub fn from_workflow_def(definition: WorkflowDef) -> DagResult<Self> {
        Self::from_workflow_def_with_config(definition, DagConfig::default())
    }

    /// Builds the graph of a workflow definition with custom settings.
    pub fn from_workflow_def_with_config(
        definition: WorkflowDef,
        config: DagConfig,
    ) -> DagResult<Self> {
        Self::build(definition, None, ExecutionIndex::new(), config)
    }

    /// Builds the graph of an execution, annotated with its task attempts.
    pub fn from_execution(run: ExecutionAndTasks) -> DagResult<Self> {
        Self::from_execution_with_config(run, DagConfig::default())
    }

    /// Builds the graph of an execution with custom settings.
    pub fn from_execution_with_config(
        run: ExecutionAndTasks,
        config: DagConfig,
    ) -> DagResult<Self> {
        let ExecutionAndTasks { execution, tasks } = run;
        let index = ExecutionIndex::bind(execution.status, tasks)?;
        let definition = execution.workflow_definition.clone();
        Self::build(definition, Some(execution), index, config)
    }

    /// Builds the graph of a workflow definition given as JSON.
    pub fn from_workflow_json(json: &str) -> DagResult<Self> {
        Self::from_workflow_def(serde_json::from_str(json)?)
    }

    /// Builds the graph of an execution given as JSON.
    pub fn from_execution_json(json: &str) -> DagResult<Self> {
        Self::from_execution(serde_json::from_str(json)?)
    }

    fn build(
        definition: WorkflowDef,
        execution: Option<Execution>,
        index: ExecutionIndex,
        config: DagConfig,
    ) -> DagResult<Self> {
        let graph = GraphBuilder::new(&config, &index).build(&definition.tasks)?;
        Ok(Self {
            definition,
            execution,
            index,
            config,
            graph,
        })
    }

    /// Recomputes the graph from the current task tree.
    pub(crate) fn rebuild(&mut self) -> DagResult<()> {
        let graph = GraphBuilder::new(&self.config, &self.index).build(&self.definition.tasks)?;
        self.graph = graph;
        Ok(())
    }

    /// Returns the current root task sequence.
    pub fn tasks(&self) -> &[TaskConfig] {
        &self.definition.tasks
    }

    /// Returns the definition with the current task tree.
    pub fn to_workflow_def(&self) -> WorkflowDef {
        self.definition.clone()
    }

    /// Returns the bound execution.
    pub fn execution(&self) -> Option<&Execution> {
        self.execution.as_ref()
    }

    /// Returns the graph construction settings.
    pub fn config(&self) -> &DagConfig {
        &self.config
    }

    /// Returns the derived graph.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Returns a vertex by reference name.
    pub fn node(&self, reference: &str) -> Option<&Vertex> {
        self.graph.node(reference)
    }

    /// Returns the vertex addressed by a coordinate.
    pub fn node_by_coord(&self, coordinate: &TaskCoordinate) -> DagResult<Option<&Vertex>> {
        let reference = match coordinate.key()? {
            CoordinateKey::Id(id) => self.index.by_id(id)?.reference_task_name.as_str(),
            CoordinateKey::Ref(reference) => reference,
        };
        Ok(self.graph.node(reference))
    }

    /// Returns all vertices in walk order.
    pub fn nodes(&self) -> impl Iterator<Item = &Vertex> {
        self.graph.nodes()
    }

    /// Returns all edges as `(from, to, data)`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &EdgeData)> {
        self.graph.edges()
    }

    /// Returns the edge between two vertices.
    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeData> {
        self.graph.edge(from, to)
    }

    /// Returns the references of a vertex's successors.
    pub fn successors(&self, reference: &str) -> Vec<&str> {
        self.graph.successors(reference)
    }

    /// Returns the references of a vertex's predecessors.
    pub fn predecessors(&self, reference: &str) -> Vec<&str> {
        self.graph.predecessors(reference)
    }

    /// Returns the number of vertices.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns every attempt of a reference, oldest first.
    pub fn task_results_by_ref(&self, reference: &str) -> &[TaskAttempt] {
        self.index.attempts(reference)
    }

    /// Returns the latest attempt of a reference.
    pub fn task_result_by_ref(&self, reference: &str) -> DagResult<Option<&TaskAttempt>> {
        self.index.latest_task(reference)
    }

    /// Returns the attempt with the given id.
    pub fn task_result_by_id(&self, id: &str) -> DagResult<&TaskAttempt> {
        self.index.by_id(id)
    }

    /// Returns the attempt addressed by a coordinate: the attempt itself for
    /// an id, the latest attempt for a reference.
    pub fn task_result_by_coord(
        &self,
        coordinate: &TaskCoordinate,
    ) -> DagResult<Option<&TaskAttempt>> {
        match coordinate.key()? {
            CoordinateKey::Id(id) => self.index.by_id(id).map(Some),
            CoordinateKey::Ref(reference) => self.index.latest_task(reference),
        }
    }

    /// Returns every attempt of the task addressed by a coordinate.
    pub fn task_result_attempts_by_coord(
        &self,
        coordinate: &TaskCoordinate,
    ) -> DagResult<&[TaskAttempt]> {
        let reference = match coordinate.key()? {
            CoordinateKey::Id(id) => self.index.by_id(id)?.reference_task_name.as_str(),
            CoordinateKey::Ref(reference) => reference,
        };
        Ok(self.index.attempts(reference))
    }

    /// Returns the latest attempts of every task spawned by the same dynamic
    /// fork as the addressed task, the task itself included.
    ///
    /// Returns `None` when the task has not run or was not spawned by a fork.
    pub fn df_siblings_by_coord(
        &self,
        coordinate: &TaskCoordinate,
    ) -> DagResult<Option<Vec<&TaskAttempt>>> {
        let Some(attempt) = self.task_result_by_coord(coordinate)? else {
            return Ok(None);
        };
        let Some(parent_ref) = attempt.parent_task_reference_name.as_deref() else {
            return Ok(None);
        };

        let parent = self
            .index
            .latest_task(parent_ref)?
            .ok_or_else(|| DagError::not_found("attempt", parent_ref))?;
        let siblings = parent.forked_task_refs.as_ref().ok_or_else(|| {
            DagError::Invariant(format!("dynamic fork {parent_ref} has no forked task refs"))
        })?;

        siblings
            .iter()
            .map(|reference| {
                self.index
                    .latest_task(reference)?
                    .ok_or_else(|| DagError::not_found("attempt", reference.as_str()))
            })
            .collect::<DagResult<Vec<_>>>()
            .map(Some)
    }

    /// Returns the configuration of the task drawn for a reference.
    ///
    /// Tasks without a vertex of their own, such as collapsed dynamic fork
    /// children, get a minimal configuration reconstructed from their latest
    /// attempt.
    pub fn task_config_by_ref(&self, reference: &str) -> DagResult<TaskConfigRef<'_>> {
        if let Some(vertex) = self.graph.node(reference) {
            return Ok(TaskConfigRef::Full(&vertex.task_config));
        }

        let attempt = self
            .index
            .latest_task(reference)?
            .ok_or_else(|| DagError::not_found("task", reference))?;
        Ok(TaskConfigRef::Minimal(MinimalTaskConfig {
            name: attempt.task_def_name.clone(),
            task_reference_name: reference.to_owned(),
        }))
    }

    /// Returns the configuration of the task addressed by a coordinate.
    pub fn task_config_by_coord(
        &self,
        coordinate: &TaskCoordinate,
    ) -> DagResult<TaskConfigRef<'_>> {
        match coordinate.key()? {
            CoordinateKey::Id(id) => {
                let reference = self.index.by_id(id)?.reference_task_name.as_str();
                self.task_config_by_ref(reference)
            }
            CoordinateKey::Ref(reference) => self.task_config_by_ref(reference),
        }
    }
}

/// A task configuration found by lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskConfigRef<'a> {
    /// The configuration drawn in the graph.
    Full(&'a TaskConfig),
    /// Name and reference of a task known only from its attempts.
    Minimal(MinimalTaskConfig),
}

impl TaskConfigRef<'_> {
    /// Returns the reference name.
    pub fn reference(&self) -> &str {
        match self {
            Self::Full(config) => config.reference(),
            Self::Minimal(config) => &config.task_reference_name,
        }
    }

    /// Returns the full configuration, if one is drawn.
    pub fn as_full(&self) -> Option<&TaskConfig> {
        match self {
            Self::Full(config) => Some(*config),
            Self::Minimal(_) => None,
        }
    }
}

/// Name and reference of a task that has no vertex of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimalTaskConfig {
    /// Task definition name, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Reference name.
    pub task_reference_name: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::definition::TaskType;
    use crate::execution::{TaskStatus, WorkflowStatus};
    use crate::{FINAL_REF, START_REF};

    fn dynamic_fork_run(children: usize) -> ExecutionAndTasks {
        let mut tasks = vec![json!({
            "taskId": "df-1", "referenceTaskName": "df", "taskType": "FORK",
            "status": "COMPLETED"
        })];
        for child in 0..children {
            tasks.push(json!({
                "taskId": format!("c{child}-1"),
                "referenceTaskName": format!("c{child}"),
                "taskType": "encode",
                "taskDefName": "encode",
                "parentTaskReferenceName": "df",
                "status": if child == 0 { "FAILED" } else { "COMPLETED" }
            }));
        }

        serde_json::from_value(json!({
            "execution": {
                "workflowId": "wf-1",
                "status": "RUNNING",
                "workflowDefinition": {
                    "name": "media",
                    "tasks": [
                        { "name": "prepare", "taskReferenceName": "prepare", "type": "SIMPLE" },
                        {
                            "name": "df", "taskReferenceName": "df", "type": "FORK_JOIN_DYNAMIC",
                            "dynamicForkTasksParam": "dynamicTasks",
                            "dynamicForkTasksInputParamName": "dynamicTasksInput"
                        },
                        { "name": "df_join", "taskReferenceName": "df_join", "type": "JOIN" }
                    ]
                }
            },
            "tasks": tasks
        }))
        .unwrap()
    }

    #[test]
    fn test_definition_only_graph() {
        let dag = WorkflowDag::from_workflow_json(
            r#"{
                "name": "wf",
                "tasks": [{ "name": "a", "taskReferenceName": "a", "type": "SIMPLE" }]
            }"#,
        )
        .unwrap();

        assert_eq!(dag.node_count(), 3);
        assert_eq!(dag.edge_count(), 2);
        assert!(dag.execution().is_none());
        assert!(dag.nodes().all(|vertex| !vertex.is_executed()));
        assert_eq!(dag.to_workflow_def().name, "wf");
    }

    #[test]
    fn test_invalid_json() {
        let result = WorkflowDag::from_workflow_json("{ not json");
        assert!(matches!(result, Err(DagError::Serialization(_))));
    }

    #[test]
    fn test_execution_graph() {
        let dag = WorkflowDag::from_execution(dynamic_fork_run(4)).unwrap();

        assert_eq!(dag.execution().unwrap().workflow_id, "wf-1");
        assert!(dag.node(START_REF).unwrap().is_executed());
        assert!(!dag.node(FINAL_REF).unwrap().is_executed());

        let placeholder = dag.node("df_DF_CHILDREN_PLACEHOLDER").unwrap();
        assert_eq!(placeholder.tally.unwrap().total, 4);
        assert_eq!(placeholder.status, Some(TaskStatus::Failed));
    }

    #[test]
    fn test_attempt_lookups() {
        let dag = WorkflowDag::from_execution(dynamic_fork_run(2)).unwrap();

        assert_eq!(dag.task_results_by_ref("c0").len(), 1);
        assert!(dag.task_results_by_ref("prepare").is_empty());
        assert!(dag.task_result_by_ref("prepare").unwrap().is_none());
        assert_eq!(
            dag.task_result_by_id("c1-1").unwrap().reference_task_name,
            "c1"
        );

        let by_id = dag
            .task_result_by_coord(&TaskCoordinate::by_id("c0-1"))
            .unwrap()
            .unwrap();
        assert_eq!(by_id.status, TaskStatus::Failed);

        let attempts = dag
            .task_result_attempts_by_coord(&TaskCoordinate::by_ref("df"))
            .unwrap();
        assert_eq!(attempts.len(), 1);

        assert!(matches!(
            dag.task_result_by_ref(START_REF),
            Err(DagError::TerminalAccess(_))
        ));
        assert!(matches!(
            dag.task_result_by_coord(&TaskCoordinate::default()),
            Err(DagError::InvalidCoordinate)
        ));
    }

    #[test]
    fn test_node_by_coord() {
        let dag = WorkflowDag::from_execution(dynamic_fork_run(2)).unwrap();

        let vertex = dag
            .node_by_coord(&TaskCoordinate::by_id("c1-1"))
            .unwrap()
            .unwrap();
        assert_eq!(vertex.reference(), "c1");
        assert!(dag
            .node_by_coord(&TaskCoordinate::by_ref("ghost"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_df_siblings() {
        let dag = WorkflowDag::from_execution(dynamic_fork_run(4)).unwrap();

        let siblings = dag
            .df_siblings_by_coord(&TaskCoordinate::by_ref("c2"))
            .unwrap()
            .unwrap();
        let references: Vec<_> = siblings
            .iter()
            .map(|attempt| attempt.reference_task_name.as_str())
            .collect();
        assert_eq!(references, vec!["c0", "c1", "c2", "c3"]);

        assert!(dag
            .df_siblings_by_coord(&TaskCoordinate::by_ref("df"))
            .unwrap()
            .is_none());
        assert!(dag
            .df_siblings_by_coord(&TaskCoordinate::by_ref("prepare"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_task_config_lookups() {
        let dag = WorkflowDag::from_execution(dynamic_fork_run(4)).unwrap();

        let drawn = dag.task_config_by_ref("df").unwrap();
        assert_eq!(
            drawn.as_full().unwrap().task_type(),
            TaskType::ForkJoinDynamic
        );

        let collapsed = dag.task_config_by_coord(&TaskCoordinate::by_id("c3-1")).unwrap();
        assert_eq!(
            collapsed,
            TaskConfigRef::Minimal(MinimalTaskConfig {
                name: Some("encode".into()),
                task_reference_name: "c3".into(),
            })
        );
        assert_eq!(collapsed.reference(), "c3");

        assert!(matches!(
            dag.task_config_by_ref("ghost"),
            Err(DagError::NotFound { .. })
        ));
        assert!(matches!(
            dag.task_config_by_coord(&TaskCoordinate::by_id("ghost")),
            Err(DagError::NotFound { .. })
        ));
    }

    #[test]
    fn test_completed_execution_marks_final() {
        let run: ExecutionAndTasks = serde_json::from_value(json!({
            "execution": {
                "status": "COMPLETED",
                "workflowDefinition": {
                    "name": "wf",
                    "tasks": [{ "name": "a", "taskReferenceName": "a", "type": "SIMPLE" }]
                }
            },
            "tasks": [{
                "taskId": "1", "referenceTaskName": "a", "taskType": "SIMPLE",
                "status": "COMPLETED"
            }]
        }))
        .unwrap();
        let dag = WorkflowDag::from_execution(run).unwrap();

        assert_eq!(dag.execution().unwrap().status, WorkflowStatus::Completed);
        assert!(dag.edges().all(|(_, _, edge)| edge.executed));
        assert_eq!(
            dag.node(FINAL_REF).unwrap().status,
            Some(TaskStatus::Completed)
        );
    }
}
