//! Tree walker flattening a task tree into a [`TaskGraph`].

use super::graph::TaskGraph;
use super::placeholder::{self, ITERATION_SEPARATOR, LOOP_END_SUFFIX};
use super::vertex::{EdgeData, Summary, Vertex};
use crate::config::DagConfig;
use crate::definition::{
    BranchKey, DoWhileTask, ForkTask, SequencePath, SwitchTask, TaskConfig, TaskKind,
};
use crate::error::{DagError, DagResult};
use crate::execution::{ExecutionIndex, TaskAttempt};
use crate::{DEFAULT_CASE, FINAL_REF, START_REF};

/// Tracing target for graph construction.
const TRACING_TARGET: &str = "nvisy_dag::builder";

/// Walks a task tree depth first and emits vertices and edges.
///
/// Every `process_*` method returns the frontier: the references that the
/// next task in the enclosing sequence must be wired from.
pub(crate) struct GraphBuilder<'a> {
    config: &'a DagConfig,
    index: &'a ExecutionIndex,
    graph: TaskGraph,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a DagConfig, index: &'a ExecutionIndex) -> Self {
        Self {
            config,
            index,
            graph: TaskGraph::new(),
        }
    }

    /// Builds the graph of a root task sequence, framed by the start and
    /// final bubbles.
    pub fn build(mut self, tasks: &[TaskConfig]) -> DagResult<TaskGraph> {
        let root = SequencePath::root();

        let start = TaskConfig::new("start", START_REF, TaskKind::Terminal);
        self.add_vertex(start, &[], &root, None, None)?;

        let frontier = self.process_sequence(tasks, vec![START_REF.to_owned()], &root)?;

        let end = TaskConfig::new("final", FINAL_REF, TaskKind::Terminal);
        self.add_vertex(end, &frontier, &root, None, None)?;
        if self.graph.in_degree(FINAL_REF) == 0 {
            self.graph.remove_node(FINAL_REF);
        }

        tracing::debug!(
            target: TRACING_TARGET,
            tasks = tasks.len(),
            vertices = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "Built task graph"
        );

        Ok(self.graph)
    }

    fn process_sequence(
        &mut self,
        tasks: &[TaskConfig],
        antecedents: Vec<String>,
        path: &SequencePath,
    ) -> DagResult<Vec<String>> {
        let mut frontier = antecedents;
        for (position, task) in tasks.iter().enumerate() {
            frontier = self.process(task, &frontier, path, position)?;
        }
        Ok(frontier)
    }

    fn process(
        &mut self,
        task: &TaskConfig,
        antecedents: &[String],
        parent: &SequencePath,
        position: usize,
    ) -> DagResult<Vec<String>> {
        match &task.kind {
            TaskKind::ForkJoin(fork) => {
                self.process_fork_join(task, fork, antecedents, parent, position)
            }
            TaskKind::ForkJoinDynamic(_) => {
                self.process_dynamic_fork(task, antecedents, parent, position)
            }
            TaskKind::Switch(switch) | TaskKind::Decision(switch) => {
                self.process_switch(task, switch, antecedents, parent, position)
            }
            TaskKind::DoWhile(do_while) => {
                self.process_do_while(task, do_while, antecedents, parent, position)
            }
            TaskKind::Terminate => {
                self.add_vertex(task.clone(), antecedents, parent, Some(position), None)?;
                Ok(Vec::new())
            }
            TaskKind::Simple
            | TaskKind::Http
            | TaskKind::Inline
            | TaskKind::Wait
            | TaskKind::Join(_)
            | TaskKind::ExclusiveJoin(_)
            | TaskKind::SubWorkflow(_)
            | TaskKind::Event(_)
            | TaskKind::SetVariable
            | TaskKind::JsonJqTransform
            | TaskKind::Human
            | TaskKind::Terminal
            | TaskKind::DoWhileEnd { .. }
            | TaskKind::DfChildrenPlaceholder
            | TaskKind::LoopChildrenPlaceholder => {
                self.add_vertex(task.clone(), antecedents, parent, Some(position), None)?;
                Ok(vec![task.reference().to_owned()])
            }
        }
    }

    fn process_fork_join(
        &mut self,
        task: &TaskConfig,
        fork: &ForkTask,
        antecedents: &[String],
        parent: &SequencePath,
        position: usize,
    ) -> DagResult<Vec<String>> {
        self.add_vertex(task.clone(), antecedents, parent, Some(position), None)?;

        let fork_ref = vec![task.reference().to_owned()];
        if fork.fork_tasks.is_empty() {
            return Ok(fork_ref);
        }

        let mut frontier = Vec::new();
        for (branch, tasks) in fork.fork_tasks.iter().enumerate() {
            let path = parent.child(position, BranchKey::Fork(branch));
            frontier.extend(self.process_sequence(tasks, fork_ref.clone(), &path)?);
        }
        Ok(frontier)
    }

    fn process_dynamic_fork(
        &mut self,
        task: &TaskConfig,
        antecedents: &[String],
        parent: &SequencePath,
        position: usize,
    ) -> DagResult<Vec<String>> {
        self.add_vertex(task.clone(), antecedents, parent, Some(position), None)?;

        let index = self.index;
        let fork_ref = task.reference();
        let forked = index.forked_refs(fork_ref);
        let limit = self.config.dynamic_fork_collapse_limit;

        match forked {
            Some(children) if !children.is_empty() && children.len() < limit => {
                tracing::trace!(
                    target: TRACING_TARGET,
                    fork = fork_ref,
                    children = children.len(),
                    "Expanding dynamic fork children"
                );

                let fork_ref = [fork_ref.to_owned()];
                let mut frontier = Vec::with_capacity(children.len());
                for child in children {
                    let attempt = index
                        .latest_task(child)?
                        .ok_or_else(|| DagError::not_found("attempt", child.as_str()))?;
                    self.add_vertex(
                        placeholder::child_config(attempt),
                        &fork_ref,
                        parent,
                        None,
                        None,
                    )?;
                    frontier.push(child.clone());
                }
                Ok(frontier)
            }
            _ => {
                tracing::trace!(
                    target: TRACING_TARGET,
                    fork = fork_ref,
                    children = forked.map_or(0, |children| children.len()),
                    "Collapsing dynamic fork children"
                );

                let stack = placeholder::dynamic_fork(index, fork_ref, forked)?;
                let stack_ref = stack.config.reference().to_owned();
                self.add_vertex(
                    stack.config,
                    &[fork_ref.to_owned()],
                    parent,
                    None,
                    Some(stack.summary),
                )?;
                Ok(vec![stack_ref])
            }
        }
    }

    fn process_switch(
        &mut self,
        task: &TaskConfig,
        switch: &SwitchTask,
        antecedents: &[String],
        parent: &SequencePath,
        position: usize,
    ) -> DagResult<Vec<String>> {
        self.add_vertex(task.clone(), antecedents, parent, Some(position), None)?;

        let switch_ref = vec![task.reference().to_owned()];
        let mut frontier = Vec::new();

        if switch.default_case.is_empty() {
            frontier.extend(switch_ref.iter().cloned());
        } else {
            let path = parent.child(position, BranchKey::Default);
            frontier.extend(self.process_sequence(
                &switch.default_case,
                switch_ref.clone(),
                &path,
            )?);
        }

        for (value, tasks) in &switch.decision_cases {
            let path = parent.child(position, BranchKey::Case(value.clone()));
            frontier.extend(self.process_sequence(tasks, switch_ref.clone(), &path)?);
        }

        Ok(frontier)
    }

    fn process_do_while(
        &mut self,
        task: &TaskConfig,
        do_while: &DoWhileTask,
        antecedents: &[String],
        parent: &SequencePath,
        position: usize,
    ) -> DagResult<Vec<String>> {
        let index = self.index;
        let loop_ref = task.reference();
        let executed = index.latest_task(loop_ref)?.is_some();

        self.add_vertex(task.clone(), antecedents, parent, Some(position), None)?;

        let end = TaskConfig::new(
            task.name.clone(),
            format!("{loop_ref}{LOOP_END_SUFFIX}"),
            TaskKind::DoWhileEnd {
                alias_for_ref: loop_ref.to_owned(),
            },
        );
        let end_ref = end.reference().to_owned();

        if executed {
            let mut prefixes = Vec::new();
            for body_task in &do_while.loop_over {
                prefixes.push(format!("{}{ITERATION_SEPARATOR}", body_task.reference()));
                body_task.for_each_descendant(&mut |nested| {
                    prefixes.push(format!("{}{ITERATION_SEPARATOR}", nested.reference()));
                });
            }

            let iterations: Vec<String> = index
                .references()
                .filter(|reference| {
                    prefixes
                        .iter()
                        .any(|prefix| reference.starts_with(prefix.as_str()))
                })
                .map(str::to_owned)
                .collect();

            tracing::trace!(
                target: TRACING_TARGET,
                loop_ref,
                iterations = iterations.len(),
                "Collapsing loop iterations"
            );

            let stack = placeholder::loop_iterations(index, loop_ref, iterations)?;
            let stack_ref = stack.config.reference().to_owned();
            let end_summary = Summary {
                status: stack.summary.status,
                ..Summary::default()
            };

            self.add_vertex(
                stack.config,
                &[loop_ref.to_owned()],
                parent,
                None,
                Some(stack.summary),
            )?;
            self.add_vertex(end, &[stack_ref], parent, Some(position), Some(end_summary))?;
        } else {
            let path = parent.child(position, BranchKey::LoopOver);
            let tails =
                self.process_sequence(&do_while.loop_over, vec![loop_ref.to_owned()], &path)?;
            self.add_vertex(end, &tails, parent, Some(position), None)?;
        }

        Ok(vec![end_ref])
    }

    /// Adds a vertex and wires it from each antecedent.
    ///
    /// Without a summary, status and attempts come from the vertex's
    /// effective reference.
    fn add_vertex(
        &mut self,
        task: TaskConfig,
        antecedents: &[String],
        parent: &SequencePath,
        position: Option<usize>,
        summary: Option<Summary>,
    ) -> DagResult<()> {
        let index = self.index;
        let attempts = index.attempts(task.effective_ref());
        let latest = attempts.last();
        let reference = task.reference().to_owned();

        let mut edges = Vec::with_capacity(antecedents.len());
        for antecedent in antecedents {
            let source = self
                .graph
                .node(antecedent)
                .ok_or_else(|| DagError::not_found("vertex", antecedent.as_str()))?;

            let data = match source.task_config.as_switch() {
                Some(switch) => EdgeData {
                    executed: self.branch_taken(&reference, latest, switch),
                    case_value: Some(case_value(antecedent, &reference, switch)?),
                },
                None => EdgeData {
                    executed: source.is_executed() && summary_or_latest(&summary, latest),
                    case_value: None,
                },
            };
            edges.push((antecedent, data));
        }

        let summary = summary.unwrap_or_else(|| Summary {
            status: latest.map(|attempt| attempt.status),
            ..Summary::default()
        });

        self.graph.set_node(Vertex {
            task_config: task,
            parent: parent.clone(),
            position,
            task_results: attempts.to_vec(),
            status: summary.status,
            tally: summary.tally,
            contains_task_refs: summary.contains_task_refs,
        });

        for (antecedent, data) in edges {
            self.graph.set_edge(antecedent, &reference, data)?;
        }
        Ok(())
    }

    /// Infers whether execution left a switch towards `successor`.
    fn branch_taken(
        &self,
        successor: &str,
        latest: Option<&TaskAttempt>,
        switch: &SwitchTask,
    ) -> bool {
        if latest.is_none() {
            return false;
        }
        if switch.is_default_head(successor) || switch.case_headed_by(successor).is_some() {
            return true;
        }

        // Reached through an empty branch: taken only if no other branch ran.
        !switch
            .branch_heads()
            .any(|head| self.index.latest(head).is_some())
    }
}

/// Returns whether a vertex being added counts as executed.
fn summary_or_latest(summary: &Option<Summary>, latest: Option<&TaskAttempt>) -> bool {
    match summary {
        Some(summary) => summary.status.is_some(),
        None => latest.is_some(),
    }
}

/// Resolves the case value labelling the edge from a switch to `successor`.
fn case_value(switch_ref: &str, successor: &str, switch: &SwitchTask) -> DagResult<String> {
    if switch.is_default_head(successor) {
        return Ok(DEFAULT_CASE.to_owned());
    }
    if let Some(value) = switch.case_headed_by(successor) {
        return Ok(value.to_owned());
    }
    if switch.default_case.is_empty() {
        return Ok(DEFAULT_CASE.to_owned());
    }
    if let Some((value, _)) = switch
        .decision_cases
        .iter()
        .find(|(_, tasks)| tasks.is_empty())
    {
        return Ok(value.clone());
    }

    Err(DagError::UnresolvedCaseValue {
        switch_ref: switch_ref.to_owned(),
        successor_ref: successor.to_owned(),
    })
}
