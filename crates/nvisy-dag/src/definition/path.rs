//! Addressing of nested task sequences.
//!
//! A vertex remembers the sequence that owns its task as a [`SequencePath`]
//! instead of a pointer, so editing operations can locate and splice the
//! owning sequence while the tree itself stays exclusively owned.

use std::fmt;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::task::{TaskConfig, TaskKind};

/// Selects one nested sequence of a control-flow task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(tag = "branch", content = "key", rename_all = "camelCase")]
pub enum BranchKey {
    /// A parallel branch of a static fork.
    #[display("forkTasks[{_0}]")]
    Fork(usize),
    /// A switch case, by case value.
    #[display("decisionCases[{_0}]")]
    Case(String),
    /// The switch default branch.
    #[display("defaultCase")]
    Default,
    /// The do-while body.
    #[display("loopOver")]
    LoopOver,
}

/// One step from a sequence into a nested sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("{index}.{branch}")]
pub struct PathSegment {
    /// Index of the control-flow task in the enclosing sequence.
    pub index: usize,
    /// Which of its sequences to enter.
    pub branch: BranchKey,
}

/// Path from the root task sequence to a nested sequence.
///
/// The empty path denotes the root sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequencePath(Vec<PathSegment>);

impl SequencePath {
    /// Returns the path of the root sequence.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns the path of a sequence nested in the task at `index`.
    pub fn child(&self, index: usize, branch: BranchKey) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment { index, branch });
        Self(segments)
    }

    /// Splits off the last segment, returning the enclosing sequence's path
    /// together with the step into this one.
    pub fn split_last(&self) -> Option<(Self, &PathSegment)> {
        let (last, rest) = self.0.split_last()?;
        Some((Self(rest.to_vec()), last))
    }

    /// Resolves the sequence this path points at.
    pub fn resolve<'a>(&self, root: &'a [TaskConfig]) -> Option<&'a [TaskConfig]> {
        let mut sequence = root;
        for segment in &self.0 {
            let task = sequence.get(segment.index)?;
            sequence = branch(task, &segment.branch)?;
        }
        Some(sequence)
    }

    /// Resolves the sequence this path points at, mutably.
    pub fn resolve_mut<'a>(&self, root: &'a mut Vec<TaskConfig>) -> Option<&'a mut Vec<TaskConfig>> {
        let mut sequence = root;
        for segment in &self.0 {
            let task = sequence.get_mut(segment.index)?;
            sequence = branch_mut(task, &segment.branch)?;
        }
        Some(sequence)
    }
}

impl fmt::Display for SequencePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("root")?;
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

fn branch<'a>(task: &'a TaskConfig, key: &BranchKey) -> Option<&'a [TaskConfig]> {
    match (&task.kind, key) {
        (TaskKind::ForkJoin(fork), BranchKey::Fork(i)) => fork.fork_tasks.get(*i).map(Vec::as_slice),
        (TaskKind::Switch(switch) | TaskKind::Decision(switch), BranchKey::Case(value)) => {
            switch.decision_cases.get(value).map(Vec::as_slice)
        }
        (TaskKind::Switch(switch) | TaskKind::Decision(switch), BranchKey::Default) => {
            Some(switch.default_case.as_slice())
        }
        (TaskKind::DoWhile(do_while), BranchKey::LoopOver) => Some(do_while.loop_over.as_slice()),
        _ => None,
    }
}

fn branch_mut<'a>(task: &'a mut TaskConfig, key: &BranchKey) -> Option<&'a mut Vec<TaskConfig>> {
    match (&mut task.kind, key) {
        (TaskKind::ForkJoin(fork), BranchKey::Fork(i)) => fork.fork_tasks.get_mut(*i),
        (TaskKind::Switch(switch) | TaskKind::Decision(switch), BranchKey::Case(value)) => {
            switch.decision_cases.get_mut(value)
        }
        (TaskKind::Switch(switch) | TaskKind::Decision(switch), BranchKey::Default) => {
            Some(&mut switch.default_case)
        }
        (TaskKind::DoWhile(do_while), BranchKey::LoopOver) => Some(&mut do_while.loop_over),
        _ => None,
    }
}
