//! Task type discriminant.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// String-backed task type, as found in the `type` field of a task
/// definition and the `taskType` field of an execution record.
///
/// Execution records report plain worker tasks by their task definition name
/// rather than `SIMPLE`, so unknown strings are kept in [`TaskType::Other`].
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    Simple,
    Http,
    Inline,
    Wait,
    Terminate,
    Join,
    ExclusiveJoin,
    SubWorkflow,
    Event,
    SetVariable,
    JsonJqTransform,
    Human,
    ForkJoin,
    ForkJoinDynamic,
    /// Reported by execution records for both static and dynamic forks.
    Fork,
    Switch,
    /// Deprecated predecessor of [`TaskType::Switch`].
    Decision,
    DoWhile,
    /// Synthetic start and final bubbles.
    Terminal,
    /// Synthetic bar closing a loop.
    DoWhileEnd,
    DfChildrenPlaceholder,
    LoopChildrenPlaceholder,
    #[strum(default, transparent)]
    Other(String),
}

impl TaskType {
    /// Returns whether this type only ever appears as a generated vertex.
    pub const fn is_synthetic(&self) -> bool {
        matches!(
            self,
            Self::Terminal
                | Self::DoWhileEnd
                | Self::DfChildrenPlaceholder
                | Self::LoopChildrenPlaceholder
        )
    }
}

impl From<String> for TaskType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or(Self::Other(value))
    }
}

impl From<TaskType> for String {
    fn from(value: TaskType) -> Self {
        match value {
            TaskType::Other(name) => name,
            known => known.as_ref().to_owned(),
        }
    }
}
