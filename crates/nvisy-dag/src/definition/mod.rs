//! Workflow definition types.
//!
//! This module contains the serializable, nested task tree a workflow is
//! authored as:
//! - [`WorkflowDef`]: A named root task sequence
//! - [`TaskConfig`]: One task, with control-flow tasks owning nested sequences
//! - [`TaskKind`]: Tagged union over task kinds
//! - [`TaskType`]: String-backed kind discriminant
//! - [`SequencePath`]: Address of a nested sequence within the tree
//!
//! The JSON shape follows the camelCase conventions of the workflow server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod kind;
mod path;
mod task;
pub mod template;
mod validate;

pub use kind::TaskType;
pub use path::{BranchKey, PathSegment, SequencePath};
pub use task::{
    DoWhileTask, DynamicForkTask, EventTask, ForkTask, JoinTask, SubWorkflowTask, SwitchTask,
    TaskConfig, TaskKind,
};
pub use validate::ValidationError;

/// Serializable workflow definition.
///
/// Settings this crate does not interpret, such as `timeoutSeconds` or
/// `failureWorkflow`, are kept in [`WorkflowDef::extra`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDef {
    /// Workflow name.
    pub name: String,
    /// Workflow description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Definition version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Definition schema version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    /// Root task sequence.
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
    /// Names of the expected workflow inputs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_parameters: Vec<String>,
    /// Output wiring.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub output_parameters: Map<String, Value>,
    /// Owner contact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    /// Unmodeled fields, in their original order.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowDef {
    /// Creates a definition with the given name and root tasks.
    pub fn new(name: impl Into<String>, tasks: Vec<TaskConfig>) -> Self {
        Self {
            name: name.into(),
            tasks,
            ..Default::default()
        }
    }

    /// Validates that the definition is ready to be executed.
    ///
    /// Checks that:
    /// - Task reference names are unique across the whole tree
    /// - Every fork is immediately followed by a join
    /// - No do-while has an empty body and no switch is empty
    /// - No synthetic diagram-only task is present
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::validate_tasks(&self.tasks)
    }
}
