//! Task definition types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::kind::TaskType;

/// A single task in a workflow definition.
///
/// Control-flow tasks own their nested task sequences through [`TaskKind`].
/// Task payloads other than the structural fields are carried opaquely and
/// never interpreted. Fields this crate does not model, such as
/// `retryCount` or `taskDefinition`, are kept in [`TaskConfig::extra`] and
/// written back on serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "TaskConfigWire")]
pub struct TaskConfig {
    /// Task definition name.
    pub name: String,
    /// Reference name, unique within a workflow.
    pub task_reference_name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the workflow may continue when this task fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    /// Task input wiring.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub input_parameters: Map<String, Value>,
    /// The task kind and its kind-specific fields.
    #[serde(flatten)]
    pub kind: TaskKind,
    /// Unmodeled fields, in their original order.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Deserialization form of [`TaskConfig`].
///
/// The flattened kind does not consume its keys, so `extra` sees them too
/// and they are removed again on conversion.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskConfigWire {
    name: String,
    task_reference_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    optional: Option<bool>,
    #[serde(default)]
    input_parameters: Map<String, Value>,
    #[serde(flatten)]
    kind: TaskKind,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<TaskConfigWire> for TaskConfig {
    fn from(wire: TaskConfigWire) -> Self {
        let mut extra = wire.extra;
        let owned = wire.kind.wire_fields();
        extra.retain(|key, _| !owned.contains(&key.as_str()));

        Self {
            name: wire.name,
            task_reference_name: wire.task_reference_name,
            description: wire.description,
            optional: wire.optional,
            input_parameters: wire.input_parameters,
            kind: wire.kind,
            extra,
        }
    }
}

impl TaskConfig {
    /// Creates a task with the given name, reference and kind.
    pub fn new(
        name: impl Into<String>,
        task_reference_name: impl Into<String>,
        kind: impl Into<TaskKind>,
    ) -> Self {
        Self {
            name: name.into(),
            task_reference_name: task_reference_name.into(),
            description: None,
            optional: None,
            input_parameters: Map::new(),
            kind: kind.into(),
            extra: Map::new(),
        }
    }

    /// Creates a task whose name equals its reference name.
    pub fn named(reference: impl Into<String>, kind: impl Into<TaskKind>) -> Self {
        let reference = reference.into();
        Self::new(reference.clone(), reference, kind)
    }

    /// Sets an input parameter.
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input_parameters.insert(key.into(), value.into());
        self
    }

    /// Returns the reference name.
    pub fn reference(&self) -> &str {
        &self.task_reference_name
    }

    /// Returns the task type.
    pub fn task_type(&self) -> TaskType {
        self.kind.task_type()
    }

    /// Returns the reference this task reports execution status under.
    ///
    /// Loop terminators borrow the status of the loop they close.
    pub fn effective_ref(&self) -> &str {
        match &self.kind {
            TaskKind::DoWhileEnd { alias_for_ref } => alias_for_ref,
            _ => &self.task_reference_name,
        }
    }

    /// Returns the switch body when this is a switch or decision task.
    pub fn as_switch(&self) -> Option<&SwitchTask> {
        match &self.kind {
            TaskKind::Switch(switch) | TaskKind::Decision(switch) => Some(switch),
            _ => None,
        }
    }

    /// Visits every task nested below this one, depth first.
    pub fn for_each_descendant<'a>(&'a self, visit: &mut impl FnMut(&'a TaskConfig)) {
        for sequence in self.kind.sequences() {
            for task in sequence {
                visit(task);
                task.for_each_descendant(visit);
            }
        }
    }
}

/// Task kind with its structural payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Simple,
    Http,
    Inline,
    Wait,
    Terminate,
    Join(JoinTask),
    ExclusiveJoin(JoinTask),
    SubWorkflow(SubWorkflowTask),
    Event(EventTask),
    SetVariable,
    JsonJqTransform,
    Human,
    /// Static parallel branches.
    ForkJoin(ForkTask),
    /// Parallel branches chosen at run time.
    ForkJoinDynamic(DynamicForkTask),
    /// Conditional branch.
    Switch(SwitchTask),
    /// Deprecated conditional branch, handled exactly like a switch.
    Decision(SwitchTask),
    /// Post-test loop.
    DoWhile(DoWhileTask),
    /// Synthetic start and final bubbles.
    Terminal,
    /// Synthetic bar closing a loop.
    #[serde(rename_all = "camelCase")]
    DoWhileEnd { alias_for_ref: String },
    /// Synthetic stack of collapsed dynamic fork children.
    DfChildrenPlaceholder,
    /// Synthetic stack of collapsed loop iterations.
    LoopChildrenPlaceholder,
}

impl TaskKind {
    /// Returns the type discriminant.
    pub fn task_type(&self) -> TaskType {
        match self {
            Self::Simple => TaskType::Simple,
            Self::Http => TaskType::Http,
            Self::Inline => TaskType::Inline,
            Self::Wait => TaskType::Wait,
            Self::Terminate => TaskType::Terminate,
            Self::Join(_) => TaskType::Join,
            Self::ExclusiveJoin(_) => TaskType::ExclusiveJoin,
            Self::SubWorkflow(_) => TaskType::SubWorkflow,
            Self::Event(_) => TaskType::Event,
            Self::SetVariable => TaskType::SetVariable,
            Self::JsonJqTransform => TaskType::JsonJqTransform,
            Self::Human => TaskType::Human,
            Self::ForkJoin(_) => TaskType::ForkJoin,
            Self::ForkJoinDynamic(_) => TaskType::ForkJoinDynamic,
            Self::Switch(_) => TaskType::Switch,
            Self::Decision(_) => TaskType::Decision,
            Self::DoWhile(_) => TaskType::DoWhile,
            Self::Terminal => TaskType::Terminal,
            Self::DoWhileEnd { .. } => TaskType::DoWhileEnd,
            Self::DfChildrenPlaceholder => TaskType::DfChildrenPlaceholder,
            Self::LoopChildrenPlaceholder => TaskType::LoopChildrenPlaceholder,
        }
    }

    /// Returns the JSON keys this kind reads, the `type` tag included.
    fn wire_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Join(_) | Self::ExclusiveJoin(_) => &["type", "joinOn"],
            Self::SubWorkflow(_) => &["type", "subWorkflowParam"],
            Self::Event(_) => &["type", "sink"],
            Self::ForkJoin(_) => &["type", "forkTasks"],
            Self::ForkJoinDynamic(_) => &[
                "type",
                "dynamicForkTasksParam",
                "dynamicForkTasksInputParamName",
            ],
            Self::Switch(_) | Self::Decision(_) => &[
                "type",
                "evaluatorType",
                "expression",
                "caseValueParam",
                "decisionCases",
                "defaultCase",
            ],
            Self::DoWhile(_) => &["type", "loopCondition", "loopOver"],
            Self::DoWhileEnd { .. } => &["type", "aliasForRef"],
            Self::Simple
            | Self::Http
            | Self::Inline
            | Self::Wait
            | Self::Terminate
            | Self::SetVariable
            | Self::JsonJqTransform
            | Self::Human
            | Self::Terminal
            | Self::DfChildrenPlaceholder
            | Self::LoopChildrenPlaceholder => &["type"],
        }
    }

    /// Returns whether this is a static or dynamic fork.
    pub const fn is_fork(&self) -> bool {
        matches!(self, Self::ForkJoin(_) | Self::ForkJoinDynamic(_))
    }

    /// Returns whether this is a join.
    pub const fn is_join(&self) -> bool {
        matches!(self, Self::Join(_))
    }

    /// Returns the nested task sequences owned by this kind, in walk order.
    pub fn sequences(&self) -> Vec<&Vec<TaskConfig>> {
        match self {
            Self::ForkJoin(fork) => fork.fork_tasks.iter().collect(),
            Self::Switch(switch) | Self::Decision(switch) => std::iter::once(&switch.default_case)
                .chain(switch.decision_cases.values())
                .collect(),
            Self::DoWhile(do_while) => vec![&do_while.loop_over],
            _ => Vec::new(),
        }
    }
}

impl From<JoinTask> for TaskKind {
    fn from(join: JoinTask) -> Self {
        Self::Join(join)
    }
}

impl From<ForkTask> for TaskKind {
    fn from(fork: ForkTask) -> Self {
        Self::ForkJoin(fork)
    }
}

impl From<DynamicForkTask> for TaskKind {
    fn from(fork: DynamicForkTask) -> Self {
        Self::ForkJoinDynamic(fork)
    }
}

impl From<SwitchTask> for TaskKind {
    fn from(switch: SwitchTask) -> Self {
        Self::Switch(switch)
    }
}

impl From<DoWhileTask> for TaskKind {
    fn from(do_while: DoWhileTask) -> Self {
        Self::DoWhile(do_while)
    }
}

/// Join configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTask {
    /// References of the branch tails this join waits on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub join_on: Vec<String>,
}

/// Sub-workflow configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubWorkflowTask {
    /// Name and version of the workflow to start.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub sub_workflow_param: Value,
}

/// Event publication configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventTask {
    /// Event sink, e.g. `conductor` or `sqs:queue`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink: Option<String>,
}

/// Static fork configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkTask {
    /// Parallel branches; tasks within a branch run sequentially.
    #[serde(default)]
    pub fork_tasks: Vec<Vec<TaskConfig>>,
}

/// Dynamic fork configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicForkTask {
    /// Input parameter holding the tasks to spawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_fork_tasks_param: Option<String>,
    /// Input parameter holding the inputs of the spawned tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_fork_tasks_input_param_name: Option<String>,
}

/// Switch (and decision) configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchTask {
    /// Evaluator kind, e.g. `value-param` or `javascript`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator_type: Option<String>,
    /// Expression selecting the case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Input parameter selecting the case (decision tasks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_value_param: Option<String>,
    /// Branches keyed by case value, in definition order.
    #[serde(default)]
    pub decision_cases: IndexMap<String, Vec<TaskConfig>>,
    /// Branch taken when no case matches. Empty means no default.
    #[serde(default)]
    pub default_case: Vec<TaskConfig>,
}

impl SwitchTask {
    /// Returns whether `reference` heads the default branch.
    pub fn is_default_head(&self, reference: &str) -> bool {
        self.default_case
            .first()
            .is_some_and(|task| task.task_reference_name == reference)
    }

    /// Returns the case value whose branch starts with `reference`.
    pub fn case_headed_by(&self, reference: &str) -> Option<&str> {
        self.decision_cases
            .iter()
            .find(|(_, tasks)| {
                tasks
                    .first()
                    .is_some_and(|task| task.task_reference_name == reference)
            })
            .map(|(value, _)| value.as_str())
    }

    /// Returns the reference names heading each non-empty branch.
    pub fn branch_heads(&self) -> impl Iterator<Item = &str> {
        std::iter::once(&self.default_case)
            .chain(self.decision_cases.values())
            .filter_map(|tasks| tasks.first())
            .map(|task| task.task_reference_name.as_str())
    }
}

/// Do-while configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoWhileTask {
    /// Loop condition evaluated after each iteration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_condition: Option<String>,
    /// Loop body.
    #[serde(default)]
    pub loop_over: Vec<TaskConfig>,
}
