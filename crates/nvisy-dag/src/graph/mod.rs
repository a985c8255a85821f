//! Flattened workflow graph.
//!
//! This module turns a nested task tree into a directed graph suitable for
//! drawing and inspection:
//! - [`WorkflowDag`]: The task tree, its bound execution and the derived graph
//! - [`TaskGraph`]: Vertices and edges keyed by reference name
//! - [`Vertex`]: A drawn task with its attempts and status
//! - [`EdgeData`]: Whether execution flowed along an edge, and its case value
//! - [`TaskCoordinate`]: Addresses a task by attempt id or reference name

mod builder;
mod coordinate;
mod dag;
mod graph;
mod placeholder;
mod vertex;

pub use coordinate::TaskCoordinate;
pub use dag::{MinimalTaskConfig, TaskConfigRef, WorkflowDag};
pub use graph::TaskGraph;
pub use placeholder::{
    DF_PLACEHOLDER_SUFFIX, ITERATION_SEPARATOR, LOOP_END_SUFFIX, LOOP_PLACEHOLDER_SUFFIX,
};
pub use vertex::{EdgeData, Tally, Vertex};
