#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod definition;
mod editor;
mod error;
pub mod execution;
pub mod graph;

#[doc(hidden)]
pub mod prelude;

pub use config::DagConfig;
pub use error::{DagError, DagResult};
pub use graph::WorkflowDag;

/// Tracing target for graph operations.
pub const TRACING_TARGET: &str = "nvisy_dag";

/// Reference name of the synthetic start bubble.
pub const START_REF: &str = "__start";

/// Reference name of the synthetic final bubble.
pub const FINAL_REF: &str = "__final";

/// Case value labelling edges into a switch's default branch.
pub const DEFAULT_CASE: &str = "default";
