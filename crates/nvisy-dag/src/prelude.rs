//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use nvisy_dag::prelude::*;
//! ```

pub use crate::config::DagConfig;
pub use crate::definition::{TaskConfig, TaskKind, TaskType, WorkflowDef};
pub use crate::error::{DagError, DagResult};
pub use crate::execution::{ExecutionAndTasks, TaskAttempt, TaskStatus, WorkflowStatus};
pub use crate::graph::{EdgeData, TaskCoordinate, Vertex, WorkflowDag};
