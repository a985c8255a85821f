//! Graph construction configuration.

use derive_builder::Builder;

use crate::error::DagError;

/// Default number of dynamic fork children at which they are collapsed.
pub const DEFAULT_COLLAPSE_LIMIT: usize = 3;

/// Configuration for building workflow graphs.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct DagConfig {
    /// Number of spawned children at or above which a dynamic fork is drawn
    /// as a single placeholder instead of one vertex per child.
    #[builder(default = "DEFAULT_COLLAPSE_LIMIT")]
    pub dynamic_fork_collapse_limit: usize,
}

impl DagConfig {
    /// Returns a builder for creating a configuration.
    pub fn builder() -> DagConfigBuilder {
        DagConfigBuilder::default()
    }
}

impl DagConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(limit) = self.dynamic_fork_collapse_limit {
            if limit == 0 {
                return Err("dynamic_fork_collapse_limit must be at least 1".into());
            }
        }
        Ok(())
    }
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            dynamic_fork_collapse_limit: DEFAULT_COLLAPSE_LIMIT,
        }
    }
}

impl From<DagConfigBuilderError> for DagError {
    fn from(error: DagConfigBuilderError) -> Self {
        Self::Config(error.to_string())
    }
}
