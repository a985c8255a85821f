//! Task coordinates.

use serde::{Deserialize, Serialize};

use crate::error::{DagError, DagResult};

/// Addresses a task either by attempt id or by reference name.
///
/// Exactly one of the two must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskCoordinate {
    /// Id of one task attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Reference name of the task.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl TaskCoordinate {
    /// Creates a coordinate addressing a task attempt by id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            reference: None,
        }
    }

    /// Creates a coordinate addressing a task by reference name.
    pub fn by_ref(reference: impl Into<String>) -> Self {
        Self {
            id: None,
            reference: Some(reference.into()),
        }
    }

    pub(crate) fn key(&self) -> DagResult<CoordinateKey<'_>> {
        match (&self.id, &self.reference) {
            (Some(id), None) => Ok(CoordinateKey::Id(id)),
            (None, Some(reference)) => Ok(CoordinateKey::Ref(reference)),
            _ => Err(DagError::InvalidCoordinate),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoordinateKey<'a> {
    Id(&'a str),
    Ref(&'a str),
}
