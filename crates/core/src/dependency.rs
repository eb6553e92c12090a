// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed dependency edges between issues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Relationship carried by a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepType {
    /// The dependent cannot be ready while the prerequisite is not closed.
    Blocks,
    /// Child to parent. Does not block on its own, but a blocked parent
    /// blocks all of its descendants.
    #[serde(alias = "parent-child")]
    ParentChild,
    /// Informational only; never affects readiness.
    Related,
}

impl DepType {
    /// Returns the string representation used in storage and exchange.
    pub fn as_str(&self) -> &'static str {
        match self {
            DepType::Blocks => "blocks",
            DepType::ParentChild => "parent_child",
            DepType::Related => "related",
        }
    }
}

impl fmt::Display for DepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DepType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "blocks" => Ok(DepType::Blocks),
            "parent_child" | "parent-child" => Ok(DepType::ParentChild),
            "related" => Ok(DepType::Related),
            _ => Err(Error::InvalidDepType(s.to_string())),
        }
    }
}

/// A directed edge from a dependent issue to its prerequisite.
///
/// If issue B waits on A, the edge is stored as
/// `issue_id: "B", depends_on_id: "A", dep_type: Blocks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    /// The dependent issue.
    pub issue_id: String,
    /// The prerequisite issue.
    pub depends_on_id: String,
    /// The type of relationship.
    pub dep_type: DepType,
    /// When the dependency was created.
    pub created_at: DateTime<Utc>,
}

impl Dependency {
    /// Creates an edge stamped with the current time.
    pub fn new(
        issue_id: impl Into<String>,
        depends_on_id: impl Into<String>,
        dep_type: DepType,
    ) -> Self {
        Dependency {
            issue_id: issue_id.into(),
            depends_on_id: depends_on_id.into(),
            dep_type,
            created_at: Utc::now(),
        }
    }

    /// Checks both endpoints are present and distinct.
    ///
    /// Unknown types are rejected when parsed into [`DepType`].
    pub fn validate(&self) -> Result<()> {
        if self.issue_id.is_empty() {
            return Err(Error::Validation("issue_id cannot be empty".to_string()));
        }
        if self.depends_on_id.is_empty() {
            return Err(Error::Validation(
                "depends_on_id cannot be empty".to_string(),
            ));
        }
        if self.issue_id == self.depends_on_id {
            return Err(Error::Validation(format!(
                "issue {} cannot depend on itself",
                self.issue_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dependency_tests.rs"]
mod tests;
