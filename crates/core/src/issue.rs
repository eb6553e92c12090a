// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Core issue types for the bl issue tracker.
//!
//! This module contains the fundamental data types: Issue, IssueType, Status,
//! and Resolution, along with the field validation applied before any issue
//! reaches the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Highest allowed priority value (lowest urgency).
pub const MAX_PRIORITY: u8 = 4;

/// Priority assigned to new issues.
pub const DEFAULT_PRIORITY: u8 = 2;

/// Classification of issues by their nature and scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// Standard unit of work.
    #[default]
    Task,
    /// Defect or problem to fix.
    Bug,
    /// New capability.
    Feature,
    /// Large initiative grouping other issues through parent-child edges.
    Epic,
}

impl IssueType {
    /// Returns the string representation used in storage and exchange.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Task => "task",
            IssueType::Bug => "bug",
            IssueType::Feature => "feature",
            IssueType::Epic => "epic",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "task" => Ok(IssueType::Task),
            "bug" => Ok(IssueType::Bug),
            "feature" => Ok(IssueType::Feature),
            "epic" => Ok(IssueType::Epic),
            _ => Err(Error::InvalidIssueType(s.to_string())),
        }
    }
}

/// Workflow status of an issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Not yet started. Initial state for new issues.
    #[default]
    Open,
    /// Currently being worked on.
    InProgress,
    /// Finished; see [`Resolution`] for how.
    Closed,
}

impl Status {
    /// Returns the string representation used in storage and exchange.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::InProgress => "in_progress",
            Status::Closed => "closed",
        }
    }

    /// Returns true for statuses that can appear in ready work.
    pub fn is_active(&self) -> bool {
        !matches!(self, Status::Closed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(Status::Open),
            "in_progress" => Ok(Status::InProgress),
            "closed" => Ok(Status::Closed),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// Why an issue was closed.
///
/// An absent resolution (`None` wherever `Option<Resolution>` appears, the
/// empty string on the wire) is valid and reads as [`Resolution::Done`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Work completed.
    Done,
    /// Intentionally rejected.
    Wontfix,
    /// Duplicate of another issue.
    Duplicate,
}

impl Resolution {
    /// Returns the string representation used in storage and exchange.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Done => "done",
            Resolution::Wontfix => "wontfix",
            Resolution::Duplicate => "duplicate",
        }
    }

    /// Parses a resolution where the empty string means "none given".
    pub fn parse_optional(s: &str) -> Result<Option<Self>> {
        if s.is_empty() {
            Ok(None)
        } else {
            s.parse().map(Some)
        }
    }

    /// The effective resolution of a closed issue.
    pub fn effective(resolution: Option<Resolution>) -> Resolution {
        resolution.unwrap_or(Resolution::Done)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "done" => Ok(Resolution::Done),
            "wontfix" => Ok(Resolution::Wontfix),
            "duplicate" => Ok(Resolution::Duplicate),
            _ => Err(Error::InvalidResolution(s.to_string())),
        }
    }
}

/// Deserializes an optional resolution, mapping `""` to `None`.
pub(crate) fn deserialize_resolution<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Resolution>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None => Ok(None),
        Some(s) => Resolution::parse_optional(s).map_err(serde::de::Error::custom),
    }
}

/// The primary entity representing a tracked work item.
///
/// Values handed out by the store are copies; changing one has no effect
/// until it is passed back through [`crate::Store::update_issue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Unique identifier (format: `{prefix}-{base36}`).
    pub id: String,
    /// Short description of the work.
    pub title: String,
    /// Longer description providing context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Current workflow state.
    pub status: Status,
    /// 0 (most urgent) through 4.
    pub priority: u8,
    /// Classification of the issue.
    pub issue_type: IssueType,
    /// When the issue was created.
    pub created_at: DateTime<Utc>,
    /// When the issue was last modified.
    pub updated_at: DateTime<Utc>,
    /// When the issue was closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// How the issue was closed.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_resolution"
    )]
    pub resolution: Option<Resolution>,
}

impl Issue {
    /// Creates an open task with default priority.
    pub fn new(id: String, title: String, created_at: DateTime<Utc>) -> Self {
        Issue {
            id,
            title,
            description: None,
            status: Status::Open,
            priority: DEFAULT_PRIORITY,
            issue_type: IssueType::Task,
            created_at,
            updated_at: created_at,
            closed_at: None,
            resolution: None,
        }
    }

    /// Sets the description (builder pattern).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the priority (builder pattern).
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the issue type (builder pattern).
    pub fn with_type(mut self, issue_type: IssueType) -> Self {
        self.issue_type = issue_type;
        self
    }

    /// Checks that every field holds a storable value.
    ///
    /// Status, type, and resolution are closed enums, so values outside them
    /// are rejected when parsed (see the `FromStr` impls); what remains to
    /// check here is the free-form title and the priority range.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("title cannot be empty".to_string()));
        }
        if self.priority > MAX_PRIORITY {
            return Err(Error::Validation(format!(
                "priority must be 0-{MAX_PRIORITY}, got {}",
                self.priority
            )));
        }
        Ok(())
    }

    /// Returns true if the issue is closed.
    pub fn is_closed(&self) -> bool {
        self.status == Status::Closed
    }
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
