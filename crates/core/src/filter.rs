// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Field filters for issue listings.

use crate::error::{Error, Result};
use crate::issue::{Issue, IssueType, Resolution, Status, MAX_PRIORITY};

/// Restricts a listing to issues matching every set field.
///
/// An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    pub status: Option<Status>,
    pub priority: Option<u8>,
    pub issue_type: Option<IssueType>,
    /// Matches the effective resolution, so `Done` also matches closed
    /// issues with no recorded resolution.
    pub resolution: Option<Resolution>,
}

impl IssueFilter {
    /// Builds a filter from raw strings, rejecting unknown values up front.
    ///
    /// Empty strings leave the corresponding field unset.
    pub fn parse(
        status: &str,
        priority: Option<u8>,
        issue_type: &str,
        resolution: &str,
    ) -> Result<Self> {
        if let Some(p) = priority {
            if p > MAX_PRIORITY {
                return Err(Error::Validation(format!(
                    "invalid priority: {p} (valid: 0-{MAX_PRIORITY})"
                )));
            }
        }
        Ok(IssueFilter {
            status: non_empty(status).map(str::parse).transpose()?,
            priority,
            issue_type: non_empty(issue_type).map(str::parse).transpose()?,
            resolution: Resolution::parse_optional(resolution)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &IssueFilter::default()
    }

    pub fn matches(&self, issue: &Issue) -> bool {
        if self.status.is_some_and(|s| s != issue.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != issue.priority) {
            return false;
        }
        if self.issue_type.is_some_and(|t| t != issue.issue_type) {
            return false;
        }
        if let Some(resolution) = self.resolution {
            if !issue.is_closed() || Resolution::effective(issue.resolution) != resolution {
                return false;
            }
        }
        true
    }

    /// Keeps matching issues, preserving their order.
    pub fn apply(&self, mut issues: Vec<Issue>) -> Vec<Issue> {
        if !self.is_empty() {
            issues.retain(|issue| self.matches(issue));
        }
        issues
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
