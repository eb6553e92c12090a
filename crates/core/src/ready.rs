// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Ready-work resolution.
//!
//! An issue is *ready* when it is open or in progress and not blocked. The
//! blocked set is computed fresh on every call, in two steps:
//!
//! 1. Directly blocked: the dependent side of every `blocks` edge whose
//!    prerequisite is in the store and not closed.
//! 2. Propagation: the children (`parent_child` edges point child → parent)
//!    of any blocked issue are blocked too, repeated to a fixed point.
//!
//! `related` edges take no part in either step. Cycles are not rejected; a
//! cycle of open issues joined by `blocks` edges stays blocked for good.

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::trace;

use crate::db::Store;
use crate::dependency::{DepType, Dependency};
use crate::error::Result;
use crate::filter::IssueFilter;
use crate::issue::Issue;

/// Compute the ids of every blocked issue.
///
/// `issues` supplies the statuses of prerequisites; `deps` maps each
/// dependent id to its outgoing edges, as returned by
/// [`Store::get_all_dependencies`]. A `blocks` edge whose prerequisite is
/// not among `issues` does not block.
pub fn blocked_ids(issues: &[Issue], deps: &HashMap<String, Vec<Dependency>>) -> HashSet<String> {
    let unresolved: HashSet<&str> = issues
        .iter()
        .filter(|issue| !issue.is_closed())
        .map(|issue| issue.id.as_str())
        .collect();

    // parent id -> child ids
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut blocked: HashSet<String> = HashSet::new();
    let mut pending: VecDeque<&str> = VecDeque::new();

    for dep in deps.values().flatten() {
        match dep.dep_type {
            DepType::Blocks => {
                if unresolved.contains(dep.depends_on_id.as_str())
                    && blocked.insert(dep.issue_id.clone())
                {
                    pending.push_back(&dep.issue_id);
                }
            }
            DepType::ParentChild => children
                .entry(dep.depends_on_id.as_str())
                .or_default()
                .push(dep.issue_id.as_str()),
            DepType::Related => {}
        }
    }

    let direct = blocked.len();
    while let Some(parent) = pending.pop_front() {
        for &child in children.get(parent).into_iter().flatten() {
            if blocked.insert(child.to_string()) {
                pending.push_back(child);
            }
        }
    }

    trace!(direct, total = blocked.len(), "computed blocked set");
    blocked
}

/// Keep the open and in-progress issues that are not blocked, preserving order.
pub fn ready_issues(issues: Vec<Issue>, blocked: &HashSet<String>) -> Vec<Issue> {
    issues
        .into_iter()
        .filter(|issue| issue.status.is_active() && !blocked.contains(&issue.id))
        .collect()
}

impl Store {
    /// Ids of all blocked issues, directly or through a blocked ancestor.
    pub fn blocked_issue_ids(&self) -> Result<HashSet<String>> {
        let issues = self.list_issues()?;
        let deps = self.get_all_dependencies()?;
        Ok(blocked_ids(&issues, &deps))
    }

    /// Open and in-progress issues with nothing blocking them, ordered by
    /// priority and then creation time.
    pub fn ready_work(&self) -> Result<Vec<Issue>> {
        let issues = self.list_issues()?;
        let deps = self.get_all_dependencies()?;
        let blocked = blocked_ids(&issues, &deps);
        Ok(ready_issues(issues, &blocked))
    }

    /// Ready work narrowed by `filter`.
    pub fn ready_work_filtered(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        Ok(filter.apply(self.ready_work()?))
    }
}

#[cfg(test)]
#[path = "ready_tests.rs"]
mod tests;
