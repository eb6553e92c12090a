// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::unwrap_used)]

use chrono::{Duration, TimeZone, Utc};
use std::collections::HashSet;

pub use bl_core::{DepType, Issue, IssueType, Resolution, Status, Store};
pub use tempfile::TempDir;

/// Create an open task; `n` orders creation time so listings are deterministic.
pub fn create(store: &Store, id: &str, priority: u8, n: i64) -> Issue {
    let base = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
    let issue = Issue::new(id.to_string(), format!("Issue {id}"), base + Duration::minutes(n))
        .with_priority(priority);
    store.create_issue(&issue).unwrap();
    issue
}

/// `dependent` waits on `prerequisite`.
pub fn blocks(store: &Store, dependent: &str, prerequisite: &str) {
    store
        .add_dependency(dependent, prerequisite, DepType::Blocks)
        .unwrap();
}

pub fn child_of(store: &Store, child: &str, parent: &str) {
    store
        .add_dependency(child, parent, DepType::ParentChild)
        .unwrap();
}

pub fn ready_ids(store: &Store) -> Vec<String> {
    store
        .ready_work()
        .unwrap()
        .into_iter()
        .map(|issue| issue.id)
        .collect()
}

pub fn blocked_sorted(store: &Store) -> Vec<String> {
    let mut ids: Vec<String> = store.blocked_issue_ids().unwrap().into_iter().collect();
    ids.sort();
    ids
}

pub fn ids(set: &[&str]) -> Vec<String> {
    set.iter().map(|s| s.to_string()).collect()
}
