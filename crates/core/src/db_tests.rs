// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::issue::IssueType;
use chrono::TimeZone;
use std::panic::{catch_unwind, AssertUnwindSafe};

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, minute, 0).unwrap()
}

fn test_issue(id: &str, title: &str) -> Issue {
    Issue::new(id.to_string(), title.to_string(), at(0))
}

fn store_with(ids: &[&str]) -> Store {
    let store = Store::open_in_memory().unwrap();
    for id in ids {
        store.create_issue(&test_issue(id, &format!("Issue {id}"))).unwrap();
    }
    store
}

#[test]
fn create_and_get_issue() {
    let store = Store::open_in_memory().unwrap();
    let issue = test_issue("bl-1", "Test issue")
        .with_description("details")
        .with_priority(1)
        .with_type(IssueType::Bug);

    store.create_issue(&issue).unwrap();
    let retrieved = store.get_issue("bl-1").unwrap();

    assert_eq!(retrieved, issue);
    assert_eq!(retrieved.status, Status::Open);
    assert!(retrieved.closed_at.is_none());
}

#[test]
fn get_returns_independent_copy() {
    let store = store_with(&["bl-1"]);
    let mut copy = store.get_issue("bl-1").unwrap();
    copy.title = "changed".to_string();

    assert_eq!(store.get_issue("bl-1").unwrap().title, "Issue bl-1");
}

#[test]
fn issue_exists() {
    let store = Store::open_in_memory().unwrap();
    assert!(!store.issue_exists("bl-1").unwrap());
    store.create_issue(&test_issue("bl-1", "Test")).unwrap();
    assert!(store.issue_exists("bl-1").unwrap());
}

#[test]
fn get_missing_issue_is_not_found() {
    let store = Store::open_in_memory().unwrap();
    let err = store.get_issue("nope").unwrap_err();
    assert!(matches!(err, Error::IssueNotFound(ref id) if id == "nope"));
}

#[test]
fn create_duplicate_id_fails() {
    let store = store_with(&["bl-1"]);
    let err = store.create_issue(&test_issue("bl-1", "Again")).unwrap_err();
    assert!(matches!(err, Error::DuplicateId(ref id) if id == "bl-1"));
    assert_eq!(store.get_issue("bl-1").unwrap().title, "Issue bl-1");
}

#[test]
fn create_rejects_blank_id_and_title() {
    let store = Store::open_in_memory().unwrap();

    let err = store.create_issue(&test_issue("", "Title")).unwrap_err();
    assert!(err.is_validation());

    let err = store.create_issue(&test_issue("bl-1", "   ")).unwrap_err();
    assert!(err.is_validation());

    assert!(store.list_issues().unwrap().is_empty());
}

#[test]
fn create_rejects_out_of_range_priority() {
    let store = Store::open_in_memory().unwrap();
    let issue = test_issue("bl-1", "Title").with_priority(5);
    assert!(store.create_issue(&issue).unwrap_err().is_validation());
}

#[test]
fn update_overwrites_fields_and_refreshes_updated_at() {
    let store = store_with(&["bl-1"]);
    let mut issue = store.get_issue("bl-1").unwrap();
    issue.title = "Renamed".to_string();
    issue.status = Status::InProgress;
    issue.priority = 0;

    assert_eq!(store.update_issue(&issue).unwrap(), WriteOutcome::Applied);

    let retrieved = store.get_issue("bl-1").unwrap();
    assert_eq!(retrieved.title, "Renamed");
    assert_eq!(retrieved.status, Status::InProgress);
    assert_eq!(retrieved.priority, 0);
    assert_eq!(retrieved.created_at, at(0));
    assert!(retrieved.updated_at > at(0));
}

#[test]
fn update_missing_issue_is_no_match() {
    let store = Store::open_in_memory().unwrap();
    let outcome = store.update_issue(&test_issue("ghost", "Title")).unwrap();
    assert_eq!(outcome, WriteOutcome::NoMatch);
    assert!(!store.issue_exists("ghost").unwrap());
}

#[test]
fn update_rejects_invalid_issue() {
    let store = store_with(&["bl-1"]);
    let mut issue = store.get_issue("bl-1").unwrap();
    issue.title.clear();
    assert!(store.update_issue(&issue).unwrap_err().is_validation());
    assert_eq!(store.get_issue("bl-1").unwrap().title, "Issue bl-1");
}

#[test]
fn replace_issue_keeps_given_timestamps() {
    let store = store_with(&["bl-1"]);
    let mut issue = store.get_issue("bl-1").unwrap();
    issue.updated_at = at(30);

    assert!(store.replace_issue(&issue).unwrap().is_applied());
    assert_eq!(store.get_issue("bl-1").unwrap().updated_at, at(30));
}

#[test]
fn close_sets_status_resolution_and_closed_at() {
    let store = store_with(&["bl-1"]);

    let outcome = store.close_issue("bl-1", Some(Resolution::Wontfix)).unwrap();
    assert!(outcome.is_applied());

    let closed = store.get_issue("bl-1").unwrap();
    assert_eq!(closed.status, Status::Closed);
    assert_eq!(closed.resolution, Some(Resolution::Wontfix));
    assert!(closed.closed_at.is_some());
    assert!(closed.updated_at > at(0));
}

#[test]
fn close_without_resolution_reads_as_done() {
    let store = store_with(&["bl-1"]);
    store.close_issue("bl-1", None).unwrap();

    let closed = store.get_issue("bl-1").unwrap();
    assert_eq!(closed.resolution, None);
    assert_eq!(Resolution::effective(closed.resolution), Resolution::Done);
}

#[test]
fn reclosing_keeps_original_closed_at() {
    let store = store_with(&["bl-1"]);
    store.close_issue("bl-1", None).unwrap();
    let first = store.get_issue("bl-1").unwrap();

    store.close_issue("bl-1", Some(Resolution::Duplicate)).unwrap();
    let second = store.get_issue("bl-1").unwrap();

    assert_eq!(second.closed_at, first.closed_at);
    assert_eq!(second.resolution, Some(Resolution::Duplicate));
    assert!(second.updated_at >= first.updated_at);
}

#[test]
fn close_missing_issue_is_no_match() {
    let store = Store::open_in_memory().unwrap();
    assert_eq!(store.close_issue("ghost", None).unwrap(), WriteOutcome::NoMatch);
}

#[test]
fn close_with_invalid_resolution_fails_without_writing() {
    let store = store_with(&["bl-1"]);
    let err = store.close_issue_with("bl-1", "fixed").unwrap_err();
    assert!(matches!(err, Error::InvalidResolution(ref r) if r == "fixed"));
    assert_eq!(store.get_issue("bl-1").unwrap().status, Status::Open);
}

#[test]
fn close_with_empty_resolution_is_allowed() {
    let store = store_with(&["bl-1"]);
    assert!(store.close_issue_with("bl-1", "").unwrap().is_applied());
    assert_eq!(store.get_issue("bl-1").unwrap().resolution, None);
}

#[test]
fn delete_removes_issue_and_edges_in_both_directions() {
    let store = store_with(&["a", "b", "c"]);
    store.add_dependency("a", "b", DepType::Blocks).unwrap();
    store.add_dependency("b", "c", DepType::ParentChild).unwrap();
    store.add_dependency("a", "c", DepType::Related).unwrap();

    store.delete_issue("b").unwrap();

    assert!(!store.issue_exists("b").unwrap());
    assert!(store.get_dependencies("b").unwrap().is_empty());
    let remaining = store.get_dependencies("a").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].depends_on_id, "c");
}

#[test]
fn delete_missing_issue_is_not_found_and_keeps_dangling_edges() {
    let store = store_with(&["a"]);
    store.add_dependency("a", "ghost", DepType::Blocks).unwrap();

    let err = store.delete_issue("ghost").unwrap_err();
    assert!(matches!(err, Error::IssueNotFound(ref id) if id == "ghost"));

    // Rolled back: the edge pointing at the missing issue is still there.
    assert_eq!(store.get_dependencies("a").unwrap().len(), 1);
}

#[test]
fn list_orders_by_priority_then_created_then_insertion() {
    let store = Store::open_in_memory().unwrap();
    store
        .create_issue(&Issue::new("late".into(), "Late".into(), at(5)).with_priority(1))
        .unwrap();
    store
        .create_issue(&Issue::new("tie-1".into(), "Tie".into(), at(1)).with_priority(1))
        .unwrap();
    store
        .create_issue(&Issue::new("tie-2".into(), "Tie".into(), at(1)).with_priority(1))
        .unwrap();
    store
        .create_issue(&Issue::new("urgent".into(), "Urgent".into(), at(9)).with_priority(0))
        .unwrap();
    store
        .create_issue(&Issue::new("low".into(), "Low".into(), at(0)).with_priority(4))
        .unwrap();

    let ids: Vec<String> = store.list_issues().unwrap().into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec!["urgent", "tie-1", "tie-2", "late", "low"]);
}

#[test]
fn list_filtered_applies_filter() {
    let store = store_with(&["a", "b"]);
    store.close_issue("b", None).unwrap();

    let filter = IssueFilter {
        status: Some(Status::Closed),
        ..IssueFilter::default()
    };
    let ids: Vec<String> = store
        .list_issues_filtered(&filter)
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(ids, vec!["b"]);
}

#[test]
fn add_dependency_returns_edge() {
    let store = store_with(&["a", "b"]);
    let dep = store.add_dependency("a", "b", DepType::Blocks).unwrap();
    assert_eq!(dep.issue_id, "a");
    assert_eq!(dep.depends_on_id, "b");
    assert_eq!(dep.dep_type, DepType::Blocks);

    let stored = store.get_dependencies("a").unwrap();
    assert_eq!(stored, vec![dep]);
}

#[test]
fn add_dependency_to_missing_issue_is_allowed() {
    let store = Store::open_in_memory().unwrap();
    store.add_dependency("x", "y", DepType::Blocks).unwrap();
    assert_eq!(store.get_dependencies("x").unwrap().len(), 1);
}

#[test]
fn duplicate_edge_is_rejected() {
    let store = store_with(&["a", "b"]);
    store.add_dependency("a", "b", DepType::Blocks).unwrap();

    let err = store.add_dependency("a", "b", DepType::Blocks).unwrap_err();
    assert!(matches!(err, Error::DuplicateEdge { .. }));

    // Same endpoints with a different type is a distinct edge.
    store.add_dependency("a", "b", DepType::Related).unwrap();
    assert_eq!(store.get_dependencies("a").unwrap().len(), 2);
}

#[test]
fn self_dependency_is_rejected() {
    let store = store_with(&["a"]);
    let err = store.add_dependency("a", "a", DepType::Blocks).unwrap_err();
    assert!(err.is_validation());
    assert!(store.get_dependencies("a").unwrap().is_empty());
}

#[test]
fn remove_dependency_reports_outcome() {
    let store = store_with(&["a", "b"]);
    store.add_dependency("a", "b", DepType::Blocks).unwrap();

    let outcome = store.remove_dependency("a", "b", DepType::Related).unwrap();
    assert_eq!(outcome, WriteOutcome::NoMatch);

    let outcome = store.remove_dependency("a", "b", DepType::Blocks).unwrap();
    assert_eq!(outcome, WriteOutcome::Applied);
    assert!(store.get_dependencies("a").unwrap().is_empty());
}

#[test]
fn remove_all_dependencies_only_touches_outgoing_edges() {
    let store = store_with(&["a", "b", "c"]);
    store.add_dependency("a", "b", DepType::Blocks).unwrap();
    store.add_dependency("a", "c", DepType::Related).unwrap();
    store.add_dependency("c", "a", DepType::Blocks).unwrap();

    assert_eq!(store.remove_all_dependencies("a").unwrap(), 2);
    assert!(store.get_dependencies("a").unwrap().is_empty());
    assert_eq!(store.get_dependencies("c").unwrap().len(), 1);
    assert_eq!(store.remove_all_dependencies("a").unwrap(), 0);
}

#[test]
fn get_dependencies_preserves_insertion_order() {
    let store = store_with(&["a", "b", "c", "d"]);
    store.add_dependency("a", "d", DepType::Blocks).unwrap();
    store.add_dependency("a", "b", DepType::Related).unwrap();
    store.add_dependency("a", "c", DepType::ParentChild).unwrap();

    let targets: Vec<String> = store
        .get_dependencies("a")
        .unwrap()
        .into_iter()
        .map(|d| d.depends_on_id)
        .collect();
    assert_eq!(targets, vec!["d", "b", "c"]);
}

#[test]
fn get_all_dependencies_groups_by_dependent() {
    let store = store_with(&["a", "b", "c"]);
    store.add_dependency("a", "b", DepType::Blocks).unwrap();
    store.add_dependency("b", "c", DepType::Blocks).unwrap();
    store.add_dependency("a", "c", DepType::Related).unwrap();

    let all = store.get_all_dependencies().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all["a"].len(), 2);
    assert_eq!(all["b"].len(), 1);
    assert!(!all.contains_key("c"));
}

#[test]
fn get_blockers_lists_open_existing_prerequisites() {
    let store = store_with(&["a", "b", "c", "d"]);
    store.add_dependency("a", "c", DepType::Blocks).unwrap();
    store.add_dependency("a", "b", DepType::Blocks).unwrap();
    store.add_dependency("a", "d", DepType::Related).unwrap();
    store.add_dependency("a", "ghost", DepType::Blocks).unwrap();
    store.close_issue("c", None).unwrap();

    assert_eq!(store.get_blockers("a").unwrap(), vec!["b"]);
    assert!(store.get_blockers("b").unwrap().is_empty());
}

#[test]
fn transaction_commits_on_success() {
    let store = Store::open_in_memory().unwrap();
    store
        .with_transaction(|tx| {
            tx.create_issue(&test_issue("a", "A"))?;
            tx.create_issue(&test_issue("b", "B"))?;
            tx.add_dependency("a", "b", DepType::Blocks)?;
            Ok(())
        })
        .unwrap();

    assert_eq!(store.list_issues().unwrap().len(), 2);
    assert_eq!(store.get_dependencies("a").unwrap().len(), 1);
}

#[test]
fn transaction_rolls_back_on_error() {
    let store = store_with(&["existing"]);
    let err = store
        .with_transaction(|tx| {
            tx.create_issue(&test_issue("a", "A"))?;
            tx.add_dependency("a", "existing", DepType::Blocks)?;
            tx.create_issue(&test_issue("existing", "Dup"))
        })
        .unwrap_err();

    assert!(matches!(err, Error::DuplicateId(_)));
    assert!(!store.issue_exists("a").unwrap());
    assert!(store.get_dependencies("a").unwrap().is_empty());
}

#[test]
fn nested_transaction_failure_only_undoes_inner_scope() {
    let store = Store::open_in_memory().unwrap();
    store
        .with_transaction(|tx| {
            tx.create_issue(&test_issue("outer", "Outer"))?;
            let inner = tx.with_transaction(|inner| {
                inner.create_issue(&test_issue("inner", "Inner"))?;
                Err::<(), _>(Error::Validation("abort".to_string()))
            });
            assert!(inner.is_err());
            Ok(())
        })
        .unwrap();

    assert!(store.issue_exists("outer").unwrap());
    assert!(!store.issue_exists("inner").unwrap());

    // Depth is restored: a fresh top-level transaction still works.
    store
        .with_transaction(|tx| tx.create_issue(&test_issue("after", "After")))
        .unwrap();
    assert!(store.issue_exists("after").unwrap());
}

#[test]
fn next_id_uses_configured_prefix_and_length() {
    let store = Store::open_in_memory_with(Config {
        prefix: "proj".to_string(),
        id_length: 6,
        ..Config::default()
    })
    .unwrap();

    let id = store.next_id("Title", "").unwrap();
    let suffix = id.strip_prefix("proj-").unwrap();
    assert_eq!(suffix.len(), 6);
    assert!(!store.issue_exists(&id).unwrap());
}

#[test]
fn open_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        id_length: 1,
        ..Config::default()
    };
    assert!(Store::open(&dir.path().join("issues.db"), config).is_err());
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("issues.db");

    {
        let store = Store::open(&path, Config::default()).unwrap();
        store.create_issue(&test_issue("bl-1", "Persisted")).unwrap();
        store.add_dependency("bl-1", "bl-2", DepType::Blocks).unwrap();
    }

    let store = Store::open(&path, Config::default()).unwrap();
    assert_eq!(store.get_issue("bl-1").unwrap().title, "Persisted");
    assert_eq!(store.get_dependencies("bl-1").unwrap().len(), 1);
}

#[test]
fn corrupted_row_surfaces_as_error() {
    let store = store_with(&["bl-1"]);
    store
        .conn
        .execute("UPDATE issues SET status = 'todo' WHERE id = 'bl-1'", [])
        .unwrap();

    assert!(store.get_issue("bl-1").is_err());
    assert!(store.list_issues().is_err());
}

#[test]
fn storage_errors_name_operation_and_id() {
    let store = store_with(&["a", "b"]);
    store.add_dependency("a", "b", DepType::Blocks).unwrap();
    store.conn.execute_batch("DROP TABLE dependencies").unwrap();

    let err = store.get_dependencies("a").unwrap_err();
    assert!(err.is_io());
    assert!(err.to_string().starts_with("get dependencies of a:"), "{err}");

    let err = store.remove_all_dependencies("a").unwrap_err();
    assert!(err.to_string().starts_with("remove dependencies of a:"), "{err}");

    let err = store.remove_dependency("a", "b", DepType::Blocks).unwrap_err();
    assert!(err.to_string().starts_with("remove dependency a blocks b:"), "{err}");

    let err = store.get_blockers("a").unwrap_err();
    assert!(err.to_string().starts_with("get blockers of a:"), "{err}");

    let err = store.get_all_dependencies().unwrap_err();
    assert!(err.to_string().starts_with("get all dependencies:"), "{err}");
}

#[test]
fn list_and_exists_errors_carry_context() {
    let store = store_with(&["a"]);
    store.conn.execute_batch("DROP TABLE issues").unwrap();

    let err = store.issue_exists("a").unwrap_err();
    assert!(err.to_string().starts_with("check issue a:"), "{err}");

    let err = store.list_issues().unwrap_err();
    assert!(err.to_string().starts_with("list issues:"), "{err}");
}

#[test]
#[allow(clippy::panic, unreachable_code)]
fn panic_inside_transaction_rolls_back_and_resets_depth() {
    let store = Store::open_in_memory().unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        store.with_transaction(|tx| {
            tx.create_issue(&test_issue("lost", "Lost"))?;
            panic!("interrupted");
            Ok(())
        })
    }));
    assert!(outcome.is_err());

    assert!(store.conn.is_autocommit());
    assert_eq!(store.tx_depth.get(), 0);
    assert!(!store.issue_exists("lost").unwrap());

    store
        .with_transaction(|tx| tx.create_issue(&test_issue("kept", "Kept")))
        .unwrap();
    assert!(store.conn.is_autocommit());
    assert!(store.issue_exists("kept").unwrap());
}

#[test]
#[allow(clippy::panic, unreachable_code)]
fn panic_in_nested_scope_only_undoes_that_scope() {
    let store = Store::open_in_memory().unwrap();

    store
        .with_transaction(|tx| {
            tx.create_issue(&test_issue("outer", "Outer"))?;
            let inner = catch_unwind(AssertUnwindSafe(|| {
                tx.with_transaction(|inner| {
                    inner.create_issue(&test_issue("inner", "Inner"))?;
                    panic!("interrupted");
                    Ok(())
                })
            }));
            assert!(inner.is_err());
            assert_eq!(tx.tx_depth.get(), 1);
            Ok(())
        })
        .unwrap();

    assert!(store.conn.is_autocommit());
    assert!(store.issue_exists("outer").unwrap());
    assert!(!store.issue_exists("inner").unwrap());
}

#[test]
fn update_never_clears_closed_at() {
    let store = store_with(&["bl-1"]);
    store.close_issue("bl-1", None).unwrap();
    let closed = store.get_issue("bl-1").unwrap();

    let mut edited = closed.clone();
    edited.title = "Edited".to_string();
    edited.closed_at = None;
    store.update_issue(&edited).unwrap();

    let stored = store.get_issue("bl-1").unwrap();
    assert_eq!(stored.title, "Edited");
    assert_eq!(stored.closed_at, closed.closed_at);
}

#[test]
fn update_into_closed_status_stamps_closed_at() {
    let store = store_with(&["bl-1"]);
    let mut issue = store.get_issue("bl-1").unwrap();
    issue.status = Status::Closed;
    store.update_issue(&issue).unwrap();

    let stored = store.get_issue("bl-1").unwrap();
    assert_eq!(stored.status, Status::Closed);
    assert_eq!(stored.closed_at, Some(stored.updated_at));
}

#[test]
fn reopening_keeps_closed_at() {
    let store = store_with(&["bl-1"]);
    store.close_issue("bl-1", None).unwrap();
    let closed_at = store.get_issue("bl-1").unwrap().closed_at;

    let mut reopened = store.get_issue("bl-1").unwrap();
    reopened.status = Status::Open;
    store.update_issue(&reopened).unwrap();

    let stored = store.get_issue("bl-1").unwrap();
    assert_eq!(stored.status, Status::Open);
    assert_eq!(stored.closed_at, closed_at);
}
