// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! bl-core: issue graph storage and ready-work resolution
//!
//! This crate provides the issue and dependency model, a SQLite-backed
//! [`Store`], the ready-work computation over typed dependency edges, and
//! JSONL import/export of the whole graph.

pub mod config;
pub mod db;
pub mod dependency;
pub mod error;
pub mod filter;
pub mod id;
pub mod issue;
pub mod jsonl;
pub mod ready;

pub use config::Config;
pub use db::{Store, WriteOutcome};
pub use dependency::{DepType, Dependency};
pub use error::{Error, Result};
pub use filter::IssueFilter;
pub use issue::{Issue, IssueType, Resolution, Status};
pub use jsonl::{
    export_to_file, export_to_writer, import_from_file, import_from_reader, write_issues,
    ImportStats, IssueRecord,
};
pub use ready::{blocked_ids, ready_issues};
