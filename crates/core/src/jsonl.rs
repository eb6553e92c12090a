// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL (JSON Lines) exchange of the full issue graph.
//!
//! Each line holds one issue with its outgoing dependency edges inline.
//! Export sorts by id so repeated exports diff cleanly. Import parses every
//! line before touching the store and applies all records in one
//! transaction, so a bad record leaves the store as it was.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::Store;
use crate::dependency::{DepType, Dependency};
use crate::error::{Error, Result, ResultExt};
use crate::issue::Issue;

/// One outgoing edge as written in an exchange record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// The prerequisite issue.
    pub depends_on: String,
    #[serde(rename = "type")]
    pub dep_type: DepType,
}

/// One line of the exchange format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    #[serde(flatten)]
    pub issue: Issue,
    #[serde(default)]
    pub dependencies: Vec<DependencyRecord>,
}

impl IssueRecord {
    /// Builds a record from an issue and its outgoing edges.
    pub fn new(issue: &Issue, deps: &[Dependency]) -> Self {
        let mut issue = issue.clone();
        issue.description = issue.description.filter(|d| !d.is_empty());
        IssueRecord {
            issue,
            dependencies: deps
                .iter()
                .map(|dep| DependencyRecord {
                    depends_on: dep.depends_on_id.clone(),
                    dep_type: dep.dep_type,
                })
                .collect(),
        }
    }
}

/// Counts reported by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Records whose id was not in the store.
    pub created: usize,
    /// Records that overwrote an existing issue.
    pub updated: usize,
}

impl ImportStats {
    pub fn total(&self) -> usize {
        self.created + self.updated
    }
}

/// Writes `issues` in exchange format, in the order given.
///
/// `deps` maps dependent ids to their outgoing edges; issues absent from the
/// map are written with an empty dependency list. Returns the number of lines
/// written.
pub fn write_issues<W: Write>(
    issues: &[Issue],
    deps: &HashMap<String, Vec<Dependency>>,
    mut writer: W,
) -> Result<usize> {
    for issue in issues {
        let edges = deps.get(&issue.id).map(Vec::as_slice).unwrap_or_default();
        let json = serde_json::to_string(&IssueRecord::new(issue, edges))?;
        writeln!(writer, "{json}")?;
    }
    writer.flush()?;
    Ok(issues.len())
}

/// Exports every issue, sorted by id, to `writer`. Returns the issue count.
pub fn export_to_writer<W: Write>(store: &Store, writer: W) -> Result<usize> {
    let mut issues = store.list_issues()?;
    issues.sort_by(|a, b| a.id.cmp(&b.id));
    let deps = store.get_all_dependencies()?;

    let count = write_issues(&issues, &deps, writer)?;
    debug!(count, "exported issues");
    Ok(count)
}

/// Exports every issue to a file, replacing any existing content.
pub fn export_to_file(store: &Store, path: &Path) -> Result<usize> {
    let file = File::create(path).context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let count = export_to_writer(store, &mut writer)?;
    writer
        .into_inner()
        .map_err(|e| e.into_error())?
        .sync_all()?;
    Ok(count)
}

/// Parses every non-blank line, tagging each record with its 1-based line number.
///
/// Lines are read as bytes, so a line that is not UTF-8 is a parse error at
/// that line rather than a read failure.
fn parse_records<R: BufRead>(reader: R) -> Result<Vec<(usize, IssueRecord)>> {
    let mut records = Vec::new();

    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line.context(|| format!("read line {}", idx + 1))?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let record = serde_json::from_slice(&line).map_err(|source| Error::Parse {
            line: idx + 1,
            source,
        })?;
        records.push((idx + 1, record));
    }

    Ok(records)
}

/// Upserts one record and replaces its outgoing edges.
fn apply_record(store: &Store, record: IssueRecord, stats: &mut ImportStats) -> Result<()> {
    let IssueRecord {
        mut issue,
        dependencies,
    } = record;
    issue.description = issue.description.filter(|d| !d.is_empty());

    if store.issue_exists(&issue.id)? {
        store.replace_issue(&issue)?;
        store.remove_all_dependencies(&issue.id)?;
        stats.updated += 1;
    } else {
        store.create_issue(&issue)?;
        stats.created += 1;
    }

    for dep in dependencies {
        store.add_dependency(&issue.id, &dep.depends_on, dep.dep_type)?;
    }
    Ok(())
}

/// Imports exchange records from `reader`.
///
/// Blank lines are skipped. Records are applied in order inside one
/// transaction: any parse or store error aborts the whole import and leaves
/// the store unchanged. Edges may name issues that are not in the store.
pub fn import_from_reader<R: BufRead>(store: &Store, reader: R) -> Result<ImportStats> {
    let records = parse_records(reader)?;

    let stats = store.with_transaction(|tx| {
        let mut stats = ImportStats::default();
        for (line, record) in records {
            apply_record(tx, record, &mut stats).context(|| format!("line {line}"))?;
        }
        Ok(stats)
    })?;

    debug!(created = stats.created, updated = stats.updated, "imported issues");
    Ok(stats)
}

/// Imports exchange records from a file.
pub fn import_from_file(store: &Store, path: &Path) -> Result<ImportStats> {
    let file = File::open(path).context(|| format!("open {}", path.display()))?;
    import_from_reader(store, BufReader::new(file))
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
