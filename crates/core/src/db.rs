// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed store for the issue graph.
//!
//! The [`Store`] struct is the only owner of durable state. Every value it
//! returns is an independent copy, and every multi-statement write runs inside
//! one transaction (see [`Store::with_transaction`]).

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::Config;
use crate::dependency::{DepType, Dependency};
use crate::error::{Error, Result, ResultExt};
use crate::filter::IssueFilter;
use crate::id::generate_unique_id;
use crate::issue::{Issue, Resolution, Status};

/// SQL schema for the issue graph.
///
/// Dependency endpoints are not foreign keys: an edge may name
/// an issue that is not (or no longer) in the store.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS issues (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'open',
    priority INTEGER NOT NULL DEFAULT 2,
    issue_type TEXT NOT NULL DEFAULT 'task',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    closed_at TEXT,
    resolution TEXT
);

CREATE TABLE IF NOT EXISTS dependencies (
    issue_id TEXT NOT NULL,
    depends_on_id TEXT NOT NULL,
    type TEXT NOT NULL DEFAULT 'blocks',
    created_at TEXT NOT NULL,
    PRIMARY KEY (issue_id, depends_on_id, type),
    CHECK (issue_id != depends_on_id)
);

CREATE INDEX IF NOT EXISTS idx_deps_type ON dependencies(type, depends_on_id);
CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
"#;

const ISSUE_COLUMNS: &str = "id, title, description, status, priority, issue_type, \
     created_at, updated_at, closed_at, resolution";

/// Result of a write that is allowed to match nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// At least one row was written.
    Applied,
    /// No row matched; nothing changed.
    NoMatch,
}

impl WriteOutcome {
    fn from_rows(affected: usize) -> Self {
        if affected == 0 {
            WriteOutcome::NoMatch
        } else {
            WriteOutcome::Applied
        }
    }

    pub fn is_applied(&self) -> bool {
        *self == WriteOutcome::Applied
    }
}

/// Format a timestamp as fixed-width RFC3339 so text order equals time order.
pub(crate) fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn corrupted(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(Error::CorruptedData(message)),
    )
}

/// Parse a string value from the database, returning a rusqlite error on parse failure.
fn parse_db<T: std::str::FromStr>(
    value: &str,
    idx: usize,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    value
        .parse()
        .map_err(|_| corrupted(idx, format!("invalid value '{value}' in column '{column}'")))
}

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    idx: usize,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupted(idx, format!("invalid timestamp '{value}' in column '{column}'")))
}

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    let status_str: String = row.get(3)?;
    let type_str: String = row.get(5)?;
    let created_str: String = row.get(6)?;
    let updated_str: String = row.get(7)?;
    let closed_str: Option<String> = row.get(8)?;
    let resolution_str: Option<String> = row.get(9)?;

    let closed_at = closed_str
        .map(|s| parse_timestamp(&s, 8, "closed_at"))
        .transpose()?;
    let resolution = match resolution_str.as_deref() {
        None => None,
        Some(s) => Resolution::parse_optional(s)
            .map_err(|_| corrupted(9, format!("invalid value '{s}' in column 'resolution'")))?,
    };

    Ok(Issue {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: parse_db(&status_str, 3, "status")?,
        priority: row.get(4)?,
        issue_type: parse_db(&type_str, 5, "issue_type")?,
        created_at: parse_timestamp(&created_str, 6, "created_at")?,
        updated_at: parse_timestamp(&updated_str, 7, "updated_at")?,
        closed_at,
        resolution,
    })
}

fn dependency_from_row(row: &Row<'_>) -> rusqlite::Result<Dependency> {
    let type_str: String = row.get(2)?;
    let created_str: String = row.get(3)?;
    Ok(Dependency {
        issue_id: row.get(0)?,
        depends_on_id: row.get(1)?,
        dep_type: parse_db(&type_str, 2, "type")?,
        created_at: parse_timestamp(&created_str, 3, "created_at")?,
    })
}

/// Run a query and collect every mapped row.
fn query_all<T, P, F>(conn: &Connection, sql: &str, params: P, map: F) -> rusqlite::Result<Vec<T>>
where
    P: rusqlite::Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map)?
        .collect::<rusqlite::Result<Vec<T>>>()?;
    Ok(rows)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Holds the transaction depth one above `saved` until dropped.
struct DepthGuard<'a> {
    depth: &'a Cell<u32>,
    saved: u32,
}

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<u32>, saved: u32) -> Self {
        depth.set(saved + 1);
        DepthGuard { depth, saved }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.saved);
    }
}

/// A nested transaction scope. Rolls back to its savepoint on drop unless
/// released.
struct SavepointGuard<'a> {
    conn: &'a Connection,
    name: String,
    released: bool,
}

impl<'a> SavepointGuard<'a> {
    fn begin(conn: &'a Connection, depth: u32) -> rusqlite::Result<Self> {
        let name = format!("bl_savepoint_{depth}");
        conn.execute_batch(&format!("SAVEPOINT {name}"))?;
        Ok(SavepointGuard {
            conn,
            name,
            released: false,
        })
    }

    fn release(mut self) -> rusqlite::Result<()> {
        self.conn.execute_batch(&format!("RELEASE {}", self.name))?;
        self.released = true;
        Ok(())
    }
}

impl Drop for SavepointGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let sql = format!("ROLLBACK TO {name}; RELEASE {name}", name = self.name);
        if let Err(e) = self.conn.execute_batch(&sql) {
            warn!(savepoint = %self.name, error = %e, "rollback failed");
        }
    }
}

/// SQLite connection holding the issue graph.
pub struct Store {
    conn: Connection,
    config: Config,
    /// Number of open transaction scopes; >0 means nested scopes use savepoints.
    tx_depth: Cell<u32>,
}

impl Store {
    /// Open a store at the given path, creating the file and schema if needed.
    pub fn open(path: &Path, config: Config) -> Result<Self> {
        config.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .context(|| format!("create store directory {}", parent.display()))?;
            }
        }

        let conn =
            Connection::open(path).context(|| format!("open store {}", path.display()))?;
        conn.busy_timeout(config.busy_timeout())
            .and_then(|()| conn.execute_batch("PRAGMA journal_mode = WAL;"))
            .context(|| format!("configure store {}", path.display()))?;

        debug!(path = %path.display(), "opened store");
        Self::init(conn, config)
    }

    /// Open an in-memory store with default configuration (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(Config::default())
    }

    /// Open an in-memory store with the given configuration.
    pub fn open_in_memory_with(config: Config) -> Result<Self> {
        config.validate()?;
        let conn = Connection::open_in_memory().context(|| "open in-memory store".to_string())?;
        Self::init(conn, config)
    }

    fn init(conn: Connection, config: Config) -> Result<Self> {
        conn.execute_batch(SCHEMA).context(|| "init schema".to_string())?;
        Ok(Store {
            conn,
            config,
            tx_depth: Cell::new(0),
        })
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `f` inside an exclusive-write transaction.
    ///
    /// If `f` returns an error every write it made is rolled back and the
    /// error is returned unchanged; otherwise the transaction commits. Calls
    /// nest: an inner scope becomes a savepoint of the outer transaction.
    /// A panic in `f` also rolls the scope back.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> Result<T>,
    {
        let depth = self.tx_depth.get();
        if depth == 0 {
            let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
                .context(|| "begin transaction".to_string())?;
            let value = self.in_scope(depth, f)?;
            tx.commit().context(|| "commit transaction".to_string())?;
            Ok(value)
        } else {
            let savepoint = SavepointGuard::begin(&self.conn, depth)
                .context(|| "begin savepoint".to_string())?;
            let value = self.in_scope(depth, f)?;
            savepoint
                .release()
                .context(|| "release savepoint".to_string())?;
            Ok(value)
        }
    }

    fn in_scope<T, F>(&self, depth: u32, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> Result<T>,
    {
        let _depth = DepthGuard::enter(&self.tx_depth, depth);
        f(self)
    }

    /// Generate an unused id for a new issue using the configured prefix and length.
    pub fn next_id(&self, title: &str, description: &str) -> Result<String> {
        generate_unique_id(
            &self.config.prefix,
            title,
            description,
            &Utc::now(),
            self.config.id_length,
            |candidate| self.issue_exists(candidate),
        )
    }

    /// Create a new issue.
    pub fn create_issue(&self, issue: &Issue) -> Result<()> {
        if issue.id.trim().is_empty() {
            return Err(Error::Validation("id cannot be empty".to_string()));
        }
        issue.validate()?;

        let inserted = self.conn.execute(
            &format!(
                "INSERT INTO issues ({ISSUE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                issue.id,
                issue.title,
                issue.description,
                issue.status.as_str(),
                issue.priority,
                issue.issue_type.as_str(),
                format_timestamp(&issue.created_at),
                format_timestamp(&issue.updated_at),
                issue.closed_at.as_ref().map(format_timestamp),
                issue.resolution.map(|r| r.as_str()),
            ],
        );

        match inserted {
            Ok(_) => {
                debug!(id = %issue.id, "created issue");
                Ok(())
            }
            Err(e) if is_constraint_violation(&e) => Err(Error::DuplicateId(issue.id.clone())),
            Err(e) => Err(Error::from(e).context(format!("create issue {}", issue.id))),
        }
    }

    /// Get an issue by ID.
    pub fn get_issue(&self, id: &str) -> Result<Issue> {
        let issue = self
            .conn
            .query_row(
                &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1"),
                params![id],
                issue_from_row,
            )
            .optional()
            .context(|| format!("get issue {id}"))?;

        issue.ok_or_else(|| Error::IssueNotFound(id.to_string()))
    }

    /// Check if an issue exists.
    pub fn issue_exists(&self, id: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM issues WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .context(|| format!("check issue {id}"))?;
        Ok(count > 0)
    }

    /// Overwrite every mutable field of an existing issue and refresh `updated_at`.
    ///
    /// A stored `closed_at` is never cleared or moved. An issue updated into
    /// the closed status without one is stamped with the update time.
    ///
    /// An unknown id is not an error; it reports [`WriteOutcome::NoMatch`].
    pub fn update_issue(&self, issue: &Issue) -> Result<WriteOutcome> {
        issue.validate()?;

        let affected = self
            .conn
            .execute(
                "UPDATE issues SET title = ?1, description = ?2, status = ?3, priority = ?4,
                 issue_type = ?5, updated_at = ?6,
                 closed_at = COALESCE(closed_at, ?7, CASE WHEN ?3 = 'closed' THEN ?6 END),
                 resolution = ?8
                 WHERE id = ?9",
                params![
                    issue.title,
                    issue.description,
                    issue.status.as_str(),
                    issue.priority,
                    issue.issue_type.as_str(),
                    format_timestamp(&Utc::now()),
                    issue.closed_at.as_ref().map(format_timestamp),
                    issue.resolution.map(|r| r.as_str()),
                    issue.id,
                ],
            )
            .context(|| format!("update issue {}", issue.id))?;

        debug!(id = %issue.id, affected, "updated issue");
        Ok(WriteOutcome::from_rows(affected))
    }

    /// Overwrite an issue with the given values verbatim, timestamps included.
    ///
    /// Used by import, where the record is authoritative.
    pub(crate) fn replace_issue(&self, issue: &Issue) -> Result<WriteOutcome> {
        issue.validate()?;

        let affected = self
            .conn
            .execute(
                "UPDATE issues SET title = ?1, description = ?2, status = ?3, priority = ?4,
                 issue_type = ?5, created_at = ?6, updated_at = ?7, closed_at = ?8,
                 resolution = ?9
                 WHERE id = ?10",
                params![
                    issue.title,
                    issue.description,
                    issue.status.as_str(),
                    issue.priority,
                    issue.issue_type.as_str(),
                    format_timestamp(&issue.created_at),
                    format_timestamp(&issue.updated_at),
                    issue.closed_at.as_ref().map(format_timestamp),
                    issue.resolution.map(|r| r.as_str()),
                    issue.id,
                ],
            )
            .context(|| format!("replace issue {}", issue.id))?;

        Ok(WriteOutcome::from_rows(affected))
    }

    /// Close an issue with the given resolution.
    ///
    /// Sets status, `updated_at`, `closed_at`, and resolution in one statement.
    /// Closing an already-closed issue keeps its original `closed_at`.
    pub fn close_issue(&self, id: &str, resolution: Option<Resolution>) -> Result<WriteOutcome> {
        let now = format_timestamp(&Utc::now());
        let affected = self
            .conn
            .execute(
                "UPDATE issues SET status = ?1, updated_at = ?2,
                 closed_at = COALESCE(closed_at, ?2), resolution = ?3
                 WHERE id = ?4",
                params![
                    Status::Closed.as_str(),
                    now,
                    resolution.map(|r| r.as_str()),
                    id
                ],
            )
            .context(|| format!("close issue {id}"))?;

        debug!(id, affected, "closed issue");
        Ok(WriteOutcome::from_rows(affected))
    }

    /// Close an issue, parsing the resolution from its wire form (`""` is allowed).
    pub fn close_issue_with(&self, id: &str, resolution: &str) -> Result<WriteOutcome> {
        let resolution = Resolution::parse_optional(resolution)?;
        self.close_issue(id, resolution)
    }

    /// Remove an issue and every dependency edge touching it.
    pub fn delete_issue(&self, id: &str) -> Result<()> {
        self.with_transaction(|store| {
            let edges = store
                .conn
                .execute(
                    "DELETE FROM dependencies WHERE issue_id = ?1 OR depends_on_id = ?1",
                    params![id],
                )
                .context(|| format!("delete dependencies of {id}"))?;
            let rows = store
                .conn
                .execute("DELETE FROM issues WHERE id = ?1", params![id])
                .context(|| format!("delete issue {id}"))?;
            if rows == 0 {
                return Err(Error::IssueNotFound(id.to_string()));
            }
            debug!(id, edges, "deleted issue");
            Ok(())
        })
    }

    /// List all issues ordered by priority, then creation time, then insertion order.
    pub fn list_issues(&self) -> Result<Vec<Issue>> {
        query_all(
            &self.conn,
            &format!(
                "SELECT {ISSUE_COLUMNS} FROM issues
                 ORDER BY priority ASC, created_at ASC, rowid ASC"
            ),
            [],
            issue_from_row,
        )
        .context(|| "list issues".to_string())
    }

    /// List issues matching `filter`, in [`Store::list_issues`] order.
    pub fn list_issues_filtered(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        Ok(filter.apply(self.list_issues()?))
    }

    /// Add a dependency edge from `issue_id` to its prerequisite `depends_on_id`.
    ///
    /// Neither endpoint has to exist in the store.
    pub fn add_dependency(
        &self,
        issue_id: &str,
        depends_on_id: &str,
        dep_type: DepType,
    ) -> Result<Dependency> {
        let dep = Dependency::new(issue_id, depends_on_id, dep_type);
        dep.validate()?;

        let inserted = self.conn.execute(
            "INSERT INTO dependencies (issue_id, depends_on_id, type, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                dep.issue_id,
                dep.depends_on_id,
                dep.dep_type.as_str(),
                format_timestamp(&dep.created_at),
            ],
        );

        match inserted {
            Ok(_) => {
                debug!(issue_id, depends_on_id, dep_type = %dep_type, "added dependency");
                Ok(dep)
            }
            Err(e) if is_constraint_violation(&e) => Err(Error::DuplicateEdge {
                issue_id: issue_id.to_string(),
                depends_on_id: depends_on_id.to_string(),
                dep_type: dep_type.to_string(),
            }),
            Err(e) => Err(Error::from(e).context(format!(
                "add dependency {issue_id} {dep_type} {depends_on_id}"
            ))),
        }
    }

    /// Remove one dependency edge. A missing edge reports [`WriteOutcome::NoMatch`].
    pub fn remove_dependency(
        &self,
        issue_id: &str,
        depends_on_id: &str,
        dep_type: DepType,
    ) -> Result<WriteOutcome> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM dependencies
                 WHERE issue_id = ?1 AND depends_on_id = ?2 AND type = ?3",
                params![issue_id, depends_on_id, dep_type.as_str()],
            )
            .context(|| format!("remove dependency {issue_id} {dep_type} {depends_on_id}"))?;
        debug!(issue_id, depends_on_id, dep_type = %dep_type, affected, "removed dependency");
        Ok(WriteOutcome::from_rows(affected))
    }

    /// Remove every edge where `issue_id` is the dependent. Returns how many were removed.
    ///
    /// Edges from other issues that point at `issue_id` are left alone.
    pub fn remove_all_dependencies(&self, issue_id: &str) -> Result<usize> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM dependencies WHERE issue_id = ?1",
                params![issue_id],
            )
            .context(|| format!("remove dependencies of {issue_id}"))?;
        debug!(issue_id, affected, "removed all dependencies");
        Ok(affected)
    }

    /// Get the outgoing edges of one issue, in insertion order.
    pub fn get_dependencies(&self, issue_id: &str) -> Result<Vec<Dependency>> {
        query_all(
            &self.conn,
            "SELECT issue_id, depends_on_id, type, created_at
             FROM dependencies WHERE issue_id = ?1 ORDER BY rowid",
            params![issue_id],
            dependency_from_row,
        )
        .context(|| format!("get dependencies of {issue_id}"))
    }

    /// Get every edge in one query, keyed by dependent issue id.
    pub fn get_all_dependencies(&self) -> Result<HashMap<String, Vec<Dependency>>> {
        let deps = query_all(
            &self.conn,
            "SELECT issue_id, depends_on_id, type, created_at
             FROM dependencies ORDER BY rowid",
            [],
            dependency_from_row,
        )
        .context(|| "get all dependencies".to_string())?;

        let mut map: HashMap<String, Vec<Dependency>> = HashMap::new();
        for dep in deps {
            map.entry(dep.issue_id.clone()).or_default().push(dep);
        }

        Ok(map)
    }

    /// Get the non-closed issues that directly block the given issue.
    pub fn get_blockers(&self, issue_id: &str) -> Result<Vec<String>> {
        query_all(
            &self.conn,
            "SELECT d.depends_on_id
             FROM dependencies d JOIN issues i ON i.id = d.depends_on_id
             WHERE d.issue_id = ?1 AND d.type = 'blocks' AND i.status != 'closed'
             ORDER BY d.depends_on_id",
            params![issue_id],
            |row| row.get(0),
        )
        .context(|| format!("get blockers of {issue_id}"))
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
