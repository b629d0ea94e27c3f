//! # Credential store
//!
//! SQLite persistence for credential rows, one `creds` table in the workspace
//! database:
//!
//! | column       | type              |                                  |
//! |--------------|-------------------|----------------------------------|
//! | `id`         | INTEGER PK        | storage id                       |
//! | `type`       | TEXT              | auth method kind                 |
//! | `content`    | TEXT              | codec-serialized content         |
//! | `identifier` | TEXT              | codec identity                   |
//! | `scope`      | INTEGER (0/1)     | in scope flag                    |
//! | `found`      | INTEGER NULL      | endpoint the creds were found on |
//!
//! `(type, identifier)` carries a unique index. Callers look up before they
//! insert; the index catches the read-then-write race and turns it into
//! [`CredsError::DuplicateIdentity`] with the id of the row that won.
//!
//! Every statement runs in autocommit mode. Statements and row cursors are
//! scoped to the call that prepares them and released on every exit path.

use crate::error::{CredsError, Result};
use crate::topology::EndpointId;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

const SCHEMA_VERSION: &str = "1";

const CREDS_COLUMNS: &str = "id, type, content, identifier, scope, found";

/// A persisted credential row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredsRow {
    pub id: i64,
    pub method_kind: String,
    pub content: String,
    pub identifier: String,
    pub in_scope: bool,
    pub found: Option<EndpointId>,
}

/// Column values for an insert or update
#[derive(Debug, Clone, Copy)]
pub struct NewCreds<'a> {
    pub method_kind: &'a str,
    pub content: &'a str,
    pub identifier: &'a str,
    pub in_scope: bool,
    pub found: Option<EndpointId>,
}

/// Scope filter for [`CredentialStore::list_all`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeFilter {
    InScope,
    OutOfScope,
    #[default]
    Any,
}

/// Discovery endpoint filter for [`CredentialStore::list_all`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FoundFilter {
    /// Found on this endpoint
    Endpoint(EndpointId),
    /// Not found on any endpoint (added manually)
    Nowhere,
    #[default]
    Any,
}

pub struct CredentialStore {
    conn: Connection,
}

impl CredentialStore {
    /// Open (or create) the database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(5_000))?;
        let journal_mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if !journal_mode.eq_ignore_ascii_case("wal") {
            tracing::warn!("WAL journal not available for {:?}, using {}", path, journal_mode);
        }
        conn.pragma_update(None, "foreign_keys", "ON")?;
        tracing::debug!("Opened workspace database {:?}", path);
        Self::with_connection(conn)
    }

    /// Throwaway store, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Underlying connection, shared with the topology tables
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the `creds` table if missing and records the schema version
    pub fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS creds (
                id INTEGER PRIMARY KEY,
                type TEXT NOT NULL,
                content TEXT NOT NULL,
                identifier TEXT NOT NULL,
                scope INTEGER NOT NULL DEFAULT 1,
                found INTEGER
            );

            CREATE UNIQUE INDEX IF NOT EXISTS creds_type_identifier
                ON creds(type, identifier);
            ",
        )?;

        self.conn.execute(
            "INSERT INTO meta(key, value) VALUES('creds_schema_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            [SCHEMA_VERSION],
        )?;

        Ok(())
    }

    /// The row stored for `(method_kind, identifier)`, if any
    pub fn find_by_identity(&self, method_kind: &str, identifier: &str) -> Result<Option<CredsRow>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM creds WHERE type = ?1 AND identifier = ?2",
                    CREDS_COLUMNS
                ),
                (method_kind, identifier),
                row_to_creds,
            )
            .optional()
            .map_err(CredsError::from)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<CredsRow>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM creds WHERE id = ?1", CREDS_COLUMNS),
                [id],
                row_to_creds,
            )
            .optional()
            .map_err(CredsError::from)
    }

    /// Insert a new row and return its id.
    ///
    /// Fails with `DuplicateIdentity` (carrying the existing id) when a row
    /// with the same method kind and identifier is already stored.
    pub fn insert(&self, creds: &NewCreds<'_>) -> Result<i64> {
        let result = self.conn.execute(
            "INSERT INTO creds(type, content, identifier, scope, found)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                creds.method_kind,
                creds.content,
                creds.identifier,
                creds.in_scope,
                creds.found.map(|e| e.0),
            ],
        );

        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                tracing::debug!("Inserted {} credentials #{}", creds.method_kind, id);
                Ok(id)
            }
            Err(e) if is_unique_violation(&e) => Err(self.duplicate_of(creds, e)),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite every column of row `id`
    pub fn update(&self, id: i64, creds: &NewCreds<'_>) -> Result<()> {
        let result = self.conn.execute(
            "UPDATE creds
             SET type = ?1, content = ?2, identifier = ?3, scope = ?4, found = ?5
             WHERE id = ?6",
            params![
                creds.method_kind,
                creds.content,
                creds.identifier,
                creds.in_scope,
                creds.found.map(|e| e.0),
                id,
            ],
        );

        match result {
            Ok(0) => Err(CredsError::NotFound(id)),
            Ok(_) => {
                tracing::debug!("Updated {} credentials #{}", creds.method_kind, id);
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(self.duplicate_of(creds, e)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn delete_by_id(&self, id: i64) -> Result<()> {
        let deleted = self.conn.execute("DELETE FROM creds WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(CredsError::NotFound(id));
        }
        tracing::debug!("Deleted credentials row #{}", id);
        Ok(())
    }

    /// All rows matching both filters, in storage order
    pub fn list_all(&self, scope: ScopeFilter, found: FoundFilter) -> Result<Vec<CredsRow>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<i64> = Vec::new();

        match scope {
            ScopeFilter::InScope => {
                clauses.push("scope = ?");
                args.push(1);
            }
            ScopeFilter::OutOfScope => {
                clauses.push("scope = ?");
                args.push(0);
            }
            ScopeFilter::Any => {}
        }

        match found {
            FoundFilter::Endpoint(endpoint) => {
                clauses.push("found = ?");
                args.push(endpoint.0);
            }
            FoundFilter::Nowhere => clauses.push("found IS NULL"),
            FoundFilter::Any => {}
        }

        let mut sql = format!("SELECT {} FROM creds", CREDS_COLUMNS);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), row_to_creds)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(CredsError::from)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM creds", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Build the `DuplicateIdentity` error for a conflicting write, falling
    /// back to the raw SQLite error if the winning row cannot be found.
    fn duplicate_of(&self, creds: &NewCreds<'_>, original: rusqlite::Error) -> CredsError {
        match self.find_by_identity(creds.method_kind, creds.identifier) {
            Ok(Some(existing)) => CredsError::DuplicateIdentity {
                method: creds.method_kind.to_string(),
                identity: creds.identifier.to_string(),
                existing_id: existing.id,
            },
            Ok(None) => CredsError::Storage(original),
            Err(e) => e,
        }
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn row_to_creds(row: &Row<'_>) -> rusqlite::Result<CredsRow> {
    Ok(CredsRow {
        id: row.get(0)?,
        method_kind: row.get(1)?,
        content: row.get(2)?,
        identifier: row.get(3)?,
        in_scope: row.get::<_, i64>(4)? != 0,
        found: row.get::<_, Option<i64>>(5)?.map(EndpointId),
    })
}
