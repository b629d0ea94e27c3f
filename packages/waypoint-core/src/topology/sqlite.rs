//! Endpoint and connection tables in the workspace database.
//!
//! Only what credential handling needs: endpoint lookup, connection listing by
//! credential, and connection deletion with its report.

use super::{ConnectionSource, DependentConnection, EndpointId, EndpointLookup};
use crate::cascade::DeleteReport;
use crate::error::{CredsError, Result};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

/// Report kind for removed connections
pub const CONNECTIONS_KIND: &str = "Connections";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointRow {
    pub id: EndpointId,
    pub ip: String,
    pub port: u16,
}

impl std::fmt::Display for EndpointRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionRow {
    pub id: i64,
    pub endpoint: EndpointId,
    pub user: String,
    pub creds: i64,
}

/// Topology tables sharing the credential store's SQLite connection
#[derive(Clone, Copy)]
pub struct SqliteTopology<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteTopology<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Creates the endpoint and connection tables if missing.
    ///
    /// Requires the `creds` table to exist already.
    pub fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS endpoints (
                id INTEGER PRIMARY KEY,
                ip TEXT NOT NULL,
                port INTEGER NOT NULL,
                UNIQUE (ip, port)
            );

            CREATE TABLE IF NOT EXISTS connections (
                id INTEGER PRIMARY KEY,
                endpoint INTEGER NOT NULL REFERENCES endpoints(id),
                user TEXT NOT NULL,
                creds INTEGER NOT NULL REFERENCES creds(id)
            );
            ",
        )?;
        Ok(())
    }

    pub fn add_endpoint(&self, ip: &str, port: u16) -> Result<EndpointId> {
        self.conn.execute(
            "INSERT INTO endpoints(ip, port) VALUES (?1, ?2)",
            (ip, port),
        )?;
        Ok(EndpointId(self.conn.last_insert_rowid()))
    }

    pub fn add_connection(&self, endpoint: EndpointId, user: &str, creds_id: i64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO connections(endpoint, user, creds) VALUES (?1, ?2, ?3)",
            (endpoint.0, user, creds_id),
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_connections(&self) -> Result<Vec<ConnectionRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, endpoint, user, creds FROM connections ORDER BY id")?;
        let rows = stmt.query_map([], row_to_connection)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(CredsError::from)
    }
}

impl EndpointLookup for SqliteTopology<'_> {
    type Endpoint = EndpointRow;

    fn find_endpoint(&self, id: EndpointId) -> Result<Option<EndpointRow>> {
        self.conn
            .query_row(
                "SELECT id, ip, port FROM endpoints WHERE id = ?1",
                [id.0],
                |row| {
                    Ok(EndpointRow {
                        id: EndpointId(row.get(0)?),
                        ip: row.get(1)?,
                        port: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(CredsError::from)
    }
}

/// A stored connection, deletable through the cascade
pub struct StoredConnection<'a> {
    conn: &'a Connection,
    row: ConnectionRow,
}

impl StoredConnection<'_> {
    pub fn row(&self) -> &ConnectionRow {
        &self.row
    }
}

impl DependentConnection for StoredConnection<'_> {
    fn delete(self) -> Result<DeleteReport> {
        let deleted = self
            .conn
            .execute("DELETE FROM connections WHERE id = ?1", [self.row.id])?;
        if deleted == 0 {
            return Err(CredsError::Dependent {
                kind: CONNECTIONS_KIND.to_string(),
                message: format!("connection #{} no longer exists", self.row.id),
            });
        }
        tracing::debug!("Deleted connection #{}", self.row.id);

        let mut report = DeleteReport::new();
        report.insert(CONNECTIONS_KIND, self.row.id.to_string());
        Ok(report)
    }
}

impl<'a> ConnectionSource for SqliteTopology<'a> {
    type Connection = StoredConnection<'a>;

    fn find_all_by_credential(&self, creds_id: i64) -> Result<Vec<StoredConnection<'a>>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, endpoint, user, creds FROM connections WHERE creds = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([creds_id], row_to_connection)?;
        let conn = self.conn;
        rows.map(|row| {
            row.map(|row| StoredConnection { conn, row })
                .map_err(CredsError::from)
        })
        .collect()
    }
}

fn row_to_connection(row: &Row<'_>) -> rusqlite::Result<ConnectionRow> {
    Ok(ConnectionRow {
        id: row.get(0)?,
        endpoint: EndpointId(row.get(1)?),
        user: row.get(2)?,
        creds: row.get(3)?,
    })
}
