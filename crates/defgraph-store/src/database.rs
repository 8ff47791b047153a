//! SQLite store adapter
//!
//! Owns the single connection a graph instance works on and provides
//! table/index management and a scalar query helper.

use std::path::Path;

use defgraph_core::{GraphError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{ConnectOptions, Connection, FromRow, Sqlite, Transaction};

/// A single SQLite connection, held for the lifetime of a graph
pub struct Database {
    conn: SqliteConnection,
}

impl Database {
    /// Open (or create) the database file at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        let conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .connect()
            .await
            .map_err(|e| {
                GraphError::DatabaseError(format!(
                    "SQLite connection to {} failed: {e}",
                    path.display()
                ))
            })?;

        Ok(Self { conn })
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> Result<Self> {
        let conn = SqliteConnection::connect("sqlite::memory:")
            .await
            .map_err(|e| GraphError::DatabaseError(format!("SQLite connection failed: {e}")))?;

        Ok(Self { conn })
    }

    /// Underlying connection
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Start a transaction; dropped without commit it rolls back
    pub async fn begin(&mut self) -> Result<Transaction<'_, Sqlite>> {
        self.conn
            .begin()
            .await
            .map_err(|e| GraphError::DatabaseError(format!("Failed to begin transaction: {e}")))
    }

    /// First column of the first row of `sql`, if any
    pub async fn query_value<'q, T>(&mut self, sql: &'q str, params: &[&'q str]) -> Result<Option<T>>
    where
        (T,): for<'r> FromRow<'r, SqliteRow>,
        T: Send + Unpin,
    {
        let mut query = sqlx::query_scalar::<_, T>(sql);
        for param in params {
            query = query.bind(*param);
        }

        query
            .fetch_optional(&mut self.conn)
            .await
            .map_err(|e| GraphError::DatabaseError(format!("Query failed: {e}")))
    }

    /// Close the connection, flushing pending work
    pub async fn close(self) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| GraphError::DatabaseError(format!("Failed to close connection: {e}")))
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Table definition: name and column/constraint lines
#[derive(Debug, Clone, Copy)]
pub struct Table {
    pub name: &'static str,
    pub lines: &'static [&'static str],
}

impl Table {
    pub fn create_sql(&self) -> String {
        let body = self
            .lines
            .iter()
            .map(|line| format!("\n    {line}"))
            .collect::<Vec<_>>()
            .join(",");
        format!("CREATE TABLE IF NOT EXISTS {} ({body}\n)", self.name)
    }

    pub async fn create(&self, conn: &mut SqliteConnection) -> Result<()> {
        execute(conn, &self.create_sql()).await
    }

    pub async fn drop(&self, conn: &mut SqliteConnection) -> Result<()> {
        execute(conn, &format!("DROP TABLE IF EXISTS {}", self.name)).await
    }
}

/// Index definition
#[derive(Debug, Clone, Copy)]
pub struct Index {
    pub name: &'static str,
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub unique: bool,
}

impl Index {
    pub fn create_sql(&self) -> String {
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {}({})",
            if self.unique { "UNIQUE " } else { "" },
            self.name,
            self.table,
            self.columns.join(", ")
        )
    }

    pub async fn create(&self, conn: &mut SqliteConnection) -> Result<()> {
        execute(conn, &self.create_sql()).await
    }

    pub async fn drop(&self, conn: &mut SqliteConnection) -> Result<()> {
        execute(conn, &format!("DROP INDEX IF EXISTS {}", self.name)).await
    }
}

async fn execute(conn: &mut SqliteConnection, sql: &str) -> Result<()> {
    sqlx::query(sql)
        .execute(conn)
        .await
        .map_err(|e| GraphError::DatabaseError(format!("Schema statement failed: {e}")))?;
    Ok(())
}
