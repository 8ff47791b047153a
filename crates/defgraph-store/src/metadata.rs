//! Metadata key-value table
//!
//! Holds the build version and timestamp next to the graph tables.

use defgraph_core::{GraphError, Result};

use crate::database::{Database, Table};

/// String key -> string value table
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    table: String,
}

impl KeyValueStore {
    const COLUMNS: &'static [&'static str] =
        &["key TEXT NOT NULL PRIMARY KEY", "value TEXT NOT NULL"];

    /// Attach to (and create if needed) the table `table`
    pub async fn open(db: &mut Database, table: &'static str) -> Result<Self> {
        Table {
            name: table,
            lines: Self::COLUMNS,
        }
        .create(db.connection())
        .await?;

        Ok(Self {
            table: table.to_string(),
        })
    }

    pub async fn get(&self, db: &mut Database, key: &str) -> Result<Option<String>> {
        let sql = format!("SELECT value FROM {} WHERE key = ?", self.table);
        db.query_value(&sql, &[key]).await
    }

    /// Insert or replace `key`; committed immediately
    pub async fn set(&self, db: &mut Database, key: &str, value: &str) -> Result<()> {
        let sql = format!("INSERT OR REPLACE INTO {} (key, value) VALUES (?, ?)", self.table);
        sqlx::query(&sql)
            .bind(key)
            .bind(value)
            .execute(db.connection())
            .await
            .map_err(|e| GraphError::DatabaseError(format!("Failed to set '{key}': {e}")))?;

        Ok(())
    }
}
