//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations::{self, Schema};
use super::transaction::TxContext;

/// Database wrapper for a libSQL connection holding one schema
pub struct Database {
    // Keeps the underlying database alive for the lifetime of `conn`.
    _db: LibSqlDatabase,
    conn: Connection,
    schema: Schema,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations for `schema` automatically.
    pub async fn open(path: impl AsRef<Path>, schema: Schema) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        let conn = db.connect()?;

        let database = Self {
            _db: db,
            conn,
            schema,
        };
        database.configure().await?;
        database.migrate().await?;
        tracing::debug!(schema = schema.name(), path = %path_str, "Opened database");
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory(schema: Schema) -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        let database = Self {
            _db: db,
            conn,
            schema,
        };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Configure `SQLite` for server use
    async fn configure(&self) -> Result<()> {
        // In-memory databases reject WAL; ignore the result there.
        self.conn
            .query("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn, self.schema).await
    }

    /// Schema this database was opened with
    pub const fn schema(&self) -> Schema {
        self.schema
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Executor for repository calls outside of any transaction
    pub fn context(&self) -> TxContext {
        TxContext::new(self.conn.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory(Schema::Items).await.unwrap();
        assert_eq!(db.schema(), Schema::Items);
        assert!(!db.context().in_transaction());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_file_reopens_existing_schema() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("conflicts.db");

        drop(Database::open(&path, Schema::Conflicts).await.unwrap());
        let db = Database::open(&path, Schema::Conflicts).await.unwrap();

        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM conflicts", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 0);
    }
}
