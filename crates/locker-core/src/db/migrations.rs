//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Which store a database file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Encrypted items, owned by the item service
    Items,
    /// Sync conflict bookkeeping, owned by the sync service
    Conflicts,
}

impl Schema {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::Conflicts => "conflicts",
        }
    }

    /// Migration steps for this schema, indexed by target version - 1
    fn migrations(self) -> &'static [&'static [&'static str]] {
        match self {
            Self::Items => ITEMS_MIGRATIONS,
            Self::Conflicts => CONFLICTS_MIGRATIONS,
        }
    }
}

const ITEMS_MIGRATIONS: &[&[&str]] = &[
    // v1: initial schema
    &[
        "CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            data_type TEXT NOT NULL,
            data BLOB NOT NULL,
            metadata TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_items_user_id ON items(user_id)",
    ],
];

const CONFLICTS_MIGRATIONS: &[&[&str]] = &[
    // v1: initial schema
    &[
        "CREATE TABLE IF NOT EXISTS conflicts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            data_type TEXT NOT NULL,
            client_data BLOB NOT NULL,
            server_data BLOB NOT NULL,
            resolved INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_conflicts_user_resolved ON conflicts(user_id, resolved)",
    ],
];

/// Run all pending migrations for `schema`
pub async fn run(conn: &Connection, schema: Schema) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        (),
    )
    .await?;

    let current = get_version(conn).await?;
    for (index, statements) in schema.migrations().iter().enumerate() {
        let version = i64::try_from(index + 1).unwrap_or(i64::MAX);
        if version > current {
            apply(conn, schema, version, statements).await?;
        }
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i64> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i64 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Apply one migration atomically and record its version
async fn apply(conn: &Connection, schema: Schema, version: i64, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn
        .execute(
            "INSERT INTO schema_version (version) VALUES (?)",
            libsql::params![version],
        )
        .await
    {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!(schema = schema.name(), "Migrated database to version {version}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    async fn table_exists(conn: &Connection, name: &str) -> bool {
        let mut rows = conn
            .query(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master
                    WHERE type = 'table' AND name = ?
                )",
                [name],
            )
            .await
            .unwrap();

        rows.next()
            .await
            .unwrap()
            .is_some_and(|row| row.get::<i32>(0).unwrap() != 0)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn, Schema::Items).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, 1);
        assert!(table_exists(&conn, "items").await);
        assert!(!table_exists(&conn, "conflicts").await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn, Schema::Conflicts).await.unwrap();
        run(&conn, Schema::Conflicts).await.unwrap(); // Should not fail

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, 1);
        assert!(table_exists(&conn, "conflicts").await);
    }
}
