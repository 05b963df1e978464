//! Transaction coordination for units of work spanning several repository calls

use std::future::Future;

use libsql::Connection;

use crate::error::{Error, Result};

/// Executor handed to repositories.
///
/// Carries a connection handle and whether a transaction is already open on
/// it, so nested units of work join the outer transaction instead of opening
/// one. Clones share the underlying connection.
#[derive(Clone)]
pub struct TxContext {
    conn: Connection,
    in_transaction: bool,
}

impl TxContext {
    /// Context for a connection with no open transaction
    pub const fn new(conn: Connection) -> Self {
        Self {
            conn,
            in_transaction: false,
        }
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    pub const fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}

/// Run `work` inside a transaction.
///
/// Joins the caller's transaction when `ctx` already carries one. Otherwise a
/// new transaction is opened, committed when `work` succeeds and rolled back
/// when it fails. A failed rollback is folded into the returned error.
pub async fn begin<T, F, Fut>(ctx: &TxContext, work: F) -> Result<T>
where
    F: FnOnce(TxContext) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if ctx.in_transaction {
        return work(ctx.clone()).await;
    }

    let tx = ctx.conn.transaction().await?;
    let result = work(TxContext {
        conn: (*tx).clone(),
        in_transaction: true,
    })
    .await;

    match result {
        Ok(value) => {
            if let Err(error) = tx.commit().await {
                // A failed COMMIT can leave the transaction open on the connection.
                if let Err(rollback) = ctx.conn.execute("ROLLBACK", ()).await {
                    if !is_closed_transaction(&rollback) {
                        tracing::warn!(%rollback, "Rollback after failed commit also failed");
                    }
                }
                return Err(Error::from(error).context("failed to commit transaction"));
            }
            Ok(value)
        }
        Err(error) => match tx.rollback().await {
            Ok(()) => Err(error),
            Err(rollback) if is_closed_transaction(&rollback) => Err(error),
            Err(rollback) => Err(Error::Rollback {
                source: Box::new(error),
                rollback: rollback.to_string(),
            }),
        },
    }
}

/// `SQLite` reports rolling back an already finished transaction this way.
fn is_closed_transaction(error: &libsql::Error) -> bool {
    error
        .to_string()
        .to_ascii_lowercase()
        .contains("no transaction is active")
}
