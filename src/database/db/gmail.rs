use sqlx::{Pool, Postgres};
use std::time::Duration;
use thiserror::Error;

use crate::database::models::{GmailConnection, NewGmailConnection, SyncStatus};

/*
At most one Gmail connection may be active across the whole system, no matter
how many server processes run. Creation serializes on a transaction-scoped
advisory lock: the lock covers the deactivate-then-insert window and is
released by Postgres on commit, rollback or connection loss, so a crashed
writer never leaves it held. A partial unique index on is_active backs the
invariant up at the schema level.
 */

// Fixed key shared by every process that creates connections.
const CONNECTION_LOCK_KEY: i64 = 0x636f_6e6e_6c6f_636b; // "connlock"

const LOCK_ATTEMPTS: u32 = 5;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("another connection request holds the creation lock, retry later")]
    LockUnavailable,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

const CONNECTION_COLS: &str = "connection_id, gmail_email, access_token, refresh_token, \
     is_active, sync_status, last_sync_at, last_error, created_at, updated_at";

pub async fn get_active(pool: &Pool<Postgres>) -> Result<Option<GmailConnection>, sqlx::Error> {
    sqlx::query_as::<_, GmailConnection>(&format!(
        "SELECT {CONNECTION_COLS} FROM gmail_connections WHERE is_active"
    ))
    .fetch_optional(pool)
    .await
}

pub async fn get_by_id(pool: &Pool<Postgres>, connection_id: i64) -> Result<GmailConnection, sqlx::Error> {
    sqlx::query_as::<_, GmailConnection>(&format!(
        "SELECT {CONNECTION_COLS} FROM gmail_connections WHERE connection_id = $1"
    ))
    .bind(connection_id)
    .fetch_one(pool)
    .await
}

/// Deactivate every active row and insert the new one as a single unit.
///
/// Retries a few times when another request holds the lock, then gives up
/// with `LockUnavailable`; the lock is never bypassed.
pub async fn create_active(
    pool: &Pool<Postgres>,
    new: &NewGmailConnection,
) -> Result<GmailConnection, ConnectionError> {
    for attempt in 1..=LOCK_ATTEMPTS {
        let mut tx = pool.begin().await?;

        let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
            .bind(CONNECTION_LOCK_KEY)
            .fetch_one(&mut *tx)
            .await?;

        if !locked {
            tx.rollback().await?;
            if attempt < LOCK_ATTEMPTS {
                tracing::debug!(attempt, "gmail connection lock contended, retrying");
                tokio::time::sleep(LOCK_RETRY_DELAY * attempt).await;
            }
            continue;
        }

        sqlx::query(
            "UPDATE gmail_connections SET is_active = FALSE, updated_at = NOW() WHERE is_active",
        )
        .execute(&mut *tx)
        .await?;

        let connection = sqlx::query_as::<_, GmailConnection>(&format!(
            r#"
            INSERT INTO gmail_connections (gmail_email, access_token, refresh_token)
            VALUES ($1, $2, $3)
            RETURNING {CONNECTION_COLS}
            "#
        ))
        .bind(&new.gmail_email)
        .bind(&new.access_token)
        .bind(&new.refresh_token)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        return Ok(connection);
    }

    Err(ConnectionError::LockUnavailable)
}

pub async fn update_sync_status(
    pool: &Pool<Postgres>,
    connection_id: i64,
    status: SyncStatus,
    last_error: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE gmail_connections
        SET sync_status = $2,
            last_error = $3,
            last_sync_at = CASE WHEN $2 = 'success' THEN NOW() ELSE last_sync_at END,
            updated_at = NOW()
        WHERE connection_id = $1
        "#,
    )
    .bind(connection_id)
    .bind(status.as_str())
    .bind(last_error)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// Token refresh writes back the new access token mid-scan.
pub async fn update_access_token(
    pool: &Pool<Postgres>,
    connection_id: i64,
    access_token: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE gmail_connections SET access_token = $2, updated_at = NOW() WHERE connection_id = $1",
    )
    .bind(connection_id)
    .bind(access_token)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// Soft delete: the row stays for audit, it just stops being the active inbox.
pub async fn deactivate(pool: &Pool<Postgres>, connection_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE gmail_connections SET is_active = FALSE, updated_at = NOW() WHERE connection_id = $1 AND is_active",
    )
    .bind(connection_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
