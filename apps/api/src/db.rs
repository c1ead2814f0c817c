use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

/// Creates the local SQLite pool and makes sure the key/value table exists.
///
/// The pool holds a single connection: writes to the document index are
/// read-modify-write and must not interleave.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Opening local store at {database_url}");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await?;

    migrate(&pool).await?;

    info!("Local store ready");
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn kv_get(conn: &mut SqliteConnection, key: &str) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT value FROM kv WHERE key = ?1")
        .bind(key)
        .fetch_optional(conn)
        .await
}

pub async fn kv_set(conn: &mut SqliteConnection, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO kv (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(conn)
    .await?;
    Ok(())
}

/// Returns whether a row was removed.
pub async fn kv_remove(conn: &mut SqliteConnection, key: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM kv WHERE key = ?1")
        .bind(key)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Removes every key starting with `prefix`. Returns the number of rows removed.
pub async fn kv_remove_prefix(conn: &mut SqliteConnection, prefix: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM kv WHERE substr(key, 1, length(?1)) = ?1")
        .bind(prefix)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    migrate(&pool).await.expect("migrate");
    pool
}
