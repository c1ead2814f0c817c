//! Document store for invoices and warranties in one namespace over the flat
//! key/value table, enumerated through a single ordered index of ids.
//!
//! Layout:
//! - `document:<id>` → JSON `DocumentRecord`
//! - `documents:index` → JSON array of ids, most recently saved first
//!
//! Every mutation that touches both a record and the index runs in one
//! transaction, so the index never names a record that was not written.

use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{kv_get, kv_remove, kv_remove_prefix, kv_set};
use crate::models::document::DocumentRecord;

const INDEX_KEY: &str = "documents:index";
const RECORD_PREFIX: &str = "document:";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("stored value under '{key}' is unreadable: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode record: {0}")]
    Encode(serde_json::Error),
}

#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

fn record_key(id: &str) -> String {
    format!("{RECORD_PREFIX}{id}")
}

impl DocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Writes the record under its id and moves the id to the front of the
    /// index. Last write wins.
    pub async fn save(&self, record: &DocumentRecord) -> Result<(), StoreError> {
        let value = serde_json::to_string(record).map_err(StoreError::Encode)?;

        let mut tx = self.pool.begin().await?;
        kv_set(&mut tx, &record_key(&record.id), &value).await?;

        let mut index = read_index(&mut tx).await?;
        index.retain(|id| id != &record.id);
        index.insert(0, record.id.clone());
        write_index(&mut tx, &index).await?;
        tx.commit().await?;

        debug!(
            "Saved {} {} ({} bytes), index size {}",
            record.kind().as_str(),
            record.id,
            value.len(),
            index.len()
        );
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<DocumentRecord>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let key = record_key(id);
        match kv_get(&mut conn, &key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StoreError::Corrupt { key, source }),
            None => Ok(None),
        }
    }

    /// All indexed records, newest `extracted_at` first. Ids whose record is
    /// missing or unreadable are skipped, and an unreadable index lists as
    /// empty. The sort is stable, so records with equal timestamps keep index
    /// order (most recently saved first).
    pub async fn list(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let index = read_index_or_empty(&mut conn).await?;

        let mut records = Vec::with_capacity(index.len());
        for id in &index {
            let Some(raw) = kv_get(&mut conn, &record_key(id)).await? else {
                warn!("Index names document {id} but no record is stored; skipping");
                continue;
            };
            match serde_json::from_str::<DocumentRecord>(&raw) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable document {id}: {e}"),
            }
        }

        records.sort_by(|a, b| b.extracted_at.cmp(&a.extracted_at));
        Ok(records)
    }

    /// Removes the record and its index entry. Absent ids are not an error.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let removed = kv_remove(&mut tx, &record_key(id)).await?;

        let mut index = read_index(&mut tx).await?;
        let before = index.len();
        index.retain(|existing| existing != id);
        let unindexed = index.len() != before;
        if unindexed {
            write_index(&mut tx, &index).await?;
        }
        tx.commit().await?;

        if removed || unindexed {
            info!("Deleted document {id}");
        } else {
            debug!("Delete of unknown document {id} ignored");
        }
        Ok(())
    }

    /// Removes every record and the index. Works on an unreadable index too,
    /// which makes it the way back to a usable store.
    pub async fn clear(&self) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        let removed = kv_remove_prefix(&mut tx, RECORD_PREFIX).await?;
        kv_remove(&mut tx, INDEX_KEY).await?;
        tx.commit().await?;

        info!("Cleared {removed} documents");
        Ok(removed as usize)
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(read_index_or_empty(&mut conn).await?.len())
    }
}

async fn read_index(conn: &mut SqliteConnection) -> Result<Vec<String>, StoreError> {
    match kv_get(conn, INDEX_KEY).await? {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            key: INDEX_KEY.to_string(),
            source,
        }),
        None => Ok(Vec::new()),
    }
}

/// Read paths degrade: an unreadable index is logged and treated as empty.
async fn read_index_or_empty(conn: &mut SqliteConnection) -> Result<Vec<String>, StoreError> {
    match read_index(conn).await {
        Err(StoreError::Corrupt { key, source }) => {
            warn!("Index '{key}' is unreadable ({source}); listing no documents");
            Ok(Vec::new())
        }
        other => other,
    }
}

async fn write_index(conn: &mut SqliteConnection, index: &[String]) -> Result<(), StoreError> {
    let value = serde_json::to_string(index).map_err(StoreError::Encode)?;
    kv_set(conn, INDEX_KEY, &value).await?;
    Ok(())
}
