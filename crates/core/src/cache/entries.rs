//! Partition and entry operations for the SQLite store.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::compute_entry_key;
use super::{CacheStore, StorageEstimate, StorageEstimator};
use crate::Error;
use crate::message::{Request, Response};
use crate::partition::Partition;

const ENSURE_PARTITION: &str = "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)";

impl CacheDb {
    /// Number of entries stored in a partition.
    pub async fn entry_count(&self, partition: Partition) -> Result<u64, Error> {
        let name = partition.name();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, partition: Partition) -> Result<(), Error> {
        let name = partition.name();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(ENSURE_PARTITION, params![name, now])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn lookup(&self, partition: Partition, request: &Request) -> Result<Option<Response>, Error> {
        let name = partition.name();
        let key = compute_entry_key(&request.method, request.url.as_str());
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn
                    .prepare("SELECT status, headers_json, body FROM entries WHERE partition = ?1 AND key_hash = ?2")?;

                let result = stmt.query_row(params![name, key], |row| {
                    Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?))
                });

                match result {
                    Ok((status, headers_json, body)) => {
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::Store(format!("corrupt headers in {name}: {e}")))?;
                        Ok(Some(Response { status, headers, body: Bytes::from(body) }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace an entry.
    ///
    /// Uses UPSERT semantics so the last write for an identity wins.
    async fn put(&self, partition: Partition, request: &Request, response: Response) -> Result<(), Error> {
        let name = partition.name();
        let key = compute_entry_key(&request.method, request.url.as_str());
        let url = request.url.to_string();
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::Store(format!("failed to encode headers: {e}")))?;
        let size = response.stored_size() as i64;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(ENSURE_PARTITION, params![name, &now])?;
                tx.execute(
                    "INSERT INTO entries (partition, key_hash, url, status, headers_json, body, size_bytes, stored_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(partition, key_hash) DO UPDATE SET
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        size_bytes = excluded.size_bytes,
                        stored_at = excluded.stored_at",
                    params![name, key, url, response.status, headers_json, &response.body[..], size, now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE partition = ?1", params![&name])?;
                let removed = tx.execute("DELETE FROM partitions WHERE name = ?1", params![&name])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at, name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl StorageEstimator for CacheDb {
    async fn estimate(&self, partition: Option<Partition>) -> Result<StorageEstimate, Error> {
        let quota = self.quota;
        let name = partition.map(Partition::name);
        self.conn
            .call(move |conn| -> Result<StorageEstimate, Error> {
                let usage: i64 = match name {
                    Some(name) => conn.query_row(
                        "SELECT COALESCE(SUM(size_bytes), 0) FROM entries WHERE partition = ?1",
                        params![name],
                        |row| row.get(0),
                    )?,
                    None => conn.query_row("SELECT COALESCE(SUM(size_bytes), 0) FROM entries", [], |row| row.get(0))?,
                };
                Ok(StorageEstimate { usage: usage as u64, quota })
            })
            .await
            .map_err(|e| Error::Estimate(Error::from(e).to_string()))
    }
}
