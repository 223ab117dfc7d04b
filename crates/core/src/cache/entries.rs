//! Cache entry CRUD operations.
//!
//! Entries are ordered by insertion. Storing a key that already exists
//! replaces the entry and moves it to the newest position.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::{Error, ResponsePayload};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// The request an entry was stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntryKey {
    pub method: String,
    pub url: String,
}

/// One entry of a batch write.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub method: String,
    pub url: String,
    pub response: ResponsePayload,
}

fn insert_entry(
    tx: &rusqlite::Transaction<'_>, cache: &str, method: &str, url: &str, response: &ResponsePayload, stored_at: &str,
) -> Result<(), Error> {
    let key_hash = compute_request_key(method, url);
    let headers_json =
        serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;

    tx.execute(
        "DELETE FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
        params![cache, key_hash],
    )?;
    tx.execute(
        "INSERT INTO cache_entries (
            cache_name, key_hash, url, method, status, status_text, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            cache,
            key_hash,
            url,
            method.to_ascii_uppercase(),
            response.status as i64,
            &response.status_text,
            headers_json,
            &response.body,
            stored_at,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Store a response in the named cache, creating the cache if needed.
    ///
    /// Last writer wins for a given key.
    pub async fn put_entry(&self, cache: &str, url: &str, method: &str, response: &ResponsePayload) -> Result<(), Error> {
        let entry = PendingEntry { method: method.to_string(), url: url.to_string(), response: response.clone() };
        self.put_entries(cache, vec![entry]).await
    }

    /// Store several responses in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_entries(&self, cache: &str, entries: Vec<PendingEntry>) -> Result<(), Error> {
        let cache = cache.to_string();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![cache, stored_at],
                )?;
                for entry in &entries {
                    insert_entry(&tx, &cache, &entry.method, &entry.url, &entry.response, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response only if the named cache still exists.
    ///
    /// Returns false, writing nothing, when the cache was deleted. Used by
    /// writers that may outlive the version that opened the cache.
    pub async fn update_entry(
        &self, cache: &str, url: &str, method: &str, response: &ResponsePayload,
    ) -> Result<bool, Error> {
        let cache = cache.to_string();
        let url = url.to_string();
        let method = method.to_string();
        let response = response.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![cache],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Ok(false);
                }
                insert_entry(&tx, &cache, &method, &url, &response, &stored_at)?;
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the response stored for a request.
    ///
    /// Returns None on a miss, including when the cache itself does not exist.
    pub async fn match_entry(&self, cache: &str, url: &str, method: &str) -> Result<Option<ResponsePayload>, Error> {
        let cache = cache.to_string();
        let key_hash = compute_request_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<ResponsePayload>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, body
                     FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![cache, key_hash], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                });

                match result {
                    Ok((status, status_text, headers_json, body)) => {
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptEntry(e.to_string()))?;
                        let status =
                            u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status}")))?;
                        Ok(Some(ResponsePayload { status, status_text, headers, body }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List entry keys of a cache, oldest first.
    pub async fn entry_keys(&self, cache: &str) -> Result<Vec<EntryKey>, Error> {
        let cache = cache.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM cache_entries WHERE cache_name = ?1 ORDER BY seq ASC")?;
                let keys = stmt
                    .query_map(params![cache], |row| Ok(EntryKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Count the entries of a cache.
    pub async fn entry_count(&self, cache: &str) -> Result<u64, Error> {
        let cache = cache.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
                    params![cache],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry.
    ///
    /// Returns false if the cache held nothing for that request.
    pub async fn delete_entry(&self, cache: &str, url: &str, method: &str) -> Result<bool, Error> {
        let cache = cache.to_string();
        let key_hash = compute_request_key(method, url);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                    params![cache, key_hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the oldest entries until the cache holds at most `max_entries`.
    ///
    /// Returns the number of deleted entries.
    pub async fn trim_oldest(&self, cache: &str, max_entries: usize) -> Result<u64, Error> {
        let cache = cache.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
                    params![cache],
                    |row| row.get(0),
                )?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM cache_entries WHERE seq IN (
                        SELECT seq FROM cache_entries WHERE cache_name = ?1 ORDER BY seq ASC LIMIT ?2
                    )",
                    params![cache, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
