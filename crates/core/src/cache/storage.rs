//! Named cache operations.
//!
//! A cache is created on first open or first write and removed together
//! with all its entries.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// A named cache with its current entry count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheSummary {
    pub name: String,
    pub entries: u64,
}

impl CacheDb {
    /// Create the named cache if it does not exist yet.
    pub async fn open_cache(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a cache with this name exists.
    pub async fn has_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn
                    .query_row("SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)", params![name], |row| row.get(0))
                    .map_err(Error::from)?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List every cache name, oldest first.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// List every cache with its entry count, oldest first.
    pub async fn cache_summaries(&self) -> Result<Vec<CacheSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<CacheSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT c.name, COUNT(e.seq)
                     FROM caches c LEFT JOIN cache_entries e ON e.cache_name = c.name
                     GROUP BY c.name
                     ORDER BY c.rowid ASC",
                )?;
                let summaries = stmt
                    .query_map([], |row| {
                        Ok(CacheSummary { name: row.get(0)?, entries: row.get::<_, i64>(1)? as u64 })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a cache and all its entries.
    ///
    /// Returns false if no cache had that name.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
