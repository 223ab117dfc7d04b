//! SQLite-backed named cache storage.
//!
//! This module provides the persistent store behind every named cache the
//! worker owns, using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named caches that can be listed and deleted as a whole
//! - Entries keyed by SHA-256 of method + URL
//! - Insertion-ordered keys for oldest-first eviction
//! - Atomic multi-entry writes
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{EntryKey, PendingEntry};
pub use storage::CacheSummary;
