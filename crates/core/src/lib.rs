//! Core types and shared functionality for qr-offline.
//!
//! This crate provides:
//! - Named cache storage with SQLite backend
//! - The response payload model shared by caches and the network
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod response;

pub use cache::{CacheDb, CacheSummary, EntryKey};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use response::ResponsePayload;
