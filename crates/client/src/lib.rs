//! Client side of qr-offline.
//!
//! This crate provides the network fetch pipeline and the caching worker
//! that serves intercepted requests from named caches.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network, Request};

pub use worker::{
    ActivateReport, CacheRole, InstallReport, LoggingHost, Notification, RefreshReport, RequestClass, ServiceWorker,
    Strategy, WorkerConfig, WorkerHost, WorkerState,
};
