//! The offline caching worker.
//!
//! A `ServiceWorker` is one version of the application's caching layer. The
//! host runtime feeds it lifecycle events (install, activate), intercepted
//! requests, and sync/push/message events:
//!
//! - `on_fetch` classifies a request and serves it through one of three
//!   strategies (see [`strategy`]).
//! - `on_install` / `on_activate` populate the static cache and purge caches
//!   of older versions (see [`lifecycle`]).
//! - `on_sync`, `on_periodic_sync`, `on_push`, `on_notification_click` and
//!   `on_message` are the event hooks (see [`hooks`]).
//!
//! Side effects outside the cache (skip waiting, claiming clients,
//! notifications, windows) go through the [`WorkerHost`] trait.

pub mod classify;
pub mod config;
pub mod hooks;
pub mod lifecycle;
pub mod strategy;

#[cfg(test)]
pub(crate) mod test_support;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use qrsw_core::{CacheDb, ResponsePayload};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;

pub use classify::{ClassifierTable, RequestClass};
pub use config::{CacheRole, WorkerConfig};
pub use hooks::{
    ControlMessage, LoggingHost, Notification, NotificationAction, NotificationData, PERIODIC_TAG_REFRESH,
    SYNC_TAG_GENERATE, WorkerHost,
};
pub use lifecycle::{ActivateReport, InstallReport, RefreshReport};
pub use strategy::Strategy;

use crate::fetch::{Network, Request, is_http};

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Created, install not yet run.
    Parsed,
    Installing,
    /// Static cache populated; waiting to activate.
    Installed,
    Activating,
    /// Controlling clients.
    Activated,
    /// Install failed.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Parsed => write!(f, "parsed"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
            WorkerState::Redundant => write!(f, "redundant"),
        }
    }
}

/// One version of the caching worker.
///
/// Cloning is cheap; clones share caches, state, and background tasks.
#[derive(Clone)]
pub struct ServiceWorker {
    config: Arc<WorkerConfig>,
    db: CacheDb,
    network: Arc<dyn Network>,
    host: Arc<dyn WorkerHost>,
    state: Arc<RwLock<WorkerState>>,
    skip_waiting: Arc<AtomicBool>,
    background: Arc<Mutex<JoinSet<()>>>,
}

impl ServiceWorker {
    pub fn new(config: WorkerConfig, db: CacheDb, network: Arc<dyn Network>, host: Arc<dyn WorkerHost>) -> Self {
        Self {
            config: Arc::new(config),
            db,
            network,
            host,
            state: Arc::new(RwLock::new(WorkerState::Parsed)),
            skip_waiting: Arc::new(AtomicBool::new(false)),
            background: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub(crate) async fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().await;
        if *state != next {
            tracing::debug!(version = %self.config.version, from = %*state, to = %next, "worker state change");
            *state = next;
        }
    }

    /// Whether this version asked to activate without waiting for old clients.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn classify(&self, request: &Request) -> RequestClass {
        self.config.classifier.classify(request)
    }

    /// Intercept a page request.
    ///
    /// Returns None for requests the worker does not handle (non-http
    /// schemes); the host lets those through untouched.
    pub async fn on_fetch(&self, mut request: Request) -> Option<ResponsePayload> {
        if !is_http(&request.url) {
            tracing::debug!(url = %request.url, "not intercepting non-http request");
            return None;
        }
        request.url.set_fragment(None);

        let class = self.classify(&request);
        let cache = self.config.cache_name(class.cache_role());
        tracing::debug!(url = %request.url, method = %request.method, ?class, "intercepted request");

        Some(self.serve(class.strategy(), &request, &cache).await)
    }

    /// Wait for every detached background refresh spawned so far.
    ///
    /// Returns the number of tasks that were joined.
    pub async fn settle(&self) -> usize {
        let mut tasks = std::mem::take(&mut *self.background.lock().await);
        let mut joined = 0;
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "background task did not complete");
            }
            joined += 1;
        }
        joined
    }

    /// Run a future detached from the caller. Its outcome is logged only.
    pub(crate) async fn spawn_background<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.background.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }
}
