//! Scripted network and recording host for worker tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use qrsw_core::{AppConfig, CacheDb, Error, ResponsePayload};
use tokio::sync::Semaphore;
use url::Url;

use super::hooks::{Notification, WorkerHost};
use super::{ServiceWorker, WorkerConfig};
use crate::fetch::{Network, Request};

pub(crate) const TEST_ORIGIN: &str = "https://qr.test/";

/// Network answering from a script.
///
/// Unscripted URLs get `200 OK` with body `fresh:<url>`.
pub(crate) struct ScriptedNetwork {
    responses: Mutex<HashMap<String, ResponsePayload>>,
    failing: Mutex<HashSet<String>>,
    oversized: Mutex<HashSet<String>>,
    offline: AtomicBool,
    held: AtomicBool,
    gate: Semaphore,
    calls: AtomicUsize,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            oversized: Mutex::new(HashSet::new()),
            offline: AtomicBool::new(false),
            held: AtomicBool::new(false),
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn respond(&self, url: &str, response: ResponsePayload) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    /// Every fetch fails as if the device had no connectivity.
    pub(crate) fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    /// Fetches of this URL fail with a network error.
    pub(crate) fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    /// Fetches of this URL fail as if the body exceeded the size limit.
    pub(crate) fn oversize(&self, url: &str) {
        self.oversized.lock().unwrap().insert(url.to_string());
    }

    /// Block fetches until `release` is called.
    pub(crate) fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub(crate) fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.gate.add_permits(1024);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<ResponsePayload, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.held.load(Ordering::SeqCst) {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| Error::Network(e.to_string()))?;
        }

        let url = request.url.as_str();
        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(url) {
            return Err(Error::Network(format!("{url}: connection refused")));
        }
        if self.oversized.lock().unwrap().contains(url) {
            return Err(Error::FetchTooLarge(format!("{url}: body exceeds limit")));
        }

        let scripted = self.responses.lock().unwrap().get(url).cloned();
        Ok(scripted.unwrap_or_else(|| ResponsePayload::new(200, "OK", format!("fresh:{url}"))))
    }
}

/// Host that records every side effect as a string.
#[derive(Default)]
pub(crate) struct RecordingHost {
    events: Mutex<Vec<String>>,
    reject_claims: AtomicBool,
    reject_notifications: AtomicBool,
    reject_queue: AtomicBool,
}

impl RecordingHost {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn reject_claims(&self) {
        self.reject_claims.store(true, Ordering::SeqCst);
    }

    pub(crate) fn reject_notifications(&self) {
        self.reject_notifications.store(true, Ordering::SeqCst);
    }

    pub(crate) fn reject_queue(&self) {
        self.reject_queue.store(true, Ordering::SeqCst);
    }

    fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }
}

#[async_trait]
impl WorkerHost for RecordingHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.record("skip_waiting");
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        if self.reject_claims.load(Ordering::SeqCst) {
            return Err(Error::Host("clients unavailable".into()));
        }
        self.record("claim_clients");
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        if self.reject_notifications.load(Ordering::SeqCst) {
            return Err(Error::Host("notification permission denied".into()));
        }
        self.record(format!("notification:{}", notification.body));
        Ok(())
    }

    async fn close_notification(&self) -> Result<(), Error> {
        self.record("close_notification");
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        self.record(format!("open_window:{url}"));
        Ok(())
    }

    async fn process_offline_queue(&self, tag: &str) -> Result<usize, Error> {
        if self.reject_queue.load(Ordering::SeqCst) {
            return Err(Error::Host("queue store unavailable".into()));
        }
        self.record(format!("offline_queue:{tag}"));
        Ok(0)
    }
}

/// Worker over a fresh in-memory database, default manifest, origin `https://qr.test/`.
pub(crate) async fn worker_with(network: ScriptedNetwork) -> (ServiceWorker, Arc<ScriptedNetwork>, Arc<RecordingHost>) {
    worker_with_config(AppConfig { origin: TEST_ORIGIN.into(), ..Default::default() }, network).await
}

pub(crate) async fn worker_with_config(
    config: AppConfig, network: ScriptedNetwork,
) -> (ServiceWorker, Arc<ScriptedNetwork>, Arc<RecordingHost>) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let network = Arc::new(network);
    let host = Arc::new(RecordingHost::default());
    let worker = ServiceWorker::new(
        WorkerConfig::from_app(&config).unwrap(),
        db,
        network.clone(),
        host.clone(),
    );
    (worker, network, host)
}

/// Worker over an existing database, e.g. a second version next to an older one.
pub(crate) fn worker_on(db: CacheDb, config: AppConfig, network: ScriptedNetwork) -> ServiceWorker {
    ServiceWorker::new(
        WorkerConfig::from_app(&config).unwrap(),
        db,
        Arc::new(network),
        Arc::new(RecordingHost::default()),
    )
}
