//! Cache lifecycle: install, activate, eviction, refresh.

use futures_util::future::{join_all, try_join_all};
use qrsw_core::Error;
use qrsw_core::cache::PendingEntry;
use serde::{Deserialize, Serialize};
use url::Url;

use super::config::CacheRole;
use super::{ServiceWorker, WorkerState};
use crate::fetch::Request;

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    pub cache: String,
    pub assets: Vec<String>,
}

/// Outcome of an activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateReport {
    /// Stale caches removed.
    pub deleted: Vec<String>,
    /// Stale caches that could not be removed.
    pub failed: Vec<String>,
    /// Whether the host accepted the client claim.
    pub claimed: bool,
}

/// Outcome of a periodic refresh. Each asset succeeds or fails on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub refreshed: Vec<String>,
    pub failed: Vec<String>,
}

impl ServiceWorker {
    /// Populate the static cache with the whole manifest.
    ///
    /// Every asset must come back 2xx; the entries are then written in one
    /// transaction. On any failure nothing is written and the worker becomes
    /// redundant. On success, skip waiting is requested from the host.
    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        tracing::info!(version = %self.config.version, "installing service worker");
        self.set_state(WorkerState::Installing).await;

        match self.precache_manifest().await {
            Ok(report) => {
                tracing::info!(cache = %report.cache, assets = report.assets.len(), "static assets cached");
                self.set_state(WorkerState::Installed).await;
                self.request_skip_waiting().await;
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to cache static assets");
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    async fn precache_manifest(&self) -> Result<InstallReport, Error> {
        let cache = self.config.cache_name(CacheRole::Static);

        let fetches = self.config.static_assets.iter().map(|url| async move {
            let request = Request::get(url.clone());
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed(format!("{url}: {e}")))?;
            if !response.is_ok() {
                return Err(Error::InstallFailed(format!("{url}: status {}", response.status)));
            }
            Ok::<_, Error>(PendingEntry { method: "GET".into(), url: url.to_string(), response })
        });
        let entries = try_join_all(fetches).await?;

        let assets = entries.iter().map(|entry| entry.url.clone()).collect();
        self.db
            .put_entries(&cache, entries)
            .await
            .map_err(|e| Error::InstallFailed(e.to_string()))?;

        Ok(InstallReport { cache, assets })
    }

    /// Take over from older versions.
    ///
    /// Deletes every cache carrying the application prefix that is not one of
    /// this version's role caches, makes sure the current role caches exist,
    /// then claims clients. Deletion and claim failures are logged only.
    pub async fn on_activate(&self) -> Result<ActivateReport, Error> {
        let state = self.state().await;
        if matches!(state, WorkerState::Parsed | WorkerState::Installing | WorkerState::Redundant) {
            return Err(Error::InvalidState(format!("cannot activate a worker that is {state}")));
        }

        tracing::info!(version = %self.config.version, "activating service worker");
        self.set_state(WorkerState::Activating).await;

        let current = self.config.current_caches();
        let mut report = ActivateReport::default();

        let names = match self.db.cache_names().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate caches; skipping cleanup");
                Vec::new()
            }
        };

        for name in names.into_iter().filter(|name| self.config.owns(name) && !current.contains(name)) {
            tracing::info!(cache = %name, "deleting old cache");
            match self.db.delete_cache(&name).await {
                Ok(_) => report.deleted.push(name),
                Err(e) => {
                    tracing::warn!(cache = %name, error = %e, "failed to delete old cache");
                    report.failed.push(name);
                }
            }
        }

        for name in &current {
            if let Err(e) = self.db.open_cache(name).await {
                tracing::warn!(cache = %name, error = %e, "failed to open cache");
            }
        }

        match self.host.claim_clients().await {
            Ok(()) => report.claimed = true,
            Err(e) => tracing::warn!(error = %e, "failed to claim clients"),
        }

        self.set_state(WorkerState::Activated).await;
        tracing::info!(deleted = report.deleted.len(), "service worker activated");
        Ok(report)
    }

    /// Trim a cache to its entry limit, oldest first.
    ///
    /// Caches without a limit are left alone. Returns the number of evicted entries.
    pub async fn enforce_limit(&self, cache: &str) -> Result<u64, Error> {
        let Some(limit) = self.config.limit_for(cache) else {
            return Ok(0);
        };

        let evicted = self.db.trim_oldest(cache, limit).await?;
        if evicted > 0 {
            tracing::debug!(cache, evicted, limit, "cache exceeded limit, evicted oldest entries");
        }
        Ok(evicted)
    }

    /// Re-fetch the critical assets into the static cache.
    ///
    /// Assets are refreshed concurrently and independently.
    pub async fn refresh(&self) -> RefreshReport {
        tracing::info!("refreshing critical caches");
        let cache = self.config.cache_name(CacheRole::Static);

        let results = join_all(self.config.critical_assets.iter().map(|url| {
            let cache = cache.as_str();
            async move { (url, self.refresh_asset(cache, url).await) }
        }))
        .await;

        let mut report = RefreshReport::default();
        for (url, result) in results {
            match result {
                Ok(()) => report.refreshed.push(url.to_string()),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "failed to refresh asset");
                    report.failed.push(url.to_string());
                }
            }
        }

        tracing::info!(refreshed = report.refreshed.len(), failed = report.failed.len(), "cache refresh completed");
        report
    }

    async fn refresh_asset(&self, cache: &str, url: &Url) -> Result<(), Error> {
        let request = Request::get(url.clone());
        let response = self.network.fetch(&request).await?;
        if !response.is_ok() {
            return Err(Error::HttpError(format!("status {}", response.status)));
        }
        self.db.put_entry(cache, url.as_str(), "GET", &response).await
    }

    /// Mark this version as ready to activate immediately and tell the host.
    pub(crate) async fn request_skip_waiting(&self) {
        self.skip_waiting.store(true, std::sync::atomic::Ordering::SeqCst);
        if let Err(e) = self.host.skip_waiting().await {
            tracing::warn!(error = %e, "host rejected skip waiting");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{ScriptedNetwork, worker_on, worker_with, worker_with_config};
    use super::*;
    use qrsw_core::{AppConfig, ResponsePayload};

    fn manifest(paths: &[&str]) -> AppConfig {
        AppConfig {
            origin: "https://qr.test/".into(),
            static_assets: paths.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_install_populates_static_cache() {
        let (worker, _, host) =
            worker_with_config(manifest(&["/", "/index.html", "/style.css"]), ScriptedNetwork::new()).await;

        let report = worker.on_install().await.unwrap();
        assert_eq!(report.cache, "qr-generator-v2.0.0-static");
        assert_eq!(report.assets, vec!["https://qr.test/", "https://qr.test/index.html", "https://qr.test/style.css"]);

        assert_eq!(worker.db().entry_count(&report.cache).await.unwrap(), 3);
        assert_eq!(worker.state().await, WorkerState::Installed);
        assert!(worker.skip_waiting_requested());
        assert_eq!(host.events(), vec!["skip_waiting"]);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let network = ScriptedNetwork::new();
        network.respond("https://qr.test/style.css", ResponsePayload::new(404, "Not Found", ""));
        let (worker, _, host) = worker_with_config(manifest(&["/", "/index.html", "/style.css"]), network).await;

        let result = worker.on_install().await;
        assert!(matches!(result, Err(Error::InstallFailed(msg)) if msg.contains("style.css")));

        let cache = worker.config().cache_name(CacheRole::Static);
        assert!(!worker.db().has_cache(&cache).await.unwrap());
        assert_eq!(worker.state().await, WorkerState::Redundant);
        assert!(!worker.skip_waiting_requested());
        assert!(host.events().is_empty());
    }

    #[tokio::test]
    async fn test_install_fails_offline() {
        let network = ScriptedNetwork::new();
        network.fail("https://cdn.jsdelivr.net/npm/qrcode/build/qrcode.min.js");
        let (worker, _, _) = worker_with(network).await;

        assert!(matches!(worker.on_install().await, Err(Error::InstallFailed(_))));
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let (worker, _, _) = worker_with(ScriptedNetwork::new()).await;
        assert!(matches!(worker.on_activate().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activate_purges_old_versions() {
        let (worker, _, host) = worker_with(ScriptedNetwork::new()).await;
        let db = worker.db();
        let stale = ResponsePayload::new(200, "OK", "v1");
        db.put_entry("qr-generator-v1.0.0-static", "https://qr.test/", "GET", &stale).await.unwrap();
        db.put_entry("qr-generator-v1.0.0-dynamic", "https://qr.test/x", "GET", &stale).await.unwrap();
        db.open_cache("unrelated-app-cache").await.unwrap();

        worker.on_install().await.unwrap();
        let report = worker.on_activate().await.unwrap();

        assert_eq!(report.deleted, vec!["qr-generator-v1.0.0-static", "qr-generator-v1.0.0-dynamic"]);
        assert!(report.failed.is_empty());
        assert!(report.claimed);
        assert_eq!(worker.state().await, WorkerState::Activated);
        assert_eq!(host.events(), vec!["skip_waiting", "claim_clients"]);

        let mut names = db.cache_names().await.unwrap();
        names.sort();
        assert_eq!(
            names,
            vec![
                "qr-generator-v2.0.0-cdn",
                "qr-generator-v2.0.0-dynamic",
                "qr-generator-v2.0.0-static",
                "unrelated-app-cache",
            ]
        );
    }

    #[tokio::test]
    async fn test_activate_is_idempotent() {
        let (worker, _, _) = worker_with(ScriptedNetwork::new()).await;
        worker.db().open_cache("qr-generator-v0.9.0-cdn").await.unwrap();
        worker.on_install().await.unwrap();

        let first = worker.on_activate().await.unwrap();
        let second = worker.on_activate().await.unwrap();
        let third = worker.on_activate().await.unwrap();

        assert_eq!(first.deleted, vec!["qr-generator-v0.9.0-cdn"]);
        assert!(second.deleted.is_empty());
        assert!(third.deleted.is_empty());

        let mut names = worker.db().cache_names().await.unwrap();
        names.sort();
        let mut expected = worker.config().current_caches();
        expected.sort();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_activate_claim_failure_is_not_fatal() {
        let (worker, _, host) = worker_with(ScriptedNetwork::new()).await;
        host.reject_claims();
        worker.on_install().await.unwrap();

        let report = worker.on_activate().await.unwrap();
        assert!(!report.claimed);
        assert_eq!(worker.state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_cleanup_failure_still_claims() {
        let (worker, _, host) = worker_with(ScriptedNetwork::new()).await;
        let db = worker.db();
        db.open_cache("qr-generator-v1.0.0-static").await.unwrap();
        db.open_cache("qr-generator-v1.0.0-dynamic").await.unwrap();
        db.execute_batch(
            "CREATE TRIGGER keep_v1_static BEFORE DELETE ON caches
             WHEN OLD.name = 'qr-generator-v1.0.0-static'
             BEGIN SELECT RAISE(ABORT, 'locked'); END;",
        )
        .await
        .unwrap();
        worker.on_install().await.unwrap();

        let report = worker.on_activate().await.unwrap();
        assert_eq!(report.failed, vec!["qr-generator-v1.0.0-static"]);
        assert_eq!(report.deleted, vec!["qr-generator-v1.0.0-dynamic"]);
        assert!(report.claimed);
        assert!(host.events().contains(&"claim_clients".to_string()));
        assert_eq!(worker.state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_two_versions_share_storage() {
        let (old, _, _) = worker_with(ScriptedNetwork::new()).await;
        old.on_install().await.unwrap();
        old.on_activate().await.unwrap();

        let app = AppConfig { origin: "https://qr.test/".into(), version: "v3.0.0".into(), ..Default::default() };
        let new = worker_on(old.db().clone(), app, ScriptedNetwork::new());
        new.on_install().await.unwrap();
        let report = new.on_activate().await.unwrap();

        assert_eq!(report.deleted.len(), 3);
        assert!(report.deleted.iter().all(|name| name.contains("v2.0.0")));
    }

    #[tokio::test]
    async fn test_enforce_limit_only_on_dynamic() {
        let (worker, _, _) = worker_with_config(
            AppConfig { origin: "https://qr.test/".into(), dynamic_cache_limit: 2, ..Default::default() },
            ScriptedNetwork::new(),
        )
        .await;
        let db = worker.db();
        let body = ResponsePayload::new(200, "OK", "x");
        let dynamic = worker.config().cache_name(CacheRole::Dynamic);
        let cdn = worker.config().cache_name(CacheRole::Cdn);
        for i in 0..4 {
            db.put_entry(&dynamic, &format!("https://qr.test/{i}"), "GET", &body).await.unwrap();
            db.put_entry(&cdn, &format!("https://cdn.jsdelivr.net/{i}"), "GET", &body).await.unwrap();
        }

        assert_eq!(worker.enforce_limit(&dynamic).await.unwrap(), 2);
        assert_eq!(worker.enforce_limit(&cdn).await.unwrap(), 0);
        assert_eq!(db.entry_count(&cdn).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_refresh_collects_failures() {
        let network = ScriptedNetwork::new();
        network.respond("https://qr.test/index.html", ResponsePayload::new(200, "OK", "new index"));
        network.fail("https://cdn.jsdelivr.net/npm/qrcode/build/qrcode.min.js");
        let (worker, _, _) = worker_with(network).await;

        let report = worker.refresh().await;
        assert_eq!(report.refreshed, vec!["https://qr.test/", "https://qr.test/index.html"]);
        assert_eq!(report.failed, vec!["https://cdn.jsdelivr.net/npm/qrcode/build/qrcode.min.js"]);

        let cache = worker.config().cache_name(CacheRole::Static);
        let index = worker
            .db()
            .match_entry(&cache, "https://qr.test/index.html", "GET")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(index.text(), "new index");
    }

    #[tokio::test]
    async fn test_refresh_skips_error_statuses() {
        let network = ScriptedNetwork::new();
        network.respond("https://qr.test/", ResponsePayload::new(502, "Bad Gateway", ""));
        let (worker, _, _) = worker_with(network).await;

        let report = worker.refresh().await;
        assert_eq!(report.failed, vec!["https://qr.test/"]);
        assert_eq!(report.refreshed.len(), 2);
    }
}
