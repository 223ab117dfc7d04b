//! Fetch-serving strategies.
//!
//! ### Cache-First
//! Serve from the cache without touching the network. On a miss, fetch,
//! store a 2xx copy, and return whatever the network answered. With neither,
//! answer 503.
//!
//! ### Network-First
//! Always try the network. A 2xx copy is stored and the cache trimmed. If the
//! network is unreachable, fall back to the cached copy, else 503.
//!
//! ### Stale-While-Revalidate
//! Return the cached copy immediately and refresh it in a detached task. On
//! a miss, wait for the network. Refresh failures are logged and dropped,
//! and a refresh never re-creates a cache deleted while it was in flight.
//!
//! No strategy returns an error: every fault becomes a 503 response.

use qrsw_core::{Error, ResponsePayload};
use serde::{Deserialize, Serialize};

use super::ServiceWorker;
use crate::fetch::Request;

const CACHE_FIRST_UNAVAILABLE: &str = "Offline content not available";
const NETWORK_FIRST_UNAVAILABLE: &str = "Network request failed and no cached version available";
const REVALIDATE_UNAVAILABLE: &str = "Request failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl ServiceWorker {
    /// Serve a request from the named cache with the given strategy.
    pub async fn serve(&self, strategy: Strategy, request: &Request, cache: &str) -> ResponsePayload {
        match strategy {
            Strategy::CacheFirst => self.cache_first(request, cache).await,
            Strategy::NetworkFirst => self.network_first(request, cache).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request, cache).await,
        }
    }

    pub async fn cache_first(&self, request: &Request, cache: &str) -> ResponsePayload {
        match self.try_cache_first(request, cache).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache first strategy failed");
                ResponsePayload::service_unavailable(CACHE_FIRST_UNAVAILABLE)
            }
        }
    }

    async fn try_cache_first(&self, request: &Request, cache: &str) -> Result<ResponsePayload, Error> {
        if let Some(hit) = self.lookup(request, cache).await? {
            tracing::debug!(url = %request.url, cache, "serving from cache");
            return Ok(hit);
        }

        tracing::debug!(url = %request.url, cache, "fetching and caching");
        let response = self.network.fetch(request).await?;
        if response.is_ok() {
            self.store(request, cache, &response).await?;
        }
        Ok(response)
    }

    pub async fn network_first(&self, request: &Request, cache: &str) -> ResponsePayload {
        tracing::debug!(url = %request.url, "network first");
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok()
                    && let Err(e) = self.store(request, cache, &response).await
                {
                    tracing::warn!(url = %request.url, error = %e, "failed to cache network response");
                }
                response
            }
            Err(network_err) => {
                tracing::debug!(url = %request.url, error = %network_err, "network failed, trying cache");
                match self.lookup(request, cache).await {
                    Ok(Some(hit)) => hit,
                    Ok(None) => ResponsePayload::service_unavailable(NETWORK_FIRST_UNAVAILABLE),
                    Err(e) => {
                        tracing::warn!(url = %request.url, error = %e, "cache fallback failed");
                        ResponsePayload::service_unavailable(NETWORK_FIRST_UNAVAILABLE)
                    }
                }
            }
        }
    }

    pub async fn stale_while_revalidate(&self, request: &Request, cache: &str) -> ResponsePayload {
        let cached = match self.lookup(request, cache).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "stale while revalidate failed");
                return ResponsePayload::service_unavailable(REVALIDATE_UNAVAILABLE);
            }
        };

        if let Some(hit) = cached {
            tracing::debug!(url = %request.url, "serving stale content");
            let worker = self.clone();
            let background = request.clone();
            let target = cache.to_string();
            self.spawn_background(async move {
                if let Err(e) = worker.refresh_stale(&background, &target).await {
                    tracing::warn!(url = %background.url, error = %e, "background revalidation failed");
                }
            })
            .await;
            return hit;
        }

        tracing::debug!(url = %request.url, "no cache, waiting for network");
        match self.revalidate(request, cache).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "stale while revalidate failed");
                ResponsePayload::service_unavailable(REVALIDATE_UNAVAILABLE)
            }
        }
    }

    /// Fetch and, on 2xx, store a copy, creating the cache if needed.
    ///
    /// A failed write is logged; the network response is still returned.
    async fn revalidate(&self, request: &Request, cache: &str) -> Result<ResponsePayload, Error> {
        let response = self.network.fetch(request).await?;
        if response.is_ok()
            && let Err(e) = self.store(request, cache, &response).await
        {
            tracing::warn!(url = %request.url, error = %e, "failed to update cache");
        }
        Ok(response)
    }

    /// Background half of Stale-While-Revalidate.
    ///
    /// Only writes into a cache that still exists: a refresh finishing after a
    /// newer version purged this cache must not bring it back.
    async fn refresh_stale(&self, request: &Request, cache: &str) -> Result<(), Error> {
        let response = self.network.fetch(request).await?;
        if !response.is_ok() || !request.is_cacheable() {
            return Ok(());
        }

        let updated = self
            .db
            .update_entry(cache, request.url.as_str(), request.method.as_str(), &response)
            .await?;
        if updated {
            self.enforce_limit(cache).await?;
        } else {
            tracing::debug!(url = %request.url, cache, "cache was deleted, dropping refreshed copy");
        }
        Ok(())
    }

    async fn lookup(&self, request: &Request, cache: &str) -> Result<Option<ResponsePayload>, Error> {
        self.db
            .match_entry(cache, request.url.as_str(), request.method.as_str())
            .await
    }

    /// Write a response and apply the cache's size limit.
    ///
    /// Non-GET requests are never stored.
    async fn store(&self, request: &Request, cache: &str, response: &ResponsePayload) -> Result<(), Error> {
        if !request.is_cacheable() {
            tracing::debug!(url = %request.url, method = %request.method, "not caching mutating request");
            return Ok(());
        }
        self.db
            .put_entry(cache, request.url.as_str(), request.method.as_str(), response)
            .await?;
        self.enforce_limit(cache).await?;
        Ok(())
    }
}
