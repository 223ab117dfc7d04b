//! Sync, push, notification and control-message hooks.
//!
//! None of these propagate failures: a handler that fails logs and returns.

use async_trait::async_trait;
use qrsw_core::Error;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{RefreshReport, ServiceWorker, WorkerState};

/// Background sync tag that drains queued offline QR generations.
pub const SYNC_TAG_GENERATE: &str = "qr-generate";

/// Periodic sync tag that refreshes the critical caches.
pub const PERIODIC_TAG_REFRESH: &str = "qr-cache-refresh";

/// Notification action that opens the application.
pub const ACTION_EXPLORE: &str = "explore";

/// Notification action that only dismisses.
pub const ACTION_CLOSE: &str = "close";

/// Side effects the worker asks of its host runtime.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Let this version activate without waiting for old clients to close.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Start intercepting requests of already-open pages.
    async fn claim_clients(&self) -> Result<(), Error>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    /// Close the notification the user just clicked.
    async fn close_notification(&self) -> Result<(), Error>;

    /// Open or focus a window on `url`.
    async fn open_window(&self, url: &Url) -> Result<(), Error>;

    /// Process actions queued while offline. Must be safe to call repeatedly.
    ///
    /// Returns how many actions were processed.
    async fn process_offline_queue(&self, tag: &str) -> Result<usize, Error> {
        tracing::debug!(tag, "no offline queue attached");
        Ok(0)
    }
}

/// Host that performs no side effects beyond logging them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHost;

#[async_trait]
impl WorkerHost for LoggingHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        tracing::info!("skip waiting");
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        tracing::info!("claiming clients");
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, body = %notification.body, "showing notification");
        Ok(())
    }

    async fn close_notification(&self) -> Result<(), Error> {
        tracing::info!("closing notification");
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        tracing::info!(url = %url, "opening window");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

/// Messages a page can post to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
}

impl ServiceWorker {
    /// Background sync. Unknown tags are ignored.
    ///
    /// Returns whether the tag was recognized.
    pub async fn on_sync(&self, tag: &str) -> bool {
        tracing::info!(tag, "background sync triggered");
        if tag != SYNC_TAG_GENERATE {
            return false;
        }

        match self.host.process_offline_queue(tag).await {
            Ok(processed) => tracing::info!(processed, "handled offline QR generation"),
            Err(e) => tracing::error!(error = %e, "background sync failed"),
        }
        true
    }

    /// Periodic sync. Unknown tags are ignored.
    pub async fn on_periodic_sync(&self, tag: &str) -> Option<RefreshReport> {
        tracing::info!(tag, "periodic sync triggered");
        if tag != PERIODIC_TAG_REFRESH {
            return None;
        }
        Some(self.refresh().await)
    }

    /// Show a notification for a push message.
    ///
    /// Returns the notification if the host displayed it.
    pub async fn on_push(&self, payload: Option<&str>) -> Option<Notification> {
        tracing::info!(has_payload = payload.is_some(), "push received");
        let notification = self.build_notification(payload);

        match self.host.show_notification(&notification).await {
            Ok(()) => Some(notification),
            Err(e) => {
                tracing::error!(error = %e, "failed to show notification");
                None
            }
        }
    }

    fn build_notification(&self, payload: Option<&str>) -> Notification {
        Notification {
            title: self.config.notification_title.clone(),
            body: payload.map_or_else(|| self.config.notification_body.clone(), str::to_string),
            icon: "./icon-192.png".into(),
            badge: "./badge-72.png".into(),
            vibrate: vec![100, 50, 100],
            data: NotificationData { date_of_arrival: chrono::Utc::now().timestamp_millis(), primary_key: 1 },
            actions: vec![
                NotificationAction {
                    action: ACTION_EXPLORE.into(),
                    title: "Open App".into(),
                    icon: "./icon-128.png".into(),
                },
                NotificationAction { action: ACTION_CLOSE.into(), title: "Close".into(), icon: "./close-icon.png".into() },
            ],
        }
    }

    /// Handle a click on a notification or one of its actions.
    ///
    /// The notification is closed first. `explore` opens the application
    /// root; anything else stops there. Returns whether a window was opened.
    pub async fn on_notification_click(&self, action: Option<&str>) -> bool {
        tracing::info!(action = action.unwrap_or_default(), "notification clicked");
        if let Err(e) = self.host.close_notification().await {
            tracing::warn!(error = %e, "failed to close notification");
        }

        if action != Some(ACTION_EXPLORE) {
            return false;
        }

        match self.host.open_window(&self.config.root).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "failed to open window");
                false
            }
        }
    }

    /// Handle a message posted by a page. Unrecognized messages are ignored.
    ///
    /// Returns whether the message was recognized.
    pub async fn on_message(&self, message: &serde_json::Value) -> bool {
        let Ok(message) = serde_json::from_value::<ControlMessage>(message.clone()) else {
            tracing::debug!(%message, "ignoring unrecognized message");
            return false;
        };

        match message {
            ControlMessage::SkipWaiting => {
                tracing::info!("received skip waiting message");
                self.skip_waiting_now().await;
            }
        }
        true
    }

    /// Skip waiting and, if this version is installed and waiting, activate it now.
    async fn skip_waiting_now(&self) {
        self.request_skip_waiting().await;
        if self.state().await == WorkerState::Installed
            && let Err(e) = self.on_activate().await
        {
            tracing::error!(error = %e, "activation after skip waiting failed");
        }
    }
}
