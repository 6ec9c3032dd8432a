//! Background pollers for session liveness and unread notifications.
//!
//! Each poller runs on a tokio interval and publishes through a
//! [`tokio::sync::watch`] channel. Dropping the [`WatchHandle`] stops the
//! task. A failed request is logged and retried on the next tick only.

use std::time::Duration;

use gobble_core::api::SessionInfo;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::ClientError;

pub const SESSION_CHECK_PERIOD: Duration = Duration::from_secs(30);
pub const NOTIFICATION_POLL_PERIOD: Duration = Duration::from_secs(60);

/// What the session watch last saw.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No check has completed yet.
    #[default]
    Unknown,
    Active(SessionInfo),
    /// No token, or the server rejected it. The token has been cleared.
    LoggedOut,
}

impl SessionState {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }
}

/// A running poller. Dropping it aborts the task.
#[derive(Debug)]
pub struct WatchHandle<T> {
    rx: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> WatchHandle<T> {
    /// The most recently published value.
    #[must_use]
    pub fn current(&self) -> watch::Ref<'_, T> {
        self.rx.borrow()
    }

    /// A receiver for awaiting changes with `changed()`.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.rx.clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl<T> Drop for WatchHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Check the session every 30 seconds.
#[must_use]
pub fn spawn_session_watch(client: ApiClient) -> WatchHandle<SessionState> {
    spawn_session_watch_every(client, SESSION_CHECK_PERIOD)
}

/// [`spawn_session_watch`] with a custom period.
#[must_use]
pub fn spawn_session_watch_every(client: ApiClient, period: Duration) -> WatchHandle<SessionState> {
    let (tx, rx) = watch::channel(SessionState::Unknown);
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let next = if client.has_token() {
                match client.session().await {
                    Ok(session) => SessionState::Active(session),
                    Err(ClientError::SessionExpired) => {
                        info!("Session expired");
                        SessionState::LoggedOut
                    }
                    Err(e) => {
                        warn!(error = %e, "Session check failed");
                        continue;
                    }
                }
            } else {
                SessionState::LoggedOut
            };
            tx.send_if_modified(|state| {
                if *state == next {
                    false
                } else {
                    *state = next;
                    true
                }
            });
        }
    });
    WatchHandle { rx, task }
}

/// Refresh the unread notification count every 60 seconds.
#[must_use]
pub fn spawn_notification_poll(client: ApiClient) -> WatchHandle<i64> {
    spawn_notification_poll_every(client, NOTIFICATION_POLL_PERIOD)
}

/// [`spawn_notification_poll`] with a custom period.
#[must_use]
pub fn spawn_notification_poll_every(client: ApiClient, period: Duration) -> WatchHandle<i64> {
    let (tx, rx) = watch::channel(0);
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !client.has_token() {
                tx.send_if_modified(|count| std::mem::replace(count, 0) != 0);
                continue;
            }
            match client.unread_notifications().await {
                Ok(unread) => {
                    debug!(unread, "Unread notifications");
                    tx.send_if_modified(|count| std::mem::replace(count, unread) != unread);
                }
                Err(e) => warn!(error = %e, "Notification poll failed"),
            }
        }
    });
    WatchHandle { rx, task }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::token::MemoryTokenStore;

    fn offline_client() -> ApiClient {
        // Nothing listens here; no request is made without a token anyway.
        ApiClient::new("http://127.0.0.1:9", Arc::new(MemoryTokenStore::new())).unwrap()
    }

    #[tokio::test]
    async fn test_session_watch_without_token_reports_logged_out() {
        let handle = spawn_session_watch_every(offline_client(), Duration::from_millis(10));
        let mut rx = handle.subscribe();
        rx.wait_for(|state| *state == SessionState::LoggedOut)
            .await
            .unwrap();
        assert!(!handle.current().is_active());
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_task() {
        let handle = spawn_notification_poll_every(offline_client(), Duration::from_millis(10));
        let mut rx = handle.subscribe();
        assert!(handle.is_running());
        drop(handle);
        // The sender is dropped with the aborted task.
        assert!(rx.changed().await.is_err());
    }
}
