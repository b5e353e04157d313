//! Polling projection of a user's unread count.
//!
//! [`UnreadCounter`] re-reads `NotificationStore::unread_count` on a fixed
//! interval and whenever [`refresh`](UnreadCounter::refresh) is called after a
//! mutation. The published value is a cache and may be stale between polls.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use voyage_core::badge::badge_label;
use voyage_db::{NotificationStore, StoreResult};

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

struct Shared {
    store: Arc<dyn NotificationStore>,
    user_id: String,
    interval: Duration,
    state: watch::Sender<Option<i64>>,
    refresh: Notify,
}

impl Shared {
    async fn poll(&self) -> StoreResult<i64> {
        let count = self.store.unread_count(&self.user_id).await?;
        self.state.send_replace(Some(count));
        Ok(count)
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(user_id = %self.user_id, "Unread counter stopped");
                    break;
                }
                _ = interval.tick() => {}
                _ = self.refresh.notified() => {}
            }
            if let Err(e) = self.poll().await {
                tracing::warn!(user_id = %self.user_id, error = %e, "Unread count poll failed");
            }
        }
    }
}

struct RunningTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Cancellable background poller for one user's unread count.
pub struct UnreadCounter {
    shared: Arc<Shared>,
    task: Mutex<Option<RunningTask>>,
}

impl UnreadCounter {
    pub fn new(store: Arc<dyn NotificationStore>, user_id: impl Into<String>) -> Self {
        Self::with_interval(store, user_id, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(
        store: Arc<dyn NotificationStore>,
        user_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                store,
                user_id: user_id.into(),
                interval,
                state,
                refresh: Notify::new(),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start polling. The first poll runs immediately. No-op if running.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&self.shared).run(cancel.clone()));
        *task = Some(RunningTask { cancel, handle });
        tracing::debug!(user_id = %self.shared.user_id, "Unread counter started");
    }

    /// Stop polling and wait for the loop to exit. The last value is kept.
    pub async fn stop(&self) {
        let Some(running) = self.task.lock().await.take() else {
            return;
        };
        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            tracing::error!(error = %e, "Unread counter task panicked");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    /// Ask the running loop to poll now, e.g. after mark-read.
    pub fn refresh(&self) {
        self.shared.refresh.notify_one();
    }

    /// Poll on the caller's task, independent of the loop.
    pub async fn refresh_now(&self) -> StoreResult<i64> {
        self.shared.poll().await
    }

    /// Last polled count; `None` before the first poll.
    pub fn latest(&self) -> Option<i64> {
        *self.shared.state.borrow()
    }

    /// Display label for the badge, hidden at zero.
    pub fn badge(&self) -> Option<String> {
        self.latest().and_then(badge_label)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<i64>> {
        self.shared.state.subscribe()
    }
}

impl Drop for UnreadCounter {
    fn drop(&mut self) {
        if let Some(running) = self.task.get_mut().take() {
            running.cancel.cancel();
        }
    }
}
