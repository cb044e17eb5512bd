use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{
    sync::{broadcast::error::RecvError, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use uuid::Uuid;

use crate::client::{
    api::{ClientResult, NotificationApi},
    optimistic::Optimistic,
    session::Session,
    sync_bus::{NotificationSyncBus, SyncSignal},
};

struct Shared {
    api: Arc<dyn NotificationApi>,
    session: Arc<Session>,
    bus: NotificationSyncBus,
    unread: Mutex<Optimistic<u64>>,
    display: watch::Sender<u64>,
}

impl Shared {
    fn unread(&self) -> MutexGuard<'_, Optimistic<u64>> {
        self.unread.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on the counter and pushes the resulting value to watchers.
    fn update(&self, f: impl FnOnce(&mut Optimistic<u64>)) {
        let shown = {
            let mut unread = self.unread();
            f(&mut unread);
            *unread.current()
        };
        self.display.send_replace(shown);
    }

    async fn poll(&self) {
        if !self.session.is_authenticated() {
            self.update(|unread| unread.confirm(0));
            return;
        }
        match self.api.unread_count().await {
            Ok(count) => self.update(|unread| unread.refresh(count)),
            Err(e) => tracing::debug!(error = %e, "unread count poll failed"),
        }
    }
}

/// One mounted unread-count badge. Polls on a fixed interval and whenever a
/// [`SyncSignal`] arrives; sibling indicators never share state directly.
/// Dropping the indicator stops its polling task.
pub struct NotificationIndicator {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl NotificationIndicator {
    pub fn mount(
        api: Arc<dyn NotificationApi>,
        session: Arc<Session>,
        bus: NotificationSyncBus,
        poll_interval: Duration,
    ) -> Self {
        let (display, _) = watch::channel(0);
        let mut signals = bus.subscribe();
        let shared = Arc::new(Shared {
            api,
            session,
            bus,
            unread: Mutex::new(Optimistic::new(0)),
            display,
        });

        let task = tokio::spawn({
            let shared = shared.clone();
            async move {
                let mut ticker = tokio::time::interval(poll_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        signal = signals.recv() => match signal {
                            Ok(signal) => tracing::trace!(?signal, "re-polling unread count"),
                            Err(RecvError::Lagged(_)) => {}
                            Err(RecvError::Closed) => break,
                        },
                    }
                    shared.poll().await;
                }
            }
        });

        Self { shared, task }
    }

    pub fn unread_count(&self) -> u64 {
        *self.shared.unread().current()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.display.subscribe()
    }

    /// Polls right away instead of waiting for the next tick.
    pub async fn refresh(&self) {
        self.shared.poll().await;
    }

    /// `was_unread` is how the row looked when clicked. Only unread rows
    /// move the badge up front; if the server reports nothing changed, the
    /// guess is dropped and the count is fetched again.
    pub async fn mark_as_read(&self, notification_id: Uuid, was_unread: bool) -> ClientResult<()> {
        if was_unread {
            self.shared.update(count_down);
        }

        let result = self.shared.api.mark_read(notification_id).await;
        self.finish(result.map(|r| r.updated > 0), was_unread).await
    }

    pub async fn mark_all_as_read(&self) -> ClientResult<()> {
        self.shared.update(|unread| unread.begin(0));

        let result = self.shared.api.mark_all_read().await;
        self.finish(result.map(|_| true), true).await
    }

    /// Removes a notification; the badge drops only if it was still unread.
    pub async fn delete(&self, notification_id: Uuid, was_unread: bool) -> ClientResult<()> {
        if was_unread {
            self.shared.update(count_down);
        }

        let result = self.shared.api.delete_notification(notification_id).await;
        self.finish(result.map(|d| d.was_unread), was_unread).await
    }

    async fn finish(&self, result: ClientResult<bool>, began: bool) -> ClientResult<()> {
        match result {
            Ok(true) => {
                self.shared.update(|unread| {
                    if !began {
                        count_down(unread);
                    }
                    unread.settle();
                });
                self.shared.bus.publish(SyncSignal::NotificationsChanged);
                Ok(())
            }
            Ok(false) => {
                self.shared.update(Optimistic::rollback);
                self.shared.poll().await;
                Ok(())
            }
            Err(e) => {
                self.shared.update(Optimistic::rollback);
                tracing::warn!(error = %e, "notification update rolled back");
                Err(e)
            }
        }
    }
}

fn count_down(unread: &mut Optimistic<u64>) {
    let next = unread.current().saturating_sub(1);
    unread.begin(next);
}

impl Drop for NotificationIndicator {
    fn drop(&mut self) {
        self.task.abort();
    }
}
