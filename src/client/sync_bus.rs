use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 32;

/// Mutations that may change somebody's unread count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSignal {
    AnswerCreated { post_id: Uuid },
    CommentCreated { answer_id: Uuid },
    NotificationsChanged,
}

/// In-process fan-out of [`SyncSignal`]s for one client session. Handed to
/// each surface that publishes or listens; there is no global instance.
#[derive(Debug, Clone)]
pub struct NotificationSyncBus {
    sender: broadcast::Sender<SyncSignal>,
}

impl Default for NotificationSyncBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationSyncBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers will see the signal.
    pub fn publish(&self, signal: SyncSignal) -> usize {
        tracing::trace!(?signal, "sync signal published");
        self.sender.send(signal).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncSignal> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
