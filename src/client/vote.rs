use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::{
    client::{
        api::{ClientResult, EngagementApi},
        error::ClientError,
        optimistic::{BusyFlag, Optimistic},
        session::Session,
    },
    models::{EngagementAggregate, ItemRef, VoteDirection},
};

/// Up/down voting on one rendering of a post or answer. Two renderings of
/// the same item each get their own control and converge through the
/// server aggregate.
pub struct VoteControl {
    api: Arc<dyn EngagementApi>,
    session: Arc<Session>,
    item: ItemRef,
    author_id: Uuid,
    state: Mutex<Optimistic<EngagementAggregate>>,
    busy: BusyFlag,
}

impl VoteControl {
    pub fn new(
        api: Arc<dyn EngagementApi>,
        session: Arc<Session>,
        item: ItemRef,
        author_id: Uuid,
        initial: EngagementAggregate,
    ) -> Self {
        Self {
            api,
            session,
            item,
            author_id,
            state: Mutex::new(Optimistic::new(initial)),
            busy: BusyFlag::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, Optimistic<EngagementAggregate>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn item(&self) -> ItemRef {
        self.item
    }

    /// Signed-out viewers and the item's author cannot vote.
    pub fn is_enabled(&self) -> bool {
        self.session
            .user_id()
            .is_some_and(|user_id| user_id != self.author_id)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn aggregate(&self) -> EngagementAggregate {
        self.state().current().clone()
    }

    pub fn viewer_vote(&self) -> Option<VoteDirection> {
        let viewer = self.session.user_id()?;
        self.state().current().vote_of(viewer)
    }

    pub async fn cast(&self, direction: VoteDirection) -> ClientResult<EngagementAggregate> {
        let viewer = match self.session.user_id() {
            Some(viewer) if viewer != self.author_id => viewer,
            _ => return Err(ClientError::Disabled),
        };
        let _guard = self.busy.try_acquire().ok_or(ClientError::Busy)?;

        {
            let mut state = self.state();
            let mut next = state.current().clone();
            next.cast(viewer, direction);
            state.begin(next);
        }

        match self.api.cast_vote(self.item, direction).await {
            Ok(aggregate) => {
                self.state().confirm(aggregate.clone());
                Ok(aggregate)
            }
            Err(e) => {
                self.state().rollback();
                tracing::warn!(item_id = %self.item.id, error = %e, "vote rolled back");
                Err(e)
            }
        }
    }

    /// Replaces the confirmed aggregate with the server's current one.
    pub async fn refresh(&self) -> ClientResult<EngagementAggregate> {
        let aggregate = self.api.aggregate(self.item).await?;
        self.state().refresh(aggregate.clone());
        Ok(aggregate)
    }
}
