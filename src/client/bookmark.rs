use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

use crate::client::{
    api::{ClientResult, EngagementApi},
    error::ClientError,
    optimistic::{BusyFlag, Optimistic},
    session::Session,
};

/// Bookmarked post ids as last reported by the server, shared by every
/// bookmark control in the session.
#[derive(Debug, Default)]
pub struct BookmarkCache {
    posts: Mutex<BTreeSet<Uuid>>,
}

impl BookmarkCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn posts(&self) -> MutexGuard<'_, BTreeSet<Uuid>> {
        self.posts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, post_id: Uuid) -> bool {
        self.posts().contains(&post_id)
    }

    pub fn set(&self, post_id: Uuid, bookmarked: bool) {
        let mut posts = self.posts();
        if bookmarked {
            posts.insert(post_id);
        } else {
            posts.remove(&post_id);
        }
    }

    pub fn snapshot(&self) -> BTreeSet<Uuid> {
        self.posts().clone()
    }

    pub async fn reload(&self, api: &dyn EngagementApi) -> ClientResult<()> {
        let ids = api.bookmarks().await?;
        *self.posts() = ids.into_iter().collect();
        Ok(())
    }
}

pub struct BookmarkControl {
    api: Arc<dyn EngagementApi>,
    session: Arc<Session>,
    cache: Arc<BookmarkCache>,
    post_id: Uuid,
    state: Mutex<Optimistic<bool>>,
    busy: BusyFlag,
}

impl BookmarkControl {
    pub fn new(
        api: Arc<dyn EngagementApi>,
        session: Arc<Session>,
        cache: Arc<BookmarkCache>,
        post_id: Uuid,
    ) -> Self {
        let bookmarked = cache.contains(post_id);
        Self {
            api,
            session,
            cache,
            post_id,
            state: Mutex::new(Optimistic::new(bookmarked)),
            busy: BusyFlag::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, Optimistic<bool>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_enabled(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn is_bookmarked(&self) -> bool {
        *self.state().current()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Flips membership, returning what the server settled on.
    pub async fn toggle(&self) -> ClientResult<bool> {
        if !self.session.is_authenticated() {
            return Err(ClientError::Disabled);
        }
        let _guard = self.busy.try_acquire().ok_or(ClientError::Busy)?;

        let desired = {
            let mut state = self.state();
            let desired = !*state.current();
            state.begin(desired);
            desired
        };

        let result = if desired {
            self.api.add_bookmark(self.post_id).await
        } else {
            self.api.remove_bookmark(self.post_id).await
        };

        match result {
            Ok(bookmark) => {
                self.state().confirm(bookmark.bookmarked);
                self.cache.set(self.post_id, bookmark.bookmarked);
                Ok(bookmark.bookmarked)
            }
            Err(e) => {
                self.state().rollback();
                tracing::warn!(post_id = %self.post_id, error = %e, "bookmark rolled back");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::FakeBackend;
    use crate::models::{ContentRecord, UserRole};

    fn post(backend: &FakeBackend) -> Uuid {
        let post = ContentRecord::post(Uuid::new_v4());
        backend.store.insert_content(post.clone()).unwrap();
        post.id
    }

    #[tokio::test]
    async fn double_toggle_restores_the_cache() {
        let backend = FakeBackend::new();
        let session = Arc::new(Session::signed_in(backend.user, UserRole::User, "t"));
        let cache = Arc::new(BookmarkCache::new());
        let kept = post(&backend);
        let flipped = post(&backend);

        BookmarkControl::new(backend.clone(), session.clone(), cache.clone(), kept)
            .toggle()
            .await
            .unwrap();
        let before = cache.snapshot();

        let control = BookmarkControl::new(backend.clone(), session, cache.clone(), flipped);
        assert!(control.toggle().await.unwrap());
        assert!(cache.contains(flipped));
        assert!(!control.toggle().await.unwrap());
        assert_eq!(cache.snapshot(), before);

        cache.reload(&*backend).await.unwrap();
        assert_eq!(cache.snapshot(), before);
    }

    #[tokio::test]
    async fn failure_rolls_back_without_touching_the_cache() {
        let backend = FakeBackend::new();
        let session = Arc::new(Session::signed_in(backend.user, UserRole::User, "t"));
        let cache = Arc::new(BookmarkCache::new());
        let control = BookmarkControl::new(backend.clone(), session, cache.clone(), post(&backend));

        backend.fail_next(ClientError::Network("connection reset".to_string()));
        assert!(matches!(control.toggle().await, Err(ClientError::Network(_))));
        assert!(!control.is_bookmarked());
        assert!(cache.snapshot().is_empty());
    }

    #[tokio::test]
    async fn signed_out_viewers_cannot_bookmark() {
        let backend = FakeBackend::new();
        let control = BookmarkControl::new(
            backend.clone(),
            Arc::new(Session::new()),
            Arc::new(BookmarkCache::new()),
            post(&backend),
        );
        assert!(!control.is_enabled());
        assert_eq!(control.toggle().await.unwrap_err(), ClientError::Disabled);
        assert_eq!(backend.calls(), 0);
    }
}
