use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        BookmarkState, ContentKind, ContentRecord, EngagementAggregate, ItemKind, ItemRef,
        VoteDirection,
    },
    stores::{BookmarkStore, ContentStore, EngagementStore},
};

#[derive(Clone)]
pub struct EngagementService {
    engagement: Arc<dyn EngagementStore>,
    bookmarks: Arc<dyn BookmarkStore>,
    content: Arc<dyn ContentStore>,
}

impl EngagementService {
    pub fn new(
        engagement: Arc<dyn EngagementStore>,
        bookmarks: Arc<dyn BookmarkStore>,
        content: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            engagement,
            bookmarks,
            content,
        }
    }

    /// Returns the aggregate after the vote; callers replace their copy with it.
    pub async fn cast_vote(
        &self,
        user_id: Uuid,
        item: ItemRef,
        direction: VoteDirection,
    ) -> Result<EngagementAggregate> {
        let record = self.item(item).await?;
        if record.author_id == user_id {
            return Err(AppError::Authorization(format!(
                "You cannot vote on your own {}",
                item.kind.as_str()
            )));
        }

        let aggregate = self.engagement.cast_vote(item, user_id, direction).await?;
        tracing::debug!(
            item_id = %item.id,
            kind = item.kind.as_str(),
            score = aggregate.score,
            "vote cast"
        );
        Ok(aggregate)
    }

    pub async fn aggregate(&self, item: ItemRef) -> Result<EngagementAggregate> {
        self.item(item).await?;
        self.engagement.aggregate(item).await
    }

    pub async fn toggle_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<BookmarkState> {
        self.post(post_id).await?;
        let bookmarked = self.bookmarks.toggle_bookmark(user_id, post_id).await?;
        Ok(BookmarkState {
            post_id,
            bookmarked,
        })
    }

    pub async fn add_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<BookmarkState> {
        self.post(post_id).await?;
        self.bookmarks.add_bookmark(user_id, post_id).await?;
        Ok(BookmarkState {
            post_id,
            bookmarked: true,
        })
    }

    /// Removing works even after the post is gone.
    pub async fn remove_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<BookmarkState> {
        self.bookmarks.remove_bookmark(user_id, post_id).await?;
        Ok(BookmarkState {
            post_id,
            bookmarked: false,
        })
    }

    pub async fn bookmarked_posts(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        self.bookmarks.bookmarked_posts(user_id).await
    }

    async fn item(&self, item: ItemRef) -> Result<ContentRecord> {
        self.content
            .find_content(ContentKind::from(item.kind), item.id)
            .await?
            .ok_or_else(|| match item.kind {
                ItemKind::Post => AppError::NotFound("Post not found".to_string()),
                ItemKind::Answer => AppError::NotFound("Answer not found".to_string()),
            })
    }

    async fn post(&self, post_id: Uuid) -> Result<ContentRecord> {
        self.item(ItemRef::post(post_id)).await
    }
}
