//! Persistence seams for the moderation and engagement core.
//!
//! Every trait is implemented twice: by [`postgres::PgStore`] for deployed
//! instances and by [`memory::MemoryStore`] for tests and database-less runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::Result,
    models::{
        Account, ContentKind, ContentRecord, EngagementAggregate, ItemRef, ModerationEffect,
        Notification, Report, ReportFilter, ReportStats, ReportStatus, ReportType, Resolution,
        VoteDirection,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert_report(&self, report: &Report) -> Result<()>;
    async fn find_report(&self, id: Uuid) -> Result<Option<Report>>;
    async fn has_pending_report(
        &self,
        reporter_id: Uuid,
        report_type: ReportType,
        target_id: Uuid,
    ) -> Result<bool>;
    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>>;
    async fn report_stats(&self) -> Result<ReportStats>;

    /// Applies `effect` and moves a pending report to `status` as one unit.
    /// If the effect or the write fails, nothing is changed. Exactly one of
    /// several concurrent callers succeeds; the rest get
    /// `AppError::AlreadyResolved`.
    async fn resolve_report(
        &self,
        id: Uuid,
        effect: &ModerationEffect,
        status: ReportStatus,
        resolution: &Resolution,
    ) -> Result<Report>;
}

#[async_trait]
pub trait EngagementStore: Send + Sync {
    async fn cast_vote(
        &self,
        item: ItemRef,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> Result<EngagementAggregate>;
    async fn aggregate(&self, item: ItemRef) -> Result<EngagementAggregate>;
}

#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Returns the membership after the toggle.
    async fn toggle_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;
    async fn add_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<()>;
    async fn remove_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<()>;
    async fn bookmarked_posts(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;
    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        skip: u32,
        limit: u32,
        unread_only: bool,
    ) -> Result<Vec<Notification>>;
    async fn unread_count(&self, recipient_id: Uuid) -> Result<u64>;
    /// `NotFound` when the notification does not belong to `recipient_id`.
    /// Returns whether the flag actually flipped.
    async fn mark_read(&self, recipient_id: Uuid, notification_id: Uuid) -> Result<bool>;
    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64>;
    /// `NotFound` when the notification does not belong to `recipient_id`.
    /// Returns whether the deleted notification was still unread.
    async fn delete_notification(&self, recipient_id: Uuid, notification_id: Uuid)
    -> Result<bool>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find_content(&self, kind: ContentKind, id: Uuid) -> Result<Option<ContentRecord>>;
    /// Removes the post with its answers, comments, votes and bookmarks.
    async fn delete_post(&self, id: Uuid, reason: Option<&str>) -> Result<()>;
    async fn delete_answer(&self, id: Uuid, reason: Option<&str>) -> Result<()>;
    async fn delete_comment(&self, answer_id: Uuid, comment_id: Uuid, reason: Option<&str>)
    -> Result<()>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>>;
    /// `None` suspends indefinitely.
    async fn suspend(&self, user_id: Uuid, until: Option<DateTime<Utc>>) -> Result<Account>;
}

pub trait Store:
    ReportStore + EngagementStore + BookmarkStore + NotificationStore + ContentStore + AccountStore
{
}

impl<T> Store for T where
    T: ReportStore
        + EngagementStore
        + BookmarkStore
        + NotificationStore
        + ContentStore
        + AccountStore
{
}
