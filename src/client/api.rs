//! Calls the client components make against the server. [`ApiClient`]
//! implements all of them over HTTP; tests substitute in-process fakes.
//!
//! [`ApiClient`]: crate::client::transport::ApiClient

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    client::error::ClientError,
    models::{
        BookmarkState, DeletedNotification, EngagementAggregate, ItemRef, MarkReadResult,
        ModerationAction, Notification, Report, ReportDetails, ReportFilter, ReportStats,
        ReportType, SubmitReportRequest, VoteDirection,
    },
};

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[async_trait]
pub trait ReportApi: Send + Sync {
    async fn submit_report(&self, request: &SubmitReportRequest) -> ClientResult<Report>;
    async fn my_reports(&self, skip: u32, limit: u32) -> ClientResult<Vec<Report>>;
    async fn get_report(&self, report_id: Uuid) -> ClientResult<Report>;
    async fn list_reports(&self, filter: &ReportFilter) -> ClientResult<Vec<Report>>;
    async fn report_stats(&self) -> ClientResult<ReportStats>;
    async fn report_details(&self, report_id: Uuid) -> ClientResult<ReportDetails>;
    async fn target_reports(
        &self,
        report_type: ReportType,
        target_id: Uuid,
        skip: u32,
        limit: u32,
    ) -> ClientResult<Vec<Report>>;
    async fn process_report(
        &self,
        report_id: Uuid,
        action: ModerationAction,
        reason: &str,
    ) -> ClientResult<Report>;
    async fn dismiss_report(&self, report_id: Uuid, reason: &str) -> ClientResult<Report>;
}

#[async_trait]
pub trait EngagementApi: Send + Sync {
    async fn cast_vote(
        &self,
        item: ItemRef,
        direction: VoteDirection,
    ) -> ClientResult<EngagementAggregate>;
    async fn aggregate(&self, item: ItemRef) -> ClientResult<EngagementAggregate>;
    async fn add_bookmark(&self, post_id: Uuid) -> ClientResult<BookmarkState>;
    async fn remove_bookmark(&self, post_id: Uuid) -> ClientResult<BookmarkState>;
    async fn bookmarks(&self) -> ClientResult<Vec<Uuid>>;
}

#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn notifications(
        &self,
        skip: u32,
        limit: u32,
        unread_only: bool,
    ) -> ClientResult<Vec<Notification>>;
    async fn unread_count(&self) -> ClientResult<u64>;
    async fn mark_read(&self, notification_id: Uuid) -> ClientResult<MarkReadResult>;
    async fn mark_all_read(&self) -> ClientResult<MarkReadResult>;
    async fn delete_notification(&self, notification_id: Uuid) -> ClientResult<DeletedNotification>;
}
