//! In-process stand-in for the HTTP API, backed by the real services over a
//! [`MemoryStore`], with knobs for latency and injected failures.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    client::{
        api::{ClientResult, EngagementApi, NotificationApi, ReportApi},
        error::ClientError,
    },
    error::AppError,
    models::{
        Account, BookmarkState, DeletedNotification, EngagementAggregate, ItemRef, MarkReadResult,
        ModerationAction, Notification, Report, ReportDetails, ReportFilter, ReportStats,
        ReportType, SubmitReportRequest, UserRole, VoteDirection,
    },
    services::{
        engagement_service::EngagementService, notification_service::NotificationService,
        report_service::ReportService,
    },
    stores::MemoryStore,
};

pub(crate) struct FakeBackend {
    pub store: Arc<MemoryStore>,
    /// The account every call is made as.
    pub user: Uuid,
    is_admin: bool,
    pub engagement: EngagementService,
    pub reports: ReportService,
    pub notifications: NotificationService,
    failure: Mutex<Option<ClientError>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Self::with_role(UserRole::User)
    }

    pub fn admin() -> Arc<Self> {
        Self::with_role(UserRole::Admin)
    }

    fn with_role(role: UserRole) -> Arc<Self> {
        let store = Arc::new(MemoryStore::new());
        let account = Account::new("viewer", role);
        store.insert_account(account.clone()).unwrap();

        let notifications = NotificationService::new(store.clone());
        Arc::new(Self {
            user: account.id,
            is_admin: role == UserRole::Admin,
            engagement: EngagementService::new(store.clone(), store.clone(), store.clone()),
            reports: ReportService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                notifications.clone(),
            ),
            notifications,
            store,
            failure: Mutex::new(None),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// The next call fails with `error` without reaching the services.
    pub fn fail_next(&self, error: ClientError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> ClientResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn to_client(e: AppError) -> ClientError {
    match e {
        AppError::InvalidReport(v) => ClientError::Validation(v),
        AppError::AlreadyResolved => ClientError::AlreadyResolved,
        AppError::Authentication(_) | AppError::Jwt(_) => ClientError::Unauthenticated,
        AppError::Authorization(m) => ClientError::Forbidden(m),
        AppError::Suspended => ClientError::Forbidden("Account is suspended".to_string()),
        AppError::NotFound(m) => ClientError::NotFound(m),
        AppError::DuplicateReport => ClientError::Conflict("You have already reported this".to_string()),
        AppError::RateLimit => ClientError::RateLimited,
        AppError::BadRequest(m) | AppError::Validation(m) => ClientError::BadRequest(m),
        other => ClientError::Server(other.to_string()),
    }
}

#[async_trait]
impl EngagementApi for FakeBackend {
    async fn cast_vote(
        &self,
        item: ItemRef,
        direction: VoteDirection,
    ) -> ClientResult<EngagementAggregate> {
        self.enter().await?;
        self.engagement
            .cast_vote(self.user, item, direction)
            .await
            .map_err(to_client)
    }

    async fn aggregate(&self, item: ItemRef) -> ClientResult<EngagementAggregate> {
        self.enter().await?;
        self.engagement.aggregate(item).await.map_err(to_client)
    }

    async fn add_bookmark(&self, post_id: Uuid) -> ClientResult<BookmarkState> {
        self.enter().await?;
        self.engagement
            .add_bookmark(self.user, post_id)
            .await
            .map_err(to_client)
    }

    async fn remove_bookmark(&self, post_id: Uuid) -> ClientResult<BookmarkState> {
        self.enter().await?;
        self.engagement
            .remove_bookmark(self.user, post_id)
            .await
            .map_err(to_client)
    }

    async fn bookmarks(&self) -> ClientResult<Vec<Uuid>> {
        self.enter().await?;
        self.engagement
            .bookmarked_posts(self.user)
            .await
            .map_err(to_client)
    }
}

#[async_trait]
impl NotificationApi for FakeBackend {
    async fn notifications(
        &self,
        skip: u32,
        limit: u32,
        unread_only: bool,
    ) -> ClientResult<Vec<Notification>> {
        self.enter().await?;
        self.notifications
            .get_user_notifications(self.user, skip, limit, unread_only)
            .await
            .map_err(to_client)
    }

    async fn unread_count(&self) -> ClientResult<u64> {
        self.enter().await?;
        self.notifications
            .get_unread_count(self.user)
            .await
            .map(|c| c.count)
            .map_err(to_client)
    }

    async fn mark_read(&self, notification_id: Uuid) -> ClientResult<MarkReadResult> {
        self.enter().await?;
        self.notifications
            .mark_as_read(self.user, notification_id)
            .await
            .map_err(to_client)
    }

    async fn mark_all_read(&self) -> ClientResult<MarkReadResult> {
        self.enter().await?;
        self.notifications
            .mark_all_as_read(self.user)
            .await
            .map_err(to_client)
    }

    async fn delete_notification(&self, notification_id: Uuid) -> ClientResult<DeletedNotification> {
        self.enter().await?;
        self.notifications
            .delete_notification(self.user, notification_id)
            .await
            .map_err(to_client)
    }
}

#[async_trait]
impl ReportApi for FakeBackend {
    async fn submit_report(&self, request: &SubmitReportRequest) -> ClientResult<Report> {
        self.enter().await?;
        self.reports
            .submit(self.user, request)
            .await
            .map_err(to_client)
    }

    async fn my_reports(&self, skip: u32, limit: u32) -> ClientResult<Vec<Report>> {
        self.enter().await?;
        self.reports
            .my_reports(self.user, skip, limit)
            .await
            .map_err(to_client)
    }

    async fn get_report(&self, report_id: Uuid) -> ClientResult<Report> {
        self.enter().await?;
        self.reports
            .get(report_id, self.user, self.is_admin)
            .await
            .map_err(to_client)
    }

    async fn list_reports(&self, filter: &ReportFilter) -> ClientResult<Vec<Report>> {
        self.enter().await?;
        self.reports.list(filter).await.map_err(to_client)
    }

    async fn report_stats(&self) -> ClientResult<ReportStats> {
        self.enter().await?;
        self.reports.stats().await.map_err(to_client)
    }

    async fn report_details(&self, report_id: Uuid) -> ClientResult<ReportDetails> {
        self.enter().await?;
        self.reports.details(report_id).await.map_err(to_client)
    }

    async fn target_reports(
        &self,
        report_type: ReportType,
        target_id: Uuid,
        skip: u32,
        limit: u32,
    ) -> ClientResult<Vec<Report>> {
        self.enter().await?;
        self.reports
            .target_reports(report_type, target_id, skip, limit)
            .await
            .map_err(to_client)
    }

    async fn process_report(
        &self,
        report_id: Uuid,
        action: ModerationAction,
        reason: &str,
    ) -> ClientResult<Report> {
        self.enter().await?;
        self.reports
            .resolve(report_id, self.user, action, reason)
            .await
            .map_err(to_client)
    }

    async fn dismiss_report(&self, report_id: Uuid, reason: &str) -> ClientResult<Report> {
        self.enter().await?;
        self.reports
            .dismiss(report_id, self.user, reason)
            .await
            .map_err(to_client)
    }
}
