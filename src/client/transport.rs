use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    client::{
        api::{ClientResult, EngagementApi, NotificationApi, ReportApi},
        error::ClientError,
        session::Session,
    },
    config::ClientConfig,
    models::{
        BookmarkState, DeletedNotification, EngagementAggregate, ItemRef, MarkReadResult,
        ModerationAction, Notification, Report, ReportDetails, ReportFilter, ReportStats,
        ReportType, SubmitReportRequest, UnreadCount, VoteDirection, VoteRequest,
    },
};

#[derive(Deserialize)]
struct ReportPage {
    reports: Vec<Report>,
}

#[derive(Deserialize)]
struct NotificationPage {
    notifications: Vec<Notification>,
}

#[derive(Deserialize)]
struct BookmarkList {
    post_ids: Vec<Uuid>,
}

/// JSON-over-HTTP client for the `/api/v1` surface. Every request carries
/// the session's bearer token and is bounded by the configured timeout; a
/// 401 invalidates the session.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> ClientResult<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ClientError::from_response(status, &body);
        if err == ClientError::Unauthenticated {
            self.session.invalidate();
        }
        tracing::debug!(%status, error = %err, "request failed");
        Err(err)
    }

    /// Revokes the server session and forgets the local one.
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self
            .send::<Value>(self.http.post(self.url("/auth/logout")))
            .await;
        self.session.sign_out();
        result.map(|_| ())
    }
}

#[async_trait]
impl ReportApi for ApiClient {
    async fn submit_report(&self, request: &SubmitReportRequest) -> ClientResult<Report> {
        self.send(self.http.post(self.url("/reports")).json(request))
            .await
    }

    async fn my_reports(&self, skip: u32, limit: u32) -> ClientResult<Vec<Report>> {
        let page: ReportPage = self
            .send(
                self.http
                    .get(self.url("/reports/my-reports"))
                    .query(&[("skip", skip), ("limit", limit)]),
            )
            .await?;
        Ok(page.reports)
    }

    async fn get_report(&self, report_id: Uuid) -> ClientResult<Report> {
        self.send(self.http.get(self.url(&format!("/reports/{report_id}"))))
            .await
    }

    async fn list_reports(&self, filter: &ReportFilter) -> ClientResult<Vec<Report>> {
        let mut query = vec![
            ("skip", filter.skip.to_string()),
            ("limit", filter.limit.to_string()),
        ];
        if let Some(status) = filter.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(report_type) = filter.report_type {
            query.push(("report_type", report_type.as_str().to_string()));
        }

        let page: ReportPage = self
            .send(self.http.get(self.url("/reports")).query(&query))
            .await?;
        Ok(page.reports)
    }

    async fn report_stats(&self) -> ClientResult<ReportStats> {
        self.send(self.http.get(self.url("/reports/stats"))).await
    }

    async fn report_details(&self, report_id: Uuid) -> ClientResult<ReportDetails> {
        self.send(self.http.get(self.url(&format!("/reports/{report_id}/details"))))
            .await
    }

    async fn target_reports(
        &self,
        report_type: ReportType,
        target_id: Uuid,
        skip: u32,
        limit: u32,
    ) -> ClientResult<Vec<Report>> {
        let path = format!("/reports/target/{}/{target_id}", report_type.as_str());
        let page: ReportPage = self
            .send(
                self.http
                    .get(self.url(&path))
                    .query(&[("skip", skip), ("limit", limit)]),
            )
            .await?;
        Ok(page.reports)
    }

    async fn process_report(
        &self,
        report_id: Uuid,
        action: ModerationAction,
        reason: &str,
    ) -> ClientResult<Report> {
        self.send(
            self.http
                .post(self.url(&format!("/reports/{report_id}/process")))
                .json(&json!({ "action": action, "reason": reason })),
        )
        .await
    }

    async fn dismiss_report(&self, report_id: Uuid, reason: &str) -> ClientResult<Report> {
        self.send(
            self.http
                .post(self.url(&format!("/reports/{report_id}/dismiss")))
                .json(&json!({ "reason": reason })),
        )
        .await
    }
}

#[async_trait]
impl EngagementApi for ApiClient {
    async fn cast_vote(
        &self,
        item: ItemRef,
        direction: VoteDirection,
    ) -> ClientResult<EngagementAggregate> {
        let body = VoteRequest {
            item_id: item.id,
            direction: direction.as_flag(),
        };
        self.send(
            self.http
                .post(self.url(&format!("/votes/{}", item.kind.route_segment())))
                .json(&body),
        )
        .await
    }

    async fn aggregate(&self, item: ItemRef) -> ClientResult<EngagementAggregate> {
        self.send(self.http.get(self.url(&format!(
            "/votes/{}/{}",
            item.kind.route_segment(),
            item.id
        ))))
        .await
    }

    async fn add_bookmark(&self, post_id: Uuid) -> ClientResult<BookmarkState> {
        self.send(self.http.post(self.url(&format!("/bookmarks/{post_id}"))))
            .await
    }

    async fn remove_bookmark(&self, post_id: Uuid) -> ClientResult<BookmarkState> {
        self.send(self.http.delete(self.url(&format!("/bookmarks/{post_id}"))))
            .await
    }

    async fn bookmarks(&self) -> ClientResult<Vec<Uuid>> {
        let list: BookmarkList = self.send(self.http.get(self.url("/bookmarks"))).await?;
        Ok(list.post_ids)
    }
}

#[async_trait]
impl NotificationApi for ApiClient {
    async fn notifications(
        &self,
        skip: u32,
        limit: u32,
        unread_only: bool,
    ) -> ClientResult<Vec<Notification>> {
        let page: NotificationPage = self
            .send(self.http.get(self.url("/notifications")).query(&[
                ("skip", skip.to_string()),
                ("limit", limit.to_string()),
                ("unread_only", unread_only.to_string()),
            ]))
            .await?;
        Ok(page.notifications)
    }

    async fn unread_count(&self) -> ClientResult<u64> {
        let count: UnreadCount = self
            .send(self.http.get(self.url("/notifications/unread-count")))
            .await?;
        Ok(count.count)
    }

    async fn mark_read(&self, notification_id: Uuid) -> ClientResult<MarkReadResult> {
        self.send(
            self.http
                .post(self.url(&format!("/notifications/{notification_id}/mark-read"))),
        )
        .await
    }

    async fn mark_all_read(&self) -> ClientResult<MarkReadResult> {
        self.send(self.http.post(self.url("/notifications/mark-all-read")))
            .await
    }

    async fn delete_notification(&self, notification_id: Uuid) -> ClientResult<DeletedNotification> {
        self.send(
            self.http
                .delete(self.url(&format!("/notifications/{notification_id}"))),
        )
        .await
    }
}
