use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        AccountSummary, ContentKind, ModerationAction, ModerationEffect, Report, ReportDetails,
        ReportFilter, ReportStats, ReportStatus, ReportType, Resolution, SubmitReportRequest,
        TargetSummary,
    },
    services::notification_service::NotificationService,
    stores::{AccountStore, ContentStore, ReportStore},
};

#[derive(Clone)]
pub struct ReportService {
    reports: Arc<dyn ReportStore>,
    content: Arc<dyn ContentStore>,
    accounts: Arc<dyn AccountStore>,
    notifications: NotificationService,
}

impl ReportService {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        content: Arc<dyn ContentStore>,
        accounts: Arc<dyn AccountStore>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            reports,
            content,
            accounts,
            notifications,
        }
    }

    pub async fn submit(&self, reporter_id: Uuid, request: &SubmitReportRequest) -> Result<Report> {
        let submission = request.validate_submission()?;

        let owner = self
            .target_owner(submission.report_type, submission.target_id)
            .await?;
        if owner == reporter_id {
            return Err(AppError::BadRequest(
                "You cannot report yourself or your own content".to_string(),
            ));
        }

        if self
            .reports
            .has_pending_report(reporter_id, submission.report_type, submission.target_id)
            .await?
        {
            return Err(AppError::DuplicateReport);
        }

        let report = Report::new_pending(reporter_id, submission);
        self.reports.insert_report(&report).await?;

        tracing::info!(
            report_id = %report.id,
            report_type = report.report_type.as_str(),
            target_id = %report.target_id,
            "report submitted"
        );
        Ok(report)
    }

    /// Applies `action` to a pending report. The side effect and the status
    /// change land together or not at all.
    pub async fn resolve(
        &self,
        report_id: Uuid,
        admin_id: Uuid,
        action: ModerationAction,
        reason: &str,
    ) -> Result<Report> {
        let report = self.find(report_id).await?;
        if !report.is_pending() {
            return Err(AppError::AlreadyResolved);
        }

        let effect = self.plan(&report, action).await?;
        let resolution = Resolution {
            action_taken: action,
            notes: reason.to_string(),
            resolved_at: Utc::now(),
            resolved_by: admin_id,
        };
        let resolved = self
            .reports
            .resolve_report(report_id, &effect, action.resulting_status(), &resolution)
            .await
            .inspect_err(|e| {
                if !matches!(e, AppError::AlreadyResolved) {
                    tracing::warn!(
                        %report_id,
                        action = action.as_str(),
                        error = %e,
                        "moderation action failed"
                    );
                }
            })?;

        tracing::info!(
            %report_id,
            %admin_id,
            action = action.as_str(),
            "report resolved"
        );
        self.notify_reporter(&resolved).await;
        Ok(resolved)
    }

    /// Rejects a pending report without touching its target.
    pub async fn dismiss(&self, report_id: Uuid, admin_id: Uuid, reason: &str) -> Result<Report> {
        let resolution = Resolution {
            action_taken: ModerationAction::NoAction,
            notes: reason.to_string(),
            resolved_at: Utc::now(),
            resolved_by: admin_id,
        };
        let dismissed = self
            .reports
            .resolve_report(
                report_id,
                &ModerationEffect::Nothing,
                ReportStatus::Dismissed,
                &resolution,
            )
            .await?;

        tracing::info!(%report_id, %admin_id, "report dismissed");
        self.notify_reporter(&dismissed).await;
        Ok(dismissed)
    }

    /// Reporters see their own reports; admins see every report.
    pub async fn get(&self, report_id: Uuid, viewer_id: Uuid, is_admin: bool) -> Result<Report> {
        let report = self.find(report_id).await?;
        if !is_admin && report.reporter_id != viewer_id {
            return Err(AppError::Authorization(
                "You can only view your own reports".to_string(),
            ));
        }
        Ok(report)
    }

    pub async fn my_reports(&self, reporter_id: Uuid, skip: u32, limit: u32) -> Result<Vec<Report>> {
        let filter = ReportFilter {
            reporter_id: Some(reporter_id),
            skip,
            limit,
            ..ReportFilter::default()
        };
        self.reports.list_reports(&filter).await
    }

    pub async fn list(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        self.reports.list_reports(filter).await
    }

    pub async fn stats(&self) -> Result<ReportStats> {
        self.reports.report_stats().await
    }

    /// Every report against one target, newest first.
    pub async fn target_reports(
        &self,
        report_type: ReportType,
        target_id: Uuid,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Report>> {
        let filter = ReportFilter {
            report_type: Some(report_type),
            target_id: Some(target_id),
            skip,
            limit,
            ..ReportFilter::default()
        };
        self.reports.list_reports(&filter).await
    }

    /// The report with its reporter and target looked up for review.
    pub async fn details(&self, report_id: Uuid) -> Result<ReportDetails> {
        let report = self.find(report_id).await?;
        let now = Utc::now();

        let reporter = self
            .accounts
            .find_account(report.reporter_id)
            .await?
            .map(|account| AccountSummary::of(&account, now));

        let target = match ContentKind::for_report(report.report_type) {
            Some(kind) => match self.content.find_content(kind, report.target_id).await? {
                Some(record) => {
                    let author = self
                        .accounts
                        .find_account(record.author_id)
                        .await?
                        .map(|account| AccountSummary::of(&account, now));
                    Some(TargetSummary::Content {
                        kind,
                        id: record.id,
                        parent_id: record.parent_id,
                        created_at: record.created_at,
                        author,
                    })
                }
                None => None,
            },
            None => self
                .accounts
                .find_account(report.target_id)
                .await?
                .map(|account| TargetSummary::User {
                    account: AccountSummary::of(&account, now),
                }),
        };

        Ok(ReportDetails {
            report,
            reporter,
            target,
        })
    }

    async fn find(&self, report_id: Uuid) -> Result<Report> {
        self.reports
            .find_report(report_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Report not found".to_string()))
    }

    async fn target_owner(&self, report_type: ReportType, target_id: Uuid) -> Result<Uuid> {
        match ContentKind::for_report(report_type) {
            Some(kind) => self
                .content
                .find_content(kind, target_id)
                .await?
                .map(|record| record.author_id)
                .ok_or_else(|| AppError::NotFound(format!("{} not found", kind.label()))),
            None => self
                .accounts
                .find_account(target_id)
                .await?
                .map(|account| account.id)
                .ok_or_else(|| AppError::NotFound("User not found".to_string())),
        }
    }

    /// Works out the side effect up front, so an inapplicable action is
    /// refused before anything is written.
    async fn plan(&self, report: &Report, action: ModerationAction) -> Result<ModerationEffect> {
        if let Some(days) = action.suspension_days() {
            let user_id = self.target_owner(report.report_type, report.target_id).await?;
            let until = days.map(|days| suspension_end(Utc::now(), days));
            return Ok(ModerationEffect::Suspend { user_id, until });
        }

        match (action, report.report_type) {
            (ModerationAction::NoAction, _) => Ok(ModerationEffect::Nothing),
            (ModerationAction::DeletePost, ReportType::Post) => {
                Ok(ModerationEffect::DeletePost(report.target_id))
            }
            (ModerationAction::DeletePost, ReportType::Answer) => {
                Ok(ModerationEffect::DeleteAnswer(report.target_id))
            }
            (ModerationAction::DeletePost, ReportType::Comment) => {
                let comment = self
                    .content
                    .find_content(ContentKind::Comment, report.target_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
                let answer_id = comment.parent_id.ok_or_else(|| {
                    AppError::Internal(format!("comment {} has no parent answer", comment.id))
                })?;
                Ok(ModerationEffect::DeleteComment {
                    answer_id,
                    comment_id: comment.id,
                })
            }
            (ModerationAction::DeletePost, ReportType::User) => Err(AppError::BadRequest(
                "delete_post cannot be applied to a user report".to_string(),
            )),
            (action, _) => Err(AppError::Internal(format!(
                "no side effect planned for {}",
                action.as_str()
            ))),
        }
    }

    async fn notify_reporter(&self, report: &Report) {
        let outcome = match (&report.status, &report.resolution) {
            (ReportStatus::Dismissed, _) => "was reviewed and dismissed".to_string(),
            (_, Some(resolution)) if resolution.action_taken != ModerationAction::NoAction => {
                format!(
                    "was reviewed and action was taken ({})",
                    resolution.action_taken.as_str()
                )
            }
            _ => "was reviewed".to_string(),
        };
        let message = format!(
            "Your report on a {} {}",
            report.report_type.as_str(),
            outcome
        );

        if let Err(e) = self
            .notifications
            .create_notification(
                report.reporter_id,
                message,
                Some(format!("/reports/{}", report.id)),
            )
            .await
        {
            tracing::warn!(report_id = %report.id, error = %e, "failed to notify reporter");
        }
    }
}

fn suspension_end(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::days(days)
}
