use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidateUrl};

use crate::models::{Account, ContentKind};

pub const MIN_REASON_DETAIL_CHARS: usize = 20;
pub const MAX_EVIDENCE_IMAGES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Post,
    Answer,
    Comment,
    User,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Post => "post",
            ReportType::Answer => "answer",
            ReportType::Comment => "comment",
            ReportType::User => "user",
        }
    }
}

impl FromStr for ReportType {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(ReportType::Post),
            "answer" => Ok(ReportType::Answer),
            "comment" => Ok(ReportType::Comment),
            "user" => Ok(ReportType::User),
            _ => Err(ValidationError::InvalidReportType),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonCategory {
    Spam,
    Inappropriate,
    Harassment,
    Offensive,
    Misleading,
    Other,
}

impl ReasonCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCategory::Spam => "spam",
            ReasonCategory::Inappropriate => "inappropriate",
            ReasonCategory::Harassment => "harassment",
            ReasonCategory::Offensive => "offensive",
            ReasonCategory::Misleading => "misleading",
            ReasonCategory::Other => "other",
        }
    }
}

impl FromStr for ReasonCategory {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spam" => Ok(ReasonCategory::Spam),
            "inappropriate" => Ok(ReasonCategory::Inappropriate),
            "harassment" => Ok(ReasonCategory::Harassment),
            "offensive" => Ok(ReasonCategory::Offensive),
            "misleading" => Ok(ReasonCategory::Misleading),
            "other" => Ok(ReasonCategory::Other),
            _ => Err(ValidationError::InvalidCategory),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }

    /// Only a pending report may move, and only into a terminal status.
    pub fn can_transition_to(&self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Pending, ReportStatus::Resolved)
                | (ReportStatus::Pending, ReportStatus::Dismissed)
        )
    }
}

impl FromStr for ReportStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "resolved" => Ok(ReportStatus::Resolved),
            "dismissed" => Ok(ReportStatus::Dismissed),
            _ => Err(format!("Unknown ReportStatus: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    DeletePost,
    #[serde(rename = "ban_user_3_days")]
    BanUser3Days,
    #[serde(rename = "ban_user_7_days")]
    BanUser7Days,
    BanUserPermanent,
    NoAction,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::DeletePost => "delete_post",
            ModerationAction::BanUser3Days => "ban_user_3_days",
            ModerationAction::BanUser7Days => "ban_user_7_days",
            ModerationAction::BanUserPermanent => "ban_user_permanent",
            ModerationAction::NoAction => "no_action",
        }
    }

    /// Length of the suspension this action imposes. `Some(None)` is a
    /// permanent suspension, `None` means the action suspends nobody.
    pub fn suspension_days(&self) -> Option<Option<i64>> {
        match self {
            ModerationAction::BanUser3Days => Some(Some(3)),
            ModerationAction::BanUser7Days => Some(Some(7)),
            ModerationAction::BanUserPermanent => Some(None),
            ModerationAction::DeletePost | ModerationAction::NoAction => None,
        }
    }

    /// Every action in the table ends in `resolved`; dismissal is a separate path.
    pub fn resulting_status(&self) -> ReportStatus {
        ReportStatus::Resolved
    }
}

impl FromStr for ModerationAction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete_post" => Ok(ModerationAction::DeletePost),
            "ban_user_3_days" => Ok(ModerationAction::BanUser3Days),
            "ban_user_7_days" => Ok(ModerationAction::BanUser7Days),
            "ban_user_permanent" => Ok(ModerationAction::BanUserPermanent),
            "no_action" => Ok(ModerationAction::NoAction),
            _ => Err(format!("Unknown ModerationAction: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub action_taken: ModerationAction,
    pub notes: String,
    pub resolved_at: DateTime<Utc>,
    pub resolved_by: Uuid,
}

/// What a moderation action does to the reported target. Stores apply it in
/// the same unit of work that writes the terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationEffect {
    Nothing,
    DeletePost(Uuid),
    DeleteAnswer(Uuid),
    DeleteComment { answer_id: Uuid, comment_id: Uuid },
    /// `until: None` suspends indefinitely.
    Suspend {
        user_id: Uuid,
        until: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub report_type: ReportType,
    pub target_id: Uuid,
    pub reporter_id: Uuid,
    pub reason_category: ReasonCategory,
    pub reason_detail: String,
    pub evidence_urls: Vec<String>,
    pub status: ReportStatus,
    pub resolution: Option<Resolution>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new_pending(reporter_id: Uuid, submission: ValidatedReport) -> Self {
        Self {
            id: Uuid::new_v4(),
            report_type: submission.report_type,
            target_id: submission.target_id,
            reporter_id,
            reason_category: submission.reason_category,
            reason_detail: submission.reason_detail,
            evidence_urls: submission.evidence_urls,
            status: ReportStatus::Pending,
            resolution: None,
            created_at: Utc::now(),
        }
    }

    /// Moves the report into a terminal status. Fails without touching the
    /// report if it already left `pending`.
    pub fn apply_resolution(
        &mut self,
        status: ReportStatus,
        resolution: Resolution,
    ) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(status) {
            return Err(InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        self.resolution = Some(resolution);
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReportStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move report from {} to {}", from.as_str(), to.as_str())]
pub struct InvalidTransition {
    pub from: ReportStatus,
    pub to: ReportStatus,
}

/// Problems caught before a report ever reaches the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    #[error("reason must be at least 20 characters")]
    ReasonTooShort,
    #[error("reason category is not recognised")]
    InvalidCategory,
    #[error("at most 5 evidence images are allowed")]
    TooManyImages,
    #[error("evidence must be an uploaded image URL")]
    InvalidEvidenceUrl,
    #[error("report type is not recognised")]
    InvalidReportType,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::ReasonTooShort => "reason_too_short",
            ValidationError::InvalidCategory => "invalid_category",
            ValidationError::TooManyImages => "too_many_images",
            ValidationError::InvalidEvidenceUrl => "invalid_evidence_url",
            ValidationError::InvalidReportType => "invalid_report_type",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "reason_too_short" => Some(ValidationError::ReasonTooShort),
            "invalid_category" => Some(ValidationError::InvalidCategory),
            "too_many_images" => Some(ValidationError::TooManyImages),
            "invalid_evidence_url" => Some(ValidationError::InvalidEvidenceUrl),
            "invalid_report_type" => Some(ValidationError::InvalidReportType),
            _ => None,
        }
    }
}

// Report submission request. Kept stringly typed so unknown values surface as
// ValidationError instead of a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReportRequest {
    pub report_type: String,
    pub target_id: Uuid,
    pub reason_category: String,
    pub reason_detail: String,
    #[serde(default)]
    pub evidence_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReport {
    pub report_type: ReportType,
    pub target_id: Uuid,
    pub reason_category: ReasonCategory,
    pub reason_detail: String,
    pub evidence_urls: Vec<String>,
}

impl SubmitReportRequest {
    pub fn validate_submission(&self) -> Result<ValidatedReport, ValidationError> {
        let report_type: ReportType = self.report_type.trim().parse()?;
        let reason_category: ReasonCategory = self.reason_category.trim().parse()?;

        let reason_detail = self.reason_detail.trim();
        if reason_detail.chars().count() < MIN_REASON_DETAIL_CHARS {
            return Err(ValidationError::ReasonTooShort);
        }

        if self.evidence_urls.len() > MAX_EVIDENCE_IMAGES {
            return Err(ValidationError::TooManyImages);
        }
        if !self.evidence_urls.iter().all(|url| is_uploaded_image_url(url)) {
            return Err(ValidationError::InvalidEvidenceUrl);
        }

        Ok(ValidatedReport {
            report_type,
            target_id: self.target_id,
            reason_category,
            reason_detail: reason_detail.to_string(),
            evidence_urls: self.evidence_urls.clone(),
        })
    }
}

fn is_uploaded_image_url(url: &str) -> bool {
    (url.starts_with("https://") || url.starts_with("http://")) && url.validate_url()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResolveReportRequest {
    pub action: ModerationAction,
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DismissReportRequest {
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub report_type: Option<ReportType>,
    pub reporter_id: Option<Uuid>,
    pub target_id: Option<Uuid>,
    pub skip: u32,
    pub limit: u32,
}

impl ReportFilter {
    pub fn matches(&self, report: &Report) -> bool {
        self.status.is_none_or(|status| report.status == status)
            && self
                .report_type
                .is_none_or(|report_type| report.report_type == report_type)
            && self
                .reporter_id
                .is_none_or(|reporter| report.reporter_id == reporter)
            && self
                .target_id
                .is_none_or(|target| report.target_id == target)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStats {
    pub pending: u64,
    pub resolved: u64,
    pub dismissed: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub suspended: bool,
}

impl AccountSummary {
    pub fn of(account: &Account, now: DateTime<Utc>) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            suspended: account.is_suspended_at(now),
        }
    }
}

/// The reported thing as an admin sees it next to the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TargetSummary {
    Content {
        kind: ContentKind,
        id: Uuid,
        parent_id: Option<Uuid>,
        created_at: DateTime<Utc>,
        author: Option<AccountSummary>,
    },
    User {
        account: AccountSummary,
    },
}

/// A report with its reporter and target resolved. Either side is `None`
/// once it has been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDetails {
    pub report: Report,
    pub reporter: Option<AccountSummary>,
    pub target: Option<TargetSummary>,
}
