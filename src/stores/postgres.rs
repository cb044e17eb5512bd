use std::{collections::BTreeSet, str::FromStr};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        Account, ContentKind, ContentRecord, EngagementAggregate, ItemRef, ModerationAction,
        ModerationEffect, Notification, ReasonCategory, Report, ReportFilter, ReportStats,
        ReportStatus, ReportType, Resolution, UserRole, VoteDirection,
    },
    stores::{
        AccountStore, BookmarkStore, ContentStore, EngagementStore, NotificationStore, ReportStore,
    },
};

const ACCOUNT_COLUMNS: &str =
    "id, username, role, suspended_until, permanently_suspended, created_at";

const REPORT_COLUMNS: &str = r#"
    id, report_type, target_id, reporter_id, reason_category, reason_detail,
    evidence_urls, status, action_taken, resolution_notes, resolved_at, resolved_by,
    created_at
"#;

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Accounts are created by the identity service; this seeds one directly.
    pub async fn insert_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, username, role, suspended_until, permanently_suspended, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(account.role.as_str())
        .bind(account.suspended_until)
        .bind(account.permanently_suspended)
        .bind(account.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn insert_content(&self, record: &ContentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO content (id, kind, author_id, parent_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(record.kind.as_str())
        .bind(record.author_id)
        .bind(record.parent_id)
        .bind(record.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

/// `parent_id` narrows the match to children of one parent, which is how a
/// comment is addressed.
async fn delete_content<'e, E>(
    executor: E,
    kind: ContentKind,
    id: Uuid,
    parent_id: Option<Uuid>,
) -> Result<()>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "DELETE FROM content WHERE id = $1 AND kind = $2 AND ($3::uuid IS NULL OR parent_id = $3)",
    )
    .bind(id)
    .bind(kind.as_str())
    .bind(parent_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("{} not found", kind.label())));
    }
    Ok(())
}

// A permanent ban keeps the earlier timed end in place.
async fn suspend_account<'e, E>(
    executor: E,
    user_id: Uuid,
    until: Option<DateTime<Utc>>,
) -> Result<Account>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(&format!(
        r#"
        UPDATE accounts
        SET suspended_until = COALESCE($2, suspended_until),
            permanently_suspended = permanently_suspended OR $2 IS NULL
        WHERE id = $1
        RETURNING {}
        "#,
        ACCOUNT_COLUMNS
    ))
    .bind(user_id)
    .bind(until)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    account_from_row(&row)
}

async fn apply_effect(conn: &mut PgConnection, effect: &ModerationEffect) -> Result<()> {
    match *effect {
        ModerationEffect::Nothing => Ok(()),
        ModerationEffect::DeletePost(id) => delete_content(conn, ContentKind::Post, id, None).await,
        ModerationEffect::DeleteAnswer(id) => {
            delete_content(conn, ContentKind::Answer, id, None).await
        }
        ModerationEffect::DeleteComment {
            answer_id,
            comment_id,
        } => delete_content(conn, ContentKind::Comment, comment_id, Some(answer_id)).await,
        ModerationEffect::Suspend { user_id, until } => {
            suspend_account(conn, user_id, until).await.map(|_| ())
        }
    }
}

fn parse_column<T: FromStr>(row: &PgRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|_| AppError::Internal(format!("unexpected {} value: {}", column, raw)))
}

fn report_from_row(row: &PgRow) -> Result<Report> {
    let status: ReportStatus = parse_column(row, "status")?;

    let resolution = if status == ReportStatus::Pending {
        None
    } else {
        let action_taken: ModerationAction = parse_column(row, "action_taken")?;
        Some(Resolution {
            action_taken,
            notes: row
                .try_get::<Option<String>, _>("resolution_notes")?
                .unwrap_or_default(),
            resolved_at: row.try_get::<Option<DateTime<Utc>>, _>("resolved_at")?.ok_or_else(
                || AppError::Internal("resolved report without resolved_at".to_string()),
            )?,
            resolved_by: row.try_get::<Option<Uuid>, _>("resolved_by")?.ok_or_else(|| {
                AppError::Internal("resolved report without resolved_by".to_string())
            })?,
        })
    };

    Ok(Report {
        id: row.try_get("id")?,
        report_type: parse_column::<ReportType>(row, "report_type")?,
        target_id: row.try_get("target_id")?,
        reporter_id: row.try_get("reporter_id")?,
        reason_category: parse_column::<ReasonCategory>(row, "reason_category")?,
        reason_detail: row.try_get("reason_detail")?,
        evidence_urls: row.try_get("evidence_urls")?,
        status,
        resolution,
        created_at: row.try_get("created_at")?,
    })
}

fn notification_from_row(row: &PgRow) -> Result<Notification> {
    Ok(Notification {
        id: row.try_get("id")?,
        recipient_id: row.try_get("recipient_id")?,
        message: row.try_get("message")?,
        link: row.try_get("link")?,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}

fn account_from_row(row: &PgRow) -> Result<Account> {
    Ok(Account {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        role: parse_column::<UserRole>(row, "role")?,
        suspended_until: row.try_get("suspended_until")?,
        permanently_suspended: row.try_get("permanently_suspended")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ReportStore for PgStore {
    async fn insert_report(&self, report: &Report) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (
                id, report_type, target_id, reporter_id, reason_category, reason_detail,
                evidence_urls, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(report.id)
        .bind(report.report_type.as_str())
        .bind(report.target_id)
        .bind(report.reporter_id)
        .bind(report.reason_category.as_str())
        .bind(&report.reason_detail)
        .bind(&report.evidence_urls)
        .bind(report.status.as_str())
        .bind(report.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn find_report(&self, id: Uuid) -> Result<Option<Report>> {
        let row = sqlx::query(&format!("SELECT {} FROM reports WHERE id = $1", REPORT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(report_from_row).transpose()
    }

    async fn has_pending_report(
        &self,
        reporter_id: Uuid,
        report_type: ReportType,
        target_id: Uuid,
    ) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reports
                WHERE reporter_id = $1 AND report_type = $2 AND target_id = $3
                  AND status = 'pending'
            ) AS pending
            "#,
        )
        .bind(reporter_id)
        .bind(report_type.as_str())
        .bind(target_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.try_get("pending")?)
    }

    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM reports
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR report_type = $2)
              AND ($3::uuid IS NULL OR reporter_id = $3)
              AND ($4::uuid IS NULL OR target_id = $4)
            ORDER BY created_at DESC, id
            LIMIT $5 OFFSET $6
            "#,
            REPORT_COLUMNS
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.report_type.map(|t| t.as_str()))
        .bind(filter.reporter_id)
        .bind(filter.target_id)
        .bind(filter.limit as i64)
        .bind(filter.skip as i64)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(report_from_row).collect()
    }

    async fn report_stats(&self) -> Result<ReportStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'resolved') AS resolved,
                COUNT(*) FILTER (WHERE status = 'dismissed') AS dismissed,
                COUNT(*) AS total
            FROM reports
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(ReportStats {
            pending: row.try_get::<i64, _>("pending")? as u64,
            resolved: row.try_get::<i64, _>("resolved")? as u64,
            dismissed: row.try_get::<i64, _>("dismissed")? as u64,
            total: row.try_get::<i64, _>("total")? as u64,
        })
    }

    async fn resolve_report(
        &self,
        id: Uuid,
        effect: &ModerationEffect,
        status: ReportStatus,
        resolution: &Resolution,
    ) -> Result<Report> {
        let mut tx = self.db.begin().await?;

        // The row lock serialises resolvers; a loser wakes up to a terminal status.
        let current = sqlx::query(&format!(
            "SELECT {} FROM reports WHERE id = $1 FOR UPDATE",
            REPORT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;
        if !report_from_row(&current)?.is_pending() {
            return Err(AppError::AlreadyResolved);
        }

        apply_effect(&mut *tx, effect).await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE reports
            SET status = $2, action_taken = $3, resolution_notes = $4,
                resolved_at = $5, resolved_by = $6
            WHERE id = $1
            RETURNING {}
            "#,
            REPORT_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(resolution.action_taken.as_str())
        .bind(&resolution.notes)
        .bind(resolution.resolved_at)
        .bind(resolution.resolved_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(report_id = %id, effect = ?effect, "moderation effect committed");
        report_from_row(&row)
    }
}

#[async_trait]
impl EngagementStore for PgStore {
    async fn cast_vote(
        &self,
        item: ItemRef,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> Result<EngagementAggregate> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO votes (item_kind, item_id, user_id, is_upvote, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            ON CONFLICT (item_id, user_id)
            DO UPDATE SET is_upvote = EXCLUDED.is_upvote, updated_at = NOW()
            "#,
        )
        .bind(item.kind.as_str())
        .bind(item.id)
        .bind(user_id)
        .bind(direction.as_flag())
        .execute(&mut *tx)
        .await?;

        let rows = sqlx::query("SELECT user_id, is_upvote FROM votes WHERE item_id = $1")
            .bind(item.id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        aggregate_from_rows(&rows)
    }

    async fn aggregate(&self, item: ItemRef) -> Result<EngagementAggregate> {
        let rows = sqlx::query("SELECT user_id, is_upvote FROM votes WHERE item_id = $1")
            .bind(item.id)
            .fetch_all(&self.db)
            .await?;

        aggregate_from_rows(&rows)
    }
}

fn aggregate_from_rows(rows: &[PgRow]) -> Result<EngagementAggregate> {
    let mut upvoted_by = BTreeSet::new();
    let mut downvoted_by = BTreeSet::new();
    for row in rows {
        let user_id: Uuid = row.try_get("user_id")?;
        if row.try_get::<bool, _>("is_upvote")? {
            upvoted_by.insert(user_id);
        } else {
            downvoted_by.insert(user_id);
        }
    }
    Ok(EngagementAggregate::from_members(upvoted_by, downvoted_by))
}

#[async_trait]
impl BookmarkStore for PgStore {
    async fn toggle_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        let removed = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            sqlx::query(
                "INSERT INTO bookmarks (user_id, post_id, created_at) VALUES ($1, $2, NOW())",
            )
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(removed == 0)
    }

    async fn add_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookmarks (user_id, post_id, created_at) VALUES ($1, $2, NOW())
            ON CONFLICT (user_id, post_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn remove_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn bookmarked_posts(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT post_id FROM bookmarks WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<Uuid, _>("post_id").map_err(AppError::from))
            .collect()
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient_id, message, link, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(notification.id)
        .bind(notification.recipient_id)
        .bind(&notification.message)
        .bind(&notification.link)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        skip: u32,
        limit: u32,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, recipient_id, message, link, is_read, created_at
            FROM notifications
            WHERE recipient_id = $1 AND (NOT $2 OR is_read = false)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(recipient_id)
        .bind(unread_only)
        .bind(limit as i64)
        .bind(skip as i64)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn unread_count(&self, recipient_id: Uuid) -> Result<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM notifications WHERE recipient_id = $1 AND is_read = false",
        )
        .bind(recipient_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.try_get::<i64, _>("count")? as u64)
    }

    async fn mark_read(&self, recipient_id: Uuid, notification_id: Uuid) -> Result<bool> {
        // The CTE reports the pre-update flag so callers know whether it flipped.
        let row = sqlx::query(
            r#"
            WITH target AS (
                SELECT id, is_read FROM notifications
                WHERE id = $1 AND recipient_id = $2
                FOR UPDATE
            )
            UPDATE notifications n SET is_read = true
            FROM target
            WHERE n.id = target.id
            RETURNING target.is_read AS was_read
            "#,
        )
        .bind(notification_id)
        .bind(recipient_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

        Ok(!row.try_get::<bool, _>("was_read")?)
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE recipient_id = $1 AND is_read = false",
        )
        .bind(recipient_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, recipient_id: Uuid, notification_id: Uuid) -> Result<bool> {
        let row = sqlx::query(
            "DELETE FROM notifications WHERE id = $1 AND recipient_id = $2 RETURNING is_read",
        )
        .bind(notification_id)
        .bind(recipient_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

        Ok(!row.try_get::<bool, _>("is_read")?)
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn find_content(&self, kind: ContentKind, id: Uuid) -> Result<Option<ContentRecord>> {
        let row = sqlx::query(
            "SELECT id, kind, author_id, parent_id, created_at FROM content WHERE id = $1 AND kind = $2",
        )
        .bind(id)
        .bind(kind.as_str())
        .fetch_optional(&self.db)
        .await?;

        row.map(|row| -> Result<ContentRecord> {
            Ok(ContentRecord {
                id: row.try_get("id")?,
                kind: parse_column::<ContentKind>(&row, "kind")?,
                author_id: row.try_get("author_id")?,
                parent_id: row.try_get("parent_id")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }

    // Answers, comments, votes and bookmarks go with the post through
    // ON DELETE CASCADE.
    async fn delete_post(&self, id: Uuid, reason: Option<&str>) -> Result<()> {
        delete_content(&self.db, ContentKind::Post, id, None).await?;
        tracing::info!(post_id = %id, reason = reason.unwrap_or(""), "post deleted");
        Ok(())
    }

    async fn delete_answer(&self, id: Uuid, reason: Option<&str>) -> Result<()> {
        delete_content(&self.db, ContentKind::Answer, id, None).await?;
        tracing::info!(answer_id = %id, reason = reason.unwrap_or(""), "answer deleted");
        Ok(())
    }

    async fn delete_comment(
        &self,
        answer_id: Uuid,
        comment_id: Uuid,
        reason: Option<&str>,
    ) -> Result<()> {
        delete_content(&self.db, ContentKind::Comment, comment_id, Some(answer_id)).await?;
        tracing::info!(%answer_id, %comment_id, reason = reason.unwrap_or(""), "comment deleted");
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn suspend(&self, user_id: Uuid, until: Option<DateTime<Utc>>) -> Result<Account> {
        suspend_account(&self.db, user_id, until).await
    }
}
