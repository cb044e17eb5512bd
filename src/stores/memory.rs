use std::{
    collections::{BTreeSet, HashMap},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        Account, ContentKind, ContentRecord, EngagementAggregate, ItemRef, ModerationEffect,
        Notification, Report, ReportFilter, ReportStats, ReportStatus, ReportType, Resolution,
        VoteDirection,
    },
    stores::{
        AccountStore, BookmarkStore, ContentStore, EngagementStore, NotificationStore, ReportStore,
    },
};

#[derive(Default)]
struct State {
    reports: HashMap<Uuid, Report>,
    engagement: HashMap<ItemRef, EngagementAggregate>,
    bookmarks: HashMap<Uuid, BTreeSet<Uuid>>,
    notifications: Vec<Notification>,
    content: HashMap<Uuid, ContentRecord>,
    accounts: HashMap<Uuid, Account>,
}

impl State {
    fn content_of_kind(&self, kind: ContentKind, id: Uuid) -> Option<&ContentRecord> {
        self.content.get(&id).filter(|record| record.kind == kind)
    }

    fn children_of(&self, parent_id: Uuid, kind: ContentKind) -> Vec<Uuid> {
        self.content
            .values()
            .filter(|record| record.kind == kind && record.parent_id == Some(parent_id))
            .map(|record| record.id)
            .collect()
    }

    fn remove_comment(&mut self, id: Uuid) {
        self.content.remove(&id);
    }

    fn remove_answer(&mut self, id: Uuid) {
        for comment in self.children_of(id, ContentKind::Comment) {
            self.remove_comment(comment);
        }
        self.engagement.remove(&ItemRef::answer(id));
        self.content.remove(&id);
    }

    fn remove_post(&mut self, id: Uuid) {
        for answer in self.children_of(id, ContentKind::Answer) {
            self.remove_answer(answer);
        }
        self.engagement.remove(&ItemRef::post(id));
        for posts in self.bookmarks.values_mut() {
            posts.remove(&id);
        }
        self.content.remove(&id);
    }

    fn delete_post(&mut self, id: Uuid, reason: Option<&str>) -> Result<()> {
        if self.content_of_kind(ContentKind::Post, id).is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        self.remove_post(id);
        tracing::info!(post_id = %id, reason = reason.unwrap_or(""), "post deleted");
        Ok(())
    }

    fn delete_answer(&mut self, id: Uuid, reason: Option<&str>) -> Result<()> {
        if self.content_of_kind(ContentKind::Answer, id).is_none() {
            return Err(AppError::NotFound("Answer not found".to_string()));
        }
        self.remove_answer(id);
        tracing::info!(answer_id = %id, reason = reason.unwrap_or(""), "answer deleted");
        Ok(())
    }

    fn delete_comment(
        &mut self,
        answer_id: Uuid,
        comment_id: Uuid,
        reason: Option<&str>,
    ) -> Result<()> {
        let belongs = self
            .content_of_kind(ContentKind::Comment, comment_id)
            .is_some_and(|comment| comment.parent_id == Some(answer_id));
        if !belongs {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }
        self.remove_comment(comment_id);
        tracing::info!(%answer_id, %comment_id, reason = reason.unwrap_or(""), "comment deleted");
        Ok(())
    }

    fn suspend(&mut self, user_id: Uuid, until: Option<DateTime<Utc>>) -> Result<Account> {
        let account = self
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        match until {
            Some(until) => account.suspended_until = Some(until),
            None => account.permanently_suspended = true,
        }
        Ok(account.clone())
    }

    /// Each arm checks before it mutates, so a failure leaves the state as it was.
    fn apply_effect(&mut self, effect: &ModerationEffect, reason: Option<&str>) -> Result<()> {
        match *effect {
            ModerationEffect::Nothing => Ok(()),
            ModerationEffect::DeletePost(id) => self.delete_post(id, reason),
            ModerationEffect::DeleteAnswer(id) => self.delete_answer(id, reason),
            ModerationEffect::DeleteComment {
                answer_id,
                comment_id,
            } => self.delete_comment(answer_id, comment_id, reason),
            ModerationEffect::Suspend { user_id, until } => {
                self.suspend(user_id, until).map(|_| ())
            }
        }
    }
}

/// Whole-process store guarded by a single mutex, so every operation is
/// atomic with respect to every other.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }

    /// Content creation lives outside the core; this seeds records directly.
    pub fn insert_content(&self, record: ContentRecord) -> Result<()> {
        self.lock()?.content.insert(record.id, record);
        Ok(())
    }

    pub fn insert_account(&self, account: Account) -> Result<()> {
        self.lock()?.accounts.insert(account.id, account);
        Ok(())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report(&self, report: &Report) -> Result<()> {
        self.lock()?.reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn find_report(&self, id: Uuid) -> Result<Option<Report>> {
        Ok(self.lock()?.reports.get(&id).cloned())
    }

    async fn has_pending_report(
        &self,
        reporter_id: Uuid,
        report_type: ReportType,
        target_id: Uuid,
    ) -> Result<bool> {
        Ok(self.lock()?.reports.values().any(|report| {
            report.is_pending()
                && report.reporter_id == reporter_id
                && report.report_type == report_type
                && report.target_id == target_id
        }))
    }

    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let state = self.lock()?;
        let mut reports: Vec<Report> = state
            .reports
            .values()
            .filter(|report| filter.matches(report))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        Ok(reports
            .into_iter()
            .skip(filter.skip as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn report_stats(&self) -> Result<ReportStats> {
        let state = self.lock()?;
        let mut stats = ReportStats::default();
        for report in state.reports.values() {
            match report.status {
                ReportStatus::Pending => stats.pending += 1,
                ReportStatus::Resolved => stats.resolved += 1,
                ReportStatus::Dismissed => stats.dismissed += 1,
            }
            stats.total += 1;
        }
        Ok(stats)
    }

    async fn resolve_report(
        &self,
        id: Uuid,
        effect: &ModerationEffect,
        status: ReportStatus,
        resolution: &Resolution,
    ) -> Result<Report> {
        let mut state = self.lock()?;
        let mut report = state
            .reports
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;
        if !report.is_pending() {
            return Err(AppError::AlreadyResolved);
        }
        report
            .apply_resolution(status, resolution.clone())
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let reason = Some(resolution.notes.as_str()).filter(|r| !r.trim().is_empty());
        state.apply_effect(effect, reason)?;
        state.reports.insert(id, report.clone());
        Ok(report)
    }
}

#[async_trait]
impl EngagementStore for MemoryStore {
    async fn cast_vote(
        &self,
        item: ItemRef,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> Result<EngagementAggregate> {
        let mut state = self.lock()?;
        let aggregate = state.engagement.entry(item).or_default();
        aggregate.cast(user_id, direction);
        Ok(aggregate.clone())
    }

    async fn aggregate(&self, item: ItemRef) -> Result<EngagementAggregate> {
        Ok(self
            .lock()?
            .engagement
            .get(&item)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl BookmarkStore for MemoryStore {
    async fn toggle_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let mut state = self.lock()?;
        let posts = state.bookmarks.entry(user_id).or_default();
        if posts.remove(&post_id) {
            Ok(false)
        } else {
            posts.insert(post_id);
            Ok(true)
        }
    }

    async fn add_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        self.lock()?
            .bookmarks
            .entry(user_id)
            .or_default()
            .insert(post_id);
        Ok(())
    }

    async fn remove_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        if let Some(posts) = self.lock()?.bookmarks.get_mut(&user_id) {
            posts.remove(&post_id);
        }
        Ok(())
    }

    async fn bookmarked_posts(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .lock()?
            .bookmarks
            .get(&user_id)
            .map(|posts| posts.iter().copied().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.lock()?.notifications.push(notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        skip: u32,
        limit: u32,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let state = self.lock()?;
        Ok(state
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.is_read))
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn unread_count(&self, recipient_id: Uuid) -> Result<u64> {
        let state = self.lock()?;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
            .count() as u64)
    }

    async fn mark_read(&self, recipient_id: Uuid, notification_id: Uuid) -> Result<bool> {
        let mut state = self.lock()?;
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.recipient_id == recipient_id)
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

        let flipped = !notification.is_read;
        notification.is_read = true;
        Ok(flipped)
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64> {
        let mut state = self.lock()?;
        let mut updated = 0;
        for notification in state
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
        {
            notification.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_notification(&self, recipient_id: Uuid, notification_id: Uuid) -> Result<bool> {
        let mut state = self.lock()?;
        let index = state
            .notifications
            .iter()
            .position(|n| n.id == notification_id && n.recipient_id == recipient_id)
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

        Ok(!state.notifications.remove(index).is_read)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn find_content(&self, kind: ContentKind, id: Uuid) -> Result<Option<ContentRecord>> {
        Ok(self.lock()?.content_of_kind(kind, id).cloned())
    }

    async fn delete_post(&self, id: Uuid, reason: Option<&str>) -> Result<()> {
        self.lock()?.delete_post(id, reason)
    }

    async fn delete_answer(&self, id: Uuid, reason: Option<&str>) -> Result<()> {
        self.lock()?.delete_answer(id, reason)
    }

    async fn delete_comment(
        &self,
        answer_id: Uuid,
        comment_id: Uuid,
        reason: Option<&str>,
    ) -> Result<()> {
        self.lock()?.delete_comment(answer_id, comment_id, reason)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn suspend(&self, user_id: Uuid, until: Option<DateTime<Utc>>) -> Result<Account> {
        self.lock()?.suspend(user_id, until)
    }
}
