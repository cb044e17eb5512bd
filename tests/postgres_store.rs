//! Runs against a real database when `DATABASE_URL` is set and skips
//! otherwise.

use std::sync::Arc;

use chrono::{Duration, SubsecRound, Utc};
use forum_core::{
    database::{create_pool, run_migrations},
    error::AppError,
    models::{
        Account, ContentKind, ContentRecord, EngagementAggregate, ItemRef, ModerationAction,
        ModerationEffect, Notification, ReportFilter, ReportStatus, ReportType, Resolution,
        SubmitReportRequest, UserRole, VoteDirection,
    },
    services::{notification_service::NotificationService, report_service::ReportService},
    stores::{
        AccountStore, BookmarkStore, ContentStore, EngagementStore, NotificationStore, PgStore,
        ReportStore,
    },
};
use sqlx::PgPool;
use uuid::Uuid;

struct Db {
    store: Arc<PgStore>,
    pool: PgPool,
    service: ReportService,
}

async fn pg() -> Option<Db> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = create_pool(&url).await.ok()?;
    run_migrations(&pool).await.expect("migrations apply");
    let store = Arc::new(PgStore::new(pool.clone()));
    let service = ReportService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        NotificationService::new(store.clone()),
    );
    Some(Db {
        store,
        pool,
        service,
    })
}

impl Db {
    async fn account(&self, name: &str, role: UserRole) -> Account {
        let account = Account::new(format!("{name}-{}", Uuid::new_v4().simple()), role);
        self.store.insert_account(&account).await.unwrap();
        account
    }

    async fn content(&self, record: ContentRecord) -> ContentRecord {
        self.store.insert_content(&record).await.unwrap();
        record
    }
}

fn request(report_type: &str, target_id: Uuid) -> SubmitReportRequest {
    SubmitReportRequest {
        report_type: report_type.to_string(),
        target_id,
        reason_category: "harassment".to_string(),
        reason_detail: "Repeated insults aimed at other members".to_string(),
        evidence_urls: Vec::new(),
    }
}

fn resolution(admin: &Account) -> Resolution {
    Resolution {
        action_taken: ModerationAction::NoAction,
        notes: "reviewed".to_string(),
        resolved_at: Utc::now(),
        resolved_by: admin.id,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_resolvers_commit_once() {
    let Some(db) = pg().await else {
        eprintln!("skip: no DATABASE_URL");
        return;
    };
    let reporter = db.account("reporter", UserRole::User).await;
    let author = db.account("author", UserRole::User).await;
    let admin = db.account("admin", UserRole::Admin).await;
    let report = db
        .service
        .submit(reporter.id, &request("user", author.id))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = db.service.clone();
        let admin = admin.id;
        handles.push(tokio::spawn(async move {
            service
                .resolve(report.id, admin, ModerationAction::BanUser7Days, "race")
                .await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(AppError::AlreadyResolved) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(wins, 1);

    let stored = db.store.find_report(report.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ReportStatus::Resolved);
    assert!(db
        .store
        .find_account(author.id)
        .await
        .unwrap()
        .unwrap()
        .is_suspended_at(Utc::now()));
    let inbox = db
        .store
        .list_notifications(reporter.id, 0, 10, false)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
}

#[tokio::test]
async fn failed_status_write_rolls_back_the_effect() {
    let Some(db) = pg().await else {
        eprintln!("skip: no DATABASE_URL");
        return;
    };
    let reporter = db.account("reporter", UserRole::User).await;
    let author = db.account("author", UserRole::User).await;
    let admin = db.account("admin", UserRole::Admin).await;
    let report = db
        .service
        .submit(reporter.id, &request("user", author.id))
        .await
        .unwrap();

    // resolved_by must reference an account, so the final UPDATE fails after
    // the suspension already ran inside the transaction.
    let ghost_admin = Uuid::new_v4();
    let err = db
        .service
        .resolve(report.id, ghost_admin, ModerationAction::BanUserPermanent, "")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));

    let untouched = db.store.find_account(author.id).await.unwrap().unwrap();
    assert!(!untouched.permanently_suspended);
    assert!(db.store.find_report(report.id).await.unwrap().unwrap().is_pending());

    let resolved = db
        .service
        .resolve(report.id, admin.id, ModerationAction::BanUserPermanent, "")
        .await
        .unwrap();
    assert_eq!(resolved.status, ReportStatus::Resolved);
    assert!(db
        .store
        .find_account(author.id)
        .await
        .unwrap()
        .unwrap()
        .permanently_suspended);
}

#[tokio::test]
async fn missing_target_keeps_the_report_pending() {
    let Some(db) = pg().await else {
        eprintln!("skip: no DATABASE_URL");
        return;
    };
    let reporter = db.account("reporter", UserRole::User).await;
    let author = db.account("author", UserRole::User).await;
    let admin = db.account("admin", UserRole::Admin).await;
    let post = db.content(ContentRecord::post(author.id)).await;
    let report = db
        .service
        .submit(reporter.id, &request("post", post.id))
        .await
        .unwrap();

    db.store.delete_post(post.id, None).await.unwrap();
    let err = db
        .store
        .resolve_report(
            report.id,
            &ModerationEffect::DeletePost(post.id),
            ReportStatus::Resolved,
            &resolution(&admin),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(db.store.find_report(report.id).await.unwrap().unwrap().is_pending());
}

#[tokio::test]
async fn terminal_status_is_frozen() {
    let Some(db) = pg().await else {
        eprintln!("skip: no DATABASE_URL");
        return;
    };
    let reporter = db.account("reporter", UserRole::User).await;
    let author = db.account("author", UserRole::User).await;
    let admin = db.account("admin", UserRole::Admin).await;
    let report = db
        .service
        .submit(reporter.id, &request("user", author.id))
        .await
        .unwrap();
    db.service.dismiss(report.id, admin.id, "fine").await.unwrap();

    let reopened = sqlx::query(
        r#"
        UPDATE reports
        SET status = 'pending', action_taken = NULL, resolution_notes = NULL,
            resolved_at = NULL, resolved_by = NULL
        WHERE id = $1
        "#,
    )
    .bind(report.id)
    .execute(&db.pool)
    .await;
    assert!(reopened.is_err());

    let err = db
        .store
        .resolve_report(
            report.id,
            &ModerationEffect::Nothing,
            ReportStatus::Resolved,
            &resolution(&admin),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyResolved));
    let stored = db.store.find_report(report.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ReportStatus::Dismissed);
}

#[tokio::test]
async fn deleting_a_post_cascades() {
    let Some(db) = pg().await else {
        eprintln!("skip: no DATABASE_URL");
        return;
    };
    let author = db.account("author", UserRole::User).await;
    let voter = db.account("voter", UserRole::User).await;
    let post = db.content(ContentRecord::post(author.id)).await;
    let answer = db.content(ContentRecord::answer(author.id, post.id)).await;
    let comment = db.content(ContentRecord::comment(author.id, answer.id)).await;
    db.store
        .cast_vote(ItemRef::answer(answer.id), voter.id, VoteDirection::Up)
        .await
        .unwrap();
    db.store
        .cast_vote(ItemRef::post(post.id), voter.id, VoteDirection::Down)
        .await
        .unwrap();
    db.store.add_bookmark(voter.id, post.id).await.unwrap();

    db.store.delete_post(post.id, Some("spam")).await.unwrap();

    for (kind, id) in [
        (ContentKind::Post, post.id),
        (ContentKind::Answer, answer.id),
        (ContentKind::Comment, comment.id),
    ] {
        assert!(db.store.find_content(kind, id).await.unwrap().is_none());
    }
    assert_eq!(
        db.store.aggregate(ItemRef::answer(answer.id)).await.unwrap(),
        EngagementAggregate::default()
    );
    assert!(db.store.bookmarked_posts(voter.id).await.unwrap().is_empty());
    assert!(matches!(
        db.store.delete_post(post.id, None).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn comment_delete_needs_the_right_parent() {
    let Some(db) = pg().await else {
        eprintln!("skip: no DATABASE_URL");
        return;
    };
    let author = db.account("author", UserRole::User).await;
    let post = db.content(ContentRecord::post(author.id)).await;
    let answer = db.content(ContentRecord::answer(author.id, post.id)).await;
    let comment = db.content(ContentRecord::comment(author.id, answer.id)).await;

    assert!(matches!(
        db.store.delete_comment(post.id, comment.id, None).await,
        Err(AppError::NotFound(_))
    ));
    db.store.delete_comment(answer.id, comment.id, None).await.unwrap();
    assert!(db.store.find_content(ContentKind::Answer, answer.id).await.unwrap().is_some());
}

#[tokio::test]
async fn mark_read_reports_whether_it_flipped() {
    let Some(db) = pg().await else {
        eprintln!("skip: no DATABASE_URL");
        return;
    };
    let owner = db.account("owner", UserRole::User).await;
    let other = db.account("other", UserRole::User).await;
    let notification = Notification::new(owner.id, "Your report was reviewed".to_string(), None);
    db.store.insert_notification(&notification).await.unwrap();

    assert!(matches!(
        db.store.mark_read(other.id, notification.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(db.store.mark_read(owner.id, notification.id).await.unwrap());
    assert!(!db.store.mark_read(owner.id, notification.id).await.unwrap());
    assert_eq!(db.store.unread_count(owner.id).await.unwrap(), 0);

    assert!(matches!(
        db.store.delete_notification(other.id, notification.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(!db.store.delete_notification(owner.id, notification.id).await.unwrap());
    assert!(db
        .store
        .list_notifications(owner.id, 0, 10, false)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn permanent_ban_keeps_the_timed_end() {
    let Some(db) = pg().await else {
        eprintln!("skip: no DATABASE_URL");
        return;
    };
    let account = db.account("mallory", UserRole::User).await;
    let until = Utc::now().trunc_subsecs(0) + Duration::days(3);

    let suspended = db.store.suspend(account.id, Some(until)).await.unwrap();
    assert_eq!(suspended.suspended_until, Some(until));
    assert!(!suspended.permanently_suspended);

    let banned = db.store.suspend(account.id, None).await.unwrap();
    assert!(banned.permanently_suspended);
    assert_eq!(banned.suspended_until, Some(until));
    assert!(matches!(
        db.store.suspend(Uuid::new_v4(), None).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn target_filter_narrows_the_listing() {
    let Some(db) = pg().await else {
        eprintln!("skip: no DATABASE_URL");
        return;
    };
    let reporter = db.account("reporter", UserRole::User).await;
    let first = db.account("first", UserRole::User).await;
    let second = db.account("second", UserRole::User).await;
    let report = db
        .service
        .submit(reporter.id, &request("user", first.id))
        .await
        .unwrap();
    db.service
        .submit(reporter.id, &request("user", second.id))
        .await
        .unwrap();

    let listed = db
        .store
        .list_reports(&ReportFilter {
            report_type: Some(ReportType::User),
            target_id: Some(first.id),
            limit: 20,
            ..ReportFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![report.id]);
}
