use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

use crate::{
    client::{
        api::{ClientResult, ReportApi},
        error::ClientError,
        optimistic::BusyFlag,
        session::Session,
    },
    models::{
        ModerationAction, Report, ReportDetails, ReportFilter, ReportStats, ReportType,
        SubmitReportRequest,
    },
};

/// The "report this" form. Validates locally and only then submits.
pub struct ReportComposer {
    api: Arc<dyn ReportApi>,
    session: Arc<Session>,
    busy: BusyFlag,
}

impl ReportComposer {
    pub fn new(api: Arc<dyn ReportApi>, session: Arc<Session>) -> Self {
        Self {
            api,
            session,
            busy: BusyFlag::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.session.is_authenticated()
    }

    pub async fn submit(&self, request: &SubmitReportRequest) -> ClientResult<Report> {
        if !self.session.is_authenticated() {
            return Err(ClientError::Disabled);
        }
        request.validate_submission()?;
        let _guard = self.busy.try_acquire().ok_or(ClientError::Busy)?;

        let report = self.api.submit_report(request).await?;
        tracing::info!(report_id = %report.id, "report submitted");
        Ok(report)
    }
}

/// Admin review queue. Keeps the reports it has shown so an
/// `AlreadyResolved` answer can be turned into a refreshed row.
pub struct ReportReviewer {
    api: Arc<dyn ReportApi>,
    session: Arc<Session>,
    reports: Mutex<HashMap<Uuid, Report>>,
    busy: BusyFlag,
}

impl ReportReviewer {
    pub fn new(api: Arc<dyn ReportApi>, session: Arc<Session>) -> Self {
        Self {
            api,
            session,
            reports: Mutex::new(HashMap::new()),
            busy: BusyFlag::new(),
        }
    }

    fn reports(&self) -> MutexGuard<'_, HashMap<Uuid, Report>> {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_admin(&self) -> ClientResult<()> {
        if self.session.is_admin() {
            Ok(())
        } else {
            Err(ClientError::Disabled)
        }
    }

    pub fn report(&self, report_id: Uuid) -> Option<Report> {
        self.reports().get(&report_id).cloned()
    }

    pub async fn load(&self, filter: &ReportFilter) -> ClientResult<Vec<Report>> {
        self.ensure_admin()?;
        let reports = self.api.list_reports(filter).await?;
        let mut known = self.reports();
        for report in &reports {
            known.insert(report.id, report.clone());
        }
        Ok(reports)
    }

    pub async fn stats(&self) -> ClientResult<ReportStats> {
        self.ensure_admin()?;
        self.api.report_stats().await
    }

    pub async fn details(&self, report_id: Uuid) -> ClientResult<ReportDetails> {
        self.ensure_admin()?;
        let details = self.api.report_details(report_id).await?;
        self.reports().insert(report_id, details.report.clone());
        Ok(details)
    }

    /// Earlier reports against the same target, newest first.
    pub async fn target_history(
        &self,
        report_type: ReportType,
        target_id: Uuid,
    ) -> ClientResult<Vec<Report>> {
        self.ensure_admin()?;
        let reports = self.api.target_reports(report_type, target_id, 0, 100).await?;
        let mut known = self.reports();
        for report in &reports {
            known.insert(report.id, report.clone());
        }
        Ok(reports)
    }

    pub async fn resolve(
        &self,
        report_id: Uuid,
        action: ModerationAction,
        reason: &str,
    ) -> ClientResult<Report> {
        self.ensure_admin()?;
        let _guard = self.busy.try_acquire().ok_or(ClientError::Busy)?;
        let result = self.api.process_report(report_id, action, reason).await;
        self.settle(report_id, result).await
    }

    /// The "reject report" control.
    pub async fn dismiss(&self, report_id: Uuid, reason: &str) -> ClientResult<Report> {
        self.ensure_admin()?;
        let _guard = self.busy.try_acquire().ok_or(ClientError::Busy)?;
        let result = self.api.dismiss_report(report_id, reason).await;
        self.settle(report_id, result).await
    }

    async fn settle(&self, report_id: Uuid, result: ClientResult<Report>) -> ClientResult<Report> {
        match result {
            Ok(report) => {
                self.reports().insert(report.id, report.clone());
                Ok(report)
            }
            Err(ClientError::AlreadyResolved) => {
                tracing::info!(%report_id, "report was already handled, refreshing");
                match self.api.get_report(report_id).await {
                    Ok(fresh) => {
                        self.reports().insert(fresh.id, fresh);
                    }
                    Err(e) => tracing::warn!(%report_id, error = %e, "refresh failed"),
                }
                Err(ClientError::AlreadyResolved)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::FakeBackend;
    use crate::models::{Account, ReportStatus, UserRole, ValidationError};

    fn request(target_id: Uuid, detail: &str) -> SubmitReportRequest {
        SubmitReportRequest {
            report_type: "user".to_string(),
            target_id,
            reason_category: "spam".to_string(),
            reason_detail: detail.to_string(),
            evidence_urls: Vec::new(),
        }
    }

    fn offender(backend: &FakeBackend) -> Uuid {
        let account = Account::new("offender", UserRole::User);
        backend.store.insert_account(account.clone()).unwrap();
        account.id
    }

    #[tokio::test]
    async fn invalid_reports_never_reach_the_network() {
        let backend = FakeBackend::new();
        let session = Arc::new(Session::signed_in(backend.user, UserRole::User, "t"));
        let composer = ReportComposer::new(backend.clone(), session);
        let target = offender(&backend);

        let err = composer
            .submit(&request(target, "too short"))
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::Validation(ValidationError::ReasonTooShort));

        let mut six = request(target, "Posting the same referral link everywhere");
        six.evidence_urls = (0..6)
            .map(|i| format!("https://i.ibb.co/{i}/proof.png"))
            .collect();
        assert_eq!(
            composer.submit(&six).await.unwrap_err(),
            ClientError::Validation(ValidationError::TooManyImages)
        );
        assert_eq!(backend.calls(), 0);

        let report = composer
            .submit(&request(target, "Posting the same referral link everywhere"))
            .await
            .unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn signed_out_viewers_cannot_report() {
        let backend = FakeBackend::new();
        let composer = ReportComposer::new(backend.clone(), Arc::new(Session::new()));
        let target = offender(&backend);
        assert_eq!(
            composer
                .submit(&request(target, "Posting the same referral link everywhere"))
                .await
                .unwrap_err(),
            ClientError::Disabled
        );
    }

    #[tokio::test]
    async fn already_resolved_refreshes_the_row() {
        let backend = FakeBackend::admin();
        let session = Arc::new(Session::signed_in(backend.user, UserRole::Admin, "t"));
        let target = offender(&backend);
        let reporter = Account::new("reporter", UserRole::User);
        backend.store.insert_account(reporter.clone()).unwrap();
        let report = backend
            .reports
            .submit(
                reporter.id,
                &request(target, "Posting the same referral link everywhere"),
            )
            .await
            .unwrap();

        let reviewer = ReportReviewer::new(backend.clone(), session);
        reviewer.load(&ReportFilter { limit: 20, ..ReportFilter::default() }).await.unwrap();
        assert!(reviewer.report(report.id).unwrap().is_pending());

        // Another admin got there first.
        backend
            .reports
            .dismiss(report.id, Uuid::new_v4(), "duplicate")
            .await
            .unwrap();

        let err = reviewer
            .resolve(report.id, ModerationAction::BanUser3Days, "spam")
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::AlreadyResolved);
        assert_eq!(
            reviewer.report(report.id).unwrap().status,
            ReportStatus::Dismissed
        );
    }

    #[tokio::test]
    async fn resolve_updates_the_row_and_stats() {
        let backend = FakeBackend::admin();
        let session = Arc::new(Session::signed_in(backend.user, UserRole::Admin, "t"));
        let target = offender(&backend);
        let reporter = Account::new("reporter", UserRole::User);
        backend.store.insert_account(reporter.clone()).unwrap();
        let report = backend
            .reports
            .submit(
                reporter.id,
                &request(target, "Posting the same referral link everywhere"),
            )
            .await
            .unwrap();

        let reviewer = ReportReviewer::new(backend.clone(), session);
        let resolved = reviewer
            .resolve(report.id, ModerationAction::NoAction, "fine")
            .await
            .unwrap();
        assert_eq!(resolved.status, ReportStatus::Resolved);
        assert_eq!(reviewer.report(report.id), Some(resolved));
        assert_eq!(reviewer.stats().await.unwrap().resolved, 1);
    }

    #[tokio::test]
    async fn details_and_history_fill_the_queue() {
        let backend = FakeBackend::admin();
        let session = Arc::new(Session::signed_in(backend.user, UserRole::Admin, "t"));
        let target = offender(&backend);
        let reporter = Account::new("reporter", UserRole::User);
        backend.store.insert_account(reporter.clone()).unwrap();
        let report = backend
            .reports
            .submit(
                reporter.id,
                &request(target, "Posting the same referral link everywhere"),
            )
            .await
            .unwrap();

        let reviewer = ReportReviewer::new(backend.clone(), session);
        let details = reviewer.details(report.id).await.unwrap();
        assert_eq!(details.reporter.map(|r| r.id), Some(reporter.id));
        assert_eq!(reviewer.report(report.id), Some(report.clone()));

        let history = reviewer.target_history(ReportType::User, target).await.unwrap();
        assert_eq!(history, vec![report]);
        assert!(reviewer
            .target_history(ReportType::User, reporter.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn non_admins_get_a_disabled_reviewer() {
        let backend = FakeBackend::new();
        let session = Arc::new(Session::signed_in(backend.user, UserRole::User, "t"));
        let reviewer = ReportReviewer::new(backend.clone(), session);
        assert_eq!(
            reviewer.dismiss(Uuid::new_v4(), "").await.unwrap_err(),
            ClientError::Disabled
        );
        assert_eq!(backend.calls(), 0);
    }
}
