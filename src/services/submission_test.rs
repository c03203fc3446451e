use super::*;
use std::sync::Mutex;

use crate::services::notify::NotifyError;
use crate::services::store::StoreError;
use crate::state::test_helpers::{MockNotifier, MockStore, valid_form_fields};

fn form() -> SubmissionForm {
    SubmissionForm::from_fields(valid_form_fields())
}

fn orchestrator(store: &Arc<MockStore>, notifier: Option<&Arc<MockNotifier>>) -> Orchestrator {
    Orchestrator::new(
        store.clone(),
        notifier.map(|n| n.clone() as Arc<dyn Notifier>),
        Duration::from_secs(10),
    )
}

// =============================================================================
// SubmissionForm / validate
// =============================================================================

#[test]
fn from_fields_splits_header_and_table() {
    let form = form();
    assert_eq!(form.laboratory, "Laboratorio Central");
    assert_eq!(form.round_code, "ea-001-2025");
    assert_eq!(form.contact_email, "lab@example.com");
    assert!(!form.table_fields.contains_key(FIELD_LABORATORY));
    assert_eq!(form.table_fields.get("result_chem_0").map(String::as_str), Some("98.5"));
}

#[test]
fn validate_builds_record() {
    let record = validate(&form(), "Mozilla/5.0").unwrap();
    assert_eq!(record.round_code.as_str(), "EA-001-2025");
    assert_eq!(record.report_date_text(), "2025-03-07");
    assert_eq!(record.results.len(), 2);
    assert_eq!(record.results[0].category, Category::Chemistry);
    assert_eq!(record.results[1].category, Category::Urinalysis);
    assert!(record.category_flags.chemistry_present);
    assert!(record.category_flags.urinalysis_present);
    assert_eq!(record.client_agent, "Mozilla/5.0");
}

#[test]
fn validate_rejects_blank_laboratory() {
    let mut form = form();
    form.laboratory = "   ".into();
    assert_eq!(validate(&form, ""), Err(ValidationError::MissingLaboratory));
}

#[test]
fn validate_rejects_bad_round_code() {
    let mut form = form();
    form.round_code = "EA-01-2025".into();
    assert_eq!(validate(&form, ""), Err(ValidationError::InvalidRoundCode));
}

#[test]
fn validate_rejects_bad_date() {
    let mut form = form();
    form.report_date = "07/03/2025".into();
    assert_eq!(validate(&form, ""), Err(ValidationError::InvalidReportDate));
}

#[test]
fn validate_allows_missing_date() {
    let mut form = form();
    form.report_date = String::new();
    let record = validate(&form, "").unwrap();
    assert_eq!(record.report_date, None);
}

#[test]
fn validate_rejects_empty_tables() {
    let mut form = form();
    form.table_fields.clear();
    assert_eq!(validate(&form, ""), Err(ValidationError::NoResults));
}

#[test]
fn state_controls() {
    assert!(SubmissionState::Idle.submit_enabled());
    assert!(!SubmissionState::Submitting.submit_enabled());
    assert!(!SubmissionState::Settled.submit_enabled());
    assert!(SubmissionState::Submitting.progress_visible());
    assert!(!SubmissionState::Settled.progress_visible());
}

// =============================================================================
// Orchestrator
// =============================================================================

#[tokio::test]
async fn invalid_round_code_touches_nothing() {
    let store = Arc::new(MockStore::default());
    let notifier = Arc::new(MockNotifier::default());
    let mut form = form();
    form.round_code = "XX-001-2025".into();

    let result = orchestrator(&store, Some(&notifier)).submit(&form, "", None).await;

    assert_eq!(result.unwrap_err(), ValidationError::InvalidRoundCode);
    assert_eq!(store.calls(), 0);
    assert_eq!(notifier.calls(), 0);
}

#[tokio::test]
async fn empty_tables_touch_nothing() {
    let store = Arc::new(MockStore::default());
    let notifier = Arc::new(MockNotifier::default());
    let mut form = form();
    form.table_fields.clear();

    let result = orchestrator(&store, Some(&notifier)).submit(&form, "", None).await;

    assert_eq!(result.unwrap_err(), ValidationError::NoResults);
    assert_eq!(store.calls(), 0);
    assert_eq!(notifier.calls(), 0);
}

#[tokio::test]
async fn happy_path_notifies_and_stores() {
    let store = Arc::new(MockStore::default());
    let notifier = Arc::new(MockNotifier::default());

    let outcome = orchestrator(&store, Some(&notifier)).submit(&form(), "agent", Some("tok")).await.unwrap();

    assert_eq!(outcome.state, SubmissionState::Settled);
    assert_eq!(outcome.notification, NotificationStatus::Sent);
    assert_eq!(outcome.persistence, PersistenceStatus::Stored("doc-0".into()));
    assert_eq!(store.records(), vec![outcome.record.clone()]);
    let params = notifier.last().unwrap();
    assert_eq!(params.round_code, "EA-001-2025");
    assert!(params.results_summary.ends_with("Total: 2 analitos reportados."));
}

#[tokio::test]
async fn no_contact_email_skips_notification() {
    let store = Arc::new(MockStore::default());
    let notifier = Arc::new(MockNotifier::default());
    let mut form = form();
    form.contact_email = "  ".into();

    let outcome = orchestrator(&store, Some(&notifier)).submit(&form, "", None).await.unwrap();

    assert_eq!(outcome.notification, NotificationStatus::Skipped);
    assert_eq!(notifier.calls(), 0);
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn missing_notifier_skips_notification() {
    let store = Arc::new(MockStore::default());
    let outcome = orchestrator(&store, None).submit(&form(), "", None).await.unwrap();
    assert_eq!(outcome.notification, NotificationStatus::Skipped);
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn notifier_failure_still_settles_and_stores() {
    let store = Arc::new(MockStore::default());
    let notifier = Arc::new(MockNotifier::failing());

    let outcome = orchestrator(&store, Some(&notifier)).submit(&form(), "", None).await.unwrap();

    assert_eq!(outcome.notification, NotificationStatus::Failed);
    assert!(matches!(outcome.persistence, PersistenceStatus::Stored(_)));
    assert_eq!(outcome.state, SubmissionState::Settled);
}

#[tokio::test]
async fn store_failure_settles_as_failed() {
    let store = Arc::new(MockStore::failing());
    let outcome = orchestrator(&store, None).submit(&form(), "", None).await.unwrap();
    assert_eq!(outcome.persistence, PersistenceStatus::Failed);
    assert_eq!(outcome.state, SubmissionState::Settled);
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out_after_ten_seconds() {
    let store = Arc::new(MockStore::delayed(Duration::from_secs(15)));
    let start = tokio::time::Instant::now();

    let outcome = orchestrator(&store, None).submit(&form(), "", None).await.unwrap();

    let elapsed = start.elapsed();
    assert_eq!(outcome.persistence, PersistenceStatus::TimedOut);
    assert_eq!(outcome.state, SubmissionState::Settled);
    assert!(elapsed >= Duration::from_secs(10));
    assert!(elapsed < Duration::from_secs(15));
    assert_eq!(store.calls(), 1);
}

// Shared event log for ordering checks.
type Log = Arc<Mutex<Vec<&'static str>>>;

struct LoggingStore(Log);

#[async_trait::async_trait]
impl DocumentStore for LoggingStore {
    async fn add_submission(&self, _: &SubmissionRecord, _: Option<&str>) -> Result<String, StoreError> {
        self.0.lock().unwrap().push("store");
        Ok("doc".into())
    }
}

struct LoggingNotifier(Log);

#[async_trait::async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, _: &NotificationParams) -> Result<(), NotifyError> {
        self.0.lock().unwrap().push("notify");
        Ok(())
    }
}

#[tokio::test]
async fn notification_runs_before_store_write() {
    let log: Log = Arc::default();
    let orchestrator = Orchestrator::new(
        Arc::new(LoggingStore(log.clone())),
        Some(Arc::new(LoggingNotifier(log.clone()))),
        Duration::from_secs(10),
    );

    orchestrator.submit(&form(), "", None).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["notify", "store"]);
}
