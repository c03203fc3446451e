//! Submission orchestrator: validate, scrape, notify, persist.
//!
//! DESIGN
//! ======
//! `Idle → Validating → (invalid → Idle) | Submitting → Settled`.
//!
//! Validation is local and synchronous; nothing remote is touched until it
//! passes. After that the two side effects run in a fixed order with
//! independent failure domains:
//!
//! 1. Email notification, only when a contact email was entered and a
//!    notifier is configured. Failures are logged and swallowed.
//! 2. Store write, raced against `store_timeout`. A timeout or store error
//!    is logged as a warning only.
//!
//! Once validation passes the outcome is always `Settled`. A timed-out write
//! is dropped, not retried: if it never lands, the submission is lost except
//! for the notification email.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use time::Date;
use time::macros::format_description;
use tracing::{debug, error, info, warn};

use crate::model::{Category, CategoryFlags, RoundCode, SubmissionRecord};
use crate::services::notify::{NotificationParams, Notifier};
use crate::services::scraper;
use crate::services::store::DocumentStore;

// Form keys of the non-table fields.
pub const FIELD_LABORATORY: &str = "laboratorio";
pub const FIELD_ROUND_CODE: &str = "codigo_ensayo";
pub const FIELD_REPORT_DATE: &str = "fecha_reporte";
pub const FIELD_CONTACT_EMAIL: &str = "email_contacto";
pub const FIELD_COMMENTS: &str = "comentarios";

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Submitting,
    Settled,
}

impl SubmissionState {
    /// The submit control accepts clicks only while idle.
    #[must_use]
    pub fn submit_enabled(self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub fn progress_visible(self) -> bool {
        matches!(self, Self::Submitting)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Debes seleccionar un laboratorio válido.")]
    MissingLaboratory,
    #[error("El código de ensayo debe tener el formato EA-###-####.")]
    InvalidRoundCode,
    #[error("La fecha de reporte no es válida.")]
    InvalidReportDate,
    #[error("No has ingresado ningún resultado en las tablas.")]
    NoResults,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    Sent,
    /// No contact email, or no notifier configured.
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceStatus {
    Stored(String),
    TimedOut,
    Failed,
}

/// Result of a submission that passed validation.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub record: SubmissionRecord,
    pub notification: NotificationStatus,
    pub persistence: PersistenceStatus,
    pub state: SubmissionState,
}

// =============================================================================
// FORM
// =============================================================================

/// Raw submitted form: header fields plus the table cells.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub laboratory: String,
    pub round_code: String,
    pub report_date: String,
    pub contact_email: String,
    pub comments: String,
    /// Remaining fields, keyed by [`scraper::field_name`].
    pub table_fields: HashMap<String, String>,
}

impl SubmissionForm {
    #[must_use]
    pub fn from_fields(mut fields: HashMap<String, String>) -> Self {
        let mut take = |key: &str| fields.remove(key).unwrap_or_default();
        let laboratory = take(FIELD_LABORATORY);
        let round_code = take(FIELD_ROUND_CODE);
        let report_date = take(FIELD_REPORT_DATE);
        let contact_email = take(FIELD_CONTACT_EMAIL);
        let comments = take(FIELD_COMMENTS);
        Self { laboratory, round_code, report_date, contact_email, comments, table_fields: fields }
    }
}

fn parse_report_date(raw: &str) -> Result<Option<Date>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| ValidationError::InvalidReportDate)
}

/// Check the form and build the immutable record. No side effects.
///
/// # Errors
///
/// Returns the first failed check, in order: laboratory, round code, report
/// date, at least one populated row.
pub fn validate(form: &SubmissionForm, client_agent: &str) -> Result<SubmissionRecord, ValidationError> {
    let laboratory = form.laboratory.trim();
    if laboratory.is_empty() {
        return Err(ValidationError::MissingLaboratory);
    }
    let round_code = RoundCode::parse(&form.round_code).ok_or(ValidationError::InvalidRoundCode)?;
    let report_date = parse_report_date(&form.report_date)?;

    let results: Vec<_> = Category::ALL
        .into_iter()
        .flat_map(|category| scraper::scrape_table(&form.table_fields, category))
        .collect();
    if results.is_empty() {
        return Err(ValidationError::NoResults);
    }

    Ok(SubmissionRecord {
        laboratory: laboratory.to_owned(),
        round_code,
        report_date,
        contact_email: form.contact_email.trim().to_owned(),
        comments: form.comments.trim().to_owned(),
        category_flags: CategoryFlags::from_results(&results),
        results,
        client_agent: client_agent.to_owned(),
    })
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

pub struct Orchestrator {
    store: Arc<dyn DocumentStore>,
    notifier: Option<Arc<dyn Notifier>>,
    store_timeout: Duration,
}

impl Orchestrator {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, notifier: Option<Arc<dyn Notifier>>, store_timeout: Duration) -> Self {
        Self { store, notifier, store_timeout }
    }

    /// Run one submission end to end.
    ///
    /// # Errors
    ///
    /// Only validation errors are returned; remote failures are folded into
    /// the outcome.
    pub async fn submit(
        &self,
        form: &SubmissionForm,
        client_agent: &str,
        id_token: Option<&str>,
    ) -> Result<SubmissionOutcome, ValidationError> {
        debug!(state = ?SubmissionState::Validating, "submission started");
        let record = validate(form, client_agent).inspect_err(|e| {
            info!(reason = %e, "submission rejected");
        })?;

        debug!(
            state = ?SubmissionState::Submitting,
            laboratory = %record.laboratory,
            round = %record.round_code,
            results = record.results.len(),
            "submission validated"
        );

        let notification = self.notify(&record).await;
        let persistence = self.persist(&record, id_token).await;

        info!(
            laboratory = %record.laboratory,
            round = %record.round_code,
            ?notification,
            ?persistence,
            "submission settled"
        );
        Ok(SubmissionOutcome { record, notification, persistence, state: SubmissionState::Settled })
    }

    async fn notify(&self, record: &SubmissionRecord) -> NotificationStatus {
        if record.contact_email.is_empty() {
            return NotificationStatus::Skipped;
        }
        let Some(notifier) = &self.notifier else {
            return NotificationStatus::Skipped;
        };

        match notifier.send(&NotificationParams::from_record(record)).await {
            Ok(()) => {
                info!(to = %record.contact_email, "confirmation email sent");
                NotificationStatus::Sent
            }
            Err(e) => {
                error!(error = %e, to = %record.contact_email, "confirmation email failed");
                NotificationStatus::Failed
            }
        }
    }

    async fn persist(&self, record: &SubmissionRecord, id_token: Option<&str>) -> PersistenceStatus {
        match tokio::time::timeout(self.store_timeout, self.store.add_submission(record, id_token)).await {
            Ok(Ok(id)) => {
                info!(document = %id, "submission stored");
                PersistenceStatus::Stored(id)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "submission store write failed");
                PersistenceStatus::Failed
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.store_timeout.as_secs(),
                    "submission store write timed out; data may sync later"
                );
                PersistenceStatus::TimedOut
            }
        }
    }
}

#[cfg(test)]
#[path = "submission_test.rs"]
mod tests;
