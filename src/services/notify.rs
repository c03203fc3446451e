//! Submission confirmation emails.
//!
//! DESIGN
//! ======
//! [`NotifyClient`] dispatches to EmailJS (server-side template, flat
//! parameter map) or Resend (template rendered here) based on
//! `NOTIFY_PROVIDER`. Callers treat every send as best effort.

use std::time::Duration;

use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;
use serde::Serialize;

use crate::config::NotifyConfig;
use crate::model::{Category, ScrapedResult, SubmissionRecord};
use crate::views::escape_html;

pub const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";
const NOTIFICATION_TEMPLATE: &str = include_str!("../../templates/results_notification.html");
const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("notification client build failed: {0}")]
    Client(String),
}

/// Flat template parameters sent with every notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationParams {
    /// Sender display name (the laboratory).
    pub name: String,
    /// Reply-to address.
    pub email: String,
    pub lab_name: String,
    pub round_code: String,
    pub report_date: String,
    pub entered_email: String,
    pub results_summary: String,
}

impl NotificationParams {
    #[must_use]
    pub fn from_record(record: &SubmissionRecord) -> Self {
        let chemistry: Vec<ScrapedResult> = record.results_in(Category::Chemistry).cloned().collect();
        let urinalysis: Vec<ScrapedResult> = record.results_in(Category::Urinalysis).cloned().collect();
        Self {
            name: record.laboratory.clone(),
            email: record.contact_email.clone(),
            lab_name: record.laboratory.clone(),
            round_code: record.round_code.to_string(),
            report_date: record.report_date_text(),
            entered_email: record.contact_email.clone(),
            results_summary: render_summary(&chemistry, &urinalysis),
        }
    }
}

/// Email dispatch used by the submission orchestrator.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the provider rejects the message or cannot be reached.
    async fn send(&self, params: &NotificationParams) -> Result<(), NotifyError>;
}

// =============================================================================
// SUMMARY
// =============================================================================

fn or_na(value: &str) -> &str {
    if value.is_empty() { "N/A" } else { value }
}

fn summary_line(r: &ScrapedResult) -> String {
    format!(
        "• {}: {} {} (Método: {}, Instrumento: {})",
        r.analyte,
        r.result,
        r.unit,
        or_na(&r.method),
        or_na(&r.instrument)
    )
}

/// Multi-line plain-text summary grouped by category, ending with the total.
#[must_use]
pub fn render_summary(chemistry: &[ScrapedResult], urinalysis: &[ScrapedResult]) -> String {
    let mut lines: Vec<String> = Vec::new();

    if !chemistry.is_empty() {
        lines.push(format!("--- {} ---", Category::Chemistry.summary_heading()));
        lines.extend(chemistry.iter().map(summary_line));
    }

    if !urinalysis.is_empty() {
        lines.push(String::new());
        lines.push(format!("--- {} ---", Category::Urinalysis.summary_heading()));
        lines.extend(urinalysis.iter().map(summary_line));
    }

    lines.push(String::new());
    lines.push(format!("Total: {} analitos reportados.", chemistry.len() + urinalysis.len()));
    lines.join("\n")
}

#[must_use]
pub fn render_notification_template(params: &NotificationParams) -> String {
    fill_placeholders(NOTIFICATION_TEMPLATE, |name| match name {
        "LAB_NAME" => Some(escape_html(&params.lab_name)),
        "ROUND_CODE" => Some(escape_html(&params.round_code)),
        "REPORT_DATE" => Some(escape_html(or_na(&params.report_date))),
        "EMAIL" => Some(escape_html(&params.entered_email)),
        "SUMMARY" => Some(escape_html(&params.results_summary).replace('\n', "<br>\n")),
        _ => None,
    })
}

/// Replace each `{{NAME}}` in `template` with `value(NAME)` in one pass.
/// Substituted text is never scanned again; unknown names are left as-is.
fn fill_placeholders(template: &str, value: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find("}}") else {
            rest = &rest[start..];
            break;
        };
        match value(&tail[..end]) {
            Some(v) => out.push_str(&v),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &tail[end + 2..];
    }
    out.push_str(rest);
    out
}

// =============================================================================
// EMAILJS
// =============================================================================

/// EmailJS REST client. The template lives in the EmailJS account.
pub struct EmailJsClient {
    http: reqwest::Client,
    send_url: String,
    service_id: String,
    template_id: String,
    public_key: String,
    private_key: Option<String>,
}

impl EmailJsClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        service_id: String,
        template_id: String,
        public_key: String,
        private_key: Option<String>,
    ) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self { http, send_url: EMAILJS_SEND_URL.to_owned(), service_id, template_id, public_key, private_key })
    }

    fn payload(&self, params: &NotificationParams) -> serde_json::Value {
        let mut body = serde_json::json!({
            "service_id": self.service_id,
            "template_id": self.template_id,
            "user_id": self.public_key,
            "template_params": params,
        });
        if let Some(private_key) = &self.private_key {
            body["accessToken"] = serde_json::Value::String(private_key.clone());
        }
        body
    }
}

#[async_trait::async_trait]
impl Notifier for EmailJsClient {
    async fn send(&self, params: &NotificationParams) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(&self.send_url)
            .json(&self.payload(params))
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }
        Ok(())
    }
}

// =============================================================================
// RESEND
// =============================================================================

/// Resend delivery with a locally rendered HTML body.
pub struct ResendNotifier {
    resend: Resend,
    from: String,
    to: String,
}

impl ResendNotifier {
    #[must_use]
    pub fn new(api_key: &str, from: String, to: String) -> Self {
        Self { resend: Resend::new(api_key), from, to }
    }

    /// Message to the configured inbox; replies go to the lab's contact email.
    fn email_options(&self, params: &NotificationParams) -> CreateEmailBaseOptions {
        let subject = format!("Resultados {} - {}", params.round_code, params.lab_name);
        let html = render_notification_template(params);
        let email = CreateEmailBaseOptions::new(&self.from, [self.to.as_str()], &subject).with_html(&html);
        if params.email.is_empty() { email } else { email.with_reply(&params.email) }
    }
}

#[async_trait::async_trait]
impl Notifier for ResendNotifier {
    async fn send(&self, params: &NotificationParams) -> Result<(), NotifyError> {
        self.resend
            .emails
            .send(self.email_options(params))
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete notifier selected from [`NotifyConfig`].
pub enum NotifyClient {
    EmailJs(EmailJsClient),
    Resend(ResendNotifier),
}

impl NotifyClient {
    /// # Errors
    ///
    /// Returns an error if the provider client cannot be built.
    pub fn from_config(config: NotifyConfig) -> Result<Self, NotifyError> {
        Ok(match config {
            NotifyConfig::EmailJs { service_id, template_id, public_key, private_key } => {
                Self::EmailJs(EmailJsClient::new(service_id, template_id, public_key, private_key)?)
            }
            NotifyConfig::Resend { api_key, from, to } => Self::Resend(ResendNotifier::new(&api_key, from, to)),
        })
    }

    #[must_use]
    pub fn provider(&self) -> &'static str {
        match self {
            Self::EmailJs(_) => "emailjs",
            Self::Resend(_) => "resend",
        }
    }
}

#[async_trait::async_trait]
impl Notifier for NotifyClient {
    async fn send(&self, params: &NotificationParams) -> Result<(), NotifyError> {
        match self {
            Self::EmailJs(c) => c.send(params).await,
            Self::Resend(c) => c.send(params).await,
        }
    }
}

#[cfg(test)]
#[path = "notify_test.rs"]
mod tests;
