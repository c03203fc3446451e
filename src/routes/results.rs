//! Results portal routes: gated form, submission, copy-down helper.

use std::collections::HashMap;

use axum::Form;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use super::auth::{current_session, session_for_write};
use crate::model::Category;
use crate::services::auth::GateView;
use crate::services::catalog::{self, CopyColumn};
use crate::services::laboratories;
use crate::services::scraper::{self, RowField};
use crate::services::submission::{SubmissionForm, SubmissionState};
use crate::state::AppState;
use crate::views::{self, LabOptions, ResultsView};

async fn lab_options(state: &AppState) -> LabOptions {
    match laboratories::load(&state.config.laboratories_path()).await {
        Ok(labs) => LabOptions::Loaded(labs),
        Err(_) => LabOptions::Failed,
    }
}

/// `GET /resultados`: login form, or the results form for a signed-in lab.
pub async fn show(State(state): State<AppState>, jar: CookieJar) -> Html<String> {
    let session = current_session(&state, &jar).await;
    let gate = GateView::for_session(session.as_ref(), "");
    let labs = if gate.form_visible { lab_options(&state).await } else { LabOptions::Loaded(Vec::new()) };
    Html(views::render_results_page(&ResultsView::new(gate, labs)))
}

/// `POST /resultados`: validate and submit one set of results.
///
/// Validation failures re-render the form with the entered values and a
/// blocking alert (422). Anything past validation renders the success view.
pub async fn submit(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let Some(session) = session_for_write(&state, &jar).await else {
        let view = ResultsView::new(GateView::for_session(None, ""), LabOptions::Loaded(Vec::new()));
        return (StatusCode::UNAUTHORIZED, Html(views::render_results_page(&view))).into_response();
    };

    let form = SubmissionForm::from_fields(fields);
    let client_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let result = state.orchestrator.submit(&form, client_agent, Some(&session.id_token)).await;
    let gate = GateView::for_session(Some(&session), &form.contact_email);
    let labs = lab_options(&state).await;

    match result {
        Ok(outcome) => {
            let view = ResultsView::from_form(gate, labs, &form, outcome.state);
            Html(views::render_results_page(&view)).into_response()
        }
        Err(e) => {
            let mut view = ResultsView::from_form(gate, labs, &form, SubmissionState::Idle);
            view.alert = Some(e.to_string());
            (StatusCode::UNPROCESSABLE_ENTITY, Html(views::render_results_page(&view))).into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct CopyDownRequest {
    /// Table suffix, `chem` or `uro`.
    category: String,
    column: CopyColumn,
    /// Current form fields; only the named table's column is read.
    fields: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CopyDownResponse {
    /// New value of every cell in the column, keyed by field name.
    pub values: HashMap<String, String>,
}

/// `POST /api/form/copy-down`: fill the empty cells of one column with the
/// first row's value.
pub async fn copy_down(Json(req): Json<CopyDownRequest>) -> Response {
    let Some(category) = Category::from_suffix(&req.category) else {
        return (StatusCode::BAD_REQUEST, "unknown table").into_response();
    };

    let mut rows = scraper::read_raw_rows(&req.fields, category);
    catalog::copy_down_rows(&mut rows, req.column);

    let field = match req.column {
        CopyColumn::Instrument => RowField::Instrument,
        CopyColumn::Method => RowField::Method,
    };
    let values = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let value = match req.column {
                CopyColumn::Instrument => row.instrument,
                CopyColumn::Method => row.method,
            };
            (scraper::field_name(field, category, i), value)
        })
        .collect();
    Json(CopyDownResponse { values }).into_response()
}

#[cfg(test)]
#[path = "results_test.rs"]
mod tests;
