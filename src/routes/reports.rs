//! Reference data and report routes: laboratories, charts, Z-scores, search.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use serde::Deserialize;

use crate::services::charts::{self, build_report};
use crate::services::laboratories::{self, LOAD_FAILED_MESSAGE};
use crate::services::{search as search_svc, stats};
use crate::state::AppState;
use crate::views;

const CHARTS_UNAVAILABLE: &str = "Error cargando los datos de los gráficos.";
const SEARCH_UNAVAILABLE: &str = "search index unavailable";
const NO_VALUES: &str = "no laboratory reported a value";

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// `GET /api/laboratories`: sorted laboratory list.
pub async fn laboratories(State(state): State<AppState>) -> Response {
    match laboratories::load(&state.config.laboratories_path()).await {
        Ok(labs) => Json(labs).into_response(),
        Err(_) => json_error(StatusCode::SERVICE_UNAVAILABLE, LOAD_FAILED_MESSAGE),
    }
}

/// `GET /api/charts`: Plotly figures for the published round.
pub async fn charts(State(state): State<AppState>) -> Response {
    match charts::load_dataset(&state.config.dataset_path()).await {
        Ok(dataset) => Json(build_report(&dataset)).into_response(),
        Err(_) => json_error(StatusCode::SERVICE_UNAVAILABLE, CHARTS_UNAVAILABLE),
    }
}

/// `GET /informes`: report page; a load failure shows inline error markup.
pub async fn charts_page(State(state): State<AppState>) -> Html<String> {
    let report = charts::load_dataset(&state.config.dataset_path())
        .await
        .ok()
        .map(|dataset| build_report(&dataset));
    Html(views::render_charts_page(report.as_ref()))
}

/// `POST /api/zscore`: robust statistics and grades for one analyte.
pub async fn zscore(Json(input): Json<stats::AnalyteInput>) -> Response {
    match stats::score_analyte(&input) {
        Some(report) => Json(report).into_response(),
        None => json_error(StatusCode::UNPROCESSABLE_ENTITY, NO_VALUES),
    }
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// `GET /api/search?q=`: scored, highlighted hits from the content index.
pub async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Response {
    match search_svc::load_index(&state.config.search_index_path()).await {
        Ok(index) => Json(search_svc::search(&index, &query.q)).into_response(),
        Err(_) => json_error(StatusCode::SERVICE_UNAVAILABLE, SEARCH_UNAVAILABLE),
    }
}

#[cfg(test)]
#[path = "reports_test.rs"]
mod tests;
