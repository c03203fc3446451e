//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the gated results portal, the report pages and the JSON helpers
//! under a single Axum router. Everything else under `SITE_DIR` is served
//! as static files.

pub mod auth;
pub mod reports;
pub mod results;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router: portal routes, JSON API, static site fallback.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let site = ServeDir::new(&state.config.site_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/resultados", get(results::show).post(results::submit))
        .route("/login", get(auth::login_redirect).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/informes", get(reports::charts_page))
        .route("/api/auth/state", get(auth::auth_state))
        .route("/api/laboratories", get(reports::laboratories))
        .route("/api/form/copy-down", post(results::copy_down))
        .route("/api/charts", get(reports::charts))
        .route("/api/zscore", post(reports::zscore))
        .route("/api/search", get(reports::search))
        .route("/healthz", get(healthz))
        .fallback_service(site)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
