//! Auth routes: email/password login, logout, session state.

use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::services::auth::{AuthError, GateView, LoginFailure};
use crate::services::session::Session;
use crate::state::AppState;
use crate::views::{self, LabOptions, LoginView, ResultsView};

pub(crate) const COOKIE_NAME: &str = "session_token";
pub(crate) const RESULTS_PATH: &str = "/resultados";

// =============================================================================
// COOKIES
// =============================================================================

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let mut cookie = Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.cookie_secure)
        .build();
    if let Ok(max_age) = time::Duration::try_from(state.config.session_ttl) {
        cookie.set_max_age(max_age);
    }
    cookie
}

fn cleared_cookie(state: &AppState) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.cookie_secure)
        .max_age(time::Duration::ZERO)
        .build()
}

fn cookie_token(jar: &CookieJar) -> &str {
    jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default()
}

/// Live session behind the request's cookie, if any.
pub async fn current_session(state: &AppState, jar: &CookieJar) -> Option<Session> {
    state.sessions.get(cookie_token(jar)).await
}

/// Live session whose id token can still authorize a store write. A stale
/// token is renewed first; if that fails the session is ended.
pub async fn session_for_write(state: &AppState, jar: &CookieJar) -> Option<Session> {
    let token = cookie_token(jar);
    let session = state.sessions.get(token).await?;
    if !session.token_stale() {
        return Some(session);
    }

    let renewed = match &state.auth {
        Some(auth) => auth.refresh(&session.refresh_token).await,
        None => Err(AuthError::Client("auth service not configured".into())),
    };
    match renewed {
        Ok(grant) => {
            info!(email = %session.email, "id token renewed");
            state.sessions.update_tokens(token, &grant).await
        }
        Err(e) => {
            warn!(error = %e, email = %session.email, "id token renewal failed; session ended");
            state.sessions.delete(token).await;
            None
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /login`: the login form lives on the results page.
pub async fn login_redirect() -> Redirect {
    Redirect::temporary(RESULTS_PATH)
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

fn login_failure_status(failure: LoginFailure) -> StatusCode {
    match failure {
        LoginFailure::InvalidCredentials => StatusCode::UNAUTHORIZED,
        LoginFailure::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        LoginFailure::Other => StatusCode::BAD_GATEWAY,
    }
}

/// `POST /login`: sign in once against the auth service, set the session
/// cookie and go back to the results page. Failures re-render the login form.
pub async fn login(State(state): State<AppState>, jar: CookieJar, Form(form): Form<LoginForm>) -> Response {
    let Some(auth) = &state.auth else {
        return (StatusCode::SERVICE_UNAVAILABLE, "auth service not configured").into_response();
    };

    let email = form.email.trim();
    match auth.sign_in(email, &form.password).await {
        Ok(identity) => {
            let token = state.sessions.create(&identity).await;
            info!(email = %identity.email, "login succeeded");
            let jar = jar.add(session_cookie(&state, token));
            (jar, Redirect::to(RESULTS_PATH)).into_response()
        }
        Err(e) => {
            let failure = LoginFailure::from_error(&e);
            warn!(error = %e, ?failure, "login failed");
            let mut view = ResultsView::new(GateView::for_session(None, ""), LabOptions::Loaded(Vec::new()));
            view.login = LoginView { email: email.to_owned(), error: Some(failure.message().to_owned()) };
            (login_failure_status(failure), Html(views::render_results_page(&view))).into_response()
        }
    }
}

/// `POST /logout`: drop the session and reload the results page.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let token = cookie_token(&jar).to_owned();
    if !token.is_empty() {
        state.sessions.delete(&token).await;
    }
    let jar = jar.add(cleared_cookie(&state));
    (jar, Redirect::to(RESULTS_PATH))
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthState {
    pub authenticated: bool,
    pub email: Option<String>,
}

/// `GET /api/auth/state`: whether the cookie maps to a live session.
pub async fn auth_state(State(state): State<AppState>, jar: CookieJar) -> Json<AuthState> {
    let session = current_session(&state, &jar).await;
    let gate = GateView::for_session(session.as_ref(), "");
    Json(AuthState { authenticated: gate.authenticated(), email: gate.user_email })
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
