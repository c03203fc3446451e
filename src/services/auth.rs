//! Login gate: remote email/password sign-in and view gating.
//!
//! DESIGN
//! ======
//! The auth service is reached through the [`AuthClient`] trait so handlers
//! and tests never depend on the hosted provider directly. Error codes from
//! the provider collapse into three user-facing messages; the raw code is
//! only logged.

use std::time::Duration;

use serde::Deserialize;

use crate::services::session::Session;

pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_SECURE_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com/v1";
/// Lifetime the provider gives id tokens when the response omits it.
pub const DEFAULT_ID_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Identity returned by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub email: String,
    pub uid: String,
    pub tokens: TokenGrant,
}

/// Short-lived bearer token plus what is needed to renew it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// Bearer token accepted by the document store.
    pub id_token: String,
    pub refresh_token: String,
    /// Validity of `id_token` from the moment it was issued.
    pub expires_in: Duration,
}

/// Provider lifetimes arrive as decimal strings (`"3600"`).
#[must_use]
pub fn parse_expires_in(raw: &str) -> Duration {
    raw.trim().parse().map_or(DEFAULT_ID_TOKEN_LIFETIME, Duration::from_secs)
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("sign-in rejected: {code}")]
    Rejected { code: String },
    #[error("auth service unreachable: {0}")]
    Transport(String),
    #[error("auth client build failed: {0}")]
    Client(String),
}

/// Remote email/password sign-in.
#[async_trait::async_trait]
pub trait AuthClient: Send + Sync {
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] with the provider's error code when the
    /// credentials are refused, or [`AuthError::Transport`] when the service
    /// cannot be reached.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError>;

    /// Exchange a refresh token for a new id token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] when the refresh token is no longer
    /// accepted, or [`AuthError::Transport`] when the service cannot be reached.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError>;
}

// =============================================================================
// LOGIN FAILURES
// =============================================================================

/// User-facing classes of sign-in failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    InvalidCredentials,
    RateLimited,
    Other,
}

impl LoginFailure {
    #[must_use]
    pub fn from_error(err: &AuthError) -> Self {
        match err {
            AuthError::Rejected { code } => Self::from_code(code),
            AuthError::Transport(_) | AuthError::Client(_) => Self::Other,
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "EMAIL_NOT_FOUND" | "INVALID_EMAIL"
            | "USER_DISABLED" | "MISSING_PASSWORD" => Self::InvalidCredentials,
            c if c.starts_with("TOO_MANY_ATTEMPTS_TRY_LATER") => Self::RateLimited,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Correo o contraseña incorrectos.",
            Self::RateLimited => "Demasiados intentos. Intenta de nuevo más tarde.",
            Self::Other => "No se pudo iniciar sesión. Intenta de nuevo.",
        }
    }
}

// =============================================================================
// GATE VIEW
// =============================================================================

/// Which parts of the results page are visible for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateView {
    pub login_visible: bool,
    pub form_visible: bool,
    pub user_bar_visible: bool,
    pub user_email: Option<String>,
    /// Contact email to render; pre-filled from the identity only when empty.
    pub contact_email: String,
}

impl GateView {
    #[must_use]
    pub fn for_session(session: Option<&Session>, contact_email: &str) -> Self {
        match session {
            None => Self {
                login_visible: true,
                form_visible: false,
                user_bar_visible: false,
                user_email: None,
                contact_email: contact_email.to_owned(),
            },
            Some(session) => {
                let contact_email =
                    if contact_email.trim().is_empty() { session.email.clone() } else { contact_email.to_owned() };
                Self {
                    login_visible: false,
                    form_visible: true,
                    user_bar_visible: true,
                    user_email: Some(session.email.clone()),
                    contact_email,
                }
            }
        }
    }

    #[must_use]
    pub fn authenticated(&self) -> bool {
        self.user_email.is_some()
    }
}

// =============================================================================
// FIREBASE IDENTITY TOOLKIT
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    email: String,
    local_id: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: String,
}

/// Secure Token API response; unlike sign-in it uses snake_case keys.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Extract the provider error code from an error response body.
///
/// Codes may carry a trailing explanation (`TOO_MANY_ATTEMPTS_TRY_LATER : ...`).
#[must_use]
pub fn parse_error_code(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error.message.split_whitespace().next().map(str::to_owned))
        .unwrap_or_else(|| "UNKNOWN".to_owned())
}

/// Password sign-in against the Identity Toolkit REST API, token renewal
/// against the Secure Token API.
pub struct FirebaseAuthClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    token_base_url: String,
}

impl FirebaseAuthClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: String) -> Result<Self, AuthError> {
        Self::with_base_urls(api_key, DEFAULT_IDENTITY_BASE_URL, DEFAULT_SECURE_TOKEN_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_base_urls(api_key: String, base_url: &str, token_base_url: &str) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuthError::Client(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token_base_url: token_base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait::async_trait]
impl AuthClient for FirebaseAuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        let resp = self
            .http
            .post(format!("{}/accounts:signInWithPassword", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({
                "email": email.trim(),
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected { code: parse_error_code(&body) });
        }

        let body = resp
            .json::<SignInResponse>()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(AuthIdentity {
            email: body.email,
            uid: body.local_id,
            tokens: TokenGrant {
                id_token: body.id_token,
                refresh_token: body.refresh_token,
                expires_in: parse_expires_in(&body.expires_in),
            },
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
        let resp = self
            .http
            .post(format!("{}/token", self.token_base_url))
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected { code: parse_error_code(&body) });
        }

        let body = resp
            .json::<RefreshResponse>()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(TokenGrant {
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_in: parse_expires_in(&body.expires_in),
        })
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
