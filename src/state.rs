//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. Every
//! remote collaborator (auth service, document store, notifier) is an
//! explicitly constructed trait object handed in by `main`, so tests swap in
//! doubles without touching globals.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::auth::AuthClient;
use crate::services::notify::Notifier;
use crate::services::session::SessionStore;
use crate::services::store::DocumentStore;
use crate::services::submission::Orchestrator;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
    /// Sign-in client. `None` if the auth service is not configured.
    pub auth: Option<Arc<dyn AuthClient>>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        auth: Option<Arc<dyn AuthClient>>,
        store: Arc<dyn DocumentStore>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let orchestrator = Arc::new(Orchestrator::new(store, notifier, config.store_timeout));
        Self { sessions: SessionStore::new(config.session_ttl), config: Arc::new(config), auth, orchestrator }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::model::SubmissionRecord;
    use crate::services::auth::{AuthError, AuthIdentity, TokenGrant};
    use crate::services::notify::{NotificationParams, NotifyError};
    use crate::services::store::StoreError;

    pub const TEST_PASSWORD: &str = "correct-horse";

    /// Store double: counts calls, optionally sleeps or fails.
    #[derive(Default)]
    pub struct MockStore {
        calls: AtomicUsize,
        delay: Option<Duration>,
        fail: bool,
        records: Mutex<Vec<SubmissionRecord>>,
        id_tokens: Mutex<Vec<Option<String>>>,
    }

    impl MockStore {
        #[must_use]
        pub fn delayed(delay: Duration) -> Self {
            Self { delay: Some(delay), ..Self::default() }
        }

        #[must_use]
        pub fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn records(&self) -> Vec<SubmissionRecord> {
            self.records.lock().unwrap().clone()
        }

        /// Bearer token passed with each write, in call order.
        pub fn id_tokens(&self) -> Vec<Option<String>> {
            self.id_tokens.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl DocumentStore for MockStore {
        async fn add_submission(
            &self,
            record: &SubmissionRecord,
            id_token: Option<&str>,
        ) -> Result<String, StoreError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.id_tokens.lock().unwrap().push(id_token.map(str::to_owned));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(StoreError::Rejected { status: 403, body: "PERMISSION_DENIED".into() });
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(format!("doc-{n}"))
        }
    }

    /// Notifier double: counts calls and keeps the last parameters.
    #[derive(Default)]
    pub struct MockNotifier {
        calls: AtomicUsize,
        fail: bool,
        last: Mutex<Option<NotificationParams>>,
    }

    impl MockNotifier {
        #[must_use]
        pub fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last(&self) -> Option<NotificationParams> {
            self.last.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, params: &NotificationParams) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(params.clone());
            if self.fail {
                return Err(NotifyError::Rejected { status: 400, body: "template not found".into() });
            }
            Ok(())
        }
    }

    /// Id token lifetime handed out by [`MockAuth`].
    pub const TEST_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

    /// Auth double: accepts [`TEST_PASSWORD`], rate-limits `"locked@example.com"`.
    /// Refreshes hand out `refreshed-id-token-{n}` unless built with
    /// [`MockAuth::rejecting_refresh`].
    #[derive(Default)]
    pub struct MockAuth {
        calls: AtomicUsize,
        refreshes: AtomicUsize,
        reject_refresh: bool,
    }

    impl MockAuth {
        #[must_use]
        pub fn rejecting_refresh() -> Self {
            Self { reject_refresh: true, ..Self::default() }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn refreshes(&self) -> usize {
            self.refreshes.load(Ordering::SeqCst)
        }
    }

    #[must_use]
    pub fn test_identity(email: &str) -> AuthIdentity {
        AuthIdentity {
            email: email.to_owned(),
            uid: "uid-1".into(),
            tokens: TokenGrant {
                id_token: format!("id-token-for-{email}"),
                refresh_token: format!("refresh-token-for-{email}"),
                expires_in: TEST_TOKEN_LIFETIME,
            },
        }
    }

    #[async_trait::async_trait]
    impl AuthClient for MockAuth {
        async fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if email == "locked@example.com" {
                return Err(AuthError::Rejected { code: "TOO_MANY_ATTEMPTS_TRY_LATER".into() });
            }
            if password != TEST_PASSWORD {
                return Err(AuthError::Rejected { code: "INVALID_LOGIN_CREDENTIALS".into() });
            }
            Ok(test_identity(email))
        }

        async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.reject_refresh {
                return Err(AuthError::Rejected { code: "TOKEN_EXPIRED".into() });
            }
            Ok(TokenGrant {
                id_token: format!("refreshed-id-token-{n}"),
                refresh_token: refresh_token.to_owned(),
                expires_in: TEST_TOKEN_LIFETIME,
            })
        }
    }

    /// Config pointing at the bundled `site/` directory.
    #[must_use]
    pub fn test_config() -> AppConfig {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        AppConfig {
            port: 0,
            site_dir: root.join("site"),
            data_dir: root.join("site/data"),
            session_ttl: Duration::from_secs(3600),
            cookie_secure: false,
            store_timeout: Duration::from_secs(10),
            firebase_api_key: None,
        }
    }

    #[must_use]
    pub fn test_app_state(store: Arc<MockStore>, notifier: Option<Arc<MockNotifier>>) -> AppState {
        test_app_state_with_auth(store, notifier, Some(Arc::new(MockAuth::default())))
    }

    #[must_use]
    pub fn test_app_state_with_auth(
        store: Arc<MockStore>,
        notifier: Option<Arc<MockNotifier>>,
        auth: Option<Arc<MockAuth>>,
    ) -> AppState {
        AppState::new(
            test_config(),
            auth.map(|a| a as Arc<dyn AuthClient>),
            store,
            notifier.map(|n| n as Arc<dyn Notifier>),
        )
    }

    /// Start a session directly and return the matching `Cookie` header value.
    pub async fn signed_in_cookie(state: &AppState) -> String {
        let token = state.sessions.create(&test_identity("lab@example.com")).await;
        format!("session_token={token}")
    }

    /// `application/x-www-form-urlencoded` body for router tests.
    pub fn form_body<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
        fn encode(raw: &str) -> String {
            raw.bytes()
                .map(|b| match b {
                    b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
                    b' ' => "+".to_owned(),
                    other => format!("%{other:02X}"),
                })
                .collect()
        }
        fields
            .into_iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// A complete, valid submission: one chemistry row and one urinalysis row.
    #[must_use]
    pub fn valid_form_fields() -> HashMap<String, String> {
        [
            ("laboratorio", "Laboratorio Central"),
            ("codigo_ensayo", "ea-001-2025"),
            ("fecha_reporte", "2025-03-07"),
            ("email_contacto", "lab@example.com"),
            ("comentarios", ""),
            ("instrument_chem_0", "Cobas c311"),
            ("method_chem_0", "GOD-PAP"),
            ("result_chem_0", "98.5"),
            ("unit_chem_0", "mg/dL"),
            ("result_uro_4", "neg"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
    }
}
