mod config;
mod db;
mod model;
mod routes;
mod services;
mod state;
mod views;

use std::sync::Arc;

use services::auth::{AuthClient, FirebaseAuthClient};
use services::notify::{NotifyClient, Notifier};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env().expect("invalid configuration");
    let port = config.port;

    let store_config = config::StoreConfig::from_env().expect("document store not configured");
    let store = services::store::connect(store_config).await.expect("document store init failed");

    // Email is optional: submissions still go through without it.
    let notifier: Option<Arc<dyn Notifier>> =
        match config::NotifyConfig::from_env().map_err(|e| e.to_string()).and_then(|c| {
            NotifyClient::from_config(c).map_err(|e| e.to_string())
        }) {
            Ok(client) => {
                tracing::info!(provider = client.provider(), "notification client initialized");
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!(error = %e, "notifications not configured; confirmation emails disabled");
                None
            }
        };

    let auth: Option<Arc<dyn AuthClient>> = match config.firebase_api_key.clone() {
        Some(key) => Some(Arc::new(FirebaseAuthClient::new(key).expect("auth client init failed"))),
        None => {
            tracing::warn!("FIREBASE_API_KEY not set; login disabled");
            None
        }
    };

    let state = state::AppState::new(config, auth, store, notifier);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "concalab listening");
    axum::serve(listener, app).await.expect("server failed");
}
