//! Document store for submissions.
//!
//! ARCHITECTURE
//! ============
//! One document per submission. The hosted backend is Firestore, written via
//! `documents:commit` so the submission timestamp comes from a server-side
//! `REQUEST_TIME` transform. The Postgres backend keeps the same JSON body in
//! a JSONB column and lets `DEFAULT now()` stamp the row.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::model::{SERVER_TIMESTAMP_FIELD, SubmissionRecord};

pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store rejected write ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("store transport failed: {0}")]
    Transport(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("submission did not encode as a JSON object")]
    NotAnObject,
}

/// Write side of the submission collection.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist one submission, returning the new document id.
    ///
    /// `id_token` authorizes the write on behalf of the signed-in user where
    /// the backend needs it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the write or cannot be reached.
    async fn add_submission(&self, record: &SubmissionRecord, id_token: Option<&str>) -> Result<String, StoreError>;
}

/// Build the configured store.
///
/// # Errors
///
/// Returns an error if the HTTP client or the database pool cannot be created.
pub async fn connect(config: StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config {
        StoreConfig::Firestore { project_id, collection } => Ok(Arc::new(FirestoreStore::new(project_id, collection)?)),
        StoreConfig::Postgres { database_url, collection } => {
            let pool = crate::db::init_pool(&database_url).await?;
            Ok(Arc::new(PgStore::new(pool, collection)))
        }
    }
}

// =============================================================================
// FIRESTORE VALUE ENCODING
// =============================================================================

/// Encode plain JSON as a Firestore typed `Value`.
#[must_use]
pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(to_firestore_value).collect::<Vec<_>>() } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": to_firestore_fields(map) } }),
    }
}

/// Encode a JSON object as a Firestore `fields` map.
#[must_use]
pub fn to_firestore_fields(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), to_firestore_value(v)))
            .collect(),
    )
}

// =============================================================================
// FIRESTORE
// =============================================================================

pub struct FirestoreStore {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    collection: String,
}

impl FirestoreStore {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(project_id: String, collection: String) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self { http, base_url: DEFAULT_FIRESTORE_BASE_URL.to_owned(), project_id, collection })
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)", self.project_id)
    }

    /// `documents:commit` body creating `doc_id` with a server timestamp.
    fn commit_body(&self, record: &SubmissionRecord, doc_id: &str) -> Result<Value, StoreError> {
        let Value::Object(fields) = serde_json::to_value(record)? else {
            return Err(StoreError::NotAnObject);
        };
        Ok(json!({
            "writes": [{
                "update": {
                    "name": format!("{}/documents/{}/{doc_id}", self.database_path(), self.collection),
                    "fields": to_firestore_fields(&fields),
                },
                "updateTransforms": [{
                    "fieldPath": SERVER_TIMESTAMP_FIELD,
                    "setToServerValue": "REQUEST_TIME",
                }],
                "currentDocument": { "exists": false },
            }]
        }))
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreStore {
    async fn add_submission(&self, record: &SubmissionRecord, id_token: Option<&str>) -> Result<String, StoreError> {
        let doc_id = Uuid::new_v4().simple().to_string();
        let body = self.commit_body(record, &doc_id)?;

        let mut req = self
            .http
            .post(format!("{}/{}/documents:commit", self.base_url, self.database_path()))
            .json(&body);
        if let Some(token) = id_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| StoreError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Rejected { status, body });
        }
        Ok(doc_id)
    }
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgStore {
    pool: PgPool,
    collection: String,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool, collection: String) -> Self {
        Self { pool, collection }
    }
}

#[async_trait::async_trait]
impl DocumentStore for PgStore {
    async fn add_submission(&self, record: &SubmissionRecord, _id_token: Option<&str>) -> Result<String, StoreError> {
        let id = Uuid::new_v4();
        let body = serde_json::to_value(record)?;
        sqlx::query("INSERT INTO submissions (id, collection, body) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&self.collection)
            .bind(body)
            .execute(&self.pool)
            .await?;
        Ok(id.to_string())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
