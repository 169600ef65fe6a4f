//! External test-case store boundary.
//!
//! The destination store has no foreign keys back into the session's
//! in-memory scenario graph, so every payload row carries its lineage
//! denormalized onto it.

use crate::domain::artifact::{Priority, RiskLevel};
use crate::domain::error::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SaveCasePayload {
    pub case_id: String,
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub scenario_name: String,
    pub scenario_description: String,
    pub test_point_label: String,
    pub test_point_purpose: String,
    pub section_id: Option<String>,
    pub section_name: Option<String>,
    pub risk_level: RiskLevel,
    /// Embedded details serialized as JSON (purpose, steps, expected result).
    pub details_json: String,
    pub requirement_doc_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RequirementDocMeta {
    pub session_id: String,
    pub title: String,
    pub section_count: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SavedBatch {
    pub saved_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub id: String,
}

/// Batch persistence collaborator. `batch_save_test_cases` is assumed
/// all-or-nothing: a failure commits nothing on the remote side.
#[async_trait]
pub trait CaseStoreClient {
    async fn batch_save_test_cases(
        &self,
        cases: &[SaveCasePayload],
        session_id: &str,
    ) -> Result<SavedBatch>;

    async fn create_requirement_document(&self, meta: &RequirementDocMeta) -> Result<DocumentRef>;
}

pub struct HttpCaseStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCaseStore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl CaseStoreClient for HttpCaseStore {
    async fn batch_save_test_cases(
        &self,
        cases: &[SaveCasePayload],
        session_id: &str,
    ) -> Result<SavedBatch> {
        let body = serde_json::json!({
            "sessionId": session_id,
            "cases": cases,
        });

        let response = self
            .request(&self.url("test-cases/batch"))
            .header("X-Session-Token", session_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::PersistenceError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::PersistenceError(format!(
                "Store error ({}): {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::PersistenceError(format!("Failed to parse JSON: {}", e)))
    }

    async fn create_requirement_document(&self, meta: &RequirementDocMeta) -> Result<DocumentRef> {
        let response = self
            .request(&self.url("requirement-documents"))
            .header("X-Session-Token", &meta.session_id)
            .json(meta)
            .send()
            .await
            .map_err(|e| AppError::PersistenceError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::PersistenceError(format!(
                "Store error ({}): {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::PersistenceError(format!("Failed to parse JSON: {}", e)))
    }
}
