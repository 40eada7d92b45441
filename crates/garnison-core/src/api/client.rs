//! Client for the training center's Strapi REST API.
//!
//! Every collection is read with `populate=*` and followed across Strapi's
//! page-based pagination; items go through the normalizer so callers only
//! ever see flat models.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use reqwest::{header, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::SessionData;
use crate::models::{
    Consultation, Instructor, Permission, Punishment, Remark, RemarkDraft, Specialty, Subject,
    Trainee,
};
use crate::normalize::{items, Normalize};
use crate::report::AssetFetcher;

use super::{ApiError, BatchError};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Items requested per page; Strapi caps `pageSize` at 100 by default
const PAGE_SIZE: u32 = 100;

/// Upper bound on pages followed for one collection
const MAX_PAGES: u64 = 500;

// Strapi collection endpoints
pub const TRAINEES: &str = "/api/stagiaires";
pub const INSTRUCTORS: &str = "/api/instructeurs";
pub const SUBJECTS: &str = "/api/matieres";
pub const REMARKS: &str = "/api/remarques";
pub const CONSULTATIONS: &str = "/api/consultations";
pub const PUNISHMENTS: &str = "/api/punitions";
pub const PERMISSIONS: &str = "/api/permissions";
pub const SPECIALTIES: &str = "/api/specialites";
const AUTH_LOCAL: &str = "/api/auth/local";

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    jwt: String,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: i64,
    username: String,
    #[serde(default)]
    email: String,
}

/// Per-draft outcome of a batch submission, in draft order
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<std::result::Result<Remark, String>>,
}

impl BatchReport {
    pub fn created(&self) -> impl Iterator<Item = &Remark> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    pub fn failures(&self) -> Vec<(usize, String)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.as_ref().err().map(|e| (i, e.clone())))
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.is_ok())
    }

    /// Collapse into one result: any failure fails the whole batch.
    /// Remarks already created stay created.
    pub fn into_result(self) -> std::result::Result<Vec<Remark>, BatchError> {
        let failures = self.failures();
        if failures.is_empty() {
            Ok(self.outcomes.into_iter().filter_map(|o| o.ok()).collect())
        } else {
            Err(BatchError::Failed {
                total: self.outcomes.len(),
                failures,
            })
        }
    }
}

/// Reject the batch at the first invalid draft
pub fn validate_batch(drafts: &[RemarkDraft]) -> std::result::Result<(), BatchError> {
    for (index, draft) in drafts.iter().enumerate() {
        draft
            .validate()
            .map_err(|source| BatchError::Invalid { index, source })?;
    }
    Ok(())
}

/// `meta.pagination.pageCount`, or 1 when the response is not paginated
fn page_count(body: &Value) -> u64 {
    body.pointer("/meta/pagination/pageCount")
        .and_then(Value::as_u64)
        .unwrap_or(1)
        .max(1)
}

/// API client for the Strapi backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Option<SessionData>,
}

impl ApiClient {
    /// Create a client for `base_url`. Without a session only public
    /// routes (login, public uploads) will succeed.
    pub fn new(base_url: &str, session: Option<SessionData>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Same connection pool, different session
    pub fn with_session(&self, session: SessionData) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            session: Some(session),
        }
    }

    pub fn session(&self) -> Option<&SessionData> {
        self.session.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; paths are joined to the base URL.
    pub fn resolve_url(&self, path: &str) -> String {
        let path = path.trim();
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref session) = self.session {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", session.jwt))?,
            );
        }
        Ok(headers)
    }

    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit
    /// (should retry), or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send a request, retrying 429s with exponential backoff
    async fn send<F>(&self, url: &str, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> Result<RequestBuilder>,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build()?
                .send()
                .await
                .with_context(|| format!("Failed to send request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .send(url, || Ok(self.client.get(url).headers(self.auth_headers()?).query(query)))
            .await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> Result<T> {
        let response = self
            .send(url, || Ok(self.client.post(url).headers(self.auth_headers()?).json(body)))
            .await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    // ===== Authentication =====

    /// Log in with the Strapi local provider
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<SessionData> {
        let url = self.resolve_url(AUTH_LOCAL);
        let request = AuthRequest {
            identifier,
            password,
        };
        let response = self
            .send(&url, || Ok(self.client.post(&url).json(&request)))
            .await
            .context("Authentication failed")?;
        let auth: AuthResponse = response
            .json()
            .await
            .context("Failed to parse auth response")?;

        info!(user_id = auth.user.id, username = %auth.user.username, "Authenticated");
        Ok(SessionData {
            jwt: auth.jwt,
            user_id: auth.user.id,
            username: auth.user.username,
            email: auth.user.email,
            created_at: Utc::now(),
        })
    }

    // ===== Data Fetching Methods =====

    /// Fetch every item of a collection, following pagination
    pub async fn fetch_collection<T: Normalize>(&self, path: &str) -> Result<Vec<T>> {
        let url = self.resolve_url(path);
        let mut records = Vec::new();
        let mut page: u64 = 1;

        loop {
            let query = [
                ("populate", "*".to_string()),
                ("pagination[page]", page.to_string()),
                ("pagination[pageSize]", PAGE_SIZE.to_string()),
            ];
            let body: Value = self.get(&url, &query).await?;
            let batch = items(&body);
            records.extend(batch.iter().map(T::normalize));

            let pages = page_count(&body).min(MAX_PAGES);
            debug!(url = %url, page = page, pages = pages, items = batch.len(), "Fetched page");
            if page >= pages || batch.is_empty() {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    pub async fn fetch_trainees(&self) -> Result<Vec<Trainee>> {
        self.fetch_collection(TRAINEES).await
    }

    pub async fn fetch_instructors(&self) -> Result<Vec<Instructor>> {
        self.fetch_collection(INSTRUCTORS).await
    }

    pub async fn fetch_subjects(&self) -> Result<Vec<Subject>> {
        self.fetch_collection(SUBJECTS).await
    }

    pub async fn fetch_remarks(&self) -> Result<Vec<Remark>> {
        self.fetch_collection(REMARKS).await
    }

    pub async fn fetch_consultations(&self) -> Result<Vec<Consultation>> {
        self.fetch_collection(CONSULTATIONS).await
    }

    pub async fn fetch_punishments(&self) -> Result<Vec<Punishment>> {
        self.fetch_collection(PUNISHMENTS).await
    }

    pub async fn fetch_permissions(&self) -> Result<Vec<Permission>> {
        self.fetch_collection(PERMISSIONS).await
    }

    pub async fn fetch_specialties(&self) -> Result<Vec<Specialty>> {
        self.fetch_collection(SPECIALTIES).await
    }

    // ===== Writes =====

    pub async fn create_remark(&self, draft: &RemarkDraft) -> Result<Remark> {
        let url = self.resolve_url(REMARKS);
        let body: Value = self.post(&url, &draft.to_payload()).await?;
        Ok(Remark::normalize(&body))
    }

    /// Create all drafts concurrently.
    ///
    /// Every draft is validated first; one invalid draft means no request
    /// is sent at all. Otherwise all creates are dispatched together and
    /// awaited, and the report lists each outcome. Nothing is rolled back.
    pub async fn create_remarks(
        &self,
        drafts: &[RemarkDraft],
    ) -> std::result::Result<BatchReport, BatchError> {
        validate_batch(drafts)?;

        let futures = drafts.iter().map(|draft| self.create_remark(draft));
        let outcomes: Vec<_> = join_all(futures)
            .await
            .into_iter()
            .map(|r| r.map_err(|e| format!("{:#}", e)))
            .collect();

        let report = BatchReport { outcomes };
        if !report.is_success() {
            warn!(
                total = drafts.len(),
                failed = report.failures().len(),
                "Remark batch partially failed"
            );
        }
        Ok(report)
    }

    // ===== Assets =====

    /// Raw bytes of an uploaded file; relative URLs resolve against the base
    pub async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>> {
        let url = self.resolve_url(url);
        let response = self
            .send(&url, || Ok(self.client.get(&url).headers(self.auth_headers()?)))
            .await?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read {}", url))?;
        debug!(url = %url, bytes = bytes.len(), "Fetched asset");
        Ok(bytes.to_vec())
    }
}

impl AssetFetcher for ApiClient {
    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>> {
        ApiClient::fetch_asset(self, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemarkKind;
    use serde_json::json;

    fn client() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9/", None).unwrap()
    }

    fn draft(content: &str) -> RemarkDraft {
        RemarkDraft {
            date: "2024-03-04".into(),
            start_time: "08:00".into(),
            end_time: "10:00".into(),
            content: content.into(),
            kind: RemarkKind::Positive,
            instructor_id: 7,
            subject_id: Some(2),
        }
    }

    #[test]
    fn test_resolve_url() {
        let c = client();
        assert_eq!(c.base_url(), "http://127.0.0.1:9");
        assert_eq!(c.resolve_url("/api/stagiaires"), "http://127.0.0.1:9/api/stagiaires");
        assert_eq!(c.resolve_url("uploads/a.png"), "http://127.0.0.1:9/uploads/a.png");
        assert_eq!(c.resolve_url("https://cdn.example/a.png"), "https://cdn.example/a.png");
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(&json!({"data": [], "meta": {"pagination": {"page": 1, "pageCount": 4}}})), 4);
        assert_eq!(page_count(&json!({"data": []})), 1);
        assert_eq!(page_count(&json!([])), 1);
        assert_eq!(page_count(&json!({"meta": {"pagination": {"pageCount": 0}}})), 1);
    }

    #[test]
    fn test_session_accessor() {
        assert!(client().session().is_none());
        let session = SessionData {
            jwt: "t".into(),
            user_id: 1,
            username: "admin".into(),
            email: String::new(),
            created_at: Utc::now(),
        };
        let authed = client().with_session(session.clone());
        assert_eq!(authed.session(), Some(&session));
        assert!(authed.auth_headers().unwrap().contains_key(header::AUTHORIZATION));
    }

    #[tokio::test]
    async fn test_invalid_draft_rejects_whole_batch_before_sending() {
        // Nothing listens on port 9; reaching the network would be a send error.
        let drafts = vec![draft("ok"), draft("  ")];
        match client().create_remarks(&drafts).await {
            Err(BatchError::Invalid { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_batch_report_collapses_failures() {
        let ok = Remark::normalize(&json!({"id": 1, "contenu": "a"}));
        let report = BatchReport {
            outcomes: vec![Ok(ok.clone()), Err("Server error: boom".into())],
        };
        assert!(!report.is_success());
        assert_eq!(report.created().count(), 1);
        match report.into_result() {
            Err(BatchError::Failed { total, failures }) => {
                assert_eq!(total, 2);
                assert_eq!(failures, vec![(1, "Server error: boom".to_string())]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let report = BatchReport { outcomes: vec![Ok(ok)] };
        assert_eq!(report.into_result().unwrap().len(), 1);
    }

    #[test]
    fn test_auth_response_shape() {
        let raw = r#"{"jwt":"abc","user":{"id":3,"username":"admin","email":"a@b.c","blocked":false}}"#;
        let auth: AuthResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(auth.jwt, "abc");
        assert_eq!(auth.user.id, 3);
    }
}
