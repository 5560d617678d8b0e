//! HTTP client for the editor API.
//!
//! Speaks the same routes the browser uses, authenticated by the session
//! cookie. One `ApiClient` serves as the record store, the identity provider
//! and the render client of an editor session.

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::identity::{IdentityError, IdentityProvider};
use crate::models::record::{
    AuthenticatedUser, CreateResume, GeneratePdfRequest, ResumeMetadata, ResumeRecord,
    UpdateResume,
};
use crate::render::{RenderClient, RenderError, RenderedPdf};
use crate::store::{RecordStore, StoreError};

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

const FALLBACK_ERROR_CODE: &str = "INTERNAL_ERROR";

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    resumes: Option<Vec<ResumeMetadata>>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    user: Option<SessionUser>,
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Status, code and message of a failed call.
#[derive(Debug, PartialEq, Eq)]
struct ApiFailure {
    status: u16,
    code: String,
    message: String,
}

impl From<ApiFailure> for StoreError {
    fn from(f: ApiFailure) -> Self {
        StoreError::Api {
            status: f.status,
            code: f.code,
            message: f.message,
        }
    }
}

impl From<ApiFailure> for RenderError {
    fn from(f: ApiFailure) -> Self {
        RenderError::Api {
            status: f.status,
            code: f.code,
            message: f.message,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        match &self.access_token {
            Some(token) => request.header(header::COOKIE, format!("{ACCESS_TOKEN_COOKIE}={token}")),
            None => request,
        }
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T, StoreError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(api_failure(response, fallback).await.into());
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Reads the `{"error": {"code", "message"}}` envelope, falling back to
/// `fallback` and `INTERNAL_ERROR` for whatever is missing.
async fn api_failure(response: Response, fallback: &str) -> ApiFailure {
    let status = response.status().as_u16();
    let body = response.bytes().await.unwrap_or_default();
    parse_failure(status, &body, fallback)
}

fn parse_failure(status: u16, body: &[u8], fallback: &str) -> ApiFailure {
    let error = serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error);
    let (code, message) = match error {
        Some(ErrorBody { code, message }) => (code, message),
        None => (None, None),
    };
    ApiFailure {
        status,
        code: code
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| FALLBACK_ERROR_CODE.to_string()),
        message: message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string()),
    }
}

#[async_trait]
impl RecordStore for ApiClient {
    async fn list(&self) -> Result<Vec<ResumeMetadata>, StoreError> {
        let body: ListResponse = self
            .send_json(
                self.request(reqwest::Method::GET, "/api/v1/resumes"),
                "Failed to list resumes",
            )
            .await?;
        Ok(body.resumes.unwrap_or_default())
    }

    async fn get(&self, id: &str) -> Result<ResumeRecord, StoreError> {
        self.send_json(
            self.request(reqwest::Method::GET, &format!("/api/v1/resumes/{id}")),
            "Failed to fetch resume",
        )
        .await
    }

    async fn create(&self, input: CreateResume) -> Result<ResumeRecord, StoreError> {
        let record: ResumeRecord = self
            .send_json(
                self.request(reqwest::Method::POST, "/api/v1/resumes").json(&input),
                "Failed to create resume",
            )
            .await?;
        debug!("Created resume {}", record.id);
        Ok(record)
    }

    async fn update(&self, id: &str, input: UpdateResume) -> Result<ResumeRecord, StoreError> {
        self.send_json(
            self.request(reqwest::Method::PATCH, &format!("/api/v1/resumes/{id}"))
                .json(&input),
            "Failed to update resume",
        )
        .await
    }
}

#[async_trait]
impl IdentityProvider for ApiClient {
    async fn current_user(&self) -> Result<Option<AuthenticatedUser>, IdentityError> {
        let response = self
            .request(reqwest::Method::GET, "/api/auth/session")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !status.is_success() {
            let failure = api_failure(response, "Failed to load session").await;
            return Err(IdentityError::Api {
                status: failure.status,
                message: failure.message,
            });
        }

        let session: SessionResponse = response.json().await?;
        Ok(session.user.and_then(|user| {
            let id = user.id.filter(|id| !id.trim().is_empty())?;
            Some(AuthenticatedUser {
                id,
                email: user.email.unwrap_or_default(),
            })
        }))
    }
}

#[async_trait]
impl RenderClient for ApiClient {
    async fn render(&self, request: &GeneratePdfRequest) -> Result<RenderedPdf, RenderError> {
        let response = self
            .request(reqwest::Method::POST, "/api/v1/resumes/generate-pdf")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let failure = api_failure(response, "Failed to generate PDF").await;
            warn!("PDF generation failed ({}): {}", failure.status, failure.message);
            return Err(failure.into());
        }

        let headers = response.headers();
        let content_type = header_string(headers, header::CONTENT_TYPE)
            .unwrap_or_else(|| "application/pdf".to_string());
        let content_disposition = header_string(headers, header::CONTENT_DISPOSITION);
        let bytes = response.bytes().await?;
        debug!("Received rendered PDF ({} bytes)", bytes.len());

        Ok(RenderedPdf {
            content_type,
            content_disposition,
            bytes,
        })
    }
}

fn header_string(headers: &header::HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
