//! Server-side forwarding of render requests to the PDF service.
//!
//! Every forwarded request is signed as this service. Whatever the PDF
//! service answers (status, content type, disposition and body) is handed
//! back untouched; only transport failures become errors.

use bytes::Bytes;
use reqwest::{header, Client, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::PdfServiceConfig;
use crate::signing::{RequestSigner, SignError};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("PDF service signing secret is not configured")]
    MissingSecret,

    #[error("Invalid PDF service URL '{0}'")]
    InvalidServiceUrl(String),

    #[error("Failed to sign PDF request: {0}")]
    Signing(#[from] SignError),

    #[error("Failed to reach PDF service: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// The PDF service's answer, whatever its status.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct PdfProxy {
    client: Client,
    config: PdfServiceConfig,
}

impl PdfProxy {
    pub fn new(config: PdfServiceConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Signs and forwards `body` as a `POST` to the configured service URL.
    /// Configuration problems are reported before any network call.
    pub async fn forward(
        &self,
        body: Bytes,
        content_type: &str,
    ) -> Result<UpstreamResponse, ProxyError> {
        let secret = self
            .config
            .hmac_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ProxyError::MissingSecret)?;
        let url = Url::parse(&self.config.url)
            .map_err(|_| ProxyError::InvalidServiceUrl(self.config.url.clone()))?;

        let signer = RequestSigner::new(&self.config.service_id, secret);
        let auth = signer.sign("POST", url.path(), &body)?;
        debug!(
            "Forwarding {} byte render request to {} (nonce {})",
            body.len(),
            url,
            auth.nonce
        );

        let request = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, content_type)
            .body(body);
        let response = auth.apply(request).send().await?;

        let status = response.status();
        let content_type = header_string(response.headers(), header::CONTENT_TYPE);
        let content_disposition = header_string(response.headers(), header::CONTENT_DISPOSITION);
        let body = response.bytes().await?;
        info!("PDF service answered {status} ({} bytes)", body.len());

        Ok(UpstreamResponse {
            status,
            content_type,
            content_disposition,
            body,
        })
    }
}

fn header_string(headers: &header::HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: Option<&str>, url: &str) -> PdfServiceConfig {
        PdfServiceConfig {
            url: url.to_string(),
            service_id: "resume-editor".to_string(),
            hmac_secret: secret.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_missing_or_blank_secret_fails_before_network() {
        // Port 9 on an unused documentation address; never contacted.
        let url = "http://192.0.2.1:9/api/v1/resumes/generate-pdf";
        for secret in [None, Some(""), Some("   ")] {
            let proxy = PdfProxy::new(config(secret, url));
            let result = proxy.forward(Bytes::from_static(b"{}"), "application/json").await;
            assert!(matches!(result, Err(ProxyError::MissingSecret)));
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_a_configuration_error() {
        let proxy = PdfProxy::new(config(Some("s3cret"), "not a url"));
        let result = proxy.forward(Bytes::new(), "application/json").await;
        assert!(matches!(result, Err(ProxyError::InvalidServiceUrl(_))));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_upstream_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let proxy = PdfProxy::new(config(
            Some("s3cret"),
            &format!("http://{addr}/api/v1/resumes/generate-pdf"),
        ));
        let result = proxy.forward(Bytes::from_static(b"{}"), "application/json").await;
        assert!(matches!(result, Err(ProxyError::Upstream(_))));
    }
}
