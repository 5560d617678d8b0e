//! Rendering seam used by the download flow.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::models::record::GeneratePdfRequest;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Renderer unavailable: {0}")]
    Unavailable(String),
}

/// A rendered document as returned by the rendering service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPdf {
    pub content_type: String,
    pub content_disposition: Option<String>,
    pub bytes: Bytes,
}

#[async_trait]
pub trait RenderClient: Send + Sync {
    async fn render(&self, request: &GeneratePdfRequest) -> Result<RenderedPdf, RenderError>;
}
