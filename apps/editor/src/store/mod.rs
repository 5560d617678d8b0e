//! Record store seam. The synchronization controller only ever talks to an
//! `Arc<dyn RecordStore>`; the HTTP client and the in-memory store plug in here.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::record::{CreateResume, ResumeMetadata, ResumeRecord, UpdateResume};

pub mod memory;

pub use memory::{InMemoryRecordStore, StoreOp};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Resume not found: {0}")]
    NotFound(String),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

/// Remote resume records, already scoped to the signed-in user by the
/// implementation.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self) -> Result<Vec<ResumeMetadata>, StoreError>;

    async fn get(&self, id: &str) -> Result<ResumeRecord, StoreError>;

    async fn create(&self, input: CreateResume) -> Result<ResumeRecord, StoreError>;

    async fn update(&self, id: &str, input: UpdateResume) -> Result<ResumeRecord, StoreError>;
}
