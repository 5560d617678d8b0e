use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::models::record::{CreateResume, ResumeMetadata, ResumeRecord, UpdateResume};
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Get,
    Create,
    Update,
}

/// Process-local record store. Keeps records in insertion order, counts calls
/// per operation, and can simulate latency or outages for a given operation.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<ResumeRecord>>,
    failing: Mutex<HashSet<StoreOp>>,
    latency: Duration,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ResumeRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Every operation sleeps for `latency` before touching the records.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_failing(&self, op: StoreOp, failing: bool) {
        let mut set = lock(&self.failing);
        if failing {
            set.insert(op);
        } else {
            set.remove(&op);
        }
    }

    pub fn calls(&self, op: StoreOp) -> usize {
        self.counter(op).load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<ResumeRecord> {
        lock(&self.records).clone()
    }

    fn counter(&self, op: StoreOp) -> &AtomicUsize {
        match op {
            StoreOp::List => &self.list_calls,
            StoreOp::Get => &self.get_calls,
            StoreOp::Create => &self.create_calls,
            StoreOp::Update => &self.update_calls,
        }
    }

    async fn enter(&self, op: StoreOp) -> Result<(), StoreError> {
        self.counter(op).fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if lock(&self.failing).contains(&op) {
            return Err(StoreError::Unavailable(format!("{op:?} is failing")));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list(&self) -> Result<Vec<ResumeMetadata>, StoreError> {
        self.enter(StoreOp::List).await?;
        Ok(lock(&self.records).iter().map(ResumeRecord::metadata).collect())
    }

    async fn get(&self, id: &str) -> Result<ResumeRecord, StoreError> {
        self.enter(StoreOp::Get).await?;
        lock(&self.records)
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, input: CreateResume) -> Result<ResumeRecord, StoreError> {
        self.enter(StoreOp::Create).await?;
        let now = Utc::now().to_rfc3339();
        let record = ResumeRecord {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            template_id: input.template_id,
            document: input.document,
            created_at: now.clone(),
            updated_at: now,
        };
        debug!("Created in-memory resume {}", record.id);
        lock(&self.records).push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, input: UpdateResume) -> Result<ResumeRecord, StoreError> {
        self.enter(StoreOp::Update).await?;
        let mut records = lock(&self.records);
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(title) = input.title {
            record.title = title;
        }
        if let Some(template_id) = input.template_id {
            record.template_id = template_id;
        }
        if let Some(document) = input.document {
            record.document = document;
        }
        record.updated_at = Utc::now().to_rfc3339();
        Ok(record.clone())
    }
}
