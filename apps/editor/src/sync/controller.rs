//! Cloud synchronization controller.
//!
//! One controller per user session keeps exactly one remote record in step
//! with the in-memory document:
//!
//! - `hydrate` decides once between local content and the newest remote record;
//! - `notify_changed` debounces autosaves (failures are logged and retried on
//!   the next change);
//! - `flush` persists on demand and reports failure to the caller.
//!
//! Persists are serialized by one async mutex. A caller that finds a persist in
//! flight waits for it, then re-checks the diff against the baseline before
//! writing, so overlapping triggers never create two records.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::document::EditorState;
use crate::models::record::{pick_most_recent, CreateResume, ResumeRecord, UpdateResume};
use crate::store::{RecordStore, StoreError};
use crate::sync::debounce::{Debouncer, DEBOUNCE_WINDOW};
use crate::sync::local::LocalPersistence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Uninitialized,
    Hydrating,
    Ready,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to save resume to cloud: {0}")]
    Persist(#[from] StoreError),

    #[error("Persist task did not complete: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

#[derive(Debug, Default)]
struct SyncCells {
    phase: SyncPhase,
    active_id: Option<String>,
    /// Canonical JSON of the last document the store acknowledged.
    baseline: String,
}

struct SyncInner {
    user_id: String,
    store: Arc<dyn RecordStore>,
    local: LocalPersistence,
    snapshot: watch::Receiver<EditorState>,
    cells: Mutex<SyncCells>,
    persist_lock: Arc<tokio::sync::Mutex<()>>,
    autosave: Debouncer,
}

pub struct SyncController {
    inner: Arc<SyncInner>,
}

impl SyncController {
    /// `snapshot` must always hold the latest dispatched state.
    pub fn new(
        user_id: impl Into<String>,
        store: Arc<dyn RecordStore>,
        local: LocalPersistence,
        snapshot: watch::Receiver<EditorState>,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                user_id: user_id.into(),
                store,
                local,
                snapshot,
                cells: Mutex::new(SyncCells::default()),
                persist_lock: Arc::new(tokio::sync::Mutex::new(())),
                autosave: Debouncer::new(DEBOUNCE_WINDOW),
            }),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.inner.cells().phase
    }

    pub fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    pub fn active_id(&self) -> Option<String> {
        self.inner.cells().active_id.clone()
    }

    pub fn baseline(&self) -> String {
        self.inner.cells().baseline.clone()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.inner.has_unsaved_changes()
    }

    pub fn autosave_pending(&self) -> bool {
        self.inner.autosave.is_pending()
    }

    /// Picks the session's starting state and marks the controller ready.
    ///
    /// Returns the state the session should load, or `None` to keep the
    /// current in-memory state. Remote failures never escape: the session
    /// continues locally.
    pub async fn hydrate(&self) -> Option<EditorState> {
        let inner = &self.inner;
        *inner.cells() = SyncCells {
            phase: SyncPhase::Hydrating,
            ..SyncCells::default()
        };

        let active_id = inner.local.read_active_id().await;
        let local_state = inner.local.load_state().await;

        if let Some(local) = local_state {
            if active_id.is_some() || !local.is_empty_scaffold() {
                info!(
                    "Hydrated user {} from local state (active resume: {:?})",
                    inner.user_id, active_id
                );
                // Empty baseline: the first autosave or flush always runs.
                inner.finish_hydration(active_id, String::new());
                return Some(local);
            }

            info!(
                "Local state for user {} is an empty scaffold; trying cloud hydration",
                inner.user_id
            );
            return Some(inner.hydrate_from_cloud(Some(local)).await);
        }

        info!("No local state for user {}; trying cloud hydration", inner.user_id);
        let current = inner.current();
        let hydrated = inner.hydrate_from_cloud(None).await;
        (hydrated != current).then_some(hydrated)
    }

    /// Called after every state change. Restarts the autosave window when the
    /// document differs from the baseline. Must run within a tokio runtime
    /// for the autosave to be scheduled.
    pub fn notify_changed(&self) {
        self.inner.notify_changed();
    }

    /// Persists the latest document now, after any persist already in flight.
    /// Does nothing before hydration completes.
    pub async fn flush(&self) -> Result<(), SyncError> {
        if !self.inner.is_ready() {
            debug!("Flush skipped for user {}: not hydrated", self.inner.user_id);
            return Ok(());
        }
        self.inner.persist_if_needed().await.map(|_| ())
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.inner.autosave.cancel();
    }
}

impl SyncInner {
    fn cells(&self) -> MutexGuard<'_, SyncCells> {
        self.cells
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current(&self) -> EditorState {
        self.snapshot.borrow().clone()
    }

    fn is_ready(&self) -> bool {
        self.cells().phase == SyncPhase::Ready
    }

    fn has_unsaved_changes(&self) -> bool {
        let current = self.snapshot.borrow().document.to_canonical_json();
        current != self.cells().baseline
    }

    fn finish_hydration(&self, active_id: Option<String>, baseline: String) {
        *self.cells() = SyncCells {
            phase: SyncPhase::Ready,
            active_id,
            baseline,
        };
    }

    /// Adopts the newest remote record, keeping settings and photo from
    /// `local` (or the in-memory state). Falls back to that state when the
    /// store is empty or unreachable.
    async fn hydrate_from_cloud(&self, local: Option<EditorState>) -> EditorState {
        let fetched = self.fetch_latest().await;
        let base = local.unwrap_or_else(|| self.current());

        match fetched {
            Ok(Some(record)) => {
                info!(
                    "Loaded cloud resume {} for user {}",
                    record.id, self.user_id
                );
                if let Err(e) = self.local.write_active_id(&record.id).await {
                    warn!("Failed to cache active resume id {}: {e}", record.id);
                }
                let baseline = record.document.to_canonical_json();
                self.finish_hydration(Some(record.id), baseline);
                EditorState {
                    document: record.document,
                    settings: base.settings,
                    photo: base.photo,
                }
            }
            Ok(None) => {
                info!("No cloud resumes for user {}; staying local", self.user_id);
                self.finish_hydration(None, base.document.to_canonical_json());
                base
            }
            Err(e) => {
                warn!(
                    "Cloud hydration failed for user {}: {e}; continuing with local state",
                    self.user_id
                );
                self.finish_hydration(None, base.document.to_canonical_json());
                base
            }
        }
    }

    async fn fetch_latest(&self) -> Result<Option<ResumeRecord>, StoreError> {
        let listing = self.store.list().await?;
        let Some(latest) = pick_most_recent(&listing) else {
            return Ok(None);
        };
        debug!("Fetching most recent resume {}", latest.id);
        self.store.get(&latest.id).await.map(Some)
    }

    fn notify_changed(self: &Arc<Self>) {
        if !self.is_ready() {
            return;
        }
        if !self.has_unsaved_changes() {
            self.autosave.cancel();
            return;
        }

        let weak = Arc::downgrade(self);
        self.autosave.schedule(async move {
            if let Some(inner) = weak.upgrade() {
                if let Err(e) = inner.persist_if_needed().await {
                    warn!(
                        "Autosave failed for user {}: {e}; retrying on next change",
                        inner.user_id
                    );
                }
            }
        });
    }

    /// Returns whether a write was issued.
    async fn persist_if_needed(self: &Arc<Self>) -> Result<bool, SyncError> {
        // The diff is only meaningful once any in-flight persist has landed.
        let guard = Arc::clone(&self.persist_lock).lock_owned().await;
        if !self.has_unsaved_changes() {
            return Ok(false);
        }

        // Detached so a started create always records its id, even if the
        // caller stops waiting.
        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            let result = inner.persist().await;
            drop(guard);
            if result.is_ok() && inner.has_unsaved_changes() {
                debug!(
                    "Document changed during persist for user {}; rescheduling autosave",
                    inner.user_id
                );
                inner.notify_changed();
            }
            result
        });
        task.await??;
        Ok(true)
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let document = self.current().document;
        let fingerprint = document.to_canonical_json();
        let active_id = self.cells().active_id.clone();

        match active_id {
            None => {
                info!("Creating cloud resume for user {}", self.user_id);
                let record = self.store.create(CreateResume::with_defaults(document)).await?;
                {
                    let mut cells = self.cells();
                    cells.active_id = Some(record.id.clone());
                    cells.baseline = fingerprint;
                }
                if let Err(e) = self.local.write_active_id(&record.id).await {
                    warn!("Failed to cache active resume id {}: {e}", record.id);
                }
            }
            Some(id) => {
                debug!("Updating cloud resume {id} for user {}", self.user_id);
                self.store.update(&id, UpdateResume::document(document)).await?;
                self.cells().baseline = fingerprint;
            }
        }
        Ok(())
    }
}
