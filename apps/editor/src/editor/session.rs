//! One user's editing session.
//!
//! Owns the live `EditorState` and wires every change through the reducer,
//! the debounced local writer and the sync controller. The download flow
//! flushes pending cloud changes before asking for a render.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::editor::reducer::{reduce, EditorAction};
use crate::editor::validation::{download_filename, validate_for_download};
use crate::identity::{IdentityError, IdentityProvider};
use crate::models::document::EditorState;
use crate::models::record::{AuthenticatedUser, GeneratePdfRequest};
use crate::render::{RenderClient, RenderError, RenderedPdf};
use crate::store::RecordStore;
use crate::sync::controller::{SyncController, SyncError};
use crate::sync::debounce::{Debouncer, DEBOUNCE_WINDOW};
use crate::sync::local::{LocalPersistence, LocalStore};

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Sign in to edit your resume")]
    Unauthenticated,

    #[error("Failed to resolve the signed-in user: {0}")]
    Identity(#[from] IdentityError),

    #[error("Resume is not ready for download: {}", .0.join(" "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Failed to generate PDF: {0}")]
    Render(#[from] RenderError),
}

/// A rendered resume and the name to save it under.
#[derive(Debug, Clone)]
pub struct DownloadedPdf {
    pub filename: String,
    pub pdf: RenderedPdf,
}

pub struct EditorSession {
    user: AuthenticatedUser,
    state: watch::Sender<EditorState>,
    local: LocalPersistence,
    local_writer: Debouncer,
    sync: SyncController,
    renderer: Arc<dyn RenderClient>,
}

impl EditorSession {
    /// Builds an unhydrated session for `user`. Call [`EditorSession::hydrate`]
    /// before expecting anything to be persisted.
    pub fn new(
        user: AuthenticatedUser,
        store: Arc<dyn RecordStore>,
        local_store: Arc<dyn LocalStore>,
        renderer: Arc<dyn RenderClient>,
    ) -> Self {
        let (state, snapshot) = watch::channel(EditorState::default());
        let local = LocalPersistence::new(local_store, user.id.clone());
        let sync = SyncController::new(user.id.clone(), store, local.clone(), snapshot);
        Self {
            user,
            state,
            local,
            local_writer: Debouncer::new(DEBOUNCE_WINDOW),
            sync,
            renderer,
        }
    }

    /// Resolves the signed-in user, then builds and hydrates their session.
    pub async fn open(
        identity: &dyn IdentityProvider,
        store: Arc<dyn RecordStore>,
        local_store: Arc<dyn LocalStore>,
        renderer: Arc<dyn RenderClient>,
    ) -> Result<Self, EditorError> {
        let user = identity
            .current_user()
            .await?
            .ok_or(EditorError::Unauthenticated)?;
        info!("Opening editor session for user {}", user.id);

        let session = Self::new(user, store, local_store, renderer);
        session.hydrate().await;
        Ok(session)
    }

    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }

    pub fn sync(&self) -> &SyncController {
        &self.sync
    }

    /// Latest state; reflects every dispatch that has returned.
    pub fn state(&self) -> EditorState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EditorState> {
        self.state.subscribe()
    }

    pub fn local_save_pending(&self) -> bool {
        self.local_writer.is_pending()
    }

    /// Loads the hydrated state and pushes it through the normal change path,
    /// so a reset baseline is picked up by autosave.
    pub async fn hydrate(&self) {
        if let Some(hydrated) = self.sync.hydrate().await {
            self.apply(EditorAction::LoadState(Box::new(hydrated)));
        }
        self.schedule_local_save();
        self.sync.notify_changed();
    }

    /// Applies `action` and restarts the save windows. Persistence is only
    /// scheduled when called within a tokio runtime; elsewhere the state
    /// still changes and a warning is logged.
    pub fn dispatch(&self, action: EditorAction) {
        if self.apply(action) {
            self.schedule_local_save();
            self.sync.notify_changed();
        }
    }

    /// Persists unsaved document changes now.
    pub async fn flush(&self) -> Result<(), EditorError> {
        self.sync.flush().await?;
        Ok(())
    }

    /// Validates, flushes, then renders the latest state.
    pub async fn download_pdf(&self) -> Result<DownloadedPdf, EditorError> {
        let errors = validate_for_download(&self.state.borrow().document);
        if !errors.is_empty() {
            return Err(EditorError::Validation(errors));
        }

        self.sync.flush().await?;

        let state = self.state();
        let pdf = self
            .renderer
            .render(&GeneratePdfRequest::from_state(&state))
            .await?;
        Ok(DownloadedPdf {
            filename: download_filename(&state.document),
            pdf,
        })
    }

    fn apply(&self, action: EditorAction) -> bool {
        self.state.send_if_modified(|state| {
            let next = reduce(state.clone(), action);
            if next == *state {
                return false;
            }
            *state = next;
            true
        })
    }

    fn schedule_local_save(&self) {
        if !self.sync.is_ready() {
            return;
        }
        let local = self.local.clone();
        let snapshot = self.state.subscribe();
        self.local_writer.schedule(async move {
            let state = snapshot.borrow().clone();
            if let Err(e) = local.save_state(&state).await {
                warn!("Failed to save local state: {e}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::editor::reducer::{PersonalInfoField, Section};
    use crate::identity::StaticIdentity;
    use crate::store::{InMemoryRecordStore, StoreOp};
    use crate::sync::local::MemoryLocalStore;

    /// Records how many records the store held when each render arrived.
    struct RecordingRenderer {
        store: Arc<InMemoryRecordStore>,
        seen: Mutex<Vec<(usize, GeneratePdfRequest)>>,
    }

    #[async_trait]
    impl RenderClient for RecordingRenderer {
        async fn render(&self, request: &GeneratePdfRequest) -> Result<RenderedPdf, RenderError> {
            self.seen
                .lock()
                .unwrap()
                .push((self.store.records().len(), request.clone()));
            Ok(RenderedPdf {
                content_type: "application/pdf".to_string(),
                content_disposition: None,
                bytes: Bytes::from_static(b"%PDF"),
            })
        }
    }

    struct Fixture {
        store: Arc<InMemoryRecordStore>,
        local: LocalPersistence,
        renderer: Arc<RecordingRenderer>,
        session: EditorSession,
    }

    fn user() -> AuthenticatedUser {
        AuthenticatedUser {
            id: "user-1".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    fn fixture(store: InMemoryRecordStore) -> Fixture {
        let store = Arc::new(store);
        let local_store: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());
        let renderer = Arc::new(RecordingRenderer {
            store: store.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let session = EditorSession::new(user(), store.clone(), local_store.clone(), renderer.clone());
        Fixture {
            store,
            local: LocalPersistence::new(local_store, "user-1"),
            renderer,
            session,
        }
    }

    fn set(session: &EditorSession, field: PersonalInfoField, value: &str) {
        session.dispatch(EditorAction::UpdatePersonalInfo {
            field,
            value: value.to_string(),
        });
    }

    fn fill_downloadable(session: &EditorSession) {
        set(session, PersonalInfoField::FirstName, "Ada");
        set(session, PersonalInfoField::LastName, "Lovelace");
        session.dispatch(EditorAction::AddEntry {
            section: Section::Education,
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_flushes_before_rendering() {
        let f = fixture(InMemoryRecordStore::new().with_latency(Duration::from_millis(200)));
        f.session.hydrate().await;
        fill_downloadable(&f.session);
        f.session.dispatch(EditorAction::SetPhoto("data:image/png;base64,abc".to_string()));

        let download = f.session.download_pdf().await.unwrap();

        assert_eq!(download.filename, "Ada_Lovelace_Resume.pdf");
        assert_eq!(&download.pdf.bytes[..], b"%PDF");
        assert_eq!(f.store.calls(StoreOp::Create), 1);

        let seen = f.renderer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (records_at_render, request) = &seen[0];
        assert_eq!(*records_at_render, 1);
        assert_eq!(request.data.personal_info.first_name, "Ada");
        assert_eq!(request.photo, None);
    }

    #[tokio::test]
    async fn test_invalid_document_is_neither_flushed_nor_rendered() {
        let f = fixture(InMemoryRecordStore::new());
        f.session.hydrate().await;
        set(&f.session, PersonalInfoField::FirstName, "Ada");

        match f.session.download_pdf().await {
            Err(EditorError::Validation(errors)) => {
                assert_eq!(
                    errors,
                    vec![
                        "Last name is required.".to_string(),
                        "Add at least one education, experience, project, or technical skill entry."
                            .to_string(),
                    ]
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(f.store.calls(StoreOp::Create), 0);
        assert!(f.renderer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_flush_blocks_render() {
        let f = fixture(InMemoryRecordStore::new());
        f.session.hydrate().await;
        fill_downloadable(&f.session);
        f.store.set_failing(StoreOp::Create, true);

        let err = f.session.download_pdf().await.unwrap_err();

        assert!(matches!(err, EditorError::Sync(SyncError::Persist(_))));
        assert!(f.renderer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_save_is_debounced() {
        let f = fixture(InMemoryRecordStore::new());
        f.session.hydrate().await;
        set(&f.session, PersonalInfoField::FirstName, "Ada");
        assert!(f.session.local_save_pending());

        tokio::time::sleep(Duration::from_millis(1490)).await;
        assert!(f.local.load_state().await.is_none());

        tokio::time::sleep(Duration::from_millis(20)).await;
        let saved = f.local.load_state().await.unwrap();
        assert_eq!(saved.document.personal_info.first_name, "Ada");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_during_hydration_updates_memory_only() {
        let f = fixture(InMemoryRecordStore::new().with_latency(Duration::from_millis(100)));

        tokio::join!(f.session.hydrate(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            set(&f.session, PersonalInfoField::FirstName, "Ada");
            assert_eq!(f.session.state().document.personal_info.first_name, "Ada");
            assert!(!f.session.local_save_pending());
            assert!(!f.session.sync().autosave_pending());
        });

        assert!(f.session.sync().is_ready());
        assert_eq!(f.session.state().document.personal_info.first_name, "Ada");
    }

    #[tokio::test]
    async fn test_noop_action_does_not_schedule_writes() {
        let f = fixture(InMemoryRecordStore::new());
        f.session.hydrate().await;
        f.session.local_writer.cancel();

        f.session.dispatch(EditorAction::RemoveEntry {
            section: Section::Project,
            index: 3,
        });

        assert!(!f.session.local_save_pending());
        assert!(!f.session.sync().autosave_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_session_cancels_timers() {
        let f = fixture(InMemoryRecordStore::new());
        f.session.hydrate().await;
        set(&f.session, PersonalInfoField::FirstName, "Ada");

        let Fixture {
            store,
            local,
            session,
            ..
        } = f;
        drop(session);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(local.load_state().await.is_none());
        assert_eq!(store.calls(StoreOp::Create), 0);
    }

    #[tokio::test]
    async fn test_open_requires_signed_in_user() {
        let store = Arc::new(InMemoryRecordStore::new());
        let local_store: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());
        let renderer = Arc::new(RecordingRenderer {
            store: store.clone(),
            seen: Mutex::new(Vec::new()),
        });

        let anonymous = EditorSession::open(
            &StaticIdentity(None),
            store.clone(),
            local_store.clone(),
            renderer.clone(),
        )
        .await;
        assert!(matches!(anonymous, Err(EditorError::Unauthenticated)));

        let session = EditorSession::open(&StaticIdentity(Some(user())), store, local_store, renderer)
            .await
            .unwrap();
        assert_eq!(session.user().id, "user-1");
        assert!(session.sync().is_ready());
    }

    #[test]
    fn test_dispatch_outside_runtime_updates_state_without_scheduling() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();
        let f = fixture(InMemoryRecordStore::new());
        rt.block_on(async {
            f.session.hydrate().await;
            tokio::time::sleep(Duration::from_secs(2)).await;
        });
        assert!(f.session.sync().is_ready());
        assert_eq!(f.store.records().len(), 1);

        set(&f.session, PersonalInfoField::FirstName, "Ada");

        assert_eq!(f.session.state().document.personal_info.first_name, "Ada");
        assert!(!f.session.local_save_pending());
        assert!(!f.session.sync().autosave_pending());
        assert!(f.session.sync().has_unsaved_changes());
        assert_eq!(f.store.records().len(), 1);
    }
}
