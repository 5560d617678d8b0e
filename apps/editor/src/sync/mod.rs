pub mod controller;
pub mod debounce;
pub mod local;

pub use controller::{SyncController, SyncError, SyncPhase};
pub use debounce::{Debouncer, DEBOUNCE_WINDOW};
pub use local::{FileLocalStore, LocalPersistence, LocalStore, LocalStoreError, MemoryLocalStore};
