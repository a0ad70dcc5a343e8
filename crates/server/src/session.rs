use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;
use webbook_sheet::{Result, Workbook};

/// Per-upload editing state: the decoded workbook plus the original
/// container bytes, which the macro-preserving save patches in place.
///
/// A session exclusively owns its workbook; nothing is persisted unless
/// the user downloads a save or export artifact.
pub struct EditSession {
    pub book: Workbook,
    pub original: Vec<u8>,
    pub file_name: String,
}

impl EditSession {
    /// Decode uploaded container bytes into a fresh session
    pub fn new(file_name: &str, original: Vec<u8>) -> Result<Self> {
        let book = Workbook::from_xlsx_bytes(&original)?;
        Ok(EditSession {
            book,
            original,
            file_name: file_name.to_string(),
        })
    }

    /// Whether the upload was the macro-enabled container variant
    #[must_use]
    pub fn macro_enabled(&self) -> bool {
        self.file_name.to_ascii_lowercase().ends_with(".xlsm")
    }

    /// Discard one sheet's edits by re-reading it from the original bytes
    pub fn reset_sheet(&mut self, name: &str) -> Result<()> {
        let fresh = Workbook::from_xlsx_bytes(&self.original)?;
        let sheet = fresh.get_sheet(name)?.clone();
        *self.book.get_sheet_mut(name)? = sheet;
        Ok(())
    }
}

/// Shared map of live sessions, keyed by the id issued at upload.
///
/// Each request locks the store for its whole handler body, which gives
/// the synchronous one-interaction-at-a-time model the editor assumes.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, EditSession>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and return its id
    pub fn insert(&self, session: EditSession) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().insert(id, session);
        id
    }

    /// Run `f` against the named session, if it exists
    pub fn with_session<T>(&self, id: Uuid, f: impl FnOnce(&mut EditSession) -> T) -> Option<T> {
        let mut sessions = self.lock();
        sessions.get_mut(&id).map(f)
    }

    /// Drop a session
    pub fn remove(&self, id: Uuid) -> bool {
        self.lock().remove(&id).is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, EditSession>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
