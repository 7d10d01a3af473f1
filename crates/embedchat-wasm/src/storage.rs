use embedchat_core::{KeyValueStore, StorageError};
use web_sys::Storage;

/// `localStorage` or `sessionStorage`, if the page may use it
pub struct BrowserStore {
    storage: Option<Storage>,
    scope: &'static str,
}

impl BrowserStore {
    /// Durable, per-profile storage
    pub fn local() -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        Self::with(storage, "localStorage")
    }

    /// Storage for the current browsing session
    pub fn session() -> Self {
        let storage = web_sys::window().and_then(|w| w.session_storage().ok().flatten());
        Self::with(storage, "sessionStorage")
    }

    fn with(storage: Option<Storage>, scope: &'static str) -> Self {
        if storage.is_none() {
            log::warn!("{} is not available", scope);
        }
        Self { storage, scope }
    }

    fn storage(&self) -> Result<&Storage, StorageError> {
        self.storage
            .as_ref()
            .ok_or_else(|| StorageError::Unavailable(self.scope.to_string()))
    }
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?
            .get_item(key)
            .map_err(|e| StorageError::Access {
                key: key.to_string(),
                reason: format!("{:?}", e),
            })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Access {
                key: key.to_string(),
                reason: format!("{:?}", e),
            })
    }
}
