//! Conversation identity and the one-time auto-trigger flag.
//!
//! The identifier lives in durable storage (surviving restarts); the
//! auto-trigger flag lives in ephemeral storage (one browsing session).
//! Storage failures are never fatal: the manager keeps an in-memory value
//! for the rest of the page's life instead.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::WidgetConfig;
use crate::error::StorageError;

const RANDOM_SUFFIX_LEN: usize = 9;

/// String key/value storage, e.g. `localStorage` or `sessionStorage`
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A store that always fails, for environments without client storage
#[derive(Debug, Clone, Default)]
pub struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("no storage backend".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("no storage backend".to_string()))
    }
}

/// Produces and persists the conversation identifier and gates the
/// automatic open.
pub struct SessionIdentityManager {
    durable: Box<dyn KeyValueStore>,
    ephemeral: Box<dyn KeyValueStore>,
    session_key: String,
    auto_trigger_key: String,
    prefix: String,
    /// Identifier used when durable storage cannot hold it
    memory_id: RefCell<Option<String>>,
    /// Set once the auto-trigger fires in this page's life
    triggered_here: Cell<bool>,
}

impl SessionIdentityManager {
    pub fn new(
        durable: Box<dyn KeyValueStore>,
        ephemeral: Box<dyn KeyValueStore>,
        config: &WidgetConfig,
    ) -> Self {
        Self {
            durable,
            ephemeral,
            session_key: config.session_key.clone(),
            auto_trigger_key: config.auto_trigger_key.clone(),
            prefix: config.session_prefix.clone(),
            memory_id: RefCell::new(None),
            triggered_here: Cell::new(false),
        }
    }

    /// Return the stored identifier, creating and persisting one if absent.
    pub fn get_or_create_session_id(&self) -> String {
        if let Some(id) = self.memory_id.borrow().clone() {
            return id;
        }

        match self.durable.get(&self.session_key) {
            Ok(Some(id)) if !id.is_empty() => id,
            Ok(_) => {
                let id = self.generate_id();
                log::info!("Created new session id: {}", id);
                self.persist(&id);
                id
            }
            Err(e) => {
                log::warn!("Session storage unavailable, using in-memory id: {}", e);
                let id = self.generate_id();
                *self.memory_id.borrow_mut() = Some(id.clone());
                id
            }
        }
    }

    /// Take over an identifier issued by the server. Returns `true` when the
    /// stored identifier changed.
    pub fn adopt_server_session_id(&self, id: &str) -> bool {
        if id.is_empty() || self.get_or_create_session_id() == id {
            return false;
        }

        log::info!("Adopting server session id: {}", id);
        if self.memory_id.borrow().is_some() {
            *self.memory_id.borrow_mut() = Some(id.to_string());
        } else {
            self.persist(id);
        }
        true
    }

    /// Whether the automatic open has yet to fire in this browsing session
    pub fn should_auto_trigger(&self) -> bool {
        if self.triggered_here.get() {
            return false;
        }

        match self.ephemeral.get(&self.auto_trigger_key) {
            Ok(value) => value.as_deref() != Some("true"),
            Err(e) => {
                log::warn!("Auto-trigger storage unavailable: {}", e);
                true
            }
        }
    }

    pub fn mark_auto_triggered(&self) {
        self.triggered_here.set(true);
        if let Err(e) = self.ephemeral.set(&self.auto_trigger_key, "true") {
            log::warn!("Failed to persist auto-trigger flag: {}", e);
        }
    }

    fn persist(&self, id: &str) {
        if let Err(e) = self.durable.set(&self.session_key, id) {
            log::warn!("Failed to persist session id, keeping it in memory: {}", e);
            *self.memory_id.borrow_mut() = Some(id.to_string());
        }
    }

    fn generate_id(&self) -> String {
        let random = Uuid::new_v4().simple().to_string();
        format!(
            "{}{}_{}",
            self.prefix,
            Utc::now().timestamp_millis(),
            &random[..RANDOM_SUFFIX_LEN]
        )
    }
}
