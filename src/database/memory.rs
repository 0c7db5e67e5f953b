use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::ContentStore;
use crate::content::{ContentId, ContentRecord, ContentUpdate, NewContent};
use crate::errors::PersistenceError;

#[derive(Debug, Default)]
struct MemoryState {
    next_id: ContentId,
    records: BTreeMap<ContentId, ContentRecord>,
    fail_creates: bool,
    fail_updates: bool,
}

/// Content store kept in process memory, used for dry runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create` fail
    pub fn fail_creates(self) -> Self {
        self.state.lock().fail_creates = true;
        self
    }

    /// Make every subsequent `update` fail
    pub fn fail_updates(self) -> Self {
        self.state.lock().fail_updates = true;
        self
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all stored records ordered by id
    pub fn records(&self) -> Vec<ContentRecord> {
        self.state.lock().records.values().cloned().collect()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn create(&self, content: &NewContent) -> Result<ContentId, PersistenceError> {
        let mut state = self.state.lock();
        if state.fail_creates {
            return Err(PersistenceError::Database("simulated create failure".to_string()));
        }

        state.next_id += 1;
        let id = state.next_id;
        state
            .records
            .insert(id, ContentRecord::from_new(id, content, Utc::now()));
        Ok(id)
    }

    async fn update(&self, id: ContentId, update: &ContentUpdate) -> Result<(), PersistenceError> {
        let mut state = self.state.lock();
        if state.fail_updates {
            return Err(PersistenceError::Database("simulated update failure".to_string()));
        }

        let record = state
            .records
            .get_mut(&id)
            .ok_or(PersistenceError::NotFound(id))?;
        record.apply(update, Utc::now())
    }

    async fn get(&self, id: ContentId) -> Result<Option<ContentRecord>, PersistenceError> {
        Ok(self.state.lock().records.get(&id).cloned())
    }
}
