use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Sync state of one tracked entity.
///
/// `Failed` is reported until the next attempt, which starts over from
/// `Unsynced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityState {
    #[default]
    Unsynced,
    Fetching,
    Persisted,
    Failed,
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unsynced => "unsynced",
            Self::Fetching => "fetching",
            Self::Persisted => "persisted",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Per-id state table.
#[derive(Debug, Default)]
pub(crate) struct StateTable {
    states: Mutex<HashMap<u64, EntityState>>,
}

impl StateTable {
    pub fn get(&self, id: u64) -> EntityState {
        self.lock().get(&id).copied().unwrap_or_default()
    }

    pub fn set(&self, id: u64, state: EntityState) {
        log::debug!("entity {id}: {state}");
        self.lock().insert(id, state);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, EntityState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
