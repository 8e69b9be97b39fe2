// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// A state store that doesn't persist across restarts. Useful for
// testing, one-shot runs, or containers where the extra reconciliation
// pass after a restart is acceptable.
//
// ## Crash Behavior
//
// - All state is lost on restart/crash
// - The first cycle afterwards sees the sentinel state and reconciles

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{CachedState, StateStore};

/// In-memory state store implementation
///
/// Holds the [`CachedState`] behind a RwLock. Provides no persistence
/// across restarts.
///
/// # Example
///
/// ```rust,no_run
/// use dynup_core::state::MemoryStateStore;
/// use dynup_core::traits::state_store::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///
///     let mut state = store.load().await?;
///     state.set("203.0.113.7".parse()?);
///     store.save(&state).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<CachedState>>,
}

impl MemoryStateStore {
    /// Create a memory state store holding the sentinel state
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CachedState::default())),
        }
    }

    /// Create a memory state store seeded with the given state
    pub fn with_state(state: CachedState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<CachedState, Error> {
        Ok(*self.inner.read().await)
    }

    async fn save(&self, state: &CachedState) -> Result<(), Error> {
        *self.inner.write().await = *state;
        Ok(())
    }
}
