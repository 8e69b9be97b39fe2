// # File State Store
//
// File-based implementation of StateStore.
//
// ## Purpose
//
// Persists the previous cycle's addresses across daemon restarts, so a
// restart with unchanged addresses issues no provider traffic.
//
// ## File Format
//
// Two lines of text: the IPv4 address, then the IPv6 address.
//
// ```text
// 203.0.113.7
// 2001:db8::7
// ```
//
// A missing file is created with the loopback sentinels. A line that
// does not parse falls back to the sentinel for that slot; the cost is
// one redundant reconciliation pass, never a failed start.
//
// ## Crash Safety
//
// Writes go to a temporary file first and are renamed into place, so a
// crash mid-write leaves the previous state intact.

use async_trait::async_trait;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::state_store::{CachedState, StateStore};

/// File-based state store
///
/// Persists the [`CachedState`] as a two-line text file with atomic
/// writes. The engine owns the in-memory state; this store only moves
/// it to and from disk.
///
/// # Example
///
/// ```rust,no_run
/// use dynup_core::state::FileStateStore;
/// use dynup_core::traits::state_store::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/dynup/last_addresses").await?;
///
///     let mut state = store.load().await?;
///     state.set("203.0.113.7".parse()?);
///     store.save(&state).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Open a file state store, creating the file if needed
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. If the file does not exist, write it with the sentinel state
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let store = Self { path };
        if !store.path.exists() {
            tracing::debug!(
                "State file {} does not exist, seeding with sentinels",
                store.path.display()
            );
            store.write_state(&CachedState::default()).await?;
        }

        Ok(store)
    }

    /// Parse file contents into a state, falling back per slot.
    ///
    /// Line 1 is the IPv4 address, line 2 the IPv6 address. A missing or
    /// unparseable line yields the loopback sentinel for that slot with
    /// a warning.
    fn parse_state(content: &str) -> CachedState {
        let mut lines = content.lines();
        let defaults = CachedState::default();

        let v4 = match lines.next().map(str::trim) {
            Some(line) if !line.is_empty() => match line.parse::<Ipv4Addr>() {
                Ok(addr) => addr,
                Err(_) => {
                    tracing::warn!(
                        "Unparseable IPv4 line in state file ({line:?}), using sentinel"
                    );
                    defaults.v4
                }
            },
            _ => {
                tracing::warn!("State file missing IPv4 line, using sentinel");
                defaults.v4
            }
        };

        let v6 = match lines.next().map(str::trim) {
            Some(line) if !line.is_empty() => match line.parse::<Ipv6Addr>() {
                Ok(addr) => addr,
                Err(_) => {
                    tracing::warn!(
                        "Unparseable IPv6 line in state file ({line:?}), using sentinel"
                    );
                    defaults.v6
                }
            },
            _ => {
                tracing::warn!("State file missing IPv6 line, using sentinel");
                defaults.v6
            }
        };

        CachedState { v4, v6 }
    }

    /// Render a state in the two-line file format
    fn render_state(state: &CachedState) -> String {
        format!("{}\n{}\n", state.v4, state.v6)
    }

    /// Write state to file atomically (temp file, then rename)
    async fn write_state(&self, state: &CachedState) -> Result<(), Error> {
        let content = Self::render_state(state);

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(content.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<CachedState, Error> {
        if !self.path.exists() {
            tracing::debug!("State file does not exist: {}", self.path.display());
            return Ok(CachedState::default());
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to read state file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(Self::parse_state(&content))
    }

    async fn save(&self, state: &CachedState) -> Result<(), Error> {
        self.write_state(state).await
    }
}
