// # State Store Trait
//
// Defines the interface for persisting the previous cycle's addresses.
//
// ## Purpose
//
// The cached state lets the engine skip provider traffic entirely when
// nothing changed: a cycle whose resolved addresses equal the cached
// ones issues zero API calls. It also survives restarts, so a restart
// with unchanged addresses stays quiet.
//
// ## Implementations
//
// - File-based: two-line text file (see `state::FileStateStore`)
// - In-memory: ephemeral runs and tests (see `state::MemoryStateStore`)
//
// ## Usage
//
// ```rust
// use dynup_core::StateStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* StateStore implementation */;
//
//     let previous = store.load().await?;
//     println!("last known IPv4: {}", previous.v4);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::traits::address_source::IpVersion;

/// The previous cycle's addresses, one slot per IP version.
///
/// Before the first successful resolution both slots hold the loopback
/// sentinels. Loopback is never a publishable address, so the first real
/// resolution always compares as changed and triggers the initial
/// reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedState {
    /// Last known IPv4 address
    pub v4: Ipv4Addr,
    /// Last known IPv6 address
    pub v6: Ipv6Addr,
}

impl Default for CachedState {
    fn default() -> Self {
        Self {
            v4: Ipv4Addr::LOCALHOST,
            v6: Ipv6Addr::LOCALHOST,
        }
    }
}

impl CachedState {
    /// The slot for the given version
    pub fn get(&self, version: IpVersion) -> IpAddr {
        match version {
            IpVersion::V4 => IpAddr::V4(self.v4),
            IpVersion::V6 => IpAddr::V6(self.v6),
        }
    }

    /// Overwrite the slot matching the address's version
    pub fn set(&mut self, addr: IpAddr) {
        match addr {
            IpAddr::V4(v4) => self.v4 = v4,
            IpAddr::V6(v6) => self.v6 = v6,
        }
    }
}

/// Trait for state store implementations
///
/// One durable value: the [`CachedState`]. Implementations must be
/// thread-safe and usable across async tasks.
///
/// # Load semantics
///
/// `load` never invents data: a store with nothing persisted yet returns
/// the sentinel state rather than an error, so callers need no
/// first-run special case.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted state, or the sentinel state if none exists
    ///
    /// # Returns
    ///
    /// - `Ok(CachedState)`: the persisted (or sentinel) state
    /// - `Err(Error)`: storage error
    async fn load(&self) -> Result<CachedState, crate::Error>;

    /// Persist the given state
    ///
    /// # Returns
    ///
    /// - `Ok(())`: durably written
    /// - `Err(Error)`: storage error
    async fn save(&self, state: &CachedState) -> Result<(), crate::Error>;
}
