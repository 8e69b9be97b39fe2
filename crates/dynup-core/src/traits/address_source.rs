// # Address Source Trait
//
// Defines the interface for resolving the host's current candidate
// addresses, at most one per IP version.
//
// ## Implementations
//
// - Interface table (getifaddrs): `dynup-addr-ifaces` crate
// - External-IP decorator (HTTP): `dynup-addr-external` crate
//
// ## Usage
//
// ```rust,ignore
// use dynup_core::AddressSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* AddressSource implementation */;
//
//     let addresses = source.current_addresses().await?;
//     if let Some(v4) = addresses.v4 {
//         println!("current IPv4: {v4}");
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// The version of the given address
    pub fn of(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

/// The host's candidate addresses for one resolution pass.
///
/// Holds at most one address per IP version. Built fresh on every
/// resolution; never persisted. The engine narrows a copy of this set
/// while planning, so mutation goes through the slot helpers rather
/// than field access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet {
    /// Candidate IPv4 address, if one was resolved
    pub v4: Option<Ipv4Addr>,
    /// Candidate IPv6 address, if one was resolved
    pub v6: Option<Ipv6Addr>,
}

impl AddressSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the slot matching the address's version.
    ///
    /// A second insert for the same version replaces the slot; sources
    /// resolve one address per version, so later wins.
    pub fn insert(&mut self, addr: IpAddr) {
        match addr {
            IpAddr::V4(v4) => self.v4 = Some(v4),
            IpAddr::V6(v6) => self.v6 = Some(v6),
        }
    }

    /// The address in the given version's slot, if any
    pub fn get(&self, version: IpVersion) -> Option<IpAddr> {
        match version {
            IpVersion::V4 => self.v4.map(IpAddr::V4),
            IpVersion::V6 => self.v6.map(IpAddr::V6),
        }
    }

    /// Empty the given version's slot
    pub fn clear(&mut self, version: IpVersion) {
        match version {
            IpVersion::V4 => self.v4 = None,
            IpVersion::V6 => self.v6 = None,
        }
    }

    /// Whether both slots are empty
    pub fn is_empty(&self) -> bool {
        self.v4.is_none() && self.v6.is_none()
    }

    /// The filled slots, v4 first
    pub fn addresses(&self) -> Vec<IpAddr> {
        let mut out = Vec::with_capacity(2);
        if let Some(v4) = self.v4 {
            out.push(IpAddr::V4(v4));
        }
        if let Some(v6) = self.v6 {
            out.push(IpAddr::V6(v6));
        }
        out
    }
}

/// Trait for address source implementations
///
/// An address source answers one question: which addresses does this
/// host currently want published? Implementations read live host state
/// (interface table, external lookup) on every call; the engine decides
/// what to do with the answer.
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Resolve the host's current candidate addresses
    ///
    /// Called once per reconciliation cycle. Must reflect the host's
    /// state at call time, without caching across calls.
    ///
    /// # Returns
    ///
    /// - `Ok(AddressSet)`: at most one address per IP version
    /// - `Err(Error::InterfaceUnavailable)`: a configured interface no
    ///   longer exists
    /// - `Err(Error::NoAddressesFound)`: resolution produced an empty set
    async fn current_addresses(&self) -> Result<AddressSet, crate::Error>;
}
