// # Interface Address Source
//
// This crate resolves the host's candidate addresses from the live
// interface table (getifaddrs), one address per configured
// (IP version, interface) pair.
//
// ## Selection Rules
//
// - the interface named for a version must exist; a vanished interface
//   is fatal
// - loopback addresses never qualify
// - IPv6 link-local addresses (fe80::/10) never qualify
// - the first remaining address of the requested family on the
//   interface is chosen
//
// A configured family with no qualifying address leaves its slot empty
// (the host may simply have lost that family); only a fully empty
// result is fatal.

use async_trait::async_trait;
use dynup_core::config::InterfaceMap;
use dynup_core::traits::{AddressSet, AddressSource, IpVersion};
use dynup_core::{Error, Result};
use std::net::IpAddr;
use tracing::{debug, warn};

/// Address source reading the host's interface table
///
/// Reads the table fresh on every call; nothing is cached between
/// cycles, so an address change shows up on the next poll.
#[derive(Debug)]
pub struct InterfaceSource {
    interfaces: InterfaceMap,
}

impl InterfaceSource {
    /// Create an interface source for the configured mappings
    ///
    /// # Returns
    ///
    /// - `Ok(InterfaceSource)`: at least one version is mapped
    /// - `Err(Error::Config)`: the mapping is empty
    pub fn new(interfaces: InterfaceMap) -> Result<Self> {
        if interfaces.is_empty() {
            return Err(Error::config("No interfaces configured"));
        }
        Ok(Self { interfaces })
    }
}

#[async_trait]
impl AddressSource for InterfaceSource {
    async fn current_addresses(&self) -> Result<AddressSet> {
        let entries = snapshot()?;
        resolve_set(&self.interfaces, &entries)
    }
}

/// One interface-table entry, reduced to what selection needs
#[derive(Debug, Clone)]
struct IfaceAddr {
    interface: String,
    address: IpAddr,
}

/// Read the current interface table
fn snapshot() -> Result<Vec<IfaceAddr>> {
    let interfaces = if_addrs::get_if_addrs()?;
    debug!("Interface table holds {} entries", interfaces.len());

    Ok(interfaces
        .into_iter()
        .map(|entry| IfaceAddr {
            address: entry.ip(),
            interface: entry.name,
        })
        .collect())
}

/// Resolve the configured mappings against an interface-table snapshot
fn resolve_set(map: &InterfaceMap, entries: &[IfaceAddr]) -> Result<AddressSet> {
    let mut set = AddressSet::new();

    if let Some(interface) = &map.v4 {
        match select(IpVersion::V4, interface, entries)? {
            Some(addr) => set.insert(addr),
            None => warn!("No usable IPv4 address on {}", interface),
        }
    }
    if let Some(interface) = &map.v6 {
        match select(IpVersion::V6, interface, entries)? {
            Some(addr) => set.insert(addr),
            None => warn!("No usable IPv6 address on {}", interface),
        }
    }

    if set.is_empty() {
        return Err(Error::NoAddressesFound);
    }
    Ok(set)
}

/// Pick the first qualifying address of `version` on `interface`
///
/// # Returns
///
/// - `Ok(Some(addr))`: a qualifying address
/// - `Ok(None)`: the interface exists but holds no qualifying address
/// - `Err(Error::InterfaceUnavailable)`: no entry names the interface
fn select(version: IpVersion, interface: &str, entries: &[IfaceAddr]) -> Result<Option<IpAddr>> {
    let mut seen = false;
    for entry in entries.iter().filter(|e| e.interface == interface) {
        seen = true;
        if qualifies(version, entry.address) {
            return Ok(Some(entry.address));
        }
    }

    if !seen {
        return Err(Error::interface_unavailable(interface));
    }
    Ok(None)
}

/// Whether an address is publishable for the requested version
fn qualifies(version: IpVersion, addr: IpAddr) -> bool {
    match (version, addr) {
        (IpVersion::V4, IpAddr::V4(v4)) => !v4.is_loopback(),
        (IpVersion::V6, IpAddr::V6(v6)) => {
            // fe80::/10 is link-local
            !v6.is_loopback() && (v6.segments()[0] & 0xffc0) != 0xfe80
        }
        _ => false,
    }
}
