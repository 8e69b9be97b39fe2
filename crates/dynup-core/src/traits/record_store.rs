// # Record Store Trait
//
// Defines the interface for reading and mutating DNS records at the
// provider. The provider API is add/remove only; there is no in-place
// update, which is why the engine replaces a record by removing the old
// one and adding the new one.
//
// ## Implementations
//
// - DreamHost: `dynup-provider-dreamhost` crate
//
// ## Usage
//
// ```rust,ignore
// use dynup_core::RecordStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* RecordStore implementation */;
//
//     for record in store.list_records().await? {
//         println!("{} {} {}", record.name, record.kind, record.value);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::IpAddr;

use crate::traits::address_source::IpVersion;

/// DNS record type for an address record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
}

impl RecordKind {
    /// The record type that carries addresses of the given version
    pub fn for_address(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::A,
            IpAddr::V6(_) => Self::Aaaa,
        }
    }

    /// The IP version this record type carries
    pub fn version(&self) -> IpVersion {
        match self {
            Self::A => IpVersion::V4,
            Self::Aaaa => IpVersion::V6,
        }
    }

    /// The type name as it appears on the wire ("A" / "AAAA")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
        }
    }

    /// Parse a wire type name; `None` for anything that is not an
    /// address record (MX, TXT, CNAME, ...)
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "A" => Some(Self::A),
            "AAAA" => Some(Self::Aaaa),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One address record as the provider reports it.
///
/// `value` is the provider's own text for the record, kept verbatim so a
/// removal echoes exactly what the provider stores. `address` is the
/// parsed form the engine compares with. The two describe the same
/// address; only `value` goes back over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Fully-qualified record name
    pub name: String,
    /// Record type (A or AAAA)
    pub kind: RecordKind,
    /// Parsed record value
    pub address: IpAddr,
    /// Provider-reported value text, unmodified
    pub value: String,
    /// Whether the provider lets this record be changed
    pub editable: bool,
}

impl DnsRecord {
    /// The IP version this record belongs to
    pub fn version(&self) -> IpVersion {
        self.kind.version()
    }
}

/// Trait for DNS record store implementations
///
/// Implementations are thin request/response clients: one API call per
/// method, structured records in and out, no retries and no opinions
/// about what should change. Deciding what to remove or add is the
/// engine's job.
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List every address record the provider reports.
    ///
    /// Returns records for all hostnames on the account; the engine
    /// filters by hostname. Entries that are not address records, or
    /// whose value does not parse as an address, are dropped at this
    /// boundary.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<DnsRecord>)`: all A/AAAA records
    /// - `Err(Error::Transport)`: request or response-decoding failure
    /// - `Err(Error::ProviderRejected)`: the provider refused the listing
    async fn list_records(&self) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Remove one record.
    ///
    /// The record must identify itself exactly as the provider reported
    /// it (name, type, verbatim value); anything else is refused
    /// remotely.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: removed
    /// - `Err(Error::ProviderRejected)`: the provider refused this record
    /// - `Err(Error::Transport)`: request or response-decoding failure
    async fn remove_record(&self, record: &DnsRecord) -> Result<(), crate::Error>;

    /// Add an address record for the hostname.
    ///
    /// The record type follows the address version (A for v4, AAAA for
    /// v6).
    ///
    /// # Returns
    ///
    /// - `Ok(())`: added
    /// - `Err(Error::ProviderRejected)`: the provider refused the record
    /// - `Err(Error::Transport)`: request or response-decoding failure
    async fn add_record(&self, hostname: &str, address: IpAddr) -> Result<(), crate::Error>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}
