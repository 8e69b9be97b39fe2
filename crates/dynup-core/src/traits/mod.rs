//! Core traits for the dynup system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressSource`]: Resolve the host's current candidate addresses
//! - [`RecordStore`]: Read and mutate DNS records via the provider API
//! - [`StateStore`]: Persist the previous cycle's addresses

pub mod address_source;
pub mod record_store;
pub mod state_store;

pub use address_source::{AddressSet, AddressSource, IpVersion};
pub use record_store::{DnsRecord, RecordKind, RecordStore};
pub use state_store::{CachedState, StateStore};
