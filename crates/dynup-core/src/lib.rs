// # dynup-core
//
// Core library for the dynup DNS reconciliation system.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping a hostname's
// DNS records in sync with a host's current addresses:
// - **AddressSource**: Trait for resolving the host's candidate addresses
// - **RecordStore**: Trait for listing, removing, and adding DNS records
// - **StateStore**: Trait for persisting the previous cycle's addresses
// - **ReconcileEngine**: Diffs desired addresses against provider records
//   and issues the minimal remove/add calls
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Poll-Driven**: One reconciliation pass per interval, nothing in between
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Idempotency**: Unchanged addresses issue zero provider calls

pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{InterfaceMap, Settings};
pub use engine::{CycleOutcome, ReconcileEngine, ReconcilePlan, ReconcileSummary};
pub use error::{Error, Result};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{AddressSet, AddressSource, CachedState, DnsRecord, IpVersion, RecordKind, RecordStore, StateStore};
