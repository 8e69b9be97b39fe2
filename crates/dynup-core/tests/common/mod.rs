//! Test doubles and common utilities for engine contract tests
//!
//! Minimal mocks over the three component traits. Provider writes land
//! in one shared, ordered operation log, so tests can assert not just
//! how often the engine wrote but in what order.

#![allow(dead_code)]

use async_trait::async_trait;
use dynup_core::traits::{
    AddressSet, AddressSource, CachedState, DnsRecord, RecordKind, RecordStore, StateStore,
};
use dynup_core::{CycleOutcome, Error, ReconcileEngine, Result};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Hostname the contract engines manage
pub const TEST_HOST: &str = "home.example.com";

/// One provider write, as the mock record store observed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOp {
    /// A record was removed (name plus verbatim value text)
    Remove { name: String, value: String },
    /// A record was added
    Add { name: String, address: IpAddr },
}

/// A record as the provider would report it
pub fn provider_record(name: &str, value: &str, editable: bool) -> DnsRecord {
    let address: IpAddr = value.parse().expect("test record value parses");
    DnsRecord {
        name: name.to_string(),
        kind: RecordKind::for_address(address),
        address,
        value: value.to_string(),
        editable,
    }
}

/// An address set with the given slots filled
pub fn addresses(v4: Option<&str>, v6: Option<&str>) -> AddressSet {
    let mut set = AddressSet::new();
    if let Some(v4) = v4 {
        set.insert(v4.parse().expect("test v4 address parses"));
    }
    if let Some(v6) = v6 {
        set.insert(v6.parse().expect("test v6 address parses"));
    }
    set
}

/// An address source serving a shared, settable address set
pub struct FixedAddressSource {
    set: Arc<Mutex<AddressSet>>,
    call_count: Arc<AtomicUsize>,
}

impl FixedAddressSource {
    pub fn new(set: AddressSet) -> Self {
        Self {
            set: Arc::new(Mutex::new(set)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a FixedAddressSource sharing state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            set: Arc::clone(&other.set),
            call_count: Arc::clone(&other.call_count),
        }
    }

    /// Replace the set every later resolution returns
    pub fn set_addresses(&self, set: AddressSet) {
        *self.set.lock().unwrap() = set;
    }

    /// Get the number of times current_addresses() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressSource for FixedAddressSource {
    async fn current_addresses(&self) -> Result<AddressSet> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.set.lock().unwrap().clone())
    }
}

/// An address source whose configured interface is gone
pub struct FailingAddressSource;

#[async_trait]
impl AddressSource for FailingAddressSource {
    async fn current_addresses(&self) -> Result<AddressSet> {
        Err(Error::interface_unavailable("eth0"))
    }
}

/// A record store backed by an in-memory record list.
///
/// Writes mutate the list, so a later listing reflects them. Every
/// instance created with `sharing_counters_with` observes the same
/// records, log, and counters, which lets a test keep a handle on a
/// store it handed to the engine.
pub struct MockRecordStore {
    /// Records the next listing returns
    records: Arc<Mutex<Vec<DnsRecord>>>,
    /// Successful writes, in issue order
    ops: Arc<Mutex<Vec<ProviderOp>>>,
    /// Call counter for list_records()
    list_call_count: Arc<AtomicUsize>,
    /// Write attempts the provider answers with a rejection
    rejected_values: Arc<Mutex<Vec<String>>>,
    /// Rejected write attempts observed
    rejected_count: Arc<AtomicUsize>,
    /// Write attempts after this many fail with a transport error
    transport_after: Arc<AtomicUsize>,
    /// Write attempts seen so far (including failed ones)
    write_attempts: Arc<AtomicUsize>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn with_records(records: Vec<DnsRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            ops: Arc::new(Mutex::new(Vec::new())),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            rejected_values: Arc::new(Mutex::new(Vec::new())),
            rejected_count: Arc::new(AtomicUsize::new(0)),
            transport_after: Arc::new(AtomicUsize::new(usize::MAX)),
            write_attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a MockRecordStore sharing state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            ops: Arc::clone(&other.ops),
            list_call_count: Arc::clone(&other.list_call_count),
            rejected_values: Arc::clone(&other.rejected_values),
            rejected_count: Arc::clone(&other.rejected_count),
            transport_after: Arc::clone(&other.transport_after),
            write_attempts: Arc::clone(&other.write_attempts),
        }
    }

    /// Successful writes, in the order the engine issued them
    pub fn ops(&self) -> Vec<ProviderOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Get the number of times list_records() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of write attempts the provider rejected
    pub fn rejected_count(&self) -> usize {
        self.rejected_count.load(Ordering::SeqCst)
    }

    /// Answer any write touching this value text with a rejection
    pub fn reject_writes_of(&self, value: &str) {
        self.rejected_values.lock().unwrap().push(value.to_string());
    }

    /// Let the first `n` write attempts through, fail the rest with a
    /// transport error
    pub fn fail_transport_after(&self, n: usize) {
        self.transport_after.store(n, Ordering::SeqCst);
    }

    fn check_write(&self, command: &'static str, value: &str) -> Result<()> {
        let attempt = self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.transport_after.load(Ordering::SeqCst) {
            return Err(Error::transport("Connection reset by provider"));
        }

        if self.rejected_values.lock().unwrap().iter().any(|v| v == value) {
            self.rejected_count.fetch_add(1, Ordering::SeqCst);
            return Err(Error::rejected(command, "no_such_record"));
        }

        Ok(())
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn list_records(&self) -> Result<Vec<DnsRecord>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().clone())
    }

    async fn remove_record(&self, record: &DnsRecord) -> Result<()> {
        self.check_write("dns-remove_record", &record.value)?;

        self.records.lock().unwrap().retain(|r| {
            !(r.name == record.name && r.kind == record.kind && r.value == record.value)
        });
        self.ops.lock().unwrap().push(ProviderOp::Remove {
            name: record.name.clone(),
            value: record.value.clone(),
        });

        Ok(())
    }

    async fn add_record(&self, hostname: &str, address: IpAddr) -> Result<()> {
        self.check_write("dns-add_record", &address.to_string())?;

        self.records.lock().unwrap().push(DnsRecord {
            name: hostname.to_string(),
            kind: RecordKind::for_address(address),
            address,
            value: address.to_string(),
            editable: true,
        });
        self.ops.lock().unwrap().push(ProviderOp::Add {
            name: hostname.to_string(),
            address,
        });

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A state store that tracks calls and can refuse saves
pub struct MockStateStore {
    /// Persisted state; None until the first save
    state: Arc<Mutex<Option<CachedState>>>,
    /// Call counter for save()
    save_call_count: Arc<AtomicUsize>,
    /// When set, save() fails with a storage error
    fail_saves: Arc<AtomicBool>,
}

impl MockStateStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(None)),
            save_call_count: Arc::new(AtomicUsize::new(0)),
            fail_saves: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a store already holding the given per-version addresses
    pub fn with_addresses(v4: &str, v6: &str) -> Self {
        let state = CachedState {
            v4: v4.parse().expect("test v4 address parses"),
            v6: v6.parse().expect("test v6 address parses"),
        };
        let store = Self::new();
        *store.state.lock().unwrap() = Some(state);
        store
    }

    /// Create a MockStateStore sharing state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            state: Arc::clone(&other.state),
            save_call_count: Arc::clone(&other.save_call_count),
            fail_saves: Arc::clone(&other.fail_saves),
        }
    }

    /// Get the number of times save() was called
    pub fn save_call_count(&self) -> usize {
        self.save_call_count.load(Ordering::SeqCst)
    }

    /// The last persisted state, if any save succeeded
    pub fn saved(&self) -> Option<CachedState> {
        *self.state.lock().unwrap()
    }

    /// Make every save() fail with a storage error
    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StateStore for MockStateStore {
    async fn load(&self) -> Result<CachedState> {
        Ok(self.state.lock().unwrap().unwrap_or_default())
    }

    async fn save(&self, state: &CachedState) -> Result<()> {
        self.save_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::state_store("Disk full"));
        }
        *self.state.lock().unwrap() = Some(*state);
        Ok(())
    }
}

/// Build an engine over the mocks, run one cycle, hand back the record
/// store handle and the outcome
pub async fn run_single_pass(
    desired: AddressSet,
    records: Vec<DnsRecord>,
    cached: (&str, &str),
) -> (MockRecordStore, CycleOutcome) {
    let source = FixedAddressSource::new(desired);
    let store = MockRecordStore::with_records(records);
    let handle = MockRecordStore::sharing_counters_with(&store);
    let state_store = MockStateStore::with_addresses(cached.0, cached.1);

    let mut engine = ReconcileEngine::new(
        Box::new(source),
        Box::new(store),
        Box::new(state_store),
        TEST_HOST,
    )
    .await
    .expect("engine construction succeeds");

    let outcome = engine.update_if_necessary().await.expect("cycle succeeds");
    (handle, outcome)
}
