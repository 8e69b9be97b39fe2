//! Core reconciliation engine
//!
//! The ReconcileEngine is responsible for:
//! - Resolving the host's current addresses via AddressSource
//! - Comparing them against the previous cycle's addresses
//! - Diffing desired addresses against the provider's records
//! - Issuing the minimal remove/add calls via RecordStore
//! - Persisting the cached state across cycles
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │ AddressSource │─── AddressSet ───┐
//! └───────────────┘                  │
//!                                    ▼
//!                          ┌─────────────────┐
//!                          │ ReconcileEngine │
//!                          └─────────────────┘
//!                                    │
//!                     ┌──────────────┴──────────────┐
//!                     │                             │
//!                     ▼                             ▼
//!             ┌──────────────┐             ┌────────────────┐
//!             │  StateStore  │             │  RecordStore   │
//!             │ (load/save)  │             │ (list/rm/add)  │
//!             └──────────────┘             └────────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Resolve the host's current addresses
//! 2. Compare against the cached previous addresses
//! 3. If neither version changed, stop (zero provider calls)
//! 4. Persist the updated cached state
//! 5. Diff desired addresses against the provider's records
//! 6. Apply the plan: all removes first, then adds
//!
//! The provider offers no in-place update, so a changed address is
//! always a remove of the old record followed by an add of the new one.

use crate::error::{Error, Result};
use crate::traits::{AddressSet, AddressSource, CachedState, DnsRecord, IpVersion, RecordStore, StateStore};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The write operations one reconciliation pass will issue.
///
/// Built as fresh collections from the listing and the desired set;
/// nothing is deleted out of a live list while iterating it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Records to remove, in listing order
    pub removals: Vec<DnsRecord>,
    /// Addresses to add, v4 first
    pub additions: Vec<IpAddr>,
}

impl ReconcilePlan {
    /// Diff the provider's records against the desired addresses.
    ///
    /// Only records whose name equals `hostname` participate. The pass
    /// narrows a copy of `desired` step by step:
    ///
    /// - a read-only record owns its IP version outright: the version's
    ///   slot is cleared, so nothing of that version gets added and any
    ///   editable record of that version becomes removable
    /// - an editable record whose value equals the desired address keeps
    ///   its slot satisfied (cleared, no write)
    /// - any other editable record is scheduled for removal, whether its
    ///   value went stale or its whole version did
    /// - whatever remains in the set is scheduled for addition
    pub fn build(hostname: &str, records: &[DnsRecord], desired: &AddressSet) -> Self {
        let mut pending = desired.clone();
        let mut removals = Vec::new();

        let ours: Vec<&DnsRecord> = records.iter().filter(|r| r.name == hostname).collect();

        for record in ours.iter().filter(|r| !r.editable) {
            if pending.get(record.version()).is_some() {
                debug!(
                    "Read-only {} record for {} suppresses local {} address",
                    record.kind, record.name, record.version()
                );
            }
            pending.clear(record.version());
        }

        for record in ours.iter().filter(|r| r.editable) {
            match pending.get(record.version()) {
                Some(addr) if addr == record.address => {
                    debug!("Record {} {} already current", record.name, record.value);
                    pending.clear(record.version());
                }
                Some(_) => removals.push((*record).clone()),
                None => removals.push((*record).clone()),
            }
        }

        let additions = pending.addresses();

        Self { removals, additions }
    }

    /// Whether the pass has nothing to write
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.additions.is_empty()
    }
}

/// What one pass actually did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Records removed
    pub removed: usize,
    /// Records added
    pub added: usize,
    /// Operations the provider refused
    pub rejected: usize,
}

/// Outcome of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Addresses unchanged; no provider traffic
    NoChange,
    /// Addresses changed; a reconciliation pass ran
    Reconciled(ReconcileSummary),
}

/// Core reconciliation engine
///
/// The engine orchestrates the address change → DNS reconciliation flow.
/// One instance manages one hostname.
///
/// ## Lifecycle
///
/// 1. Create with [`ReconcileEngine::new()`] (loads the cached state)
/// 2. Start with [`ReconcileEngine::run()`], or drive single cycles with
///    [`ReconcileEngine::update_if_necessary()`]
/// 3. Runs until a shutdown signal is received
///
/// ## State Discipline
///
/// The cached state is updated and persisted as soon as a change is
/// detected, before any provider write. A pass that then fails part-way
/// is not retried on the next cycle; the next write happens when the
/// address changes again. Skipping the retry keeps the quiet path free
/// of provider traffic.
pub struct ReconcileEngine {
    /// Source of the host's current addresses
    source: Box<dyn AddressSource>,

    /// Provider record client
    store: Box<dyn RecordStore>,

    /// Persistence for the cached state
    state_store: Box<dyn StateStore>,

    /// Hostname whose records are managed
    hostname: String,

    /// The previous cycle's addresses
    state: CachedState,
}

impl ReconcileEngine {
    /// Create a new engine
    ///
    /// Loads the cached state from the state store; a store with nothing
    /// persisted yields the loopback sentinels, so the first resolution
    /// always registers as a change.
    ///
    /// # Parameters
    ///
    /// - `source`: address source implementation
    /// - `store`: record store implementation
    /// - `state_store`: state store implementation
    /// - `hostname`: the managed hostname
    pub async fn new(
        source: Box<dyn AddressSource>,
        store: Box<dyn RecordStore>,
        state_store: Box<dyn StateStore>,
        hostname: impl Into<String>,
    ) -> Result<Self> {
        let state = state_store.load().await?;
        debug!("Loaded cached state: v4={} v6={}", state.v4, state.v6);

        Ok(Self {
            source,
            store,
            state_store,
            hostname: hostname.into(),
            state,
        })
    }

    /// The previous cycle's addresses, as the engine sees them
    pub fn cached_state(&self) -> CachedState {
        self.state
    }

    /// Run one cycle: resolve, compare, reconcile if anything changed
    ///
    /// # Returns
    ///
    /// - `Ok(CycleOutcome::NoChange)`: addresses match the cached state
    /// - `Ok(CycleOutcome::Reconciled(_))`: a pass ran (possibly writing
    ///   nothing, if DNS already agreed)
    /// - `Err(Error)`: resolution failed, or the pass was aborted
    pub async fn update_if_necessary(&mut self) -> Result<CycleOutcome> {
        let desired = self.source.current_addresses().await?;

        let mut changed = false;
        for version in [IpVersion::V4, IpVersion::V6] {
            if let Some(addr) = desired.get(version) {
                if self.state.get(version) != addr {
                    info!("{} address changed: {} -> {}", version, self.state.get(version), addr);
                    self.state.set(addr);
                    changed = true;
                }
            }
        }

        if !changed {
            debug!("Addresses unchanged, skipping reconciliation");
            return Ok(CycleOutcome::NoChange);
        }

        // Persist before writing to the provider. A failed save costs at
        // most one redundant pass after a restart.
        if let Err(e) = self.state_store.save(&self.state).await {
            warn!("Failed to persist cached state: {}", e);
        }

        let summary = self.reconcile(&desired).await?;
        Ok(CycleOutcome::Reconciled(summary))
    }

    /// One reconciliation pass: list, diff, apply
    async fn reconcile(&self, desired: &AddressSet) -> Result<ReconcileSummary> {
        let records = self.store.list_records().await?;
        debug!("Provider reports {} address records", records.len());

        let plan = ReconcilePlan::build(&self.hostname, &records, desired);
        if plan.is_empty() {
            info!("Records for {} already agree with current addresses", self.hostname);
            return Ok(ReconcileSummary::default());
        }

        self.apply(plan).await
    }

    /// Issue the plan's writes: every removal, then every addition.
    ///
    /// A rejected operation is logged and counted; the pass moves on. A
    /// transport failure propagates and aborts the remainder.
    async fn apply(&self, plan: ReconcilePlan) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        for record in &plan.removals {
            match self.store.remove_record(record).await {
                Ok(()) => {
                    info!("Removed {} record {} = {}", record.kind, record.name, record.value);
                    summary.removed += 1;
                }
                Err(e @ Error::ProviderRejected { .. }) => {
                    error!("Provider refused removal of {} = {}: {}", record.name, record.value, e);
                    summary.rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }

        for address in &plan.additions {
            match self.store.add_record(&self.hostname, *address).await {
                Ok(()) => {
                    info!("Added record {} = {}", self.hostname, address);
                    summary.added += 1;
                }
                Err(e @ Error::ProviderRejected { .. }) => {
                    error!("Provider refused addition of {} = {}: {}", self.hostname, address, e);
                    summary.rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(summary)
    }

    /// Run the engine
    ///
    /// Runs one cycle per `interval` tick (the first immediately) until
    /// a shutdown signal is received.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: clean shutdown
    /// - `Err(Error)`: fatal error
    pub async fn run(&mut self, interval: Duration) -> Result<()> {
        self.run_internal(interval, None).await
    }

    /// Internal run implementation that accepts an optional shutdown signal
    ///
    /// # Parameters
    ///
    /// - `shutdown_rx`: optional oneshot receiver to trigger shutdown (for testing)
    async fn run_internal(
        &mut self,
        interval: Duration,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        info!(
            "Engine started for {} (interval {}s)",
            self.hostname,
            interval.as_secs()
        );
        let mut ticker = tokio::time::interval(interval);

        if let Some(mut rx) = shutdown_rx {
            // Test mode: wait for provided shutdown signal
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_cycle().await?;
                    }

                    _ = &mut rx => {
                        info!("Shutdown signal received");
                        break;
                    }
                }
            }
        } else {
            // Production mode: wait for SIGINT
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_cycle().await?;
                    }

                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown signal received");
                        break;
                    }
                }
            }
        }

        info!("Engine stopped");
        Ok(())
    }

    /// One loop iteration: run a cycle, keep going on operational noise
    async fn run_cycle(&mut self) -> Result<()> {
        match self.update_if_necessary().await {
            Ok(CycleOutcome::NoChange) => {}
            Ok(CycleOutcome::Reconciled(summary)) => {
                info!(
                    "Reconciled {}: removed {}, added {}, rejected {}",
                    self.hostname, summary.removed, summary.added, summary.rejected
                );
            }
            Err(e) if !e.is_fatal() => {
                warn!("Reconciliation pass aborted: {}", e);
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Test-only helper to run the engine with a controlled shutdown signal
    ///
    /// Production daemon code should use `run()` instead, which manages
    /// shutdown via the OS signal.
    pub async fn run_with_shutdown(
        &mut self,
        interval: Duration,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(interval, shutdown_rx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::RecordKind;

    fn record(name: &str, value: &str, editable: bool) -> DnsRecord {
        let address: IpAddr = value.parse().unwrap();
        DnsRecord {
            name: name.to_string(),
            kind: RecordKind::for_address(address),
            address,
            value: value.to_string(),
            editable,
        }
    }

    fn desired(v4: Option<&str>, v6: Option<&str>) -> AddressSet {
        let mut set = AddressSet::new();
        if let Some(v4) = v4 {
            set.insert(v4.parse().unwrap());
        }
        if let Some(v6) = v6 {
            set.insert(v6.parse().unwrap());
        }
        set
    }

    const HOST: &str = "home.example.com";

    #[test]
    fn first_run_plans_a_single_add() {
        let plan = ReconcilePlan::build(HOST, &[], &desired(Some("203.0.113.7"), None));

        assert!(plan.removals.is_empty());
        assert_eq!(plan.additions, vec!["203.0.113.7".parse::<IpAddr>().unwrap()]);
    }

    #[test]
    fn matching_records_plan_nothing() {
        let records = vec![
            record(HOST, "203.0.113.7", true),
            record(HOST, "2001:db8::7", true),
        ];
        let plan = ReconcilePlan::build(
            HOST,
            &records,
            &desired(Some("203.0.113.7"), Some("2001:db8::7")),
        );

        assert!(plan.is_empty());
    }

    #[test]
    fn changed_address_plans_remove_then_add() {
        let records = vec![
            record(HOST, "1.2.3.4", true),
            record(HOST, "2001:db8::7", true),
        ];
        let plan = ReconcilePlan::build(
            HOST,
            &records,
            &desired(Some("5.6.7.8"), Some("2001:db8::7")),
        );

        assert_eq!(plan.removals.len(), 1);
        assert_eq!(plan.removals[0].value, "1.2.3.4");
        assert_eq!(plan.additions, vec!["5.6.7.8".parse::<IpAddr>().unwrap()]);
        // The matching AAAA record is untouched
        assert!(plan.removals.iter().all(|r| r.kind == RecordKind::A));
    }

    #[test]
    fn read_only_record_suppresses_its_version() {
        let records = vec![record(HOST, "9.9.9.9", false)];
        let plan = ReconcilePlan::build(HOST, &records, &desired(Some("203.0.113.7"), None));

        // Not removable, and the local address must not be added either
        assert!(plan.is_empty());
    }

    #[test]
    fn read_only_record_outranks_matching_editable() {
        let records = vec![
            record(HOST, "9.9.9.9", false),
            record(HOST, "203.0.113.7", true),
        ];
        let plan = ReconcilePlan::build(HOST, &records, &desired(Some("203.0.113.7"), None));

        // The editable duplicate goes; nothing gets added back
        assert_eq!(plan.removals.len(), 1);
        assert_eq!(plan.removals[0].value, "203.0.113.7");
        assert!(plan.additions.is_empty());
    }

    #[test]
    fn stale_record_is_removed_without_replacement() {
        let records = vec![
            record(HOST, "203.0.113.7", true),
            record(HOST, "2001:db8::dead", true),
        ];
        let plan = ReconcilePlan::build(HOST, &records, &desired(Some("203.0.113.7"), None));

        assert_eq!(plan.removals.len(), 1);
        assert_eq!(plan.removals[0].kind, RecordKind::Aaaa);
        assert!(plan.additions.is_empty());
    }

    #[test]
    fn other_hostnames_are_ignored() {
        let records = vec![
            record("other.example.com", "1.2.3.4", true),
            record("mail.example.com", "2001:db8::99", false),
        ];
        let plan = ReconcilePlan::build(HOST, &records, &desired(Some("203.0.113.7"), None));

        assert!(plan.removals.is_empty());
        assert_eq!(plan.additions.len(), 1);
    }

    #[test]
    fn duplicate_matching_records_keep_only_the_first() {
        let records = vec![
            record(HOST, "203.0.113.7", true),
            record(HOST, "203.0.113.7", true),
        ];
        let plan = ReconcilePlan::build(HOST, &records, &desired(Some("203.0.113.7"), None));

        // The first listing satisfies the slot; the duplicate goes
        assert_eq!(plan.removals.len(), 1);
        assert!(plan.additions.is_empty());
    }

    #[test]
    fn versions_are_planned_independently() {
        let records = vec![
            record(HOST, "1.2.3.4", true),
            record(HOST, "2001:db8::7", true),
        ];
        let plan = ReconcilePlan::build(
            HOST,
            &records,
            &desired(Some("5.6.7.8"), Some("2001:db8::7")),
        );

        assert!(plan.removals.iter().all(|r| r.version() == IpVersion::V4));
        assert!(plan.additions.iter().all(|a| a.is_ipv4()));
    }
}
