//! VersionRegistry — catalog of behavior versions and per-tenant assignments.
//!
//! The registry owns the version lifecycle state machine, the single
//! assignment row per tenant, and the append-only performance snapshot log
//! used as the regression baseline. It is the only component allowed to
//! mutate tenant assignments; the rollout orchestrator calls back into it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;
use tracing::{debug, info};

use verge_state::{
    BehaviorVersion, ComponentSpec, Event, EventKind, EventSink, KeyedLock, PerformanceSnapshot,
    StateStore, TenantVersionAssignment, VersionStatus, epoch_secs,
};

use crate::error::{RegistryError, RegistryResult};

// ── Inputs ─────────────────────────────────────────────────────────

/// Insertion-checked component map for [`VersionRegistry::create_version`].
///
/// Rejects duplicate component types at insert time, so a version can never
/// be created with two components of the same kind.
#[derive(Debug, Clone, Default)]
pub struct ComponentSet {
    inner: std::collections::HashMap<String, ComponentSpec>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component. Fails if `kind` is already present.
    pub fn insert(&mut self, kind: &str, spec: ComponentSpec) -> RegistryResult<()> {
        if self.inner.contains_key(kind) {
            return Err(RegistryError::Validation(format!(
                "duplicate component type: {kind}"
            )));
        }
        self.inner.insert(kind.to_string(), spec);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn into_inner(self) -> std::collections::HashMap<String, ComponentSpec> {
        self.inner
    }
}

/// Registry policy knobs.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Whether re-assigning the version a tenant already has zeroes its
    /// counters. Defaults to `false`: re-assignment of the same version is
    /// a complete no-op apart from `updated_at`.
    pub reset_counters_on_reassign: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reset_counters_on_reassign: false,
        }
    }
}

// ── Registry ───────────────────────────────────────────────────────

/// The version catalog and tenant assignment authority.
///
/// `Clone` + `Send` + `Sync`; clones share the underlying store, event sink,
/// and per-tenant locks.
#[derive(Clone)]
pub struct VersionRegistry {
    store: StateStore,
    events: Arc<dyn EventSink>,
    config: RegistryConfig,
    /// Serializes assignment read-modify-write cycles per tenant.
    tenant_locks: Arc<KeyedLock>,
    seq: Arc<AtomicU64>,
}

impl VersionRegistry {
    pub fn new(store: StateStore, events: Arc<dyn EventSink>, config: RegistryConfig) -> Self {
        Self {
            store,
            events,
            config,
            tenant_locks: Arc::new(KeyedLock::new()),
            seq: Arc::new(AtomicU64::new(1)),
        }
    }

    fn next_version_id(&self) -> String {
        format!(
            "bv-{}-{:06}",
            epoch_secs(),
            self.seq.fetch_add(1, Ordering::Relaxed)
        )
    }

    // ── Version catalog ────────────────────────────────────────────

    /// Create a new behavior version in `Draft`.
    pub fn create_version(
        &self,
        name: &str,
        tag: &str,
        components: ComponentSet,
        created_by: &str,
        description: &str,
        changelog: &str,
    ) -> RegistryResult<BehaviorVersion> {
        if components.is_empty() {
            return Err(RegistryError::Validation(
                "version must declare at least one component".to_string(),
            ));
        }

        let version = BehaviorVersion {
            id: self.next_version_id(),
            name: name.to_string(),
            tag: tag.to_string(),
            components: components.into_inner(),
            status: VersionStatus::Draft,
            created_by: created_by.to_string(),
            description: description.to_string(),
            changelog: changelog.to_string(),
            created_at: epoch_secs(),
        };
        self.store.put_version(&version)?;

        info!(version = %version.id, name = %version.name, "behavior version created");
        self.events.emit(Event::new(
            EventKind::VersionCreated,
            &version.id,
            json!({
                "name": version.name,
                "tag": version.tag,
                "created_by": created_by,
                "component_count": version.components.len(),
            }),
        ));
        Ok(version)
    }

    /// Advance a version's lifecycle state.
    ///
    /// The component map never changes; `status` is the only mutable field
    /// of a version record.
    pub fn promote_version(
        &self,
        version_id: &str,
        to_status: VersionStatus,
        promoted_by: &str,
    ) -> RegistryResult<BehaviorVersion> {
        let mut version = self
            .store
            .get_version(version_id)?
            .ok_or_else(|| RegistryError::VersionNotFound(version_id.to_string()))?;

        let from = version.status;
        if !from.can_transition_to(to_status) {
            return Err(RegistryError::InvalidTransition {
                from,
                to: to_status,
            });
        }

        version.status = to_status;
        self.store.put_version(&version)?;

        info!(version = %version.id, %from, to = %to_status, by = promoted_by, "version promoted");
        self.events.emit(Event::new(
            EventKind::VersionPromoted,
            &version.id,
            json!({
                "from": from,
                "to": to_status,
                "promoted_by": promoted_by,
            }),
        ));
        Ok(version)
    }

    /// Get a version by id; absence is not an error.
    pub fn get_version(&self, version_id: &str) -> RegistryResult<Option<BehaviorVersion>> {
        Ok(self.store.get_version(version_id)?)
    }

    /// List versions newest-first, optionally filtered by status.
    pub fn list_versions(
        &self,
        status: Option<VersionStatus>,
    ) -> RegistryResult<Vec<BehaviorVersion>> {
        let mut versions = self.store.list_versions()?;
        if let Some(wanted) = status {
            versions.retain(|v| v.status == wanted);
        }
        Ok(versions)
    }

    // ── Tenant assignment ──────────────────────────────────────────

    /// Bind a version to a tenant (upsert).
    ///
    /// Changing versions moves the old one into `previous_version_id` and
    /// zeroes the counters — they track performance since activation, not
    /// lifetime. Re-assigning the version a tenant already has leaves
    /// `previous_version_id` alone; whether it zeroes counters is the
    /// `reset_counters_on_reassign` policy knob.
    pub fn assign_version_to_tenant(
        &self,
        tenant_id: &str,
        version_id: &str,
        activated_by: &str,
    ) -> RegistryResult<TenantVersionAssignment> {
        let version = self
            .store
            .get_version(version_id)?
            .ok_or_else(|| RegistryError::VersionNotFound(version_id.to_string()))?;
        if !version.status.is_assignable() {
            return Err(RegistryError::InvalidVersionState {
                version_id: version_id.to_string(),
                status: version.status,
            });
        }

        self.tenant_locks.with(tenant_id, || {
            let now = epoch_secs();
            let assignment = match self.store.get_assignment(tenant_id)? {
                Some(mut existing) if existing.behavior_version_id == version_id => {
                    if self.config.reset_counters_on_reassign {
                        existing.reset_counters();
                        existing.activated_at = now;
                    }
                    existing.updated_at = now;
                    existing
                }
                Some(mut existing) => {
                    existing.previous_version_id = Some(existing.behavior_version_id.clone());
                    existing.behavior_version_id = version_id.to_string();
                    existing.reset_counters();
                    existing.activated_by = activated_by.to_string();
                    existing.activated_at = now;
                    existing.updated_at = now;
                    existing
                }
                None => TenantVersionAssignment::new(tenant_id, version_id, activated_by, now),
            };
            self.store.put_assignment(&assignment)?;

            debug!(tenant = tenant_id, version = version_id, "version assigned");
            self.events.emit(Event::new(
                EventKind::VersionAssigned,
                version_id,
                json!({
                    "tenant_id": tenant_id,
                    "previous_version_id": assignment.previous_version_id,
                    "activated_by": activated_by,
                }),
            ));
            Ok(assignment)
        })
    }

    /// Get a tenant's current assignment; absence is not an error.
    pub fn get_tenant_version(
        &self,
        tenant_id: &str,
    ) -> RegistryResult<Option<TenantVersionAssignment>> {
        Ok(self.store.get_assignment(tenant_id)?)
    }

    /// Overwrite a tenant's counters with authoritative cumulative counts
    /// for the current activation period, and append a snapshot to the
    /// tenant+version log.
    ///
    /// Counts must be consistent: successes plus fallbacks cannot exceed
    /// decisions, or the derived rates leave the [0, 1] range.
    #[allow(clippy::too_many_arguments)]
    pub fn update_tenant_metrics(
        &self,
        tenant_id: &str,
        decision_count: u64,
        success_count: u64,
        fallback_count: u64,
        avg_confidence: f64,
        avg_trust_score: f64,
    ) -> RegistryResult<TenantVersionAssignment> {
        if success_count.saturating_add(fallback_count) > decision_count {
            return Err(RegistryError::Validation(format!(
                "success_count ({success_count}) + fallback_count ({fallback_count}) \
                 exceed decision_count ({decision_count}) for tenant {tenant_id}"
            )));
        }
        self.tenant_locks.with(tenant_id, || {
            let mut assignment = self
                .store
                .get_assignment(tenant_id)?
                .ok_or_else(|| RegistryError::AssignmentNotFound(tenant_id.to_string()))?;

            let now = epoch_secs();
            assignment.decision_count = decision_count;
            assignment.success_count = success_count;
            assignment.fallback_count = fallback_count;
            assignment.avg_confidence = avg_confidence;
            assignment.avg_trust_score = avg_trust_score;
            assignment.updated_at = now;
            self.store.put_assignment(&assignment)?;

            let snapshot = PerformanceSnapshot::from_assignment(&assignment, now);
            self.store.append_snapshot(&snapshot)?;

            self.events.emit(Event::new(
                EventKind::MetricsUpdated,
                &assignment.behavior_version_id,
                json!({
                    "tenant_id": tenant_id,
                    "decision_count": decision_count,
                    "success_rate": snapshot.success_rate,
                }),
            ));
            Ok(assignment)
        })
    }

    /// Revert a tenant to its previous version.
    ///
    /// After the swap `previous_version_id` is cleared, so a second
    /// consecutive rollback fails — there is deliberately no "redo".
    /// Counters of the restored version are not reset; they resume from
    /// whatever was last recorded for it, which may be stale.
    pub fn rollback_tenant_version(
        &self,
        tenant_id: &str,
        rolled_back_by: &str,
        reason: &str,
    ) -> RegistryResult<TenantVersionAssignment> {
        self.tenant_locks.with(tenant_id, || {
            let mut assignment = self
                .store
                .get_assignment(tenant_id)?
                .ok_or_else(|| RegistryError::AssignmentNotFound(tenant_id.to_string()))?;

            let restored = assignment
                .previous_version_id
                .take()
                .ok_or_else(|| RegistryError::NoPreviousVersion(tenant_id.to_string()))?;
            let replaced = std::mem::replace(&mut assignment.behavior_version_id, restored.clone());

            let now = epoch_secs();
            assignment.activated_by = rolled_back_by.to_string();
            assignment.activated_at = now;
            assignment.updated_at = now;
            self.store.put_assignment(&assignment)?;

            info!(
                tenant = tenant_id,
                restored = %restored,
                replaced = %replaced,
                reason,
                "tenant rolled back"
            );
            self.events.emit(Event::new(
                EventKind::TenantRolledBack,
                &restored,
                json!({
                    "tenant_id": tenant_id,
                    "replaced_version_id": replaced,
                    "rolled_back_by": rolled_back_by,
                    "reason": reason,
                }),
            ));
            Ok(assignment)
        })
    }

    // ── Snapshots ──────────────────────────────────────────────────

    /// On-demand snapshot of a tenant's current assignment counters.
    pub fn performance_snapshot(
        &self,
        tenant_id: &str,
    ) -> RegistryResult<Option<PerformanceSnapshot>> {
        let assignment = self.store.get_assignment(tenant_id)?;
        Ok(assignment.map(|a| PerformanceSnapshot::from_assignment(&a, epoch_secs())))
    }

    /// Most recent recorded snapshot for a tenant+version pair, used as the
    /// regression baseline for that tenant's previous version.
    pub fn baseline_snapshot(
        &self,
        tenant_id: &str,
        version_id: &str,
    ) -> RegistryResult<Option<PerformanceSnapshot>> {
        Ok(self.store.latest_snapshot(tenant_id, version_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verge_state::MemoryEventSink;

    fn harness() -> (VersionRegistry, StateStore, Arc<MemoryEventSink>) {
        harness_with(RegistryConfig::default())
    }

    fn harness_with(
        config: RegistryConfig,
    ) -> (VersionRegistry, StateStore, Arc<MemoryEventSink>) {
        let store = StateStore::open_in_memory().unwrap();
        let sink = Arc::new(MemoryEventSink::new());
        let registry = VersionRegistry::new(store.clone(), sink.clone(), config);
        (registry, store, sink)
    }

    fn one_component() -> ComponentSet {
        let mut set = ComponentSet::new();
        set.insert(
            "analyzer",
            ComponentSpec {
                version: "1.0.0".to_string(),
                config: Default::default(),
            },
        )
        .unwrap();
        set
    }

    fn active_version(registry: &VersionRegistry) -> BehaviorVersion {
        let v = registry
            .create_version("v", "stable", one_component(), "dev", "", "")
            .unwrap();
        registry
            .promote_version(&v.id, VersionStatus::Testing, "dev")
            .unwrap();
        registry
            .promote_version(&v.id, VersionStatus::Active, "dev")
            .unwrap()
    }

    // ── Creation ───────────────────────────────────────────────────

    #[test]
    fn create_starts_in_draft() {
        let (registry, _, sink) = harness();
        let v = registry
            .create_version("scoring-v2", "canary", one_component(), "alice", "desc", "log")
            .unwrap();
        assert_eq!(v.status, VersionStatus::Draft);
        assert_eq!(v.created_by, "alice");
        assert_eq!(sink.events_for(&v.id).len(), 1);
        assert_eq!(sink.events_for(&v.id)[0].kind, EventKind::VersionCreated);
    }

    #[test]
    fn create_rejects_empty_components() {
        let (registry, _, _) = harness();
        let err = registry
            .create_version("v", "stable", ComponentSet::new(), "dev", "", "")
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[test]
    fn component_set_rejects_duplicates() {
        let mut set = one_component();
        let err = set
            .insert(
                "analyzer",
                ComponentSpec {
                    version: "2.0.0".to_string(),
                    config: Default::default(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    #[test]
    fn promote_walks_the_happy_path() {
        let (registry, _, sink) = harness();
        let v = registry
            .create_version("v", "stable", one_component(), "dev", "", "")
            .unwrap();

        let v = registry
            .promote_version(&v.id, VersionStatus::Testing, "dev")
            .unwrap();
        assert_eq!(v.status, VersionStatus::Testing);
        let v = registry
            .promote_version(&v.id, VersionStatus::Active, "ops")
            .unwrap();
        assert_eq!(v.status, VersionStatus::Active);
        let v = registry
            .promote_version(&v.id, VersionStatus::Deprecated, "ops")
            .unwrap();
        assert_eq!(v.status, VersionStatus::Deprecated);

        // create + 3 promotions.
        assert_eq!(sink.events_for(&v.id).len(), 4);
    }

    #[test]
    fn promote_refuses_every_illegal_pair() {
        use VersionStatus::*;
        const STATUSES: [VersionStatus; 5] = [Draft, Testing, Active, Deprecated, RolledBack];
        let legal = [
            (Draft, Testing),
            (Testing, Active),
            (Active, Deprecated),
            (Active, RolledBack),
        ];

        for from in STATUSES {
            for to in STATUSES {
                let (registry, store, _) = harness();
                let v = registry
                    .create_version("v", "stable", one_component(), "dev", "", "")
                    .unwrap();
                // Force the starting state directly in the store.
                let mut record = store.get_version(&v.id).unwrap().unwrap();
                record.status = from;
                store.put_version(&record).unwrap();

                let result = registry.promote_version(&v.id, to, "ops");
                if legal.contains(&(from, to)) {
                    assert_eq!(result.unwrap().status, to, "{from} -> {to} should pass");
                } else {
                    assert!(
                        matches!(result, Err(RegistryError::InvalidTransition { .. })),
                        "{from} -> {to} should be refused"
                    );
                }
            }
        }
    }

    #[test]
    fn promote_unknown_version_fails() {
        let (registry, _, _) = harness();
        let err = registry
            .promote_version("bv-missing", VersionStatus::Testing, "dev")
            .unwrap_err();
        assert!(matches!(err, RegistryError::VersionNotFound(_)));
    }

    #[test]
    fn list_versions_filters_by_status() {
        let (registry, _, _) = harness();
        let a = registry
            .create_version("a", "stable", one_component(), "dev", "", "")
            .unwrap();
        registry
            .create_version("b", "stable", one_component(), "dev", "", "")
            .unwrap();
        registry
            .promote_version(&a.id, VersionStatus::Testing, "dev")
            .unwrap();

        assert_eq!(registry.list_versions(None).unwrap().len(), 2);
        let drafts = registry.list_versions(Some(VersionStatus::Draft)).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].name, "b");
    }

    // ── Assignment ─────────────────────────────────────────────────

    #[test]
    fn assign_rejects_draft_and_terminal_versions() {
        let (registry, store, _) = harness();
        let v = registry
            .create_version("v", "stable", one_component(), "dev", "", "")
            .unwrap();

        let err = registry
            .assign_version_to_tenant("t1", &v.id, "dev")
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidVersionState { .. }));

        for terminal in [VersionStatus::Deprecated, VersionStatus::RolledBack] {
            let mut record = store.get_version(&v.id).unwrap().unwrap();
            record.status = terminal;
            store.put_version(&record).unwrap();
            let err = registry
                .assign_version_to_tenant("t1", &v.id, "dev")
                .unwrap_err();
            assert!(matches!(err, RegistryError::InvalidVersionState { .. }));
        }
    }

    #[test]
    fn reassign_tracks_previous_and_resets_counters() {
        let (registry, _, _) = harness();
        let v1 = active_version(&registry);
        let v2 = active_version(&registry);

        registry.assign_version_to_tenant("t1", &v1.id, "dev").unwrap();
        registry
            .update_tenant_metrics("t1", 100, 90, 5, 0.8, 0.7)
            .unwrap();

        let a = registry.assign_version_to_tenant("t1", &v2.id, "dev").unwrap();
        assert_eq!(a.behavior_version_id, v2.id);
        assert_eq!(a.previous_version_id.as_deref(), Some(v1.id.as_str()));
        assert_eq!(a.decision_count, 0);
        assert_eq!(a.success_count, 0);
        assert_eq!(a.avg_confidence, 0.0);
    }

    #[test]
    fn reassign_same_version_default_keeps_counters() {
        let (registry, _, _) = harness();
        let v1 = active_version(&registry);

        registry.assign_version_to_tenant("t1", &v1.id, "dev").unwrap();
        registry
            .update_tenant_metrics("t1", 100, 90, 5, 0.8, 0.7)
            .unwrap();

        let a = registry.assign_version_to_tenant("t1", &v1.id, "dev").unwrap();
        assert_eq!(a.previous_version_id, None);
        assert_eq!(a.decision_count, 100);
    }

    #[test]
    fn reassign_same_version_with_reset_flag_zeroes_counters() {
        let (registry, _, _) = harness_with(RegistryConfig {
            reset_counters_on_reassign: true,
        });
        let v1 = active_version(&registry);

        registry.assign_version_to_tenant("t1", &v1.id, "dev").unwrap();
        registry
            .update_tenant_metrics("t1", 100, 90, 5, 0.8, 0.7)
            .unwrap();

        let a = registry.assign_version_to_tenant("t1", &v1.id, "dev").unwrap();
        assert_eq!(a.previous_version_id, None);
        assert_eq!(a.decision_count, 0);
    }

    // ── Metrics ────────────────────────────────────────────────────

    #[test]
    fn metrics_overwrite_not_increment() {
        let (registry, _, _) = harness();
        let v1 = active_version(&registry);
        registry.assign_version_to_tenant("t1", &v1.id, "dev").unwrap();

        registry
            .update_tenant_metrics("t1", 100, 90, 5, 0.8, 0.7)
            .unwrap();
        let a = registry
            .update_tenant_metrics("t1", 150, 130, 8, 0.82, 0.72)
            .unwrap();

        // Authoritative cumulative counts, not deltas.
        assert_eq!(a.decision_count, 150);
        assert_eq!(a.success_count, 130);
    }

    #[test]
    fn metrics_append_to_snapshot_log() {
        let (registry, store, _) = harness();
        let v1 = active_version(&registry);
        registry.assign_version_to_tenant("t1", &v1.id, "dev").unwrap();

        registry
            .update_tenant_metrics("t1", 100, 90, 5, 0.8, 0.7)
            .unwrap();
        registry
            .update_tenant_metrics("t1", 200, 170, 10, 0.8, 0.7)
            .unwrap();

        let history = store.snapshot_history("t1", &v1.id).unwrap();
        assert_eq!(history.len(), 2);
        let latest = registry.baseline_snapshot("t1", &v1.id).unwrap().unwrap();
        assert_eq!(latest.decision_count, 200);
        assert!((latest.success_rate - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn on_demand_snapshot_reads_current_counters() {
        let (registry, _, _) = harness();
        let v1 = active_version(&registry);
        registry.assign_version_to_tenant("t1", &v1.id, "dev").unwrap();
        registry
            .update_tenant_metrics("t1", 80, 72, 4, 0.85, 0.75)
            .unwrap();

        let snap = registry.performance_snapshot("t1").unwrap().unwrap();
        assert_eq!(snap.behavior_version_id, v1.id);
        assert_eq!(snap.decision_count, 80);
        assert!((snap.success_rate - 0.9).abs() < f64::EPSILON);

        assert!(registry.performance_snapshot("ghost").unwrap().is_none());
    }

    #[test]
    fn metrics_reject_counts_exceeding_decisions() {
        let (registry, store, _) = harness();
        let v1 = active_version(&registry);
        registry.assign_version_to_tenant("t1", &v1.id, "dev").unwrap();

        // 60 + 50 > 100 would put the derived success rate above 1.0.
        let err = registry
            .update_tenant_metrics("t1", 100, 60, 50, 0.8, 0.7)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));

        // Nothing was written, counters or snapshots.
        let a = registry.get_tenant_version("t1").unwrap().unwrap();
        assert_eq!(a.decision_count, 0);
        assert!(store.snapshot_history("t1", &v1.id).unwrap().is_empty());

        // The boundary itself is fine.
        registry
            .update_tenant_metrics("t1", 100, 60, 40, 0.8, 0.7)
            .unwrap();
    }

    #[test]
    fn metrics_for_unassigned_tenant_fail() {
        let (registry, _, _) = harness();
        let err = registry
            .update_tenant_metrics("ghost", 1, 1, 0, 0.5, 0.5)
            .unwrap_err();
        assert!(matches!(err, RegistryError::AssignmentNotFound(_)));
    }

    // ── Rollback ───────────────────────────────────────────────────

    #[test]
    fn rollback_restores_previous_and_keeps_counters() {
        let (registry, _, _) = harness();
        let v1 = active_version(&registry);
        let v2 = active_version(&registry);

        registry.assign_version_to_tenant("t1", &v1.id, "dev").unwrap();
        registry.assign_version_to_tenant("t1", &v2.id, "dev").unwrap();
        registry
            .update_tenant_metrics("t1", 40, 20, 10, 0.5, 0.5)
            .unwrap();

        let a = registry
            .rollback_tenant_version("t1", "orchestrator", "regression detected")
            .unwrap();
        assert_eq!(a.behavior_version_id, v1.id);
        assert_eq!(a.previous_version_id, None);
        // Counters resume stale; not reset by rollback.
        assert_eq!(a.decision_count, 40);
    }

    #[test]
    fn second_consecutive_rollback_fails() {
        let (registry, _, _) = harness();
        let v1 = active_version(&registry);
        let v2 = active_version(&registry);

        registry.assign_version_to_tenant("t1", &v1.id, "dev").unwrap();
        registry.assign_version_to_tenant("t1", &v2.id, "dev").unwrap();
        registry
            .rollback_tenant_version("t1", "orchestrator", "first")
            .unwrap();

        // No redo: the previous pointer was consumed, not repopulated.
        let err = registry
            .rollback_tenant_version("t1", "orchestrator", "second")
            .unwrap_err();
        assert!(matches!(err, RegistryError::NoPreviousVersion(_)));
    }

    #[test]
    fn rollback_without_assignment_fails() {
        let (registry, _, _) = harness();
        let err = registry
            .rollback_tenant_version("ghost", "orchestrator", "why")
            .unwrap_err();
        assert!(matches!(err, RegistryError::AssignmentNotFound(_)));
    }
}
