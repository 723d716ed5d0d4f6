//! StateStore — redb-backed persistence for the Verge control plane.
//!
//! Provides typed CRUD operations over behavior versions, tenant
//! assignments, performance snapshot logs, and rollout plans. All values are
//! JSON-serialized into redb's `&[u8]` value columns. The store supports
//! both on-disk and in-memory backends (the latter for testing), which is
//! how storage swaps without touching registry or orchestrator logic.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(VERSIONS).map_err(map_err!(Table))?;
        txn.open_table(ASSIGNMENTS).map_err(map_err!(Table))?;
        txn.open_table(SNAPSHOTS).map_err(map_err!(Table))?;
        txn.open_table(PLANS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Behavior versions ──────────────────────────────────────────

    /// Insert or update a behavior version.
    pub fn put_version(&self, version: &BehaviorVersion) -> StateResult<()> {
        let value = serde_json::to_vec(version).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(VERSIONS).map_err(map_err!(Table))?;
            table
                .insert(version.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(version = %version.id, "version stored");
        Ok(())
    }

    /// Get a behavior version by id.
    pub fn get_version(&self, id: &str) -> StateResult<Option<BehaviorVersion>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(VERSIONS).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => {
                let version: BehaviorVersion =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(version))
            }
            None => Ok(None),
        }
    }

    /// List all behavior versions, newest first (creation time descending,
    /// id descending as tie-break).
    pub fn list_versions(&self) -> StateResult<Vec<BehaviorVersion>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(VERSIONS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let version: BehaviorVersion =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(version);
        }
        results.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(results)
    }

    // ── Tenant assignments ─────────────────────────────────────────

    /// Insert or update a tenant's assignment row (upsert, one per tenant).
    pub fn put_assignment(&self, assignment: &TenantVersionAssignment) -> StateResult<()> {
        let value = serde_json::to_vec(assignment).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(ASSIGNMENTS).map_err(map_err!(Table))?;
            table
                .insert(assignment.tenant_id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Get a tenant's assignment, if any.
    pub fn get_assignment(&self, tenant_id: &str) -> StateResult<Option<TenantVersionAssignment>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ASSIGNMENTS).map_err(map_err!(Table))?;
        match table.get(tenant_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let assignment: TenantVersionAssignment =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(assignment))
            }
            None => Ok(None),
        }
    }

    /// List all tenant assignments.
    pub fn list_assignments(&self) -> StateResult<Vec<TenantVersionAssignment>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ASSIGNMENTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let assignment: TenantVersionAssignment =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(assignment);
        }
        Ok(results)
    }

    // ── Performance snapshots ──────────────────────────────────────

    fn snapshot_key(tenant_id: &str, version_id: &str) -> String {
        format!("{tenant_id}:{version_id}")
    }

    /// Append a snapshot to the `{tenant}:{version}` log.
    pub fn append_snapshot(&self, snapshot: &PerformanceSnapshot) -> StateResult<()> {
        let key = Self::snapshot_key(&snapshot.tenant_id, &snapshot.behavior_version_id);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(SNAPSHOTS).map_err(map_err!(Table))?;
            let mut log: Vec<PerformanceSnapshot> = match table
                .get(key.as_str())
                .map_err(map_err!(Read))?
            {
                Some(guard) => {
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                }
                None => Vec::new(),
            };
            log.push(snapshot.clone());
            let value = serde_json::to_vec(&log).map_err(map_err!(Serialize))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// The most recent snapshot recorded for a tenant+version pair.
    pub fn latest_snapshot(
        &self,
        tenant_id: &str,
        version_id: &str,
    ) -> StateResult<Option<PerformanceSnapshot>> {
        let log = self.snapshot_history(tenant_id, version_id)?;
        Ok(log.into_iter().next_back())
    }

    /// The full append-only snapshot log for a tenant+version pair,
    /// oldest first.
    pub fn snapshot_history(
        &self,
        tenant_id: &str,
        version_id: &str,
    ) -> StateResult<Vec<PerformanceSnapshot>> {
        let key = Self::snapshot_key(tenant_id, version_id);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SNAPSHOTS).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let log: Vec<PerformanceSnapshot> =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(log)
            }
            None => Ok(Vec::new()),
        }
    }

    // ── Rollout plans ──────────────────────────────────────────────

    /// Insert or update a rollout plan.
    pub fn put_plan(&self, plan: &RolloutPlan) -> StateResult<()> {
        let value = serde_json::to_vec(plan).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(PLANS).map_err(map_err!(Table))?;
            table
                .insert(plan.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(plan = %plan.id, status = %plan.status, "plan stored");
        Ok(())
    }

    /// Get a rollout plan by id.
    pub fn get_plan(&self, id: &str) -> StateResult<Option<RolloutPlan>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PLANS).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => {
                let plan: RolloutPlan =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    /// List all rollout plans.
    pub fn list_plans(&self) -> StateResult<Vec<RolloutPlan>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PLANS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let plan: RolloutPlan =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(plan);
        }
        Ok(results)
    }
}
