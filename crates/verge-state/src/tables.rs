//! redb table definitions for the Verge state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain
//! types). The snapshot table uses the composite key `{tenant_id}:{version_id}`
//! and stores the whole append-only log for that pair as one value.

use redb::TableDefinition;

/// Behavior versions keyed by `{version_id}`.
pub const VERSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("versions");

/// Tenant version assignments keyed by `{tenant_id}` (one row per tenant).
pub const ASSIGNMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("assignments");

/// Performance snapshot logs keyed by `{tenant_id}:{version_id}`.
pub const SNAPSHOTS: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

/// Rollout plans keyed by `{plan_id}`.
pub const PLANS: TableDefinition<&str, &[u8]> = TableDefinition::new("plans");
