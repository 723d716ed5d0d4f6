//! verge-registry — the behavior version catalog and tenant assignment authority.
//!
//! Owns the version lifecycle state machine
//! (`Draft → Testing → Active → Deprecated`, with `Active → RolledBack`
//! through the orchestrator's rollback path), the single assignment row per
//! tenant, per-activation usage counters, and the append-only performance
//! snapshot log that regression checks read their baselines from.
//!
//! # Components
//!
//! - **`registry`** — `VersionRegistry` (catalog, lifecycle, assignment, metrics)
//! - **`error`** — `RegistryError` / `RegistryResult`

pub mod error;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use registry::{ComponentSet, RegistryConfig, VersionRegistry};
