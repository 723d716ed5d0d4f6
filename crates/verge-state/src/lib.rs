//! verge-state — embedded state store for the Verge control plane.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! state management for behavior versions, tenant assignments, performance
//! snapshot logs, and rollout plans, plus the shared domain event model.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! The snapshot table keys logs by `{tenant_id}:{version_id}` so the newest
//! entry for a tenant's previous version can be read back as a regression
//! baseline.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`);
//! the registry and orchestrator receive it by injection, so tests run on
//! the in-memory backend and production on disk without code changes.

pub mod error;
pub mod events;
pub mod locks;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use events::{Event, EventKind, EventSink, MemoryEventSink, NullEventSink};
pub use locks::KeyedLock;
pub use store::StateStore;
pub use types::*;
