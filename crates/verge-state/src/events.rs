//! Domain events emitted by state-changing operations.
//!
//! Every mutation in the registry and orchestrator emits one immutable
//! [`Event`] to an [`EventSink`]. Ordering is append order per aggregate
//! (a version id or plan id); cross-aggregate ordering is not guaranteed.
//! Delivery beyond the sink boundary is the embedder's concern.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::epoch_secs;

/// What kind of state change an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    VersionCreated,
    VersionPromoted,
    VersionAssigned,
    TenantRolledBack,
    MetricsUpdated,
    PlanCreated,
    RolloutStarted,
    RolloutStepAdvanced,
    RolloutCompleted,
    RolloutRolledBack,
}

/// An immutable record of one state-changing operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,
    /// The version id or plan id this event belongs to.
    pub aggregate_id: String,
    pub kind: EventKind,
    /// Key parameters of the operation, as free-form JSON.
    pub payload: serde_json::Value,
    pub recorded_at: u64,
}

static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

impl Event {
    /// Build a new event with a process-unique id.
    pub fn new(kind: EventKind, aggregate_id: &str, payload: serde_json::Value) -> Self {
        let seq = EVENT_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("evt-{seq}"),
            aggregate_id: aggregate_id.to_string(),
            kind,
            payload,
            recorded_at: epoch_secs(),
        }
    }
}

/// Destination for domain events.
///
/// Emission is infallible at this boundary; a sink owns its own delivery
/// and error semantics.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Append-only in-memory sink, used in tests and embedders that drain
/// events themselves.
#[derive(Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<Event>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, in emission order.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Events for one aggregate, in emission order.
    pub fn events_for(&self, aggregate_id: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .collect()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

/// Sink that discards everything.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_preserves_order_per_aggregate() {
        let sink = MemoryEventSink::new();
        sink.emit(Event::new(
            EventKind::PlanCreated,
            "plan-1",
            serde_json::json!({}),
        ));
        sink.emit(Event::new(
            EventKind::VersionCreated,
            "bv-1",
            serde_json::json!({}),
        ));
        sink.emit(Event::new(
            EventKind::RolloutStarted,
            "plan-1",
            serde_json::json!({}),
        ));

        let plan_events = sink.events_for("plan-1");
        assert_eq!(plan_events.len(), 2);
        assert_eq!(plan_events[0].kind, EventKind::PlanCreated);
        assert_eq!(plan_events[1].kind, EventKind::RolloutStarted);
        // Ids are unique.
        assert_ne!(plan_events[0].id, plan_events[1].id);
    }

    #[test]
    fn null_sink_discards() {
        let sink = NullEventSink;
        sink.emit(Event::new(
            EventKind::VersionCreated,
            "bv-1",
            serde_json::json!({}),
        ));
    }
}
