//! Domain types for the Verge control plane.
//!
//! These types represent the persisted state of behavior versions, per-tenant
//! version assignments, performance snapshots, and rollout plans. All types
//! are serializable to/from JSON for storage in redb tables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for a behavior version.
pub type VersionId = String;

/// Unique identifier for a tenant.
pub type TenantId = String;

/// Unique identifier for a rollout plan.
pub type PlanId = String;

/// Current unix time in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ── Behavior version ───────────────────────────────────────────────

/// Lifecycle state of a behavior version.
///
/// Transitions are single-direction: `Draft → Testing → Active → Deprecated`,
/// with `Active → RolledBack` reachable through the orchestrator's rollback
/// path. `Deprecated` and `RolledBack` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Draft,
    Testing,
    Active,
    Deprecated,
    RolledBack,
}

impl VersionStatus {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deprecated | Self::RolledBack)
    }

    /// Whether a version in this state may be assigned to tenants.
    pub fn is_assignable(self) -> bool {
        matches!(self, Self::Testing | Self::Active)
    }

    /// Whether `next` is a legal successor of this state.
    ///
    /// The pair match is exhaustive over the legal edges; everything else,
    /// including the same-state pair, is illegal.
    pub fn can_transition_to(self, next: VersionStatus) -> bool {
        use VersionStatus::*;
        match (self, next) {
            (Draft, Testing) => true,
            (Testing, Active) => true,
            (Active, Deprecated) => true,
            (Active, RolledBack) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Testing => "testing",
            Self::Active => "active",
            Self::Deprecated => "deprecated",
            Self::RolledBack => "rolled_back",
        };
        f.write_str(s)
    }
}

/// One named component inside a behavior version: its own semantic version
/// plus a free-form configuration map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentSpec {
    pub version: String,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

/// An immutable bundle of decision-making components that can be activated
/// per tenant.
///
/// The component map is fixed at creation; `status` is the only field that
/// changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BehaviorVersion {
    pub id: VersionId,
    pub name: String,
    /// Free-form tag, e.g. "stable" or "canary".
    pub tag: String,
    /// Component type → component version + config.
    pub components: HashMap<String, ComponentSpec>,
    pub status: VersionStatus,
    pub created_by: String,
    pub description: String,
    pub changelog: String,
    /// Unix timestamp (seconds) when this version was created.
    pub created_at: u64,
}

// ── Tenant assignment ──────────────────────────────────────────────

/// The version currently bound to one tenant, plus usage counters for the
/// current activation period.
///
/// Exactly one assignment row exists per tenant (upsert semantics).
/// `previous_version_id` is the rollback target and the regression baseline;
/// it is rewritten on every version change and cleared by a rollback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TenantVersionAssignment {
    pub tenant_id: TenantId,
    pub behavior_version_id: VersionId,
    pub previous_version_id: Option<VersionId>,
    /// Decisions taken since the current version was activated.
    pub decision_count: u64,
    pub success_count: u64,
    pub fallback_count: u64,
    /// Running average confidence over the activation period.
    pub avg_confidence: f64,
    /// Running average trust score over the activation period.
    pub avg_trust_score: f64,
    pub activated_by: String,
    /// Unix timestamp (seconds) of the current activation.
    pub activated_at: u64,
    pub updated_at: u64,
}

impl TenantVersionAssignment {
    /// Fresh assignment for a tenant's first version.
    pub fn new(tenant_id: &str, version_id: &str, activated_by: &str, now: u64) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            behavior_version_id: version_id.to_string(),
            previous_version_id: None,
            decision_count: 0,
            success_count: 0,
            fallback_count: 0,
            avg_confidence: 0.0,
            avg_trust_score: 0.0,
            activated_by: activated_by.to_string(),
            activated_at: now,
            updated_at: now,
        }
    }

    /// Zero all counters for a new activation period.
    pub fn reset_counters(&mut self) {
        self.decision_count = 0;
        self.success_count = 0;
        self.fallback_count = 0;
        self.avg_confidence = 0.0;
        self.avg_trust_score = 0.0;
    }

    /// Fraction of decisions that succeeded; 0.0 with no decisions.
    pub fn success_rate(&self) -> f64 {
        if self.decision_count == 0 {
            return 0.0;
        }
        self.success_count as f64 / self.decision_count as f64
    }

    /// Fraction of decisions that fell back; 0.0 with no decisions.
    pub fn fallback_rate(&self) -> f64 {
        if self.decision_count == 0 {
            return 0.0;
        }
        self.fallback_count as f64 / self.decision_count as f64
    }
}

// ── Performance snapshots ──────────────────────────────────────────

/// Point-in-time read of one tenant's aggregated metrics for one version.
///
/// Snapshots are appended to a per-`{tenant}:{version}` log on every metrics
/// update, so the newest entry for a tenant's *previous* version serves as
/// the regression baseline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceSnapshot {
    pub tenant_id: TenantId,
    pub behavior_version_id: VersionId,
    pub decision_count: u64,
    pub success_count: u64,
    pub fallback_count: u64,
    pub success_rate: f64,
    pub fallback_rate: f64,
    pub avg_confidence: f64,
    pub avg_trust_score: f64,
    pub recorded_at: u64,
}

impl PerformanceSnapshot {
    /// Compute a snapshot from an assignment's current counters.
    pub fn from_assignment(assignment: &TenantVersionAssignment, now: u64) -> Self {
        Self {
            tenant_id: assignment.tenant_id.clone(),
            behavior_version_id: assignment.behavior_version_id.clone(),
            decision_count: assignment.decision_count,
            success_count: assignment.success_count,
            fallback_count: assignment.fallback_count,
            success_rate: assignment.success_rate(),
            fallback_rate: assignment.fallback_rate(),
            avg_confidence: assignment.avg_confidence,
            avg_trust_score: assignment.avg_trust_score,
            recorded_at: now,
        }
    }
}

// ── Rollout plans ──────────────────────────────────────────────────

/// Lifecycle state of a rollout plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Pending,
    InProgress,
    Completed,
    RolledBack,
    Failed,
}

impl PlanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::RolledBack | Self::Failed)
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::RolledBack => "rolled_back",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// How a new behavior version is rolled out across the tenant population.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RolloutStrategy {
    /// Activate for every known tenant at once.
    Immediate,
    /// Activate for a small subset first: the explicit ids if given,
    /// otherwise a sample of `canary_percentage` (fraction 0..=1) of the
    /// population, at least one tenant.
    Canary {
        #[serde(default)]
        canary_tenant_ids: Vec<TenantId>,
        #[serde(default)]
        canary_percentage: f64,
    },
    /// Staged activation. Each step is a *cumulative* percentage of the
    /// total tenant count (0..=100), e.g. `[10, 25, 50, 100]`.
    Gradual { steps: Vec<f64> },
    /// Activate for exactly the listed tenants.
    TenantSpecific { target_tenant_ids: Vec<TenantId> },
    /// Start with an empty cohort; traffic switch is driven externally.
    BlueGreen,
}

/// Health thresholds a cohort must satisfy before a plan may advance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthThresholds {
    /// Minimum unweighted mean success rate across cohort tenants.
    pub min_success_rate: f64,
    /// Maximum unweighted mean fallback rate across cohort tenants.
    pub max_fallback_rate: f64,
    /// Minimum total decisions across the cohort before advancing.
    pub min_decisions_before_proceed: u64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            min_success_rate: 0.85,
            max_fallback_rate: 0.10,
            min_decisions_before_proceed: 100,
        }
    }
}

/// Immutable rollout configuration, fixed at plan creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RolloutConfig {
    pub strategy: RolloutStrategy,
    pub thresholds: HealthThresholds,
    pub auto_rollback_enabled: bool,
    /// A cohort tenant whose success rate drops below this (and which has a
    /// recorded baseline) raises a regression alert.
    pub auto_rollback_threshold: f64,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            strategy: RolloutStrategy::Immediate,
            thresholds: HealthThresholds::default(),
            auto_rollback_enabled: true,
            auto_rollback_threshold: 0.90,
        }
    }
}

/// One attempt to progressively activate a behavior version across tenants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RolloutPlan {
    pub id: PlanId,
    pub behavior_version_id: VersionId,
    pub config: RolloutConfig,
    pub status: PlanStatus,
    /// 1-based step counter; meaningful only for the gradual strategy.
    pub current_step: u32,
    /// Cumulative cohort on the new version under this plan. Only grows
    /// while in progress; rollback is recorded via `status`, not by
    /// shrinking this set.
    pub current_tenant_ids: Vec<TenantId>,
    pub created_by: String,
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub rollback_reason: Option<String>,
}
