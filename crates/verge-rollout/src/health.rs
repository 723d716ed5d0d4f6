//! Health evaluation — cohort aggregation and regression detection.
//!
//! Pure functions over performance snapshots; the orchestrator gathers the
//! snapshots and applies the resulting decision.

use serde::{Deserialize, Serialize};

use verge_state::{HealthThresholds, PerformanceSnapshot, PlanId, PlanStatus, TenantId};

/// What a health check decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthAction {
    /// Plan is not in progress; nothing was evaluated.
    None,
    /// Criteria not met yet; keep the current cohort and check again later.
    Wait,
    /// Criteria met and further gradual steps remain.
    ProceedNextStep,
    /// Criteria met and the rollout can be finalized.
    CompleteRollout,
    /// A critical regression triggered an automatic cohort rollback.
    AutoRollbackTriggered,
}

/// Severity of a regression alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// One tenant's success metric dropping below the rollback threshold,
/// compared against its previous-version baseline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionAlert {
    pub tenant_id: TenantId,
    pub metric: String,
    pub current_value: f64,
    pub baseline_value: f64,
    pub delta: f64,
    pub severity: AlertSeverity,
    pub recommendation: String,
}

/// Result of a bulk cohort rollback, attempted tenant by tenant.
///
/// A failed tenant never aborts the rest; the caller can retry the failed
/// subset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RollbackOutcome {
    pub rolled_back: Vec<TenantId>,
    pub failed: Vec<(TenantId, String)>,
}

/// Cohort-level metric aggregation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CohortAggregate {
    pub total_decisions: u64,
    pub avg_success_rate: f64,
    pub avg_fallback_rate: f64,
    pub tenant_count: usize,
}

/// Output of one `check_rollout_health` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub plan_id: PlanId,
    pub status: PlanStatus,
    pub action: HealthAction,
    pub total_decisions: u64,
    pub avg_success_rate: f64,
    pub avg_fallback_rate: f64,
    pub meets_criteria: bool,
    pub alerts: Vec<RegressionAlert>,
    pub rollback: Option<RollbackOutcome>,
}

impl HealthReport {
    /// Report for a plan that is not in progress: nothing evaluated,
    /// nothing mutated.
    pub fn noop(plan_id: &str, status: PlanStatus) -> Self {
        Self {
            plan_id: plan_id.to_string(),
            status,
            action: HealthAction::None,
            total_decisions: 0,
            avg_success_rate: 0.0,
            avg_fallback_rate: 0.0,
            meets_criteria: false,
            alerts: Vec::new(),
            rollback: None,
        }
    }
}

/// A current-minus-baseline drop below this marks an alert critical.
const CRITICAL_DELTA: f64 = -0.10;

/// Aggregate cohort snapshots.
///
/// Rates are the unweighted arithmetic mean across tenant snapshots, NOT
/// weighted by decision count. A low-volume tenant counts as much as a
/// high-volume one, which can let a rollout pass while a busy tenant is
/// failing. Kept for compatibility with the reference behavior.
pub fn aggregate(snapshots: &[PerformanceSnapshot]) -> CohortAggregate {
    if snapshots.is_empty() {
        return CohortAggregate::default();
    }
    let n = snapshots.len() as f64;
    CohortAggregate {
        total_decisions: snapshots.iter().map(|s| s.decision_count).sum(),
        avg_success_rate: snapshots.iter().map(|s| s.success_rate).sum::<f64>() / n,
        avg_fallback_rate: snapshots.iter().map(|s| s.fallback_rate).sum::<f64>() / n,
        tenant_count: snapshots.len(),
    }
}

/// Whether the cohort clears the plan's thresholds.
pub fn meets_criteria(aggregate: &CohortAggregate, thresholds: &HealthThresholds) -> bool {
    aggregate.total_decisions >= thresholds.min_decisions_before_proceed
        && aggregate.avg_success_rate >= thresholds.min_success_rate
        && aggregate.avg_fallback_rate <= thresholds.max_fallback_rate
}

/// Compare each cohort tenant against its previous-version baseline.
///
/// A tenant without a baseline snapshot yields no alert, and neither does
/// one with zero decisions on the current version — right after activation
/// the counters are freshly reset, and absence of data is not a regression.
/// An alert is raised only when the tenant's current success rate is below
/// `auto_rollback_threshold`; it is critical when the drop from baseline
/// exceeds 10 percentage points.
pub fn detect_regressions(
    pairs: &[(PerformanceSnapshot, Option<PerformanceSnapshot>)],
    auto_rollback_threshold: f64,
) -> Vec<RegressionAlert> {
    let mut alerts = Vec::new();
    for (current, baseline) in pairs {
        let Some(baseline) = baseline else { continue };
        if current.decision_count == 0 {
            continue;
        }
        if current.success_rate >= auto_rollback_threshold {
            continue;
        }
        let delta = current.success_rate - baseline.success_rate;
        let severity = if delta < CRITICAL_DELTA {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };
        let recommendation = match severity {
            AlertSeverity::Critical => "rollback",
            AlertSeverity::Warning => "monitor",
        };
        alerts.push(RegressionAlert {
            tenant_id: current.tenant_id.clone(),
            metric: "success_rate".to_string(),
            current_value: current.success_rate,
            baseline_value: baseline.success_rate,
            delta,
            severity,
            recommendation: recommendation.to_string(),
        });
    }
    alerts
}
