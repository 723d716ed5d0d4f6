//! RolloutOrchestrator — drives rollout plans across the tenant fleet.
//!
//! The orchestrator owns plan lifecycle (`Pending → InProgress →
//! Completed | RolledBack`), computes tenant cohorts per strategy, and runs
//! the externally-ticked health loop. It is the only caller of the
//! registry's assignment and rollback mutations. There is no scheduler here:
//! `check_rollout_health` is invoked by cron, a queue consumer, or an
//! operator.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;
use tracing::{debug, info, warn};

use verge_registry::VersionRegistry;
use verge_state::{
    Event, EventKind, EventSink, KeyedLock, PerformanceSnapshot, PlanStatus, RolloutConfig,
    RolloutPlan, RolloutStrategy, StateStore, TenantId, VersionStatus, epoch_secs,
};

use crate::error::{RolloutError, RolloutResult};
use crate::health::{
    AlertSeverity, HealthAction, HealthReport, RollbackOutcome, aggregate, detect_regressions,
    meets_criteria,
};
use crate::strategy::{
    StableSampler, TenantDirectory, TenantSampler, initial_cohort, step_target_count,
    validate_config,
};

/// Actor recorded on assignments and rollbacks performed by the orchestrator.
const ACTOR: &str = "rollout-orchestrator";

/// The rollout control loop.
///
/// `Clone` + `Send` + `Sync`; clones share the store, registry, and per-plan
/// locks, so concurrent health checks on the same plan serialize while
/// unrelated plans progress independently.
#[derive(Clone)]
pub struct RolloutOrchestrator {
    registry: VersionRegistry,
    store: StateStore,
    directory: Arc<dyn TenantDirectory>,
    sampler: Arc<dyn TenantSampler>,
    events: Arc<dyn EventSink>,
    plan_locks: Arc<KeyedLock>,
    seq: Arc<AtomicU64>,
}

impl RolloutOrchestrator {
    pub fn new(
        registry: VersionRegistry,
        store: StateStore,
        directory: Arc<dyn TenantDirectory>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry,
            store,
            directory,
            sampler: Arc::new(StableSampler),
            events,
            plan_locks: Arc::new(KeyedLock::new()),
            seq: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Replace the tenant sampler (the default is the deterministic
    /// stable-sort sampler).
    pub fn with_sampler(mut self, sampler: Arc<dyn TenantSampler>) -> Self {
        self.sampler = sampler;
        self
    }

    fn next_plan_id(&self) -> String {
        format!(
            "plan-{}-{:06}",
            epoch_secs(),
            self.seq.fetch_add(1, Ordering::Relaxed)
        )
    }

    fn load_plan(&self, plan_id: &str) -> RolloutResult<RolloutPlan> {
        self.store
            .get_plan(plan_id)?
            .ok_or_else(|| RolloutError::PlanNotFound(plan_id.to_string()))
    }

    // ── Plan lifecycle ─────────────────────────────────────────────

    /// Create a plan in `Pending` with an empty cohort.
    pub fn create_rollout_plan(
        &self,
        behavior_version_id: &str,
        config: RolloutConfig,
        created_by: &str,
    ) -> RolloutResult<RolloutPlan> {
        validate_config(&config)?;
        if self.registry.get_version(behavior_version_id)?.is_none() {
            return Err(RolloutError::VersionNotFound(
                behavior_version_id.to_string(),
            ));
        }

        let plan = RolloutPlan {
            id: self.next_plan_id(),
            behavior_version_id: behavior_version_id.to_string(),
            config,
            status: PlanStatus::Pending,
            current_step: 0,
            current_tenant_ids: Vec::new(),
            created_by: created_by.to_string(),
            created_at: epoch_secs(),
            started_at: None,
            completed_at: None,
            rollback_reason: None,
        };
        self.store.put_plan(&plan)?;

        info!(plan = %plan.id, version = behavior_version_id, "rollout plan created");
        self.events.emit(Event::new(
            EventKind::PlanCreated,
            &plan.id,
            json!({
                "behavior_version_id": behavior_version_id,
                "strategy": plan.config.strategy,
                "created_by": created_by,
            }),
        ));
        Ok(plan)
    }

    /// Select the initial cohort, assign the version to it, and move the
    /// plan to `InProgress` at step 1.
    pub fn start_rollout(&self, plan_id: &str) -> RolloutResult<RolloutPlan> {
        self.plan_locks.with(plan_id, || {
            let mut plan = self.load_plan(plan_id)?;
            if plan.status != PlanStatus::Pending {
                return Err(RolloutError::InvalidPlanState {
                    plan_id: plan.id,
                    status: plan.status,
                });
            }

            let all_tenants = self.directory.list_all_tenant_ids();
            let cohort = initial_cohort(&plan.config.strategy, &all_tenants, &*self.sampler);
            for tenant in &cohort {
                self.registry
                    .assign_version_to_tenant(tenant, &plan.behavior_version_id, ACTOR)?;
            }

            plan.status = PlanStatus::InProgress;
            plan.current_step = 1;
            plan.current_tenant_ids = cohort;
            plan.started_at = Some(epoch_secs());
            self.store.put_plan(&plan)?;

            info!(
                plan = %plan.id,
                version = %plan.behavior_version_id,
                cohort = plan.current_tenant_ids.len(),
                "rollout started"
            );
            self.events.emit(Event::new(
                EventKind::RolloutStarted,
                &plan.id,
                json!({
                    "behavior_version_id": plan.behavior_version_id,
                    "cohort": plan.current_tenant_ids,
                }),
            ));
            Ok(plan)
        })
    }

    // ── Health loop ────────────────────────────────────────────────

    /// Evaluate the plan's cohort and decide whether to proceed, wait,
    /// complete, or automatically roll back.
    ///
    /// On a plan that is not `InProgress` this is an idempotent no-op
    /// returning `action: none`. The advance/complete actions are
    /// recommendations for the caller; only auto-rollback mutates state
    /// from inside the health check.
    pub fn check_rollout_health(&self, plan_id: &str) -> RolloutResult<HealthReport> {
        self.plan_locks.with(plan_id, || {
            let mut plan = self.load_plan(plan_id)?;
            if plan.status != PlanStatus::InProgress {
                debug!(plan = %plan.id, status = %plan.status, "health check no-op");
                return Ok(HealthReport::noop(&plan.id, plan.status));
            }

            // Snapshot every cohort tenant still on the plan's version.
            // Tenants reassigned elsewhere by a concurrent process are
            // silently excluded, not errors.
            let now = epoch_secs();
            let mut pairs: Vec<(PerformanceSnapshot, Option<PerformanceSnapshot>)> = Vec::new();
            for tenant in &plan.current_tenant_ids {
                let Some(assignment) = self.registry.get_tenant_version(tenant)? else {
                    continue;
                };
                if assignment.behavior_version_id != plan.behavior_version_id {
                    debug!(
                        plan = %plan.id,
                        tenant = %tenant,
                        "tenant reassigned elsewhere, excluded from aggregation"
                    );
                    continue;
                }
                let current = PerformanceSnapshot::from_assignment(&assignment, now);
                let baseline = match &assignment.previous_version_id {
                    Some(previous) => self.registry.baseline_snapshot(tenant, previous)?,
                    None => None,
                };
                pairs.push((current, baseline));
            }

            let snapshots: Vec<PerformanceSnapshot> =
                pairs.iter().map(|(s, _)| s.clone()).collect();
            let agg = aggregate(&snapshots);
            let meets = meets_criteria(&agg, &plan.config.thresholds);
            let alerts = detect_regressions(&pairs, plan.config.auto_rollback_threshold);

            let critical = alerts
                .iter()
                .find(|a| a.severity == AlertSeverity::Critical);
            if plan.config.auto_rollback_enabled
                && let Some(trigger) = critical
            {
                let reason = format!(
                    "tenant {} success_rate {:.3} regressed from baseline {:.3}",
                    trigger.tenant_id, trigger.current_value, trigger.baseline_value
                );
                warn!(plan = %plan.id, %reason, "auto-rollback triggered");

                let outcome = self.rollback_cohort(&plan, &reason);
                plan.status = PlanStatus::RolledBack;
                plan.rollback_reason = Some(reason.clone());
                self.store.put_plan(&plan)?;
                self.demote_version(&plan.behavior_version_id);

                self.events.emit(Event::new(
                    EventKind::RolloutRolledBack,
                    &plan.id,
                    json!({
                        "reason": reason,
                        "rolled_back": outcome.rolled_back.len(),
                        "failed": outcome.failed.len(),
                    }),
                ));
                return Ok(HealthReport {
                    plan_id: plan.id,
                    status: PlanStatus::RolledBack,
                    action: HealthAction::AutoRollbackTriggered,
                    total_decisions: agg.total_decisions,
                    avg_success_rate: agg.avg_success_rate,
                    avg_fallback_rate: agg.avg_fallback_rate,
                    meets_criteria: false,
                    alerts,
                    rollback: Some(outcome),
                });
            }

            let action = if meets {
                match &plan.config.strategy {
                    RolloutStrategy::Gradual { steps }
                        if (plan.current_step as usize) < steps.len() =>
                    {
                        HealthAction::ProceedNextStep
                    }
                    _ => HealthAction::CompleteRollout,
                }
            } else {
                HealthAction::Wait
            };

            debug!(
                plan = %plan.id,
                total_decisions = agg.total_decisions,
                avg_success_rate = agg.avg_success_rate,
                ?action,
                "health evaluated"
            );
            Ok(HealthReport {
                plan_id: plan.id,
                status: plan.status,
                action,
                total_decisions: agg.total_decisions,
                avg_success_rate: agg.avg_success_rate,
                avg_fallback_rate: agg.avg_fallback_rate,
                meets_criteria: meets,
                alerts,
                rollback: None,
            })
        })
    }

    /// Roll back every cohort tenant, one at a time.
    ///
    /// An individual failure is logged and collected; the loop keeps going
    /// so as many tenants as possible get reverted. The caller can retry
    /// the failed subset.
    fn rollback_cohort(&self, plan: &RolloutPlan, reason: &str) -> RollbackOutcome {
        let mut outcome = RollbackOutcome::default();
        for tenant in &plan.current_tenant_ids {
            match self.registry.rollback_tenant_version(tenant, ACTOR, reason) {
                Ok(_) => outcome.rolled_back.push(tenant.clone()),
                Err(e) => {
                    warn!(plan = %plan.id, tenant = %tenant, error = %e, "tenant rollback failed");
                    outcome.failed.push((tenant.clone(), e.to_string()));
                }
            }
        }
        outcome
    }

    /// Mark the version itself rolled back. Best-effort: a version that is
    /// not `Active` (e.g. still `Testing`) stays where it is, the cohort
    /// rollback above is what matters.
    fn demote_version(&self, version_id: &str) {
        match self.registry.get_version(version_id) {
            Ok(Some(v)) if v.status == VersionStatus::Active => {
                if let Err(e) =
                    self.registry
                        .promote_version(version_id, VersionStatus::RolledBack, ACTOR)
                {
                    warn!(version = version_id, error = %e, "could not mark version rolled back");
                }
            }
            Ok(Some(v)) => {
                debug!(version = version_id, status = %v.status, "version left as-is after rollback");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(version = version_id, error = %e, "could not load version after rollback");
            }
        }
    }

    // ── Step progression ───────────────────────────────────────────

    /// Grow a gradual plan's cohort to the next step's cumulative
    /// percentage of the total population.
    ///
    /// Already-included tenants are never re-selected; only the newly
    /// sampled tenants receive an assignment. Advancing past the final
    /// step completes the rollout instead.
    pub fn proceed_next_step(&self, plan_id: &str) -> RolloutResult<RolloutPlan> {
        self.plan_locks.with(plan_id, || {
            let mut plan = self.load_plan(plan_id)?;
            let steps = match &plan.config.strategy {
                RolloutStrategy::Gradual { steps } => steps.clone(),
                other => {
                    let strategy = match other {
                        RolloutStrategy::Immediate => "immediate",
                        RolloutStrategy::Canary { .. } => "canary",
                        RolloutStrategy::TenantSpecific { .. } => "tenant_specific",
                        RolloutStrategy::BlueGreen => "blue_green",
                        RolloutStrategy::Gradual { .. } => "gradual",
                    };
                    return Err(RolloutError::InvalidStrategy {
                        plan_id: plan.id,
                        strategy: strategy.to_string(),
                    });
                }
            };
            if plan.status != PlanStatus::InProgress {
                return Err(RolloutError::InvalidPlanState {
                    plan_id: plan.id,
                    status: plan.status,
                });
            }

            let next_step = plan.current_step as usize + 1;
            if next_step > steps.len() {
                return self.complete_inner(plan);
            }

            let all_tenants = self.directory.list_all_tenant_ids();
            // Cumulative target: a percentage of the total population,
            // not of the remaining tenants.
            let target = step_target_count(all_tenants.len(), steps[next_step - 1]);
            let additional = target.saturating_sub(plan.current_tenant_ids.len());

            let pool: Vec<TenantId> = all_tenants
                .into_iter()
                .filter(|t| !plan.current_tenant_ids.contains(t))
                .collect();
            let newly_selected = self.sampler.sample(&pool, additional);

            for tenant in &newly_selected {
                self.registry
                    .assign_version_to_tenant(tenant, &plan.behavior_version_id, ACTOR)?;
            }
            plan.current_tenant_ids.extend(newly_selected.iter().cloned());
            plan.current_step = next_step as u32;
            self.store.put_plan(&plan)?;

            info!(
                plan = %plan.id,
                step = plan.current_step,
                added = newly_selected.len(),
                cohort = plan.current_tenant_ids.len(),
                "rollout advanced"
            );
            self.events.emit(Event::new(
                EventKind::RolloutStepAdvanced,
                &plan.id,
                json!({
                    "step": plan.current_step,
                    "added": newly_selected,
                    "cohort_size": plan.current_tenant_ids.len(),
                }),
            ));
            Ok(plan)
        })
    }

    /// Finalize an in-progress rollout. Tenant assignments are untouched;
    /// the cohort stays on the new version.
    pub fn complete_rollout(&self, plan_id: &str) -> RolloutResult<RolloutPlan> {
        self.plan_locks.with(plan_id, || {
            let plan = self.load_plan(plan_id)?;
            if plan.status != PlanStatus::InProgress {
                return Err(RolloutError::InvalidPlanState {
                    plan_id: plan.id,
                    status: plan.status,
                });
            }
            self.complete_inner(plan)
        })
    }

    /// Shared completion path; the plan lock is already held.
    fn complete_inner(&self, mut plan: RolloutPlan) -> RolloutResult<RolloutPlan> {
        plan.status = PlanStatus::Completed;
        plan.completed_at = Some(epoch_secs());
        self.store.put_plan(&plan)?;

        info!(
            plan = %plan.id,
            cohort = plan.current_tenant_ids.len(),
            "rollout completed"
        );
        self.events.emit(Event::new(
            EventKind::RolloutCompleted,
            &plan.id,
            json!({
                "behavior_version_id": plan.behavior_version_id,
                "cohort_size": plan.current_tenant_ids.len(),
            }),
        ));
        Ok(plan)
    }

    /// Get a plan by id; absence is not an error.
    pub fn get_rollout_plan(&self, plan_id: &str) -> RolloutResult<Option<RolloutPlan>> {
        Ok(self.store.get_plan(plan_id)?)
    }

    /// List all plans.
    pub fn list_rollout_plans(&self) -> RolloutResult<Vec<RolloutPlan>> {
        Ok(self.store.list_plans()?)
    }
}
