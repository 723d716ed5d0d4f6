//! Tenant-selection strategies — cohort computation and sampling.
//!
//! The five strategies are a closed sum type ([`RolloutStrategy`] in
//! `verge-state`); cohort computation matches on it exhaustively so a new
//! strategy is a compile-time-checked change.

use verge_state::{RolloutConfig, RolloutStrategy, TenantId};

use crate::error::{RolloutError, RolloutResult};

// ── Collaborator traits ────────────────────────────────────────────

/// Source of the eligible tenant population.
///
/// The orchestrator treats the result as authoritative at call time and
/// never caches it.
pub trait TenantDirectory: Send + Sync {
    fn list_all_tenant_ids(&self) -> Vec<TenantId>;
}

/// Fixed tenant population, for tests and embedders with a static fleet.
pub struct StaticDirectory {
    tenants: Vec<TenantId>,
}

impl StaticDirectory {
    pub fn new<I, S>(tenants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tenants: tenants.into_iter().map(Into::into).collect(),
        }
    }
}

impl TenantDirectory for StaticDirectory {
    fn list_all_tenant_ids(&self) -> Vec<TenantId> {
        self.tenants.clone()
    }
}

/// Picks `count` tenants out of a candidate pool.
///
/// Callers pass only not-yet-included tenants, so a sampler can never
/// re-select a tenant that is already in the cohort.
pub trait TenantSampler: Send + Sync {
    fn sample(&self, pool: &[TenantId], count: usize) -> Vec<TenantId>;
}

/// Deterministic sampler: stable sort by tenant id, take the first `count`.
///
/// Chosen over seeded randomness so cohort contents are reproducible and
/// tests can assert exact tenant sets.
pub struct StableSampler;

impl TenantSampler for StableSampler {
    fn sample(&self, pool: &[TenantId], count: usize) -> Vec<TenantId> {
        let mut sorted = pool.to_vec();
        sorted.sort();
        sorted.truncate(count);
        sorted
    }
}

// ── Cohort arithmetic ──────────────────────────────────────────────

/// Cohort size for a cumulative gradual step: `max(1, floor(total * pct / 100))`.
///
/// Percentages are of the *total* tenant count, not of the remainder.
pub fn step_target_count(total: usize, step_pct: f64) -> usize {
    ((total as f64 * step_pct / 100.0).floor() as usize).max(1)
}

/// Canary sample size: `max(1, floor(total * fraction))`, fraction in 0..=1.
pub fn canary_sample_count(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).floor() as usize).max(1)
}

/// Compute the initial cohort for a plan's strategy.
pub fn initial_cohort(
    strategy: &RolloutStrategy,
    all_tenants: &[TenantId],
    sampler: &dyn TenantSampler,
) -> Vec<TenantId> {
    match strategy {
        RolloutStrategy::Immediate => all_tenants.to_vec(),
        RolloutStrategy::Canary {
            canary_tenant_ids,
            canary_percentage,
        } => {
            if !canary_tenant_ids.is_empty() {
                canary_tenant_ids.clone()
            } else {
                let count = canary_sample_count(all_tenants.len(), *canary_percentage);
                sampler.sample(all_tenants, count)
            }
        }
        RolloutStrategy::Gradual { steps } => match steps.first() {
            Some(first) => {
                let count = step_target_count(all_tenants.len(), *first);
                sampler.sample(all_tenants, count)
            }
            None => Vec::new(),
        },
        RolloutStrategy::TenantSpecific { target_tenant_ids } => target_tenant_ids.clone(),
        // Blue-green begins paused; the traffic switch is an external trigger.
        RolloutStrategy::BlueGreen => Vec::new(),
    }
}

/// Check a rollout configuration at plan-creation time.
pub fn validate_config(config: &RolloutConfig) -> RolloutResult<()> {
    match &config.strategy {
        RolloutStrategy::Immediate | RolloutStrategy::BlueGreen => {}
        RolloutStrategy::Canary {
            canary_tenant_ids,
            canary_percentage,
        } => {
            if canary_tenant_ids.is_empty()
                && !(*canary_percentage > 0.0 && *canary_percentage <= 1.0)
            {
                return Err(RolloutError::Validation(format!(
                    "canary_percentage must be in (0, 1], got {canary_percentage}"
                )));
            }
        }
        RolloutStrategy::Gradual { steps } => {
            if steps.is_empty() {
                return Err(RolloutError::Validation(
                    "gradual strategy requires at least one step".to_string(),
                ));
            }
            for step in steps {
                if !(*step > 0.0 && *step <= 100.0) {
                    return Err(RolloutError::Validation(format!(
                        "gradual step percentage must be in (0, 100], got {step}"
                    )));
                }
            }
        }
        RolloutStrategy::TenantSpecific { target_tenant_ids } => {
            if target_tenant_ids.is_empty() {
                return Err(RolloutError::Validation(
                    "tenant_specific strategy requires at least one tenant".to_string(),
                ));
            }
        }
    }

    let t = &config.thresholds;
    if !(0.0..=1.0).contains(&t.min_success_rate) {
        return Err(RolloutError::Validation(format!(
            "min_success_rate must be in [0, 1], got {}",
            t.min_success_rate
        )));
    }
    if !(0.0..=1.0).contains(&t.max_fallback_rate) {
        return Err(RolloutError::Validation(format!(
            "max_fallback_rate must be in [0, 1], got {}",
            t.max_fallback_rate
        )));
    }
    if !(0.0..=1.0).contains(&config.auto_rollback_threshold) {
        return Err(RolloutError::Validation(format!(
            "auto_rollback_threshold must be in [0, 1], got {}",
            config.auto_rollback_threshold
        )));
    }
    Ok(())
}
