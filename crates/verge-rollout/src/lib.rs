//! verge-rollout — progressive rollout orchestration for behavior versions.
//!
//! This crate drives rollout plans: cohort selection across five strategies
//! (immediate, canary, gradual, tenant-specific, blue-green), the
//! externally-ticked health-evaluation loop, regression detection against
//! per-tenant baselines, and automatic cohort rollback.
//!
//! # Components
//!
//! - **`strategy`** — cohort computation, tenant directory and sampler traits
//! - **`health`** — aggregation, threshold criteria, regression alerts
//! - **`orchestrator`** — plan state machine and the health-check tick
//! - **`error`** — `RolloutError` / `RolloutResult`

pub mod error;
pub mod health;
pub mod orchestrator;
pub mod strategy;

pub use error::{RolloutError, RolloutResult};
pub use health::{
    AlertSeverity, CohortAggregate, HealthAction, HealthReport, RegressionAlert, RollbackOutcome,
};
pub use orchestrator::RolloutOrchestrator;
pub use strategy::{StableSampler, StaticDirectory, TenantDirectory, TenantSampler};
