//! Orchestrator error types.

use thiserror::Error;
use verge_state::PlanStatus;

/// Errors that can occur during rollout orchestration.
#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("version not found: {0}")]
    VersionNotFound(String),

    #[error("plan not found: {0}")]
    PlanNotFound(String),

    #[error("plan {plan_id} is in state {status}, operation not allowed")]
    InvalidPlanState { plan_id: String, status: PlanStatus },

    #[error("plan {plan_id} uses strategy {strategy}, operation requires gradual")]
    InvalidStrategy { plan_id: String, strategy: String },

    #[error("registry error: {0}")]
    Registry(#[from] verge_registry::RegistryError),

    #[error("state store error: {0}")]
    State(#[from] verge_state::StateError),
}

pub type RolloutResult<T> = Result<T, RolloutError>;
