//! Registry error types.

use thiserror::Error;
use verge_state::VersionStatus;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("version not found: {0}")]
    VersionNotFound(String),

    #[error("no assignment for tenant: {0}")]
    AssignmentNotFound(String),

    #[error("illegal lifecycle transition: {from} -> {to}")]
    InvalidTransition {
        from: VersionStatus,
        to: VersionStatus,
    },

    #[error("version {version_id} is not assignable in state {status}")]
    InvalidVersionState {
        version_id: String,
        status: VersionStatus,
    },

    #[error("tenant {0} has no previous version to roll back to")]
    NoPreviousVersion(String),

    #[error("state store error: {0}")]
    State(#[from] verge_state::StateError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
