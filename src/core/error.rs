//! Shared error type for components that don't own a more specific one.
//!
//! Repository, pool, poller, and wire errors each get their own
//! `thiserror` enum (see their respective modules); `ServiceError` is what
//! [`crate::service::RateService`] itself can produce, and
//! `anyhow::Error` remains the orchestrator-level catch-all for init-time
//! failures, matching the split the teacher crate draws between typed leaf
//! errors and `anyhow` at the application boundary.

use thiserror::Error;

/// Errors produced directly by the rate service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The repository backing the service failed in a way worth surfacing
    /// at startup (only used during `initialize`; steady-state repository
    /// errors are absorbed by the DB worker pool per spec).
    #[error("repository error: {0}")]
    Repository(#[from] crate::repository::RepositoryError),
}

/// Application-facing result for orchestrator-level, init-time failures.
pub type AppResult<T> = Result<T, anyhow::Error>;
