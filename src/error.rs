use thiserror::Error;

use crate::profiles::StoreError;

/// Failures surfaced to callers of the configuration layer.
///
/// Parameter-level data problems never show up here; the evaluator absorbs
/// them and flags the parameter instead.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("unknown loan type '{0}' (expected general, equipment or realestate)")]
    UnknownLoanType(String),

    #[error("invalid profile: {}", .0.join("; "))]
    InvalidProfile(Vec<String>),

    #[error("profile store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ScoringError>;
