//! Domain error tier (§7 tier 2/3). Tier 1 (input validation) never raises —
//! see [`crate::loss_data::ValidationResult`] — it is reported as data.

use rust_decimal::Decimal;
use thiserror::Error;

/// Fatal, reportable domain errors and opaque system errors.
///
/// Every variant carries (or derives) the wire `error_code` from §6's error
/// envelope; [`OrmError::error_code`] returns the exact string.
#[derive(Debug, Error)]
pub enum OrmError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Below minimum threshold: {field} — {reason}")]
    BelowThreshold { field: String, reason: String },

    #[error("Invalid date sequence: {reason}")]
    InvalidDateSequence { reason: String },

    #[error("Missing required field: {field}")]
    MissingRequiredField { field: String },

    #[error("Missing RBI approval metadata for {context}")]
    MissingRbiApproval { context: String },

    #[error("Incomplete RBI approval metadata for {context}: {reason}")]
    IncompleteRbiApproval { context: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("No positive gross-income years in the lookback window")]
    NoPositiveGiYears,

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Job {0} not found")]
    JobNotFound(String),

    #[error("Job {0} was cancelled")]
    JobCancelled(String),

    #[error("Lineage record for run {0} not found")]
    LineageNotFound(String),

    #[error("Invalid parameter workflow transition: {from} -> {to} via {action}")]
    ParameterWorkflowInvalidTransition {
        from: String,
        to: String,
        action: String,
    },

    #[error("Override {0} is not approved")]
    OverrideNotApproved(String),

    #[error("Override {0} is in an invalid state for this transition: {1}")]
    OverrideInvalidTransition(String, String),

    #[error("Adding entity {child} under {parent} would create a hierarchy cycle")]
    ConsolidationHierarchyCycle { parent: String, child: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrmError {
    /// The wire-facing `error_code` from §6's error envelope.
    pub fn error_code(&self) -> &'static str {
        match self {
            OrmError::InvalidInput { .. } => "VALIDATION_ERROR",
            OrmError::BelowThreshold { .. } => "BELOW_THRESHOLD",
            OrmError::InvalidDateSequence { .. } => "INVALID_DATE_SEQUENCE",
            OrmError::MissingRequiredField { .. } => "MISSING_REQUIRED_FIELD",
            OrmError::MissingRbiApproval { .. } => "MISSING_RBI_APPROVAL",
            OrmError::IncompleteRbiApproval { .. } => "INCOMPLETE_RBI_APPROVAL",
            OrmError::InsufficientData(_) => "INSUFFICIENT_DATA",
            OrmError::NoPositiveGiYears => "NO_POSITIVE_GI_YEARS",
            OrmError::DivisionByZero { .. } => "INTERNAL_SERVER_ERROR",
            OrmError::JobNotFound(_) => "JOB_NOT_FOUND",
            OrmError::JobCancelled(_) => "JOB_CANCELLED",
            OrmError::LineageNotFound(_) => "LINEAGE_NOT_FOUND",
            OrmError::ParameterWorkflowInvalidTransition { .. } => {
                "PARAMETER_WORKFLOW_INVALID_TRANSITION"
            }
            OrmError::OverrideNotApproved(_) => "OVERRIDE_NOT_APPROVED",
            OrmError::OverrideInvalidTransition(..) => "OVERRIDE_NOT_APPROVED",
            OrmError::ConsolidationHierarchyCycle { .. } => "CONSOLIDATION_HIERARCHY_CYCLE",
            OrmError::ConvergenceFailure { .. } => "INTERNAL_SERVER_ERROR",
            OrmError::SerializationError(_) => "INTERNAL_SERVER_ERROR",
            OrmError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(e: serde_json::Error) -> Self {
        OrmError::SerializationError(e.to_string())
    }
}
