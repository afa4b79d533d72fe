//! Parameter-version data model (§3, §4.6).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::Methodology;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Coefficient,
    Threshold,
    Multiplier,
    Flag,
    Mapping,
    Formula,
}

/// A parameter's position in the maker-checker-approver-activator workflow.
/// Modelled as a tagged enum so illegal transitions are unrepresentable at
/// compile time; the persisted form remains a plain string column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterStatus {
    Draft,
    PendingReview,
    Reviewed,
    PendingApproval,
    Approved,
    Rejected,
    Active,
    Superseded,
}

/// An immutable, versioned parameter record (§3 `ParameterVersion`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterVersion {
    pub version_id: String,
    pub model_name: Methodology,
    pub parameter_name: String,
    pub parameter_type: ParameterType,
    pub value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<serde_json::Value>,
    pub version_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_version_id: Option<String>,
    pub status: ParameterStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    /// Hash of previous→new value, recorded on every transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub immutable_diff: Option<String>,
    pub requires_rbi_notification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rbi_notification_reference: Option<String>,
}

/// An audit row appended on every state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterWorkflowStep {
    pub version_id: String,
    pub actor: String,
    pub role: WorkflowRole,
    pub action: String,
    pub from_status: ParameterStatus,
    pub to_status: ParameterStatus,
    pub timestamp: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRole {
    Maker,
    Checker,
    Approver,
    Activator,
}

/// The active pointer per model: which version is live, and what (if
/// anything) is scheduled to take over next.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterConfiguration {
    pub active_version_id: std::collections::HashMap<String, String>,
    pub scheduled_version_id: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImpactMagnitude {
    Low,
    Medium,
    High,
    Critical,
}

/// Result of comparing a proposed value against the currently active one
/// (§4.6 impact analysis).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    pub magnitude: ImpactMagnitude,
    pub max_relative_delta: rust_decimal::Decimal,
    pub changed_keys: Vec<String>,
    pub affects_thresholds: bool,
    pub affects_coefficients: bool,
    pub affects_flags: bool,
}
