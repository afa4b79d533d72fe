//! Supervisor-override data model (§3, §4.7).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideType {
    CapitalAdjustment,
    IlmOverride,
    BicOverride,
    LossComponentOverride,
    MethodologyOverride,
    ParameterOverride,
}

/// Modelled as a tagged enum (§9) — the proposed/approved/applied/expired
/// chain, with `rejected` as a terminal branch off `proposed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideStatus {
    Proposed,
    Approved,
    Applied,
    Expired,
    Rejected,
}

/// A closed set of RBI-disclosure reason categories. No free-form escape
/// hatch beyond `Other` — Pillar 3 disclosure tables are keyed by these
/// exact categories (see `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideReason {
    DataQualityIssue,
    ExceptionalCircumstances,
    RegulatoryGuidance,
    BusinessRestructuring,
    SystemLimitation,
    ConservativeAdjustment,
    TemporaryAdjustment,
    Other,
}

/// A supervisor override on one field of a calculation result, or on an
/// entity's effective parameters (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorOverride {
    pub id: String,
    pub override_type: OverrideType,
    pub status: OverrideStatus,
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation_run_id: Option<String>,
    pub original_value: serde_json::Value,
    pub override_value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage_adjustment: Option<Money>,
    pub override_reason: OverrideReason,
    pub detailed_justification: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supporting_documentation: Option<String>,
    pub proposed_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_reference: Option<String>,
    pub effective_from: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_to: Option<NaiveDate>,
    pub requires_disclosure: bool,
    pub disclosure_period_months: u32,
    pub rbi_notification_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rbi_notification_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rbi_notification_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_by: Option<String>,
}

/// An append-only audit row per override state transition (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideAuditLog {
    pub override_id: String,
    pub action_type: String,
    pub action_by: String,
    pub action_date: NaiveDateTime,
    pub previous_status: Option<OverrideStatus>,
    pub new_status: OverrideStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Before/after comparison surfaced to the approver (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideImpactAnalysis {
    pub override_id: String,
    pub original_value: serde_json::Value,
    pub override_value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage_adjustment: Option<Money>,
    pub requires_disclosure: bool,
    pub rbi_notification_required: bool,
}
