//! Entity hierarchy, corporate actions, and consolidation mappings (§3, §4.5).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationLevel {
    Consolidated,
    SubConsolidated,
    Subsidiary,
}

/// A node in the entity hierarchy. Parent relations must form a forest —
/// acyclicity is enforced at ingestion (see [`crate::consolidation::engine`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub entity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_entity_id: Option<String>,
    pub consolidation_level: ConsolidationLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rbi_entity_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lei_code: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incorporation_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regulatory_approval_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationMethod {
    Full,
    Proportional,
    Equity,
}

/// Time-sliced mapping between a parent and a child entity. Only one mapping
/// per (parent, child) may be effective at any given date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationMapping {
    pub parent_entity_id: String,
    pub child_entity_id: String,
    pub consolidation_level: ConsolidationLevel,
    pub consolidation_method: ConsolidationMethod,
    pub ownership_percentage: Money,
    pub voting_control_percentage: Money,
    pub effective_from: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_to: Option<NaiveDate>,
}

impl ConsolidationMapping {
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.effective_from <= date && self.effective_to.map_or(true, |to| date <= to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorporateActionType {
    Acquisition,
    Divestiture,
    Merger,
    SpinOff,
    Restructuring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorporateActionStatus {
    Proposed,
    RbiApproved,
    Completed,
    Cancelled,
}

/// An M&A event that drives Business Indicator inclusion/exclusion
/// adjustments during consolidation (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorporateAction {
    pub id: String,
    pub action_type: CorporateActionType,
    pub status: CorporateActionStatus,
    pub target_entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquirer_entity_id: Option<String>,
    pub transaction_value: Money,
    pub ownership_percentage: Money,
    pub announcement_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rbi_approval_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDate>,
    pub effective_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rbi_approval_reference: Option<String>,
    pub requires_pillar3_disclosure: bool,
    pub disclosure_period_months: u32,
    pub prior_bi_inclusion_required: bool,
    pub bi_exclusion_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for CorporateAction {
    fn default() -> Self {
        Self {
            id: String::new(),
            action_type: CorporateActionType::Restructuring,
            status: CorporateActionStatus::Proposed,
            target_entity_id: String::new(),
            acquirer_entity_id: None,
            transaction_value: Money::ZERO,
            ownership_percentage: Money::ZERO,
            announcement_date: NaiveDate::MIN,
            rbi_approval_date: None,
            completion_date: None,
            effective_date: NaiveDate::MIN,
            rbi_approval_reference: None,
            requires_pillar3_disclosure: true,
            disclosure_period_months: 36,
            prior_bi_inclusion_required: false,
            bi_exclusion_required: false,
            description: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn mapping_effective_window_is_inclusive() {
        let mapping = ConsolidationMapping {
            parent_entity_id: "p".into(),
            child_entity_id: "c".into(),
            consolidation_level: ConsolidationLevel::Subsidiary,
            consolidation_method: ConsolidationMethod::Full,
            ownership_percentage: dec!(100),
            voting_control_percentage: dec!(100),
            effective_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            effective_to: Some(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
        };
        assert!(mapping.is_effective_on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(mapping.is_effective_on(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(!mapping.is_effective_on(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
    }
}
