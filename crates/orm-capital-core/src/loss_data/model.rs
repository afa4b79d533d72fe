//! Loss-data entities (§3).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{BusinessLine, EventType, Money};

/// One (entity, period) Business Indicator row. Created by ingestion, never
/// mutated; superseded only by a new version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessIndicator {
    pub entity_id: String,
    pub period: String,
    pub calculation_date: NaiveDate,
    pub ildc: Money,
    pub sc: Money,
    pub fc: Money,
}

impl BusinessIndicator {
    /// `BI = |ILDC| + max(0, SC) + |FC|` (§4.4.1).
    pub fn bi_total(&self) -> Money {
        self.ildc.abs() + self.sc.max(Money::ZERO) + self.fc.abs()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExclusionReason {
    DataQualityIssue,
    LegalSettlementFinalized,
    RegulatoryGuidance,
    Other(String),
}

/// Approval metadata required before an exclusion or certain overrides can
/// be applied (§4.3). All four fields must be present and complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbiApprovalMetadata {
    pub approval_reference: String,
    pub approval_date: NaiveDate,
    pub approving_authority: String,
    pub approval_reason: String,
}

/// An operational loss event (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossEvent {
    pub id: String,
    pub entity_id: String,
    pub event_type: EventType,
    pub business_line: BusinessLine,
    pub occurrence_date: NaiveDate,
    pub discovery_date: NaiveDate,
    pub accounting_date: NaiveDate,
    pub gross_amount: Money,
    pub net_amount: Money,
    pub is_excluded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusion_reason: Option<ExclusionReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rbi_approval: Option<RbiApprovalMetadata>,
    pub disclosure_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosure_expires: Option<NaiveDate>,
}

/// A recovery against a loss event's gross amount (§3). Created at any time
/// after the parent event; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recovery {
    pub loss_event_id: String,
    pub amount: Money,
    pub receipt_date: NaiveDate,
    pub recovery_type: String,
}
