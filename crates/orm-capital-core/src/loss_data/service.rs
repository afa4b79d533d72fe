//! Loss-data governance pipeline (§4.3, C3): ingest, recovery netting,
//! RBI-approved exclusion, and the windowed query calculation engines read.

use std::collections::HashMap;

use chrono::{Months, NaiveDate};
use tokio::sync::RwLock;

use crate::error::OrmError;
use crate::types::{Money, ValidationError, ValidationResult};

use super::model::{ExclusionReason, LossEvent, Recovery, RbiApprovalMetadata};

const EXCLUSION_DISCLOSURE_MONTHS: u32 = 12;

#[derive(Default)]
pub struct LossDataStore {
    events: RwLock<HashMap<String, LossEvent>>,
    recoveries: RwLock<HashMap<String, Vec<Recovery>>>,
}

impl LossDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and persist a single loss event (§4.3). Never throws —
    /// rejection is reported as data via [`ValidationResult`].
    pub async fn ingest(&self, mut event: LossEvent, min_loss_threshold: Money) -> ValidationResult {
        let mut errors = Vec::new();

        if event.entity_id.trim().is_empty() {
            errors.push(ValidationError::new("MISSING_REQUIRED_FIELD", "entity_id is required").on_field("entity_id"));
        }
        if !(event.occurrence_date <= event.discovery_date && event.discovery_date <= event.accounting_date) {
            errors.push(
                ValidationError::new(
                    "INVALID_DATE_SEQUENCE",
                    "occurrence_date <= discovery_date <= accounting_date must hold",
                )
                .on_field("occurrence_date"),
            );
        }
        if event.gross_amount <= Money::ZERO {
            errors.push(ValidationError::new("VALIDATION_ERROR", "gross_amount must be positive").on_field("gross_amount"));
        } else if event.gross_amount < min_loss_threshold {
            errors.push(
                ValidationError::new(
                    "BELOW_THRESHOLD",
                    format!("gross_amount {} is below the minimum loss threshold {min_loss_threshold}", event.gross_amount),
                )
                .on_field("gross_amount"),
            );
        }

        if !errors.is_empty() {
            tracing::warn!("loss event {} rejected: {} error(s)", event.id, errors.len());
            return ValidationResult::rejected(1, errors);
        }

        event.net_amount = event.gross_amount;
        event.is_excluded = false;
        event.exclusion_reason = None;
        event.disclosure_required = false;
        event.disclosure_expires = None;

        let id = event.id.clone();
        self.events.write().await.insert(event.id.clone(), event);
        tracing::info!("loss event {id} ingested");
        ValidationResult::accepted(1)
    }

    /// Attach a recovery, recomputing `net_amount` (§4.3).
    pub async fn attach_recovery(&self, event_id: &str, recovery: Recovery) -> ValidationResult {
        let mut events = self.events.write().await;
        let Some(event) = events.get_mut(event_id) else {
            return ValidationResult::rejected(
                1,
                vec![ValidationError::new("MISSING_REQUIRED_FIELD", format!("no such loss event: {event_id}"))],
            );
        };

        let mut errors = Vec::new();
        if recovery.amount <= Money::ZERO {
            errors.push(ValidationError::new("VALIDATION_ERROR", "recovery amount must be positive").on_field("amount"));
        }
        if recovery.receipt_date < event.occurrence_date {
            errors.push(
                ValidationError::new("INVALID_DATE_SEQUENCE", "receipt_date must be on or after occurrence_date")
                    .on_field("receipt_date"),
            );
        }

        let mut recoveries = self.recoveries.write().await;
        let existing_total: Money = recoveries
            .get(event_id)
            .map(|rs| rs.iter().map(|r| r.amount).sum())
            .unwrap_or(Money::ZERO);
        if existing_total + recovery.amount > event.gross_amount {
            errors.push(
                ValidationError::new(
                    "VALIDATION_ERROR",
                    "running total of recoveries would exceed gross_amount",
                )
                .on_field("amount"),
            );
        }

        if !errors.is_empty() {
            return ValidationResult::rejected(1, errors);
        }

        recoveries.entry(event_id.to_string()).or_default().push(recovery.clone());
        event.net_amount = event.gross_amount - (existing_total + recovery.amount);
        ValidationResult::accepted(1)
    }

    /// Toggle exclusion for a loss event. Requires complete RBI approval
    /// metadata; sets a 12-month disclosure window on success (§4.3).
    pub async fn exclude(
        &self,
        event_id: &str,
        reason: ExclusionReason,
        approval: Option<RbiApprovalMetadata>,
        today: NaiveDate,
    ) -> Result<(), OrmError> {
        let Some(approval) = approval else {
            return Err(OrmError::MissingRbiApproval { context: event_id.to_string() });
        };
        if approval.approval_reference.trim().is_empty()
            || approval.approving_authority.trim().is_empty()
            || approval.approval_reason.trim().is_empty()
        {
            return Err(OrmError::IncompleteRbiApproval {
                context: event_id.to_string(),
                reason: "approval_reference, approving_authority and approval_reason are all required".to_string(),
            });
        }
        if approval.approval_date > today {
            return Err(OrmError::IncompleteRbiApproval {
                context: event_id.to_string(),
                reason: "approval_date must not be in the future".to_string(),
            });
        }

        let mut events = self.events.write().await;
        let event = events.get_mut(event_id).ok_or_else(|| OrmError::InvalidInput {
            field: "event_id".to_string(),
            reason: format!("no such loss event: {event_id}"),
        })?;

        event.is_excluded = true;
        event.exclusion_reason = Some(reason);
        event.disclosure_required = true;
        event.disclosure_expires = today.checked_add_months(Months::new(EXCLUSION_DISCLOSURE_MONTHS));
        event.rbi_approval = Some(approval);
        tracing::info!("loss event {event_id} excluded: {reason:?}");
        Ok(())
    }

    /// Non-excluded, above-threshold events for one entity whose
    /// `accounting_date` falls in `[date - horizon_years, date]` (§4.3).
    pub async fn query_for_calculation(
        &self,
        entity_id: &str,
        horizon_years: u32,
        date: NaiveDate,
        min_loss_threshold: Money,
    ) -> Vec<LossEvent> {
        let window_start = date
            .checked_sub_months(Months::new(horizon_years * 12))
            .unwrap_or(NaiveDate::MIN);
        let events = self.events.read().await;
        let mut rows: Vec<LossEvent> = events
            .values()
            .filter(|e| {
                e.entity_id == entity_id
                    && !e.is_excluded
                    && e.gross_amount >= min_loss_threshold
                    && e.accounting_date >= window_start
                    && e.accounting_date <= date
            })
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.accounting_date);
        rows
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::types::{BusinessLine, EventType};

    use super::*;

    fn sample_event(id: &str, accounting_date: NaiveDate, gross: Money) -> LossEvent {
        LossEvent {
            id: id.to_string(),
            entity_id: "ENT1".to_string(),
            event_type: EventType::ExternalFraud,
            business_line: BusinessLine::RetailBanking,
            occurrence_date: accounting_date,
            discovery_date: accounting_date,
            accounting_date,
            gross_amount: gross,
            net_amount: gross,
            is_excluded: false,
            exclusion_reason: None,
            rbi_approval: None,
            disclosure_required: false,
            disclosure_expires: None,
        }
    }

    #[tokio::test]
    async fn ingest_rejects_below_threshold() {
        let store = LossDataStore::new();
        let event = sample_event("L1", NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), dec!(99_999));
        let result = store.ingest(event, dec!(100_000)).await;
        assert!(!result.success);
        assert_eq!(result.errors[0].error_code, "BELOW_THRESHOLD");
    }

    #[tokio::test]
    async fn ingest_accepts_at_threshold_boundary() {
        let store = LossDataStore::new();
        let event = sample_event("L1", NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), dec!(100_000));
        let result = store.ingest(event, dec!(100_000)).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn recovery_caps_at_gross_amount() {
        let store = LossDataStore::new();
        let event = sample_event("L1", NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), dec!(1_000_000));
        store.ingest(event, dec!(100_000)).await;
        let r1 = Recovery {
            loss_event_id: "L1".to_string(),
            amount: dec!(600_000),
            receipt_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            recovery_type: "insurance".to_string(),
        };
        assert!(store.attach_recovery("L1", r1).await.success);
        let r2 = Recovery {
            loss_event_id: "L1".to_string(),
            amount: dec!(500_000),
            receipt_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            recovery_type: "insurance".to_string(),
        };
        let result = store.attach_recovery("L1", r2).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn exclude_requires_complete_approval() {
        let store = LossDataStore::new();
        let event = sample_event("L1", NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), dec!(1_000_000));
        store.ingest(event, dec!(100_000)).await;
        let incomplete = RbiApprovalMetadata {
            approval_reference: String::new(),
            approval_date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            approving_authority: "RBI".to_string(),
            approval_reason: "data quality".to_string(),
        };
        let err = store
            .exclude("L1", ExclusionReason::DataQualityIssue, Some(incomplete), NaiveDate::from_ymd_opt(2025, 1, 3).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INCOMPLETE_RBI_APPROVAL");
    }

    #[tokio::test]
    async fn exclude_requires_approval_at_all() {
        let store = LossDataStore::new();
        let event = sample_event("L1", NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), dec!(1_000_000));
        store.ingest(event, dec!(100_000)).await;
        let err = store
            .exclude("L1", ExclusionReason::DataQualityIssue, None, NaiveDate::from_ymd_opt(2025, 1, 3).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "MISSING_RBI_APPROVAL");
    }
}
