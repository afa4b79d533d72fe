//! Supervisor-override state machine (§4.7).

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::OrmError;

use super::model::{OverrideAuditLog, OverrideImpactAnalysis, OverrideReason, OverrideStatus, OverrideType, SupervisorOverride};
use super::store::OverrideStore;

const MIN_PCT_ADJUSTMENT: Decimal = dec!(-100);
const MAX_PCT_ADJUSTMENT: Decimal = dec!(1000);
const DISCLOSURE_PCT_THRESHOLD: Decimal = dec!(10);
const DISCLOSURE_MONTHS_ON_MAGNITUDE: u32 = 12;

fn invalid(override_: &SupervisorOverride, action: &str) -> OrmError {
    OrmError::OverrideInvalidTransition(override_.id.clone(), format!("{action} not permitted from {:?}", override_.status))
}

/// Validate the invariants that must hold at proposal time (§4.7) and
/// derive the mandatory disclosure/notification flags.
pub fn validate_and_prepare(mut override_: SupervisorOverride) -> Result<SupervisorOverride, OrmError> {
    if let Some(pct) = override_.percentage_adjustment {
        if pct < MIN_PCT_ADJUSTMENT || pct > MAX_PCT_ADJUSTMENT {
            return Err(OrmError::InvalidInput {
                field: "percentage_adjustment".to_string(),
                reason: format!("must be within [-100, 1000], got {pct}"),
            });
        }
    }
    if let Some(to) = override_.effective_to {
        if to <= override_.effective_from {
            return Err(OrmError::InvalidDateSequence {
                reason: "effective_to must be after effective_from".to_string(),
            });
        }
    }

    if override_.override_type == OverrideType::IlmOverride {
        override_.requires_disclosure = true;
        override_.rbi_notification_required = true;
    }
    if override_
        .percentage_adjustment
        .map_or(false, |pct| pct.abs() >= DISCLOSURE_PCT_THRESHOLD)
    {
        override_.requires_disclosure = true;
        override_.disclosure_period_months = DISCLOSURE_MONTHS_ON_MAGNITUDE;
    }

    override_.status = OverrideStatus::Proposed;
    Ok(override_)
}

pub async fn propose(store: &OverrideStore, override_: SupervisorOverride) -> Result<String, OrmError> {
    let prepared = validate_and_prepare(override_)?;
    let id = prepared.id.clone();
    store.insert(prepared).await;
    store
        .record_audit(OverrideAuditLog {
            override_id: id.clone(),
            action_type: "propose".to_string(),
            action_by: store.get(&id).await.expect("just inserted").proposed_by,
            action_date: Utc::now().naive_utc(),
            previous_status: None,
            new_status: OverrideStatus::Proposed,
            reason: None,
        })
        .await;
    tracing::info!("override {id} proposed");
    Ok(id)
}

/// `approve` — `proposed → approved`. Requires `approved_by`,
/// `approval_reference`, `approval_date`, and (when flagged) an RBI
/// notification reference.
pub async fn approve(
    store: &OverrideStore,
    id: &str,
    approved_by: &str,
    approval_reference: &str,
    approval_date: NaiveDate,
    rbi_notification_reference: Option<String>,
) -> Result<SupervisorOverride, OrmError> {
    let mut override_ = store.get(id).await.ok_or_else(|| OrmError::InvalidInput {
        field: "id".to_string(),
        reason: format!("no such override: {id}"),
    })?;
    if override_.status != OverrideStatus::Proposed {
        return Err(invalid(&override_, "approve"));
    }
    if override_.rbi_notification_required && rbi_notification_reference.is_none() {
        return Err(OrmError::MissingRbiApproval { context: id.to_string() });
    }

    let previous = override_.status;
    override_.status = OverrideStatus::Approved;
    override_.approved_by = Some(approved_by.to_string());
    override_.approval_reference = Some(approval_reference.to_string());
    override_.approval_date = Some(approval_date);
    if let Some(reference) = rbi_notification_reference {
        override_.rbi_notification_reference = Some(reference);
        override_.rbi_notification_date = Some(approval_date);
    }
    store.replace(override_.clone()).await;
    store
        .record_audit(OverrideAuditLog {
            override_id: id.to_string(),
            action_type: "approve".to_string(),
            action_by: approved_by.to_string(),
            action_date: Utc::now().naive_utc(),
            previous_status: Some(previous),
            new_status: OverrideStatus::Approved,
            reason: None,
        })
        .await;
    tracing::info!("override {id} approved by {approved_by}");
    Ok(override_)
}

pub async fn reject(store: &OverrideStore, id: &str, rejected_by: &str, reason: String) -> Result<SupervisorOverride, OrmError> {
    let mut override_ = store.get(id).await.ok_or_else(|| OrmError::InvalidInput {
        field: "id".to_string(),
        reason: format!("no such override: {id}"),
    })?;
    if override_.status != OverrideStatus::Proposed {
        return Err(invalid(&override_, "reject"));
    }
    let previous = override_.status;
    override_.status = OverrideStatus::Rejected;
    store.replace(override_.clone()).await;
    store
        .record_audit(OverrideAuditLog {
            override_id: id.to_string(),
            action_type: "reject".to_string(),
            action_by: rejected_by.to_string(),
            action_date: Utc::now().naive_utc(),
            previous_status: Some(previous),
            new_status: OverrideStatus::Rejected,
            reason: Some(reason),
        })
        .await;
    tracing::info!("override {id} rejected by {rejected_by}");
    Ok(override_)
}

/// `apply` — `approved → applied`. Only permitted once `effective_from` has
/// arrived (§8 testable property).
pub async fn apply(store: &OverrideStore, id: &str, applied_by: &str, today: NaiveDate) -> Result<SupervisorOverride, OrmError> {
    let mut override_ = store.get(id).await.ok_or_else(|| OrmError::InvalidInput {
        field: "id".to_string(),
        reason: format!("no such override: {id}"),
    })?;
    if override_.status != OverrideStatus::Approved {
        return Err(OrmError::OverrideNotApproved(id.to_string()));
    }
    if override_.effective_from > today {
        return Err(invalid(&override_, "apply (effective_from is in the future)"));
    }
    let previous = override_.status;
    override_.status = OverrideStatus::Applied;
    override_.applied_by = Some(applied_by.to_string());
    override_.applied_date = Some(today);
    store.replace(override_.clone()).await;
    store
        .record_audit(OverrideAuditLog {
            override_id: id.to_string(),
            action_type: "apply".to_string(),
            action_by: applied_by.to_string(),
            action_date: Utc::now().naive_utc(),
            previous_status: Some(previous),
            new_status: OverrideStatus::Applied,
            reason: None,
        })
        .await;
    tracing::info!("override {id} applied by {applied_by}");
    Ok(override_)
}

/// `expire` — `applied → expired`, terminal; fires once `effective_to` has
/// passed.
pub async fn expire(store: &OverrideStore, id: &str, today: NaiveDate) -> Result<SupervisorOverride, OrmError> {
    let mut override_ = store.get(id).await.ok_or_else(|| OrmError::InvalidInput {
        field: "id".to_string(),
        reason: format!("no such override: {id}"),
    })?;
    if override_.status != OverrideStatus::Applied {
        return Err(invalid(&override_, "expire"));
    }
    let past_window = override_.effective_to.map_or(false, |to| today > to);
    if !past_window {
        return Err(invalid(&override_, "expire (effective_to has not yet passed)"));
    }
    let previous = override_.status;
    override_.status = OverrideStatus::Expired;
    store.replace(override_.clone()).await;
    store
        .record_audit(OverrideAuditLog {
            override_id: id.to_string(),
            action_type: "expire".to_string(),
            action_by: "system".to_string(),
            action_date: Utc::now().naive_utc(),
            previous_status: Some(previous),
            new_status: OverrideStatus::Expired,
            reason: None,
        })
        .await;
    tracing::warn!("override {id} expired");
    Ok(override_)
}

pub fn impact_analysis(override_: &SupervisorOverride) -> OverrideImpactAnalysis {
    OverrideImpactAnalysis {
        override_id: override_.id.clone(),
        original_value: override_.original_value.clone(),
        override_value: override_.override_value.clone(),
        percentage_adjustment: override_.percentage_adjustment,
        requires_disclosure: override_.requires_disclosure,
        rbi_notification_required: override_.rbi_notification_required,
    }
}

/// Whether `reason` is one the closed [`OverrideReason`] enum is fine with
/// disclosing under its own name (i.e. not `Other`).
pub fn is_disclosable_reason(reason: OverrideReason) -> bool {
    !matches!(reason, OverrideReason::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_override(id: &str, pct: Decimal) -> SupervisorOverride {
        SupervisorOverride {
            id: id.to_string(),
            override_type: OverrideType::CapitalAdjustment,
            status: OverrideStatus::Proposed,
            entity_id: "ENT1".to_string(),
            calculation_run_id: None,
            original_value: serde_json::json!("1000000"),
            override_value: serde_json::json!("1100000"),
            percentage_adjustment: Some(pct),
            override_reason: OverrideReason::ConservativeAdjustment,
            detailed_justification: "stress scenario".to_string(),
            supporting_documentation: None,
            proposed_by: "maker1".to_string(),
            approved_by: None,
            approval_date: None,
            approval_reference: None,
            effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            effective_to: Some(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()),
            requires_disclosure: false,
            disclosure_period_months: 0,
            rbi_notification_required: false,
            rbi_notification_date: None,
            rbi_notification_reference: None,
            applied_date: None,
            applied_by: None,
        }
    }

    #[tokio::test]
    async fn apply_rejected_before_effective_from() {
        let store = OverrideStore::new();
        let id = propose(&store, sample_override("OV1", dec!(5))).await.unwrap();
        approve(&store, &id, "approver1", "REF1", NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(), None)
            .await
            .unwrap();
        let err = apply(&store, &id, "applier1", NaiveDate::from_ymd_opt(2025, 12, 15).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "OVERRIDE_NOT_APPROVED");
    }

    #[tokio::test]
    async fn large_adjustment_forces_disclosure() {
        let store = OverrideStore::new();
        let id = propose(&store, sample_override("OV2", dec!(15))).await.unwrap();
        let override_ = store.get(&id).await.unwrap();
        assert!(override_.requires_disclosure);
        assert_eq!(override_.disclosure_period_months, 12);
    }

    #[tokio::test]
    async fn out_of_range_percentage_is_rejected() {
        let store = OverrideStore::new();
        let err = propose(&store, sample_override("OV3", dec!(2000))).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn ilm_override_always_requires_notification() {
        let mut override_ = sample_override("OV4", dec!(1));
        override_.override_type = OverrideType::IlmOverride;
        let prepared = validate_and_prepare(override_).unwrap();
        assert!(prepared.requires_disclosure);
        assert!(prepared.rbi_notification_required);
    }
}
