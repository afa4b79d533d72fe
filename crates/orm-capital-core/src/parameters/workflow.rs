//! Maker-checker-approver-activator state machine (§4.6).
//!
//! Every transition appends a [`ParameterWorkflowStep`] and every
//! activation supersedes the previous active version through
//! [`super::store::ParameterStore::swap_active`], a single atomic write —
//! there is never a window where two versions of the same parameter are
//! simultaneously `active`.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::error::OrmError;

use super::model::{ImpactAnalysis, ImpactMagnitude, ParameterStatus, ParameterVersion, ParameterWorkflowStep, WorkflowRole};
use super::store::{ParameterStore, ProposeChange};

fn diff_hash(previous: &serde_json::Value, new_value: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(previous).unwrap_or_default());
    hasher.update(serde_json::to_vec(new_value).unwrap_or_default());
    format!("{:x}", hasher.finalize())
}

fn invalid_transition(version: &ParameterVersion, action: &str, target: ParameterStatus) -> OrmError {
    OrmError::ParameterWorkflowInvalidTransition {
        from: format!("{:?}", version.status),
        to: format!("{target:?}"),
        action: action.to_string(),
    }
}

async fn transition(
    store: &ParameterStore,
    version_id: &str,
    expected: ParameterStatus,
    target: ParameterStatus,
    action: &str,
    role: WorkflowRole,
    actor: &str,
    comment: Option<String>,
    mutate: impl FnOnce(&mut ParameterVersion),
) -> Result<ParameterVersion, OrmError> {
    let mut version = store
        .get_version(version_id)
        .await
        .ok_or_else(|| OrmError::InvalidInput {
            field: "version_id".to_string(),
            reason: format!("no such parameter version: {version_id}"),
        })?;
    if version.status != expected {
        return Err(invalid_transition(&version, action, target));
    }
    let from = version.status;
    version.status = target;
    mutate(&mut version);
    store.replace(version.clone()).await;
    tracing::info!("parameter {version_id} {action} by {actor}: {from:?} -> {target:?}");
    store
        .record_step(ParameterWorkflowStep {
            version_id: version_id.to_string(),
            actor: actor.to_string(),
            role,
            action: action.to_string(),
            from_status: from,
            to_status: target,
            timestamp: Utc::now().naive_utc(),
            comment,
        })
        .await;
    Ok(version)
}

/// `propose` — maker creates a draft from a target value.
pub async fn propose(store: &ParameterStore, change: ProposeChange) -> Result<String, OrmError> {
    let version_id = store.propose(change).await?;
    let version = store.get_version(&version_id).await.expect("just inserted");
    store
        .record_step(ParameterWorkflowStep {
            version_id: version_id.clone(),
            actor: version.created_by.clone(),
            role: WorkflowRole::Maker,
            action: "propose".to_string(),
            from_status: ParameterStatus::Draft,
            to_status: ParameterStatus::Draft,
            timestamp: Utc::now().naive_utc(),
            comment: version.justification.clone(),
        })
        .await;
    Ok(version_id)
}

/// `submit` — maker moves `draft → pending_review`.
pub async fn submit_for_review(store: &ParameterStore, version_id: &str, actor: &str) -> Result<ParameterVersion, OrmError> {
    transition(
        store,
        version_id,
        ParameterStatus::Draft,
        ParameterStatus::PendingReview,
        "submit",
        WorkflowRole::Maker,
        actor,
        None,
        |_| {},
    )
    .await
}

/// `approve` (checker) — `pending_review → reviewed`.
pub async fn checker_approve(store: &ParameterStore, version_id: &str, actor: &str, comment: Option<String>) -> Result<ParameterVersion, OrmError> {
    transition(
        store,
        version_id,
        ParameterStatus::PendingReview,
        ParameterStatus::Reviewed,
        "approve",
        WorkflowRole::Checker,
        actor,
        comment,
        |v| v.reviewed_by = Some(actor.to_string()),
    )
    .await
}

/// `reject` (checker) — `pending_review → rejected`, terminal.
pub async fn checker_reject(store: &ParameterStore, version_id: &str, actor: &str, reason: String) -> Result<ParameterVersion, OrmError> {
    transition(
        store,
        version_id,
        ParameterStatus::PendingReview,
        ParameterStatus::Rejected,
        "reject",
        WorkflowRole::Checker,
        actor,
        Some(reason),
        |v| v.reviewed_by = Some(actor.to_string()),
    )
    .await
}

/// `submit` (checker) — `reviewed → pending_approval`.
pub async fn submit_for_approval(store: &ParameterStore, version_id: &str, actor: &str) -> Result<ParameterVersion, OrmError> {
    transition(
        store,
        version_id,
        ParameterStatus::Reviewed,
        ParameterStatus::PendingApproval,
        "submit",
        WorkflowRole::Checker,
        actor,
        None,
        |_| {},
    )
    .await
}

/// `approve` (approver) — `pending_approval → approved`.
pub async fn approver_approve(
    store: &ParameterStore,
    version_id: &str,
    actor: &str,
    rbi_notification_reference: Option<String>,
) -> Result<ParameterVersion, OrmError> {
    transition(
        store,
        version_id,
        ParameterStatus::PendingApproval,
        ParameterStatus::Approved,
        "approve",
        WorkflowRole::Approver,
        actor,
        None,
        |v| {
            v.approved_by = Some(actor.to_string());
            v.rbi_notification_reference = rbi_notification_reference;
        },
    )
    .await
}

/// `reject` (approver) — `pending_approval → rejected`, terminal.
pub async fn approver_reject(store: &ParameterStore, version_id: &str, actor: &str, reason: String) -> Result<ParameterVersion, OrmError> {
    transition(
        store,
        version_id,
        ParameterStatus::PendingApproval,
        ParameterStatus::Rejected,
        "reject",
        WorkflowRole::Approver,
        actor,
        Some(reason),
        |v| v.approved_by = Some(actor.to_string()),
    )
    .await
}

/// `activate` (activator) — `approved → active`. Supersedes the previous
/// active version of the same `(model, parameter_name)` in one atomic swap.
pub async fn activate(
    store: &ParameterStore,
    version_id: &str,
    actor: &str,
    effective_date: NaiveDate,
) -> Result<ParameterVersion, OrmError> {
    let version = transition(
        store,
        version_id,
        ParameterStatus::Approved,
        ParameterStatus::Active,
        "activate",
        WorkflowRole::Activator,
        actor,
        None,
        |v| {
            v.effective_date = Some(effective_date);
            v.immutable_diff = Some(diff_hash(
                v.previous_value.as_ref().unwrap_or(&serde_json::Value::Null),
                &v.value,
            ));
        },
    )
    .await?;
    store
        .swap_active(version.model_name, &version.parameter_name, &version.version_id)
        .await?;
    Ok(version)
}

/// Rollback = a fresh proposal whose value mirrors `target_version`,
/// parented on the current active version.
pub async fn rollback(store: &ParameterStore, target_version_id: &str, actor: &str) -> Result<String, OrmError> {
    let target = store
        .get_version(target_version_id)
        .await
        .ok_or_else(|| OrmError::InvalidInput {
            field: "target_version_id".to_string(),
            reason: format!("no such parameter version: {target_version_id}"),
        })?;
    propose(
        store,
        ProposeChange {
            model_name: target.model_name,
            parameter_name: target.parameter_name.clone(),
            parameter_type: target.parameter_type,
            new_value: target.value.clone(),
            created_by: actor.to_string(),
            justification: Some(format!("rollback to {target_version_id}")),
        },
    )
    .await
}

fn relative_delta(previous: &serde_json::Value, new_value: &serde_json::Value) -> Option<Decimal> {
    let prev: Decimal = serde_json::from_value(previous.clone()).ok()?;
    let next: Decimal = serde_json::from_value(new_value.clone()).ok()?;
    if prev.is_zero() {
        return if next.is_zero() { Some(Decimal::ZERO) } else { None };
    }
    Some(((next - prev) / prev).abs())
}

/// Compare a proposed version against the currently active one (§4.6).
pub async fn impact_analysis(store: &ParameterStore, proposed_version_id: &str) -> Result<ImpactAnalysis, OrmError> {
    use super::model::ParameterType;

    let proposed = store
        .get_version(proposed_version_id)
        .await
        .ok_or_else(|| OrmError::InvalidInput {
            field: "proposed_version_id".to_string(),
            reason: format!("no such parameter version: {proposed_version_id}"),
        })?;
    let current_id = store
        .active_version_id(proposed.model_name, &proposed.parameter_name)
        .await;
    let current_value = match &current_id {
        Some(id) => store.get_version(id).await.map(|v| v.value),
        None => None,
    };

    let max_relative_delta = current_value
        .as_ref()
        .and_then(|c| relative_delta(c, &proposed.value))
        .unwrap_or(Decimal::ONE);

    let changed_keys = match (&current_value, &proposed.value) {
        (Some(serde_json::Value::Object(before)), serde_json::Value::Object(after)) => after
            .iter()
            .filter(|(k, v)| before.get(*k) != Some(*v))
            .map(|(k, _)| k.clone())
            .collect(),
        _ => vec![proposed.parameter_name.clone()],
    };

    let magnitude = if max_relative_delta >= Decimal::ONE || changed_keys.len() > 3 {
        ImpactMagnitude::Critical
    } else if max_relative_delta >= Decimal::new(25, 2) {
        ImpactMagnitude::High
    } else if max_relative_delta >= Decimal::new(5, 2) {
        ImpactMagnitude::Medium
    } else {
        ImpactMagnitude::Low
    };

    Ok(ImpactAnalysis {
        magnitude,
        max_relative_delta,
        changed_keys,
        affects_thresholds: matches!(proposed.parameter_type, ParameterType::Threshold),
        affects_coefficients: matches!(proposed.parameter_type, ParameterType::Coefficient | ParameterType::Multiplier),
        affects_flags: matches!(proposed.parameter_type, ParameterType::Flag),
    })
}
