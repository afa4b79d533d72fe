use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use orm_capital_core::calculation::dispatch::{dispatch, MethodInput};
use orm_capital_core::calculation::bia::{BiaInput, GrossIncomeYear};
use orm_capital_core::error::OrmError;
use orm_capital_core::jobs::{CalculationRequest, CalculationWorker, ExecutionMode, JobOutcome, JobScheduler, SchedulerConfig};
use orm_capital_core::lineage::{AuditLedger, AuditOperation};
use orm_capital_core::overrides::model::{OverrideReason, OverrideStatus, OverrideType, SupervisorOverride};
use orm_capital_core::overrides::{workflow as override_workflow, OverrideStore};
use orm_capital_core::parameters::ParameterStore;
use orm_capital_core::types::Methodology;

fn sample_override(percentage: rust_decimal::Decimal) -> SupervisorOverride {
    SupervisorOverride {
        id: "OV-E2E-1".to_string(),
        override_type: OverrideType::CapitalAdjustment,
        status: OverrideStatus::Proposed,
        entity_id: "ENT1".to_string(),
        calculation_run_id: None,
        original_value: serde_json::json!("1000000"),
        override_value: serde_json::json!("1100000"),
        percentage_adjustment: Some(percentage),
        override_reason: OverrideReason::ConservativeAdjustment,
        detailed_justification: "quarterly review adjustment".to_string(),
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

/// Propose -> approve -> apply against a live store, then confirm the
/// audit trail recorded exactly those three transitions in order.
#[tokio::test]
async fn override_lifecycle_produces_ordered_audit_trail() {
    let store = OverrideStore::new();
    let id = override_workflow::propose(&store, sample_override(dec!(10))).await.unwrap();

    let proposed = store.get(&id).await.unwrap();
    assert!(proposed.requires_disclosure, "10% adjustment crosses the disclosure threshold");

    override_workflow::approve(&store, &id, "approver1", "REF-1", NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), None)
        .await
        .unwrap();
    let applied = override_workflow::apply(&store, &id, "applier1", NaiveDate::from_ymd_opt(2026, 1, 10).unwrap())
        .await
        .unwrap();
    assert_eq!(applied.status, OverrideStatus::Applied);

    let audit = store.audit_for(&id).await;
    let actions: Vec<&str> = audit.iter().map(|row| row.action_type.as_str()).collect();
    assert_eq!(actions, vec!["propose", "approve", "apply"]);
}

/// A worker wired to the SMA/BIA/TSA dispatcher runs under the bounded
/// scheduler without it knowing which methodology it invoked.
struct DispatchWorker {
    input: MethodInput,
    params: orm_capital_core::parameters::ParameterSnapshot,
}

impl CalculationWorker for DispatchWorker {
    fn run(&self, _request: &CalculationRequest) -> Result<serde_json::Value, OrmError> {
        let result = dispatch(&self.input, &self.params)?;
        Ok(serde_json::to_value(result)?)
    }
}

#[tokio::test]
async fn scheduler_runs_injected_dispatch_worker_synchronously() {
    let param_store = ParameterStore::new();
    let params = param_store.get_active(Methodology::Bia).await;
    let input = MethodInput::Bia(BiaInput {
        entity_id: "ENT1".to_string(),
        years: vec![GrossIncomeYear { year: 2025, gross_income: dec!(1e9), excluded_items: dec!(0) }],
    });
    let worker = Arc::new(DispatchWorker { input, params });

    let scheduler = JobScheduler::new(SchedulerConfig::default());
    let request = CalculationRequest {
        model_name: Methodology::Bia,
        execution_mode: ExecutionMode::Sync,
        entity_id: "ENT1".to_string(),
        calculation_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        parameters_overlay: None,
        idempotency_key: None,
        correlation_id: None,
        callback_url: None,
    };

    let outcome = scheduler.submit(request, worker).await;
    let value = match outcome {
        JobOutcome::Sync(value) => value,
        JobOutcome::Async(_) => panic!("expected a synchronous result for a fast worker"),
    };
    assert_eq!(value["method"], "bia");
    assert!(value["orc"].is_string());
}

/// Append three rows to one run's audit chain and confirm the hash chain
/// both verifies and carries the operations in append order.
#[tokio::test]
async fn lineage_chain_records_full_run_lifecycle() {
    let ledger = AuditLedger::new();
    let run_id = "RUN-E2E-1";

    ledger
        .append(run_id, AuditOperation::CalculationStarted, "system", None, None, "envhash".to_string(), Default::default(), None)
        .await
        .unwrap();
    ledger
        .append(
            run_id,
            AuditOperation::ParameterVersionsRecorded,
            "system",
            None,
            None,
            "envhash".to_string(),
            [("alpha".to_string(), "bia:alpha:v1".to_string())].into_iter().collect(),
            None,
        )
        .await
        .unwrap();
    ledger
        .append(
            run_id,
            AuditOperation::CalculationCompleted,
            "system",
            Some("inhash".to_string()),
            Some("outhash".to_string()),
            "envhash".to_string(),
            Default::default(),
            Some("bia-v1".to_string()),
        )
        .await
        .unwrap();

    let (intact, per_row) = ledger.verify_integrity(run_id).await.unwrap();
    assert!(intact);
    assert_eq!(per_row, vec![true, true, true]);

    let chain = ledger.chain_for(run_id).await;
    let ops: Vec<_> = chain.iter().map(|row| row.operation).collect();
    assert_eq!(
        ops,
        vec![
            AuditOperation::CalculationStarted,
            AuditOperation::ParameterVersionsRecorded,
            AuditOperation::CalculationCompleted,
        ]
    );
}
