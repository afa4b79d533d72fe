use napi::Result as NapiResult;
use napi_derive::napi;

use orm_capital_core::analytics::{run_backtest, run_sensitivity, run_stress_test, run_what_if};
use orm_capital_core::calculation::{dispatch, validate_bundle, MethodInput};
use orm_capital_core::overrides::{workflow as override_workflow, OverrideStore, SupervisorOverride};
use orm_capital_core::parameters::{workflow as parameter_workflow, ParameterStore, ProposeChange};
use orm_capital_core::{Methodology, Money};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_methodology(s: &str) -> NapiResult<Methodology> {
    match s {
        "sma" => Ok(Methodology::Sma),
        "bia" => Ok(Methodology::Bia),
        "tsa" => Ok(Methodology::Tsa),
        other => Err(to_napi_error(format!("unknown methodology: {other}"))),
    }
}

// ---------------------------------------------------------------------------
// Calculation (§4.4)
// ---------------------------------------------------------------------------

/// Run a single SMA/BIA/TSA calculation against the methodology's active
/// parameter snapshot.
#[napi]
pub fn calculate(input_json: String) -> NapiResult<String> {
    let input: MethodInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let params = futures::executor::block_on(async {
        let store = ParameterStore::new();
        store.get_active(input.methodology()).await
    });
    let result = dispatch(&input, &params).map_err(to_napi_error)?;
    serde_json::to_string(&result).map_err(to_napi_error)
}

/// Validate a method bundle's shape without running the engine.
#[napi]
pub fn validate(input_json: String) -> NapiResult<String> {
    let input: MethodInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let violations = validate_bundle(&input);
    serde_json::to_string(&violations).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Analytics engine (§4.10)
// ---------------------------------------------------------------------------

#[napi]
pub fn stress_test(input_json: String, scenarios_json: String) -> NapiResult<String> {
    let input: MethodInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let scenarios = serde_json::from_str(&scenarios_json).map_err(to_napi_error)?;
    let params = futures::executor::block_on(async {
        let store = ParameterStore::new();
        store.get_active(input.methodology()).await
    });
    let output = run_stress_test(&input, &params, &scenarios).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn sensitivity(input_json: String, variable_json: String) -> NapiResult<String> {
    let input: MethodInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let variable = serde_json::from_str(&variable_json).map_err(to_napi_error)?;
    let params = futures::executor::block_on(async {
        let store = ParameterStore::new();
        store.get_active(input.methodology()).await
    });
    let output = run_sensitivity(&input, &params, &variable).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn backtest(methodology: String, quarters_json: String) -> NapiResult<String> {
    let methodology = parse_methodology(&methodology)?;
    let quarters = serde_json::from_str(&quarters_json).map_err(to_napi_error)?;
    let params = futures::executor::block_on(async {
        let store = ParameterStore::new();
        store.get_active(methodology).await
    });
    let output = run_backtest(&params, &quarters).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn what_if(input_json: String, overlay_json: String) -> NapiResult<String> {
    let input: MethodInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let overlay = serde_json::from_str(&overlay_json).map_err(to_napi_error)?;
    let params = futures::executor::block_on(async {
        let store = ParameterStore::new();
        store.get_active(input.methodology()).await
    });
    let output = run_what_if(&input, &params, &overlay).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Parameter governance (§4.6)
// ---------------------------------------------------------------------------

/// Run the full maker-checker-approver-activator pipeline for one parameter
/// change against a freshly seeded in-process store, returning the
/// activated version and its workflow audit trail.
#[napi]
#[allow(clippy::too_many_arguments)]
pub fn propose_activate_parameter(
    methodology: String,
    parameter_name: String,
    new_value_json: String,
    maker: String,
    checker: String,
    approver: String,
    activator: String,
    approval_reference: String,
    effective_date: String,
) -> NapiResult<String> {
    let methodology = parse_methodology(&methodology)?;
    let new_value = serde_json::from_str(&new_value_json).map_err(to_napi_error)?;
    let effective_date = chrono::NaiveDate::parse_from_str(&effective_date, "%Y-%m-%d").map_err(to_napi_error)?;

    futures::executor::block_on(async move {
        let store = ParameterStore::new();
        let version_id = parameter_workflow::propose(
            &store,
            ProposeChange {
                model_name: methodology,
                parameter_name,
                parameter_type: orm_capital_core::parameters::ParameterType::Coefficient,
                new_value,
                created_by: maker.clone(),
                justification: None,
            },
        )
        .await
        .map_err(to_napi_error)?;

        parameter_workflow::submit_for_review(&store, &version_id, &maker).await.map_err(to_napi_error)?;
        parameter_workflow::checker_approve(&store, &version_id, &checker, None).await.map_err(to_napi_error)?;
        parameter_workflow::submit_for_approval(&store, &version_id, &checker).await.map_err(to_napi_error)?;
        parameter_workflow::approver_approve(&store, &version_id, &approver, Some(approval_reference))
            .await
            .map_err(to_napi_error)?;
        let activated = parameter_workflow::activate(&store, &version_id, &activator, effective_date)
            .await
            .map_err(to_napi_error)?;
        let steps = store.steps_for(&version_id).await;

        serde_json::to_string(&serde_json::json!({ "activated_version": activated, "workflow_steps": steps }))
            .map_err(to_napi_error)
    })
}

// ---------------------------------------------------------------------------
// Supervisor overrides (§4.7)
// ---------------------------------------------------------------------------

/// Report the before/after impact analysis for a proposed override.
#[napi]
pub fn override_impact(override_json: String) -> NapiResult<String> {
    let override_: SupervisorOverride = serde_json::from_str(&override_json).map_err(to_napi_error)?;
    let impact = override_workflow::impact_analysis(&override_);
    serde_json::to_string(&impact).map_err(to_napi_error)
}

/// Run propose -> approve -> apply for one override against a fresh store.
#[napi]
pub fn override_propose_apply(
    override_json: String,
    approved_by: String,
    approval_reference: String,
    approval_date: String,
    applied_by: String,
) -> NapiResult<String> {
    let override_: SupervisorOverride = serde_json::from_str(&override_json).map_err(to_napi_error)?;
    let approval_date = chrono::NaiveDate::parse_from_str(&approval_date, "%Y-%m-%d").map_err(to_napi_error)?;

    futures::executor::block_on(async move {
        let store = OverrideStore::new();
        let id = override_workflow::propose(&store, override_).await.map_err(to_napi_error)?;
        override_workflow::approve(&store, &id, &approved_by, &approval_reference, approval_date, None)
            .await
            .map_err(to_napi_error)?;
        let applied = override_workflow::apply(&store, &id, &applied_by, approval_date).await.map_err(to_napi_error)?;
        let audit = store.audit_for(&id).await;
        serde_json::to_string(&serde_json::json!({ "override": applied, "audit_trail": audit })).map_err(to_napi_error)
    })
}

// ---------------------------------------------------------------------------
// Loss data (§4.3)
// ---------------------------------------------------------------------------

/// Validate and ingest a single loss event against a fresh store.
#[napi]
pub fn ingest_loss_event(event_json: String, min_loss_threshold: String) -> NapiResult<String> {
    let event = serde_json::from_str(&event_json).map_err(to_napi_error)?;
    let threshold: Money = min_loss_threshold.parse().map_err(to_napi_error)?;
    let result = futures::executor::block_on(async move {
        let store = orm_capital_core::loss_data::LossDataStore::new();
        store.ingest(event, threshold).await
    });
    serde_json::to_string(&result).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Consolidation (§4.5)
// ---------------------------------------------------------------------------

#[napi]
pub fn consolidate(
    entities_json: String,
    corporate_actions_json: String,
    bi_by_entity_json: String,
    losses_by_entity_json: String,
    request_json: String,
) -> NapiResult<String> {
    let entities = serde_json::from_str(&entities_json).map_err(to_napi_error)?;
    let corporate_actions = serde_json::from_str(&corporate_actions_json).map_err(to_napi_error)?;
    let bi_by_entity = serde_json::from_str(&bi_by_entity_json).map_err(to_napi_error)?;
    let losses_by_entity = serde_json::from_str(&losses_by_entity_json).map_err(to_napi_error)?;
    let request = serde_json::from_str(&request_json).map_err(to_napi_error)?;

    let result = orm_capital_core::consolidation::calculate_consolidated(
        &entities,
        &corporate_actions,
        &bi_by_entity,
        &losses_by_entity,
        &request,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&result).map_err(to_napi_error)
}
