use std::error::Error;

use chrono::NaiveDate;
use clap::Args;
use orm_capital_core::parameters::{workflow, ParameterStore, ParameterType, ProposeChange};
use orm_capital_core::Methodology;
use serde_json::Value;

fn parse_methodology(s: &str) -> Result<Methodology, Box<dyn Error>> {
    match s {
        "sma" => Ok(Methodology::Sma),
        "bia" => Ok(Methodology::Bia),
        "tsa" => Ok(Methodology::Tsa),
        other => Err(format!("unknown methodology: {other}").into()),
    }
}

fn parse_parameter_type(s: &str) -> Result<ParameterType, Box<dyn Error>> {
    match s {
        "coefficient" => Ok(ParameterType::Coefficient),
        "threshold" => Ok(ParameterType::Threshold),
        "multiplier" => Ok(ParameterType::Multiplier),
        "flag" => Ok(ParameterType::Flag),
        "mapping" => Ok(ParameterType::Mapping),
        "formula" => Ok(ParameterType::Formula),
        other => Err(format!("unknown parameter_type: {other}").into()),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, Box<dyn Error>> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{s}': {e}").into())
}

/// Show the currently active parameter snapshot seeded for a methodology.
#[derive(Args)]
pub struct ActiveArgs {
    /// sma | bia | tsa
    #[arg(long)]
    pub methodology: String,
}

pub async fn run_active(args: ActiveArgs) -> Result<Value, Box<dyn Error>> {
    let methodology = parse_methodology(&args.methodology)?;
    let store = ParameterStore::new();
    let snapshot = store.get_active(methodology).await;
    Ok(serde_json::to_value(snapshot)?)
}

/// Run the full maker-checker-approver-activator pipeline for one parameter
/// change (§4.6) against a freshly seeded store, printing every workflow
/// step and the resulting impact analysis.
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ProposeActivateArgs {
    #[arg(long)]
    pub methodology: String,
    #[arg(long)]
    pub parameter_name: String,
    #[arg(long)]
    pub parameter_type: String,
    /// New value as a JSON literal, e.g. "0.13" or "true"
    #[arg(long)]
    pub new_value: String,
    #[arg(long)]
    pub maker: String,
    #[arg(long)]
    pub checker: String,
    #[arg(long)]
    pub approver: String,
    #[arg(long)]
    pub activator: String,
    #[arg(long)]
    pub justification: Option<String>,
    /// Required when the checked parameter triggers an RBI notification
    #[arg(long)]
    pub rbi_notification_reference: Option<String>,
    #[arg(long)]
    pub approval_reference: String,
    /// YYYY-MM-DD
    #[arg(long)]
    pub approval_date: String,
    /// YYYY-MM-DD
    #[arg(long)]
    pub effective_date: String,
}

pub async fn run_propose_activate(args: ProposeActivateArgs) -> Result<Value, Box<dyn Error>> {
    let methodology = parse_methodology(&args.methodology)?;
    let parameter_type = parse_parameter_type(&args.parameter_type)?;
    let new_value: Value = serde_json::from_str(&args.new_value)?;
    let approval_date = parse_date(&args.approval_date)?;
    let effective_date = parse_date(&args.effective_date)?;

    let store = ParameterStore::new();
    let version_id = workflow::propose(
        &store,
        ProposeChange {
            model_name: methodology,
            parameter_name: args.parameter_name,
            parameter_type,
            new_value,
            created_by: args.maker.clone(),
            justification: args.justification,
        },
    )
    .await?;

    let impact = workflow::impact_analysis(&store, &version_id).await?;

    workflow::submit_for_review(&store, &version_id, &args.maker).await?;
    workflow::checker_approve(&store, &version_id, &args.checker, None).await?;
    workflow::submit_for_approval(&store, &version_id, &args.checker).await?;
    workflow::approver_approve(&store, &version_id, &args.approver, Some(args.approval_reference)).await?;
    let activated = workflow::activate(&store, &version_id, &args.activator, effective_date).await?;

    let steps = store.steps_for(&version_id).await;
    let _ = approval_date;
    Ok(serde_json::json!({
        "version_id": version_id,
        "impact_analysis": impact,
        "activated_version": activated,
        "workflow_steps": steps,
    }))
}

/// Rollback the active version of `parameter_name` back to `target_version_id`.
#[derive(Args)]
pub struct RollbackArgs {
    #[arg(long)]
    pub target_version_id: String,
    #[arg(long)]
    pub actor: String,
}

pub async fn run_rollback(args: RollbackArgs) -> Result<Value, Box<dyn Error>> {
    let store = ParameterStore::new();
    let version_id = workflow::rollback(&store, &args.target_version_id, &args.actor).await?;
    Ok(serde_json::json!({ "version_id": version_id }))
}
