use std::error::Error;

use chrono::NaiveDate;
use clap::Args;
use orm_capital_core::overrides::{workflow, OverrideStore, SupervisorOverride};
use serde_json::Value;

use crate::input;

fn parse_date(s: &str) -> Result<NaiveDate, Box<dyn Error>> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{s}': {e}").into())
}

/// Report the before/after comparison and disclosure flags for a proposed
/// override, without touching a store (§4.7 — a pure function).
#[derive(Args)]
pub struct ImpactArgs {
    /// Path to a JSON `SupervisorOverride` object
    #[arg(long)]
    pub input: String,
}

pub fn run_impact(args: ImpactArgs) -> Result<Value, Box<dyn Error>> {
    let override_: SupervisorOverride = input::file::read_json(&args.input)?;
    let impact = workflow::impact_analysis(&override_);
    Ok(serde_json::to_value(impact)?)
}

/// Run propose -> approve -> apply against a fresh store, in one shot, and
/// return the resulting override plus its audit trail.
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ProposeApplyArgs {
    /// Path to a JSON `SupervisorOverride` object (status is ignored; the
    /// workflow sets it to `proposed` on intake)
    #[arg(long)]
    pub input: String,
    #[arg(long)]
    pub approved_by: String,
    #[arg(long)]
    pub approval_reference: String,
    /// YYYY-MM-DD
    #[arg(long)]
    pub approval_date: String,
    #[arg(long)]
    pub rbi_notification_reference: Option<String>,
    #[arg(long)]
    pub applied_by: String,
    /// YYYY-MM-DD; defaults to approval_date when omitted
    #[arg(long)]
    pub apply_date: Option<String>,
}

pub async fn run_propose_apply(args: ProposeApplyArgs) -> Result<Value, Box<dyn Error>> {
    let override_: SupervisorOverride = input::file::read_json(&args.input)?;
    let approval_date = parse_date(&args.approval_date)?;
    let apply_date = match &args.apply_date {
        Some(s) => parse_date(s)?,
        None => approval_date,
    };

    let store = OverrideStore::new();
    let id = workflow::propose(&store, override_).await?;
    let approved = workflow::approve(
        &store,
        &id,
        &args.approved_by,
        &args.approval_reference,
        approval_date,
        args.rbi_notification_reference,
    )
    .await?;
    let applied = workflow::apply(&store, &id, &args.applied_by, apply_date).await?;
    let audit = store.audit_for(&id).await;

    let _ = approved;
    Ok(serde_json::json!({
        "override": applied,
        "audit_trail": audit,
    }))
}

/// Reject a proposed override.
#[derive(Args)]
pub struct RejectArgs {
    #[arg(long)]
    pub input: String,
    #[arg(long)]
    pub rejected_by: String,
    #[arg(long)]
    pub reason: String,
}

pub async fn run_reject(args: RejectArgs) -> Result<Value, Box<dyn Error>> {
    let override_: SupervisorOverride = input::file::read_json(&args.input)?;
    let store = OverrideStore::new();
    let id = workflow::propose(&store, override_).await?;
    let rejected = workflow::reject(&store, &id, &args.rejected_by, args.reason).await?;
    Ok(serde_json::to_value(rejected)?)
}
