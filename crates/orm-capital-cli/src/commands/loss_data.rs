use std::error::Error;

use chrono::NaiveDate;
use clap::Args;
use orm_capital_core::loss_data::{ExclusionReason, LossDataStore, LossEvent, RbiApprovalMetadata, Recovery};
use orm_capital_core::Money;
use serde_json::Value;

use crate::input;

fn parse_date(s: &str) -> Result<NaiveDate, Box<dyn Error>> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{s}': {e}").into())
}

/// Validate and ingest a single loss event (§4.3). Never throws: rejection
/// is reported as data in the returned `ValidationResult`.
#[derive(Args)]
pub struct IngestArgs {
    /// Path to a JSON `LossEvent` object
    #[arg(long)]
    pub input: String,
    #[arg(long)]
    pub min_loss_threshold: Money,
}

pub async fn run_ingest(args: IngestArgs) -> Result<Value, Box<dyn Error>> {
    let event: LossEvent = input::file::read_json(&args.input)?;
    let store = LossDataStore::new();
    let result = store.ingest(event, args.min_loss_threshold).await;
    Ok(serde_json::to_value(result)?)
}

/// Ingest a batch of loss events into a fresh store, then run the windowed
/// query calculation engines use (§4.3), against that same store.
#[derive(Args)]
pub struct QueryArgs {
    /// Path to a JSON array of `LossEvent` objects
    #[arg(long)]
    pub events: String,
    #[arg(long)]
    pub min_loss_threshold: Money,
    #[arg(long)]
    pub entity_id: String,
    #[arg(long)]
    pub horizon_years: u32,
    /// YYYY-MM-DD
    #[arg(long)]
    pub as_of_date: String,
}

pub async fn run_query(args: QueryArgs) -> Result<Value, Box<dyn Error>> {
    let events: Vec<LossEvent> = input::file::read_json(&args.events)?;
    let as_of_date = parse_date(&args.as_of_date)?;
    let store = LossDataStore::new();
    for event in events {
        store.ingest(event, args.min_loss_threshold).await;
    }
    let rows = store
        .query_for_calculation(&args.entity_id, args.horizon_years, as_of_date, args.min_loss_threshold)
        .await;
    Ok(serde_json::to_value(rows)?)
}

/// Attach a recovery to a loss event and report the recomputed net amount.
#[derive(Args)]
pub struct RecoveryArgs {
    /// Path to a JSON `LossEvent` this recovery applies to
    #[arg(long)]
    pub event: String,
    /// Path to a JSON `Recovery` object
    #[arg(long)]
    pub recovery: String,
    #[arg(long)]
    pub min_loss_threshold: Money,
}

pub async fn run_recovery(args: RecoveryArgs) -> Result<Value, Box<dyn Error>> {
    let event: LossEvent = input::file::read_json(&args.event)?;
    let event_id = event.id.clone();
    let recovery: Recovery = input::file::read_json(&args.recovery)?;
    let store = LossDataStore::new();
    store.ingest(event, args.min_loss_threshold).await;
    let result = store.attach_recovery(&event_id, recovery).await;
    Ok(serde_json::to_value(result)?)
}

/// Seed a store with `events`, exclude one by id, then re-run the window
/// query to show it has dropped out (§4.3).
#[derive(Args)]
pub struct ExcludeArgs {
    #[arg(long)]
    pub events: String,
    #[arg(long)]
    pub min_loss_threshold: Money,
    #[arg(long)]
    pub event_id: String,
    #[arg(long, value_enum)]
    pub reason: ExclusionReasonArg,
    /// Omit entirely (along with the other approval fields) to exercise the
    /// MISSING_RBI_APPROVAL path instead of INCOMPLETE_RBI_APPROVAL.
    #[arg(long)]
    pub approval_reference: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub approval_date: Option<String>,
    #[arg(long)]
    pub approving_authority: Option<String>,
    #[arg(long)]
    pub approval_reason: Option<String>,
    #[arg(long)]
    pub entity_id: String,
    #[arg(long)]
    pub horizon_years: u32,
    /// YYYY-MM-DD
    #[arg(long)]
    pub as_of_date: String,
}

#[derive(Clone, clap::ValueEnum)]
pub enum ExclusionReasonArg {
    DataQualityIssue,
    LegalSettlementFinalized,
    RegulatoryGuidance,
}

impl From<ExclusionReasonArg> for ExclusionReason {
    fn from(v: ExclusionReasonArg) -> Self {
        match v {
            ExclusionReasonArg::DataQualityIssue => ExclusionReason::DataQualityIssue,
            ExclusionReasonArg::LegalSettlementFinalized => ExclusionReason::LegalSettlementFinalized,
            ExclusionReasonArg::RegulatoryGuidance => ExclusionReason::RegulatoryGuidance,
        }
    }
}

pub async fn run_exclude(args: ExcludeArgs) -> Result<Value, Box<dyn Error>> {
    let events: Vec<LossEvent> = input::file::read_json(&args.events)?;
    let as_of_date = parse_date(&args.as_of_date)?;

    // Absent entirely -> MISSING_RBI_APPROVAL; present-but-partial -> the
    // store's own INCOMPLETE_RBI_APPROVAL check (§4.3).
    let approval = if args.approval_reference.is_none()
        && args.approval_date.is_none()
        && args.approving_authority.is_none()
        && args.approval_reason.is_none()
    {
        None
    } else {
        let approval_date = match &args.approval_date {
            Some(d) => parse_date(d)?,
            None => NaiveDate::MIN,
        };
        Some(RbiApprovalMetadata {
            approval_reference: args.approval_reference.unwrap_or_default(),
            approval_date,
            approving_authority: args.approving_authority.unwrap_or_default(),
            approval_reason: args.approval_reason.unwrap_or_default(),
        })
    };

    let store = LossDataStore::new();
    for event in events {
        store.ingest(event, args.min_loss_threshold).await;
    }
    store.exclude(&args.event_id, args.reason.into(), approval, as_of_date).await?;
    let remaining = store
        .query_for_calculation(&args.entity_id, args.horizon_years, as_of_date, args.min_loss_threshold)
        .await;
    Ok(serde_json::json!({ "remaining_events": remaining }))
}
