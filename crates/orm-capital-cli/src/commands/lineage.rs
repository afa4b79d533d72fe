use std::collections::HashMap;
use std::error::Error;

use clap::Args;
use orm_capital_core::lineage::{environment_hash, AuditLedger, AuditOperation};
use serde::Deserialize;
use serde_json::Value;

use crate::input;

/// One row to append to a run's audit chain; `environment_hash` is derived
/// by the CLI rather than supplied, since it is a property of the running
/// binary, not the caller (§4.8).
#[derive(Deserialize)]
pub struct LineageEntryInput {
    pub operation: AuditOperation,
    pub initiator: String,
    #[serde(default)]
    pub input_hash: Option<String>,
    #[serde(default)]
    pub output_hash: Option<String>,
    #[serde(default)]
    pub parameter_versions: HashMap<String, String>,
    #[serde(default)]
    pub model_version: Option<String>,
}

/// Append a sequence of audit rows to `run_id`'s chain and verify it
/// remains intact (§4.8).
#[derive(Args)]
pub struct RecordArgs {
    #[arg(long)]
    pub run_id: String,
    /// Path to a JSON array of audit entries
    #[arg(long)]
    pub entries: String,
}

pub async fn run_record(args: RecordArgs) -> Result<Value, Box<dyn Error>> {
    let entries: Vec<LineageEntryInput> = input::file::read_json(&args.entries)?;
    let ledger = AuditLedger::new();
    let env_hash = environment_hash(
        env!("CARGO_PKG_VERSION"),
        "n/a",
        "orm-capital-cli",
        "rust_decimal,tokio,chrono",
    );

    for entry in entries {
        ledger
            .append(
                &args.run_id,
                entry.operation,
                &entry.initiator,
                entry.input_hash,
                entry.output_hash,
                env_hash.clone(),
                entry.parameter_versions,
                entry.model_version,
            )
            .await?;
    }

    let chain = ledger.chain_for(&args.run_id).await;
    let (intact, per_row) = ledger.verify_integrity(&args.run_id).await?;
    Ok(serde_json::json!({ "chain": chain, "intact": intact, "per_row_intact": per_row }))
}
