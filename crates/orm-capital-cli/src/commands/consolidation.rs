use std::collections::HashMap;
use std::error::Error;

use clap::Args;
use orm_capital_core::consolidation::calculate_consolidated;
use orm_capital_core::entities::{CorporateAction, Entity};
use orm_capital_core::Money;
use serde_json::Value;

use crate::input;

/// Walk an entity hierarchy and compute consolidated BI/losses (§4.5).
#[derive(Args)]
pub struct CalculateArgs {
    /// Path to a JSON array of `Entity` objects
    #[arg(long)]
    pub entities: String,
    /// Path to a JSON array of `CorporateAction` objects
    #[arg(long)]
    pub corporate_actions: String,
    /// Path to a JSON object mapping entity_id -> Business Indicator
    #[arg(long)]
    pub bi_by_entity: String,
    /// Path to a JSON object mapping entity_id -> losses
    #[arg(long)]
    pub losses_by_entity: String,
    /// Path to a JSON `ConsolidationRequest` object
    #[arg(long)]
    pub request: String,
}

pub fn run_calculate(args: CalculateArgs) -> Result<Value, Box<dyn Error>> {
    let entities: Vec<Entity> = input::file::read_json(&args.entities)?;
    let corporate_actions: Vec<CorporateAction> = input::file::read_json(&args.corporate_actions)?;
    let bi_by_entity: HashMap<String, Money> = input::file::read_json(&args.bi_by_entity)?;
    let losses_by_entity: HashMap<String, Money> = input::file::read_json(&args.losses_by_entity)?;
    let request = input::file::read_json(&args.request)?;

    let result = calculate_consolidated(&entities, &corporate_actions, &bi_by_entity, &losses_by_entity, &request)?;
    Ok(serde_json::to_value(result)?)
}
