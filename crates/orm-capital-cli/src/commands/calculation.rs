use std::collections::HashMap;
use std::error::Error;

use clap::Args;
use orm_capital_core::calculation::{compare, dispatch, validate_bundle, MethodInput};
use orm_capital_core::parameters::{ParameterSnapshot, ParameterStore};
use serde_json::Value;

use crate::input;

/// Load the active parameter snapshot for `input`'s methodology, then apply
/// an optional overlay file (a flat JSON object of parameter_name -> value).
async fn active_snapshot(input: &MethodInput, overlay_path: Option<&str>) -> Result<ParameterSnapshot, Box<dyn Error>> {
    let store = ParameterStore::new();
    let mut snapshot = store.get_active(input.methodology()).await;
    if let Some(path) = overlay_path {
        let overlay: HashMap<String, Value> = input::file::read_json(path)?;
        for (key, value) in overlay {
            snapshot.values.insert(key, value);
        }
    }
    Ok(snapshot)
}

/// Arguments for running a single SMA/BIA/TSA calculation.
#[derive(Args)]
pub struct CalculateArgs {
    /// Path to a JSON file holding a tagged `MethodInput` (methodology: sma|bia|tsa)
    #[arg(long)]
    pub input: String,

    /// Path to a JSON file of parameter overrides (flat name -> value map)
    #[arg(long)]
    pub params_overlay: Option<String>,
}

pub async fn run_calculate(args: CalculateArgs) -> Result<Value, Box<dyn Error>> {
    let method_input: MethodInput = input::file::read_json(&args.input)?;
    let params = active_snapshot(&method_input, args.params_overlay.as_deref()).await?;
    let result = dispatch(&method_input, &params)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for validating a method bundle's shape without running it.
#[derive(Args)]
pub struct ValidateArgs {
    #[arg(long)]
    pub input: String,
}

pub fn run_validate(args: ValidateArgs) -> Result<Value, Box<dyn Error>> {
    let method_input: MethodInput = input::file::read_json(&args.input)?;
    let violations = validate_bundle(&method_input);
    Ok(serde_json::json!({ "valid": violations.is_empty(), "violations": violations }))
}

/// Arguments for comparing several method bundles concurrently (§4.4.4).
#[derive(Args)]
pub struct CompareArgs {
    /// One or more paths to JSON `MethodInput` files
    #[arg(long, required = true, num_args = 1..)]
    pub inputs: Vec<String>,
}

pub async fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn Error>> {
    let mut bundles = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let method_input: MethodInput = input::file::read_json(path)?;
        let params = active_snapshot(&method_input, None).await?;
        bundles.push((method_input, params));
    }
    let results = compare(bundles).await;
    let values: Vec<Value> = results
        .into_iter()
        .map(|r| match r {
            Ok(dispatch_result) => serde_json::to_value(dispatch_result).unwrap_or(Value::Null),
            Err(e) => serde_json::json!({ "error_code": e.error_code(), "error_message": e.to_string() }),
        })
        .collect();
    Ok(Value::Array(values))
}
