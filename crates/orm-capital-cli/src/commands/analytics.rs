use std::error::Error;

use clap::Args;
use orm_capital_core::analytics::{
    run_backtest, run_sensitivity, run_stress_test, run_what_if, BacktestQuarter, ParameterOverlay,
    SensitivityVariable, StressScenario,
};
use orm_capital_core::calculation::MethodInput;
use orm_capital_core::parameters::ParameterStore;
use serde_json::Value;

use crate::input;

/// Arguments for running a stress test over a base calculation (§4.10).
#[derive(Args)]
pub struct StressArgs {
    /// Path to a JSON `MethodInput` file for the base (unshocked) run
    #[arg(long)]
    pub input: String,

    /// Path to a JSON array of `StressScenario` objects
    #[arg(long)]
    pub scenarios: String,
}

pub async fn run_stress(args: StressArgs) -> Result<Value, Box<dyn Error>> {
    let method_input: MethodInput = input::file::read_json(&args.input)?;
    let scenarios: Vec<StressScenario> = input::file::read_json(&args.scenarios)?;
    let store = ParameterStore::new();
    let params = store.get_active(method_input.methodology()).await;
    let output = run_stress_test(&method_input, &params, &scenarios)?;
    Ok(serde_json::to_value(output)?)
}

/// Arguments for sweeping one parameter across a range (§4.10).
#[derive(Args)]
pub struct SensitivityArgs {
    #[arg(long)]
    pub input: String,

    /// Path to a JSON `SensitivityVariable` object
    #[arg(long)]
    pub variable: String,
}

pub async fn run_sensitivity_cmd(args: SensitivityArgs) -> Result<Value, Box<dyn Error>> {
    let method_input: MethodInput = input::file::read_json(&args.input)?;
    let variable: SensitivityVariable = input::file::read_json(&args.variable)?;
    let store = ParameterStore::new();
    let params = store.get_active(method_input.methodology()).await;
    let output = run_sensitivity(&method_input, &params, &variable)?;
    Ok(serde_json::to_value(output)?)
}

/// Arguments for back-testing a series of quarters against realized losses (§4.10).
#[derive(Args)]
pub struct BacktestArgs {
    /// Path to a JSON array of `BacktestQuarter` objects
    #[arg(long)]
    pub quarters: String,

    /// Methodology whose default active parameters should be used (sma|bia|tsa)
    #[arg(long, default_value = "sma")]
    pub methodology: String,
}

pub async fn run_backtest_cmd(args: BacktestArgs) -> Result<Value, Box<dyn Error>> {
    let quarters: Vec<BacktestQuarter> = input::file::read_json(&args.quarters)?;
    let methodology = match args.methodology.as_str() {
        "sma" => orm_capital_core::Methodology::Sma,
        "bia" => orm_capital_core::Methodology::Bia,
        "tsa" => orm_capital_core::Methodology::Tsa,
        other => return Err(format!("unknown methodology: {other}").into()),
    };
    let store = ParameterStore::new();
    let params = store.get_active(methodology).await;
    let output = run_backtest(&params, &quarters)?;
    Ok(serde_json::to_value(output)?)
}

/// Arguments for a what-if parameter overlay against a single run (§4.10).
#[derive(Args)]
pub struct WhatIfArgs {
    #[arg(long)]
    pub input: String,

    /// Path to a JSON `ParameterOverlay` object
    #[arg(long)]
    pub overlay: String,
}

pub async fn run_what_if_cmd(args: WhatIfArgs) -> Result<Value, Box<dyn Error>> {
    let method_input: MethodInput = input::file::read_json(&args.input)?;
    let overlay: ParameterOverlay = input::file::read_json(&args.overlay)?;
    let store = ParameterStore::new();
    let params = store.get_active(method_input.methodology()).await;
    let output = run_what_if(&method_input, &params, &overlay)?;
    Ok(serde_json::to_value(output)?)
}
