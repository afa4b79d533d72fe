//! Sensitivity analysis (§4.10): sweep one parameter across a range and
//! observe how ORC moves.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::calculation::dispatch::{dispatch, MethodInput};
use crate::error::OrmError;
use crate::parameters::ParameterSnapshot;
use crate::types::{with_metadata, ComputationOutput, Money};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityVariable {
    pub parameter_name: String,
    pub min: Decimal,
    pub max: Decimal,
    pub step_size: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivitySample {
    pub value: Decimal,
    pub orc: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub parameter_name: String,
    pub base_value: Decimal,
    pub base_orc: Money,
    pub samples: Vec<SensitivitySample>,
    /// stdev(ORC / ORC_base) across the sweep.
    pub volatility: Decimal,
}

fn sweep_values(var: &SensitivityVariable) -> Result<Vec<Decimal>, OrmError> {
    if var.step_size <= Decimal::ZERO {
        return Err(OrmError::InvalidInput {
            field: "step_size".to_string(),
            reason: "must be strictly positive".to_string(),
        });
    }
    if var.min > var.max {
        return Err(OrmError::InvalidInput {
            field: "min/max".to_string(),
            reason: format!("min ({}) must be <= max ({})", var.min, var.max),
        });
    }
    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current += var.step_size;
    }
    if values.last().map_or(true, |last| *last < var.max) {
        values.push(var.max);
    }
    Ok(values)
}

/// Overlay a single parameter with value `v` and rerun, returning the
/// resulting ORC. Mirrors [`super::whatif::run_what_if`]'s overlay mechanism
/// but against a single named parameter rather than an arbitrary map.
fn orc_at(input: &MethodInput, params: &ParameterSnapshot, parameter_name: &str, value: Decimal) -> Result<Money, OrmError> {
    let mut overlaid = params.clone();
    overlaid
        .values
        .insert(parameter_name.to_string(), serde_json::to_value(value)?);
    Ok(dispatch(input, &overlaid)?.orc)
}

/// Sweep `variable.parameter_name` from `min` to `max` in `step_size`
/// increments, rerunning the dispatcher at each point (§4.10).
pub fn run_sensitivity(
    input: &MethodInput,
    params: &ParameterSnapshot,
    variable: &SensitivityVariable,
) -> Result<ComputationOutput<SensitivityOutput>, OrmError> {
    let start = Instant::now();
    let warnings = Vec::new();

    let values = sweep_values(variable)?;
    let base_value = params.decimal(&variable.parameter_name)?;
    let base_orc = dispatch(input, params)?.orc;

    let mut samples = Vec::with_capacity(values.len());
    let mut ratios = Vec::with_capacity(values.len());
    for value in &values {
        let orc = orc_at(input, params, &variable.parameter_name, *value)?;
        if !base_orc.is_zero() {
            ratios.push(orc / base_orc);
        }
        samples.push(SensitivitySample { value: *value, orc });
    }
    let volatility = crate::decimal::stdev(&ratios).unwrap_or(Decimal::ZERO);

    let output = SensitivityOutput {
        parameter_name: variable.parameter_name.clone(),
        base_value,
        base_orc,
        samples,
        volatility,
    };
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata("sensitivity", variable, warnings, elapsed, output))
}
