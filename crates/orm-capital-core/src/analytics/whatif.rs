//! What-if analysis (§4.10): overlay an arbitrary set of parameter values
//! for a single calculation and report the delta against the base run.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::calculation::dispatch::{dispatch, MethodInput};
use crate::error::OrmError;
use crate::parameters::ParameterSnapshot;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterOverlay {
    pub overlaid_values: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfOutput {
    pub base_orc: Money,
    pub overlay_orc: Money,
    pub delta: Money,
    pub delta_pct: Rate,
}

/// Apply `overlay` on top of `params` (overlay wins on key collision), rerun
/// `input`, and compare against the un-overlaid base run.
pub fn run_what_if(
    input: &MethodInput,
    params: &ParameterSnapshot,
    overlay: &ParameterOverlay,
) -> Result<ComputationOutput<WhatIfOutput>, OrmError> {
    let start = Instant::now();
    let mut warnings = Vec::new();
    if overlay.overlaid_values.is_empty() {
        return Err(OrmError::InvalidInput {
            field: "overlaid_values".to_string(),
            reason: "at least one parameter overlay is required".to_string(),
        });
    }

    let base_orc = dispatch(input, params)?.orc;

    let mut overlaid_params = params.clone();
    for (key, value) in &overlay.overlaid_values {
        overlaid_params.values.insert(key.clone(), value.clone());
    }
    let overlay_orc = dispatch(input, &overlaid_params)?.orc;

    let delta = overlay_orc - base_orc;
    let delta_pct = if base_orc.is_zero() {
        warnings.push("base ORC is zero, delta_pct undefined (reported as 0)".to_string());
        Rate::ZERO
    } else {
        delta / base_orc
    };

    let output = WhatIfOutput {
        base_orc,
        overlay_orc,
        delta,
        delta_pct,
    };
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata("what_if", overlay, warnings, elapsed, output))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::calculation::sma::SmaInput;
    use crate::parameters::ParameterStore;
    use crate::types::Methodology;

    use super::*;

    #[tokio::test]
    async fn lowering_lc_multiplier_lowers_orc() {
        let store = ParameterStore::new();
        let params = store.get_active(Methodology::Sma).await;
        let input = MethodInput::Sma(SmaInput {
            entity_id: "ENT1".to_string(),
            calculation_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            business_indicators: vec![crate::loss_data::BusinessIndicator {
                entity_id: "ENT1".to_string(),
                period: "2025".to_string(),
                calculation_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
                ildc: dec!(9e10),
                sc: dec!(0),
                fc: dec!(0),
            }],
            loss_events: vec![],
        });

        let mut overlaid_values = HashMap::new();
        overlaid_values.insert("marginal_coefficient_bucket_1".to_string(), serde_json::json!("0.10"));
        let overlay = ParameterOverlay { overlaid_values };

        let output = run_what_if(&input, &params, &overlay).unwrap();
        assert!(output.result.delta <= Money::ZERO);
    }

    #[tokio::test]
    async fn empty_overlay_is_rejected() {
        let store = ParameterStore::new();
        let params = store.get_active(Methodology::Sma).await;
        let input = MethodInput::Sma(SmaInput {
            entity_id: "ENT1".to_string(),
            calculation_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            business_indicators: vec![],
            loss_events: vec![],
        });
        let err = run_what_if(&input, &params, &ParameterOverlay { overlaid_values: HashMap::new() })
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}
