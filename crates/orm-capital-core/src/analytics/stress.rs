//! Stress testing (§4.10): shock a set of scenarios against one base input
//! and rerun the dispatcher, then summarize the distribution of outcomes.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::calculation::dispatch::{dispatch, MethodInput};
use crate::error::OrmError;
use crate::parameters::ParameterSnapshot;
use crate::types::{with_metadata, ComputationOutput, Money};

use super::shock::{apply_shock, Shock};

/// `|Δ| >= EXTREME_DELTA_THRESHOLD` of ORC relative to base counts as extreme.
const EXTREME_DELTA_THRESHOLD: Decimal = dec!(0.5);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressScenario {
    pub name: String,
    pub loss_increase_pct: Decimal,
    pub bi_decrease_pct: Decimal,
    pub recovery_haircut_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressScenarioResult {
    pub name: String,
    pub orc: Money,
    pub rwa: Money,
    pub orc_delta: Money,
    pub orc_delta_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestOutput {
    pub base_orc: Money,
    pub scenarios: Vec<StressScenarioResult>,
    pub value_at_risk_95: Decimal,
    pub value_at_risk_99: Decimal,
    pub expected_shortfall_95: Decimal,
    pub worst_case_delta_pct: Decimal,
    pub best_case_delta_pct: Decimal,
    pub extreme_scenario_count: u32,
}

/// Run every scenario against `base` and summarize the ORC-delta distribution
/// (§4.10). Each scenario is an independent re-invocation of the dispatcher —
/// no scenario's outcome depends on another's.
pub fn run_stress_test(
    base: &MethodInput,
    params: &ParameterSnapshot,
    scenarios: &[StressScenario],
) -> Result<ComputationOutput<StressTestOutput>, OrmError> {
    let start = Instant::now();
    let mut warnings = Vec::new();
    if scenarios.is_empty() {
        return Err(OrmError::InvalidInput {
            field: "scenarios".to_string(),
            reason: "at least one stress scenario is required".to_string(),
        });
    }

    let base_result = dispatch(base, params)?;
    let base_orc = base_result.orc;

    let mut results = Vec::with_capacity(scenarios.len());
    let mut deltas_pct = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let shock = Shock {
            loss_increase_pct: scenario.loss_increase_pct,
            bi_decrease_pct: scenario.bi_decrease_pct,
            recovery_haircut_pct: scenario.recovery_haircut_pct,
        };
        let shocked_input = apply_shock(base, &shock);
        let shocked = dispatch(&shocked_input, params)?;
        let orc_delta = shocked.orc - base_orc;
        let orc_delta_pct = if base_orc.is_zero() {
            warnings.push(format!("scenario '{}': base ORC is zero, delta_pct undefined (reported as 0)", scenario.name));
            Decimal::ZERO
        } else {
            orc_delta / base_orc
        };
        deltas_pct.push(orc_delta_pct);
        results.push(StressScenarioResult {
            name: scenario.name.clone(),
            orc: shocked.orc,
            rwa: shocked.rwa,
            orc_delta,
            orc_delta_pct,
        });
    }

    let value_at_risk_95 = crate::decimal::percentile(&deltas_pct, dec!(0.95)).unwrap_or(Decimal::ZERO);
    let value_at_risk_99 = crate::decimal::percentile(&deltas_pct, dec!(0.99)).unwrap_or(Decimal::ZERO);
    let tail_cutoff = value_at_risk_95;
    let tail: Vec<Decimal> = deltas_pct.iter().copied().filter(|d| *d >= tail_cutoff).collect();
    let expected_shortfall_95 = crate::decimal::mean(&tail).unwrap_or(tail_cutoff);
    let worst_case_delta_pct = deltas_pct.iter().copied().fold(Decimal::MIN, Decimal::max);
    let best_case_delta_pct = deltas_pct.iter().copied().fold(Decimal::MAX, Decimal::min);
    let extreme_scenario_count = deltas_pct.iter().filter(|d| d.abs() >= EXTREME_DELTA_THRESHOLD).count() as u32;

    let output = StressTestOutput {
        base_orc,
        scenarios: results,
        value_at_risk_95,
        value_at_risk_99,
        expected_shortfall_95,
        worst_case_delta_pct,
        best_case_delta_pct,
        extreme_scenario_count,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata("stress_test", &scenarios.to_vec(), warnings, elapsed, output))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::calculation::sma::SmaInput;
    use crate::parameters::ParameterStore;
    use crate::types::Methodology;

    use super::*;

    fn base_input() -> MethodInput {
        MethodInput::Sma(SmaInput {
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
        })
    }

    #[tokio::test]
    async fn worse_scenario_produces_positive_delta() {
        let store = ParameterStore::new();
        let params = store.get_active(Methodology::Sma).await;
        let scenarios = vec![StressScenario {
            name: "adverse".to_string(),
            loss_increase_pct: dec!(0),
            bi_decrease_pct: dec!(0),
            recovery_haircut_pct: dec!(0),
        }];
        let output = run_stress_test(&base_input(), &params, &scenarios).unwrap();
        assert_eq!(output.result.scenarios.len(), 1);
        assert_eq!(output.result.scenarios[0].orc_delta, Money::ZERO);
    }

    #[test]
    fn empty_scenario_list_is_rejected() {
        let params_store = futures::executor::block_on(async {
            let store = ParameterStore::new();
            store.get_active(Methodology::Sma).await
        });
        let err = run_stress_test(&base_input(), &params_store, &[]).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}
