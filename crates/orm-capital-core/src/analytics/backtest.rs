//! Back-testing (§4.10): for each quarter in a range, rerun with that
//! quarter's data and compare predicted capital against the losses actually
//! realized over the subsequent period.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::calculation::dispatch::{dispatch, MethodInput};
use crate::decimal::safe_div;
use crate::error::OrmError;
use crate::parameters::ParameterSnapshot;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};

/// One quarter's input bundle plus the losses realized over the subsequent
/// observation period, supplied by the caller's own loss-aggregation query
/// (§4.3) — this module never queries loss data itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestQuarter {
    pub quarter_label: String,
    pub predicted_input: MethodInput,
    pub actual_realized_losses: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestQuarterResult {
    pub quarter_label: String,
    pub predicted_orc: Money,
    pub actual_realized_losses: Money,
    /// `predicted_orc / actual_realized_losses`. `None` when the quarter had
    /// zero realized losses (undefined, not zero).
    pub coverage_ratio: Option<Rate>,
    pub under_covered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestOutput {
    pub quarters: Vec<BacktestQuarterResult>,
    pub mean_coverage_ratio: Option<Rate>,
    pub under_covered_quarter_count: u32,
}

/// Rerun `quarters` independently and report coverage (§4.10).
pub fn run_backtest(
    params: &ParameterSnapshot,
    quarters: &[BacktestQuarter],
) -> Result<ComputationOutput<BacktestOutput>, OrmError> {
    let start = Instant::now();
    let mut warnings = Vec::new();
    if quarters.is_empty() {
        return Err(OrmError::InvalidInput {
            field: "quarters".to_string(),
            reason: "at least one quarter is required".to_string(),
        });
    }

    let mut results = Vec::with_capacity(quarters.len());
    let mut ratios = Vec::new();
    let mut under_covered_quarter_count = 0u32;
    for q in quarters {
        let predicted_orc = dispatch(&q.predicted_input, params)?.orc;
        let coverage_ratio = if q.actual_realized_losses.is_zero() {
            warnings.push(format!("quarter '{}': zero realized losses, coverage_ratio is undefined", q.quarter_label));
            None
        } else {
            Some(safe_div(predicted_orc, q.actual_realized_losses, "coverage_ratio")?)
        };
        let under_covered = predicted_orc < q.actual_realized_losses;
        if under_covered {
            under_covered_quarter_count += 1;
        }
        if let Some(ratio) = coverage_ratio {
            ratios.push(ratio);
        }
        results.push(BacktestQuarterResult {
            quarter_label: q.quarter_label.clone(),
            predicted_orc,
            actual_realized_losses: q.actual_realized_losses,
            coverage_ratio,
            under_covered,
        });
    }

    let mean_coverage_ratio = crate::decimal::mean(&ratios);
    let output = BacktestOutput {
        quarters: results,
        mean_coverage_ratio,
        under_covered_quarter_count,
    };
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata("backtest", &quarters.iter().map(|q| q.quarter_label.clone()).collect::<Vec<_>>(), warnings, elapsed, output))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::calculation::sma::SmaInput;
    use crate::parameters::ParameterStore;
    use crate::types::Methodology;

    use super::*;

    fn predicted(bi: Money) -> MethodInput {
        MethodInput::Sma(SmaInput {
            entity_id: "ENT1".to_string(),
            calculation_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            business_indicators: vec![crate::loss_data::BusinessIndicator {
                entity_id: "ENT1".to_string(),
                period: "2025".to_string(),
                calculation_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
                ildc: bi,
                sc: dec!(0),
                fc: dec!(0),
            }],
            loss_events: vec![],
        })
    }

    #[tokio::test]
    async fn under_coverage_is_flagged() {
        let store = ParameterStore::new();
        let params = store.get_active(Methodology::Sma).await;
        let quarters = vec![BacktestQuarter {
            quarter_label: "2025Q4".to_string(),
            predicted_input: predicted(dec!(1e9)),
            actual_realized_losses: dec!(999999999999),
        }];
        let output = run_backtest(&params, &quarters).unwrap();
        assert_eq!(output.result.under_covered_quarter_count, 1);
        assert!(output.result.quarters[0].under_covered);
    }

    #[tokio::test]
    async fn zero_realized_losses_leaves_ratio_undefined() {
        let store = ParameterStore::new();
        let params = store.get_active(Methodology::Sma).await;
        let quarters = vec![BacktestQuarter {
            quarter_label: "2025Q4".to_string(),
            predicted_input: predicted(dec!(1e9)),
            actual_realized_losses: Money::ZERO,
        }];
        let output = run_backtest(&params, &quarters).unwrap();
        assert_eq!(output.result.quarters[0].coverage_ratio, None);
        assert_eq!(output.result.mean_coverage_ratio, None);
    }
}
