//! Basic Indicator Approach (§4.4.2).

use serde::{Deserialize, Serialize};

use crate::decimal::{mean, round_money};
use crate::error::OrmError;
use crate::parameters::ParameterSnapshot;
use crate::types::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrossIncomeYear {
    pub year: i32,
    pub gross_income: Money,
    pub excluded_items: Money,
}

impl GrossIncomeYear {
    pub fn net(&self) -> Money {
        self.gross_income - self.excluded_items
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiaInput {
    pub entity_id: String,
    /// Any number of years; only the most recent `lookback_years` are used.
    pub years: Vec<GrossIncomeYear>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiaResult {
    pub average_positive_net_gi: Money,
    pub positive_year_count: u32,
    pub excluded_years: Vec<i32>,
    pub orc: Money,
    pub rwa: Money,
}

/// `ORC = alpha * avg(positive net GI over the lookback window)`.
///
/// Divides by the count of *positive* years, not `lookback_years` — an
/// explicit resolution of the spec's Open Question in favor of the
/// regulatory text (see `DESIGN.md`).
pub fn calculate_bia(input: &BiaInput, params: &ParameterSnapshot) -> Result<BiaResult, OrmError> {
    let alpha = params.decimal("alpha")?;
    let lookback_years = params.integer("lookback_years")? as usize;
    let rwa_multiplier = rust_decimal::Decimal::new(125, 1);

    let mut years = input.years.clone();
    years.sort_by(|a, b| b.year.cmp(&a.year));
    years.truncate(lookback_years);

    let mut positive = Vec::new();
    let mut excluded_years = Vec::new();
    for y in &years {
        let net = y.net();
        if net > Money::ZERO {
            positive.push(net);
        } else {
            excluded_years.push(y.year);
        }
    }

    if positive.is_empty() {
        return Err(OrmError::NoPositiveGiYears);
    }

    let avg = mean(&positive).expect("checked non-empty above");
    let orc = round_money(alpha * avg);
    let rwa = round_money(orc * rwa_multiplier);

    Ok(BiaResult {
        average_positive_net_gi: round_money(avg),
        positive_year_count: positive.len() as u32,
        excluded_years,
        orc,
        rwa,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::parameters::ParameterStore;
    use crate::types::Methodology;

    use super::*;

    #[tokio::test]
    async fn excludes_the_one_negative_year() {
        let store = ParameterStore::new();
        let params = store.get_active(Methodology::Bia).await;
        let input = BiaInput {
            entity_id: "ENT1".to_string(),
            years: vec![
                GrossIncomeYear { year: 2023, gross_income: dec!(2.0e9), excluded_items: dec!(5.0e7) },
                GrossIncomeYear { year: 2022, gross_income: dec!(1.0e9), excluded_items: dec!(1.2e9) },
                GrossIncomeYear { year: 2021, gross_income: dec!(1.8e9), excluded_items: dec!(4.0e7) },
            ],
        };
        let result = calculate_bia(&input, &params).unwrap();
        assert_eq!(result.excluded_years, vec![2022]);
        assert_eq!(result.positive_year_count, 2);
        assert_eq!(result.average_positive_net_gi, dec!(1855000000.00));
        assert_eq!(result.orc, round_money(dec!(0.15) * dec!(1855000000.00)));
    }

    #[tokio::test]
    async fn all_negative_years_is_an_error() {
        let store = ParameterStore::new();
        let params = store.get_active(Methodology::Bia).await;
        let input = BiaInput {
            entity_id: "ENT1".to_string(),
            years: vec![GrossIncomeYear { year: 2023, gross_income: dec!(1e9), excluded_items: dec!(2e9) }],
        };
        let err = calculate_bia(&input, &params).unwrap_err();
        assert_eq!(err.error_code(), "NO_POSITIVE_GI_YEARS");
    }
}
