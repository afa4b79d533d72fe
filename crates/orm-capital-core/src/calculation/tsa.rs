//! (Legacy) Standardized Approach / Transitional Standardized Approach (§4.4.3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::decimal::{mean, round_money};
use crate::error::OrmError;
use crate::parameters::ParameterSnapshot;
use crate::types::{BusinessLine, Money};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessLineYear {
    pub year: i32,
    pub business_line: BusinessLine,
    pub gross_income: Money,
    pub excluded_items: Money,
}

impl BusinessLineYear {
    pub fn net(&self) -> Money {
        self.gross_income - self.excluded_items
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsaInput {
    pub entity_id: String,
    pub rows: Vec<BusinessLineYear>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyContribution {
    pub year: i32,
    pub per_business_line: Vec<(BusinessLine, Money)>,
    pub pre_floor_total: Money,
    pub floored: bool,
    pub yearly_total: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsaResult {
    pub yearly_contributions: Vec<YearlyContribution>,
    pub orc: Money,
    pub rwa: Money,
}

fn beta_parameter_name(line: BusinessLine) -> &'static str {
    match line {
        BusinessLine::RetailBanking => "beta_retail_banking",
        BusinessLine::CommercialBanking => "beta_commercial_banking",
        BusinessLine::TradingAndSales => "beta_trading_and_sales",
        BusinessLine::CorporateFinance => "beta_corporate_finance",
        BusinessLine::PaymentAndSettlement => "beta_payment_and_settlement",
        BusinessLine::AgencyServices => "beta_agency_services",
        BusinessLine::AssetManagement => "beta_asset_management",
        BusinessLine::RetailBrokerage => "beta_retail_brokerage",
    }
}

/// For each of the `lookback_years` most recent years, sum `beta(bl) *
/// net_gi(bl)` across business lines; negative contributions offset
/// positive ones within the year (if `allow_negative_offset`), then the
/// yearly total is floored at zero (if `floor_annual_at_zero`). ORC is the
/// arithmetic mean of the yearly totals — offset first, floor second, per
/// the spec's resolved reading of the RBI text.
pub fn calculate_tsa(input: &TsaInput, params: &ParameterSnapshot) -> Result<TsaResult, OrmError> {
    let allow_negative_offset = params.boolean("allow_negative_offset")?;
    let floor_annual_at_zero = params.boolean("floor_annual_at_zero")?;
    let lookback_years = params.integer("lookback_years")? as usize;
    let rwa_multiplier = rust_decimal::Decimal::new(125, 1);

    let mut by_year: HashMap<i32, Vec<&BusinessLineYear>> = HashMap::new();
    for row in &input.rows {
        by_year.entry(row.year).or_default().push(row);
    }
    let mut years: Vec<i32> = by_year.keys().copied().collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.truncate(lookback_years);

    let mut contributions = Vec::new();
    for year in years {
        let rows = &by_year[&year];
        let mut per_business_line = Vec::new();
        let mut positive_sum = Money::ZERO;
        let mut negative_sum = Money::ZERO;
        for row in rows {
            let beta = params.decimal(beta_parameter_name(row.business_line))?;
            let contribution = beta * row.net();
            per_business_line.push((row.business_line, contribution));
            if contribution >= Money::ZERO {
                positive_sum += contribution;
            } else {
                negative_sum += contribution;
            }
        }
        let pre_floor_total = if allow_negative_offset {
            positive_sum + negative_sum
        } else {
            positive_sum
        };
        let floored = floor_annual_at_zero && pre_floor_total < Money::ZERO;
        let yearly_total = if floored { Money::ZERO } else { pre_floor_total };
        contributions.push(YearlyContribution {
            year,
            per_business_line,
            pre_floor_total,
            floored,
            yearly_total,
        });
    }

    if contributions.is_empty() {
        return Err(OrmError::InsufficientData("no business-line/year rows supplied".to_string()));
    }

    let totals: Vec<Money> = contributions.iter().map(|c| c.yearly_total).collect();
    let orc = round_money(mean(&totals).expect("checked non-empty above"));
    let rwa = round_money(orc * rwa_multiplier);

    Ok(TsaResult {
        yearly_contributions: contributions,
        orc,
        rwa,
    })
}
