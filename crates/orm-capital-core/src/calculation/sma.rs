//! Standardized Measurement Approach (§4.4.1).

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{checked_ln, mean, round_money, round_rate};
use crate::error::OrmError;
use crate::loss_data::{BusinessIndicator, LossEvent};
use crate::parameters::ParameterSnapshot;
use crate::types::{Bucket, Money, Rate};

/// Amount attributed to each marginal-coefficient band, kept for lineage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BicBand {
    pub bucket: u8,
    pub coefficient: Rate,
    pub amount_in_band: Money,
    pub contribution: Money,
}

/// Why (and whether) the ILM was gated to 1.0 (§4.4.1 gating order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatingMetadata {
    pub bucket_1_to_2_threshold: Money,
    pub bucket_2_to_3_threshold: Money,
    pub years_with_high_quality_data: u32,
    pub min_data_quality_years: u32,
    pub ilm_gating_applies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmaInput {
    pub entity_id: String,
    pub calculation_date: chrono::NaiveDate,
    /// Target period plus up to two prior periods, most recent first.
    pub business_indicators: Vec<BusinessIndicator>,
    pub loss_events: Vec<LossEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmaResult {
    pub bi_current: Money,
    pub bi_three_year_average: Money,
    pub bucket: Bucket,
    pub bic: Money,
    pub marginal_coefficients_applied: Vec<BicBand>,
    pub average_annual_losses: Money,
    pub loss_data_years: u32,
    pub lc: Money,
    pub ilm: Rate,
    pub ilm_gated: bool,
    pub ilm_gate_reason: Option<String>,
    pub orc: Money,
    pub rwa: Money,
    pub gating_metadata: GatingMetadata,
}

fn assign_bucket(bi_avg: Money, t1: Money, t2: Money) -> Bucket {
    if bi_avg < t1 {
        Bucket::One
    } else if bi_avg < t2 {
        Bucket::Two
    } else {
        Bucket::Three
    }
}

fn calculate_bic(bi_avg: Money, bucket: Bucket, t1: Money, t2: Money, c1: Rate, c2: Rate, c3: Rate) -> (Money, Vec<BicBand>) {
    let mut bands = Vec::new();
    let band1_amount = match bucket {
        Bucket::One => bi_avg,
        _ => t1,
    };
    bands.push(BicBand {
        bucket: 1,
        coefficient: c1,
        amount_in_band: band1_amount,
        contribution: band1_amount * c1,
    });

    let mut bic = band1_amount * c1;

    if matches!(bucket, Bucket::Two | Bucket::Three) {
        let band2_amount = match bucket {
            Bucket::Two => bi_avg - t1,
            _ => t2 - t1,
        };
        bic += band2_amount * c2;
        bands.push(BicBand {
            bucket: 2,
            coefficient: c2,
            amount_in_band: band2_amount,
            contribution: band2_amount * c2,
        });
    }

    if matches!(bucket, Bucket::Three) {
        let band3_amount = bi_avg - t2;
        bic += band3_amount * c3;
        bands.push(BicBand {
            bucket: 3,
            coefficient: c3,
            amount_in_band: band3_amount,
            contribution: band3_amount * c3,
        });
    }

    (bic, bands)
}

fn loss_component(loss_events: &[LossEvent], lc_multiplier: Rate) -> (Money, Money, u32) {
    use chrono::Datelike;

    let mut yearly_totals: HashMap<i32, Money> = HashMap::new();
    for event in loss_events {
        *yearly_totals.entry(event.accounting_date.year()).or_insert(Money::ZERO) += event.net_amount;
    }
    if yearly_totals.is_empty() {
        return (Money::ZERO, Money::ZERO, 0);
    }
    let years = yearly_totals.len() as u32;
    let totals: Vec<Money> = yearly_totals.into_values().collect();
    let avg_annual = mean(&totals).unwrap_or(Money::ZERO);
    (lc_multiplier * avg_annual, avg_annual, years)
}

/// Run the full SMA waterfall: BI → bucket → BIC → LC → gated ILM → ORC/RWA.
pub fn calculate_sma(input: &SmaInput, params: &ParameterSnapshot) -> Result<SmaResult, OrmError> {
    if input.business_indicators.is_empty() {
        return Err(OrmError::InsufficientData(
            "at least one Business Indicator period is required".to_string(),
        ));
    }

    let c1 = params.decimal("marginal_coefficient_bucket_1")?;
    let c2 = params.decimal("marginal_coefficient_bucket_2")?;
    let c3 = params.decimal("marginal_coefficient_bucket_3")?;
    let t1 = params.decimal("bucket_threshold_1_to_2")?;
    let t2 = params.decimal("bucket_threshold_2_to_3")?;
    let lc_multiplier = params.decimal("lc_multiplier")?;
    let rwa_multiplier = params.decimal("rwa_multiplier")?;
    let national_discretion_ilm_one = params.boolean("national_discretion_ilm_one")?;
    let min_data_quality_years = params.integer("min_data_quality_years")?;

    let mut ordered = input.business_indicators.clone();
    ordered.sort_by(|a, b| b.calculation_date.cmp(&a.calculation_date));
    let period_totals: Vec<Money> = ordered.iter().take(3).map(|bi| bi.bi_total()).collect();

    let bi_current = period_totals[0];
    let bi_three_year_average = mean(&period_totals).ok_or_else(|| OrmError::InsufficientData("no Business Indicator periods".to_string()))?;

    let bucket = assign_bucket(bi_three_year_average, t1, t2);
    let (bic_raw, bands) = calculate_bic(bi_three_year_average, bucket, t1, t2, c1, c2, c3);
    let bic = round_money(bic_raw);

    let (lc_raw, avg_annual_losses_raw, loss_data_years) = loss_component(&input.loss_events, lc_multiplier);
    let lc = round_money(lc_raw);
    let average_annual_losses = round_money(avg_annual_losses_raw);

    let gating_metadata = GatingMetadata {
        bucket_1_to_2_threshold: t1,
        bucket_2_to_3_threshold: t2,
        years_with_high_quality_data: loss_data_years,
        min_data_quality_years,
        ilm_gating_applies: bucket == Bucket::One || loss_data_years < min_data_quality_years || national_discretion_ilm_one || bic.is_zero(),
    };

    let (ilm, ilm_gated, ilm_gate_reason) = if bucket == Bucket::One {
        (Rate::ONE, true, Some("Bank is in Bucket 1".to_string()))
    } else if loss_data_years < min_data_quality_years {
        (
            Rate::ONE,
            true,
            Some(format!("{loss_data_years} years < {min_data_quality_years} years")),
        )
    } else if national_discretion_ilm_one {
        (Rate::ONE, true, Some("National discretion".to_string()))
    } else if bic.is_zero() {
        (Rate::ONE, true, Some("BIC is zero".to_string()))
    } else {
        let argument = Decimal::E - dec!(1) + (lc / bic);
        let ilm_raw = checked_ln(argument, "ilm")?;
        (round_rate(ilm_raw), false, None)
    };

    let orc = round_money(bic * ilm);
    let rwa = round_money(orc * rwa_multiplier);

    Ok(SmaResult {
        bi_current: round_money(bi_current),
        bi_three_year_average: round_money(bi_three_year_average),
        bucket,
        bic,
        marginal_coefficients_applied: bands,
        average_annual_losses,
        loss_data_years,
        lc,
        ilm,
        ilm_gated,
        ilm_gate_reason,
        orc,
        rwa,
        gating_metadata,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::parameters::ParameterStore;
    use crate::types::{BusinessLine, EventType};

    use super::*;

    fn bi(date: &str, ildc: Money, sc: Money, fc: Money) -> BusinessIndicator {
        BusinessIndicator {
            entity_id: "ENT1".to_string(),
            period: date.to_string(),
            calculation_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            ildc,
            sc,
            fc,
        }
    }

    fn loss(year: i32, net: Money) -> LossEvent {
        let date = NaiveDate::from_ymd_opt(year, 6, 30).unwrap();
        LossEvent {
            id: format!("L{year}"),
            entity_id: "ENT1".to_string(),
            event_type: EventType::ExternalFraud,
            business_line: BusinessLine::RetailBanking,
            occurrence_date: date,
            discovery_date: date,
            accounting_date: date,
            gross_amount: net,
            net_amount: net,
            is_excluded: false,
            exclusion_reason: None,
            rbi_approval: None,
            disclosure_required: false,
            disclosure_expires: None,
        }
    }

    #[tokio::test]
    async fn bucket_2_normal_ilm_scenario() {
        let store = ParameterStore::new();
        let params = store.get_active(crate::types::Methodology::Sma).await;

        let business_indicators = vec![
            bi("2025-12-31", dec!(9e10), dec!(0), dec!(0)),
            bi("2024-12-31", dec!(9e10), dec!(0), dec!(0)),
            bi("2023-12-31", dec!(9e10), dec!(0), dec!(0)),
        ];
        let mut loss_events = Vec::new();
        for year in 2021..=2025 {
            // four quarterly losses of 10 crore each per year = 4e8 total per year
            for _ in 0..4 {
                loss_events.push(LossEvent {
                    net_amount: dec!(1e8),
                    gross_amount: dec!(1e8),
                    ..loss(year, dec!(1e8))
                });
            }
        }

        let input = SmaInput {
            entity_id: "ENT1".to_string(),
            calculation_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            business_indicators,
            loss_events,
        };

        let result = calculate_sma(&input, &params).unwrap();
        assert_eq!(result.bucket, Bucket::Two);
        assert_eq!(result.bi_current, dec!(90000000000.00));
        assert_eq!(result.bi_three_year_average, dec!(90000000000.00));
        assert_eq!(result.bic, dec!(11100000000.00));
        assert_eq!(result.average_annual_losses, dec!(400000000.00));
        assert_eq!(result.loss_data_years, 5);
        assert!(!result.ilm_gated);
        assert_eq!(result.orc, round_money(result.bic * result.ilm));
        assert_eq!(result.rwa, round_money(result.orc * dec!(12.5)));
    }

    #[tokio::test]
    async fn bucket_1_gates_ilm_to_one() {
        let store = ParameterStore::new();
        let params = store.get_active(crate::types::Methodology::Sma).await;
        let business_indicators = vec![bi("2025-12-31", dec!(4e10), dec!(2e10), dec!(0.8e10))];
        let input = SmaInput {
            entity_id: "ENT1".to_string(),
            calculation_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            business_indicators,
            loss_events: vec![],
        };
        let result = calculate_sma(&input, &params).unwrap();
        assert_eq!(result.bucket, Bucket::One);
        assert!(result.ilm_gated);
        assert_eq!(result.ilm, dec!(1));
        assert_eq!(result.orc, result.bic);
        assert!(result.ilm_gate_reason.unwrap().contains("Bucket 1"));
    }

    #[tokio::test]
    async fn insufficient_loss_years_gates_ilm() {
        let store = ParameterStore::new();
        let params = store.get_active(crate::types::Methodology::Sma).await;
        let business_indicators = vec![
            bi("2025-12-31", dec!(9e10), dec!(0), dec!(0)),
            bi("2024-12-31", dec!(9e10), dec!(0), dec!(0)),
            bi("2023-12-31", dec!(9e10), dec!(0), dec!(0)),
        ];
        let loss_events = vec![loss(2023, dec!(1e8)), loss(2024, dec!(1e8)), loss(2025, dec!(1e8))];
        let input = SmaInput {
            entity_id: "ENT1".to_string(),
            calculation_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            business_indicators,
            loss_events,
        };
        let result = calculate_sma(&input, &params).unwrap();
        assert_eq!(result.bucket, Bucket::Two);
        assert!(result.ilm_gated);
        assert!(result.ilm_gate_reason.unwrap().contains("3 years < 5 years"));
        assert_eq!(result.orc, result.bic);
    }
}
