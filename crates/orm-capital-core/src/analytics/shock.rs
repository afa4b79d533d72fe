//! Shared input-mutation helpers for the stress and what-if analyses.

use rust_decimal::Decimal;

use crate::calculation::bia::BiaInput;
use crate::calculation::dispatch::MethodInput;
use crate::calculation::sma::SmaInput;
use crate::calculation::tsa::TsaInput;
use crate::loss_data::LossEvent;
use crate::types::Money;

/// A proportional shock to apply before rerunning a methodology (§4.10).
#[derive(Debug, Clone, Copy)]
pub struct Shock {
    /// Scales loss `net_amount` upward. Only meaningful for SMA, the only
    /// methodology that consumes loss data directly.
    pub loss_increase_pct: Decimal,
    /// Scales Business-Indicator / gross-income components downward.
    pub bi_decrease_pct: Decimal,
    /// Fraction of each loss's existing recovery (`gross - net`) added back
    /// to `net_amount`, simulating recoveries failing to materialize.
    pub recovery_haircut_pct: Decimal,
}

fn shock_loss_event(event: &LossEvent, shock: &Shock) -> LossEvent {
    let recovered = event.gross_amount - event.net_amount;
    let clawed_back = recovered * shock.recovery_haircut_pct;
    let inflated = event.net_amount * (Decimal::ONE + shock.loss_increase_pct);
    let net_amount = (inflated + clawed_back).min(event.gross_amount).max(Money::ZERO);
    LossEvent {
        net_amount,
        ..event.clone()
    }
}

fn bi_scale(shock: &Shock) -> Decimal {
    (Decimal::ONE - shock.bi_decrease_pct).max(Decimal::ZERO)
}

/// Apply `shock` to `input`, producing a new [`MethodInput`] ready for
/// [`crate::calculation::dispatch::dispatch`].
pub fn apply_shock(input: &MethodInput, shock: &Shock) -> MethodInput {
    match input {
        MethodInput::Sma(sma) => {
            let scale = bi_scale(shock);
            let business_indicators = sma
                .business_indicators
                .iter()
                .map(|bi| crate::loss_data::BusinessIndicator {
                    ildc: bi.ildc * scale,
                    sc: bi.sc * scale,
                    fc: bi.fc * scale,
                    ..bi.clone()
                })
                .collect();
            let loss_events = sma.loss_events.iter().map(|e| shock_loss_event(e, shock)).collect();
            MethodInput::Sma(SmaInput {
                business_indicators,
                loss_events,
                ..sma.clone()
            })
        }
        MethodInput::Bia(bia) => {
            let scale = bi_scale(shock);
            let years = bia
                .years
                .iter()
                .map(|y| crate::calculation::bia::GrossIncomeYear {
                    gross_income: y.gross_income * scale,
                    ..y.clone()
                })
                .collect();
            MethodInput::Bia(BiaInput { years, ..bia.clone() })
        }
        MethodInput::Tsa(tsa) => {
            let scale = bi_scale(shock);
            let rows = tsa
                .rows
                .iter()
                .map(|r| crate::calculation::tsa::BusinessLineYear {
                    gross_income: r.gross_income * scale,
                    ..r.clone()
                })
                .collect();
            MethodInput::Tsa(TsaInput { rows, ..tsa.clone() })
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::types::{BusinessLine, EventType};

    use super::*;

    fn event(net: Money, gross: Money) -> LossEvent {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        LossEvent {
            id: "L1".to_string(),
            entity_id: "ENT1".to_string(),
            event_type: EventType::ExternalFraud,
            business_line: BusinessLine::RetailBanking,
            occurrence_date: date,
            discovery_date: date,
            accounting_date: date,
            gross_amount: gross,
            net_amount: net,
            is_excluded: false,
            exclusion_reason: None,
            rbi_approval: None,
            disclosure_required: false,
            disclosure_expires: None,
        }
    }

    #[test]
    fn recovery_haircut_pulls_net_toward_gross() {
        let shock = Shock {
            loss_increase_pct: Decimal::ZERO,
            bi_decrease_pct: Decimal::ZERO,
            recovery_haircut_pct: dec!(1),
        };
        let shocked = shock_loss_event(&event(dec!(80), dec!(100)), &shock);
        assert_eq!(shocked.net_amount, dec!(100));
    }

    #[test]
    fn loss_increase_scales_net_upward() {
        let shock = Shock {
            loss_increase_pct: dec!(0.5),
            bi_decrease_pct: Decimal::ZERO,
            recovery_haircut_pct: Decimal::ZERO,
        };
        let shocked = shock_loss_event(&event(dec!(100), dec!(200)), &shock);
        assert_eq!(shocked.net_amount, dec!(150));
    }
}
