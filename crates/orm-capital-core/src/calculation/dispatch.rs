//! Unified dispatcher (§4.4.4, C5): method selection, input shaping, and
//! uniform result typing across SMA/BIA/TSA.

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::error::OrmError;
use crate::parameters::ParameterSnapshot;
use crate::types::{Methodology, Money};

use super::bia::{calculate_bia, BiaInput, BiaResult};
use super::sma::{calculate_sma, SmaInput, SmaResult};
use super::tsa::{calculate_tsa, TsaInput, TsaResult};

/// A typed input bundle for one of the three methodologies. The dispatcher
/// validates the bundle against its shape before running the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "methodology", rename_all = "lowercase")]
pub enum MethodInput {
    Sma(SmaInput),
    Bia(BiaInput),
    Tsa(TsaInput),
}

impl MethodInput {
    pub fn methodology(&self) -> Methodology {
        match self {
            MethodInput::Sma(_) => Methodology::Sma,
            MethodInput::Bia(_) => Methodology::Bia,
            MethodInput::Tsa(_) => Methodology::Tsa,
        }
    }
}

/// The method-tagged calculation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "methodology", rename_all = "lowercase")]
pub enum MethodResult {
    Sma(SmaResult),
    Bia(BiaResult),
    Tsa(TsaResult),
}

/// A uniform envelope exposing `method`, `orc`, `rwa` regardless of which
/// engine produced them, plus the full method-tagged payload for lineage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub method: Methodology,
    pub orc: Money,
    pub rwa: Money,
    pub payload: MethodResult,
}

/// Validate a bundle's required shape without running the engine. Returns
/// a list of violations instead of throwing (§4.4.4).
pub fn validate_bundle(input: &MethodInput) -> Vec<String> {
    let mut violations = Vec::new();
    match input {
        MethodInput::Sma(sma) => {
            if sma.business_indicators.is_empty() {
                violations.push("business_indicators must contain at least one period".to_string());
            }
            if sma.entity_id.trim().is_empty() {
                violations.push("entity_id is required".to_string());
            }
        }
        MethodInput::Bia(bia) => {
            if bia.years.is_empty() {
                violations.push("years must contain at least one period".to_string());
            }
            if bia.entity_id.trim().is_empty() {
                violations.push("entity_id is required".to_string());
            }
        }
        MethodInput::Tsa(tsa) => {
            if tsa.rows.is_empty() {
                violations.push("rows must contain at least one (year, business_line) entry".to_string());
            }
            if tsa.entity_id.trim().is_empty() {
                violations.push("entity_id is required".to_string());
            }
        }
    }
    violations
}

/// Run the method named by `input`, wrapping the result in [`DispatchResult`].
pub fn dispatch(input: &MethodInput, params: &ParameterSnapshot) -> Result<DispatchResult, OrmError> {
    let violations = validate_bundle(input);
    if !violations.is_empty() {
        return Err(OrmError::InvalidInput {
            field: "method_input".to_string(),
            reason: violations.join("; "),
        });
    }

    match input {
        MethodInput::Sma(sma) => {
            let result = calculate_sma(sma, params)?;
            Ok(DispatchResult {
                method: Methodology::Sma,
                orc: result.orc,
                rwa: result.rwa,
                payload: MethodResult::Sma(result),
            })
        }
        MethodInput::Bia(bia) => {
            let result = calculate_bia(bia, params)?;
            Ok(DispatchResult {
                method: Methodology::Bia,
                orc: result.orc,
                rwa: result.rwa,
                payload: MethodResult::Bia(result),
            })
        }
        MethodInput::Tsa(tsa) => {
            let result = calculate_tsa(tsa, params)?;
            Ok(DispatchResult {
                method: Methodology::Tsa,
                orc: result.orc,
                rwa: result.rwa,
                payload: MethodResult::Tsa(result),
            })
        }
    }
}

/// Comparison mode: run several methods over (possibly distinct) bundles
/// concurrently. Each bundle supplies its own parameter snapshot since
/// different methodologies read different parameter sets (§5 — the engines
/// are pure functions with no shared mutable state, so this fans out freely).
pub async fn compare(bundles: Vec<(MethodInput, ParameterSnapshot)>) -> Vec<Result<DispatchResult, OrmError>> {
    let tasks = bundles.into_iter().map(|(input, params)| async move {
        tokio::task::spawn_blocking(move || dispatch(&input, &params))
            .await
            .unwrap_or_else(|e| Err(OrmError::Internal(e.to_string())))
    });
    join_all(tasks).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_sma_bundle() {
        let input = MethodInput::Sma(SmaInput {
            entity_id: String::new(),
            calculation_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            business_indicators: vec![],
            loss_events: vec![],
        });
        let violations = validate_bundle(&input);
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn rejects_empty_bia_bundle() {
        let input = MethodInput::Bia(BiaInput { entity_id: String::new(), years: vec![] });
        let violations = validate_bundle(&input);
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn rejects_empty_tsa_bundle() {
        let input = MethodInput::Tsa(TsaInput { entity_id: String::new(), rows: vec![] });
        let violations = validate_bundle(&input);
        assert_eq!(violations.len(), 2);
    }
}
