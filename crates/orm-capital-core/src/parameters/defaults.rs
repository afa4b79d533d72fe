//! Default parameter seeds (§4.2). Activated as version 1 for every
//! methodology the first time a [`super::store::ParameterStore`] is built.

use rust_decimal_macros::dec;
use serde_json::json;

use crate::types::Methodology;

use super::model::{ParameterStatus, ParameterType, ParameterVersion};

fn seed(model_name: Methodology, parameter_name: &str, parameter_type: ParameterType, value: serde_json::Value) -> ParameterVersion {
    ParameterVersion {
        version_id: format!("{model_name}:{parameter_name}:v1"),
        model_name,
        parameter_name: parameter_name.to_string(),
        parameter_type,
        value,
        previous_value: None,
        version_number: 1,
        parent_version_id: None,
        status: ParameterStatus::Active,
        effective_date: None,
        expiry_date: None,
        created_by: "system".to_string(),
        reviewed_by: None,
        approved_by: None,
        justification: Some("initial seed".to_string()),
        immutable_diff: None,
        requires_rbi_notification: false,
        rbi_notification_reference: None,
    }
}

/// The full set of SMA/BIA/TSA default parameters as specified in §4.2.
pub fn seed_defaults() -> Vec<ParameterVersion> {
    use Methodology::*;
    use ParameterType::*;

    vec![
        // SMA
        seed(Sma, "marginal_coefficient_bucket_1", Coefficient, json!(dec!(0.12))),
        seed(Sma, "marginal_coefficient_bucket_2", Coefficient, json!(dec!(0.15))),
        seed(Sma, "marginal_coefficient_bucket_3", Coefficient, json!(dec!(0.18))),
        seed(Sma, "bucket_threshold_1_to_2", Threshold, json!(dec!(80_000_000_000))),
        seed(Sma, "bucket_threshold_2_to_3", Threshold, json!(dec!(2_400_000_000_000i64))),
        seed(Sma, "lc_multiplier", Multiplier, json!(dec!(15))),
        seed(Sma, "rwa_multiplier", Multiplier, json!(dec!(12.5))),
        seed(Sma, "min_loss_threshold", Threshold, json!(dec!(100_000))),
        seed(Sma, "national_discretion_ilm_one", Flag, json!(false)),
        seed(Sma, "min_data_quality_years", Threshold, json!(5)),
        seed(Sma, "loss_horizon_years", Threshold, json!(10)),
        // BIA
        seed(Bia, "alpha", Coefficient, json!(dec!(0.15))),
        seed(Bia, "lookback_years", Threshold, json!(3)),
        // TSA
        seed(Tsa, "beta_retail_banking", Coefficient, json!(dec!(0.12))),
        seed(Tsa, "beta_commercial_banking", Coefficient, json!(dec!(0.15))),
        seed(Tsa, "beta_trading_and_sales", Coefficient, json!(dec!(0.18))),
        seed(Tsa, "beta_corporate_finance", Coefficient, json!(dec!(0.18))),
        seed(Tsa, "beta_payment_and_settlement", Coefficient, json!(dec!(0.18))),
        seed(Tsa, "beta_agency_services", Coefficient, json!(dec!(0.15))),
        seed(Tsa, "beta_asset_management", Coefficient, json!(dec!(0.12))),
        seed(Tsa, "beta_retail_brokerage", Coefficient, json!(dec!(0.12))),
        seed(Tsa, "allow_negative_offset", Flag, json!(true)),
        seed(Tsa, "floor_annual_at_zero", Flag, json!(true)),
        seed(Tsa, "lookback_years", Threshold, json!(3)),
    ]
}
