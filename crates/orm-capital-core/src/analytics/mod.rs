//! Analytics engine (§4.10, C11): stress, sensitivity, back-test, what-if.
//!
//! Every analysis here is a pure re-invocation of [`crate::calculation`] with
//! mutated inputs or an overlaid parameter snapshot — no independent
//! statistical model is introduced.

mod shock;

pub mod backtest;
pub mod sensitivity;
pub mod stress;
pub mod whatif;

pub use backtest::{run_backtest, BacktestOutput, BacktestQuarter, BacktestQuarterResult};
pub use sensitivity::{run_sensitivity, SensitivityOutput, SensitivitySample, SensitivityVariable};
pub use stress::{run_stress_test, StressScenario, StressScenarioResult, StressTestOutput};
pub use whatif::{run_what_if, ParameterOverlay, WhatIfOutput};
