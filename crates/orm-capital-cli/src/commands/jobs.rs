use std::error::Error;
use std::sync::Arc;

use clap::Args;
use orm_capital_core::calculation::{dispatch, MethodInput};
use orm_capital_core::error::OrmError;
use orm_capital_core::jobs::{CalculationRequest, CalculationWorker, JobOutcome, JobScheduler, SchedulerConfig};
use orm_capital_core::parameters::{ParameterSnapshot, ParameterStore};
use serde_json::Value;

use crate::input;

/// Runs the dispatcher against a fixed `MethodInput`/`ParameterSnapshot`
/// pair, ignoring the job-level `CalculationRequest` beyond its scheduling
/// metadata. Resolving a `CalculationRequest` into business data (loss
/// events, Business Indicators) is the calculation-request handler's
/// concern, not the scheduler's (§4.9 — the scheduler never knows which
/// methodology it runs).
struct FixedInputWorker {
    method_input: MethodInput,
    params: ParameterSnapshot,
}

impl CalculationWorker for FixedInputWorker {
    fn run(&self, _request: &CalculationRequest) -> Result<Value, OrmError> {
        let result = dispatch(&self.method_input, &self.params)?;
        Ok(serde_json::to_value(result)?)
    }
}

/// Submit a calculation job to a freshly constructed scheduler and report
/// the sync result or the queued job record (§4.9).
#[derive(Args)]
pub struct SubmitArgs {
    /// Path to a JSON `CalculationRequest` object
    #[arg(long)]
    pub request: String,
    /// Path to a JSON `MethodInput` object supplying the business data to run
    #[arg(long)]
    pub input: String,
}

pub async fn run_submit(args: SubmitArgs) -> Result<Value, Box<dyn Error>> {
    let request: CalculationRequest = input::file::read_json(&args.request)?;
    let method_input: MethodInput = input::file::read_json(&args.input)?;
    let store = ParameterStore::new();
    let params = store.get_active(method_input.methodology()).await;

    let scheduler = JobScheduler::new(SchedulerConfig::default());
    let worker = Arc::new(FixedInputWorker { method_input, params });
    let outcome = scheduler.submit(request, worker).await;

    Ok(match outcome {
        JobOutcome::Sync(value) => serde_json::json!({ "mode": "sync", "result": value }),
        JobOutcome::Async(job) => serde_json::json!({ "mode": "async", "job": job }),
    })
}
