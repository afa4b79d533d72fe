mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analytics::{BacktestArgs, SensitivityArgs, StressArgs, WhatIfArgs};
use commands::calculation::{CalculateArgs, CompareArgs, ValidateArgs};
use commands::consolidation::CalculateArgs as ConsolidationCalculateArgs;
use commands::jobs::SubmitArgs as JobSubmitArgs;
use commands::lineage::RecordArgs;
use commands::loss_data::{ExcludeArgs, IngestArgs, QueryArgs, RecoveryArgs};
use commands::overrides::{ImpactArgs as OverrideImpactArgs, ProposeApplyArgs, RejectArgs};
use commands::parameters::{ActiveArgs, ProposeActivateArgs, RollbackArgs};

/// RBI Basel III operational-risk capital engine
#[derive(Parser)]
#[command(
    name = "orm-capital",
    version,
    about = "RBI Basel III operational-risk capital calculations (SMA/BIA/TSA)",
    long_about = "A CLI for the Standardized Measurement Approach, Basic Indicator \
                  Approach and Standardized Approach to operational-risk capital, \
                  with decimal precision, parameter governance, supervisor overrides, \
                  consolidation, lineage/audit, job scheduling, and analytics."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single SMA/BIA/TSA calculation through the unified dispatcher
    Calculate(CalculateArgs),
    /// Validate a method bundle's shape without running the engine
    Validate(ValidateArgs),
    /// Run several method bundles concurrently and compare results
    Compare(CompareArgs),

    /// Stress-test a calculation across a set of shock scenarios
    Stress(StressArgs),
    /// Sweep one parameter across a range and observe ORC sensitivity
    Sensitivity(SensitivityArgs),
    /// Back-test predicted capital against realized losses, quarter by quarter
    Backtest(BacktestArgs),
    /// Overlay arbitrary parameter values and compare against the base run
    WhatIf(WhatIfArgs),

    /// Show the seeded active parameter snapshot for a methodology
    ParametersActive(ActiveArgs),
    /// Run the full maker-checker-approver-activator pipeline for one change
    ParametersProposeActivate(ProposeActivateArgs),
    /// Propose a rollback to a prior parameter version
    ParametersRollback(RollbackArgs),

    /// Report the before/after impact analysis for a proposed override
    OverrideImpact(OverrideImpactArgs),
    /// Run propose -> approve -> apply for a supervisor override
    OverrideProposeApply(ProposeApplyArgs),
    /// Reject a proposed supervisor override
    OverrideReject(RejectArgs),

    /// Validate and ingest a single loss event
    LossIngest(IngestArgs),
    /// Ingest a batch of loss events, then run the windowed calculation query
    LossQuery(QueryArgs),
    /// Attach a recovery to a loss event and report the recomputed net amount
    LossRecovery(RecoveryArgs),
    /// Exclude a loss event with RBI approval metadata and re-run the query
    LossExclude(ExcludeArgs),

    /// Submit a calculation job to the bounded-concurrency scheduler
    JobSubmit(JobSubmitArgs),

    /// Append and verify a run's hash-chained audit trail
    LineageRecord(RecordArgs),

    /// Walk an entity hierarchy and compute consolidated BI/losses
    ConsolidationCalculate(ConsolidationCalculateArgs),

    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Calculate(args) => commands::calculation::run_calculate(args).await,
        Commands::Validate(args) => commands::calculation::run_validate(args),
        Commands::Compare(args) => commands::calculation::run_compare(args).await,

        Commands::Stress(args) => commands::analytics::run_stress(args).await,
        Commands::Sensitivity(args) => commands::analytics::run_sensitivity_cmd(args).await,
        Commands::Backtest(args) => commands::analytics::run_backtest_cmd(args).await,
        Commands::WhatIf(args) => commands::analytics::run_what_if_cmd(args).await,

        Commands::ParametersActive(args) => commands::parameters::run_active(args).await,
        Commands::ParametersProposeActivate(args) => commands::parameters::run_propose_activate(args).await,
        Commands::ParametersRollback(args) => commands::parameters::run_rollback(args).await,

        Commands::OverrideImpact(args) => commands::overrides::run_impact(args),
        Commands::OverrideProposeApply(args) => commands::overrides::run_propose_apply(args).await,
        Commands::OverrideReject(args) => commands::overrides::run_reject(args).await,

        Commands::LossIngest(args) => commands::loss_data::run_ingest(args).await,
        Commands::LossQuery(args) => commands::loss_data::run_query(args).await,
        Commands::LossRecovery(args) => commands::loss_data::run_recovery(args).await,
        Commands::LossExclude(args) => commands::loss_data::run_exclude(args).await,

        Commands::JobSubmit(args) => commands::jobs::run_submit(args).await,

        Commands::LineageRecord(args) => commands::lineage::run_record(args).await,

        Commands::ConsolidationCalculate(args) => commands::consolidation::run_calculate(args),

        Commands::Version => {
            println!("orm-capital {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
