// crates/plan-review-cli/src/main.rs
// ============================================================================
// Module: Plan Review CLI Entry Point
// Description: Command dispatcher for the plan review stages.
// Purpose: Run one stage, or the whole chain, per invocation.
// Dependencies: clap, plan-review-core, plan-review-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! Each stage command reads one JSON record (from `--input` or stdin), runs
//! the stage against live backends and prints the stage output as JSON on
//! stdout. Logs go to stderr. Exit codes: 0 on success (including skips and
//! halts), 2 for input errors, 75 for transient failures, 1 otherwise.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use plan_review_cli::EXIT_FAILURE;
use plan_review_cli::EXIT_INPUT;
use plan_review_cli::exit_code_for;
use plan_review_cli::input::InputError;
use plan_review_cli::input::read_json_input;
use plan_review_cli::ports;
use plan_review_cli::ports::SetupError;
use plan_review_config::ConfigError;
use plan_review_config::PlanReviewConfig;
use plan_review_core::ChangeSummarizer;
use plan_review_core::IdempotencyGuard;
use plan_review_core::Manifest;
use plan_review_core::ManifestResolver;
use plan_review_core::NotificationRenderer;
use plan_review_core::NotifyInput;
use plan_review_core::Pipeline;
use plan_review_core::PipelineError;
use plan_review_core::PlanInput;
use plan_review_core::PolicyEngine;
use plan_review_core::PrGate;
use plan_review_core::runtime::PolicyRule;
use plan_review_core::runtime::RULES;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "plan-review", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (defaults to `PLAN_REVIEW_CONFIG` or plan-review.toml).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a trigger payload into a manifest and artifact keys.
    Resolve(InputArgs),
    /// Summarize a plan once per artifact version.
    Summarize(InputArgs),
    /// Evaluate security rules against a plan.
    Policy(InputArgs),
    /// Check whether the pull request is still open.
    PrCheck(InputArgs),
    /// Render and deliver the review notification.
    Notify(InputArgs),
    /// Run every stage for one trigger payload.
    Run(InputArgs),
    /// Print the policy rule table.
    Rules,
}

/// Input selection shared by stage commands.
#[derive(Args, Debug)]
struct InputArgs {
    /// JSON input file (reads stdin when omitted).
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,
}

/// `pr-check` input: a bare manifest wrapper or a resolved manifest.
#[derive(Deserialize)]
struct PrCheckInput {
    /// Manifest naming the pull request.
    manifest: Manifest,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying its exit code.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
    /// Process exit code.
    code: u8,
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        Self {
            code: exit_code_for(err.class()),
            message: format!("{} error: {err}", err.class().as_str()),
        }
    }
}

impl From<InputError> for CliError {
    fn from(err: InputError) -> Self {
        Self {
            message: err.to_string(),
            code: EXIT_INPUT,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self {
            message: err.to_string(),
            code: EXIT_FAILURE,
        }
    }
}

impl From<SetupError> for CliError {
    fn from(err: SetupError) -> Self {
        Self {
            message: err.to_string(),
            code: EXIT_FAILURE,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = write_stderr_line(&err.message);
            ExitCode::from(err.code)
        }
    }
}

/// Installs the stderr log subscriber (`RUST_LOG`, default `info`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let load = || PlanReviewConfig::load(cli.config.as_deref());
    match cli.command {
        Commands::Resolve(ref args) => command_resolve(&load()?, args),
        Commands::Summarize(ref args) => command_summarize(&load()?, args),
        Commands::Policy(ref args) => command_policy(&load()?, args),
        Commands::PrCheck(ref args) => command_pr_check(&load()?, args),
        Commands::Notify(ref args) => command_notify(&load()?, args),
        Commands::Run(ref args) => command_run(&load()?, args),
        Commands::Rules => {
            let table: Vec<_> = RULES.iter().map(PolicyRule::describe).collect();
            write_json(&table)
        }
    }
}

// ============================================================================
// SECTION: Stage Commands
// ============================================================================

/// Executes `resolve`.
fn command_resolve(config: &PlanReviewConfig, args: &InputArgs) -> CliResult<()> {
    let payload: Value = read_json_input(args.input.as_deref())?;
    let backend = ports::object_store(config)?;
    let resolved = ManifestResolver::new(Arc::new(backend.plan_store())).resolve(&payload)?;
    write_json(&resolved)
}

/// Executes `summarize`.
fn command_summarize(config: &PlanReviewConfig, args: &InputArgs) -> CliResult<()> {
    let input: PlanInput = read_json_input(args.input.as_deref())?;
    let backend = ports::object_store(config)?;
    let guard = ports::claim_store(config, &backend)?.map(IdempotencyGuard::new);
    let output = ChangeSummarizer::new(Arc::new(backend.plan_store()), guard).summarize(&input)?;
    write_json(&output)
}

/// Executes `policy`.
fn command_policy(config: &PlanReviewConfig, args: &InputArgs) -> CliResult<()> {
    let input: PlanInput = read_json_input(args.input.as_deref())?;
    let backend = ports::object_store(config)?;
    let output = PolicyEngine::new(Arc::new(backend.plan_store())).evaluate_plan(&input)?;
    write_json(&output)
}

/// Executes `pr-check`.
fn command_pr_check(config: &PlanReviewConfig, args: &InputArgs) -> CliResult<()> {
    let input: PrCheckInput = read_json_input(args.input.as_deref())?;
    let gate = PrGate::new(ports::pull_request_source(config)?);
    write_json(&gate.check(&input.manifest).to_output())
}

/// Executes `notify`.
fn command_notify(config: &PlanReviewConfig, args: &InputArgs) -> CliResult<()> {
    let input: NotifyInput = read_json_input(args.input.as_deref())?;
    let backend = ports::object_store(config)?;
    let renderer = NotificationRenderer::new(
        Arc::new(backend.plan_store()),
        Arc::new(backend.link_signer()),
        ports::notifier(config)?,
        config.links.expiry(),
    );
    write_json(&renderer.notify(&input)?)
}

/// Executes `run`.
fn command_run(config: &PlanReviewConfig, args: &InputArgs) -> CliResult<()> {
    let payload: Value = read_json_input(args.input.as_deref())?;
    let pipeline = Pipeline::new(ports::pipeline_ports(config)?);
    write_json(&pipeline.run(&payload)?)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a JSON value and trailing newline to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|err| CliError {
        message: format!("failed to serialize output: {err}"),
        code: EXIT_FAILURE,
    })?;
    bytes.push(b'\n');
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&bytes).and_then(|()| stdout.flush()).map_err(|err| CliError {
        message: format!("failed to write stdout: {err}"),
        code: EXIT_FAILURE,
    })
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}
