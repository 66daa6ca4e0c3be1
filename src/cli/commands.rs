//! CLI command definitions for stockflow.
//!
//! Two commands: `list` enumerates the shipped pipelines, `run` executes one
//! and reports per-task outcomes. The run exits non-zero when any task fails.

use clap::Parser;
use serde::Serialize;
use tracing::info;

use crate::config::PipelineSettings;
use crate::flows::{random_number, stock_market};
use crate::metrics;
use crate::pipeline::{Pipeline, PipelineRunner, RunReport};

/// Data pipeline runner for stock market price loading.
#[derive(Parser)]
#[command(name = "stockflow")]
#[command(about = "Run stock market data pipelines")]
#[command(version)]
#[command(
    long_about = "stockflow runs data pipelines: a toy random-number chain and the stock_market ETL chain (availability sensor, price fetch, storage, CSV formatting, warehouse load).\n\nExample usage:\n  stockflow run stock_market --symbol NVDA\n  stockflow list --json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run a pipeline to completion.
    Run(RunArgs),

    /// List the shipped pipelines and their tasks.
    #[command(alias = "ls")]
    List(ListArgs),
}

/// Arguments for `stockflow run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Pipeline to run (generate_random, stock_market).
    pub pipeline: String,

    /// Ticker symbol override for the stock_market pipeline.
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Format prices in-process instead of launching the container job.
    #[arg(long)]
    pub local_format: bool,

    /// Output the run report as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Print collected metrics after the run.
    #[arg(long)]
    pub metrics: bool,
}

/// Arguments for `stockflow list`.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output JSON instead of a table.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => {
            run_run_command(args).await?;
        }
        Commands::List(args) => {
            run_list_command(args)?;
        }
    }
    Ok(())
}

async fn run_run_command(args: RunArgs) -> anyhow::Result<()> {
    metrics::init_metrics()?;

    let pipeline = build_named_pipeline(&args)?;

    info!(pipeline = pipeline.name(), "running pipeline");
    let report = PipelineRunner::new().run(&pipeline).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if args.metrics {
        println!("{}", metrics::export_metrics());
    }

    if let Some(failed) = report.failed_task() {
        anyhow::bail!(
            "pipeline '{}' failed at task '{}': {}",
            report.pipeline,
            failed.task_id,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}

fn build_named_pipeline(args: &RunArgs) -> anyhow::Result<Pipeline> {
    match args.pipeline.as_str() {
        random_number::PIPELINE_NAME => Ok(random_number::build_pipeline()),
        stock_market::PIPELINE_NAME => {
            let mut settings = PipelineSettings::from_env()?;
            if let Some(symbol) = &args.symbol {
                settings = settings.with_symbol(symbol);
            }
            if args.local_format {
                settings = settings.with_format_in_container(false);
            }
            settings.validate()?;

            Ok(stock_market::build_pipeline(&settings)?)
        }
        other => anyhow::bail!(
            "unknown pipeline '{}' (available: {}, {})",
            other,
            random_number::PIPELINE_NAME,
            stock_market::PIPELINE_NAME
        ),
    }
}

fn print_report(report: &RunReport) {
    println!("Pipeline: {}", report.pipeline);
    println!(
        "Started:  {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "Finished: {}",
        report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();

    for task in &report.tasks {
        let line = format!(
            "  {:<20} {:<8} {:>8}ms",
            task.task_id,
            task.status,
            task.duration.as_millis()
        );
        match &task.error {
            Some(error) => println!("{line}  {error}"),
            None => println!("{line}"),
        }
    }

    println!();
    println!(
        "Result: {}",
        if report.succeeded() { "success" } else { "failed" }
    );
}

#[derive(Debug, Clone, Serialize)]
struct PipelineListing {
    name: &'static str,
    tasks: Vec<&'static str>,
    schedule: &'static str,
}

/// The shipped pipelines, described without building them: construction of
/// the stock pipeline resolves connections, which `list` must not require.
fn pipeline_listings() -> Vec<PipelineListing> {
    vec![
        PipelineListing {
            name: random_number::PIPELINE_NAME,
            tasks: vec![
                random_number::GENERATE_RANDOM_NUMBER,
                random_number::CHECK_ODD_EVEN,
            ],
            schedule: "@daily",
        },
        PipelineListing {
            name: stock_market::PIPELINE_NAME,
            tasks: vec![
                stock_market::IS_API_AVAILABLE,
                stock_market::GET_STOCK_PRICES,
                stock_market::STORE_PRICES,
                stock_market::FORMAT_PRICES,
                stock_market::GET_FORMATTED_CSV,
                stock_market::LOAD_TO_DW,
            ],
            schedule: "@daily",
        },
    ]
}

fn run_list_command(args: ListArgs) -> anyhow::Result<()> {
    let listings = pipeline_listings();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
    } else {
        for listing in &listings {
            println!("{} ({})", listing.name, listing.schedule);
            for task in &listing.tasks {
                println!("  {task}");
            }
            println!();
        }
    }

    Ok(())
}
