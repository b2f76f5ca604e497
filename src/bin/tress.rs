//! Tress CLI
//!
//! Runs the allocator and the discount functions over JSON read from a file or stdin, or over a
//! named YAML fixture set.

use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Serialize, de::DeserializeOwned};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tress::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "tress", about = "Tress checkout discount engine", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "TRESS_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Allocate discount proposals over a cart
    Allocate(AllocateArgs),

    /// Run the product exclusion discount function
    ProductDiscount(FunctionArgs),

    /// Run the order exclusion discount function
    OrderDiscount(FunctionArgs),

    /// Allocate a YAML fixture set
    Scenario(ScenarioArgs),
}

#[derive(Debug, Args)]
struct AllocateArgs {
    /// JSON allocator input; reads stdin when omitted
    #[arg(short, long, env = "TRESS_INPUT")]
    input: Option<PathBuf>,

    /// Output format
    #[arg(short, long, env = "TRESS_FORMAT", value_enum, default_value_t = Format::Json)]
    format: Format,

    #[command(flatten)]
    options: OptionsArgs,
}

#[derive(Debug, Args)]
struct FunctionArgs {
    /// JSON function input; reads stdin when omitted
    #[arg(short, long, env = "TRESS_INPUT")]
    input: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ScenarioArgs {
    /// Fixture set name
    name: String,

    /// Directory holding `carts/` and `discounts/`
    #[arg(long, env = "TRESS_FIXTURES", default_value = "./fixtures")]
    fixtures: PathBuf,

    /// Output format
    #[arg(short, long, env = "TRESS_FORMAT", value_enum, default_value_t = Format::Table)]
    format: Format,

    #[command(flatten)]
    options: OptionsArgs,
}

#[derive(Debug, Args)]
struct OptionsArgs {
    /// Handling of fixed amounts that do not apply to each item
    #[arg(long, env = "TRESS_FIXED_AMOUNT", value_enum, default_value_t = FixedAmountArg::Prorate)]
    fixed_amount: FixedAmountArg,

    /// Handling of repeated clearance messages
    #[arg(long, env = "TRESS_ERRORS", value_enum, default_value_t = ErrorsArg::PerTarget)]
    errors: ErrorsArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FixedAmountArg {
    Prorate,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ErrorsArg {
    PerTarget,
    PerDiscount,
}

impl From<&OptionsArgs> for AllocatorOptions {
    fn from(args: &OptionsArgs) -> Self {
        Self {
            fixed_amount: match args.fixed_amount {
                FixedAmountArg::Prorate => FixedAmountPolicy::Prorate,
                FixedAmountArg::Reject => FixedAmountPolicy::Reject,
            },
            errors: match args.errors {
                ErrorsArg::PerTarget => ErrorReporting::PerTarget,
                ErrorsArg::PerDiscount => ErrorReporting::PerDiscount,
            },
        }
    }
}

fn main() -> Result<()> {
    // Load .env file if present (ignore if missing)
    _ = dotenvy::dotenv();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Allocate(args) => {
            let input: AllocatorInput = parse_input(args.input.as_deref())?;
            let output = allocate(&input, AllocatorOptions::from(&args.options))?;

            info!(
                lines = output.line_discounts.len(),
                errors = output.displayable_errors.len(),
                "allocated"
            );

            write_allocation(&input, &output, args.format)
        }
        Commands::ProductDiscount(args) => {
            let input: ProductDiscountInput = parse_input(args.input.as_deref())?;

            write_json(&product::run(&input)?)
        }
        Commands::OrderDiscount(args) => {
            let input: OrderDiscountInput = parse_input(args.input.as_deref())?;

            write_json(&order::run(&input)?)
        }
        Commands::Scenario(args) => {
            let fixture = Fixture::from_set_in(&args.fixtures, &args.name)
                .with_context(|| format!("failed to load fixture set {}", args.name))?;

            let input = fixture.input();
            let output = allocate(&input, AllocatorOptions::from(&args.options))?;

            info!(scenario = %args.name, "allocated");

            write_allocation(&input, &output, args.format)
        }
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();

            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;

            Ok(buf)
        }
    }
}

fn parse_input<T: DeserializeOwned>(path: Option<&Path>) -> Result<T> {
    let contents = read_input(path)?;

    serde_json::from_str(&contents).context("input is not valid JSON for this command")
}

fn write_json(value: &impl Serialize) -> Result<()> {
    let mut out = io::stdout().lock();

    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;

    Ok(())
}

fn write_allocation(input: &AllocatorInput, output: &AllocatorOutput, format: Format) -> Result<()> {
    match format {
        Format::Json => write_json(output),
        Format::Table => {
            AllocationReport::new(input, output)?.write_to(io::stdout().lock())?;

            Ok(())
        }
    }
}
