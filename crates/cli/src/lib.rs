pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use crate::commands::SessionOptions;

#[derive(Debug, Parser)]
#[command(
    name = "spectrum",
    about = "Shopper Spectrum recommendation CLI",
    long_about = "Query product recommendations and product statistics built from retail transaction data.",
    after_help = "Examples:\n  spectrum recommend \"WHITE HANGING HEART T-LIGHT HOLDER\" --count 3\n  spectrum products --search lantern\n  spectrum doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a spectrum.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Path to the transactions CSV, overriding config")]
    data: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PopularityMetric {
    Revenue,
    Customers,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Recommend products bought by the same customers as PRODUCT")]
    Recommend {
        #[arg(help = "Product description, exactly as it appears in the sales data")]
        product: String,
        #[arg(long, help = "Number of recommendations (defaults to config)")]
        count: Option<usize>,
    },
    #[command(about = "Search products by description, or list popular products")]
    Products {
        #[arg(long, help = "Case-insensitive substring to match")]
        search: Option<String>,
        #[arg(long, help = "Maximum number of products to list")]
        limit: Option<usize>,
    },
    #[command(about = "List the most popular products")]
    Popular {
        #[arg(long, help = "Maximum number of products to list")]
        limit: Option<usize>,
        #[arg(long, value_enum, default_value = "revenue", help = "Ranking metric")]
        by: PopularityMetric,
    },
    #[command(about = "Show statistics for one product")]
    Info {
        #[arg(help = "Product description")]
        product: String,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution"
    )]
    Config,
    #[command(about = "Validate config, transactions file and interaction matrix readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = SessionOptions { config_path: cli.config, data_path: cli.data };

    let result = match cli.command {
        Command::Recommend { product, count } => {
            commands::recommend::run(&options, &product, count)
        }
        Command::Products { search, limit } => {
            commands::products::search(&options, search.as_deref(), limit)
        }
        Command::Popular { limit, by } => commands::products::popular(&options, limit, by),
        Command::Info { product } => commands::products::info(&options, &product),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&options) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(&options, json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
