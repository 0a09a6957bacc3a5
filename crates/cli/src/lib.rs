pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::price::PriceStage;

#[derive(Debug, Parser)]
#[command(
    name = "cartprice",
    about = "Cart pricing CLI",
    long_about = "Price cart fixtures stage by stage and inspect the effective pricing configuration.",
    after_help = "Examples:\n  cartprice price cart.json\n  cartprice price cart.json --stage tax --json\n  cartprice config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price a cart fixture (JSON with `cart` and `store`) up to the given stage")]
    Price {
        #[arg(help = "Path to the pricing fixture")]
        fixture: PathBuf,
        #[arg(long, value_enum, default_value_t = PriceStage::Total, help = "Last stage to compute")]
        stage: PriceStage,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Price { fixture, stage, json } => commands::price::run(&fixture, stage, json),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
