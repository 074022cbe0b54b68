//! apiprobe - behavior-driven contract testing for HTTP and GraphQL APIs
//!
//! Runs YAML scenario files whose steps send requests, remember values from
//! responses and assert on status, headers and JSON bodies.

use apiprobe::{cli, commands::Commands, common::logging};
use clap::Parser;

#[derive(Parser)]
#[command(name = "apiprobe", about = "BDD contract testing for HTTP and GraphQL APIs")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.command.verbose());

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
