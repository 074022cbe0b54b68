//! CLI command handling
//!
//! Loads configuration, builds the executor and runner, and prints results.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use reqwest::cookie::Jar;

use crate::commands::Commands;
use crate::common::config::{parse_key_list, Config};
use crate::common::{Error, Result};
use crate::engine::{HttpExecutor, Seed};
use crate::testing::{self, Runner};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            files,
            seeded,
            config,
            fail_fast,
            verbose,
        } => {
            let config = load_config(config.as_deref())?;
            let seed = Arc::new(build_seed(seeded.as_deref(), &config));
            let fail_fast = fail_fast || config.runner.fail_fast;

            // One cookie store for the whole run
            let executor = HttpExecutor::new(Arc::new(Jar::default()), &config.http)?;
            let runner = Runner::new(executor, seed)
                .fail_fast(fail_fast)
                .verbose(verbose);

            let mut suites = Vec::with_capacity(files.len());
            for path in &files {
                let suite = runner.run_file(path).await?;
                let stop = !suite.passed() && fail_fast;
                suites.push(suite);
                if stop {
                    break;
                }
            }

            let total: usize = suites.iter().map(|s| s.scenarios.len()).sum();
            let failed: usize = suites.iter().map(|s| s.failed()).sum();
            if testing::any_failed(&suites) {
                for suite in &suites {
                    for scenario in suite.scenarios.iter().filter(|s| !s.passed) {
                        println!(
                            "  {} {} / {} (step {}/{}): {}",
                            "✗".red(),
                            suite.path.display(),
                            scenario.name,
                            scenario.steps_run,
                            scenario.steps_total,
                            scenario.error.as_deref().unwrap_or_default()
                        );
                    }
                }
                return Err(Error::AssertionFailed(format!(
                    "{} of {} scenario(s) failed",
                    failed, total
                )));
            }

            println!(
                "{} {}",
                "✓".green().bold(),
                format!("All {} scenario(s) passed", total).green().bold()
            );
            Ok(())
        }

        Commands::Check { files } => {
            let mut problems = 0;
            for path in &files {
                let result = testing::check_file(path)?;
                if result.problems.is_empty() {
                    println!(
                        "  {} {} ({} steps)",
                        "✓".green(),
                        result.name,
                        result.steps_total
                    );
                    continue;
                }
                println!("  {} {}", "✗".red(), result.name);
                for problem in &result.problems {
                    println!("    {}", problem.red());
                }
                problems += result.problems.len();
            }

            if problems > 0 {
                return Err(Error::Config(format!(
                    "{} invalid step(s) found",
                    problems
                )));
            }
            Ok(())
        }

        Commands::Seed { seeded, config } => {
            let config = load_config(config.as_deref())?;
            let seed = build_seed(seeded.as_deref(), &config);

            if seed.is_empty() {
                println!("No seeded values set.");
                return Ok(());
            }
            for (key, value) in seed.iter() {
                println!("{}={}", key.cyan(), value);
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Seed from the environment; `--seeded` wins over the config file
fn build_seed(seeded: Option<&str>, config: &Config) -> Seed {
    let keys = match seeded {
        Some(list) => parse_key_list(list),
        None => config.seed.keys.clone(),
    };
    tracing::debug!(keys = ?keys, "seeding memory from environment");
    Seed::from_env(&keys)
}
