//! Command-line interface for tsbench
//!
//! # Usage Examples
//!
//! ```bash
//! # Every configured case against every configured database
//! tsbench --config config.yml test-all
//!
//! # The configured session against one database
//! tsbench test timescale_db
//!
//! # Selected cases, keeping the schema between invocations
//! tsbench test postgres --case bulk_insert --case parallel_complex_rw \
//!   --no-setup --no-teardown --precision 3
//!
//! # Known backends and test cases
//! tsbench list
//! ```
//!
//! Logging follows `RUST_LOG`; without it `--verbose` selects `debug` and
//! the default is `info`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tsbench::{Registry, Tester};
use tsbench_core::Settings;
use tsbench_executor::builtin_cases;

#[derive(Parser)]
#[command(name = "tsbench")]
#[command(about = "Benchmark time-series workloads across database engines")]
#[command(long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true, default_value = "config.yml", env = "TSBENCH_CONFIG")]
    config: PathBuf,

    /// Debug logging and per-case timings
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run test cases against one database
    Test {
        /// Database identifier (e.g. postgres, timescale_db, maria_db, click_house)
        database: String,

        /// Run only these cases, one by one (default: the configured session)
        #[arg(long = "case", value_name = "NAME")]
        cases: Vec<String>,

        /// Skip schema setup before each case
        #[arg(long)]
        no_setup: bool,

        /// Skip schema teardown after each case
        #[arg(long)]
        no_teardown: bool,

        /// Decimal places in the report
        #[arg(long)]
        precision: Option<usize>,
    },

    /// Run the configured session against every configured database
    TestAll,

    /// List registered databases and built-in test cases
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let registry = Registry::with_builtin();

    match cli.command {
        Commands::List => {
            println!("Databases:");
            for identifier in registry.identifiers() {
                println!("  {identifier}");
            }
            println!("Test cases:");
            for case in builtin_cases() {
                println!("  {}", case.name);
            }
            Ok(())
        }
        Commands::TestAll => {
            let settings = load_settings(&cli.config, cli.verbose)?;
            tsbench::test_all(&settings, &registry)
                .await
                .context("Test session failed")?;
            Ok(())
        }
        Commands::Test {
            database,
            cases,
            no_setup,
            no_teardown,
            precision,
        } => {
            let settings = load_settings(&cli.config, cli.verbose)?;
            let mut tester = Tester::new(&settings, &registry, &database)?;
            if no_setup {
                tester.options_mut().run_schema_setup = false;
            }
            if no_teardown {
                tester.options_mut().run_schema_teardown = false;
            }
            if let Some(precision) = precision {
                tester.set_precision(precision);
            }

            if cases.is_empty() {
                tester
                    .run_all()
                    .await
                    .with_context(|| format!("Testing {database} failed"))?;
            } else {
                for case in &cases {
                    tester
                        .run(case, false)
                        .await
                        .with_context(|| format!("Testing {database}#{case} failed"))?;
                }
                println!("{}", tester.report());
            }
            Ok(())
        }
    }
}

fn load_settings(path: &Path, verbose: bool) -> anyhow::Result<Settings> {
    let mut settings = Settings::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    settings.verbose |= verbose;
    Ok(settings)
}
