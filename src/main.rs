use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use flex_version::analyzer::Analyzer;
use flex_version::config;
use flex_version::ui;

const ENV_LOG: &str = "FLEX_VERSION_LOG";

#[derive(clap::Parser)]
#[command(
    name = "flex-version",
    version,
    about = "Derive version numbers from git history using per-branch rules"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(
        short,
        long,
        default_value = ".",
        help = "Path inside the repository to analyze"
    )]
    repo: PathBuf,

    #[arg(
        short = 'v',
        long = "var",
        value_name = "KEY=VALUE",
        help = "Argument exposed to templates as <Arg:KEY> (repeatable)"
    )]
    vars: Vec<String>,

    #[arg(
        short,
        long,
        help = "Print the full analysis, keep '_' outputs and show detailed errors"
    )]
    diagnostic: bool,

    #[arg(long, help = "Show configured branch rules and exit")]
    list: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.diagnostic);

    if let Err(err) = run(&args) {
        ui::display_error(&ui::describe_error(&err, args.diagnostic));
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries the JSON result.
///
/// Priority: diagnostic flag > FLEX_VERSION_LOG > `warn`
fn init_logging(diagnostic: bool) {
    let filter = if diagnostic {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config =
        config::load_config(args.config.as_deref()).context("Failed to load configuration")?;

    if args.list {
        ui::display_branch_rules(&config.branches);
        return Ok(());
    }

    if args.diagnostic {
        ui::display_status(&format!("Analyzing {}", args.repo.display()));
    }

    let result = Analyzer::new(config)
        .with_arguments(&args.vars)
        .diagnostic(args.diagnostic)
        .analyze_path(&args.repo)
        .with_context(|| format!("Failed to analyze '{}'", args.repo.display()))?;

    let json = if args.diagnostic {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string_pretty(&result.output)?
    };
    println!("{}", json);

    Ok(())
}
