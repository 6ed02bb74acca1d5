//! Strata CLI: discover artifact declarations across a package chain and
//! reconcile them into the project.

mod commands;
mod manifest;
mod telemetry;

use std::process;

use clap::{Parser, Subcommand};

use commands::reconcile::ReconcileOptions;
use commands::OutputFormat;

#[derive(Parser)]
#[command(name = "strata", version, about = "Layered project artifact reconciler")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); STRATA_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    log_json: bool,
    /// Output format for reports
    #[arg(long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    format: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
struct RunArgs {
    /// Reconcile only this artifact kind (all declared kinds by default)
    #[arg(long)]
    kind: Option<String>,
    /// Only artifacts with priority above zero
    #[arg(long)]
    bootstrap: bool,
    /// Maximum concurrent artifacts per tier
    #[arg(long, short = 'j')]
    jobs: Option<usize>,
    /// Whole-run deadline in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

impl RunArgs {
    fn into_options(self, dry_run: bool) -> ReconcileOptions {
        ReconcileOptions {
            kind: self.kind,
            bootstrap: self.bootstrap,
            dry_run,
            jobs: self.jobs,
            timeout_secs: self.timeout,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write missing artifacts and merge missing entries into existing ones
    Reconcile {
        #[command(flatten)]
        run: RunArgs,
        /// Compute outcomes without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Fail if reconciling would change anything
    Check {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Show the processing order of packages that build on a package
    Order {
        /// Package name
        package: String,
    },
    /// Show the winning implementation per identity for a kind
    Leaves {
        /// Artifact kind name
        kind: String,
    },
}

fn main() {
    let cli = Cli::parse();
    telemetry::init(cli.verbose, cli.log_json);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let format = cli.format;

    match cli.command {
        Commands::Reconcile { run, dry_run } => {
            commands::reconcile::run(&cwd, &run.into_options(dry_run), format)
        }
        Commands::Check { run } => commands::check::run(&cwd, run.into_options(true), format),
        Commands::Order { package } => commands::order::run(&cwd, &package, format),
        Commands::Leaves { kind } => commands::leaves::run(&cwd, &kind, format),
    }
}
