//! seedlink - link pre-seeded files into a manifest-described tree.
//!
//! Usage:
//!   seedlink link -f SRC -t DST MANIFEST...   Link files matched by size
//!   seedlink relocate -f SEED -t DST          Move files and link them back
//!   seedlink --help                           Show help

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use seedlink_core::{Disposition, EntryOutcome, LinkConfig, RunSummary, SummaryCounts};
use seedlink_ops::Orchestrator;

#[derive(Parser)]
#[command(
    name = "seedlink",
    version,
    about = "Link pre-seeded files into a manifest-described tree",
    long_about = "seedlink finds files whose size matches a manifest entry and \
                  creates the manifest's directory tree as symbolic links to them.\n\n\
                  Entries that are ambiguous, missing or already present at the \
                  destination are reported and left alone."
)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Maximum number of links created at once
    #[arg(short, long, global = true, default_value = "16")]
    jobs: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Link manifest entries to size-matched files
    Link {
        /// Directory holding the downloaded files
        #[arg(short, long)]
        from: PathBuf,

        /// Directory to create the linked tree in
        #[arg(short, long)]
        to: PathBuf,

        /// Check everything but do not touch the filesystem
        #[arg(long, visible_alias = "test")]
        dry_run: bool,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Manifest files (JSON)
        #[arg(required = true)]
        manifests: Vec<PathBuf>,
    },

    /// Move seeded files into a new tree and leave symlinks behind
    Relocate {
        /// Seed directory holding the real files
        #[arg(short, long)]
        from: PathBuf,

        /// Directory the files are moved into
        #[arg(short, long)]
        to: PathBuf,

        /// Check everything but do not touch the filesystem
        #[arg(long, visible_alias = "test")]
        dry_run: bool,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Link {
            from,
            to,
            dry_run,
            format,
            manifests,
        } => {
            let config = build_config(from, to, dry_run, cli.jobs)?;
            run_link(config, &manifests, format).await?;
        }
        Command::Relocate {
            from,
            to,
            dry_run,
            format,
        } => {
            let config = build_config(from, to, dry_run, cli.jobs)?;
            run_relocate(config, format).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(from: PathBuf, to: PathBuf, dry_run: bool, jobs: usize) -> Result<LinkConfig> {
    LinkConfig::builder()
        .source_root(from)
        .destination_root(to)
        .dry_run(dry_run)
        .max_concurrent(jobs)
        .build()
        .wrap_err("Invalid arguments")
}

/// Reconcile every manifest and print the report.
async fn run_link(config: LinkConfig, manifests: &[PathBuf], format: OutputFormat) -> Result<()> {
    if config.dry_run {
        info!("Dry run, no links will be created");
    }
    let orchestrator = Orchestrator::new(config);
    let report = orchestrator
        .run_files(manifests)
        .await
        .wrap_err("Link run failed")?;

    match format {
        OutputFormat::Text => {
            for summary in &report.summaries {
                print_summary(summary);
            }
            if report.summaries.len() > 1 {
                print_totals("all manifests", &report.totals());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Relocate the seed directory and print the summary.
async fn run_relocate(config: LinkConfig, format: OutputFormat) -> Result<()> {
    if config.dry_run {
        info!("Dry run, no files will be moved");
    }
    let orchestrator = Orchestrator::new(config);
    let summary = orchestrator
        .relocate()
        .await
        .wrap_err("Relocate failed")?;

    match format {
        OutputFormat::Text => print_summary(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "─".repeat(70));
    println!(" {}", summary.manifest);
    println!("{}", "─".repeat(70));

    for outcome in &summary.outcomes {
        println!(" {}", format_outcome(outcome));
    }

    print_totals(&summary.manifest, &summary.counts);
}

fn print_totals(label: &str, counts: &SummaryCounts) {
    println!();
    println!(" {label}: {counts}");
}

fn format_outcome(outcome: &EntryOutcome) -> String {
    let line = format!(
        "{} ({}): {}",
        outcome.entry.relative_path.display(),
        format_size(outcome.entry.expected_size),
        outcome.disposition
    );
    match &outcome.disposition {
        Disposition::Linked { source } | Disposition::Skipped { source } => {
            format!("{line} <- {}", source.display())
        }
        _ => line,
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
