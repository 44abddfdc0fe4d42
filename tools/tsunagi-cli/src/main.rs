//! Tsunagi command-line tool
//!
//! Runs the series grouping pipeline stages against a data directory.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{Level, info};
use tsunagi::{Pipeline, PipelineConfig, RunSummary};

/// Default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tsunagi")
}

/// CLI arguments
#[derive(Parser)]
#[command(name = "tsunagi")]
#[command(about = "Group anime records into series by their relations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the pipeline artifacts
    #[arg(short = 'D', long, env = "TSUNAGI_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// CSV export to convert (defaults to anime.csv in the data directory)
    #[arg(short, long, env = "TSUNAGI_INPUT", global = true)]
    input: Option<PathBuf>,

    /// Follow only each record's own relations when grouping
    #[arg(long, global = true)]
    directed: bool,

    /// Write compact JSON instead of pretty-printed
    #[arg(long, global = true)]
    compact: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        let data_dir = self.data_dir.clone().unwrap_or_else(default_data_dir);
        PipelineConfig::new(data_dir)
            .with_input(self.input.clone())
            .with_directed(self.directed)
            .with_pretty(!self.compact)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert, group and split in one go
    RunAll,
    /// Convert the CSV export into anime_records.json
    Convert,
    /// Group records into series and report edge cases
    Group,
    /// Split series into main and soft-category clusters
    Split,
    /// Show which artifacts exist
    Status,
    /// Remove generated artifacts
    Clean {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

fn print_run(summary: &RunSummary) {
    match summary.convert {
        Some(convert) => println!("convert: {} rows", convert.rows),
        None => println!("convert: skipped (existing records reused)"),
    }
    let group = summary.group;
    println!(
        "group:   {} series from {} records ({} conflicts, {} orphans, {} cycles)",
        group.groups, group.records, group.conflicts, group.orphans, group.cycles
    );
    let split = summary.split;
    println!(
        "split:   {} main, {} character, {} adaptation, {} spin-off, {} other, {} parent",
        split.main, split.character, split.adaptation, split.spin_off, split.other, split.parent
    );
}

fn confirm(prompt: &str) -> Result<bool> {
    println!("{prompt}");
    print!("Are you sure? [y/N]: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_target(false)
        .init();

    let pipeline = Pipeline::new(cli.pipeline_config());

    match cli.command {
        Commands::RunAll => {
            info!(data_dir = %pipeline.store().root().display(), "running all stages");
            let summary = pipeline.run_all().context("pipeline run failed")?;
            print_run(&summary);
        }
        Commands::Convert => {
            let summary = pipeline.convert().context("convert stage failed")?;
            println!("converted {} rows", summary.rows);
        }
        Commands::Group => {
            let summary = pipeline.group().context("group stage failed")?;
            println!(
                "{} series, {} conflicts, {} orphans, {} cycles",
                summary.groups, summary.conflicts, summary.orphans, summary.cycles
            );
        }
        Commands::Split => {
            let summary = pipeline.split().context("split stage failed")?;
            println!(
                "{} main clusters across {} series",
                summary.main, summary.groups
            );
        }
        Commands::Status => {
            print!("{}", pipeline.status());
        }
        Commands::Clean { yes } => {
            if !yes && !confirm("This will remove all generated artifacts.")? {
                info!("Clean cancelled");
                return Ok(());
            }
            let removed = pipeline.clean().context("failed to remove artifacts")?;
            println!("removed {removed} files");
        }
    }

    Ok(())
}
