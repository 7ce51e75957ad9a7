//! Kalimati CLI: download daily price files and combine them.
//!
//! Flags (combinable, run in this order):
//! - `--update`: download every day file since the first published day, overwriting local copies
//! - `--update-missing`: download only days with no local file
//! - `--extract`: combine local day files into one date-sorted CSV
//!
//! With no flags, prints usage and does nothing.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use kalimati_core::data::{
    combine_and_write, download_range, CombineOutcome, DayStore, DownloadMode,
    GithubRawSource, StdoutProgress,
};
use kalimati_core::SyncConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "kalimati",
    about = "Kalimati Tarkari Data Downloader and Combiner"
)]
struct Cli {
    /// Download all CSV files from GitHub (overwrite existing).
    #[arg(long)]
    update: bool,

    /// Download only missing CSV files.
    #[arg(long)]
    update_missing: bool,

    /// Combine existing local CSV files into one output.
    #[arg(long)]
    extract: bool,
}

impl Cli {
    fn has_action(&self) -> bool {
        self.update || self.update_missing || self.extract
    }
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    if !cli.has_action() {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let config = SyncConfig::default();
    config.validate()?;
    tracing::debug!(?config, "resolved configuration");

    if cli.update {
        println!("\n--- Downloading ALL data from GitHub (overwrite mode) ---\n");
        run_download(&config, DownloadMode::Overwrite)?;
    }

    if cli.update_missing {
        println!("\n--- Downloading missing CSVs from GitHub ---\n");
        run_download(&config, DownloadMode::MissingOnly)?;
    }

    if cli.extract {
        println!("\n--- Extracting and combining local CSV files ---\n");
        run_extract(&config)?;
    }

    Ok(())
}

/// `RUST_LOG` controls verbosity; defaults to warnings so stdout progress
/// lines stay readable.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_download(config: &SyncConfig, mode: DownloadMode) -> Result<()> {
    let source = GithubRawSource::new(&config.base_url)?;
    let store = DayStore::new(&config.data_dir);
    println!(
        "Checking {} days from {} to {}",
        config.day_count(),
        config.start_date,
        config.end_date
    );

    download_range(
        &source,
        &store,
        config.start_date,
        config.end_date,
        mode,
        &StdoutProgress,
    );

    Ok(())
}

fn run_extract(config: &SyncConfig) -> Result<()> {
    let store = DayStore::new(&config.data_dir);
    let outcome = combine_and_write(&store, config.start_date, &config.output_dir)
        .with_context(|| format!("failed to combine files under {}", config.data_dir.display()))?;

    let bad_files = match outcome {
        CombineOutcome::NoData { bad_files } => {
            println!("No valid CSV data found.");
            bad_files
        }
        CombineOutcome::Combined(report) => {
            println!(
                "\nCombined CSV saved as: {} ({} rows from {} files)",
                report.output_path.display(),
                report.row_count,
                report.file_count
            );
            if report.skipped_lines > 0 {
                println!("Skipped {} malformed lines.", report.skipped_lines);
            }
            report.bad_files
        }
    };

    if !bad_files.is_empty() {
        println!("\nFiles with parsing issues:");
        for bad in &bad_files {
            println!("{}", bad.path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_combine_and_default_off() {
        let cli = Cli::try_parse_from(["kalimati"]).unwrap();
        assert!(!cli.has_action());

        let cli = Cli::try_parse_from(["kalimati", "--update-missing", "--extract"]).unwrap();
        assert!(!cli.update);
        assert!(cli.update_missing);
        assert!(cli.extract);
        assert!(cli.has_action());
    }

    #[test]
    fn flags_take_no_value() {
        assert!(Cli::try_parse_from(["kalimati", "--update=yes"]).is_err());
        assert!(Cli::try_parse_from(["kalimati", "--start", "2024-01-01"]).is_err());
    }
}
