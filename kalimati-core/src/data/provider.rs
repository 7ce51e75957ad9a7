//! Day file source trait, progress reporting, and structured error types.
//!
//! The DayFileSource trait abstracts over where day files come from (raw
//! GitHub over HTTP in production) so the acquisition logic can be driven by
//! a mock in tests.

use super::download::{DayOutcome, DownloadSummary};
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for data operations.
///
/// Acquisition never surfaces these past a single day: they are folded into
/// `DayOutcome::Failed`. Combination records them against the bad file.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no header row")]
    MissingHeader { path: PathBuf },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        DataError::Csv {
            path: path.into(),
            source,
        }
    }
}

/// What the remote answered for one day file, before any policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    /// Declared `Content-Type` header, if any.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RemoteResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// True when the declared media type is plain text or CSV.
    ///
    /// GitHub raw serves CSV as `text/plain; charset=utf-8`; an HTML error
    /// page served with 200 must not pass.
    pub fn is_tabular_text(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/plain") || ct.contains("text/csv")
            })
            .unwrap_or(false)
    }
}

/// Trait for day file sources.
///
/// Implementations make exactly one request per call; retry policy (there is
/// none) lives above this trait.
pub trait DayFileSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Remote location of the file for `date`.
    fn day_url(&self, date: NaiveDate) -> String;

    /// Fetch the file for `date`.
    ///
    /// Any HTTP status is a successful fetch; only transport failures are errors.
    fn fetch(&self, date: NaiveDate) -> Result<RemoteResponse, DataError>;
}

/// Progress callback for batch downloads.
pub trait DownloadProgress {
    /// Called when a day was skipped because its local file already exists.
    fn on_skip_existing(&self, date: NaiveDate, path: &std::path::Path);

    /// Called after a fetch attempt for a day.
    fn on_day(&self, date: NaiveDate, outcome: &DayOutcome);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, summary: &DownloadSummary);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl DownloadProgress for StdoutProgress {
    fn on_skip_existing(&self, _date: NaiveDate, _path: &std::path::Path) {}

    fn on_day(&self, _date: NaiveDate, outcome: &DayOutcome) {
        match outcome {
            DayOutcome::Saved(path) => println!("Downloaded: {}", path.display()),
            DayOutcome::NotFound { url } => println!("File not found: {url}"),
            DayOutcome::HttpStatus { url, status } => println!("HTTP {status}: {url}"),
            DayOutcome::UnexpectedContentType { url, content_type } => {
                println!("Skipped non-CSV file: {url} [Content-Type: {content_type}]")
            }
            DayOutcome::Failed { url, reason } => println!("Error downloading {url}: {reason}"),
        }
    }

    fn on_batch_complete(&self, summary: &DownloadSummary) {
        println!(
            "\nDownload complete: {} saved, {} already present, {} not found, {} rejected, {} failed ({} of {} days fetched)",
            summary.saved,
            summary.skipped_existing,
            summary.not_found,
            summary.rejected,
            summary.failed,
            summary.fetched(),
            summary.total_days
        );
    }
}
