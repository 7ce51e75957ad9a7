//! Sync configuration.
//!
//! Every operation takes its date span and locations from a `SyncConfig`
//! rather than from process-wide constants, so tests and library callers can
//! point the pipeline at any range or directory.

use crate::data::provider::DataError;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Raw GitHub location of the published daily CSV files.
pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/ErKiran/kalimati/master/data/csv";

/// Local data root, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Prefix of the combined output file name.
pub const OUTPUT_PREFIX: &str = "kalimati_tarkari";

/// First day the remote repository publishes data for.
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 9, 28).expect("valid constant date")
}

/// Parameters shared by acquisition and combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote base URL; day files live at `{base_url}/{YYYY}/{MM}/{DD}.csv`.
    pub base_url: String,
    /// Root of the local date-partitioned tree.
    pub data_dir: PathBuf,
    /// First day to download; also the start date encoded in the output name.
    pub start_date: NaiveDate,
    /// Last day to download (inclusive).
    pub end_date: NaiveDate,
    /// Directory the combined CSV is written into.
    pub output_dir: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            start_date: default_start_date(),
            end_date: chrono::Local::now().date_naive(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl SyncConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_range(mut self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    /// Reject configurations no operation can work with.
    ///
    /// An inverted date range is allowed: it simply downloads nothing.
    pub fn validate(&self) -> Result<(), DataError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(DataError::InvalidConfig("base_url is empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(DataError::InvalidConfig(format!(
                "base_url must be an http(s) URL, got '{base}'"
            )));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(DataError::InvalidConfig("data_dir is empty".into()));
        }
        Ok(())
    }

    /// Number of calendar days in `[start_date, end_date]`.
    pub fn day_count(&self) -> usize {
        let days = (self.end_date - self.start_date).num_days() + 1;
        days.max(0) as usize
    }
}
