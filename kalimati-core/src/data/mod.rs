//! Day file acquisition, local storage, date normalization, and combination.

pub mod combine;
pub mod dates;
pub mod download;
pub mod github;
pub mod provider;
pub mod store;

pub use combine::{
    collect_day_files, combine_and_write, load_day_table, output_file_name, write_combined,
    BadFile, CollectedFiles, CombineOutcome, CombineReport, CombinedDataset, DayTable,
    DATE_COLUMN,
};
pub use dates::{normalize_date, parse_and_format_dates, parse_date, DateOrder};
pub use download::{download_day, download_range, DayOutcome, DownloadMode, DownloadSummary};
pub use github::GithubRawSource;
pub use provider::{DataError, DayFileSource, DownloadProgress, RemoteResponse, StdoutProgress};
pub use store::{DayStore, LocalDayFile};
