//! Local date-partitioned store for day files.
//!
//! Layout: `{root}/{YYYY}/{MM}/{DD}.csv`
//!
//! - Atomic writes (write to `.csv.tmp`, rename into place)
//! - Files are only ever created or overwritten, never deleted
//! - A listing walks the tree in sorted order and derives each file's date
//!   from its path alone

use super::provider::DataError;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

/// One `.csv` leaf found under the store root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDayFile {
    pub path: PathBuf,
    /// Date derived from `{year}/{month}/{day}.csv`; `None` when the path
    /// segments do not form a real calendar date (e.g. `2023/02/30.csv`).
    pub date: Option<NaiveDate>,
}

/// The local day file tree.
pub struct DayStore {
    root: PathBuf,
}

impl DayStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for a date: `{root}/{YYYY}/{MM}/{DD}.csv`
    pub fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(date.format("%Y").to_string())
            .join(date.format("%m").to_string())
            .join(date.format("%d.csv").to_string())
    }

    /// Whether a file for `date` is already present.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.day_path(date).is_file()
    }

    /// Write raw bytes for a date, creating parent directories.
    ///
    /// Writes are atomic: write to .tmp then rename.
    pub fn write(&self, date: NaiveDate, bytes: &[u8]) -> Result<PathBuf, DataError> {
        let path = self.day_path(date);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
        }

        let tmp_path = path.with_extension("csv.tmp");
        let written = fs::write(&tmp_path, bytes)
            .map_err(|e| DataError::io(&tmp_path, e))
            .and_then(|()| fs::rename(&tmp_path, &path).map_err(|e| DataError::io(&path, e)));

        if let Err(e) = written {
            // a partial write or a failed rename must not leave the temp file
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        Ok(path)
    }

    /// List every `.csv` leaf at `{root}/{year}/{month}/`, sorted by name at
    /// each level.
    ///
    /// Non-directories at the year and month levels and non-`.csv` leaves are
    /// ignored. A missing root lists as empty.
    pub fn list(&self) -> Result<Vec<LocalDayFile>, DataError> {
        if !self.root.exists() {
            tracing::warn!(root = %self.root.display(), "data directory does not exist");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for (year, year_path) in sorted_subdirs(&self.root)? {
            for (month, month_path) in sorted_subdirs(&year_path)? {
                for path in sorted_entries(&month_path)? {
                    if !path.is_file() {
                        continue;
                    }
                    let Some(stem) = csv_stem(&path) else {
                        continue;
                    };
                    let date = path_date(&year, &month, &stem);
                    files.push(LocalDayFile { path, date });
                }
            }
        }

        Ok(files)
    }
}

/// Parse `{year}-{month}-{day}` from path segments.
///
/// Strict: all three segments must be numeric and form a real date.
pub fn path_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !(all_digits(year) && all_digits(month) && all_digits(day)) {
        return None;
    }
    NaiveDate::parse_from_str(&format!("{year}-{month}-{day}"), "%Y-%m-%d").ok()
}

fn csv_stem(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(".csv").map(str::to_string)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| DataError::io(dir, e))? {
        let entry = entry.map_err(|e| DataError::io(dir, e))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, DataError> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|p| p.is_dir())
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?.to_string();
            Some((name, p))
        })
        .collect())
}
