//! Combination of all local day files into one date-sorted CSV.
//!
//! Each file under `{root}/{YYYY}/{MM}/{DD}.csv` is read as CSV and its rows
//! are tagged with the date taken from the path. Output columns are `Date`
//! followed by the union of source columns in first-seen order; cells a file
//! does not have are left empty. Files that cannot be read are listed as bad
//! files; files whose path is not a real date are dropped silently.

use super::provider::DataError;
use super::store::{DayStore, LocalDayFile};
use crate::config::OUTPUT_PREFIX;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the date column prepended to the combined output.
pub const DATE_COLUMN: &str = "Date";

/// One successfully read day file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTable {
    pub path: PathBuf,
    pub date: NaiveDate,
    /// Header names after de-duplication.
    pub headers: Vec<String>,
    /// Records padded to `headers.len()`.
    pub records: Vec<Vec<String>>,
    /// Rows dropped for having more fields than the header.
    pub skipped_lines: usize,
}

/// A file that could not be read as CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything found under the store root.
#[derive(Debug, Default)]
pub struct CollectedFiles {
    pub tables: Vec<DayTable>,
    pub bad_files: Vec<BadFile>,
    /// Readable files whose path does not form a calendar date.
    pub undated: usize,
}

/// Header and records of one CSV file, before it is tied to a date.
struct ParsedCsv {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
    skipped_lines: usize,
}

/// Read one day file.
///
/// Rows longer than the header are skipped; shorter rows are padded with
/// empty cells. An empty file (no header) is an error.
///
/// The file is read before its date is looked at, so an unreadable file is an
/// error even when its path is not a calendar date. A readable file without a
/// date yields `Ok(None)`.
pub fn load_day_table(file: &LocalDayFile) -> Result<Option<DayTable>, DataError> {
    let parsed = read_csv(&file.path)?;
    Ok(file.date.map(|date| DayTable {
        path: file.path.clone(),
        date,
        headers: parsed.headers,
        records: parsed.records,
        skipped_lines: parsed.skipped_lines,
    }))
}

fn read_csv(path: &Path) -> Result<ParsedCsv, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| DataError::csv(path, e))?;

    let raw_headers = reader.headers().map_err(|e| DataError::csv(path, e))?.clone();
    if raw_headers.is_empty() {
        return Err(DataError::MissingHeader {
            path: path.to_path_buf(),
        });
    }
    let headers = dedupe_headers(raw_headers.iter());
    let width = headers.len();

    let mut records = Vec::new();
    let mut skipped_lines = 0;
    for result in reader.records() {
        let record = result.map_err(|e| DataError::csv(path, e))?;
        if record.len() > width {
            skipped_lines += 1;
            tracing::debug!(
                path = %path.display(),
                line = record.position().map(|p| p.line()).unwrap_or_default(),
                fields = record.len(),
                expected = width,
                "skipping malformed line"
            );
            continue;
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(width, String::new());
        records.push(row);
    }

    Ok(ParsedCsv {
        headers,
        records,
        skipped_lines,
    })
}

/// Make header names unique: blanks become `Unnamed: {i}` and repeats get a
/// `.1`, `.2`, ... suffix. A leading UTF-8 BOM is dropped.
fn dedupe_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::new();

    for (i, name) in raw.enumerate() {
        let name = if i == 0 {
            name.trim_start_matches('\u{feff}')
        } else {
            name
        };
        let base = if name.trim().is_empty() {
            format!("Unnamed: {i}")
        } else {
            name.to_string()
        };

        let mut candidate = base.clone();
        while seen.contains(&candidate) {
            let n = counts.entry(base.clone()).or_insert(0);
            *n += 1;
            candidate = format!("{base}.{n}");
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}

/// Read every day file in the store.
pub fn collect_day_files(store: &DayStore) -> Result<CollectedFiles, DataError> {
    let mut collected = CollectedFiles::default();

    for file in store.list()? {
        match load_day_table(&file) {
            Ok(Some(table)) => collected.tables.push(table),
            Ok(None) => {
                tracing::debug!(path = %file.path.display(), "path is not a calendar date, skipping");
                collected.undated += 1;
            }
            Err(e) => {
                tracing::warn!(path = %file.path.display(), error = %e, "unreadable day file");
                collected.bad_files.push(BadFile {
                    path: file.path,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(collected)
}

impl CollectedFiles {
    /// Malformed lines dropped across all loaded tables.
    pub fn skipped_lines(&self) -> usize {
        self.tables.iter().map(|t| t.skipped_lines).sum()
    }
}

/// All rows of all day files, `Date` first, sorted by date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedDataset {
    /// Output header, starting with `Date`.
    pub columns: Vec<String>,
    /// Rows aligned to `columns[1..]`, paired with their date.
    pub rows: Vec<(NaiveDate, Vec<String>)>,
    /// Latest date among the loaded files.
    pub end_date: NaiveDate,
    pub file_count: usize,
}

impl CombinedDataset {
    /// Concatenate tables. Returns `None` when there are none.
    pub fn from_tables(tables: &[DayTable]) -> Option<Self> {
        let end_date = tables.iter().map(|t| t.date).max()?;

        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for table in tables {
            for header in &table.headers {
                if header == DATE_COLUMN || index.contains_key(header.as_str()) {
                    continue;
                }
                index.insert(header, columns.len());
                columns.push(header.clone());
            }
        }

        let width = columns.len();
        let mut rows = Vec::with_capacity(tables.iter().map(|t| t.records.len()).sum());
        for table in tables {
            let slots: Vec<Option<usize>> = table
                .headers
                .iter()
                .map(|h| index.get(h.as_str()).copied())
                .collect();
            for record in &table.records {
                let mut row = vec![String::new(); width];
                for (cell, slot) in record.iter().zip(&slots) {
                    if let Some(i) = slot {
                        row[*i] = cell.clone();
                    }
                }
                rows.push((table.date, row));
            }
        }

        // stable: rows of one day keep file order
        rows.sort_by_key(|(date, _)| *date);

        let mut all_columns = Vec::with_capacity(width + 1);
        all_columns.push(DATE_COLUMN.to_string());
        all_columns.extend(columns);

        Some(Self {
            columns: all_columns,
            rows,
            end_date,
            file_count: tables.len(),
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// `kalimati_tarkari_{start:YYYY_MM_DD}_{end:YYYY_MM_DD}.csv`
pub fn output_file_name(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{OUTPUT_PREFIX}_{}_{}.csv",
        start.format("%Y_%m_%d"),
        end.format("%Y_%m_%d")
    )
}

/// Write a combined dataset as CSV.
pub fn write_combined(dataset: &CombinedDataset, path: &Path) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| DataError::csv(path, e))?;
    writer
        .write_record(&dataset.columns)
        .map_err(|e| DataError::csv(path, e))?;

    for (date, cells) in &dataset.rows {
        let date = date.format("%Y-%m-%d").to_string();
        writer
            .write_record(std::iter::once(date.as_str()).chain(cells.iter().map(String::as_str)))
            .map_err(|e| DataError::csv(path, e))?;
    }

    writer.flush().map_err(|e| DataError::io(path, e))?;
    Ok(())
}

/// Result of a successful combine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineReport {
    pub output_path: PathBuf,
    pub file_count: usize,
    pub row_count: usize,
    pub end_date: NaiveDate,
    /// Lines dropped for having more fields than their file's header.
    pub skipped_lines: usize,
    pub bad_files: Vec<BadFile>,
}

/// What a combine run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombineOutcome {
    Combined(CombineReport),
    /// Nothing loaded; no output file was written.
    NoData { bad_files: Vec<BadFile> },
}

/// Collect, combine, and write
/// `{output_dir}/kalimati_tarkari_{start}_{max date}.csv`.
pub fn combine_and_write(
    store: &DayStore,
    start_date: NaiveDate,
    output_dir: &Path,
) -> Result<CombineOutcome, DataError> {
    let collected = collect_day_files(store)?;
    if collected.undated > 0 {
        tracing::debug!(count = collected.undated, "ignored files without a calendar date");
    }

    let Some(dataset) = CombinedDataset::from_tables(&collected.tables) else {
        tracing::warn!(root = %store.root().display(), "no valid CSV data found");
        return Ok(CombineOutcome::NoData {
            bad_files: collected.bad_files,
        });
    };

    fs::create_dir_all(output_dir).map_err(|e| DataError::io(output_dir, e))?;
    let output_path = output_dir.join(output_file_name(start_date, dataset.end_date));
    write_combined(&dataset, &output_path)?;
    let skipped_lines = collected.skipped_lines();
    tracing::info!(
        path = %output_path.display(),
        files = dataset.file_count,
        rows = dataset.row_count(),
        skipped_lines,
        "wrote combined dataset"
    );

    Ok(CombineOutcome::Combined(CombineReport {
        output_path,
        file_count: dataset.file_count,
        row_count: dataset.row_count(),
        end_date: dataset.end_date,
        skipped_lines,
        bad_files: collected.bad_files,
    }))
}
