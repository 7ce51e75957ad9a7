//! Download orchestrator: walks a date range and fetches each day file.
//!
//! Every failure is scoped to its day: a 404, an HTML page served with 200, a
//! network error, or a failed write is recorded and the batch moves on.

use super::provider::{DayFileSource, DownloadProgress};
use super::store::DayStore;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Whether existing local files are refetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    /// Fetch every day, replacing local copies.
    Overwrite,
    /// Only fetch days with no local file.
    MissingOnly,
}

/// Result of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayOutcome {
    /// Written to the store at this path.
    Saved(PathBuf),
    /// The remote has no file for this day.
    NotFound { url: String },
    /// Any other non-200 status.
    HttpStatus { url: String, status: u16 },
    /// 200, but the declared media type is not plain text or CSV.
    UnexpectedContentType { url: String, content_type: String },
    /// Network or local I/O error.
    Failed { url: String, reason: String },
}

/// Fetch one day and persist it if the response is tabular text.
///
/// Never returns an error: every failure becomes a `DayOutcome`.
pub fn download_day(source: &dyn DayFileSource, store: &DayStore, date: NaiveDate) -> DayOutcome {
    let url = source.day_url(date);

    let resp = match source.fetch(date) {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(%url, error = %e, "fetch failed");
            return DayOutcome::Failed {
                url,
                reason: e.to_string(),
            };
        }
    };

    if resp.is_not_found() {
        tracing::debug!(%url, "no file published for this day");
        return DayOutcome::NotFound { url };
    }

    if !resp.is_success() {
        tracing::warn!(%url, status = resp.status, "unexpected HTTP status");
        return DayOutcome::HttpStatus {
            url,
            status: resp.status,
        };
    }

    if !resp.is_tabular_text() {
        let content_type = resp.content_type.clone().unwrap_or_default();
        tracing::warn!(%url, %content_type, "rejected non-CSV response");
        return DayOutcome::UnexpectedContentType { url, content_type };
    }

    match store.write(date, &resp.body) {
        Ok(path) => {
            tracing::info!(path = %path.display(), bytes = resp.body.len(), "saved day file");
            DayOutcome::Saved(path)
        }
        Err(e) => {
            tracing::warn!(%url, error = %e, "failed to write day file");
            DayOutcome::Failed {
                url,
                reason: e.to_string(),
            }
        }
    }
}

/// Download every calendar day in `[start, end]` inclusive.
///
/// In `MissingOnly` mode, days whose local file exists are not fetched at all.
pub fn download_range(
    source: &dyn DayFileSource,
    store: &DayStore,
    start: NaiveDate,
    end: NaiveDate,
    mode: DownloadMode,
    progress: &dyn DownloadProgress,
) -> DownloadSummary {
    let mut summary = DownloadSummary::default();
    tracing::debug!(source = source.name(), %start, %end, ?mode, "starting download");

    for date in start.iter_days().take_while(|d| *d <= end) {
        summary.total_days += 1;

        if mode == DownloadMode::MissingOnly && store.contains(date) {
            progress.on_skip_existing(date, &store.day_path(date));
            summary.skipped_existing += 1;
            continue;
        }

        let outcome = download_day(source, store, date);
        progress.on_day(date, &outcome);
        summary.record(&outcome);
    }

    progress.on_batch_complete(&summary);
    summary
}

/// Summary of a batch download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub total_days: usize,
    pub saved: usize,
    pub skipped_existing: usize,
    pub not_found: usize,
    /// Non-200 statuses other than 404 and unexpected content types.
    pub rejected: usize,
    pub failed: usize,
}

impl DownloadSummary {
    fn record(&mut self, outcome: &DayOutcome) {
        match outcome {
            DayOutcome::Saved(_) => self.saved += 1,
            DayOutcome::NotFound { .. } => self.not_found += 1,
            DayOutcome::HttpStatus { .. } | DayOutcome::UnexpectedContentType { .. } => {
                self.rejected += 1
            }
            DayOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Days that were attempted.
    pub fn fetched(&self) -> usize {
        self.total_days - self.skipped_existing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{DataError, RemoteResponse};
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Source serving canned responses by date; unknown dates are 404.
    #[derive(Default)]
    struct MockSource {
        responses: HashMap<NaiveDate, Result<RemoteResponse, String>>,
        requests: RefCell<Vec<NaiveDate>>,
    }

    impl MockSource {
        fn csv(mut self, date: NaiveDate, body: &str) -> Self {
            self.responses.insert(
                date,
                Ok(RemoteResponse {
                    status: 200,
                    content_type: Some("text/plain; charset=utf-8".into()),
                    body: body.as_bytes().to_vec(),
                }),
            );
            self
        }

        fn html(mut self, date: NaiveDate) -> Self {
            self.responses.insert(
                date,
                Ok(RemoteResponse {
                    status: 200,
                    content_type: Some("text/html".into()),
                    body: b"<html>rate limited</html>".to_vec(),
                }),
            );
            self
        }

        fn status(mut self, date: NaiveDate, status: u16) -> Self {
            self.responses.insert(
                date,
                Ok(RemoteResponse {
                    status,
                    content_type: Some("text/plain".into()),
                    body: Vec::new(),
                }),
            );
            self
        }

        fn network_error(mut self, date: NaiveDate) -> Self {
            self.responses
                .insert(date, Err("connection reset by peer".into()));
            self
        }
    }

    impl DayFileSource for MockSource {
        fn name(&self) -> &str {
            "mock"
        }

        fn day_url(&self, date: NaiveDate) -> String {
            format!("mock://{}", date.format("%Y/%m/%d.csv"))
        }

        fn fetch(&self, date: NaiveDate) -> Result<RemoteResponse, DataError> {
            self.requests.borrow_mut().push(date);
            match self.responses.get(&date) {
                Some(Ok(resp)) => Ok(resp.clone()),
                Some(Err(msg)) => Err(DataError::NetworkUnreachable(msg.clone())),
                None => Ok(RemoteResponse {
                    status: 404,
                    content_type: Some("text/plain".into()),
                    body: b"404: Not Found".to_vec(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        days: RefCell<Vec<(NaiveDate, DayOutcome)>>,
        skipped: RefCell<Vec<NaiveDate>>,
        completed: RefCell<Option<DownloadSummary>>,
    }

    impl DownloadProgress for RecordingProgress {
        fn on_skip_existing(&self, date: NaiveDate, _path: &std::path::Path) {
            self.skipped.borrow_mut().push(date);
        }

        fn on_day(&self, date: NaiveDate, outcome: &DayOutcome) {
            self.days.borrow_mut().push((date, outcome.clone()));
        }

        fn on_batch_complete(&self, summary: &DownloadSummary) {
            *self.completed.borrow_mut() = Some(summary.clone());
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn not_found_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = DayStore::new(dir.path());
        let day = date(2023, 9, 28);

        let outcome = download_day(&MockSource::default(), &store, day);

        assert_eq!(
            outcome,
            DayOutcome::NotFound {
                url: "mock://2023/09/28.csv".into()
            }
        );
        assert!(!store.day_path(day).exists());
        assert!(!dir.path().join("2023").exists());
    }

    #[test]
    fn csv_response_is_saved_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = DayStore::new(dir.path());
        let day = date(2023, 9, 28);
        let body = "Commodity,Unit,Minimum,Maximum,Average\nTomato Big(Nepali),Kg,60,70,65\n";
        let source = MockSource::default().csv(day, body);

        let outcome = download_day(&source, &store, day);

        assert_eq!(outcome, DayOutcome::Saved(store.day_path(day)));
        assert_eq!(std::fs::read_to_string(store.day_path(day)).unwrap(), body);
    }

    #[test]
    fn html_page_with_200_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = DayStore::new(dir.path());
        let day = date(2023, 10, 1);

        let outcome = download_day(&MockSource::default().html(day), &store, day);

        match outcome {
            DayOutcome::UnexpectedContentType { content_type, .. } => {
                assert_eq!(content_type, "text/html")
            }
            other => panic!("expected UnexpectedContentType, got {other:?}"),
        }
        assert!(!store.contains(day));
    }

    #[test]
    fn server_error_is_reported_as_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = DayStore::new(dir.path());
        let day = date(2023, 10, 1);

        let outcome = download_day(&MockSource::default().status(day, 503), &store, day);

        assert!(matches!(outcome, DayOutcome::HttpStatus { status: 503, .. }));
        assert!(!store.contains(day));
    }

    #[test]
    fn network_error_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = DayStore::new(dir.path());
        let source = MockSource::default()
            .network_error(date(2023, 10, 1))
            .csv(date(2023, 10, 2), "a\n1\n");
        let progress = RecordingProgress::default();

        let summary = download_range(
            &source,
            &store,
            date(2023, 10, 1),
            date(2023, 10, 3),
            DownloadMode::Overwrite,
            &progress,
        );

        assert_eq!(summary.total_days, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.saved, 1);
        assert_eq!(summary.not_found, 1);
        assert!(store.contains(date(2023, 10, 2)));
        assert_eq!(progress.days.borrow().len(), 3);
        assert_eq!(progress.completed.borrow().as_ref(), Some(&summary));
    }

    #[test]
    fn missing_only_skips_existing_without_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let store = DayStore::new(dir.path());
        store.write(date(2023, 10, 1), b"old\n").unwrap();
        let source = MockSource::default()
            .csv(date(2023, 10, 1), "new\n")
            .csv(date(2023, 10, 2), "new\n");
        let progress = RecordingProgress::default();

        let summary = download_range(
            &source,
            &store,
            date(2023, 10, 1),
            date(2023, 10, 2),
            DownloadMode::MissingOnly,
            &progress,
        );

        assert_eq!(summary.skipped_existing, 1);
        assert_eq!(summary.saved, 1);
        assert_eq!(summary.fetched(), 1);
        assert_eq!(*source.requests.borrow(), vec![date(2023, 10, 2)]);
        assert_eq!(*progress.skipped.borrow(), vec![date(2023, 10, 1)]);
        assert_eq!(
            std::fs::read_to_string(store.day_path(date(2023, 10, 1))).unwrap(),
            "old\n"
        );
    }

    #[test]
    fn overwrite_refetches_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = DayStore::new(dir.path());
        store.write(date(2023, 10, 1), b"old\n").unwrap();
        let source = MockSource::default().csv(date(2023, 10, 1), "new\n");

        let summary = download_range(
            &source,
            &store,
            date(2023, 10, 1),
            date(2023, 10, 1),
            DownloadMode::Overwrite,
            &RecordingProgress::default(),
        );

        assert_eq!(summary.saved, 1);
        assert_eq!(summary.skipped_existing, 0);
        assert_eq!(
            std::fs::read_to_string(store.day_path(date(2023, 10, 1))).unwrap(),
            "new\n"
        );
    }

    #[test]
    fn inverted_range_fetches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = DayStore::new(dir.path());
        let source = MockSource::default();

        let summary = download_range(
            &source,
            &store,
            date(2023, 10, 2),
            date(2023, 10, 1),
            DownloadMode::Overwrite,
            &RecordingProgress::default(),
        );

        assert_eq!(summary, DownloadSummary::default());
        assert!(source.requests.borrow().is_empty());
    }
}
