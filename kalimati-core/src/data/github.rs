//! Raw GitHub day file source.
//!
//! Fetches `{base}/{YYYY}/{MM}/{DD}.csv` from the published Kalimati price
//! repository. One blocking GET per day, no retry; status and content type are
//! handed back untouched so the acquisition layer decides what to keep.

use super::provider::{DataError, DayFileSource, RemoteResponse};
use chrono::NaiveDate;

/// Day file source backed by raw.githubusercontent.com (or any static host
/// with the same layout).
pub struct GithubRawSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl GithubRawSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("kalimati/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Build the remote URL for a date: `{base}/{YYYY}/{MM}/{DD}.csv`.
pub fn day_file_url(base_url: &str, date: NaiveDate) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        date.format("%Y/%m/%d.csv")
    )
}

impl DayFileSource for GithubRawSource {
    fn name(&self) -> &str {
        "github_raw"
    }

    fn day_url(&self, date: NaiveDate) -> String {
        day_file_url(&self.base_url, date)
    }

    fn fetch(&self, date: NaiveDate) -> Result<RemoteResponse, DataError> {
        let url = self.day_url(date);
        tracing::debug!(%url, "requesting day file");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        tracing::debug!(%url, status, content_type = content_type.as_deref().unwrap_or(""), "response");

        let body = resp
            .bytes()
            .map_err(|e| DataError::NetworkUnreachable(format!("reading body of {url}: {e}")))?
            .to_vec();

        Ok(RemoteResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_url_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2023, 9, 8).unwrap();
        assert_eq!(
            day_file_url("https://example.com/data/csv", date),
            "https://example.com/data/csv/2023/09/08.csv"
        );
    }

    #[test]
    fn trailing_slash_in_base_is_ignored() {
        let source = GithubRawSource::new("https://example.com/csv/").unwrap();
        assert_eq!(source.base_url(), "https://example.com/csv");
        assert_eq!(
            source.day_url(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
            "https://example.com/csv/2024/12/31.csv"
        );
        assert_eq!(source.name(), "github_raw");
    }
}
