//! Normalization of free-form date strings to ISO `YYYY-MM-DD`.
//!
//! Each input is parsed at most twice:
//! 1. month-first (`MM/DD/YYYY`; a leading 4-digit field is always the year,
//!    so ISO `YYYY-MM-DD` parses here),
//! 2. day-first (`DD/MM/YYYY`) if the first pass failed.
//!
//! The first pass that yields a real calendar date wins, even when the other
//! pass would produce a different valid date (`01-08-2023` is January 8th).
//! Anything else, including missing values and null sentinels such as `NaT`,
//! normalizes to `None`.
//!
//! Accepted shapes:
//! - numeric fields separated by `-`, `/`, `.`, `,` or whitespace
//! - compact `YYYYMMDD`
//! - English month names or abbreviations (`15 Jun 2023`, `June 15, 2023`),
//!   optionally preceded by a weekday name, with ordinal days (`1st June 2023`)
//! - partial dates, where the missing day and month default to 1
//!   (`2023-07`, `June 2023`, `2023`)
//! - a trailing time of day (`2023-07-01 10:30:00`, `2023-07-01T10:30Z`),
//!   validated and then ignored
//!
//! Two-digit years land in the century window centred on the current year:
//! the result is within 50 years of today (in 2026, `75` is 2075 and `76` is
//! 1976).

use chrono::{Datelike, Local, NaiveDate};

/// Which field an ambiguous all-numeric date starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    /// `MM/DD/YYYY`; tried first.
    MonthFirst,
    /// `DD/MM/YYYY`; the fallback.
    DayFirst,
}

/// Text that stands for "no date" rather than a malformed one.
const NULL_SENTINELS: [&str; 6] = ["", "nat", "nan", "none", "null", "na"];

/// Normalize one value: month-first, then day-first, else `None`.
pub fn normalize_date(input: Option<&str>) -> Option<String> {
    let text = input?;
    parse_date(text, DateOrder::MonthFirst)
        .or_else(|| parse_date(text, DateOrder::DayFirst))
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Normalize a sequence of values, one output per input, order preserved.
///
/// `None` in the output is the invalid marker.
pub fn parse_and_format_dates<I, S>(dates: I) -> Vec<Option<String>>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    dates
        .into_iter()
        .map(|d| normalize_date(d.as_ref().map(|s| s.as_ref())))
        .collect()
}

/// Parse a single string under one field order.
pub fn parse_date(input: &str, order: DateOrder) -> Option<NaiveDate> {
    parse_date_near(input, order, Local::now().year())
}

/// `parse_date` with the two-digit-year window centred on `reference_year`.
fn parse_date_near(input: &str, order: DateOrder, reference_year: i32) -> Option<NaiveDate> {
    let text = input.trim();
    if NULL_SENTINELS.contains(&text.to_ascii_lowercase().as_str()) {
        return None;
    }

    let date_part = strip_time(text)?;
    let tokens = tokenize(date_part)?;

    let years = YearWindow(reference_year);
    match tokens.as_slice() {
        [Token::Number(n)] if n.len() == 8 => compact_ymd(n),
        [Token::Number(n)] if n.len() == 4 => NaiveDate::from_ymd_opt(years.expand(n)?, 1, 1),
        [a, b] => resolve_partial(a, b, years),
        [a, b, c] => resolve(a, b, c, order, years),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Number(&'a str),
    Month(u32),
}

/// Split off a trailing time of day, returning the date portion.
///
/// Returns `None` when a time is present but malformed.
fn strip_time(text: &str) -> Option<&str> {
    // ISO `T` separator: digit on both sides
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'T'
            && i > 0
            && bytes[i - 1].is_ascii_digit()
            && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)
        {
            return is_time(&text[i + 1..]).then_some(&text[..i]);
        }
    }

    // whitespace-separated: the first token with a colon starts the time
    match text.split_whitespace().position(|tok| tok.contains(':')) {
        None => Some(text),
        Some(0) => None,
        Some(_) => {
            let colon = text.find(':')?;
            let start = text[..colon]
                .rfind(char::is_whitespace)
                .map(|i| i + 1)
                .unwrap_or(0);
            is_time(&text[start..]).then_some(text[..start].trim_end())
        }
    }
}

/// `HH:MM[:SS[.fff]]`, optional AM/PM, optional `Z` or `±HH[:MM]` offset.
fn is_time(text: &str) -> bool {
    let mut t = text.trim();
    let mut twelve_hour = false;
    let upper = t.to_ascii_uppercase();
    if upper.ends_with("AM") || upper.ends_with("PM") {
        twelve_hour = true;
        t = t[..t.len() - 2].trim_end();
    }

    if let Some(rest) = t.strip_suffix('Z') {
        t = rest;
    } else if let Some(idx) = t.rfind(['+', '-']) {
        if idx == 0 || !is_offset(&t[idx + 1..]) {
            return false;
        }
        t = t[..idx].trim_end();
    }

    let (clock, fraction) = match t.split_once('.') {
        Some((clock, frac)) => (clock, Some(frac)),
        None => (t, None),
    };
    if let Some(frac) = fraction {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }

    let parts: Vec<&str> = clock.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return false;
    }
    let mut values = Vec::with_capacity(3);
    for part in &parts {
        if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        values.push(part.parse::<u32>().unwrap_or(u32::MAX));
    }

    let hour_ok = if twelve_hour {
        (1..=12).contains(&values[0])
    } else {
        values[0] < 24
    };
    hour_ok && values[1] < 60 && values.get(2).map_or(true, |s| *s < 60)
}

fn is_offset(text: &str) -> bool {
    let digits: String = text.chars().filter(|c| *c != ':').collect();
    matches!(digits.len(), 2 | 4) && digits.bytes().all(|b| b.is_ascii_digit())
}

fn tokenize(date_part: &str) -> Option<Vec<Token<'_>>> {
    let mut tokens = Vec::with_capacity(3);
    for raw in date_part.split(|c: char| matches!(c, '-' | '/' | '.' | ',') || c.is_whitespace()) {
        if raw.is_empty() {
            continue;
        }
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            tokens.push(Token::Number(raw));
        } else if let Some(day) = strip_ordinal(raw) {
            tokens.push(Token::Number(day));
        } else if let Some(month) = month_from_name(raw) {
            tokens.push(Token::Month(month));
        } else if is_weekday_name(raw) && tokens.is_empty() {
            continue;
        } else {
            return None;
        }
    }
    Some(tokens)
}

/// `1st`, `22nd`, `3rd`, `15th` -> the digits.
fn strip_ordinal(raw: &str) -> Option<&str> {
    let split = raw.len().checked_sub(2)?;
    let (digits, suffix) = (raw.get(..split)?, raw.get(split..)?);
    let is_suffix = matches!(suffix.to_ascii_lowercase().as_str(), "st" | "nd" | "rd" | "th");
    (is_suffix && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .then_some(digits)
}

fn month_from_name(name: &str) -> Option<u32> {
    let month = match name.to_ascii_lowercase().as_str() {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

fn is_weekday_name(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "mon" | "monday"
            | "tue" | "tues" | "tuesday"
            | "wed" | "wednesday"
            | "thu" | "thur" | "thurs" | "thursday"
            | "fri" | "friday"
            | "sat" | "saturday"
            | "sun" | "sunday"
    )
}

fn compact_ymd(digits: &str) -> Option<NaiveDate> {
    let year = digits[..4].parse().ok()?;
    let month = digits[4..6].parse().ok()?;
    let day = digits[6..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// A field that can only be a year: four digits, or a value above 31.
fn is_year_like(n: &str) -> bool {
    n.len() == 4 || n.parse::<u32>().map_or(false, |v| v > 31)
}

/// Century placement for two-digit years.
#[derive(Debug, Clone, Copy)]
struct YearWindow(i32);

impl YearWindow {
    fn expand(self, n: &str) -> Option<i32> {
        let value: i32 = n.parse().ok()?;
        match n.len() {
            4 => Some(value),
            1 | 2 => {
                let reference = self.0;
                let year = value + reference - reference.rem_euclid(100);
                Some(if year >= reference + 50 {
                    year - 100
                } else if year < reference - 50 {
                    year + 100
                } else {
                    year
                })
            }
            _ => None,
        }
    }
}

fn day_or_month(n: &str) -> Option<u32> {
    if n.len() > 2 {
        return None;
    }
    n.parse().ok()
}

fn ymd(years: YearWindow, y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(years.expand(y)?, day_or_month(m)?, day_or_month(d)?)
}

/// Year and month without a day: `2023-07`, `07/2023`, `June 2023`.
fn resolve_partial(a: &Token<'_>, b: &Token<'_>, years: YearWindow) -> Option<NaiveDate> {
    use Token::{Month, Number};

    let (year_field, month) = match (a, b) {
        (Number(y), Number(m)) if y.len() == 4 && m.len() <= 2 => (*y, day_or_month(m)?),
        (Number(m), Number(y)) if y.len() == 4 && m.len() <= 2 => (*y, day_or_month(m)?),
        (Month(m), Number(y)) | (Number(y), Month(m)) if is_year_like(y) => (*y, *m),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(years.expand(year_field)?, month, 1)
}

fn resolve(
    a: &Token<'_>,
    b: &Token<'_>,
    c: &Token<'_>,
    order: DateOrder,
    years: YearWindow,
) -> Option<NaiveDate> {
    use Token::{Month, Number};

    match (a, b, c) {
        (Number(a), Number(b), Number(c)) => {
            if is_year_like(a) {
                return ymd(years, a, b, c);
            }
            if !matches!(c.len(), 2 | 4) {
                return None;
            }
            match order {
                DateOrder::MonthFirst => ymd(years, c, a, b),
                DateOrder::DayFirst => ymd(years, c, b, a),
            }
        }
        // a named month leaves only year and day to place
        (Month(m), Number(x), Number(y)) | (Number(x), Month(m), Number(y)) => {
            let (year_field, day_field) = if is_year_like(x) && !is_year_like(y) {
                (*x, *y)
            } else {
                (*y, *x)
            };
            NaiveDate::from_ymd_opt(years.expand(year_field)?, *m, day_or_month(day_field)?)
        }
        (Number(x), Number(y), Month(m)) => {
            NaiveDate::from_ymd_opt(years.expand(x)?, *m, day_or_month(y)?)
        }
        _ => None,
    }
}
