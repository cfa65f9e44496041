//! Month and date normalizers.
//!
//! All helpers are lenient: unknown month names map to January, unparseable
//! labels fall back to the current month, and [`parse_date`] returns `None`
//! instead of an error.

use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;

use crate::config::TWO_DIGIT_YEAR_PIVOT;

/// "Mon-YY" anywhere in the text, e.g. "Jun-26".
static MON_YY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z]{3})-(\d{2})").expect("static pattern"));

/// Whole-cell month label such as "August-25" or "Aug 2025".
static MONTH_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+[-\s]?\d{2,4}$").expect("static pattern"));

/// Canonical period key, e.g. "2025-08".
static MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-(?:0[1-9]|1[0-2])$").expect("static pattern"));

/// Map a full English month name to its two-digit code.
fn full_month_code(name: &str) -> Option<&'static str> {
    let code = match name.to_lowercase().as_str() {
        "january" => "01",
        "february" => "02",
        "march" => "03",
        "april" => "04",
        "may" => "05",
        "june" => "06",
        "july" => "07",
        "august" => "08",
        "september" => "09",
        "october" => "10",
        "november" => "11",
        "december" => "12",
        _ => return None,
    };
    Some(code)
}

/// Map a full name, three-letter abbreviation or "sept" to a month code.
fn month_code(name: &str) -> Option<&'static str> {
    if let Some(code) = full_month_code(name) {
        return Some(code);
    }
    let code = match name.to_lowercase().as_str() {
        "jan" => "01",
        "feb" => "02",
        "mar" => "03",
        "apr" => "04",
        "jun" => "06",
        "jul" => "07",
        "aug" => "08",
        "sep" | "sept" => "09",
        "oct" => "10",
        "nov" => "11",
        "dec" => "12",
        _ => return None,
    };
    Some(code)
}

/// Expand a two-digit year around `pivot`: below it is 20xx, otherwise 19xx.
pub fn expand_two_digit_year(yy: u32, pivot: u32) -> u32 {
    if yy < pivot {
        2000 + yy
    } else {
        1900 + yy
    }
}

fn expand_year_token(token: &str, pivot: u32) -> String {
    if token.len() == 2 {
        if let Ok(yy) = token.parse::<u32>() {
            return expand_two_digit_year(yy, pivot).to_string();
        }
    }
    token.to_string()
}

/// True if the text is a bare month label ("August-25", "Aug 2025").
pub fn is_month_label(text: &str) -> bool {
    MONTH_LABEL.is_match(text)
}

/// True if `text` is a canonical "YYYY-MM" period key.
pub fn is_month_year(text: &str) -> bool {
    MONTH_YEAR.is_match(text)
}

/// Combine a full month name and a year into "YYYY-MM".
///
/// Unrecognized month names default to "01".
pub fn month_year_from_parts(month: &str, year: &str) -> String {
    let code = full_month_code(month.trim()).unwrap_or("01");
    format!("{}-{}", year.trim(), code)
}

/// Parse a free-text month label ("Aug-25", "August 2025") into "YYYY-MM".
pub fn parse_month_label(text: &str) -> String {
    parse_month_label_with_pivot(text, TWO_DIGIT_YEAR_PIVOT)
}

/// [`parse_month_label`] with an explicit two-digit-year pivot.
pub fn parse_month_label_with_pivot(text: &str, pivot: u32) -> String {
    let lowered = text.trim().to_lowercase();
    let parts: Vec<&str> = lowered
        .split(|c: char| c == '-' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    if parts.len() >= 2 {
        let code = month_code(parts[0]).unwrap_or("01");
        let year = expand_year_token(parts[parts.len() - 1], pivot);
        return format!("{}-{}", year, code);
    }

    let now = Local::now();
    format!("{}-{:02}", now.year(), now.month())
}

/// Parse a "Mon-YY" expiry label ("Jun-26") into the first day of that month.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    parse_date_with_pivot(text, TWO_DIGIT_YEAR_PIVOT)
}

/// [`parse_date`] with an explicit two-digit-year pivot.
pub fn parse_date_with_pivot(text: &str, pivot: u32) -> Option<NaiveDate> {
    let caps = MON_YY.captures(text)?;
    let month: u32 = month_code(&caps[1])
        .and_then(|code| code.parse().ok())
        .unwrap_or(1);
    let yy: u32 = caps[2].parse().ok()?;
    let year = expand_two_digit_year(yy, pivot);
    NaiveDate::from_ymd_opt(year as i32, month, 1)
}
