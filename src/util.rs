// Utility helpers for parsing, formatting and the week calendar.
//
// Spreadsheet exports mix numbers, text with separators and blanks; this module
// turns them into plain values so the normalizer never has to fail.
use chrono::{Datelike, Duration, NaiveDate};
use num_format::{Locale, ToFormattedString};

/// Placeholder rendered instead of a ratio that cannot be computed.
pub const NOT_AVAILABLE: &str = "—";

/// Parse a string-like value into a finite `f64`.
///
/// - Trims whitespace and drops space/no-break-space thousands separators.
/// - A lone comma is treated as the decimal separator (`4,5`); otherwise
///   commas are thousands separators (`1,234.5`).
/// - Trailing units are ignored by reading the leading number (`4.5%`,
///   `1000 ₽`).
/// - Returns `None` for blanks, garbage, `NaN` and infinities.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let cleaned = clean_number(s?)?;
    cleaned
        .parse::<f64>()
        .ok()
        .or_else(|| leading_number(&cleaned))
        .filter(|v| v.is_finite())
}

/// Like [`parse_f64_safe`] but the whole cell must be a number.
fn parse_f64_strict(s: &str) -> Option<f64> {
    clean_number(s)?.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn clean_number(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let mut cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if cleaned.contains(',') {
        if !cleaned.contains('.') && cleaned.matches(',').count() == 1 {
            cleaned = cleaned.replace(',', ".");
        } else {
            cleaned = cleaned.replace(',', "");
        }
    }
    Some(cleaned)
}

/// Longest numeric prefix: sign, digits, fraction and an exponent that has
/// digits after it.
fn leading_number(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok()
}

/// Parse an integer, accepting float notation only when it has no fraction
/// (spreadsheets store `3` as `3.0`).
pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<i32>() {
        return Some(v);
    }
    let f = parse_f64_strict(s)?;
    if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

/// Convert an Excel serial day number to a calendar date (1900 date system).
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.trunc() as i64))
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with `,` thousands separators, e.g. `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Whole roubles with Russian digit grouping, e.g. `1 000 ₽`.
pub fn format_rub(n: f64) -> String {
    let rounded = n.round() as i64;
    format!("{} ₽", rounded.to_formatted_string(&Locale::ru))
}

/// One-decimal percentage; `None` renders as [`NOT_AVAILABLE`].
pub fn format_pct(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{:.1}%", x),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_signed_pct(v: f64) -> String {
    if v >= 0.0 {
        format!("+{:.1}%", v)
    } else {
        format!("{:.1}%", v)
    }
}

/// Week number counted in whole 7-day blocks from January 1st, starting at 1.
pub fn current_week(today: NaiveDate) -> i32 {
    let jan1 = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
    ((today - jan1).num_days() / 7) as i32 + 1
}

/// Monday..Sunday span of `week`, counting from the first Monday of `year`.
pub fn week_range(year: i32, week: i32) -> Option<(NaiveDate, NaiveDate)> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let from_sunday = jan1.weekday().num_days_from_sunday() as i64;
    let days_to_first_monday = (8 - from_sunday) % 7;
    let first_monday = jan1 + Duration::days(days_to_first_monday);
    let start = first_monday.checked_add_signed(Duration::weeks(week as i64 - 1))?;
    let end = start.checked_add_signed(Duration::days(6))?;
    Some((start, end))
}

pub fn week_label(year: i32, week: i32) -> String {
    match week_range(year, week) {
        Some((start, end)) => format!(
            "Неделя {} ({} - {})",
            week,
            start.format("%d.%m.%Y"),
            end.format("%d.%m.%Y")
        ),
        None => format!("Неделя {}", week),
    }
}

/// Selectable weeks 1..=52 with their date ranges.
pub fn week_options(year: i32) -> Vec<(i32, String)> {
    (1..=52).map(|w| (w, week_label(year, w))).collect()
}
