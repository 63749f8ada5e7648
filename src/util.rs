// Utility helpers for parsing, month ordering and basic statistics.
//
// This module centralizes all the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Fixed month-name table in calendar order. Month labels are an ordinal
/// category keyed by this table, never sorted as strings.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// Map a 1-based calendar month to its label, `None` outside 1..=12.
pub fn month_label(month: u32) -> Option<&'static str> {
    if (1..=12).contains(&month) {
        Some(MONTH_LABELS[(month - 1) as usize])
    } else {
        None
    }
}

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok()
}

/// Parse a measurement date. The consolidated export writes `YYYY-MM-DD`;
/// older sheets used `DD/MM/YYYY`, so both are accepted.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

/// Sum the values that are present. Returns `None` when nothing contributed,
/// so an empty group stays distinguishable from a true zero sum.
pub fn sum_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum = 0.0;
    let mut seen = false;
    for v in values.into_iter().flatten() {
        sum += v;
        seen = true;
    }
    seen.then_some(sum)
}

/// Arithmetic mean; `None` for an empty slice rather than NaN.
pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Percent delta `((actual - reference) / reference) * 100`, guarded:
/// `None` whenever either side is missing or the reference is zero.
pub fn percent_delta(actual: Option<f64>, reference: Option<f64>) -> Option<f64> {
    let actual = actual?;
    let reference = reference?;
    if reference == 0.0 {
        return None;
    }
    Some(((actual - reference) / reference) * 100.0)
}

/// Format a floating-point value with:
/// - a fixed number of decimal places, and
/// - locale-aware thousands separators (e.g., `1,234,567.89`).
pub fn format_number(n: f64, decimals: usize) -> String {
    let neg = n.is_sign_negative();
    let abs_n = n.abs();
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert commas into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Render an optional metric: formatted number when present, a placeholder
/// when the group had no data.
pub fn format_opt(n: Option<f64>, decimals: usize) -> String {
    match n {
        Some(v) => format_number(v, decimals),
        None => "-".to_string(),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages (e.g., `1,234 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
