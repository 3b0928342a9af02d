//! Identifier and barcode normalization.
//!
//! Resource identifiers arrive in many spellings (`AC 123`, `AC0123`,
//! `["AC","123"]` joined from the store). [`normalize_identifier`] maps them to
//! one canonical key so the spreadsheet and the store agree on equality.

use regex::Regex;
use std::sync::OnceLock;

fn collection_prefix_re() -> &'static Regex {
    static PREFIX_RE: OnceLock<Regex> = OnceLock::new();
    PREFIX_RE.get_or_init(|| Regex::new(r"^(A|M)C").expect("valid collection prefix regex"))
}

fn digit_run_re() -> &'static Regex {
    static DIGITS_RE: OnceLock<Regex> = OnceLock::new();
    DIGITS_RE.get_or_init(|| Regex::new(r"[0-9]+").expect("valid digit run regex"))
}

/// Leading `AC` / `MC` prefix, if present.
pub fn collection_prefix(raw: &str) -> Option<&str> {
    collection_prefix_re().find(raw).map(|m| m.as_str())
}

/// First run of ASCII digits anywhere in `raw`.
pub fn first_digit_run(raw: &str) -> Option<&str> {
    digit_run_re().find(raw).map(|m| m.as_str())
}

/// Decimal digits with leading zeros removed; an all-zero run stays `0`.
fn strip_leading_zeros(digits: &str) -> &str {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0"
    } else {
        trimmed
    }
}

/// Canonical resource key.
///
/// `{AC|MC}{integer}` when both a prefix and a digit run are present,
/// otherwise `raw` unchanged. Never fails.
pub fn normalize_identifier(raw: &str) -> String {
    match (collection_prefix(raw), first_digit_run(raw)) {
        (Some(prefix), Some(digits)) => format!("{prefix}{}", strip_leading_zeros(digits)),
        _ => raw.to_string(),
    }
}

/// Barcodes keep digits only. `N/A` and friends become empty.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}
