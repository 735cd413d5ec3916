//! The registration rule set: enumerations, limits and format checks.
//!
//! Both the form validator and the gateway validate against these functions,
//! so a rule changed here changes on both tiers at once.

use chrono::{Local, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// Every rank a member may register with, lowest first.
pub const RANKS: &[&str] = &[
    "10th Kyu",
    "9th Kyu",
    "8th Kyu",
    "7th Kyu",
    "6th Kyu",
    "5th Kyu",
    "4th Kyu",
    "3rd Kyu",
    "2nd Kyu",
    "1st Kyu",
    "Shodan (1st Dan)",
    "Nidan (2nd Dan)",
    "Sandan (3rd Dan)",
    "Yondan (4th Dan)",
    "Godan (5th Dan)",
];

/// Dojos offered as suggestions on the form. Members may also type their own.
pub const DOJOS: &[&str] = &[
    "Tenkei University Indonesia",
    "Tenkei Mayapada",
    "Tenkei Taman Menteng",
    "Tenkei Natsu Aikidojo",
];

pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
static DATE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Length in characters, as the limits are expressed.
pub fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Check a `local@domain.tld` shaped address.
pub fn is_valid_email(email: &str) -> bool {
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
    });
    regex.is_match(email)
}

/// Check an international phone number.
///
/// Spaces, hyphens, parentheses and dots are ignored; what remains must be
/// 7 to 15 digits with an optional leading `+`.
pub fn is_valid_phone(phone: &str) -> bool {
    let regex =
        PHONE_REGEX.get_or_init(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("phone regex is valid"));

    let cleaned: String = phone
        .chars()
        .filter(|c| !(c.is_whitespace() || matches!(c, '-' | '(' | ')' | '.')))
        .collect();
    regex.is_match(&cleaned)
}

/// Parse a strict `YYYY-MM-DD` calendar date.
///
/// Returns `None` for any other shape and for dates that do not exist
/// (`2023-02-30`, `2024-04-31`).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let regex = DATE_REGEX
        .get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date regex is valid"));
    if !regex.is_match(value) {
        return None;
    }

    let year: i32 = value[0..4].parse().ok()?;
    let month: u32 = value[5..7].parse().ok()?;
    let day: u32 = value[8..10].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Check an optional date field against `today`.
///
/// The empty string is valid because both date fields are optional.
pub fn is_valid_date(value: &str, today: NaiveDate) -> bool {
    if value.is_empty() {
        return true;
    }
    parse_date(value).is_some_and(|date| date <= today)
}

/// Today's date in the server's local time zone, used as the upper bound for
/// date fields.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Check an optional rank. Empty means "not given".
pub fn is_valid_rank(rank: &str) -> bool {
    rank.is_empty() || RANKS.contains(&rank)
}

/// Known dojos whose name contains `query`, ignoring case.
pub fn matching_dojos(query: &str) -> Vec<&'static str> {
    let query = query.to_lowercase();
    DOJOS
        .iter()
        .copied()
        .filter(|dojo| dojo.to_lowercase().contains(&query))
        .collect()
}
