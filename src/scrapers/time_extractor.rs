//! Listing time extraction
//!
//! Best-effort recovery of a future point in time from announcement text.
//! Strategies run in a fixed order and the first value strictly after `now`
//! wins:
//! 1. explicit date/time phrasings, optionally tagged `UTC`/`GMT` (with an
//!    optional `+N` offset),
//! 2. date-only phrasings (midnight UTC),
//! 3. relative phrasings (`in N hours`, `in N days`, `after N hours`,
//!    `tomorrow at HH:MM`).
//!
//! What to do when nothing matches is left to the caller.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::{Captures, Regex};

const TZ_SUFFIX: &str = r"(?:\s*\(?\s*(?:UTC|GMT)(?P<off>[+-]\d{1,2})?\s*\)?)?";

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

lazy_static! {
    // Most specific first
    static ref EXPLICIT_PATTERNS: Vec<Regex> = vec![
        // 2025-01-15 14:00 UTC
        Regex::new(&format!(r"(?i)(\d{{4}}-\d{{2}}-\d{{2}})\s+(\d{{1,2}}:\d{{2}})(?::\d{{2}})?{TZ_SUFFIX}")).unwrap(),
        // January 15, 2025 at 14:00 UTC
        Regex::new(&format!(r"(?i)([a-z]+\s+\d{{1,2}},\s+\d{{4}})\s+at\s+(\d{{1,2}}:\d{{2}}){TZ_SUFFIX}")).unwrap(),
        // 15 Jan 2025, 14:00 UTC
        Regex::new(&format!(r"(?i)(\d{{1,2}}\s+[a-z]+\s+\d{{4}}),\s+(\d{{1,2}}:\d{{2}}){TZ_SUFFIX}")).unwrap(),
        // 14:00 UTC on January 15
        Regex::new(r"(?i)(\d{1,2}:\d{2})\s*\(?\s*(?:UTC|GMT)(?P<off>[+-]\d{1,2})?\s*\)?\s+on\s+([a-z]+\s+\d{1,2})").unwrap(),
        // Trading will start at 14:00 UTC
        Regex::new(&format!(r"(?i)\b(?:start|begin|commence)s?\s+at\s+(\d{{1,2}}:\d{{2}}){TZ_SUFFIX}")).unwrap(),
    ];

    static ref DATE_ONLY_PATTERNS: Vec<Regex> = vec![
        // December 15, 2025
        Regex::new(r"(?i)([a-z]+\s+\d{1,2},\s+\d{4})").unwrap(),
        // 12/15/2025
        Regex::new(r"(\d{1,2}/\d{1,2}/\d{4})").unwrap(),
        // 2025-12-15
        Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap(),
    ];

    static ref IN_HOURS: Regex = Regex::new(r"(?i)\bin\s+(\d+)\s+hours?\b").unwrap();
    static ref IN_DAYS: Regex = Regex::new(r"(?i)\bin\s+(\d+)\s+days?\b").unwrap();
    static ref AFTER_HOURS: Regex = Regex::new(r"(?i)\bafter\s+(\d+)\s+hours?\b").unwrap();
    static ref TOMORROW_AT: Regex = Regex::new(r"(?i)\btomorrow\s+at\s+(\d{1,2}):(\d{2})").unwrap();

    static ref ISO_DATE: Regex = Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap();
    static ref US_DATE: Regex = Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap();
    static ref CLOCK: Regex = Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").unwrap();
    static ref DAY: Regex = Regex::new(r"(?i)^(\d{1,2})(?:st|nd|rd|th)?$").unwrap();
    static ref YEAR: Regex = Regex::new(r"^(\d{4})$").unwrap();
}

/// Outcome of scanning a text for a listing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extracted {
    /// First matched time strictly after `now`.
    Future(DateTime<Utc>),
    /// Something matched, but every reading lies at or before `now`.
    PastOnly,
    NoMatch,
}

impl Extracted {
    pub fn future(self) -> Option<DateTime<Utc>> {
        match self {
            Extracted::Future(t) => Some(t),
            _ => None,
        }
    }
}

/// Extract the listing time from free text, relative to `now`.
///
/// Returns `None` when no strategy yields a time strictly after `now`.
pub fn extract_listing_time(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    scan_listing_time(text, now).future()
}

/// Like [`extract_listing_time`], but tells a stale match apart from no match.
pub fn scan_listing_time(text: &str, now: DateTime<Utc>) -> Extracted {
    let absolute = absolute_time(text, now);
    if let Extracted::Future(_) = absolute {
        return absolute;
    }

    match relative_time(text, now) {
        Some(t) if t > now => Extracted::Future(t),
        Some(_) => Extracted::PastOnly,
        None => absolute,
    }
}

fn absolute_time(text: &str, now: DateTime<Utc>) -> Extracted {
    let mut outcome = Extracted::NoMatch;
    for pattern in EXPLICIT_PATTERNS.iter().chain(DATE_ONLY_PATTERNS.iter()) {
        for caps in pattern.captures_iter(text) {
            let Some(parsed) = parse_captures(pattern, &caps, now) else {
                continue;
            };
            if parsed > now {
                return Extracted::Future(parsed);
            }
            outcome = Extracted::PastOnly;
        }
    }

    outcome
}

/// Concatenate the positional groups and parse them as one phrase.
fn parse_captures(pattern: &Regex, caps: &Captures<'_>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let phrase = pattern
        .capture_names()
        .enumerate()
        .skip(1)
        .filter(|(_, name)| name.is_none())
        .filter_map(|(i, _)| caps.get(i).map(|m| m.as_str()))
        .collect::<Vec<_>>()
        .join(" ");

    let offset_hours: i64 = caps
        .name("off")
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);

    let parts = DateParts::parse(&phrase)?;
    parts.resolve(now, offset_hours)
}

fn relative_time(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let amount = |re: &Regex| -> Option<i64> { re.captures(text)?.get(1)?.as_str().parse().ok() };

    if let Some(hours) = amount(&IN_HOURS) {
        return now.checked_add_signed(Duration::try_hours(hours)?);
    }
    if let Some(days) = amount(&IN_DAYS) {
        return now.checked_add_signed(Duration::try_days(days)?);
    }
    if let Some(hours) = amount(&AFTER_HOURS) {
        return now.checked_add_signed(Duration::try_hours(hours)?);
    }
    if let Some(caps) = TOMORROW_AT.captures(text) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        let tomorrow = now.date_naive().succ_opt()?;
        return Some(tomorrow.and_hms_opt(hour, minute, 0)?.and_utc());
    }

    None
}

/// Loosely parsed date/time fields. Missing fields are filled in by
/// [`DateParts::resolve`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct DateParts {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    time: Option<(u32, u32)>,
    pm: Option<bool>,
}

impl DateParts {
    /// Fuzzy parse: unknown words are ignored, but at least one date or
    /// time component must be found.
    fn parse(phrase: &str) -> Option<Self> {
        let mut parts = DateParts::default();

        for raw in phrase.split(|c: char| c.is_whitespace() || c == ',') {
            let token = raw.trim_matches(|c: char| matches!(c, '(' | ')' | '.' | ';' | ':'));
            if token.is_empty() {
                continue;
            }

            if let Some(caps) = ISO_DATE.captures(token) {
                parts.year = Some(caps[1].parse().ok()?);
                parts.month = Some(caps[2].parse().ok()?);
                parts.day = Some(caps[3].parse().ok()?);
            } else if let Some(caps) = US_DATE.captures(token) {
                parts.month = Some(caps[1].parse().ok()?);
                parts.day = Some(caps[2].parse().ok()?);
                parts.year = Some(caps[3].parse().ok()?);
            } else if let Some(caps) = CLOCK.captures(token) {
                parts.time = Some((caps[1].parse().ok()?, caps[2].parse().ok()?));
            } else if let Some(caps) = YEAR.captures(token) {
                parts.year = Some(caps[1].parse().ok()?);
            } else if let Some(caps) = DAY.captures(token) {
                if parts.day.is_none() {
                    parts.day = Some(caps[1].parse().ok()?);
                }
            } else {
                let word = token.to_lowercase();
                match word.as_str() {
                    "am" => parts.pm = Some(false),
                    "pm" => parts.pm = Some(true),
                    _ => {
                        if parts.month.is_none() {
                            parts.month = month_from_name(&word);
                        }
                    }
                }
            }
        }

        let has_date = parts.month.is_some() || parts.day.is_some() || parts.year.is_some();
        if !has_date && parts.time.is_none() {
            return None;
        }
        Some(parts)
    }

    /// Fill in missing fields relative to `now`.
    ///
    /// A time without a date lands on today. A date without a year takes the
    /// current year, or next year if that is already in the past.
    fn resolve(&self, now: DateTime<Utc>, offset_hours: i64) -> Option<DateTime<Utc>> {
        let (mut hour, minute) = self.time.unwrap_or((0, 0));
        match self.pm {
            Some(true) if hour < 12 => hour += 12,
            Some(false) if hour == 12 => hour = 0,
            _ => {}
        }

        let offset = Duration::try_hours(offset_hours)?;
        let build = |year: i32, month: u32, day: u32| -> Option<DateTime<Utc>> {
            let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
            naive.and_utc().checked_sub_signed(offset)
        };

        match (self.year, self.month, self.day) {
            (None, None, None) => {
                let today = now.date_naive();
                build(today.year(), today.month(), today.day())
            }
            (Some(year), Some(month), Some(day)) => build(year, month, day),
            (None, Some(month), Some(day)) => {
                let this_year = build(now.year(), month, day);
                match this_year {
                    Some(t) if t >= now => Some(t),
                    _ => build(now.year() + 1, month, day),
                }
            }
            _ => None,
        }
    }
}

fn month_from_name(word: &str) -> Option<u32> {
    if word.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(word))
        .map(|i| i as u32 + 1)
}
