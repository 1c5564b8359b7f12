//! Date-text heuristics.
//!
//! Portal markup carries dates in every shape imaginable: ISO attributes,
//! `15/01/2025 10:30`, `15 de janeiro de 2025 às 10h30`, English feed dates.
//! Parsing is an ordered cascade of independent rules; the first rule that
//! matches *and* lands inside the recency window wins:
//!
//! 1. normalize the text (lowercase, Portuguese months to numbers, `de` to `/`,
//!    `10h30` to `10:30`, noise stripped)
//! 2. try each rule in [`DATE_RULES`] order
//! 3. try a generic parse of the original text (RFC 3339, RFC 2822, English forms)
//! 4. give up; callers synthesize a recent timestamp with [`synthesize_recent`]
//!
//! Naive times are read as local time. A missing time of day means 12:00,
//! clamped to "now" for today's date.

use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc,
};
use once_cell::sync::Lazy;
use rand::{Rng, rng};
use regex::{Captures, Regex};
use tracing::debug;

/// Dates older than this are treated as unparseable rather than trusted.
pub const MAX_AGE_DAYS: i64 = 30;
/// Synthesized timestamps fall between 1 and this many hours ago.
pub const MAX_SYNTHETIC_HOURS: i64 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldOrder {
    YearFirst,
    DayFirst,
}

struct DateRule {
    name: &'static str,
    pattern: Regex,
    order: FieldOrder,
}

impl DateRule {
    fn new(name: &'static str, pattern: &str, order: FieldOrder) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            order,
        }
    }

    /// Turn a match into an instant. Groups 1-3 are the date, 4-6 the optional
    /// time and 7 an optional UTC offset.
    fn build(&self, caps: &Captures<'_>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

        let (year, month, day) = match self.order {
            FieldOrder::YearFirst => (num(1)?, num(2)?, num(3)?),
            FieldOrder::DayFirst => (num(3)?, num(2)?, num(1)?),
        };
        let has_time = caps.get(4).is_some();
        let hour = num(4).unwrap_or(12);
        let minute = num(5).unwrap_or(0);
        let second = num(6).unwrap_or(0);

        let date = NaiveDate::from_ymd_opt(year as i32, month, day)?;
        let naive = date.and_hms_opt(hour, minute, second)?;

        let instant = match caps.get(7) {
            Some(offset) => parse_offset(offset.as_str())?
                .from_local_datetime(&naive)
                .single()?
                .with_timezone(&Utc),
            None => Local
                .from_local_datetime(&naive)
                .earliest()?
                .with_timezone(&Utc),
        };

        if !has_time && date == now.with_timezone(&Local).date_naive() && instant > now {
            return Some(now);
        }
        Some(instant)
    }
}

static DATE_RULES: Lazy<Vec<DateRule>> = Lazy::new(|| {
    use FieldOrder::*;
    vec![
        DateRule::new(
            "iso_datetime",
            r"(\d{4})-(\d{2})-(\d{2})[t\s](\d{2}):(\d{2})(?::(\d{2}))?(?:\.\d+)?(z|[+-]\d{2}:?\d{2})?",
            YearFirst,
        ),
        DateRule::new("iso_date", r"(\d{4})-(\d{2})-(\d{2})", YearFirst),
        DateRule::new(
            "dmy_slash_hms",
            r"(\d{1,2})/(\d{1,2})/(\d{4})[\s,\-]+(\d{1,2}):(\d{2}):(\d{2})",
            DayFirst,
        ),
        DateRule::new(
            "dmy_slash_hm",
            r"(\d{1,2})/(\d{1,2})/(\d{4})[\s,\-]+(\d{1,2}):(\d{2})",
            DayFirst,
        ),
        DateRule::new("dmy_slash", r"(\d{1,2})/(\d{1,2})/(\d{4})", DayFirst),
        DateRule::new(
            "dmy_dash_hm",
            r"(\d{1,2})-(\d{1,2})-(\d{4})[\s,]+(\d{1,2}):(\d{2})",
            DayFirst,
        ),
        DateRule::new("dmy_dash", r"(\d{1,2})-(\d{1,2})-(\d{4})", DayFirst),
        DateRule::new("ymd_slash", r"(\d{4})/(\d{2})/(\d{2})", YearFirst),
        DateRule::new(
            "dmy_space_hm",
            r"(\d{1,2})\s+(\d{2})\s+(\d{4})[\s,]+(\d{1,2}):(\d{2})",
            DayFirst,
        ),
        DateRule::new("dmy_space", r"(\d{1,2})\s+(\d{2})\s+(\d{4})", DayFirst),
    ]
});

static MONTH_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(janeiro|fevereiro|março|marco|abril|maio|junho|julho|agosto|setembro|outubro|novembro|dezembro|jan|fev|mar|abr|mai|jun|jul|ago|set|out|nov|dez)\b\.?",
    )
    .unwrap()
});
static DE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+de\s+").unwrap());
static HOUR_MARK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})h(\d{2})").unwrap());
static NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9/:,\-\s.+tz]").unwrap());

fn month_number(name: &str) -> &'static str {
    match name.get(..3).unwrap_or(name) {
        "jan" => "01",
        "fev" => "02",
        "mar" => "03",
        "abr" => "04",
        "mai" => "05",
        "jun" => "06",
        "jul" => "07",
        "ago" => "08",
        "set" => "09",
        "out" => "10",
        "nov" => "11",
        _ => "12",
    }
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    if raw == "z" {
        return FixedOffset::east_opt(0);
    }
    let sign = if raw.starts_with('-') { -1 } else { 1 };
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let hours: i32 = digits.get(..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..4)?.parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Normalize free date text so the rule patterns can match it.
fn prepare(text: &str) -> String {
    let lower = text.to_lowercase();
    let numeric_months = MONTH_NAME.replace_all(&lower, |caps: &Captures<'_>| {
        month_number(&caps[1]).to_string()
    });
    let slashed = DE_SEPARATOR.replace_all(&numeric_months, "/");
    let timed = HOUR_MARK.replace_all(&slashed, "$1:$2");
    let stripped = NOISE.replace_all(&timed, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when `date` is not in the future and at most [`MAX_AGE_DAYS`] old.
pub fn within_window(date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    date <= now && date >= now - Duration::days(MAX_AGE_DAYS)
}

/// Parse free-form date text under the recency window.
///
/// Returns `None` when no rule or generic format yields a date that is both
/// valid and recent; see the module docs for the order of attempts.
pub fn parse_date_text(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let prepared = prepare(text);
    for rule in DATE_RULES.iter() {
        let Some(caps) = rule.pattern.captures(&prepared) else {
            continue;
        };
        match rule.build(&caps, now) {
            Some(date) if within_window(date, now) => {
                debug!(text, rule = rule.name, %date, "Parsed date text");
                return Some(date);
            }
            Some(date) => {
                debug!(text, rule = rule.name, %date, "Date outside the accepted window")
            }
            None => {}
        }
    }

    let fallback = parse_generic(text).filter(|d| within_window(*d, now));
    if fallback.is_none() {
        debug!(text, "Could not parse date text");
    }
    fallback
}

/// Parse a date declared by a syndication feed.
///
/// Feed timestamps are authoritative, so well-formed RFC 2822/3339 values are
/// accepted without the recency window; anything else goes through
/// [`parse_date_text`].
pub fn parse_feed_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc2822(text)
        .or_else(|_| DateTime::parse_from_rfc3339(text))
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_date_text(text, now))
}

/// English and space-separated forms tried after the rules. No slash forms:
/// a day-first date the rules rejected must not come back month-first.
const GENERIC_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%B %d, %Y %H:%M",
    "%b %d, %Y %H:%M",
];
const GENERIC_DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"];

fn parse_generic(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.with_timezone(&Utc));
    }
    let local = |naive: NaiveDateTime| {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|d| d.with_timezone(&Utc))
    };
    GENERIC_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .and_then(local)
        .or_else(|| {
            GENERIC_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .and_then(local)
        })
}

/// A plausible recent timestamp: a random 1-48 hours before `now`.
pub fn synthesize_recent(now: DateTime<Utc>) -> DateTime<Utc> {
    let hours_back = rng().random_range(1..=MAX_SYNTHETIC_HOURS);
    now - Duration::hours(hours_back)
}

/// Pick the first candidate that parses, or synthesize a recent timestamp.
///
/// The second element is `true` when the timestamp was synthesized.
pub fn resolve_published(candidates: &[String], now: DateTime<Utc>) -> (DateTime<Utc>, bool) {
    match candidates.iter().find_map(|c| parse_date_text(c, now)) {
        Some(date) => (date, false),
        None => (synthesize_recent(now), true),
    }
}
