//! Date literal detection
//!
//! Values handed to `and_where` and `between` are checked against a
//! [`DateParser`]; anything it recognises is stored as a `Value::Date`.
//! The parser is injectable so classification boundaries can be pinned.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Utc, Weekday};

pub trait DateParser {
    /// Epoch seconds (UTC) for a literal recognised as a date/time.
    fn parse(&self, literal: &str) -> Option<i64>;
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%B %d, %Y", "%d %B %Y"];

/// Accepts the common absolute date/time spellings and relative phrases.
///
/// RFC 3339 and RFC 2822 keep their offsets; naive date-times and bare
/// dates are read as UTC. `@<seconds>` is taken as a raw epoch. A string
/// made only of digits is never a date, so numeric literals stay numeric.
///
/// Relative phrases are resolved against the current time, or against the
/// instant given to [`PermissiveDateParser::anchored_at`]:
///
/// - `now`, `today`, `midnight`, `yesterday`, `tomorrow`
/// - offsets: `+2 days`, `-1 week`, `3 hours ago`, `1 year 2 months`
/// - `next week`, `last month`, `this year`
/// - weekdays: `monday`, `next friday`, `last monday` (at midnight)
#[derive(Debug, Clone, Default)]
pub struct PermissiveDateParser {
    extra_formats: Vec<String>,
    anchor: Option<DateTime<Utc>>,
}

impl PermissiveDateParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Additional `chrono` format strings, tried as date-time then as date.
    pub fn with_formats<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extra_formats: formats.into_iter().map(Into::into).collect(),
            anchor: None,
        }
    }

    /// Resolve relative phrases against `now` instead of the system clock.
    pub fn anchored_at(mut self, now: DateTime<Utc>) -> Self {
        self.anchor = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.anchor.unwrap_or_else(Utc::now)
    }
}

impl DateParser for PermissiveDateParser {
    fn parse(&self, literal: &str) -> Option<i64> {
        let s = literal.trim();
        if s.is_empty() || s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        if let Some(epoch) = s.strip_prefix('@') {
            return epoch.parse().ok();
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.timestamp());
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.timestamp());
        }

        let extra = self.extra_formats.iter().map(String::as_str);

        for fmt in DATETIME_FORMATS.iter().copied().chain(extra.clone()) {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive.and_utc().timestamp());
            }
        }

        for fmt in DATE_FORMATS.iter().copied().chain(extra) {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
            }
        }

        parse_relative(s, self.now()).map(|dt| dt.timestamp())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Fortnight,
    Month,
    Year,
}

impl Unit {
    fn from_word(word: &str) -> Option<Self> {
        let singular = word.strip_suffix('s').unwrap_or(word);
        Some(match singular {
            "sec" | "second" => Unit::Second,
            "min" | "minute" => Unit::Minute,
            "hour" => Unit::Hour,
            "day" => Unit::Day,
            "week" => Unit::Week,
            "fortnight" => Unit::Fortnight,
            "month" => Unit::Month,
            "year" => Unit::Year,
            _ => return None,
        })
    }

    /// `at` moved by `n` units; `None` on overflow.
    fn shift(self, at: DateTime<Utc>, n: i64) -> Option<DateTime<Utc>> {
        let seconds = match self {
            Unit::Second => 1,
            Unit::Minute => 60,
            Unit::Hour => 3_600,
            Unit::Day => 86_400,
            Unit::Week => 7 * 86_400,
            Unit::Fortnight => 14 * 86_400,
            Unit::Month => return shift_months(at, n),
            Unit::Year => return shift_months(at, n.checked_mul(12)?),
        };
        at.checked_add_signed(TimeDelta::try_seconds(n.checked_mul(seconds)?)?)
    }
}

fn shift_months(at: DateTime<Utc>, n: i64) -> Option<DateTime<Utc>> {
    let months = Months::new(u32::try_from(n.unsigned_abs()).ok()?);
    if n < 0 {
        at.checked_sub_months(months)
    } else {
        at.checked_add_months(months)
    }
}

fn weekday(word: &str) -> Option<Weekday> {
    match word {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn midnight(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    at.date_naive().and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

/// Midnight of `day` relative to `now`: strictly before for `last`,
/// strictly after for `next`, today or later otherwise.
fn to_weekday(now: DateTime<Utc>, day: Weekday, direction: &str) -> Option<DateTime<Utc>> {
    let today = i64::from(now.weekday().num_days_from_monday());
    let target = i64::from(day.num_days_from_monday());
    let days = match direction {
        "last" => {
            let back = (today - target).rem_euclid(7);
            -(if back == 0 { 7 } else { back })
        }
        "next" => {
            let ahead = (target - today).rem_euclid(7);
            if ahead == 0 {
                7
            } else {
                ahead
            }
        }
        _ => (target - today).rem_euclid(7),
    };
    midnight(Unit::Day.shift(now, days)?)
}

fn parse_relative(literal: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lower = literal.to_ascii_lowercase();
    let tokens: Vec<&str> = lower.split_whitespace().collect();

    match tokens.as_slice() {
        ["now"] => return Some(now),
        ["today"] | ["midnight"] => return midnight(now),
        ["yesterday"] => return midnight(Unit::Day.shift(now, -1)?),
        ["tomorrow"] => return midnight(Unit::Day.shift(now, 1)?),
        [word] if weekday(word).is_some() => return to_weekday(now, weekday(word)?, "this"),
        [direction @ ("last" | "next" | "this"), word] => {
            if let Some(day) = weekday(word) {
                return to_weekday(now, day, direction);
            }
            let n = match *direction {
                "last" => -1,
                "next" => 1,
                _ => 0,
            };
            return Unit::from_word(word)?.shift(now, n);
        }
        _ => {}
    }

    offsets(&tokens, now)
}

/// `<n> <unit>` terms applied in order, all negated by a trailing `ago`.
fn offsets(tokens: &[&str], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (terms, sign) = match tokens.split_last() {
        Some((&"ago", rest)) => (rest, -1),
        _ => (tokens, 1),
    };
    if terms.is_empty() || terms.len() % 2 != 0 {
        return None;
    }

    let mut at = now;
    for pair in terms.chunks(2) {
        let digits = pair[0].strip_prefix('+').unwrap_or(pair[0]);
        let n: i64 = digits.parse().ok()?;
        at = Unit::from_word(pair[1])?.shift(at, n.checked_mul(sign)?)?;
    }
    Some(at)
}

/// Disables date coercion entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverDates;

impl DateParser for NeverDates {
    fn parse(&self, _literal: &str) -> Option<i64> {
        None
    }
}

impl<F> DateParser for F
where
    F: Fn(&str) -> Option<i64>,
{
    fn parse(&self, literal: &str) -> Option<i64> {
        self(literal)
    }
}
