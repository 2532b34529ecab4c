// Loose parsing of human-written timestamps such as "Updated 11:36 AM EST Nov. 4, 2020".
// Date, clock time and zone are matched independently; surrounding words are ignored.
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

const MONTHS: &str = "january|jan|february|feb|march|mar|april|apr|may|june|jun|july|jul|\
                      august|aug|september|sept|sep|october|oct|november|nov|december|dec";

static MONTH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?"
    ))
    .unwrap()
});

static DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+({MONTHS})\b\.?(?:,?\s+(\d{{4}})\b)?"
    ))
    .unwrap()
});

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());

static SLASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2}|\d{4}))?\b").unwrap());

static RELATIVE_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(today|yesterday|tomorrow)\b").unwrap());

static CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}):(\d{2})(?::(\d{2}))?(?:\s*([ap])\.?\s?m\b\.?)?").unwrap()
});

static ZONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(utc|gmt|et|est|edt|ct|cst|cdt|mt|mst|mdt|pt|pst|pdt)\b").unwrap()
});

/// Parses free text into a UTC instant, relative to `now` for the parts the
/// text leaves out. Returns `None` when neither a date nor a time is found or
/// the pieces do not form a valid instant.
pub fn parse_loose_datetime(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let lowered = trimmed.to_lowercase();
    let offset = find_zone(&lowered).unwrap_or_else(utc_offset);
    let today = now.with_timezone(&offset).date_naive();

    let date = find_date(&lowered, today);
    let time = find_time(&lowered);

    let (date, time) = match (date, time) {
        (None, None) => return None,
        (date, time) => (
            date.unwrap_or(Some(today))?,
            time.unwrap_or(NaiveTime::from_hms_opt(12, 0, 0))?,
        ),
    };

    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Outer `None`: no date in the text. Inner `None`: a date that does not exist.
fn find_date(text: &str, today: NaiveDate) -> Option<Option<NaiveDate>> {
    if let Some(caps) = ISO_DATE.captures(text) {
        return Some(ymd(
            caps[1].parse().ok(),
            caps[2].parse().ok(),
            caps[3].parse().ok(),
        ));
    }

    if let Some(caps) = MONTH_FIRST.captures(text) {
        let year = caps.get(3).and_then(|y| y.as_str().parse().ok()).unwrap_or(today.year());
        return Some(ymd(Some(year), month_number(&caps[1]), caps[2].parse().ok()));
    }

    if let Some(caps) = DAY_FIRST.captures(text) {
        let year = caps.get(3).and_then(|y| y.as_str().parse().ok()).unwrap_or(today.year());
        return Some(ymd(Some(year), month_number(&caps[2]), caps[1].parse().ok()));
    }

    if let Some(caps) = SLASH_DATE.captures(text) {
        let year = match caps.get(3).and_then(|y| y.as_str().parse::<i32>().ok()) {
            Some(y) if y < 100 => 2000 + y,
            Some(y) => y,
            None => today.year(),
        };
        return Some(ymd(Some(year), caps[1].parse().ok(), caps[2].parse().ok()));
    }

    if let Some(caps) = RELATIVE_DAY.captures(text) {
        let shift = match &caps[1] {
            "yesterday" => -1,
            "tomorrow" => 1,
            _ => 0,
        };
        return Some(today.checked_add_signed(Duration::days(shift)));
    }

    None
}

/// Outer `None`: no clock time in the text. Inner `None`: an impossible time.
fn find_time(text: &str) -> Option<Option<NaiveTime>> {
    let caps = CLOCK.captures(text)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let second: u32 = caps.get(3).and_then(|s| s.as_str().parse().ok()).unwrap_or(0);

    let hour = match caps.get(4).map(|m| m.as_str()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return Some(None);
            }
            match (meridiem, hour) {
                ("a", 12) => 0,
                ("a", h) => h,
                ("p", 12) => 12,
                (_, h) => h + 12,
            }
        }
        None => hour,
    };

    Some(NaiveTime::from_hms_opt(hour, minute, second))
}

fn find_zone(text: &str) -> Option<FixedOffset> {
    let caps = ZONE.captures(text)?;
    let hours = match &caps[1] {
        "utc" | "gmt" => 0,
        "edt" => -4,
        "et" | "est" | "cdt" => -5,
        "ct" | "cst" | "mdt" => -6,
        "mt" | "mst" | "pdt" => -7,
        "pt" | "pst" => -8,
        _ => return None,
    };
    FixedOffset::east_opt(hours * 3600)
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

fn ymd(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year?, month?, day?)
}

fn month_number(name: &str) -> Option<u32> {
    let number = match name.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(number)
}
