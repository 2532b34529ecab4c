use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use thiserror::Error;

/// Errors that can occur while reading a cron expression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("expected 5 or 6 fields, got {0}")]
    FieldCount(usize),

    #[error("invalid {field} field: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

struct FieldLayout {
    name: &'static str,
    min: u32,
    max: u32,
    /// Symbolic names, valued from `min` upwards.
    names: &'static [&'static str],
}

const SECOND: FieldLayout = FieldLayout { name: "second", min: 0, max: 59, names: &[] };
const MINUTE: FieldLayout = FieldLayout { name: "minute", min: 0, max: 59, names: &[] };
const HOUR: FieldLayout = FieldLayout { name: "hour", min: 0, max: 23, names: &[] };
const DAY: FieldLayout = FieldLayout { name: "day-of-month", min: 1, max: 31, names: &[] };
const MONTH: FieldLayout = FieldLayout {
    name: "month",
    min: 1,
    max: 12,
    names: &["jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec"],
};
const WEEKDAY: FieldLayout = FieldLayout {
    name: "day-of-week",
    min: 0,
    max: 7,
    names: &["sun", "mon", "tue", "wed", "thu", "fri", "sat"],
};

/// Set of allowed values for one field, as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSet {
    bits: u64,
    restricted: bool,
}

impl FieldSet {
    fn contains(&self, value: u32) -> bool {
        self.bits & (1u64 << value) != 0
    }
}

/// A parsed cron expression, evaluated in UTC.
///
/// Five fields (`minute hour day month weekday`) or six with a leading
/// seconds field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    expression: String,
    seconds: FieldSet,
    minutes: FieldSet,
    hours: FieldSet,
    days: FieldSet,
    months: FieldSet,
    weekdays: FieldSet,
}

impl Cadence {
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let (seconds, rest) = match fields.len() {
            5 => ("0", &fields[..]),
            6 => (fields[0], &fields[1..]),
            n => return Err(ScheduleError::FieldCount(n)),
        };

        let mut weekdays = parse_field(&WEEKDAY, rest[4])?;
        if weekdays.contains(7) {
            weekdays.bits |= 1;
        }

        Ok(Self {
            expression: expression.trim().to_string(),
            seconds: parse_field(&SECOND, seconds)?,
            minutes: parse_field(&MINUTE, rest[0])?,
            hours: parse_field(&HOUR, rest[1])?,
            days: parse_field(&DAY, rest[2])?,
            months: parse_field(&MONTH, rest[3])?,
            weekdays,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The first matching instant strictly after `from`, or `None` if nothing
    /// matches within the next five years (e.g. February 31st).
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let limit = from + Duration::days(5 * 366);
        let mut t = from.with_nanosecond(0)? + Duration::seconds(1);

        while t <= limit {
            if !self.months.contains(t.month()) {
                t = start_of_next_month(t)?;
                continue;
            }
            if !self.day_matches(t) {
                t = start_of_day(t)? + Duration::days(1);
                continue;
            }
            if !self.hours.contains(t.hour()) {
                t = t.with_minute(0)?.with_second(0)? + Duration::hours(1);
                continue;
            }
            if !self.minutes.contains(t.minute()) {
                t = t.with_second(0)? + Duration::minutes(1);
                continue;
            }
            if !self.seconds.contains(t.second()) {
                t += Duration::seconds(1);
                continue;
            }
            return Some(t);
        }

        None
    }

    fn day_matches(&self, t: DateTime<Utc>) -> bool {
        let by_day = self.days.contains(t.day());
        let by_weekday = self.weekdays.contains(t.weekday().num_days_from_sunday());
        if self.days.restricted && self.weekdays.restricted {
            by_day || by_weekday
        } else {
            by_day && by_weekday
        }
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expression)
    }
}

fn parse_field(layout: &FieldLayout, text: &str) -> Result<FieldSet, ScheduleError> {
    let invalid = || ScheduleError::InvalidField {
        field: layout.name,
        value: text.to_string(),
    };

    let mut bits = 0u64;
    for part in text.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => (range, Some(step.parse::<u32>().map_err(|_| invalid())?)),
            None => (part, None),
        };
        let step = match step {
            Some(0) => return Err(invalid()),
            Some(step) => step,
            None => 1,
        };

        let (start, end) = if range == "*" || range == "?" {
            (layout.min, layout.max)
        } else if let Some((a, b)) = range.split_once('-') {
            (field_value(layout, a).ok_or_else(invalid)?, field_value(layout, b).ok_or_else(invalid)?)
        } else {
            let value = field_value(layout, range).ok_or_else(invalid)?;
            // "5/15" means from 5 to the end in steps of 15
            if step > 1 { (value, layout.max) } else { (value, value) }
        };

        if start > end {
            return Err(invalid());
        }
        for value in (start..=end).step_by(step as usize) {
            bits |= 1u64 << value;
        }
    }

    Ok(FieldSet {
        bits,
        restricted: text != "*" && text != "?",
    })
}

fn field_value(layout: &FieldLayout, text: &str) -> Option<u32> {
    let value = match text.parse::<u32>() {
        Ok(value) => value,
        Err(_) => {
            let lowered = text.to_ascii_lowercase();
            let index = layout.names.iter().position(|name| *name == lowered)?;
            layout.min + index as u32
        }
    };
    (layout.min..=layout.max).contains(&value).then_some(value)
}

fn start_of_day(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let midnight = t.date_naive().and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

fn start_of_next_month(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (year, month) = if t.month() == 12 {
        (t.year() + 1, 1)
    } else {
        (t.year(), t.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}
