use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::anyhow;
use chrono::{
  DateTime,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

use crate::event::Schedule;

const TIMEZONE_CONFIG_FILE: &str =
  "daybook-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "DAYBOOK_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "DAYBOOK_TIME_CONFIG";
const DEFAULT_PROJECT_TIMEZONE: &str =
  "Asia/Seoul";

pub const DATE_FORMAT: &str =
  "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Result of combining a date string and a time-of-day string.
///
/// `Invalid` stands in for any malformed input. It never compares as
/// earlier or later than anything, so range checks built on
/// [`EventTime::is_before`] quietly report "no overlap" / "not included".
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum EventTime {
  At(NaiveDateTime),
  Invalid
}

impl EventTime {
  #[must_use]
  pub fn is_valid(&self) -> bool {
    matches!(self, EventTime::At(_))
  }

  #[must_use]
  pub fn as_naive(
    &self
  ) -> Option<NaiveDateTime> {
    match self {
      | EventTime::At(dt) => Some(*dt),
      | EventTime::Invalid => None
    }
  }

  /// Strict ordering; false whenever either side is `Invalid`.
  #[must_use]
  pub fn is_before(
    &self,
    other: &EventTime
  ) -> bool {
    match (self, other) {
      | (
        EventTime::At(lhs),
        EventTime::At(rhs)
      ) => lhs < rhs,
      | _ => false
    }
  }
}

impl fmt::Display for EventTime {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | EventTime::At(dt) => {
        write!(
          f,
          "{}",
          dt.format("%Y-%m-%d %H:%M")
        )
      }
      | EventTime::Invalid => {
        f.write_str("Invalid Date")
      }
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct DateRange {
  pub start: EventTime,
  pub end:   EventTime
}

pub fn project_timezone() -> &'static Tz
{
  static PROJECT_TZ: OnceLock<Tz> =
    OnceLock::new();
  PROJECT_TZ.get_or_init(
    resolve_project_timezone
  )
}

/// Wall-clock time in the configured timezone.
///
/// Event dates and times are stored without an offset, so "now" has to be
/// brought into the same naive representation before comparing.
#[must_use]
pub fn to_project_local(
  dt: DateTime<Utc>
) -> NaiveDateTime {
  dt.with_timezone(project_timezone())
    .naive_local()
}

#[must_use]
pub fn format_date(
  date: NaiveDate
) -> String {
  date.format(DATE_FORMAT).to_string()
}

fn resolve_project_timezone() -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_PROJECT_TIMEZONE,
    "DEFAULT_PROJECT_TIMEZONE"
  )
  .unwrap_or_else(|| {
    tracing::error!(
      "failed to parse fallback \
       timezone; using UTC"
    );
    chrono_tz::UTC
  })
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured project timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

fn date_regex() -> Option<&'static Regex>
{
  static DATE_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  DATE_RE
    .get_or_init(|| {
      Regex::new(
        r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})$"
      )
      .ok()
    })
    .as_ref()
}

fn time_regex() -> Option<&'static Regex>
{
  static TIME_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  TIME_RE
    .get_or_init(|| {
      Regex::new(
        r"^(?P<hour>\d{2}):(?P<minute>\d{2})$"
      )
      .ok()
    })
    .as_ref()
}

/// Parses a strict `YYYY-MM-DD` calendar day.
#[must_use]
pub fn parse_date(
  input: &str
) -> Option<NaiveDate> {
  let caps =
    date_regex()?.captures(input)?;
  let year = caps
    .name("year")?
    .as_str()
    .parse::<i32>()
    .ok()?;
  let month = caps
    .name("month")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let day = caps
    .name("day")?
    .as_str()
    .parse::<u32>()
    .ok()?;

  NaiveDate::from_ymd_opt(
    year, month, day
  )
}

/// Parses a strict 24-hour `HH:MM` time of day.
#[must_use]
pub fn parse_time_of_day(
  input: &str
) -> Option<NaiveTime> {
  let caps =
    time_regex()?.captures(input)?;
  let hour = caps
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = caps
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;

  NaiveTime::from_hms_opt(
    hour, minute, 0
  )
}

#[must_use]
pub fn parse_date_time(
  date: &str,
  time: &str
) -> EventTime {
  match (
    parse_date(date),
    parse_time_of_day(time)
  ) {
    | (Some(day), Some(clock)) => {
      EventTime::At(day.and_time(clock))
    }
    | _ => {
      tracing::trace!(
        date,
        time,
        "unparseable date/time"
      );
      EventTime::Invalid
    }
  }
}

#[must_use]
pub fn convert_event_to_date_range<
  S: Schedule + ?Sized
>(
  event: &S
) -> DateRange {
  DateRange {
    start: parse_date_time(
      event.date(),
      event.start_time()
    ),
    end:   parse_date_time(
      event.date(),
      event.end_time()
    )
  }
}

/// Parses a user-supplied instant such as `2024-07-01 13:30` or
/// `2024-07-01T13:30:00`.
pub fn parse_local_datetime(
  input: &str
) -> anyhow::Result<NaiveDateTime> {
  let token = input.trim();
  for fmt in [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt);
    }
  }

  Err(anyhow!(
    "unrecognized date-time: {input} \
     (expected YYYY-MM-DD HH:MM)"
  ))
}

pub fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    NaiveDate,
    Timelike,
    Weekday
  };

  use super::{
    EventTime,
    convert_event_to_date_range,
    parse_date,
    parse_date_time,
    parse_local_datetime,
    parse_weekday_name
  };
  use crate::event::EventForm;

  fn sample_form() -> EventForm {
    let mut form = EventForm::new(
      "테스트 이벤트",
      "2024-07-01",
      "14:30",
      "15:30"
    );
    form.description =
      "설명".to_string();
    form.location = "장소".to_string();
    form.category =
      "meeting".to_string();
    form.notification_time = 30;
    form
  }

  #[test]
  fn parses_date_and_time_fields() {
    let parsed = parse_date_time(
      "2024-07-01",
      "14:30"
    )
    .as_naive()
    .expect("valid date-time");
    assert_eq!(parsed.year(), 2024);
    assert_eq!(parsed.month(), 7);
    assert_eq!(parsed.day(), 1);
    assert_eq!(parsed.hour(), 14);
    assert_eq!(parsed.minute(), 30);
  }

  #[test]
  fn malformed_inputs_are_invalid() {
    for (date, time) in [
      ("2024-13-01", "14:30"),
      ("2024-07-01", "25:70"),
      ("", "14:30"),
      ("2024-02-30", "10:00"),
      ("2024-7-1", "10:00"),
      ("2024-07-01", "")
    ] {
      let parsed =
        parse_date_time(date, time);
      assert_eq!(
        parsed,
        EventTime::Invalid,
        "{date} {time}"
      );
      assert_eq!(
        parsed.to_string(),
        "Invalid Date"
      );
    }
  }

  #[test]
  fn invalid_never_orders() {
    let valid = parse_date_time(
      "2024-07-01",
      "14:30"
    );
    assert!(
      !valid
        .is_before(&EventTime::Invalid)
    );
    assert!(
      !EventTime::Invalid
        .is_before(&valid)
    );
    assert!(
      !EventTime::Invalid
        .is_before(&EventTime::Invalid)
    );
  }

  #[test]
  fn converts_form_to_range() {
    let range =
      convert_event_to_date_range(
        &sample_form()
      );
    assert_eq!(
      range.start.to_string(),
      "2024-07-01 14:30"
    );
    assert_eq!(
      range.end.to_string(),
      "2024-07-01 15:30"
    );
  }

  #[test]
  fn bad_date_invalidates_both_ends() {
    let mut form = sample_form();
    form.date = "2024-13-01".to_string();
    let range =
      convert_event_to_date_range(&form);
    assert!(!range.start.is_valid());
    assert!(!range.end.is_valid());
  }

  #[test]
  fn bad_start_time_only_invalidates_start()
  {
    let mut form = sample_form();
    form.start_time =
      "25:00".to_string();
    let range =
      convert_event_to_date_range(&form);
    assert!(!range.start.is_valid());
    assert!(range.end.is_valid());
  }

  #[test]
  fn parses_strict_dates() {
    assert_eq!(
      parse_date("2024-02-29"),
      NaiveDate::from_ymd_opt(
        2024, 2, 29
      )
    );
    assert_eq!(
      parse_date("2023-02-29"),
      None
    );
    assert_eq!(
      parse_date("20240229"),
      None
    );
  }

  #[test]
  fn parses_cli_instants() {
    let a = parse_local_datetime(
      "2024-07-01 13:30"
    )
    .expect("space form");
    let b = parse_local_datetime(
      "2024-07-01T13:30:00"
    )
    .expect("iso form");
    assert_eq!(a, b);
    assert!(
      parse_local_datetime("soon")
        .is_err()
    );
  }

  #[test]
  fn parses_weekday_names() {
    assert_eq!(
      parse_weekday_name("Sunday"),
      Some(Weekday::Sun)
    );
    assert_eq!(
      parse_weekday_name("mon"),
      Some(Weekday::Mon)
    );
    assert_eq!(
      parse_weekday_name("someday"),
      None
    );
  }
}
