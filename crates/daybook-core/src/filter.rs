use std::fmt;

use chrono::{
  Datelike,
  Days,
  NaiveDate,
  Weekday
};
use tracing::{
  debug,
  trace
};

use crate::datetime::parse_date;
use crate::event::{
  Event,
  Schedule
};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum ViewMode {
  Week,
  #[default]
  Month
}

impl ViewMode {
  pub fn from_key(
    raw: &str
  ) -> Option<Self> {
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "week" | "weekly" | "w" => {
        Some(Self::Week)
      }
      | "month" | "monthly" | "m" => {
        Some(Self::Month)
      }
      | _ => None
    }
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Week => "week",
      | Self::Month => "month"
    }
  }
}

impl fmt::Display for ViewMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

/// Events whose day-of-month equals `day`, regardless of year or month.
#[tracing::instrument(skip(events))]
pub fn filter_events_by_day<'a, I>(
  events: I,
  day: u32
) -> Vec<&'a Event>
where
  I: IntoIterator<Item = &'a Event>
{
  if !(1..=31).contains(&day) {
    trace!(
      day,
      "day outside 1..=31; nothing \
       matches"
    );
    return vec![];
  }

  events
    .into_iter()
    .filter(|event| {
      event_date(event)
        .is_some_and(|date| {
          date.day() == day
        })
    })
    .collect()
}

/// First and last day of the week containing `reference`.
#[must_use]
pub fn week_bounds(
  reference: NaiveDate,
  week_start: Weekday
) -> (NaiveDate, NaiveDate) {
  let offset = (7
    + reference
      .weekday()
      .num_days_from_monday()
    - week_start.num_days_from_monday())
    % 7;
  let first = reference
    .checked_sub_days(Days::new(
      u64::from(offset)
    ))
    .unwrap_or(reference);
  let last = first
    .checked_add_days(Days::new(6))
    .unwrap_or(first);
  (first, last)
}

#[tracing::instrument(skip(events), fields(count = events.len()))]
pub fn filter_events_by_week(
  events: &[Event],
  reference: NaiveDate,
  week_start: Weekday
) -> Vec<&Event> {
  let (first, last) =
    week_bounds(reference, week_start);
  trace!(%first, %last, "week window");

  events
    .iter()
    .filter(|event| {
      event_date(event).is_some_and(
        |date| {
          first <= date && date <= last
        }
      )
    })
    .collect()
}

#[tracing::instrument(skip(events), fields(count = events.len()))]
pub fn filter_events_by_month(
  events: &[Event],
  reference: NaiveDate
) -> Vec<&Event> {
  events
    .iter()
    .filter(|event| {
      event_date(event).is_some_and(
        |date| {
          date.year() == reference.year()
            && date.month()
              == reference.month()
        }
      )
    })
    .collect()
}

/// Case-insensitive substring match on title, description and location.
#[must_use]
pub fn matches_search(
  event: &Event,
  term: &str
) -> bool {
  if term.is_empty() {
    return true;
  }

  let needle = term.to_lowercase();
  [
    event.title(),
    event.description(),
    event.location()
  ]
  .iter()
  .any(|field| {
    field
      .to_lowercase()
      .contains(&needle)
  })
}

pub fn search_events<'a, I>(
  events: I,
  term: &str
) -> Vec<&'a Event>
where
  I: IntoIterator<Item = &'a Event>
{
  events
    .into_iter()
    .filter(|event| {
      matches_search(event, term)
    })
    .collect()
}

/// View narrowing followed by search, with a Sunday-first week.
pub fn get_filtered_events<'a>(
  events: &'a [Event],
  search_term: &str,
  reference: NaiveDate,
  view: ViewMode
) -> Vec<&'a Event> {
  get_filtered_events_with_week_start(
    events,
    search_term,
    reference,
    view,
    Weekday::Sun
  )
}

#[tracing::instrument(skip(events), fields(count = events.len()))]
pub fn get_filtered_events_with_week_start<
  'a
>(
  events: &'a [Event],
  search_term: &str,
  reference: NaiveDate,
  view: ViewMode,
  week_start: Weekday
) -> Vec<&'a Event> {
  let in_view = match view {
    | ViewMode::Week => {
      filter_events_by_week(
        events, reference, week_start
      )
    }
    | ViewMode::Month => {
      filter_events_by_month(
        events, reference
      )
    }
  };
  let in_view_count = in_view.len();
  let filtered =
    search_events(in_view, search_term);

  debug!(
    %view,
    in_view = in_view_count,
    matched = filtered.len(),
    "filtered events"
  );
  filtered
}

fn event_date(
  event: &Event
) -> Option<NaiveDate> {
  parse_date(event.date())
}
