use chrono::{Datelike, NaiveDate, Weekday};
use tracing::debug;

use crate::event::Event;
use crate::filter::{filter_events_by_day, filter_events_by_month, filter_events_by_week, week_bounds};
use crate::holidays::HolidayCalendar;

/// One cell of a rendered calendar.
#[derive(Debug, Clone)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    pub holiday: Option<&'a str>,
    pub events: Vec<&'a Event>,
}

#[derive(Debug, Clone)]
pub struct MonthView<'a> {
    pub title: String,
    pub week_start: Weekday,
    /// Rows of seven slots; `None` pads days outside the month.
    pub weeks: Vec<Vec<Option<DayCell<'a>>>>,
}

#[derive(Debug, Clone)]
pub struct WeekView<'a> {
    pub title: String,
    pub days: Vec<DayCell<'a>>,
}

pub fn get_days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.map(|next| (next - first).num_days() as u32)
        .unwrap_or(31)
}

/// The seven consecutive dates of the week containing `reference`.
pub fn get_week_dates(reference: NaiveDate, week_start: Weekday) -> Vec<NaiveDate> {
    let (first, _) = week_bounds(reference, week_start);
    first.iter_days().take(7).collect()
}

/// Day-of-month numbers laid out in week rows, padded with `None`.
pub fn get_weeks_at_month(reference: NaiveDate, week_start: Weekday) -> Vec<Vec<Option<u32>>> {
    let days = get_days_in_month(reference.year(), reference.month());
    let Some(first) = reference.with_day(1) else {
        return vec![];
    };
    let lead = (7 + first.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;

    let cells: Vec<Option<u32>> = std::iter::repeat_n(None, lead as usize)
        .chain((1..=days).map(Some))
        .collect();

    cells
        .chunks(7)
        .map(|chunk| {
            let mut row = chunk.to_vec();
            row.resize(7, None);
            row
        })
        .collect()
}

/// `"2024년 7월 1주"`. A week belongs to the month holding its Thursday.
pub fn format_week(reference: NaiveDate, week_start: Weekday) -> String {
    let thursday = get_week_dates(reference, week_start)
        .into_iter()
        .find(|date| date.weekday() == Weekday::Thu)
        .unwrap_or(reference);
    let week_number = (thursday.day() - 1) / 7 + 1;
    format!(
        "{}년 {}월 {}주",
        thursday.year(),
        thursday.month(),
        week_number
    )
}

/// `"2024년 7월"`.
pub fn format_month(reference: NaiveDate) -> String {
    format!("{}년 {}월", reference.year(), reference.month())
}

#[tracing::instrument(skip(events, holidays), fields(count = events.len()))]
pub fn build_month_view<'a>(
    events: &'a [Event],
    reference: NaiveDate,
    holidays: &'a HolidayCalendar,
    week_start: Weekday,
) -> MonthView<'a> {
    let month_events = filter_events_by_month(events, reference);

    let weeks: Vec<Vec<Option<DayCell<'a>>>> = get_weeks_at_month(reference, week_start)
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|slot| {
                    let day = slot?;
                    let date = reference.with_day(day)?;
                    Some(DayCell {
                        date,
                        holiday: holidays.name_on(date),
                        events: filter_events_by_day(month_events.iter().copied(), day),
                    })
                })
                .collect()
        })
        .collect();

    debug!(
        weeks = weeks.len(),
        events = month_events.len(),
        "built month view"
    );
    MonthView {
        title: format_month(reference),
        week_start,
        weeks,
    }
}

#[tracing::instrument(skip(events, holidays), fields(count = events.len()))]
pub fn build_week_view<'a>(
    events: &'a [Event],
    reference: NaiveDate,
    holidays: &'a HolidayCalendar,
    week_start: Weekday,
) -> WeekView<'a> {
    let week_events = filter_events_by_week(events, reference, week_start);

    let days: Vec<DayCell<'a>> = get_week_dates(reference, week_start)
        .into_iter()
        .map(|date| DayCell {
            date,
            holiday: holidays.name_on(date),
            // Seven consecutive days never repeat a day-of-month.
            events: filter_events_by_day(week_events.iter().copied(), date.day()),
        })
        .collect();

    debug!(events = week_events.len(), "built week view");
    WeekView {
        title: format_week(reference, week_start),
        days,
    }
}

impl<'a> MonthView<'a> {
    pub fn days(&self) -> impl Iterator<Item = &DayCell<'a>> {
        self.weeks.iter().flatten().flatten()
    }
}
