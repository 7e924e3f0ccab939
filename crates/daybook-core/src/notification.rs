use chrono::{Duration, NaiveDateTime};
use tracing::{debug, trace};

use crate::datetime::parse_date_time;
use crate::event::{Event, Schedule};

/// Events whose reminder window `[start - notification_time, start)` contains
/// `now` and that have not been announced yet.
///
/// The window is inclusive at the lead edge and closes once the event starts.
#[tracing::instrument(skip(events, notified_ids), fields(count = events.len()))]
pub fn get_upcoming_events<'a, S>(
    events: &'a [Event],
    now: NaiveDateTime,
    notified_ids: &[S],
) -> Vec<&'a Event>
where
    S: AsRef<str>,
{
    let upcoming: Vec<&Event> = events
        .iter()
        .filter(|event| {
            let Some(start) = parse_date_time(event.date(), event.start_time()).as_naive() else {
                trace!(id = %event.id, "skipping event with invalid start");
                return false;
            };
            let until_start = start - now;
            let lead = Duration::minutes(i64::from(event.notification_time()));
            until_start > Duration::zero() && until_start <= lead
        })
        .filter(|event| !notified_ids.iter().any(|id| id.as_ref() == event.id))
        .collect();

    debug!(upcoming = upcoming.len(), "computed upcoming notifications");
    upcoming
}

pub fn create_notification_message(event: &Event) -> String {
    format!(
        "{}분 후 {} 일정이 시작됩니다.",
        event.notification_time(),
        event.title()
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::{create_notification_message, get_upcoming_events};
    use crate::event::{Event, EventForm};

    fn at(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").expect("valid instant")
    }

    fn meeting(id: &str, start: &str, end: &str, lead: u32) -> Event {
        let mut form = EventForm::new("회의", "2024-07-01", start, end);
        form.description = "설명".to_string();
        form.location = "회의실".to_string();
        form.category = "meeting".to_string();
        form.notification_time = lead;
        Event::new(id, form)
    }

    fn events() -> Vec<Event> {
        vec![
            meeting("1", "14:00", "15:00", 30),
            meeting("2", "15:00", "16:00", 10),
        ]
    }

    const NONE: [&str; 0] = [];

    #[test]
    fn returns_event_when_lead_time_arrives() {
        let events = events();
        let upcoming = get_upcoming_events(&events, at("2024-07-01T13:30:00"), &NONE);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, "1");
    }

    #[test]
    fn skips_already_notified() {
        let events = events();
        let notified = vec!["1".to_string()];
        let upcoming = get_upcoming_events(&events, at("2024-07-01T13:30:00"), &notified);
        assert!(upcoming.is_empty());
    }

    #[test]
    fn skips_before_window_opens() {
        let events = events();
        let upcoming = get_upcoming_events(&events, at("2024-07-01T13:20:00"), &NONE);
        assert!(upcoming.is_empty());
    }

    #[test]
    fn skips_after_event_started() {
        let events = events();
        assert!(get_upcoming_events(&events, at("2024-07-01T14:01:00"), &NONE).is_empty());
        assert!(get_upcoming_events(&events, at("2024-07-01T14:00:00"), &NONE).is_empty());
    }

    #[test]
    fn returns_every_qualifying_event() {
        let events = vec![
            meeting("1", "14:00", "15:00", 20),
            meeting("2", "14:10", "15:00", 30),
        ];
        let upcoming = get_upcoming_events(&events, at("2024-07-01T13:40:00"), &NONE);
        let ids: Vec<&str> = upcoming.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn invalid_start_is_never_upcoming() {
        let events = vec![meeting("1", "25:00", "26:00", 60)];
        assert!(get_upcoming_events(&events, at("2024-07-01T23:30:00"), &NONE).is_empty());
    }

    #[test]
    fn formats_message() {
        let mut event = meeting("1", "14:00", "15:00", 30);
        event.form.title = "중요 회의".to_string();
        assert_eq!(
            create_notification_message(&event),
            "30분 후 중요 회의 일정이 시작됩니다."
        );
    }
}
