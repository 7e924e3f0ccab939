use serde::Serialize;
use tracing::trace;

use crate::datetime::parse_time_of_day;

pub const START_TIME_ERROR: &str = "시작 시간은 종료 시간보다 빨라야 합니다.";
pub const END_TIME_ERROR: &str = "종료 시간은 시작 시간보다 늦어야 합니다.";

/// Per-field messages for a start/end time pair; `None` means the field is fine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeErrorRecord {
    pub start_time_error: Option<&'static str>,
    pub end_time_error: Option<&'static str>,
}

impl TimeErrorRecord {
    pub fn has_error(&self) -> bool {
        self.start_time_error.is_some() || self.end_time_error.is_some()
    }
}

/// Flags a time range whose start is not strictly before its end.
///
/// Incomplete input (either side empty) is left alone, and so are values
/// that do not parse as `HH:MM`: they cannot be ordered, so no error is
/// reported for them.
pub fn get_time_error_message(start: &str, end: &str) -> TimeErrorRecord {
    if start.is_empty() || end.is_empty() {
        return TimeErrorRecord::default();
    }

    let (Some(start_at), Some(end_at)) = (parse_time_of_day(start), parse_time_of_day(end))
    else {
        trace!(start, end, "unparseable time; skipping ordering check");
        return TimeErrorRecord::default();
    };

    if start_at >= end_at {
        return TimeErrorRecord {
            start_time_error: Some(START_TIME_ERROR),
            end_time_error: Some(END_TIME_ERROR),
        };
    }

    TimeErrorRecord::default()
}
