use tracing::debug;

use crate::datetime::convert_event_to_date_range;
use crate::event::{Event, Schedule};

/// Half-open interval intersection: `[a.start, a.end)` against `[b.start, b.end)`.
///
/// Ranges that only touch at a boundary do not overlap. Any invalid endpoint
/// makes the result `false`.
pub fn is_overlapping<A, B>(a: &A, b: &B) -> bool
where
    A: Schedule + ?Sized,
    B: Schedule + ?Sized,
{
    let a = convert_event_to_date_range(a);
    let b = convert_event_to_date_range(b);
    a.start.is_before(&b.end) && b.start.is_before(&a.end)
}

/// Returns the events in `existing` that collide with `candidate`, in slice
/// order. An event never conflicts with itself, so entries sharing
/// the candidate's id are skipped.
#[tracing::instrument(skip_all, fields(candidate = ?candidate.id(), existing_count = existing.len()))]
pub fn find_overlapping_events<'a, S>(candidate: &S, existing: &'a [Event]) -> Vec<&'a Event>
where
    S: Schedule + ?Sized,
{
    let candidate_id = candidate.id();
    let conflicts: Vec<&Event> = existing
        .iter()
        .filter(|event| candidate_id != Some(event.id.as_str()))
        .filter(|event| is_overlapping(candidate, *event))
        .collect();

    debug!(conflicts = conflicts.len(), "overlap scan finished");
    conflicts
}
