//! Pairwise interval-conflict tests.
//!
//! Used twice in the pipeline: once to resolve self-conflicts among freshly
//! generated candidates, and once to remove candidates that collide with any
//! busy interval. Intervals that merely touch (one ends exactly when the other
//! starts) are NOT conflicts.

use crate::model::Interval;

/// Whether `a` and `b` overlap by more than a shared boundary.
///
/// Two identical intervals conflict; `a.end == b.start` does not.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use slot_engine::model::TimeRange;
/// use slot_engine::overlap::conflicts;
///
/// let at = |h| Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap();
/// let morning = TimeRange { start: at(9), end: at(10) };
/// let later = TimeRange { start: at(10), end: at(11) };
/// assert!(conflicts(&morning, &morning));
/// assert!(!conflicts(&morning, &later));
/// ```
pub fn conflicts<A: Interval + ?Sized, B: Interval + ?Sized>(a: &A, b: &B) -> bool {
    let (a_start, a_end) = (a.start(), a.end());
    let (b_start, b_end) = (b.start(), b.end());
    a_start <= b_end && a_end >= b_start && !(a_start == b_end || a_end == b_start)
}

/// Candidates that conflict with none of `busy`, in input order.
///
/// O(n·m): both sides are bounded by the scheduling horizon.
pub fn remove_conflicting<C, B>(candidates: Vec<C>, busy: &[B]) -> Vec<C>
where
    C: Interval,
    B: Interval,
{
    if busy.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|candidate| !busy.iter().any(|b| conflicts(candidate, b)))
        .collect()
}

/// Resolve self-conflicts: walk in input order and keep an item only if it
/// conflicts with nothing kept before it. Later-indexed duplicates lose.
pub fn dedupe<C: Interval>(candidates: Vec<C>) -> Vec<C> {
    let mut kept: Vec<C> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !kept.iter().any(|k| conflicts(k, &candidate)) {
            kept.push(candidate);
        }
    }
    kept
}
