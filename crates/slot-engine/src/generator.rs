//! Expansion of a recurring weekly pattern into candidate UTC slots.
//!
//! Generation is a pure function of its inputs. The caller supplies the "now"
//! anchor, so repeated calls with the same anchor return identical grids.
//!
//! # Algorithm
//!
//! 1. Resolve the local date range; an empty or inverted range yields nothing.
//! 2. For every pattern and every matching day, shrink the daily window by the
//!    lead-time offset, fit as many back-to-back sessions as possible starting
//!    at `start_time + offset`, and convert each boundary to UTC.
//! 3. Resolve self-conflicts (earlier patterns win).
//! 4. Drop slots that start before the coach's current local day.
//! 5. Sort by start.
//!
//! # DST edges
//!
//! A slot is placed only when both boundaries map to exactly one instant and
//! the resulting UTC interval is exactly one session long. Anything else is
//! dropped with a [`DropReason`]; nothing is shifted or approximated.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::{Result, SchedulingError};
use crate::model::{AvailabilityCriteria, DurationMode, Slot, WeekPattern};
use crate::overlap;
use crate::timezone::{self, LocalResolution};

/// Options for [`generate_slots_with_options`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Longest local date range a criteria set may cover.
    pub max_horizon_days: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_horizon_days: 366,
        }
    }
}

/// Why a local slot could not be placed on the UTC timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// A boundary falls in a fall-back overlap.
    AmbiguousBoundary,
    /// A boundary falls in a spring-forward gap.
    NonexistentBoundary,
    /// Both boundaries exist but a transition between them changes the length.
    StraddlesTransition,
}

/// Generate candidate slots with default options.
///
/// # Arguments
///
/// * `criteria` — the coach's weekly pattern, date range and session length
/// * `tz` — the coach's timezone; pattern times are wall-clock times in it
/// * `lead_time_offset_minutes` — minutes blocked at the front of each day's
///   window (must be ≥ 0)
/// * `now` — the reference instant used for "today"
///
/// # Errors
///
/// Returns [`SchedulingError::RejectedInput`] for a negative offset, a
/// non-positive session length, or a range longer than the horizon.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
/// use slot_engine::generator::generate_slots;
/// use slot_engine::model::{AvailabilityCriteria, DurationMode, WeekPattern};
///
/// let monday = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
/// let criteria = AvailabilityCriteria {
///     duration_mode: DurationMode::Range { start_day: monday, end_day: monday },
///     week_patterns: vec![WeekPattern::new(
///         vec![Weekday::Mon],
///         NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
///         NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
///     )],
///     session_duration_minutes: 30,
/// };
/// let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
/// let slots = generate_slots(&criteria, &chrono_tz::UTC, 0, now).unwrap();
/// assert_eq!(slots.len(), 2);
/// ```
pub fn generate_slots(
    criteria: &AvailabilityCriteria,
    tz: &Tz,
    lead_time_offset_minutes: i64,
    now: DateTime<Utc>,
) -> Result<Vec<Slot>> {
    generate_slots_with_options(
        criteria,
        tz,
        lead_time_offset_minutes,
        now,
        &GenerateOptions::default(),
    )
}

/// Generate candidate slots with explicit options.
///
/// See [`generate_slots`] for arguments and errors.
pub fn generate_slots_with_options(
    criteria: &AvailabilityCriteria,
    tz: &Tz,
    lead_time_offset_minutes: i64,
    now: DateTime<Utc>,
    options: &GenerateOptions,
) -> Result<Vec<Slot>> {
    if lead_time_offset_minutes < 0 {
        return Err(SchedulingError::RejectedInput(format!(
            "lead-time offset must not be negative, got {lead_time_offset_minutes} minutes"
        )));
    }
    criteria.validate()?;

    if let DurationMode::Rolling { days } = criteria.duration_mode {
        if days > options.max_horizon_days {
            return Err(horizon_exceeded(i64::from(days), options));
        }
    }

    let today = timezone::local_today(now, tz);
    let Some((first_day, last_day)) = criteria.duration_mode.resolve(today) else {
        tracing::debug!(mode = ?criteria.duration_mode, "empty date range, no slots");
        return Ok(Vec::new());
    };

    let span_days = (last_day - first_day).num_days() + 1;
    if span_days > i64::from(options.max_horizon_days) {
        return Err(horizon_exceeded(span_days, options));
    }

    let session = criteria.session_duration_minutes;
    let mut candidates = Vec::new();
    let mut dropped = 0usize;

    for pattern in &criteria.week_patterns {
        let count = sessions_per_day(pattern, session, lead_time_offset_minutes);
        if count < 1 {
            continue;
        }
        for day in first_day.iter_days().take_while(|d| *d <= last_day) {
            if !pattern.matches(day.weekday()) {
                continue;
            }
            let first_start = window_start(day, pattern) + Duration::minutes(lead_time_offset_minutes);
            for k in 0..count {
                let local_start = first_start + Duration::minutes(k * session);
                match place_slot(local_start, session, tz, lead_time_offset_minutes) {
                    Ok(slot) => candidates.push(slot),
                    Err(reason) => {
                        dropped += 1;
                        tracing::debug!(%local_start, ?reason, tz = tz.name(), "slot dropped");
                    }
                }
            }
        }
    }

    let generated = candidates.len();
    let mut slots = overlap::dedupe(candidates);

    let cutoff = timezone::start_of_local_day(today, tz)?;
    slots.retain(|slot| slot.start_utc >= cutoff);
    slots.sort_by_key(|slot| slot.start_utc);

    tracing::debug!(
        generated,
        dropped,
        kept = slots.len(),
        %first_day,
        %last_day,
        "generated candidate slots"
    );
    Ok(slots)
}

fn horizon_exceeded(span_days: i64, options: &GenerateOptions) -> SchedulingError {
    SchedulingError::RejectedInput(format!(
        "date range covers {span_days} days, more than the {} day horizon",
        options.max_horizon_days
    ))
}

/// How many whole sessions fit in one day's window after the offset.
pub fn sessions_per_day(pattern: &WeekPattern, session_minutes: i64, offset_minutes: i64) -> i64 {
    if session_minutes <= 0 {
        return 0;
    }
    let usable = pattern.window().minutes() - offset_minutes;
    if usable < session_minutes {
        0
    } else {
        usable / session_minutes
    }
}

/// Place one session starting at local wall-clock `local_start` in `tz`.
///
/// # Errors
///
/// Returns the [`DropReason`] when either boundary cannot be converted
/// unambiguously or the UTC length differs from `session_minutes`.
pub fn place_slot(
    local_start: NaiveDateTime,
    session_minutes: i64,
    tz: &Tz,
    lead_time_offset_minutes: i64,
) -> std::result::Result<Slot, DropReason> {
    let local_end = local_start + Duration::minutes(session_minutes);
    let start = boundary(local_start, tz)?;
    let end = boundary(local_end, tz)?;
    if (end - start).num_minutes() != session_minutes {
        return Err(DropReason::StraddlesTransition);
    }
    Ok(Slot::candidate(start, end, lead_time_offset_minutes))
}

fn boundary(local: NaiveDateTime, tz: &Tz) -> std::result::Result<DateTime<Utc>, DropReason> {
    match timezone::resolve_local(local, tz) {
        LocalResolution::Single(utc) => Ok(utc),
        LocalResolution::Ambiguous { .. } => Err(DropReason::AmbiguousBoundary),
        LocalResolution::Nonexistent => Err(DropReason::NonexistentBoundary),
    }
}

/// The pattern's start on `day`, at minute precision.
fn window_start(day: NaiveDate, pattern: &WeekPattern) -> NaiveDateTime {
    let start = pattern.start_time;
    day.and_time(start) - Duration::seconds(i64::from(start.second()))
        - Duration::nanoseconds(i64::from(start.nanosecond()))
}
