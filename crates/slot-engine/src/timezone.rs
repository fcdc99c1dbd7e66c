//! DST-safe conversion between UTC and local wall-clock time.
//!
//! All slot arithmetic happens in UTC. Local times only enter through the
//! coach's weekly pattern and only leave through display rendering.
//!
//! # Fail-closed conversion
//!
//! A local wall-clock time can map to zero instants (spring-forward gap) or
//! two instants (fall-back overlap). [`resolve_local`] reports all three cases
//! as an explicit [`LocalResolution`]; [`local_to_utc`] is the error mode built
//! on top of it and never picks an instant on the caller's behalf.

use chrono::{
    DateTime, Datelike, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::{Result, SchedulingError};
use crate::model::{BookedSlot, Slot};

// ── Local → UTC ─────────────────────────────────────────────────────────────

/// Outcome of mapping a local wall-clock time onto the UTC timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalResolution {
    /// Exactly one instant.
    Single(DateTime<Utc>),
    /// The local time occurs twice (clocks moved back).
    Ambiguous {
        earliest: DateTime<Utc>,
        latest: DateTime<Utc>,
    },
    /// The local time is skipped (clocks moved forward).
    Nonexistent,
}

/// Map a naive local datetime in `tz` to UTC, reporting every outcome.
pub fn resolve_local(local: NaiveDateTime, tz: &Tz) -> LocalResolution {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => LocalResolution::Single(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(a, b) => {
            let (a, b) = (a.with_timezone(&Utc), b.with_timezone(&Utc));
            LocalResolution::Ambiguous {
                earliest: a.min(b),
                latest: a.max(b),
            }
        }
        LocalResult::None => LocalResolution::Nonexistent,
    }
}

/// Convert a naive local datetime in `tz` to UTC, failing on DST edges.
///
/// # Errors
///
/// Returns [`SchedulingError::AmbiguousLocalTime`] inside a fall-back overlap
/// and [`SchedulingError::NonexistentLocalTime`] inside a spring-forward gap.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use slot_engine::timezone::{local_to_utc, parse_timezone};
///
/// let tz = parse_timezone("America/New_York").unwrap();
/// let local = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let utc = local_to_utc(local, &tz).unwrap();
/// assert_eq!(utc.to_rfc3339(), "2026-03-16T13:00:00+00:00");
///
/// // 02:30 on the spring-forward date does not exist.
/// let gap = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap().and_hms_opt(2, 30, 0).unwrap();
/// assert!(local_to_utc(gap, &tz).is_err());
/// ```
pub fn local_to_utc(local: NaiveDateTime, tz: &Tz) -> Result<DateTime<Utc>> {
    match resolve_local(local, tz) {
        LocalResolution::Single(utc) => Ok(utc),
        LocalResolution::Ambiguous { .. } => Err(SchedulingError::AmbiguousLocalTime(format!(
            "{local} in {}",
            tz.name()
        ))),
        LocalResolution::Nonexistent => Err(SchedulingError::NonexistentLocalTime(format!(
            "{local} in {}",
            tz.name()
        ))),
    }
}

/// The UTC instant at which local calendar date `date` begins in `tz`.
///
/// Midnight when it exists unambiguously, the earlier instant when midnight
/// repeats, and the first existing minute after midnight when it falls in a
/// gap (some zones switch DST at 00:00).
pub fn start_of_local_day(date: NaiveDate, tz: &Tz) -> Result<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
        SchedulingError::RejectedInput(format!("cannot build midnight for {date}"))
    })?;
    for minute in 0..(24 * 60) {
        let local = midnight + chrono::Duration::minutes(minute);
        match resolve_local(local, tz) {
            LocalResolution::Single(utc) => return Ok(utc),
            LocalResolution::Ambiguous { earliest, .. } => return Ok(earliest),
            LocalResolution::Nonexistent => continue,
        }
    }
    Err(SchedulingError::NonexistentLocalTime(format!(
        "no local time exists on {date} in {}",
        tz.name()
    )))
}

// ── UTC → local ─────────────────────────────────────────────────────────────

/// Express a UTC instant in `tz`.
pub fn to_local(utc: DateTime<Utc>, tz: &Tz) -> DateTime<Tz> {
    utc.with_timezone(tz)
}

/// The local calendar date in `tz` at instant `now`.
pub fn local_today(now: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    to_local(now, tz).date_naive()
}

// ── Display ─────────────────────────────────────────────────────────────────

/// The zone in which computed slots are rendered for a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayZone {
    Utc,
    Zone(Tz),
}

impl DisplayZone {
    pub fn name(&self) -> &'static str {
        match self {
            DisplayZone::Utc => "UTC",
            DisplayZone::Zone(tz) => tz.name(),
        }
    }

    fn fixed(&self, utc: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            DisplayZone::Utc => utc.with_timezone(&Utc.fix()),
            DisplayZone::Zone(tz) => {
                let local = to_local(utc, tz);
                local.with_timezone(&local.offset().fix())
            }
        }
    }

    /// Render a UTC slot in this zone.
    pub fn render(&self, slot: &Slot) -> DisplaySlot {
        let start = self.fixed(slot.start_utc);
        let dst_active = match self {
            DisplayZone::Utc => false,
            DisplayZone::Zone(tz) => is_dst_active(&start, tz),
        };
        DisplaySlot {
            id: slot.id,
            start,
            end: self.fixed(slot.end_utc),
            timezone: self.name().to_string(),
            utc_offset: format_utc_offset(&start),
            dst_active,
            lead_time_offset_minutes: slot.lead_time_offset_minutes,
            booked_sub_slots: slot.booked_sub_slots.clone(),
        }
    }
}

/// A slot expressed in a caller's display zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySlot {
    pub id: Option<Uuid>,
    /// Local start, serialized as RFC 3339 with a numeric offset.
    #[serde(serialize_with = "rfc3339")]
    pub start: DateTime<FixedOffset>,
    #[serde(serialize_with = "rfc3339")]
    pub end: DateTime<FixedOffset>,
    /// The IANA timezone name used, or `"UTC"`.
    pub timezone: String,
    /// The UTC offset at the slot start (e.g., "-05:00").
    pub utc_offset: String,
    /// Whether Daylight Saving Time is active at the slot start.
    pub dst_active: bool,
    pub lead_time_offset_minutes: i64,
    pub booked_sub_slots: Vec<BookedSlot>,
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Parse an IANA timezone string into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz> {
    s.parse::<Tz>()
        .map_err(|_| SchedulingError::InvalidTimezone(format!("'{}'", s)))
}

/// Determine if DST is active for a datetime in a timezone.
///
/// Standard time is the smaller of the January 1 and July 1 offsets.
fn is_dst_active<T: TimeZone>(dt: &DateTime<T>, tz: &Tz) -> bool {
    let year = dt.with_timezone(&Utc).year();
    let offset_on = |month: u32| {
        Utc.with_ymd_and_hms(year, month, 1, 12, 0, 0)
            .single()
            .map(|instant| instant.with_timezone(tz).offset().fix().local_minus_utc())
    };
    let current_offset = dt.offset().fix().local_minus_utc();
    match (offset_on(1), offset_on(7)) {
        (Some(jan), Some(jul)) => current_offset > jan.min(jul),
        _ => false,
    }
}

/// RFC 3339 with `+00:00` rather than `Z` for a zero offset.
fn rfc3339<S: Serializer>(
    dt: &DateTime<FixedOffset>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&dt.to_rfc3339())
}

/// Format the UTC offset as a string (e.g., "-05:00", "+09:00").
fn format_utc_offset<T: TimeZone>(dt: &DateTime<T>) -> String {
    let offset_secs = dt.offset().fix().local_minus_utc();
    let sign = if offset_secs >= 0 { "+" } else { "-" };
    let abs_secs = offset_secs.unsigned_abs();
    let hours = abs_secs / 3600;
    let minutes = (abs_secs % 3600) / 60;
    format!("{sign}{hours:02}:{minutes:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ny() -> Tz {
        parse_timezone("America/New_York").unwrap()
    }

    fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_resolve_single() {
        let result = resolve_local(naive(2026, 1, 15, 9, 0), &ny());
        assert_eq!(
            result,
            LocalResolution::Single(Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_resolve_spring_forward_gap_is_nonexistent() {
        // March 8 2026: 02:00 EST jumps to 03:00 EDT.
        let result = resolve_local(naive(2026, 3, 8, 2, 30), &ny());
        assert_eq!(result, LocalResolution::Nonexistent);
    }

    #[test]
    fn test_resolve_fall_back_overlap_is_ambiguous() {
        // November 1 2026: 01:30 happens in EDT and again in EST.
        let result = resolve_local(naive(2026, 11, 1, 1, 30), &ny());
        assert_eq!(
            result,
            LocalResolution::Ambiguous {
                earliest: Utc.with_ymd_and_hms(2026, 11, 1, 5, 30, 0).unwrap(),
                latest: Utc.with_ymd_and_hms(2026, 11, 1, 6, 30, 0).unwrap(),
            }
        );
    }

    #[test]
    fn test_local_to_utc_fails_closed() {
        let tz = ny();
        let gap = local_to_utc(naive(2026, 3, 8, 2, 30), &tz);
        assert!(matches!(gap, Err(SchedulingError::NonexistentLocalTime(_))));
        let overlap = local_to_utc(naive(2026, 11, 1, 1, 30), &tz);
        assert!(matches!(overlap, Err(SchedulingError::AmbiguousLocalTime(_))));
    }

    #[test]
    fn test_start_of_local_day_regular() {
        let start = start_of_local_day(NaiveDate::from_ymd_opt(2026, 3, 16).unwrap(), &ny()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 16, 4, 0, 0).unwrap());
    }

    #[test]
    fn test_start_of_local_day_skips_midnight_gap() {
        // Santiago springs forward at local midnight: 2026-09-06 00:00 does not exist.
        let tz = parse_timezone("America/Santiago").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 9, 6).unwrap();
        assert_eq!(
            resolve_local(date.and_hms_opt(0, 0, 0).unwrap(), &tz),
            LocalResolution::Nonexistent
        );
        let start = start_of_local_day(date, &tz).unwrap();
        assert_eq!(to_local(start, &tz).date_naive(), date);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 9, 6, 4, 0, 0).unwrap());
    }

    #[test]
    fn test_local_today_crosses_date_line() {
        let tz = parse_timezone("Pacific/Auckland").unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 20, 0, 0).unwrap();
        assert_eq!(local_today(now, &tz), NaiveDate::from_ymd_opt(2026, 3, 16).unwrap());
    }

    #[test]
    fn test_render_in_zone() {
        let slot = Slot::candidate(
            Utc.with_ymd_and_hms(2026, 3, 16, 13, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 16, 13, 30, 0).unwrap(),
            0,
        );
        let view = DisplayZone::Zone(ny()).render(&slot);
        assert_eq!(view.start.to_rfc3339(), "2026-03-16T09:00:00-04:00");
        assert_eq!(view.end.to_rfc3339(), "2026-03-16T09:30:00-04:00");
        assert_eq!(view.timezone, "America/New_York");
        assert_eq!(view.utc_offset, "-04:00");
        assert!(view.dst_active);
    }

    #[test]
    fn test_render_in_utc() {
        let slot = Slot::candidate(
            Utc.with_ymd_and_hms(2026, 1, 5, 13, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 5, 13, 30, 0).unwrap(),
            0,
        );
        let view = DisplayZone::Utc.render(&slot);
        assert_eq!(view.start.to_rfc3339(), "2026-01-05T13:00:00+00:00");
        assert_eq!(view.utc_offset, "+00:00");
        assert!(!view.dst_active);
    }

    #[test]
    fn test_invalid_timezone_returns_error() {
        let result = parse_timezone("Mars/Olympus");
        assert!(matches!(result, Err(SchedulingError::InvalidTimezone(_))));
    }

    #[test]
    fn test_dst_active_southern_hemisphere() {
        let tz = parse_timezone("Australia/Sydney").unwrap();
        let zone = DisplayZone::Zone(tz);
        let july = Utc.with_ymd_and_hms(2026, 7, 6, 0, 0, 0).unwrap();
        let january = Utc.with_ymd_and_hms(2026, 1, 6, 0, 0, 0).unwrap();

        let winter = zone.render(&Slot::candidate(july, july + chrono::Duration::minutes(30), 0));
        assert_eq!(winter.utc_offset, "+10:00");
        assert!(!winter.dst_active);

        let summer = zone.render(&Slot::candidate(january, january + chrono::Duration::minutes(30), 0));
        assert_eq!(summer.utc_offset, "+11:00");
        assert!(summer.dst_active);
    }

    #[test]
    fn test_dst_never_active_without_transitions() {
        let tz = parse_timezone("Asia/Kolkata").unwrap();
        let at = Utc.with_ymd_and_hms(2026, 7, 6, 0, 0, 0).unwrap();
        let view = DisplayZone::Zone(tz).render(&Slot::candidate(at, at + chrono::Duration::minutes(30), 0));
        assert!(!view.dst_active);
    }

    #[test]
    fn test_zero_offset_serializes_numerically() {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 13, 0, 0).unwrap();
        let slot = Slot::candidate(start, start + chrono::Duration::minutes(30), 0);

        let utc = serde_json::to_value(DisplayZone::Utc.render(&slot)).unwrap();
        assert_eq!(utc["start"], "2026-01-05T13:00:00+00:00");
        assert_eq!(utc["end"], "2026-01-05T13:30:00+00:00");

        let london = DisplayZone::Zone(parse_timezone("Europe/London").unwrap());
        let json = serde_json::to_value(london.render(&slot)).unwrap();
        assert_eq!(json["start"], "2026-01-05T13:00:00+00:00");
    }

    #[test]
    fn test_start_of_local_day_ambiguous_midnight_takes_earliest() {
        // Havana falls back from 01:00 CDT to 00:00 CST on 2026-11-01, so
        // 00:00 happens twice.
        let tz = parse_timezone("America/Havana").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        assert_eq!(
            resolve_local(date.and_hms_opt(0, 0, 0).unwrap(), &tz),
            LocalResolution::Ambiguous {
                earliest: Utc.with_ymd_and_hms(2026, 11, 1, 4, 0, 0).unwrap(),
                latest: Utc.with_ymd_and_hms(2026, 11, 1, 5, 0, 0).unwrap(),
            }
        );
        let start = start_of_local_day(date, &tz).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 11, 1, 4, 0, 0).unwrap());
    }
}
