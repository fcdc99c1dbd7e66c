//! Value types shared by every stage of slot computation.
//!
//! Everything here is plain data: criteria are coach-edited configuration,
//! [`Slot`]s are ephemeral per-request candidates, and [`BookedSlot`]s are
//! persisted state owned by the booking subsystem that this crate only reads.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SchedulingError};

// ── Identifiers ─────────────────────────────────────────────────────────────

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a contribution (a coach's one-on-one offering).
    ContributionId
);
string_id!(CoachId);
string_id!(
    /// Identifier of a client. Booked slots record the client as participant.
    ClientId
);

pub type ParticipantId = ClientId;

impl ContributionId {
    /// Id used for ad-hoc previews that are not backed by a stored contribution.
    pub fn preview() -> Self {
        Self("preview".to_string())
    }
}

// ── TimeRange ───────────────────────────────────────────────────────────────

/// A half-open UTC interval. Every busy-time source is reduced to these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range, rejecting `end < start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(SchedulingError::RejectedInput(format!(
                "time range ends before it starts: {start} > {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Anything with a UTC start and end that can take part in overlap tests.
pub trait Interval {
    fn start(&self) -> DateTime<Utc>;
    fn end(&self) -> DateTime<Utc>;
}

impl Interval for TimeRange {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }

    fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

// ── Criteria ────────────────────────────────────────────────────────────────

/// Which calendar days a criteria set covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DurationMode {
    /// Explicit inclusive range of local calendar dates.
    Range {
        start_day: NaiveDate,
        end_day: NaiveDate,
    },
    /// `days` calendar days starting with the coach's local "today".
    Rolling { days: u32 },
}

impl DurationMode {
    /// Resolve to an inclusive local date range, or `None` when the range is
    /// empty (inverted explicit range, or a zero-day rolling window).
    pub fn resolve(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match *self {
            DurationMode::Range { start_day, end_day } => {
                (end_day >= start_day).then_some((start_day, end_day))
            }
            DurationMode::Rolling { days } => {
                let span = u64::from(days).checked_sub(1)?;
                let last = today.checked_add_days(chrono::Days::new(span))?;
                Some((today, last))
            }
        }
    }
}

/// The length of one day's availability window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyWindow {
    /// Start and end fall on the same local date.
    SameDay { minutes: i64 },
    /// End time is before start time: the window runs past local midnight.
    Overnight { minutes: i64 },
}

impl DailyWindow {
    pub fn minutes(&self) -> i64 {
        match *self {
            DailyWindow::SameDay { minutes } | DailyWindow::Overnight { minutes } => minutes,
        }
    }
}

/// A recurring weekly window in the coach's local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekPattern {
    pub weekdays: Vec<Weekday>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl WeekPattern {
    pub fn new(weekdays: Vec<Weekday>, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            weekdays,
            start_time,
            end_time,
        }
    }

    pub fn matches(&self, weekday: Weekday) -> bool {
        self.weekdays.contains(&weekday)
    }

    /// Window length at minute precision, wrapping past midnight when the end
    /// time is earlier than the start time.
    pub fn window(&self) -> DailyWindow {
        let minutes = minute_of_day(self.end_time) - minute_of_day(self.start_time);
        if minutes < 0 {
            DailyWindow::Overnight {
                minutes: minutes + 24 * 60,
            }
        } else {
            DailyWindow::SameDay { minutes }
        }
    }
}

fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight() / 60)
}

/// A coach's stored availability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityCriteria {
    pub duration_mode: DurationMode,
    pub week_patterns: Vec<WeekPattern>,
    pub session_duration_minutes: i64,
}

impl AvailabilityCriteria {
    /// Reject criteria that cannot produce a meaningful grid.
    ///
    /// Inverted explicit ranges are *not* rejected: they simply generate nothing.
    pub fn validate(&self) -> Result<()> {
        if self.session_duration_minutes <= 0 {
            return Err(SchedulingError::RejectedInput(format!(
                "session duration must be positive, got {} minutes",
                self.session_duration_minutes
            )));
        }
        if let Some(index) = self.week_patterns.iter().position(|p| p.weekdays.is_empty()) {
            return Err(SchedulingError::RejectedInput(format!(
                "week pattern {index} names no weekdays"
            )));
        }
        Ok(())
    }
}

// ── Slots ───────────────────────────────────────────────────────────────────

/// Booking details carried alongside a booked region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A persisted booking. Owned by the booking subsystem; never regenerated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedSlot {
    pub id: Uuid,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub participant_id: Option<ParticipantId>,
    #[serde(default)]
    pub metadata: BookingMetadata,
}

impl BookedSlot {
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start_utc,
            end: self.end_utc,
        }
    }

    pub fn belongs_to(&self, client: &ClientId) -> bool {
        self.participant_id.as_ref() == Some(client)
    }

    /// The same region with every participant-identifying field removed.
    pub fn scrubbed(&self) -> BookedSlot {
        BookedSlot {
            participant_id: None,
            metadata: BookingMetadata::default(),
            ..self.clone()
        }
    }
}

/// A bookable (or booked) window in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: Option<Uuid>,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub lead_time_offset_minutes: i64,
    #[serde(default)]
    pub booked_sub_slots: Vec<BookedSlot>,
}

impl Slot {
    /// A freshly generated candidate without an id.
    pub fn candidate(
        start_utc: DateTime<Utc>,
        end_utc: DateTime<Utc>,
        lead_time_offset_minutes: i64,
    ) -> Self {
        Self {
            id: None,
            start_utc,
            end_utc,
            lead_time_offset_minutes,
            booked_sub_slots: Vec::new(),
        }
    }

    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start_utc,
            end: self.end_utc,
        }
    }
}

impl Interval for Slot {
    fn start(&self) -> DateTime<Utc> {
        self.start_utc
    }

    fn end(&self) -> DateTime<Utc> {
        self.end_utc
    }
}

// ── Collaborator read models ────────────────────────────────────────────────

/// The slice of a stored contribution this crate needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub coach_id: CoachId,
    pub criteria: Option<AvailabilityCriteria>,
    #[serde(default)]
    pub booked_slots: Vec<BookedSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coach {
    pub id: CoachId,
    /// IANA timezone name.
    pub timezone: String,
    #[serde(default)]
    pub calendar_linked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_window_same_day() {
        let p = WeekPattern::new(vec![Weekday::Mon], t(9, 0), t(10, 30));
        assert_eq!(p.window(), DailyWindow::SameDay { minutes: 90 });
    }

    #[test]
    fn test_window_overnight_wraps() {
        let p = WeekPattern::new(vec![Weekday::Fri], t(22, 0), t(1, 0));
        assert_eq!(p.window(), DailyWindow::Overnight { minutes: 180 });
    }

    #[test]
    fn test_window_equal_times_is_empty() {
        let p = WeekPattern::new(vec![Weekday::Fri], t(9, 0), t(9, 0));
        assert_eq!(p.window().minutes(), 0);
    }

    #[test]
    fn test_resolve_inverted_range_is_empty() {
        let mode = DurationMode::Range {
            start_day: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            end_day: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
        };
        assert_eq!(mode.resolve(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()), None);
    }

    #[test]
    fn test_resolve_rolling_includes_today() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let (start, end) = DurationMode::Rolling { days: 7 }.resolve(today).unwrap();
        assert_eq!(start, today);
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 3, 7).unwrap());
        assert_eq!(DurationMode::Rolling { days: 0 }.resolve(today), None);
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let criteria = AvailabilityCriteria {
            duration_mode: DurationMode::Rolling { days: 7 },
            week_patterns: vec![],
            session_duration_minutes: 0,
        };
        assert!(matches!(
            criteria.validate(),
            Err(SchedulingError::RejectedInput(_))
        ));
    }

    #[test]
    fn test_criteria_deserializes_from_json() {
        let json = r#"{
            "duration_mode": {"mode": "range", "start_day": "2026-03-02", "end_day": "2026-03-08"},
            "week_patterns": [{"weekdays": ["Mon", "Wed"], "start_time": "09:00:00", "end_time": "10:00:00"}],
            "session_duration_minutes": 30
        }"#;
        let criteria: AvailabilityCriteria = serde_json::from_str(json).unwrap();
        assert_eq!(criteria.week_patterns[0].weekdays, vec![Weekday::Mon, Weekday::Wed]);
        assert_eq!(criteria.session_duration_minutes, 30);
    }

    #[test]
    fn test_scrubbed_removes_participant() {
        let booked = BookedSlot {
            id: Uuid::nil(),
            start_utc: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
            end_utc: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
            participant_id: Some(ClientId::new("client-1")),
            metadata: BookingMetadata {
                booked_at: None,
                note: Some("first session".to_string()),
            },
        };
        let scrubbed = booked.scrubbed();
        assert_eq!(scrubbed.participant_id, None);
        assert_eq!(scrubbed.metadata, BookingMetadata::default());
        assert_eq!(scrubbed.range(), booked.range());
    }

    #[test]
    fn test_time_range_rejects_inverted() {
        let a = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        assert!(TimeRange::new(a, b).is_err());
        assert_eq!(TimeRange::new(b, a).unwrap().duration_minutes(), 60);
    }
}
