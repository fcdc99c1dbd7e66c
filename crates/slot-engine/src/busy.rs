//! Aggregation of busy intervals from every source.
//!
//! Three sources are unioned before conflict filtering:
//!
//! 1. the coach's external calendar (soft dependency, see below);
//! 2. sessions from the coach's other approved offerings;
//! 3. bookings already made on the contribution being queried.
//!
//! The calendar and other-offerings reads are independent and run
//! concurrently. A calendar that is unlinked, errors, or exceeds the lookup
//! timeout contributes nothing; the call proceeds and the event is logged.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{BookedSlot, Coach, ContributionId, Slot, TimeRange};
use crate::ports::{CalendarBusyProvider, OfferingsLookup};

/// Busy intervals per source, kept apart for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusyTimes {
    pub calendar: Vec<TimeRange>,
    pub other_offerings: Vec<TimeRange>,
    pub booked: Vec<TimeRange>,
    /// The calendar lookup failed or timed out and contributed nothing.
    pub calendar_degraded: bool,
}

impl BusyTimes {
    /// Every busy interval from every source.
    pub fn union(&self) -> Vec<TimeRange> {
        self.calendar
            .iter()
            .chain(&self.other_offerings)
            .chain(&self.booked)
            .copied()
            .collect()
    }
}

/// The UTC span covered by a candidate set, or `None` when it is empty.
pub fn candidate_span(candidates: &[Slot]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = candidates.iter().map(|s| s.start_utc).min()?;
    let end = candidates.iter().map(|s| s.end_utc).max()?;
    Some((start, end))
}

pub struct BusyTimeAggregator {
    calendar: Arc<dyn CalendarBusyProvider>,
    offerings: Arc<dyn OfferingsLookup>,
    calendar_timeout: Duration,
}

impl BusyTimeAggregator {
    pub fn new(
        calendar: Arc<dyn CalendarBusyProvider>,
        offerings: Arc<dyn OfferingsLookup>,
        calendar_timeout: Duration,
    ) -> Self {
        Self {
            calendar,
            offerings,
            calendar_timeout,
        }
    }

    /// Gather busy intervals relevant to `candidates`.
    ///
    /// # Errors
    ///
    /// Only the other-offerings lookup can fail the call; calendar problems
    /// are absorbed into [`BusyTimes::calendar_degraded`].
    pub async fn collect(
        &self,
        coach: &Coach,
        queried: Option<&ContributionId>,
        booked: &[BookedSlot],
        candidates: &[Slot],
    ) -> Result<BusyTimes> {
        let (calendar, other_offerings) = futures::join!(
            self.calendar_busy(coach, candidates),
            self.offerings.other_session_times(&coach.id, queried),
        );
        let (calendar, calendar_degraded) = calendar;

        let busy = BusyTimes {
            calendar,
            other_offerings: other_offerings?,
            booked: booked.iter().map(BookedSlot::range).collect(),
            calendar_degraded,
        };
        tracing::debug!(
            coach = %coach.id,
            calendar = busy.calendar.len(),
            other_offerings = busy.other_offerings.len(),
            booked = busy.booked.len(),
            calendar_degraded,
            "collected busy intervals"
        );
        Ok(busy)
    }

    /// Calendar busy times over the candidates' span, plus whether the lookup
    /// degraded. Never fails.
    async fn calendar_busy(&self, coach: &Coach, candidates: &[Slot]) -> (Vec<TimeRange>, bool) {
        if !coach.calendar_linked {
            return (Vec::new(), false);
        }
        let Some((start, end)) = candidate_span(candidates) else {
            return (Vec::new(), false);
        };

        let lookup = self.calendar.busy_times(&coach.id, start, end);
        match tokio::time::timeout(self.calendar_timeout, lookup).await {
            Ok(Ok(busy)) => (busy, false),
            Ok(Err(e)) => {
                tracing::warn!(coach = %coach.id, error = %e, "calendar busy-time lookup failed, treating as free");
                (Vec::new(), true)
            }
            Err(_) => {
                tracing::warn!(
                    coach = %coach.id,
                    timeout_ms = self.calendar_timeout.as_millis() as u64,
                    "calendar busy-time lookup timed out, treating as free"
                );
                (Vec::new(), true)
            }
        }
    }
}
