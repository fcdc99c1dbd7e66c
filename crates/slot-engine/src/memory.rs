//! In-memory collaborators.
//!
//! Back the ports with plain maps so the orchestrator can run without a
//! database or calendar integration: the CLI preview uses them, and so do the
//! tests.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, SchedulingError};
use crate::model::{Client, ClientId, Coach, CoachId, Contribution, ContributionId, TimeRange};
use crate::ports::{CalendarBusyProvider, ContributionReader, OfferingsLookup, ProfileReader};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| SchedulingError::InternalInconsistency("store lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Store ───────────────────────────────────────────────────────────────────

/// Contributions, profiles and offering sessions held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    contributions: RwLock<HashMap<ContributionId, Contribution>>,
    coaches: RwLock<HashMap<CoachId, Coach>>,
    clients: RwLock<HashMap<ClientId, Client>>,
    sessions: RwLock<HashMap<CoachId, Vec<(ContributionId, TimeRange)>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_contribution(&self, contribution: Contribution) {
        write(&self.contributions).insert(contribution.id.clone(), contribution);
    }

    pub fn insert_coach(&self, coach: Coach) {
        write(&self.coaches).insert(coach.id.clone(), coach);
    }

    pub fn insert_client(&self, client: Client) {
        write(&self.clients).insert(client.id.clone(), client);
    }

    /// Record a session the coach holds in one of their approved offerings.
    pub fn add_offering_session(&self, coach: &CoachId, contribution: &ContributionId, range: TimeRange) {
        write(&self.sessions)
            .entry(coach.clone())
            .or_default()
            .push((contribution.clone(), range));
    }
}

#[async_trait]
impl ContributionReader for InMemoryStore {
    async fn find_contribution(&self, id: &ContributionId) -> Result<Option<Contribution>> {
        Ok(read(&self.contributions)?.get(id).cloned())
    }
}

#[async_trait]
impl ProfileReader for InMemoryStore {
    async fn find_coach(&self, id: &CoachId) -> Result<Option<Coach>> {
        Ok(read(&self.coaches)?.get(id).cloned())
    }

    async fn find_client(&self, id: &ClientId) -> Result<Option<Client>> {
        Ok(read(&self.clients)?.get(id).cloned())
    }
}

#[async_trait]
impl OfferingsLookup for InMemoryStore {
    async fn other_session_times(
        &self,
        coach: &CoachId,
        exclude: Option<&ContributionId>,
    ) -> Result<Vec<TimeRange>> {
        let sessions = read(&self.sessions)?;
        Ok(sessions
            .get(coach)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(contribution, _)| Some(contribution) != exclude)
                    .map(|(_, range)| *range)
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ── Calendars ───────────────────────────────────────────────────────────────

/// A calendar returning the fixed busy ranges of a coach that overlap or
/// touch the requested span, unclipped.
///
/// Records every request so callers can check what was asked for.
#[derive(Debug, Default)]
pub struct StaticCalendar {
    busy: RwLock<HashMap<CoachId, Vec<TimeRange>>>,
    requests: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
}

impl StaticCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_busy(&self, coach: &CoachId, range: TimeRange) {
        write(&self.busy).entry(coach.clone()).or_default().push(range);
    }

    /// `(start, end)` of each lookup made so far.
    pub fn requests(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CalendarBusyProvider for StaticCalendar {
    async fn busy_times(
        &self,
        coach: &CoachId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeRange>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((start, end));
        }
        let busy = read(&self.busy)?;
        Ok(busy
            .get(coach)
            .map(|ranges| {
                ranges
                    .iter()
                    .filter(|r| r.start <= end && r.end >= start)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// A calendar integration that is always unreachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingCalendar;

#[async_trait]
impl CalendarBusyProvider for FailingCalendar {
    async fn busy_times(
        &self,
        coach: &CoachId,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<TimeRange>> {
        Err(SchedulingError::DependencyDegraded(format!(
            "calendar integration unreachable for coach {coach}"
        )))
    }
}

/// A calendar that answers only after `delay`.
#[derive(Debug, Clone)]
pub struct DelayedCalendar {
    delay: Duration,
    busy: Vec<TimeRange>,
}

impl DelayedCalendar {
    pub fn new(delay: Duration, busy: Vec<TimeRange>) -> Self {
        Self { delay, busy }
    }
}

#[async_trait]
impl CalendarBusyProvider for DelayedCalendar {
    async fn busy_times(
        &self,
        _coach: &CoachId,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<TimeRange>> {
        tokio::time::sleep(self.delay).await;
        Ok(self.busy.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 16, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_missing_records_are_none() {
        let store = InMemoryStore::new();
        assert!(store
            .find_contribution(&ContributionId::new("nope"))
            .await
            .unwrap()
            .is_none());
        assert!(store.find_coach(&CoachId::new("nope")).await.unwrap().is_none());
        assert!(store.find_client(&ClientId::new("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_static_calendar_returns_overlapping_ranges() {
        let calendar = StaticCalendar::new();
        let coach = CoachId::new("coach-1");
        calendar.add_busy(&coach, TimeRange { start: at(8), end: at(9) });
        calendar.add_busy(&coach, TimeRange { start: at(20), end: at(21) });

        let busy = calendar.busy_times(&coach, at(9), at(12)).await.unwrap();
        assert_eq!(busy, vec![TimeRange { start: at(8), end: at(9) }]);
        assert_eq!(calendar.requests(), vec![(at(9), at(12))]);
    }

    #[tokio::test]
    async fn test_failing_calendar_reports_degraded() {
        let result = FailingCalendar
            .busy_times(&CoachId::new("coach-1"), at(9), at(10))
            .await;
        assert!(matches!(result, Err(SchedulingError::DependencyDegraded(_))));
    }
}
