//! Collaborator interfaces consumed by the orchestrator.
//!
//! Persistence, profile storage and calendar integrations live outside this
//! crate. Each is reached through one of these traits so the orchestrator can
//! be driven by real adapters or by the in-memory ones in [`crate::memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Client, ClientId, Coach, CoachId, Contribution, ContributionId, TimeRange};

/// Busy times from a coach's linked external calendar.
///
/// Failures are soft: the aggregator logs them and proceeds as if the
/// provider had returned no busy intervals.
#[async_trait]
pub trait CalendarBusyProvider: Send + Sync {
    async fn busy_times(
        &self,
        coach: &CoachId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeRange>>;
}

/// Read side of contribution storage.
#[async_trait]
pub trait ContributionReader: Send + Sync {
    /// Returns `None` when no contribution has this id.
    async fn find_contribution(&self, id: &ContributionId) -> Result<Option<Contribution>>;
}

/// Session times the coach has committed to in other approved offerings.
#[async_trait]
pub trait OfferingsLookup: Send + Sync {
    /// Session ranges across the coach's approved offerings, leaving out
    /// `exclude` (the contribution being queried) when given.
    async fn other_session_times(
        &self,
        coach: &CoachId,
        exclude: Option<&ContributionId>,
    ) -> Result<Vec<TimeRange>>;
}

/// Coach and client profiles (timezone, calendar link).
#[async_trait]
pub trait ProfileReader: Send + Sync {
    async fn find_coach(&self, id: &CoachId) -> Result<Option<Coach>>;

    async fn find_client(&self, id: &ClientId) -> Result<Option<Client>>;
}
