//! The three public availability use cases.
//!
//! Each follows the same pipeline:
//!
//! ```text
//! criteria → generate → fetch busy (concurrently) → remove conflicts
//!          → merge booked slots → sort → assign ids → render in display zone
//! ```
//!
//! Calls are all-or-nothing: rejected input and missing records abort with an
//! error, a degraded calendar never does.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::busy::BusyTimeAggregator;
use crate::config::EngineConfig;
use crate::error::{Result, SchedulingError};
use crate::generator::{self, GenerateOptions};
use crate::identity;
use crate::model::{
    AvailabilityCriteria, BookedSlot, ClientId, Coach, CoachId, Contribution, ContributionId, Slot,
};
use crate::overlap;
use crate::ports::{CalendarBusyProvider, ContributionReader, OfferingsLookup, ProfileReader};
use crate::timezone::{self, DisplaySlot, DisplayZone};

/// Whether a coach-facing result is rendered in the coach's zone or in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayPreference {
    #[default]
    CoachLocal,
    Utc,
}

pub struct SchedulingService {
    contributions: Arc<dyn ContributionReader>,
    profiles: Arc<dyn ProfileReader>,
    busy: BusyTimeAggregator,
    options: GenerateOptions,
}

impl SchedulingService {
    pub fn new(
        contributions: Arc<dyn ContributionReader>,
        profiles: Arc<dyn ProfileReader>,
        calendar: Arc<dyn CalendarBusyProvider>,
        offerings: Arc<dyn OfferingsLookup>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            contributions,
            profiles,
            busy: BusyTimeAggregator::new(calendar, offerings, config.calendar_timeout()),
            options: GenerateOptions {
                max_horizon_days: config.max_horizon_days,
            },
        }
    }

    /// Availability of a contribution as its coach sees it.
    ///
    /// Rendered in the coach's zone unless `display` asks for UTC.
    ///
    /// # Errors
    ///
    /// [`SchedulingError::NotFound`] for an unknown contribution or coach,
    /// [`SchedulingError::RejectedInput`] for a negative offset or a
    /// contribution without criteria.
    #[tracing::instrument(skip_all, fields(contribution = %contribution_id, offset = lead_time_offset_minutes))]
    pub async fn get_coach_availability(
        &self,
        contribution_id: &ContributionId,
        lead_time_offset_minutes: i64,
        display: DisplayPreference,
        now: DateTime<Utc>,
    ) -> Result<Vec<DisplaySlot>> {
        let contribution = self.load_contribution(contribution_id).await?;
        let coach = self.load_coach(&contribution.coach_id).await?;
        let coach_tz = timezone::parse_timezone(&coach.timezone)?;
        let criteria = stored_criteria(&contribution)?;

        let slots = self
            .compute(&coach, &coach_tz, criteria, Some(&contribution), lead_time_offset_minutes, now)
            .await?;

        let zone = match display {
            DisplayPreference::CoachLocal => DisplayZone::Zone(coach_tz),
            DisplayPreference::Utc => DisplayZone::Utc,
        };
        Ok(render(&slots, zone))
    }

    /// Availability of a contribution as a client sees it.
    ///
    /// Rendered in `display_zone` when given, else the client's stored zone,
    /// else the coach's. Bookings held by other participants stay visible as
    /// taken time but lose every participant-identifying field.
    ///
    /// # Errors
    ///
    /// As [`get_coach_availability`](Self::get_coach_availability), plus
    /// [`SchedulingError::NotFound`] for an unknown client and
    /// [`SchedulingError::InvalidTimezone`] for an unparseable display zone.
    #[tracing::instrument(skip_all, fields(contribution = %contribution_id, client = %client_id))]
    pub async fn get_client_availability(
        &self,
        contribution_id: &ContributionId,
        client_id: &ClientId,
        lead_time_offset_minutes: i64,
        display_zone: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<DisplaySlot>> {
        let contribution = self.load_contribution(contribution_id).await?;
        let client = self
            .profiles
            .find_client(client_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found("client", client_id.as_str()))?;
        let coach = self.load_coach(&contribution.coach_id).await?;
        let coach_tz = timezone::parse_timezone(&coach.timezone)?;
        let criteria = stored_criteria(&contribution)?;

        let zone_name = display_zone
            .or(client.timezone.as_deref())
            .unwrap_or(coach.timezone.as_str());
        let zone = DisplayZone::Zone(timezone::parse_timezone(zone_name)?);

        let mut slots = self
            .compute(&coach, &coach_tz, criteria, Some(&contribution), lead_time_offset_minutes, now)
            .await?;
        scrub_other_participants(&mut slots, client_id);

        Ok(render(&slots, zone))
    }

    /// Slots for criteria that are not (yet) stored, e.g. a live preview.
    ///
    /// No contribution is read and no bookings are merged; the coach's busy
    /// sources still apply. Ids are derived from [`ContributionId::preview`].
    #[tracing::instrument(skip_all, fields(coach = %coach_id))]
    pub async fn calculate_slots(
        &self,
        coach_id: &CoachId,
        criteria: &AvailabilityCriteria,
        display: DisplayPreference,
        now: DateTime<Utc>,
    ) -> Result<Vec<DisplaySlot>> {
        let coach = self.load_coach(coach_id).await?;
        let coach_tz = timezone::parse_timezone(&coach.timezone)?;

        let slots = self.compute(&coach, &coach_tz, criteria, None, 0, now).await?;

        let zone = match display {
            DisplayPreference::CoachLocal => DisplayZone::Zone(coach_tz),
            DisplayPreference::Utc => DisplayZone::Utc,
        };
        Ok(render(&slots, zone))
    }

    /// The shared pipeline, producing UTC slots with ids assigned.
    async fn compute(
        &self,
        coach: &Coach,
        coach_tz: &Tz,
        criteria: &AvailabilityCriteria,
        contribution: Option<&Contribution>,
        lead_time_offset_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Slot>> {
        let candidates = generator::generate_slots_with_options(
            criteria,
            coach_tz,
            lead_time_offset_minutes,
            now,
            &self.options,
        )?;

        let booked: &[BookedSlot] = contribution
            .map(|c| c.booked_slots.as_slice())
            .unwrap_or_default();
        let busy = self
            .busy
            .collect(coach, contribution.map(|c| &c.id), booked, &candidates)
            .await?;

        let generated = candidates.len();
        let mut slots = overlap::remove_conflicting(candidates, &busy.union());
        let free = slots.len();
        slots.extend(booked_as_slots(booked, lead_time_offset_minutes));
        slots.sort_by_key(|s| s.start_utc);

        let identity_scope = contribution.map_or_else(ContributionId::preview, |c| c.id.clone());
        identity::assign_ids(&identity_scope, &mut slots);

        tracing::debug!(generated, free, total = slots.len(), "availability computed");
        Ok(slots)
    }

    async fn load_contribution(&self, id: &ContributionId) -> Result<Contribution> {
        self.contributions
            .find_contribution(id)
            .await?
            .ok_or_else(|| SchedulingError::not_found("contribution", id.as_str()))
    }

    async fn load_coach(&self, id: &CoachId) -> Result<Coach> {
        self.profiles
            .find_coach(id)
            .await?
            .ok_or_else(|| SchedulingError::not_found("coach", id.as_str()))
    }
}

fn stored_criteria(contribution: &Contribution) -> Result<&AvailabilityCriteria> {
    contribution.criteria.as_ref().ok_or_else(|| {
        SchedulingError::RejectedInput(format!(
            "contribution {} has no availability criteria",
            contribution.id
        ))
    })
}

/// Booked regions as slots, one per booked id, keeping their ids.
pub fn booked_as_slots(booked: &[BookedSlot], lead_time_offset_minutes: i64) -> Vec<Slot> {
    let mut slots: Vec<Slot> = Vec::new();
    for b in booked {
        match slots.iter_mut().find(|s| s.id == Some(b.id)) {
            Some(slot) => slot.booked_sub_slots.push(b.clone()),
            None => slots.push(Slot {
                id: Some(b.id),
                start_utc: b.start_utc,
                end_utc: b.end_utc,
                lead_time_offset_minutes,
                booked_sub_slots: vec![b.clone()],
            }),
        }
    }
    slots
}

/// Strip participant data from bookings that do not belong to `client`.
pub fn scrub_other_participants(slots: &mut [Slot], client: &ClientId) {
    for sub in slots.iter_mut().flat_map(|s| s.booked_sub_slots.iter_mut()) {
        if !sub.belongs_to(client) {
            *sub = sub.scrubbed();
        }
    }
}

fn render(slots: &[Slot], zone: DisplayZone) -> Vec<DisplaySlot> {
    slots.iter().map(|s| zone.render(s)).collect()
}
