//! # slot-engine
//!
//! Deterministic appointment slot computation for one-on-one coaching.
//!
//! Expands a coach's recurring weekly availability into bookable UTC slots,
//! removes anything that collides with the coach's busy time, keeps existing
//! bookings intact, and gives every slot a content-derived id that survives
//! recomputation.
//!
//! ## Modules
//!
//! - [`model`] — criteria, slots, bookings and identifiers
//! - [`timezone`] — fail-closed local ↔ UTC conversion and display rendering
//! - [`overlap`] — interval conflict tests and filtering
//! - [`identity`] — version-5 UUIDs for slots
//! - [`generator`] — weekly pattern → candidate slots
//! - [`busy`] — busy-interval aggregation across sources
//! - [`ports`] — collaborator traits (calendar, storage, profiles)
//! - [`orchestrator`] — coach view, client view and ad-hoc calculation
//! - [`memory`] — in-memory collaborators
//! - [`config`] — engine configuration
//! - [`error`] — Error types

pub mod busy;
pub mod config;
pub mod error;
pub mod generator;
pub mod identity;
pub mod memory;
pub mod model;
pub mod orchestrator;
pub mod overlap;
pub mod ports;
pub mod timezone;

pub use busy::{BusyTimeAggregator, BusyTimes};
pub use config::EngineConfig;
pub use error::SchedulingError;
pub use generator::{generate_slots, generate_slots_with_options, DropReason, GenerateOptions};
pub use identity::{assign_ids, slot_id};
pub use model::{
    AvailabilityCriteria, BookedSlot, BookingMetadata, Client, ClientId, Coach, CoachId,
    Contribution, ContributionId, DurationMode, ParticipantId, Slot, TimeRange, WeekPattern,
};
pub use orchestrator::{DisplayPreference, SchedulingService};
pub use overlap::{conflicts, dedupe, remove_conflicting};
pub use timezone::{
    local_to_utc, parse_timezone, resolve_local, DisplaySlot, DisplayZone, LocalResolution,
};
