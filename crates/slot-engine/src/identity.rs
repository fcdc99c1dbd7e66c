//! Content-derived slot identifiers.
//!
//! A slot's id is a version-5 (name-based, SHA-1) UUID over
//! `"{contribution_id}/{start}/{end}"`, so recomputing the same grid always
//! yields the same ids without persisting anything. Ids already carried by
//! booked slots are never recomputed.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{ContributionId, Slot};

/// Namespace under which every slot id is derived.
pub const SLOT_NAMESPACE: Uuid = Uuid::from_u128(0x6f0c2d1e_8b4a_5c3f_9e71_2a4db8c60f15);

/// Appended to the hash input when a derived id is already taken in a batch.
pub const COLLISION_SUFFIX: &str = "/rescheduled";

/// Locale-invariant rendering of a slot boundary.
pub fn format_boundary(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// The hash input for a slot, before any collision suffix.
pub fn identity_key(
    contribution_id: &ContributionId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> String {
    format!(
        "{}/{}/{}",
        contribution_id,
        format_boundary(start),
        format_boundary(end)
    )
}

/// Deterministic id for `(contribution_id, start, end)`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use slot_engine::identity::slot_id;
/// use slot_engine::model::ContributionId;
///
/// let contribution = ContributionId::new("c-42");
/// let start = Utc.with_ymd_and_hms(2026, 3, 16, 13, 0, 0).unwrap();
/// let end = Utc.with_ymd_and_hms(2026, 3, 16, 13, 30, 0).unwrap();
/// assert_eq!(slot_id(&contribution, start, end), slot_id(&contribution, start, end));
/// assert_eq!(slot_id(&contribution, start, end).get_version_num(), 5);
/// ```
pub fn slot_id(contribution_id: &ContributionId, start: DateTime<Utc>, end: DateTime<Utc>) -> Uuid {
    Uuid::new_v5(
        &SLOT_NAMESPACE,
        identity_key(contribution_id, start, end).as_bytes(),
    )
}

/// Give every id-less slot its content-derived id.
///
/// Slots that already carry an id keep it. When a derived id is already
/// present in the batch, [`COLLISION_SUFFIX`] is appended to the key and the
/// hash recomputed until the id is unique; the loop terminates in practice
/// after at most one extra round.
pub fn assign_ids(contribution_id: &ContributionId, slots: &mut [Slot]) {
    let mut taken: HashSet<Uuid> = slots.iter().filter_map(|s| s.id).collect();

    for slot in slots.iter_mut().filter(|s| s.id.is_none()) {
        let mut key = identity_key(contribution_id, slot.start_utc, slot.end_utc);
        let mut id = Uuid::new_v5(&SLOT_NAMESPACE, key.as_bytes());
        while taken.contains(&id) {
            tracing::debug!(%id, key = %key, "slot id collision, salting");
            key.push_str(COLLISION_SUFFIX);
            id = Uuid::new_v5(&SLOT_NAMESPACE, key.as_bytes());
        }
        taken.insert(id);
        slot.id = Some(id);
    }
}
