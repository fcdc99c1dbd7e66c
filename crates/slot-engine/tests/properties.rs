//! Property tests for the slot generator and identity assignment.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use proptest::prelude::*;
use slot_engine::identity::assign_ids;
use slot_engine::overlap::{conflicts, remove_conflicting};
use slot_engine::{
    generate_slots, parse_timezone, AvailabilityCriteria, ContributionId, DurationMode, TimeRange,
    WeekPattern,
};

const ZONES: &[&str] = &[
    "UTC",
    "America/New_York",
    "Europe/London",
    "Australia/Sydney",
    "Asia/Kolkata",
    "America/Santiago",
];

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn pattern_strategy() -> impl Strategy<Value = WeekPattern> {
    (
        proptest::sample::subsequence(WEEKDAYS.to_vec(), 1..=7),
        0u32..(24 * 4),
        0u32..(24 * 4),
    )
        .prop_map(|(weekdays, start_q, end_q)| {
            let time = |q: u32| NaiveTime::from_hms_opt(q / 4, (q % 4) * 15, 0).unwrap();
            WeekPattern::new(weekdays, time(start_q), time(end_q))
        })
}

fn criteria_strategy() -> impl Strategy<Value = AvailabilityCriteria> {
    (
        0u32..330,
        0u32..14,
        proptest::collection::vec(pattern_strategy(), 1..4),
        prop_oneof![Just(30i64), Just(45), Just(60), Just(90)],
    )
        .prop_map(|(start_offset, len, week_patterns, session)| {
            let start_day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
                + chrono::Duration::days(i64::from(start_offset));
            AvailabilityCriteria {
                duration_mode: DurationMode::Range {
                    start_day,
                    end_day: start_day + chrono::Duration::days(i64::from(len)),
                },
                week_patterns,
                session_duration_minutes: session,
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_slots_have_session_length(
        criteria in criteria_strategy(),
        zone in proptest::sample::select(ZONES),
        offset in 0i64..120,
    ) {
        let tz = parse_timezone(zone).unwrap();
        let slots = generate_slots(&criteria, &tz, offset, anchor()).unwrap();
        for slot in &slots {
            prop_assert!(slot.start_utc < slot.end_utc);
            prop_assert_eq!(
                (slot.end_utc - slot.start_utc).num_minutes(),
                criteria.session_duration_minutes
            );
        }
    }

    #[test]
    fn generated_slots_never_overlap_and_are_sorted(
        criteria in criteria_strategy(),
        zone in proptest::sample::select(ZONES),
        offset in 0i64..120,
    ) {
        let tz = parse_timezone(zone).unwrap();
        let slots = generate_slots(&criteria, &tz, offset, anchor()).unwrap();
        for pair in slots.windows(2) {
            prop_assert!(pair[0].start_utc <= pair[1].start_utc);
        }
        for (i, a) in slots.iter().enumerate() {
            for b in &slots[i + 1..] {
                prop_assert!(!conflicts(a, b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn regeneration_is_idempotent(
        criteria in criteria_strategy(),
        zone in proptest::sample::select(ZONES),
        offset in 0i64..120,
    ) {
        let tz = parse_timezone(zone).unwrap();
        let contribution = ContributionId::new("prop");

        let mut first = generate_slots(&criteria, &tz, offset, anchor()).unwrap();
        let mut second = generate_slots(&criteria, &tz, offset, anchor()).unwrap();
        assign_ids(&contribution, &mut first);
        assign_ids(&contribution, &mut second);

        prop_assert_eq!(first, second);
    }

    #[test]
    fn filtered_slots_avoid_every_busy_interval(
        criteria in criteria_strategy(),
        busy_starts in proptest::collection::vec(0i64..(400 * 24 * 4), 0..40),
        busy_len in 1i64..(8 * 4),
    ) {
        let tz = parse_timezone("Europe/London").unwrap();
        let slots = generate_slots(&criteria, &tz, 0, anchor()).unwrap();
        let busy: Vec<TimeRange> = busy_starts
            .iter()
            .map(|q| {
                let start = anchor() + chrono::Duration::minutes(q * 15);
                TimeRange { start, end: start + chrono::Duration::minutes(busy_len * 15) }
            })
            .collect();

        let kept = remove_conflicting(slots.clone(), &busy);
        for slot in &kept {
            prop_assert!(busy.iter().all(|b| !conflicts(slot, b)));
        }
        // Removal never invents or reorders.
        let mut remaining = slots.iter();
        for slot in &kept {
            prop_assert!(remaining.any(|s| s == slot));
        }
    }
}
