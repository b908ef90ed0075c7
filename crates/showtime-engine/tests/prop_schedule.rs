//! Property-based tests for window placement and slot suggestion.
//!
//! These hold for any sequence of requests against one room, not just the
//! scenarios in `engine_tests.rs`.

mod common;

use proptest::prelude::*;

use common::{date, Fixture};
use showtime_engine::conflict::find_violations;
use showtime_engine::model::Window;
use showtime_engine::slots::find_available_slots;
use showtime_engine::time::{add_minutes, TimeOfDay};
use showtime_engine::ScreeningStatus;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// A start time on a five-minute grid between 08:00 and 23:55.
fn arb_start() -> impl Strategy<Value = TimeOfDay> {
    (96u32..288).prop_map(|step| TimeOfDay::from_seconds_since_midnight(step * 300).unwrap())
}

fn arb_duration() -> impl Strategy<Value = u32> {
    30u32..=240
}

fn arb_window() -> impl Strategy<Value = Window> {
    (arb_start(), 10u32..=240).prop_filter_map("window crosses midnight", |(start, len)| {
        showtime_engine::time::add_minutes_checked(start, len).map(|end| Window::new(start, end))
    })
}

fn start_text(start: TimeOfDay) -> String {
    format!("{:02}:{:02}", start.hour(), start.minute())
}

// ---------------------------------------------------------------------------
// Engine properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever is accepted, no two scheduled windows in the room clash.
    #[test]
    fn accepted_screenings_never_clash(
        requests in prop::collection::vec((arb_start(), arb_duration()), 1..12)
    ) {
        let fx = Fixture::new();
        let day = date(2026, 3, 12);

        let windows = block_on(async {
            for (start, duration) in &requests {
                let movie = fx.add_movie("Feature", *duration);
                let _ = fx
                    .engine
                    .schedule_showtime(
                        &fx.request_for(&movie, day, &start_text(*start)),
                        fx.actor,
                        false,
                    )
                    .await;
            }
            fx.store
                .all()
                .await
                .into_iter()
                .filter(|s| s.status == ScreeningStatus::Scheduled)
                .map(|s| s.window())
                .collect::<Vec<_>>()
        });

        prop_assert!(find_violations(&windows, 15).is_empty());
        for window in &windows {
            prop_assert!(window.end <= fx.engine.config().closing_time);
        }
    }

    /// In an empty room, a request succeeds exactly when start + runtime +
    /// cleanup fits before closing, and the end time is that sum.
    #[test]
    fn end_time_is_runtime_plus_cleanup(start in arb_start(), duration in arb_duration()) {
        let fx = Fixture::new();
        let movie = fx.add_movie("Feature", duration);
        let day = date(2026, 3, 12);

        let result = block_on(fx.engine.schedule_showtime(
            &fx.request_for(&movie, day, &start_text(start)),
            fx.actor,
            false,
        ));

        let end_seconds = start.seconds_since_midnight() + (duration + 15) * 60;
        let closing = fx.engine.config().closing_time.seconds_since_midnight();
        if end_seconds <= closing {
            let screening = result.unwrap();
            prop_assert_eq!(screening.start_time, start);
            prop_assert_eq!(screening.end_time, add_minutes(start, duration + 15));
        } else {
            prop_assert!(result.is_err());
        }
    }
}

// ---------------------------------------------------------------------------
// Slot properties
// ---------------------------------------------------------------------------

proptest! {
    /// Suggested slots stay inside operating hours, never clash with an
    /// occupied window, and do not overlap each other.
    #[test]
    fn slots_are_free_and_within_hours(
        occupied in prop::collection::vec(arb_window(), 0..6),
        duration in 15u32..=300,
    ) {
        let opening = TimeOfDay::from_hms(9, 0, 0).unwrap();
        let closing = TimeOfDay::from_hms(23, 0, 0).unwrap();
        let slots = find_available_slots(&occupied, opening, closing, 15, duration);

        for slot in &slots {
            let window = Window::from(*slot);
            prop_assert!(slot.start >= opening);
            prop_assert!(slot.end <= closing);
            prop_assert_eq!(window.duration_minutes(), duration);
            for busy in &occupied {
                prop_assert!(!window.clashes_with(busy, 15), "{:?} clashes with {:?}", slot, busy);
            }
        }

        let windows: Vec<Window> = slots.iter().copied().map(Window::from).collect();
        prop_assert!(find_violations(&windows, 15).is_empty());
    }

    /// Slot enumeration depends only on its inputs.
    #[test]
    fn slots_are_deterministic(
        occupied in prop::collection::vec(arb_window(), 0..6),
        duration in 15u32..=300,
    ) {
        let opening = TimeOfDay::from_hms(9, 0, 0).unwrap();
        let closing = TimeOfDay::from_hms(23, 0, 0).unwrap();
        let mut reversed = occupied.clone();
        reversed.reverse();

        prop_assert_eq!(
            find_available_slots(&occupied, opening, closing, 15, duration),
            find_available_slots(&reversed, opening, closing, 15, duration)
        );
    }
}
