//! Tests for time-of-day normalization and arithmetic.

use std::cmp::Ordering;

use showtime_engine::time::{
    add_minutes, add_minutes_checked, compare, normalize, normalize_text,
    to_minutes_since_midnight, TimeCache, TimeInput, TimeOfDay,
};

fn t(text: &str) -> TimeOfDay {
    normalize_text(text).unwrap()
}

#[test]
fn wall_clock_strings_normalize_to_hh_mm_ss() {
    assert_eq!(t("9:00").to_string(), "09:00:00");
    assert_eq!(t("09:05").to_string(), "09:05:00");
    assert_eq!(t("21:30:15").to_string(), "21:30:15");
    assert_eq!(t(" 7:45 ").to_string(), "07:45:00");
}

#[test]
fn fractional_seconds_are_dropped() {
    assert_eq!(t("10:15:30.250").to_string(), "10:15:30");
}

#[test]
fn components_normalize() {
    let input = TimeInput::Components {
        hour: 14,
        minute: 5,
        second: None,
    };
    assert_eq!(normalize(&input).unwrap().to_string(), "14:05:00");

    let with_seconds = TimeInput::Components {
        hour: 8,
        minute: 0,
        second: Some(9),
    };
    assert_eq!(normalize(&with_seconds).unwrap().to_string(), "08:00:09");
}

#[test]
fn timestamps_keep_the_literal_clock_value() {
    // The offset must not shift the clock value.
    assert_eq!(t("2024-01-05T14:30:00+07:00").to_string(), "14:30:00");
    assert_eq!(t("2024-01-05T14:30:00Z").to_string(), "14:30:00");
    assert_eq!(t("2024-01-05T14:30:00.000-05:00").to_string(), "14:30:00");
    assert_eq!(t("2024-01-05 18:45:00").to_string(), "18:45:00");
    assert_eq!(t("2024-01-05T18:45").to_string(), "18:45:00");
}

#[test]
fn malformed_values_yield_none() {
    for bad in ["", "   ", "25:00", "10:60", "10:5", "abc", "10:00:00:00", "1000", "-1:00", "10:00:"] {
        assert!(normalize_text(bad).is_none(), "{bad:?} should not normalize");
    }
    let bad_components = TimeInput::Components {
        hour: 24,
        minute: 0,
        second: None,
    };
    assert!(normalize(&bad_components).is_none());
}

#[test]
fn json_inputs_deserialize_as_either_shape() {
    let text: TimeInput = serde_json::from_str(r#""19:30""#).unwrap();
    assert_eq!(text, TimeInput::Text("19:30".into()));

    let object: TimeInput = serde_json::from_str(r#"{"hour": 19, "minute": 30}"#).unwrap();
    assert_eq!(normalize(&object).unwrap().to_string(), "19:30:00");
}

#[test]
fn time_of_day_serializes_as_canonical_string() {
    let json = serde_json::to_string(&t("9:05")).unwrap();
    assert_eq!(json, r#""09:05:00""#);
    let back: TimeOfDay = serde_json::from_str(&json).unwrap();
    assert_eq!(back, t("09:05:00"));
}

#[test]
fn add_minutes_round_trip() {
    let start = normalize(&TimeInput::from("09:00")).unwrap();
    let end = add_minutes(start, 135);
    assert_eq!(normalize_text(&end.to_string()).unwrap().to_string(), "11:15:00");
}

#[test]
fn add_minutes_wraps_past_midnight() {
    assert_eq!(add_minutes(t("23:50"), 35).to_string(), "00:25:00");
    assert_eq!(add_minutes(t("00:00"), 24 * 60).to_string(), "00:00:00");
}

#[test]
fn checked_addition_rejects_crossing_midnight() {
    assert_eq!(add_minutes_checked(t("23:50"), 35), None);
    assert_eq!(add_minutes_checked(t("23:00"), 59), Some(t("23:59")));
    assert_eq!(add_minutes_checked(t("23:00"), 60), None);
}

#[test]
fn compare_orders_times() {
    assert_eq!(compare(t("09:00"), t("10:00")), Ordering::Less);
    assert_eq!(compare(t("10:00:00"), t("10:00")), Ordering::Equal);
    assert_eq!(compare(t("10:00:01"), t("10:00")), Ordering::Greater);
}

#[test]
fn minutes_since_midnight() {
    assert_eq!(to_minutes_since_midnight(t("00:00")), 0);
    assert_eq!(to_minutes_since_midnight(t("12:15:59")), 735);
    assert_eq!(to_minutes_since_midnight(t("23:59")), 1439);
}

#[test]
fn cache_returns_same_result_and_evicts_oldest() {
    let mut cache = TimeCache::new(2);
    assert_eq!(cache.normalize_text("9:00"), Some(t("09:00")));
    assert_eq!(cache.normalize_text("9:00"), Some(t("09:00")));
    assert_eq!(cache.len(), 1);

    assert_eq!(cache.normalize_text("bogus"), None);
    assert_eq!(cache.len(), 2);

    cache.normalize_text("10:00");
    assert_eq!(cache.len(), 2);
    assert!(!cache.contains("9:00"), "oldest entry should be evicted");
    assert!(cache.contains("bogus"));
    assert!(cache.contains("10:00"));
}

#[test]
fn separate_caches_do_not_share_state() {
    let mut a = TimeCache::new(4);
    let b = TimeCache::new(4);
    a.normalize_text("11:00");
    assert!(a.contains("11:00"));
    assert!(b.is_empty());
}

#[test]
fn zero_capacity_cache_still_holds_one_entry() {
    let mut cache = TimeCache::new(0);
    assert_eq!(cache.capacity(), 1);
    assert_eq!(cache.normalize_text("9:00"), Some(t("09:00")));
    assert_eq!(cache.normalize_text("10:00"), Some(t("10:00")));
    assert_eq!(cache.len(), 1);
    assert!(cache.contains("10:00"));
}
