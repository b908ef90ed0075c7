//! Enumerate free slots within operating hours.
//!
//! Sorts occupied windows by start time, then walks them left to right with
//! a cursor that starts at opening time. Each gap between the cursor and the
//! next window is tiled with back-to-back `duration + gap` blocks. The part
//! after the last window is tiled up to closing time.

use crate::model::{Slot, Window};
use crate::time::TimeOfDay;

/// Find every slot of `duration_minutes` that fits between `opening` and
/// `closing` without clashing with `occupied` under `gap_minutes`.
///
/// Slots between two windows leave the gap before the next window; the
/// last slot of the day only has to end by `closing`. The result is sorted
/// by start time and is advisory: nothing is reserved.
pub fn find_available_slots(
    occupied: &[Window],
    opening: TimeOfDay,
    closing: TimeOfDay,
    gap_minutes: u32,
    duration_minutes: u32,
) -> Vec<Slot> {
    if duration_minutes == 0 || opening >= closing {
        return Vec::new();
    }

    let mut windows: Vec<Window> = occupied.to_vec();
    windows.sort_by_key(|w| (w.start, w.end));

    let gap = i64::from(gap_minutes) * 60;
    let duration = i64::from(duration_minutes) * 60;
    let closing_secs = secs(closing);

    let mut slots = Vec::new();
    let mut cursor = secs(opening);

    for window in &windows {
        let limit = (secs(window.start) - gap).min(closing_secs);
        tile(&mut slots, cursor, limit, duration, gap);
        cursor = cursor.max(secs(window.end) + gap);
    }

    // Trailing blocks after the last occupied window.
    tile(&mut slots, cursor, closing_secs, duration, gap);

    slots
}

/// Emit blocks starting at `from`, each ending by `to`, spaced by the gap.
fn tile(slots: &mut Vec<Slot>, from: i64, to: i64, duration: i64, gap: i64) {
    let mut start = from;
    while start + duration <= to {
        let (Some(slot_start), Some(slot_end)) = (at(start), at(start + duration)) else {
            break;
        };
        slots.push(Slot {
            start: slot_start,
            end: slot_end,
            duration_minutes: (duration / 60) as u32,
        });
        start += duration + gap;
    }
}

fn secs(time: TimeOfDay) -> i64 {
    i64::from(time.seconds_since_midnight())
}

fn at(seconds: i64) -> Option<TimeOfDay> {
    u32::try_from(seconds)
        .ok()
        .and_then(TimeOfDay::from_seconds_since_midnight)
}
