//! Detect screenings that overlap or crowd a candidate window.
//!
//! Two windows `[s1, e1)` and `[s2, e2)` clash when they overlap, or when
//! they are separated by less than the inter-screening gap on either side.
//! With a zero gap, adjacent windows (one ends exactly when the other
//! starts) do not clash.

use serde::{Deserialize, Serialize};

use crate::model::{MovieId, Screening, ScreeningId, Window};

/// A screening that blocks a candidate window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub screening_id: ScreeningId,
    pub movie_id: MovieId,
    pub movie_title: String,
    pub window: Window,
}

/// Find every screening in `existing` that clashes with `candidate`.
///
/// Only screenings that still occupy the room take part, and `exclude`
/// (the screening being updated) is skipped. All clashes are returned, not
/// just the first.
pub fn find_conflicts<'a>(
    existing: &'a [Screening],
    candidate: &Window,
    gap_minutes: u32,
    exclude: Option<ScreeningId>,
) -> Vec<&'a Screening> {
    existing
        .iter()
        .filter(|s| s.occupies_room() && Some(s.id) != exclude)
        .filter(|s| s.window().clashes_with(candidate, gap_minutes))
        .collect()
}

/// Check a committed set of windows against the pairwise invariant.
///
/// Returns every `(i, j)` index pair that clashes.
pub fn find_violations(windows: &[Window], gap_minutes: u32) -> Vec<(usize, usize)> {
    let mut violations = Vec::new();
    for (i, a) in windows.iter().enumerate() {
        for (j, b) in windows.iter().enumerate().skip(i + 1) {
            if a.clashes_with(b, gap_minutes) {
                violations.push((i, j));
            }
        }
    }
    violations
}
