//! Domain types for screenings and the movie/room facts they depend on.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::time::{TimeInput, TimeOfDay};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Server-assigned screening identifier.
    ScreeningId
);
uuid_id!(MovieId);
uuid_id!(RoomId);
uuid_id!(
    /// The staff member issuing a request.
    ActorId
);

/// Lifecycle status of a screening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreeningStatus {
    Scheduled,
    /// Retired. Never hard-deleted.
    Hidden,
    Cancelled,
}

impl fmt::Display for ScreeningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScreeningStatus::Scheduled => "scheduled",
            ScreeningStatus::Hidden => "hidden",
            ScreeningStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A half-open occupied window `[start, end)` within one show date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Window {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        debug_assert!(start <= end, "window start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    pub fn duration_minutes(&self) -> u32 {
        self.end
            .seconds_since_midnight()
            .saturating_sub(self.start.seconds_since_midnight())
            / 60
    }

    /// Standard half-open overlap test.
    pub fn overlaps(&self, other: &Window) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when the windows overlap or sit closer than `gap_minutes` apart.
    pub fn clashes_with(&self, other: &Window, gap_minutes: u32) -> bool {
        let gap = i64::from(gap_minutes) * 60;
        let (s1, e1) = seconds(self);
        let (s2, e2) = seconds(other);
        s1 < e2 + gap && s2 < e1 + gap
    }
}

fn seconds(window: &Window) -> (i64, i64) {
    (
        i64::from(window.start.seconds_since_midnight()),
        i64::from(window.end.seconds_since_midnight()),
    )
}

/// A free start/end pair that could host a screening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub duration_minutes: u32,
}

impl From<Slot> for Window {
    fn from(slot: Slot) -> Self {
        Window::new(slot.start, slot.end)
    }
}

/// One scheduled exhibition of a movie in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screening {
    pub id: ScreeningId,
    pub movie_id: MovieId,
    pub room_id: RoomId,
    pub show_date: NaiveDate,
    pub start_time: TimeOfDay,
    /// Always derived: start + runtime + cleanup buffer.
    pub end_time: TimeOfDay,
    pub status: ScreeningStatus,
    /// Active seat count of the room when the screening was committed.
    pub capacity_available: u32,
    pub created_by: ActorId,
    pub updated_by: ActorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by the store on every successful update. Writes carry the
    /// version they read and are refused if the row has moved on.
    #[serde(default)]
    pub version: u64,
}

impl Screening {
    pub fn window(&self) -> Window {
        Window::new(self.start_time, self.end_time)
    }

    /// Whether the screening holds its room. Hidden and cancelled screenings
    /// release their window for reuse.
    pub fn occupies_room(&self) -> bool {
        self.status == ScreeningStatus::Scheduled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovieStatus {
    ComingSoon,
    NowShowing,
    Inactive,
}

/// Read-only movie facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub duration_minutes: u32,
    pub release_date: NaiveDate,
    pub premiere_date: Option<NaiveDate>,
    pub status: MovieStatus,
}

impl Movie {
    /// True when `date` falls on or after release but before a distinct,
    /// later premiere date.
    pub fn is_premiere_gated(&self, date: NaiveDate) -> bool {
        match self.premiere_date {
            Some(premiere) if premiere > self.release_date => {
                self.release_date <= date && date < premiere
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomStatus {
    Active,
    Maintenance,
    Closed,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoomStatus::Active => "active",
            RoomStatus::Maintenance => "maintenance",
            RoomStatus::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Read-only room facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub operational_status: RoomStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Used,
}

impl BookingStatus {
    /// Statuses that block rescheduling.
    pub const ACTIVE: [BookingStatus; 2] = [BookingStatus::Pending, BookingStatus::Confirmed];
}

/// A create or update request as received from the controller layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowtimeRequest {
    pub movie_id: MovieId,
    pub room_id: RoomId,
    pub show_date: NaiveDate,
    pub start_time: TimeInput,
}
