//! Error types for showtime-engine operations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::conflict::Conflict;
use crate::model::{MovieId, ScreeningId, Slot};

/// Entities a request can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    Movie,
    Room,
    Screening,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Movie => "movie",
            Entity::Room => "room",
            Entity::Screening => "screening",
        };
        f.write_str(name)
    }
}

/// Payload-free discriminant of [`ScheduleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    Validation,
    EarlyPremiere,
    Duplicate,
    ScheduleConflict,
    BookingObligation,
    Store,
}

/// Structured rejection returned by the scheduling engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// A referenced movie, room, or screening does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: String },

    /// Malformed time, past scheduling, post-closing end, or an invalid
    /// status transition.
    #[error("{0}")]
    Validation(String),

    /// The date falls between release and premiere. Resubmitting with the
    /// override flag resolves it.
    #[error(
        "movie {movie_id} premieres on {premiere_date}; scheduling it on {show_date} requires an early-premiere override"
    )]
    EarlyPremiere {
        movie_id: MovieId,
        show_date: NaiveDate,
        premiere_date: NaiveDate,
    },

    /// The exact (movie, room, date, start) screening already exists.
    #[error("screening already exists ({existing})")]
    Duplicate { existing: ScreeningId },

    /// The window overlaps or crowds other screenings in the room.
    #[error("{}", describe_conflict(.conflicts, .suggestions))]
    ScheduleConflict {
        conflicts: Vec<Conflict>,
        suggestions: Vec<Slot>,
    },

    /// Active bookings block the change.
    #[error("screening {screening_id} has {count} active booking(s)")]
    BookingObligation { screening_id: ScreeningId, count: u32 },

    /// A collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScheduleError {
    pub fn validation(message: impl Into<String>) -> Self {
        ScheduleError::Validation(message.into())
    }

    pub fn not_found(entity: Entity, id: impl fmt::Display) -> Self {
        ScheduleError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScheduleError::NotFound { .. } => ErrorKind::NotFound,
            ScheduleError::Validation(_) => ErrorKind::Validation,
            ScheduleError::EarlyPremiere { .. } => ErrorKind::EarlyPremiere,
            ScheduleError::Duplicate { .. } => ErrorKind::Duplicate,
            ScheduleError::ScheduleConflict { .. } => ErrorKind::ScheduleConflict,
            ScheduleError::BookingObligation { .. } => ErrorKind::BookingObligation,
            ScheduleError::Store(_) => ErrorKind::Store,
        }
    }

    /// Suggested alternative slots, if this is a schedule conflict.
    #[must_use]
    pub fn suggestions(&self) -> &[Slot] {
        match self {
            ScheduleError::ScheduleConflict { suggestions, .. } => suggestions,
            _ => &[],
        }
    }
}

fn describe_conflict(conflicts: &[Conflict], suggestions: &[Slot]) -> String {
    let clashes: Vec<String> = conflicts
        .iter()
        .map(|c| format!("{} ({}-{})", c.movie_title, c.window.start, c.window.end))
        .collect();
    let mut message = format!("schedule conflict with {}", clashes.join(", "));
    if suggestions.is_empty() {
        message.push_str("; no available slots remain in this room on this date");
    } else {
        let slots: Vec<String> = suggestions
            .iter()
            .map(|s| format!("{}-{}", s.start, s.end))
            .collect();
        message.push_str(&format!("; available slots: {}", slots.join(", ")));
    }
    message
}

/// Failures raised by fact providers and the screening store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("screening {0} not found")]
    NotFound(ScreeningId),

    #[error("screening {0} already exists")]
    AlreadyExists(ScreeningId),

    /// Commit-time uniqueness violation on (movie, room, date, start).
    #[error("duplicate of screening {existing}")]
    DuplicateScreening { existing: ScreeningId },

    /// Commit-time exclusion violation: the window overlaps or crowds these
    /// screenings.
    #[error("window conflicts with screenings [{}]", join_ids(.conflicting))]
    WindowConflict { conflicting: Vec<ScreeningId> },

    /// The row was changed by another writer after the caller read it.
    #[error("screening {id} changed concurrently (read version {expected}, now {found})")]
    StaleWrite {
        id: ScreeningId,
        expected: u64,
        found: u64,
    },

    /// An all-or-nothing batch was rolled back.
    #[error("batch update rolled back for screenings [{}]: {reason}", join_ids(.ids))]
    BatchFailed {
        ids: Vec<ScreeningId>,
        reason: String,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub(crate) fn join_ids(ids: &[ScreeningId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Configuration loading and validation failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A time value that could not be normalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unparseable time value {0:?}")]
pub struct InvalidTime(pub String);

pub type Result<T> = std::result::Result<T, ScheduleError>;
