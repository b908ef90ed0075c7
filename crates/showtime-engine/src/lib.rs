//! # showtime-engine
//!
//! Showtime scheduling and availability for cinema rooms.
//!
//! The engine decides whether a requested screening can exist in a room at a
//! given time, computes its occupied window (runtime plus cleanup buffer),
//! detects clashes with other screenings under an inter-screening gap,
//! suggests free slots when a request is rejected, and periodically retires
//! screenings whose window has elapsed.
//!
//! ## Modules
//!
//! - [`time`] — time-of-day normalization and arithmetic, bounded parse cache
//! - [`model`] — screenings, movies, rooms, windows, slots
//! - [`facts`] — collaborator traits (movie/room/booking facts, screening store)
//! - [`conflict`] — overlap and gap detection
//! - [`slots`] — free-slot enumeration within operating hours
//! - [`engine`] — the scheduling pipeline
//! - [`sweeper`] — periodic expiry of elapsed screenings
//! - [`memory`] — in-memory collaborators with commit-time exclusion
//! - [`config`], [`clock`], [`error`]

pub mod clock;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod facts;
pub mod memory;
pub mod model;
pub mod slots;
pub mod sweeper;
pub mod time;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use conflict::{find_conflicts, Conflict};
pub use engine::{Collaborators, ShowtimeEngine};
pub use error::{ErrorKind, ScheduleError, StoreError};
pub use model::{
    ActorId, BookingStatus, Movie, MovieId, MovieStatus, Room, RoomId, RoomStatus, Screening,
    ScreeningId, ScreeningStatus, ShowtimeRequest, Slot, Window,
};
pub use slots::find_available_slots;
pub use sweeper::{ExpirationSweeper, SweepOutcome};
pub use time::{TimeInput, TimeOfDay};
