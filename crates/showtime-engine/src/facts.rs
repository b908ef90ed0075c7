//! Collaborator interfaces the engine consumes.
//!
//! Movie, room, and booking facts are read-only lookups owned by other
//! parts of the application. The screening store is the one mutable
//! collaborator; its `create` and `update` must reject a window that breaks
//! the per-room non-overlap invariant at commit time, not just rely on the
//! engine's earlier read.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreError;
use crate::model::{BookingStatus, Movie, MovieId, Room, RoomId, Screening, ScreeningId};
use crate::time::TimeOfDay;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// What [`ScreeningStore::batch_hide`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchHide {
    /// Rows moved from scheduled to hidden.
    pub hidden: Vec<ScreeningId>,
    /// Rows skipped because they changed after they were read.
    pub stale: Vec<ScreeningId>,
}

#[async_trait]
pub trait MovieFacts: Send + Sync {
    async fn get_movie(&self, id: MovieId) -> StoreResult<Option<Movie>>;

    /// Move a `ComingSoon` movie to `NowShowing`. Idempotent.
    async fn mark_now_showing(&self, id: MovieId) -> StoreResult<()>;
}

#[async_trait]
pub trait RoomFacts: Send + Sync {
    async fn get_room(&self, id: RoomId) -> StoreResult<Option<Room>>;

    async fn active_seat_count(&self, id: RoomId) -> StoreResult<u32>;
}

#[async_trait]
pub trait BookingFacts: Send + Sync {
    /// Number of bookings on the screening in any of `statuses`.
    async fn count_bookings(
        &self,
        screening_id: ScreeningId,
        statuses: &[BookingStatus],
    ) -> StoreResult<u32>;
}

#[async_trait]
pub trait ScreeningStore: Send + Sync {
    async fn get(&self, id: ScreeningId) -> StoreResult<Option<Screening>>;

    /// Every screening in the room on that date, any status, sorted by start.
    async fn list_by_room_and_date(
        &self,
        room_id: RoomId,
        show_date: NaiveDate,
    ) -> StoreResult<Vec<Screening>>;

    /// An exact (movie, room, date, start) match that still occupies the room.
    async fn find_duplicate(
        &self,
        movie_id: MovieId,
        room_id: RoomId,
        show_date: NaiveDate,
        start_time: TimeOfDay,
    ) -> StoreResult<Option<Screening>>;

    /// Persist a new screening.
    ///
    /// Fails with [`StoreError::DuplicateScreening`] or
    /// [`StoreError::WindowConflict`] when another committed screening
    /// already holds the slot.
    async fn create(&self, screening: Screening) -> StoreResult<Screening>;

    /// Replace an existing screening, enforcing the same constraint as
    /// [`create`](Self::create) while it stays scheduled.
    ///
    /// `screening.version` must equal the stored version, otherwise the
    /// write fails with [`StoreError::StaleWrite`]. The returned row carries
    /// the bumped version.
    async fn update(&self, screening: Screening) -> StoreResult<Screening>;

    /// Hide every row in `expected` that is still scheduled at the version it
    /// was read at, in one unit of work. Rows that changed since are left
    /// alone and reported as stale.
    async fn batch_hide(
        &self,
        expected: &[Screening],
        at: DateTime<Utc>,
    ) -> StoreResult<BatchHide>;

    /// Scheduled screenings with `show_date <= today`.
    async fn list_expirable(&self, today: NaiveDate) -> StoreResult<Vec<Screening>>;
}
