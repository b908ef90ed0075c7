//! In-memory collaborators.
//!
//! [`InMemoryScreeningStore`] performs the commit-time exclusion check inside
//! its write lock, so two commits racing for one room and date serialize and
//! at most one wins.
//!
//! Every row carries a version. `update` and `batch_hide` only apply to rows
//! still at the version the caller read.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use tokio::sync::RwLock as AsyncRwLock;

use crate::conflict;
use crate::error::StoreError;
use crate::facts::{
    BatchHide, BookingFacts, MovieFacts, RoomFacts, ScreeningStore, StoreResult,
};
use crate::model::{
    BookingStatus, Movie, MovieId, MovieStatus, Room, RoomId, Screening, ScreeningId,
    ScreeningStatus,
};
use crate::time::TimeOfDay;

/// Movie, room, and booking facts held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    movies: RwLock<HashMap<MovieId, Movie>>,
    rooms: RwLock<HashMap<RoomId, (Room, u32)>>,
    bookings: RwLock<HashMap<ScreeningId, Vec<BookingStatus>>>,
    unavailable_bookings: RwLock<HashSet<ScreeningId>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_movie(&self, movie: Movie) {
        write(&self.movies).insert(movie.id, movie);
    }

    pub fn movie(&self, id: MovieId) -> Option<Movie> {
        read(&self.movies).get(&id).cloned()
    }

    pub fn set_movie_status(&self, id: MovieId, status: MovieStatus) {
        if let Some(movie) = write(&self.movies).get_mut(&id) {
            movie.status = status;
        }
    }

    pub fn insert_room(&self, room: Room, active_seats: u32) {
        write(&self.rooms).insert(room.id, (room, active_seats));
    }

    pub fn add_booking(&self, screening_id: ScreeningId, status: BookingStatus) {
        write(&self.bookings)
            .entry(screening_id)
            .or_default()
            .push(status);
    }

    /// Make booking counts for the screening fail, or succeed again.
    pub fn set_bookings_unavailable(&self, screening_id: ScreeningId, unavailable: bool) {
        let mut failing = write(&self.unavailable_bookings);
        if unavailable {
            failing.insert(screening_id);
        } else {
            failing.remove(&screening_id);
        }
    }

    /// Move every booking on the screening from one status to another.
    pub fn transition_bookings(
        &self,
        screening_id: ScreeningId,
        from: BookingStatus,
        to: BookingStatus,
    ) {
        if let Some(bookings) = write(&self.bookings).get_mut(&screening_id) {
            bookings
                .iter_mut()
                .filter(|status| **status == from)
                .for_each(|status| *status = to);
        }
    }
}

#[async_trait]
impl MovieFacts for InMemoryCatalog {
    async fn get_movie(&self, id: MovieId) -> StoreResult<Option<Movie>> {
        Ok(self.movie(id))
    }

    async fn mark_now_showing(&self, id: MovieId) -> StoreResult<()> {
        if let Some(movie) = write(&self.movies).get_mut(&id) {
            if movie.status == MovieStatus::ComingSoon {
                movie.status = MovieStatus::NowShowing;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RoomFacts for InMemoryCatalog {
    async fn get_room(&self, id: RoomId) -> StoreResult<Option<Room>> {
        Ok(read(&self.rooms).get(&id).map(|(room, _)| room.clone()))
    }

    async fn active_seat_count(&self, id: RoomId) -> StoreResult<u32> {
        Ok(read(&self.rooms).get(&id).map_or(0, |(_, seats)| *seats))
    }
}

#[async_trait]
impl BookingFacts for InMemoryCatalog {
    async fn count_bookings(
        &self,
        screening_id: ScreeningId,
        statuses: &[BookingStatus],
    ) -> StoreResult<u32> {
        if read(&self.unavailable_bookings).contains(&screening_id) {
            return Err(StoreError::Unavailable(format!(
                "bookings for screening {screening_id} are unavailable"
            )));
        }
        let count = read(&self.bookings)
            .get(&screening_id)
            .map_or(0, |bookings| {
                bookings.iter().filter(|s| statuses.contains(*s)).count()
            });
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

/// Screening store that enforces the room/date exclusion constraint on
/// every write.
#[derive(Debug)]
pub struct InMemoryScreeningStore {
    gap_minutes: u32,
    screenings: AsyncRwLock<HashMap<ScreeningId, Screening>>,
    fail_batches: AtomicBool,
}

impl InMemoryScreeningStore {
    pub fn new(gap_minutes: u32) -> Self {
        Self {
            gap_minutes,
            screenings: AsyncRwLock::new(HashMap::new()),
            fail_batches: AtomicBool::new(false),
        }
    }

    /// Insert without any constraint check, e.g. to load historical rows.
    pub async fn seed(&self, screening: Screening) {
        self.screenings.write().await.insert(screening.id, screening);
    }

    pub async fn all(&self) -> Vec<Screening> {
        let mut all: Vec<Screening> = self.screenings.read().await.values().cloned().collect();
        all.sort_by_key(|s| (s.show_date, s.room_id, s.start_time));
        all
    }

    /// Make every subsequent `batch_hide` roll back.
    pub fn fail_batches(&self, fail: bool) {
        self.fail_batches.store(fail, Ordering::Release);
    }

    fn check_exclusion(
        &self,
        screenings: &HashMap<ScreeningId, Screening>,
        candidate: &Screening,
    ) -> StoreResult<()> {
        if !candidate.occupies_room() {
            return Ok(());
        }
        let same_room: Vec<Screening> = screenings
            .values()
            .filter(|s| {
                s.id != candidate.id
                    && s.room_id == candidate.room_id
                    && s.show_date == candidate.show_date
            })
            .cloned()
            .collect();

        if let Some(existing) = same_room.iter().find(|s| {
            s.occupies_room()
                && s.movie_id == candidate.movie_id
                && s.start_time == candidate.start_time
        }) {
            return Err(StoreError::DuplicateScreening {
                existing: existing.id,
            });
        }

        let clashing =
            conflict::find_conflicts(&same_room, &candidate.window(), self.gap_minutes, None);
        if clashing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::WindowConflict {
                conflicting: clashing.iter().map(|s| s.id).collect(),
            })
        }
    }
}

#[async_trait]
impl ScreeningStore for InMemoryScreeningStore {
    async fn get(&self, id: ScreeningId) -> StoreResult<Option<Screening>> {
        Ok(self.screenings.read().await.get(&id).cloned())
    }

    async fn list_by_room_and_date(
        &self,
        room_id: RoomId,
        show_date: NaiveDate,
    ) -> StoreResult<Vec<Screening>> {
        let mut found: Vec<Screening> = self
            .screenings
            .read()
            .await
            .values()
            .filter(|s| s.room_id == room_id && s.show_date == show_date)
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.start_time, s.end_time));
        Ok(found)
    }

    async fn find_duplicate(
        &self,
        movie_id: MovieId,
        room_id: RoomId,
        show_date: NaiveDate,
        start_time: TimeOfDay,
    ) -> StoreResult<Option<Screening>> {
        Ok(self
            .screenings
            .read()
            .await
            .values()
            .find(|s| {
                s.occupies_room()
                    && s.movie_id == movie_id
                    && s.room_id == room_id
                    && s.show_date == show_date
                    && s.start_time == start_time
            })
            .cloned())
    }

    async fn create(&self, screening: Screening) -> StoreResult<Screening> {
        let mut screenings = self.screenings.write().await;
        if screenings.contains_key(&screening.id) {
            return Err(StoreError::AlreadyExists(screening.id));
        }
        self.check_exclusion(&screenings, &screening)?;
        screenings.insert(screening.id, screening.clone());
        Ok(screening)
    }

    async fn update(&self, mut screening: Screening) -> StoreResult<Screening> {
        let mut screenings = self.screenings.write().await;
        let found = screenings
            .get(&screening.id)
            .map(|stored| stored.version)
            .ok_or(StoreError::NotFound(screening.id))?;
        if found != screening.version {
            return Err(StoreError::StaleWrite {
                id: screening.id,
                expected: screening.version,
                found,
            });
        }
        self.check_exclusion(&screenings, &screening)?;
        screening.version = found + 1;
        screenings.insert(screening.id, screening.clone());
        Ok(screening)
    }

    async fn batch_hide(
        &self,
        expected: &[Screening],
        at: DateTime<Utc>,
    ) -> StoreResult<BatchHide> {
        let mut screenings = self.screenings.write().await;
        if self.fail_batches.load(Ordering::Acquire) {
            return Err(StoreError::BatchFailed {
                ids: expected.iter().map(|s| s.id).collect(),
                reason: "injected failure".to_string(),
            });
        }

        let mut outcome = BatchHide::default();
        for read in expected {
            match screenings.get_mut(&read.id) {
                Some(stored)
                    if stored.version == read.version
                        && stored.status == ScreeningStatus::Scheduled =>
                {
                    stored.status = ScreeningStatus::Hidden;
                    stored.updated_at = at;
                    stored.version += 1;
                    outcome.hidden.push(read.id);
                }
                _ => outcome.stale.push(read.id),
            }
        }
        Ok(outcome)
    }

    async fn list_expirable(&self, today: NaiveDate) -> StoreResult<Vec<Screening>> {
        let mut found: Vec<Screening> = self
            .screenings
            .read()
            .await
            .values()
            .filter(|s| s.show_date <= today && s.status == ScreeningStatus::Scheduled)
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.show_date, s.start_time));
        Ok(found)
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
