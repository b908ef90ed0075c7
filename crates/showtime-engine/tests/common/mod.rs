//! Shared fixture: one active room, one movie, a pinned clock.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use showtime_engine::facts::{BatchHide, ScreeningStore, StoreResult};
use showtime_engine::memory::{InMemoryCatalog, InMemoryScreeningStore};
use showtime_engine::time::normalize_text;
use showtime_engine::{
    ActorId, Collaborators, EngineConfig, FixedClock, Movie, MovieId, MovieStatus, Room, RoomId,
    RoomStatus, ScheduleError, Screening, ScreeningId, ScreeningStatus, ShowtimeEngine,
    ShowtimeRequest, TimeOfDay,
};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// The fixture clock's current date.
pub fn today() -> NaiveDate {
    date(2026, 3, 10)
}

pub fn t(text: &str) -> TimeOfDay {
    normalize_text(text).unwrap()
}

/// A UTC instant on `day` at `hh:mm`.
pub fn at(day: NaiveDate, time: &str) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(t(time).as_naive()))
}

pub fn movie(title: &str, duration_minutes: u32) -> Movie {
    Movie {
        id: MovieId::new(),
        title: title.to_string(),
        duration_minutes,
        release_date: date(2026, 1, 1),
        premiere_date: None,
        status: MovieStatus::NowShowing,
    }
}

pub struct Fixture {
    pub engine: Arc<ShowtimeEngine>,
    pub catalog: Arc<InMemoryCatalog>,
    pub store: Arc<InMemoryScreeningStore>,
    pub clock: Arc<FixedClock>,
    pub room: Room,
    pub movie: Movie,
    pub actor: ActorId,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(InMemoryScreeningStore::new(config.inter_screening_gap_minutes));
        Self::with_store(config, store.clone(), store)
    }

    /// Build around `screenings`, which may wrap `store`.
    pub fn with_store(
        config: EngineConfig,
        screenings: Arc<dyn ScreeningStore>,
        store: Arc<InMemoryScreeningStore>,
    ) -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        let clock = Arc::new(FixedClock::new(at(today(), "08:00")));

        let room = Room {
            id: RoomId::new(),
            name: "Hall 1".to_string(),
            operational_status: RoomStatus::Active,
        };
        catalog.insert_room(room.clone(), 120);

        let feature = movie("Dune", 120);
        catalog.insert_movie(feature.clone());

        let engine = Arc::new(ShowtimeEngine::new(
            Collaborators {
                movies: catalog.clone(),
                rooms: catalog.clone(),
                bookings: catalog.clone(),
                screenings,
                clock: clock.clone(),
            },
            config,
        ));

        Self {
            engine,
            catalog,
            store,
            clock,
            room,
            movie: feature,
            actor: ActorId::new(),
        }
    }

    /// A fixture whose store parks the first call of `gate` until released.
    pub fn gated(gate: Gate) -> (Self, Arc<GatedStore>) {
        let config = EngineConfig::default();
        let inner = Arc::new(InMemoryScreeningStore::new(config.inter_screening_gap_minutes));
        let gated = Arc::new(GatedStore::new(inner.clone(), gate));
        (Self::with_store(config, gated.clone(), inner), gated)
    }

    pub fn add_movie(&self, title: &str, duration_minutes: u32) -> Movie {
        let added = movie(title, duration_minutes);
        self.catalog.insert_movie(added.clone());
        added
    }

    pub fn request(&self, day: NaiveDate, start: &str) -> ShowtimeRequest {
        self.request_for(&self.movie, day, start)
    }

    pub fn request_for(&self, movie: &Movie, day: NaiveDate, start: &str) -> ShowtimeRequest {
        ShowtimeRequest {
            movie_id: movie.id,
            room_id: self.room.id,
            show_date: day,
            start_time: start.into(),
        }
    }

    pub async fn schedule(&self, day: NaiveDate, start: &str) -> Result<Screening, ScheduleError> {
        self.engine
            .schedule_showtime(&self.request(day, start), self.actor, false)
            .await
    }

    /// A screening row for seeding, bypassing the engine.
    pub fn screening(
        &self,
        day: NaiveDate,
        start: &str,
        end: &str,
        status: ScreeningStatus,
    ) -> Screening {
        let now = self.clock_now();
        Screening {
            id: ScreeningId::new(),
            movie_id: self.movie.id,
            room_id: self.room.id,
            show_date: day,
            start_time: t(start),
            end_time: t(end),
            status,
            capacity_available: 120,
            created_by: self.actor,
            updated_by: self.actor,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    fn clock_now(&self) -> DateTime<Utc> {
        use showtime_engine::Clock;
        self.clock.now()
    }
}

/// Store operations a [`GatedStore`] can park.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Get,
    BatchHide,
    ListExpirable,
}

/// Delegates to an in-memory store, but the first call of the gated
/// operation signals `entered` and waits for `release`.
pub struct GatedStore {
    inner: Arc<InMemoryScreeningStore>,
    gate: Mutex<Option<Gate>>,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedStore {
    pub fn new(inner: Arc<InMemoryScreeningStore>, gate: Gate) -> Self {
        Self {
            inner,
            gate: Mutex::new(Some(gate)),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    async fn pass(&self, op: Gate) {
        let parked = {
            let mut gate = self.gate.lock().unwrap();
            if *gate == Some(op) {
                *gate = None;
                true
            } else {
                false
            }
        };
        if parked {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl ScreeningStore for GatedStore {
    async fn get(&self, id: ScreeningId) -> StoreResult<Option<Screening>> {
        let found = self.inner.get(id).await;
        self.pass(Gate::Get).await;
        found
    }

    async fn list_by_room_and_date(
        &self,
        room_id: RoomId,
        show_date: NaiveDate,
    ) -> StoreResult<Vec<Screening>> {
        self.inner.list_by_room_and_date(room_id, show_date).await
    }

    async fn find_duplicate(
        &self,
        movie_id: MovieId,
        room_id: RoomId,
        show_date: NaiveDate,
        start_time: TimeOfDay,
    ) -> StoreResult<Option<Screening>> {
        self.inner
            .find_duplicate(movie_id, room_id, show_date, start_time)
            .await
    }

    async fn create(&self, screening: Screening) -> StoreResult<Screening> {
        self.inner.create(screening).await
    }

    async fn update(&self, screening: Screening) -> StoreResult<Screening> {
        self.inner.update(screening).await
    }

    async fn batch_hide(
        &self,
        expected: &[Screening],
        at: DateTime<Utc>,
    ) -> StoreResult<BatchHide> {
        self.pass(Gate::BatchHide).await;
        self.inner.batch_hide(expected, at).await
    }

    async fn list_expirable(&self, today: NaiveDate) -> StoreResult<Vec<Screening>> {
        self.pass(Gate::ListExpirable).await;
        self.inner.list_expirable(today).await
    }
}
