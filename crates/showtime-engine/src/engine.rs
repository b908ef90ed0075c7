//! The scheduling engine: validates, places, updates, and retires screenings.
//!
//! Every create request runs the same pipeline, stopping at the first
//! failure:
//!
//! 1. fact validation (movie, active room, seats configured)
//! 2. not in the past (venue time)
//! 3. end time = start + runtime + cleanup, not after closing
//! 4. premiere gating, unless overridden
//! 5. duplicate check
//! 6. conflict check, with slot suggestions on failure
//! 7. commit
//! 8. promote a `ComingSoon` movie once it is showing
//!
//! Updates rerun steps 1-3 and 6 after confirming the screening has no
//! active bookings. The conflict read is advisory; the store enforces the
//! invariant again at commit and a lost race is reported as a conflict.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::conflict::{self, Conflict};
use crate::error::{join_ids, Entity, Result, ScheduleError, StoreError};
use crate::facts::{BookingFacts, MovieFacts, RoomFacts, ScreeningStore};
use crate::model::{
    ActorId, BookingStatus, Movie, MovieStatus, Room, RoomId, RoomStatus, Screening,
    ScreeningId, ScreeningStatus, ShowtimeRequest, Slot, Window,
};
use crate::slots;
use crate::sweeper;
use crate::time::{self, TimeCache, TimeInput, TimeOfDay};

/// Everything the engine reads from or writes to.
#[derive(Clone)]
pub struct Collaborators {
    pub movies: Arc<dyn MovieFacts>,
    pub rooms: Arc<dyn RoomFacts>,
    pub bookings: Arc<dyn BookingFacts>,
    pub screenings: Arc<dyn ScreeningStore>,
    pub clock: Arc<dyn Clock>,
}

/// A request that passed fact, temporal, and closing-time validation.
#[derive(Debug, Clone)]
struct Placement {
    movie: Movie,
    room: Room,
    seats: u32,
    show_date: NaiveDate,
    window: Window,
}

pub struct ShowtimeEngine {
    movies: Arc<dyn MovieFacts>,
    rooms: Arc<dyn RoomFacts>,
    bookings: Arc<dyn BookingFacts>,
    screenings: Arc<dyn ScreeningStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    time_cache: Mutex<TimeCache>,
}

impl ShowtimeEngine {
    pub fn new(collaborators: Collaborators, config: EngineConfig) -> Self {
        let time_cache = Mutex::new(TimeCache::new(config.time_cache_capacity));
        Self {
            movies: collaborators.movies,
            rooms: collaborators.rooms,
            bookings: collaborators.bookings,
            screenings: collaborators.screenings,
            clock: collaborators.clock,
            config,
            time_cache,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The current wall-clock reading in the venue's timezone.
    pub fn venue_now(&self) -> NaiveDateTime {
        self.clock
            .now()
            .with_timezone(&self.config.venue_timezone)
            .naive_local()
    }

    pub async fn get_showtime(&self, id: ScreeningId) -> Result<Screening> {
        self.screenings
            .get(id)
            .await?
            .ok_or_else(|| ScheduleError::not_found(Entity::Screening, id))
    }

    /// Validate and commit a new screening.
    ///
    /// # Errors
    ///
    /// Returns the first failing check of the pipeline as a structured
    /// [`ScheduleError`]. On a schedule conflict the error carries up to
    /// `max_suggestions` free slots for the same room and date.
    pub async fn schedule_showtime(
        &self,
        request: &ShowtimeRequest,
        actor: ActorId,
        override_early_premiere: bool,
    ) -> Result<Screening> {
        let result = self
            .try_schedule(request, actor, override_early_premiere)
            .await;
        if let Err(err) = &result {
            debug!(
                kind = ?err.kind(),
                movie_id = %request.movie_id,
                room_id = %request.room_id,
                show_date = %request.show_date,
                error = %err,
                "schedule request rejected"
            );
        }
        result
    }

    async fn try_schedule(
        &self,
        request: &ShowtimeRequest,
        actor: ActorId,
        override_early_premiere: bool,
    ) -> Result<Screening> {
        let placement = self.validate_placement(request).await?;

        if let Some(premiere_date) = placement.movie.premiere_date {
            if !override_early_premiere && placement.movie.is_premiere_gated(request.show_date) {
                return Err(ScheduleError::EarlyPremiere {
                    movie_id: placement.movie.id,
                    show_date: request.show_date,
                    premiere_date,
                });
            }
        }

        if let Some(existing) = self
            .screenings
            .find_duplicate(
                placement.movie.id,
                placement.room.id,
                placement.show_date,
                placement.window.start,
            )
            .await?
        {
            return Err(ScheduleError::Duplicate {
                existing: existing.id,
            });
        }

        self.ensure_no_conflicts(&placement, None).await?;

        let now = self.clock.now();
        let screening = Screening {
            id: ScreeningId::new(),
            movie_id: placement.movie.id,
            room_id: placement.room.id,
            show_date: placement.show_date,
            start_time: placement.window.start,
            end_time: placement.window.end,
            status: ScreeningStatus::Scheduled,
            capacity_available: placement.seats,
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let committed = match self.screenings.create(screening).await {
            Ok(committed) => committed,
            Err(err) => return Err(self.commit_rejection(err, &placement, None).await),
        };

        info!(
            screening_id = %committed.id,
            movie_id = %committed.movie_id,
            room_id = %committed.room_id,
            show_date = %committed.show_date,
            start = %committed.start_time,
            end = %committed.end_time,
            "screening scheduled"
        );

        self.promote_movie(&placement.movie, placement.show_date)
            .await;

        Ok(committed)
    }

    /// Move a screening to a new movie, room, date, or start time.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::BookingObligation`] when pending or confirmed
    /// bookings exist, regardless of whether the new window is valid.
    /// Otherwise the same errors as [`schedule_showtime`](Self::schedule_showtime)
    /// (premiere gating and duplicate checks excepted).
    pub async fn update_showtime(
        &self,
        id: ScreeningId,
        request: &ShowtimeRequest,
        actor: ActorId,
    ) -> Result<Screening> {
        let result = self.try_update(id, request, actor).await;
        if let Err(err) = &result {
            debug!(kind = ?err.kind(), screening_id = %id, error = %err, "update rejected");
        }
        result
    }

    async fn try_update(
        &self,
        id: ScreeningId,
        request: &ShowtimeRequest,
        actor: ActorId,
    ) -> Result<Screening> {
        let current = self.get_showtime(id).await?;
        if current.status != ScreeningStatus::Scheduled {
            return Err(ScheduleError::validation(format!(
                "only scheduled screenings can be updated; {id} is {}",
                current.status
            )));
        }

        let active = self
            .bookings
            .count_bookings(id, &BookingStatus::ACTIVE)
            .await?;
        if active > 0 {
            return Err(ScheduleError::BookingObligation {
                screening_id: id,
                count: active,
            });
        }

        let placement = self.validate_placement(request).await?;
        self.ensure_no_conflicts(&placement, Some(id)).await?;

        let updated = Screening {
            movie_id: placement.movie.id,
            room_id: placement.room.id,
            show_date: placement.show_date,
            start_time: placement.window.start,
            end_time: placement.window.end,
            capacity_available: placement.seats,
            updated_by: actor,
            updated_at: self.clock.now(),
            ..current
        };

        let committed = match self.screenings.update(updated).await {
            Ok(committed) => committed,
            Err(err) => return Err(self.commit_rejection(err, &placement, Some(id)).await),
        };

        info!(
            screening_id = %committed.id,
            room_id = %committed.room_id,
            show_date = %committed.show_date,
            start = %committed.start_time,
            end = %committed.end_time,
            "screening updated"
        );
        Ok(committed)
    }

    /// Retire a screening. Hiding an already hidden screening is a no-op.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::BookingObligation`] with the pending count if any
    /// booking is still pending; [`ScheduleError::Validation`] for a
    /// cancelled screening.
    /// [`StoreError::StaleWrite`] (as [`ScheduleError::Store`]) if the
    /// screening changed between the read and the write.
    pub async fn hide_showtime(&self, id: ScreeningId, actor: ActorId) -> Result<Screening> {
        let current = self.get_showtime(id).await?;
        match current.status {
            ScreeningStatus::Hidden => return Ok(current),
            ScreeningStatus::Cancelled => {
                return Err(ScheduleError::validation(format!(
                    "screening {id} is cancelled and cannot be hidden"
                )))
            }
            ScreeningStatus::Scheduled => {}
        }

        let pending = self
            .bookings
            .count_bookings(id, &[BookingStatus::Pending])
            .await?;
        if pending > 0 {
            debug!(screening_id = %id, pending, "hide blocked by pending bookings");
            return Err(ScheduleError::BookingObligation {
                screening_id: id,
                count: pending,
            });
        }

        let hidden = Screening {
            status: ScreeningStatus::Hidden,
            updated_by: actor,
            updated_at: self.clock.now(),
            ..current
        };
        let committed = self.screenings.update(hidden).await?;
        info!(screening_id = %id, actor = %actor, "screening hidden");
        Ok(committed)
    }

    /// Hide every screening whose window plus grace buffer has elapsed.
    ///
    /// Screenings with pending bookings, or whose bookings cannot be
    /// counted, are held back. The rest are hidden in one batch, at the
    /// version they were read at; rows changed by a concurrent writer are
    /// left alone. On batch failure the ids are logged and the error is
    /// returned so the next sweep can retry.
    pub async fn auto_hide_expired(&self) -> Result<usize> {
        let now = self.venue_now();
        let candidates = self.screenings.list_expirable(now.date()).await?;

        let mut expired = Vec::new();
        for screening in candidates
            .into_iter()
            .filter(|s| sweeper::is_expired(s, now, self.config.grace_buffer_minutes))
        {
            let pending = match self
                .bookings
                .count_bookings(screening.id, &[BookingStatus::Pending])
                .await
            {
                Ok(pending) => pending,
                Err(err) => {
                    error!(
                        screening_id = %screening.id,
                        error = %err,
                        "booking lookup failed; screening left for next sweep"
                    );
                    continue;
                }
            };
            if pending > 0 {
                warn!(
                    screening_id = %screening.id,
                    pending,
                    "expired screening held back by pending bookings"
                );
                continue;
            }
            expired.push(screening);
        }

        if expired.is_empty() {
            return Ok(0);
        }

        match self.screenings.batch_hide(&expired, self.clock.now()).await {
            Ok(outcome) => {
                if !outcome.stale.is_empty() {
                    warn!(
                        ids = %join_ids(&outcome.stale),
                        "screenings changed during sweep; left untouched"
                    );
                }
                info!(count = outcome.hidden.len(), "expired screenings hidden");
                Ok(outcome.hidden.len())
            }
            Err(err) => {
                let ids: Vec<ScreeningId> = expired.iter().map(|s| s.id).collect();
                error!(
                    ids = %join_ids(&ids),
                    error = %err,
                    "expiry batch failed; retrying on next sweep"
                );
                Err(err.into())
            }
        }
    }

    /// Screenings in the room on that date that clash with `[start, end)`,
    /// each annotated with its movie title.
    pub async fn find_conflicts(
        &self,
        room_id: RoomId,
        show_date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
        exclude: Option<ScreeningId>,
    ) -> Result<Vec<Conflict>> {
        let existing = self
            .screenings
            .list_by_room_and_date(room_id, show_date)
            .await?;
        let candidate = Window::new(start, end);
        let clashing = conflict::find_conflicts(
            &existing,
            &candidate,
            self.config.inter_screening_gap_minutes,
            exclude,
        );

        let mut titles: HashMap<_, String> = HashMap::new();
        let mut conflicts = Vec::with_capacity(clashing.len());
        for screening in clashing {
            if !titles.contains_key(&screening.movie_id) {
                let title = self
                    .movies
                    .get_movie(screening.movie_id)
                    .await?
                    .map_or_else(|| format!("movie {}", screening.movie_id), |m| m.title);
                titles.insert(screening.movie_id, title);
            }
            conflicts.push(Conflict {
                screening_id: screening.id,
                movie_id: screening.movie_id,
                movie_title: titles
                    .get(&screening.movie_id)
                    .cloned()
                    .unwrap_or_default(),
                window: screening.window(),
            });
        }
        Ok(conflicts)
    }

    /// Free slots of `duration_minutes` in the room on that date.
    ///
    /// On the venue's current date, slots that start before now are
    /// dropped.
    pub async fn find_available_slots(
        &self,
        room_id: RoomId,
        show_date: NaiveDate,
        duration_minutes: u32,
    ) -> Result<Vec<Slot>> {
        self.available_slots(room_id, show_date, duration_minutes, None)
            .await
    }

    async fn available_slots(
        &self,
        room_id: RoomId,
        show_date: NaiveDate,
        duration_minutes: u32,
        exclude: Option<ScreeningId>,
    ) -> Result<Vec<Slot>> {
        let occupied: Vec<Window> = self
            .screenings
            .list_by_room_and_date(room_id, show_date)
            .await?
            .iter()
            .filter(|s| s.occupies_room() && Some(s.id) != exclude)
            .map(Screening::window)
            .collect();

        let mut found = slots::find_available_slots(
            &occupied,
            self.config.opening_time,
            self.config.closing_time,
            self.config.inter_screening_gap_minutes,
            duration_minutes,
        );

        let now = self.venue_now();
        if show_date == now.date() {
            found.retain(|slot| show_date.and_time(slot.start.as_naive()) >= now);
        } else if show_date < now.date() {
            found.clear();
        }
        Ok(found)
    }

    /// The occupied window for a movie of `duration_minutes` starting at
    /// `start`.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::Validation`] if the window would end after closing
    /// time or cross midnight.
    pub fn occupied_window(&self, start: TimeOfDay, duration_minutes: u32) -> Result<Window> {
        let total = duration_minutes.saturating_add(self.config.cleanup_buffer_minutes);
        time::add_minutes_checked(start, total)
            .filter(|end| *end <= self.config.closing_time)
            .map(|end| Window::new(start, end))
            .ok_or_else(|| {
                ScheduleError::validation(format!(
                    "screening starting at {start} would end after closing ({})",
                    self.config.closing_time
                ))
            })
    }

    fn normalize_start(&self, input: &TimeInput) -> Result<TimeOfDay> {
        let normalized = self
            .time_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .normalize(input);
        normalized.ok_or_else(|| ScheduleError::validation(format!("invalid start time {input}")))
    }

    /// Steps 1-3 of the pipeline.
    async fn validate_placement(&self, request: &ShowtimeRequest) -> Result<Placement> {
        let movie = self
            .movies
            .get_movie(request.movie_id)
            .await?
            .ok_or_else(|| ScheduleError::not_found(Entity::Movie, request.movie_id))?;

        let room = self
            .rooms
            .get_room(request.room_id)
            .await?
            .ok_or_else(|| ScheduleError::not_found(Entity::Room, request.room_id))?;
        if room.operational_status != RoomStatus::Active {
            return Err(ScheduleError::validation(format!(
                "room {} is not active ({})",
                room.name, room.operational_status
            )));
        }

        let seats = self.rooms.active_seat_count(room.id).await?;
        if seats == 0 {
            return Err(ScheduleError::validation(format!(
                "room {} has no active seats configured",
                room.name
            )));
        }

        let start = self.normalize_start(&request.start_time)?;
        if request.show_date.and_time(start.as_naive()) < self.venue_now() {
            return Err(ScheduleError::validation("cannot schedule in the past"));
        }

        let window = self.occupied_window(start, movie.duration_minutes)?;

        Ok(Placement {
            movie,
            room,
            seats,
            show_date: request.show_date,
            window,
        })
    }

    /// Step 6: fail with conflicts and suggestions if the window clashes.
    async fn ensure_no_conflicts(
        &self,
        placement: &Placement,
        exclude: Option<ScreeningId>,
    ) -> Result<()> {
        let conflicts = self
            .find_conflicts(
                placement.room.id,
                placement.show_date,
                placement.window.start,
                placement.window.end,
                exclude,
            )
            .await?;
        if conflicts.is_empty() {
            return Ok(());
        }

        let mut suggestions = self
            .available_slots(
                placement.room.id,
                placement.show_date,
                placement.window.duration_minutes(),
                exclude,
            )
            .await?;
        suggestions.truncate(self.config.max_suggestions);

        Err(ScheduleError::ScheduleConflict {
            conflicts,
            suggestions,
        })
    }

    /// Translate a commit-time constraint violation into the error a caller
    /// would have seen had the read check caught it.
    async fn commit_rejection(
        &self,
        err: StoreError,
        placement: &Placement,
        exclude: Option<ScreeningId>,
    ) -> ScheduleError {
        match err {
            StoreError::DuplicateScreening { existing } => {
                warn!(existing = %existing, "duplicate committed concurrently");
                ScheduleError::Duplicate { existing }
            }
            StoreError::WindowConflict { conflicting } => {
                warn!(
                    room_id = %placement.room.id,
                    show_date = %placement.show_date,
                    conflicting = %join_ids(&conflicting),
                    "window taken by a concurrent commit"
                );
                match self.ensure_no_conflicts(placement, exclude).await {
                    Err(conflict) => conflict,
                    Ok(()) => StoreError::WindowConflict { conflicting }.into(),
                }
            }
            other => other.into(),
        }
    }

    /// Step 8. A failure here does not undo the committed screening.
    async fn promote_movie(&self, movie: &Movie, show_date: NaiveDate) {
        if movie.status != MovieStatus::ComingSoon || show_date > self.venue_now().date() {
            return;
        }
        match self.movies.mark_now_showing(movie.id).await {
            Ok(()) => info!(movie_id = %movie.id, "movie now showing"),
            Err(err) => warn!(movie_id = %movie.id, error = %err, "failed to mark movie now showing"),
        }
    }
}
