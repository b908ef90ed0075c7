//! Engine configuration.
//!
//! Defaults match a venue open 09:00-23:00 with 15-minute cleanup and
//! inter-screening gaps. Values can be overridden from JSON or from
//! `SHOWTIME_*` environment variables.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::time::TimeOfDay;

/// Scheduling constants and sweep settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minutes added after the runtime before the room is free.
    pub cleanup_buffer_minutes: u32,
    /// Minimum minutes between two windows in one room.
    pub inter_screening_gap_minutes: u32,
    pub opening_time: TimeOfDay,
    /// No screening window may end after this.
    pub closing_time: TimeOfDay,
    /// Minutes after the end time before the sweeper retires a screening.
    pub grace_buffer_minutes: u32,
    /// Cap on suggestions attached to a conflict.
    pub max_suggestions: usize,
    pub sweep_interval_secs: u64,
    /// The single wall clock every room runs on.
    pub venue_timezone: Tz,
    pub time_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cleanup_buffer_minutes: 15,
            inter_screening_gap_minutes: 15,
            opening_time: TimeOfDay::from_hms(9, 0, 0).unwrap_or_else(TimeOfDay::midnight),
            closing_time: TimeOfDay::from_hms(23, 0, 0).unwrap_or_else(TimeOfDay::midnight),
            grace_buffer_minutes: 30,
            max_suggestions: 5,
            sweep_interval_secs: 60,
            venue_timezone: Tz::UTC,
            time_cache_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `SHOWTIME_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using an arbitrary key lookup. Backs [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = read_parsed(&read, "SHOWTIME_CLEANUP_BUFFER_MINUTES")? {
            config.cleanup_buffer_minutes = v;
        }
        if let Some(v) = read_parsed(&read, "SHOWTIME_INTER_SCREENING_GAP_MINUTES")? {
            config.inter_screening_gap_minutes = v;
        }
        if let Some(v) = read_parsed(&read, "SHOWTIME_OPENING_TIME")? {
            config.opening_time = v;
        }
        if let Some(v) = read_parsed(&read, "SHOWTIME_CLOSING_TIME")? {
            config.closing_time = v;
        }
        if let Some(v) = read_parsed(&read, "SHOWTIME_GRACE_BUFFER_MINUTES")? {
            config.grace_buffer_minutes = v;
        }
        if let Some(v) = read_parsed(&read, "SHOWTIME_MAX_SUGGESTIONS")? {
            config.max_suggestions = v;
        }
        if let Some(v) = read_parsed(&read, "SHOWTIME_SWEEP_INTERVAL_SECS")? {
            config.sweep_interval_secs = v;
        }
        if let Some(v) = read_parsed(&read, "SHOWTIME_VENUE_TIMEZONE")? {
            config.venue_timezone = v;
        }
        if let Some(v) = read_parsed(&read, "SHOWTIME_TIME_CACHE_CAPACITY")? {
            config.time_cache_capacity = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.opening_time >= self.closing_time {
            return Err(ConfigError::Invalid(format!(
                "opening time {} must be before closing time {}",
                self.opening_time, self.closing_time
            )));
        }
        if self.max_suggestions == 0 {
            return Err(ConfigError::Invalid("max_suggestions must be at least 1".into()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid("sweep_interval_secs must be at least 1".into()));
        }
        if self.time_cache_capacity == 0 {
            return Err(ConfigError::Invalid("time_cache_capacity must be at least 1".into()));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn read_parsed<T, F>(read: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = read(key) else {
        return Ok(None);
    };
    let parsed = value.trim().parse::<T>();
    parsed.map(Some).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
        reason: e.to_string(),
    })
}
