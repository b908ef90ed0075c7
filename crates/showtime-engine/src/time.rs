//! Time-of-day arithmetic for screening windows.
//!
//! All external time inputs are untyped until they pass through [`normalize`].
//! Hour/minute/second objects, wall-clock strings (`H:MM`, `H:MM:SS`), and
//! calendar timestamps are accepted. Timestamps keep the literal clock value
//! the caller wrote: an offset such as `+07:00` is parsed but never applied.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::InvalidTime;

pub const SECONDS_PER_DAY: u32 = 86_400;

/// A canonical, second-precision time of day. Displays as `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, second).map(Self)
    }

    pub fn from_seconds_since_midnight(seconds: u32) -> Option<Self> {
        NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).map(Self)
    }

    /// Drops any sub-second component.
    pub fn from_naive(time: NaiveTime) -> Self {
        Self(time.with_nanosecond(0).unwrap_or(time))
    }

    pub fn midnight() -> Self {
        Self(NaiveTime::default())
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn second(&self) -> u32 {
        self.0.second()
    }

    pub fn seconds_since_midnight(&self) -> u32 {
        self.0.num_seconds_from_midnight()
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

impl FromStr for TimeOfDay {
    type Err = InvalidTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_text(s).ok_or_else(|| InvalidTime(s.to_string()))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let input = TimeInput::deserialize(deserializer)?;
        normalize(&input).ok_or_else(|| serde::de::Error::custom(format!("invalid time {input}")))
    }
}

/// A time of day as supplied by a caller, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeInput {
    Components {
        hour: u32,
        minute: u32,
        #[serde(default)]
        second: Option<u32>,
    },
    Text(String),
}

impl fmt::Display for TimeInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInput::Components {
                hour,
                minute,
                second,
            } => write!(f, "{{hour: {hour}, minute: {minute}, second: {second:?}}}"),
            TimeInput::Text(text) => write!(f, "{text:?}"),
        }
    }
}

impl From<&str> for TimeInput {
    fn from(text: &str) -> Self {
        TimeInput::Text(text.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(text: String) -> Self {
        TimeInput::Text(text)
    }
}

impl From<TimeOfDay> for TimeInput {
    fn from(time: TimeOfDay) -> Self {
        TimeInput::Components {
            hour: time.hour(),
            minute: time.minute(),
            second: Some(time.second()),
        }
    }
}

/// Normalize any supported time representation. Returns `None` when the
/// value cannot be read as a valid time of day.
pub fn normalize(input: &TimeInput) -> Option<TimeOfDay> {
    match input {
        TimeInput::Components {
            hour,
            minute,
            second,
        } => TimeOfDay::from_hms(*hour, *minute, second.unwrap_or(0)),
        TimeInput::Text(text) => normalize_text(text),
    }
}

/// Normalize a wall-clock or timestamp string.
pub fn normalize_text(raw: &str) -> Option<TimeOfDay> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    parse_wall_clock(text).or_else(|| parse_timestamp(text))
}

fn parse_wall_clock(text: &str) -> Option<TimeOfDay> {
    let mut parts = text.split(':');
    let hour = parse_field(parts.next()?, 1..=2)?;
    let minute = parse_field(parts.next()?, 2..=2)?;
    let second = match parts.next() {
        None => 0,
        Some(field) => {
            let whole = match field.split_once('.') {
                Some((whole, fraction)) => {
                    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                        return None;
                    }
                    whole
                }
                None => field,
            };
            parse_field(whole, 2..=2)?
        }
    };
    if parts.next().is_some() {
        return None;
    }
    TimeOfDay::from_hms(hour, minute, second)
}

fn parse_field(field: &str, width: RangeInclusive<usize>) -> Option<u32> {
    if !width.contains(&field.len()) || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

fn parse_timestamp(text: &str) -> Option<TimeOfDay> {
    // naive_local() keeps the written clock value and ignores the offset.
    if let Ok(stamped) = DateTime::parse_from_rfc3339(text) {
        return Some(TimeOfDay::from_naive(stamped.naive_local().time()));
    }
    for format in OFFSET_TIMESTAMP_FORMATS {
        if let Ok(stamped) = DateTime::parse_from_str(text, format) {
            return Some(TimeOfDay::from_naive(stamped.naive_local().time()));
        }
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| TimeOfDay::from_naive(naive.time()))
}

/// Add minutes, wrapping past `23:59:59` back to `00:00:00`.
///
/// Callers that cannot tolerate a date change should use
/// [`add_minutes_checked`].
pub fn add_minutes(time: TimeOfDay, minutes: u32) -> TimeOfDay {
    let total = u64::from(time.seconds_since_midnight()) + u64::from(minutes) * 60;
    let wrapped = (total % u64::from(SECONDS_PER_DAY)) as u32;
    TimeOfDay::from_seconds_since_midnight(wrapped).unwrap_or_else(TimeOfDay::midnight)
}

/// Add minutes, returning `None` if the result would cross midnight.
pub fn add_minutes_checked(time: TimeOfDay, minutes: u32) -> Option<TimeOfDay> {
    let total = u64::from(time.seconds_since_midnight()) + u64::from(minutes) * 60;
    u32::try_from(total)
        .ok()
        .filter(|secs| *secs < SECONDS_PER_DAY)
        .and_then(TimeOfDay::from_seconds_since_midnight)
}

pub fn compare(a: TimeOfDay, b: TimeOfDay) -> Ordering {
    a.cmp(&b)
}

pub fn to_minutes_since_midnight(time: TimeOfDay) -> u32 {
    time.seconds_since_midnight() / 60
}

/// Bounded cache of normalized text inputs.
///
/// Owned explicitly by its user; evicts the oldest entry once `capacity` is
/// reached.
#[derive(Debug, Clone)]
pub struct TimeCache {
    capacity: usize,
    entries: HashMap<String, Option<TimeOfDay>>,
    order: VecDeque<String>,
}

impl TimeCache {
    /// A cache holding at most `capacity` entries. Zero is treated as one,
    /// matching the lower bound [`EngineConfig::validate`] enforces.
    ///
    /// [`EngineConfig::validate`]: crate::config::EngineConfig::validate
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn normalize(&mut self, input: &TimeInput) -> Option<TimeOfDay> {
        match input {
            TimeInput::Text(text) => self.normalize_text(text),
            TimeInput::Components { .. } => normalize(input),
        }
    }

    pub fn normalize_text(&mut self, raw: &str) -> Option<TimeOfDay> {
        if let Some(hit) = self.entries.get(raw) {
            return *hit;
        }
        let parsed = normalize_text(raw);
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(raw.to_string(), parsed);
        self.order.push_back(raw.to_string());
        parsed
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.entries.contains_key(raw)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
