//! Canonical types for Synheart Health
//!
//! These are the platform-neutral shapes every query resolves to, regardless of
//! whether the records came from Health Connect or HealthKit. Field names follow
//! the camelCase response schema consumed by the host bridge.

use chrono::{DateTime, Duration, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::BridgeError;

/// Native health platform a store is backed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "health-connect", alias = "android")]
    HealthConnect,
    #[serde(rename = "healthkit", alias = "ios")]
    HealthKit,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::HealthConnect => "health-connect",
            Platform::HealthKit => "healthkit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "health-connect" | "android" => Some(Platform::HealthConnect),
            "healthkit" | "ios" => Some(Platform::HealthKit),
            _ => None,
        }
    }
}

/// Canonical read permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    ReadSteps,
    ReadWorkouts,
    ReadActiveCalories,
    ReadTotalCalories,
    ReadDistance,
    ReadHeartRate,
    ReadRoute,
    ReadMindfulness,
    ReadSleep,
    #[serde(alias = "READ_TEMPERATURE")]
    ReadBodyTemperature,
    ReadHeight,
    ReadWeight,
}

impl Permission {
    pub const ALL: [Permission; 12] = [
        Permission::ReadSteps,
        Permission::ReadWorkouts,
        Permission::ReadActiveCalories,
        Permission::ReadTotalCalories,
        Permission::ReadDistance,
        Permission::ReadHeartRate,
        Permission::ReadRoute,
        Permission::ReadMindfulness,
        Permission::ReadSleep,
        Permission::ReadBodyTemperature,
        Permission::ReadHeight,
        Permission::ReadWeight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadSteps => "READ_STEPS",
            Permission::ReadWorkouts => "READ_WORKOUTS",
            Permission::ReadActiveCalories => "READ_ACTIVE_CALORIES",
            Permission::ReadTotalCalories => "READ_TOTAL_CALORIES",
            Permission::ReadDistance => "READ_DISTANCE",
            Permission::ReadHeartRate => "READ_HEART_RATE",
            Permission::ReadRoute => "READ_ROUTE",
            Permission::ReadMindfulness => "READ_MINDFULNESS",
            Permission::ReadSleep => "READ_SLEEP",
            Permission::ReadBodyTemperature => "READ_BODY_TEMPERATURE",
            Permission::ReadHeight => "READ_HEIGHT",
            Permission::ReadWeight => "READ_WEIGHT",
        }
    }

    /// Parse a permission name; `READ_TEMPERATURE` is accepted as a legacy alias
    pub fn parse(s: &str) -> Option<Self> {
        if s == "READ_TEMPERATURE" {
            return Some(Permission::ReadBodyTemperature);
        }
        Permission::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

/// Aggregation bucket width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Hour,
    Day,
    Week,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Hour => "hour",
            Bucket::Day => "day",
            Bucket::Week => "week",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hour" => Some(Bucket::Hour),
            "day" => Some(Bucket::Day),
            "week" => Some(Bucket::Week),
            _ => None,
        }
    }

    pub fn width(&self) -> Duration {
        match self {
            Bucket::Hour => Duration::hours(1),
            Bucket::Day => Duration::days(1),
            Bucket::Week => Duration::weeks(1),
        }
    }
}

/// Half-open query interval `[start, end)` with `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, BridgeError> {
        if start >= end {
            return Err(BridgeError::InvalidTimeRange);
        }
        Ok(Self { start, end })
    }

    pub fn duration_seconds(&self) -> f64 {
        seconds_between(self.start, self.end)
    }
}

/// Seconds elapsed from `start` to `end`, with millisecond precision
pub fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}

/// One time bucket of an aggregate query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedSample {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// `None` when the bucket had no contribution; never coerced to zero
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub timestamp: DateTime<Utc>,
    pub bpm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSample {
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
}

/// Canonical workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: String,
    pub source_name: String,
    pub source_bundle_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub workout_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Active duration in seconds (segments exclude paused intervals)
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    /// Kilocalories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    /// Meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<Vec<HeartRateSample>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<Vec<RouteSample>>,
}

/// Canonical sleep stage classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SleepStage {
    Unknown,
    Awake,
    Sleeping,
    OutOfBed,
    Light,
    Deep,
    Rem,
}

impl SleepStage {
    pub const ALL: [SleepStage; 7] = [
        SleepStage::Unknown,
        SleepStage::Awake,
        SleepStage::Sleeping,
        SleepStage::OutOfBed,
        SleepStage::Light,
        SleepStage::Deep,
        SleepStage::Rem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepStage::Unknown => "UNKNOWN",
            SleepStage::Awake => "AWAKE",
            SleepStage::Sleeping => "SLEEPING",
            SleepStage::OutOfBed => "OUT_OF_BED",
            SleepStage::Light => "LIGHT",
            SleepStage::Deep => "DEEP",
            SleepStage::Rem => "REM",
        }
    }

    /// Whether time in this stage counts toward total sleep time
    pub fn is_asleep(&self) -> bool {
        !matches!(self, SleepStage::Awake | SleepStage::OutOfBed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepStageSample {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub stage: SleepStage,
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
}

/// Reconstructed sleep session with derived totals (all in seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepSession {
    pub id: String,
    pub source_name: String,
    pub source_bundle_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub title: String,
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<SleepStageSample>,
    pub time_in_bed: f64,
    pub sleep_time: f64,
    pub deep_sleep_time: f64,
    pub rem_sleep_time: f64,
    pub light_sleep_time: f64,
    pub awake_time: f64,
}

/// Single-value body measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalKind {
    Height,
    Weight,
    BodyTemperature,
}

impl VitalKind {
    pub fn permission(&self) -> Permission {
        match self {
            VitalKind::Height => Permission::ReadHeight,
            VitalKind::Weight => Permission::ReadWeight,
            VitalKind::BodyTemperature => Permission::ReadBodyTemperature,
        }
    }

    /// Key the value is reported under in the response
    pub fn response_key(&self) -> &'static str {
        match self {
            VitalKind::Height => "height",
            VitalKind::Weight => "weight",
            VitalKind::BodyTemperature => "temperature",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalMetadata {
    pub id: String,
    pub last_modified_time: DateTime<Utc>,
    pub client_record_id: String,
    pub data_origin: String,
}

/// Latest reading of a vital; value and timestamp are both `None` when no
/// record exists. Height is meters, weight kilograms, temperature celsius.
#[derive(Debug, Clone, PartialEq)]
pub struct VitalReading {
    pub kind: VitalKind,
    pub value: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub metadata: Option<VitalMetadata>,
}

impl VitalReading {
    pub fn empty(kind: VitalKind) -> Self {
        Self {
            kind,
            value: None,
            timestamp: None,
            metadata: None,
        }
    }
}

impl Serialize for VitalReading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.metadata.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry(self.kind.response_key(), &self.value)?;
        map.serialize_entry("timestamp", &self.timestamp)?;
        if let Some(metadata) = &self.metadata {
            map.serialize_entry("metadata", metadata)?;
        }
        map.end()
    }
}
