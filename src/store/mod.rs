//! Native health store collaborator
//!
//! The bridge never calls Health Connect or HealthKit directly. A host embeds the
//! crate and supplies a [`HealthStore`] that performs the platform reads and hands
//! back raw records; everything after that point is normalization.

mod memory;

pub use memory::{MemoryStore, QuantitySample, StoreFixture};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::NativeError;
use crate::types::{Platform, TimeRange, VitalKind};
use crate::units::Quantity;

/// Origin of a native record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSource {
    /// Human-readable source (device model or app name)
    pub name: String,
    /// Package name / bundle identifier of the writing app
    pub bundle_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSegment {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Exercise session / workout as stored natively
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWorkout {
    pub id: String,
    pub source: RecordSource,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Native exercise / activity type code
    pub activity_code: i64,
    #[serde(default)]
    pub title: Option<String>,
    /// Active segments; empty when the platform does not split the workout
    #[serde(default)]
    pub segments: Vec<RawSegment>,
    /// Whether the record carries route data that can be read
    #[serde(default)]
    pub has_route: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHeartRate {
    pub timestamp: DateTime<Utc>,
    pub bpm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLocation {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
}

/// One sleep stage record.
///
/// Stores with per-stage samples (HealthKit) return one record per sample.
/// Stores with session records (Health Connect) flatten each session's stages,
/// carrying the session id and title on every stage; a session without stages
/// becomes a single record spanning the session with the native "sleeping" code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSleepStage {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub session_title: Option<String>,
    pub source: RecordSource,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Native sleep stage / category value
    pub stage_code: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Latest sample of a single-value measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVitalSample {
    pub id: String,
    pub time: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub client_record_id: Option<String>,
    pub data_origin: String,
    pub quantity: Quantity,
}

/// Result of a native aggregate call, keyed by native metric handle.
/// A handle with no contributing records is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    values: HashMap<String, Quantity>,
}

impl AggregationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handle: &str, quantity: Quantity) -> Self {
        self.values.insert(handle.to_string(), quantity);
        self
    }

    pub fn get(&self, handle: &str) -> Option<&Quantity> {
        self.values.get(handle)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Capability set of a native health store
#[async_trait]
pub trait HealthStore: Send + Sync {
    /// Platform whose identifiers and codes this store speaks
    fn platform(&self) -> Platform;

    async fn is_available(&self) -> bool;

    /// Native permission identifiers currently granted
    async fn granted_permissions(&self) -> Result<Vec<String>, NativeError>;

    /// Ask the user for the given native identifiers; resolves with the
    /// identifiers granted once the prompt completes
    async fn request_permissions(
        &self,
        identifiers: &[&'static str],
    ) -> Result<Vec<String>, NativeError>;

    /// Cumulative aggregate of one native metric over a range
    async fn aggregate(&self, handle: &str, range: TimeRange)
        -> Result<AggregationResult, NativeError>;

    /// Workouts starting within the range, in native order
    async fn read_workouts(&self, range: TimeRange) -> Result<Vec<RawWorkout>, NativeError>;

    async fn read_heart_rate(&self, range: TimeRange) -> Result<Vec<RawHeartRate>, NativeError>;

    async fn read_route(&self, workout: &RawWorkout) -> Result<Vec<RawLocation>, NativeError>;

    async fn read_sleep_stages(&self, range: TimeRange)
        -> Result<Vec<RawSleepStage>, NativeError>;

    async fn read_mindful_sessions(&self, range: TimeRange)
        -> Result<Vec<RawInterval>, NativeError>;

    /// Most recent sample of a vital, if any exists
    async fn latest_vital(&self, kind: VitalKind) -> Result<Option<RawVitalSample>, NativeError>;
}
