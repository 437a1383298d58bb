//! Fixture-backed in-memory store
//!
//! Replays recorded native records from JSON. Used by the CLI to exercise the
//! bridge without a device and by the test suite, including failure injection
//! per native operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::{
    AggregationResult, HealthStore, RawHeartRate, RawInterval, RawLocation, RawSleepStage,
    RawVitalSample, RawWorkout,
};
use crate::error::{BridgeError, NativeError};
use crate::types::{Platform, TimeRange, VitalKind};
use crate::units::Quantity;

/// Quantity recorded for one native metric over an interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitySample {
    pub metric: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub quantity: Quantity,
}

/// Recorded contents of a native store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreFixture {
    pub platform: Platform,
    #[serde(default = "default_available")]
    pub available: bool,
    /// Native permission identifiers granted up front
    #[serde(default)]
    pub granted: Vec<String>,
    /// Identifiers the simulated user accepts when prompted; `None` accepts
    /// everything requested
    #[serde(default)]
    pub grant_on_request: Option<Vec<String>>,
    #[serde(default)]
    pub quantity_samples: Vec<QuantitySample>,
    #[serde(default)]
    pub workouts: Vec<RawWorkout>,
    #[serde(default)]
    pub heart_rate: Vec<RawHeartRate>,
    /// Route locations keyed by workout id
    #[serde(default)]
    pub routes: HashMap<String, Vec<RawLocation>>,
    #[serde(default)]
    pub sleep_stages: Vec<RawSleepStage>,
    #[serde(default)]
    pub mindful_sessions: Vec<RawInterval>,
    #[serde(default)]
    pub vitals: HashMap<VitalKind, Vec<RawVitalSample>>,
    /// Native operations that fail: `granted_permissions`, `request_permissions`,
    /// `aggregate`, `aggregate:<handle>`, `workouts`, `heart_rate`, `route`,
    /// `sleep`, `mindfulness`, `vitals`
    #[serde(default)]
    pub failures: Vec<String>,
}

fn default_available() -> bool {
    true
}

impl StoreFixture {
    pub fn empty(platform: Platform) -> Self {
        Self {
            platform,
            available: true,
            granted: Vec::new(),
            grant_on_request: None,
            quantity_samples: Vec::new(),
            workouts: Vec::new(),
            heart_rate: Vec::new(),
            routes: HashMap::new(),
            sleep_stages: Vec::new(),
            mindful_sessions: Vec::new(),
            vitals: HashMap::new(),
            failures: Vec::new(),
        }
    }
}

pub struct MemoryStore {
    fixture: StoreFixture,
    granted: Mutex<Vec<String>>,
    prompt: Option<Arc<Notify>>,
    native_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(fixture: StoreFixture) -> Self {
        let granted = Mutex::new(fixture.granted.clone());
        Self {
            fixture,
            granted,
            prompt: None,
            native_calls: AtomicUsize::new(0),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        let fixture: StoreFixture = serde_json::from_str(json)?;
        Ok(Self::new(fixture))
    }

    /// Keep permission prompts open until `prompt` is notified
    pub fn with_permission_prompt(mut self, prompt: Arc<Notify>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Number of native operations invoked so far
    pub fn native_calls(&self) -> usize {
        self.native_calls.load(Ordering::SeqCst)
    }

    fn enter(&self, operation: &str) -> Result<(), NativeError> {
        self.native_calls.fetch_add(1, Ordering::SeqCst);
        if self.fixture.failures.iter().any(|f| f == operation) {
            return Err(NativeError::new(format!("{operation} unavailable")));
        }
        Ok(())
    }
}

fn starts_within(start: DateTime<Utc>, range: &TimeRange) -> bool {
    start >= range.start && start < range.end
}

#[async_trait]
impl HealthStore for MemoryStore {
    fn platform(&self) -> Platform {
        self.fixture.platform
    }

    async fn is_available(&self) -> bool {
        self.fixture.available
    }

    async fn granted_permissions(&self) -> Result<Vec<String>, NativeError> {
        self.enter("granted_permissions")?;
        let granted = self
            .granted
            .lock()
            .map_err(|_| NativeError::new("permission state poisoned"))?;
        Ok(granted.clone())
    }

    async fn request_permissions(
        &self,
        identifiers: &[&'static str],
    ) -> Result<Vec<String>, NativeError> {
        self.enter("request_permissions")?;
        if let Some(prompt) = &self.prompt {
            prompt.notified().await;
        }

        let accepted: Vec<String> = identifiers
            .iter()
            .filter(|id| match &self.fixture.grant_on_request {
                Some(allowed) => allowed.iter().any(|a| a == *id),
                None => true,
            })
            .map(|id| id.to_string())
            .collect();

        let mut granted = self
            .granted
            .lock()
            .map_err(|_| NativeError::new("permission state poisoned"))?;
        for id in accepted {
            if !granted.contains(&id) {
                granted.push(id);
            }
        }
        Ok(granted.clone())
    }

    async fn aggregate(
        &self,
        handle: &str,
        range: TimeRange,
    ) -> Result<AggregationResult, NativeError> {
        self.enter("aggregate")?;
        self.enter(&format!("aggregate:{handle}"))?;

        let mut matching = self
            .fixture
            .quantity_samples
            .iter()
            .filter(|s| s.metric == handle && starts_within(s.start, &range));

        let Some(first) = matching.next() else {
            return Ok(AggregationResult::new());
        };
        let unit = first.quantity.unit;
        let mut total = first.quantity.value;
        for sample in matching {
            if sample.quantity.unit != unit {
                return Err(NativeError::new(format!(
                    "{handle} mixes {:?} and {:?} samples",
                    unit, sample.quantity.unit
                )));
            }
            total += sample.quantity.value;
        }

        Ok(AggregationResult::new().with(handle, Quantity::new(total, unit)))
    }

    async fn read_workouts(&self, range: TimeRange) -> Result<Vec<RawWorkout>, NativeError> {
        self.enter("workouts")?;
        Ok(self
            .fixture
            .workouts
            .iter()
            .filter(|w| starts_within(w.start, &range))
            .cloned()
            .collect())
    }

    async fn read_heart_rate(&self, range: TimeRange) -> Result<Vec<RawHeartRate>, NativeError> {
        self.enter("heart_rate")?;
        Ok(self
            .fixture
            .heart_rate
            .iter()
            .filter(|s| s.timestamp >= range.start && s.timestamp <= range.end)
            .cloned()
            .collect())
    }

    async fn read_route(&self, workout: &RawWorkout) -> Result<Vec<RawLocation>, NativeError> {
        self.enter("route")?;
        Ok(self
            .fixture
            .routes
            .get(&workout.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn read_sleep_stages(
        &self,
        range: TimeRange,
    ) -> Result<Vec<RawSleepStage>, NativeError> {
        self.enter("sleep")?;
        Ok(self
            .fixture
            .sleep_stages
            .iter()
            .filter(|s| starts_within(s.start, &range))
            .cloned()
            .collect())
    }

    async fn read_mindful_sessions(
        &self,
        range: TimeRange,
    ) -> Result<Vec<RawInterval>, NativeError> {
        self.enter("mindfulness")?;
        Ok(self
            .fixture
            .mindful_sessions
            .iter()
            .filter(|s| starts_within(s.start, &range))
            .cloned()
            .collect())
    }

    async fn latest_vital(&self, kind: VitalKind) -> Result<Option<RawVitalSample>, NativeError> {
        self.enter("vitals")?;
        Ok(self
            .fixture
            .vitals
            .get(&kind)
            .and_then(|samples| samples.iter().max_by_key(|s| s.time))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::NativeUnit;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_aggregate_sums_samples_starting_in_range() {
        let mut fixture = StoreFixture::empty(Platform::HealthConnect);
        for (h, steps) in [(1, 100.0), (2, 250.0), (5, 1000.0)] {
            fixture.quantity_samples.push(QuantitySample {
                metric: "StepsRecord.COUNT_TOTAL".to_string(),
                start: at(h),
                end: at(h + 1),
                quantity: Quantity::new(steps, NativeUnit::Count),
            });
        }
        let store = MemoryStore::new(fixture);

        let range = TimeRange::new(at(0), at(4)).unwrap();
        let result = store.aggregate("StepsRecord.COUNT_TOTAL", range).await.unwrap();
        assert_eq!(
            result.get("StepsRecord.COUNT_TOTAL"),
            Some(&Quantity::new(350.0, NativeUnit::Count))
        );

        let empty = TimeRange::new(at(10), at(12)).unwrap();
        assert!(store
            .aggregate("StepsRecord.COUNT_TOTAL", empty)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_rejects_mixed_units() {
        let mut fixture = StoreFixture::empty(Platform::HealthConnect);
        for (h, quantity) in [
            (1, Quantity::new(200.0, NativeUnit::Kilocalorie)),
            (2, Quantity::new(800.0, NativeUnit::Kilojoule)),
        ] {
            fixture.quantity_samples.push(QuantitySample {
                metric: "ActiveCaloriesBurnedRecord.ACTIVE_CALORIES_TOTAL".to_string(),
                start: at(h),
                end: at(h + 1),
                quantity,
            });
        }
        let store = MemoryStore::new(fixture);

        let range = TimeRange::new(at(0), at(4)).unwrap();
        let err = store
            .aggregate("ActiveCaloriesBurnedRecord.ACTIVE_CALORIES_TOTAL", range)
            .await
            .unwrap_err();
        assert!(err.message.contains("mixes"));
    }

    #[tokio::test]
    async fn test_injected_failure_and_call_counting() {
        let mut fixture = StoreFixture::empty(Platform::HealthKit);
        fixture.failures.push("heart_rate".to_string());
        let store = MemoryStore::new(fixture);

        let range = TimeRange::new(at(0), at(1)).unwrap();
        let err = store.read_heart_rate(range).await.unwrap_err();
        assert_eq!(err.message, "heart_rate unavailable");
        assert_eq!(store.native_calls(), 1);
    }

    #[tokio::test]
    async fn test_request_respects_grant_on_request() {
        let mut fixture = StoreFixture::empty(Platform::HealthConnect);
        fixture.grant_on_request = Some(vec!["android.permission.health.READ_STEPS".to_string()]);
        let store = MemoryStore::new(fixture);

        let granted = store
            .request_permissions(&[
                "android.permission.health.READ_STEPS",
                "android.permission.health.READ_SLEEP",
            ])
            .await
            .unwrap();
        assert_eq!(granted, vec!["android.permission.health.READ_STEPS".to_string()]);
    }
}
