//! Workout enrichment
//!
//! Builds canonical [`Workout`]s from native records and attaches the optional
//! sub-queries (steps, calories, distance, heart rate, route). Sub-queries run
//! concurrently and fail independently: a failed branch is logged and its field
//! left out, the workout itself always resolves.

use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::BridgeConfig;
use crate::metrics::{Metric, MetricRegistry};
use crate::permissions::GrantedPermissions;
use crate::store::{HealthStore, RawWorkout};
use crate::types::{
    seconds_between, HeartRateSample, Permission, RouteSample, TimeRange, Workout,
};
use crate::vocabulary::PlatformVocabulary;

/// Optional sub-queries requested alongside workouts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutFlags {
    pub include_heart_rate: bool,
    pub include_route: bool,
    pub include_steps: bool,
}

pub struct WorkoutEnricher<'a, S: HealthStore + ?Sized> {
    store: &'a S,
    vocab: &'a dyn PlatformVocabulary,
    registry: &'a MetricRegistry,
    granted: &'a GrantedPermissions,
    config: &'a BridgeConfig,
}

impl<'a, S: HealthStore + ?Sized> WorkoutEnricher<'a, S> {
    pub fn new(
        store: &'a S,
        vocab: &'a dyn PlatformVocabulary,
        registry: &'a MetricRegistry,
        granted: &'a GrantedPermissions,
        config: &'a BridgeConfig,
    ) -> Self {
        Self {
            store,
            vocab,
            registry,
            granted,
            config,
        }
    }

    /// Enrich a batch, keeping the order the store returned it in
    pub async fn enrich_all(&self, records: &[RawWorkout], flags: WorkoutFlags) -> Vec<Workout> {
        stream::iter(records)
            .map(|record| self.enrich(record, flags))
            .buffered(self.config.max_concurrent_queries)
            .collect()
            .await
    }

    pub async fn enrich(&self, record: &RawWorkout, flags: WorkoutFlags) -> Workout {
        let (steps, calories, distance, heart_rate, route) = tokio::join!(
            async {
                if flags.include_steps {
                    self.metric(Metric::Steps, record).await
                } else {
                    None
                }
            },
            self.calories(record),
            self.metric(Metric::Distance, record),
            async {
                if flags.include_heart_rate {
                    self.heart_rate(record).await
                } else {
                    None
                }
            },
            async {
                if flags.include_route {
                    self.route(record).await
                } else {
                    None
                }
            },
        );

        Workout {
            id: record.id.clone(),
            source_name: record.source.name.clone(),
            source_bundle_id: record.source.bundle_id.clone(),
            start_date: record.start,
            end_date: record.end,
            workout_type: self.vocab.workout_type(record.activity_code).to_string(),
            title: record.title.clone(),
            duration_seconds: active_duration(record),
            calories,
            distance,
            steps,
            heart_rate,
            route,
        }
    }

    /// Total energy, falling back to active energy only when total has no value
    async fn calories(&self, record: &RawWorkout) -> Option<f64> {
        match self.metric(Metric::TotalCalories, record).await {
            Some(total) => Some(total),
            None => self.metric(Metric::ActiveCalories, record).await,
        }
    }

    async fn metric(&self, metric: Metric, record: &RawWorkout) -> Option<f64> {
        let descriptor = self.registry.get(metric)?;
        if !self.granted.contains(descriptor.required_permission) {
            return None;
        }
        let range = TimeRange::new(record.start, record.end).ok()?;
        match self.store.aggregate(descriptor.native_handle, range).await {
            Ok(result) => descriptor.extract(&result),
            Err(e) => {
                warn!(
                    workout_id = %record.id,
                    metric = descriptor.canonical_name(),
                    error = %e,
                    "workout {} query failed",
                    descriptor.workout_field()
                );
                None
            }
        }
    }

    async fn heart_rate(&self, record: &RawWorkout) -> Option<Vec<HeartRateSample>> {
        if !self.granted.contains(Permission::ReadHeartRate) {
            return None;
        }
        let range = TimeRange::new(record.start, record.end).ok()?;
        match self.store.read_heart_rate(range).await {
            Ok(samples) => Some(
                samples
                    .into_iter()
                    .map(|s| HeartRateSample {
                        timestamp: s.timestamp,
                        bpm: s.bpm,
                    })
                    .collect(),
            ),
            Err(e) => {
                warn!(workout_id = %record.id, error = %e, "workout heart rate query failed");
                None
            }
        }
    }

    async fn route(&self, record: &RawWorkout) -> Option<Vec<RouteSample>> {
        if !record.has_route || !self.granted.contains(Permission::ReadRoute) {
            return None;
        }
        match self.store.read_route(record).await {
            Ok(locations) => Some(
                locations
                    .into_iter()
                    .map(|l| RouteSample {
                        timestamp: l.timestamp,
                        lat: l.latitude,
                        lng: l.longitude,
                        alt: l.altitude,
                    })
                    .collect(),
            ),
            Err(e) => {
                warn!(workout_id = %record.id, error = %e, "workout route query failed");
                None
            }
        }
    }
}

/// Sum of segment durations, or the whole span when the record has no segments
fn active_duration(record: &RawWorkout) -> f64 {
    if record.segments.is_empty() {
        seconds_between(record.start, record.end)
    } else {
        record
            .segments
            .iter()
            .map(|segment| seconds_between(segment.start, segment.end))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        MemoryStore, QuantitySample, RawHeartRate, RawLocation, RawSegment, RecordSource,
        StoreFixture,
    };
    use crate::types::Platform;
    use crate::units::{NativeUnit, Quantity};
    use crate::vocabulary::vocabulary_for;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    const TOTAL: &str = "TotalCaloriesBurnedRecord.ENERGY_TOTAL";
    const ACTIVE: &str = "ActiveCaloriesBurnedRecord.ACTIVE_CALORIES_TOTAL";
    const DISTANCE: &str = "DistanceRecord.DISTANCE_TOTAL";

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 20, h, m, 0).unwrap()
    }

    fn run_at(h: u32, id: &str) -> RawWorkout {
        RawWorkout {
            id: id.to_string(),
            source: RecordSource {
                name: "Galaxy Watch".to_string(),
                bundle_id: "com.sec.android.app.shealth".to_string(),
            },
            start: at(h, 0),
            end: at(h + 1, 0),
            activity_code: 56,
            title: None,
            segments: Vec::new(),
            has_route: false,
        }
    }

    fn sample(handle: &str, h: u32, value: f64, unit: NativeUnit) -> QuantitySample {
        QuantitySample {
            metric: handle.to_string(),
            start: at(h, 5),
            end: at(h, 50),
            quantity: Quantity::new(value, unit),
        }
    }

    fn granted_all() -> Vec<String> {
        [
            "READ_EXERCISE",
            "READ_STEPS",
            "READ_TOTAL_CALORIES_BURNED",
            "READ_ACTIVE_CALORIES_BURNED",
            "READ_DISTANCE",
            "READ_HEART_RATE",
            "READ_EXERCISE_ROUTE",
        ]
        .iter()
        .map(|p| format!("android.permission.health.{p}"))
        .collect()
    }

    async fn enrich(
        fixture: StoreFixture,
        records: &[RawWorkout],
        flags: WorkoutFlags,
    ) -> Vec<Workout> {
        let vocab = vocabulary_for(fixture.platform);
        let store = MemoryStore::new(fixture);
        let registry = MetricRegistry::new(vocab);
        let granted = GrantedPermissions::fetch(&store, vocab).await.unwrap();
        let config = BridgeConfig::default();
        WorkoutEnricher::new(&store, vocab, &registry, &granted, &config)
            .enrich_all(records, flags)
            .await
    }

    fn fixture() -> StoreFixture {
        let mut fixture = StoreFixture::empty(Platform::HealthConnect);
        fixture.granted = granted_all();
        fixture
    }

    #[tokio::test]
    async fn test_total_calories_preferred_over_active() {
        let mut fixture = fixture();
        fixture.quantity_samples = vec![
            sample(TOTAL, 7, 540.0, NativeUnit::Kilocalorie),
            sample(ACTIVE, 7, 410.0, NativeUnit::Kilocalorie),
            sample(DISTANCE, 7, 10.2, NativeUnit::Kilometer),
        ];
        let workouts = enrich(fixture, &[run_at(7, "w1")], WorkoutFlags::default()).await;
        assert_eq!(workouts[0].calories, Some(540.0));
        assert_eq!(workouts[0].distance, Some(10200.0));
        assert_eq!(workouts[0].workout_type, "RUNNING");
        assert_eq!(workouts[0].steps, None);
    }

    #[tokio::test]
    async fn test_active_calories_when_total_missing() {
        let mut fixture = fixture();
        fixture.quantity_samples = vec![sample(ACTIVE, 7, 410.0, NativeUnit::Kilocalorie)];
        let workouts = enrich(fixture, &[run_at(7, "w1")], WorkoutFlags::default()).await;
        assert_eq!(workouts[0].calories, Some(410.0));
        assert_eq!(workouts[0].distance, None);
    }

    #[tokio::test]
    async fn test_failed_branch_is_omitted_only() {
        let mut fixture = fixture();
        fixture.failures.push("heart_rate".to_string());
        fixture.failures.push(format!("aggregate:{DISTANCE}"));
        fixture.quantity_samples = vec![
            sample(TOTAL, 7, 540.0, NativeUnit::Kilocalorie),
            sample("StepsRecord.COUNT_TOTAL", 7, 9100.0, NativeUnit::Count),
        ];
        let flags = WorkoutFlags {
            include_heart_rate: true,
            include_steps: true,
            include_route: false,
        };
        let workouts = enrich(fixture, &[run_at(7, "w1")], flags).await;
        let w = &workouts[0];
        assert_eq!(w.heart_rate, None);
        assert_eq!(w.distance, None);
        assert_eq!(w.calories, Some(540.0));
        assert_eq!(w.steps, Some(9100.0));
    }

    #[tokio::test]
    async fn test_heart_rate_within_workout_window() {
        let mut fixture = fixture();
        fixture.heart_rate = vec![
            RawHeartRate { timestamp: at(6, 59), bpm: 70.0 },
            RawHeartRate { timestamp: at(7, 10), bpm: 142.0 },
            RawHeartRate { timestamp: at(8, 0), bpm: 128.0 },
        ];
        let flags = WorkoutFlags {
            include_heart_rate: true,
            ..Default::default()
        };
        let workouts = enrich(fixture, &[run_at(7, "w1")], flags).await;
        let bpm: Vec<f64> = workouts[0]
            .heart_rate
            .as_ref()
            .unwrap()
            .iter()
            .map(|s| s.bpm)
            .collect();
        assert_eq!(bpm, vec![142.0, 128.0]);
    }

    #[tokio::test]
    async fn test_route_needs_flag_permission_and_route_data() {
        let mut fixture = fixture();
        fixture.routes.insert(
            "w1".to_string(),
            vec![RawLocation {
                timestamp: at(7, 1),
                latitude: 52.52,
                longitude: 13.405,
                altitude: Some(34.0),
            }],
        );
        let mut with_route = run_at(7, "w1");
        with_route.has_route = true;
        let without_route = run_at(9, "w2");
        let flags = WorkoutFlags {
            include_route: true,
            ..Default::default()
        };

        let workouts = enrich(fixture.clone(), &[with_route.clone(), without_route], flags).await;
        assert_eq!(workouts[0].route.as_ref().map(|r| r.len()), Some(1));
        assert_eq!(workouts[1].route, None);

        fixture.granted.retain(|p| !p.ends_with("READ_EXERCISE_ROUTE"));
        let workouts = enrich(fixture, &[with_route], flags).await;
        assert_eq!(workouts[0].route, None);
    }

    #[tokio::test]
    async fn test_duration_sums_segments() {
        let mut workout = run_at(7, "w1");
        workout.segments = vec![
            RawSegment { start: at(7, 0), end: at(7, 20) },
            RawSegment { start: at(7, 30), end: at(7, 55) },
        ];
        let workouts = enrich(fixture(), &[workout, run_at(9, "w2")], WorkoutFlags::default()).await;
        assert_eq!(workouts[0].duration_seconds, 2700.0);
        assert_eq!(workouts[1].duration_seconds, 3600.0);
    }

    #[tokio::test]
    async fn test_batch_keeps_native_order() {
        let records: Vec<RawWorkout> = [(15, "c"), (6, "a"), (11, "b")]
            .into_iter()
            .map(|(h, id)| run_at(h, id))
            .collect();
        let workouts = enrich(fixture(), &records, WorkoutFlags::default()).await;
        let ids: Vec<&str> = workouts.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(workouts[1].end_date - workouts[1].start_date, Duration::hours(1));
    }
}
