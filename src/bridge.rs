//! Health bridge facade
//!
//! [`HealthBridge`] is what the mobile host talks to. It owns the native store
//! and the platform vocabulary, validates requests, checks permissions, and
//! routes each query to the aggregation engine, the workout enricher or the
//! sleep reconstructor. Nothing is carried between requests except the
//! permission gate.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::aggregation::AggregationEngine;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::metrics::MetricRegistry;
use crate::permissions::{permission_status, GrantedPermissions, PermissionGate};
use crate::schema::{
    AggregatedRequest, AggregatedResponse, AvailabilityResponse, PermissionsRequest,
    PermissionsResponse, SleepRequest, SleepResponse, WorkoutsRequest, WorkoutsResponse,
};
use crate::sleep::SleepReconstructor;
use crate::store::{HealthStore, RawVitalSample};
use crate::types::{Permission, VitalKind, VitalMetadata, VitalReading};
use crate::vocabulary::{vocabulary_for, PlatformVocabulary};
use crate::workouts::WorkoutEnricher;

/// Method names accepted by [`HealthBridge::call`]
pub const METHODS: &[&str] = &[
    "isHealthAvailable",
    "checkHealthPermissions",
    "requestHealthPermissions",
    "queryAggregated",
    "queryWorkouts",
    "querySleepData",
    "queryHeight",
    "queryWeight",
    "queryBodyTemperature",
];

pub struct HealthBridge<S: HealthStore> {
    store: S,
    vocab: &'static dyn PlatformVocabulary,
    registry: MetricRegistry,
    config: BridgeConfig,
    permission_gate: PermissionGate,
}

impl<S: HealthStore> HealthBridge<S> {
    pub fn new(store: S) -> Self {
        let vocab = vocabulary_for(store.platform());
        Self {
            store,
            vocab,
            registry: MetricRegistry::new(vocab),
            config: BridgeConfig::default(),
            permission_gate: PermissionGate::new(),
        }
    }

    pub fn with_config(store: S, config: BridgeConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        let mut bridge = Self::new(store);
        bridge.config = config;
        Ok(bridge)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    async fn granted(&self) -> Result<GrantedPermissions, BridgeError> {
        GrantedPermissions::fetch(&self.store, self.vocab).await
    }

    async fn require(&self, permission: Permission) -> Result<GrantedPermissions, BridgeError> {
        let granted = self.granted().await?;
        if granted.contains(permission) {
            Ok(granted)
        } else {
            Err(BridgeError::PermissionDenied(permission.as_str()))
        }
    }

    #[instrument(skip(self))]
    pub async fn is_health_available(&self) -> AvailabilityResponse {
        AvailabilityResponse {
            available: self.store.is_available().await,
        }
    }

    #[instrument(skip_all)]
    pub async fn check_health_permissions(
        &self,
        request: PermissionsRequest,
    ) -> Result<PermissionsResponse, BridgeError> {
        let requested = request.permissions()?;
        let granted = self.granted().await?;
        Ok(PermissionsResponse {
            permissions: permission_status(requested, &granted),
        })
    }

    #[instrument(skip_all)]
    pub async fn request_health_permissions(
        &self,
        request: PermissionsRequest,
    ) -> Result<PermissionsResponse, BridgeError> {
        let requested = request.permissions()?;
        let permissions = self
            .permission_gate
            .request(&self.store, self.vocab, requested)
            .await?;
        Ok(PermissionsResponse { permissions })
    }

    #[instrument(skip_all, fields(data_type = request.data_type.as_deref()))]
    pub async fn query_aggregated(
        &self,
        request: AggregatedRequest,
    ) -> Result<AggregatedResponse, BridgeError> {
        let query = request.validate()?;
        let descriptor = self.registry.resolve(&query.data_type)?;
        let aggregated_data = AggregationEngine::new(&self.store, self.vocab, &self.config)
            .aggregate(descriptor, query.range, query.bucket)
            .await?;
        debug!(samples = aggregated_data.len(), "aggregated");
        Ok(AggregatedResponse { aggregated_data })
    }

    #[instrument(skip_all)]
    pub async fn query_workouts(
        &self,
        request: WorkoutsRequest,
    ) -> Result<WorkoutsResponse, BridgeError> {
        let (range, flags) = request.validate()?;
        let granted = self.require(Permission::ReadWorkouts).await?;
        let records = self
            .store
            .read_workouts(range)
            .await
            .map_err(|e| BridgeError::native("workouts", e))?;
        debug!(workouts = records.len(), ?flags, "enriching workouts");

        let workouts = WorkoutEnricher::new(
            &self.store,
            self.vocab,
            &self.registry,
            &granted,
            &self.config,
        )
        .enrich_all(&records, flags)
        .await;
        Ok(WorkoutsResponse { workouts })
    }

    #[instrument(skip_all)]
    pub async fn query_sleep_data(
        &self,
        request: SleepRequest,
    ) -> Result<SleepResponse, BridgeError> {
        let range = request.validate()?;
        self.require(Permission::ReadSleep).await?;
        let records = self
            .store
            .read_sleep_stages(range)
            .await
            .map_err(|e| BridgeError::native("sleep data", e))?;
        let sleep_sessions =
            SleepReconstructor::new(self.vocab, &self.config).reconstruct(records, range);
        debug!(sessions = sleep_sessions.len(), "reconstructed sleep");
        Ok(SleepResponse { sleep_sessions })
    }

    pub async fn query_height(&self) -> Result<VitalReading, BridgeError> {
        self.query_vital(VitalKind::Height).await
    }

    pub async fn query_weight(&self) -> Result<VitalReading, BridgeError> {
        self.query_vital(VitalKind::Weight).await
    }

    pub async fn query_body_temperature(&self) -> Result<VitalReading, BridgeError> {
        self.query_vital(VitalKind::BodyTemperature).await
    }

    /// Latest reading of a vital. Unlike aggregates, a missing permission
    /// rejects the request.
    #[instrument(skip(self))]
    pub async fn query_vital(&self, kind: VitalKind) -> Result<VitalReading, BridgeError> {
        if !self.store.is_available().await {
            return Err(BridgeError::HealthUnavailable);
        }
        self.require(kind.permission()).await?;
        let latest = self
            .store
            .latest_vital(kind)
            .await
            .map_err(|e| BridgeError::native(kind.response_key(), e))?;
        Ok(latest.map_or_else(|| VitalReading::empty(kind), |sample| vital_reading(kind, sample)))
    }

    /// Dispatch a JSON request by host method name
    pub async fn call(&self, method: &str, payload: &str) -> Result<serde_json::Value, BridgeError> {
        let payload = if payload.trim().is_empty() { "{}" } else { payload };
        match method {
            "isHealthAvailable" => respond(self.is_health_available().await),
            "checkHealthPermissions" => {
                respond(self.check_health_permissions(serde_json::from_str(payload)?).await?)
            }
            "requestHealthPermissions" => {
                respond(self.request_health_permissions(serde_json::from_str(payload)?).await?)
            }
            "queryAggregated" => respond(self.query_aggregated(serde_json::from_str(payload)?).await?),
            "queryWorkouts" => respond(self.query_workouts(serde_json::from_str(payload)?).await?),
            "querySleepData" => respond(self.query_sleep_data(serde_json::from_str(payload)?).await?),
            "queryHeight" => respond(self.query_height().await?),
            "queryWeight" => respond(self.query_weight().await?),
            "queryBodyTemperature" => respond(self.query_body_temperature().await?),
            other => Err(BridgeError::UnknownMethod(other.to_string())),
        }
    }
}

fn respond<T: Serialize>(response: T) -> Result<serde_json::Value, BridgeError> {
    Ok(serde_json::to_value(response)?)
}

fn vital_reading(kind: VitalKind, sample: RawVitalSample) -> VitalReading {
    let value = match kind {
        VitalKind::Height => sample.quantity.in_meters(),
        VitalKind::Weight => sample.quantity.in_kilograms(),
        VitalKind::BodyTemperature => sample.quantity.in_celsius(),
    };
    VitalReading {
        kind,
        value,
        timestamp: Some(sample.time),
        metadata: Some(VitalMetadata {
            id: sample.id,
            last_modified_time: sample.last_modified,
            client_record_id: sample.client_record_id.unwrap_or_default(),
            data_origin: sample.data_origin,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RawSleepStage, RecordSource, StoreFixture};
    use crate::types::Platform;
    use crate::units::{NativeUnit, Quantity};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bridge_for(fixture: StoreFixture) -> HealthBridge<MemoryStore> {
        HealthBridge::new(MemoryStore::new(fixture))
    }

    #[tokio::test]
    async fn test_missing_parameter_makes_no_native_call() {
        let bridge = bridge_for(StoreFixture::empty(Platform::HealthConnect));
        let err = bridge
            .call("queryWorkouts", r#"{"startDate":"2024-01-01T00:00:00Z"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::MissingParameter("endDate")));
        let err = bridge.call("checkHealthPermissions", "").await.unwrap_err();
        assert!(matches!(err, BridgeError::MissingParameter("permissions")));
        assert_eq!(bridge.store().native_calls(), 0);
    }

    #[tokio::test]
    async fn test_workouts_reject_without_permission() {
        let bridge = bridge_for(StoreFixture::empty(Platform::HealthConnect));
        let err = bridge
            .call(
                "queryWorkouts",
                r#"{"startDate":"2024-01-01T00:00:00Z","endDate":"2024-01-02T00:00:00Z"}"#,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::PermissionDenied("READ_WORKOUTS")));
        // only the permission lookup reached the store
        assert_eq!(bridge.store().native_calls(), 1);
    }

    #[test]
    fn test_with_config_rejects_invalid_config() {
        let config = BridgeConfig {
            max_concurrent_queries: 0,
            ..Default::default()
        };
        let result = HealthBridge::with_config(
            MemoryStore::new(StoreFixture::empty(Platform::HealthKit)),
            config,
        );
        assert!(matches!(result, Err(BridgeError::InvalidConfig(_))));

        let config = BridgeConfig {
            sleep_day_boundary_hour: 6,
            ..Default::default()
        };
        let bridge = HealthBridge::with_config(
            MemoryStore::new(StoreFixture::empty(Platform::HealthKit)),
            config,
        )
        .unwrap();
        assert_eq!(bridge.config().sleep_day_boundary_hour, 6);
    }

    #[tokio::test]
    async fn test_height_without_records_is_null() {
        let mut fixture = StoreFixture::empty(Platform::HealthConnect);
        fixture
            .granted
            .push("android.permission.health.READ_HEIGHT".to_string());
        let value = bridge_for(fixture).call("queryHeight", "").await.unwrap();
        assert_eq!(value, json!({"height": null, "timestamp": null}));
    }

    #[tokio::test]
    async fn test_vital_queries_reject_without_permission() {
        let bridge = bridge_for(StoreFixture::empty(Platform::HealthKit));
        let err = bridge.query_weight().await.unwrap_err();
        assert!(matches!(err, BridgeError::PermissionDenied("READ_WEIGHT")));

        let mut fixture = StoreFixture::empty(Platform::HealthKit);
        fixture.available = false;
        let err = bridge_for(fixture).query_height().await.unwrap_err();
        assert!(matches!(err, BridgeError::HealthUnavailable));
    }

    #[tokio::test]
    async fn test_weight_converted_with_metadata() {
        let mut fixture = StoreFixture::empty(Platform::HealthKit);
        fixture.granted.push("HKQuantityTypeIdentifierBodyMass".to_string());
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
        fixture.vitals.insert(
            VitalKind::Weight,
            vec![RawVitalSample {
                id: "w-1".to_string(),
                time: at,
                last_modified: at,
                client_record_id: None,
                data_origin: "com.withings.wiscale2".to_string(),
                quantity: Quantity::new(165.0, NativeUnit::Pound),
            }],
        );
        let reading = bridge_for(fixture).query_weight().await.unwrap();
        assert!((reading.value.unwrap() - 74.8427).abs() < 0.001);
        assert_eq!(reading.timestamp, Some(at));
        assert_eq!(reading.metadata.unwrap().data_origin, "com.withings.wiscale2");
    }

    #[tokio::test]
    async fn test_sleep_rejects_without_permission() {
        let bridge = bridge_for(StoreFixture::empty(Platform::HealthConnect));
        let err = bridge
            .query_sleep_data(SleepRequest {
                start_date: Some("2024-01-01T00:00:00Z".to_string()),
                end_date: Some("2024-01-02T00:00:00Z".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::PermissionDenied("READ_SLEEP")));
    }

    #[tokio::test]
    async fn test_aggregate_without_permission_is_empty_not_rejected() {
        let bridge = bridge_for(StoreFixture::empty(Platform::HealthConnect));
        let value = bridge
            .call(
                "queryAggregated",
                r#"{"startDate":"2024-01-01T00:00:00Z","endDate":"2024-01-04T00:00:00Z","dataType":"steps","bucket":"day"}"#,
            )
            .await
            .unwrap();
        assert_eq!(value, json!({"aggregatedData": []}));
    }

    #[tokio::test]
    async fn test_sleep_end_to_end_json() {
        let mut fixture = StoreFixture::empty(Platform::HealthKit);
        fixture
            .granted
            .push("HKCategoryTypeIdentifierSleepAnalysis".to_string());
        let at = |h: u32, m: u32| Utc.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap();
        for (start, end, code) in [(at(1, 0), at(1, 30), 3), (at(1, 30), at(2, 0), 5)] {
            fixture.sleep_stages.push(RawSleepStage {
                session_id: None,
                session_title: None,
                source: RecordSource {
                    name: "Apple Watch".to_string(),
                    bundle_id: "com.apple.health".to_string(),
                },
                start,
                end,
                stage_code: code,
            });
        }
        let value = bridge_for(fixture)
            .call(
                "querySleepData",
                r#"{"startDate":"2024-06-01T00:00:00Z","endDate":"2024-06-02T00:00:00Z"}"#,
            )
            .await
            .unwrap();
        let session = &value["sleepSessions"][0];
        assert_eq!(session["sourceBundleId"], "com.apple.health");
        assert_eq!(session["duration"], 3600.0);
        assert_eq!(session["lightSleepTime"], 1800.0);
        assert_eq!(session["remSleepTime"], 1800.0);
        assert_eq!(session["stages"][1]["stage"], "REM");
    }

    #[tokio::test]
    async fn test_unknown_method_and_bad_json() {
        let bridge = bridge_for(StoreFixture::empty(Platform::HealthKit));
        assert!(matches!(
            bridge.call("deleteEverything", "{}").await,
            Err(BridgeError::UnknownMethod(_))
        ));
        assert!(matches!(
            bridge.call("querySleepData", "{not json").await,
            Err(BridgeError::JsonError(_))
        ));
        assert_eq!(
            bridge.call("isHealthAvailable", "").await.unwrap(),
            json!({"available": true})
        );
    }

    #[tokio::test]
    async fn test_permissions_round_trip_through_call() {
        let mut fixture = StoreFixture::empty(Platform::HealthConnect);
        fixture.grant_on_request = Some(vec!["android.permission.health.READ_STEPS".to_string()]);
        let bridge = bridge_for(fixture);

        let before = bridge
            .call("checkHealthPermissions", r#"{"permissions":["READ_STEPS"]}"#)
            .await
            .unwrap();
        assert_eq!(before, json!({"permissions": {"READ_STEPS": false}}));

        let after = bridge
            .call(
                "requestHealthPermissions",
                r#"{"permissions":["READ_STEPS","READ_WEIGHT"]}"#,
            )
            .await
            .unwrap();
        assert_eq!(
            after,
            json!({"permissions": {"READ_STEPS": true, "READ_WEIGHT": false}})
        );
    }
}
