//! Bridge response payloads

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{AggregatedSample, SleepSession, Workout};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

/// Grant status per requested permission name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionsResponse {
    pub permissions: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResponse {
    pub aggregated_data: Vec<AggregatedSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutsResponse {
    pub workouts: Vec<Workout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepResponse {
    pub sleep_sessions: Vec<SleepSession>,
}
