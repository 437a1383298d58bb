//! Bridge request payloads
//!
//! Every field is optional at the serde level so an absent field can be
//! reported as [`BridgeError::MissingParameter`] naming it, instead of a
//! generic JSON error. `validate` turns a payload into typed query arguments
//! before any native call is made.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::types::{Bucket, TimeRange};
use crate::workouts::WorkoutFlags;

fn required<'a, T>(value: &'a Option<T>, field: &'static str) -> Result<&'a T, BridgeError> {
    value.as_ref().ok_or(BridgeError::MissingParameter(field))
}

/// Parse an ISO-8601 / RFC 3339 timestamp
pub fn parse_date(field: &'static str, value: &str) -> Result<DateTime<Utc>, BridgeError> {
    DateTime::parse_from_rfc3339(value)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|_| BridgeError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

fn time_range(
    start_date: &Option<String>,
    end_date: &Option<String>,
) -> Result<TimeRange, BridgeError> {
    let start = required(start_date, "startDate")?;
    let end = required(end_date, "endDate")?;
    TimeRange::new(parse_date("startDate", start)?, parse_date("endDate", end)?)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionsRequest {
    pub permissions: Option<Vec<String>>,
}

impl PermissionsRequest {
    pub fn permissions(&self) -> Result<&[String], BridgeError> {
        required(&self.permissions, "permissions").map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub data_type: Option<String>,
    pub bucket: Option<String>,
}

/// Validated arguments of `queryAggregated`
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedQuery {
    pub range: TimeRange,
    pub data_type: String,
    pub bucket: Bucket,
}

impl AggregatedRequest {
    pub fn validate(&self) -> Result<AggregatedQuery, BridgeError> {
        let data_type = required(&self.data_type, "dataType")?;
        let bucket = required(&self.bucket, "bucket")?;
        let range = time_range(&self.start_date, &self.end_date)?;
        let bucket =
            Bucket::parse(bucket).ok_or_else(|| BridgeError::UnsupportedBucket(bucket.clone()))?;
        Ok(AggregatedQuery {
            range,
            data_type: data_type.clone(),
            bucket,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutsRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub include_heart_rate: Option<bool>,
    pub include_route: Option<bool>,
    pub include_steps: Option<bool>,
}

impl WorkoutsRequest {
    /// Range and sub-query flags; absent flags are off
    pub fn validate(&self) -> Result<(TimeRange, WorkoutFlags), BridgeError> {
        let range = time_range(&self.start_date, &self.end_date)?;
        let flags = WorkoutFlags {
            include_heart_rate: self.include_heart_rate.unwrap_or(false),
            include_route: self.include_route.unwrap_or(false),
            include_steps: self.include_steps.unwrap_or(false),
        };
        Ok((range, flags))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl SleepRequest {
    pub fn validate(&self) -> Result<TimeRange, BridgeError> {
        time_range(&self.start_date, &self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn aggregated(json: &str) -> Result<AggregatedQuery, BridgeError> {
        serde_json::from_str::<AggregatedRequest>(json)?.validate()
    }

    #[test]
    fn test_missing_fields_are_named() {
        let err = aggregated(r#"{"startDate":"2024-01-01T00:00:00Z","dataType":"steps","bucket":"day"}"#)
            .unwrap_err();
        assert!(matches!(err, BridgeError::MissingParameter("endDate")));

        let err = PermissionsRequest::default().permissions().unwrap_err();
        assert!(matches!(err, BridgeError::MissingParameter("permissions")));
    }

    #[test]
    fn test_dates_accept_offsets_and_reject_garbage() {
        let query = aggregated(
            r#"{"startDate":"2024-01-01T02:00:00+02:00","endDate":"2024-01-02T00:00:00.000Z","dataType":"steps","bucket":"day"}"#,
        )
        .unwrap();
        assert_eq!(query.range.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(query.bucket, Bucket::Day);

        let err = aggregated(
            r#"{"startDate":"yesterday","endDate":"2024-01-02T00:00:00Z","dataType":"steps","bucket":"day"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidDate { field: "startDate", .. }));
    }

    #[test]
    fn test_inverted_range_and_unknown_bucket() {
        let err = SleepRequest {
            start_date: Some("2024-01-02T00:00:00Z".to_string()),
            end_date: Some("2024-01-01T00:00:00Z".to_string()),
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidTimeRange));

        let err = aggregated(
            r#"{"startDate":"2024-01-01T00:00:00Z","endDate":"2024-01-02T00:00:00Z","dataType":"steps","bucket":"month"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedBucket(b) if b == "month"));
    }

    #[test]
    fn test_workout_flags_default_off() {
        let request: WorkoutsRequest = serde_json::from_str(
            r#"{"startDate":"2024-01-01T00:00:00Z","endDate":"2024-01-02T00:00:00Z","includeRoute":true}"#,
        )
        .unwrap();
        let (_, flags) = request.validate().unwrap();
        assert_eq!(
            flags,
            WorkoutFlags {
                include_route: true,
                ..Default::default()
            }
        );
    }
}
