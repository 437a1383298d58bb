//! Bridge configuration
//!
//! Settings that shape query-time normalization. All fields have defaults so an
//! empty JSON object is a valid configuration.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Default number of native sub-queries kept in flight per request
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    /// Offset of the user's local time from UTC, used for calendar-day grouping
    pub utc_offset_minutes: i32,
    /// Hour (local) at which one sleep "night" rolls over to the next.
    /// 0 groups sleep stages by plain calendar day of their start.
    pub sleep_day_boundary_hour: u32,
    /// Upper bound on native sub-queries (buckets, workouts) in flight at once
    pub max_concurrent_queries: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            sleep_day_boundary_hour: 0,
            max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        let config: BridgeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        // UTC-14:00 through UTC+14:00 covers every real zone
        if self.utc_offset_minutes.abs() > 14 * 60 {
            return Err(BridgeError::InvalidConfig(format!(
                "utcOffsetMinutes out of range: {}",
                self.utc_offset_minutes
            )));
        }
        if self.sleep_day_boundary_hour > 23 {
            return Err(BridgeError::InvalidConfig(format!(
                "sleepDayBoundaryHour must be 0-23, got {}",
                self.sleep_day_boundary_hour
            )));
        }
        if self.max_concurrent_queries == 0 {
            return Err(BridgeError::InvalidConfig(
                "maxConcurrentQueries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    /// Local calendar day an instant falls on
    pub fn local_day(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset()).date_naive()
    }

    /// UTC instant at which a local calendar day starts
    pub fn day_start(&self, day: NaiveDate) -> DateTime<Utc> {
        let local_midnight = day.and_hms_opt(0, 0, 0).unwrap_or_default();
        let offset_secs = i64::from(self.offset().local_minus_utc());
        DateTime::<Utc>::from_naive_utc_and_offset(local_midnight, Utc)
            - chrono::Duration::seconds(offset_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = BridgeConfig::from_json("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_rejects_out_of_range_boundary() {
        let result = BridgeConfig::from_json(r#"{"sleepDayBoundaryHour": 24}"#);
        assert!(matches!(result, Err(BridgeError::InvalidConfig(_))));
    }

    #[test]
    fn test_local_day_respects_offset() {
        let config = BridgeConfig {
            utc_offset_minutes: -300,
            ..Default::default()
        };
        let instant = Utc.with_ymd_and_hms(2024, 1, 16, 3, 0, 0).unwrap();
        assert_eq!(
            config.local_day(instant),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert_eq!(
            config.day_start(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
            Utc.with_ymd_and_hms(2024, 1, 15, 5, 0, 0).unwrap()
        );
    }
}
