//! Android Health Connect vocabulary
//!
//! Exercise codes follow `ExerciseSessionRecord.EXERCISE_TYPE_*`, stage codes
//! follow `SleepSessionRecord.STAGE_TYPE_*`.

use super::{EmptyBucketPolicy, PlatformVocabulary};
use crate::metrics::Metric;
use crate::types::{Bucket, Permission, Platform, SleepStage};

pub struct HealthConnectVocabulary;

const EXERCISE_TYPES: &[(i64, &str)] = &[
    (0, "OTHER"),
    (2, "BADMINTON"),
    (4, "BASEBALL"),
    (5, "BASKETBALL"),
    (8, "BIKING"),
    (9, "BIKING_STATIONARY"),
    (10, "BOOT_CAMP"),
    (11, "BOXING"),
    (13, "CALISTHENICS"),
    (14, "CRICKET"),
    (16, "DANCING"),
    (25, "ELLIPTICAL"),
    (26, "EXERCISE_CLASS"),
    (27, "FENCING"),
    (28, "FOOTBALL_AMERICAN"),
    (29, "FOOTBALL_AUSTRALIAN"),
    (31, "FRISBEE_DISC"),
    (32, "GOLF"),
    (33, "GUIDED_BREATHING"),
    (34, "GYMNASTICS"),
    (35, "HANDBALL"),
    (36, "HIGH_INTENSITY_INTERVAL_TRAINING"),
    (37, "HIKING"),
    (38, "ICE_HOCKEY"),
    (39, "ICE_SKATING"),
    (44, "MARTIAL_ARTS"),
    (46, "PADDLING"),
    (47, "PARAGLIDING"),
    (48, "PILATES"),
    (50, "RACQUETBALL"),
    (51, "ROCK_CLIMBING"),
    (52, "ROLLER_HOCKEY"),
    (53, "ROWING"),
    (54, "ROWING_MACHINE"),
    (55, "RUGBY"),
    (56, "RUNNING"),
    (57, "RUNNING_TREADMILL"),
    (58, "SAILING"),
    (59, "SCUBA_DIVING"),
    (60, "SKATING"),
    (61, "SKIING"),
    (62, "SNOWBOARDING"),
    (63, "SNOWSHOEING"),
    (64, "SOCCER"),
    (65, "SOFTBALL"),
    (66, "SQUASH"),
    (68, "STAIR_CLIMBING"),
    (69, "STAIR_CLIMBING_MACHINE"),
    (70, "STRENGTH_TRAINING"),
    (71, "STRETCHING"),
    (72, "SURFING"),
    (73, "SWIMMING_OPEN_WATER"),
    (74, "SWIMMING_POOL"),
    (75, "TABLE_TENNIS"),
    (76, "TENNIS"),
    (78, "VOLLEYBALL"),
    (79, "WALKING"),
    (80, "WATER_POLO"),
    (81, "WEIGHTLIFTING"),
    (82, "WHEELCHAIR"),
    (83, "YOGA"),
];

const SLEEP_STAGES: &[(i64, SleepStage)] = &[
    (0, SleepStage::Unknown),
    (1, SleepStage::Awake),
    (2, SleepStage::Sleeping),
    (3, SleepStage::OutOfBed),
    (4, SleepStage::Light),
    (5, SleepStage::Deep),
    (6, SleepStage::Rem),
];

impl PlatformVocabulary for HealthConnectVocabulary {
    fn platform(&self) -> Platform {
        Platform::HealthConnect
    }

    fn workout_table(&self) -> &'static [(i64, &'static str)] {
        EXERCISE_TYPES
    }

    fn sleep_stage_table(&self) -> &'static [(i64, SleepStage)] {
        SLEEP_STAGES
    }

    fn permission_identifiers(&self, permission: Permission) -> &'static [&'static str] {
        match permission {
            Permission::ReadSteps => &["android.permission.health.READ_STEPS"],
            Permission::ReadWorkouts => &["android.permission.health.READ_EXERCISE"],
            Permission::ReadActiveCalories => {
                &["android.permission.health.READ_ACTIVE_CALORIES_BURNED"]
            }
            Permission::ReadTotalCalories => {
                &["android.permission.health.READ_TOTAL_CALORIES_BURNED"]
            }
            Permission::ReadDistance => &["android.permission.health.READ_DISTANCE"],
            Permission::ReadHeartRate => &["android.permission.health.READ_HEART_RATE"],
            Permission::ReadRoute => &["android.permission.health.READ_EXERCISE_ROUTE"],
            Permission::ReadSleep => &["android.permission.health.READ_SLEEP"],
            Permission::ReadBodyTemperature => {
                &["android.permission.health.READ_BODY_TEMPERATURE"]
            }
            Permission::ReadHeight => &["android.permission.health.READ_HEIGHT"],
            Permission::ReadWeight => &["android.permission.health.READ_WEIGHT"],
            Permission::ReadMindfulness => &[],
        }
    }

    fn metric_handle(&self, metric: Metric) -> Option<&'static str> {
        match metric {
            Metric::Steps => Some("StepsRecord.COUNT_TOTAL"),
            Metric::ActiveCalories => Some("ActiveCaloriesBurnedRecord.ACTIVE_CALORIES_TOTAL"),
            Metric::TotalCalories => Some("TotalCaloriesBurnedRecord.ENERGY_TOTAL"),
            Metric::Distance => Some("DistanceRecord.DISTANCE_TOTAL"),
            Metric::Mindfulness => None,
        }
    }

    // Period slicing is only wired up for whole days
    fn supports_bucket(&self, bucket: Bucket) -> bool {
        bucket == Bucket::Day
    }

    fn empty_bucket_policy(&self) -> EmptyBucketPolicy {
        EmptyBucketPolicy::EmitNull
    }

    /// Health Connect reports grants with varying prefixes, so only the part
    /// after the last `.` is compared
    fn grant_key<'a>(&self, identifier: &'a str) -> &'a str {
        identifier
            .rsplit_once('.')
            .map(|(_, suffix)| suffix)
            .unwrap_or(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sleep_stage_codes_map_one_to_one() {
        let vocab = HealthConnectVocabulary;
        assert_eq!(vocab.sleep_stage(1), SleepStage::Awake);
        assert_eq!(vocab.sleep_stage(3), SleepStage::OutOfBed);
        assert_eq!(vocab.sleep_stage(5), SleepStage::Deep);
        for stage in SleepStage::ALL {
            let code = vocab.sleep_stage_code(stage).unwrap();
            assert_eq!(vocab.sleep_stage(code), stage);
        }
    }

    #[test]
    fn test_exercise_codes() {
        let vocab = HealthConnectVocabulary;
        assert_eq!(vocab.workout_type(56), "RUNNING");
        assert_eq!(vocab.workout_type(8), "BIKING");
        assert_eq!(vocab.workout_type(1), "OTHER");
        assert_eq!(vocab.workout_code("YOGA"), Some(83));
    }

    #[test]
    fn test_grant_compares_suffix() {
        let vocab = HealthConnectVocabulary;
        let granted: HashSet<String> = ["READ_STEPS".to_string()].into_iter().collect();
        assert!(vocab.is_granted(Permission::ReadSteps, &granted));
        assert!(!vocab.is_granted(Permission::ReadSleep, &granted));
        assert!(!vocab.is_granted(Permission::ReadMindfulness, &granted));
        assert_eq!(
            vocab.grant_key("android.permission.health.READ_SLEEP"),
            "READ_SLEEP"
        );
    }

    #[test]
    fn test_only_day_buckets() {
        let vocab = HealthConnectVocabulary;
        assert!(vocab.supports_bucket(Bucket::Day));
        assert!(!vocab.supports_bucket(Bucket::Hour));
        assert!(!vocab.supports_bucket(Bucket::Week));
    }
}
