//! Apple HealthKit vocabulary
//!
//! Activity codes follow `HKWorkoutActivityType` raw values, stage codes follow
//! `HKCategoryValueSleepAnalysis`.

use super::{EmptyBucketPolicy, PlatformVocabulary};
use crate::metrics::Metric;
use crate::types::{Bucket, Permission, Platform, SleepStage};

pub struct HealthKitVocabulary;

const ACTIVITY_TYPES: &[(i64, &str)] = &[
    (1, "FOOTBALL_AMERICAN"),
    (2, "ARCHERY"),
    (3, "FOOTBALL_AUSTRALIAN"),
    (4, "BADMINTON"),
    (5, "BASEBALL"),
    (6, "BASKETBALL"),
    (7, "BOWLING"),
    (8, "BOXING"),
    (9, "ROCK_CLIMBING"),
    (10, "CRICKET"),
    (11, "CROSS_TRAINING"),
    (12, "CURLING"),
    (13, "BIKING"),
    (14, "DANCING"),
    (15, "DANCING"),
    (16, "ELLIPTICAL"),
    (17, "EQUESTRIAN_SPORTS"),
    (18, "FENCING"),
    (19, "FISHING"),
    (20, "STRENGTH_TRAINING"),
    (21, "GOLF"),
    (22, "GYMNASTICS"),
    (23, "HANDBALL"),
    (24, "HIKING"),
    (25, "ICE_HOCKEY"),
    (26, "HUNTING"),
    (27, "LACROSSE"),
    (28, "MARTIAL_ARTS"),
    (29, "MIND_AND_BODY"),
    (30, "MIXED_CARDIO"),
    (31, "PADDLING"),
    (32, "PLAY"),
    (33, "PREPARATION_AND_RECOVERY"),
    (34, "RACQUETBALL"),
    (35, "ROWING"),
    (36, "RUGBY"),
    (37, "RUNNING"),
    (38, "SAILING"),
    (39, "SKATING"),
    (40, "SNOW_SPORTS"),
    (41, "SOCCER"),
    (42, "SOFTBALL"),
    (43, "SQUASH"),
    (44, "STAIR_CLIMBING"),
    (45, "SURFING"),
    (46, "SWIMMING"),
    (47, "TABLE_TENNIS"),
    (48, "TENNIS"),
    (49, "TRACK_AND_FIELD"),
    (50, "WEIGHTLIFTING"),
    (51, "VOLLEYBALL"),
    (52, "WALKING"),
    (53, "WATER_FITNESS"),
    (54, "WATER_POLO"),
    (55, "WATER_SPORTS"),
    (56, "WRESTLING"),
    (57, "YOGA"),
    (58, "BARRE"),
    (59, "CORE_TRAINING"),
    (60, "CROSS_COUNTRY_SKIING"),
    (61, "SKIING"),
    (62, "STRETCHING"),
    (63, "HIGH_INTENSITY_INTERVAL_TRAINING"),
    (64, "JUMP_ROPE"),
    (65, "KICKBOXING"),
    (66, "PILATES"),
    (67, "SNOWBOARDING"),
    (68, "STAIR_CLIMBING"),
    (69, "STEP_TRAINING"),
    (70, "WHEELCHAIR"),
    (71, "WHEELCHAIR"),
    (72, "TAI_CHI"),
    (73, "MIXED_CARDIO"),
    (74, "HAND_CYCLING"),
    (75, "FRISBEE_DISC"),
    (76, "FITNESS_GAMING"),
    (77, "DANCING"),
    (78, "DANCING"),
    (79, "PICKLEBALL"),
    (80, "COOLDOWN"),
    (82, "SWIM_BIKE_RUN"),
    (83, "TRANSITION"),
    (84, "SCUBA_DIVING"),
    (3000, "OTHER"),
];

// HealthKit has a single undifferentiated "asleep" value besides core/deep/REM.
// It is reported as LIGHT; `inBed` is reported as OUT_OF_BED so it never counts
// toward sleep time.
const SLEEP_ANALYSIS: &[(i64, SleepStage)] = &[
    (0, SleepStage::OutOfBed),
    (1, SleepStage::Light),
    (2, SleepStage::Awake),
    (3, SleepStage::Light),
    (4, SleepStage::Deep),
    (5, SleepStage::Rem),
];

const DISTANCE_TYPES: &[&str] = &[
    "HKQuantityTypeIdentifierDistanceCycling",
    "HKQuantityTypeIdentifierDistanceSwimming",
    "HKQuantityTypeIdentifierDistanceWalkingRunning",
    "HKQuantityTypeIdentifierDistanceDownhillSnowSports",
];

impl PlatformVocabulary for HealthKitVocabulary {
    fn platform(&self) -> Platform {
        Platform::HealthKit
    }

    fn workout_table(&self) -> &'static [(i64, &'static str)] {
        ACTIVITY_TYPES
    }

    fn sleep_stage_table(&self) -> &'static [(i64, SleepStage)] {
        SLEEP_ANALYSIS
    }

    fn permission_identifiers(&self, permission: Permission) -> &'static [&'static str] {
        match permission {
            Permission::ReadSteps => &["HKQuantityTypeIdentifierStepCount"],
            // Total energy is not a separate type; both read active energy
            Permission::ReadActiveCalories | Permission::ReadTotalCalories => {
                &["HKQuantityTypeIdentifierActiveEnergyBurned"]
            }
            Permission::ReadWorkouts => &["HKWorkoutTypeIdentifier"],
            Permission::ReadHeartRate => &["HKQuantityTypeIdentifierHeartRate"],
            Permission::ReadRoute => &["HKWorkoutRouteTypeIdentifier"],
            Permission::ReadDistance => DISTANCE_TYPES,
            Permission::ReadMindfulness => &["HKCategoryTypeIdentifierMindfulSession"],
            Permission::ReadSleep => &["HKCategoryTypeIdentifierSleepAnalysis"],
            Permission::ReadHeight => &["HKQuantityTypeIdentifierHeight"],
            Permission::ReadWeight => &["HKQuantityTypeIdentifierBodyMass"],
            Permission::ReadBodyTemperature => &["HKQuantityTypeIdentifierBodyTemperature"],
        }
    }

    fn metric_handle(&self, metric: Metric) -> Option<&'static str> {
        match metric {
            Metric::Steps => Some("HKQuantityTypeIdentifierStepCount"),
            Metric::ActiveCalories => Some("HKQuantityTypeIdentifierActiveEnergyBurned"),
            Metric::Distance => Some("HKQuantityTypeIdentifierDistanceWalkingRunning"),
            Metric::Mindfulness => Some("HKCategoryTypeIdentifierMindfulSession"),
            Metric::TotalCalories => None,
        }
    }

    fn supports_bucket(&self, _bucket: Bucket) -> bool {
        true
    }

    fn empty_bucket_policy(&self) -> EmptyBucketPolicy {
        EmptyBucketPolicy::Omit
    }
}
