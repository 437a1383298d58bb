//! Platform vocabularies
//!
//! Each native platform names the same concepts differently: exercise codes,
//! sleep stage values, permission identifiers, aggregate metric handles. This
//! module maps both vocabularies onto the canonical types behind one trait; it is
//! the only place in the crate that knows which platform it is talking to.

mod health_connect;
mod healthkit;

pub use health_connect::HealthConnectVocabulary;
pub use healthkit::HealthKitVocabulary;

use std::collections::HashSet;

use crate::metrics::Metric;
use crate::types::{Bucket, Permission, Platform, SleepStage};

/// Canonical workout type for codes a table does not know
pub const OTHER_WORKOUT_TYPE: &str = "OTHER";

/// What the aggregation engine emits for a bucket with no contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyBucketPolicy {
    /// Emit the bucket with a null value
    EmitNull,
    /// Leave the bucket out of the result
    Omit,
}

/// Bidirectional mapping between one platform's native vocabulary and the
/// canonical types
pub trait PlatformVocabulary: Send + Sync {
    fn platform(&self) -> Platform;

    /// Native exercise code → canonical workout type, in native table order
    fn workout_table(&self) -> &'static [(i64, &'static str)];

    /// Native sleep stage code → canonical stage
    fn sleep_stage_table(&self) -> &'static [(i64, SleepStage)];

    /// Native identifiers that together grant a canonical permission.
    /// Empty when the platform has no equivalent.
    fn permission_identifiers(&self, permission: Permission) -> &'static [&'static str];

    /// Native aggregate handle for a metric, `None` if unsupported
    fn metric_handle(&self, metric: Metric) -> Option<&'static str>;

    fn supports_bucket(&self, bucket: Bucket) -> bool;

    fn empty_bucket_policy(&self) -> EmptyBucketPolicy;

    /// Form under which granted identifiers are compared
    fn grant_key<'a>(&self, identifier: &'a str) -> &'a str {
        identifier
    }

    fn workout_type(&self, code: i64) -> &'static str {
        self.workout_table()
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
            .unwrap_or(OTHER_WORKOUT_TYPE)
    }

    /// First native code carrying the canonical workout type
    fn workout_code(&self, workout_type: &str) -> Option<i64> {
        self.workout_table()
            .iter()
            .find(|(_, name)| *name == workout_type)
            .map(|(code, _)| *code)
    }

    fn sleep_stage(&self, code: i64) -> SleepStage {
        self.sleep_stage_table()
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, stage)| *stage)
            .unwrap_or(SleepStage::Unknown)
    }

    /// First native code classified as the canonical stage
    fn sleep_stage_code(&self, stage: SleepStage) -> Option<i64> {
        self.sleep_stage_table()
            .iter()
            .find(|(_, s)| *s == stage)
            .map(|(code, _)| *code)
    }

    /// Whether every native identifier behind `permission` is in `granted`
    fn is_granted(&self, permission: Permission, granted: &HashSet<String>) -> bool {
        let identifiers = self.permission_identifiers(permission);
        !identifiers.is_empty()
            && identifiers
                .iter()
                .all(|id| granted.contains(self.grant_key(id)))
    }
}

static HEALTH_CONNECT: HealthConnectVocabulary = HealthConnectVocabulary;
static HEALTHKIT: HealthKitVocabulary = HealthKitVocabulary;

/// Vocabulary for a platform
pub fn vocabulary_for(platform: Platform) -> &'static dyn PlatformVocabulary {
    match platform {
        Platform::HealthConnect => &HEALTH_CONNECT,
        Platform::HealthKit => &HEALTHKIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_codes_fall_back() {
        for platform in [Platform::HealthConnect, Platform::HealthKit] {
            let vocab = vocabulary_for(platform);
            assert_eq!(vocab.workout_type(-42), OTHER_WORKOUT_TYPE);
            assert_eq!(vocab.sleep_stage(99), SleepStage::Unknown);
        }
    }

    #[test]
    fn test_workout_tables_round_trip_first_code() {
        for platform in [Platform::HealthConnect, Platform::HealthKit] {
            let vocab = vocabulary_for(platform);
            for (code, name) in vocab.workout_table() {
                let back = vocab.workout_code(name).unwrap();
                assert_eq!(vocab.workout_type(back), *name);
                if back != *code {
                    // aliases resolve to an earlier entry of the same name
                    assert!(vocab.workout_table().iter().position(|(c, _)| *c == back)
                        < vocab.workout_table().iter().position(|(c, _)| c == code));
                }
            }
        }
    }

    #[test]
    fn test_shared_activities_agree_across_platforms() {
        let hc = vocabulary_for(Platform::HealthConnect);
        let hk = vocabulary_for(Platform::HealthKit);
        for name in ["RUNNING", "BIKING", "YOGA", "SWIMMING_POOL", "STRENGTH_TRAINING"] {
            assert!(hc.workout_code(name).is_some(), "{name} missing on Health Connect");
        }
        for name in ["RUNNING", "BIKING", "YOGA", "HIKING", "WALKING"] {
            assert_eq!(hk.workout_type(hk.workout_code(name).unwrap()), name);
            assert!(hc.workout_code(name).is_some());
        }
    }

    #[test]
    fn test_every_permission_except_mindfulness_maps_on_both() {
        for permission in Permission::ALL {
            let hk = vocabulary_for(Platform::HealthKit).permission_identifiers(permission);
            assert!(!hk.is_empty(), "{permission:?} missing on HealthKit");
            let hc = vocabulary_for(Platform::HealthConnect).permission_identifiers(permission);
            assert_eq!(hc.is_empty(), permission == Permission::ReadMindfulness);
        }
    }
}
