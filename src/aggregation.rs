//! Aggregation engine
//!
//! Turns a metric descriptor, a time range and a bucket width into an ordered
//! series of [`AggregatedSample`]s. Cumulative metrics issue one native
//! aggregate per bucket; session metrics (mindfulness) read raw sessions and
//! sum them per local calendar day.

use chrono::{Duration, NaiveDate};
use futures_util::{stream, StreamExt, TryStreamExt};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::metrics::{AggregationKind, MetricDescriptor};
use crate::permissions::GrantedPermissions;
use crate::store::HealthStore;
use crate::types::{seconds_between, AggregatedSample, Bucket, TimeRange};
use crate::units::{NativeUnit, Quantity};
use crate::vocabulary::{EmptyBucketPolicy, PlatformVocabulary};

/// Split a range into consecutive buckets anchored at `range.start`.
/// The last bucket is clipped to `range.end`.
pub fn bucket_ranges(range: TimeRange, bucket: Bucket) -> Vec<TimeRange> {
    let width = bucket.width();
    let mut buckets = Vec::new();
    let mut start = range.start;
    while start < range.end {
        let end = (start + width).min(range.end);
        buckets.push(TimeRange { start, end });
        start = end;
    }
    buckets
}

pub struct AggregationEngine<'a, S: HealthStore + ?Sized> {
    store: &'a S,
    vocab: &'a dyn PlatformVocabulary,
    config: &'a BridgeConfig,
}

impl<'a, S: HealthStore + ?Sized> AggregationEngine<'a, S> {
    pub fn new(store: &'a S, vocab: &'a dyn PlatformVocabulary, config: &'a BridgeConfig) -> Self {
        Self {
            store,
            vocab,
            config,
        }
    }

    pub fn ensure_bucket_supported(&self, bucket: Bucket) -> Result<(), BridgeError> {
        if self.vocab.supports_bucket(bucket) {
            Ok(())
        } else {
            Err(BridgeError::UnsupportedBucket(bucket.as_str().to_string()))
        }
    }

    /// Aggregate one metric over `range`.
    ///
    /// Without the metric's read permission the result is empty rather than an
    /// error, so callers cannot tell "not allowed" from "nothing recorded".
    pub async fn aggregate(
        &self,
        descriptor: &MetricDescriptor,
        range: TimeRange,
        bucket: Bucket,
    ) -> Result<Vec<AggregatedSample>, BridgeError> {
        self.ensure_bucket_supported(bucket)?;

        let granted = GrantedPermissions::fetch(self.store, self.vocab).await?;
        if !granted.contains(descriptor.required_permission) {
            debug!(
                metric = descriptor.canonical_name(),
                permission = descriptor.required_permission.as_str(),
                "permission not granted, returning no samples"
            );
            return Ok(Vec::new());
        }

        match descriptor.kind {
            AggregationKind::CumulativeSum => self.cumulative(descriptor, range, bucket).await,
            AggregationKind::SessionSum => self.daily_sessions(descriptor, range).await,
        }
    }

    async fn cumulative(
        &self,
        descriptor: &MetricDescriptor,
        range: TimeRange,
        bucket: Bucket,
    ) -> Result<Vec<AggregatedSample>, BridgeError> {
        let buckets = bucket_ranges(range, bucket);
        debug!(
            metric = descriptor.canonical_name(),
            buckets = buckets.len(),
            "aggregating"
        );

        let values: Vec<Option<f64>> = stream::iter(buckets.iter().copied())
            .map(|bucket_range| async move {
                self.store
                    .aggregate(descriptor.native_handle, bucket_range)
                    .await
                    .map(|result| descriptor.extract(&result))
            })
            .buffered(self.config.max_concurrent_queries)
            .try_collect()
            .await
            .map_err(|e| BridgeError::native("aggregated data", e))?;

        let policy = self.vocab.empty_bucket_policy();
        Ok(buckets
            .into_iter()
            .zip(values)
            .filter(|(_, value)| value.is_some() || policy == EmptyBucketPolicy::EmitNull)
            .map(|(bucket_range, value)| AggregatedSample {
                start_date: bucket_range.start,
                end_date: bucket_range.end,
                value,
            })
            .collect())
    }

    async fn daily_sessions(
        &self,
        descriptor: &MetricDescriptor,
        range: TimeRange,
    ) -> Result<Vec<AggregatedSample>, BridgeError> {
        let sessions = self
            .store
            .read_mindful_sessions(range)
            .await
            .map_err(|e| BridgeError::native("mindfulness", e))?;

        let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for session in sessions.iter().filter(|s| s.end > s.start) {
            *per_day
                .entry(self.config.local_day(session.start))
                .or_insert(0.0) += seconds_between(session.start, session.end);
        }

        Ok(per_day
            .into_iter()
            .map(|(day, seconds)| {
                let start = self.config.day_start(day);
                AggregatedSample {
                    start_date: start,
                    end_date: start + Duration::days(1),
                    value: descriptor.convert(&Quantity::new(seconds, NativeUnit::Second)),
                }
            })
            .collect())
    }
}
