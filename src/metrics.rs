//! Metric descriptor registry
//!
//! One immutable descriptor per aggregate metric a platform supports. A
//! descriptor couples the canonical name a caller asks for with the permission
//! it needs, the native handle the store aggregates under and the extractor
//! that turns a native quantity into the canonical unit.

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::store::AggregationResult;
use crate::types::Permission;
use crate::units::Quantity;
use crate::vocabulary::PlatformVocabulary;

/// Aggregate metrics exposed by `queryAggregated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    Steps,
    ActiveCalories,
    TotalCalories,
    Distance,
    Mindfulness,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Steps,
        Metric::ActiveCalories,
        Metric::TotalCalories,
        Metric::Distance,
        Metric::Mindfulness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Steps => "steps",
            Metric::ActiveCalories => "active-calories",
            Metric::TotalCalories => "total-calories",
            Metric::Distance => "distance",
            Metric::Mindfulness => "mindfulness",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Metric::ALL.into_iter().find(|m| m.as_str() == s)
    }

    pub fn required_permission(&self) -> Permission {
        match self {
            Metric::Steps => Permission::ReadSteps,
            Metric::ActiveCalories => Permission::ReadActiveCalories,
            Metric::TotalCalories => Permission::ReadTotalCalories,
            Metric::Distance => Permission::ReadDistance,
            Metric::Mindfulness => Permission::ReadMindfulness,
        }
    }
}

/// How a metric is reduced over a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationKind {
    /// Native cumulative statistic, one aggregate call per bucket
    CumulativeSum,
    /// Raw sessions summed per calendar day
    SessionSum,
}

/// Extracts the canonical value from a native quantity
pub type ValueExtractor = fn(&Quantity) -> Option<f64>;

#[derive(Debug, Clone)]
pub struct MetricDescriptor {
    pub metric: Metric,
    pub required_permission: Permission,
    pub native_handle: &'static str,
    pub kind: AggregationKind,
    extractor: ValueExtractor,
}

impl MetricDescriptor {
    fn new(metric: Metric, native_handle: &'static str) -> Self {
        let (kind, extractor): (AggregationKind, ValueExtractor) = match metric {
            Metric::Steps => (AggregationKind::CumulativeSum, Quantity::count),
            Metric::ActiveCalories | Metric::TotalCalories => {
                (AggregationKind::CumulativeSum, Quantity::in_kilocalories)
            }
            Metric::Distance => (AggregationKind::CumulativeSum, Quantity::in_meters),
            Metric::Mindfulness => (AggregationKind::SessionSum, Quantity::in_seconds),
        };
        Self {
            metric,
            required_permission: metric.required_permission(),
            native_handle,
            kind,
            extractor,
        }
    }

    pub fn canonical_name(&self) -> &'static str {
        self.metric.as_str()
    }

    /// Canonical value for a native quantity, `None` if the unit is incompatible
    pub fn convert(&self, quantity: &Quantity) -> Option<f64> {
        (self.extractor)(quantity)
    }

    /// Canonical value of this metric in a native aggregation result.
    /// `None` when the result has no contribution for the handle.
    pub fn extract(&self, result: &AggregationResult) -> Option<f64> {
        result
            .get(self.native_handle)
            .and_then(|quantity| self.convert(quantity))
    }

    /// Workout field this metric populates during enrichment
    pub fn workout_field(&self) -> &'static str {
        match self.metric {
            Metric::Steps => "steps",
            Metric::ActiveCalories | Metric::TotalCalories => "calories",
            Metric::Distance => "distance",
            Metric::Mindfulness => "mindfulness",
        }
    }
}

/// Descriptors for every metric one platform supports
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    descriptors: Vec<MetricDescriptor>,
}

impl MetricRegistry {
    pub fn new(vocab: &dyn PlatformVocabulary) -> Self {
        let descriptors = Metric::ALL
            .into_iter()
            .filter_map(|metric| {
                vocab
                    .metric_handle(metric)
                    .map(|handle| MetricDescriptor::new(metric, handle))
            })
            .collect();
        Self { descriptors }
    }

    /// Look up a descriptor by the `dataType` string of a request
    pub fn resolve(&self, data_type: &str) -> Result<&MetricDescriptor, BridgeError> {
        Metric::parse(data_type)
            .and_then(|metric| self.get(metric))
            .ok_or_else(|| BridgeError::UnsupportedDataType(data_type.to_string()))
    }

    pub fn get(&self, metric: Metric) -> Option<&MetricDescriptor> {
        self.descriptors.iter().find(|d| d.metric == metric)
    }

    pub fn descriptors(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }
}
