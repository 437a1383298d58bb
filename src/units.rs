//! Native quantity units and conversion into canonical units
//!
//! Platform stores hand back quantities in whatever unit the SDK reports. Every
//! conversion here returns `None` for an incompatible unit rather than guessing,
//! so a missing reading never turns into a zero.

use serde::{Deserialize, Serialize};

/// Kilojoules to kilocalories
const KJ_TO_KCAL: f64 = 0.239006;
const METERS_PER_MILE: f64 = 1609.344;
const METERS_PER_FOOT: f64 = 0.3048;
const METERS_PER_INCH: f64 = 0.0254;
const KG_PER_POUND: f64 = 0.45359237;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeUnit {
    Count,
    // Energy
    Kilocalorie,
    Calorie,
    Kilojoule,
    Joule,
    // Length
    Meter,
    Kilometer,
    Centimeter,
    Foot,
    Inch,
    Mile,
    // Mass
    Kilogram,
    Gram,
    Pound,
    // Temperature
    Celsius,
    Fahrenheit,
    Kelvin,
    // Time
    Millisecond,
    Second,
    Minute,
    Hour,
}

/// A value tagged with its native unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: NativeUnit,
}

impl Quantity {
    pub fn new(value: f64, unit: NativeUnit) -> Self {
        Self { value, unit }
    }

    pub fn count(&self) -> Option<f64> {
        match self.unit {
            NativeUnit::Count => Some(self.value),
            _ => None,
        }
    }

    pub fn in_kilocalories(&self) -> Option<f64> {
        match self.unit {
            NativeUnit::Kilocalorie => Some(self.value),
            NativeUnit::Calorie => Some(self.value / 1000.0),
            NativeUnit::Kilojoule => Some(self.value * KJ_TO_KCAL),
            NativeUnit::Joule => Some(self.value / 1000.0 * KJ_TO_KCAL),
            _ => None,
        }
    }

    pub fn in_meters(&self) -> Option<f64> {
        match self.unit {
            NativeUnit::Meter => Some(self.value),
            NativeUnit::Kilometer => Some(self.value * 1000.0),
            NativeUnit::Centimeter => Some(self.value / 100.0),
            NativeUnit::Foot => Some(self.value * METERS_PER_FOOT),
            NativeUnit::Inch => Some(self.value * METERS_PER_INCH),
            NativeUnit::Mile => Some(self.value * METERS_PER_MILE),
            _ => None,
        }
    }

    pub fn in_kilograms(&self) -> Option<f64> {
        match self.unit {
            NativeUnit::Kilogram => Some(self.value),
            NativeUnit::Gram => Some(self.value / 1000.0),
            NativeUnit::Pound => Some(self.value * KG_PER_POUND),
            _ => None,
        }
    }

    pub fn in_celsius(&self) -> Option<f64> {
        match self.unit {
            NativeUnit::Celsius => Some(self.value),
            NativeUnit::Fahrenheit => Some((self.value - 32.0) * 5.0 / 9.0),
            NativeUnit::Kelvin => Some(self.value - 273.15),
            _ => None,
        }
    }

    pub fn in_seconds(&self) -> Option<f64> {
        match self.unit {
            NativeUnit::Millisecond => Some(self.value / 1000.0),
            NativeUnit::Second => Some(self.value),
            NativeUnit::Minute => Some(self.value * 60.0),
            NativeUnit::Hour => Some(self.value * 3600.0),
            _ => None,
        }
    }
}
