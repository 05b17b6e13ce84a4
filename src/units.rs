//! Unit Conversion
//!
//! Normalizes the on-site power and water inputs to the annual units the
//! footprint formulas expect (kWh/year and liters/year).
//!
//! Unknown unit labels convert to 0.

use serde::Serialize;

/// Hours in a (non-leap) year
pub const HOURS_PER_YEAR: f64 = 8_760.0;

/// Minutes in a (non-leap) year
pub const MINUTES_PER_YEAR: f64 = 525_600.0;

/// Seconds in a Julian year (365.25 days)
pub const SECONDS_PER_YEAR: f64 = 31_557_600.0;

/// Liters per U.S. gallon
pub const LITERS_PER_GALLON: f64 = 3.78541;

/// On-site power units offered by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PowerUnit {
    #[serde(rename = "kWh/yr")]
    KwhPerYear,
    #[serde(rename = "kWh/mo")]
    KwhPerMonth,
    #[serde(rename = "kW")]
    Kilowatt,
    #[serde(rename = "MW")]
    Megawatt,
}

impl PowerUnit {
    /// Select-box order
    pub const ALL: [PowerUnit; 4] = [
        PowerUnit::KwhPerYear,
        PowerUnit::KwhPerMonth,
        PowerUnit::Kilowatt,
        PowerUnit::Megawatt,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PowerUnit::KwhPerYear => "kWh/yr",
            PowerUnit::KwhPerMonth => "kWh/mo",
            PowerUnit::Kilowatt => "kW",
            PowerUnit::Megawatt => "MW",
        }
    }

    /// Exact label match (labels are case-sensitive: "MW" is not "mW")
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.label() == label.trim())
    }

    /// Multiplier to kWh/year
    pub fn annual_factor(self) -> f64 {
        match self {
            PowerUnit::KwhPerYear => 1.0,
            PowerUnit::KwhPerMonth => 12.0,
            PowerUnit::Kilowatt => HOURS_PER_YEAR,
            PowerUnit::Megawatt => 1_000.0 * HOURS_PER_YEAR,
        }
    }
}

/// On-site water units offered by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WaterUnit {
    #[serde(rename = "L/yr")]
    LitersPerYear,
    #[serde(rename = "L/mo")]
    LitersPerMonth,
    #[serde(rename = "L/s")]
    LitersPerSecond,
    #[serde(rename = "gpm")]
    GallonsPerMinute,
    #[serde(rename = "gal/mo")]
    GallonsPerMonth,
}

impl WaterUnit {
    /// Select-box order
    pub const ALL: [WaterUnit; 5] = [
        WaterUnit::LitersPerYear,
        WaterUnit::LitersPerMonth,
        WaterUnit::LitersPerSecond,
        WaterUnit::GallonsPerMinute,
        WaterUnit::GallonsPerMonth,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WaterUnit::LitersPerYear => "L/yr",
            WaterUnit::LitersPerMonth => "L/mo",
            WaterUnit::LitersPerSecond => "L/s",
            WaterUnit::GallonsPerMinute => "gpm",
            WaterUnit::GallonsPerMonth => "gal/mo",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.label() == label.trim())
    }

    /// Multiplier to liters/year
    pub fn annual_factor(self) -> f64 {
        match self {
            WaterUnit::LitersPerYear => 1.0,
            WaterUnit::LitersPerMonth => 12.0,
            WaterUnit::LitersPerSecond => SECONDS_PER_YEAR,
            WaterUnit::GallonsPerMinute => MINUTES_PER_YEAR * LITERS_PER_GALLON,
            WaterUnit::GallonsPerMonth => 12.0 * LITERS_PER_GALLON,
        }
    }
}

/// Convert an on-site power value to kWh/year
///
/// Unrecognized unit labels yield 0.
pub fn to_annual_energy(value: f64, unit: &str) -> f64 {
    match PowerUnit::parse(unit) {
        Some(unit) => value * unit.annual_factor(),
        None => 0.0,
    }
}

/// Convert an on-site water value to liters/year
///
/// Unrecognized unit labels yield 0.
pub fn to_annual_volume(value: f64, unit: &str) -> f64 {
    match WaterUnit::parse(unit) {
        Some(unit) => value * unit.annual_factor(),
        None => 0.0,
    }
}
