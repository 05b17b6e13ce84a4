//! Footprint Calculator
//!
//! Three per-county formulas applied to the county's factors and the global
//! on-site values:
//!
//! - Carbon footprint (kgCO2e/year) = EF × P
//! - Scope 1 & 2 water footprint (L/year) = W + EWIF × P
//! - Water scarcity footprint (L/year) = ACF × W + SWI × P
//!
//! where P is on-site power in kWh/year and W is on-site water in L/year.
//! Missing data is `None` everywhere; a factor that is NaN or infinite counts
//! as missing.

use serde::{Deserialize, Serialize};

/// Per-county factors (any may be missing)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactors {
    /// Energy-water intensity factor (L/kWh)
    pub ewif: Option<f64>,
    /// Carbon emission factor (kgCO2e/kWh)
    pub ef: Option<f64>,
    /// Area water-scarcity characterization factor
    pub acf: Option<f64>,
    /// Scarcity-weighted intensity factor
    pub swi: Option<f64>,
}

impl EmissionFactors {
    /// Factors with every non-finite value dropped
    pub fn sanitized(self) -> Self {
        Self {
            ewif: coerce_factor(self.ewif),
            ef: coerce_factor(self.ef),
            acf: coerce_factor(self.acf),
            swi: coerce_factor(self.swi),
        }
    }
}

/// The three footprints for one county
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Footprints {
    pub carbon: Option<f64>,
    pub water: Option<f64>,
    pub water_scarcity: Option<f64>,
}

/// Treat NaN/inf as missing
pub fn coerce_factor(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Carbon footprint = EF × P
///
/// Missing when EF is missing or when no on-site power was entered (P == 0).
pub fn carbon_footprint(ef: Option<f64>, power_kwh_year: f64) -> Option<f64> {
    let ef = coerce_factor(ef)?;
    if power_kwh_year == 0.0 {
        return None;
    }
    finite(ef * power_kwh_year)
}

/// Water footprint = W + EWIF × P
///
/// Without EWIF the on-site water alone is reported, or missing if there is none.
pub fn water_footprint(ewif: Option<f64>, power_kwh_year: f64, water_l_year: f64) -> Option<f64> {
    match coerce_factor(ewif) {
        Some(ewif) => finite(water_l_year + ewif * power_kwh_year),
        None if water_l_year > 0.0 => finite(water_l_year),
        None => None,
    }
}

/// Water scarcity footprint = ACF × W + SWI × P
///
/// A missing factor contributes 0. The result is missing only when the sum is
/// 0 and both on-site inputs are 0.
pub fn water_scarcity_footprint(
    acf: Option<f64>,
    swi: Option<f64>,
    power_kwh_year: f64,
    water_l_year: f64,
) -> Option<f64> {
    let acf_contribution = coerce_factor(acf).map_or(0.0, |acf| acf * water_l_year);
    let swi_contribution = coerce_factor(swi).map_or(0.0, |swi| swi * power_kwh_year);
    let total = acf_contribution + swi_contribution;

    if total == 0.0 && water_l_year == 0.0 && power_kwh_year == 0.0 {
        return None;
    }
    finite(total)
}

/// All three footprints for one county
pub fn compute_footprints(factors: &EmissionFactors, power_kwh_year: f64, water_l_year: f64) -> Footprints {
    Footprints {
        carbon: carbon_footprint(factors.ef, power_kwh_year),
        water: water_footprint(factors.ewif, power_kwh_year, water_l_year),
        water_scarcity: water_scarcity_footprint(factors.acf, factors.swi, power_kwh_year, water_l_year),
    }
}
