//! Impact Pipeline - joins reference data with user inputs and produces a report
//!
//! For every request:
//! 1. Convert on-site power/water to annual units
//! 2. Join boundary ids with county records and emission factors
//! 3. Apply the state filter
//! 4. Compute the three footprints per county
//! 5. Classify the selected metric against the filtered population
//! 6. Format tooltip strings
//!
//! Nothing is cached between requests; every report is recomputed from the
//! shared read-only [`ReferenceData`]. Both a sequential and a parallel (Rayon)
//! implementation are provided and produce identical reports.

use crate::boundaries::FilteredBoundaries;
use crate::classify::{classify_values, ColorCategory};
use crate::data::ReferenceData;
use crate::footprint::{compute_footprints, EmissionFactors, Footprints};
use crate::format::{format_scientific, format_sig3, format_thousands};
use crate::units::{to_annual_energy, to_annual_volume};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Label of the "no filter" state option
pub const ALL_STATES: &str = "All States";

pub const UNKNOWN_COUNTY: &str = "Unknown County";
pub const UNKNOWN_STATE: &str = "Unknown State";
pub const UNKNOWN_STATE_ABBR: &str = "??";

/// Metric shown on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactMetric {
    #[default]
    Carbon,
    Water,
    WaterScarcity,
}

impl ImpactMetric {
    pub const ALL: [ImpactMetric; 3] = [
        ImpactMetric::Carbon,
        ImpactMetric::Water,
        ImpactMetric::WaterScarcity,
    ];

    /// Query-string key
    pub fn key(self) -> &'static str {
        match self {
            ImpactMetric::Carbon => "carbon",
            ImpactMetric::Water => "water",
            ImpactMetric::WaterScarcity => "water_scarcity",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ImpactMetric::Carbon => "Carbon Footprint",
            ImpactMetric::Water => "Scope 1 & 2 Water Footprint",
            ImpactMetric::WaterScarcity => "Water Scarcity Footprint",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            ImpactMetric::Carbon => "kgCO2e/year",
            ImpactMetric::Water | ImpactMetric::WaterScarcity => "L/year",
        }
    }

    /// Accepts the key or the display label
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.key().eq_ignore_ascii_case(s) || m.label() == s)
    }

    pub fn select(self, footprints: &Footprints) -> Option<f64> {
        match self {
            ImpactMetric::Carbon => footprints.carbon,
            ImpactMetric::Water => footprints.water,
            ImpactMetric::WaterScarcity => footprints.water_scarcity,
        }
    }
}

/// Which counties are in view
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum StateFilter {
    #[default]
    All,
    State(String),
}

impl StateFilter {
    /// `"All States"` (or blank) means no filter
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == ALL_STATES {
            StateFilter::All
        } else {
            StateFilter::State(s.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            StateFilter::All => ALL_STATES,
            StateFilter::State(name) => name,
        }
    }

    pub fn matches(&self, state_name: &str) -> bool {
        match self {
            StateFilter::All => true,
            StateFilter::State(name) => name == state_name,
        }
    }
}

/// On-site consumption as entered (before unit conversion)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnsiteInputs {
    pub power_value: f64,
    pub power_unit: String,
    pub water_value: f64,
    pub water_unit: String,
}

impl Default for OnsiteInputs {
    fn default() -> Self {
        Self {
            power_value: 0.0,
            power_unit: "kWh/yr".to_string(),
            water_value: 0.0,
            water_unit: "L/yr".to_string(),
        }
    }
}

impl OnsiteInputs {
    pub fn new(power_value: f64, power_unit: &str, water_value: f64, water_unit: &str) -> Self {
        Self {
            power_value,
            power_unit: power_unit.to_string(),
            water_value,
            water_unit: water_unit.to_string(),
        }
    }

    pub fn power_kwh_year(&self) -> f64 {
        to_annual_energy(self.power_value, &self.power_unit)
    }

    pub fn water_l_year(&self) -> f64 {
        to_annual_volume(self.water_value, &self.water_unit)
    }
}

/// One dashboard request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImpactQuery {
    pub metric: ImpactMetric,
    pub inputs: OnsiteInputs,
    pub state: StateFilter,
}

/// Converted inputs and the echo lines shown next to the input widgets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertedInputs {
    pub power_kwh_year: f64,
    pub water_l_year: f64,
    /// e.g. "1,234.50 kW" (only when power was entered)
    pub power_entered: Option<String>,
    pub water_entered: Option<String>,
    /// e.g. "10,814,220 kWh/year"
    pub power_converted: Option<String>,
    pub water_converted: Option<String>,
}

impl ConvertedInputs {
    pub fn from_inputs(inputs: &OnsiteInputs) -> Self {
        let power_kwh_year = inputs.power_kwh_year();
        let water_l_year = inputs.water_l_year();
        let power_given = inputs.power_value > 0.0;
        let water_given = inputs.water_value > 0.0;

        Self {
            power_kwh_year,
            water_l_year,
            power_entered: power_given
                .then(|| format!("{} {}", format_thousands(inputs.power_value, 2), inputs.power_unit)),
            water_entered: water_given
                .then(|| format!("{} {}", format_thousands(inputs.water_value, 2), inputs.water_unit)),
            power_converted: power_given
                .then(|| format!("{} kWh/year", format_thousands(power_kwh_year, 0))),
            water_converted: water_given
                .then(|| format!("{} L/year", format_thousands(water_l_year, 0))),
        }
    }
}

/// County joined with its factors, before any computation
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedCounty {
    pub fips: String,
    pub county_name: String,
    pub state_name: String,
    pub state_abbr: String,
    pub factors: EmissionFactors,
}

/// Per-county output row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountyImpactRow {
    pub fips: String,
    pub county_name: String,
    pub state_name: String,
    pub state_abbr: String,
    #[serde(flatten)]
    pub factors: EmissionFactors,
    pub carbon_footprint: Option<f64>,
    pub water_footprint: Option<f64>,
    pub water_scarcity_footprint: Option<f64>,
    pub color_category: ColorCategory,
    pub color_code: u8,
    pub ef_formatted: String,
    pub carbon_footprint_formatted: String,
    pub water_footprint_formatted: String,
    pub water_scarcity_footprint_formatted: String,
}

impl CountyImpactRow {
    pub fn footprints(&self) -> Footprints {
        Footprints {
            carbon: self.carbon_footprint,
            water: self.water_footprint,
            water_scarcity: self.water_scarcity_footprint,
        }
    }
}

/// Statistics block for the selected metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub p33: Option<f64>,
    pub p67: Option<f64>,
    pub p33_formatted: String,
    pub p67_formatted: String,
    pub valid_count: usize,
    pub total_count: usize,
}

/// Complete response for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactReport {
    pub metric: ImpactMetric,
    pub metric_label: &'static str,
    pub unit: &'static str,
    pub state: String,
    pub title: String,
    pub inputs: ConvertedInputs,
    pub summary: MetricSummary,
    pub rows: Vec<CountyImpactRow>,
}

impl ImpactReport {
    /// Markdown-style statistics lines, or a warning when nothing is valid
    pub fn summary_lines(&self) -> Vec<String> {
        if self.summary.valid_count == 0 {
            return vec![format!("No valid data available for {}", self.metric_label)];
        }
        vec![
            format!("{} Statistics:", self.metric_label),
            format!("- 33rd Percentile: {} {}", self.summary.p33_formatted, self.unit),
            format!("- 67th Percentile: {} {}", self.summary.p67_formatted, self.unit),
            format!(
                "- Counties with data: {} out of {}",
                self.summary.valid_count, self.summary.total_count
            ),
        ]
    }
}

/// Footprints and formatted strings for one county (category assigned later)
fn build_row(county: &JoinedCounty, power_kwh_year: f64, water_l_year: f64) -> CountyImpactRow {
    let footprints = compute_footprints(&county.factors, power_kwh_year, water_l_year);

    CountyImpactRow {
        fips: county.fips.clone(),
        county_name: county.county_name.clone(),
        state_name: county.state_name.clone(),
        state_abbr: county.state_abbr.clone(),
        factors: county.factors,
        carbon_footprint: footprints.carbon,
        water_footprint: footprints.water,
        water_scarcity_footprint: footprints.water_scarcity,
        color_category: ColorCategory::Gray,
        color_code: ColorCategory::Gray.code(),
        ef_formatted: format_sig3(county.factors.ef),
        carbon_footprint_formatted: format_scientific(footprints.carbon),
        water_footprint_formatted: format_scientific(footprints.water),
        water_scarcity_footprint_formatted: format_scientific(footprints.water_scarcity),
    }
}

/// Report builder over shared reference data
#[derive(Debug, Clone)]
pub struct ImpactPipeline {
    data: Arc<ReferenceData>,
}

impl ImpactPipeline {
    pub fn new(data: Arc<ReferenceData>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &ReferenceData {
        &self.data
    }

    /// `"All States"` followed by the sorted state names
    pub fn state_options(&self) -> Vec<String> {
        std::iter::once(ALL_STATES.to_string())
            .chain(self.data.state_names().iter().cloned())
            .collect()
    }

    /// Boundary ids left-joined with counties and factors, then state-filtered
    pub fn joined_counties(&self, state: &StateFilter) -> Vec<JoinedCounty> {
        self.data
            .boundaries()
            .ids()
            .map(|fips| {
                let county = self.data.county(fips);
                JoinedCounty {
                    fips: fips.to_string(),
                    county_name: county.map_or(UNKNOWN_COUNTY, |c| c.county_name.as_str()).to_string(),
                    state_name: county.map_or(UNKNOWN_STATE, |c| c.state_name.as_str()).to_string(),
                    state_abbr: county.map_or(UNKNOWN_STATE_ABBR, |c| c.state_abbr.as_str()).to_string(),
                    factors: self.data.factors(fips).copied().unwrap_or_default(),
                }
            })
            .filter(|c| state.matches(&c.state_name))
            .collect()
    }

    /// Compute a report (sequential)
    pub fn compute(&self, query: &ImpactQuery) -> ImpactReport {
        let inputs = ConvertedInputs::from_inputs(&query.inputs);
        let counties = self.joined_counties(&query.state);

        let rows: Vec<CountyImpactRow> = counties
            .iter()
            .map(|c| build_row(c, inputs.power_kwh_year, inputs.water_l_year))
            .collect();

        self.finish(query, inputs, rows)
    }

    /// Compute a report with per-county work spread over the Rayon pool
    ///
    /// Produces the same report as [`compute`](Self::compute).
    pub fn compute_parallel(&self, query: &ImpactQuery) -> ImpactReport {
        let inputs = ConvertedInputs::from_inputs(&query.inputs);
        let counties = self.joined_counties(&query.state);

        let rows: Vec<CountyImpactRow> = counties
            .par_iter()
            .map(|c| build_row(c, inputs.power_kwh_year, inputs.water_l_year))
            .collect();

        self.finish(query, inputs, rows)
    }

    /// Classify the selected metric column and assemble the report
    fn finish(&self, query: &ImpactQuery, inputs: ConvertedInputs, mut rows: Vec<CountyImpactRow>) -> ImpactReport {
        let metric = query.metric;
        let values: Vec<Option<f64>> = rows.iter().map(|r| metric.select(&r.footprints())).collect();
        let classification = classify_values(&values);

        for (row, category) in rows.iter_mut().zip(&classification.categories) {
            row.color_category = *category;
            row.color_code = category.code();
        }

        let p33 = classification.thresholds.map(|t| t.p33);
        let p67 = classification.thresholds.map(|t| t.p67);

        tracing::debug!(
            "{}: {} counties, {} with data (state: {})",
            metric.label(),
            classification.total_count,
            classification.valid_count,
            query.state.label()
        );

        let title = match &query.state {
            StateFilter::All => format!("{} by County", metric.label()),
            StateFilter::State(name) => format!("{} by County - {}", metric.label(), name),
        };

        ImpactReport {
            metric,
            metric_label: metric.label(),
            unit: metric.unit(),
            state: query.state.label().to_string(),
            title,
            inputs,
            summary: MetricSummary {
                p33,
                p67,
                p33_formatted: format_scientific(p33),
                p67_formatted: format_scientific(p67),
                valid_count: classification.valid_count,
                total_count: classification.total_count,
            },
            rows,
        }
    }

    /// Boundary features for the map view of `state`
    pub fn boundaries(&self, state: &StateFilter) -> FilteredBoundaries {
        match state {
            StateFilter::All => self.data.boundaries().all(),
            StateFilter::State(_) => {
                let counties = self.joined_counties(state);
                let keep: FxHashSet<&str> = counties.iter().map(|c| c.fips.as_str()).collect();
                let view = self.data.boundaries().filtered(&keep);
                // No rows in view at all is an empty state, not a mismatch
                if view.fallback && !counties.is_empty() {
                    tracing::warn!(
                        "No counties found for state '{}' in the loaded datasets. Showing full US map.",
                        state.label()
                    );
                }
                view
            }
        }
    }
}
