// Pipeline Integration Tests
//
// Purpose: Load the fixture tables from tests/fixtures and check the joined,
// filtered and classified reports end to end.
// Run with: cargo test --test pipeline_integration_tests

use approx::assert_relative_eq;
use county_impact_rust::data::{load_county_table, load_factor_table};
use county_impact_rust::{
    ColorCategory, DashboardConfig, ImpactMetric, ImpactPipeline, ImpactQuery, LoadError,
    OnsiteInputs, ReferenceData, StateFilter,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_config() -> DashboardConfig {
    let mut config = DashboardConfig::with_data_dir(fixture_dir());
    config.county_table = PathBuf::from("counties.csv");
    config.factor_table = PathBuf::from("factors.csv");
    config.boundary_file = PathBuf::from("counties.geojson");
    config
}

fn fixture_pipeline() -> ImpactPipeline {
    let data = ReferenceData::load(&fixture_config()).expect("Failed to load fixtures");
    ImpactPipeline::new(Arc::new(data))
}

fn query(metric: ImpactMetric, power: f64, water: f64, state: &str) -> ImpactQuery {
    ImpactQuery {
        metric,
        inputs: OnsiteInputs::new(power, "kWh/yr", water, "L/yr"),
        state: StateFilter::parse(state),
    }
}

fn row<'a>(report: &'a county_impact_rust::ImpactReport, fips: &str) -> &'a county_impact_rust::CountyImpactRow {
    report
        .rows
        .iter()
        .find(|r| r.fips == fips)
        .unwrap_or_else(|| panic!("row {} missing", fips))
}

// =========================================================================
// Section 1: Loading
// =========================================================================

#[test]
fn test_county_table_normalizes_and_drops() {
    let counties = load_county_table(&fixture_dir().join("counties.csv")).unwrap();

    // 9 data rows: one without a county name, one duplicate fips
    assert_eq!(counties.len(), 7);
    assert_eq!(counties[0].fips, "01001");
    assert_eq!(counties[0].county_name, "Autauga County");
    assert_eq!(counties[3].fips, "06037");

    // Blank abbreviation derived from the state name
    let san_diego = counties.iter().find(|c| c.fips == "06073").unwrap();
    assert_eq!(san_diego.state_abbr, "CA");
}

#[test]
fn test_county_table_without_abbr_column() {
    let counties = load_county_table(&fixture_dir().join("counties_no_abbr.csv")).unwrap();
    assert_eq!(counties.len(), 2);
    assert_eq!(counties[0].state_abbr, "TE");
    assert_eq!(counties[1].fips, "06037");
    assert_eq!(counties[1].state_abbr, "CA");
}

#[test]
fn test_county_table_missing_column() {
    // The factor file has no county_name column
    let err = load_county_table(&fixture_dir().join("factors.csv")).unwrap_err();
    assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "county_name"));
}

#[test]
fn test_factor_table_positional_columns() {
    let factors = load_factor_table(&fixture_dir().join("factors.csv")).unwrap();

    // Header row and the row with a blank EF are dropped
    assert_eq!(factors.len(), 7);
    assert!(!factors.contains_key("48113"));
    assert!(!factors.contains_key("0fips"));

    let autauga = factors["01001"];
    assert_eq!(autauga.ewif, Some(1.2));
    assert_eq!(autauga.ef, Some(0.45));
    assert_eq!(autauga.acf, Some(2.0));
    assert_eq!(autauga.swi, Some(0.5));

    // Non-numeric EWIF and blank ACF become missing
    let barbour = factors["01005"];
    assert_eq!(barbour.ewif, None);
    assert_eq!(barbour.acf, None);
    assert_eq!(barbour.swi, Some(0.3));
}

#[test]
fn test_factor_table_keeps_row_with_text_ef() {
    let factors = load_factor_table(&fixture_dir().join("factors.csv")).unwrap();

    // "not reported" only blanks EF; the other factors still load
    let row = factors["72001"];
    assert_eq!(row.ef, None);
    assert_eq!(row.ewif, Some(1.5));
    assert_eq!(row.acf, Some(4.0));
    assert_eq!(row.swi, Some(0.2));
}

#[test]
fn test_text_ef_row_still_has_water_footprints() {
    let pipeline = fixture_pipeline();

    let carbon = pipeline.compute(&query(ImpactMetric::Carbon, 100.0, 0.0, "All States"));
    assert_eq!(row(&carbon, "72001").carbon_footprint, None);

    let water = pipeline.compute(&query(ImpactMetric::Water, 100.0, 0.0, "All States"));
    assert_relative_eq!(row(&water, "72001").water_footprint.unwrap(), 150.0, epsilon = 1e-9);

    let scarcity = pipeline.compute(&query(ImpactMetric::WaterScarcity, 100.0, 10.0, "All States"));
    assert_relative_eq!(row(&scarcity, "72001").water_scarcity_footprint.unwrap(), 60.0, epsilon = 1e-9);
}

#[test]
fn test_factor_table_too_few_columns() {
    let err = load_factor_table(&fixture_dir().join("factors_short.csv")).unwrap_err();
    assert!(matches!(err, LoadError::TooFewColumns { expected: 5, found: 3, .. }));
}

#[test]
fn test_missing_factor_table_degrades() {
    let mut config = fixture_config();
    config.factor_table = PathBuf::from("no_such_factors.csv");

    let data = ReferenceData::load(&config).expect("factor data is optional");
    assert!(data.factors_degraded());
    assert_eq!(data.factor_count(), 0);

    let report = ImpactPipeline::new(Arc::new(data)).compute(&query(ImpactMetric::Carbon, 1000.0, 0.0, "All States"));
    assert_eq!(report.summary.valid_count, 0);
    assert!(report.rows.iter().all(|r| r.color_category == ColorCategory::Gray));
}

#[test]
fn test_missing_county_table_aborts() {
    let mut config = fixture_config();
    config.county_table = PathBuf::from("no_such_counties.csv");
    assert!(ReferenceData::load(&config).is_err());
}

#[test]
fn test_missing_boundaries_abort() {
    let mut config = fixture_config();
    config.boundary_file = PathBuf::from("no_such_boundaries.json");
    assert!(ReferenceData::load(&config).is_err());
}

// =========================================================================
// Section 2: Reports
// =========================================================================

#[test]
fn test_carbon_report_all_states() {
    let report = fixture_pipeline().compute(&query(ImpactMetric::Carbon, 1000.0, 0.0, "All States"));

    // 8 boundary features, including one without a county record
    assert_eq!(report.summary.total_count, 8);
    assert_eq!(report.summary.valid_count, 6);

    // Sorted valid values: 250, 300, 400, 420, 450, 600
    assert_relative_eq!(report.summary.p33.unwrap(), 365.0, epsilon = 1e-9);
    assert_relative_eq!(report.summary.p67.unwrap(), 430.5, epsilon = 1e-9);
    assert_eq!(report.summary.p33_formatted, "3.65e+02");

    assert_eq!(row(&report, "06037").color_category, ColorCategory::Green);
    assert_eq!(row(&report, "06073").color_category, ColorCategory::Green);
    assert_eq!(row(&report, "01003").color_category, ColorCategory::Yellow);
    assert_eq!(row(&report, "48201").color_category, ColorCategory::Yellow);
    assert_eq!(row(&report, "01001").color_category, ColorCategory::Red);
    assert_eq!(row(&report, "01005").color_category, ColorCategory::Red);
    assert_eq!(row(&report, "48113").color_category, ColorCategory::Gray);

    let unknown = row(&report, "72001");
    assert_eq!(unknown.county_name, "Unknown County");
    assert_eq!(unknown.state_abbr, "??");
    assert_eq!(unknown.color_category, ColorCategory::Gray);
    assert_eq!(unknown.ef_formatted, "N/A");

    assert_relative_eq!(row(&report, "01001").carbon_footprint.unwrap(), 450.0, epsilon = 1e-9);
    assert_eq!(row(&report, "01001").ef_formatted, "0.450");
}

#[test]
fn test_state_filter_reclassifies() {
    let pipeline = fixture_pipeline();
    let national = pipeline.compute(&query(ImpactMetric::Carbon, 1000.0, 0.0, "All States"));
    let california = pipeline.compute(&query(ImpactMetric::Carbon, 1000.0, 0.0, "California"));

    assert_eq!(california.rows.len(), 2);
    assert_eq!(california.state, "California");

    // San Diego (300) is low nationally but the higher of California's two
    assert_eq!(row(&national, "06073").color_category, ColorCategory::Green);
    assert_eq!(row(&california, "06073").color_category, ColorCategory::Red);
    assert_eq!(row(&california, "06037").color_category, ColorCategory::Green);
    assert_relative_eq!(california.summary.p33.unwrap(), 266.5, epsilon = 1e-9);
}

#[test]
fn test_texas_single_valid_value() {
    let report = fixture_pipeline().compute(&query(ImpactMetric::Carbon, 1000.0, 0.0, "Texas"));
    assert_eq!(report.summary.total_count, 2);
    assert_eq!(report.summary.valid_count, 1);
    assert_eq!(row(&report, "48201").color_category, ColorCategory::Green);
    assert_eq!(row(&report, "48113").color_category, ColorCategory::Gray);
}

#[test]
fn test_water_report() {
    let report = fixture_pipeline().compute(&query(ImpactMetric::Water, 1000.0, 0.0, "All States"));

    assert_relative_eq!(row(&report, "01001").water_footprint.unwrap(), 1200.0, epsilon = 1e-9);
    // No EWIF and no on-site water
    assert_eq!(row(&report, "01005").water_footprint, None);
    assert_eq!(row(&report, "01005").water_footprint_formatted, "N/A");
    assert_eq!(report.unit, "L/year");
}

#[test]
fn test_water_report_with_onsite_water() {
    let report = fixture_pipeline().compute(&query(ImpactMetric::Water, 1000.0, 50.0, "All States"));
    // Missing EWIF falls back to on-site water
    assert_relative_eq!(row(&report, "01005").water_footprint.unwrap(), 50.0);
    // Counties without any factor row behave the same way
    assert_relative_eq!(row(&report, "48113").water_footprint.unwrap(), 50.0);
    assert_eq!(report.summary.valid_count, 8);
}

#[test]
fn test_water_scarcity_no_inputs_is_all_gray() {
    let report = fixture_pipeline().compute(&query(ImpactMetric::WaterScarcity, 0.0, 0.0, "All States"));
    assert_eq!(report.summary.valid_count, 0);
    assert!(report.rows.iter().all(|r| r.color_category == ColorCategory::Gray));
    assert_eq!(report.summary.p33, None);
    assert_eq!(report.summary.p33_formatted, "N/A");
}

#[test]
fn test_water_scarcity_missing_acf() {
    let report = fixture_pipeline().compute(&query(ImpactMetric::WaterScarcity, 10.0, 100.0, "All States"));
    // Barbour: ACF missing, SWI 0.3 -> 0.3 x 10
    assert_relative_eq!(row(&report, "01005").water_scarcity_footprint.unwrap(), 3.0, epsilon = 1e-12);
    // Baldwin: SWI missing, ACF 1.5 -> 1.5 x 100
    assert_relative_eq!(row(&report, "01003").water_scarcity_footprint.unwrap(), 150.0, epsilon = 1e-12);
    // No factors at all with nonzero inputs: legitimate zero
    assert_eq!(row(&report, "48113").water_scarcity_footprint, Some(0.0));
    assert_eq!(row(&report, "48113").water_scarcity_footprint_formatted, "0.00e+00");
}

#[test]
fn test_unit_conversion_flows_through() {
    let pipeline = fixture_pipeline();
    let mut q = query(ImpactMetric::Carbon, 1.0, 0.0, "Alabama");
    q.inputs.power_unit = "kW".to_string();
    let report = pipeline.compute(&q);

    assert_relative_eq!(report.inputs.power_kwh_year, 8760.0);
    assert_relative_eq!(row(&report, "01001").carbon_footprint.unwrap(), 0.45 * 8760.0, epsilon = 1e-9);
    assert_eq!(report.inputs.power_converted.as_deref(), Some("8,760 kWh/year"));

    q.inputs.power_unit = "GW".to_string();
    let report = pipeline.compute(&q);
    assert_eq!(report.inputs.power_kwh_year, 0.0);
    assert_eq!(report.summary.valid_count, 0);
}

#[test]
fn test_parallel_matches_sequential() {
    let pipeline = fixture_pipeline();
    for metric in ImpactMetric::ALL {
        for state in ["All States", "Alabama", "Texas"] {
            let q = query(metric, 1234.0, 567.0, state);
            assert_eq!(pipeline.compute(&q), pipeline.compute_parallel(&q));
        }
    }
}

// =========================================================================
// Section 3: Boundaries and options
// =========================================================================

#[test]
fn test_state_options() {
    let options = fixture_pipeline().state_options();
    assert_eq!(options, vec!["All States", "Alabama", "California", "Texas"]);
}

#[test]
fn test_filtered_boundaries() {
    let pipeline = fixture_pipeline();

    let all = pipeline.boundaries(&StateFilter::All);
    assert_eq!(all.features.len(), 8);
    assert!(!all.fallback);

    let texas = pipeline.boundaries(&StateFilter::parse("Texas"));
    assert_eq!(texas.features.len(), 2);
    assert!(!texas.fallback);
    assert!(texas.features.iter().all(|f| f["id"].as_str().unwrap_or("").starts_with("48")));

    let nowhere = pipeline.boundaries(&StateFilter::parse("Nowhere"));
    assert!(nowhere.fallback);
    assert_eq!(nowhere.features.len(), 8);
}
