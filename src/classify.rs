//! Percentile Classification
//!
//! Buckets a column of footprint values into green/yellow/red relative to the
//! 33rd and 67th percentiles of the valid values, with gray for missing data.
//!
//! Thresholds always come from the column that is passed in, so a state-filtered
//! column is classified against that state's counties only.

use serde::Serialize;

/// Lower threshold percentile
pub const LOW_PERCENTILE: f64 = 33.0;

/// Upper threshold percentile
pub const HIGH_PERCENTILE: f64 = 67.0;

/// Map color bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorCategory {
    Green,
    Yellow,
    Red,
    Gray,
}

impl ColorCategory {
    /// Position on the choropleth color scale (0-3)
    pub fn code(self) -> u8 {
        match self {
            ColorCategory::Green => 0,
            ColorCategory::Yellow => 1,
            ColorCategory::Red => 2,
            ColorCategory::Gray => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColorCategory::Green => "green",
            ColorCategory::Yellow => "yellow",
            ColorCategory::Red => "red",
            ColorCategory::Gray => "gray",
        }
    }

    /// Legend text
    pub fn legend(self) -> &'static str {
        match self {
            ColorCategory::Green => "Below 33rd percentile (lowest impact)",
            ColorCategory::Yellow => "33rd-67th percentile (medium impact)",
            ColorCategory::Red => "Above 67th percentile (highest impact)",
            ColorCategory::Gray => "No data available",
        }
    }
}

/// 33rd/67th percentile cut points
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub p33: f64,
    pub p67: f64,
}

impl Thresholds {
    /// Thresholds of the finite values, `None` if there are none
    pub fn from_values(values: &[Option<f64>]) -> Option<Self> {
        let mut valid: Vec<f64> = values
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .collect();

        if valid.is_empty() {
            return None;
        }
        valid.sort_by(f64::total_cmp);

        Some(Self {
            p33: percentile_linear(&valid, LOW_PERCENTILE),
            p67: percentile_linear(&valid, HIGH_PERCENTILE),
        })
    }

    pub fn categorize(&self, value: Option<f64>) -> ColorCategory {
        match value {
            Some(v) if v.is_finite() => {
                if v <= self.p33 {
                    ColorCategory::Green
                } else if v <= self.p67 {
                    ColorCategory::Yellow
                } else {
                    ColorCategory::Red
                }
            }
            _ => ColorCategory::Gray,
        }
    }
}

/// Percentile of sorted data using linear interpolation between closest ranks
///
/// rank = (n - 1) × q / 100; result = x[lo] + (rank - lo) × (x[lo + 1] - x[lo])
///
/// `sorted` must be non-empty and ascending; `q` is in [0, 100].
pub fn percentile_linear(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let rank = (n - 1) as f64 * (q.clamp(0.0, 100.0) / 100.0);
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let fraction = rank - lo as f64;

    sorted[lo] + fraction * (sorted[hi] - sorted[lo])
}

/// Classification of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub categories: Vec<ColorCategory>,
    /// `None` when no value is valid
    pub thresholds: Option<Thresholds>,
    pub valid_count: usize,
    pub total_count: usize,
}

/// Classify a column of values against its own percentiles
pub fn classify_values(values: &[Option<f64>]) -> Classification {
    let thresholds = Thresholds::from_values(values);

    let categories = match &thresholds {
        Some(t) => values.iter().map(|v| t.categorize(*v)).collect(),
        None => vec![ColorCategory::Gray; values.len()],
    };

    let valid_count = values
        .iter()
        .filter(|v| matches!(v, Some(x) if x.is_finite()))
        .count();

    Classification {
        categories,
        thresholds,
        valid_count,
        total_count: values.len(),
    }
}
