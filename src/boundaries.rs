//! County Boundaries
//!
//! GeoJSON FeatureCollection of county polygons keyed by FIPS `id`. Only the ids
//! take part in the computation; features are handed back unchanged for drawing.

use crate::data::{normalize_fips, LoadError};
use rustc_hash::FxHashSet;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;

/// Loaded boundary features plus their normalized ids
#[derive(Debug, Clone)]
pub struct BoundarySet {
    features: Vec<Value>,
    /// Parallel to `features`; `None` for features without an id
    ids: Vec<Option<String>>,
}

/// Boundary features for one map view
#[derive(Debug, Clone, Serialize)]
pub struct FilteredBoundaries {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Value>,
    /// A state was requested but none of its counties matched, so the full set is returned
    pub fallback: bool,
}

fn feature_id(feature: &Value) -> Option<String> {
    match feature.get("id")? {
        Value::String(s) => normalize_fips(s),
        Value::Number(n) => normalize_fips(&n.to_string()),
        _ => None,
    }
}

impl BoundarySet {
    /// Load a GeoJSON FeatureCollection from disk
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&contents).map_err(|e| LoadError::InvalidGeoJson {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_geojson(value).map_err(|reason| LoadError::InvalidGeoJson {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Build from a parsed FeatureCollection
    pub fn from_geojson(value: Value) -> Result<Self, String> {
        let Value::Object(mut collection) = value else {
            return Err("top-level value is not an object".to_string());
        };
        let features = match collection.remove("features") {
            Some(Value::Array(features)) => features,
            Some(_) => return Err("'features' is not an array".to_string()),
            None => return Err("missing 'features'".to_string()),
        };

        let ids = features.iter().map(feature_id).collect();
        Ok(Self { features, ids })
    }

    /// Geometry-less features for the given ids (tests and benchmarks)
    pub fn from_ids(ids: &[&str]) -> Self {
        let features: Vec<Value> = ids
            .iter()
            .map(|id| json!({"type": "Feature", "id": id, "properties": {}, "geometry": null}))
            .collect();
        let ids = features.iter().map(feature_id).collect();
        Self { features, ids }
    }

    /// Feature ids in file order (features without an id are skipped)
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().filter_map(|id| id.as_deref())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Full collection
    pub fn all(&self) -> FilteredBoundaries {
        FilteredBoundaries {
            kind: "FeatureCollection",
            features: self.features.clone(),
            fallback: false,
        }
    }

    /// Only the features whose id is in `keep`
    ///
    /// An empty match falls back to the full collection with `fallback = true`.
    pub fn filtered(&self, keep: &FxHashSet<&str>) -> FilteredBoundaries {
        let features: Vec<Value> = self
            .features
            .iter()
            .zip(&self.ids)
            .filter(|(_, id)| id.as_deref().is_some_and(|id| keep.contains(id)))
            .map(|(feature, _)| feature.clone())
            .collect();

        if features.is_empty() {
            return FilteredBoundaries {
                fallback: true,
                ..self.all()
            };
        }

        FilteredBoundaries {
            kind: "FeatureCollection",
            features,
            fallback: false,
        }
    }
}
