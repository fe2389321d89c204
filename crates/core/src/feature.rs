//! Feature model: a stable id, a planar location, optional timestamp and
//! attributes. Features are read-only input to the weights builders and the
//! statistics; the feature source that produces them lives outside this crate.

use chrono::NaiveDateTime;
use geo_types::Point;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric view of the value, `None` for non-numeric variants.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// A geographic feature with a point location and attributes.
///
/// Polygons participate through their centroid; contiguity is supplied
/// separately by a [`ContiguityTable`](crate::io::ContiguityTable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    /// Unique feature id (the SWM unique-id field)
    pub id: i32,
    /// Planar (or geodesic-adjusted) location
    pub location: Point<f64>,
    /// Timestamp used by space-time windows
    #[serde(default)]
    pub time: Option<NaiveDateTime>,
    /// Feature attributes
    #[serde(default)]
    pub properties: HashMap<String, AttributeValue>,
}

impl Feature {
    /// Create a new feature at (x, y)
    pub fn new(id: i32, x: f64, y: f64) -> Self {
        Self {
            id,
            location: Point::new(x, y),
            time: None,
            properties: HashMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.set_property(key, value);
        self
    }

    /// Builder-style timestamp setter
    pub fn with_time(mut self, time: NaiveDateTime) -> Self {
        self.time = Some(time);
        self
    }

    pub fn x(&self) -> f64 {
        self.location.x()
    }

    pub fn y(&self) -> f64 {
        self.location.y()
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// Collection of features in enumeration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn from_features(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// One feature per coordinate pair, ids numbered from 0.
    pub fn from_xy(coords: &[(f64, f64)]) -> Self {
        coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Feature::new(i as i32, x, y))
            .collect()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Feature ids in enumeration order
    pub fn ids(&self) -> Vec<i32> {
        self.features.iter().map(|f| f.id).collect()
    }

    /// Fail with `DuplicateId` on the first repeated id.
    pub fn check_unique_ids(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.len());
        for f in &self.features {
            if !seen.insert(f.id) {
                return Err(Error::DuplicateId(f.id));
            }
        }
        Ok(())
    }

    /// Map from feature id to enumeration order.
    pub fn id_to_order(&self) -> Result<HashMap<i32, usize>> {
        let mut map = HashMap::with_capacity(self.len());
        for (order, f) in self.features.iter().enumerate() {
            if map.insert(f.id, order).is_some() {
                return Err(Error::DuplicateId(f.id));
            }
        }
        Ok(map)
    }

    /// Numeric values of one attribute in enumeration order.
    ///
    /// Missing values and non-numeric values are input validation errors.
    pub fn numeric_attribute(&self, field: &str) -> Result<Vec<f64>> {
        self.features
            .iter()
            .map(|f| match f.get_property(field) {
                None | Some(AttributeValue::Null) => Err(Error::MissingAttribute {
                    field: field.to_string(),
                    id: f.id,
                }),
                Some(v) => v.as_f64().ok_or_else(|| Error::WrongAttributeType {
                    field: field.to_string(),
                    id: f.id,
                }),
            })
            .collect()
    }

    /// Parse a JSON array of features.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Format(format!("feature collection: {}", e)))
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
