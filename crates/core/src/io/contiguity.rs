//! Polygon contiguity tables
//!
//! Records come from an external polygon-neighbor tool; each one says that
//! two polygons touch along `length` with `area` of overlap.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::weights::{compare_float, ContiguityKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContiguityRecord {
    pub from: i32,
    pub to: i32,
    /// Shared boundary length
    #[serde(default)]
    pub length: f64,
    /// Overlap area
    #[serde(default)]
    pub area: f64,
}

impl ContiguityRecord {
    pub fn new(from: i32, to: i32, length: f64, area: f64) -> Self {
        Self { from, to, length, area }
    }

    /// Polygons that meet at a single point.
    pub fn is_corner_only(&self) -> bool {
        compare_float(self.length, 0.0) && compare_float(self.area, 0.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContiguityTable {
    pub records: Vec<ContiguityRecord>,
}

impl ContiguityTable {
    pub fn new(records: Vec<ContiguityRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: ContiguityRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Format(format!("contiguity table: {}", e)))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Symmetric neighbor lists in record order.
    ///
    /// Rook drops corner-only records. Self references and repeated pairs
    /// are ignored.
    pub fn neighbor_lists(&self, kind: ContiguityKind) -> HashMap<i32, Vec<i32>> {
        let mut lists: HashMap<i32, Vec<i32>> = HashMap::new();
        let mut add = |a: i32, b: i32| {
            let list = lists.entry(a).or_default();
            if !list.contains(&b) {
                list.push(b);
            }
        };
        for r in &self.records {
            if r.from == r.to {
                continue;
            }
            if kind == ContiguityKind::Rook && r.is_corner_only() {
                continue;
            }
            add(r.from, r.to);
            add(r.to, r.from);
        }
        lists
    }
}
