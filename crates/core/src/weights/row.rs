//! Neighbor rows and matrix shape summaries

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::compare_float;
use crate::error::{Error, Result};

/// The weighted neighbors of one feature.
///
/// `neighbors` and `weights` are parallel; order is significant and is
/// preserved through truncation, normalization and serialization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NeighborRow {
    pub id: i32,
    pub neighbors: Vec<i32>,
    pub weights: Vec<f64>,
}

impl NeighborRow {
    /// Row without neighbors.
    pub fn new(id: i32) -> Self {
        Self {
            id,
            neighbors: Vec::new(),
            weights: Vec::new(),
        }
    }

    pub fn with_capacity(id: i32, capacity: usize) -> Self {
        Self {
            id,
            neighbors: Vec::with_capacity(capacity),
            weights: Vec::with_capacity(capacity),
        }
    }

    pub fn from_pairs(id: i32, pairs: impl IntoIterator<Item = (i32, f64)>) -> Self {
        let (neighbors, weights) = pairs.into_iter().unzip();
        Self { id, neighbors, weights }
    }

    /// Every neighbor with the same weight.
    pub fn uniform(id: i32, neighbors: Vec<i32>, weight: f64) -> Self {
        let weights = vec![weight; neighbors.len()];
        Self { id, neighbors, weights }
    }

    pub fn push(&mut self, neighbor: i32, weight: f64) {
        self.neighbors.push(neighbor);
        self.weights.push(weight);
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.neighbors.iter().copied().zip(self.weights.iter().copied())
    }

    pub fn weight_sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Keep the first `len` neighbors.
    pub fn truncate(&mut self, len: usize) {
        self.neighbors.truncate(len);
        self.weights.truncate(len);
    }

    /// Whether all weights are equal within float tolerance.
    pub fn is_uniform(&self) -> bool {
        match self.weights.first() {
            Some(&first) => self.weights.iter().all(|&w| compare_float(w, first)),
            None => true,
        }
    }

    /// Fail on the first neighbor listed twice.
    pub fn check_unique(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.len());
        for &n in &self.neighbors {
            if !seen.insert(n) {
                return Err(Error::DuplicateNeighbor {
                    id: self.id,
                    neighbor: n,
                });
            }
        }
        Ok(())
    }
}

/// A neighbor row after optional row standardization.
///
/// `unstandardized_sum` is the weight sum before standardization, kept so a
/// reader can recover the raw weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub row: NeighborRow,
    pub unstandardized_sum: f64,
}

impl NormalizedRow {
    pub fn id(&self) -> i32 {
        self.row.id
    }
}

/// Counts describing the sparsity of a weight matrix.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MatrixShape {
    pub num_features: usize,
    pub non_zero_links: u64,
    pub min_neighbors: usize,
    pub max_neighbors: usize,
}

impl MatrixShape {
    /// Fold one row length into the running counts.
    pub fn observe(&mut self, neighbors: usize) {
        if self.num_features == 0 {
            self.min_neighbors = neighbors;
            self.max_neighbors = neighbors;
        } else {
            self.min_neighbors = self.min_neighbors.min(neighbors);
            self.max_neighbors = self.max_neighbors.max(neighbors);
        }
        self.num_features += 1;
        self.non_zero_links += neighbors as u64;
    }

    pub fn avg_neighbors(&self) -> f64 {
        if self.num_features == 0 {
            0.0
        } else {
            self.non_zero_links as f64 / self.num_features as f64
        }
    }

    /// Share of non-zero cells in the full N x N matrix, in percent.
    pub fn percent_non_zero(&self) -> f64 {
        if self.num_features == 0 {
            return 0.0;
        }
        let n = self.num_features as f64;
        self.non_zero_links as f64 / (n * n) * 100.0
    }
}
