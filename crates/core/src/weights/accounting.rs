//! Per-row neighbor bookkeeping
//!
//! Every row a builder produces passes through [`NeighborAccounting`], which
//! applies the optional maximum, records warnings on first occurrence and
//! collects isolates so the caller gets one bounded report at the end.

use serde::Serialize;

use super::row::{MatrixShape, NeighborRow};
use crate::config::NeighborConfig;
use crate::diagnostics::{id_sample, Diagnostic, Diagnostics};
use crate::error::{Error, Result};

/// Final neighbor statistics of a built matrix.
#[derive(Debug, Clone, Serialize)]
pub struct NeighborSummary {
    pub shape: MatrixShape,
    /// Ids without neighbors, in tracking order
    pub isolated: Vec<i32>,
    pub over_warn: Vec<i32>,
    pub truncated: Vec<i32>,
    pub diagnostics: Diagnostics,
}

impl NeighborSummary {
    pub fn num_features(&self) -> usize {
        self.shape.num_features
    }

    pub fn non_zero_links(&self) -> u64 {
        self.shape.non_zero_links
    }

    pub fn avg_neighbors(&self) -> f64 {
        self.shape.avg_neighbors()
    }

    pub fn percent_non_zero(&self) -> f64 {
        self.shape.percent_non_zero()
    }
}

#[derive(Debug)]
pub struct NeighborAccounting {
    config: NeighborConfig,
    shape: MatrixShape,
    isolated: Vec<i32>,
    over_warn: Vec<i32>,
    truncated: Vec<i32>,
}

impl NeighborAccounting {
    pub fn new(config: NeighborConfig) -> Self {
        Self {
            config,
            shape: MatrixShape::default(),
            isolated: Vec::new(),
            over_warn: Vec::new(),
            truncated: Vec::new(),
        }
    }

    pub fn config(&self) -> &NeighborConfig {
        &self.config
    }

    pub fn num_tracked(&self) -> usize {
        self.shape.num_features
    }

    /// Account for one row, truncating it when a maximum is configured.
    ///
    /// Returned diagnostics are non-empty only the first time a limit is hit.
    pub fn track_row(&mut self, mut row: NeighborRow) -> (NeighborRow, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let count = row.len();

        if count > self.config.warn_threshold {
            if self.over_warn.is_empty() {
                diagnostics.push(Diagnostic::NeighborWarnLimit {
                    limit: self.config.warn_threshold,
                    id: row.id,
                    count,
                });
            }
            self.over_warn.push(row.id);
        }

        if let Some(max) = self.config.max_threshold {
            if count > max {
                if self.truncated.is_empty() {
                    diagnostics.push(Diagnostic::NeighborMaxLimit {
                        limit: max,
                        id: row.id,
                        count,
                    });
                }
                self.truncated.push(row.id);
                row.truncate(max);
            }
        }

        if row.is_empty() {
            self.isolated.push(row.id);
        }
        self.shape.observe(row.len());
        (row, diagnostics)
    }

    /// Close the accounting and build the summary report.
    pub fn finish(self) -> Result<NeighborSummary> {
        let cap = self.config.report_sample;
        let n = self.shape.num_features;
        let mut diagnostics = Diagnostics::new();

        if !self.over_warn.is_empty() {
            diagnostics.push(Diagnostic::NeighborWarnSample {
                limit: self.config.warn_threshold,
                count: self.over_warn.len(),
                sample: id_sample(&self.over_warn, cap),
            });
        }
        if let Some(max) = self.config.max_threshold {
            if !self.truncated.is_empty() {
                diagnostics.push(Diagnostic::NeighborsTruncated {
                    limit: max,
                    count: self.truncated.len(),
                    sample: id_sample(&self.truncated, cap),
                });
            }
        }

        if n > 0 && self.isolated.len() == n {
            if self.config.fail_all_isolated {
                return Err(Error::AllFeaturesIsolated(n));
            }
            diagnostics.push(Diagnostic::AllIsolated { num_features: n });
        } else if !self.isolated.is_empty() {
            diagnostics.push(Diagnostic::Isolates {
                count: self.isolated.len(),
                sample: id_sample(&self.isolated, cap),
            });
        }

        Ok(NeighborSummary {
            shape: self.shape,
            isolated: self.isolated,
            over_warn: self.over_warn,
            truncated: self.truncated,
            diagnostics,
        })
    }
}
