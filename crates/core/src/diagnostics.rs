//! Advisory messages produced while building, writing and reading weights
//!
//! Diagnostics never abort an operation. Producers collect them; callers
//! decide whether to log them (see [`Diagnostics::emit`]) or inspect them.

use serde::Serialize;
use std::fmt;

/// A single advisory message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Diagnostic {
    /// No threshold given; the computed default was used
    DefaultThreshold { threshold: f64 },
    /// Requested threshold exceeded the data extent
    ThresholdClamped { requested: f64, clamped: f64 },
    /// Every feature neighbors every other feature
    FullyConnected { num_features: usize },
    /// First row exceeding the warning limit
    NeighborWarnLimit { limit: usize, id: i32, count: usize },
    /// All rows that exceeded the warning limit
    NeighborWarnSample { limit: usize, count: usize, sample: Vec<i32> },
    /// First row cut down to the maximum
    NeighborMaxLimit { limit: usize, id: i32, count: usize },
    /// All rows that were cut down
    NeighborsTruncated { limit: usize, count: usize, sample: Vec<i32> },
    /// Features without neighbors
    Isolates { count: usize, sample: Vec<i32> },
    /// Every feature is isolated (reported instead of failing when allowed)
    AllIsolated { num_features: usize },
    /// Polygons without contiguous neighbors that received nearest neighbors
    IslandsAssigned { k: usize, count: usize, sample: Vec<i32> },
    /// Negative weights were dropped from a weights table
    NegativeWeightsDropped { count: usize },
    /// Weights table rows referencing unknown features were dropped
    UnknownIdsDropped { count: usize },
    /// The matrix is large enough to slow downstream tools
    LargeMatrix { links: u64 },
}

fn write_sample(f: &mut fmt::Formatter<'_>, sample: &[i32], total: usize) -> fmt::Result {
    let ids: Vec<String> = sample.iter().map(|id| id.to_string()).collect();
    write!(f, "{}", ids.join(", "))?;
    if total > sample.len() {
        write!(f, ", ...")?;
    }
    Ok(())
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DefaultThreshold { threshold } => {
                write!(f, "using default distance threshold {:.6}", threshold)
            }
            Diagnostic::ThresholdClamped { requested, clamped } => write!(
                f,
                "distance threshold {:.6} exceeds the data extent; using {:.6}",
                requested, clamped
            ),
            Diagnostic::FullyConnected { num_features } => write!(
                f,
                "all {} features are neighbors of each other",
                num_features
            ),
            Diagnostic::NeighborWarnLimit { limit, id, count } => write!(
                f,
                "feature {} has {} neighbors (more than {})",
                id, count, limit
            ),
            Diagnostic::NeighborWarnSample { limit, count, sample } => {
                write!(f, "{} features have more than {} neighbors: ", count, limit)?;
                write_sample(f, sample, *count)
            }
            Diagnostic::NeighborMaxLimit { limit, id, count } => write!(
                f,
                "feature {} has {} neighbors; keeping the first {}",
                id, count, limit
            ),
            Diagnostic::NeighborsTruncated { limit, count, sample } => {
                write!(f, "{} features truncated to {} neighbors: ", count, limit)?;
                write_sample(f, sample, *count)
            }
            Diagnostic::Isolates { count, sample } => {
                write!(f, "{} features have no neighbors: ", count)?;
                write_sample(f, sample, *count)
            }
            Diagnostic::AllIsolated { num_features } => {
                write!(f, "none of the {} features has a neighbor", num_features)
            }
            Diagnostic::IslandsAssigned { k, count, sample } => {
                write!(
                    f,
                    "{} polygons without contiguous neighbors use their {} nearest: ",
                    count, k
                )?;
                write_sample(f, sample, *count)
            }
            Diagnostic::NegativeWeightsDropped { count } => {
                write!(f, "{} negative weights were ignored", count)
            }
            Diagnostic::UnknownIdsDropped { count } => {
                write!(f, "{} weight records reference unknown features", count)
            }
            Diagnostic::LargeMatrix { links } => write!(
                f,
                "weight matrix has {} non-zero links; downstream tools may be slow",
                links
            ),
        }
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn append(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Log every diagnostic at warn level.
    pub fn emit(&self) {
        for d in &self.items {
            tracing::warn!("{}", d);
        }
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Sorted sample of at most `cap` ids.
pub fn id_sample(ids: &[i32], cap: usize) -> Vec<i32> {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.truncate(cap);
    sorted
}
