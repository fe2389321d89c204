//! Global spatial autocorrelation over streamed neighbor rows
//!
//! - **Moran's I**: cross-product of deviations from the mean
//! - **General G**: sum of products of the values themselves
//!
//! Both statistics are tested under randomization. The engine sees each
//! feature's row exactly once, in enumeration order, and accumulates the
//! structural sums of the weight matrix (S0, S1, S2) alongside the
//! statistic-specific numerator and moments.

use std::collections::{BTreeMap, HashMap};
use std::f64::consts::SQRT_2;
use std::fmt;

use ndarray::Array1;
use statrs::function::erf::erfc;
use geoweights_core::error::{invalid_parameter, Error, Result};
use geoweights_core::feature::FeatureCollection;
use geoweights_core::weights::{MatrixShape, NeighborRow};

/// Which global statistic an engine computes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticKind {
    MoransI,
    GeneralG,
}

impl StatisticKind {
    pub fn name(self) -> &'static str {
        match self {
            StatisticKind::MoransI => "Moran's I",
            StatisticKind::GeneralG => "General G",
        }
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle of an [`AutocorrelationEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Accumulating,
    Finalized,
}

/// Result of a global autocorrelation test
#[derive(Debug, Clone)]
pub struct GlobalStatistic {
    pub kind: StatisticKind,
    /// Observed I or G
    pub index: f64,
    /// Expected value under randomization
    pub expected: f64,
    pub variance: f64,
    pub z_score: f64,
    /// P-value (two-tailed)
    pub p_value: f64,
    pub s0: f64,
    pub s1: f64,
    pub s2: f64,
    pub num_features: usize,
    /// Kurtosis ratio of the values (Moran's I only)
    pub b2: Option<f64>,
    /// Neighbor counts of the rows that were accumulated
    pub shape: MatrixShape,
}

/// Streaming accumulator for one statistic over one attribute.
///
/// ```ignore
/// let mut engine = AutocorrelationEngine::new(StatisticKind::MoransI, ids, values)?;
/// for row in rows {
///     engine.accumulate(&row)?;
/// }
/// let result = engine.finalize()?;
/// ```
#[derive(Debug)]
pub struct AutocorrelationEngine {
    kind: StatisticKind,
    state: EngineState,
    ids: Vec<i32>,
    order: HashMap<i32, usize>,
    values: Array1<f64>,
    deviations: Array1<f64>,
    sum_sq: f64,
    sum4: f64,
    total: f64,
    s0: f64,
    s1: f64,
    row_sum: Array1<f64>,
    col_sum: Array1<f64>,
    // Directed weights still waiting for their reverse pair
    pending: BTreeMap<(usize, usize), f64>,
    numerator: f64,
    // General G: sum over i != j of y_i * y_j, and value moments, for rows
    // with at least one neighbor
    g_denominator: f64,
    moments: [f64; 4],
    seen: Vec<bool>,
    shape: MatrixShape,
}

impl AutocorrelationEngine {
    /// Create an engine for `values`, parallel to feature `ids`.
    ///
    /// Fails fast on fewer than 3 features, non-finite values, repeated ids,
    /// zero variance and, for General G, negative values.
    pub fn new(kind: StatisticKind, ids: Vec<i32>, values: Vec<f64>) -> Result<Self> {
        let n = ids.len();
        if values.len() != n {
            return Err(invalid_parameter(
                "values",
                values.len(),
                format!("expected one value per feature ({})", n),
            ));
        }
        if n < 3 {
            return Err(invalid_parameter(
                "features",
                n,
                "at least 3 features are required",
            ));
        }

        let mut order = HashMap::with_capacity(n);
        for (i, &id) in ids.iter().enumerate() {
            if order.insert(id, i).is_some() {
                return Err(Error::DuplicateId(id));
            }
        }
        for (&id, &v) in ids.iter().zip(values.iter()) {
            if !v.is_finite() {
                return Err(invalid_parameter("value", v, format!("feature {}", id)));
            }
            if kind == StatisticKind::GeneralG && v < 0.0 {
                return Err(Error::NegativeValue { id, value: v });
            }
        }

        let values = Array1::from(values);
        let total = values.sum();
        let mean = total / n as f64;
        let deviations = values.mapv(|v| v - mean);
        let sum_sq = deviations.mapv(|d| d * d).sum();
        let sum4 = deviations.mapv(|d| d.powi(4)).sum();

        let scale = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if sum_sq / n as f64 <= (f64::EPSILON * scale).powi(2) {
            return Err(Error::FeatureVarianceZero);
        }

        Ok(Self {
            kind,
            state: EngineState::Idle,
            ids,
            order,
            values,
            deviations,
            sum_sq,
            sum4,
            total,
            s0: 0.0,
            s1: 0.0,
            row_sum: Array1::zeros(n),
            col_sum: Array1::zeros(n),
            pending: BTreeMap::new(),
            numerator: 0.0,
            g_denominator: 0.0,
            moments: [0.0; 4],
            seen: vec![false; n],
            shape: MatrixShape::default(),
        })
    }

    /// Engine for a numeric attribute of `features`.
    pub fn from_features(
        kind: StatisticKind,
        features: &FeatureCollection,
        field: &str,
    ) -> Result<Self> {
        let values = features.numeric_attribute(field)?;
        Self::new(kind, features.ids(), values)
    }

    pub fn kind(&self) -> StatisticKind {
        self.kind
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn num_features(&self) -> usize {
        self.ids.len()
    }

    /// Feature ids in enumeration order.
    pub fn ids(&self) -> &[i32] {
        &self.ids
    }

    /// Rows accumulated so far.
    pub fn rows_accumulated(&self) -> usize {
        self.shape.num_features
    }

    /// Fold one feature's row into the running sums.
    ///
    /// The row is checked completely before any sum changes: unknown ids,
    /// repeated neighbors and a second row for the same feature are errors
    /// that leave the engine as it was.
    pub fn accumulate(&mut self, row: &NeighborRow) -> Result<()> {
        if self.state == EngineState::Finalized {
            return Err(Error::UseAfterFinalize);
        }
        let i = self.position(row.id)?;
        if self.seen[i] {
            return Err(Error::DuplicateId(row.id));
        }
        row.check_unique()?;
        let neighbors = row
            .neighbors
            .iter()
            .map(|&id| self.position(id))
            .collect::<Result<Vec<usize>>>()?;

        self.state = EngineState::Accumulating;
        self.seen[i] = true;
        self.shape.observe(neighbors.len());

        let mut weighted_values = 0.0;
        for (&j, &w) in neighbors.iter().zip(row.weights.iter()) {
            self.s0 += w;
            self.row_sum[i] += w;
            self.col_sum[j] += w;

            if i == j {
                self.s1 += 2.0 * w * w;
            } else if let Some(reverse) = self.pending.remove(&(j, i)) {
                self.s1 += (w + reverse).powi(2);
            } else {
                self.pending.insert((i, j), w);
            }

            match self.kind {
                StatisticKind::MoransI => {
                    self.numerator += w * self.deviations[i] * self.deviations[j];
                }
                StatisticKind::GeneralG => weighted_values += w * self.values[j],
            }
        }

        if self.kind == StatisticKind::GeneralG && !neighbors.is_empty() {
            let y = self.values[i];
            self.numerator += y * weighted_values;
            self.g_denominator += y * (self.total - y);
            self.moments[0] += y;
            self.moments[1] += y * y;
            self.moments[2] += y.powi(3);
            self.moments[3] += y.powi(4);
        }
        Ok(())
    }

    /// S0, S1 and S2 of the rows seen so far. Directed weights whose
    /// reverse has not been seen count as if the reverse weight were zero.
    pub fn structural_sums(&self) -> (f64, f64, f64) {
        let unmatched: f64 = self.pending.values().map(|w| w * w).sum();
        let s2 = (&self.row_sum + &self.col_sum).mapv(|v| v * v).sum();
        (self.s0, self.s1 + unmatched, s2)
    }

    /// Close the run and compute the statistic.
    ///
    /// The engine is finalized whether or not this succeeds.
    pub fn finalize(&mut self) -> Result<GlobalStatistic> {
        if self.state == EngineState::Finalized {
            return Err(Error::UseAfterFinalize);
        }
        self.state = EngineState::Finalized;

        let (s0, s1, s2) = self.structural_sums();
        self.pending.clear();
        let n = self.ids.len();

        if s0 == 0.0 {
            return Err(Error::AllFeaturesIsolated(n));
        }

        let nf = n as f64;
        let (index, expected, e_sq, b2) = match self.kind {
            StatisticKind::MoransI => {
                let index = (nf / s0) * (self.numerator / self.sum_sq);
                let expected = -1.0 / (nf - 1.0);
                let b2 = nf * self.sum4 / (self.sum_sq * self.sum_sq);
                let s0_sq = s0 * s0;
                let a = nf * ((nf * nf - 3.0 * nf + 3.0) * s1 - nf * s2 + 3.0 * s0_sq);
                let b = b2 * ((nf * nf - nf) * s1 - 2.0 * nf * s2 + 6.0 * s0_sq);
                let c = (nf - 1.0) * (nf - 2.0) * (nf - 3.0) * s0_sq;
                (index, expected, (a - b) / c, Some(b2))
            }
            StatisticKind::GeneralG => {
                if self.g_denominator == 0.0 {
                    return Err(Error::FeatureVarianceZero);
                }
                let index = self.numerator / self.g_denominator;
                let expected = s0 / (nf * (nf - 1.0));
                let [m1, m2, m3, m4] = self.moments;
                let s0_sq = s0 * s0;
                let b0 = (nf * nf - 3.0 * nf + 3.0) * s1 - nf * s2 + 3.0 * s0_sq;
                let b1 = -((nf * nf - nf) * s1 - 2.0 * nf * s2 + 6.0 * s0_sq);
                let b2 = -(2.0 * nf * s1 - (nf + 3.0) * s2 + 6.0 * s0_sq);
                let b3 = 4.0 * (nf - 1.0) * s1 - 2.0 * (nf + 1.0) * s2 + 8.0 * s0_sq;
                let b4 = s1 - s2 + s0_sq;
                let num = b0 * m2 * m2
                    + b1 * m4
                    + b2 * m1 * m1 * m2
                    + b3 * m1 * m3
                    + b4 * m1.powi(4);
                let den = (m1 * m1 - m2).powi(2)
                    * nf
                    * (nf - 1.0)
                    * (nf - 2.0)
                    * (nf - 3.0);
                (index, expected, num / den, None)
            }
        };

        let variance = e_sq - expected * expected;
        if !variance.is_finite() || variance <= 0.0 {
            return Err(Error::DegenerateVariance(variance));
        }
        let z_score = (index - expected) / variance.sqrt();
        let p_value = two_sided_p(z_score);

        tracing::debug!(
            "{}: index={:.6} z={:.4} p={:.6}",
            self.kind,
            index,
            z_score,
            p_value
        );

        Ok(GlobalStatistic {
            kind: self.kind,
            index,
            expected,
            variance,
            z_score,
            p_value,
            s0,
            s1,
            s2,
            num_features: n,
            b2,
            shape: self.shape,
        })
    }

    fn position(&self, id: i32) -> Result<usize> {
        self.order.get(&id).copied().ok_or(Error::UnknownFeature(id))
    }
}

/// Standard normal CDF
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Two-sided p-value of a standard normal score
pub fn two_sided_p(z: f64) -> f64 {
    erfc(z.abs() / SQRT_2)
}
