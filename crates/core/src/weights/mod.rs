//! Weight matrix building blocks: rows, conceptualizations, accounting and
//! row standardization.

pub mod accounting;
pub mod concept;
pub mod normalize;
pub mod row;

pub use accounting::{NeighborAccounting, NeighborSummary};
pub use concept::{
    Conceptualization, ContiguityKind, DistanceMethod, TimeUnit, TimeWindow, WeightType,
};
pub use normalize::{normalize, unstandardize};
pub use row::{MatrixShape, NeighborRow, NormalizedRow};

const REL_TOL: f64 = 1e-5;
const ABS_TOL: f64 = 1e-8;

/// Float equality with a relative and an absolute tolerance.
#[inline]
pub fn compare_float(a: f64, b: f64) -> bool {
    (a - b).abs() <= ABS_TOL + REL_TOL * b.abs()
}
