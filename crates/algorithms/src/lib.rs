//! # GeoWeights Algorithms
//!
//! Spatial weights construction and global autocorrelation statistics.
//!
//! ## Modules
//!
//! - **spatial**: k-d tree search and Delaunay neighbors
//! - **weights**: threshold policy, kernels, the neighbor topology builder
//!   and SWM generation
//! - **statistics**: streaming Moran's I and General G, fed by a builder or
//!   a persisted SWM file

pub mod maybe_rayon;
pub mod spatial;
pub mod statistics;
pub mod weights;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::spatial::{delaunay_neighbors, KdTree};
    pub use crate::statistics::{
        run_from_builder, run_from_reader, run_from_swm, AutocorrelationEngine,
        GlobalStatistic, StatisticKind, StatisticRun,
    };
    pub use crate::weights::{
        generate_swm, write_matrix, BuildParams, BuildReport, GenerateReport,
        NeighborTopologyBuilder, SwmOptions,
    };
    pub use geoweights_core::prelude::*;
}
