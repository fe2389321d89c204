//! Spatial weights construction
//!
//! - **builder**: neighbor rows for every conceptualization
//! - **threshold**: default and validated distance thresholds
//! - **kernel**: distance-to-weight functions
//! - **generate**: build and persist an SWM file

pub mod builder;
pub mod generate;
pub mod kernel;
pub mod threshold;

pub use builder::{BuildParams, BuildReport, NeighborRows, NeighborTopologyBuilder};
pub use generate::{generate_swm, write_matrix, GenerateReport, SwmOptions};
pub use kernel::Kernel;
pub use threshold::{default_threshold, max_extent, resolve_threshold, ResolvedThreshold};
