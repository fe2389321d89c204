//! # GeoWeights Core
//!
//! Core types and I/O for spatial weights matrices.
//!
//! This crate provides:
//! - `Feature`/`FeatureCollection`: the read-only input features
//! - `NeighborRow`, `Conceptualization` and the SWM weight-type codes
//! - `NeighborAccounting` and row standardization
//! - SWM, flat text weights and contiguity table I/O

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod feature;
pub mod io;
pub mod weights;

pub use config::NeighborConfig;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{Error, ErrorKind, Result};
pub use feature::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::NeighborConfig;
    pub use crate::diagnostics::{Diagnostic, Diagnostics};
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::feature::{AttributeValue, Feature, FeatureCollection};
    pub use crate::io::{ContiguityTable, SwmHeader, SwmReader, SwmWriter, WeightTable};
    pub use crate::weights::{
        Conceptualization, ContiguityKind, DistanceMethod, NeighborRow, NormalizedRow,
        TimeUnit, TimeWindow, WeightType,
    };
}
