//! Global spatial autocorrelation
//!
//! - **autocorrelation**: streaming Moran's I / General G engine
//! - **replay**: runs fed by a builder or by a persisted SWM file

pub mod autocorrelation;
pub mod replay;

pub use autocorrelation::{
    normal_cdf, two_sided_p, AutocorrelationEngine, EngineState, GlobalStatistic, StatisticKind,
};
pub use replay::{run_from_builder, run_from_reader, run_from_swm, StatisticRun};
