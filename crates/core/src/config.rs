//! Tunables shared by the weights builders, the SWM writer and the statistics

use serde::{Deserialize, Serialize};

/// Non-zero link count at or above which a matrix is reported as large.
pub const LARGE_MATRIX_LINKS: u64 = 20_000_000;

/// Feature count above which a fully connected matrix is reported.
pub const FULLY_CONNECTED_WARN: usize = 500;

/// Default cap on the number of ids listed in a diagnostic.
pub const DEFAULT_REPORT_SAMPLE: usize = 30;

/// Default per-row neighbor count that triggers a warning.
pub const DEFAULT_WARN_THRESHOLD: usize = 1000;

/// Neighbor accounting configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborConfig {
    /// Warn when a row has more neighbors than this
    pub warn_threshold: usize,
    /// Truncate rows longer than this, keeping the first entries
    pub max_threshold: Option<usize>,
    /// Ids listed per diagnostic
    pub report_sample: usize,
    /// Treat a matrix where every feature is isolated as an error
    pub fail_all_isolated: bool,
}

impl Default for NeighborConfig {
    fn default() -> Self {
        Self {
            warn_threshold: DEFAULT_WARN_THRESHOLD,
            max_threshold: None,
            report_sample: DEFAULT_REPORT_SAMPLE,
            fail_all_isolated: true,
        }
    }
}
