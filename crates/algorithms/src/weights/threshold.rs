//! Distance threshold policy
//!
//! Resolves the threshold a distance-based conceptualization actually uses:
//! a default that gives every feature at least one neighbor when none is
//! given, and validation against the extent of the data otherwise.

use geo::{BoundingRect, MultiPoint};
use geoweights_core::config::FULLY_CONNECTED_WARN;
use geoweights_core::diagnostics::Diagnostic;
use geoweights_core::error::{invalid_parameter, Result};
use geoweights_core::weights::Conceptualization;

use crate::maybe_rayon::*;
use crate::spatial::KdTree;

/// Slack applied to the largest nearest-neighbor distance.
const DEFAULT_SLACK: f64 = 1.0001;
/// Thresholds below this share of the extent are rejected.
const MIN_EXTENT_SHARE: f64 = 0.001;
/// Expansion of a threshold that was set to the extent, for planar runs.
const MAX_SET_EXPANSION: f64 = 1.5;

/// The threshold a builder runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedThreshold {
    pub value: f64,
    /// The threshold was set to the extent of the data
    pub max_set: bool,
    pub max_extent: f64,
    pub diagnostics: Vec<Diagnostic>,
}

/// Larger side of the bounding box of `points`.
pub fn max_extent(points: &[(f64, f64)]) -> f64 {
    let multi: MultiPoint<f64> = points.iter().copied().collect();
    match multi.bounding_rect() {
        Some(rect) => rect.width().max(rect.height()),
        None => 0.0,
    }
}

/// Largest nearest-neighbor distance, times a small slack.
pub fn default_threshold(tree: &KdTree) -> f64 {
    let nearest: Vec<f64> = (0..tree.len())
        .into_par_iter()
        .map(|i| {
            let (x, y) = tree.point(i);
            tree.nearest(x, y, Some(i)).map_or(0.0, |n| n.distance)
        })
        .collect();
    nearest.into_iter().fold(0.0, f64::max) * DEFAULT_SLACK
}

/// Resolve the threshold for `concept`, or `None` when it is not distance
/// based.
pub fn resolve_threshold(
    concept: &Conceptualization,
    tree: &KdTree,
    use_chordal: bool,
) -> Result<Option<ResolvedThreshold>> {
    if !concept.is_distance_based() {
        return Ok(None);
    }
    let points: Vec<(f64, f64)> = (0..tree.len()).map(|i| tree.point(i)).collect();
    let extent = max_extent(&points);

    let requested = match concept.threshold() {
        Some(t) => t,
        None => {
            let value = default_threshold(tree);
            tracing::debug!("default threshold {:.6}", value);
            return Ok(Some(ResolvedThreshold {
                value,
                max_set: false,
                max_extent: extent,
                diagnostics: vec![Diagnostic::DefaultThreshold { threshold: value }],
            }));
        }
    };

    if !requested.is_finite() || requested < 0.0 {
        return Err(invalid_parameter(
            "threshold",
            requested,
            "must be a non-negative distance",
        ));
    }

    let mut diagnostics = Vec::new();
    let mut threshold = requested;
    let mut max_set = false;

    if threshold == 0.0 {
        match concept {
            Conceptualization::InverseDistance { .. } => {
                threshold = extent;
                max_set = true;
            }
            _ => {
                return Err(invalid_parameter(
                    "threshold",
                    requested,
                    "zero is only allowed for inverse distance",
                ))
            }
        }
    }

    if extent > 0.0 && threshold > extent {
        diagnostics.push(Diagnostic::ThresholdClamped {
            requested,
            clamped: extent,
        });
        threshold = extent;
        max_set = true;
    }

    let minimum = extent * MIN_EXTENT_SHARE;
    if threshold < minimum && threshold != 0.0 {
        match concept {
            Conceptualization::ZoneOfIndifference { .. } => {
                if threshold < 1.0 {
                    threshold = 1.0;
                }
            }
            _ => {
                return Err(invalid_parameter(
                    "threshold",
                    requested,
                    format!("below 0.1% of the data extent ({:.6})", extent),
                ))
            }
        }
    }

    if max_set && !use_chordal {
        threshold *= MAX_SET_EXPANSION;
    }
    if max_set && tree.len() > FULLY_CONNECTED_WARN {
        diagnostics.push(Diagnostic::FullyConnected {
            num_features: tree.len(),
        });
    }

    Ok(Some(ResolvedThreshold {
        value: threshold,
        max_set,
        max_extent: extent,
        diagnostics,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoweights_core::error::Error;
    use geoweights_core::weights::DistanceMethod;

    fn line_tree(n: usize) -> KdTree {
        let pts: Vec<(f64, f64)> = (0..n).map(|i| (i as f64 * 10.0, 0.0)).collect();
        KdTree::build(&pts, DistanceMethod::Euclidean)
    }

    fn fixed(t: f64) -> Conceptualization {
        Conceptualization::FixedDistance { threshold: Some(t) }
    }

    #[test]
    fn test_extent() {
        assert_eq!(max_extent(&[(0.0, 0.0), (4.0, 1.0), (2.0, -2.0)]), 4.0);
        assert_eq!(max_extent(&[]), 0.0);
    }

    #[test]
    fn test_default_threshold() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (5.0, 0.0)];
        let tree = KdTree::build(&pts, DistanceMethod::Euclidean);
        let t = default_threshold(&tree);
        assert!((t - 4.0 * 1.0001).abs() < 1e-12);

        let c = Conceptualization::FixedDistance { threshold: None };
        let r = resolve_threshold(&c, &tree, false).unwrap().unwrap();
        assert!(!r.max_set);
        assert!(matches!(r.diagnostics[0], Diagnostic::DefaultThreshold { .. }));
    }

    #[test]
    fn test_explicit_threshold_passes() {
        let r = resolve_threshold(&fixed(15.0), &line_tree(5), false).unwrap().unwrap();
        assert_eq!(r.value, 15.0);
        assert!(!r.max_set);
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn test_negative_and_zero() {
        let tree = line_tree(5);
        assert!(matches!(
            resolve_threshold(&fixed(-1.0), &tree, false),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(resolve_threshold(&fixed(0.0), &tree, false).is_err());
        let zoi = Conceptualization::ZoneOfIndifference { threshold: Some(0.0) };
        assert!(resolve_threshold(&zoi, &tree, false).is_err());

        let idw = Conceptualization::InverseDistance {
            exponent: 1.0,
            threshold: Some(0.0),
        };
        let r = resolve_threshold(&idw, &tree, false).unwrap().unwrap();
        assert!(r.max_set);
        assert!((r.value - 40.0 * 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_to_extent() {
        let tree = line_tree(5);
        let r = resolve_threshold(&fixed(100.0), &tree, false).unwrap().unwrap();
        assert!(r.max_set);
        assert!((r.value - 60.0).abs() < 1e-12);
        assert!(matches!(
            r.diagnostics[0],
            Diagnostic::ThresholdClamped { clamped, .. } if clamped == 40.0
        ));

        let chordal = resolve_threshold(&fixed(100.0), &tree, true).unwrap().unwrap();
        assert!((chordal.value - 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_minimum_radius() {
        let tree = line_tree(5);
        assert!(resolve_threshold(&fixed(0.01), &tree, false).is_err());
        let zoi = Conceptualization::ZoneOfIndifference { threshold: Some(0.01) };
        let r = resolve_threshold(&zoi, &tree, false).unwrap().unwrap();
        assert_eq!(r.value, 1.0);
    }

    #[test]
    fn test_fully_connected_warning() {
        let tree = line_tree(501);
        let r = resolve_threshold(&fixed(1e9), &tree, false).unwrap().unwrap();
        assert!(r
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::FullyConnected { num_features: 501 })));
    }
}
