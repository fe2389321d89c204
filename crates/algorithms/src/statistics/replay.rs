//! End-to-end statistic runs
//!
//! Rows reach the engine either straight from a [`NeighborTopologyBuilder`]
//! or replayed from a persisted SWM file. Both paths poll an optional
//! cancellation flag between rows.

use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use geoweights_core::diagnostics::{Diagnostic, Diagnostics};
use geoweights_core::error::{Error, Result};
use geoweights_core::feature::FeatureCollection;
use geoweights_core::io::SwmReader;
use geoweights_core::weights::{normalize, unstandardize, NeighborRow, NormalizedRow};

use super::autocorrelation::{AutocorrelationEngine, GlobalStatistic, StatisticKind};
use crate::weights::{BuildReport, NeighborTopologyBuilder};

/// Outcome of a statistic run
#[derive(Debug, Clone)]
pub struct StatisticRun {
    pub statistic: GlobalStatistic,
    pub diagnostics: Diagnostics,
    /// Neighbor report, when rows came from a builder
    pub build: Option<BuildReport>,
    /// File rows skipped because their feature is not part of the run
    pub skipped_rows: usize,
}

fn check_cancelled(cancel: Option<&AtomicBool>) -> Result<()> {
    match cancel {
        Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
        _ => Ok(()),
    }
}

/// Build rows for `field` and feed them to a fresh engine.
///
/// Values are validated before any row is built.
pub fn run_from_builder(
    kind: StatisticKind,
    builder: NeighborTopologyBuilder<'_>,
    field: &str,
    row_standardize: bool,
    cancel: Option<&AtomicBool>,
) -> Result<StatisticRun> {
    let mut engine = AutocorrelationEngine::from_features(kind, builder.features(), field)?;
    let mut rows = builder.build()?;
    for row in rows.by_ref() {
        check_cancelled(cancel)?;
        let normalized = normalize(row, row_standardize);
        engine.accumulate(&normalized.row)?;
    }
    let build = rows.finish()?;
    let statistic = engine.finalize()?;

    let diagnostics = build.diagnostics.clone();
    diagnostics.emit();
    Ok(StatisticRun {
        statistic,
        diagnostics,
        build: Some(build),
        skipped_rows: 0,
    })
}

/// Replay an SWM stream against `features`.
///
/// With as many features as the file has rows, every id in the file must be
/// a feature of the run. With fewer, the run is a subset: rows of unknown
/// features are skipped, unknown neighbors are dropped and standardized
/// rows are re-standardized over the neighbors that remain.
pub fn run_from_reader<R: BufRead>(
    kind: StatisticKind,
    mut reader: SwmReader<R>,
    features: &FeatureCollection,
    field: &str,
    cancel: Option<&AtomicBool>,
) -> Result<StatisticRun> {
    let mut engine = AutocorrelationEngine::from_features(kind, features, field)?;
    let expected = reader.header().num_features;
    if features.len() > expected {
        return Err(Error::RowCountMismatch {
            expected,
            actual: features.len(),
        });
    }
    let subset = features.len() < expected;
    let row_standardized = reader.header().row_standardized;
    let known: HashSet<i32> = engine.ids().iter().copied().collect();
    if subset {
        tracing::debug!(
            "replaying {} of {} rows as a subset",
            features.len(),
            expected
        );
    }

    let mut skipped_rows = 0;
    let mut dropped = 0;
    while let Some(normalized) = reader.read_row()? {
        check_cancelled(cancel)?;
        if !subset {
            engine.accumulate(&normalized.row)?;
            continue;
        }
        if !known.contains(&normalized.id()) {
            skipped_rows += 1;
            continue;
        }
        let (row, lost) = restrict(normalized, &known, row_standardized);
        dropped += lost;
        engine.accumulate(&row)?;
    }
    let statistic = engine.finalize()?;

    let mut diagnostics = Diagnostics::new();
    if dropped > 0 {
        diagnostics.push(Diagnostic::UnknownIdsDropped { count: dropped });
    }
    diagnostics.emit();
    Ok(StatisticRun {
        statistic,
        diagnostics,
        build: None,
        skipped_rows,
    })
}

/// Open `path` and replay it against `features`.
pub fn run_from_swm<P: AsRef<Path>>(
    kind: StatisticKind,
    path: P,
    features: &FeatureCollection,
    field: &str,
    cancel: Option<&AtomicBool>,
) -> Result<StatisticRun> {
    let reader = SwmReader::open(path)?;
    run_from_reader(kind, reader, features, field, cancel)
}

/// Drop neighbors outside `known`, returning the row and how many went.
fn restrict(
    normalized: NormalizedRow,
    known: &HashSet<i32>,
    row_standardized: bool,
) -> (NeighborRow, usize) {
    let raw = if row_standardized {
        unstandardize(normalized)
    } else {
        normalized.row
    };
    let total = raw.len();
    let kept = NeighborRow::from_pairs(raw.id, raw.pairs().filter(|(j, _)| known.contains(j)));
    let lost = total - kept.len();
    let row = if row_standardized {
        normalize(kept, true).row
    } else {
        kept
    };
    (row, lost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoweights_core::feature::{AttributeValue, Feature};
    use geoweights_core::io::{write_swm_to_buffer, SwmHeader};
    use geoweights_core::weights::{Conceptualization, WeightType};

    use crate::weights::BuildParams;

    fn line_features(n: usize) -> FeatureCollection {
        (0..n)
            .map(|i| {
                Feature::new(i as i32, i as f64, 0.0)
                    .with_property("v", AttributeValue::Float(i as f64 + 1.0))
            })
            .collect()
    }

    fn line_swm(n: usize) -> Vec<u8> {
        let rows: Vec<NeighborRow> = (0..n as i32)
            .map(|i| {
                let neighbors = [i - 1, i + 1]
                    .into_iter()
                    .filter(|&j| j >= 0 && j < n as i32)
                    .collect();
                NeighborRow::uniform(i, neighbors, 1.0)
            })
            .collect();
        let header = SwmHeader::new("ID", WeightType::FixedDistance, n, true);
        write_swm_to_buffer(header, rows).unwrap().0
    }

    #[test]
    fn test_builder_and_file_agree() {
        let fc = line_features(5);
        let concept = Conceptualization::FixedDistance {
            threshold: Some(1.5),
        };
        let direct = run_from_builder(
            StatisticKind::MoransI,
            NeighborTopologyBuilder::new(&fc, concept, BuildParams::default()),
            "v",
            true,
            None,
        )
        .unwrap();

        let buf = line_swm(5);
        let reader = SwmReader::new(buf.as_slice()).unwrap();
        let replayed = run_from_reader(StatisticKind::MoransI, reader, &fc, "v", None).unwrap();

        assert!((direct.statistic.index - 0.6).abs() < 1e-12);
        assert_eq!(direct.statistic.index, replayed.statistic.index);
        assert_eq!(direct.statistic.variance, replayed.statistic.variance);
        assert!(direct.build.is_some());
        assert_eq!(replayed.skipped_rows, 0);
    }

    #[test]
    fn test_subset_replay() {
        let buf = line_swm(6);
        let fc = line_features(4);
        let reader = SwmReader::new(buf.as_slice()).unwrap();
        let run = run_from_reader(StatisticKind::MoransI, reader, &fc, "v", None).unwrap();
        assert_eq!(run.skipped_rows, 2);
        // 3 -> 4 is the one link into the dropped features
        assert!(run
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnknownIdsDropped { count: 1 })));
        // rows re-standardized over the remaining neighbors
        assert!((run.statistic.s0 - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_feature_outside_subset() {
        let buf = line_swm(5);
        let mut fc = line_features(4);
        fc.push(Feature::new(99, 9.0, 0.0).with_property("v", AttributeValue::Float(3.5)));
        let reader = SwmReader::new(buf.as_slice()).unwrap();
        assert!(matches!(
            run_from_reader(StatisticKind::MoransI, reader, &fc, "v", None),
            Err(Error::UnknownFeature(4))
        ));
    }

    #[test]
    fn test_too_many_features() {
        let buf = line_swm(4);
        let fc = line_features(5);
        let reader = SwmReader::new(buf.as_slice()).unwrap();
        assert!(matches!(
            run_from_reader(StatisticKind::GeneralG, reader, &fc, "v", None),
            Err(Error::RowCountMismatch {
                expected: 4,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_cancelled() {
        let fc = line_features(5);
        let cancel = AtomicBool::new(true);
        let buf = line_swm(5);
        let reader = SwmReader::new(buf.as_slice()).unwrap();
        assert!(matches!(
            run_from_reader(StatisticKind::MoransI, reader, &fc, "v", Some(&cancel)),
            Err(Error::Cancelled)
        ));

        let concept = Conceptualization::KNearest { k: 1 };
        assert!(matches!(
            run_from_builder(
                StatisticKind::MoransI,
                NeighborTopologyBuilder::new(&fc, concept, BuildParams::default()),
                "v",
                true,
                Some(&cancel),
            ),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn test_truncated_file_produces_no_statistic() {
        let mut buf = line_swm(5);
        buf.truncate(buf.len() - 4);
        let fc = line_features(5);
        let reader = SwmReader::new(buf.as_slice()).unwrap();
        assert!(matches!(
            run_from_reader(StatisticKind::MoransI, reader, &fc, "v", None),
            Err(Error::Format(_))
        ));
    }
}
