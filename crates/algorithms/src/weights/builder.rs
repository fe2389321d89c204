//! Neighbor topology builder
//!
//! Turns a feature collection and a [`Conceptualization`] into one
//! [`NeighborRow`] per feature, in enumeration order. All validation happens
//! in [`NeighborTopologyBuilder::build`]; the returned [`NeighborRows`]
//! iterator then computes rows lazily and runs each one through
//! [`NeighborAccounting`].
//!
//! Neighbor order within a row:
//! - distance and table based rows list neighbors in enumeration order
//!   (table rows keep file order)
//! - k-nearest rows list neighbors by ascending distance, ties broken by
//!   enumeration order
//! - contiguity rows keep adjacency record order

use std::collections::HashMap;

use geoweights_core::config::NeighborConfig;
use geoweights_core::diagnostics::{id_sample, Diagnostic, Diagnostics};
use geoweights_core::error::{invalid_parameter, Error, Result};
use geoweights_core::feature::FeatureCollection;
use geoweights_core::io::{ContiguityTable, WeightTable};
use geoweights_core::weights::{
    Conceptualization, ContiguityKind, DistanceMethod, NeighborAccounting, NeighborRow,
    NeighborSummary, TimeWindow,
};

use super::kernel::Kernel;
use super::threshold::{resolve_threshold, ResolvedThreshold};
use crate::spatial::{delaunay_neighbors, KdTree};

/// Parameters for building neighbor rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildParams {
    /// Distance metric for searches (default: Euclidean)
    pub distance_method: DistanceMethod,
    /// Distances are chordal; a threshold set to the extent is not expanded
    pub use_chordal: bool,
    /// Warning, truncation and isolate policy
    pub neighbor_config: NeighborConfig,
    /// For polygon contiguity: give polygons without contiguous neighbors
    /// their k nearest features instead
    pub island_neighbors: Option<usize>,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            distance_method: DistanceMethod::Euclidean,
            use_chordal: false,
            neighbor_config: NeighborConfig::default(),
            island_neighbors: None,
        }
    }
}

/// Summary of a completed build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub summary: NeighborSummary,
    /// Threshold used by distance-based conceptualizations
    pub threshold: Option<f64>,
    pub max_set: bool,
    /// Polygons that received nearest neighbors in place of contiguity
    pub islands: Vec<i32>,
    pub diagnostics: Diagnostics,
}

pub struct NeighborTopologyBuilder<'a> {
    features: &'a FeatureCollection,
    concept: Conceptualization,
    params: BuildParams,
    contiguity: Option<&'a ContiguityTable>,
    table: Option<&'a WeightTable>,
}

impl<'a> NeighborTopologyBuilder<'a> {
    pub fn new(
        features: &'a FeatureCollection,
        concept: Conceptualization,
        params: BuildParams,
    ) -> Self {
        Self {
            features,
            concept,
            params,
            contiguity: None,
            table: None,
        }
    }

    /// Adjacency source for polygon contiguity.
    pub fn with_contiguity(mut self, table: &'a ContiguityTable) -> Self {
        self.contiguity = Some(table);
        self
    }

    /// Weights source for the external table conceptualization.
    pub fn with_weight_table(mut self, table: &'a WeightTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn features(&self) -> &'a FeatureCollection {
        self.features
    }

    pub fn conceptualization(&self) -> &Conceptualization {
        &self.concept
    }

    pub fn params(&self) -> &BuildParams {
        &self.params
    }

    /// Validate inputs and prepare the search structures.
    pub fn build(self) -> Result<NeighborRows> {
        let features = self.features;
        let n = features.len();
        let order = features.id_to_order()?;
        if n < 2 {
            return Err(invalid_parameter(
                "features",
                n,
                "at least 2 features are required",
            ));
        }
        for f in features.iter() {
            if !f.x().is_finite() || !f.y().is_finite() {
                return Err(invalid_parameter(
                    "location",
                    f.id,
                    "coordinates must be finite",
                ));
            }
        }

        let ids = features.ids();
        let points: Vec<(f64, f64)> = features.iter().map(|f| (f.x(), f.y())).collect();
        let tree = KdTree::build(&points, self.params.distance_method);
        let mut diagnostics = Diagnostics::new();

        let resolved = resolve_threshold(&self.concept, &tree, self.params.use_chordal)?;
        if let Some(r) = &resolved {
            diagnostics.extend(r.diagnostics.iter().cloned());
        }
        let threshold = resolved.as_ref().map(|r| r.value);

        let plan = match self.concept {
            Conceptualization::InverseDistance { .. } | Conceptualization::FixedDistance { .. } => {
                let threshold = threshold.unwrap_or(0.0);
                Plan::Radius {
                    tree,
                    threshold,
                    kernel: Kernel::for_conceptualization(&self.concept, threshold),
                }
            }
            Conceptualization::ZoneOfIndifference { .. } => {
                let threshold = threshold.unwrap_or(0.0);
                Plan::AllPairs {
                    tree,
                    kernel: Kernel::for_conceptualization(&self.concept, threshold),
                }
            }
            Conceptualization::KNearest { k } => {
                if k == 0 || k >= n {
                    return Err(invalid_parameter(
                        "k",
                        k,
                        format!("must be between 1 and {}", n - 1),
                    ));
                }
                Plan::KNearest { tree, k }
            }
            Conceptualization::Delaunay => Plan::Lists {
                lists: delaunay_neighbors(&points),
            },
            Conceptualization::PolygonContiguity(kind) => {
                let table = self.contiguity.ok_or_else(|| {
                    invalid_parameter("contiguity", "none", "an adjacency table is required")
                })?;
                if let Some(k) = self.params.island_neighbors {
                    if k == 0 || k >= n {
                        return Err(invalid_parameter(
                            "island_neighbors",
                            k,
                            format!("must be between 1 and {}", n - 1),
                        ));
                    }
                }
                Plan::Contiguity {
                    lists: contiguity_lists(table, kind, &order),
                    islands: self.params.island_neighbors.map(|k| (tree, k)),
                }
            }
            Conceptualization::SpaceTimeWindow { window, .. } => {
                window.validate()?;
                let times = features
                    .iter()
                    .map(|f| f.time.ok_or(Error::MissingTimestamp { id: f.id }))
                    .collect::<Result<Vec<_>>>()?;
                Plan::SpaceTime {
                    tree,
                    threshold: threshold.unwrap_or(0.0),
                    window,
                    times,
                }
            }
            Conceptualization::ExternalTable => {
                let table = self.table.ok_or_else(|| {
                    invalid_parameter("weights_table", "none", "a weights table is required")
                })?;
                let (rows, dropped) = table_rows(table, &order)?;
                if dropped > 0 {
                    diagnostics.push(Diagnostic::UnknownIdsDropped { count: dropped });
                }
                diagnostics.extend(table.diagnostics());
                Plan::Table { rows }
            }
        };

        tracing::debug!(
            "building {} rows for {}",
            n,
            self.concept.weight_type().name()
        );

        Ok(NeighborRows {
            ids,
            plan,
            next: 0,
            accounting: NeighborAccounting::new(self.params.neighbor_config),
            report_sample: self.params.neighbor_config.report_sample,
            resolved,
            islands: Vec::new(),
            diagnostics,
        })
    }
}

/// Contiguity lists keyed by enumeration order, unknown ids dropped.
fn contiguity_lists(
    table: &ContiguityTable,
    kind: ContiguityKind,
    order: &HashMap<i32, usize>,
) -> HashMap<usize, Vec<usize>> {
    table
        .neighbor_lists(kind)
        .into_iter()
        .filter_map(|(id, list)| {
            let i = *order.get(&id)?;
            let list = list.iter().filter_map(|nid| order.get(nid).copied()).collect();
            Some((i, list))
        })
        .collect()
}

/// Table rows keyed by enumeration order, plus the count of dropped links.
fn table_rows(
    table: &WeightTable,
    order: &HashMap<i32, usize>,
) -> Result<(HashMap<usize, NeighborRow>, usize)> {
    let mut rows = HashMap::new();
    let mut dropped = 0;
    for &id in table.source_ids() {
        let Some(source) = table.row(id) else {
            continue;
        };
        let Some(&i) = order.get(&id) else {
            dropped += source.len();
            continue;
        };
        let mut row = NeighborRow::with_capacity(id, source.len());
        for (nid, w) in source.pairs() {
            if order.contains_key(&nid) {
                row.push(nid, w);
            } else {
                dropped += 1;
            }
        }
        row.check_unique()?;
        rows.insert(i, row);
    }
    Ok((rows, dropped))
}

enum Plan {
    Radius {
        tree: KdTree,
        threshold: f64,
        kernel: Kernel,
    },
    AllPairs {
        tree: KdTree,
        kernel: Kernel,
    },
    KNearest {
        tree: KdTree,
        k: usize,
    },
    Lists {
        lists: Vec<Vec<usize>>,
    },
    Contiguity {
        lists: HashMap<usize, Vec<usize>>,
        islands: Option<(KdTree, usize)>,
    },
    SpaceTime {
        tree: KdTree,
        threshold: f64,
        window: TimeWindow,
        times: Vec<chrono::NaiveDateTime>,
    },
    Table {
        rows: HashMap<usize, NeighborRow>,
    },
}

fn k_nearest_row(id: i32, i: usize, tree: &KdTree, k: usize, ids: &[i32]) -> NeighborRow {
    let (x, y) = tree.point(i);
    let neighbors = tree
        .k_nearest(x, y, k, Some(i))
        .into_iter()
        .map(|n| ids[n.index])
        .collect();
    NeighborRow::uniform(id, neighbors, 1.0)
}

/// Lazily computed neighbor rows in enumeration order.
pub struct NeighborRows {
    ids: Vec<i32>,
    plan: Plan,
    next: usize,
    accounting: NeighborAccounting,
    report_sample: usize,
    resolved: Option<ResolvedThreshold>,
    islands: Vec<i32>,
    diagnostics: Diagnostics,
}

impl NeighborRows {
    pub fn num_features(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[i32] {
        &self.ids
    }

    /// Threshold used by distance-based conceptualizations.
    pub fn threshold(&self) -> Option<f64> {
        self.resolved.as_ref().map(|r| r.value)
    }

    fn raw_row(&mut self, i: usize) -> NeighborRow {
        let id = self.ids[i];
        let ids = &self.ids;
        match &mut self.plan {
            Plan::Radius {
                tree,
                threshold,
                kernel,
            } => {
                let (x, y) = tree.point(i);
                NeighborRow::from_pairs(
                    id,
                    tree.within_radius(x, y, *threshold, Some(i))
                        .into_iter()
                        .map(|n| (ids[n.index], kernel.weight(n.distance))),
                )
            }
            Plan::AllPairs { tree, kernel } => NeighborRow::from_pairs(
                id,
                (0..ids.len())
                    .filter(|&j| j != i)
                    .map(|j| (ids[j], kernel.weight(tree.distance_between(i, j)))),
            ),
            Plan::KNearest { tree, k } => k_nearest_row(id, i, tree, *k, ids),
            Plan::Lists { lists } => {
                NeighborRow::uniform(id, lists[i].iter().map(|&j| ids[j]).collect(), 1.0)
            }
            Plan::Contiguity { lists, islands } => {
                let neighbors: Vec<i32> = lists
                    .get(&i)
                    .map(|l| l.iter().map(|&j| ids[j]).collect())
                    .unwrap_or_default();
                if neighbors.is_empty() {
                    if let Some((tree, k)) = islands {
                        self.islands.push(id);
                        return k_nearest_row(id, i, tree, *k, ids);
                    }
                }
                NeighborRow::uniform(id, neighbors, 1.0)
            }
            Plan::SpaceTime {
                tree,
                threshold,
                window,
                times,
            } => {
                let (x, y) = tree.point(i);
                let t = times[i];
                let neighbors = tree
                    .within_radius(x, y, *threshold, Some(i))
                    .into_iter()
                    .filter(|n| window.contains(t, times[n.index]))
                    .map(|n| ids[n.index])
                    .collect();
                NeighborRow::uniform(id, neighbors, 1.0)
            }
            Plan::Table { rows } => rows.remove(&i).unwrap_or_else(|| NeighborRow::new(id)),
        }
    }

    /// Drain any remaining rows and close the accounting.
    ///
    /// Fails with `AllFeaturesIsolated` when no feature has a neighbor and
    /// the neighbor configuration requires it.
    pub fn finish(mut self) -> Result<BuildReport> {
        for _ in self.by_ref() {}

        let summary = self.accounting.finish()?;
        let mut diagnostics = self.diagnostics;
        diagnostics.append(summary.diagnostics.clone());
        if !self.islands.is_empty() {
            if let Plan::Contiguity {
                islands: Some((_, k)),
                ..
            } = &self.plan
            {
                diagnostics.push(Diagnostic::IslandsAssigned {
                    k: *k,
                    count: self.islands.len(),
                    sample: id_sample(&self.islands, self.report_sample),
                });
            }
        }
        let (threshold, max_set) = match &self.resolved {
            Some(r) => (Some(r.value), r.max_set),
            None => (None, false),
        };
        Ok(BuildReport {
            summary,
            threshold,
            max_set,
            islands: self.islands,
            diagnostics,
        })
    }
}

impl Iterator for NeighborRows {
    type Item = NeighborRow;

    fn next(&mut self) -> Option<NeighborRow> {
        if self.next >= self.ids.len() {
            return None;
        }
        let i = self.next;
        self.next += 1;
        let raw = self.raw_row(i);
        let (row, first) = self.accounting.track_row(raw);
        for d in first {
            tracing::debug!("{}", d);
            self.diagnostics.push(d);
        }
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.ids.len() - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for NeighborRows {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use geoweights_core::feature::Feature;
    use geoweights_core::io::ContiguityRecord;
    use geoweights_core::weights::TimeUnit;

    fn line(n: usize) -> FeatureCollection {
        let coords: Vec<(f64, f64)> = (0..n).map(|i| (i as f64, 0.0)).collect();
        FeatureCollection::from_xy(&coords)
    }

    fn collect(builder: NeighborTopologyBuilder<'_>) -> (Vec<NeighborRow>, BuildReport) {
        let mut rows = builder.build().unwrap();
        let collected: Vec<NeighborRow> = rows.by_ref().collect();
        (collected, rows.finish().unwrap())
    }

    #[test]
    fn test_fixed_distance_line() {
        let fc = line(5);
        let concept = Conceptualization::FixedDistance {
            threshold: Some(1.5),
        };
        let (rows, report) = collect(NeighborTopologyBuilder::new(
            &fc,
            concept,
            BuildParams::default(),
        ));
        let degrees: Vec<usize> = rows.iter().map(NeighborRow::len).collect();
        assert_eq!(degrees, vec![1, 2, 2, 2, 1]);
        assert_eq!(rows[2].neighbors, vec![1, 3]);
        assert!(rows.iter().all(|r| r.weights.iter().all(|&w| w == 1.0)));
        assert_eq!(report.summary.non_zero_links(), 8);
        assert_eq!(report.threshold, Some(1.5));
        assert!(!report.max_set);
        assert!(report.summary.isolated.is_empty());
    }

    #[test]
    fn test_default_threshold_connects_everyone() {
        let coords = [(0.0, 0.0), (1.0, 0.0), (5.0, 0.0), (5.5, 0.0)];
        let fc = FeatureCollection::from_xy(&coords);
        let concept = Conceptualization::FixedDistance { threshold: None };
        let (rows, report) = collect(NeighborTopologyBuilder::new(
            &fc,
            concept,
            BuildParams::default(),
        ));
        assert!(rows.iter().all(|r| !r.is_empty()));
        assert!(report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::DefaultThreshold { .. })));
    }

    #[test]
    fn test_inverse_distance_weights() {
        let fc = line(4);
        let concept = Conceptualization::InverseDistance {
            exponent: 1.0,
            threshold: Some(2.5),
        };
        let (rows, _) = collect(NeighborTopologyBuilder::new(
            &fc,
            concept,
            BuildParams::default(),
        ));
        assert_eq!(rows[0].neighbors, vec![1, 2]);
        assert_eq!(rows[0].weights[0], 1.0);
        assert!((rows[0].weights[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zone_of_indifference_links_everything() {
        let fc = line(4);
        let concept = Conceptualization::ZoneOfIndifference {
            threshold: Some(1.0),
        };
        let (rows, _) = collect(NeighborTopologyBuilder::new(
            &fc,
            concept,
            BuildParams::default(),
        ));
        assert_eq!(rows[0].neighbors, vec![1, 2, 3]);
        assert_eq!(rows[0].weights[0], 1.0);
        assert!((rows[0].weights[1] - 0.5).abs() < 1e-12);
        assert!((rows[0].weights[2] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_k_nearest_order_and_ties() {
        let fc = line(5);
        let (rows, report) = collect(NeighborTopologyBuilder::new(
            &fc,
            Conceptualization::KNearest { k: 2 },
            BuildParams::default(),
        ));
        assert_eq!(rows[0].neighbors, vec![1, 2]);
        assert_eq!(rows[2].neighbors, vec![1, 3]);
        assert_eq!(rows[4].neighbors, vec![3, 2]);
        assert_eq!(report.threshold, None);
    }

    #[test]
    fn test_k_out_of_range() {
        let fc = line(3);
        for k in [0, 3, 10] {
            let err = NeighborTopologyBuilder::new(
                &fc,
                Conceptualization::KNearest { k },
                BuildParams::default(),
            )
            .build()
            .err();
            assert!(matches!(err, Some(Error::InvalidParameter { name: "k", .. })));
        }
    }

    #[test]
    fn test_input_validation() {
        let dup = FeatureCollection::from_features(vec![
            Feature::new(7, 0.0, 0.0),
            Feature::new(7, 1.0, 0.0),
        ]);
        let concept = Conceptualization::KNearest { k: 1 };
        assert!(matches!(
            NeighborTopologyBuilder::new(&dup, concept, BuildParams::default())
                .build()
                .err(),
            Some(Error::DuplicateId(7))
        ));

        let single = line(1);
        assert!(NeighborTopologyBuilder::new(&single, concept, BuildParams::default())
            .build()
            .is_err());

        let bad = FeatureCollection::from_xy(&[(0.0, 0.0), (f64::NAN, 1.0)]);
        assert!(NeighborTopologyBuilder::new(&bad, concept, BuildParams::default())
            .build()
            .is_err());
    }

    #[test]
    fn test_all_isolated() {
        let coords = [(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)];
        let fc = FeatureCollection::from_xy(&coords);
        let concept = Conceptualization::FixedDistance {
            threshold: Some(1.0),
        };
        let rows = NeighborTopologyBuilder::new(&fc, concept, BuildParams::default())
            .build()
            .unwrap();
        assert!(matches!(rows.finish(), Err(Error::AllFeaturesIsolated(3))));

        let mut params = BuildParams::default();
        params.neighbor_config.fail_all_isolated = false;
        let (_, report) = collect(NeighborTopologyBuilder::new(&fc, concept, params));
        assert!(report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::AllIsolated { num_features: 3 })));
    }

    #[test]
    fn test_max_neighbors_truncates() {
        let fc = line(5);
        let mut params = BuildParams::default();
        params.neighbor_config.max_threshold = Some(1);
        let concept = Conceptualization::FixedDistance {
            threshold: Some(1.5),
        };
        let (rows, report) = collect(NeighborTopologyBuilder::new(&fc, concept, params));
        assert!(rows.iter().all(|r| r.len() == 1));
        assert_eq!(rows[2].neighbors, vec![1]);
        assert_eq!(report.summary.truncated, vec![1, 2, 3]);
    }

    fn contiguity() -> ContiguityTable {
        ContiguityTable::new(vec![
            ContiguityRecord::new(0, 1, 1.0, 0.0),
            ContiguityRecord::new(1, 2, 0.0, 0.0),
        ])
    }

    #[test]
    fn test_polygon_contiguity() {
        let fc = FeatureCollection::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 1.0), (10.0, 0.0)]);
        let table = contiguity();

        let queen = Conceptualization::PolygonContiguity(ContiguityKind::Queen);
        let (rows, report) = collect(
            NeighborTopologyBuilder::new(&fc, queen, BuildParams::default())
                .with_contiguity(&table),
        );
        assert_eq!(rows[1].neighbors, vec![0, 2]);
        assert_eq!(report.summary.isolated, vec![3]);

        let rook = Conceptualization::PolygonContiguity(ContiguityKind::Rook);
        let (rows, report) = collect(
            NeighborTopologyBuilder::new(&fc, rook, BuildParams::default())
                .with_contiguity(&table),
        );
        assert_eq!(rows[1].neighbors, vec![0]);
        assert_eq!(report.summary.isolated, vec![2, 3]);
    }

    #[test]
    fn test_contiguity_islands_get_nearest() {
        let fc = FeatureCollection::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 1.0), (10.0, 0.0)]);
        let table = contiguity();
        let params = BuildParams {
            island_neighbors: Some(1),
            ..Default::default()
        };
        let queen = Conceptualization::PolygonContiguity(ContiguityKind::Queen);
        let (rows, report) =
            collect(NeighborTopologyBuilder::new(&fc, queen, params).with_contiguity(&table));
        assert_eq!(rows[3].neighbors, vec![2]);
        assert_eq!(report.islands, vec![3]);
        assert!(report.summary.isolated.is_empty());
        assert!(report.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::IslandsAssigned { k: 1, count: 1, .. }
        )));
    }

    #[test]
    fn test_contiguity_requires_table() {
        let fc = line(3);
        let queen = Conceptualization::PolygonContiguity(ContiguityKind::Queen);
        assert!(NeighborTopologyBuilder::new(&fc, queen, BuildParams::default())
            .build()
            .is_err());
    }

    fn day(d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_space_time_window() {
        let fc = FeatureCollection::from_features(vec![
            Feature::new(0, 0.0, 0.0).with_time(day(1)),
            Feature::new(1, 1.0, 0.0).with_time(day(3)),
            Feature::new(2, 2.0, 0.0).with_time(day(20)),
        ]);
        let concept = Conceptualization::SpaceTimeWindow {
            threshold: Some(1.5),
            window: TimeWindow::new(3, TimeUnit::Days),
        };
        let (rows, report) = collect(NeighborTopologyBuilder::new(
            &fc,
            concept,
            BuildParams::default(),
        ));
        assert_eq!(rows[0].neighbors, vec![1]);
        assert_eq!(rows[1].neighbors, vec![0]);
        assert!(rows[2].is_empty());
        assert_eq!(report.summary.isolated, vec![2]);
    }

    #[test]
    fn test_space_time_missing_timestamp() {
        let fc = FeatureCollection::from_features(vec![
            Feature::new(0, 0.0, 0.0).with_time(day(1)),
            Feature::new(1, 1.0, 0.0),
        ]);
        let concept = Conceptualization::SpaceTimeWindow {
            threshold: Some(1.5),
            window: TimeWindow::new(1, TimeUnit::Days),
        };
        assert!(matches!(
            NeighborTopologyBuilder::new(&fc, concept, BuildParams::default())
                .build()
                .err(),
            Some(Error::MissingTimestamp { id: 1 })
        ));
    }

    #[test]
    fn test_external_table() {
        let fc = line(3);
        let text = "ID\n0 1 1.0\n0 9 2.0\n1 0 0.5\n1 2 -1.0\n";
        let table = WeightTable::from_reader(text.as_bytes()).unwrap();
        let (rows, report) = collect(
            NeighborTopologyBuilder::new(&fc, Conceptualization::ExternalTable, BuildParams::default())
                .with_weight_table(&table),
        );
        assert_eq!(rows[0].neighbors, vec![1]);
        assert_eq!(rows[1].weights, vec![0.5]);
        assert!(rows[2].is_empty());
        assert!(report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnknownIdsDropped { count: 1 })));
        assert!(report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::NegativeWeightsDropped { count: 1 })));
    }

    #[test]
    fn test_external_table_duplicate_neighbor() {
        let fc = line(3);
        let table = WeightTable::from_reader("ID\n0 1 1.0\n0 1 2.0\n".as_bytes()).unwrap();
        let err = NeighborTopologyBuilder::new(&fc, Conceptualization::ExternalTable, BuildParams::default())
            .with_weight_table(&table)
            .build()
            .err();
        assert!(matches!(
            err,
            Some(Error::DuplicateNeighbor { id: 0, neighbor: 1 })
        ));
    }
}
