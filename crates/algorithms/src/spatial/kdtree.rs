//! 2D k-d tree for neighbor searches
//!
//! Supports nearest, k-nearest and fixed-radius queries under either
//! Euclidean or Manhattan distance. The split-plane offset is a lower bound
//! on both metrics, so the same pruning rule serves both.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use std::cmp::Ordering;

use geoweights_core::weights::DistanceMethod;

/// A 2D k-d tree over points identified by their input position.
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<(f64, f64)>,
    method: DistanceMethod,
}

#[derive(Debug)]
struct KdNode {
    /// Index into `points`
    point_idx: usize,
    /// Split dimension: 0 = x, 1 = y
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

/// A point found by a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the point in the input slice
    pub index: usize,
    pub distance: f64,
}

/// Distance first, input position second.
fn rank(a: &(f64, usize), b: &(f64, usize)) -> Ordering {
    a.0.partial_cmp(&b.0)
        .unwrap_or(Ordering::Equal)
        .then(a.1.cmp(&b.1))
}

impl KdTree {
    /// Build a k-d tree.
    ///
    /// Construction is O(n log n) using median-of-coordinate splitting.
    pub fn build(points: &[(f64, f64)], method: DistanceMethod) -> Self {
        let points = points.to_vec();
        let mut nodes = Vec::with_capacity(points.len());
        if !points.is_empty() {
            let mut indices: Vec<usize> = (0..points.len()).collect();
            build_recursive(&points, &mut indices, 0, &mut nodes);
        }
        Self {
            nodes,
            points,
            method,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn method(&self) -> DistanceMethod {
        self.method
    }

    pub fn point(&self, index: usize) -> (f64, f64) {
        self.points[index]
    }

    /// Distance between two indexed points.
    pub fn distance_between(&self, a: usize, b: usize) -> f64 {
        let (ax, ay) = self.points[a];
        let (bx, by) = self.points[b];
        self.method.distance(ax - bx, ay - by)
    }

    /// Nearest point to (qx, qy), skipping `exclude`.
    pub fn nearest(&self, qx: f64, qy: f64, exclude: Option<usize>) -> Option<Neighbor> {
        self.k_nearest(qx, qy, 1, exclude).into_iter().next()
    }

    /// The k nearest points sorted by ascending distance. Equal distances are
    /// ordered by input position.
    pub fn k_nearest(&self, qx: f64, qy: f64, k: usize, exclude: Option<usize>) -> Vec<Neighbor> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }

        // Sorted descending: heap[0] is the current worst candidate
        let mut heap: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
        self.knn_recursive(0, qx, qy, k, exclude, &mut heap);

        heap.sort_by(rank);
        heap.into_iter()
            .map(|(distance, index)| Neighbor { index, distance })
            .collect()
    }

    /// All points within `radius` (inclusive), sorted by input position.
    pub fn within_radius(
        &self,
        qx: f64,
        qy: f64,
        radius: f64,
        exclude: Option<usize>,
    ) -> Vec<Neighbor> {
        if self.nodes.is_empty() || radius < 0.0 || radius.is_nan() {
            return Vec::new();
        }
        let mut results = Vec::new();
        self.radius_recursive(0, qx, qy, radius, exclude, &mut results);
        results.sort_by_key(|n| n.index);
        results
    }

    fn knn_recursive(
        &self,
        node_idx: usize,
        qx: f64,
        qy: f64,
        k: usize,
        exclude: Option<usize>,
        heap: &mut Vec<(f64, usize)>,
    ) {
        let node = &self.nodes[node_idx];
        let (px, py) = self.points[node.point_idx];
        let dx = qx - px;
        let dy = qy - py;

        if exclude != Some(node.point_idx) {
            let candidate = (self.method.distance(dx, dy), node.point_idx);
            let accept = heap.len() < k || rank(&candidate, &heap[0]) == Ordering::Less;
            if accept {
                if heap.len() >= k {
                    heap.remove(0);
                }
                let pos = heap
                    .binary_search_by(|held| rank(held, &candidate).reverse())
                    .unwrap_or_else(|e| e);
                heap.insert(pos, candidate);
            }
        }

        let diff = if node.split_dim == 0 { dx } else { dy };
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.knn_recursive(child, qx, qy, k, exclude, heap);
        }

        // `<=` keeps equal-distance candidates with a lower position reachable
        let bound = if heap.len() >= k { heap[0].0 } else { f64::INFINITY };
        if diff.abs() <= bound {
            if let Some(child) = second {
                self.knn_recursive(child, qx, qy, k, exclude, heap);
            }
        }
    }

    fn radius_recursive(
        &self,
        node_idx: usize,
        qx: f64,
        qy: f64,
        radius: f64,
        exclude: Option<usize>,
        results: &mut Vec<Neighbor>,
    ) {
        let node = &self.nodes[node_idx];
        let (px, py) = self.points[node.point_idx];
        let dx = qx - px;
        let dy = qy - py;

        if exclude != Some(node.point_idx) {
            let distance = self.method.distance(dx, dy);
            if distance <= radius {
                results.push(Neighbor {
                    index: node.point_idx,
                    distance,
                });
            }
        }

        let diff = if node.split_dim == 0 { dx } else { dy };
        if let Some(left) = node.left {
            if diff <= 0.0 || diff.abs() <= radius {
                self.radius_recursive(left, qx, qy, radius, exclude, results);
            }
        }
        if let Some(right) = node.right {
            if diff >= 0.0 || diff.abs() <= radius {
                self.radius_recursive(right, qx, qy, radius, exclude, results);
            }
        }
    }
}

fn build_recursive(
    points: &[(f64, f64)],
    indices: &mut [usize],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> usize {
    let n = indices.len();
    let split_dim = (depth % 2) as u8;
    let coord = |i: usize| if split_dim == 0 { points[i].0 } else { points[i].1 };

    indices.sort_by(|&a, &b| coord(a).partial_cmp(&coord(b)).unwrap_or(Ordering::Equal));

    let median = n / 2;
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    if median > 0 {
        let left = build_recursive(points, &mut indices[..median], depth + 1, nodes);
        nodes[node_idx].left = Some(left);
    }
    if median + 1 < n {
        let right = build_recursive(points, &mut indices[median + 1..], depth + 1, nodes);
        nodes[node_idx].right = Some(right);
    }

    node_idx
}
