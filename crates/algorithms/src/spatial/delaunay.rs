//! Delaunay natural neighbors
//!
//! Incremental Bowyer-Watson triangulation reduced to its edge set. Hull
//! edges are closed by ghost triangles around a vertex at infinity, and the
//! orientation and in-circle tests are exact, so no edge depends on how far
//! a bounding triangle sits from the data.
//! Coincident points are triangulated once and share their location's
//! neighbors; fully collinear input degenerates to a path along the line.

use std::collections::{BTreeSet, HashMap, HashSet};

use robust::{incircle, orient2d, Coord};

/// The vertex at infinity closing every hull edge.
const GHOST: usize = usize::MAX;

fn coord(p: (f64, f64)) -> Coord<f64> {
    Coord { x: p.0, y: p.1 }
}

/// Positive when (a, b, c) turn counter-clockwise, exact in sign.
fn orient(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    orient2d(coord(a), coord(b), coord(c))
}

/// Positive when `d` lies inside the circle through counter-clockwise a, b, c.
fn in_circle(a: (f64, f64), b: (f64, f64), c: (f64, f64), d: (f64, f64)) -> f64 {
    incircle(coord(a), coord(b), coord(c), coord(d))
}

/// Whether `p`, collinear with a and b, lies strictly between them.
fn between(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let along = (p.0 - a.0) * (b.0 - a.0) + (p.1 - a.1) * (b.1 - a.1);
    let back = (p.0 - b.0) * (a.0 - b.0) + (p.1 - b.1) * (a.1 - b.1);
    along > 0.0 && back > 0.0
}

fn edges(t: [usize; 3]) -> [(usize, usize); 3] {
    [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])]
}

/// Counter-clockwise triangles keyed by their directed edges. A hull edge
/// (b, a) is closed by the ghost triangle [a, b, GHOST], whose outside lies
/// to the left of a -> b.
struct Mesh<'a> {
    points: &'a [(f64, f64)],
    triangles: Vec<Option<[usize; 3]>>,
    free: Vec<usize>,
    by_edge: HashMap<(usize, usize), usize>,
    last: usize,
}

impl<'a> Mesh<'a> {
    fn new(points: &'a [(f64, f64)]) -> Self {
        Self {
            points,
            triangles: Vec::new(),
            free: Vec::new(),
            by_edge: HashMap::new(),
            last: 0,
        }
    }

    fn add(&mut self, t: [usize; 3]) {
        let slot = match self.free.pop() {
            Some(slot) => {
                self.triangles[slot] = Some(t);
                slot
            }
            None => {
                self.triangles.push(Some(t));
                self.triangles.len() - 1
            }
        };
        for edge in edges(t) {
            self.by_edge.insert(edge, slot);
        }
        self.last = slot;
    }

    fn remove(&mut self, slot: usize) {
        if let Some(t) = self.triangles[slot].take() {
            for edge in edges(t) {
                self.by_edge.remove(&edge);
            }
            self.free.push(slot);
        }
    }

    fn across(&self, a: usize, b: usize) -> Option<usize> {
        self.by_edge.get(&(b, a)).copied()
    }

    /// Whether `p` falls in the circumcircle of `t`. For a ghost that is
    /// the open outer half-plane of its hull edge plus the open edge itself.
    fn conflicts(&self, t: [usize; 3], p: (f64, f64)) -> bool {
        let v = self.points;
        if t[2] == GHOST {
            let (a, b) = (v[t[0]], v[t[1]]);
            let side = orient(a, b, p);
            side > 0.0 || (side == 0.0 && between(a, b, p))
        } else {
            in_circle(v[t[0]], v[t[1]], v[t[2]], p) > 0.0
        }
    }

    /// Whether `p` is inside or on a real triangle, or sees a ghost's edge.
    fn holds(&self, t: [usize; 3], p: (f64, f64)) -> bool {
        if t[2] == GHOST {
            return self.conflicts(t, p);
        }
        let v = self.points;
        edges(t).iter().all(|&(a, b)| orient(v[a], v[b], p) >= 0.0)
    }

    /// Walk from the newest triangle towards `p`; scan if the walk stalls.
    fn locate(&self, p: (f64, f64)) -> Option<usize> {
        let v = self.points;
        let mut current = self.last;
        for _ in 0..self.triangles.len() {
            let Some(t) = self.triangles[current] else {
                break;
            };
            if t[2] == GHOST {
                if self.conflicts(t, p) {
                    return Some(current);
                }
                match self.across(t[0], t[1]) {
                    Some(next) => current = next,
                    None => break,
                }
                continue;
            }
            let step = edges(t)
                .into_iter()
                .find(|&(a, b)| orient(v[a], v[b], p) < 0.0)
                .and_then(|(a, b)| self.across(a, b));
            match step {
                Some(next) => current = next,
                None => return Some(current),
            }
        }
        self.triangles
            .iter()
            .position(|t| t.map_or(false, |t| self.holds(t, p)))
    }

    fn insert(&mut self, vi: usize) {
        let p = self.points[vi];
        let Some(start) = self.locate(p) else {
            return;
        };

        // Cavity: triangles in conflict with p, grown through shared edges
        let mut cavity = vec![start];
        let mut in_cavity: HashSet<usize> = HashSet::from([start]);
        let mut stack = vec![start];
        while let Some(slot) = stack.pop() {
            let Some(t) = self.triangles[slot] else {
                continue;
            };
            for (a, b) in edges(t) {
                let Some(next) = self.across(a, b) else {
                    continue;
                };
                if in_cavity.contains(&next) {
                    continue;
                }
                if let Some(other) = self.triangles[next] {
                    if self.conflicts(other, p) {
                        in_cavity.insert(next);
                        cavity.push(next);
                        stack.push(next);
                    }
                }
            }
        }

        let mut boundary = Vec::new();
        for &slot in &cavity {
            let Some(t) = self.triangles[slot] else {
                continue;
            };
            for (a, b) in edges(t) {
                let outside = self
                    .across(a, b)
                    .map_or(true, |next| !in_cavity.contains(&next));
                if outside {
                    boundary.push((a, b));
                }
            }
        }
        for slot in cavity {
            self.remove(slot);
        }
        for (a, b) in boundary {
            let t = if a == GHOST {
                [b, vi, GHOST]
            } else if b == GHOST {
                [vi, a, GHOST]
            } else {
                [a, b, vi]
            };
            self.add(t);
        }
    }

    fn into_real(self) -> Vec<[usize; 3]> {
        self.triangles
            .into_iter()
            .flatten()
            .filter(|t| t[2] != GHOST)
            .collect()
    }
}

/// `points` mapped onto the unit square, or `None` when they share one
/// location.
fn unit_square(points: &[(f64, f64)]) -> Option<Vec<(f64, f64)>> {
    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for &(x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let extent = (max_x - min_x).max(max_y - min_y);
    if extent <= 0.0 {
        return None;
    }
    Some(
        points
            .iter()
            .map(|&(x, y)| ((x - min_x) / extent, (y - min_y) / extent))
            .collect(),
    )
}

/// Triangles over distinct points, indices into `points`.
///
/// Coordinates are mapped onto the unit square first so projected and
/// geographic input are conditioned alike.
fn triangulate(points: &[(f64, f64)]) -> Vec<[usize; 3]> {
    if points.len() < 3 {
        return Vec::new();
    }
    let Some(unit) = unit_square(points) else {
        return Vec::new();
    };

    // Seed triangle: first point, the farthest from it, the widest third
    let a = 0;
    let dist = |i: usize| {
        let (dx, dy) = (unit[i].0 - unit[a].0, unit[i].1 - unit[a].1);
        dx * dx + dy * dy
    };
    let b = (1..unit.len()).fold(1, |best, i| if dist(i) > dist(best) { i } else { best });
    let area = |i: usize| orient(unit[a], unit[b], unit[i]).abs();
    let c = (0..unit.len())
        .filter(|&i| i != a && i != b)
        .fold(None, |best: Option<usize>, i| match best {
            Some(j) if area(j) >= area(i) => Some(j),
            _ => Some(i),
        });
    let Some(c) = c else {
        return Vec::new();
    };
    let side = orient(unit[a], unit[b], unit[c]);
    if side == 0.0 {
        return Vec::new();
    }
    let (b, c) = if side > 0.0 { (b, c) } else { (c, b) };

    let mut mesh = Mesh::new(&unit);
    mesh.add([a, b, c]);
    mesh.add([b, a, GHOST]);
    mesh.add([c, b, GHOST]);
    mesh.add([a, c, GHOST]);
    for vi in 0..unit.len() {
        if vi != a && vi != b && vi != c {
            mesh.insert(vi);
        }
    }
    mesh.into_real()
}

/// Whether every point lies on the line through the extreme locations.
fn is_collinear(points: &[(f64, f64)]) -> bool {
    if points.len() < 3 {
        return true;
    }
    let (x0, y0) = points[0];
    let (x1, y1) = points[points.len() - 1];
    let (ux, uy) = (x1 - x0, y1 - y0);
    let scale = ux.abs().max(uy.abs()).max(f64::MIN_POSITIVE);
    points.iter().all(|&(x, y)| {
        let cross = ux * (y - y0) - uy * (x - x0);
        cross.abs() <= 1e-9 * scale * scale
    })
}

/// Natural-neighbor lists for every input point, each sorted by input
/// position.
pub fn delaunay_neighbors(points: &[(f64, f64)]) -> Vec<Vec<usize>> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }

    // Group coincident points; `order` is lexicographic by (x, y)
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        points[a]
            .0
            .total_cmp(&points[b].0)
            .then(points[a].1.total_cmp(&points[b].1))
    });
    let mut locations: Vec<(f64, f64)> = Vec::new();
    let mut members: Vec<Vec<usize>> = Vec::new();
    let mut location_of = vec![0usize; n];
    for &i in &order {
        if locations.last() != Some(&points[i]) {
            locations.push(points[i]);
            members.push(Vec::new());
        }
        let loc = locations.len() - 1;
        members[loc].push(i);
        location_of[i] = loc;
    }

    let mut adjacent: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); locations.len()];
    let triangles = if is_collinear(&locations) {
        Vec::new()
    } else {
        triangulate(&locations)
    };
    if triangles.is_empty() {
        // Lexicographic order runs along the line
        for loc in 1..locations.len() {
            adjacent[loc - 1].insert(loc);
            adjacent[loc].insert(loc - 1);
        }
    } else {
        for &tri in &triangles {
            for (a, b) in edges(tri) {
                adjacent[a].insert(b);
                adjacent[b].insert(a);
            }
        }
    }

    (0..n)
        .map(|i| {
            let loc = location_of[i];
            let mut list: Vec<usize> = members[loc].iter().copied().filter(|&j| j != i).collect();
            for &other in &adjacent[loc] {
                list.extend_from_slice(&members[other]);
            }
            list.sort_unstable();
            list
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        let nb = delaunay_neighbors(&pts);
        // Each corner touches both adjacent corners; one diagonal is present
        for (i, list) in nb.iter().enumerate() {
            assert!(list.len() >= 2, "point {} has {:?}", i, list);
            assert!(!list.contains(&i));
        }
        let diagonals = nb[0].contains(&3) as usize + nb[1].contains(&2) as usize;
        assert_eq!(diagonals, 1);
    }

    #[test]
    fn test_symmetric() {
        let pts: Vec<(f64, f64)> = (0..40)
            .map(|i| (((i * 37) % 17) as f64 + 0.1 * i as f64, ((i * 13) % 11) as f64))
            .collect();
        let nb = delaunay_neighbors(&pts);
        for (i, list) in nb.iter().enumerate() {
            assert!(!list.is_empty());
            for &j in list {
                assert!(nb[j].contains(&i), "{} -> {} not mirrored", i, j);
            }
        }
    }

    /// Deterministic point cloud in [0, 1) squared.
    fn cloud(seed: u64, n: usize) -> Vec<(f64, f64)> {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        (0..n).map(|_| (next(), next())).collect()
    }

    /// Edges of every triangle whose circumcircle holds no other point.
    fn empty_circle_edges(points: &[(f64, f64)]) -> BTreeSet<(usize, usize)> {
        let (ox, oy) = points[0];
        let local: Vec<(f64, f64)> = points.iter().map(|&(x, y)| (x - ox, y - oy)).collect();
        let n = local.len();
        let mut found = BTreeSet::new();
        for i in 0..n {
            for j in i + 1..n {
                for k in j + 1..n {
                    let side = orient(local[i], local[j], local[k]);
                    if side == 0.0 {
                        continue;
                    }
                    let (b, c) = if side > 0.0 { (j, k) } else { (k, j) };
                    let empty = (0..n).all(|m| {
                        m == i || m == j || m == k
                            || in_circle(local[i], local[b], local[c], local[m]) <= 0.0
                    });
                    if empty {
                        found.extend([(i, j), (i, k), (j, k)]);
                    }
                }
            }
        }
        found
    }

    fn edge_set(nb: &[Vec<usize>]) -> BTreeSet<(usize, usize)> {
        nb.iter()
            .enumerate()
            .flat_map(|(i, list)| list.iter().filter(move |&&j| i < j).map(move |&j| (i, j)))
            .collect()
    }

    #[test]
    fn test_matches_empty_circle_edges() {
        let scales = [(0.0, 0.0, 1.0), (500_000.0, 4_000_000.0, 1_000.0), (0.0, 0.0, 1e-3)];
        for (ox, oy, span) in scales {
            for seed in 1..=20 {
                let pts: Vec<(f64, f64)> = cloud(seed, 25)
                    .into_iter()
                    .map(|(x, y)| (ox + x * span, oy + y * span))
                    .collect();
                let got = edge_set(&delaunay_neighbors(&pts));
                let want = empty_circle_edges(&pts);
                assert_eq!(got, want, "span {} seed {}", span, seed);
            }
        }
    }

    #[test]
    fn test_near_collinear_triangles_are_proper() {
        let skewed: Vec<(f64, f64)> = (0..40)
            .map(|i| (((i * 37) % 17) as f64 + 0.1 * i as f64, ((i * 13) % 11) as f64))
            .collect();
        let mut lattice: Vec<(f64, f64)> = cloud(7, 200)
            .into_iter()
            .map(|(x, y)| ((x * 7.0).floor() * 0.3, (y * 7.0).floor() * 0.3))
            .collect();
        lattice.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        lattice.dedup();

        for pts in [skewed, lattice] {
            let unit = unit_square(&pts).unwrap();
            let triangles = triangulate(&pts);
            assert!(!triangles.is_empty());
            for t in triangles {
                assert!(orient(unit[t[0]], unit[t[1]], unit[t[2]]) > 0.0, "{:?}", t);
            }
        }
    }

    #[test]
    fn test_grid_has_one_diagonal_per_cell() {
        let mut pts = Vec::new();
        for row in 0..5 {
            for col in 0..5 {
                pts.push((300_000.0 + col as f64 * 250.0, 6_100_000.0 + row as f64 * 250.0));
            }
        }
        let edges = edge_set(&delaunay_neighbors(&pts));
        // 3n - 3 - h with all 16 border points on the hull
        assert_eq!(edges.len(), 56);
        for row in 0..5 {
            for col in 0..5 {
                let i = row * 5 + col;
                if col < 4 {
                    assert!(edges.contains(&(i, i + 1)));
                }
                if row < 4 {
                    assert!(edges.contains(&(i, i + 5)));
                }
                if row < 4 && col < 4 {
                    let diagonals = edges.contains(&(i, i + 6)) as usize
                        + edges.contains(&(i + 1, i + 5)) as usize;
                    assert_eq!(diagonals, 1, "cell at {}", i);
                }
            }
        }
    }

    #[test]
    fn test_collinear_is_a_path() {
        let pts = vec![(2.0, 0.0), (0.0, 0.0), (1.0, 0.0), (3.0, 0.0)];
        let nb = delaunay_neighbors(&pts);
        assert_eq!(nb[1], vec![2]);
        assert_eq!(nb[2], vec![0, 1]);
        assert_eq!(nb[0], vec![2, 3]);
        assert_eq!(nb[3], vec![0]);
    }

    #[test]
    fn test_coincident_points_share_neighbors() {
        let pts = vec![(0.0, 0.0), (0.0, 0.0), (5.0, 0.0)];
        let nb = delaunay_neighbors(&pts);
        assert_eq!(nb[0], vec![1, 2]);
        assert_eq!(nb[1], vec![0, 2]);
        assert_eq!(nb[2], vec![0, 1]);
    }
}
