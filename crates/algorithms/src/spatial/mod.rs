//! Spatial search structures used by the neighbor builders
//!
//! - **kdtree**: nearest, k-nearest and fixed-radius queries
//! - **delaunay**: natural neighbors from a Delaunay triangulation

pub mod delaunay;
pub mod kdtree;

pub use delaunay::delaunay_neighbors;
pub use kdtree::{KdTree, Neighbor};
