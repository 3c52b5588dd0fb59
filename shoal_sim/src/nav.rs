// Navigation grid: the sample points agents path across.
//
// The grid is a fixed, externally supplied list of terrain-free points plus
// an adjacency graph derived from it once at construction. A `GridIndex` is
// the point's position in the input list; the list order is the only
// identity a point has.
//
// Two points are neighbors iff their distance is at most
// `spacing * NEIGHBOR_DISTANCE_FACTOR` (1.8). On a regular lattice that
// captures all 26 cube neighbors (the body diagonal is √3 ≈ 1.732 spacings)
// and nothing two steps away. Neighbor discovery goes through a coarse hash
// of cell size `spacing * 2`, so each point only tests the 3×3×3 block of
// cells around it. Adjacency rows are built in parallel with rayon; each
// row is sorted ascending so iteration order is stable regardless of how
// points landed in hash buckets.
//
// `nearest_index` searches expanding shells of the same hash (radius 0..=3
// cells, outer layer only for radius > 0) and takes the closest point in
// the first shell that has any. If nothing is found within three cells it
// falls back to a uniformly random point, which is acceptable because grids
// are dense relative to agent step size.
//
// See also: `spatial.rs` for `CellKey`, `ai.rs` for path planning over the
// adjacency, `population.rs` for spawn-point selection.
//
// **Critical constraint: read-only after build.** Nothing mutates points or
// adjacency once `build` returns.

use crate::error::SimError;
use crate::spatial::CellKey;
use crate::types::GridIndex;
use glam::Vec3;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use shoal_prng::GameRng;
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Neighbor threshold in units of grid spacing.
pub const NEIGHBOR_DISTANCE_FACTOR: f32 = 1.8;

/// Coarse hash cell size in units of grid spacing.
pub const HASH_CELL_FACTOR: f32 = 2.0;

/// Largest shell radius `nearest_index` searches before falling back.
pub const MAX_NEAREST_SHELL: i32 = 3;

pub type NeighborList = SmallVec<[GridIndex; 26]>;

#[derive(Clone, Debug)]
pub struct NavGrid {
    points: Vec<Vec3>,
    spacing: f32,
    inv_cell_size: f32,
    adjacency: Vec<NeighborList>,
    cells: FxHashMap<CellKey, Vec<GridIndex>>,
}

impl NavGrid {
    /// Build the grid and its adjacency from sample points.
    ///
    /// An empty point list is allowed; every lookup on such a grid returns
    /// `None` or an empty slice.
    pub fn build(points: Vec<Vec3>, spacing: f32) -> Result<Self, SimError> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(SimError::InvalidSpacing(spacing));
        }
        let inv_cell_size = 1.0 / (spacing * HASH_CELL_FACTOR);

        let mut cells: FxHashMap<CellKey, Vec<GridIndex>> = FxHashMap::default();
        for (i, &p) in points.iter().enumerate() {
            cells
                .entry(CellKey::containing(p, inv_cell_size))
                .or_default()
                .push(GridIndex(i as u32));
        }

        let threshold = spacing * NEIGHBOR_DISTANCE_FACTOR;
        let threshold_sq = threshold * threshold;
        let adjacency: Vec<NeighborList> = points
            .par_iter()
            .enumerate()
            .map(|(i, &p)| {
                let center = CellKey::containing(p, inv_cell_size);
                let mut row = NeighborList::new();
                for dx in -1..=1 {
                    for dy in -1..=1 {
                        for dz in -1..=1 {
                            let Some(bucket) = cells.get(&center.offset(dx, dy, dz)) else {
                                continue;
                            };
                            for &j in bucket {
                                if j.index() == i {
                                    continue;
                                }
                                if points[j.index()].distance_squared(p) <= threshold_sq {
                                    row.push(j);
                                }
                            }
                        }
                    }
                }
                row.sort_unstable();
                row
            })
            .collect();

        Ok(Self {
            points,
            spacing,
            inv_cell_size,
            adjacency,
            cells,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Position of a grid point. Indices come from this grid, so an
    /// out-of-range index is a caller bug.
    pub fn point(&self, index: GridIndex) -> Vec3 {
        self.points[index.index()]
    }

    pub fn get_point(&self, index: GridIndex) -> Option<Vec3> {
        self.points.get(index.index()).copied()
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Neighbors of a point in ascending index order. Empty for an unknown
    /// index.
    pub fn neighbors(&self, index: GridIndex) -> &[GridIndex] {
        self.adjacency
            .get(index.index())
            .map_or(&[], |row| row.as_slice())
    }

    /// Uniformly random grid point, or `None` for an empty grid.
    pub fn random_index(&self, rng: &mut GameRng) -> Option<GridIndex> {
        if self.points.is_empty() {
            return None;
        }
        Some(GridIndex(rng.range_usize(0, self.points.len()) as u32))
    }

    /// Nearest grid point to `position`, falling back to a random point if
    /// the shell search finds nothing. `None` only for an empty grid.
    pub fn nearest_index(&self, position: Vec3, rng: &mut GameRng) -> Option<GridIndex> {
        self.nearest_in_shells(position)
            .or_else(|| self.random_index(rng))
    }

    /// Shell-search half of `nearest_index`, without the random fallback.
    pub fn nearest_in_shells(&self, position: Vec3) -> Option<GridIndex> {
        let center = CellKey::containing(position, self.inv_cell_size);
        for r in 0..=MAX_NEAREST_SHELL {
            let mut best: Option<(f32, GridIndex)> = None;
            for dx in -r..=r {
                for dy in -r..=r {
                    for dz in -r..=r {
                        if dx.abs().max(dy.abs()).max(dz.abs()) != r {
                            continue;
                        }
                        let Some(bucket) = self.cells.get(&center.offset(dx, dy, dz)) else {
                            continue;
                        };
                        for &idx in bucket {
                            let d = self.points[idx.index()].distance_squared(position);
                            if best.is_none_or(|(bd, bi)| d < bd || (d == bd && idx < bi)) {
                                best = Some((d, idx));
                            }
                        }
                    }
                }
            }
            if let Some((_, idx)) = best {
                return Some(idx);
            }
        }
        None
    }

    /// `start` and every point reachable within `hops` adjacency steps, in
    /// breadth-first order.
    pub fn within_hops(&self, start: GridIndex, hops: usize) -> Vec<GridIndex> {
        if start.index() >= self.points.len() {
            return Vec::new();
        }
        let mut seen = FxHashSet::default();
        let mut order = vec![start];
        let mut queue = VecDeque::from([(start, 0usize)]);
        seen.insert(start);
        while let Some((node, depth)) = queue.pop_front() {
            if depth == hops {
                continue;
            }
            for &next in self.neighbors(node) {
                if seen.insert(next) {
                    order.push(next);
                    queue.push_back((next, depth + 1));
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{LatticeProvider, SamplePointProvider};

    fn lattice(n: u32, spacing: f32) -> NavGrid {
        let provider = LatticeProvider {
            origin: Vec3::new(-3.0, 0.5, 7.0),
            counts: (n, n, n),
            spacing,
        };
        NavGrid::build(provider.sample_points(), provider.spacing()).unwrap()
    }

    #[test]
    fn uniform_lattice_has_cube_connectivity() {
        let grid = lattice(5, 4.0);
        assert_eq!(grid.len(), 125);
        for i in 0..grid.len() {
            let idx = GridIndex(i as u32);
            let n = grid.neighbors(idx);
            assert!((6..=26).contains(&n.len()), "point {i} has {} neighbors", n.len());
            assert!(!n.contains(&idx), "point {i} is its own neighbor");
        }
        // Center of a 5×5×5 lattice: (2,2,2) → 2 + 2*5 + 2*25.
        assert_eq!(grid.neighbors(GridIndex(62)).len(), 26);
        // Corner.
        assert_eq!(grid.neighbors(GridIndex(0)).len(), 7);
    }

    #[test]
    fn adjacency_is_symmetric_and_sorted() {
        let mut rng = GameRng::new(3);
        let points: Vec<Vec3> = (0..400)
            .map(|_| {
                Vec3::new(
                    rng.range_f32(0.0, 60.0),
                    rng.range_f32(0.0, 20.0),
                    rng.range_f32(0.0, 60.0),
                )
            })
            .collect();
        let grid = NavGrid::build(points, 5.0).unwrap();
        for i in 0..grid.len() {
            let a = GridIndex(i as u32);
            let row = grid.neighbors(a);
            assert!(row.windows(2).all(|w| w[0] < w[1]));
            for &b in row {
                assert!(grid.neighbors(b).contains(&a), "{a:?} -> {b:?} not mirrored");
                let d = grid.point(a).distance(grid.point(b));
                assert!(d <= 5.0 * NEIGHBOR_DISTANCE_FACTOR + 1e-4);
            }
        }
    }

    #[test]
    fn hashed_adjacency_matches_brute_force() {
        let mut rng = GameRng::new(11);
        let points: Vec<Vec3> = (0..200)
            .map(|_| {
                Vec3::new(
                    rng.range_f32(-30.0, 30.0),
                    rng.range_f32(-30.0, 30.0),
                    rng.range_f32(-30.0, 30.0),
                )
            })
            .collect();
        let spacing = 6.0;
        let grid = NavGrid::build(points.clone(), spacing).unwrap();
        let limit = spacing * NEIGHBOR_DISTANCE_FACTOR;
        let limit_sq = limit * limit;
        for (i, p) in points.iter().enumerate() {
            let expected: Vec<GridIndex> = points
                .iter()
                .enumerate()
                .filter(|&(j, q)| j != i && q.distance_squared(*p) <= limit_sq)
                .map(|(j, _)| GridIndex(j as u32))
                .collect();
            assert_eq!(grid.neighbors(GridIndex(i as u32)), expected.as_slice());
        }
    }

    #[test]
    fn nearest_index_finds_the_closest_lattice_point() {
        let grid = lattice(4, 10.0);
        let mut rng = GameRng::new(1);
        let target = GridIndex(1 + 2 * 4 + 3 * 16);
        let query = grid.point(target) + Vec3::new(1.5, -2.0, 0.5);
        assert_eq!(grid.nearest_index(query, &mut rng), Some(target));
    }

    #[test]
    fn nearest_index_falls_back_to_random_when_far_away() {
        let grid = lattice(3, 1.0);
        let mut rng = GameRng::new(1);
        let far = Vec3::splat(10_000.0);
        assert_eq!(grid.nearest_in_shells(far), None);
        let idx = grid.nearest_index(far, &mut rng).unwrap();
        assert!(idx.index() < grid.len());
    }

    #[test]
    fn empty_grid_yields_nothing() {
        let grid = NavGrid::build(Vec::new(), 2.0).unwrap();
        let mut rng = GameRng::new(1);
        assert!(grid.is_empty());
        assert_eq!(grid.random_index(&mut rng), None);
        assert_eq!(grid.nearest_index(Vec3::ZERO, &mut rng), None);
        assert!(grid.neighbors(GridIndex(0)).is_empty());
        assert!(grid.within_hops(GridIndex(0), 2).is_empty());
    }

    #[test]
    fn invalid_spacing_is_rejected() {
        assert!(matches!(NavGrid::build(vec![Vec3::ZERO], 0.0), Err(SimError::InvalidSpacing(_))));
        assert!(NavGrid::build(vec![Vec3::ZERO], -1.0).is_err());
    }

    #[test]
    fn within_hops_is_breadth_first_and_bounded() {
        let grid = lattice(5, 1.0);
        let center = GridIndex(62);
        assert_eq!(grid.within_hops(center, 0), vec![center]);
        let one = grid.within_hops(center, 1);
        assert_eq!(one.len(), 27);
        assert_eq!(one[0], center);
        // Two hops from the center covers the whole 5×5×5 lattice.
        assert_eq!(grid.within_hops(center, 2).len(), 125);
    }

    #[test]
    fn random_index_covers_the_grid() {
        let grid = lattice(2, 1.0);
        let mut rng = GameRng::new(8);
        let mut seen = [false; 8];
        for _ in 0..200 {
            seen[grid.random_index(&mut rng).unwrap().index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
