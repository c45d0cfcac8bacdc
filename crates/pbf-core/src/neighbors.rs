use glam::Vec3;

use crate::config::NeighborSearch;
use crate::grid::SpatialHashGrid;

/// Buckets in the neighbor-search hash table (2^16).
const GRID_TABLE_SIZE: usize = 65536;

/// Per-step neighbor sets stored as a flat adjacency (CSR layout).
///
/// `neighbors(i)` is a sorted slice of particle indices whose predicted
/// position lies within the search radius of particle `i`, including `i`
/// itself. Buffers are reused between rebuilds.
#[derive(Default)]
pub struct NeighborList {
    offsets: Vec<u32>,
    indices: Vec<u32>,
    grid: Option<SpatialHashGrid>,
}

impl NeighborList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of particles the list was last built for.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn neighbors(&self, i: usize) -> &[u32] {
        let start = self.offsets[i] as usize;
        let end = self.offsets[i + 1] as usize;
        &self.indices[start..end]
    }

    /// Total number of (i, j) pairs, self pairs included.
    #[inline]
    pub fn pair_count(&self) -> usize {
        self.indices.len()
    }

    /// Rebuild with the given strategy. Both strategies produce identical
    /// sets: `j` is a neighbor of `i` iff `|x_i - x_j| <= radius`.
    pub fn rebuild(&mut self, positions: &[Vec3], radius: f32, search: NeighborSearch) {
        match search {
            NeighborSearch::BruteForce => self.rebuild_brute_force(positions, radius),
            NeighborSearch::HashGrid => self.rebuild_hash_grid(positions, radius),
        }
    }

    /// All-pairs scan. Neighbors come out in ascending index order.
    pub fn rebuild_brute_force(&mut self, positions: &[Vec3], radius: f32) {
        self.offsets.clear();
        self.indices.clear();
        self.offsets.push(0);
        for (i, &x_i) in positions.iter().enumerate() {
            for (j, &x_j) in positions.iter().enumerate() {
                if within(i, j, x_i, x_j, radius) {
                    self.indices.push(j as u32);
                }
            }
            self.offsets.push(self.indices.len() as u32);
        }
    }

    /// Candidate lookup through a spatial hash grid, then the same distance
    /// test as the brute-force scan.
    pub fn rebuild_hash_grid(&mut self, positions: &[Vec3], radius: f32) {
        // Slightly oversized cells keep pairs at exactly `radius` within the
        // 3x3x3 query block despite rounding in the cell coordinates.
        let cell_size = radius * 1.001;
        let grid = match self.grid.take() {
            Some(grid) if grid.cell_size() == cell_size => grid,
            _ => SpatialHashGrid::new(cell_size, GRID_TABLE_SIZE),
        };
        let grid = self.grid.insert(grid);
        grid.build(positions);

        self.offsets.clear();
        self.indices.clear();
        self.offsets.push(0);
        for (i, &x_i) in positions.iter().enumerate() {
            let start = self.indices.len();
            grid.for_each_candidate(x_i, |j| {
                if within(i, j as usize, x_i, positions[j as usize], radius) {
                    self.indices.push(j);
                }
            });
            // Cells are visited in grid order; keep ascending indices like the scan.
            self.indices[start..].sort_unstable();
            self.offsets.push(self.indices.len() as u32);
        }
    }
}

/// A particle is always its own neighbor, even with a NaN position.
#[inline]
fn within(i: usize, j: usize, x_i: Vec3, x_j: Vec3, radius: f32) -> bool {
    i == j || x_i.distance(x_j) <= radius
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_distance_is_included() {
        let positions = vec![Vec3::new(0.25, 0.5, 0.5), Vec3::new(0.75, 0.5, 0.5)];
        let mut list = NeighborList::new();
        list.rebuild_brute_force(&positions, 0.5);
        assert_eq!(list.neighbors(0), &[0, 1]);
        assert_eq!(list.neighbors(1), &[0, 1]);
    }

    #[test]
    fn test_nan_particle_is_only_its_own_neighbor() {
        let positions = vec![Vec3::splat(0.5), Vec3::new(f32::NAN, 0.5, 0.5), Vec3::splat(0.52)];
        for search in [NeighborSearch::BruteForce, NeighborSearch::HashGrid] {
            let mut list = NeighborList::new();
            list.rebuild(&positions, 0.2, search);
            assert_eq!(list.neighbors(0), &[0, 2], "{search:?}");
            assert_eq!(list.neighbors(1), &[1], "{search:?}");
            assert_eq!(list.neighbors(2), &[0, 2], "{search:?}");
        }
    }
}
