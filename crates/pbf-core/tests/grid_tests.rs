use glam::{IVec3, Vec3};
use pbf_core::grid::SpatialHashGrid;

fn candidates(grid: &SpatialHashGrid, pos: Vec3) -> Vec<u32> {
    let mut out = Vec::new();
    grid.for_each_candidate(pos, |i| out.push(i));
    out.sort_unstable();
    out
}

#[test]
fn test_query_reports_adjacent_cells_only() {
    let mut grid = SpatialHashGrid::new(0.2, 1024);
    let positions = [
        Vec3::new(0.1, 0.1, 0.1),
        Vec3::new(0.3, 0.1, 0.1), // next cell over
        Vec3::new(0.5, 0.1, 0.1), // two cells over
    ];
    grid.build(&positions);

    assert_eq!(candidates(&grid, positions[0]), vec![0, 1]);
    assert_eq!(candidates(&grid, positions[1]), vec![0, 1, 2]);
}

#[test]
fn test_every_particle_reported_once_in_its_own_query() {
    let mut grid = SpatialHashGrid::new(0.2, 64);
    let positions: Vec<Vec3> = (0..800)
        .map(|i| {
            let t = i as f32 / 800.0;
            let angle = t * std::f32::consts::TAU * 12.0;
            Vec3::new(0.5 + 0.4 * t * angle.cos(), t, 0.5 + 0.4 * t * angle.sin())
        })
        .collect();
    grid.build(&positions);

    for (i, &p) in positions.iter().enumerate() {
        let found = candidates(&grid, p);
        assert_eq!(found.iter().filter(|&&j| j == i as u32).count(), 1, "particle {i}");
        assert!(found.windows(2).all(|w| w[0] < w[1]), "duplicates around {i}");
    }
}

#[test]
fn test_empty_build() {
    let mut grid = SpatialHashGrid::new(0.2, 1024);
    grid.build(&[]);
    assert!(candidates(&grid, Vec3::splat(0.5)).is_empty());
}

#[test]
fn test_rebuild_forgets_previous_positions() {
    let mut grid = SpatialHashGrid::new(0.2, 1024);
    grid.build(&[Vec3::ZERO, Vec3::splat(0.5), Vec3::splat(0.9)]);
    grid.build(&[Vec3::splat(0.5), Vec3::splat(0.05)]);

    assert_eq!(candidates(&grid, Vec3::ZERO), vec![1]);
}

#[test]
fn test_cells_below_zero() {
    let grid = SpatialHashGrid::new(0.2, 1024);
    assert_eq!(grid.cell_of(Vec3::new(-0.01, 0.0, 0.19)), IVec3::new(-1, 0, 0));

    let mut grid = grid;
    let positions = [Vec3::new(-0.01, 0.5, 0.5), Vec3::new(0.01, 0.5, 0.5)];
    grid.build(&positions);
    assert_eq!(candidates(&grid, positions[0]), vec![0, 1]);
}
