use glam::{IVec3, Vec3};

/// Uniform grid over predicted positions, stored in a fixed-size hash table.
///
/// Built with a counting sort over buckets (count, prefix sum, scatter).
/// Each entry keeps its integer cell, so a query only reports particles that
/// really sit in one of the 27 cells around the query point, each exactly
/// once, even when distinct cells share a bucket.
pub struct SpatialHashGrid {
    cell_size: f32,
    inv_cell_size: f32,
    bucket_len: Vec<u32>,
    bucket_start: Vec<u32>,
    /// (cell, particle) pairs ordered by bucket.
    entries: Vec<(IVec3, u32)>,
    cells: Vec<IVec3>,
}

impl SpatialHashGrid {
    /// `cell_size` must be at least the search radius for a 27-cell query to
    /// cover it.
    pub fn new(cell_size: f32, buckets: usize) -> Self {
        assert!(cell_size > 0.0, "cell size must be positive");
        assert!(buckets > 0, "hash table must have at least one bucket");
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            bucket_len: vec![0; buckets],
            bucket_start: vec![0; buckets],
            entries: Vec::new(),
            cells: Vec::new(),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn cell_of(&self, pos: Vec3) -> IVec3 {
        (pos * self.inv_cell_size).floor().as_ivec3()
    }

    pub fn build(&mut self, positions: &[Vec3]) {
        let inv = self.inv_cell_size;
        self.cells.clear();
        self.cells.extend(positions.iter().map(|&p| (p * inv).floor().as_ivec3()));
        self.bucket_len.fill(0);
        for &cell in &self.cells {
            let b = self.bucket(cell);
            self.bucket_len[b] += 1;
        }

        let mut running = 0;
        for (start, &len) in self.bucket_start.iter_mut().zip(&self.bucket_len) {
            *start = running;
            running += len;
        }

        self.entries.clear();
        self.entries.resize(positions.len(), (IVec3::ZERO, 0));
        let mut cursor = self.bucket_start.clone();
        for (i, &cell) in self.cells.iter().enumerate() {
            let slot = &mut cursor[self.bucket(cell)];
            self.entries[*slot as usize] = (cell, i as u32);
            *slot += 1;
        }
    }

    /// Visit every particle in the 3x3x3 block of cells around `pos`.
    /// The caller does the distance test.
    pub fn for_each_candidate(&self, pos: Vec3, mut visit: impl FnMut(u32)) {
        let center = self.cell_of(pos);
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let cell = center.wrapping_add(IVec3::new(dx, dy, dz));
                    for &(c, particle) in self.bucket_entries(cell) {
                        if c == cell {
                            visit(particle);
                        }
                    }
                }
            }
        }
    }

    fn bucket_entries(&self, cell: IVec3) -> &[(IVec3, u32)] {
        let b = self.bucket(cell);
        let start = self.bucket_start[b] as usize;
        &self.entries[start..start + self.bucket_len[b] as usize]
    }

    #[inline]
    fn bucket(&self, cell: IVec3) -> usize {
        let h = (cell.x as u32).wrapping_mul(73856093)
            ^ (cell.y as u32).wrapping_mul(19349663)
            ^ (cell.z as u32).wrapping_mul(83492791);
        h as usize % self.bucket_len.len()
    }
}
