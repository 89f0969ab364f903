//! Jittered point lattice.
//!
//! World space is divided into square cells of `spacing` units. Every cell
//! holds one point, offset from the cell corner by a seeded jitter, and one
//! biome. A cell is a pure function of `(seed, cx, cy)`: two regions asking
//! for the same cell always get bit-identical answers, which is what lets
//! adjacent regions blend across their shared edge without seams.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{Result, TerrainError, MAX_BIOMES};
use crate::seeds::cell_hash;

/// A position in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WorldPos {
    pub x: f64,
    pub y: f64,
}

impl WorldPos {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance_squared(&self, other: WorldPos) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn distance(&self, other: WorldPos) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Integer lattice coordinate.
pub type CellCoord = (i64, i64);

/// One lattice cell: its coordinate, jittered point and biome.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatticeCell {
    pub coord: CellCoord,
    pub position: WorldPos,
    pub biome: u8,
}

/// Anything that can answer "which cell is at (cx, cy)".
pub trait CellSource {
    /// Lattice spacing in world units
    fn spacing(&self) -> f64;

    /// World position of cell (0, 0)'s corner
    fn anchor(&self) -> WorldPos;

    fn cell_at(&self, cx: i64, cy: i64) -> LatticeCell;

    /// Coordinate of the cell containing a world position.
    fn cell_coord(&self, pos: WorldPos) -> CellCoord {
        let anchor = self.anchor();
        let spacing = self.spacing();
        (
            ((pos.x - anchor.x) / spacing).floor() as i64,
            ((pos.y - anchor.y) / spacing).floor() as i64,
        )
    }
}

/// Derives lattice cells on demand from a seed.
#[derive(Clone, Debug)]
pub struct LatticeSampler {
    seed: u64,
    spacing: f64,
    jitter: f64,
    anchor: WorldPos,
    biomes: Vec<u8>,
}

impl LatticeSampler {
    /// `jitter` is the fraction of the spacing a point may move from its cell
    /// corner (0 = regular grid, 1 = anywhere in the cell). `biomes` are the
    /// stable indices cells pick from.
    pub fn new(seed: u64, spacing: f64, jitter: f64, anchor: WorldPos, biomes: Vec<u8>) -> Result<Self> {
        if biomes.is_empty() {
            return Err(TerrainError::EmptyBiomeSet);
        }
        if biomes.len() > MAX_BIOMES {
            return Err(TerrainError::TooManyBiomes { count: biomes.len() });
        }
        if let Some(&bad) = biomes.iter().find(|&&b| b as usize >= MAX_BIOMES) {
            return Err(TerrainError::BiomeIndexOutOfRange { index: bad as usize });
        }

        Ok(Self {
            seed,
            spacing,
            jitter: jitter.clamp(0.0, 1.0),
            anchor,
            biomes,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Derive the cell at `(cx, cy)`.
    pub fn cell(&self, cx: i64, cy: i64) -> LatticeCell {
        let mut rng = ChaCha8Rng::seed_from_u64(cell_hash(self.seed, cx, cy));

        let jx: f64 = rng.gen();
        let jy: f64 = rng.gen();
        let pick = rng.next_u32() as usize % self.biomes.len();

        let position = WorldPos::new(
            self.anchor.x + (cx as f64 + jx * self.jitter) * self.spacing,
            self.anchor.y + (cy as f64 + jy * self.jitter) * self.spacing,
        );

        LatticeCell {
            coord: (cx, cy),
            position,
            biome: self.biomes[pick],
        }
    }
}

impl CellSource for LatticeSampler {
    fn spacing(&self) -> f64 {
        self.spacing
    }

    fn anchor(&self) -> WorldPos {
        self.anchor
    }

    fn cell_at(&self, cx: i64, cy: i64) -> LatticeCell {
        self.cell(cx, cy)
    }
}

/// Cells covering one region plus a border, derived once and reused for every
/// sample point of that region. Lookups outside the block fall back to the
/// sampler, so the cache never changes an answer.
#[derive(Clone, Debug)]
pub struct Lattice {
    sampler: LatticeSampler,
    min: CellCoord,
    cols: usize,
    rows: usize,
    cells: Vec<LatticeCell>,
}

impl Lattice {
    /// Cache the cells under the square `origin .. origin + size`, widened by
    /// `border` cells on every side.
    pub fn build(sampler: LatticeSampler, origin: WorldPos, size: f64, border: usize) -> Self {
        let first = sampler.cell_coord(origin);
        let last = sampler.cell_coord(origin.offset(size, size));
        let border = border as i64;

        let min = (first.0 - border, first.1 - border);
        let cols = (last.0 - first.0 + 1 + 2 * border).max(1) as usize;
        let rows = (last.1 - first.1 + 1 + 2 * border).max(1) as usize;

        let mut cells = Vec::with_capacity(cols * rows);
        for row in 0..rows as i64 {
            for col in 0..cols as i64 {
                cells.push(sampler.cell(min.0 + col, min.1 + row));
            }
        }

        Self {
            sampler,
            min,
            cols,
            rows,
            cells,
        }
    }

    pub fn sampler(&self) -> &LatticeSampler {
        &self.sampler
    }

    /// Lowest cached coordinate and the block dimensions.
    pub fn bounds(&self) -> (CellCoord, usize, usize) {
        (self.min, self.cols, self.rows)
    }

    pub fn cells(&self) -> &[LatticeCell] {
        &self.cells
    }

    fn cached_index(&self, cx: i64, cy: i64) -> Option<usize> {
        let col = cx - self.min.0;
        let row = cy - self.min.1;
        if col < 0 || row < 0 || col >= self.cols as i64 || row >= self.rows as i64 {
            return None;
        }
        Some(row as usize * self.cols + col as usize)
    }

    pub fn is_cached(&self, cx: i64, cy: i64) -> bool {
        self.cached_index(cx, cy).is_some()
    }
}

impl CellSource for Lattice {
    fn spacing(&self) -> f64 {
        self.sampler.spacing
    }

    fn anchor(&self) -> WorldPos {
        self.sampler.anchor
    }

    fn cell_at(&self, cx: i64, cy: i64) -> LatticeCell {
        match self.cached_index(cx, cy) {
            Some(idx) => self.cells[idx],
            None => self.sampler.cell(cx, cy),
        }
    }
}
