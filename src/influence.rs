//! Neighbor influence resolution.
//!
//! For a query point the 3x3 block of lattice cells around it is ranked by
//! distance. The nearest cell is the main cell and starts at weight 1. Every
//! other cell with a different biome blends in if the query lies within
//! `max_overlap` of the bisector between it and the main cell. The response
//! to that distance comes from a baked gradient. Weights are normalized to
//! sum to 1.

use crate::gradient::BakedGradient;
use crate::lattice::{CellSource, LatticeCell, WorldPos};

/// Number of candidate cells examined per query (3x3 block).
pub const CANDIDATES: usize = 9;

/// A biome and its normalized influence at one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiomeWeight {
    pub biome: u8,
    pub weight: f32,
}

impl BiomeWeight {
    pub fn new(biome: u8, weight: f32) -> Self {
        Self { biome, weight }
    }
}

/// What happened to a neighbor during blending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeighborState {
    /// Contributes its own weight
    Active,
    /// Query is on the neighbor's side; its influence went to the main cell
    Absorbed,
    /// Same biome as the main cell, outside the blend band, or merged away
    Discarded,
}

/// A candidate cell paired with its distance to the query and its weight.
#[derive(Clone, Copy, Debug)]
pub struct InfluenceSample {
    pub cell: LatticeCell,
    pub distance: f64,
    pub weight: f32,
    pub state: NeighborState,
}

impl InfluenceSample {
    fn new(cell: LatticeCell, query: WorldPos) -> Self {
        Self {
            cell,
            distance: cell.position.distance(query),
            weight: 0.0,
            state: NeighborState::Discarded,
        }
    }
}

/// Result of resolving one query point.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    /// Biome of the nearest lattice cell
    pub main_biome: u8,
    /// Main biome first, then surviving neighbors by ascending distance.
    /// Every weight is positive and the weights sum to 1.
    pub weights: Vec<BiomeWeight>,
}

impl Resolution {
    pub fn main_weight(&self) -> f32 {
        self.weights.first().map(|w| w.weight).unwrap_or(0.0)
    }

    pub fn neighbors(&self) -> &[BiomeWeight] {
        self.weights.get(1..).unwrap_or(&[])
    }

    /// Total weight assigned to `biome`, 0 if absent.
    pub fn weight_of(&self, biome: u8) -> f32 {
        self.weights
            .iter()
            .filter(|w| w.biome == biome)
            .map(|w| w.weight)
            .sum()
    }

    pub fn total(&self) -> f32 {
        self.weights.iter().map(|w| w.weight).sum()
    }
}

/// Resolve the biome influences at `query`.
pub fn resolve<S: CellSource + ?Sized>(
    query: WorldPos,
    source: &S,
    gradient: &BakedGradient,
    max_overlap: f64,
) -> Resolution {
    resolve_candidates(query, gather_candidates(query, source), gradient, max_overlap)
}

/// The cell containing `query` and its 8 neighbors, row by row.
pub fn gather_candidates<S: CellSource + ?Sized>(query: WorldPos, source: &S) -> [LatticeCell; CANDIDATES] {
    let (cx, cy) = source.cell_coord(query);
    std::array::from_fn(|i| {
        let dx = (i % 3) as i64 - 1;
        let dy = (i / 3) as i64 - 1;
        source.cell_at(cx + dx, cy + dy)
    })
}

/// Resolve influences from an explicit candidate set.
pub fn resolve_candidates(
    query: WorldPos,
    candidates: [LatticeCell; CANDIDATES],
    gradient: &BakedGradient,
    max_overlap: f64,
) -> Resolution {
    let mut samples = candidates.map(|cell| InfluenceSample::new(cell, query));
    // Stable, so ties keep gather order
    samples.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let (head, neighbors) = samples.split_at_mut(1);
    let main = &head[0];
    let mut main_weight = 1.0f32;

    for neighbor in neighbors.iter_mut().rev() {
        blend_neighbor(&mut main_weight, main, neighbor, query, gradient, max_overlap);
    }

    merge_duplicate_biomes(neighbors);

    let sum = main_weight
        + neighbors
            .iter()
            .filter(|n| n.state == NeighborState::Active)
            .map(|n| n.weight)
            .sum::<f32>();

    let mut weights = Vec::with_capacity(3);
    weights.push(BiomeWeight::new(main.cell.biome, main_weight / sum));
    weights.extend(
        neighbors
            .iter()
            .filter(|n| n.state == NeighborState::Active && n.weight > 0.0)
            .map(|n| BiomeWeight::new(n.cell.biome, n.weight / sum)),
    );

    Resolution {
        main_biome: main.cell.biome,
        weights,
    }
}

/// Signed distance from `query` to the bisector between `main` and
/// `neighbor`. Positive on the main cell's side.
pub fn boundary_distance(query: WorldPos, main: WorldPos, neighbor: WorldPos) -> f64 {
    let separation = main.distance(neighbor);
    if separation <= f64::EPSILON {
        return 0.0;
    }
    (query.distance_squared(neighbor) - query.distance_squared(main)) / (2.0 * separation)
}

/// Apply the pairwise blending rule to one neighbor.
fn blend_neighbor(
    main_weight: &mut f32,
    main: &InfluenceSample,
    neighbor: &mut InfluenceSample,
    query: WorldPos,
    gradient: &BakedGradient,
    max_overlap: f64,
) {
    neighbor.weight = 0.0;
    neighbor.state = NeighborState::Discarded;

    if neighbor.cell.biome == main.cell.biome {
        return;
    }

    let distance = boundary_distance(query, main.cell.position, neighbor.cell.position);
    let abs_distance = distance.abs();
    if abs_distance >= max_overlap {
        return;
    }

    // 0 at the boundary, 1 at the edge of the blend band
    let overlap = (abs_distance / max_overlap) as f32;
    let influence = gradient.lookup(overlap);

    if distance >= 0.0 {
        neighbor.weight = influence;
        neighbor.state = NeighborState::Active;
    } else {
        *main_weight += influence;
        neighbor.state = NeighborState::Absorbed;
    }
}

/// Keep only the strongest active neighbor per biome.
fn merge_duplicate_biomes(neighbors: &mut [InfluenceSample]) {
    for i in 0..neighbors.len() {
        if neighbors[i].state != NeighborState::Active {
            continue;
        }
        for j in (i + 1)..neighbors.len() {
            if neighbors[j].state != NeighborState::Active
                || neighbors[j].cell.biome != neighbors[i].cell.biome
            {
                continue;
            }
            if neighbors[j].weight > neighbors[i].weight {
                neighbors[i].state = NeighborState::Discarded;
                break;
            }
            neighbors[j].state = NeighborState::Discarded;
        }
    }
}
