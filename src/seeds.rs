//! Seed management for terrain generation
//!
//! Every random decision in the generator is a pure function of a seed and a
//! coordinate. Nothing here touches a global RNG, so lattice cells come out
//! identical no matter which region asks for them or in what order.

/// Seeds for the generation systems, derived from one master seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Lattice jitter and biome assignment
    pub lattice: u64,
    /// Per-biome height and detail noise
    pub terrain: u64,
}

impl WorldSeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            lattice: derive_seed(master, "lattice"),
            terrain: derive_seed(master, "terrain"),
        }
    }
}

impl std::fmt::Display for WorldSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WorldSeeds {{ master: {}, lattice: {}, terrain: {} }}",
            self.master, self.lattice, self.terrain
        )
    }
}

/// Derive a sub-seed from a master seed and a system name.
///
/// FNV-1a over the name followed by a splitmix64 finalizer. Stable across
/// builds and platforms, unlike `DefaultHasher`.
pub fn derive_seed(master: u64, system: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for byte in system.bytes() {
        h ^= byte as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    mix64(master ^ h)
}

/// Hash a seed with an integer lattice coordinate.
///
/// Splitmix64-style mixing after each component, so neighboring cells and
/// mirrored coordinates (x, y) / (y, x) decorrelate.
pub fn cell_hash(seed: u64, cx: i64, cy: i64) -> u64 {
    let mut hash = seed;

    hash = hash.wrapping_add(cx as u64);
    hash ^= hash >> 30;
    hash = hash.wrapping_mul(0xbf58476d1ce4e5b9);

    hash = hash.wrapping_add(0x9e3779b97f4a7c15);
    hash = hash.wrapping_add(cy as u64);
    hash ^= hash >> 27;
    hash = hash.wrapping_mul(0x94d049bb133111eb);

    mix64(hash)
}

/// Splitmix64 finalizer.
#[inline]
pub fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e3779b97f4a7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_derivation() {
        let seeds1 = WorldSeeds::from_master(12345);
        let seeds2 = WorldSeeds::from_master(12345);
        assert_eq!(seeds1, seeds2);
    }

    #[test]
    fn test_different_systems_get_different_seeds() {
        let seeds = WorldSeeds::from_master(12345);
        assert_ne!(seeds.lattice, seeds.terrain);
        assert_ne!(seeds.lattice, seeds.master);
    }

    #[test]
    fn test_cell_hash_is_stable() {
        assert_eq!(cell_hash(42, -3, 7), cell_hash(42, -3, 7));
        assert_ne!(cell_hash(42, 3, 7), cell_hash(42, 7, 3));
        assert_ne!(cell_hash(42, 0, 0), cell_hash(43, 0, 0));
    }

    #[test]
    fn test_cell_hash_neighbors_differ() {
        let mut seen = std::collections::HashSet::new();
        for cy in -16..16 {
            for cx in -16..16 {
                assert!(seen.insert(cell_hash(7, cx, cy)));
            }
        }
    }
}
