//! Biome descriptors and the biome input set.
//!
//! A biome is identified by a small stable index (0-7) and carries two
//! sampling capabilities: a coarse height function and a fine detail
//! function. The generator treats both as opaque; [`NoiseBiome`] is the
//! built-in implementation driven by Perlin fBm.

use std::sync::Arc;

use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError, MAX_BIOMES};
use crate::seeds::derive_seed;

/// Height/detail sampling capability of a biome.
pub trait BiomeSampler: Send + Sync {
    /// Coarse terrain height at a world position
    fn height_at(&self, x: f64, y: f64) -> f32;
    /// Fine detail noise at a world position
    fn detail_at(&self, x: f64, y: f64) -> f32;
}

// =============================================================================
// NOISE LAYERS
// =============================================================================

/// Parameters for one fBm noise layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseLayer {
    /// Output scale in world height units
    pub amplitude: f32,
    /// Base frequency (lower = larger features)
    pub frequency: f64,
    /// Number of noise octaves
    pub octaves: u32,
    /// Amplitude decay per octave (0.0-1.0)
    pub persistence: f64,
    /// Frequency multiplier per octave
    pub lacunarity: f64,
    /// Added to the terrain seed so layers of one biome decorrelate
    pub seed_offset: u32,
}

impl Default for NoiseLayer {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            frequency: 0.05,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            seed_offset: 0,
        }
    }
}

impl NoiseLayer {
    pub fn new(amplitude: f32, frequency: f64) -> Self {
        Self {
            amplitude,
            frequency,
            ..Default::default()
        }
    }

    pub fn with_octaves(mut self, octaves: u32) -> Self {
        self.octaves = octaves;
        self
    }

    pub fn with_seed_offset(mut self, offset: u32) -> Self {
        self.seed_offset = offset;
        self
    }

    fn build(&self, seed: u64) -> LayerSampler {
        LayerSampler {
            params: self.clone(),
            noise: Perlin::new((seed as u32).wrapping_add(self.seed_offset)),
        }
    }
}

struct LayerSampler {
    params: NoiseLayer,
    noise: Perlin,
}

impl LayerSampler {
    fn sample(&self, x: f64, y: f64) -> f32 {
        let p = &self.params;
        if p.amplitude == 0.0 || p.octaves == 0 {
            return 0.0;
        }
        let n = fbm(
            &self.noise,
            x * p.frequency,
            y * p.frequency,
            p.octaves,
            p.persistence,
            p.lacunarity,
        );
        n as f32 * p.amplitude
    }
}

/// Fractional Brownian Motion - multi-octave noise
fn fbm(noise: &Perlin, x: f64, y: f64, octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;

    for _ in 0..octaves {
        total += amplitude * noise.get([x * frequency, y * frequency]);
        max_value += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    total / max_value
}

/// Biome backed by two Perlin fBm layers.
pub struct NoiseBiome {
    height: LayerSampler,
    detail: LayerSampler,
}

impl NoiseBiome {
    pub fn new(height: &NoiseLayer, detail: &NoiseLayer, seed: u64) -> Self {
        Self {
            height: height.build(derive_seed(seed, "height")),
            detail: detail.build(derive_seed(seed, "detail")),
        }
    }
}

impl BiomeSampler for NoiseBiome {
    fn height_at(&self, x: f64, y: f64) -> f32 {
        self.height.sample(x, y)
    }

    fn detail_at(&self, x: f64, y: f64) -> f32 {
        self.detail.sample(x, y)
    }
}

// =============================================================================
// BIOME SET
// =============================================================================

/// Serializable biome description, as found in a config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiomeDef {
    pub index: u8,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub height: NoiseLayer,
    #[serde(default)]
    pub detail: NoiseLayer,
}

impl BiomeDef {
    /// A small default set: flat plains as the base, rolling hills, and
    /// mountains.
    pub fn defaults() -> Vec<BiomeDef> {
        vec![
            BiomeDef {
                index: 0,
                name: "plains".to_string(),
                height: NoiseLayer::new(2.0, 0.01),
                detail: NoiseLayer::new(1.5, 0.08).with_octaves(3),
            },
            BiomeDef {
                index: 1,
                name: "hills".to_string(),
                height: NoiseLayer::new(12.0, 0.02).with_seed_offset(11),
                detail: NoiseLayer::new(8.0, 0.05).with_seed_offset(11),
            },
            BiomeDef {
                index: 2,
                name: "mountains".to_string(),
                height: NoiseLayer::new(40.0, 0.015).with_octaves(6).with_seed_offset(23),
                detail: NoiseLayer::new(25.0, 0.04).with_octaves(6).with_seed_offset(23),
            },
        ]
    }
}

/// One biome of the input set.
#[derive(Clone)]
pub struct Biome {
    pub index: u8,
    pub name: String,
    sampler: Arc<dyn BiomeSampler>,
}

impl Biome {
    pub fn new(index: u8, name: impl Into<String>, sampler: Arc<dyn BiomeSampler>) -> Self {
        Self {
            index,
            name: name.into(),
            sampler,
        }
    }

    pub fn from_def(def: &BiomeDef, terrain_seed: u64) -> Self {
        let seed = terrain_seed.wrapping_add(def.index as u64);
        let sampler = NoiseBiome::new(&def.height, &def.detail, seed);
        Self::new(def.index, def.name.clone(), Arc::new(sampler))
    }

    #[inline]
    pub fn height_at(&self, x: f64, y: f64) -> f32 {
        self.sampler.height_at(x, y)
    }

    #[inline]
    pub fn detail_at(&self, x: f64, y: f64) -> f32 {
        self.sampler.detail_at(x, y)
    }
}

impl std::fmt::Debug for Biome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Biome")
            .field("index", &self.index)
            .field("name", &self.name)
            .finish()
    }
}

/// Ordered, validated collection of biomes. Read-only once built.
#[derive(Clone, Debug)]
pub struct BiomeSet {
    biomes: Vec<Biome>,
    by_index: [Option<usize>; MAX_BIOMES],
}

impl BiomeSet {
    /// Validate and build a set. Fails if the set is empty, larger than the
    /// packed field can address, or uses an index twice or out of range.
    pub fn new(biomes: Vec<Biome>) -> Result<Self> {
        if biomes.is_empty() {
            return Err(TerrainError::EmptyBiomeSet);
        }
        if biomes.len() > MAX_BIOMES {
            return Err(TerrainError::TooManyBiomes {
                count: biomes.len(),
            });
        }

        let mut by_index = [None; MAX_BIOMES];
        for (pos, biome) in biomes.iter().enumerate() {
            let idx = biome.index as usize;
            if idx >= MAX_BIOMES {
                return Err(TerrainError::BiomeIndexOutOfRange { index: idx });
            }
            if by_index[idx].is_some() {
                return Err(TerrainError::DuplicateBiomeIndex { index: biome.index });
            }
            by_index[idx] = Some(pos);
        }

        Ok(Self { biomes, by_index })
    }

    pub fn from_defs(defs: &[BiomeDef], terrain_seed: u64) -> Result<Self> {
        Self::new(defs.iter().map(|d| Biome::from_def(d, terrain_seed)).collect())
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    /// Stable indices in set order. Lattice cells pick from this list.
    pub fn indices(&self) -> Vec<u8> {
        self.biomes.iter().map(|b| b.index).collect()
    }

    pub fn get(&self, index: u8) -> Option<&Biome> {
        self.by_index
            .get(index as usize)
            .copied()
            .flatten()
            .map(|pos| &self.biomes[pos])
    }

    /// Like [`BiomeSet::get`] but a missing descriptor is a configuration error.
    pub fn require(&self, index: u8) -> Result<&Biome> {
        self.get(index).ok_or(TerrainError::UnknownBiome { index })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Biome> {
        self.biomes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat(f32);

    impl BiomeSampler for Flat {
        fn height_at(&self, _x: f64, _y: f64) -> f32 {
            self.0
        }
        fn detail_at(&self, _x: f64, _y: f64) -> f32 {
            self.0 * 2.0
        }
    }

    fn flat(index: u8) -> Biome {
        Biome::new(index, format!("flat{}", index), Arc::new(Flat(index as f32)))
    }

    #[test]
    fn test_set_lookup_by_stable_index() {
        let set = BiomeSet::new(vec![flat(3), flat(0), flat(5)]).unwrap();
        assert_eq!(set.indices(), vec![3, 0, 5]);
        assert_eq!(set.get(5).unwrap().detail_at(0.0, 0.0), 10.0);
        assert!(set.get(1).is_none());
        assert!(matches!(
            set.require(1),
            Err(TerrainError::UnknownBiome { index: 1 })
        ));
    }

    #[test]
    fn test_rejects_nine_biomes() {
        let biomes: Vec<Biome> = (0..9).map(|i| flat(i % 8)).collect();
        assert!(matches!(
            BiomeSet::new(biomes),
            Err(TerrainError::TooManyBiomes { count: 9 })
        ));
    }

    #[test]
    fn test_rejects_index_eight() {
        assert!(matches!(
            BiomeSet::new(vec![flat(0), flat(8)]),
            Err(TerrainError::BiomeIndexOutOfRange { index: 8 })
        ));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(matches!(
            BiomeSet::new(vec![flat(2), flat(2)]),
            Err(TerrainError::DuplicateBiomeIndex { index: 2 })
        ));
        assert!(matches!(BiomeSet::new(Vec::new()), Err(TerrainError::EmptyBiomeSet)));
    }

    #[test]
    fn test_noise_biome_is_deterministic() {
        let defs = BiomeDef::defaults();
        let a = BiomeSet::from_defs(&defs, 99).unwrap();
        let b = BiomeSet::from_defs(&defs, 99).unwrap();
        for biome in a.iter() {
            let other = b.get(biome.index).unwrap();
            assert_eq!(biome.detail_at(12.3, -4.5), other.detail_at(12.3, -4.5));
            assert_eq!(biome.height_at(12.3, -4.5), other.height_at(12.3, -4.5));
        }
    }

    #[test]
    fn test_noise_layer_respects_amplitude() {
        let layer = NoiseLayer::new(3.0, 0.1);
        let sampler = layer.build(5);
        for i in 0..50 {
            let v = sampler.sample(i as f64 * 1.7, i as f64 * -0.9);
            assert!(v.abs() <= 3.0 * 1.01);
        }
        let silent = NoiseLayer::new(0.0, 0.1).build(5);
        assert_eq!(silent.sample(1.0, 2.0), 0.0);
    }
}
