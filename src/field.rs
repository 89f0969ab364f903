//! Packed influence field.
//!
//! Per-point biome weights are stored as two RGBA8 bitmaps of
//! `resolution x resolution` pixels. Biome 0 is the implicit base biome and
//! is never stored: its weight is whatever the other seven leave over.
//! Biomes 1-3 live in the primary bitmap (channels 1-3) and biomes 4-7 in
//! the secondary bitmap (channels 0-3); primary channel 0 is unused.
//!
//! A stored byte of 0 means "no influence" and is skipped on decode, so a
//! point typically decodes to a list of one to three entries.

use crate::error::{Result, TerrainError, MAX_BIOMES};
use crate::influence::BiomeWeight;
use crate::tilemap::Tilemap;

/// Bytes per pixel in each bitmap.
pub const CHANNELS: usize = 4;

/// Biome whose weight is implicit.
pub const BASE_BIOME: u8 = 0;

/// Which of the two bitmaps a biome is stored in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bitmap {
    Primary,
    Secondary,
}

/// Bitmap and channel holding `biome`, or `None` for the base biome and for
/// indices the field cannot address.
#[inline]
pub fn channel_for(biome: u8) -> Option<(Bitmap, usize)> {
    match biome {
        1..=3 => Some((Bitmap::Primary, biome as usize)),
        4..=7 => Some((Bitmap::Secondary, biome as usize - 4)),
        _ => None,
    }
}

/// Weight to 8-bit channel value.
#[inline]
pub fn quantize(weight: f32) -> u8 {
    // NaN saturates to 0
    (weight * 255.0).round().clamp(0.0, 255.0) as u8
}

#[inline]
pub fn dequantize(value: u8) -> f32 {
    value as f32 / 255.0
}

/// Write one point's weights into its primary and secondary pixels.
///
/// Both pixels are overwritten. Weights for the base biome are dropped.
/// A biome index of 8 or more is a configuration error.
pub fn encode_pixel(weights: &[BiomeWeight], primary: &mut [u8], secondary: &mut [u8]) -> Result<()> {
    let mut acc = [0.0f32; MAX_BIOMES];
    for w in weights {
        let idx = w.biome as usize;
        if idx >= MAX_BIOMES {
            return Err(TerrainError::BiomeIndexOutOfRange { index: idx });
        }
        acc[idx] += w.weight;
    }

    primary[..CHANNELS].fill(0);
    secondary[..CHANNELS].fill(0);

    for (biome, &weight) in acc.iter().enumerate() {
        if let Some((bitmap, channel)) = channel_for(biome as u8) {
            let target = match bitmap {
                Bitmap::Primary => &mut primary[..],
                Bitmap::Secondary => &mut secondary[..],
            };
            target[channel] = quantize(weight);
        }
    }

    Ok(())
}

/// Explicit (non-base) influences stored in one primary/secondary pixel pair.
pub fn decode_pixel(primary: &[u8], secondary: &[u8]) -> Vec<BiomeWeight> {
    let mut output = Vec::with_capacity(3);
    for biome in 1..MAX_BIOMES as u8 {
        let value = match channel_for(biome) {
            Some((Bitmap::Primary, channel)) => primary.get(channel),
            Some((Bitmap::Secondary, channel)) => secondary.get(channel),
            None => None,
        };
        if let Some(&value) = value.filter(|&&v| v != 0) {
            output.push(BiomeWeight::new(biome, dequantize(value)));
        }
    }
    output
}

/// Weights exactly as a field would store and return them for one point.
pub fn requantize(weights: &[BiomeWeight]) -> Result<Vec<BiomeWeight>> {
    let mut primary = [0u8; CHANNELS];
    let mut secondary = [0u8; CHANNELS];
    encode_pixel(weights, &mut primary, &mut secondary)?;
    Ok(decode_pixel(&primary, &secondary))
}

/// Two-bitmap encoding of an influence field.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedInfluenceField {
    resolution: usize,
    primary: Vec<u8>,
    secondary: Vec<u8>,
}

impl PackedInfluenceField {
    /// All-zero field: every point fully the base biome. A resolution of 0
    /// becomes 1.
    pub fn empty(resolution: usize) -> Self {
        let resolution = resolution.max(1);
        let len = resolution * resolution * CHANNELS;
        Self {
            resolution,
            primary: vec![0; len],
            secondary: vec![0; len],
        }
    }

    /// Wrap bitmaps produced elsewhere, e.g. read back from image files.
    pub fn from_raw(resolution: usize, primary: Vec<u8>, secondary: Vec<u8>) -> Result<Self> {
        if resolution == 0 {
            return Err(TerrainError::EmptyField);
        }
        let expected = resolution * resolution * CHANNELS;
        for actual in [primary.len(), secondary.len()] {
            if actual != expected {
                return Err(TerrainError::FieldSizeMismatch {
                    resolution,
                    expected,
                    actual,
                });
            }
        }
        Ok(Self {
            resolution,
            primary,
            secondary,
        })
    }

    /// Sample points per axis.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn bitmap(&self, which: Bitmap) -> &[u8] {
        match which {
            Bitmap::Primary => &self.primary,
            Bitmap::Secondary => &self.secondary,
        }
    }

    pub(crate) fn bitmaps_mut(&mut self) -> (&mut [u8], &mut [u8]) {
        (&mut self.primary, &mut self.secondary)
    }

    pub fn into_raw(self) -> (Vec<u8>, Vec<u8>) {
        (self.primary, self.secondary)
    }

    /// Pixel under a UV coordinate. UVs outside [0, 1] clamp to the edge.
    pub fn pixel_at(&self, u: f32, v: f32) -> (usize, usize) {
        let res = self.resolution;
        let last = res.saturating_sub(1);
        let to_pixel = |t: f32| ((t.clamp(0.0, 1.0) * res as f32).floor() as usize).min(last);
        (to_pixel(u), to_pixel(v))
    }

    /// Primary and secondary bytes of a pixel, `None` outside the field.
    fn pixel(&self, x: usize, y: usize) -> Option<(&[u8], &[u8])> {
        if x >= self.resolution || y >= self.resolution {
            return None;
        }
        let base = (x + y * self.resolution) * CHANNELS;
        let range = base..base + CHANNELS;
        Some((self.primary.get(range.clone())?, self.secondary.get(range)?))
    }

    /// Stored byte for `biome` at a pixel. Always 0 for the base biome and
    /// for pixels outside the field.
    pub fn stored(&self, x: usize, y: usize, biome: u8) -> u8 {
        let (Some((bitmap, channel)), Some((primary, secondary))) = (channel_for(biome), self.pixel(x, y)) else {
            return 0;
        };
        match bitmap {
            Bitmap::Primary => primary[channel],
            Bitmap::Secondary => secondary[channel],
        }
    }

    /// Explicit (non-base) influences at a UV coordinate.
    pub fn sample(&self, u: f32, v: f32) -> Vec<BiomeWeight> {
        let (x, y) = self.pixel_at(u, v);
        self.sample_pixel(x, y)
    }

    /// Explicit (non-base) influences at a pixel. Zero bytes are absent, as
    /// is everything outside the field.
    pub fn sample_pixel(&self, x: usize, y: usize) -> Vec<BiomeWeight> {
        match self.pixel(x, y) {
            Some((primary, secondary)) => decode_pixel(primary, secondary),
            None => Vec::new(),
        }
    }

    /// Implicit base-biome weight at a UV coordinate.
    pub fn base_weight(&self, u: f32, v: f32) -> f32 {
        remainder(&self.sample(u, v))
    }

    /// Biome with the largest weight at every pixel, base biome included.
    pub fn dominant_biomes(&self) -> Tilemap<u8> {
        let res = self.resolution;
        let mut map = Tilemap::new_with(res, res, BASE_BIOME);
        for y in 0..res {
            for x in 0..res {
                let explicit = self.sample_pixel(x, y);
                let mut best = (BASE_BIOME, remainder(&explicit));
                for w in explicit {
                    if w.weight > best.1 {
                        best = (w.biome, w.weight);
                    }
                }
                map.set(x, y, best.0);
            }
        }
        map
    }
}

/// Weight left for the base biome after the explicit entries.
pub fn remainder(explicit: &[BiomeWeight]) -> f32 {
    (1.0 - explicit.iter().map(|w| w.weight).sum::<f32>()).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_layout() {
        assert_eq!(channel_for(0), None);
        assert_eq!(channel_for(1), Some((Bitmap::Primary, 1)));
        assert_eq!(channel_for(3), Some((Bitmap::Primary, 3)));
        assert_eq!(channel_for(4), Some((Bitmap::Secondary, 0)));
        assert_eq!(channel_for(7), Some((Bitmap::Secondary, 3)));
        assert_eq!(channel_for(8), None);
    }

    #[test]
    fn test_quantization_error_is_bounded() {
        for i in 0..=1000 {
            let w = i as f32 / 1000.0;
            let back = dequantize(quantize(w));
            assert!((back - w).abs() <= 1.0 / 255.0, "w={} back={}", w, back);
        }
        assert_eq!(quantize(-0.2), 0);
        assert_eq!(quantize(1.7), 255);
        assert_eq!(quantize(f32::NAN), 0);
    }

    #[test]
    fn test_base_only_field_decodes_empty() {
        let mut field = PackedInfluenceField::empty(4);
        let (primary, secondary) = field.bitmaps_mut();
        for (p, s) in primary.chunks_mut(CHANNELS).zip(secondary.chunks_mut(CHANNELS)) {
            encode_pixel(&[BiomeWeight::new(0, 1.0)], p, s).unwrap();
        }
        assert!(field.bitmap(Bitmap::Primary).iter().all(|&b| b == 0));
        assert!(field.bitmap(Bitmap::Secondary).iter().all(|&b| b == 0));
        for y in 0..4 {
            for x in 0..4 {
                assert!(field.sample_pixel(x, y).is_empty());
            }
        }
        assert_eq!(field.base_weight(0.5, 0.5), 1.0);
    }

    #[test]
    fn test_encode_then_sample_pixel() {
        let mut field = PackedInfluenceField::empty(2);
        {
            let (primary, secondary) = field.bitmaps_mut();
            let weights = [
                BiomeWeight::new(0, 0.25),
                BiomeWeight::new(2, 0.5),
                BiomeWeight::new(6, 0.25),
            ];
            // pixel (1, 1) -> index 3
            encode_pixel(&weights, &mut primary[12..16], &mut secondary[12..16]).unwrap();
        }
        assert_eq!(field.stored(1, 1, 0), 0);
        assert_eq!(field.stored(1, 1, 2), 128);
        assert_eq!(field.stored(1, 1, 6), 64);

        let decoded = field.sample(0.99, 0.99);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].biome, 2);
        assert_eq!(decoded[1].biome, 6);
        assert!((field.base_weight(1.0, 1.0) - 0.25).abs() <= 2.0 / 255.0);
        assert!(field.sample(0.0, 0.0).is_empty());
    }

    #[test]
    fn test_encode_rejects_index_eight() {
        let mut p = [0u8; 4];
        let mut s = [0u8; 4];
        let err = encode_pixel(&[BiomeWeight::new(8, 1.0)], &mut p, &mut s).unwrap_err();
        assert!(matches!(err, TerrainError::BiomeIndexOutOfRange { index: 8 }));
    }

    #[test]
    fn test_encode_overwrites_previous_pixel() {
        let mut p = [9u8; 4];
        let mut s = [9u8; 4];
        encode_pixel(&[BiomeWeight::new(5, 1.0)], &mut p, &mut s).unwrap();
        assert_eq!(p, [0, 0, 0, 0]);
        assert_eq!(s, [0, 255, 0, 0]);
    }

    #[test]
    fn test_pixel_at_clamps_uv() {
        let field = PackedInfluenceField::empty(8);
        assert_eq!(field.pixel_at(0.0, 0.0), (0, 0));
        assert_eq!(field.pixel_at(1.0, 1.0), (7, 7));
        assert_eq!(field.pixel_at(-1.0, 0.5), (0, 4));
    }

    #[test]
    fn test_from_raw_checks_length() {
        assert!(PackedInfluenceField::from_raw(2, vec![0; 16], vec![0; 16]).is_ok());
        assert!(matches!(
            PackedInfluenceField::from_raw(2, vec![0; 16], vec![0; 12]),
            Err(TerrainError::FieldSizeMismatch { expected: 16, actual: 12, .. })
        ));
    }

    #[test]
    fn test_zero_resolution_is_rejected() {
        assert!(matches!(
            PackedInfluenceField::from_raw(0, vec![], vec![]),
            Err(TerrainError::EmptyField)
        ));
        let field = PackedInfluenceField::empty(0);
        assert_eq!(field.resolution(), 1);
        assert!(field.sample(0.5, 0.5).is_empty());
    }

    #[test]
    fn test_pixels_outside_field_are_empty() {
        let mut field = PackedInfluenceField::empty(2);
        {
            let (p, s) = field.bitmaps_mut();
            for (p, s) in p.chunks_mut(CHANNELS).zip(s.chunks_mut(CHANNELS)) {
                encode_pixel(&[BiomeWeight::new(4, 1.0)], p, s).unwrap();
            }
        }
        assert_eq!(field.stored(1, 1, 4), 255);
        // (2, 0) would alias pixel (0, 1) with naive indexing
        assert_eq!(field.stored(2, 0, 4), 0);
        assert!(field.sample_pixel(2, 0).is_empty());
        assert!(field.sample_pixel(0, 9).is_empty());
    }

    #[test]
    fn test_requantize_matches_stored_pixel() {
        let weights = [
            BiomeWeight::new(3, 0.61),
            BiomeWeight::new(0, 0.2),
            BiomeWeight::new(5, 0.19),
        ];
        let mut field = PackedInfluenceField::empty(1);
        {
            let (p, s) = field.bitmaps_mut();
            encode_pixel(&weights, p, s).unwrap();
        }
        assert_eq!(requantize(&weights).unwrap(), field.sample_pixel(0, 0));
        assert!(requantize(&[BiomeWeight::new(9, 1.0)]).is_err());
    }

    #[test]
    fn test_dominant_biome_includes_base() {
        let mut field = PackedInfluenceField::empty(1);
        {
            let (p, s) = field.bitmaps_mut();
            encode_pixel(&[BiomeWeight::new(0, 0.6), BiomeWeight::new(3, 0.4)], p, s).unwrap();
        }
        assert_eq!(*field.dominant_biomes().get(0, 0), 0);
    }
}
