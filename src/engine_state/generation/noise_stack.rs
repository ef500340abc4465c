//! # Noise Stack
//!
//! The five fractal noise samplers the terrain generator draws from:
//! continentalness, erosion, weirdness, temperature and humidity. Each
//! sampler is an independent fractal-Brownian Perlin instance seeded with the
//! world seed plus a per-parameter offset, so regenerating with a new seed
//! moves every layer at once while keeping the layers decorrelated.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::Deserialize;

fn default_frequency() -> f64 {
    0.002
}
fn default_octaves() -> usize {
    4
}
fn default_lacunarity() -> f64 {
    2.0
}
fn default_gain() -> f64 {
    0.5
}

/// Settings for one fractal sampler.
#[derive(Clone, Debug, Deserialize)]
pub struct NoiseOctaveSettings {
    /// Offset added to the world seed for this sampler.
    #[serde(default)]
    pub seed_offset: i32,
    /// Base frequency in block coordinates.
    #[serde(default = "default_frequency")]
    pub frequency: f64,
    /// Number of fractal octaves.
    #[serde(default = "default_octaves")]
    pub octaves: usize,
    /// Frequency multiplier between octaves.
    #[serde(default = "default_lacunarity")]
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    #[serde(default = "default_gain")]
    pub gain: f64,
}

impl NoiseOctaveSettings {
    /// Settings with a distinct seed offset and frequency, defaults elsewhere.
    pub fn with(seed_offset: i32, frequency: f64) -> Self {
        NoiseOctaveSettings {
            seed_offset,
            frequency,
            octaves: default_octaves(),
            lacunarity: default_lacunarity(),
            gain: default_gain(),
        }
    }
}

impl Default for NoiseOctaveSettings {
    fn default() -> Self {
        NoiseOctaveSettings::with(0, default_frequency())
    }
}

/// One configured fractal sampler.
pub struct NoiseLayer {
    fbm: Fbm<Perlin>,
}

impl NoiseLayer {
    /// Builds the sampler for a world seed. The per-layer seed offset is
    /// folded in with wrapping arithmetic so extreme seeds stay valid.
    pub fn new(world_seed: i32, settings: &NoiseOctaveSettings) -> Self {
        let seed = world_seed.wrapping_add(settings.seed_offset) as u32;
        let fbm = Fbm::<Perlin>::new(seed)
            .set_frequency(settings.frequency)
            .set_octaves(settings.octaves.max(1))
            .set_lacunarity(settings.lacunarity)
            .set_persistence(settings.gain);
        NoiseLayer { fbm }
    }

    /// Samples at global block coordinates. The result is clamped into
    /// [-1, 1]; fractal sums can overshoot slightly and downstream math
    /// assumes the closed interval.
    pub fn sample(&self, x: i32, y: i32) -> f32 {
        let value = self.fbm.get([x as f64, y as f64]);
        value.clamp(-1.0, 1.0) as f32
    }
}

/// Per-sampler settings for the whole stack.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NoiseStackSettings {
    /// Landmass sampler settings.
    pub continentalness: NoiseOctaveSettings,
    /// Flattening sampler settings.
    pub erosion: NoiseOctaveSettings,
    /// Weirdness sampler settings (peaks-and-valleys derives from this).
    pub weirdness: NoiseOctaveSettings,
    /// Climate temperature sampler settings.
    pub temperature: NoiseOctaveSettings,
    /// Climate humidity sampler settings.
    pub humidity: NoiseOctaveSettings,
}

impl Default for NoiseStackSettings {
    fn default() -> Self {
        // Low frequencies for the climate layers keep biomes broad; the
        // terrain-shaping layers vary faster.
        NoiseStackSettings {
            continentalness: NoiseOctaveSettings::with(0, 0.0015),
            erosion: NoiseOctaveSettings::with(1013, 0.003),
            weirdness: NoiseOctaveSettings::with(2027, 0.004),
            temperature: NoiseOctaveSettings::with(3041, 0.0008),
            humidity: NoiseOctaveSettings::with(4057, 0.0012),
        }
    }
}

/// The five samplers, built once per world seed and shared read-only across
/// generation tasks.
pub struct NoiseStack {
    /// Landmass sampler.
    pub continentalness: NoiseLayer,
    /// Flattening sampler.
    pub erosion: NoiseLayer,
    /// Weirdness sampler.
    pub weirdness: NoiseLayer,
    /// Temperature sampler.
    pub temperature: NoiseLayer,
    /// Humidity sampler.
    pub humidity: NoiseLayer,
}

impl NoiseStack {
    /// Builds every sampler for the given world seed.
    pub fn new(world_seed: i32, settings: &NoiseStackSettings) -> Self {
        NoiseStack {
            continentalness: NoiseLayer::new(world_seed, &settings.continentalness),
            erosion: NoiseLayer::new(world_seed, &settings.erosion),
            weirdness: NoiseLayer::new(world_seed, &settings.weirdness),
            temperature: NoiseLayer::new(world_seed, &settings.temperature),
            humidity: NoiseLayer::new(world_seed, &settings.humidity),
        }
    }
}

/// Folds raw weirdness into the peaks-and-valleys parameter:
/// `1 - |3|w| - 2|`, mapping weirdness extremes to peaks and the middle of
/// the range to valleys. Result is in [-1, 1].
pub fn peaks_valleys_from_weirdness(weirdness: f32) -> f32 {
    1.0 - ((3.0 * weirdness.abs()) - 2.0).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_is_deterministic_per_seed() {
        let settings = NoiseStackSettings::default();
        let a = NoiseStack::new(42, &settings);
        let b = NoiseStack::new(42, &settings);
        let c = NoiseStack::new(43, &settings);

        let pa = a.continentalness.sample(100, -250);
        assert_eq!(pa, b.continentalness.sample(100, -250));
        assert_ne!(pa, c.continentalness.sample(100, -250));
    }

    #[test]
    fn layers_are_decorrelated() {
        let settings = NoiseStackSettings::default();
        let stack = NoiseStack::new(7, &settings);
        assert_ne!(
            stack.continentalness.sample(10, 10),
            stack.erosion.sample(10, 10)
        );
    }

    #[test]
    fn samples_stay_in_range() {
        let settings = NoiseStackSettings::default();
        let stack = NoiseStack::new(1, &settings);
        for i in 0..64 {
            let v = stack.weirdness.sample(i * 37, i * -13);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn peaks_valleys_fold() {
        // Weirdness of +-2/3 folds to a peak, 0 folds to a valley floor.
        assert!((peaks_valleys_from_weirdness(2.0 / 3.0) - 1.0).abs() < 1e-6);
        assert!((peaks_valleys_from_weirdness(0.0) + 1.0).abs() < 1e-6);
        assert!((peaks_valleys_from_weirdness(1.0)).abs() < 1e-6);
    }
}
