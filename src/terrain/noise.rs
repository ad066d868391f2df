//! Noise used by the terrain carver.
//!
//! - `TerrainNoise`: bounded multi-octave 3D noise evaluated per column
//! - `DistortionNoise`: horizontal warp applied before sampling terrain
//! - `UpheavalNoise`: large-scale vertical displacement
//! - `ValleyNoise`: jitter for how far river valleys reach

use noise::{NoiseFn, Perlin, Seedable};

use crate::config::WorldParams;
use crate::fields::fbm;
use crate::geometry::Vec2;
use crate::seeds::{noise_seed, WorldSeeds};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Frequency of the lowest terrain octave at a 256-block world height
const TERRAIN_BASE_FREQUENCY: f64 = 0.001;

/// Vertical frequency relative to horizontal
const VERTICAL_FREQUENCY: f64 = 0.25;

/// Horizontal scale of distortion and upheaval inputs
const WARP_SCALE: f64 = 400.0;

const DISTORTION_AMPLITUDES: [f64; 4] = [55.0, 40.0, 30.0, 10.0];
const DISTORTION_FREQUENCIES: [f64; 4] = [1.0 / 5.0, 1.0 / 2.5, 1.0 / 1.25, 1.0 / 0.65];

/// Largest distortion magnitude the octaves can produce
pub const MAX_DISTORTION: f64 = 55.0 + 40.0 + 30.0 + 10.0;

pub const TERRAIN_DISTORTION_MULTIPLIER: f64 = 4.0;
pub const TERRAIN_DISTORTION_THRESHOLD: f64 = 40.0;
pub const GEO_DISTORTION_MULTIPLIER: f64 = 10.0;
pub const GEO_DISTORTION_THRESHOLD: f64 = 10.0;

const UPHEAVAL_AMPLITUDES: [f64; 6] = [55.0, 40.0, 30.0, 15.0, 7.0, 4.0];
const UPHEAVAL_FREQUENCIES: [f64; 6] = [
    1.0 / 5.5,
    1.1 / 2.75,
    1.2 / 1.375,
    1.2 / 0.715,
    1.2 / 0.45,
    1.2 / 0.25,
];

const VALLEY_FREQUENCY: f64 = 0.0008;

/// Geo upheaval taper divisor: amplitude modifier times amplitude
const GEO_TAPER_DIVISOR: f64 = 40.0 * 255.0;

/// Horizontal noise scale for a world height.
pub fn noise_scale(map_height: i32) -> f64 {
    (map_height as f64 / 256.0).max(1.0)
}

// =============================================================================
// TERRAIN NOISE
// =============================================================================

/// Multi-octave 3D noise. Each octave has its own Perlin instance at twice the
/// frequency of the previous one.
#[derive(Clone)]
pub struct TerrainNoise {
    octaves: Vec<Perlin>,
    base_frequency: f64,
}

impl TerrainNoise {
    pub fn new(seed: u64, octaves: usize, map_height: i32) -> Self {
        let base = noise_seed(seed);
        Self {
            octaves: (0..octaves)
                .map(|i| Perlin::new(1).set_seed(base.wrapping_add(i as u32)))
                .collect(),
            base_frequency: TERRAIN_BASE_FREQUENCY / noise_scale(map_height),
        }
    }

    pub fn octave_count(&self) -> usize {
        self.octaves.len()
    }

    /// Prepare the noise for one column with the given per-octave tables.
    pub fn column<'a>(
        &'a self,
        world_x: f64,
        world_z: f64,
        amplitudes: &'a [f64],
        thresholds: &'a [f64],
    ) -> ColumnNoise<'a> {
        let count = self.octaves.len().min(amplitudes.len()).min(thresholds.len());
        let total: f64 = amplitudes[..count].iter().sum();

        let (bound_min, bound_max) = if total > 0.0 {
            let mut min = 0.0;
            let mut max = 0.0;
            for i in 0..count {
                min += amplitudes[i] * (-1.0 - thresholds[i]);
                max += amplitudes[i] * (1.0 - thresholds[i]);
            }
            (min / total, max / total)
        } else {
            (0.0, 0.0)
        };

        ColumnNoise {
            noise: self,
            x: world_x,
            z: world_z,
            amplitudes: &amplitudes[..count],
            thresholds: &thresholds[..count],
            total,
            bound_min,
            bound_max,
        }
    }
}

/// Terrain noise fixed to one column. Values always lie within
/// `[bound_min, bound_max]`, which lets the carver skip sampling where the
/// height threshold alone decides solidity.
pub struct ColumnNoise<'a> {
    noise: &'a TerrainNoise,
    x: f64,
    z: f64,
    amplitudes: &'a [f64],
    thresholds: &'a [f64],
    total: f64,
    bound_min: f64,
    bound_max: f64,
}

impl ColumnNoise<'_> {
    pub fn bound_min(&self) -> f64 {
        self.bound_min
    }

    pub fn bound_max(&self) -> f64 {
        self.bound_max
    }

    pub fn value(&self, y: f64) -> f64 {
        if self.total <= 0.0 {
            return 0.0;
        }

        let mut sum = 0.0;
        let mut frequency = self.noise.base_frequency;
        for (i, perlin) in self.noise.octaves.iter().enumerate().take(self.amplitudes.len()) {
            let amplitude = self.amplitudes[i];
            if amplitude != 0.0 {
                let n = perlin
                    .get([self.x * frequency, y * frequency * VERTICAL_FREQUENCY, self.z * frequency])
                    .clamp(-1.0, 1.0);
                sum += amplitude * (n - self.thresholds[i]);
            }
            frequency *= 2.0;
        }
        sum / self.total
    }

    /// Solid where the noise exceeds the height threshold.
    pub fn is_solid(&self, y: f64, threshold: f64) -> bool {
        self.value(y) > threshold
    }
}

// =============================================================================
// DISTORTION
// =============================================================================

/// Two independent octave sums giving a horizontal warp vector.
#[derive(Clone)]
pub struct DistortionNoise {
    x: Perlin,
    z: Perlin,
    frequencies: [f64; 4],
}

impl DistortionNoise {
    pub fn new(seed_x: u64, seed_z: u64, map_height: i32) -> Self {
        let scale = noise_scale(map_height);
        Self {
            x: Perlin::new(1).set_seed(noise_seed(seed_x)),
            z: Perlin::new(1).set_seed(noise_seed(seed_z)),
            frequencies: DISTORTION_FREQUENCIES.map(|f| f / scale),
        }
    }

    /// Raw warp at a world position; magnitude per axis up to `MAX_DISTORTION`.
    pub fn sample(&self, world_x: f64, world_z: f64) -> Vec2 {
        let nx = world_x / WARP_SCALE;
        let nz = world_z / WARP_SCALE;
        let mut dist = Vec2::ZERO;
        for (amplitude, frequency) in DISTORTION_AMPLITUDES.iter().zip(self.frequencies) {
            let p = [nx * frequency, nz * frequency];
            dist.x += amplitude * self.x.get(p);
            dist.y += amplitude * self.z.get(p);
        }
        dist
    }

    /// Small scalar jitter, used for surface temperature.
    pub fn jitter(&self, world_x: f64, world_z: f64) -> f64 {
        // Offset off the lattice, where Perlin is always zero
        self.x.get([world_x * 0.1 + 0.37, world_z * 0.1 + 0.71])
    }

    /// 3D roughness for the seam against neighbouring chunks.
    pub fn border_jitter(&self, world_x: f64, y: f64, world_z: f64) -> f64 {
        self.x.get([-world_x / 10.0 + 0.37, y / 10.0 + 0.53, -world_z / 10.0 + 0.71])
    }
}

/// Cut distortion off in a circle: zero below `threshold`, easing up to
/// `maximum - threshold` at `maximum`.
pub fn isotropic_threshold(dist: Vec2, threshold: f64, maximum: f64) -> Vec2 {
    let magnitude_sq = dist.dot(dist);
    let threshold_sq = threshold * threshold;
    if magnitude_sq <= threshold_sq {
        return Vec2::ZERO;
    }

    let base_curve = (magnitude_sq - threshold_sq) / magnitude_sq;
    let maximum_sq = maximum * maximum;
    let reciprocal_at_maximum = maximum_sq / (maximum_sq - threshold_sq);
    let slide = base_curve * reciprocal_at_maximum;
    let slide = slide * slide;

    let force_down = slide * ((maximum - threshold) / maximum);
    dist * force_down
}

// =============================================================================
// UPHEAVAL AND VALLEYS
// =============================================================================

/// Normalized octave noise for geologic upheaval.
#[derive(Clone)]
pub struct UpheavalNoise {
    perlin: Perlin,
    frequencies: [f64; 6],
}

impl UpheavalNoise {
    pub fn new(seed: u64, map_height: i32) -> Self {
        let scale = noise_scale(map_height);
        Self {
            perlin: Perlin::new(1).set_seed(noise_seed(seed)),
            frequencies: UPHEAVAL_FREQUENCIES.map(|f| f / scale),
        }
    }

    /// Noise in roughly [-1, 1].
    pub fn value(&self, x: f64, z: f64) -> f64 {
        let total: f64 = UPHEAVAL_AMPLITUDES.iter().sum();
        let mut sum = 0.0;
        for (amplitude, frequency) in UPHEAVAL_AMPLITUDES.iter().zip(self.frequencies) {
            sum += amplitude * self.perlin.get([x * frequency, z * frequency]);
        }
        sum / total
    }

    /// Vertical displacement from upheaval; never positive.
    pub fn y_offset(&self, strength: f64, world_x: f64, world_z: f64, geo: Vec2) -> f64 {
        let n = self.value((world_x + geo.x) / WARP_SCALE, (world_z + geo.y) / WARP_SCALE) * 0.9;
        strength * (0.5 - n).min(0.0)
    }
}

/// Raise the threshold near the world ceiling where upheaval lifted terrain,
/// so it does not clip into the top of the map.
pub fn geo_upheaval_taper(pos_y: f64, dist_y: f64, taper_threshold: f64, map_height: f64) -> f64 {
    if pos_y > taper_threshold && dist_y < -2.0 {
        let amount = (-dist_y).clamp(pos_y - map_height, pos_y);
        let ceiling_delta = pos_y - taper_threshold;
        ceiling_delta * amount / GEO_TAPER_DIVISOR
    } else {
        0.0
    }
}

/// Two-octave valley jitter.
#[derive(Clone)]
pub struct ValleyNoise {
    perlin: Perlin,
}

impl ValleyNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            perlin: Perlin::new(1).set_seed(noise_seed(seed)),
        }
    }

    pub fn value(&self, world_x: f64, world_z: f64) -> f64 {
        fbm(
            &self.perlin,
            world_x * VALLEY_FREQUENCY,
            world_z * VALLEY_FREQUENCY,
            2,
            0.5,
            2.0,
        )
    }
}

/// All noise sources of one world.
#[derive(Clone)]
pub struct WorldNoise {
    pub terrain: TerrainNoise,
    pub distortion: DistortionNoise,
    pub upheaval: UpheavalNoise,
    pub valley: ValleyNoise,
}

impl WorldNoise {
    pub fn new(seeds: &WorldSeeds, world: &WorldParams, octaves: usize) -> Self {
        Self {
            terrain: TerrainNoise::new(seeds.terrain, octaves, world.map_height),
            distortion: DistortionNoise::new(seeds.distort_x, seeds.distort_z, world.map_height),
            upheaval: UpheavalNoise::new(seeds.upheaval, world.map_height),
            valley: ValleyNoise::new(seeds.valley),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_noise_stays_in_bounds() {
        let noise = TerrainNoise::new(7, 9, 256);
        let amps = [0.2, 0.3, 0.4, 0.45, 0.3, 0.2, 0.1, 0.05, 0.02];
        let thresholds = [0.0, 0.1, 0.0, -0.2, 0.0, 0.0, 0.3, 0.0, 0.0];
        let column = noise.column(1234.0, -567.0, &amps, &thresholds);

        assert!(column.bound_min() < column.bound_max());
        for y in 0..256 {
            let v = column.value(y as f64);
            assert!(v >= column.bound_min() - 1e-9 && v <= column.bound_max() + 1e-9);
        }
    }

    #[test]
    fn test_zero_amplitudes_give_flat_noise() {
        let noise = TerrainNoise::new(7, 9, 256);
        let zeros = [0.0; 9];
        let column = noise.column(0.0, 0.0, &zeros, &zeros);
        assert_eq!(column.bound_min(), 0.0);
        assert_eq!(column.bound_max(), 0.0);
        assert!(column.is_solid(10.0, -0.5));
        assert!(!column.is_solid(10.0, 0.5));
    }

    #[test]
    fn test_isotropic_threshold() {
        let small = isotropic_threshold(Vec2::new(3.0, 4.0), 10.0, 100.0);
        assert_eq!(small, Vec2::ZERO);

        // At the maximum the output magnitude is maximum - threshold
        let max = isotropic_threshold(Vec2::new(100.0, 0.0), 10.0, 100.0);
        assert!((max.length() - 90.0).abs() < 1e-9);

        let mid = isotropic_threshold(Vec2::new(0.0, 50.0), 10.0, 100.0);
        assert!(mid.x == 0.0 && mid.y > 0.0 && mid.y < 50.0);
    }

    #[test]
    fn test_upheaval_offset_never_positive() {
        let upheaval = UpheavalNoise::new(3, 256);
        for i in 0..50 {
            let x = i as f64 * 97.0;
            assert!(upheaval.y_offset(120.0, x, -x, Vec2::ZERO) <= 0.0);
        }
    }

    #[test]
    fn test_geo_taper_only_near_ceiling() {
        assert_eq!(geo_upheaval_taper(100.0, -10.0, 230.0, 256.0), 0.0);
        assert_eq!(geo_upheaval_taper(240.0, 5.0, 230.0, 256.0), 0.0);
        assert!(geo_upheaval_taper(240.0, -10.0, 230.0, 256.0) > 0.0);
    }
}
