//! Landform tables.
//!
//! A landform describes terrain shape with two tables: per-octave noise
//! amplitudes/thresholds, and a per-height solidity threshold. Columns blend
//! several landforms by weight; near rivers the weights shift toward the
//! river landform, which is flat and hugs sea level.

use noise::{Perlin, Seedable};

use crate::config::WorldParams;
use crate::fields::fbm;
use crate::seeds::noise_seed;

/// Octaves of terrain noise for a world height. Taller worlds get one more
/// octave per doubling.
pub fn octave_count(map_height: i32) -> usize {
    let ratio = (map_height as f64 / 256.0).max(1.0);
    9 + ratio.log2().floor() as usize
}

/// Octave amplitudes of the river landform; anything past these is zero.
const RIVER_OCTAVES: [f64; 9] = [0.0, 0.0, 0.0, 0.3, 0.25, 0.15, 0.05, 0.0, 0.0];

/// Blocks above sea level of the river landform keys and the chance of
/// solid ground at each.
const RIVER_KEY_BLOCKS: [f64; 4] = [0.0, 4.0, 6.0, 12.0];
const RIVER_KEY_PROBABILITIES: [f64; 4] = [1.0, 0.5, 0.25, 0.0];

#[derive(Clone, Debug, PartialEq)]
pub struct Landform {
    pub name: String,
    pub octave_amplitudes: Vec<f64>,
    pub octave_thresholds: Vec<f64>,
    /// Noise threshold per block height; solid where the noise exceeds it
    pub y_thresholds: Vec<f32>,
}

impl Landform {
    /// Build a landform from key heights (fractions of map height) and the
    /// probability of solid ground at each key.
    pub fn new(
        name: &str,
        amplitudes: &[f64],
        thresholds: &[f64],
        key_positions: &[f64],
        key_probabilities: &[f64],
        octaves: usize,
        map_height: i32,
    ) -> Self {
        Self {
            name: name.to_string(),
            octave_amplitudes: padded(amplitudes, octaves),
            octave_thresholds: padded(thresholds, octaves),
            y_thresholds: lerp_y_thresholds(key_positions, key_probabilities, map_height),
        }
    }

    /// Flat valley floor right around sea level.
    pub fn river(world: &WorldParams, octaves: usize) -> Self {
        let height = world.map_height as f64;
        let sea = world.sea_level as f64 / height;
        let keys: Vec<f64> = RIVER_KEY_BLOCKS.iter().map(|b| sea + b / height).collect();
        Self::new(
            "river",
            &RIVER_OCTAVES,
            &[],
            &keys,
            &RIVER_KEY_PROBABILITIES,
            octaves,
            world.map_height,
        )
    }

    pub fn y_threshold(&self, y: usize) -> f32 {
        self.y_thresholds[y.min(self.y_thresholds.len() - 1)]
    }
}

fn padded(values: &[f64], len: usize) -> Vec<f64> {
    (0..len).map(|i| values.get(i).copied().unwrap_or(0.0)).collect()
}

/// Turn key probabilities into a per-height threshold, `1 - 2p`, linearly
/// interpolated between keys and held flat past the ends.
fn lerp_y_thresholds(key_positions: &[f64], key_probabilities: &[f64], map_height: i32) -> Vec<f32> {
    let height = map_height.max(2) as usize;
    let keys = key_positions.len().min(key_probabilities.len());

    (0..height)
        .map(|y| {
            let pos = y as f64 / height as f64;
            let probability = if keys == 0 {
                0.0
            } else if pos <= key_positions[0] {
                key_probabilities[0]
            } else if pos >= key_positions[keys - 1] {
                key_probabilities[keys - 1]
            } else {
                let i = key_positions[..keys].iter().rposition(|&k| k <= pos).unwrap_or(0);
                let span = key_positions[i + 1] - key_positions[i];
                let t = if span > 0.0 { (pos - key_positions[i]) / span } else { 1.0 };
                key_probabilities[i] + (key_probabilities[i + 1] - key_probabilities[i]) * t
            };
            (1.0 - 2.0 * probability) as f32
        })
        .collect()
}

/// All landforms of a world plus the index of the river landform.
#[derive(Clone, Debug)]
pub struct Landforms {
    pub landforms: Vec<Landform>,
    pub river_index: usize,
    pub octaves: usize,
}

impl Landforms {
    /// Appends the river landform to `landforms`.
    pub fn new(mut landforms: Vec<Landform>, world: &WorldParams) -> Self {
        let octaves = octave_count(world.map_height);
        for landform in &mut landforms {
            landform.octave_amplitudes.resize(octaves, 0.0);
            landform.octave_thresholds.resize(octaves, 0.0);
        }
        let river_index = landforms.len();
        landforms.push(Landform::river(world, octaves));
        Self {
            landforms,
            river_index,
            octaves,
        }
    }

    /// Plains and hills, tuned for the sea level of `world`.
    pub fn standard(world: &WorldParams) -> Self {
        let octaves = octave_count(world.map_height);
        let sea = world.sea_level as f64 / world.map_height as f64;

        let plains = Landform::new(
            "plains",
            &[0.0, 0.0, 0.1, 0.2, 0.25, 0.15, 0.05, 0.02, 0.01],
            &[],
            &[sea, sea + 0.03, sea + 0.06],
            &[1.0, 0.5, 0.0],
            octaves,
            world.map_height,
        );
        let hills = Landform::new(
            "hills",
            &[0.2, 0.3, 0.4, 0.45, 0.3, 0.2, 0.1, 0.05, 0.02],
            &[],
            &[sea, sea + 0.08, sea + 0.2],
            &[1.0, 0.5, 0.0],
            octaves,
            world.map_height,
        );
        Self::new(vec![plains, hills], world)
    }

    pub fn len(&self) -> usize {
        self.landforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landforms.is_empty()
    }

    pub fn river(&self) -> &Landform {
        &self.landforms[self.river_index]
    }

    /// Weighted octave tables for a set of landform weights.
    pub fn interpolated_octaves(&self, weights: &[f32], amplitudes: &mut [f64], thresholds: &mut [f64]) {
        amplitudes.fill(0.0);
        thresholds.fill(0.0);
        for (landform, &weight) in self.landforms.iter().zip(weights) {
            if weight == 0.0 {
                continue;
            }
            let weight = weight as f64;
            for octave in 0..amplitudes.len().min(self.octaves) {
                amplitudes[octave] += landform.octave_amplitudes[octave] * weight;
                thresholds[octave] += landform.octave_thresholds[octave] * weight;
            }
        }
    }
}

/// Landform weights per world position.
pub trait LandformMap: Send + Sync {
    /// Fill `out` (one entry per landform) with weights summing to 1.
    fn weights_at(&self, world_x: f64, world_z: f64, out: &mut [f32]);
}

/// A single landform everywhere.
#[derive(Clone, Copy, Debug)]
pub struct UniformLandform(pub usize);

impl LandformMap for UniformLandform {
    fn weights_at(&self, _world_x: f64, _world_z: f64, out: &mut [f32]) {
        out.fill(0.0);
        if let Some(weight) = out.get_mut(self.0) {
            *weight = 1.0;
        }
    }
}

/// Two landforms blended by low-frequency noise.
#[derive(Clone)]
pub struct BlendedLandforms {
    perlin: Perlin,
    pub first: usize,
    pub second: usize,
    pub frequency: f64,
}

impl BlendedLandforms {
    pub fn new(seed: u64, first: usize, second: usize) -> Self {
        Self {
            perlin: Perlin::new(1).set_seed(noise_seed(seed)),
            first,
            second,
            frequency: 0.0015,
        }
    }
}

impl LandformMap for BlendedLandforms {
    fn weights_at(&self, world_x: f64, world_z: f64, out: &mut [f32]) {
        out.fill(0.0);
        let n = fbm(&self.perlin, world_x * self.frequency, world_z * self.frequency, 3, 0.5, 2.0);
        let t = ((n + 1.0) / 2.0).clamp(0.0, 1.0) as f32;
        if let Some(w) = out.get_mut(self.first) {
            *w += 1.0 - t;
        }
        if let Some(w) = out.get_mut(self.second) {
            *w += t;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octave_count_grows_with_height() {
        assert_eq!(octave_count(256), 9);
        assert_eq!(octave_count(512), 10);
        assert_eq!(octave_count(1024), 11);
        assert_eq!(octave_count(128), 9);
    }

    #[test]
    fn test_river_landform_keys() {
        let world = WorldParams::default();
        let river = Landform::river(&world, 9);
        let sea = world.sea_level as usize;

        // Always solid below sea level, never solid 12 blocks above
        assert_eq!(river.y_threshold(sea - 5), -1.0);
        assert_eq!(river.y_threshold(sea), -1.0);
        assert_eq!(river.y_threshold(sea + 4), 0.0);
        assert!((river.y_threshold(sea + 6) - 0.5).abs() < 1e-6);
        assert_eq!(river.y_threshold(sea + 12), 1.0);
        assert_eq!(river.y_threshold(sea + 40), 1.0);
        assert_eq!(river.octave_amplitudes[3], 0.3);
    }

    #[test]
    fn test_thresholds_rise_with_height() {
        let world = WorldParams::default();
        let landforms = Landforms::standard(&world);
        for landform in &landforms.landforms {
            for pair in landform.y_thresholds.windows(2) {
                assert!(pair[1] >= pair[0]);
            }
        }
        assert_eq!(landforms.river_index, 2);
        assert_eq!(landforms.river().name, "river");
    }

    #[test]
    fn test_interpolated_octaves_weighted_sum() {
        let world = WorldParams::default();
        let landforms = Landforms::standard(&world);
        let mut amps = vec![0.0; landforms.octaves];
        let mut thresholds = vec![0.0; landforms.octaves];
        landforms.interpolated_octaves(&[0.5, 0.5, 0.0], &mut amps, &mut thresholds);
        assert!((amps[3] - (0.2 + 0.45) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_landform_maps_sum_to_one() {
        let mut out = [0.0f32; 3];
        UniformLandform(1).weights_at(5.0, 5.0, &mut out);
        assert_eq!(out, [0.0, 1.0, 0.0]);

        let blended = BlendedLandforms::new(3, 0, 1);
        blended.weights_at(1234.0, -50.0, &mut out);
        assert!((out.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }
}
