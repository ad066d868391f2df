//! Coarse 2D world fields supplied by the host (ocean potential, upheaval,
//! climate temperature).
//!
//! The host stores these per region at a resolution coarser than a chunk, so
//! a consumer only ever sees the four values at a chunk's corners and
//! interpolates between them.

use noise::{NoiseFn, Perlin, Seedable};

use crate::geometry::bilerp;
use crate::seeds::noise_seed;

/// Chunk edge length in blocks.
pub const CHUNK_SIZE: i32 = 32;

/// Field values at the four corners of one chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Corners {
    pub top_left: f64,
    pub top_right: f64,
    pub bottom_left: f64,
    pub bottom_right: f64,
}

impl Corners {
    pub fn uniform(value: f64) -> Self {
        Self {
            top_left: value,
            top_right: value,
            bottom_left: value,
            bottom_right: value,
        }
    }

    /// Interpolate at fractional chunk position `(fx, fz)` in `[0, 1]`.
    pub fn bilerp(&self, fx: f64, fz: f64) -> f64 {
        bilerp(self.top_left, self.top_right, self.bottom_left, self.bottom_right, fx, fz)
    }
}

/// A 2D field sampled per chunk.
pub trait ChunkField: Send + Sync {
    fn corners(&self, chunk_x: i32, chunk_z: i32) -> Corners;

    /// Bilinear sample at a world block position.
    fn sample_block(&self, world_x: i32, world_z: i32) -> f64 {
        let chunk_x = world_x.div_euclid(CHUNK_SIZE);
        let chunk_z = world_z.div_euclid(CHUNK_SIZE);
        let fx = world_x.rem_euclid(CHUNK_SIZE) as f64 / CHUNK_SIZE as f64;
        let fz = world_z.rem_euclid(CHUNK_SIZE) as f64 / CHUNK_SIZE as f64;
        self.corners(chunk_x, chunk_z).bilerp(fx, fz)
    }
}

/// Any `Fn(world_x, world_z) -> value` evaluated at the chunk corners.
impl<F> ChunkField for F
where
    F: Fn(i32, i32) -> f64 + Send + Sync,
{
    fn corners(&self, chunk_x: i32, chunk_z: i32) -> Corners {
        let x0 = chunk_x * CHUNK_SIZE;
        let z0 = chunk_z * CHUNK_SIZE;
        Corners {
            top_left: self(x0, z0),
            top_right: self(x0 + CHUNK_SIZE, z0),
            bottom_left: self(x0, z0 + CHUNK_SIZE),
            bottom_right: self(x0 + CHUNK_SIZE, z0 + CHUNK_SIZE),
        }
    }
}

/// The same value everywhere.
#[derive(Clone, Copy, Debug)]
pub struct ConstantField(pub f64);

impl ChunkField for ConstantField {
    fn corners(&self, _chunk_x: i32, _chunk_z: i32) -> Corners {
        Corners::uniform(self.0)
    }
}

/// Perlin fBm field, `offset + amplitude * fbm(pos * frequency)`.
///
/// Stands in for a host field when generating outside a game world.
#[derive(Clone)]
pub struct NoiseField {
    perlin: Perlin,
    pub frequency: f64,
    pub amplitude: f64,
    pub offset: f64,
    pub octaves: u32,
}

impl NoiseField {
    pub fn new(seed: u64, frequency: f64, amplitude: f64, offset: f64) -> Self {
        Self {
            perlin: Perlin::new(1).set_seed(noise_seed(seed)),
            frequency,
            amplitude,
            offset,
            octaves: 4,
        }
    }

    pub fn with_octaves(mut self, octaves: u32) -> Self {
        self.octaves = octaves.max(1);
        self
    }

    pub fn value(&self, world_x: f64, world_z: f64) -> f64 {
        let n = fbm(
            &self.perlin,
            world_x * self.frequency,
            world_z * self.frequency,
            self.octaves,
            0.5,
            2.0,
        );
        self.offset + self.amplitude * n
    }
}

impl ChunkField for NoiseField {
    fn corners(&self, chunk_x: i32, chunk_z: i32) -> Corners {
        let x0 = (chunk_x * CHUNK_SIZE) as f64;
        let z0 = (chunk_z * CHUNK_SIZE) as f64;
        let size = CHUNK_SIZE as f64;
        Corners {
            top_left: self.value(x0, z0),
            top_right: self.value(x0 + size, z0),
            bottom_left: self.value(x0, z0 + size),
            bottom_right: self.value(x0 + size, z0 + size),
        }
    }
}

/// Fractal Brownian Motion, normalized to roughly [-1, 1].
pub fn fbm(noise: &Perlin, x: f64, y: f64, octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
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

    if max_value > 0.0 {
        total / max_value
    } else {
        0.0
    }
}
