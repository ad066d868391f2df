//! Seed management for river and terrain generation
//!
//! Every noise field and the per-plate river automaton get their own seed,
//! derived from the world seed so that changing one system never reshuffles
//! another.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seeds for all generation systems.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldSeeds {
    /// World seed (used for display/reference)
    pub master: u64,
    /// River growth automaton (combined with plate coordinates)
    pub rivers: u64,
    /// Multi-octave 3D terrain noise
    pub terrain: u64,
    /// Horizontal terrain distortion, X component
    pub distort_x: u64,
    /// Horizontal terrain distortion, Z component
    pub distort_z: u64,
    /// Geologic upheaval noise
    pub upheaval: u64,
    /// Valley floor jitter around rivers
    pub valley: u64,
}

impl WorldSeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            rivers: derive_seed(master, "rivers"),
            terrain: derive_seed(master, "terrain"),
            distort_x: derive_seed(master, "distort_x"),
            distort_z: derive_seed(master, "distort_z"),
            upheaval: derive_seed(master, "upheaval"),
            valley: derive_seed(master, "valley"),
        }
    }

    /// Random source for the plate at `(plate_x, plate_z)`.
    pub fn plate_rng(&self, plate_x: i32, plate_z: i32) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(position_seed(self.rivers, plate_x, plate_z))
    }
}

/// Derive a sub-seed from a master seed and a system name.
fn derive_seed(master: u64, system: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    system.hash(&mut hasher);
    hasher.finish()
}

/// Seed for a grid position, reproducible from the base seed alone.
pub fn position_seed(base: u64, x: i32, z: i32) -> u64 {
    let mut hasher = DefaultHasher::new();
    base.hash(&mut hasher);
    x.hash(&mut hasher);
    z.hash(&mut hasher);
    hasher.finish()
}

/// Truncate a 64-bit seed for the `noise` crate.
pub fn noise_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

impl std::fmt::Display for WorldSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WorldSeeds {{ master: {}, rivers: {}, terrain: {}, distort: ({}, {}), \
             upheaval: {}, valley: {} }}",
            self.master,
            self.rivers,
            self.terrain,
            self.distort_x,
            self.distort_z,
            self.upheaval,
            self.valley,
        )
    }
}
