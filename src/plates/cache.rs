//! Compute-once plate cache.
//!
//! Plates are expensive to grow and never change, so each one is built on
//! first request and shared for the lifetime of the world. Concurrent
//! requests for the same plate wait on the first builder instead of racing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::config::{RiverConfig, WorldParams};
use crate::fields::ChunkField;
use crate::seeds::WorldSeeds;

use super::generation::TectonicPlate;
use super::types::PlateCoord;

/// Everything needed to build a plate.
#[derive(Clone)]
pub struct PlateGenerator {
    pub config: Arc<RiverConfig>,
    pub world: WorldParams,
    pub seeds: WorldSeeds,
    pub ocean: Arc<dyn ChunkField>,
}

impl PlateGenerator {
    pub fn new(config: Arc<RiverConfig>, world: WorldParams, ocean: Arc<dyn ChunkField>) -> Self {
        Self {
            config,
            world,
            seeds: WorldSeeds::from_master(world.seed),
            ocean,
        }
    }

    pub fn generate(&self, coord: PlateCoord) -> TectonicPlate {
        TectonicPlate::generate(coord, &self.config, &self.world, &self.seeds, self.ocean.as_ref())
    }
}

/// Cache statistics for monitoring
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served by an already cached (or in-flight) plate
    pub hits: usize,
    /// Requests that created a new cache slot
    pub misses: usize,
    /// Plates actually built
    pub builds: usize,
    /// Cached plates
    pub plate_count: usize,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }

    /// Format as human-readable string
    pub fn summary(&self) -> String {
        format!(
            "Hits: {} | Misses: {} | Rate: {:.1}% | Builds: {} | Plates: {}",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.builds,
            self.plate_count,
        )
    }
}

type PlateSlot = Arc<OnceLock<Arc<TectonicPlate>>>;

/// Shared, thread-safe plate store.
pub struct PlateCache {
    generator: PlateGenerator,
    plates: Mutex<HashMap<PlateCoord, PlateSlot>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    builds: AtomicUsize,
}

impl PlateCache {
    pub fn new(generator: PlateGenerator) -> Self {
        Self {
            generator,
            plates: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &RiverConfig {
        &self.generator.config
    }

    pub fn world(&self) -> &WorldParams {
        &self.generator.world
    }

    pub fn seeds(&self) -> &WorldSeeds {
        &self.generator.seeds
    }

    /// The plate at `(plate_x, plate_z)`, building it on first use.
    ///
    /// The map lock is only held to find the slot; the build itself runs
    /// under the slot's `OnceLock`, so other plates stay available meanwhile.
    pub fn get_plate(&self, plate_x: i32, plate_z: i32) -> Arc<TectonicPlate> {
        let coord = PlateCoord::new(plate_x, plate_z);
        let slot = {
            let mut plates = self.plates.lock().unwrap_or_else(PoisonError::into_inner);
            match plates.get(&coord) {
                Some(slot) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    Arc::clone(slot)
                }
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    let slot = PlateSlot::default();
                    plates.insert(coord, Arc::clone(&slot));
                    slot
                }
            }
        };

        let plate = slot.get_or_init(|| {
            self.builds.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(plate = %coord, "building plate");
            Arc::new(self.generator.generate(coord))
        });
        Arc::clone(plate)
    }

    /// Plate containing world block `(world_x, world_z)`.
    pub fn plate_at_block(&self, world_x: i32, world_z: i32) -> Arc<TectonicPlate> {
        let coord = PlateCoord::containing(world_x, world_z, self.config().plate_size());
        self.get_plate(coord.x, coord.z)
    }

    /// Number of plates built so far.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CacheStats {
        let plate_count = self
            .plates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.build_count(),
            plate_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn cache() -> PlateCache {
        let config = Arc::new(RiverConfig {
            zones_in_plate: 4,
            ..Default::default()
        });
        let ocean: Arc<dyn ChunkField> = Arc::new(|x: i32, _z: i32| if x < 256 { 200.0 } else { 0.0 });
        PlateCache::new(PlateGenerator::new(config, WorldParams::default(), ocean))
    }

    #[test]
    fn test_same_plate_is_shared() {
        let cache = cache();
        let a = cache.get_plate(0, 0);
        let b = cache.get_plate(0, 0);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.build_count(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.plate_count, 1);
    }

    #[test]
    fn test_distinct_plates_build_separately() {
        let cache = cache();
        let a = cache.get_plate(0, 0);
        let b = cache.get_plate(1, 0);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(b.coord, PlateCoord::new(1, 0));
        assert_eq!(cache.build_count(), 2);
    }

    #[test]
    fn test_concurrent_requests_build_once() {
        let cache = Arc::new(cache());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_plate(3, -2))
            })
            .collect();

        let plates: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for plate in &plates[1..] {
            assert!(Arc::ptr_eq(&plates[0], plate));
        }
        assert_eq!(cache.build_count(), 1);
    }

    #[test]
    fn test_plate_at_block_uses_floor_division() {
        let cache = cache();
        let plate = cache.plate_at_block(-1, 5);
        assert_eq!(plate.coord, PlateCoord::new(-1, 0));
    }
}
