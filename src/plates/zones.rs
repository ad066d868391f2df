//! Zone classification for a plate.
//!
//! Three passes over the zone grid:
//! 1. ocean or land from the host ocean potential at each zone center
//! 2. distance from every land zone to the closest ocean zone center
//! 3. coastal flag on ocean zones touching land

use crate::config::{RiverConfig, WorldParams};
use crate::fields::ChunkField;
use crate::tilemap::Tilemap;

use super::types::{PlateCoord, TectonicZone, OCEAN_DISTANCE};

/// The zone grid of one plate.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneGrid {
    zones: Tilemap<TectonicZone>,
    zone_size: i32,
}

impl ZoneGrid {
    /// Classify every zone of the plate at `coord`.
    pub fn build(
        coord: PlateCoord,
        config: &RiverConfig,
        world: &WorldParams,
        ocean: &dyn ChunkField,
    ) -> Self {
        let count = config.zones_in_plate as usize;
        let zone_size = config.zone_size;
        let zones = Tilemap::from_fn(count, count, |x, z| TectonicZone::new(x, z, zone_size));

        let mut grid = Self { zones, zone_size };
        grid.classify_ocean(coord, config, world, ocean);
        grid.compute_ocean_distance();
        grid.mark_coastal();
        grid
    }

    /// Build from an explicit ocean mask, indexed `[x][z]`. Used by tools and
    /// tests that want a hand-drawn coastline.
    pub fn from_ocean_mask(zone_size: i32, mask: &[Vec<bool>]) -> Self {
        let count = mask.len();
        let zones = Tilemap::from_fn(count, count, |x, z| {
            let mut zone = TectonicZone::new(x, z, zone_size);
            if mask[x].get(z).copied().unwrap_or(false) {
                zone.ocean = true;
                zone.ocean_distance = OCEAN_DISTANCE;
            }
            zone
        });

        let mut grid = Self { zones, zone_size };
        grid.compute_ocean_distance();
        grid.mark_coastal();
        grid
    }

    fn classify_ocean(
        &mut self,
        coord: PlateCoord,
        config: &RiverConfig,
        world: &WorldParams,
        ocean: &dyn ChunkField,
    ) {
        let (origin_x, origin_z) = coord.world_origin(config.plate_size());
        let factor = world.oceanicity_factor();

        for (_, _, zone) in self.zones.iter_mut() {
            let world_x = (origin_x + zone.center.x as i64) as i32;
            let world_z = (origin_z + zone.center.y as i64) as i32;
            let oceanicity = ocean.sample_block(world_x, world_z) * factor;

            if oceanicity > config.ocean_threshold {
                zone.ocean = true;
                zone.ocean_distance = OCEAN_DISTANCE;
            }
        }
    }

    fn compute_ocean_distance(&mut self) {
        let ocean_centers: Vec<_> = self
            .zones
            .values()
            .filter(|zone| zone.ocean)
            .map(|zone| zone.center)
            .collect();

        for (_, _, zone) in self.zones.iter_mut() {
            if zone.ocean {
                continue;
            }
            // Stays at MAX when the plate has no ocean at all
            zone.ocean_distance = ocean_centers
                .iter()
                .map(|center| zone.center.distance(*center))
                .fold(f64::MAX, f64::min);
        }
    }

    fn mark_coastal(&mut self) {
        let mut coastal = Vec::new();
        for (x, z, zone) in self.zones.iter() {
            if !zone.ocean {
                continue;
            }
            let near_land = self
                .zones
                .neighborhood(x, z, 1)
                .into_iter()
                .any(|(nx, nz)| !self.zones.get(nx, nz).ocean);
            if near_land {
                coastal.push((x, z));
            }
        }

        for (x, z) in coastal {
            self.zones.get_mut(x, z).coastal = true;
        }
    }

    pub fn count(&self) -> usize {
        self.zones.width
    }

    pub fn zone_size(&self) -> i32 {
        self.zone_size
    }

    pub fn zone(&self, x: usize, z: usize) -> &TectonicZone {
        self.zones.get(x, z)
    }

    /// Zone containing plate-local position `(local_x, local_z)`, clamped to
    /// the grid.
    pub fn zone_at(&self, local_x: f64, local_z: f64) -> &TectonicZone {
        let max = (self.count() - 1) as f64;
        let zx = (local_x / self.zone_size as f64).clamp(0.0, max) as usize;
        let zz = (local_z / self.zone_size as f64).clamp(0.0, max) as usize;
        self.zones.get(zx, zz)
    }

    /// Walk uphill from `(x, z)` for at most `hops` steps.
    ///
    /// Each step moves to the neighbour (or stays) with the largest ocean
    /// distance, taking the first maximum in x-major order. Stops early at a
    /// local maximum.
    pub fn find_highest_zone(&self, x: usize, z: usize, hops: i32) -> (usize, usize) {
        let mut current = (x, z);
        let mut remaining = hops;

        loop {
            let mut best = current;
            let mut best_distance = f64::NEG_INFINITY;
            for (nx, nz) in self.zones.neighborhood(current.0, current.1, 1) {
                let distance = self.zones.get(nx, nz).ocean_distance;
                if distance > best_distance {
                    best_distance = distance;
                    best = (nx, nz);
                }
            }

            if best == current || remaining <= 0 {
                return current;
            }
            current = best;
            remaining -= 1;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TectonicZone> {
        self.zones.values()
    }

    pub fn ocean_count(&self) -> usize {
        self.iter().filter(|zone| zone.ocean).count()
    }

    pub fn coastal_count(&self) -> usize {
        self.iter().filter(|zone| zone.coastal).count()
    }
}
