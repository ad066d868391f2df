//! Plate generation: zones, river growth and post-processing.

use rand::Rng;

use crate::config::{RiverConfig, WorldParams};
use crate::fields::ChunkField;
use crate::geometry::Vec2;
use crate::rivers::segments::{
    add_lakes, build_plate_segments, compute_radius, connect_segments, validate_segments,
};
use crate::rivers::{assign_river_sizes, River, RiverGrower, RiverSegment, SegmentRef};
use crate::seeds::WorldSeeds;

use super::types::{PlateCoord, TectonicZone};
use super::zones::ZoneGrid;

/// A square region of the world with its own river networks.
#[derive(Clone, Debug)]
pub struct TectonicPlate {
    pub coord: PlateCoord,
    /// Edge length in blocks
    pub plate_size: i32,
    pub zones: ZoneGrid,
    pub rivers: Vec<River>,
    /// First segment of every river mouth
    pub river_starts: Vec<SegmentRef>,
}

impl TectonicPlate {
    /// Generate the plate at `coord`. Deterministic in the seeds and inputs.
    pub fn generate(
        coord: PlateCoord,
        config: &RiverConfig,
        world: &WorldParams,
        seeds: &WorldSeeds,
        ocean: &dyn ChunkField,
    ) -> Self {
        let zones = ZoneGrid::build(coord, config, world, ocean);
        let mut rng = seeds.plate_rng(coord.x, coord.z);
        Self::from_zones(coord, config, zones, &mut rng)
    }

    /// Grow and post-process rivers over an already classified zone grid.
    pub fn from_zones<R: Rng>(coord: PlateCoord, config: &RiverConfig, zones: ZoneGrid, rng: &mut R) -> Self {
        let grown = RiverGrower::new(config, &zones, &mut *rng).grow();
        let grown_count = grown.len();

        let min_nodes = config.min_nodes.max(0) as usize;
        let mut rivers: Vec<River> = grown
            .into_iter()
            .filter(|river| river.nodes.len() >= min_nodes)
            .collect();

        for river in rivers.iter_mut() {
            assign_river_sizes(river, config);
        }
        build_plate_segments(&mut rivers, config, &mut *rng);

        let mut river_starts = Vec::new();
        let mut lakes = 0;
        for (index, river) in rivers.iter_mut().enumerate() {
            connect_segments(river, index, &mut river_starts);
            validate_segments(river);
            river.radius = compute_radius(river);

            let leaves = river.end_nodes();
            lakes += add_lakes(river, &leaves, config, &mut *rng);
        }

        tracing::info!(
            plate = %coord,
            zones_ocean = zones.ocean_count(),
            zones_coastal = zones.coastal_count(),
            rivers = rivers.len(),
            pruned = grown_count - rivers.len(),
            lakes,
            "plate generated"
        );

        Self {
            coord,
            plate_size: config.plate_size(),
            zones,
            rivers,
            river_starts,
        }
    }

    /// Zone containing a plate-local position.
    pub fn zone_at(&self, local_x: f64, local_z: f64) -> &TectonicZone {
        self.zones.zone_at(local_x, local_z)
    }

    /// Plate-local position of a world block.
    pub fn local_position(&self, world_x: i32, world_z: i32) -> Vec2 {
        let (origin_x, origin_z) = self.coord.world_origin(self.plate_size);
        Vec2::new(
            (world_x as i64 - origin_x) as f64,
            (world_z as i64 - origin_z) as f64,
        )
    }

    pub fn segment(&self, reference: SegmentRef) -> &RiverSegment {
        self.rivers[reference.river].segment(reference.segment)
    }

    pub fn node_count(&self) -> usize {
        self.rivers.iter().map(|river| river.nodes.len()).sum()
    }

    pub fn segment_count(&self) -> usize {
        self.rivers.iter().map(|river| river.segments.len()).sum()
    }

    pub fn lake_count(&self) -> usize {
        self.rivers
            .iter()
            .flat_map(|river| river.nodes.iter())
            .filter(|node| node.lake)
            .count()
    }
}
