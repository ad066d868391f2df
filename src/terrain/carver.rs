//! Terrain carving for one chunk column.
//!
//! Columns are evaluated in parallel: each samples the river distance field,
//! blends its landform toward the river landform near channels and decides
//! solidity for every height. The write phase is serial and pushes blocks,
//! fluids, height maps and river metadata into a `ChunkSink`.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::config::{RiverConfig, WorldParams};
use crate::fields::{ChunkField, Corners, CHUNK_SIZE};
use crate::geometry::{bilerp, inverse_lerp, lerp, Vec2};
use crate::plates::{PlateCache, PlateCoord};
use crate::rivers::{RiverSample, RiverSampler};

use super::border::{smooth_threshold, taper_map, NeighbourHeights, WeightedTaper};
use super::chunk::{
    BlockId, BlockPalette, ChunkMetadata, ChunkSink, FLOW_VECTORS_KEY, RIVER_DISTANCE_KEY,
};
use super::landform::{LandformMap, Landforms};
use super::noise::{
    geo_upheaval_taper, isotropic_threshold, WorldNoise, GEO_DISTORTION_MULTIPLIER,
    GEO_DISTORTION_THRESHOLD, MAX_DISTORTION, TERRAIN_DISTORTION_MULTIPLIER,
    TERRAIN_DISTORTION_THRESHOLD,
};

/// Lowest valley jitter, so valleys never fully collapse onto the channel.
const MIN_VALLEY_LERP: f64 = 0.02;

/// Fraction of the world height above which upheaval is tapered.
const TAPER_HEIGHT: f64 = 0.9;

/// Fields supplied by the host world generator.
#[derive(Clone)]
pub struct HostFields {
    /// Ocean potential; multiplied by the oceanicity factor into blocks
    pub ocean: Arc<dyn ChunkField>,
    pub upheaval: Arc<dyn ChunkField>,
    /// Surface temperature in degrees
    pub climate: Arc<dyn ChunkField>,
    pub landforms: Arc<dyn LandformMap>,
}

/// What a carve produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CarveSummary {
    pub chunk_x: i32,
    pub chunk_z: i32,
    /// Columns inside a channel
    pub channel_columns: usize,
    /// Columns within valley reach of a channel
    pub valley_columns: usize,
    pub has_flow: bool,
    /// Layers written in bulk as rock
    pub bulk_layers: usize,
    pub y_max: u16,
}

/// Blocks carved on each side of the baseline for a channel column.
pub fn bank_blocks(sample: &RiverSample, config: &RiverConfig, world: &WorldParams) -> i32 {
    let bank = (sample.bank_factor * sample.size * config.bank_depth).ceil() as i32;
    bank.clamp(0, world.above_sea_level().max(0))
}

/// How much of the regular landform survives at a column: 1 outside valleys,
/// falling toward the valley noise floor at the channel.
pub fn river_lerp(distance: f64, valley_noise: f64, max_valley_width: f64) -> f64 {
    if distance >= max_valley_width {
        return 1.0;
    }
    let valley = ((valley_noise * 2.0).clamp(-1.0, 1.0) + 1.0) / 2.0;
    let valley = valley.max(MIN_VALLEY_LERP);
    if valley >= 1.0 {
        return 1.0;
    }
    let t = inverse_lerp(distance, 0.0, max_valley_width).clamp(0.0, 1.0);
    let value = lerp(valley, 1.0, t);
    value * value
}

/// Per-worker buffers, reused across the columns a worker handles.
struct ColumnScratch {
    weights: Vec<f32>,
    amplitudes: Vec<f64>,
    thresholds: Vec<f64>,
}

/// Result of evaluating one column.
struct ColumnResult {
    /// Solidity per height; index 0 and the top layer are never set
    solid: Vec<bool>,
    water: BlockId,
    sample: RiverSample,
}

/// Per-chunk inputs shared by every column.
struct ChunkInputs {
    world_x: i32,
    world_z: i32,
    local_origin: Vec2,
    sampler: RiverSampler,
    ocean: Corners,
    upheaval: Corners,
    /// Octave amplitude/threshold tables at the corners, in `Corners` order
    corner_amplitudes: [Vec<f64>; 4],
    corner_thresholds: [Vec<f64>; 4],
    /// Border tapers toward already generated neighbours
    tapers: Option<Vec<WeightedTaper>>,
}

/// Carves chunks using the rivers of a shared plate cache.
pub struct TerrainCarver {
    plates: Arc<PlateCache>,
    fields: HostFields,
    landforms: Landforms,
    noise: WorldNoise,
    palette: BlockPalette,
    pool: Option<ThreadPool>,
}

impl TerrainCarver {
    pub fn new(plates: Arc<PlateCache>, fields: HostFields, landforms: Landforms, palette: BlockPalette) -> Self {
        let noise = WorldNoise::new(plates.seeds(), plates.world(), landforms.octaves);

        let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
        let threads = plates.config().worker_count(cores);
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("carver-{i}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(error) => {
                tracing::warn!(%error, threads, "carver pool unavailable, using global pool");
                None
            }
        };

        Self {
            plates,
            fields,
            landforms,
            noise,
            palette,
            pool,
        }
    }

    pub fn plates(&self) -> &Arc<PlateCache> {
        &self.plates
    }

    pub fn landforms(&self) -> &Landforms {
        &self.landforms
    }

    /// River sampler for a chunk, in plate-local coordinates of its plate.
    pub fn chunk_sampler(&self, chunk_x: i32, chunk_z: i32) -> (RiverSampler, Vec2) {
        let config = self.plates.config();
        let coord = chunk_plate(chunk_x, chunk_z, config);
        let plate = self.plates.get_plate(coord.x, coord.z);
        let origin = plate.local_position(chunk_x * CHUNK_SIZE, chunk_z * CHUNK_SIZE);
        (RiverSampler::for_chunk(&plate, origin, CHUNK_SIZE, config), origin)
    }

    pub fn carve_chunk(&self, chunk_x: i32, chunk_z: i32, sink: &mut dyn ChunkSink) -> CarveSummary {
        self.carve(chunk_x, chunk_z, None, sink)
    }

    /// Carve a chunk whose surface blends into the terrain height maps of
    /// neighbouring chunks along the shared borders.
    pub fn carve_chunk_smoothed(
        &self,
        chunk_x: i32,
        chunk_z: i32,
        neighbours: &NeighbourHeights,
        sink: &mut dyn ChunkSink,
    ) -> CarveSummary {
        self.carve(chunk_x, chunk_z, Some(neighbours), sink)
    }

    fn carve(
        &self,
        chunk_x: i32,
        chunk_z: i32,
        neighbours: Option<&NeighbourHeights>,
        sink: &mut dyn ChunkSink,
    ) -> CarveSummary {
        let world = *self.plates.world();
        let size = CHUNK_SIZE as usize;
        let area = size * size;
        let height = world.map_height.max(3) as usize;

        let (sampler, local_origin) = self.chunk_sampler(chunk_x, chunk_z);
        let world_x = chunk_x * CHUNK_SIZE;
        let world_z = chunk_z * CHUNK_SIZE;
        let corner_points = [
            (world_x, world_z),
            (world_x + CHUNK_SIZE, world_z),
            (world_x, world_z + CHUNK_SIZE),
            (world_x + CHUNK_SIZE, world_z + CHUNK_SIZE),
        ];
        let (corner_amplitudes, corner_thresholds) = self.corner_tables(corner_points);

        let inputs = ChunkInputs {
            world_x,
            world_z,
            local_origin,
            sampler,
            ocean: self.fields.ocean.corners(chunk_x, chunk_z),
            upheaval: self.fields.upheaval.corners(chunk_x, chunk_z),
            corner_amplitudes,
            corner_thresholds,
            tapers: neighbours
                .filter(|n| !n.is_empty())
                .map(|n| taper_map(n, size)),
        };

        let evaluate = || -> Vec<ColumnResult> {
            (0..area)
                .into_par_iter()
                .map_init(
                    || self.scratch(),
                    |scratch, index| self.evaluate_column(&inputs, index, height, scratch),
                )
                .collect()
        };
        let columns = match &self.pool {
            Some(pool) => pool.install(evaluate),
            None => evaluate(),
        };

        let summary = self.write_chunk(chunk_x, chunk_z, &columns, height, sink);
        tracing::debug!(
            chunk_x,
            chunk_z,
            pieces = inputs.sampler.pieces().len(),
            channel_columns = summary.channel_columns,
            valley_columns = summary.valley_columns,
            bulk_layers = summary.bulk_layers,
            y_max = summary.y_max,
            smoothed = inputs.tapers.is_some(),
            "chunk carved"
        );
        summary
    }

    fn scratch(&self) -> ColumnScratch {
        ColumnScratch {
            weights: vec![0.0; self.landforms.len()],
            amplitudes: vec![0.0; self.landforms.octaves],
            thresholds: vec![0.0; self.landforms.octaves],
        }
    }

    fn corner_tables(&self, points: [(i32, i32); 4]) -> ([Vec<f64>; 4], [Vec<f64>; 4]) {
        let mut scratch = self.scratch();
        let mut amplitudes: [Vec<f64>; 4] = Default::default();
        let mut thresholds: [Vec<f64>; 4] = Default::default();
        for (i, (x, z)) in points.into_iter().enumerate() {
            self.fields
                .landforms
                .weights_at(x as f64, z as f64, &mut scratch.weights);
            self.landforms.interpolated_octaves(
                &scratch.weights,
                &mut scratch.amplitudes,
                &mut scratch.thresholds,
            );
            amplitudes[i] = scratch.amplitudes.clone();
            thresholds[i] = scratch.thresholds.clone();
        }
        (amplitudes, thresholds)
    }

    fn evaluate_column(
        &self,
        inputs: &ChunkInputs,
        index: usize,
        height: usize,
        scratch: &mut ColumnScratch,
    ) -> ColumnResult {
        let config = self.plates.config();
        let world = self.plates.world();
        let size = CHUNK_SIZE as usize;
        let local_x = index % size;
        let local_z = index / size;
        let x = (inputs.world_x + local_x as i32) as f64;
        let z = (inputs.world_z + local_z as i32) as f64;
        let fx = local_x as f64 / CHUNK_SIZE as f64;
        let fz = local_z as f64 / CHUNK_SIZE as f64;

        let sample = inputs
            .sampler
            .sample(inputs.local_origin + Vec2::new(local_x as f64, local_z as f64));

        let river_lerp = if sample.distance < config.max_valley_width {
            river_lerp(sample.distance, self.noise.valley.value(x, z), config.max_valley_width)
        } else {
            1.0
        };

        self.fields.landforms.weights_at(x, z, &mut scratch.weights);
        let river = self.landforms.river();
        if river_lerp < 1.0 {
            for weight in scratch.weights.iter_mut() {
                *weight *= river_lerp as f32;
            }
            scratch.weights[self.landforms.river_index] += (1.0 - river_lerp) as f32;
        }

        for octave in 0..scratch.amplitudes.len() {
            let [a0, a1, a2, a3] = &inputs.corner_amplitudes;
            let [t0, t1, t2, t3] = &inputs.corner_thresholds;
            let mut amplitude = bilerp(a0[octave], a1[octave], a2[octave], a3[octave], fx, fz);
            let mut threshold = bilerp(t0[octave], t1[octave], t2[octave], t3[octave], fx, fz);
            if river_lerp < 1.0 {
                amplitude = amplitude * river_lerp + river.octave_amplitudes[octave] * (1.0 - river_lerp);
                threshold = threshold * river_lerp + river.octave_thresholds[octave] * (1.0 - river_lerp);
            }
            scratch.amplitudes[octave] = amplitude;
            scratch.thresholds[octave] = threshold;
        }

        let dist = self.noise.distortion.sample(x, z);
        let dist_terrain = isotropic_threshold(
            dist * TERRAIN_DISTORTION_MULTIPLIER,
            TERRAIN_DISTORTION_THRESHOLD,
            TERRAIN_DISTORTION_MULTIPLIER * MAX_DISTORTION,
        );
        let dist_geo = isotropic_threshold(
            dist * GEO_DISTORTION_MULTIPLIER,
            GEO_DISTORTION_THRESHOLD,
            GEO_DISTORTION_MULTIPLIER * MAX_DISTORTION,
        );

        let upheaval_strength = inputs.upheaval.bilerp(fx, fz) * river_lerp;
        let oceanicity = inputs.ocean.bilerp(fx, fz) * world.oceanicity_factor();
        let dist_y = oceanicity + self.noise.upheaval.y_offset(upheaval_strength, x, z, dist_geo);

        let water = if oceanicity > 1.0 {
            self.palette.salt_water
        } else {
            self.palette.water
        };

        let column = self.noise.terrain.column(
            x + dist_terrain.x,
            z + dist_terrain.y,
            &scratch.amplitudes,
            &scratch.thresholds,
        );
        let bound_min = column.bound_min();
        let bound_max = column.bound_max();

        let top = height - 2;
        let map_height = height as f64;
        let taper_threshold = map_height * TAPER_HEIGHT;
        let slide = dist_y - dist_y.floor();
        let taper = inputs
            .tapers
            .as_ref()
            .map(|tapers| tapers[index])
            .filter(|taper| taper.weight > 0.0);
        let mut solid = vec![false; height];

        for y in 1..=top {
            let displaced = (y as f64 + dist_y).floor().clamp(0.0, (top - 1) as f64) as usize;

            let mut threshold = 0.0;
            for (landform, &weight) in self.landforms.landforms.iter().zip(&scratch.weights) {
                if weight == 0.0 {
                    continue;
                }
                let below = landform.y_threshold(displaced) as f64;
                let above = landform.y_threshold(displaced + 1) as f64;
                threshold += weight as f64 * lerp(below, above, slide);
            }
            threshold += geo_upheaval_taper(y as f64, dist_y, taper_threshold, map_height);
            if let Some(taper) = taper {
                threshold = smooth_threshold(threshold, y as f64, taper, || {
                    self.noise.distortion.border_jitter(x, y as f64, z)
                });
            }

            if threshold <= bound_min {
                solid[y] = true;
            } else if threshold >= bound_max {
                break;
            } else {
                solid[y] = column.is_solid(y as f64, threshold);
            }
        }

        ColumnResult { solid, water, sample }
    }

    fn write_chunk(
        &self,
        chunk_x: i32,
        chunk_z: i32,
        columns: &[ColumnResult],
        height: usize,
        sink: &mut dyn ChunkSink,
    ) -> CarveSummary {
        let config = self.plates.config();
        let world = self.plates.world();
        let palette = self.palette;
        let size = CHUNK_SIZE as usize;
        let area = size * size;
        let top = height - 2;
        let sea_level = (world.sea_level.max(1) as usize).min(top);

        // Bulk layers are only safe where no column is shaped by a river
        let bulk_allowed = columns.iter().all(|c| c.sample.distance > 1.0);
        let mut fully_solid = vec![bulk_allowed; height];
        let mut fully_empty = vec![bulk_allowed; height];
        for y in 1..=top {
            for column in columns {
                if column.solid[y] {
                    fully_empty[y] = false;
                } else {
                    fully_solid[y] = false;
                }
            }
        }

        sink.set_layer(0, palette.mantle);
        let mut y_base = 1;
        while y_base < height - 1 && fully_solid[y_base] {
            sink.set_layer(y_base, palette.rock);
            y_base += 1;
        }

        let mut y_top = top;
        while y_top >= y_base && fully_empty[y_top] {
            y_top -= 1;
        }
        let y_top = y_top.max(sea_level) + 1;

        let climate = self.fields.climate.corners(chunk_x, chunk_z);
        let baseline = world.sea_level + config.height_boost;

        let mut terrain_height = vec![0u16; area];
        let mut rain_height = vec![0u16; area];
        let mut river_distance = vec![0u16; area];
        let mut flow_vectors = vec![0f32; area * 2];
        let mut has_flow = false;
        let mut channel_columns = 0;
        let mut valley_columns = 0;

        for (index, column) in columns.iter().enumerate() {
            let local_x = index % size;
            let local_z = index / size;
            let sample = &column.sample;

            river_distance[index] = sample.metadata_distance();
            if let Some([flow_x, flow_z]) = sample.flow {
                flow_vectors[index] = flow_x;
                flow_vectors[index + area] = flow_z;
                has_flow = true;
            }
            if sample.distance < config.max_valley_width {
                valley_columns += 1;
            }

            let mut surface_water = column.water;
            if y_base < sea_level && column.water != palette.salt_water && !column.solid[sea_level - 1] {
                let world_x = (chunk_x * CHUNK_SIZE + local_x as i32) as f64;
                let world_z = (chunk_z * CHUNK_SIZE + local_z as i32) as f64;
                let temperature = climate.bilerp(
                    local_x as f64 / CHUNK_SIZE as f64,
                    local_z as f64 / CHUNK_SIZE as f64,
                ) + self.noise.distortion.jitter(world_x, world_z) / 20.0;
                if temperature < config.water_freezing_temp {
                    surface_water = palette.lake_ice;
                }
            }

            let carve = sample.in_channel().then(|| {
                let bank = bank_blocks(sample, config, world);
                let low = baseline - bank;
                let high = baseline as f64 + bank as f64 * config.top_factor;
                (low, high)
            });
            if carve.is_some() {
                channel_columns += 1;
            }

            let floor = (y_base - 1) as u16;
            terrain_height[index] = floor;
            rain_height[index] = floor;

            for y in y_base..y_top {
                let kept = column.solid[y]
                    && carve.map_or(true, |(low, high)| y as i32 <= low || y as f64 >= high);

                if kept {
                    terrain_height[index] = y as u16;
                    rain_height[index] = y as u16;
                    sink.set_block(local_x, y, local_z, palette.rock);
                } else if y < sea_level {
                    let fluid = if y == sea_level - 1 {
                        rain_height[index] = y as u16;
                        surface_water
                    } else {
                        column.water
                    };
                    sink.set_fluid(local_x, y, local_z, fluid);
                }
            }
        }

        let y_max = rain_height.iter().copied().max().unwrap_or(0);

        if has_flow {
            sink.set_metadata(FLOW_VECTORS_KEY, ChunkMetadata::F32(flow_vectors));
        }
        sink.set_metadata(RIVER_DISTANCE_KEY, ChunkMetadata::U16(river_distance));
        sink.set_height_maps(terrain_height, rain_height);
        sink.set_y_max(y_max);

        CarveSummary {
            chunk_x,
            chunk_z,
            channel_columns,
            valley_columns,
            has_flow,
            bulk_layers: y_base - 1,
            y_max,
        }
    }
}

/// Plate containing a chunk.
pub fn chunk_plate(chunk_x: i32, chunk_z: i32, config: &RiverConfig) -> PlateCoord {
    PlateCoord::containing(chunk_x * CHUNK_SIZE, chunk_z * CHUNK_SIZE, config.plate_size())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ConstantField;
    use crate::plates::PlateGenerator;
    use crate::terrain::border::Cardinal;
    use crate::terrain::chunk::{ColumnBuffer, AIR};
    use crate::terrain::landform::UniformLandform;

    fn carver(ocean: f64, temperature: f64) -> TerrainCarver {
        let config = Arc::new(RiverConfig {
            zones_in_plate: 4,
            max_worker_threads: Some(2),
            ..Default::default()
        });
        let world = WorldParams::default();
        let ocean_field: Arc<dyn ChunkField> = Arc::new(ConstantField(ocean));
        let plates = Arc::new(PlateCache::new(PlateGenerator::new(
            config,
            world,
            Arc::clone(&ocean_field),
        )));
        let fields = HostFields {
            ocean: ocean_field,
            upheaval: Arc::new(ConstantField(0.0)),
            climate: Arc::new(ConstantField(temperature)),
            landforms: Arc::new(UniformLandform(0)),
        };
        TerrainCarver::new(plates, fields, Landforms::standard(&world), BlockPalette::default())
    }

    #[test]
    fn test_river_lerp_shape() {
        assert_eq!(river_lerp(60.0, 0.0, 50.0), 1.0);
        // Valley noise floor squared at the channel
        assert!((river_lerp(0.0, 0.0, 50.0) - 0.25).abs() < 1e-12);
        assert!((river_lerp(-5.0, -1.0, 50.0) - MIN_VALLEY_LERP * MIN_VALLEY_LERP).abs() < 1e-12);
        assert!(river_lerp(25.0, 0.0, 50.0) > river_lerp(10.0, 0.0, 50.0));
        assert_eq!(river_lerp(10.0, 0.8, 50.0), 1.0);
    }

    #[test]
    fn test_bank_blocks_capped() {
        let config = RiverConfig::default();
        let world = WorldParams::default();
        let sample = RiverSample {
            distance: -10.0,
            flow: None,
            bank_factor: 1.0,
            size: 40.0,
        };
        assert_eq!(bank_blocks(&sample, &config, &world), 10);

        let huge = RiverSample {
            size: 10_000.0,
            ..sample
        };
        assert_eq!(bank_blocks(&huge, &config, &world), world.above_sea_level());
        assert_eq!(bank_blocks(&RiverSample::NONE, &config, &world), 0);
    }

    #[test]
    fn test_dry_chunk_without_rivers() {
        let carver = carver(0.0, 20.0);
        let mut buffer = ColumnBuffer::new(CHUNK_SIZE as usize, 256);
        let summary = carver.carve_chunk(3, 5, &mut buffer);

        assert_eq!(summary.channel_columns, 0);
        assert!(!summary.has_flow);
        assert!(buffer.metadata(FLOW_VECTORS_KEY).is_none());
        let distance = buffer.metadata(RIVER_DISTANCE_KEY).unwrap().as_u16().unwrap();
        assert_eq!(distance.len(), 1024);
        assert!(distance.iter().all(|&d| d == u16::MAX));

        let palette = BlockPalette::default();
        assert_eq!(buffer.block(0, 0, 0), palette.mantle);
        assert_eq!(buffer.block(7, 1, 9), palette.rock);
        assert_eq!(buffer.block(7, 255, 9), AIR);
        assert_eq!(buffer.y_max, *buffer.rain_height.iter().max().unwrap());
    }

    #[test]
    fn test_border_columns_meet_neighbour_height() {
        let carver = carver(0.0, 20.0);
        let size = CHUNK_SIZE as usize;
        let sea = WorldParams::default().sea_level as usize;

        for neighbour_height in [130u16, 90] {
            let mut west = vec![60u16; size * size];
            for z in 0..size {
                west[z * size + size - 1] = neighbour_height;
            }
            let neighbours = NeighbourHeights::new().with(Cardinal::West, west);

            let mut buffer = ColumnBuffer::new(size, 256);
            carver.carve_chunk_smoothed(3, 5, &neighbours, &mut buffer);
            for z in 0..size {
                assert_eq!(buffer.terrain_height[z * size], neighbour_height, "z = {z}");
            }
            if (neighbour_height as usize) < sea {
                assert_eq!(buffer.fluid(0, sea - 1, 0), BlockPalette::default().water);
            }
        }

        // No neighbours carves the same chunk as the plain path
        let mut plain = ColumnBuffer::new(size, 256);
        let mut empty = ColumnBuffer::new(size, 256);
        carver.carve_chunk(3, 5, &mut plain);
        carver.carve_chunk_smoothed(3, 5, &NeighbourHeights::new(), &mut empty);
        assert_eq!(plain.terrain_height, empty.terrain_height);
    }

    #[test]
    fn test_salt_water_never_freezes() {
        // Strong ocean pushes the terrain far below sea level
        let cold = carver(200.0, -40.0);
        let mut buffer = ColumnBuffer::new(CHUNK_SIZE as usize, 256);
        cold.carve_chunk(0, 0, &mut buffer);

        let palette = BlockPalette::default();
        let sea = WorldParams::default().sea_level as usize;
        assert!(buffer.count_fluids(palette.salt_water) > 0);
        assert_eq!(buffer.count_fluids(palette.lake_ice), 0);
        assert_eq!(buffer.fluid(0, sea - 1, 0), palette.salt_water);
        assert_eq!(buffer.rain_height[0], (sea - 1) as u16);
    }

    #[test]
    fn test_chunk_plate_floor_division() {
        let config = RiverConfig {
            zones_in_plate: 4,
            ..Default::default()
        };
        assert_eq!(chunk_plate(-1, 0, &config), PlateCoord::new(-1, 0));
        assert_eq!(chunk_plate(31, 32, &config), PlateCoord::new(0, 1));
    }
}
