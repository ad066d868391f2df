//! Voxel terrain shaped by the river distance field.

pub mod border;
pub mod carver;
pub mod chunk;
pub mod landform;
pub mod noise;

pub use border::{smooth_threshold, taper_map, Cardinal, NeighbourHeights, WeightedTaper};
pub use carver::{bank_blocks, chunk_plate, river_lerp, CarveSummary, HostFields, TerrainCarver};
pub use chunk::{
    BlockId, BlockPalette, ChunkMetadata, ChunkSink, ColumnBuffer, AIR, FLOW_VECTORS_KEY,
    RIVER_DISTANCE_KEY,
};
pub use landform::{octave_count, BlendedLandforms, Landform, LandformMap, Landforms, UniformLandform};
pub use noise::WorldNoise;
