//! River network generation and terrain carving library
//!
//! Re-exports modules for use by binaries and tools.

pub mod ascii;
pub mod config;
pub mod export;
pub mod fields;
pub mod geometry;
pub mod plates;
pub mod rivers;
pub mod seeds;
pub mod terrain;
pub mod tilemap;

pub use config::{ConfigError, RiverConfig, WorldParams, CONFIG_FILE_NAME};
pub use fields::{ChunkField, ConstantField, NoiseField, CHUNK_SIZE};
pub use plates::{PlateCache, PlateCoord, PlateGenerator, TectonicPlate};
pub use rivers::{River, RiverSample, RiverSampler};
pub use terrain::{Cardinal, ColumnBuffer, HostFields, NeighbourHeights, TerrainCarver};
