pub mod cache;
pub mod generation;
pub mod types;
pub mod zones;

pub use cache::{CacheStats, PlateCache, PlateGenerator};
pub use generation::TectonicPlate;
pub use types::{PlateCoord, TectonicZone, OCEAN_DISTANCE};
pub use zones::ZoneGrid;
