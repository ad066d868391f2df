//! River generation configuration.
//!
//! Persisted as `rivers.json` next to the world. A missing or unreadable file
//! is replaced by the defaults so the next start finds a valid config.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "rivers.json";

/// Blocks of submersion per unit of ocean potential, per whole 256 blocks of
/// world height.
const OCEANICITY_PER_256: f64 = 0.33333;

/// Numeric knobs for plate layout, river growth and terrain carving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiverConfig {
    // Plate layout
    /// Edge length of a zone in blocks
    pub zone_size: i32,
    /// Zones along each edge of a plate
    pub zones_in_plate: i32,
    /// Scaled ocean potential above which a zone is ocean
    pub ocean_threshold: f64,

    // Growth
    /// Percent chance that a coastal zone seeds a river
    pub river_spawn_chance: i32,
    /// Downhill steps a branch may take before it is rejected
    pub error: i32,
    /// Maximum growth stage of a branch
    pub max_nodes: i32,
    /// Rivers with fewer nodes are discarded
    pub min_nodes: i32,
    pub min_length: i32,
    pub length_variation: i32,
    /// Percent chance a node forks into two branches
    pub river_split_chance: i32,
    pub min_fork_angle: i32,
    pub fork_variation: i32,
    /// Maximum bend in degrees of a non-forking continuation
    pub normal_angle: i32,
    /// Uphill hops when choosing a mouth's initial heading
    pub seed_hops: i32,

    // Sizing
    pub river_growth: f64,
    pub min_size: f64,
    pub max_size: f64,

    // Segments
    pub segments_in_river: i32,
    /// Maximum perpendicular jitter of intermediate segment points
    pub segment_offset: f64,

    // Lakes
    pub lake_chance: i32,
    pub min_lake_size: i32,
    pub max_lake_size: i32,

    // Carving
    /// Lateral reach of a river valley in blocks
    pub max_valley_width: f64,
    /// Blocks above sea level the carve band is centered on
    pub height_boost: i32,
    /// Multiplier on the bank height above the baseline
    pub top_factor: f64,
    /// Fraction of the channel size that becomes carved bank height
    pub bank_depth: f64,
    pub river_speed: f64,
    /// Surface water below this temperature freezes into lake ice
    pub water_freezing_temp: f64,

    // Workers
    /// Overrides the derived worker count when set
    pub max_worker_threads: Option<usize>,
    pub dedicated_server: bool,
    pub hosted_mode: bool,
}

impl Default for RiverConfig {
    fn default() -> Self {
        Self {
            zone_size: 256,
            zones_in_plate: 16,
            ocean_threshold: 30.0,

            river_spawn_chance: 20,
            error: 2,
            max_nodes: 20,
            min_nodes: 6,
            min_length: 150,
            length_variation: 150,
            river_split_chance: 45,
            min_fork_angle: 20,
            fork_variation: 30,
            normal_angle: 25,
            seed_hops: 8,

            river_growth: 5.0,
            min_size: 10.0,
            max_size: 200.0,

            segments_in_river: 3,
            segment_offset: 40.0,

            lake_chance: 15,
            min_lake_size: 50,
            max_lake_size: 75,

            max_valley_width: 50.0,
            height_boost: 8,
            top_factor: 1.0,
            bank_depth: 0.25,
            river_speed: 1.0,
            water_freezing_temp: -15.0,

            max_worker_threads: None,
            dedicated_server: true,
            hosted_mode: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse river config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read river config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write river config to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RiverConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RiverConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn store(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the config at `path`, falling back to defaults on any failure.
    ///
    /// Whatever ends up in use is written back, so a malformed or missing file
    /// is replaced by a valid one. A failed write is only logged.
    pub fn load_or_default(path: &Path) -> Arc<Self> {
        let config = match Self::load(path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "river_config.loaded=file");
                config
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "river_config.load_failed, using defaults"
                );
                Self::default()
            }
        };

        if let Err(err) = config.store(path) {
            tracing::warn!(path = %path.display(), error = %err, "river_config.store_failed");
        }

        Arc::new(config)
    }

    /// Clamp values that would make generation degenerate.
    pub fn sanitized(mut self) -> Self {
        self.zone_size = self.zone_size.max(1);
        self.zones_in_plate = self.zones_in_plate.max(1);
        self.segments_in_river = self.segments_in_river.max(1);

        for chance in [
            &mut self.river_spawn_chance,
            &mut self.river_split_chance,
            &mut self.lake_chance,
        ] {
            *chance = (*chance).clamp(0, 100);
        }

        self.error = self.error.max(0);
        self.min_nodes = self.min_nodes.max(0);
        self.min_length = self.min_length.max(1);
        self.length_variation = self.length_variation.max(0);
        self.seed_hops = self.seed_hops.max(0);

        self.river_growth = self.river_growth.max(0.0);
        self.min_size = self.min_size.max(0.0);
        self.max_size = self.max_size.max(1.0);
        if self.max_size < self.min_size {
            self.max_size = self.min_size;
        }
        if self.max_lake_size < self.min_lake_size {
            self.max_lake_size = self.min_lake_size;
        }

        self.max_valley_width = self.max_valley_width.max(1.0);
        self.bank_depth = self.bank_depth.max(0.0);
        self.top_factor = self.top_factor.max(0.0);
        if self.max_worker_threads == Some(0) {
            self.max_worker_threads = None;
        }

        self
    }

    /// Plate edge length in blocks.
    pub fn plate_size(&self) -> i32 {
        self.zone_size * self.zones_in_plate
    }

    /// Worker threads for chunk carving given `cores` logical CPUs.
    ///
    /// Leaves a few cores for the host and caps the pool, tighter on hosted
    /// servers.
    pub fn worker_count(&self, cores: usize) -> usize {
        if let Some(threads) = self.max_worker_threads {
            return threads.max(1);
        }
        let reserved = if self.dedicated_server { 4 } else { 6 };
        let cap = if self.hosted_mode { 4 } else { 10 };
        cores.saturating_sub(reserved).clamp(1, cap)
    }
}

/// World-level parameters supplied by the host. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldParams {
    pub seed: u64,
    /// World height in blocks
    pub map_height: i32,
    pub sea_level: i32,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            seed: 0,
            map_height: 256,
            sea_level: 110,
        }
    }
}

impl WorldParams {
    /// Factor turning the host ocean potential into blocks of submersion.
    /// Only whole multiples of 256 blocks count, so a world under 256 blocks
    /// tall has no ocean at all.
    pub fn oceanicity_factor(&self) -> f64 {
        (self.map_height / 256) as f64 * OCEANICITY_PER_256
    }

    pub fn above_sea_level(&self) -> i32 {
        self.map_height - self.sea_level
    }
}
