//! Chunk column output.
//!
//! The carver writes through `ChunkSink` so it can feed a host engine or the
//! in-memory `ColumnBuffer` used by tools and tests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key of the per-column river distance (`u16`, 0 inside channels).
pub const RIVER_DISTANCE_KEY: &str = "riverDistance";

/// Metadata key of the per-column flow vectors (`f32`, all x then all z).
pub const FLOW_VECTORS_KEY: &str = "flowVectors";

pub type BlockId = u32;

pub const AIR: BlockId = 0;

/// Block ids the carver places.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPalette {
    pub mantle: BlockId,
    pub rock: BlockId,
    pub water: BlockId,
    pub salt_water: BlockId,
    pub lake_ice: BlockId,
}

impl Default for BlockPalette {
    fn default() -> Self {
        Self {
            mantle: 1,
            rock: 2,
            water: 3,
            salt_water: 4,
            lake_ice: 5,
        }
    }
}

/// Side table attached to a chunk.
#[derive(Clone, Debug, PartialEq)]
pub enum ChunkMetadata {
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl ChunkMetadata {
    pub fn len(&self) -> usize {
        match self {
            ChunkMetadata::U16(values) => values.len(),
            ChunkMetadata::F32(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_u16(&self) -> Option<&[u16]> {
        match self {
            ChunkMetadata::U16(values) => Some(values),
            ChunkMetadata::F32(_) => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            ChunkMetadata::F32(values) => Some(values),
            ChunkMetadata::U16(_) => None,
        }
    }
}

/// Write access to one chunk column (all vertical chunks at one x/z).
pub trait ChunkSink {
    /// Fill a whole horizontal layer.
    fn set_layer(&mut self, y: usize, block: BlockId);
    fn set_block(&mut self, x: usize, y: usize, z: usize, block: BlockId);
    fn set_fluid(&mut self, x: usize, y: usize, z: usize, fluid: BlockId);
    /// Terrain and rain height maps, indexed `z * size + x`.
    fn set_height_maps(&mut self, terrain: Vec<u16>, rain: Vec<u16>);
    fn set_y_max(&mut self, y_max: u16);
    fn set_metadata(&mut self, key: &str, value: ChunkMetadata);
}

/// In-memory chunk column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnBuffer {
    pub size: usize,
    pub height: usize,
    blocks: Vec<BlockId>,
    fluids: Vec<BlockId>,
    pub terrain_height: Vec<u16>,
    pub rain_height: Vec<u16>,
    pub y_max: u16,
    metadata: HashMap<String, ChunkMetadata>,
}

impl ColumnBuffer {
    pub fn new(size: usize, height: usize) -> Self {
        let volume = size * size * height;
        Self {
            size,
            height,
            blocks: vec![AIR; volume],
            fluids: vec![AIR; volume],
            terrain_height: vec![0; size * size],
            rain_height: vec![0; size * size],
            y_max: 0,
            metadata: HashMap::new(),
        }
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.size + z) * self.size + x
    }

    pub fn block(&self, x: usize, y: usize, z: usize) -> BlockId {
        self.blocks[self.index(x, y, z)]
    }

    pub fn fluid(&self, x: usize, y: usize, z: usize) -> BlockId {
        self.fluids[self.index(x, y, z)]
    }

    pub fn metadata(&self, key: &str) -> Option<&ChunkMetadata> {
        self.metadata.get(key)
    }

    /// Height of the topmost solid block in a column, if any.
    pub fn surface(&self, x: usize, z: usize) -> Option<usize> {
        (0..self.height).rev().find(|&y| self.block(x, y, z) != AIR)
    }

    pub fn count_blocks(&self, block: BlockId) -> usize {
        self.blocks.iter().filter(|&&b| b == block).count()
    }

    pub fn count_fluids(&self, fluid: BlockId) -> usize {
        self.fluids.iter().filter(|&&f| f == fluid).count()
    }
}

impl ChunkSink for ColumnBuffer {
    fn set_layer(&mut self, y: usize, block: BlockId) {
        let start = self.index(0, y, 0);
        let end = start + self.size * self.size;
        self.blocks[start..end].fill(block);
    }

    fn set_block(&mut self, x: usize, y: usize, z: usize, block: BlockId) {
        let idx = self.index(x, y, z);
        self.blocks[idx] = block;
    }

    fn set_fluid(&mut self, x: usize, y: usize, z: usize, fluid: BlockId) {
        let idx = self.index(x, y, z);
        self.fluids[idx] = fluid;
    }

    fn set_height_maps(&mut self, terrain: Vec<u16>, rain: Vec<u16>) {
        self.terrain_height = terrain;
        self.rain_height = rain;
    }

    fn set_y_max(&mut self, y_max: u16) {
        self.y_max = y_max;
    }

    fn set_metadata(&mut self, key: &str, value: ChunkMetadata) {
        self.metadata.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_and_block_writes() {
        let mut buffer = ColumnBuffer::new(4, 8);
        buffer.set_layer(0, 1);
        buffer.set_block(2, 3, 1, 2);
        buffer.set_fluid(1, 2, 1, 3);

        assert_eq!(buffer.count_blocks(1), 16);
        assert_eq!(buffer.block(2, 3, 1), 2);
        assert_eq!(buffer.fluid(1, 2, 1), 3);
        assert_eq!(buffer.block(1, 2, 1), AIR);
        assert_eq!(buffer.surface(2, 1), Some(3));
        assert_eq!(buffer.surface(0, 0), Some(0));
    }

    #[test]
    fn test_metadata_accessors() {
        let mut buffer = ColumnBuffer::new(2, 2);
        buffer.set_metadata(RIVER_DISTANCE_KEY, ChunkMetadata::U16(vec![0, 1, 2, 3]));
        let distance = buffer.metadata(RIVER_DISTANCE_KEY).unwrap();
        assert_eq!(distance.len(), 4);
        assert_eq!(distance.as_u16().unwrap()[3], 3);
        assert!(distance.as_f32().is_none());
        assert!(buffer.metadata(FLOW_VECTORS_KEY).is_none());
    }
}
