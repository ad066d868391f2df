use crate::geometry::Vec2;

/// Integer coordinate of a plate. Plate `(x, z)` covers world blocks
/// `[x * plate_size, (x + 1) * plate_size)` along each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlateCoord {
    pub x: i32,
    pub z: i32,
}

impl PlateCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Plate containing world block `(world_x, world_z)`.
    pub fn containing(world_x: i32, world_z: i32, plate_size: i32) -> Self {
        Self {
            x: world_x.div_euclid(plate_size),
            z: world_z.div_euclid(plate_size),
        }
    }

    /// World position of the plate's (0, 0) corner.
    pub fn world_origin(&self, plate_size: i32) -> (i64, i64) {
        (self.x as i64 * plate_size as i64, self.z as i64 * plate_size as i64)
    }
}

impl std::fmt::Display for PlateCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{}", self.x, self.z)
    }
}

/// Distance recorded for ocean zones.
pub const OCEAN_DISTANCE: f64 = -1.0;

/// One grid cell of a plate's coarse land/ocean classification.
#[derive(Clone, Debug, PartialEq)]
pub struct TectonicZone {
    /// Grid index along X
    pub x_index: usize,
    /// Grid index along Z
    pub z_index: usize,
    /// Zone center in plate-local blocks
    pub center: Vec2,
    pub ocean: bool,
    /// Ocean zone bordering land; rivers start here
    pub coastal: bool,
    /// Distance to the nearest ocean zone center, `OCEAN_DISTANCE` for ocean
    pub ocean_distance: f64,
}

impl TectonicZone {
    pub fn new(x_index: usize, z_index: usize, zone_size: i32) -> Self {
        let half = zone_size / 2;
        Self {
            x_index,
            z_index,
            center: Vec2::new(
                (x_index as i32 * zone_size + half) as f64,
                (z_index as i32 * zone_size + half) as f64,
            ),
            ocean: false,
            coastal: false,
            ocean_distance: 0.0,
        }
    }
}
