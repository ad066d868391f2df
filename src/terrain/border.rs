//! Chunk border smoothing.
//!
//! A chunk generated next to chunks that already exist must meet their
//! terrain without a cliff. Each column gets a taper: the neighbours' surface
//! height near it and how strongly to pull toward that height. The carver
//! blends its solidity threshold toward "solid below, empty above" the
//! neighbour surface by that weight.

/// Neighbouring chunk directions, clockwise from north (negative z).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cardinal {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Cardinal {
    pub const ALL: [Cardinal; 8] = [
        Cardinal::North,
        Cardinal::NorthEast,
        Cardinal::East,
        Cardinal::SouthEast,
        Cardinal::South,
        Cardinal::SouthWest,
        Cardinal::West,
        Cardinal::NorthWest,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Cardinal::NorthEast | Cardinal::SouthEast | Cardinal::SouthWest | Cardinal::NorthWest
        )
    }

    /// Chunk offset of the neighbour on this side.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Cardinal::North => (0, -1),
            Cardinal::NorthEast => (1, -1),
            Cardinal::East => (1, 0),
            Cardinal::SouthEast => (1, 1),
            Cardinal::South => (0, 1),
            Cardinal::SouthWest => (-1, 1),
            Cardinal::West => (-1, 0),
            Cardinal::NorthWest => (-1, -1),
        }
    }

    /// How far column `(fx, fz)` (fractions of the chunk) is from this side,
    /// in chunk widths. Diagonals add both axes.
    fn edge_distance(self, fx: f64, fz: f64) -> f64 {
        match self {
            Cardinal::North => fz,
            Cardinal::NorthEast => 1.0 - fx + fz,
            Cardinal::East => 1.0 - fx,
            Cardinal::SouthEast => (1.0 - fx) + (1.0 - fz),
            Cardinal::South => 1.0 - fz,
            Cardinal::SouthWest => fx + 1.0 - fz,
            Cardinal::West => fx,
            Cardinal::NorthWest => fx + fz,
        }
    }

    /// Column of the neighbour's height map facing column `(x, z)`.
    fn border_index(self, x: usize, z: usize, size: usize) -> usize {
        let last = size - 1;
        match self {
            Cardinal::North => last * size + x,
            Cardinal::South => x,
            Cardinal::East => z * size,
            Cardinal::West => z * size + last,
            Cardinal::NorthEast => last * size,
            Cardinal::SouthEast => 0,
            Cardinal::SouthWest => last,
            Cardinal::NorthWest => last * size + last,
        }
    }

    /// The two diagonals touching a face.
    fn adjacent_diagonals(self) -> [Cardinal; 2] {
        match self {
            Cardinal::North => [Cardinal::NorthEast, Cardinal::NorthWest],
            Cardinal::East => [Cardinal::NorthEast, Cardinal::SouthEast],
            Cardinal::South => [Cardinal::SouthWest, Cardinal::SouthEast],
            Cardinal::West => [Cardinal::SouthWest, Cardinal::NorthWest],
            diagonal => [diagonal, diagonal],
        }
    }
}

/// Terrain height maps of already generated neighbours, indexed `z * size + x`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NeighbourHeights {
    maps: [Option<Vec<u16>>; 8],
}

impl NeighbourHeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, side: Cardinal, heights: Vec<u16>) -> Self {
        self.set(side, heights);
        self
    }

    pub fn set(&mut self, side: Cardinal, heights: Vec<u16>) {
        self.maps[side.index()] = Some(heights);
    }

    pub fn get(&self, side: Cardinal) -> Option<&[u16]> {
        self.maps[side.index()].as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.iter().all(Option::is_none)
    }

    /// Sides that count for smoothing. A diagonal is ignored when a face next
    /// to it is present, otherwise corners get weighted twice.
    fn effective(&self) -> Vec<(Cardinal, &[u16])> {
        let mut ignored = [false; 8];
        for side in Cardinal::ALL.into_iter().filter(|side| !side.is_diagonal()) {
            if self.get(side).is_some() {
                for diagonal in side.adjacent_diagonals() {
                    ignored[diagonal.index()] = true;
                }
            }
        }

        Cardinal::ALL
            .into_iter()
            .filter(|side| !ignored[side.index()])
            .filter_map(|side| self.get(side).map(|map| (side, map)))
            .collect()
    }
}

/// Neighbour surface near one column and how strongly to follow it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WeightedTaper {
    /// Weighted neighbour surface, half a block above the top solid block
    pub terrain_y: f64,
    /// 1 on a shared edge, falling off quadratically inward
    pub weight: f64,
}

/// Per-column tapers of a `size` x `size` chunk, indexed `z * size + x`.
pub fn taper_map(neighbours: &NeighbourHeights, size: usize) -> Vec<WeightedTaper> {
    let sides = neighbours.effective();
    let mut tapers = Vec::with_capacity(size * size);

    for z in 0..size {
        for x in 0..size {
            let fx = x as f64 / size as f64;
            let fz = z as f64 / size as f64;

            let mut y_sum = 0.0;
            let mut weight_sum = 0.0;
            let mut max_weight: f64 = 0.0;
            for &(side, map) in &sides {
                let Some(&height) = map.get(side.border_index(x, z, size)) else {
                    continue;
                };
                let weight = (1.0 - side.edge_distance(fx, fz).clamp(0.0, 1.0)).powi(2);
                y_sum += (height as f64 + 0.5) * weight.max(0.0001);
                weight_sum += weight;
                max_weight = max_weight.max(weight);
            }

            tapers.push(WeightedTaper {
                terrain_y: y_sum / weight_sum.max(0.0001),
                weight: max_weight,
            });
        }
    }
    tapers
}

/// Blend a solidity threshold toward the neighbour surface: -1 (solid) below
/// it, 1 (empty) above. Where the taper is partial, `jitter` roughens the
/// seam within 10 blocks of the surface; it is only evaluated there.
pub fn smooth_threshold(threshold: f64, y: f64, taper: WeightedTaper, jitter: impl FnOnce() -> f64) -> f64 {
    let target = if y > taper.terrain_y { 1.0 } else { -1.0 };
    let y_diff = (y - taper.terrain_y).abs();
    let strength = (2.0 * (1.0 - taper.weight)).clamp(0.0, 1.0) * 0.1;

    let noise = if y_diff > 10.0 || strength == 0.0 {
        0.0
    } else {
        jitter() / (y_diff / 2.0).max(1.0) * strength
    };

    threshold * (1.0 - taper.weight) + (target + noise) * taper.weight
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(size: usize, height: u16) -> Vec<u16> {
        vec![height; size * size]
    }

    #[test]
    fn test_west_edge_takes_full_weight() {
        let neighbours = NeighbourHeights::new().with(Cardinal::West, flat(32, 130));
        let tapers = taper_map(&neighbours, 32);

        for z in 0..32 {
            let edge = tapers[z * 32];
            assert_eq!(edge.weight, 1.0);
            assert_eq!(edge.terrain_y, 130.5);
        }
        assert!((tapers[16].weight - 0.25).abs() < 1e-12);
        assert_eq!(tapers[31].weight, (1.0f64 / 32.0).powi(2));
    }

    #[test]
    fn test_faces_hide_adjacent_diagonals() {
        let west = NeighbourHeights::new().with(Cardinal::West, flat(16, 90));
        let with_corners = west
            .clone()
            .with(Cardinal::NorthWest, flat(16, 200))
            .with(Cardinal::SouthWest, flat(16, 10));
        assert_eq!(taper_map(&west, 16), taper_map(&with_corners, 16));

        // A lone diagonal still counts
        let corner = NeighbourHeights::new().with(Cardinal::NorthWest, flat(16, 200));
        let tapers = taper_map(&corner, 16);
        assert_eq!(tapers[0].weight, 1.0);
        assert_eq!(tapers[0].terrain_y, 200.5);
    }

    #[test]
    fn test_border_reads_facing_column() {
        let mut north = flat(4, 50);
        // Row z = 3 of the northern neighbour faces row z = 0 here
        north[3 * 4 + 2] = 70;
        let tapers = taper_map(&NeighbourHeights::new().with(Cardinal::North, north), 4);
        assert_eq!(tapers[2].terrain_y, 70.5);
        assert_eq!(tapers[1].terrain_y, 50.5);
    }

    #[test]
    fn test_full_weight_forces_solid_below_and_empty_above() {
        let taper = WeightedTaper {
            terrain_y: 100.5,
            weight: 1.0,
        };
        let mut jitter_calls = 0;
        assert_eq!(smooth_threshold(0.3, 100.0, taper, || { jitter_calls += 1; 0.5 }), -1.0);
        assert_eq!(smooth_threshold(-0.7, 101.0, taper, || { jitter_calls += 1; 0.5 }), 1.0);
        assert_eq!(jitter_calls, 0);

        let none = WeightedTaper::default();
        assert_eq!(smooth_threshold(0.3, 100.0, none, || 0.5), 0.3);
    }

    #[test]
    fn test_partial_weight_blends_with_jitter() {
        let taper = WeightedTaper {
            terrain_y: 100.5,
            weight: 0.75,
        };
        let value = smooth_threshold(0.2, 104.5, taper, || 1.0);
        // 0.2 * 0.25 + (1 + 1 / 2 * 0.05) * 0.75
        assert!((value - (0.05 + 1.025 * 0.75)).abs() < 1e-12);

        let far = smooth_threshold(0.2, 140.0, taper, || panic!("jitter beyond 10 blocks"));
        assert!((far - (0.05 + 0.75)).abs() < 1e-12);
    }
}
