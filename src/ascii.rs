//! ASCII rendering for plates and chunk distance maps
//!
//! Text views used by the inspector CLI and handy in test failures.

use crate::plates::{TectonicPlate, TectonicZone};
use crate::rivers::NO_INFLUENCE;

/// Plate rendering modes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlateView {
    /// River mouths only
    Starts,
    /// Every river node
    Full,
    /// Land and ocean zones
    Land,
    /// Ocean zones
    Ocean,
    /// Coastal zones
    Coastal,
}

impl PlateView {
    pub fn name(&self) -> &'static str {
        match self {
            PlateView::Starts => "starts",
            PlateView::Full => "full",
            PlateView::Land => "land",
            PlateView::Ocean => "ocean",
            PlateView::Coastal => "coastal",
        }
    }

    pub fn all() -> &'static [PlateView] {
        &[
            PlateView::Starts,
            PlateView::Full,
            PlateView::Land,
            PlateView::Ocean,
            PlateView::Coastal,
        ]
    }

    /// Whether river geometry is drawn on top of the zones.
    pub fn shows_rivers(&self) -> bool {
        matches!(self, PlateView::Starts | PlateView::Full)
    }
}

/// Character for a zone under a view
pub fn zone_char(zone: &TectonicZone, view: PlateView) -> char {
    match view {
        PlateView::Ocean if zone.ocean => '~',
        PlateView::Coastal if zone.coastal => 'c',
        PlateView::Ocean | PlateView::Coastal => '.',
        _ if zone.coastal => 'c',
        _ if zone.ocean => '~',
        _ => '.',
    }
}

/// Character for a river distance value
pub fn distance_char(distance: u16) -> char {
    match distance {
        0 => '#',
        1..=4 => '=',
        5..=15 => '+',
        16..=49 => '-',
        _ if distance as f64 >= NO_INFLUENCE => ' ',
        _ => '.',
    }
}

/// Render a plate one character per zone, with river mouths (`S`) and node
/// starts (`o`) marked on the zone that contains them.
pub fn render_plate_ascii(plate: &TectonicPlate, view: PlateView) -> String {
    let count = plate.zones.count();
    let mut cells: Vec<Vec<char>> = (0..count)
        .map(|z| (0..count).map(|x| zone_char(plate.zones.zone(x, z), view)).collect())
        .collect();

    let mut mark = |x: f64, z: f64, ch: char| {
        let zone = plate.zone_at(x, z);
        cells[zone.z_index][zone.x_index] = ch;
    };

    match view {
        PlateView::Full => {
            for river in &plate.rivers {
                for node in &river.nodes {
                    mark(node.start_pos.x, node.start_pos.y, if node.lake { 'L' } else { 'o' });
                }
            }
            for river in &plate.rivers {
                mark(river.start_pos.x, river.start_pos.y, 'S');
            }
        }
        PlateView::Starts => {
            for start in &plate.river_starts {
                let segment = plate.segment(*start);
                mark(segment.start_pos.x, segment.start_pos.y, 'S');
            }
        }
        _ => {}
    }

    let mut out = String::with_capacity(count * (count + 1));
    for row in cells {
        out.extend(row);
        out.push('\n');
    }
    out
}

/// Render a chunk's `riverDistance` metadata, rows along z.
pub fn render_distance_ascii(distances: &[u16], size: usize) -> String {
    let mut out = String::with_capacity(distances.len() + size);
    for row in distances.chunks(size.max(1)) {
        out.extend(row.iter().map(|&d| distance_char(d)));
        out.push('\n');
    }
    out
}

/// One line per marker the view shows, in world coordinates.
pub fn plate_markers(plate: &TectonicPlate, view: PlateView) -> Vec<String> {
    let (origin_x, origin_z) = plate.coord.world_origin(plate.plate_size);
    let world = |x: f64, z: f64| (origin_x + x as i64, origin_z + z as i64);
    let mut lines = Vec::new();

    match view {
        PlateView::Starts => {
            for start in &plate.river_starts {
                let segment = plate.segment(*start);
                let size = plate.rivers[start.river].node(segment.node).start_size;
                let (x, z) = world(segment.start_pos.x, segment.start_pos.y);
                lines.push(format!("mouth {x} {z} size {size:.0}"));
            }
        }
        PlateView::Full => {
            for (index, river) in plate.rivers.iter().enumerate() {
                for node in &river.nodes {
                    let (x, z) = world(node.start_pos.x, node.start_pos.y);
                    let kind = if node.lake { "lake" } else { "node" };
                    lines.push(format!("river {index} {kind} {x} {z} size {:.0}", node.start_size));
                }
            }
        }
        PlateView::Land | PlateView::Ocean | PlateView::Coastal => {
            for zone in plate.zones.iter() {
                let shown = match view {
                    PlateView::Ocean => zone.ocean,
                    PlateView::Coastal => zone.coastal,
                    _ => true,
                };
                if shown {
                    let label = if zone.ocean { "ocean" } else { "land" };
                    let (x, z) = world(zone.center.x, zone.center.y);
                    lines.push(format!("{label} {x} {z}"));
                }
            }
        }
    }
    lines
}
