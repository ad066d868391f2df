use image::{ImageBuffer, Rgb, RgbImage};

use crate::ascii::PlateView;
use crate::config::RiverConfig;
use crate::geometry::Vec2;
use crate::plates::{TectonicPlate, TectonicZone};
use crate::rivers::RiverSampler;

const OCEAN: [u8; 3] = [0, 100, 255];
const COASTAL: [u8; 3] = [255, 100, 255];
const LAND: [u8; 3] = [255, 150, 150];
const HIDDEN: [u8; 3] = [40, 40, 40];
const RIVER: [u8; 3] = [20, 40, 200];
const VALLEY: [u8; 3] = [90, 160, 90];
const MOUTH: [u8; 3] = [255, 255, 0];

/// Export a plate view to PNG, `blocks_per_pixel` blocks per image pixel.
pub fn export_plate_png(
    plate: &TectonicPlate,
    view: PlateView,
    blocks_per_pixel: u32,
    config: &RiverConfig,
    path: &str,
) -> Result<(), image::ImageError> {
    render_plate(plate, view, blocks_per_pixel, config).save(path)
}

fn zone_color(zone: &TectonicZone, view: PlateView) -> [u8; 3] {
    match view {
        PlateView::Ocean if !zone.ocean => HIDDEN,
        PlateView::Coastal if !zone.coastal => HIDDEN,
        _ if zone.coastal => COASTAL,
        _ if zone.ocean => OCEAN,
        _ => LAND,
    }
}

/// Rasterize a plate: zone classes as background, channels and valleys on top
/// for the river views.
pub fn render_plate(plate: &TectonicPlate, view: PlateView, blocks_per_pixel: u32, config: &RiverConfig) -> RgbImage {
    let step = blocks_per_pixel.max(1);
    let size = (plate.plate_size.max(1) as u32).div_ceil(step);
    let mut img: RgbImage = ImageBuffer::new(size, size);

    let valley = config.max_valley_width;
    let sampler = if view == PlateView::Full {
        RiverSampler::for_rivers(&plate.rivers, config)
    } else {
        RiverSampler::default()
    };

    for py in 0..size {
        for px in 0..size {
            let x = (px * step) as f64 + step as f64 / 2.0;
            let z = (py * step) as f64 + step as f64 / 2.0;
            let mut color = zone_color(plate.zone_at(x, z), view);

            if !sampler.is_empty() {
                let sample = sampler.sample(Vec2::new(x, z));
                if sample.in_channel() || sample.distance < step as f64 / 2.0 {
                    color = RIVER;
                } else if sample.distance < valley {
                    color = blend(color, VALLEY, 0.5);
                }
            }

            img.put_pixel(px, py, Rgb(color));
        }
    }

    if view.shows_rivers() {
        for river in &plate.rivers {
            let cx = (river.start_pos.x / step as f64) as i64;
            let cz = (river.start_pos.y / step as f64) as i64;
            for dz in -1..=1 {
                for dx in -1..=1 {
                    let (x, z) = (cx + dx, cz + dz);
                    if x >= 0 && z >= 0 && (x as u32) < size && (z as u32) < size {
                        img.put_pixel(x as u32, z as u32, Rgb(MOUTH));
                    }
                }
            }
        }
    }

    img
}

/// Chunk river distance as grayscale: black in channels, white beyond the
/// valley.
pub fn render_distance_map(distances: &[u16], size: usize, max_valley_width: f64, scale: u32) -> RgbImage {
    let scale = scale.max(1);
    let rows = distances.len() / size.max(1);
    let mut img: RgbImage = ImageBuffer::new(size as u32 * scale, rows as u32 * scale);

    for (index, &distance) in distances.iter().enumerate() {
        let x = (index % size) as u32;
        let z = (index / size) as u32;
        let t = (distance as f64 / max_valley_width).clamp(0.0, 1.0);
        let color = if distance == 0 {
            RIVER
        } else {
            let v = (t * 255.0) as u8;
            [v, v, v]
        };
        for sy in 0..scale {
            for sx in 0..scale {
                img.put_pixel(x * scale + sx, z * scale + sy, Rgb(color));
            }
        }
    }

    img
}

fn blend(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    [
        (a[0] as f32 * (1.0 - t) + b[0] as f32 * t) as u8,
        (a[1] as f32 * (1.0 - t) + b[1] as f32 * t) as u8,
        (a[2] as f32 * (1.0 - t) + b[2] as f32 * t) as u8,
    ]
}
