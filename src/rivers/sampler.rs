//! River distance field.
//!
//! A sampler is built once per chunk from the segments near it. Each segment
//! contributes up to two straight pieces running through its midpoint; where a
//! segment bends smoothly from its parent, the upstream piece starts at the
//! parent's midpoint instead of the segment's own start, which rounds off the
//! joint. The sampler answers per-column queries with the signed distance to
//! the nearest channel edge.

use crate::config::RiverConfig;
use crate::geometry::{distance_to_line, lerp, projection, Vec2};
use crate::plates::TectonicPlate;

use super::types::{River, SegmentId};

/// Distance reported where no river has any influence.
pub const NO_INFLUENCE: f64 = u16::MAX as f64;

/// Extra reach of a node beyond the valley when culling for a chunk.
const NODE_CULL_PADDING: f64 = 512.0;

/// A straight stretch of channel with linearly varying width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelPiece {
    /// Downstream end
    pub a: Vec2,
    /// Upstream end
    pub b: Vec2,
    pub width_a: f64,
    pub width_b: f64,
    pub speed: f64,
}

impl ChannelPiece {
    fn max_width(&self) -> f64 {
        self.width_a.max(self.width_b)
    }
}

/// River state at one column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiverSample {
    /// Distance to the nearest channel edge; negative inside the channel
    pub distance: f64,
    /// Downstream direction scaled by speed, only inside a channel
    pub flow: Option<[f32; 2]>,
    /// 1 on the centerline, 0 at the channel edge and outside
    pub bank_factor: f64,
    /// Channel width at the nearest point
    pub size: f64,
}

impl RiverSample {
    pub const NONE: RiverSample = RiverSample {
        distance: NO_INFLUENCE,
        flow: None,
        bank_factor: 0.0,
        size: 0.0,
    };

    pub fn in_channel(&self) -> bool {
        self.distance <= 0.0
    }

    /// Distance as stored in chunk metadata: 0 inside the channel.
    pub fn metadata_distance(&self) -> u16 {
        self.distance.clamp(0.0, NO_INFLUENCE) as u16
    }
}

/// Immutable per-chunk distance field evaluator.
#[derive(Clone, Debug, Default)]
pub struct RiverSampler {
    pieces: Vec<ChannelPiece>,
    max_valley_width: f64,
}

impl RiverSampler {
    pub fn new(pieces: Vec<ChannelPiece>, max_valley_width: f64) -> Self {
        Self {
            pieces,
            max_valley_width,
        }
    }

    /// Pieces of every segment of every river, unfiltered.
    pub fn for_rivers(rivers: &[River], config: &RiverConfig) -> Self {
        let mut pieces = Vec::new();
        for river in rivers {
            for id in river.segment_ids() {
                segment_pieces(river, id, &mut pieces);
            }
        }
        Self::new(pieces, config.max_valley_width)
    }

    /// Sampler for the chunk whose plate-local corner is `origin`.
    pub fn for_chunk(plate: &TectonicPlate, origin: Vec2, chunk_size: i32, config: &RiverConfig) -> Self {
        let half = chunk_size as f64 / 2.0;
        let center = origin + Vec2::new(half, half);
        let half_diagonal = half * std::f64::consts::SQRT_2;
        let valley = config.max_valley_width;

        let mut pieces = Vec::new();
        let mut candidate = Vec::new();

        for river in &plate.rivers {
            if center.distance(river.start_pos) > river.radius {
                continue;
            }

            for node in &river.nodes {
                if distance_to_line(center, node.start_pos, node.end_pos) >= valley + NODE_CULL_PADDING {
                    continue;
                }

                for &id in &node.segments {
                    candidate.clear();
                    segment_pieces(river, id, &mut candidate);
                    pieces.extend(candidate.iter().filter(|piece| {
                        let reach = valley + piece.max_width() / 2.0 + half_diagonal;
                        distance_to_line(center, piece.a, piece.b) < reach
                    }));
                }
            }
        }

        Self::new(pieces, valley)
    }

    pub fn pieces(&self) -> &[ChannelPiece] {
        &self.pieces
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn sample(&self, point: Vec2) -> RiverSample {
        let mut best: Option<(f64, f64, f64, &ChannelPiece)> = None;

        for piece in &self.pieces {
            let t = projection(point, piece.a, piece.b).clamp(0.0, 1.0);
            let distance = point.distance(piece.a.lerp(piece.b, t));
            let width = lerp(piece.width_a, piece.width_b, t);
            let signed = distance - width / 2.0;

            if best.map_or(true, |(current, _, _, _)| signed < current) {
                best = Some((signed, distance, width, piece));
            }
        }

        let Some((signed, distance, width, piece)) = best else {
            return RiverSample::NONE;
        };
        if signed >= self.max_valley_width {
            return RiverSample::NONE;
        }

        let half_width = width / 2.0;
        let inside = signed <= 0.0;
        let bank_factor = if inside && half_width > 0.0 {
            (1.0 - distance / half_width).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let flow = inside.then(|| {
            let direction = (piece.a - piece.b).normalize() * piece.speed;
            [direction.x as f32, direction.y as f32]
        });

        RiverSample {
            distance: signed,
            flow,
            bank_factor,
            size: width,
        }
    }
}

/// Interpolation pieces of one segment.
///
/// The upstream piece runs from the parent's midpoint to this midpoint when
/// the bend is smooth, otherwise from this segment's start. The downstream
/// piece runs from the midpoint to the end, but only where no child's
/// upstream piece already covers that stretch.
pub fn segment_pieces(river: &River, id: SegmentId, out: &mut Vec<ChannelPiece>) {
    let segment = river.segment(id);
    let speed = river.node(segment.node).speed;
    let mid_width = river.segment_width_at(id, 0.5);

    let (upstream_from, upstream_width) = if segment.parent_invalid {
        (segment.start_pos, river.segment_width_at(id, 0.0))
    } else {
        (
            river.segment(segment.parent).mid_point,
            river.segment_width_at(segment.parent, 0.5),
        )
    };
    out.push(ChannelPiece {
        a: upstream_from,
        b: segment.mid_point,
        width_a: upstream_width,
        width_b: mid_width,
        speed,
    });

    let needs_downstream = river.is_leaf_segment(id)
        || segment
            .children
            .iter()
            .any(|&child| river.segment(child).parent_invalid);
    if needs_downstream {
        out.push(ChannelPiece {
            a: segment.mid_point,
            b: segment.end_pos,
            width_a: mid_width,
            width_b: river.segment_width_at(id, 1.0),
            speed,
        });
    }
}
