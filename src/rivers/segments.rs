//! Segment topology for finished rivers.
//!
//! Each node is split into `segments_in_river` jittered segments. Segments are
//! linked into a tree mirroring the nodes, then checked for bends too sharp to
//! interpolate smoothly across.

use rand::Rng;

use crate::config::RiverConfig;
use crate::geometry::{degrees_to_normal, line_intersects, normal_to_degrees, projection, Vec2};

use super::next_int;
use super::types::{NodeId, River, RiverNode, SegmentId, SegmentRef};

/// Culling pad added to the farthest segment end when computing a radius.
pub const RADIUS_PADDING: f64 = 512.0;

/// Distance a lake extends past the leaf it hangs off.
pub const LAKE_LENGTH: f64 = 100.0;

/// Projection window in which a bend still interpolates cleanly.
const MIN_PROJECTION: f64 = 0.2;
const MAX_PROJECTION: f64 = 0.8;

/// Shares of `segment_offset` tried, in order, before a node falls back to
/// its straight line.
const JITTER_SCALES: [f64; 3] = [1.0, 0.5, 0.25];

/// Split every node into segments. Intermediate points are offset
/// perpendicular to the node by up to `segment_offset` either way.
pub fn build_river_segments<R: Rng + ?Sized>(river: &mut River, config: &RiverConfig, rng: &mut R) {
    build_plate_segments(std::slice::from_mut(river), config, rng);
}

/// Split every node of every river on a plate into segments, keeping the
/// jittered polylines from crossing one another.
///
/// Nodes are placed in order. A node's polyline is checked against the
/// segments already placed and the straight lines of the nodes still to come;
/// on a crossing the jitter shrinks, down to the straight node line, which
/// growth already guarantees is clear. Lines sharing an endpoint never count
/// as crossing.
pub fn build_plate_segments<R: Rng + ?Sized>(rivers: &mut [River], config: &RiverConfig, rng: &mut R) {
    let count = config.segments_in_river.max(1) as usize;

    let mut pending: Vec<Vec<Option<(Vec2, Vec2)>>> = rivers
        .iter()
        .map(|river| {
            river
                .nodes
                .iter()
                .map(|node| (!node.lake).then_some((node.start_pos, node.end_pos)))
                .collect()
        })
        .collect();
    let mut placed: Vec<(Vec2, Vec2)> = Vec::new();

    for river_index in 0..rivers.len() {
        for node_index in 0..rivers[river_index].nodes.len() {
            let id = NodeId(node_index);
            let (start, end, lake) = {
                let node = rivers[river_index].node(id);
                (node.start_pos, node.end_pos, node.lake)
            };
            pending[river_index][node_index] = None;

            // Drawn for every segment so the random stream does not depend on
            // which segment is last or how far the jitter shrinks
            let offsets: Vec<f64> = (0..count)
                .map(|_| -config.segment_offset + rng.gen::<f64>() * config.segment_offset * 2.0)
                .collect();

            let clear = |points: &[Vec2]| {
                points.windows(2).all(|pair| {
                    let others = placed
                        .iter()
                        .copied()
                        .chain(pending.iter().flatten().flatten().copied());
                    !crosses_any(pair[0], pair[1], others)
                })
            };

            let points = if lake {
                node_polyline(start, end, &offsets, 1.0)
            } else {
                JITTER_SCALES
                    .iter()
                    .map(|&scale| node_polyline(start, end, &offsets, scale))
                    .find(|points| clear(points.as_slice()))
                    .unwrap_or_else(|| node_polyline(start, end, &offsets, 0.0))
            };

            for pair in points.windows(2) {
                rivers[river_index].push_segment(id, pair[0], pair[1]);
                if !lake {
                    placed.push((pair[0], pair[1]));
                }
            }
        }
    }
}

/// Points of a node's polyline, with `offsets` scaled by `scale` applied
/// perpendicular to the node. The last offset is unused; the polyline always
/// ends on the node end.
fn node_polyline(start: Vec2, end: Vec2, offsets: &[f64], scale: f64) -> Vec<Vec2> {
    let count = offsets.len();
    let normal = (end - start).normalize().perpendicular();

    let mut points = Vec::with_capacity(count + 1);
    points.push(start);
    for (i, offset) in offsets.iter().enumerate().take(count.saturating_sub(1)) {
        points.push(start.lerp(end, (i + 1) as f64 / count as f64) + normal * (offset * scale));
    }
    points.push(end);
    points
}

fn crosses_any(a: Vec2, b: Vec2, lines: impl Iterator<Item = (Vec2, Vec2)>) -> bool {
    lines
        .filter(|&(c, d)| a != c && a != d && b != c && b != d)
        .any(|(c, d)| line_intersects(a, b, c, d))
}

/// Link segments into a tree and register mouth segments in `starts`.
///
/// A node's first segment hangs off the last segment of its parent node;
/// the mouth's first segment is its own parent. Segments with no children
/// become their own child.
pub fn connect_segments(river: &mut River, river_index: usize, starts: &mut Vec<SegmentRef>) {
    for node_index in 0..river.nodes.len() {
        let node = river.node(NodeId(node_index));
        let segments = node.segments.clone();
        let parent_last = node.parent.and_then(|p| river.node(p).last_segment());

        for (i, &segment) in segments.iter().enumerate() {
            if i == 0 {
                match parent_last {
                    Some(parent) => {
                        river.segment_mut(segment).parent = parent;
                        river.segment_mut(parent).children.push(segment);
                    }
                    None => {
                        starts.push(SegmentRef {
                            river: river_index,
                            segment,
                        });
                        river.segment_mut(segment).parent = segment;
                    }
                }
                continue;
            }

            let previous = segments[i - 1];
            river.segment_mut(segment).parent = previous;
            river.segment_mut(previous).children.push(segment);
        }
    }

    for (index, segment) in river.segments.iter_mut().enumerate() {
        if segment.children.is_empty() {
            segment.children.push(SegmentId(index));
        }
    }
}

/// Mark segments whose bend from the parent is too sharp to interpolate.
pub fn validate_segments(river: &mut River) {
    for id in river.segment_ids().collect::<Vec<_>>() {
        let invalid = bend_too_sharp(river, id);
        river.segment_mut(id).parent_invalid = invalid;
    }
}

/// Sentinels always count as invalid. Otherwise the segment start is
/// projected onto the line between the two midpoints and must land near the
/// middle of it.
fn bend_too_sharp(river: &River, id: SegmentId) -> bool {
    if river.is_leaf_segment(id) || river.is_root_segment(id) {
        return true;
    }

    let segment = river.segment(id);
    let parent = river.segment(segment.parent);
    let t = projection(segment.start_pos, parent.mid_point, segment.mid_point);
    !(MIN_PROJECTION..=MAX_PROJECTION).contains(&t)
}

/// Farthest segment end from the mouth, plus the culling pad.
pub fn compute_radius(river: &River) -> f64 {
    let farthest = river
        .segments
        .iter()
        .map(|segment| river.start_pos.distance(segment.end_pos))
        .fold(0.0, f64::max);
    farthest + RADIUS_PADDING
}

/// Roll a lake onto each of `leaves`.
pub fn add_lakes<R: Rng + ?Sized>(river: &mut River, leaves: &[NodeId], config: &RiverConfig, rng: &mut R) -> usize {
    let mut added = 0;
    for &leaf in leaves {
        if next_int(rng, 100) < config.lake_chance {
            add_lake(river, leaf, config, rng);
            added += 1;
        }
    }
    added
}

/// Append a single-segment still-water node past the end of `leaf`.
///
/// The leaf narrows to half the minimum river size where it enters the lake,
/// and its last segment always interpolates from its parent.
pub fn add_lake<R: Rng + ?Sized>(river: &mut River, leaf: NodeId, config: &RiverConfig, rng: &mut R) -> NodeId {
    let start_size = (config.min_size / 2.0).floor();
    let (start_pos, heading, leaf_last) = {
        let node = river.node_mut(leaf);
        node.end_size = start_size;
        let heading = normal_to_degrees((node.end_pos - node.start_pos).normalize());
        (node.end_pos, heading, node.last_segment())
    };

    let lake_size = next_int(rng, config.max_lake_size - config.min_lake_size) + config.min_lake_size;
    let end_pos = start_pos + degrees_to_normal(heading) * LAKE_LENGTH;

    let mut lake = RiverNode::new(start_pos, end_pos, Some(leaf), 0.0);
    lake.start_size = start_size;
    lake.end_size = lake_size as f64;
    lake.lake = true;

    let lake_id = river.push_node(lake);
    river.node_mut(leaf).end = false;

    let segment = river.push_segment(lake_id, start_pos, end_pos);
    {
        let lake_segment = river.segment_mut(segment);
        lake_segment.children = vec![segment];
        lake_segment.parent_invalid = true;
    }

    if let Some(leaf_last) = leaf_last {
        river.segment_mut(segment).parent = leaf_last;
        river.segment_mut(leaf_last).children = vec![segment];
        // A mouth segment has no parent to interpolate from
        let root = river.is_root_segment(leaf_last);
        river.segment_mut(leaf_last).parent_invalid = root;
    }

    lake_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Straight mouth node with one straight continuation.
    fn straight_river() -> River {
        let mut river = River::new(Vec2::ZERO);
        let mouth = river.push_node(RiverNode::new(Vec2::ZERO, Vec2::new(300.0, 0.0), None, 1.0));
        river.node_mut(mouth).end = false;
        river.push_node(RiverNode::new(
            Vec2::new(300.0, 0.0),
            Vec2::new(600.0, 0.0),
            Some(mouth),
            1.0,
        ));
        river
    }

    fn no_jitter() -> RiverConfig {
        RiverConfig {
            segment_offset: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_segments_tile_the_node() {
        let config = RiverConfig::default();
        let mut river = straight_river();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        build_river_segments(&mut river, &config, &mut rng);

        assert_eq!(river.segments.len(), 6);
        for node in &river.nodes {
            assert_eq!(node.segments.len(), 3);
            let first = river.segment(node.segments[0]);
            let last = river.segment(node.segments[2]);
            assert_eq!(first.start_pos, node.start_pos);
            assert_eq!(last.end_pos, node.end_pos);
            for pair in node.segments.windows(2) {
                assert_eq!(river.segment(pair[0]).end_pos, river.segment(pair[1]).start_pos);
            }
            // Jitter stays within the configured offset
            let middle = river.segment(node.segments[0]).end_pos;
            assert!(middle.y.abs() <= config.segment_offset + 1e-9);
        }
    }

    #[test]
    fn test_connect_links_nodes_and_sentinels() {
        let config = no_jitter();
        let mut river = straight_river();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        build_river_segments(&mut river, &config, &mut rng);

        let mut starts = Vec::new();
        connect_segments(&mut river, 4, &mut starts);

        assert_eq!(starts, vec![SegmentRef { river: 4, segment: SegmentId(0) }]);
        assert!(river.is_root_segment(SegmentId(0)));
        // First segment of the second node hangs off the mouth node's last one
        assert_eq!(river.segment(SegmentId(3)).parent, SegmentId(2));
        assert_eq!(river.segment(SegmentId(2)).children, vec![SegmentId(3)]);
        assert!(river.is_leaf_segment(SegmentId(5)));
        assert!(!river.is_leaf_segment(SegmentId(4)));
    }

    #[test]
    fn test_validate_straight_and_sharp_bends() {
        let config = no_jitter();
        let mut river = straight_river();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        build_river_segments(&mut river, &config, &mut rng);
        connect_segments(&mut river, 0, &mut Vec::new());
        validate_segments(&mut river);

        assert!(river.segment(SegmentId(0)).parent_invalid);
        assert!(river.segment(SegmentId(5)).parent_invalid);
        for id in 1..5 {
            assert!(!river.segment(SegmentId(id)).parent_invalid, "segment {}", id);
        }

        // Fold the second node almost straight back: the joint becomes invalid
        let mut folded = River::new(Vec2::ZERO);
        let mouth = folded.push_node(RiverNode::new(Vec2::ZERO, Vec2::new(300.0, 0.0), None, 1.0));
        folded.node_mut(mouth).end = false;
        folded.push_node(RiverNode::new(
            Vec2::new(300.0, 0.0),
            Vec2::new(0.0, 60.0),
            Some(mouth),
            1.0,
        ));
        build_river_segments(&mut folded, &config, &mut rng);
        connect_segments(&mut folded, 0, &mut Vec::new());
        validate_segments(&mut folded);
        assert!(!folded.segment(SegmentId(1)).parent_invalid);
        assert!(folded.segment(SegmentId(3)).parent_invalid);
    }

    #[test]
    fn test_radius_includes_padding() {
        let config = no_jitter();
        let mut river = straight_river();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        build_river_segments(&mut river, &config, &mut rng);
        assert!((compute_radius(&river) - (600.0 + RADIUS_PADDING)).abs() < 1e-9);
    }

    #[test]
    fn test_lake_hangs_off_leaf() {
        let config = RiverConfig {
            segment_offset: 0.0,
            min_lake_size: 50,
            max_lake_size: 75,
            ..Default::default()
        };
        let mut river = straight_river();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        build_river_segments(&mut river, &config, &mut rng);
        connect_segments(&mut river, 0, &mut Vec::new());
        validate_segments(&mut river);
        river.node_mut(NodeId(1)).end_size = 8.0;

        let lake = add_lake(&mut river, NodeId(1), &config, &mut rng);
        let node = river.node(lake);
        assert!(node.lake);
        assert_eq!(node.speed, 0.0);
        // Half the minimum river size, whatever the leaf carried before
        assert_eq!(river.node(NodeId(1)).end_size, 5.0);
        assert_eq!(node.start_size, 5.0);
        assert!(node.end_size >= 50.0 && node.end_size < 75.0);
        assert!(node.end_pos.distance(Vec2::new(700.0, 0.0)) < 1e-9);
        assert!(!river.node(NodeId(1)).end);

        let segment = node.segments[0];
        assert_eq!(river.segment(segment).parent, SegmentId(5));
        assert!(river.segment(segment).parent_invalid);
        assert!(river.is_leaf_segment(segment));
        assert_eq!(river.segment(SegmentId(5)).children, vec![segment]);
        // Straight continuation: the old leaf now interpolates from its parent
        assert!(!river.segment(SegmentId(5)).parent_invalid);
    }

    #[test]
    fn test_lake_smooths_sharp_leaf_but_not_mouth() {
        let config = RiverConfig {
            segment_offset: 0.0,
            segments_in_river: 1,
            min_size: 7.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        // Leaf folded back on the mouth: invalid until a lake hangs off it
        let mut folded = River::new(Vec2::ZERO);
        let mouth = folded.push_node(RiverNode::new(Vec2::ZERO, Vec2::new(300.0, 0.0), None, 1.0));
        folded.node_mut(mouth).end = false;
        let leaf = folded.push_node(RiverNode::new(
            Vec2::new(300.0, 0.0),
            Vec2::new(0.0, 60.0),
            Some(mouth),
            1.0,
        ));
        build_river_segments(&mut folded, &config, &mut rng);
        connect_segments(&mut folded, 0, &mut Vec::new());
        validate_segments(&mut folded);
        assert!(folded.segment(SegmentId(1)).parent_invalid);

        let lake = add_lake(&mut folded, leaf, &config, &mut rng);
        assert!(!folded.segment(SegmentId(1)).parent_invalid);
        assert_eq!(folded.node(lake).start_size, 3.0);

        // A lone mouth segment has nothing upstream to interpolate from
        let mut single = River::new(Vec2::ZERO);
        let only = single.push_node(RiverNode::new(Vec2::ZERO, Vec2::new(300.0, 0.0), None, 1.0));
        build_river_segments(&mut single, &config, &mut rng);
        connect_segments(&mut single, 0, &mut Vec::new());
        validate_segments(&mut single);
        add_lake(&mut single, only, &config, &mut rng);
        assert!(single.segment(SegmentId(0)).parent_invalid);
        assert!(single.is_root_segment(SegmentId(0)));
    }

    #[test]
    fn test_jitter_never_crosses_neighbouring_river() {
        let config = RiverConfig::default();
        let lone = |z: f64| {
            let mut river = River::new(Vec2::new(0.0, z));
            river.push_node(RiverNode::new(Vec2::new(0.0, z), Vec2::new(300.0, z), None, 1.0));
            river
        };

        let mut jittered = 0;
        for seed in 0..32 {
            // Closer together than twice the offset
            let mut rivers = vec![lone(0.0), lone(30.0)];
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            build_plate_segments(&mut rivers, &config, &mut rng);

            for a in &rivers[0].segments {
                for b in &rivers[1].segments {
                    assert!(
                        !line_intersects(a.start_pos, a.end_pos, b.start_pos, b.end_pos),
                        "seed {}: {:?} crosses {:?}",
                        seed,
                        (a.start_pos, a.end_pos),
                        (b.start_pos, b.end_pos)
                    );
                }
            }
            jittered += rivers[1].segments.iter().filter(|s| s.end_pos.y != 30.0).count();
        }
        // The shrink keeps some jitter rather than always going straight
        assert!(jittered > 0);
    }

    #[test]
    fn test_single_river_wrapper_matches_plate_builder() {
        let config = RiverConfig::default();
        let mut single = straight_river();
        build_river_segments(&mut single, &config, &mut ChaCha8Rng::seed_from_u64(5));

        let mut rivers = vec![straight_river()];
        build_plate_segments(&mut rivers, &config, &mut ChaCha8Rng::seed_from_u64(5));
        assert_eq!(single, rivers[0]);
    }
}
