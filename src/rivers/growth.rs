//! River growth automaton.
//!
//! Rivers start at coastal ocean zones and grow inland one node at a time.
//! Every accepted node queues its continuation (or a fork), and the queue is
//! drained breadth first across all rivers of the plate, so rivers compete
//! for space in the order they were seeded.

use std::collections::VecDeque;

use rand::Rng;

use crate::config::RiverConfig;
use crate::geometry::{degrees_to_normal, line_intersects, normal_to_degrees, Vec2};
use crate::plates::ZoneGrid;

use super::next_int;
use super::types::{NodeId, River, RiverNode};

/// Pending growth step.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    /// Heading in degrees
    pub angle: f64,
    pub start_pos: Vec2,
    pub stage: i32,
    pub parent: Option<NodeId>,
    /// Index of the river the node belongs to
    pub river: usize,
    /// Remaining downhill steps
    pub error_budget: i32,
}

/// Grows every river of one plate.
pub struct RiverGrower<'a, R: Rng> {
    config: &'a RiverConfig,
    zones: &'a ZoneGrid,
    rng: &'a mut R,
    queue: VecDeque<GenerationRequest>,
    /// Every accepted node line in the plate, for intersection tests
    node_lines: Vec<(Vec2, Vec2)>,
    rivers: Vec<River>,
}

impl<'a, R: Rng> RiverGrower<'a, R> {
    pub fn new(config: &'a RiverConfig, zones: &'a ZoneGrid, rng: &'a mut R) -> Self {
        Self {
            config,
            zones,
            rng,
            queue: VecDeque::new(),
            node_lines: Vec::new(),
            rivers: Vec::new(),
        }
    }

    /// Seed rivers at coastal zones, grow them to completion and return them.
    pub fn grow(mut self) -> Vec<River> {
        let count = self.zones.count();
        for x in 0..count {
            for z in 0..count {
                let zone = self.zones.zone(x, z);
                if !zone.coastal {
                    continue;
                }
                if self.roll(100) < self.config.river_spawn_chance {
                    self.seed_river(x, z);
                }
            }
        }

        while let Some(request) = self.queue.pop_front() {
            self.grow_step(request);
        }

        tracing::debug!(
            rivers = self.rivers.len(),
            nodes = self.node_lines.len(),
            "river growth finished"
        );
        self.rivers
    }

    fn seed_river(&mut self, x: usize, z: usize) {
        let mouth = self.zones.zone(x, z).center;
        let (tx, tz) = self.zones.find_highest_zone(x, z, self.config.seed_hops);
        let target = self.zones.zone(tx, tz).center;
        let angle = normal_to_degrees((target - mouth).normalize());

        let river_index = self.rivers.len();
        self.rivers.push(River::new(mouth));

        let accepted = self.grow_step(GenerationRequest {
            angle,
            start_pos: mouth,
            stage: 0,
            parent: None,
            river: river_index,
            error_budget: self.config.error,
        });

        if !accepted {
            self.rivers.pop();
        }
    }

    /// Try to add one node. Returns whether it was accepted.
    fn grow_step(&mut self, request: GenerationRequest) -> bool {
        let config = self.config;
        if request.stage > config.max_nodes {
            return false;
        }

        let GenerationRequest {
            angle,
            start_pos,
            stage,
            parent,
            river,
            mut error_budget,
        } = request;

        let length = config.min_length + self.roll(config.length_variation);
        let end_pos = start_pos + degrees_to_normal(angle) * length as f64;

        // Probe half a length past the end so branches keep some clearance
        let probe = (end_pos - start_pos) * 0.5 + end_pos;
        let mut rejected = self.node_lines.iter().any(|&(a, b)| {
            start_pos != a && start_pos != b && line_intersects(start_pos, probe, a, b)
        });

        let plate_size = config.plate_size() as f64;
        if end_pos.x < 0.0 || end_pos.x > plate_size || end_pos.y < 0.0 || end_pos.y > plate_size {
            rejected = true;
        }

        let start_distance = self.zones.zone_at(start_pos.x, start_pos.y).ocean_distance;
        let end_zone = self.zones.zone_at(end_pos.x, end_pos.y);
        if start_distance > end_zone.ocean_distance {
            if error_budget == 0 {
                rejected = true;
            }
            error_budget -= 1;
        }

        if end_zone.ocean && stage > 2 {
            rejected = true;
        }

        if rejected {
            return false;
        }

        let node = RiverNode::new(start_pos, end_pos, parent, config.river_speed);
        let target = &mut self.rivers[river];
        let node_id = target.push_node(node);
        if let Some(parent) = parent {
            target.node_mut(parent).end = false;
        }
        self.node_lines.push((start_pos, end_pos));

        let split_roll = self.roll(100);
        if split_roll < config.river_split_chance && parent.is_some() {
            let left = angle + (config.min_fork_angle + self.roll(config.fork_variation)) as f64;
            let right = angle - (config.min_fork_angle + self.roll(config.fork_variation)) as f64;
            for fork in [left, right] {
                self.queue.push_back(GenerationRequest {
                    angle: fork,
                    start_pos: end_pos,
                    stage: stage + 1,
                    parent: Some(node_id),
                    river,
                    error_budget,
                });
            }
        } else {
            let mut sign = 0;
            while sign == 0 {
                sign = -1 + self.roll(3);
            }
            let bend = (self.roll(config.normal_angle) * sign) as f64;
            self.queue.push_back(GenerationRequest {
                angle: angle - bend,
                start_pos: end_pos,
                stage: stage + 1,
                parent: Some(node_id),
                river,
                error_budget,
            });
        }

        true
    }

    fn roll(&mut self, n: i32) -> i32 {
        next_int(&mut *self.rng, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn single_ocean_grid() -> ZoneGrid {
        let mut mask = vec![vec![false; 8]; 8];
        mask[0][7] = true;
        ZoneGrid::from_ocean_mask(256, &mask)
    }

    fn config() -> RiverConfig {
        RiverConfig {
            zones_in_plate: 8,
            zone_size: 256,
            river_spawn_chance: 100,
            min_nodes: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_mouth_heads_inland() {
        let grid = single_ocean_grid();
        let config = config();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let rivers = RiverGrower::new(&config, &grid, &mut rng).grow();

        assert_eq!(rivers.len(), 1);
        let river = &rivers[0];
        assert_eq!(river.start_pos, Vec2::new(128.0, 1920.0));

        let first = &river.nodes[0];
        assert_eq!(first.start_pos, river.start_pos);
        assert!(first.parent.is_none());

        // Uphill walk ends in the far corner, so the heading is diagonal
        let heading = (first.end_pos - first.start_pos).normalize();
        let expected = Vec2::new(1.0, -1.0).normalize();
        assert!(heading.distance(expected) < 1e-9);

        let start = grid.zone_at(first.start_pos.x, first.start_pos.y).ocean_distance;
        let end = grid.zone_at(first.end_pos.x, first.end_pos.y).ocean_distance;
        assert!(end >= start);
    }

    #[test]
    fn test_nodes_respect_length_and_bounds() {
        let grid = single_ocean_grid();
        let config = config();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let rivers = RiverGrower::new(&config, &grid, &mut rng).grow();
        let plate_size = config.plate_size() as f64;

        for node in rivers.iter().flat_map(|r| r.nodes.iter()) {
            let length = node.length();
            assert!(length >= config.min_length as f64 - 1e-6);
            assert!(length < (config.min_length + config.length_variation) as f64 + 1e-6);
            assert!(node.end_pos.x >= 0.0 && node.end_pos.x <= plate_size);
            assert!(node.end_pos.y >= 0.0 && node.end_pos.y <= plate_size);
        }
    }

    #[test]
    fn test_children_clear_parent_end_flag() {
        let grid = single_ocean_grid();
        let config = config();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let rivers = RiverGrower::new(&config, &grid, &mut rng).grow();

        for river in &rivers {
            for id in river.node_ids() {
                let has_child = river.nodes.iter().any(|n| n.parent == Some(id));
                assert_eq!(river.node(id).end, !has_child);
            }
        }
    }

    #[test]
    fn test_zero_spawn_chance_grows_nothing() {
        let grid = single_ocean_grid();
        let config = RiverConfig {
            river_spawn_chance: 0,
            ..config()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(RiverGrower::new(&config, &grid, &mut rng).grow().is_empty());
    }
}
