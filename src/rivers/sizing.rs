use crate::config::RiverConfig;

use super::types::River;

/// Width every leaf drains into its parent with.
const LEAF_DEMAND: f64 = 1.0;

/// Propagate channel widths from every leaf toward the mouth.
///
/// A node is only resized while the incoming demand is at least its current
/// start size, so the widest tributary wins and widths never shrink going
/// downstream.
pub fn assign_river_sizes(river: &mut River, config: &RiverConfig) {
    for leaf in river.end_nodes() {
        let mut current = Some(leaf);
        let mut demand = LEAF_DEMAND;

        while let Some(id) = current {
            let node = river.node_mut(id);
            if node.start_size > demand {
                break;
            }

            node.end_size = demand;
            node.start_size = (demand + config.river_growth)
                .max(config.min_size)
                .min(config.max_size);

            demand = node.start_size;
            current = node.parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;
    use crate::rivers::types::{NodeId, RiverNode};

    /// Mouth with two leaf tributaries.
    fn forked_river() -> River {
        let mut river = River::new(Vec2::ZERO);
        let mouth = river.push_node(RiverNode::new(Vec2::ZERO, Vec2::new(100.0, 0.0), None, 1.0));
        for end in [Vec2::new(200.0, 50.0), Vec2::new(200.0, -50.0)] {
            river.push_node(RiverNode::new(Vec2::new(100.0, 0.0), end, Some(mouth), 1.0));
        }
        river.node_mut(mouth).end = false;
        river
    }

    #[test]
    fn test_leaf_and_parent_sizes() {
        let config = RiverConfig {
            min_size: 1.0,
            max_size: 200.0,
            river_growth: 5.0,
            ..Default::default()
        };
        let mut river = forked_river();
        assign_river_sizes(&mut river, &config);

        let leaf = river.node(NodeId(1));
        assert_eq!(leaf.end_size, 1.0);
        assert_eq!(leaf.start_size, 6.0);

        let mouth = river.node(NodeId(0));
        assert!(mouth.start_size >= 11.0);
        assert_eq!(mouth.end_size, 6.0);
    }

    #[test]
    fn test_sizes_clamped_and_monotonic() {
        let config = RiverConfig {
            min_size: 10.0,
            max_size: 12.0,
            river_growth: 5.0,
            ..Default::default()
        };
        let mut river = forked_river();
        assign_river_sizes(&mut river, &config);

        for node in &river.nodes {
            assert!(node.start_size >= config.min_size);
            assert!(node.start_size <= config.max_size);
            assert!(node.start_size >= node.end_size);
        }
    }
}
