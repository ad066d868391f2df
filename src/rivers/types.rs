use crate::geometry::Vec2;

/// Index of a node within its river.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Index of a segment within its river.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub usize);

/// A segment addressed plate-wide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentRef {
    pub river: usize,
    pub segment: SegmentId,
}

/// One grown edge of a river tree. Flow runs from `end_pos` to `start_pos`;
/// `start_pos` is the downstream end.
#[derive(Clone, Debug, PartialEq)]
pub struct RiverNode {
    pub start_pos: Vec2,
    pub end_pos: Vec2,
    pub start_size: f64,
    pub end_size: f64,
    /// Downstream node, `None` at the mouth
    pub parent: Option<NodeId>,
    /// No node grows out of this one
    pub end: bool,
    pub segments: Vec<SegmentId>,
    pub lake: bool,
    /// Flow speed multiplier
    pub speed: f64,
}

impl RiverNode {
    pub fn new(start_pos: Vec2, end_pos: Vec2, parent: Option<NodeId>, speed: f64) -> Self {
        Self {
            start_pos,
            end_pos,
            start_size: 0.0,
            end_size: 0.0,
            parent,
            end: true,
            segments: Vec::new(),
            lake: false,
            speed,
        }
    }

    pub fn length(&self) -> f64 {
        self.start_pos.distance(self.end_pos)
    }

    /// Channel width at fraction `t` of the way from start to end.
    pub fn width_at(&self, t: f64) -> f64 {
        crate::geometry::lerp(self.start_size, self.end_size, t)
    }

    pub fn last_segment(&self) -> Option<SegmentId> {
        self.segments.last().copied()
    }
}

/// A subdivision of a node's path.
#[derive(Clone, Debug, PartialEq)]
pub struct RiverSegment {
    pub start_pos: Vec2,
    pub end_pos: Vec2,
    pub mid_point: Vec2,
    pub node: NodeId,
    /// Downstream segment; the segment itself at a mouth
    pub parent: SegmentId,
    /// Upstream segments; `[self]` at a leaf
    pub children: Vec<SegmentId>,
    /// Too sharp a bend to interpolate from the parent's midpoint
    pub parent_invalid: bool,
}

impl RiverSegment {
    pub fn new(id: SegmentId, node: NodeId, start_pos: Vec2, end_pos: Vec2) -> Self {
        Self {
            start_pos,
            end_pos,
            mid_point: start_pos + (end_pos - start_pos) * 0.5,
            node,
            parent: id,
            children: Vec::new(),
            parent_invalid: false,
        }
    }
}

/// One drainage tree. Owns its nodes and segments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct River {
    pub nodes: Vec<RiverNode>,
    pub segments: Vec<RiverSegment>,
    /// Mouth position, plate-local
    pub start_pos: Vec2,
    /// Culling radius around the mouth
    pub radius: f64,
}

impl River {
    pub fn new(start_pos: Vec2) -> Self {
        Self {
            start_pos,
            ..Default::default()
        }
    }

    pub fn node(&self, id: NodeId) -> &RiverNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut RiverNode {
        &mut self.nodes[id.0]
    }

    pub fn segment(&self, id: SegmentId) -> &RiverSegment {
        &self.segments[id.0]
    }

    pub fn segment_mut(&mut self, id: SegmentId) -> &mut RiverSegment {
        &mut self.segments[id.0]
    }

    pub fn push_node(&mut self, node: RiverNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn push_segment(&mut self, node: NodeId, start_pos: Vec2, end_pos: Vec2) -> SegmentId {
        let id = SegmentId(self.segments.len());
        self.segments.push(RiverSegment::new(id, node, start_pos, end_pos));
        self.nodes[node.0].segments.push(id);
        id
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn segment_ids(&self) -> impl Iterator<Item = SegmentId> {
        (0..self.segments.len()).map(SegmentId)
    }

    /// Nodes nothing grows out of.
    pub fn end_nodes(&self) -> Vec<NodeId> {
        self.node_ids().filter(|&id| self.node(id).end).collect()
    }

    pub fn is_leaf_segment(&self, id: SegmentId) -> bool {
        self.segment(id).children.first() == Some(&id)
    }

    pub fn is_root_segment(&self, id: SegmentId) -> bool {
        self.segment(id).parent == id
    }

    /// Position of `id` within its node's segment list.
    pub fn segment_index(&self, id: SegmentId) -> usize {
        let node = self.node(self.segment(id).node);
        node.segments.iter().position(|&s| s == id).unwrap_or(0)
    }

    /// Channel width at fraction `t` along segment `id`.
    pub fn segment_width_at(&self, id: SegmentId, t: f64) -> f64 {
        let node = self.node(self.segment(id).node);
        let count = node.segments.len().max(1) as f64;
        let index = self.segment_index(id) as f64;
        node.width_at((index + t) / count)
    }
}
