//! River networks: growth, sizing, segment topology and the distance field.

pub mod growth;
pub mod sampler;
pub mod segments;
pub mod sizing;
pub mod types;

use rand::Rng;

pub use growth::{GenerationRequest, RiverGrower};
pub use sampler::{ChannelPiece, RiverSample, RiverSampler, NO_INFLUENCE};
pub use sizing::assign_river_sizes;
pub use types::{NodeId, River, RiverNode, RiverSegment, SegmentId, SegmentRef};

/// Uniform integer in `[0, n)`, or 0 when `n <= 0`.
pub(crate) fn next_int<R: Rng + ?Sized>(rng: &mut R, n: i32) -> i32 {
    if n <= 0 {
        0
    } else {
        rng.gen_range(0..n)
    }
}
