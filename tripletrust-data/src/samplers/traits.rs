// tripletrust-data/src/samplers/traits.rs

use std::fmt::Debug;

use tripletrust_core::TripletRustError;

/// One sampled triplet of sample ids.
///
/// `margin` is `similarity(anchor, positive) - similarity(anchor, negative)`
/// and is present only for the multi-label aware strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triplet {
    pub anchor: usize,
    pub positive: usize,
    pub negative: usize,
    pub margin: Option<f32>,
}

impl Triplet {
    /// The three ids in (anchor, positive, negative) order.
    pub fn ids(&self) -> [usize; 3] {
        [self.anchor, self.positive, self.negative]
    }
}

/// A stateful source of triplets.
///
/// Batch assembly draws one triplet per slot from a `Sampler`. Each instance
/// is owned by exactly one execution context; it is `Send` so it can be moved
/// into the prefetch worker, but never shared.
pub trait Sampler: Debug + Send {
    /// Draws the next triplet, advancing the iteration counter by one.
    fn sample(&mut self) -> Result<Triplet, TripletRustError>;

    /// Number of `sample()` calls made so far.
    fn iteration(&self) -> u64;

    /// Whether every triplet from this sampler carries a margin.
    fn yields_margin(&self) -> bool;
}
