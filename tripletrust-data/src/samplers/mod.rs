pub mod graph;
pub mod strategy;
pub mod traits;
pub mod triplet_sampler;

pub use graph::SimilarityGraph;
pub use strategy::{SamplingType, Strategy, StrategyParams};
pub use traits::{Sampler, Triplet};
pub use triplet_sampler::TripletSampler;
