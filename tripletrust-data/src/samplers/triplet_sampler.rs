// tripletrust-data/src/samplers/triplet_sampler.rs

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::index::sample as sample_indices;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tripletrust_core::TripletRustError;

use super::graph::SimilarityGraph;
use super::strategy::{SamplingType, Strategy, StrategyParams};
use super::traits::{Sampler, Triplet};
use crate::labels::{LabelIndex, LabelSet};
use crate::similarity::{Jaccard, SimilarityMetric};

/// Samples (anchor, positive, negative) triplets from a label index.
///
/// Anchor and positive are drawn with replacement from the bucket of one
/// label; the negative comes from the bucket of a second, distinct label
/// (or, for `HARD_GRAPH`, from the anchor's graph neighbours outside the
/// anchor label). Because the draw is with replacement, anchor and positive
/// may be the same sample when the bucket is small.
///
/// The sampler owns its random source. Build it with a seed for
/// reproducible sequences.
#[derive(Debug)]
pub struct TripletSampler {
    index: LabelIndex,
    strategy: Strategy,
    metric: Box<dyn SimilarityMetric>,
    rng: StdRng,
    iteration: u64,
}

impl TripletSampler {
    /// Creates a sampler over an already built index.
    ///
    /// # Errors
    ///
    /// - `InsufficientClasses` if the index has fewer than two label buckets.
    /// - `InvalidConfig` if a `HARD_GRAPH` graph references sample ids outside the index.
    pub fn new(strategy: Strategy, index: LabelIndex, rng: StdRng) -> Result<Self, TripletRustError> {
        if index.num_classes() < 2 {
            return Err(TripletRustError::InsufficientClasses {
                found: index.num_classes(),
            });
        }
        if let Strategy::HardGraph { graph, .. } = &strategy {
            if let Some(max_node) = graph.max_node() {
                if max_node >= index.len() {
                    return Err(TripletRustError::InvalidConfig(format!(
                        "similarity graph references sample {} but only {} samples are loaded",
                        max_node,
                        index.len()
                    )));
                }
            }
        }
        info!(
            "TripletSampler: {} sampling over {} samples in {} label buckets",
            strategy.kind(),
            index.len(),
            index.num_classes()
        );
        Ok(TripletSampler {
            index,
            strategy,
            metric: Box::new(Jaccard),
            rng,
            iteration: 0,
        })
    }

    /// Builds the index from serialized labels and resolves the strategy by name.
    ///
    /// Without a seed the random source is seeded from system entropy.
    pub fn from_labels<S: AsRef<str>>(
        sampling_type: &str,
        labels: &[S],
        params: &StrategyParams,
        seed: Option<u64>,
    ) -> Result<Self, TripletRustError> {
        let kind: SamplingType = sampling_type.parse()?;
        let strategy = Strategy::resolve(kind, params)?;
        let index = LabelIndex::build(labels)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(strategy, index, rng)
    }

    /// Replaces the label similarity metric (Jaccard by default).
    pub fn with_metric(mut self, metric: Box<dyn SimilarityMetric>) -> Self {
        self.metric = metric;
        self
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn index(&self) -> &LabelIndex {
        &self.index
    }

    /// Draws two distinct label values uniformly: (anchor class, negative class).
    fn draw_classes(&mut self) -> Result<(u32, u32), TripletRustError> {
        let keys = self.index.keys();
        if keys.len() < 2 {
            return Err(TripletRustError::InsufficientClasses { found: keys.len() });
        }
        let picked = sample_indices(&mut self.rng, keys.len(), 2);
        Ok((keys[picked.index(0)], keys[picked.index(1)]))
    }

    /// Draws one sample id uniformly from the bucket of `label`.
    fn draw_one(&mut self, label: u32) -> Result<usize, TripletRustError> {
        // Buckets only exist once a sample has been pushed, so they are never empty.
        self.index
            .bucket(label)
            .and_then(|ids| ids.choose(&mut self.rng))
            .copied()
            .ok_or_else(|| TripletRustError::InsufficientClasses {
                found: self.index.num_classes(),
            })
    }

    fn label(&self, sample_id: usize) -> Result<&LabelSet, TripletRustError> {
        self.index.label_of(sample_id)
    }

    fn margin(&self, anchor: usize, positive: usize, negative: usize) -> Result<f32, TripletRustError> {
        let anchor_label = self.label(anchor)?;
        let p_sim = self.metric.similarity(anchor_label, self.label(positive)?);
        let n_sim = self.metric.similarity(anchor_label, self.label(negative)?);
        Ok(p_sim - n_sim)
    }

    fn random(&mut self) -> Result<Triplet, TripletRustError> {
        let (anchor_class, negative_class) = self.draw_classes()?;
        let anchor = self.draw_one(anchor_class)?;
        let positive = self.draw_one(anchor_class)?;
        let negative = self.draw_one(negative_class)?;
        Ok(Triplet {
            anchor,
            positive,
            negative,
            margin: None,
        })
    }

    fn random_multilabel(&mut self) -> Result<Triplet, TripletRustError> {
        let triplet = self.random()?;
        let margin = self.margin(triplet.anchor, triplet.positive, triplet.negative)?;
        Ok(Triplet {
            margin: Some(margin),
            ..triplet
        })
    }

    fn hard_multilabel(&mut self, k: usize, warmup: u64) -> Result<Triplet, TripletRustError> {
        if self.iteration <= warmup {
            return self.random_multilabel();
        }
        if self.iteration == warmup + 1 {
            info!(
                "TripletSampler: warm-up of {} iterations done, mining hardest of {} negatives",
                warmup, k
            );
        }

        let (anchor_class, negative_class) = self.draw_classes()?;
        let anchor = self.draw_one(anchor_class)?;
        let positive = self.draw_one(anchor_class)?;
        let candidates = (0..k)
            .map(|_| self.draw_one(negative_class))
            .collect::<Result<Vec<_>, _>>()?;

        let anchor_label = self.label(anchor)?;
        let (negative, n_sim) =
            select_hardest(anchor_label, &candidates, &self.index, self.metric.as_ref())?;
        let p_sim = self.metric.similarity(anchor_label, self.label(positive)?);
        Ok(Triplet {
            anchor,
            positive,
            negative,
            margin: Some(p_sim - n_sim),
        })
    }

    fn hard_graph(
        &mut self,
        graph: &SimilarityGraph,
        k: usize,
        warmup: u64,
    ) -> Result<Triplet, TripletRustError> {
        if self.iteration <= warmup {
            return self.random_multilabel();
        }

        let (anchor_class, negative_class) = self.draw_classes()?;
        let anchor = self.draw_one(anchor_class)?;
        let positive = self.draw_one(anchor_class)?;
        let candidates = graph_candidates(graph, &self.index, anchor, anchor_class, k);
        let negative = match candidates.choose(&mut self.rng) {
            Some(&id) => id,
            None => {
                debug!(
                    "TripletSampler: sample {} has no graph neighbour outside label {}, drawing a random negative",
                    anchor, anchor_class
                );
                self.draw_one(negative_class)?
            }
        };
        let margin = self.margin(anchor, positive, negative)?;
        Ok(Triplet {
            anchor,
            positive,
            negative,
            margin: Some(margin),
        })
    }
}

impl Sampler for TripletSampler {
    /// Increments the iteration counter, then dispatches on the strategy.
    fn sample(&mut self) -> Result<Triplet, TripletRustError> {
        self.iteration += 1;
        // Cheap clone: the graph is behind an Arc.
        match self.strategy.clone() {
            Strategy::Random => self.random(),
            Strategy::RandomMultilabel => self.random_multilabel(),
            Strategy::HardMultilabel { k, n } => self.hard_multilabel(k, n),
            Strategy::HardGraph { graph, k, n } => self.hard_graph(&graph, k, n),
        }
    }

    fn iteration(&self) -> u64 {
        self.iteration
    }

    fn yields_margin(&self) -> bool {
        self.strategy.kind().yields_margin()
    }
}

/// Picks the candidate least similar to the anchor.
///
/// Returns the chosen id and its similarity. Ties go to the first minimum in
/// `candidates` order.
pub fn select_hardest(
    anchor_label: &LabelSet,
    candidates: &[usize],
    index: &LabelIndex,
    metric: &dyn SimilarityMetric,
) -> Result<(usize, f32), TripletRustError> {
    let mut best: Option<(usize, f32)> = None;
    for &candidate in candidates {
        let sim = metric.similarity(anchor_label, index.label_of(candidate)?);
        match best {
            Some((_, best_sim)) if sim >= best_sim => {}
            _ => best = Some((candidate, sim)),
        }
    }
    best.ok_or_else(|| {
        TripletRustError::InvalidConfig("hard negative selection needs at least one candidate".to_string())
    })
}

/// The `k` strongest graph neighbours of `anchor` that do not carry `anchor_class`.
pub fn graph_candidates(
    graph: &SimilarityGraph,
    index: &LabelIndex,
    anchor: usize,
    anchor_class: u32,
    k: usize,
) -> Vec<usize> {
    graph
        .neighbors(anchor)
        .iter()
        .map(|&(id, _)| id)
        .filter(|&id| !index.has_label(id, anchor_class))
        .take(k)
        .collect()
}

#[cfg(test)]
#[path = "triplet_sampler_test.rs"]
mod tests;
