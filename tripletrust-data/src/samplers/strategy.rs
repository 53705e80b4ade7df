// tripletrust-data/src/samplers/strategy.rs

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tripletrust_core::TripletRustError;

use super::graph::SimilarityGraph;

/// Name of a triplet sampling strategy, as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplingType {
    /// Single-label random triplets, no margin.
    #[default]
    Random,
    /// Random triplets with a label-similarity margin.
    RandomMultilabel,
    /// Least-similar negative among `k` candidates after `n` warm-up iterations.
    HardMultilabel,
    /// Negatives mined from a precomputed similarity graph.
    HardGraph,
}

impl SamplingType {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingType::Random => "RANDOM",
            SamplingType::RandomMultilabel => "RANDOM_MULTILABEL",
            SamplingType::HardMultilabel => "HARD_MULTILABEL",
            SamplingType::HardGraph => "HARD_GRAPH",
        }
    }

    /// True for strategies whose triplets carry a margin.
    pub fn yields_margin(&self) -> bool {
        !matches!(self, SamplingType::Random)
    }
}

impl fmt::Display for SamplingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SamplingType {
    type Err = TripletRustError;

    /// Case-insensitive; `HARD` is accepted as an alias of `HARD_GRAPH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RANDOM" => Ok(SamplingType::Random),
            "RANDOM_MULTILABEL" => Ok(SamplingType::RandomMultilabel),
            "HARD_MULTILABEL" => Ok(SamplingType::HardMultilabel),
            "HARD_GRAPH" | "HARD" => Ok(SamplingType::HardGraph),
            _ => Err(TripletRustError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Optional strategy parameters as supplied by configuration.
///
/// * `k` - number of negative candidates considered by the hard strategies.
/// * `m` - precomputed similarity graph for `HARD_GRAPH`.
/// * `n` - number of warm-up iterations sampled randomly before hard mining.
#[derive(Debug, Clone, Default)]
pub struct StrategyParams {
    pub k: Option<usize>,
    pub m: Option<Arc<SimilarityGraph>>,
    pub n: Option<u64>,
}

/// A sampling strategy with its parameters resolved.
///
/// Fixed when the sampler is built; there are no transitions between
/// variants during a run.
#[derive(Debug, Clone)]
pub enum Strategy {
    Random,
    RandomMultilabel,
    HardMultilabel {
        k: usize,
        n: u64,
    },
    HardGraph {
        graph: Arc<SimilarityGraph>,
        k: usize,
        n: u64,
    },
}

impl Strategy {
    /// Resolves a strategy from its name and the configured parameters.
    ///
    /// # Errors
    ///
    /// `MissingStrategyParameter` when `HARD_MULTILABEL` lacks `k` or `n`, or
    /// `HARD_GRAPH` lacks `k` or `m`. `InvalidConfig` when `k` is zero.
    pub fn resolve(kind: SamplingType, params: &StrategyParams) -> Result<Self, TripletRustError> {
        let missing = |parameter: &str| TripletRustError::MissingStrategyParameter {
            strategy: kind.to_string(),
            parameter: parameter.to_string(),
        };
        let check_k = |k: usize| {
            if k == 0 {
                Err(TripletRustError::InvalidConfig(format!(
                    "{} needs k > 0 negative candidates",
                    kind
                )))
            } else {
                Ok(k)
            }
        };

        match kind {
            SamplingType::Random => Ok(Strategy::Random),
            SamplingType::RandomMultilabel => Ok(Strategy::RandomMultilabel),
            SamplingType::HardMultilabel => {
                let k = check_k(params.k.ok_or_else(|| missing("k"))?)?;
                let n = params.n.ok_or_else(|| missing("n"))?;
                Ok(Strategy::HardMultilabel { k, n })
            }
            SamplingType::HardGraph => {
                let k = check_k(params.k.ok_or_else(|| missing("k"))?)?;
                let graph = params.m.clone().ok_or_else(|| missing("m"))?;
                Ok(Strategy::HardGraph {
                    graph,
                    k,
                    n: params.n.unwrap_or(0),
                })
            }
        }
    }

    /// The configuration name of this strategy.
    pub fn kind(&self) -> SamplingType {
        match self {
            Strategy::Random => SamplingType::Random,
            Strategy::RandomMultilabel => SamplingType::RandomMultilabel,
            Strategy::HardMultilabel { .. } => SamplingType::HardMultilabel,
            Strategy::HardGraph { .. } => SamplingType::HardGraph,
        }
    }
}
