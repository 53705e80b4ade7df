// tripletrust-data/src/config.rs
//
// Layer configuration. Built either with `TripletLayerConfig::builder()` or
// parsed from the JSON parameter string of the data layer:
//
//     {"source": "train.csv", "batch_size": 32, "resize": [227, 227],
//      "type": "HARD_MULTILABEL", "k": 10, "n": 1000, "prefetch": true}

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use tripletrust_core::TripletRustError;

use crate::decode::{ImageMean, Resize};
use crate::samplers::{SamplingType, SimilarityGraph, Strategy, StrategyParams};
use crate::sources::SourceType;

/// Where the image mean comes from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MeanSource {
    /// Inline per-channel values.
    Values(Vec<f32>),
    /// Path of a mean file, see [`ImageMean::from_file`].
    File(PathBuf),
}

/// Configuration of a triplet data layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TripletLayerConfig {
    /// Triplets per batch.
    pub batch_size: usize,
    /// A single edge length, `[width, height]`, or a non-positive value to disable.
    #[serde(deserialize_with = "deserialize_resize")]
    pub resize: Resize,
    pub mean_file: Option<MeanSource>,
    #[serde(deserialize_with = "deserialize_from_str")]
    pub source_type: SourceType,
    /// CSV or BCF data file.
    pub source: Option<PathBuf>,
    /// Label file of a BCF source.
    pub labels: Option<PathBuf>,
    /// Directory prepended to relative CSV image paths.
    pub root: Option<PathBuf>,
    /// The CSV file starts with a header row.
    pub header: bool,
    pub shuffle: bool,
    /// Keep samples encoded in memory and decode per batch. When false every
    /// sample is decoded once at load time.
    pub compressed: bool,
    #[serde(rename = "type", deserialize_with = "deserialize_from_str")]
    pub sampling_type: SamplingType,
    pub prefetch: bool,
    /// Negative candidate pool size.
    pub k: Option<usize>,
    /// Similarity graph file for `HARD_GRAPH`.
    pub m: Option<PathBuf>,
    /// Warm-up iterations.
    pub n: Option<u64>,
    pub seed: Option<u64>,
    /// Capacity of the prefetch hand-off channel.
    pub prefetch_depth: usize,
    /// Draws per batch slot before a decode failure fails the batch.
    pub max_decode_attempts: usize,
}

impl Default for TripletLayerConfig {
    fn default() -> Self {
        TripletLayerConfig {
            batch_size: 256,
            resize: Resize::Disabled,
            mean_file: None,
            source_type: SourceType::Csv,
            source: None,
            labels: None,
            root: None,
            header: false,
            shuffle: false,
            compressed: true,
            sampling_type: SamplingType::Random,
            prefetch: false,
            k: None,
            m: None,
            n: None,
            seed: None,
            prefetch_depth: 1,
            max_decode_attempts: 3,
        }
    }
}

fn deserialize_from_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(de::Error::custom)
}

fn deserialize_resize<'de, D>(deserializer: D) -> Result<Resize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ResizeSetting {
        Edge(i64),
        Pair(u32, u32),
    }

    Ok(match ResizeSetting::deserialize(deserializer)? {
        ResizeSetting::Edge(edge) if edge <= 0 => Resize::Disabled,
        ResizeSetting::Edge(edge) => Resize::Square(u32::try_from(edge).map_err(de::Error::custom)?),
        ResizeSetting::Pair(width, height) => Resize::Exact { width, height },
    })
}

impl TripletLayerConfig {
    pub fn builder() -> TripletLayerConfigBuilder {
        TripletLayerConfigBuilder::default()
    }

    /// Parses and validates a JSON layer parameter string.
    pub fn from_json_str(params: &str) -> Result<Self, TripletRustError> {
        let config: TripletLayerConfig = serde_json::from_str(params)
            .map_err(|e| TripletRustError::InvalidConfig(format!("cannot parse layer parameters: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TripletRustError> {
        if self.batch_size == 0 {
            return Err(TripletRustError::InvalidConfig("batch_size must be > 0".to_string()));
        }
        if self.prefetch_depth == 0 {
            return Err(TripletRustError::InvalidConfig("prefetch_depth must be > 0".to_string()));
        }
        if self.max_decode_attempts == 0 {
            return Err(TripletRustError::InvalidConfig("max_decode_attempts must be > 0".to_string()));
        }
        self.resize.validate()
    }

    /// Loads the configured image mean, if any.
    pub fn load_mean(&self) -> Result<Option<ImageMean>, TripletRustError> {
        match &self.mean_file {
            None => Ok(None),
            Some(MeanSource::Values(values)) => Ok(Some(ImageMean::PerChannel(values.clone()))),
            Some(MeanSource::File(path)) => ImageMean::from_file(path).map(Some),
        }
    }

    /// Collects `k`, `n` and, for `HARD_GRAPH`, the graph loaded from `m`.
    pub fn strategy_params(&self) -> Result<StrategyParams, TripletRustError> {
        let m = match (&self.m, self.sampling_type) {
            (Some(path), SamplingType::HardGraph) => Some(Arc::new(SimilarityGraph::load(path)?)),
            _ => None,
        };
        Ok(StrategyParams { k: self.k, m, n: self.n })
    }

    /// Resolves the configured sampling strategy with its parameters.
    pub fn strategy(&self) -> Result<Strategy, TripletRustError> {
        Strategy::resolve(self.sampling_type, &self.strategy_params()?)
    }
}

/// Builder for [`TripletLayerConfig`] with method chaining.
#[derive(Debug, Default)]
pub struct TripletLayerConfigBuilder {
    config: TripletLayerConfig,
}

impl TripletLayerConfigBuilder {
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn resize(mut self, resize: Resize) -> Self {
        self.config.resize = resize;
        self
    }

    pub fn mean(mut self, mean: MeanSource) -> Self {
        self.config.mean_file = Some(mean);
        self
    }

    pub fn source_type(mut self, source_type: SourceType) -> Self {
        self.config.source_type = source_type;
        self
    }

    pub fn source<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.source = Some(path.into());
        self
    }

    pub fn labels<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.labels = Some(path.into());
        self
    }

    pub fn root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.root = Some(path.into());
        self
    }

    pub fn header(mut self, header: bool) -> Self {
        self.config.header = header;
        self
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.config.shuffle = shuffle;
        self
    }

    pub fn compressed(mut self, compressed: bool) -> Self {
        self.config.compressed = compressed;
        self
    }

    pub fn sampling_type(mut self, sampling_type: SamplingType) -> Self {
        self.config.sampling_type = sampling_type;
        self
    }

    pub fn prefetch(mut self, prefetch: bool) -> Self {
        self.config.prefetch = prefetch;
        self
    }

    pub fn k(mut self, k: usize) -> Self {
        self.config.k = Some(k);
        self
    }

    pub fn m<P: Into<PathBuf>>(mut self, graph_path: P) -> Self {
        self.config.m = Some(graph_path.into());
        self
    }

    pub fn n(mut self, n: u64) -> Self {
        self.config.n = Some(n);
        self
    }

    /// Seeds shuffling and every sampler built from this configuration.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn prefetch_depth(mut self, depth: usize) -> Self {
        self.config.prefetch_depth = depth;
        self
    }

    pub fn max_decode_attempts(mut self, attempts: usize) -> Self {
        self.config.max_decode_attempts = attempts;
        self
    }

    pub fn build(self) -> Result<TripletLayerConfig, TripletRustError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
