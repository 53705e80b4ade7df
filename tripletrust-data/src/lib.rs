//! Triplet mini-batch pipeline: label indexing, triplet sampling strategies,
//! sample decoding, and synchronous or prefetched batch delivery.
//!
//! The entry point for a training loop is [`BatchSource`]:
//!
//! ```ignore
//! let config = TripletLayerConfig::from_json_str(r#"{"source": "train.csv", "batch_size": 64, "prefetch": true}"#)?;
//! let mut batches = BatchSource::from_config(&config)?;
//! let batch = batches.next_batch()?; // anchors/positives/negatives: [64, C, H, W]
//! ```

pub mod batch;
pub mod batch_source;
pub mod config;
pub mod decode;
pub mod labels;
pub mod prefetch;
pub mod samplers;
pub mod similarity;
pub mod sources;

// Re-export main components
pub use batch::{Batch, BatchAssembler};
pub use batch_source::BatchSource;
pub use config::{MeanSource, TripletLayerConfig, TripletLayerConfigBuilder};
pub use decode::{extract_sample, ImageDecoder, ImageMean, Resize, SampleDecoder};
pub use labels::{parse_label, LabelIndex, LabelSet};
pub use prefetch::PrefetchWorker;
pub use samplers::{Sampler, SamplingType, SimilarityGraph, Strategy, StrategyParams, Triplet, TripletSampler};
pub use similarity::{jaccard, Jaccard, SimilarityMetric};
pub use sources::{BcfSource, CsvSource, DataSource, InMemorySource, RawSample, SampleCollection, SourceType};
