// tripletrust-data/src/batch_source.rs

use std::sync::Arc;
use std::time::Instant;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tripletrust_core::TripletRustError;

use crate::batch::{Batch, BatchAssembler};
use crate::config::TripletLayerConfig;
use crate::decode::{decompress_all, ImageDecoder, SampleDecoder};
use crate::labels::LabelIndex;
use crate::prefetch::PrefetchWorker;
use crate::samplers::{Sampler, TripletSampler};
use crate::sources::{open_source, DataSource, SampleCollection};

// Independent random streams derived from one configured seed.
const SHUFFLE_STREAM: u64 = 1;
const SAMPLER_STREAM: u64 = 2;
const WORKER_STREAM: u64 = 3;

fn stream_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        None => StdRng::from_entropy(),
    }
}

enum Mode {
    Synchronous {
        sampler: TripletSampler,
        assembler: BatchAssembler,
    },
    Prefetch(PrefetchWorker),
}

/// Hands out one triplet batch per training step.
///
/// In synchronous mode each `next_batch()` samples and decodes in the
/// caller's thread. In prefetch mode the sampler and a copy of the samples
/// are moved to a [`PrefetchWorker`] and `next_batch()` blocks on its
/// channel. The mode is fixed at construction.
pub struct BatchSource {
    mode: Mode,
    batch_size: usize,
    yields_margin: bool,
    num_samples: usize,
}

impl std::fmt::Debug for BatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSource")
            .field("prefetch", &self.is_prefetching())
            .field("batch_size", &self.batch_size)
            .field("yields_margin", &self.yields_margin)
            .field("num_samples", &self.num_samples)
            .finish()
    }
}

impl BatchSource {
    /// Opens the configured data source and builds the batch source on top of it.
    pub fn from_config(config: &TripletLayerConfig) -> Result<Self, TripletRustError> {
        config.validate()?;
        let mut source = open_source(config)?;
        Self::with_source(source.as_mut(), config)
    }

    /// Loads everything from `source` and builds the batch source.
    pub fn with_source(source: &mut dyn DataSource, config: &TripletLayerConfig) -> Result<Self, TripletRustError> {
        let collection = source.load_all()?;
        Self::from_collection(collection, config)
    }

    /// Builds the batch source over already loaded samples, decoding with the
    /// configured mean and resize.
    pub fn from_collection(collection: SampleCollection, config: &TripletLayerConfig) -> Result<Self, TripletRustError> {
        let decoder = ImageDecoder::new(config.load_mean()?, config.resize);
        Self::with_decoder(collection, config, Arc::new(decoder))
    }

    /// Builds the batch source with a caller supplied decoder.
    ///
    /// Every configuration, label and data error surfaces here rather than in
    /// the first `next_batch()` call.
    pub fn with_decoder(
        mut collection: SampleCollection,
        config: &TripletLayerConfig,
        decoder: Arc<dyn SampleDecoder>,
    ) -> Result<Self, TripletRustError> {
        config.validate()?;
        if collection.is_empty() {
            return Err(TripletRustError::DataSource("data source yielded no samples".to_string()));
        }
        let start = Instant::now();

        if config.shuffle {
            collection.shuffle(&mut stream_rng(config.seed, SHUFFLE_STREAM));
        }
        if !config.compressed {
            decompress_all(&mut collection, decoder.as_ref())?;
        }

        let strategy = config.strategy()?;
        let index = LabelIndex::build(&collection.labels)?;
        let num_samples = collection.len();
        let assembler = BatchAssembler::new(collection.samples, decoder, config.batch_size, config.max_decode_attempts)?;

        let stream = if config.prefetch { WORKER_STREAM } else { SAMPLER_STREAM };
        let sampler = TripletSampler::new(strategy, index, stream_rng(config.seed, stream))?;
        let yields_margin = sampler.yields_margin();

        let mode = if config.prefetch {
            Mode::Prefetch(PrefetchWorker::spawn(sampler, assembler, config.prefetch_depth)?)
        } else {
            Mode::Synchronous { sampler, assembler }
        };
        info!(
            "BatchSource ready: {} samples, batch size {}, {} sampling, {} mode ({:.3} s)",
            num_samples,
            config.batch_size,
            config.sampling_type,
            if config.prefetch { "prefetch" } else { "synchronous" },
            start.elapsed().as_secs_f64()
        );
        Ok(BatchSource {
            mode,
            batch_size: config.batch_size,
            yields_margin,
            num_samples,
        })
    }

    /// Returns the next batch.
    ///
    /// # Errors
    /// - `Decode` when a slot could not be filled within the retry budget.
    /// - `ChannelClosed` in prefetch mode once the worker has stopped.
    pub fn next_batch(&mut self) -> Result<Batch, TripletRustError> {
        match &mut self.mode {
            Mode::Synchronous { sampler, assembler } => assembler.assemble(sampler),
            Mode::Prefetch(worker) => worker.next_batch(),
        }
    }

    pub fn is_prefetching(&self) -> bool {
        matches!(self.mode, Mode::Prefetch(_))
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Whether batches carry a margins tensor.
    pub fn yields_margin(&self) -> bool {
        self.yields_margin
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Iterations of the synchronous sampler; `None` in prefetch mode, where
    /// the counter lives on the worker thread.
    pub fn iteration(&self) -> Option<u64> {
        match &self.mode {
            Mode::Synchronous { sampler, .. } => Some(sampler.iteration()),
            Mode::Prefetch(_) => None,
        }
    }

    /// Stops the prefetch worker. Has no effect in synchronous mode.
    pub fn shutdown(&mut self) {
        if let Mode::Prefetch(worker) = &mut self.mode {
            worker.shutdown();
        }
    }
}

impl Iterator for BatchSource {
    type Item = Result<Batch, TripletRustError>;

    /// Ends when the prefetch channel is closed; synchronous sources never end.
    fn next(&mut self) -> Option<Self::Item> {
        match self.next_batch() {
            Err(TripletRustError::ChannelClosed) => None,
            other => Some(other),
        }
    }
}
