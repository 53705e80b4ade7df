// tripletrust-data/src/batch.rs

use std::sync::Arc;

use log::{error, warn};
use tripletrust_core::ops::stack;
use tripletrust_core::{Tensor, TripletRustError};

use crate::decode::SampleDecoder;
use crate::samplers::{Sampler, Triplet};
use crate::sources::RawSample;

/// One training batch of triplets.
///
/// `anchors`, `positives` and `negatives` are `[B, C, H, W]`; `margins` is
/// `[B, 1]` and present exactly when the sampling strategy yields margins.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub anchors: Tensor,
    pub positives: Tensor,
    pub negatives: Tensor,
    pub margins: Option<Tensor>,
}

impl Batch {
    pub fn batch_size(&self) -> usize {
        self.anchors.shape().first().copied().unwrap_or(0)
    }

    pub fn has_margins(&self) -> bool {
        self.margins.is_some()
    }
}

/// Fills batches slot by slot: sample a triplet, decode its three members.
///
/// A recoverable decode failure discards the triplet and draws a fresh one,
/// up to `max_attempts` draws per slot; after that the whole batch fails with
/// the last error. Any other error fails the batch immediately.
#[derive(Debug, Clone)]
pub struct BatchAssembler {
    samples: Vec<RawSample>,
    decoder: Arc<dyn SampleDecoder>,
    batch_size: usize,
    max_attempts: usize,
}

impl BatchAssembler {
    pub fn new(
        samples: Vec<RawSample>,
        decoder: Arc<dyn SampleDecoder>,
        batch_size: usize,
        max_attempts: usize,
    ) -> Result<Self, TripletRustError> {
        if batch_size == 0 {
            return Err(TripletRustError::InvalidConfig("batch_size must be > 0".to_string()));
        }
        if max_attempts == 0 {
            return Err(TripletRustError::InvalidConfig("max_decode_attempts must be > 0".to_string()));
        }
        Ok(BatchAssembler {
            samples,
            decoder,
            batch_size,
            max_attempts,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    fn decode_one(&self, id: usize) -> Result<Tensor, TripletRustError> {
        let raw = self.samples.get(id).ok_or(TripletRustError::IndexOutOfBounds {
            index: id,
            len: self.samples.len(),
        })?;
        self.decoder.decode(id, raw)
    }

    fn decode_triplet(&self, triplet: &Triplet) -> Result<[Tensor; 3], TripletRustError> {
        Ok([
            self.decode_one(triplet.anchor)?,
            self.decode_one(triplet.positive)?,
            self.decode_one(triplet.negative)?,
        ])
    }

    /// Fills one slot, retrying with fresh triplets on decode failures.
    fn fill_slot<S: Sampler + ?Sized>(
        &self,
        sampler: &mut S,
        slot: usize,
    ) -> Result<(Triplet, [Tensor; 3]), TripletRustError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let triplet = sampler.sample()?;
            match self.decode_triplet(&triplet) {
                Ok(tensors) => return Ok((triplet, tensors)),
                Err(err) if err.is_recoverable() && attempt < self.max_attempts => {
                    warn!(
                        "Slot {}: {} (attempt {}/{}), drawing a new triplet",
                        slot, err, attempt, self.max_attempts
                    );
                }
                Err(err) => {
                    error!("Slot {}: giving up after {} attempt(s): {}", slot, attempt, err);
                    return Err(err);
                }
            }
        }
    }

    /// Assembles one full batch with triplets drawn from `sampler`.
    pub fn assemble<S: Sampler + ?Sized>(&self, sampler: &mut S) -> Result<Batch, TripletRustError> {
        let with_margins = sampler.yields_margin();
        let mut anchors = Vec::with_capacity(self.batch_size);
        let mut positives = Vec::with_capacity(self.batch_size);
        let mut negatives = Vec::with_capacity(self.batch_size);
        let mut margins = Vec::with_capacity(if with_margins { self.batch_size } else { 0 });

        for slot in 0..self.batch_size {
            let (triplet, [a, p, n]) = self.fill_slot(sampler, slot)?;
            anchors.push(a);
            positives.push(p);
            negatives.push(n);
            if with_margins {
                margins.push(triplet.margin.ok_or_else(|| {
                    TripletRustError::InvalidConfig(format!("triplet in slot {} is missing its margin", slot))
                })?);
            }
        }

        let anchors = stack(&anchors)?;
        let positives = stack(&positives)?;
        let negatives = stack(&negatives)?;
        for other in [&positives, &negatives] {
            if other.shape() != anchors.shape() {
                return Err(TripletRustError::ShapeMismatch {
                    expected: anchors.shape(),
                    actual: other.shape(),
                    operation: "batch assembly".to_string(),
                });
            }
        }
        let margins = if with_margins {
            Some(Tensor::new(margins, vec![self.batch_size, 1])?)
        } else {
            None
        };
        Ok(Batch {
            anchors,
            positives,
            negatives,
            margins,
        })
    }
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod tests;
