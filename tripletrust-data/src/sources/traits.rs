// tripletrust-data/src/sources/traits.rs

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use tripletrust_core::{Tensor, TripletRustError};

/// One sample as held in memory: either still encoded (e.g. JPEG bytes) or
/// already decoded into a `[C, H, W]` tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSample {
    Encoded(Vec<u8>),
    Decoded(Tensor),
}

impl RawSample {
    pub fn is_encoded(&self) -> bool {
        matches!(self, RawSample::Encoded(_))
    }
}

/// Index-aligned samples and serialized labels produced by a data source.
#[derive(Debug, Clone, Default)]
pub struct SampleCollection {
    pub samples: Vec<RawSample>,
    pub labels: Vec<String>,
}

impl SampleCollection {
    /// Pairs samples with labels.
    ///
    /// # Errors
    ///
    /// Returns `TripletRustError::DataSource` if the two sequences differ in length.
    pub fn new(samples: Vec<RawSample>, labels: Vec<String>) -> Result<Self, TripletRustError> {
        if samples.len() != labels.len() {
            return Err(TripletRustError::DataSource(format!(
                "number of samples ({}) and labels ({}) are not equal",
                samples.len(),
                labels.len()
            )));
        }
        Ok(SampleCollection { samples, labels })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Applies one random permutation to samples and labels together.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        let mut samples: Vec<Option<RawSample>> = self.samples.drain(..).map(Some).collect();
        let mut labels: Vec<Option<String>> = self.labels.drain(..).map(Some).collect();
        for i in order {
            if let (Some(sample), Some(label)) = (samples[i].take(), labels[i].take()) {
                self.samples.push(sample);
                self.labels.push(label);
            }
        }
    }
}

/// A backend that loads every sample and label into memory at once.
pub trait DataSource {
    /// Loads all samples and their labels, index-aligned.
    ///
    /// # Errors
    ///
    /// Returns `TripletRustError::DataSource` (or `Io`) when the backing files
    /// are missing or inconsistent.
    fn load_all(&mut self) -> Result<SampleCollection, TripletRustError>;
}

/// Backends recognised by configuration (`source_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceType {
    #[default]
    Csv,
    Bcf,
    Lmdb,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceType::Csv => "CSV",
            SourceType::Bcf => "BCF",
            SourceType::Lmdb => "LMDB",
        })
    }
}

impl FromStr for SourceType {
    type Err = TripletRustError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CSV" => Ok(SourceType::Csv),
            "BCF" => Ok(SourceType::Bcf),
            "LMDB" => Ok(SourceType::Lmdb),
            other => Err(TripletRustError::InvalidConfig(format!(
                "unknown source_type {:?}",
                other
            ))),
        }
    }
}
