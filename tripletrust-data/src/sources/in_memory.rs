// tripletrust-data/src/sources/in_memory.rs

use tripletrust_core::TripletRustError;

use super::traits::{DataSource, RawSample, SampleCollection};

/// A data source over samples and labels the caller already holds.
///
/// Assumes that the i-th sample corresponds to the i-th label.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    samples: Vec<RawSample>,
    labels: Vec<String>,
}

impl InMemorySource {
    /// Creates a new source from sample and label vectors.
    ///
    /// # Errors
    /// Returns `TripletRustError::DataSource` if the lengths differ.
    pub fn new<L: Into<String>>(samples: Vec<RawSample>, labels: Vec<L>) -> Result<Self, TripletRustError> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if samples.len() != labels.len() {
            return Err(TripletRustError::DataSource(format!(
                "number of samples ({}) and labels ({}) are not equal",
                samples.len(),
                labels.len()
            )));
        }
        Ok(InMemorySource { samples, labels })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl DataSource for InMemorySource {
    /// Returns clones so the source can be loaded more than once.
    fn load_all(&mut self) -> Result<SampleCollection, TripletRustError> {
        SampleCollection::new(self.samples.clone(), self.labels.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_round_trip() {
        let samples = vec![RawSample::Encoded(vec![1, 2]), RawSample::Encoded(vec![3])];
        let mut source = InMemorySource::new(samples.clone(), vec!["0", "1:2"]).unwrap();
        assert_eq!(source.len(), 2);
        let collection = source.load_all().unwrap();
        assert_eq!(collection.samples, samples);
        assert_eq!(collection.labels, vec!["0".to_string(), "1:2".to_string()]);
    }

    #[test]
    fn test_in_memory_length_mismatch() {
        let err = InMemorySource::new(vec![RawSample::Encoded(vec![])], Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, TripletRustError::DataSource(_)));
    }
}
