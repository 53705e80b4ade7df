// tripletrust-data/src/labels.rs

use std::collections::{BTreeSet, HashMap};

use log::debug;
use tripletrust_core::TripletRustError;

/// Delimiter between label values in a serialized multi-label string.
pub const LABEL_DELIMITER: char = ':';

/// The parsed ground truth of one sample: a set of non-negative label values.
pub type LabelSet = BTreeSet<u32>;

/// Parses a serialized label such as `"3"` or `"1:4:7"` into a label set.
///
/// Surrounding whitespace is ignored. Every colon-separated field must be a
/// non-negative integer; an empty string or an empty field is rejected.
///
/// The error is the human-readable reason; [`LabelIndex::build`] wraps it into
/// `TripletRustError::MalformedLabel` with the sample position.
pub fn parse_label(raw: &str) -> Result<LabelSet, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty label string".to_string());
    }
    let mut set = LabelSet::new();
    for field in trimmed.split(LABEL_DELIMITER) {
        let field = field.trim();
        if field.is_empty() {
            return Err("empty field between delimiters".to_string());
        }
        let value = field
            .parse::<u32>()
            .map_err(|e| format!("field {:?} is not a non-negative integer: {}", field, e))?;
        set.insert(value);
    }
    Ok(set)
}

/// Serializes a label set back to its colon-joined form, in ascending order.
pub fn format_label(labels: &LabelSet) -> String {
    labels
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(":")
}

/// Mapping from label value to the ids of the samples carrying it.
///
/// Built once from the full label collection and immutable afterwards. Bucket
/// keys and the ids inside each bucket keep their order of first appearance,
/// so a seeded sampler walks the index deterministically.
#[derive(Debug, Clone)]
pub struct LabelIndex {
    labels: Vec<LabelSet>,
    keys: Vec<u32>,
    buckets: HashMap<u32, Vec<usize>>,
}

impl LabelIndex {
    /// Parses every label string and builds the label → sample ids index.
    ///
    /// # Errors
    ///
    /// Returns `TripletRustError::MalformedLabel` for the first entry that is
    /// empty or contains a non-integer field.
    pub fn build<S: AsRef<str>>(labels: &[S]) -> Result<Self, TripletRustError> {
        let mut parsed = Vec::with_capacity(labels.len());
        let mut keys = Vec::new();
        let mut buckets: HashMap<u32, Vec<usize>> = HashMap::new();

        for (id, raw) in labels.iter().enumerate() {
            let raw = raw.as_ref();
            let set = parse_label(raw).map_err(|reason| TripletRustError::MalformedLabel {
                index: id,
                label: raw.to_string(),
                reason,
            })?;
            for &label in &set {
                buckets
                    .entry(label)
                    .or_insert_with(|| {
                        keys.push(label);
                        Vec::new()
                    })
                    .push(id);
            }
            parsed.push(set);
        }

        debug!(
            "LabelIndex: indexed {} samples into {} label buckets",
            parsed.len(),
            keys.len()
        );
        Ok(LabelIndex {
            labels: parsed,
            keys,
            buckets,
        })
    }

    /// Iterates over `(label, sample ids)` pairs in order of first appearance.
    pub fn buckets(&self) -> impl Iterator<Item = (u32, &[usize])> + '_ {
        self.keys
            .iter()
            .map(move |key| (*key, self.buckets[key].as_slice()))
    }

    /// Returns the sample ids carrying `label`, if any.
    pub fn bucket(&self, label: u32) -> Option<&[usize]> {
        self.buckets.get(&label).map(Vec::as_slice)
    }

    /// Bucket keys in order of first appearance.
    pub fn keys(&self) -> &[u32] {
        &self.keys
    }

    /// Number of distinct label values.
    pub fn num_classes(&self) -> usize {
        self.keys.len()
    }

    /// Parsed label set of a sample.
    pub fn label_of(&self, sample_id: usize) -> Result<&LabelSet, TripletRustError> {
        self.labels
            .get(sample_id)
            .ok_or(TripletRustError::IndexOutOfBounds {
                index: sample_id,
                len: self.labels.len(),
            })
    }

    /// Returns true if the sample carries `label`.
    pub fn has_label(&self, sample_id: usize, label: u32) -> bool {
        self.labels
            .get(sample_id)
            .map_or(false, |set| set.contains(&label))
    }

    /// Number of indexed samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Checks if the index holds no samples.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
#[path = "labels_test.rs"]
mod tests;
