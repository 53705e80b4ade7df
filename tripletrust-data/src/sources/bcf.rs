// tripletrust-data/src/sources/bcf.rs
//
// Binary container file: a little-endian u64 sample count, then one u64 size
// per sample, then the encoded payloads back to back. Labels live in a
// separate text file, one sample per line.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::info;
use tripletrust_core::TripletRustError;

use super::csv::{join_label_fields, split_fields};
use super::traits::{DataSource, RawSample, SampleCollection};

const WORD: usize = std::mem::size_of::<u64>();

/// Loads encoded images packed into a single BCF file.
#[derive(Debug, Clone)]
pub struct BcfSource {
    data_path: PathBuf,
    label_path: PathBuf,
}

impl BcfSource {
    /// # Errors
    /// Returns `TripletRustError::DataSource` if either file is missing.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(data_path: P, label_path: Q) -> Result<Self, TripletRustError> {
        let data_path = data_path.as_ref().to_path_buf();
        let label_path = label_path.as_ref().to_path_buf();
        if !data_path.is_file() || !label_path.is_file() {
            return Err(TripletRustError::DataSource(format!(
                "either source file {} or label file {} does not exist",
                data_path.display(),
                label_path.display()
            )));
        }
        Ok(BcfSource { data_path, label_path })
    }
}

fn read_word(bytes: &[u8], offset: usize) -> Option<u64> {
    let end = offset.checked_add(WORD)?;
    let word: [u8; WORD] = bytes.get(offset..end)?.try_into().ok()?;
    Some(u64::from_le_bytes(word))
}

/// Splits a BCF buffer into its payloads.
pub fn decode_container(bytes: &[u8]) -> Result<Vec<Vec<u8>>, TripletRustError> {
    let truncated = |what: &str| TripletRustError::DataSource(format!("truncated BCF container: {}", what));

    let count = read_word(bytes, 0).ok_or_else(|| truncated("missing sample count"))?;
    let count = usize::try_from(count).map_err(|_| truncated("sample count overflows"))?;
    let header_end = count
        .checked_add(1)
        .and_then(|words| words.checked_mul(WORD))
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| truncated("size table shorter than sample count"))?;

    let mut payloads = Vec::with_capacity(count);
    let mut offset = header_end;
    for i in 0..count {
        let size = read_word(bytes, (i + 1) * WORD).ok_or_else(|| truncated("size table"))?;
        let size = usize::try_from(size).map_err(|_| truncated("sample size overflows"))?;
        let end = offset
            .checked_add(size)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| truncated(&format!("payload of sample {}", i)))?;
        payloads.push(bytes[offset..end].to_vec());
        offset = end;
    }
    Ok(payloads)
}

/// Packs payloads into the BCF layout read by [`decode_container`].
pub fn encode_container(payloads: &[Vec<u8>]) -> Vec<u8> {
    let body: usize = payloads.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(WORD * (payloads.len() + 1) + body);
    out.extend_from_slice(&(payloads.len() as u64).to_le_bytes());
    for payload in payloads {
        out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    }
    for payload in payloads {
        out.extend_from_slice(payload);
    }
    out
}

impl DataSource for BcfSource {
    fn load_all(&mut self) -> Result<SampleCollection, TripletRustError> {
        let start = Instant::now();
        info!("Start loading data from BCF file {}", self.data_path.display());

        let bytes = fs::read(&self.data_path).map_err(|e| TripletRustError::io(&self.data_path, e))?;
        let payloads = decode_container(&bytes)?;

        let text = fs::read_to_string(&self.label_path).map_err(|e| TripletRustError::io(&self.label_path, e))?;
        let labels: Vec<String> = text
            .lines()
            .map(split_fields)
            .filter(|fields| !fields.is_empty())
            .map(|fields| join_label_fields(&fields))
            .collect();

        if labels.len() != payloads.len() {
            return Err(TripletRustError::DataSource(format!(
                "number of samples ({}) and labels ({}) are not equal",
                payloads.len(),
                labels.len()
            )));
        }

        info!(
            "Loading {} samples done: time cost {:.3} seconds",
            payloads.len(),
            start.elapsed().as_secs_f64()
        );
        let samples = payloads.into_iter().map(RawSample::Encoded).collect();
        SampleCollection::new(samples, labels)
    }
}
