// tripletrust-data/src/sources/csv.rs
//
// Image list source: one row per sample, the first column is the image path
// and the remaining columns are its labels. Columns may be separated by any
// run of spaces, tabs or commas, so no external CSV crate is needed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{info, warn};
use tripletrust_core::TripletRustError;

use super::traits::{DataSource, RawSample, SampleCollection};
use crate::labels::LABEL_DELIMITER;

/// Splits a row on runs of whitespace and commas.
pub(crate) fn split_fields(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|f| !f.is_empty())
        .collect()
}

/// Joins label columns into the serialized `a:b:c` form.
pub(crate) fn join_label_fields(fields: &[&str]) -> String {
    fields.join(LABEL_DELIMITER.to_string().as_str())
}

/// Loads encoded images listed in a CSV/TSV file together with their labels.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    root: Option<PathBuf>,
    has_header: bool,
}

impl CsvSource {
    /// Creates a source over the list file at `path`.
    ///
    /// # Errors
    /// Returns `TripletRustError::DataSource` if the file does not exist.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, TripletRustError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(TripletRustError::DataSource(format!(
                "source file {} does not exist",
                path.display()
            )));
        }
        Ok(CsvSource {
            path,
            root: None,
            has_header: false,
        })
    }

    /// Directory prepended to every relative image path.
    pub fn with_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Whether the first row is a header to skip.
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    fn resolve(&self, file: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(file),
            None => PathBuf::from(file),
        }
    }
}

impl DataSource for CsvSource {
    /// Rows whose image file is missing are skipped with a warning; a row
    /// without any label column is an error.
    fn load_all(&mut self) -> Result<SampleCollection, TripletRustError> {
        let start = Instant::now();
        info!("Start loading data from CSV file {}", self.path.display());
        let text = fs::read_to_string(&self.path).map_err(|e| TripletRustError::io(&self.path, e))?;

        let mut samples = Vec::new();
        let mut labels = Vec::new();
        let skip = usize::from(self.has_header);
        for (line_no, line) in text.lines().enumerate().skip(skip) {
            let fields = split_fields(line);
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 2 {
                return Err(TripletRustError::DataSource(format!(
                    "{} line {}: expected 'path label [label ...]', got {:?}",
                    self.path.display(),
                    line_no + 1,
                    line
                )));
            }
            let image_path = self.resolve(fields[0]);
            if !image_path.is_file() {
                warn!("File {} does not exist, skip", image_path.display());
                continue;
            }
            let bytes = fs::read(&image_path).map_err(|e| TripletRustError::io(&image_path, e))?;
            samples.push(RawSample::Encoded(bytes));
            labels.push(join_label_fields(&fields[1..]));
        }

        info!(
            "Loading {} samples done: time cost {:.3} seconds",
            samples.len(),
            start.elapsed().as_secs_f64()
        );
        SampleCollection::new(samples, labels)
    }
}
