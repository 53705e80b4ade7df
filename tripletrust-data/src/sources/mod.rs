// tripletrust-data/src/sources/mod.rs

pub mod bcf;
pub mod csv;
pub mod in_memory;
pub mod traits;

pub use bcf::BcfSource;
pub use csv::CsvSource;
pub use in_memory::InMemorySource;
pub use traits::{DataSource, RawSample, SampleCollection, SourceType};

use tripletrust_core::TripletRustError;

use crate::config::TripletLayerConfig;

/// Opens the backend named by `source_type` over the configured files.
///
/// # Errors
/// `DataSource` when the files are missing, the configuration lacks a path the
/// backend needs, or the backend is not available in this build (`LMDB`).
pub fn open_source(config: &TripletLayerConfig) -> Result<Box<dyn DataSource + Send>, TripletRustError> {
    let source = config
        .source
        .as_ref()
        .ok_or_else(|| TripletRustError::DataSource("no 'source' path configured".to_string()))?;
    match config.source_type {
        SourceType::Csv => {
            let mut csv = CsvSource::new(source)?.has_header(config.header);
            if let Some(root) = &config.root {
                csv = csv.with_root(root);
            }
            Ok(Box::new(csv))
        }
        SourceType::Bcf => {
            let labels = config.labels.as_ref().ok_or_else(|| {
                TripletRustError::DataSource("BCF source needs a 'labels' file".to_string())
            })?;
            Ok(Box::new(BcfSource::new(source, labels)?))
        }
        SourceType::Lmdb => Err(TripletRustError::DataSource(
            "LMDB sources are not supported by this build".to_string(),
        )),
    }
}
