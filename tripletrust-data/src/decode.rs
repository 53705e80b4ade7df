// tripletrust-data/src/decode.rs

use std::fmt::Debug;
use std::fs;
use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;
use log::{debug, info};
use tripletrust_core::{Tensor, TripletRustError};

use crate::sources::{RawSample, SampleCollection};

/// Resize policy applied right after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resize {
    #[default]
    Disabled,
    /// Both edges set to the same length.
    Square(u32),
    Exact { width: u32, height: u32 },
}

impl Resize {
    pub fn validate(&self) -> Result<(), TripletRustError> {
        match *self {
            Resize::Square(0) => Err(TripletRustError::InvalidConfig("resize edge must be > 0".to_string())),
            Resize::Exact { width, height } if width == 0 || height == 0 => Err(TripletRustError::InvalidConfig(
                format!("resize target {}x{} must be positive", width, height),
            )),
            _ => Ok(()),
        }
    }

    fn apply(&self, img: DynamicImage) -> DynamicImage {
        match *self {
            Resize::Disabled => img,
            Resize::Square(edge) => img.resize_exact(edge, edge, FilterType::Triangle),
            Resize::Exact { width, height } => img.resize_exact(width, height, FilterType::Triangle),
        }
    }
}

/// Mean image subtracted from every decoded sample.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageMean {
    /// One value per channel, broadcast over H x W.
    PerChannel(Vec<f32>),
    /// A full `[C, H, W]` mean, same shape as the decoded samples.
    Full(Tensor),
}

impl ImageMean {
    /// Reads a mean file of whitespace separated floats.
    ///
    /// Exactly three values give a per-channel mean. Anything else must start
    /// with the `C H W` dimensions followed by `C*H*W` values.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TripletRustError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| TripletRustError::io(path, e))?;
        let mean = Self::parse(&text)?;
        info!("Loaded image mean from {}: {}", path.display(), mean.describe());
        Ok(mean)
    }

    pub fn parse(text: &str) -> Result<Self, TripletRustError> {
        let values = text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<f32>()
                    .map_err(|_| TripletRustError::InvalidConfig(format!("mean file value {:?} is not a number", v)))
            })
            .collect::<Result<Vec<f32>, _>>()?;

        if values.len() == 3 {
            return Ok(ImageMean::PerChannel(values));
        }
        if values.len() < 3 {
            return Err(TripletRustError::InvalidConfig(format!(
                "mean file holds {} values, expected 3 or a 'C H W' header",
                values.len()
            )));
        }
        let mut shape = Vec::with_capacity(3);
        for &dim in &values[..3] {
            if dim < 1.0 || dim.fract() != 0.0 {
                return Err(TripletRustError::InvalidConfig(format!(
                    "mean file header dimension {} is not a positive integer",
                    dim
                )));
            }
            shape.push(dim as usize);
        }
        let body = values.len() - 3;
        let numel = shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d));
        if numel != Some(body) {
            return Err(TripletRustError::InvalidConfig(format!(
                "mean file header {:?} does not match its {} values",
                shape, body
            )));
        }
        Ok(ImageMean::Full(Tensor::new(values[3..].to_vec(), shape)?))
    }

    fn describe(&self) -> String {
        match self {
            ImageMean::PerChannel(v) => format!("per-channel {:?}", v),
            ImageMean::Full(t) => format!("full {:?}", t.shape()),
        }
    }

    /// Subtracts the mean in place from `data` laid out as `shape` (`[C, H, W]`).
    fn subtract(&self, data: &mut [f32], shape: &[usize]) -> Result<(), TripletRustError> {
        match self {
            ImageMean::PerChannel(means) => {
                if means.len() != shape[0] {
                    return Err(TripletRustError::decode(
                        None,
                        format!("per-channel mean has {} values for {} channels", means.len(), shape[0]),
                    ));
                }
                let plane = shape[1] * shape[2];
                for (channel, mean) in data.chunks_mut(plane.max(1)).zip(means) {
                    channel.iter_mut().for_each(|v| *v -= mean);
                }
            }
            ImageMean::Full(mean) => {
                if mean.shape() != shape {
                    return Err(TripletRustError::ShapeMismatch {
                        expected: shape.to_vec(),
                        actual: mean.shape(),
                        operation: "mean subtraction".to_string(),
                    });
                }
                data.iter_mut().zip(mean.as_slice()).for_each(|(v, m)| *v -= m);
            }
        }
        Ok(())
    }
}

/// Decodes one encoded image into a `[C, H, W]` BGR `f32` tensor.
///
/// The bytes are decoded, optionally resized (triangle filter), converted to
/// RGB, reordered to BGR and transposed to channel-major layout, then the mean
/// is subtracted. Every failure is reported as `TripletRustError::Decode`
/// (or `ShapeMismatch` for a full mean of the wrong size).
pub fn extract_sample(raw: &[u8], mean: Option<&ImageMean>, resize: Resize) -> Result<Tensor, TripletRustError> {
    let img = image::load_from_memory(raw).map_err(|e| TripletRustError::decode(None, e.to_string()))?;
    let rgb = resize.apply(img).to_rgb8();
    let (width, height) = rgb.dimensions();
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return Err(TripletRustError::decode(None, "decoded image is empty"));
    }

    let plane = width * height;
    let mut data = vec![0.0f32; 3 * plane];
    for (pos, pixel) in rgb.pixels().enumerate() {
        let [r, g, b] = pixel.0;
        data[pos] = f32::from(b);
        data[plane + pos] = f32::from(g);
        data[2 * plane + pos] = f32::from(r);
    }
    let shape = vec![3, height, width];
    if let Some(mean) = mean {
        mean.subtract(&mut data, &shape)?;
    }
    Tensor::new(data, shape)
}

/// Turns a stored sample into the tensor placed in a batch slot.
pub trait SampleDecoder: Debug + Send + Sync {
    /// # Errors
    /// `TripletRustError::Decode` tagged with `sample_id` when the sample cannot be decoded.
    fn decode(&self, sample_id: usize, raw: &RawSample) -> Result<Tensor, TripletRustError>;
}

/// Decoder backed by [`extract_sample`].
#[derive(Debug, Clone, Default)]
pub struct ImageDecoder {
    mean: Option<ImageMean>,
    resize: Resize,
}

impl ImageDecoder {
    pub fn new(mean: Option<ImageMean>, resize: Resize) -> Self {
        ImageDecoder { mean, resize }
    }

    pub fn resize(&self) -> Resize {
        self.resize
    }
}

impl SampleDecoder for ImageDecoder {
    /// Already decoded samples are returned as they are.
    fn decode(&self, sample_id: usize, raw: &RawSample) -> Result<Tensor, TripletRustError> {
        match raw {
            RawSample::Decoded(tensor) => Ok(tensor.clone()),
            RawSample::Encoded(bytes) => {
                extract_sample(bytes, self.mean.as_ref(), self.resize).map_err(|err| match err {
                    TripletRustError::Decode { message, .. } => TripletRustError::decode(Some(sample_id), message),
                    other => other,
                })
            }
        }
    }
}

/// Decodes every encoded sample of `collection` in place.
///
/// Used when the configuration asks for uncompressed storage, so that batch
/// assembly only copies tensors afterwards.
pub fn decompress_all(collection: &mut SampleCollection, decoder: &dyn SampleDecoder) -> Result<(), TripletRustError> {
    let mut decoded = 0usize;
    for (id, sample) in collection.samples.iter_mut().enumerate() {
        if sample.is_encoded() {
            *sample = RawSample::Decoded(decoder.decode(id, sample)?);
            decoded += 1;
        }
    }
    debug!("Decompressed {} of {} samples", decoded, collection.len());
    Ok(())
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod tests;
