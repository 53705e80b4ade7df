//! Draws triplet batches from a small synthetic image set, first in the
//! caller's thread and then through the prefetch worker.
//!
//! Run with `RUST_LOG=info` to see the loader and worker logs.

use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use tripletrust_core::TripletRustError;
use tripletrust_data::{BatchSource, InMemorySource, RawSample, Resize, SamplingType, TripletLayerConfig};

fn synthetic_png(i: u8) -> Result<RawSample, TripletRustError> {
    let img = RgbImage::from_fn(8, 6, |x, y| Rgb([i.wrapping_mul(23), (x * 20) as u8, (y * 30) as u8]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .map_err(|e| TripletRustError::decode(Some(i as usize), e.to_string()))?;
    Ok(RawSample::Encoded(buf.into_inner()))
}

fn main() -> Result<(), TripletRustError> {
    env_logger::init();

    let labels = ["0", "0:1", "1", "1:2", "2", "2:3", "3", "3:0", "0:2", "1:3"];
    let samples = (0..labels.len() as u8).map(synthetic_png).collect::<Result<Vec<_>, _>>()?;
    let mut source = InMemorySource::new(samples, labels.to_vec())?;

    // Synchronous: every batch is sampled and decoded on demand.
    let config = TripletLayerConfig::builder()
        .batch_size(4)
        .resize(Resize::Square(4))
        .sampling_type(SamplingType::RandomMultilabel)
        .seed(42)
        .build()?;
    let mut batches = BatchSource::with_source(&mut source, &config)?;
    println!("\n--- Synchronous RANDOM_MULTILABEL ---");
    for i in 0..3 {
        let batch = batches.next_batch()?;
        println!(
            "Batch {i}: anchors {:?}, margins {:?}",
            batch.anchors.shape(),
            batch.margins.as_ref().map(|m| m.get_f32_data())
        );
    }

    // Prefetch: a worker thread keeps two batches ready.
    let config = TripletLayerConfig::builder()
        .batch_size(4)
        .resize(Resize::Square(4))
        .sampling_type(SamplingType::HardMultilabel)
        .k(5)
        .n(2)
        .prefetch(true)
        .prefetch_depth(2)
        .seed(42)
        .build()?;
    let mut batches = BatchSource::with_source(&mut source, &config)?;
    println!("\n--- Prefetched HARD_MULTILABEL ---");
    for (i, batch) in batches.by_ref().take(3).enumerate() {
        let batch = batch?;
        println!(
            "Batch {i}: negatives {:?}, margins {:?}",
            batch.negatives.shape(),
            batch.margins.as_ref().map(|m| m.get_f32_data())
        );
    }
    batches.shutdown();
    Ok(())
}
