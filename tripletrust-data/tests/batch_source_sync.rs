mod common;

use std::fs;

use approx::assert_relative_eq;
use tripletrust_core::TripletRustError;
use tripletrust_data::{
    BatchSource, DataSource, InMemorySource, MeanSource, RawSample, Resize, SamplingType, SourceType,
    TripletLayerConfig,
};

use common::{flat_png, init_logger, level_of, scratch_dir, write_csv_dataset};

const LABELS: [&str; 8] = ["0", "0", "0", "0", "1", "1", "1", "2"];

#[test]
fn test_csv_end_to_end_synchronous() -> Result<(), TripletRustError> {
    init_logger();
    let dir = scratch_dir("sync-e2e");
    let csv = write_csv_dataset(&dir, &LABELS, &[]);
    let config = TripletLayerConfig::builder()
        .source(&csv)
        .root(&dir)
        .header(true)
        .batch_size(6)
        .resize(Resize::Exact { width: 5, height: 2 })
        .seed(3)
        .build()?;

    let mut source = BatchSource::from_config(&config)?;
    assert!(!source.is_prefetching());
    assert_eq!(source.num_samples(), LABELS.len());

    for _ in 0..5 {
        let batch = source.next_batch()?;
        assert_eq!(batch.anchors.shape(), vec![6, 3, 2, 5]);
        assert_eq!(batch.positives.shape(), vec![6, 3, 2, 5]);
        assert_eq!(batch.negatives.shape(), vec![6, 3, 2, 5]);
        assert!(batch.margins.is_none());
    }
    assert_eq!(source.iteration(), Some(30));
    fs::remove_dir_all(&dir).ok();
    Ok(())
}

#[test]
fn test_anchor_and_negative_come_from_different_classes() -> Result<(), TripletRustError> {
    let dir = scratch_dir("sync-classes");
    let csv = write_csv_dataset(&dir, &LABELS, &[]);
    let config = TripletLayerConfig::builder()
        .source(&csv)
        .root(&dir)
        .header(true)
        .batch_size(32)
        .seed(9)
        .build()?;
    let mut source = BatchSource::from_config(&config)?;

    let class_of_level = |level: f32| {
        let id = (0..LABELS.len())
            .find(|&i| f32::from(level_of(i)) == level)
            .expect("pixel value maps back to a sample");
        LABELS[id]
    };
    let batch = source.next_batch()?;
    for slot in 0..32 {
        let a = batch.anchors.at(&[slot, 0, 0, 0])?;
        let p = batch.positives.at(&[slot, 0, 0, 0])?;
        let n = batch.negatives.at(&[slot, 0, 0, 0])?;
        assert_eq!(class_of_level(a), class_of_level(p));
        assert_ne!(class_of_level(a), class_of_level(n));
    }
    fs::remove_dir_all(&dir).ok();
    Ok(())
}

#[test]
fn test_corrupt_image_is_replaced_not_left_in_batch() -> Result<(), TripletRustError> {
    init_logger();
    let dir = scratch_dir("sync-corrupt");
    let csv = write_csv_dataset(&dir, &LABELS, &[1]);
    let config = TripletLayerConfig::builder()
        .source(&csv)
        .root(&dir)
        .header(true)
        .batch_size(8)
        .max_decode_attempts(20)
        .seed(5)
        .build()?;
    let mut source = BatchSource::from_config(&config)?;

    let valid: Vec<f32> = (0..LABELS.len()).filter(|&i| i != 1).map(|i| f32::from(level_of(i))).collect();
    for _ in 0..5 {
        let batch = source.next_batch()?;
        for tensor in [&batch.anchors, &batch.positives, &batch.negatives] {
            assert_eq!(tensor.shape(), vec![8, 3, 3, 4]);
            assert!(tensor.as_slice().iter().all(|v| valid.contains(v)));
        }
    }
    // Failed slots consumed extra draws.
    assert!(source.iteration().unwrap_or(0) > 40);
    fs::remove_dir_all(&dir).ok();
    Ok(())
}

#[test]
fn test_undecodable_class_fails_the_batch() -> Result<(), TripletRustError> {
    let dir = scratch_dir("sync-undecodable");
    let labels = ["0", "0", "1", "1"];
    let csv = write_csv_dataset(&dir, &labels, &[0, 1, 2, 3]);
    let config = TripletLayerConfig::builder()
        .source(&csv)
        .root(&dir)
        .header(true)
        .batch_size(4)
        .build()?;
    let mut source = BatchSource::from_config(&config)?;
    let err = source.next_batch().unwrap_err();
    assert!(matches!(err, TripletRustError::Decode { sample_id: Some(_), .. }));
    assert_eq!(source.iteration(), Some(3));
    fs::remove_dir_all(&dir).ok();
    Ok(())
}

#[test]
fn test_uncompressed_storage_decodes_at_construction() -> Result<(), TripletRustError> {
    let dir = scratch_dir("sync-uncompressed");
    let csv = write_csv_dataset(&dir, &LABELS, &[2]);
    let config = TripletLayerConfig::builder()
        .source(&csv)
        .root(&dir)
        .header(true)
        .compressed(false)
        .build()?;
    // The corrupt sample is found before any batch is requested.
    let err = BatchSource::from_config(&config).unwrap_err();
    assert!(matches!(err, TripletRustError::Decode { sample_id: Some(_), .. }));
    fs::remove_dir_all(&dir).ok();
    Ok(())
}

#[test]
fn test_mean_file_is_subtracted() -> Result<(), TripletRustError> {
    let dir = scratch_dir("sync-mean");
    let mean = dir.join("mean.txt");
    fs::write(&mean, "1.0 2.0 3.0\n").expect("write mean");
    let labels = ["0", "1"];
    let samples = vec![
        RawSample::Encoded(flat_png(2, 2, 50)),
        RawSample::Encoded(flat_png(2, 2, 50)),
    ];
    let config = TripletLayerConfig::builder()
        .mean(MeanSource::File(mean))
        .batch_size(2)
        .seed(1)
        .build()?;
    let mut source = BatchSource::with_source(&mut InMemorySource::new(samples, labels.to_vec())?, &config)?;
    let batch = source.next_batch()?;
    for (channel, expected) in [(0, 49.0), (1, 48.0), (2, 47.0)] {
        assert_relative_eq!(batch.anchors.at(&[1, channel, 1, 1])?, expected);
    }
    fs::remove_dir_all(&dir).ok();
    Ok(())
}

#[test]
fn test_same_seed_same_batches() -> Result<(), TripletRustError> {
    let dir = scratch_dir("sync-seed");
    let csv = write_csv_dataset(&dir, &["0:1", "1", "2", "0:2", "1:2", "3"], &[]);
    let config = TripletLayerConfig::builder()
        .source(&csv)
        .root(&dir)
        .header(true)
        .shuffle(true)
        .sampling_type(SamplingType::RandomMultilabel)
        .batch_size(5)
        .seed(77)
        .build()?;
    let mut a = BatchSource::from_config(&config)?;
    let mut b = BatchSource::from_config(&config)?;
    for _ in 0..4 {
        let (x, y) = (a.next_batch()?, b.next_batch()?);
        assert_eq!(x.margins.as_ref().map(|m| m.shape()), Some(vec![5, 1]));
        assert_eq!(x, y);
    }
    fs::remove_dir_all(&dir).ok();
    Ok(())
}

#[test]
fn test_construction_errors_surface_immediately() {
    let one_class = InMemorySource::new(vec![RawSample::Encoded(vec![]); 3], vec!["4", "4", "4"]).unwrap();
    let config = TripletLayerConfig::builder().batch_size(2).build().unwrap();
    let err = BatchSource::with_source(&mut one_class.clone(), &config).unwrap_err();
    assert_eq!(err, TripletRustError::InsufficientClasses { found: 1 });

    let mut malformed = InMemorySource::new(vec![RawSample::Encoded(vec![]); 2], vec!["0", "1:x"]).unwrap();
    let err = BatchSource::with_source(&mut malformed, &config).unwrap_err();
    assert!(matches!(err, TripletRustError::MalformedLabel { index: 1, .. }));

    let hard = TripletLayerConfig::builder()
        .sampling_type(SamplingType::HardMultilabel)
        .k(4)
        .build()
        .unwrap();
    let mut two_class = InMemorySource::new(vec![RawSample::Encoded(vec![]); 2], vec!["0", "1"]).unwrap();
    let err = BatchSource::with_source(&mut two_class, &hard).unwrap_err();
    assert!(matches!(err, TripletRustError::MissingStrategyParameter { .. }));

    let lmdb = TripletLayerConfig::builder()
        .source_type(SourceType::Lmdb)
        .source("/tmp/train_lmdb")
        .build()
        .unwrap();
    assert!(matches!(BatchSource::from_config(&lmdb), Err(TripletRustError::DataSource(_))));

    let missing = TripletLayerConfig::builder().source("/nonexistent/list.csv").build().unwrap();
    assert!(matches!(BatchSource::from_config(&missing), Err(TripletRustError::DataSource(_))));
}

#[test]
fn test_empty_source_is_rejected() {
    let mut empty = InMemorySource::new(Vec::new(), Vec::<String>::new()).unwrap();
    assert!(empty.load_all().unwrap().is_empty());
    let config = TripletLayerConfig::default();
    assert!(matches!(
        BatchSource::with_source(&mut empty, &config),
        Err(TripletRustError::DataSource(_))
    ));
}
