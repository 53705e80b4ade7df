// tripletrust-data/src/decode_test.rs

use super::*;
use approx::assert_relative_eq;
use image::{ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;

/// PNG whose pixel (x, y) is RGB(10x, 20y, 7).
fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(10 * x) as u8, (20 * y) as u8, 7]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn flat_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(rgb));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .unwrap();
    buf.into_inner()
}

#[test]
fn test_extract_sample_layout_is_bgr_chw() {
    let tensor = extract_sample(&gradient_png(4, 3), None, Resize::Disabled).unwrap();
    assert_eq!(tensor.shape(), vec![3, 3, 4]);
    // Channel 0 is blue, 2 is red.
    assert_relative_eq!(tensor.at(&[0, 2, 3]).unwrap(), 7.0);
    assert_relative_eq!(tensor.at(&[1, 2, 3]).unwrap(), 40.0);
    assert_relative_eq!(tensor.at(&[2, 2, 3]).unwrap(), 30.0);
    assert_relative_eq!(tensor.at(&[2, 0, 1]).unwrap(), 10.0);
}

#[test]
fn test_extract_sample_is_deterministic() {
    let bytes = gradient_png(5, 5);
    let a = extract_sample(&bytes, None, Resize::Square(3)).unwrap();
    let b = extract_sample(&bytes, None, Resize::Square(3)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_resize_variants() {
    let bytes = flat_png(8, 6, [100, 50, 25]);
    let square = extract_sample(&bytes, None, Resize::Square(4)).unwrap();
    assert_eq!(square.shape(), vec![3, 4, 4]);
    let exact = extract_sample(&bytes, None, Resize::Exact { width: 5, height: 2 }).unwrap();
    assert_eq!(exact.shape(), vec![3, 2, 5]);
    // A flat image stays flat through the triangle filter.
    for &v in &exact.as_slice()[..10] {
        assert_relative_eq!(v, 25.0, epsilon = 1.0);
    }
}

#[test]
fn test_per_channel_mean() {
    let bytes = flat_png(2, 2, [100, 50, 25]);
    let mean = ImageMean::PerChannel(vec![5.0, 10.0, 20.0]);
    let tensor = extract_sample(&bytes, Some(&mean), Resize::Disabled).unwrap();
    assert_eq!(tensor.get_f32_data(), vec![20.0, 20.0, 20.0, 20.0, 40.0, 40.0, 40.0, 40.0, 80.0, 80.0, 80.0, 80.0]);
}

#[test]
fn test_full_mean_and_shape_mismatch() {
    let bytes = flat_png(2, 1, [3, 2, 1]);
    let mean = ImageMean::Full(Tensor::full(&[3, 1, 2], 1.0).unwrap());
    let tensor = extract_sample(&bytes, Some(&mean), Resize::Disabled).unwrap();
    assert_eq!(tensor.get_f32_data(), vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);

    let wrong = ImageMean::Full(Tensor::zeros(&[3, 2, 2]).unwrap());
    let err = extract_sample(&bytes, Some(&wrong), Resize::Disabled).unwrap_err();
    assert!(matches!(err, TripletRustError::ShapeMismatch { .. }));
}

#[test]
fn test_garbage_bytes_are_a_decode_error() {
    let err = extract_sample(b"definitely not an image", None, Resize::Disabled).unwrap_err();
    assert!(matches!(err, TripletRustError::Decode { sample_id: None, .. }));
}

#[test]
fn test_image_decoder_tags_sample_id_and_passes_decoded_through() {
    let decoder = ImageDecoder::new(None, Resize::Disabled);
    let err = decoder.decode(42, &RawSample::Encoded(vec![0, 1, 2])).unwrap_err();
    assert!(matches!(err, TripletRustError::Decode { sample_id: Some(42), .. }));

    let tensor = Tensor::full(&[3, 2, 2], 9.0).unwrap();
    let out = decoder.decode(0, &RawSample::Decoded(tensor.clone())).unwrap();
    assert_eq!(out, tensor);
}

#[test]
fn test_decompress_all() {
    let mut collection = SampleCollection::new(
        vec![RawSample::Encoded(flat_png(2, 2, [1, 2, 3])), RawSample::Encoded(gradient_png(2, 2))],
        vec!["0".to_string(), "1".to_string()],
    )
    .unwrap();
    decompress_all(&mut collection, &ImageDecoder::default()).unwrap();
    assert!(collection.samples.iter().all(|s| !s.is_encoded()));

    let mut broken = SampleCollection::new(vec![RawSample::Encoded(vec![1])], vec!["0".to_string()]).unwrap();
    let err = decompress_all(&mut broken, &ImageDecoder::default()).unwrap_err();
    assert!(matches!(err, TripletRustError::Decode { sample_id: Some(0), .. }));
}

#[test]
fn test_mean_file_formats() {
    assert_eq!(
        ImageMean::parse("104.0 117.0 123.0\n").unwrap(),
        ImageMean::PerChannel(vec![104.0, 117.0, 123.0])
    );
    match ImageMean::parse("3 1 2\n1 2 3 4 5 6\n").unwrap() {
        ImageMean::Full(t) => {
            assert_eq!(t.shape(), vec![3, 1, 2]);
            assert_relative_eq!(t.at(&[2, 0, 1]).unwrap(), 6.0);
        }
        other => panic!("expected a full mean, got {:?}", other),
    }
    assert!(ImageMean::parse("1 2").is_err());
    assert!(ImageMean::parse("3 1 2\n1 2 3").is_err());
    assert!(ImageMean::parse("a b c").is_err());
    assert!(ImageMean::from_file("/nonexistent/mean.txt").is_err());
}

#[test]
fn test_mean_header_that_overflows_is_rejected() {
    let err = ImageMean::parse("10000000000 10000000000 10000000000 1 2 3").unwrap_err();
    assert!(matches!(err, TripletRustError::InvalidConfig(_)));

    let err = ImageMean::parse("2 2 2\n1 2 3 4").unwrap_err();
    assert!(matches!(err, TripletRustError::InvalidConfig(_)));
}

#[test]
fn test_resize_validation() {
    assert!(Resize::Disabled.validate().is_ok());
    assert!(Resize::Square(0).validate().is_err());
    assert!(Resize::Exact { width: 4, height: 0 }.validate().is_err());
    assert!(Resize::Exact { width: 4, height: 2 }.validate().is_ok());
}
