// Shared fixtures for the tripletrust-data integration tests.
#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Fresh directory under the system temp dir, unique per test and process.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tripletrust-it-{}-{}", name, process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// PNG of a single flat grey level.
pub fn flat_png(width: u32, height: u32, level: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([level, level, level]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .expect("encode png");
    buf.into_inner()
}

/// Grey level used for sample `i` by [`write_csv_dataset`].
pub fn level_of(i: usize) -> u8 {
    (10 * (i + 1)) as u8
}

/// Writes one image per label (`None` writes a corrupt file) and a CSV list
/// with paths relative to `dir`. Returns the CSV path.
pub fn write_csv_dataset(dir: &Path, labels: &[&str], corrupt: &[usize]) -> PathBuf {
    let mut rows = String::from("image,labels\n");
    for (i, label) in labels.iter().enumerate() {
        let file = format!("img_{:03}.png", i);
        let bytes = if corrupt.contains(&i) {
            b"this is not a png".to_vec()
        } else {
            flat_png(4, 3, level_of(i))
        };
        fs::write(dir.join(&file), bytes).expect("write image");
        // Multi-label rows use separate columns.
        let columns = label.split(':').collect::<Vec<_>>().join(" ");
        rows.push_str(&format!("{},{}\n", file, columns));
    }
    let csv = dir.join("list.csv");
    fs::write(&csv, rows).expect("write csv");
    csv
}
