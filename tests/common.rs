#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use img_shrink::SourceFile;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn sample_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, ((x + y) % 256) as u8])
    });
    DynamicImage::ImageRgb8(img)
}

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, format).unwrap();
    bytes.into_inner()
}

pub fn write_image(path: &Path, width: u32, height: u32) -> PathBuf {
    let format = ImageFormat::from_path(path).unwrap();
    fs::write(path, encode(&sample_image(width, height), format)).unwrap();
    path.to_path_buf()
}

pub fn jpeg_source(name: &str) -> SourceFile {
    SourceFile::new(name, "image/jpeg", encode(&sample_image(40, 30), ImageFormat::Jpeg))
}

pub fn png_source(name: &str) -> SourceFile {
    SourceFile::new(name, "image/png", encode(&sample_image(40, 30), ImageFormat::Png))
}

/// A source that claims to be a JPEG but cannot be decoded.
pub fn broken_source(name: &str) -> SourceFile {
    SourceFile::new(name, "image/jpeg", b"fake jpg data".to_vec())
}

/// A folder with two real JPEGs and a text file.
pub fn create_photo_folder(temp_dir: &Path) -> PathBuf {
    let folder = temp_dir.join("photos");
    fs::create_dir(&folder).unwrap();
    write_image(&folder.join("beach.jpg"), 64, 48);
    write_image(&folder.join("sunset.jpeg"), 48, 64);
    File::create(folder.join("notes.txt"))
        .unwrap()
        .write_all(b"not an image")
        .unwrap();
    folder
}

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}
