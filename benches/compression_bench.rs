use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use img_shrink::processing::resize_to_fit;
use img_shrink::{
    compress_source, run_batch, BatchJob, CancelToken, CompressionOptions, Quality, RecordId,
    SourceFile,
};
use std::io::Cursor;
use std::sync::Arc;

fn create_test_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    });
    DynamicImage::ImageRgb8(img)
}

fn create_test_source(name: &str, width: u32, height: u32, format: ImageFormat) -> SourceFile {
    let mut bytes = Cursor::new(Vec::new());
    create_test_image(width, height)
        .write_to(&mut bytes, format)
        .unwrap();
    let mime = match format {
        ImageFormat::Png => "image/png",
        ImageFormat::WebP => "image/webp",
        _ => "image/jpeg",
    };
    SourceFile::new(name, mime, bytes.into_inner())
}

fn bench_image_resizing(c: &mut Criterion) {
    let mut group = c.benchmark_group("image_resizing");

    for size in [Small, Medium, Large].iter() {
        let (width, height) = match size {
            Small => (800, 600),
            Medium => (1920, 1080),
            Large => (3840, 2160),
        };
        let img = create_test_image(width, height);

        group.bench_with_input(
            BenchmarkId::new("resize", format!("{}x{}", width, height)),
            &img,
            |b, img| {
                b.iter(|| {
                    let mut img = img.clone();
                    resize_to_fit(black_box(&mut img), black_box(Some(width / 2)));
                })
            },
        );
    }

    group.finish();
}

fn bench_compress_source(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_source");
    group.sample_size(10);

    let options = CompressionOptions::default();
    let cancel = CancelToken::new();

    for format in [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP] {
        let source = create_test_source("bench", 1280, 720, format);
        for quality in [50u8, 80, 95] {
            let quality = Quality::new(quality).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", format), quality.get()),
                &source,
                |b, source| {
                    b.iter(|| compress_source(black_box(source), quality, &options, &cancel))
                },
            );
        }
    }

    group.finish();
}

fn bench_batch_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_processing");
    group.sample_size(10);

    let sources: Vec<Arc<SourceFile>> = (0..10)
        .map(|i| {
            Arc::new(create_test_source(
                &format!("test_{}.jpg", i),
                800,
                600,
                ImageFormat::Jpeg,
            ))
        })
        .collect();
    let options = CompressionOptions::default();
    let cancel = CancelToken::new();

    for threads in [1usize, 4] {
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &threads| {
            b.iter(|| {
                let jobs = sources
                    .iter()
                    .map(|source| BatchJob {
                        id: RecordId::generate(&source.name),
                        source: Arc::clone(source),
                    })
                    .collect();
                run_batch(jobs, Quality::default(), &options, &cancel, Some(threads), |_| {})
            })
        });
    }

    group.finish();
}

enum ImageSize {
    Small,
    Medium,
    Large,
}

use ImageSize::*;

criterion_group!(
    benches,
    bench_image_resizing,
    bench_compress_source,
    bench_batch_processing
);
criterion_main!(benches);
