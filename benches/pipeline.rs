use criterion::{criterion_group, criterion_main, Criterion};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imaging::{aspect, EncodingFormat, Image, Rgb};
use std::hint::black_box;
use std::io::Cursor;

fn source_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 200])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn pipeline_benchmark(c: &mut Criterion) {
    let png = source_png(1920, 1080);

    c.bench_function("decode png 1920x1080", |b| {
        b.iter(|| Image::from_bytes(black_box(&png)).unwrap())
    });

    let decoded = Image::from_bytes(&png).unwrap();
    let raster = decoded.raster().unwrap().clone();

    c.bench_function("resize 1920x1080 -> 800x450", |b| {
        b.iter(|| {
            let mut img = Image::from_raster(raster.clone());
            img.resize(black_box(800), black_box(450)).unwrap();
            img
        })
    });

    c.bench_function("crop square + flatten", |b| {
        b.iter(|| {
            let mut img = Image::from_raster(raster.clone());
            img.crop(black_box(aspect::SQUARE)).unwrap();
            img.flatten(Rgb::WHITE).unwrap();
            img
        })
    });

    let mut small = Image::from_raster(raster.clone());
    small.resize(640, 360).unwrap();
    small.flatten(Rgb::WHITE).unwrap();

    let mut group = c.benchmark_group("encode 640x360");
    for format in [EncodingFormat::Jpeg, EncodingFormat::Webp, EncodingFormat::Png] {
        group.bench_function(format.name(), |b| {
            b.iter(|| small.encode(black_box(format), black_box(80)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
