use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use idphoto_backdrop::{
    composite, create_gradient_background, BackgroundReplacer, ExtractionConfig,
    ForegroundExtractor, GradientPreset, MaskImageSegmenter, Point, ProbabilityMap,
    ReplacementConfig, StrokeConfig, StrokePath,
};
use image::{GrayImage, Luma, Rgb, RgbImage};

const SIZES: [(u32, u32); 3] = [(320, 240), (640, 480), (1280, 960)];

fn portrait(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]))
}

/// Head-and-shoulders shaped matte with a few stray specks
fn matte(width: u32, height: u32) -> GrayImage {
    let cx = f64::from(width) / 2.0;
    let head_cy = f64::from(height) * 0.35;
    let head_r = f64::from(width.min(height)) * 0.2;
    GrayImage::from_fn(width, height, |x, y| {
        let dx = f64::from(x) - cx;
        let dy = f64::from(y) - head_cy;
        let head = dx * dx + dy * dy <= head_r * head_r;
        let shoulders = f64::from(y) > f64::from(height) * 0.6 && dx.abs() < f64::from(width) * 0.35;
        let speck = x % 97 == 3 && y % 89 == 5;
        if head || shoulders || speck {
            Luma([220])
        } else {
            Luma([0])
        }
    })
}

fn bench_gradient(c: &mut Criterion) {
    let mut group = c.benchmark_group("gradient");
    for (width, height) in SIZES {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &(width, height),
            |b, &(w, h)| b.iter(|| create_gradient_background(black_box(w), h, &GradientPreset::BLUE)),
        );
    }
    group.finish();
}

fn bench_extraction(c: &mut Criterion) {
    let extractor = ForegroundExtractor::new(ExtractionConfig::default()).unwrap();
    let mut group = c.benchmark_group("mask_extraction");
    for (width, height) in SIZES {
        let probabilities = ProbabilityMap::from_gray_image(&matte(width, height));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &probabilities,
            |b, probabilities| b.iter(|| extractor.extract(black_box(probabilities)).unwrap()),
        );
    }
    group.finish();
}

fn bench_strokes(c: &mut Criterion) {
    let points: Vec<Point> = (0..50)
        .map(|i| Point::new(100 + i * 8, 200 + (i % 7) * 5))
        .collect();
    let strokes = StrokePath::from_points(points);
    let config = StrokeConfig::default();
    c.bench_function("stroke_rasterize_640x480", |b| {
        b.iter(|| strokes.rasterize(black_box(640), 480, &config));
    });
}

fn bench_composite(c: &mut Criterion) {
    let (width, height) = (640, 480);
    let image = portrait(width, height);
    let background = create_gradient_background(width, height, &GradientPreset::GRAY);
    let extractor = ForegroundExtractor::new(ExtractionConfig::default()).unwrap();
    let mask = extractor
        .extract(&ProbabilityMap::from_gray_image(&matte(width, height)))
        .unwrap();
    c.bench_function("composite_640x480", |b| {
        b.iter(|| composite(black_box(&image), &background, &mask).unwrap());
    });
}

fn bench_end_to_end(c: &mut Criterion) {
    let (width, height) = (640, 480);
    let image = portrait(width, height);
    let mut replacer = BackgroundReplacer::new(
        ReplacementConfig::default(),
        Box::new(MaskImageSegmenter::from_image(&matte(width, height))),
    )
    .unwrap();
    c.bench_function("change_background_640x480", |b| {
        b.iter(|| {
            replacer
                .change_background(black_box(&image), GradientPreset::Blue, None)
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_gradient,
    bench_extraction,
    bench_strokes,
    bench_composite,
    bench_end_to_end
);
criterion_main!(benches);
