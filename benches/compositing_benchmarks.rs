use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cutout_compose::{
    CompositeColor, Compositor, LimiterConfig, MaskReconstructor, PixelBuffer, ResizeFilter,
    ResolutionLimiter, SubjectMask,
};
use image::{Rgba, RgbaImage};

const SIZES: [(u32, u32); 3] = [(640, 480), (1280, 720), (1920, 1080)];

/// Soft-edged vertical gradient cutout so most pixels hit the blend path
fn gradient_cutout(width: u32, height: u32) -> PixelBuffer {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        let alpha = ((x * 255) / width.max(1)) as u8;
        Rgba([(y % 256) as u8, 128, 200, alpha])
    });
    PixelBuffer::from(image)
}

fn subject_masks(width: u32, height: u32) -> Vec<SubjectMask> {
    (0..4)
        .map(|i| {
            let (w, h) = (width / 2, height / 2);
            let confidence = (0..w * h).map(|p| (p % 100) as f32 / 100.0).collect();
            SubjectMask {
                origin_x: (i * width / 4) as i32 - 16,
                origin_y: (i * height / 5) as i32,
                width: w,
                height: h,
                confidence,
            }
        })
        .collect()
}

fn benchmark_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite");
    for (width, height) in SIZES {
        let cutout = gradient_cutout(width, height);
        group.bench_with_input(
            BenchmarkId::new("solid", format!("{}x{}", width, height)),
            &cutout,
            |b, cutout| {
                b.iter(|| Compositor::composite(black_box(cutout), CompositeColor::GREEN).unwrap());
            },
        );
        group.bench_with_input(
            BenchmarkId::new("preview", format!("{}x{}", width, height)),
            &cutout,
            |b, cutout| b.iter(|| Compositor::preview(black_box(cutout)).unwrap()),
        );
    }
    group.finish();
}

fn benchmark_reconstruct(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct");
    let reconstructor = MaskReconstructor::default();
    for (width, height) in SIZES {
        let masks = subject_masks(width, height);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", width, height)),
            &masks,
            |b, masks| {
                b.iter(|| {
                    reconstructor
                        .reconstruct(black_box(masks), width, height)
                        .unwrap()
                })
            },
        );
    }
    group.finish();
}

fn benchmark_limit(c: &mut Criterion) {
    let mut group = c.benchmark_group("limit_4k_to_1080p");
    group.sample_size(10);
    let source = gradient_cutout(3840, 2160);
    for filter in [ResizeFilter::Nearest, ResizeFilter::Bilinear, ResizeFilter::Lanczos3] {
        let config = LimiterConfig::default().with_filter(filter);
        group.bench_function(filter.to_string(), |b| {
            b.iter_batched(
                || source.clone(),
                |image| ResolutionLimiter::limit(image, &config).unwrap(),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    compositing_benches,
    benchmark_composite,
    benchmark_reconstruct,
    benchmark_limit
);
criterion_main!(compositing_benches);
