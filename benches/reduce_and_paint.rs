use criterion::{criterion_group, criterion_main, Criterion};
use labelmap_roundtrip::{
    diagonal_strokes, reduce_magnitude, Dimensions, RasterPainter, ScalarType, VolumeClass,
    VolumeImage,
};
use std::hint::black_box;

fn rgb(n: usize) -> VolumeImage {
    let samples: Vec<f64> = (0..n * n * 3).map(|i| (i % 65536) as f64).collect();
    VolumeImage::from_samples(
        "bench",
        Dimensions::planar(n, n),
        3,
        ScalarType::U16,
        VolumeClass::Vector,
        &samples,
    )
    .unwrap()
}

fn bench_reduce(c: &mut Criterion) {
    let input = rgb(256);
    c.bench_function("reduce_magnitude 256x256x3", |b| {
        b.iter(|| reduce_magnitude(black_box(&input), "bench_grey").unwrap())
    });
}

fn bench_paint(c: &mut Criterion) {
    let grey = reduce_magnitude(&rgb(256), "bench_grey").unwrap();
    let strokes = diagonal_strokes(256, 256, 4);
    let painter = RasterPainter::new(20);
    c.bench_function("paint 4 strokes r=20", |b| {
        b.iter_batched(
            || VolumeImage::label_like(&grey, "bench_grey-label").unwrap(),
            |mut label| painter.paint(&mut label, black_box(&strokes)).unwrap(),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_reduce, bench_paint);
criterion_main!(benches);
