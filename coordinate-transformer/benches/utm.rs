use std::hint::black_box;

use coordinate_transformer::{central_meridian, latlon_to_utm, utm_to_latlon};
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_utm(c: &mut Criterion) {
    let lat = (-35.2809_f64).to_radians();
    let lon = central_meridian(55) + 0.02;

    c.bench_function("latlon_to_utm", |b| {
        b.iter(|| latlon_to_utm(black_box(lat), black_box(lon), 55))
    });
    c.bench_function("utm_to_latlon", |b| {
        b.iter(|| utm_to_latlon(black_box(693_714.4), black_box(6_093_725.2), 55, true))
    });
}

criterion_group!(benches, bench_utm);
criterion_main!(benches);
