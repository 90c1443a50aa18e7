use criterion::{black_box, criterion_group, criterion_main, Criterion};
use thermo_align_coarse::{zncc_best, TemplatePlan};
use thermo_align_core::{crop_gray, GrayImage};

fn scan_benchmark(c: &mut Criterion) {
    let target = GrayImage::from_fn(320, 240, |x, y| ((x * 7 + y * 13 + (x * y) % 9) % 256) as u8);
    let template = crop_gray(&target.as_view(), 120, 90, 64, 48);
    let plan = TemplatePlan::new(&template.as_view()).expect("textured template");

    c.bench_function("zncc_scan_320x240_t64x48", |b| {
        b.iter(|| zncc_best(black_box(&plan), black_box(&target.as_view())))
    });
}

criterion_group!(benches, scan_benchmark);
criterion_main!(benches);
