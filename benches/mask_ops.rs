use criterion::{black_box, criterion_group, criterion_main, Criterion};
use landscape_stencil::stencil::{
    apply_stroke, resize, smooth, BrushKernel, BrushRadius, BrushStroke, Mask, MaskResolution,
};

fn painted_mask() -> Mask {
    let mut mask = Mask::new(MaskResolution::R1024);
    for i in 0..16 {
        let t = i as f32 / 16.0;
        let stroke = BrushStroke::new(
            (0.1 + 0.8 * t, 0.5 + 0.3 * (t * 6.0).sin()),
            BrushRadius::Fraction(0.05),
            BrushKernel::CircleSmooth,
            0.8,
        );
        let _ = apply_stroke(&mut mask, &stroke);
    }
    mask
}

fn bench_paint(c: &mut Criterion) {
    let mut mask = Mask::new(MaskResolution::R1024);
    let stroke = BrushStroke::new(
        (0.5, 0.5),
        BrushRadius::Pixels(64.0),
        BrushKernel::CircleGradient,
        1.0,
    );
    c.bench_function("paint_gradient_r64_1024", |b| {
        b.iter(|| apply_stroke(black_box(&mut mask), black_box(&stroke)))
    });
}

fn bench_smooth(c: &mut Criterion) {
    let mask = painted_mask();
    c.bench_function("smooth_r7_1024", |b| {
        b.iter(|| smooth(black_box(&mask), 7, 1.0))
    });
}

fn bench_resize(c: &mut Criterion) {
    let mask = painted_mask();
    c.bench_function("resize_1024_to_2048", |b| {
        b.iter(|| resize(black_box(&mask), 2048))
    });
}

criterion_group!(benches, bench_paint, bench_smooth, bench_resize);
criterion_main!(benches);
