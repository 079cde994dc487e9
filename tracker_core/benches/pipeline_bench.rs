use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tracker_core::pipeline::{Pipeline, PipelineConfig};
use tracker_core::types::{BBox, Detection, FrameDetections};

/// `n` detections spread on a ring around the image center, drifting with `t`.
fn make_frame(n: usize, index: u64, t: f64) -> FrameDetections {
    let detections = (0..n)
        .map(|i| {
            let angle = i as f64 * std::f64::consts::TAU / n as f64 + t * 0.2;
            let cx = 320.0 + 200.0 * angle.cos();
            let cy = 240.0 + 200.0 * angle.sin();
            Detection::new(BBox::from_center(cx, cy, 40.0, 60.0), 0.8, 0)
        })
        .collect();
    FrameDetections {
        frame_index: index,
        timestamp: t,
        detections,
    }
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    for n in [1, 3, 10, 50] {
        group.bench_function(format!("{n}_detections"), |b| {
            b.iter(|| {
                let mut pipeline = Pipeline::new(PipelineConfig::default(), 0.0);
                // Warm up with one frame to fill the slots
                pipeline.process_frame(&make_frame(n, 0, 0.0));
                // Measure a frame against established tracks
                let frame = make_frame(n, 1, 1.0 / 30.0);
                black_box(pipeline.process_frame(&frame));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
