use bytepipe::{channel, PassthroughStage, PipelineBuilder};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::thread;
use std::time::Duration;

fn benchmark_single_thread_batches(c: &mut Criterion) {
    for batch in [1usize, 32, 256] {
        c.bench_function(&format!("push_pop_batch_{}", batch), |b| {
            let (tx, rx) = channel(8, 0).unwrap();
            let src = vec![7u8; batch * 8];
            let mut dst = vec![0u8; batch * 8];
            b.iter(|| {
                tx.push(black_box(&src));
                black_box(rx.pop(&mut dst));
            });
        });
    }
}

fn benchmark_cross_thread_handoff(c: &mut Criterion) {
    c.bench_function("handoff_10k_records", |b| {
        b.iter(|| {
            let (tx, rx) = channel(8, 0).unwrap();
            let producer = thread::spawn(move || {
                let chunk = [0u8; 8 * 64];
                for _ in 0..(10_000 / 64) {
                    tx.push(black_box(&chunk));
                }
            });

            let mut buf = [0u8; 8 * 64];
            let mut total = 0usize;
            loop {
                let got = rx.pop(&mut buf);
                if got == 0 {
                    break;
                }
                total += got;
            }
            producer.join().unwrap();
            black_box(total)
        });
    });
}

fn benchmark_two_stage_pipeline(c: &mut Criterion) {
    c.bench_function("pipeline_two_stage_1k_records", |b| {
        b.iter(|| {
            let (head, tail) = PipelineBuilder::new(8)
                .stage(8, PassthroughStage)
                .stage(8, PassthroughStage)
                .build()
                .expect("build failed");

            let chunk = [0u8; 8 * 50];
            for _ in 0..20 {
                head.push(black_box(&chunk));
            }
            drop(head);

            let mut buf = [0u8; 8 * 64];
            let mut total = 0usize;
            loop {
                let got = tail.pop(&mut buf);
                if got == 0 {
                    break;
                }
                total += got;
            }
            black_box(total)
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = benchmark_single_thread_batches, benchmark_cross_thread_handoff, benchmark_two_stage_pipeline
);
criterion_main!(benches);
