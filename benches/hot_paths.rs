use criterion::{black_box, criterion_group, criterion_main, Criterion};

use simtemp::config::Mode;
use simtemp::device::producer::synthesize;
use simtemp::queue::{SampleQueue, QUEUE_CAPACITY};
use simtemp::record::{Sample, FLAG_NEW_SAMPLE};

fn sample(n: u64) -> Sample {
    Sample {
        timestamp_ns: n,
        temp_mc: 30_000,
        flags: FLAG_NEW_SAMPLE,
    }
}

fn bench_queue_commit_cycle(c: &mut Criterion) {
    c.bench_function("queue_force_push_saturated", |b| {
        let mut q = SampleQueue::new();
        for n in 0..QUEUE_CAPACITY as u64 {
            q.force_push(sample(n));
        }

        let mut n = QUEUE_CAPACITY as u64;
        b.iter(|| {
            n += 1;
            black_box(q.force_push(black_box(sample(n))));
        });
    });

    c.bench_function("queue_push_pop_pair", |b| {
        let mut q = SampleQueue::new();
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            q.try_push(black_box(sample(n)));
            black_box(q.pop_one());
        });
    });
}

fn bench_record_encode(c: &mut Criterion) {
    let s = sample(123_456_789);
    c.bench_function("record_encode", |b| {
        b.iter(|| black_box(black_box(&s).to_bytes()));
    });
}

fn bench_synthesize(c: &mut Criterion) {
    for mode in [Mode::Normal, Mode::Ramp, Mode::Noisy] {
        c.bench_function(&format!("synthesize_{mode}"), |b| {
            let mut seq = 0i32;
            b.iter(|| {
                seq = seq.wrapping_add(1);
                black_box(synthesize(black_box(mode), seq));
            });
        });
    }
}

criterion_group!(
    benches,
    bench_queue_commit_cycle,
    bench_record_encode,
    bench_synthesize
);
criterion_main!(benches);
