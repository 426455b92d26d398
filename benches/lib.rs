use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    magnification::bench_point_lens,
    magnification::bench_binary_lens,
    likelihood::bench_log_likely,
);
criterion_main!(benches);
