//! Performance benchmarks for leb128 decode/encode on the OBU size path.
//!
//! Run with:
//! ```bash
//! cargo bench -p cbs-av1
//! ```

use cbs_av1::leb128::{decode_uleb128, encode_uleb128};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_decode(c: &mut Criterion) {
    let single_byte = encode_uleb128(127);
    let multi_byte = encode_uleb128(1_000_000);

    let mut group = c.benchmark_group("leb128_decode");
    group.bench_function("single_byte", |b| {
        b.iter(|| black_box(decode_uleb128(black_box(&single_byte)).unwrap()));
    });
    group.bench_function("multi_byte", |b| {
        b.iter(|| black_box(decode_uleb128(black_box(&multi_byte)).unwrap()));
    });
}

fn bench_encode(c: &mut Criterion) {
    c.bench_function("leb128_encode", |b| {
        b.iter(|| black_box(encode_uleb128(black_box(1_000_000))));
    });
}

criterion_group!(benches, bench_decode, bench_encode);
criterion_main!(benches);
