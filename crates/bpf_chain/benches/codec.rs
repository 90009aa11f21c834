//! Conversion and disassembly benchmarks.

use bpf_chain::asm::{dump, listing};
use bpf_chain::bytecode::{RawInstruction, decode, encode, to_raw_instructions, to_sock_filters};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

/// `ld #rand; jgt #4294967,1; ret #1024; ret #0` repeated to `len` records.
fn records(len: usize) -> Vec<RawInstruction> {
    let pattern = [
        RawInstruction::new(0x20, 0, 0, 0xfffff038),
        RawInstruction::new(0x25, 1, 0, 4294967),
        RawInstruction::new(0x06, 0, 0, 1024),
        RawInstruction::new(0x06, 0, 0, 0),
    ];
    pattern.iter().copied().cycle().take(len).collect()
}

/// Benchmark decoding and encoding.
fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/convert");

    for len in [4, 512, 4096] {
        let raw = records(len);
        let program = decode(&raw).expect("valid program");

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("decode", len), &len, |b, _| {
            b.iter(|| decode(black_box(&raw)))
        });
        group.bench_with_input(BenchmarkId::new("encode", len), &len, |b, _| {
            b.iter(|| encode(black_box(&program)))
        });
        group.bench_with_input(BenchmarkId::new("layout", len), &len, |b, _| {
            b.iter(|| to_raw_instructions(&to_sock_filters(black_box(&raw))))
        });
    }

    group.finish();
}

/// Benchmark rendering.
fn bench_disassemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/disassemble");

    let raw = records(512);
    let program = decode(&raw).expect("valid program");
    let filters = to_sock_filters(&raw);

    group.bench_function("listing", |b| b.iter(|| listing(black_box(&program))));
    group.bench_function("dump", |b| b.iter(|| dump(black_box(&filters))));

    group.finish();
}

criterion_group!(benches, bench_convert, bench_disassemble);

criterion_main!(benches);
