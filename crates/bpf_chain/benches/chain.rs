//! Composition and execution benchmarks.

use bpf_chain::bytecode::{Instruction, JumpTest, Program, SockFilter};
use bpf_chain::chain::{ChainType, combine, combine_sock_filters};
use bpf_chain::execution::{FilterExecutor, Interpreter, PacketContext};
use bpf_chain::profile::ActiveProfile;
use bpf_chain::verifier::Verifier;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

/// `tcpdump -dd tcp`
const TCP: [SockFilter; 9] = [
    SockFilter::new(0x28, 0, 0, 0x0000000c),
    SockFilter::new(0x15, 0, 2, 0x000086dd),
    SockFilter::new(0x30, 0, 0, 0x00000014),
    SockFilter::new(0x15, 3, 4, 0x00000006),
    SockFilter::new(0x15, 0, 3, 0x00000800),
    SockFilter::new(0x30, 0, 0, 0x00000017),
    SockFilter::new(0x15, 0, 1, 0x00000006),
    SockFilter::new(0x06, 0, 0, 0x00040000),
    SockFilter::new(0x06, 0, 0, 0x00000000),
];

/// A filter of `len` instructions that checks one ethertype per branch and
/// ends in both kinds of return.
fn branching_filter(len: usize) -> Program {
    let mut program = Vec::with_capacity(len);
    program.push(Instruction::LoadAbsolute { off: 12, size: 2 });
    while program.len() + 3 < len {
        program.push(Instruction::JumpIf {
            cond: JumpTest::Equal,
            val: program.len() as u32,
            skip_true: 0,
            skip_false: 1,
        });
        program.push(Instruction::RetConstant { val: 0xffff });
    }
    program.push(Instruction::RetA);
    program.push(Instruction::RetConstant { val: 0 });
    program
}

/// Benchmark splicing programs of increasing size.
fn bench_combine(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain/combine");

    for len in [16, 256, 2048] {
        let a = branching_filter(len);
        let b = branching_filter(len);

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("and", len), &len, |bench, _| {
            bench.iter(|| combine(black_box(&a), black_box(&b), ChainType::And))
        });
        group.bench_with_input(BenchmarkId::new("or", len), &len, |bench, _| {
            bench.iter(|| combine(black_box(&a), black_box(&b), ChainType::Or))
        });
    }

    group.finish();
}

/// Benchmark the full decode, combine and encode path on records.
fn bench_sock_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain/sock_filters");

    group.bench_function("tcp_and_tcp", |b| {
        b.iter(|| combine_sock_filters(black_box(&TCP), black_box(&TCP), ChainType::And))
    });

    group.finish();
}

/// Benchmark verifying and running a composed program.
fn bench_composed(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain/composed");

    let program = combine(&branching_filter(64), &branching_filter(64), ChainType::Or)
        .expect("valid combinator");
    let interp = Interpreter::<ActiveProfile>::new();
    let mut packet = [0u8; 64];
    packet[12] = 0x08;
    let ctx = PacketContext::from_slice(&packet);

    group.bench_function("verify", |b| {
        b.iter(|| Verifier::<ActiveProfile>::verify(black_box(&program)))
    });
    group.bench_function("execute", |b| {
        b.iter(|| interp.execute(black_box(&program), black_box(&ctx)))
    });

    group.finish();
}

criterion_group!(benches, bench_combine, bench_sock_filters, bench_composed);

criterion_main!(benches);
