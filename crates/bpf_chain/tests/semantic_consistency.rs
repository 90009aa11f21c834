//! Semantic Consistency Tests
//!
//! These tests run composed filters through the interpreter and check that
//! their verdict is the short-circuit combination of the verdicts of the
//! inputs run on their own:
//!
//! - AND: the first verdict if it rejects, the second otherwise
//! - OR: the first verdict if it accepts, the second otherwise
//!
//! Every filter here loads what it inspects before using it, so the second
//! program does not observe registers left behind by the first.

use bpf_chain::bytecode::{AluOp, Instruction, JumpTest, Program};
use bpf_chain::chain::{ChainType, combine};
use bpf_chain::execution::{ExecResult, FilterExecutor, Interpreter, PacketContext};
use bpf_chain::profile::ActiveProfile;
use bpf_chain::verifier::Verifier;

/// Helper to create an interpreter for the active profile.
fn interpreter() -> Interpreter<ActiveProfile> {
    Interpreter::new()
}

fn run(program: &[Instruction], packet: &[u8]) -> ExecResult {
    interpreter().execute(program, &PacketContext::from_slice(packet))
}

/// Build an Ethernet frame prefix with the given ethertype, TTL and IP
/// protocol.
fn frame(ethertype: u16, ttl: u8, protocol: u8) -> Vec<u8> {
    let mut frame = vec![0u8; 12];
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame.extend_from_slice(&[0x45, 0x00, 0x00, 0x28, 0x00, 0x01, 0x40, 0x00]);
    frame.extend_from_slice(&[ttl, protocol]);
    frame
}

fn packets() -> Vec<Vec<u8>> {
    vec![
        frame(0x0800, 64, 6),
        frame(0x0800, 0, 17),
        frame(0x86dd, 255, 6),
        frame(0x0806, 1, 0),
    ]
}

fn accept_all() -> Program {
    vec![Instruction::RetConstant { val: 0xffff }]
}

fn reject_all() -> Program {
    vec![Instruction::RetConstant { val: 0 }]
}

/// `ip`: keep 96 bytes of IPv4 frames
fn ipv4() -> Program {
    vec![
        Instruction::LoadAbsolute { off: 12, size: 2 },
        Instruction::JumpIf {
            cond: JumpTest::Equal,
            val: 0x0800,
            skip_true: 0,
            skip_false: 1,
        },
        Instruction::RetConstant { val: 96 },
        Instruction::RetConstant { val: 0 },
    ]
}

/// `not ip`: keep 96 bytes of everything but IPv4, with the rejecting
/// return before the last instruction
fn non_ipv4() -> Program {
    vec![
        Instruction::LoadAbsolute { off: 12, size: 2 },
        Instruction::JumpIf {
            cond: JumpTest::Equal,
            val: 0x0800,
            skip_true: 0,
            skip_false: 1,
        },
        Instruction::RetConstant { val: 0 },
        Instruction::RetConstant { val: 96 },
    ]
}

/// `ip proto tcp`
fn tcp() -> Program {
    vec![
        Instruction::LoadAbsolute { off: 23, size: 1 },
        Instruction::JumpIf {
            cond: JumpTest::NotEqual,
            val: 6,
            skip_true: 1,
            skip_false: 0,
        },
        Instruction::RetConstant { val: 0xffff },
        Instruction::RetConstant { val: 0 },
    ]
}

/// Keep as many bytes as the TTL says
fn ttl_snaplen() -> Program {
    vec![
        Instruction::LoadAbsolute { off: 22, size: 1 },
        Instruction::RetA,
    ]
}

/// Low byte of the ethertype, with a `ret a` that is not the last
/// instruction of the program
fn ethertype_low_byte() -> Program {
    vec![
        Instruction::LoadAbsolute { off: 12, size: 2 },
        Instruction::AluOpConstant {
            op: AluOp::And,
            val: 0xff,
        },
        Instruction::RetA,
        Instruction::RetConstant { val: 0 },
    ]
}

fn filters() -> Vec<(&'static str, Program)> {
    vec![
        ("accept_all", accept_all()),
        ("reject_all", reject_all()),
        ("ipv4", ipv4()),
        ("non_ipv4", non_ipv4()),
        ("tcp", tcp()),
        ("ttl_snaplen", ttl_snaplen()),
    ]
}

fn expected(mode: ChainType, first: u32, second: u32) -> u32 {
    match mode {
        ChainType::And if first == 0 => 0,
        ChainType::Or if first != 0 => first,
        _ => second,
    }
}

fn assert_short_circuit(mode: ChainType) {
    for (name_a, a) in filters() {
        for (name_b, b) in filters() {
            let combined = combine(&a, &b, mode).expect("defined combinator");
            assert_eq!(
                Verifier::<ActiveProfile>::verify(&combined),
                Ok(()),
                "{} {} {}",
                name_a,
                mode,
                name_b
            );

            for packet in packets() {
                let first = run(&a, &packet).expect("first filter runs");
                let second = run(&b, &packet).expect("second filter runs");
                assert_eq!(
                    run(&combined, &packet),
                    Ok(expected(mode, first, second)),
                    "{} {} {} on {:02x?}",
                    name_a,
                    mode,
                    name_b,
                    packet
                );
            }
        }
    }
}

#[test]
fn semantic_and_short_circuits() {
    assert_short_circuit(ChainType::And);
}

#[test]
fn semantic_or_short_circuits() {
    assert_short_circuit(ChainType::Or);
}

#[test]
fn semantic_truncation_length_comes_from_deciding_filter() {
    let packet = frame(0x0800, 64, 6);

    // ip and tcp: ipv4 accepts with 96, tcp decides with 0xffff
    let combined = combine(&ipv4(), &tcp(), ChainType::And).expect("valid");
    assert_eq!(run(&combined, &packet), Ok(0xffff));

    // ip or tcp: ipv4 already accepts with 96
    let combined = combine(&ipv4(), &tcp(), ChainType::Or).expect("valid");
    assert_eq!(run(&combined, &packet), Ok(96));
}

#[test]
fn semantic_inner_reject_reaches_second_filter_under_or() {
    let combined = combine(&non_ipv4(), &tcp(), ChainType::Or).expect("valid");
    assert_eq!(combined[2], Instruction::Jump { skip: 1 });

    // IPv4 is rejected by the first filter and decided by the second
    let packet = frame(0x0800, 64, 6);
    assert_eq!(run(&non_ipv4(), &packet), Ok(0));
    assert_eq!(run(&combined, &packet), Ok(0xffff));
    assert_eq!(run(&combined, &frame(0x0800, 64, 17)), Ok(0));

    // Anything else is accepted without running the second filter
    assert_eq!(run(&combined, &frame(0x86dd, 64, 17)), Ok(96));
}

#[test]
fn semantic_ret_a_before_end_of_first_filter() {
    let first = ethertype_low_byte();
    let second = accept_all();

    // The guard only skips the `ret a` itself. Under AND control then
    // reaches the trailing `ret #0` of the first filter instead of the
    // second one.
    let combined = combine(&first, &second, ChainType::And).expect("valid");
    for packet in packets() {
        assert_eq!(run(&combined, &packet), Ok(0), "{:02x?}", packet);
    }

    // Under OR the trailing `ret #0` sits at the boundary and is dropped,
    // so a zero accumulator still reaches the second filter
    let combined = combine(&first, &second, ChainType::Or).expect("valid");
    assert_eq!(run(&combined, &frame(0x0800, 64, 6)), Ok(0xffff));
    assert_eq!(run(&combined, &frame(0x86dd, 64, 6)), Ok(0xdd));
    assert_eq!(run(&combined, &frame(0x0806, 64, 6)), Ok(0x06));
}

#[test]
fn semantic_out_of_bounds_load_rejects_whole_program() {
    // A failed packet load ends the composed program, so the second filter
    // of an OR is never consulted
    let truncated = [0u8; 14];
    let combined = combine(&tcp(), &accept_all(), ChainType::Or).expect("valid");
    assert_eq!(run(&accept_all(), &truncated), Ok(0xffff));
    assert_eq!(run(&combined, &truncated), Ok(0));
}

#[test]
fn semantic_runtime_zero_verdict_continues_or() {
    // TTL 0 makes `ret a` reject, so OR consults the second filter
    let packet = frame(0x0800, 0, 17);
    let combined = combine(&ttl_snaplen(), &ipv4(), ChainType::Or).expect("valid");
    assert_eq!(run(&ttl_snaplen(), &packet), Ok(0));
    assert_eq!(run(&combined, &packet), Ok(96));

    // TTL 64 accepts 64 bytes without running the second filter
    let packet = frame(0x0800, 64, 17);
    assert_eq!(run(&combined, &packet), Ok(64));
}

#[test]
fn semantic_combination_is_associative_for_constants() {
    let packet = frame(0x0800, 64, 6);
    let left = combine(
        &combine(&ipv4(), &tcp(), ChainType::And).expect("valid"),
        &accept_all(),
        ChainType::And,
    )
    .expect("valid");
    let right = combine(
        &ipv4(),
        &combine(&tcp(), &accept_all(), ChainType::And).expect("valid"),
        ChainType::And,
    )
    .expect("valid");

    assert_eq!(run(&left, &packet), run(&right, &packet));
    assert_eq!(run(&left, &packet), Ok(0xffff));
}
