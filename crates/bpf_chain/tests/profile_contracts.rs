//! Profile Contract Tests
//!
//! These tests verify that each profile maintains its documented limits and
//! that the verifier and interpreter honor the profile they are built for.

use bpf_chain::bytecode::{Extension, Instruction};
use bpf_chain::execution::{ExecError, FilterExecutor, Interpreter, PacketContext};
use bpf_chain::profile::{ActiveProfile, BsdProfile, LinuxProfile, TargetProfile};
use bpf_chain::verifier::{Verifier, VerifyError};

fn load_then_return(num: Extension) -> [Instruction; 2] {
    [Instruction::LoadExtension { num }, Instruction::RetA]
}

#[test]
fn instruction_count_contract() {
    let insn_count = ActiveProfile::MAX_INSN_COUNT;
    // Every kernel and bpf(4) device takes at least BPF_MAXINSNS of 512
    assert!(insn_count >= 512);
    assert!(insn_count <= 4096);
}

#[test]
fn linux_profile_limits() {
    assert_eq!(LinuxProfile::MAX_INSN_COUNT, 4096);
    assert!(LinuxProfile::ANCILLARY_LOADS);
}

#[test]
fn bsd_profile_limits() {
    assert_eq!(BsdProfile::MAX_INSN_COUNT, 512);
    assert!(!BsdProfile::ANCILLARY_LOADS);
}

#[test]
#[cfg(feature = "linux-profile")]
fn linux_profile_is_active() {
    use core::any::TypeId;

    // ActiveProfile should be LinuxProfile in default builds
    assert_eq!(TypeId::of::<ActiveProfile>(), TypeId::of::<LinuxProfile>());
}

#[test]
#[cfg(all(feature = "bsd-profile", not(feature = "linux-profile")))]
fn bsd_profile_is_active() {
    use core::any::TypeId;

    assert_eq!(TypeId::of::<ActiveProfile>(), TypeId::of::<BsdProfile>());
}

#[test]
fn limit_is_inclusive() {
    let mut program = vec![Instruction::Tax; BsdProfile::MAX_INSN_COUNT - 1];
    program.push(Instruction::RetA);
    assert_eq!(Verifier::<BsdProfile>::verify(&program), Ok(()));

    program.insert(0, Instruction::Txa);
    assert_eq!(
        Verifier::<BsdProfile>::verify(&program),
        Err(VerifyError::TooManyInstructions {
            count: 513,
            limit: 512
        })
    );
}

#[test]
fn packet_length_is_available_everywhere() {
    let program = load_then_return(Extension::LEN);
    let ctx = PacketContext::from_slice(&[0u8; 60]);

    assert_eq!(Verifier::<LinuxProfile>::verify(&program), Ok(()));
    assert_eq!(Verifier::<BsdProfile>::verify(&program), Ok(()));
    assert_eq!(Interpreter::<LinuxProfile>::new().execute(&program, &ctx), Ok(60));
    assert_eq!(Interpreter::<BsdProfile>::new().execute(&program, &ctx), Ok(60));
}

#[test]
fn ancillary_loads_follow_profile() {
    let program = load_then_return(Extension::PROTO);
    let ctx = PacketContext {
        protocol: 0x0800,
        ..PacketContext::from_slice(&[])
    };

    assert_eq!(Verifier::<LinuxProfile>::verify(&program), Ok(()));
    assert_eq!(
        Interpreter::<LinuxProfile>::new().execute(&program, &ctx),
        Ok(0x0800)
    );

    assert_eq!(
        Verifier::<BsdProfile>::verify(&program),
        Err(VerifyError::UnsupportedExtension { index: 0 })
    );
    assert_eq!(
        Interpreter::<BsdProfile>::new().execute(&program, &ctx),
        Err(ExecError::UnsupportedExtension { index: 0, num: 0 })
    );
}
