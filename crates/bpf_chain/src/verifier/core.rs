//! Core Verifier Implementation
//!
//! Runs the structural checks first, then a single forward pass tracking
//! which scratch words are written on every path.

use alloc::vec;
use alloc::vec::Vec;
use core::marker::PhantomData;

use log::debug;

use super::error::{VerifyError, VerifyResult};
use crate::bytecode::{Extension, Instruction, RegisterFile};
use crate::profile::{ActiveProfile, TargetProfile};

/// Set of scratch words, one bit per slot.
type ScratchMask = u16;

const _: () = assert!(RegisterFile::SCRATCH_SLOTS <= ScratchMask::BITS as usize);

/// Classic BPF program verifier.
///
/// Parameterized by the target profile, which fixes the instruction limit
/// and whether ancillary loads are allowed.
pub struct Verifier<P: TargetProfile = ActiveProfile> {
    /// Scratch words written on every path reaching each instruction;
    /// `None` until some path reaches it.
    written: Vec<Option<ScratchMask>>,

    /// Profile marker
    _profile: PhantomData<P>,
}

impl<P: TargetProfile> Verifier<P> {
    /// Create a new verifier.
    pub fn new() -> Self {
        Self {
            written: Vec::new(),
            _profile: PhantomData,
        }
    }

    /// Verify a classic BPF program.
    ///
    /// Performs:
    /// 1. Size checks against the profile
    /// 2. Per-instruction checks (encodability, constant divisors, jumps)
    /// 3. Termination check
    /// 4. Scratch memory initialization dataflow
    pub fn verify(program: &[Instruction]) -> VerifyResult<()> {
        let mut verifier = Self::new();

        verifier.run(program).inspect_err(|err| {
            debug!("verifier [{}]: rejected: {}", P::NAME, err);
        })
    }

    fn run(&mut self, program: &[Instruction]) -> VerifyResult<()> {
        self.check_basic(program)?;

        for (index, insn) in program.iter().enumerate() {
            self.check_instruction(program.len(), index, insn)?;
        }

        if !program.last().is_some_and(Instruction::is_return) {
            return Err(VerifyError::MissingReturn);
        }

        self.check_scratch(program)
    }

    /// Perform basic structural checks.
    fn check_basic(&self, program: &[Instruction]) -> VerifyResult<()> {
        if program.is_empty() {
            return Err(VerifyError::EmptyProgram);
        }

        if program.len() > P::MAX_INSN_COUNT {
            return Err(VerifyError::TooManyInstructions {
                count: program.len(),
                limit: P::MAX_INSN_COUNT,
            });
        }

        Ok(())
    }

    fn check_instruction(&self, len: usize, index: usize, insn: &Instruction) -> VerifyResult<()> {
        match *insn {
            Instruction::Raw(_) => return Err(VerifyError::UnknownInstruction { index }),
            Instruction::AluOpConstant { op, val: 0 } if op.can_divide_by_zero() => {
                return Err(VerifyError::DivisionByZero { index });
            }
            Instruction::LoadExtension { num } if num != Extension::LEN && !P::ANCILLARY_LOADS => {
                return Err(VerifyError::UnsupportedExtension { index });
            }
            _ => {}
        }

        insn.encode()
            .map_err(|reason| VerifyError::InvalidInstruction { index, reason })?;

        // Falling off the end is reported as a missing return
        let is_jump = matches!(
            insn,
            Instruction::Jump { .. } | Instruction::JumpIf { .. } | Instruction::JumpIfX { .. }
        );
        if !is_jump {
            return Ok(());
        }

        match insn.successors(index).iter().find(|&target| target >= len) {
            Some(target) => Err(VerifyError::JumpOutOfRange { index, target }),
            None => Ok(()),
        }
    }

    /// Check that every scratch read is preceded by a write on all paths.
    ///
    /// Jumps only go forward, so visiting instructions in order sees every
    /// predecessor of an instruction before the instruction itself.
    fn check_scratch(&mut self, program: &[Instruction]) -> VerifyResult<()> {
        self.written = vec![None; program.len()];
        self.written[0] = Some(0);

        for (index, insn) in program.iter().enumerate() {
            // Unreachable
            let Some(mut mask) = self.written[index] else {
                continue;
            };

            match *insn {
                Instruction::LoadScratch { slot, .. } if mask & (1 << slot) == 0 => {
                    return Err(VerifyError::UninitializedScratch { index, slot });
                }
                Instruction::StoreScratch { slot, .. } => mask |= 1 << slot,
                _ => {}
            }

            for target in insn.successors(index).iter() {
                if let Some(entry) = self.written.get_mut(target) {
                    *entry = Some(entry.map_or(mask, |known| known & mask));
                }
            }
        }

        Ok(())
    }
}

impl<P: TargetProfile> Default for Verifier<P> {
    fn default() -> Self {
        Self::new()
    }
}
