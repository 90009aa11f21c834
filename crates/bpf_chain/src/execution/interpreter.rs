//! Classic BPF Interpreter
//!
//! Executes symbolic instructions one at a time against a register file.
//!
//! # Profile Constraints
//!
//! - Program length bounded by `P::MAX_INSN_COUNT`
//! - Ancillary loads other than `ld len` only where `P::ANCILLARY_LOADS`

use core::marker::PhantomData;

use log::debug;

use super::{ExecError, ExecResult, FilterExecutor, PacketContext};
use crate::bytecode::opcode::EXTENSION_OFFSET;
use crate::bytecode::{Extension, Instruction, InvalidInstruction, MemSize, Register, RegisterFile};
use crate::profile::{ActiveProfile, TargetProfile};

/// Classic BPF interpreter.
pub struct Interpreter<P: TargetProfile = ActiveProfile> {
    _profile: PhantomData<P>,
}

impl<P: TargetProfile> Interpreter<P> {
    /// Create a new interpreter.
    pub fn new() -> Self {
        Self {
            _profile: PhantomData,
        }
    }

    /// Execute a single instruction.
    fn execute_insn(
        &self,
        index: usize,
        insn: &Instruction,
        regs: &mut RegisterFile,
        ctx: &PacketContext<'_>,
    ) -> Result<InsnResult, ExecError> {
        let a = regs.get(Register::A);
        let x = regs.get(Register::X);
        let invalid = |reason| ExecError::InvalidInstruction { index, reason };

        match *insn {
            Instruction::LoadConstant { dst, val } => regs.set(dst, val),
            Instruction::LoadScratch { dst, slot } => {
                let val = regs
                    .load(slot)
                    .ok_or(invalid(InvalidInstruction::ScratchSlot(slot)))?;
                regs.set(dst, val);
            }
            Instruction::LoadAbsolute { off, size: 4 }
                if off >= EXTENSION_OFFSET && P::ANCILLARY_LOADS =>
            {
                let num = Extension(off - EXTENSION_OFFSET);
                regs.set(Register::A, self.load_extension(index, num, ctx)?);
            }
            Instruction::LoadAbsolute { off, size } => {
                let size =
                    MemSize::from_bytes(size).ok_or(invalid(InvalidInstruction::LoadSize(size)))?;
                match load_packet(ctx.data, u64::from(off), size) {
                    Some(val) => regs.set(Register::A, val),
                    None => return Ok(InsnResult::Return(0)),
                }
            }
            Instruction::LoadIndirect { off, size } => {
                let size =
                    MemSize::from_bytes(size).ok_or(invalid(InvalidInstruction::LoadSize(size)))?;
                match load_packet(ctx.data, u64::from(x) + u64::from(off), size) {
                    Some(val) => regs.set(Register::A, val),
                    None => return Ok(InsnResult::Return(0)),
                }
            }
            Instruction::LoadMemShift { off } => {
                match load_packet(ctx.data, u64::from(off), MemSize::Byte) {
                    Some(val) => regs.set(Register::X, 4 * (val & 0xf)),
                    None => return Ok(InsnResult::Return(0)),
                }
            }
            Instruction::LoadExtension { num } => {
                regs.set(Register::A, self.load_extension(index, num, ctx)?);
            }
            Instruction::StoreScratch { src, slot } => {
                regs.store(slot, regs.get(src))
                    .ok_or(invalid(InvalidInstruction::ScratchSlot(slot)))?;
            }
            Instruction::AluOpConstant { op, val } => match op.apply(a, val) {
                Some(val) => regs.set(Register::A, val),
                None => return Ok(InsnResult::Return(0)),
            },
            Instruction::AluOpX { op } => match op.apply(a, x) {
                Some(val) => regs.set(Register::A, val),
                None => return Ok(InsnResult::Return(0)),
            },
            Instruction::NegateA => regs.set(Register::A, a.wrapping_neg()),
            Instruction::Jump { skip } => return Ok(InsnResult::Skip(skip as usize)),
            Instruction::JumpIf {
                cond,
                val,
                skip_true,
                skip_false,
            } => {
                let skip = if cond.holds(a, val) { skip_true } else { skip_false };
                return Ok(InsnResult::Skip(skip.into()));
            }
            Instruction::JumpIfX {
                cond,
                skip_true,
                skip_false,
            } => {
                let skip = if cond.holds(a, x) { skip_true } else { skip_false };
                return Ok(InsnResult::Skip(skip.into()));
            }
            Instruction::RetA => return Ok(InsnResult::Return(a)),
            Instruction::RetConstant { val } => return Ok(InsnResult::Return(val)),
            Instruction::Tax => regs.set(Register::X, a),
            Instruction::Txa => regs.set(Register::A, x),
            Instruction::Raw(_) => return Err(ExecError::UnknownInstruction { index }),
        }

        Ok(InsnResult::Continue)
    }

    /// Read a built-in value.
    fn load_extension(
        &self,
        index: usize,
        num: Extension,
        ctx: &PacketContext<'_>,
    ) -> Result<u32, ExecError> {
        match num {
            Extension::LEN => Ok(ctx.data_len() as u32),
            Extension::PROTO if P::ANCILLARY_LOADS => Ok(u32::from(ctx.protocol)),
            Extension::TYPE if P::ANCILLARY_LOADS => Ok(ctx.pkt_type),
            Extension::RAND if P::ANCILLARY_LOADS => Ok(ctx.random),
            _ => Err(ExecError::UnsupportedExtension { index, num: num.0 }),
        }
    }
}

impl<P: TargetProfile> Default for Interpreter<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: TargetProfile> FilterExecutor<P> for Interpreter<P> {
    fn execute(&self, program: &[Instruction], ctx: &PacketContext<'_>) -> ExecResult {
        if program.len() > P::MAX_INSN_COUNT {
            return Err(ExecError::TooLong {
                count: program.len(),
                limit: P::MAX_INSN_COUNT,
            });
        }

        let mut regs = RegisterFile::new();
        let mut pc = 0usize;

        loop {
            let insn = program.get(pc).ok_or(ExecError::NoReturn)?;

            match self.execute_insn(pc, insn, &mut regs, ctx) {
                Ok(InsnResult::Continue) => pc += 1,
                Ok(InsnResult::Skip(skip)) => {
                    let target = pc.saturating_add(1).saturating_add(skip);
                    if target >= program.len() {
                        return Err(ExecError::JumpOutOfRange { index: pc, target });
                    }
                    pc = target;
                }
                Ok(InsnResult::Return(verdict)) => return Ok(verdict),
                Err(err) => {
                    debug!("interpreter [{}]: fault at {}: {}", P::NAME, pc, err);
                    return Err(err);
                }
            }
        }
    }
}

/// Result of executing a single instruction.
enum InsnResult {
    /// Continue to next instruction
    Continue,
    /// Skip this many instructions after the current one
    Skip(usize),
    /// Program finished with a verdict
    Return(u32),
}

/// Read a big-endian value from the packet. Returns `None` if any byte lies
/// outside it.
fn load_packet(data: &[u8], off: u64, size: MemSize) -> Option<u32> {
    let start = usize::try_from(off).ok()?;
    let end = start.checked_add(size.size_bytes() as usize)?;
    let bytes = data.get(start..end)?;

    Some(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
}
