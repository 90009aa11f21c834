//! Raw/Symbolic Conversion
//!
//! Decoding maps a raw record onto the closed [`Instruction`] set following
//! the classic BPF opcode layout. A record is only accepted when encoding
//! the decoded instruction reproduces its opcode, which rejects reserved
//! bits and unknown operations without a separate validation table.
//!
//! Encoding is the inverse and fails only for operand values the machine
//! format cannot express.

use alloc::vec::Vec;

use log::debug;
use thiserror::Error;

use super::instruction::{Extension, Instruction, JumpTest, Program};
use super::opcode::{
    AddrMode, AluOp, EXTENSION_OFFSET, JmpOp, MemSize, MiscOp, OpcodeClass, RetSource,
    SourceType,
};
use super::raw::RawInstruction;
use super::registers::{Register, RegisterFile};

/// An instruction operand that has no machine encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidInstruction {
    /// Load size other than 1, 2 or 4 bytes.
    #[error("load size {0} is not 1, 2 or 4 bytes")]
    LoadSize(u32),

    /// Scratch slot outside `M[0..16]`.
    #[error("scratch slot {0} is out of range")]
    ScratchSlot(u32),

    /// Extension id past the end of the ancillary offset range.
    #[error("extension {0} is out of range")]
    Extension(u32),
}

/// A raw record that does not decode to a known instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown opcode {op:#06x} at instruction {index}")]
pub struct DecodeError {
    /// Instruction index
    pub index: usize,
    /// Offending opcode
    pub op: u16,
}

/// A symbolic instruction that cannot be assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot encode instruction {index}: {reason}")]
pub struct EncodeError {
    /// Instruction index
    pub index: usize,
    /// Why the instruction has no encoding
    pub reason: InvalidInstruction,
}

/// Decode a raw program into symbolic instructions.
///
/// Fails on the first record with an unknown opcode; no partial program is
/// returned.
pub fn decode(raw: &[RawInstruction]) -> Result<Program, DecodeError> {
    raw.iter()
        .enumerate()
        .map(|(index, insn)| {
            insn.decode().ok_or_else(|| {
                debug!("decode: unknown opcode {:#06x} at instruction {}", insn.op, index);
                DecodeError { index, op: insn.op }
            })
        })
        .collect()
}

/// Encode a symbolic program into raw records.
pub fn encode(program: &[Instruction]) -> Result<Vec<RawInstruction>, EncodeError> {
    program
        .iter()
        .enumerate()
        .map(|(index, insn)| {
            insn.encode().map_err(|reason| {
                debug!("encode: instruction {} rejected: {}", index, reason);
                EncodeError { index, reason }
            })
        })
        .collect()
}

impl RawInstruction {
    /// Decode this record.
    ///
    /// Returns `None` if the opcode is not part of the classic BPF
    /// instruction set.
    pub fn decode(&self) -> Option<Instruction> {
        let insn = self.decode_fields()?;
        match insn.encode() {
            Ok(canonical) if canonical.op == self.op => Some(insn),
            _ => None,
        }
    }

    fn decode_fields(&self) -> Option<Instruction> {
        let op = self.op;
        let k = self.k;

        let insn = match OpcodeClass::from_opcode(op) {
            OpcodeClass::Ld => {
                let size = MemSize::from_opcode(op)?;
                match AddrMode::from_opcode(op)? {
                    AddrMode::Imm => Instruction::LoadConstant {
                        dst: Register::A,
                        val: k,
                    },
                    AddrMode::Mem => Instruction::LoadScratch {
                        dst: Register::A,
                        slot: k,
                    },
                    AddrMode::Abs => {
                        // `ld len` has its own opcode, so an absolute load at
                        // offset 1 of the range stays a packet load
                        let num = Extension(k.wrapping_sub(EXTENSION_OFFSET));
                        if size == MemSize::Word && k >= EXTENSION_OFFSET && num != Extension::LEN
                        {
                            Instruction::LoadExtension { num }
                        } else {
                            Instruction::LoadAbsolute {
                                off: k,
                                size: size.size_bytes(),
                            }
                        }
                    }
                    AddrMode::Ind => Instruction::LoadIndirect {
                        off: k,
                        size: size.size_bytes(),
                    },
                    AddrMode::Len => Instruction::LoadExtension {
                        num: Extension::LEN,
                    },
                    AddrMode::Msh => return None,
                }
            }
            OpcodeClass::Ldx => match AddrMode::from_opcode(op)? {
                AddrMode::Imm => Instruction::LoadConstant {
                    dst: Register::X,
                    val: k,
                },
                AddrMode::Mem => Instruction::LoadScratch {
                    dst: Register::X,
                    slot: k,
                },
                AddrMode::Msh => Instruction::LoadMemShift { off: k },
                _ => return None,
            },
            OpcodeClass::St => Instruction::StoreScratch {
                src: Register::A,
                slot: k,
            },
            OpcodeClass::Stx => Instruction::StoreScratch {
                src: Register::X,
                slot: k,
            },
            OpcodeClass::Alu => {
                if op & 0xf0 == AluOp::NEG {
                    Instruction::NegateA
                } else {
                    let alu_op = AluOp::from_opcode(op)?;
                    match SourceType::from_opcode(op) {
                        SourceType::K => Instruction::AluOpConstant { op: alu_op, val: k },
                        SourceType::X => Instruction::AluOpX { op: alu_op },
                    }
                }
            }
            OpcodeClass::Jmp => match JmpOp::from_opcode(op)? {
                JmpOp::Ja => Instruction::Jump { skip: k },
                jmp_op => {
                    let (cond, skip_true, skip_false) = jump_test(jmp_op, self.jt, self.jf);
                    match SourceType::from_opcode(op) {
                        SourceType::K => Instruction::JumpIf {
                            cond,
                            val: k,
                            skip_true,
                            skip_false,
                        },
                        SourceType::X => Instruction::JumpIfX {
                            cond,
                            skip_true,
                            skip_false,
                        },
                    }
                }
            },
            OpcodeClass::Ret => match RetSource::from_opcode(op)? {
                RetSource::K => Instruction::RetConstant { val: k },
                RetSource::A => Instruction::RetA,
            },
            OpcodeClass::Misc => match MiscOp::from_opcode(op)? {
                MiscOp::Tax => Instruction::Tax,
                MiscOp::Txa => Instruction::Txa,
            },
        };

        Some(insn)
    }
}

/// Map a machine comparison to a symbolic one.
///
/// A taken skip of zero means the comparison only matters when it fails,
/// which reads naturally as the negated relation.
fn jump_test(op: JmpOp, jt: u8, jf: u8) -> (JumpTest, u8, u8) {
    if jt == 0 {
        let negated = match op {
            JmpOp::Jeq => Some(JumpTest::NotEqual),
            JmpOp::Jgt => Some(JumpTest::LessOrEqual),
            JmpOp::Jge => Some(JumpTest::LessThan),
            _ => None,
        };
        if let Some(cond) = negated {
            return (cond, jf, 0);
        }
    }

    let cond = match op {
        JmpOp::Jgt => JumpTest::GreaterThan,
        JmpOp::Jge => JumpTest::GreaterOrEqual,
        JmpOp::Jset => JumpTest::BitsSet,
        _ => JumpTest::Equal,
    };
    (cond, jt, jf)
}

/// Map a symbolic comparison to its machine operation, and whether the
/// skip counts have to be swapped.
const fn jump_op(cond: JumpTest) -> (JmpOp, bool) {
    match cond {
        JumpTest::Equal => (JmpOp::Jeq, false),
        JumpTest::NotEqual => (JmpOp::Jeq, true),
        JumpTest::GreaterThan => (JmpOp::Jgt, false),
        JumpTest::LessOrEqual => (JmpOp::Jgt, true),
        JumpTest::GreaterOrEqual => (JmpOp::Jge, false),
        JumpTest::LessThan => (JmpOp::Jge, true),
        JumpTest::BitsSet => (JmpOp::Jset, false),
    }
}

fn load_size(size: u32) -> Result<u16, InvalidInstruction> {
    MemSize::from_bytes(size)
        .map(|size| size as u16)
        .ok_or(InvalidInstruction::LoadSize(size))
}

fn scratch_slot(slot: u32) -> Result<u32, InvalidInstruction> {
    if (slot as usize) < RegisterFile::SCRATCH_SLOTS {
        Ok(slot)
    } else {
        Err(InvalidInstruction::ScratchSlot(slot))
    }
}

fn conditional(cond: JumpTest, src: SourceType, k: u32, jt: u8, jf: u8) -> RawInstruction {
    let (op, swap) = jump_op(cond);
    let (jt, jf) = if swap { (jf, jt) } else { (jt, jf) };
    RawInstruction::new(
        OpcodeClass::Jmp as u16 | op as u16 | src as u16,
        jt,
        jf,
        k,
    )
}

impl Instruction {
    /// Encode this instruction into a raw record.
    pub fn encode(&self) -> Result<RawInstruction, InvalidInstruction> {
        let ld = OpcodeClass::Ld as u16;
        let ldx = OpcodeClass::Ldx as u16;
        let alu = OpcodeClass::Alu as u16;

        let raw = match *self {
            Self::LoadConstant { dst, val } => {
                let class = match dst {
                    Register::A => ld,
                    Register::X => ldx,
                };
                RawInstruction::new(class | AddrMode::Imm as u16, 0, 0, val)
            }
            Self::LoadScratch { dst, slot } => {
                let class = match dst {
                    Register::A => ld,
                    Register::X => ldx,
                };
                RawInstruction::new(class | AddrMode::Mem as u16, 0, 0, scratch_slot(slot)?)
            }
            Self::LoadAbsolute { off, size } => {
                RawInstruction::new(ld | AddrMode::Abs as u16 | load_size(size)?, 0, 0, off)
            }
            Self::LoadIndirect { off, size } => {
                RawInstruction::new(ld | AddrMode::Ind as u16 | load_size(size)?, 0, 0, off)
            }
            Self::LoadMemShift { off } => RawInstruction::new(
                ldx | AddrMode::Msh as u16 | MemSize::Byte as u16,
                0,
                0,
                off,
            ),
            Self::LoadExtension { num } => {
                if num == Extension::LEN {
                    RawInstruction::new(ld | AddrMode::Len as u16, 0, 0, 0)
                } else {
                    let k = EXTENSION_OFFSET
                        .checked_add(num.0)
                        .ok_or(InvalidInstruction::Extension(num.0))?;
                    RawInstruction::new(ld | AddrMode::Abs as u16, 0, 0, k)
                }
            }
            Self::StoreScratch { src, slot } => {
                let class = match src {
                    Register::A => OpcodeClass::St,
                    Register::X => OpcodeClass::Stx,
                };
                RawInstruction::new(class as u16, 0, 0, scratch_slot(slot)?)
            }
            Self::AluOpConstant { op, val } => {
                RawInstruction::new(alu | op as u16 | SourceType::K as u16, 0, 0, val)
            }
            Self::AluOpX { op } => {
                RawInstruction::new(alu | op as u16 | SourceType::X as u16, 0, 0, 0)
            }
            Self::NegateA => RawInstruction::new(alu | AluOp::NEG, 0, 0, 0),
            Self::Jump { skip } => {
                RawInstruction::new(OpcodeClass::Jmp as u16 | JmpOp::Ja as u16, 0, 0, skip)
            }
            Self::JumpIf {
                cond,
                val,
                skip_true,
                skip_false,
            } => conditional(cond, SourceType::K, val, skip_true, skip_false),
            Self::JumpIfX {
                cond,
                skip_true,
                skip_false,
            } => conditional(cond, SourceType::X, 0, skip_true, skip_false),
            Self::RetA => {
                RawInstruction::new(OpcodeClass::Ret as u16 | RetSource::A as u16, 0, 0, 0)
            }
            Self::RetConstant { val } => {
                RawInstruction::new(OpcodeClass::Ret as u16 | RetSource::K as u16, 0, 0, val)
            }
            Self::Tax => {
                RawInstruction::new(OpcodeClass::Misc as u16 | MiscOp::Tax as u16, 0, 0, 0)
            }
            Self::Txa => {
                RawInstruction::new(OpcodeClass::Misc as u16 | MiscOp::Txa as u16, 0, 0, 0)
            }
            Self::Raw(raw) => raw,
        };

        Ok(raw)
    }
}
