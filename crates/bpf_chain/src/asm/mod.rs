//! `bpf_asm` Disassembly
//!
//! Renders instructions in the syntax of the Linux `bpf_asm` tool
//! (`Documentation/networking/filter.rst`), one instruction per line and
//! without labels. Jump targets are printed as relative skip counts.
//!
//! Instructions whose operands have no textual form render as
//! `!! unknown instruction: <debug form>` so that a listing can always be
//! produced, even for programs that would not encode.

use alloc::string::String;
use core::fmt::{self, Write};

use crate::bytecode::opcode::EXTENSION_OFFSET;
use crate::bytecode::{
    Extension, Instruction, JumpTest, RawInstruction, Register, RegisterFile, SockFilter,
};

/// Render a program as a `bpf_asm` listing, one `\n`-terminated line per
/// instruction.
pub fn listing(program: &[Instruction]) -> String {
    let mut out = String::new();
    for insn in program {
        // Writing into a String cannot fail
        let _ = writeln!(out, "{}", insn);
    }
    out
}

/// Render raw records as the debug form of their decoded instructions.
///
/// Records that do not decode are listed as themselves.
pub fn dump(filters: &[SockFilter]) -> String {
    let mut out = String::new();
    for filter in filters {
        let raw = RawInstruction::from(*filter);
        let _ = match raw.decode() {
            Some(insn) => writeln!(out, "{:?}", insn),
            None => writeln!(out, "{:?}", raw),
        };
    }
    out
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::LoadConstant { dst, val } => write!(f, "{} #{}", load_mnemonic(dst), val),
            Self::LoadScratch { dst, slot } if is_slot(slot) => {
                write!(f, "{} M[{}]", load_mnemonic(dst), slot)
            }
            Self::LoadAbsolute { off, size: 4 } if off >= EXTENSION_OFFSET => {
                let insn = Self::LoadExtension {
                    num: Extension(off.wrapping_sub(EXTENSION_OFFSET)),
                };
                fmt::Display::fmt(&insn, f)
            }
            Self::LoadAbsolute { off, size } => match size_prefix(size) {
                Some(mnemonic) => write!(f, "{} [{}]", mnemonic, off),
                None => unknown(f, self),
            },
            Self::LoadIndirect { off, size } => match size_prefix(size) {
                Some(mnemonic) => write!(f, "{} [x + {}]", mnemonic, off),
                None => unknown(f, self),
            },
            Self::LoadMemShift { off } => write!(f, "ldx 4*([{}]&0xf)", off),
            Self::LoadExtension { num } => match num.name() {
                Some(name) => write!(f, "ld #{}", name),
                None => unknown(f, self),
            },
            Self::StoreScratch { src, slot } if is_slot(slot) => {
                let mnemonic = match src {
                    Register::A => "st",
                    Register::X => "stx",
                };
                write!(f, "{} M[{}]", mnemonic, slot)
            }
            Self::AluOpConstant { op, val } => write!(f, "{} #{}", op, val),
            Self::AluOpX { op } => write!(f, "{} x", op),
            Self::NegateA => f.write_str("neg"),
            Self::Jump { skip } => write!(f, "jmp {}", skip),
            Self::JumpIf {
                cond,
                val,
                skip_true,
                skip_false,
            } => conditional(f, cond, format_args!("#{}", val), skip_true, skip_false),
            Self::JumpIfX {
                cond,
                skip_true,
                skip_false,
            } => conditional(f, cond, format_args!("x"), skip_true, skip_false),
            Self::RetA => f.write_str("ret a"),
            Self::RetConstant { val } => write!(f, "ret #{}", val),
            Self::Tax => f.write_str("tax"),
            Self::Txa => f.write_str("txa"),
            Self::LoadScratch { .. } | Self::StoreScratch { .. } | Self::Raw(_) => unknown(f, self),
        }
    }
}

fn unknown(f: &mut fmt::Formatter<'_>, insn: &Instruction) -> fmt::Result {
    write!(f, "!! unknown instruction: {:?}", insn)
}

const fn load_mnemonic(dst: Register) -> &'static str {
    match dst {
        Register::A => "ld",
        Register::X => "ldx",
    }
}

const fn size_prefix(size: u32) -> Option<&'static str> {
    match size {
        1 => Some("ldb"),
        2 => Some("ldh"),
        4 => Some("ld"),
        _ => None,
    }
}

const fn is_slot(slot: u32) -> bool {
    (slot as usize) < RegisterFile::SCRATCH_SLOTS
}

fn conditional(
    f: &mut fmt::Formatter<'_>,
    cond: JumpTest,
    operand: fmt::Arguments<'_>,
    skip_true: u8,
    skip_false: u8,
) -> fmt::Result {
    let (positive, negative) = match cond {
        JumpTest::Equal => ("jeq", Some("jneq")),
        JumpTest::GreaterThan => ("jgt", Some("jle")),
        JumpTest::GreaterOrEqual => ("jge", Some("jlt")),
        JumpTest::NotEqual => ("jneq", None),
        JumpTest::LessThan => ("jlt", None),
        JumpTest::LessOrEqual => ("jle", None),
        JumpTest::BitsSet => ("jset", None),
    };

    match negative {
        // Only the false branch goes anywhere: print the inverted relation
        Some(negative) if skip_true == 0 => write!(f, "{} {},{}", negative, operand, skip_false),
        _ if skip_false > 0 => write!(f, "{} {},{},{}", positive, operand, skip_true, skip_false),
        _ => write!(f, "{} {},{}", positive, operand, skip_true),
    }
}
