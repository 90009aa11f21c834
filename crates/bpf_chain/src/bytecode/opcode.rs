//! Classic BPF Opcode Definitions
//!
//! Classic BPF instructions use a 16-bit opcode of which only the low byte
//! is populated:
//!
//! ```text
//! +----------------+--------+--------------------+
//! |    3 bits      | 2 bits |      3 bits        |
//! |  mode / op     |  size  |   instruction      |
//! |  (+ src bit)   |        |     class          |
//! +----------------+--------+--------------------+
//! ```
//!
//! - Instruction class (bits 0-2): Type of operation
//! - Load/store classes: size (bits 3-4) and addressing mode (bits 5-7)
//! - ALU/jump classes: source (bit 3) and operation (bits 4-7)
//! - Return class: return value source (bits 3-4)

use core::fmt;

/// Mask for the instruction class.
pub const CLASS_MASK: u16 = 0x07;
/// Mask for the load size.
pub const SIZE_MASK: u16 = 0x18;
/// Mask for the load addressing mode.
pub const MODE_MASK: u16 = 0xe0;
/// Mask for the ALU or jump operation.
pub const OP_MASK: u16 = 0xf0;
/// Mask for the operand source.
pub const SRC_MASK: u16 = 0x08;
/// Mask for the return value source.
pub const RVAL_MASK: u16 = 0x18;
/// Mask for the miscellaneous operation.
pub const MISC_MASK: u16 = 0xf8;

/// Offset at which absolute loads address built-in extensions instead of
/// packet bytes (`SKF_AD_OFF`, i.e. `-0x1000` as `u32`).
pub const EXTENSION_OFFSET: u32 = 0xffff_f000;

/// Instruction class (bits 0-2 of opcode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpcodeClass {
    /// Load into A
    Ld = 0x00,
    /// Load into X
    Ldx = 0x01,
    /// Store A into scratch
    St = 0x02,
    /// Store X into scratch
    Stx = 0x03,
    /// ALU operation on A
    Alu = 0x04,
    /// Jumps
    Jmp = 0x05,
    /// Return
    Ret = 0x06,
    /// Register transfers
    Misc = 0x07,
}

impl OpcodeClass {
    /// Extract instruction class from opcode.
    #[inline]
    pub const fn from_opcode(opcode: u16) -> Self {
        match opcode & CLASS_MASK {
            0x00 => Self::Ld,
            0x01 => Self::Ldx,
            0x02 => Self::St,
            0x03 => Self::Stx,
            0x04 => Self::Alu,
            0x05 => Self::Jmp,
            0x06 => Self::Ret,
            _ => Self::Misc,
        }
    }
}

/// Operand source (bit 3 of opcode for ALU and jump classes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SourceType {
    /// Operand is the constant `k`
    K = 0x00,
    /// Operand is register X
    X = 0x08,
}

impl SourceType {
    /// Extract source type from opcode.
    #[inline]
    pub const fn from_opcode(opcode: u16) -> Self {
        if opcode & SRC_MASK != 0 {
            Self::X
        } else {
            Self::K
        }
    }
}

/// ALU operation codes (bits 4-7 of opcode for ALU class).
///
/// Negation (`0x80`) takes no operand and is represented by
/// [`Instruction::NegateA`](super::Instruction::NegateA) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AluOp {
    /// Add: A += src
    Add = 0x00,
    /// Subtract: A -= src
    Sub = 0x10,
    /// Multiply: A *= src
    Mul = 0x20,
    /// Divide: A /= src
    Div = 0x30,
    /// Bitwise OR: A |= src
    Or = 0x40,
    /// Bitwise AND: A &= src
    And = 0x50,
    /// Left shift: A <<= src
    Lsh = 0x60,
    /// Logical right shift: A >>= src
    Rsh = 0x70,
    /// Modulo: A %= src
    Mod = 0x90,
    /// Bitwise XOR: A ^= src
    Xor = 0xa0,
}

impl AluOp {
    /// Opcode bits of the negate operation.
    pub const NEG: u16 = 0x80;

    /// Extract ALU operation from opcode.
    #[inline]
    pub const fn from_opcode(opcode: u16) -> Option<Self> {
        match opcode & OP_MASK {
            0x00 => Some(Self::Add),
            0x10 => Some(Self::Sub),
            0x20 => Some(Self::Mul),
            0x30 => Some(Self::Div),
            0x40 => Some(Self::Or),
            0x50 => Some(Self::And),
            0x60 => Some(Self::Lsh),
            0x70 => Some(Self::Rsh),
            0x90 => Some(Self::Mod),
            0xa0 => Some(Self::Xor),
            _ => None,
        }
    }

    /// Check if this operation can divide by zero.
    #[inline]
    pub const fn can_divide_by_zero(self) -> bool {
        matches!(self, Self::Div | Self::Mod)
    }

    /// Apply the operation to 32-bit operands with kernel semantics.
    ///
    /// Returns `None` on division or modulo by zero. Shifts of 32 or more
    /// produce zero.
    #[inline]
    pub const fn apply(self, dst: u32, src: u32) -> Option<u32> {
        let value = match self {
            Self::Add => dst.wrapping_add(src),
            Self::Sub => dst.wrapping_sub(src),
            Self::Mul => dst.wrapping_mul(src),
            Self::Div => {
                if src == 0 {
                    return None;
                }
                dst / src
            }
            Self::Mod => {
                if src == 0 {
                    return None;
                }
                dst % src
            }
            Self::Or => dst | src,
            Self::And => dst & src,
            Self::Xor => dst ^ src,
            Self::Lsh => {
                if src >= 32 {
                    0
                } else {
                    dst << src
                }
            }
            Self::Rsh => {
                if src >= 32 {
                    0
                } else {
                    dst >> src
                }
            }
        };
        Some(value)
    }
}

impl fmt::Display for AluOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Or => "or",
            Self::And => "and",
            Self::Lsh => "lsh",
            Self::Rsh => "rsh",
            Self::Mod => "mod",
            Self::Xor => "xor",
        };
        f.write_str(s)
    }
}

/// Jump operation codes (bits 4-7 of opcode for JMP class).
///
/// Only the four positive comparisons exist in machine code; negated
/// relations are expressed by swapping the two skip counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum JmpOp {
    /// Unconditional jump
    Ja = 0x00,
    /// Jump if A == src
    Jeq = 0x10,
    /// Jump if A > src (unsigned)
    Jgt = 0x20,
    /// Jump if A >= src (unsigned)
    Jge = 0x30,
    /// Jump if A & src != 0
    Jset = 0x40,
}

impl JmpOp {
    /// Extract jump operation from opcode.
    #[inline]
    pub const fn from_opcode(opcode: u16) -> Option<Self> {
        match opcode & OP_MASK {
            0x00 => Some(Self::Ja),
            0x10 => Some(Self::Jeq),
            0x20 => Some(Self::Jgt),
            0x30 => Some(Self::Jge),
            0x40 => Some(Self::Jset),
            _ => None,
        }
    }
}

/// Load size (bits 3-4 of opcode for load classes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MemSize {
    /// 32-bit word
    Word = 0x00,
    /// 16-bit half word
    Half = 0x08,
    /// 8-bit byte
    Byte = 0x10,
}

impl MemSize {
    /// Extract load size from opcode.
    #[inline]
    pub const fn from_opcode(opcode: u16) -> Option<Self> {
        match opcode & SIZE_MASK {
            0x00 => Some(Self::Word),
            0x08 => Some(Self::Half),
            0x10 => Some(Self::Byte),
            _ => None,
        }
    }

    /// Map a byte count to a load size.
    #[inline]
    pub const fn from_bytes(bytes: u32) -> Option<Self> {
        match bytes {
            1 => Some(Self::Byte),
            2 => Some(Self::Half),
            4 => Some(Self::Word),
            _ => None,
        }
    }

    /// Get the size in bytes.
    #[inline]
    pub const fn size_bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
        }
    }
}

/// Addressing mode (bits 5-7 of opcode for load/store classes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AddrMode {
    /// Constant `k`
    Imm = 0x00,
    /// Packet bytes at `k`
    Abs = 0x20,
    /// Packet bytes at `X + k`
    Ind = 0x40,
    /// Scratch word `M[k]`
    Mem = 0x60,
    /// Packet length
    Len = 0x80,
    /// IP header length: `4 * (P[k] & 0xf)`
    Msh = 0xa0,
}

impl AddrMode {
    /// Extract addressing mode from opcode.
    #[inline]
    pub const fn from_opcode(opcode: u16) -> Option<Self> {
        match opcode & MODE_MASK {
            0x00 => Some(Self::Imm),
            0x20 => Some(Self::Abs),
            0x40 => Some(Self::Ind),
            0x60 => Some(Self::Mem),
            0x80 => Some(Self::Len),
            0xa0 => Some(Self::Msh),
            _ => None,
        }
    }
}

/// Return value source (bits 3-4 of opcode for RET class).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RetSource {
    /// Return the constant `k`
    K = 0x00,
    /// Return register A
    A = 0x10,
}

impl RetSource {
    /// Extract return source from opcode.
    #[inline]
    pub const fn from_opcode(opcode: u16) -> Option<Self> {
        match opcode & RVAL_MASK {
            0x00 => Some(Self::K),
            0x10 => Some(Self::A),
            _ => None,
        }
    }
}

/// Register transfer operations (bits 3-7 of opcode for MISC class).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MiscOp {
    /// X = A
    Tax = 0x00,
    /// A = X
    Txa = 0x80,
}

impl MiscOp {
    /// Extract transfer operation from opcode.
    #[inline]
    pub const fn from_opcode(opcode: u16) -> Option<Self> {
        match opcode & MISC_MASK {
            0x00 => Some(Self::Tax),
            0x80 => Some(Self::Txa),
            _ => None,
        }
    }
}
