//! Symbolic Classic BPF Instructions
//!
//! [`Instruction`] is the closed set of classic BPF operations with their
//! operands pulled out of the raw record. Fields that the machine encoding
//! restricts (load sizes, scratch slots, extension ids) keep their full
//! numeric range here so that malformed values survive decoding-free
//! construction and can be reported by the encoder, verifier and
//! disassembler instead of being silently clamped.

use alloc::vec::Vec;

use super::opcode::AluOp;
use super::raw::RawInstruction;
use super::registers::Register;

/// A classic BPF program: instructions executed from index 0.
pub type Program = Vec<Instruction>;

/// Comparison performed by a conditional jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpTest {
    /// A == operand
    Equal,
    /// A != operand
    NotEqual,
    /// A > operand
    GreaterThan,
    /// A < operand
    LessThan,
    /// A >= operand
    GreaterOrEqual,
    /// A <= operand
    LessOrEqual,
    /// A & operand != 0
    BitsSet,
}

impl JumpTest {
    /// Evaluate the comparison.
    #[inline]
    pub const fn holds(self, a: u32, operand: u32) -> bool {
        match self {
            Self::Equal => a == operand,
            Self::NotEqual => a != operand,
            Self::GreaterThan => a > operand,
            Self::LessThan => a < operand,
            Self::GreaterOrEqual => a >= operand,
            Self::LessOrEqual => a <= operand,
            Self::BitsSet => a & operand != 0,
        }
    }
}

/// Built-in value read by a load from the extension offset range.
///
/// The numbering follows the Linux ancillary data offsets (`SKF_AD_*`),
/// except [`Extension::LEN`] which has its own addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extension(pub u32);

impl Extension {
    /// Packet protocol (`skb->protocol`)
    pub const PROTO: Self = Self(0);
    /// Packet length
    pub const LEN: Self = Self(1);
    /// Packet type (`skb->pkt_type`)
    pub const TYPE: Self = Self(4);
    /// Receiving interface index
    pub const INTERFACE_INDEX: Self = Self(8);
    /// Netlink attribute lookup
    pub const NETLINK_ATTR: Self = Self(12);
    /// Nested netlink attribute lookup
    pub const NETLINK_ATTR_NESTED: Self = Self(16);
    /// Packet mark
    pub const MARK: Self = Self(20);
    /// Receive queue
    pub const QUEUE: Self = Self(24);
    /// Link layer type of the device
    pub const LINK_LAYER_TYPE: Self = Self(28);
    /// Receive hash
    pub const RX_HASH: Self = Self(32);
    /// Current CPU
    pub const CPU_ID: Self = Self(36);
    /// VLAN tag
    pub const VLAN_TAG: Self = Self(44);
    /// Whether a VLAN tag is present
    pub const VLAN_TAG_PRESENT: Self = Self(48);
    /// Payload offset
    pub const PAYLOAD_OFFSET: Self = Self(52);
    /// Pseudo-random 32-bit value
    pub const RAND: Self = Self(56);
    /// VLAN protocol
    pub const VLAN_PROTO: Self = Self(60);

    /// `bpf_asm` name of the extension, if it has one.
    pub const fn name(self) -> Option<&'static str> {
        match self {
            Self::LEN => Some("len"),
            Self::PROTO => Some("proto"),
            Self::TYPE => Some("type"),
            Self::RAND => Some("rand"),
            _ => None,
        }
    }
}

/// A single decoded classic BPF instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// `dst = val`
    LoadConstant { dst: Register, val: u32 },
    /// `dst = M[slot]`
    LoadScratch { dst: Register, slot: u32 },
    /// `A = P[off:size]`
    LoadAbsolute { off: u32, size: u32 },
    /// `A = P[X + off:size]`
    LoadIndirect { off: u32, size: u32 },
    /// `X = 4 * (P[off:1] & 0xf)`
    LoadMemShift { off: u32 },
    /// `A = <extension>`
    LoadExtension { num: Extension },
    /// `M[slot] = src`
    StoreScratch { src: Register, slot: u32 },
    /// `A = A <op> val`
    AluOpConstant { op: AluOp, val: u32 },
    /// `A = A <op> X`
    AluOpX { op: AluOp },
    /// `A = -A`
    NegateA,
    /// Skip `skip` instructions unconditionally
    Jump { skip: u32 },
    /// Skip `skip_true` instructions if `A <cond> val`, else `skip_false`
    JumpIf {
        cond: JumpTest,
        val: u32,
        skip_true: u8,
        skip_false: u8,
    },
    /// Skip `skip_true` instructions if `A <cond> X`, else `skip_false`
    JumpIfX {
        cond: JumpTest,
        skip_true: u8,
        skip_false: u8,
    },
    /// Return A as the capture length
    RetA,
    /// Return `val` as the capture length; 0 rejects the packet
    RetConstant { val: u32 },
    /// `X = A`
    Tax,
    /// `A = X`
    Txa,
    /// A record that is carried verbatim without being decoded
    Raw(RawInstruction),
}

impl Instruction {
    /// Check if this instruction ends execution.
    #[inline]
    pub const fn is_return(&self) -> bool {
        matches!(self, Self::RetA | Self::RetConstant { .. })
    }

    /// Indices of the instructions this one may transfer control to,
    /// given its own index. Returns fall-through only for straight-line
    /// instructions and nothing for returns.
    pub fn successors(&self, idx: usize) -> Successors {
        match *self {
            Self::RetA | Self::RetConstant { .. } => Successors::None,
            Self::Jump { skip } => Successors::One(skip_target(idx, skip as usize)),
            Self::JumpIf {
                skip_true,
                skip_false,
                ..
            }
            | Self::JumpIfX {
                skip_true,
                skip_false,
                ..
            } => Successors::Two(
                skip_target(idx, skip_true as usize),
                skip_target(idx, skip_false as usize),
            ),
            _ => Successors::One(idx + 1),
        }
    }
}

#[inline]
fn skip_target(idx: usize, skip: usize) -> usize {
    idx.saturating_add(1).saturating_add(skip)
}

/// Control transfer targets of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Successors {
    /// Terminal instruction
    None,
    /// Fall-through or unconditional jump
    One(usize),
    /// Conditional jump: (taken, not taken)
    Two(usize, usize),
}

impl Successors {
    /// Iterate over the target indices.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        let (first, second) = match self {
            Self::None => (None, None),
            Self::One(t) => (Some(t), None),
            Self::Two(t, f) => (Some(t), Some(f)),
        };
        first.into_iter().chain(second)
    }
}
