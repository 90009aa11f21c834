//! Raw Classic BPF Records
//!
//! Every classic BPF instruction is a fixed 8-byte record:
//!
//! ```text
//! +----------------+--------+--------+--------------------+
//! |    opcode      |   jt   |   jf   |         k          |
//! |    16 bits     | 8 bits | 8 bits |      32 bits       |
//! +----------------+--------+--------+--------------------+
//! ```
//!
//! Two collaborators define this layout under different names: the
//! assembler-side [`RawInstruction`] and the kernel/libpcap
//! [`SockFilter`] (`struct sock_filter`). They are converted by copying
//! each field in declaration order; no memory reinterpretation is involved.

use alloc::vec::Vec;
use core::fmt;

/// Raw classic BPF instruction as produced by an assembler.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C)]
pub struct RawInstruction {
    /// Opcode
    pub op: u16,
    /// Skip count when a conditional jump is taken
    pub jt: u8,
    /// Skip count when a conditional jump is not taken
    pub jf: u8,
    /// Constant operand
    pub k: u32,
}

/// Raw classic BPF instruction in the kernel `struct sock_filter` layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C)]
pub struct SockFilter {
    /// Opcode
    pub code: u16,
    /// Skip count when a conditional jump is taken
    pub jt: u8,
    /// Skip count when a conditional jump is not taken
    pub jf: u8,
    /// Constant operand
    pub k: u32,
}

impl RawInstruction {
    /// Size of a raw instruction in bytes
    pub const SIZE: usize = 8;

    /// Create a new raw instruction.
    #[inline]
    pub const fn new(op: u16, jt: u8, jf: u8, k: u32) -> Self {
        Self { op, jt, jf, k }
    }

    /// Serialize to the in-memory byte layout of the host.
    #[inline]
    pub fn to_ne_bytes(self) -> [u8; Self::SIZE] {
        SockFilter::from(self).to_ne_bytes()
    }

    /// Deserialize from the in-memory byte layout of the host.
    #[inline]
    pub fn from_ne_bytes(bytes: [u8; Self::SIZE]) -> Self {
        SockFilter::from_ne_bytes(bytes).into()
    }
}

impl SockFilter {
    /// Size of a `sock_filter` record in bytes
    pub const SIZE: usize = 8;

    /// Create a new record.
    #[inline]
    pub const fn new(code: u16, jt: u8, jf: u8, k: u32) -> Self {
        Self { code, jt, jf, k }
    }

    /// Serialize to the in-memory byte layout of the host.
    pub fn to_ne_bytes(self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..2].copy_from_slice(&self.code.to_ne_bytes());
        bytes[2] = self.jt;
        bytes[3] = self.jf;
        bytes[4..8].copy_from_slice(&self.k.to_ne_bytes());
        bytes
    }

    /// Deserialize from the in-memory byte layout of the host.
    pub fn from_ne_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self {
            code: u16::from_ne_bytes([bytes[0], bytes[1]]),
            jt: bytes[2],
            jf: bytes[3],
            k: u32::from_ne_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}

impl From<RawInstruction> for SockFilter {
    #[inline]
    fn from(raw: RawInstruction) -> Self {
        Self {
            code: raw.op,
            jt: raw.jt,
            jf: raw.jf,
            k: raw.k,
        }
    }
}

impl From<SockFilter> for RawInstruction {
    #[inline]
    fn from(filter: SockFilter) -> Self {
        Self {
            op: filter.code,
            jt: filter.jt,
            jf: filter.jf,
            k: filter.k,
        }
    }
}

/// Convert assembler records into `sock_filter` records.
pub fn to_sock_filters(raw: &[RawInstruction]) -> Vec<SockFilter> {
    raw.iter().copied().map(SockFilter::from).collect()
}

/// Convert `sock_filter` records into assembler records.
pub fn to_raw_instructions(filters: &[SockFilter]) -> Vec<RawInstruction> {
    filters.iter().copied().map(RawInstruction::from).collect()
}

impl fmt::Debug for RawInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawInstruction")
            .field("op", &format_args!("{:#06x}", self.op))
            .field("jt", &self.jt)
            .field("jf", &self.jf)
            .field("k", &format_args!("{:#x}", self.k))
            .finish()
    }
}

impl fmt::Debug for SockFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SockFilter")
            .field("code", &format_args!("{:#06x}", self.code))
            .field("jt", &self.jt)
            .field("jf", &self.jf)
            .field("k", &format_args!("{:#x}", self.k))
            .finish()
    }
}
