//! Classic BPF Register File
//!
//! Classic BPF has two 32-bit registers and a small scratch memory:
//! - A: accumulator, source of `ret a` and target of loads and ALU ops
//! - X: index register, used by indirect loads and `*_x` operations
//! - M[0..16]: scratch words written by `st`/`stx`

use core::fmt;

/// Classic BPF register identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    /// Accumulator
    A = 0,
    /// Index register
    X = 1,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("a"),
            Self::X => f.write_str("x"),
        }
    }
}

/// Register file state during execution.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterFile {
    a: u32,
    x: u32,
    scratch: [u32; Self::SCRATCH_SLOTS],
}

impl RegisterFile {
    /// Number of scratch memory words (`BPF_MEMWORDS`).
    pub const SCRATCH_SLOTS: usize = 16;

    /// Create a new register file with all registers and scratch zeroed.
    pub const fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            scratch: [0; Self::SCRATCH_SLOTS],
        }
    }

    /// Get register value.
    #[inline]
    pub const fn get(&self, reg: Register) -> u32 {
        match reg {
            Register::A => self.a,
            Register::X => self.x,
        }
    }

    /// Set register value.
    #[inline]
    pub fn set(&mut self, reg: Register, value: u32) {
        match reg {
            Register::A => self.a = value,
            Register::X => self.x = value,
        }
    }

    /// Read a scratch word. Returns `None` for slots outside `M[0..16]`.
    #[inline]
    pub fn load(&self, slot: u32) -> Option<u32> {
        self.scratch.get(slot as usize).copied()
    }

    /// Write a scratch word. Returns `None` for slots outside `M[0..16]`.
    #[inline]
    pub fn store(&mut self, slot: u32, value: u32) -> Option<()> {
        let word = self.scratch.get_mut(slot as usize)?;
        *word = value;
        Some(())
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterFile")
            .field("a", &format_args!("{:#010x}", self.a))
            .field("x", &format_args!("{:#010x}", self.x))
            .field("scratch", &self.scratch)
            .finish()
    }
}
