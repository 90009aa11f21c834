//! Classic BPF Bytecode
//!
//! This module implements the classic BPF instruction set in two forms:
//!
//! - a symbolic [`Instruction`] enum that the composer, verifier,
//!   interpreter and disassembler pattern-match over
//! - the fixed 8-byte raw record, in the two nominally distinct layouts
//!   used by collaborators ([`RawInstruction`] and [`SockFilter`])
//!
//! # Architecture
//!
//! - 2 registers (A accumulator, X index), 32 bits wide
//! - 16 scratch memory words
//! - forward-only relative jumps, no loops
//! - 8-byte instruction format

pub mod codec;
pub mod instruction;
pub mod opcode;
pub mod raw;
pub mod registers;

pub use codec::{DecodeError, EncodeError, InvalidInstruction, decode, encode};
pub use instruction::{Extension, Instruction, JumpTest, Program, Successors};
pub use opcode::{AluOp, JmpOp, MemSize, OpcodeClass};
pub use raw::{RawInstruction, SockFilter, to_raw_instructions, to_sock_filters};
pub use registers::{Register, RegisterFile};
