//! Classic BPF Filter Toolkit
//!
//! This crate manipulates programs written in the classic packet-filter
//! instruction set (cBPF): the accumulator/index register VM that kernels and
//! packet-capture libraries run per packet to decide whether to accept it and
//! how many bytes to keep.
//!
//! The centerpiece is [`chain::combine`], which splices two independently
//! compiled filters into one program implementing the short-circuit AND/OR of
//! their verdicts. Everything else exists to feed it and inspect its output.
//!
//! # Modules
//!
//! - [`bytecode`] - Symbolic instructions, raw 8-byte records, decode/encode
//! - [`chain`] - Filter composition
//! - [`asm`] - `bpf_asm` style disassembly
//! - [`verifier`] - Load-time structural checks
//! - [`execution`] - Reference interpreter
//! - [`profile`] - Build-time target limits
//!
//! # Quick Start
//!
//! ```
//! use bpf_chain::asm::listing;
//! use bpf_chain::bytecode::{Instruction, Register};
//! use bpf_chain::chain::{ChainType, combine};
//!
//! let a = [Instruction::Tax, Instruction::RetA];
//! let b = [Instruction::LoadConstant { dst: Register::A, val: 42 }, Instruction::RetA];
//!
//! let chained = combine(&a, &b, ChainType::And).expect("valid combinator");
//! assert_eq!(
//!     listing(&chained),
//!     "tax\njneq #0,1\nret a\nld #42\nret a\n"
//! );
//! ```
//!
//! # Target Profiles
//!
//! Exactly one target profile is selected at build time:
//!
//! ```bash
//! # Linux socket filters (default): 4096 instructions
//! cargo build --features linux-profile
//!
//! # BSD bpf(4) devices: 512 instructions
//! cargo build --no-default-features --features bsd-profile
//! ```

#![no_std]

extern crate alloc;

// Compile-time mutual exclusion: exactly one profile must be selected
#[cfg(all(feature = "linux-profile", feature = "bsd-profile"))]
compile_error!(
    "Cannot enable both `linux-profile` and `bsd-profile` features simultaneously. \
     Select exactly one target profile at build time."
);

#[cfg(not(any(feature = "linux-profile", feature = "bsd-profile")))]
compile_error!(
    "Must enable either `linux-profile` or `bsd-profile` feature. \
     Use `--features linux-profile` or `--features bsd-profile` when building."
);

pub mod asm;
pub mod bytecode;
pub mod chain;
pub mod execution;
pub mod profile;
pub mod verifier;
