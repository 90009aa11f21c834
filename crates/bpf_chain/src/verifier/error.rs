//! Verification Errors
//!
//! Error types returned when a classic BPF program fails load-time checks.

use thiserror::Error;

use crate::bytecode::InvalidInstruction;

/// Errors that can occur during classic BPF program verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyError {
    // ========================================
    // Structural checks
    // ========================================
    /// Program is empty
    #[error("program is empty")]
    EmptyProgram,

    /// Instruction count exceeds profile limit
    #[error("instruction count {count} exceeds limit {limit}")]
    TooManyInstructions {
        /// Instruction count
        count: usize,
        /// Profile limit
        limit: usize,
    },

    /// Record that is not a classic BPF instruction
    #[error("unknown instruction at {index}")]
    UnknownInstruction {
        /// Instruction index
        index: usize,
    },

    /// Operand that has no machine encoding
    #[error("invalid instruction at {index}: {reason}")]
    InvalidInstruction {
        /// Instruction index
        index: usize,
        /// Offending operand
        reason: InvalidInstruction,
    },

    /// Ancillary load on a target without ancillary data
    #[error("ancillary load at instruction {index} is not supported by the target")]
    UnsupportedExtension {
        /// Instruction index
        index: usize,
    },

    /// Constant division or modulo by zero
    #[error("division by zero at instruction {index}")]
    DivisionByZero {
        /// Instruction index
        index: usize,
    },

    /// Jump lands outside the program
    #[error("jump target {target} out of range at instruction {index}")]
    JumpOutOfRange {
        /// Instruction index of jump
        index: usize,
        /// Target index
        target: usize,
    },

    /// Last instruction is not a return
    #[error("program does not end with a return")]
    MissingReturn,

    // ========================================
    // Dataflow checks
    // ========================================
    /// Scratch word read before being written on some path
    #[error("read of uninitialized M[{slot}] at instruction {index}")]
    UninitializedScratch {
        /// Instruction index
        index: usize,
        /// Scratch slot
        slot: u32,
    },
}

/// Result type for verification operations.
pub type VerifyResult<T> = Result<T, VerifyError>;
