//! Classic BPF Program Execution
//!
//! A reference interpreter for classic filters. It exists to observe what a
//! composed program decides for a given packet, so it follows the Linux
//! `sk_run_filter` semantics rather than aiming for speed:
//!
//! - packet loads are big-endian and a load outside the packet rejects it
//! - division or modulo by zero rejects the packet
//! - shifts by 32 or more produce 0
//!
//! Structural faults that the verifier would have rejected are reported as
//! [`ExecError`] instead of being given a verdict.

mod interpreter;

pub use interpreter::Interpreter;
use thiserror::Error;

use crate::bytecode::{Instruction, InvalidInstruction};
use crate::profile::{ActiveProfile, TargetProfile};

/// Packet and metadata a filter runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketContext<'a> {
    /// Packet bytes starting at the link layer header
    pub data: &'a [u8],
    /// Value of `ld #proto`, in host order
    pub protocol: u16,
    /// Value of `ld #type`
    pub pkt_type: u32,
    /// Value of `ld #rand`
    pub random: u32,
}

impl<'a> PacketContext<'a> {
    /// Create a context from packet bytes with all metadata zeroed.
    pub const fn from_slice(data: &'a [u8]) -> Self {
        Self {
            data,
            protocol: 0,
            pkt_type: 0,
            random: 0,
        }
    }

    /// Get the packet length.
    #[inline]
    pub const fn data_len(&self) -> usize {
        self.data.len()
    }
}

/// Result of classic BPF program execution: the number of packet bytes to
/// keep, 0 meaning reject.
pub type ExecResult = Result<u32, ExecError>;

/// Errors that can occur during classic BPF program execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecError {
    /// Program exceeds the profile's instruction limit
    #[error("program of {count} instructions exceeds limit {limit}")]
    TooLong {
        /// Instruction count
        count: usize,
        /// Profile limit
        limit: usize,
    },

    /// Execution ran past the last instruction
    #[error("execution ran past the end of the program")]
    NoReturn,

    /// Jump lands outside the program
    #[error("jump target {target} out of range at instruction {index}")]
    JumpOutOfRange {
        /// Instruction index of jump
        index: usize,
        /// Target index
        target: usize,
    },

    /// Record that is not a classic BPF instruction
    #[error("unknown instruction at {index}")]
    UnknownInstruction {
        /// Instruction index
        index: usize,
    },

    /// Operand that has no machine meaning
    #[error("invalid instruction at {index}: {reason}")]
    InvalidInstruction {
        /// Instruction index
        index: usize,
        /// Offending operand
        reason: InvalidInstruction,
    },

    /// Ancillary load the interpreter does not model
    #[error("unsupported ancillary load {num} at instruction {index}")]
    UnsupportedExtension {
        /// Instruction index
        index: usize,
        /// Extension id
        num: u32,
    },
}

/// Trait for classic BPF execution engines.
pub trait FilterExecutor<P: TargetProfile = ActiveProfile> {
    /// Run `program` against `ctx`.
    ///
    /// # Returns
    ///
    /// The filter verdict on success, or an `ExecError` if the program is
    /// structurally invalid.
    fn execute(&self, program: &[Instruction], ctx: &PacketContext<'_>) -> ExecResult;
}
