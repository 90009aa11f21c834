//! Classic BPF Verifier
//!
//! The verifier applies the load-time checks a kernel performs before it
//! installs a classic filter:
//!
//! - Size limits of the target profile
//! - Every instruction is a known, encodable operation
//! - No constant division or modulo by zero
//! - Every jump lands inside the program
//! - The program ends with a return
//! - Scratch words are written before they are read on every path
//!
//! Composed programs should be verified before installation.
//!
//! # Profile-Specific Verification
//!
//! - **Linux**: 4096 instructions, ancillary loads allowed
//! - **BSD**: 512 instructions, only `ld len`

mod core;
mod error;

pub use self::core::Verifier;
pub use error::{VerifyError, VerifyResult};
